// Console logger built on env_logger, following pretty_env_logger's format.

use env_logger::{
    fmt::{Color, Style, StyledValue},
    Builder, Env,
};
use log::Level;

pub fn init(level: &str) {
    let env = Env::default().filter_or("RUST_LOG", level);

    Builder::from_env(env)
        .format(|buf, record| {
            use std::io::Write;

            let mut style = buf.style();
            let level = colored_level(&mut style, record.level());

            let mut style = buf.style();
            let target = style.set_bold(true).value(record.target());

            writeln!(
                buf,
                "{} {} {} > {}",
                buf.timestamp_millis(),
                level,
                target,
                record.args()
            )
        })
        .init();
}

fn colored_level(style: &'_ mut Style, level: Level) -> StyledValue<'_, &'static str> {
    match level {
        Level::Trace => style.set_color(Color::Magenta).value("TRACE"),
        Level::Debug => style.set_color(Color::Blue).value("DEBUG"),
        Level::Info => style.set_color(Color::Green).value("INFO "),
        Level::Warn => style.set_color(Color::Yellow).value("WARN "),
        Level::Error => style.set_color(Color::Red).value("ERROR"),
    }
}
