use std::process::ExitCode;

use clap::Parser;

#[macro_use]
extern crate log;

mod commands;
mod logger;

use commands::SpriteCommand;

#[derive(Parser, Debug)]
#[command(version, about, long_about=None)]
struct Cli {
    #[clap(subcommand)]
    command: SpriteCommand,
}

fn main() -> ExitCode {
    let args = Cli::parse();
    logger::init("info");
    info!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let res = match args.command {
        SpriteCommand::Detect { args } => args.execute(),
        SpriteCommand::Sheet { args } => args.execute(),
    };

    if let Err(err) = res {
        error!("{}", err);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
