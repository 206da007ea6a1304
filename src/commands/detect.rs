use std::{fs, path::Path};

use clap::Args;
use image::{Rgba, RgbaImage};
use rayon::iter::{IntoParallelRefIterator as _, ParallelIterator as _};

use blobsheet::{
    image_util::{self, ImageBufferExt as _},
    mser::MserOptions,
    sprites,
};

use super::{output_name, parse_color, BackgroundArgs, CommandError, MserArgs, SharedArgs};

#[derive(Args, Debug)]
pub struct DetectArgs {
    // shared args
    #[clap(flatten)]
    shared: SharedArgs,

    #[clap(flatten)]
    pub mser: MserArgs,

    #[clap(flatten)]
    pub background: BackgroundArgs,

    /// Outline color for the preview as RRGGBB hex.
    #[clap(long, default_value = "ff0040")]
    pub outline: String,
}

impl std::ops::Deref for DetectArgs {
    type Target = SharedArgs;

    fn deref(&self) -> &Self::Target {
        &self.shared
    }
}

impl DetectArgs {
    pub fn execute(&self) -> Result<(), CommandError> {
        fs::create_dir_all(&self.output)?;

        if !self.output.is_dir() {
            return Err(CommandError::OutputPathNotDir);
        }

        let options = self.mser.options();
        options.validate()?;

        let outline = parse_color(&self.outline)?;

        let images = image_util::load_from_path(&self.source)?;

        if images.is_empty() {
            warn!("no source images found");
            return Ok(());
        }

        let found = images
            .par_iter()
            .filter_map(
                |(path, image)| match detect_one(self, path, image, outline, options) {
                    Ok(count) => Some(count),
                    Err(err) => {
                        error!("{}: {err}", path.display());
                        None
                    }
                },
            )
            .sum::<usize>();

        debug!("{found} blobs across {} images", images.len());

        Ok(())
    }
}

fn detect_one(
    args: &DetectArgs,
    path: &Path,
    image: &RgbaImage,
    outline: [u8; 3],
    options: MserOptions,
) -> Result<usize, CommandError> {
    let background = args.background.resolve(image)?;
    trace!("{}: background {background:?}", path.display());

    let mut rects = sprites::detect_blobs(image, background, options)?;
    let tags = sprites::order_rects(&mut rects);

    let mut preview = image.clone();
    let color = Rgba([outline[0], outline[1], outline[2], 255]);
    for rect in &rects {
        image_util::draw_rect_outline(&mut preview, rect, color);
    }

    preview.save_optimized_png(output_name(
        path,
        &args.output,
        &args.prefix,
        "-blobs",
        "png",
    ))?;

    let rows = tags.last().map_or(0, |tag| tag.row + 1);
    info!(
        "{}: {} blobs in {rows} rows",
        path.display(),
        rects.len()
    );

    Ok(rects.len())
}
