use std::{fs, num::NonZeroU32, path::Path};

use clap::Args;
use image::RgbaImage;
use rayon::iter::{IntoParallelRefIterator as _, ParallelIterator as _};

use blobsheet::{
    export,
    geom::Size,
    image_util::{self, ImageBufferExt as _},
    mser::MserOptions,
    sprites::Sheet,
};

use super::{output_name, BackgroundArgs, CommandError, MserArgs, SharedArgs};

#[derive(Args, Debug)]
pub struct SheetArgs {
    // shared args
    #[clap(flatten)]
    shared: SharedArgs,

    #[clap(flatten)]
    pub mser: MserArgs,

    #[clap(flatten)]
    pub background: BackgroundArgs,

    /// Number of rows on the packed sheet.
    #[clap(short, long, default_value = "1")]
    pub rows: NonZeroU32,

    /// Horizontal padding per frame in pixels.
    #[clap(long, default_value_t = 0)]
    pub padding_x: u32,

    /// Vertical padding per frame in pixels.
    #[clap(long, default_value_t = 0)]
    pub padding_y: u32,
}

impl std::ops::Deref for SheetArgs {
    type Target = SharedArgs;

    fn deref(&self) -> &Self::Target {
        &self.shared
    }
}

impl SheetArgs {
    pub fn execute(&self) -> Result<(), CommandError> {
        fs::create_dir_all(&self.output)?;

        if !self.output.is_dir() {
            return Err(CommandError::OutputPathNotDir);
        }

        let options = self.mser.options();
        options.validate()?;

        let images = image_util::load_from_path(&self.source)?;

        if images.is_empty() {
            warn!("no source images found");
            return Ok(());
        }

        images.par_iter().for_each(|(path, image)| {
            if let Err(err) = generate_sheet(self, path, image, options) {
                error!("{}: {err}", path.display());
            }
        });

        Ok(())
    }
}

fn generate_sheet(
    args: &SheetArgs,
    path: &Path,
    image: &RgbaImage,
    options: MserOptions,
) -> Result<(), CommandError> {
    let background = args.background.resolve(image)?;

    let name = path.file_stem().unwrap_or_default().to_string_lossy();
    let mut sheet = Sheet::new(name.clone(), image.clone());
    sheet.detect(background, options)?;

    if sheet.rects.is_empty() {
        warn!("{}: no blobs detected", path.display());
        return Ok(());
    }

    let padding = Size::new(f64::from(args.padding_x), f64::from(args.padding_y));
    let rects = sheet.rects.clone();
    sheet.add_animation(&rects, Some(name.to_string()), padding);

    // re-borrow shared so the sheet image stays readable for packing
    #[allow(clippy::unwrap_used)] // just pushed
    let animation = sheet.animations.last().unwrap();

    let packed = export::pack(animation, &sheet.image, args.rows.get())?;
    packed.save_optimized_png(output_name(path, &args.output, &args.prefix, "", "png"))?;

    info!(
        "completed {}{name}: {} frames, cell ({}px, {}px)",
        args.prefix,
        animation.frames.len(),
        animation.size.width,
        animation.size.height,
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::BackgroundCorner;
    use image::Rgba;

    fn args(output: std::path::PathBuf) -> SheetArgs {
        SheetArgs {
            shared: SharedArgs {
                source: output.join("fighter.png"),
                output,
                prefix: String::new(),
            },
            mser: MserArgs {
                delta: 0,
                min_area: 0.0,
                max_area: 0.5,
                max_variation: 0.5,
                min_diversity: 0.33,
            },
            background: BackgroundArgs {
                background: None,
                corner: BackgroundCorner::TopLeft,
            },
            rows: NonZeroU32::new(1).unwrap(),
            padding_x: 0,
            padding_y: 0,
        }
    }

    #[test]
    fn generates_a_packed_sheet_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();

        let mut image = RgbaImage::from_pixel(16, 8, Rgba([9, 9, 9, 255]));
        for (x, y) in [(2, 2), (3, 2), (2, 3), (3, 3)] {
            image.put_pixel(x, y, Rgba([240, 240, 240, 255]));
        }

        let args = args(out.clone());
        let source = Path::new("fighter.png");

        generate_sheet(&args, source, &image, args.mser.options()).unwrap();

        let packed = image::open(out.join("fighter.png")).unwrap().to_rgba8();
        assert_eq!(packed.dimensions(), (2, 2));
        assert_eq!(packed.get_pixel(0, 0).0, [240, 240, 240, 255]);
    }
}
