mod detect;
mod sheet;

pub use detect::*;
pub use sheet::*;

use std::path::{Path, PathBuf};

use clap::{builder::PossibleValue, Args, Subcommand, ValueEnum};
use image::RgbaImage;
use strum::{EnumIter, VariantArray};

use blobsheet::mser::MserOptions;

#[derive(Subcommand, Debug)]
pub enum SpriteCommand {
    /// Detect sprite blobs in an image and write an outlined preview.
    Detect {
        // args
        #[clap(flatten)]
        args: DetectArgs,
    },

    /// Detect sprite blobs and pack them into a spritesheet.
    ///
    /// Blobs are ordered left to right, top to bottom, bottom-aligned to a
    /// common baseline and laid out on a row/column grid.
    Sheet {
        // args
        #[clap(flatten)]
        args: SheetArgs,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("{0}")]
    ImgUtilError(#[from] blobsheet::image_util::ImgUtilError),

    #[error("{0}")]
    MserError(#[from] blobsheet::mser::MserError),

    #[error("{0}")]
    ExportError(#[from] blobsheet::export::ExportError),

    #[error("output path is not a directory")]
    OutputPathNotDir,

    #[error("invalid color {0:?}, expected RRGGBB hex")]
    InvalidColor(String),
}

#[derive(Args, Debug)]
pub struct SharedArgs {
    /// Image file or folder of images to process.
    pub source: PathBuf,

    /// Output folder.
    pub output: PathBuf,

    /// Prefix to add to the output file name.
    #[clap(short, long, default_value_t = String::new())]
    pub prefix: String,
}

#[derive(Args, Debug)]
pub struct MserArgs {
    /// Grey-level step size used for the region stability scan.
    #[clap(long, default_value_t = 0)]
    pub delta: u32,

    /// Minimum blob area as a fraction of the image pixel count.
    #[clap(long, default_value_t = 0.0)]
    pub min_area: f64,

    /// Maximum blob area as a fraction of the image pixel count.
    #[clap(long, default_value_t = 0.5)]
    pub max_area: f64,

    /// Maximum relative area change for a region to count as stable.
    #[clap(long, default_value_t = 0.5)]
    pub max_variation: f64,

    /// Minimum relative size difference between nested regions.
    #[clap(long, default_value_t = 0.33)]
    pub min_diversity: f64,
}

impl MserArgs {
    pub const fn options(&self) -> MserOptions {
        MserOptions {
            delta: self.delta,
            min_area: self.min_area,
            max_area: self.max_area,
            max_variation: self.max_variation,
            min_diversity: self.min_diversity,
        }
    }
}

#[derive(Args, Debug)]
pub struct BackgroundArgs {
    /// Background color as RRGGBB hex.
    /// When not set the color is sampled from a corner pixel of the image.
    #[clap(short, long, verbatim_doc_comment)]
    pub background: Option<String>,

    /// Corner pixel to sample the background color from.
    #[clap(long, default_value_t = BackgroundCorner::TopLeft)]
    pub corner: BackgroundCorner,
}

impl BackgroundArgs {
    pub fn resolve(&self, image: &RgbaImage) -> Result<[u8; 3], CommandError> {
        self.background
            .as_deref()
            .map_or_else(|| Ok(self.corner.sample(image)), parse_color)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, VariantArray)]
pub enum BackgroundCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl BackgroundCorner {
    fn sample(self, image: &RgbaImage) -> [u8; 3] {
        if image.width() == 0 || image.height() == 0 {
            return [0, 0, 0];
        }

        let right = image.width() - 1;
        let bottom = image.height() - 1;

        let (x, y) = match self {
            Self::TopLeft => (0, 0),
            Self::TopRight => (right, 0),
            Self::BottomLeft => (0, bottom),
            Self::BottomRight => (right, bottom),
        };

        let [r, g, b, _] = image.get_pixel(x, y).0;
        [r, g, b]
    }
}

impl std::fmt::Display for BackgroundCorner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TopLeft => write!(f, "top-left"),
            Self::TopRight => write!(f, "top-right"),
            Self::BottomLeft => write!(f, "bottom-left"),
            Self::BottomRight => write!(f, "bottom-right"),
        }
    }
}

impl ValueEnum for BackgroundCorner {
    fn value_variants<'a>() -> &'a [Self] {
        Self::VARIANTS
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(PossibleValue::new(match self {
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
        }))
    }
}

pub(crate) fn parse_color(hex: &str) -> Result<[u8; 3], CommandError> {
    let hex = hex.trim_start_matches('#');

    if hex.len() != 6 || !hex.is_ascii() {
        return Err(CommandError::InvalidColor(hex.to_string()));
    }

    let channel = |range| {
        u8::from_str_radix(&hex[range], 16).map_err(|_| CommandError::InvalidColor(hex.to_string()))
    };

    Ok([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}

pub(crate) fn output_name(
    source: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    prefix: &str,
    suffix: &str,
    extension: &str,
) -> PathBuf {
    let stem = source
        .as_ref()
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    let mut out = output_dir.as_ref().join(format!("{prefix}{stem}{suffix}"));
    out.set_extension(extension);

    out
}
