use std::{
    fs,
    path::{Path, PathBuf},
};

use image::{codecs::png, ExtendedColorType, ImageEncoder, Rgba, RgbaImage};

use crate::geom::Rect;

#[derive(Debug, thiserror::Error)]
pub enum ImgUtilError {
    #[error("io error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("invalid image buffer: {width}x{height} rgba needs {expected} bytes, got {actual}")]
    InvalidImageBuffer {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

type ImgUtilResult<T> = std::result::Result<T, ImgUtilError>;

/// Loads a single png, or every png directly inside a folder.
///
/// Files are returned in natural name order so `frame-2` sorts before
/// `frame-10`.
pub fn load_from_path(path: &Path) -> ImgUtilResult<Vec<(PathBuf, RgbaImage)>> {
    if !path.exists() {
        return Err(ImgUtilError::IOError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("path not found: {}", path.display()),
        )));
    }

    if path.is_file() {
        return Ok(vec![(path.to_path_buf(), load_image_from_file(path)?)]);
    }

    let mut files = fs::read_dir(path)?
        .filter_map(|res| res.map_or(None, |e| Some(e.path())))
        .filter(|path| path.is_file() && path.extension().unwrap_or_default() == "png")
        .collect::<Vec<_>>();

    files.sort_by(|a, b| natord::compare(&a.to_string_lossy(), &b.to_string_lossy()));

    let mut images = Vec::with_capacity(files.len());

    for path in files {
        let image = load_image_from_file(&path)?;
        images.push((path, image));
    }

    Ok(images)
}

pub fn load_image_from_file(path: &Path) -> ImgUtilResult<RgbaImage> {
    let image = image::open(path)?.to_rgba8();
    Ok(image)
}

/// Wraps a raw row-major rgba byte buffer in an [`RgbaImage`].
///
/// This is the entry point for callers that decode images elsewhere; the
/// buffer length must be exactly `width * height * 4`.
pub fn rgba_from_raw(width: u32, height: u32, data: Vec<u8>) -> ImgUtilResult<RgbaImage> {
    let expected = width as usize * height as usize * 4;
    let actual = data.len();

    RgbaImage::from_raw(width, height, data).ok_or(ImgUtilError::InvalidImageBuffer {
        width,
        height,
        expected,
        actual,
    })
}

/// Splits an image into an exact two-color mask.
///
/// Pixels whose rgb channels match `background` exactly become opaque
/// `replace`, every other pixel becomes opaque black. The returned buffer is
/// new, the input is untouched.
#[must_use]
pub fn binarize(image: &RgbaImage, background: [u8; 3], replace: [u8; 3]) -> RgbaImage {
    let mut mask = RgbaImage::new(image.width(), image.height());

    for (src, dst) in image.pixels().zip(mask.pixels_mut()) {
        let [r, g, b, _] = src.0;

        *dst = if [r, g, b] == background {
            Rgba([replace[0], replace[1], replace[2], 255])
        } else {
            Rgba([0, 0, 0, 255])
        };
    }

    mask
}

/// Paints a 1px rectangle outline, clipped to the image bounds.
pub fn draw_rect_outline(image: &mut RgbaImage, rect: &Rect, color: Rgba<u8>) {
    let put = |image: &mut RgbaImage, x: i32, y: i32| {
        if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
            image.put_pixel(x as u32, y as u32, color);
        }
    };

    for x in rect.left()..rect.right() {
        put(image, x, rect.top());
        put(image, x, rect.bottom() - 1);
    }

    for y in rect.top()..rect.bottom() {
        put(image, rect.left(), y);
        put(image, rect.right() - 1, y);
    }
}

pub trait ImageBufferExt {
    fn save_optimized_png(&self, path: impl AsRef<Path>) -> ImgUtilResult<()>;
}

impl ImageBufferExt for RgbaImage {
    fn save_optimized_png(&self, path: impl AsRef<Path>) -> ImgUtilResult<()> {
        let mut file = fs::File::create(path)?;

        png::PngEncoder::new_with_quality(
            &mut file,
            png::CompressionType::Best,
            png::FilterType::default(),
        )
        .write_image(
            self.as_raw(),
            self.width(),
            self.height(),
            ExtendedColorType::Rgba8,
        )?;

        Ok(())
    }
}
