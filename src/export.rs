//! Packs an animation onto a single spritesheet image.

use image::{imageops, RgbaImage};

use crate::sprites::Animation;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("spritesheet needs at least one row")]
    NoRows,
}

/// Lays the animation frames onto a fresh canvas as a grid of `rows` rows and
/// `ceil(frames / rows)` columns, each cell the size of the animation canvas.
///
/// Cells fill row-major, left to right then top to bottom; every frame's view
/// rect is copied from `image` at its cell origin plus the frame offset.
/// Encoding the result is the caller's concern.
pub fn pack(animation: &Animation, image: &RgbaImage, rows: u32) -> Result<RgbaImage, ExportError> {
    if rows == 0 {
        return Err(ExportError::NoRows);
    }

    let frame_count = animation.frames.len() as u32;
    let columns = frame_count.div_ceil(rows);

    let cell_width = animation.size.width.ceil() as u32;
    let cell_height = animation.size.height.ceil() as u32;

    let mut sheet = RgbaImage::new(cell_width * columns, cell_height * rows);

    debug!(
        "packing {frame_count} frames onto a {columns}x{rows} sheet, cell {cell_width}x{cell_height}"
    );

    for (idx, frame) in animation.frames.iter().enumerate() {
        let idx = idx as u32;
        let cell_x = i64::from(idx % columns * cell_width);
        let cell_y = i64::from(idx / columns * cell_height);

        let view = frame.view;
        let sprite = imageops::crop_imm(
            image,
            view.left().max(0) as u32,
            view.top().max(0) as u32,
            view.width as u32,
            view.height as u32,
        )
        .to_image();

        imageops::replace(
            &mut sheet,
            &sprite,
            cell_x + frame.offset.x.round() as i64,
            cell_y + frame.offset.y.round() as i64,
        );
    }

    Ok(sheet)
}
