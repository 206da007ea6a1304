//! Blob pipeline and frame layout.
//!
//! Turns detected rects into deterministically ordered, bottom-aligned,
//! padded animation frames. `order_rects`, `align_frames_vertically`,
//! `set_frame_offset` and `Animation::resize` mutate their input in place;
//! callers invoking the pipeline off the main thread should copy first or
//! serialize access.

use image::RgbaImage;

use crate::{
    geom::{Point, Rect, Size},
    image_util::binarize,
    mser::{merge_rects, Mser, MserError, MserOptions},
};

#[derive(Debug, thiserror::Error)]
pub enum SpriteError {
    #[error("cannot merge an empty set of rects")]
    EmptyMergeSet,
}

/// One sprite inside an animation: its source rect in the sheet image plus a
/// placement offset on the shared animation canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub view: Rect,
    pub offset: Point,
}

impl Frame {
    #[must_use]
    pub const fn new(view: Rect) -> Self {
        Self {
            view,
            offset: Point::new(0.0, 0.0),
        }
    }
}

/// Reading-order position assigned by [`order_rects`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GridPos {
    pub row: u32,
    pub col: u32,
}

/// Whether two rects share a row, i.e. their vertical extents touch or
/// overlap. Bounds are compared inclusively, matching the detection output
/// where adjacent sprite rows usually leave at least one background line.
const fn overlaps_in_direction(a: &Rect, b: &Rect) -> bool {
    a.y <= b.y + b.height && a.y + a.height >= b.y
}

fn reading_order(a: &Rect, b: &Rect) -> std::cmp::Ordering {
    if overlaps_in_direction(a, b) {
        a.x.cmp(&b.x)
    } else {
        a.y.cmp(&b.y)
    }
}

/// Sorts rects into reading order (left to right, top to bottom) in place and
/// returns the row / column tag of each sorted rect.
///
/// Row overlap is not transitive, so this comparator is not a total order;
/// std's sorts may reject it. A plain stable insertion sort is used instead:
/// pathological overlapping layouts may not end up perfectly row-grouped,
/// which is an accepted limitation of the heuristic.
pub fn order_rects(rects: &mut [Rect]) -> Vec<GridPos> {
    for i in 1..rects.len() {
        let mut j = i;
        while j > 0 && reading_order(&rects[j - 1], &rects[j]) == std::cmp::Ordering::Greater {
            rects.swap(j - 1, j);
            j -= 1;
        }
    }

    let mut tags = Vec::with_capacity(rects.len());

    for i in 0..rects.len() {
        let tag = if i == 0 {
            GridPos::default()
        } else {
            let prev: GridPos = tags[i - 1];

            if overlaps_in_direction(&rects[i], &rects[i - 1]) {
                GridPos {
                    row: prev.row,
                    col: prev.col + 1,
                }
            } else {
                GridPos {
                    row: prev.row + 1,
                    col: 0,
                }
            }
        };

        tags.push(tag);
    }

    tags
}

/// Bounding union of all rects.
pub fn merge_all(rects: &[Rect]) -> Result<Rect, SpriteError> {
    let (first, rest) = rects.split_first().ok_or(SpriteError::EmptyMergeSet)?;

    let mut merged = *first;
    for rect in rest {
        merged.merge(rect);
    }

    Ok(merged)
}

/// Bottom-aligns every frame to the tallest one by adjusting the y offsets.
/// No-op on an empty slice; x offsets are untouched.
pub fn align_frames_vertically(frames: &mut [Frame]) {
    let Some(baseline) = frames.iter().map(|f| f.view.height).max() else {
        return;
    };

    for frame in frames {
        frame.offset.y = f64::from(baseline - frame.view.height);
    }
}

/// Bounding size of `offset + view` over all frames, plus `padding` per axis.
#[must_use]
pub fn frames_size(frames: &[Frame], padding: Size) -> Size {
    let mut width: f64 = 0.0;
    let mut height: f64 = 0.0;

    for frame in frames {
        width = width.max(frame.offset.x + f64::from(frame.view.width));
        height = height.max(frame.offset.y + f64::from(frame.view.height));
    }

    Size::new(width + padding.width, height + padding.height)
}

/// Per-axis result of [`set_frame_offset`]: `true` when the unclamped target
/// offset was already within the animation bounds. Callers freeze their drag
/// anchor on the saturated axis when this reports `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisFit {
    pub x: bool,
    pub y: bool,
}

/// Moves one frame by (`dx`, `dy`), clamping the stored offset to
/// `[0, size - view]` per axis.
///
/// The stored value is `min(max(0, round(current + d)), bound)`.
///
/// # Panics
///
/// Panics when `frame_no` is out of range.
pub fn set_frame_offset(dx: f64, dy: f64, animation: &mut Animation, frame_no: usize) -> AxisFit {
    let frame = &mut animation.frames[frame_no];

    let max_x = animation.size.width - f64::from(frame.view.width);
    let max_y = animation.size.height - f64::from(frame.view.height);

    let target_x = (frame.offset.x + dx).round();
    let target_y = (frame.offset.y + dy).round();

    frame.offset.x = target_x.max(0.0).min(max_x);
    frame.offset.y = target_y.max(0.0).min(max_y);

    AxisFit {
        x: target_x >= 0.0 && target_x <= max_x,
        y: target_y >= 0.0 && target_y <= max_y,
    }
}

/// An ordered frame sequence sharing one canvas.
///
/// `size` always equals the frame bounding box plus padding; it is recomputed
/// whenever frames are added, removed or the animation is resized.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub name: String,
    pub frames: Vec<Frame>,
    pub padding: Size,
    pub size: Size,
}

impl Animation {
    /// Promotes detected rects into an animation: rects are copied, ordered
    /// into reading order, bottom-aligned and measured.
    #[must_use]
    pub fn from_rects(name: impl Into<String>, rects: &[Rect], padding: Size) -> Self {
        let mut ordered = rects.to_vec();
        order_rects(&mut ordered);

        let mut frames = ordered.into_iter().map(Frame::new).collect::<Vec<_>>();
        align_frames_vertically(&mut frames);

        let size = frames_size(&frames, padding);

        Self {
            name: name.into(),
            frames,
            padding,
            size,
        }
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
        self.recompute_size();
    }

    pub fn remove_frame(&mut self, frame_no: usize) -> Option<Frame> {
        if frame_no >= self.frames.len() {
            return None;
        }

        let frame = self.frames.remove(frame_no);
        self.recompute_size();
        Some(frame)
    }

    pub fn recompute_size(&mut self) {
        self.size = frames_size(&self.frames, self.padding);
    }

    /// Grows or shrinks the canvas, recentering every frame by half the size
    /// delta.
    pub fn resize(&mut self, new_size: Size) {
        let delta_w = new_size.width - self.size.width;
        let delta_h = new_size.height - self.size.height;

        for frame in &mut self.frames {
            frame.offset.x += delta_w / 2.0;
            frame.offset.y += delta_h / 2.0;
        }

        self.size = new_size;
    }
}

/// A loaded source image with its last detection result and the animations
/// authored from it. The sheet owns its rects and animations exclusively;
/// promoting rects into an animation copies them.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub image: RgbaImage,
    pub rects: Vec<Rect>,
    pub name: String,
    pub animations: Vec<Animation>,
}

impl Sheet {
    #[must_use]
    pub fn new(name: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            image,
            rects: Vec::new(),
            name: name.into(),
            animations: Vec::new(),
        }
    }

    /// Runs blob detection over the sheet image and stores the ordered result.
    pub fn detect(
        &mut self,
        background: [u8; 3],
        options: MserOptions,
    ) -> Result<&[Rect], MserError> {
        let mut rects = detect_blobs(&self.image, background, options)?;
        order_rects(&mut rects);

        self.rects = rects;
        Ok(&self.rects)
    }

    /// Promotes a selection of rects into a new animation and returns it.
    pub fn add_animation(
        &mut self,
        rects: &[Rect],
        name: Option<String>,
        padding: Size,
    ) -> &Animation {
        let name =
            name.unwrap_or_else(|| format!("Animation #{}", self.animations.len()));

        self.animations.push(Animation::from_rects(name, rects, padding));

        #[allow(clippy::unwrap_used)] // just pushed
        self.animations.last().unwrap()
    }
}

/// Full detection pipeline: binarize against the background color, extract
/// stable regions, collapse overlapping rects.
pub fn detect_blobs(
    image: &RgbaImage,
    background: [u8; 3],
    options: MserOptions,
) -> Result<Vec<Rect>, MserError> {
    let mask = binarize(image, background, [255, 255, 255]);
    let mser = Mser::new(options)?;

    let rects = mser
        .extract(&mask)
        .iter()
        .map(|region| region.rect)
        .collect::<Vec<_>>();

    Ok(merge_rects(&rects))
}
