//! MSER-style region extraction over a binarized image.
//!
//! This is the linear-time flood-fill formulation (Nistér / Stewénius): pixels
//! are visited through a 256-level boundary heap while a stack of growing
//! components records the merge history as a region forest. A second, top-down
//! pass computes the area variation of every node against its enclosing
//! ancestor and marks the locally most stable ones; a final pass prunes nested
//! regions that are too similar in size to an already accepted relative.
//!
//! The forest lives in an arena of nodes indexed by position, with
//! parent / child / sibling links stored as indices.

use image::RgbaImage;

use crate::geom::Rect;

#[derive(Debug, thiserror::Error)]
pub enum MserError {
    #[error("area bounds must satisfy 0 <= min <= max <= 1, got {min}..{max}")]
    InvalidAreaBounds { min: f64, max: f64 },

    #[error("max variation must be greater than zero, got {0}")]
    InvalidMaxVariation(f64),

    #[error("min diversity must be within [0, 1), got {0}")]
    InvalidMinDiversity(f64),
}

/// Extraction tuning. All fields are required; the engine applies no implicit
/// defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MserOptions {
    /// Grey-level step used when measuring area stability.
    pub delta: u32,
    /// Minimum region area as a fraction of the total pixel count.
    pub min_area: f64,
    /// Maximum region area as a fraction of the total pixel count.
    pub max_area: f64,
    /// Maximum relative area change across `delta` levels for a region to
    /// still count as stable.
    pub max_variation: f64,
    /// Minimum relative size difference to an accepted ancestor; anything
    /// closer is dropped as a nested duplicate.
    pub min_diversity: f64,
}

impl MserOptions {
    pub fn validate(&self) -> Result<(), MserError> {
        if !(0.0..=1.0).contains(&self.min_area)
            || !(0.0..=1.0).contains(&self.max_area)
            || self.min_area > self.max_area
        {
            return Err(MserError::InvalidAreaBounds {
                min: self.min_area,
                max: self.max_area,
            });
        }

        if self.max_variation <= 0.0 {
            return Err(MserError::InvalidMaxVariation(self.max_variation));
        }

        if !(0.0..1.0).contains(&self.min_diversity) {
            return Err(MserError::InvalidMinDiversity(self.min_diversity));
        }

        Ok(())
    }
}

/// A stable extremal region read out of the forest.
///
/// Only `rect` survives past detection; the rest is exposed for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    /// Grey level the region was extracted at.
    pub level: i32,
    /// Raw spatial moments (x, y, x², xy, y² sums) of the member pixels.
    pub moments: [f64; 5],
    /// Member pixel count.
    pub area: usize,
    /// Relative area growth towards the enclosing ancestor `delta` levels up.
    pub variation: f64,
    /// Always true on returned regions; kept for parity with the forest node.
    pub stable: bool,
    /// Bounding box of the member pixels.
    pub rect: Rect,
}

impl Region {
    /// Center of mass of the member pixels.
    #[must_use]
    pub fn centroid(&self) -> (f64, f64) {
        let area = self.area as f64;
        (self.moments[0] / area, self.moments[1] / area)
    }
}

/// Forest node. Levels along a parent chain strictly increase, so the chain
/// is bounded by the number of grey levels.
#[derive(Debug, Clone)]
struct Node {
    level: i32,
    area: usize,
    moments: [f64; 5],
    variation: f64,
    stable: bool,
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    parent: Option<usize>,
    child: Option<usize>,
    next: Option<usize>,
}

impl Node {
    const fn new(level: i32) -> Self {
        Self {
            level,
            area: 0,
            moments: [0.0; 5],
            variation: f64::INFINITY,
            stable: false,
            left: i32::MAX,
            top: i32::MAX,
            right: i32::MIN,
            bottom: i32::MIN,
            parent: None,
            child: None,
            next: None,
        }
    }

    fn accumulate(&mut self, x: i32, y: i32) {
        let (fx, fy) = (f64::from(x), f64::from(y));

        self.area += 1;
        self.moments[0] += fx;
        self.moments[1] += fy;
        self.moments[2] += fx * fx;
        self.moments[3] += fx * fy;
        self.moments[4] += fy * fy;

        self.left = self.left.min(x);
        self.top = self.top.min(y);
        self.right = self.right.max(x);
        self.bottom = self.bottom.max(y);
    }

    fn rect(&self) -> Rect {
        if self.area == 0 {
            return Rect::default();
        }

        Rect::from_bounds(self.left, self.top, self.right + 1, self.bottom + 1)
    }
}

/// Sentinel level above every representable grey value.
const LEVEL_CAP: i32 = 256;

pub struct Mser {
    options: MserOptions,
}

impl Mser {
    pub fn new(options: MserOptions) -> Result<Self, MserError> {
        options.validate()?;
        Ok(Self { options })
    }

    /// Extracts the stable dark regions of a binarized image.
    ///
    /// The red channel is taken as the grey value, which is exact for the
    /// two-color masks produced by [`crate::image_util::binarize`]. A uniform
    /// image yields an empty list. Scan order is row-major, so identical
    /// input produces an identical region list.
    #[must_use]
    pub fn extract(&self, image: &RgbaImage) -> Vec<Region> {
        let width = image.width() as usize;
        let height = image.height() as usize;

        if width == 0 || height == 0 {
            return Vec::new();
        }

        let grey = image.pixels().map(|p| p.0[0]).collect::<Vec<_>>();

        let forest = Forest::grow(&grey, width, height);
        forest.detect(&self.options, width * height)
    }

}

/// Collapses overlapping or contained rects into merged bounding rects.
///
/// Runs to a fixed point: the result contains no pair that still overlaps.
/// Output order only depends on input order.
#[must_use]
pub fn merge_rects(rects: &[Rect]) -> Vec<Rect> {
    let mut merged: Vec<Rect> = rects.to_vec();
    let mut settled = false;

    while !settled {
        settled = true;

        let mut i = 0;
        while i < merged.len() {
            let mut j = i + 1;
            while j < merged.len() {
                let (a, b) = (merged[i], merged[j]);

                if a.overlaps(&b) || a.contains(&b) || b.contains(&a) {
                    merged[i].merge(&b);
                    merged.remove(j);
                    settled = false;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
    }

    merged
}

/// Component forest produced by a single flood-fill pass.
struct Forest {
    nodes: Vec<Node>,
    root: usize,
}

impl Forest {
    #[allow(clippy::unwrap_used, clippy::too_many_lines)] // stack is never empty past setup
    fn grow(grey: &[u8], width: usize, height: usize) -> Self {
        let mut nodes: Vec<Node> = Vec::new();
        // stack of component indices, levels strictly decreasing towards the top
        let mut stack: Vec<usize> = Vec::new();
        let mut accessible = vec![false; width * height];
        // one bucket of (pixel, next edge) pairs per grey level
        let mut boundary: Vec<Vec<(u32, u8)>> = vec![Vec::new(); LEVEL_CAP as usize];
        let mut priority = LEVEL_CAP as usize;

        let alloc = |nodes: &mut Vec<Node>, level: i32| -> usize {
            nodes.push(Node::new(level));
            nodes.len() - 1
        };

        // sentinel keeps the stack non-empty and above any real level
        let sentinel = alloc(&mut nodes, LEVEL_CAP);
        stack.push(sentinel);

        let mut cur_pixel = 0usize;
        let mut cur_edge = 0u8;
        let mut cur_level = i32::from(grey[0]);
        accessible[0] = true;

        let idx = alloc(&mut nodes, cur_level);
        stack.push(idx);

        'outer: loop {
            let x = cur_pixel % width;
            let y = cur_pixel / width;

            // explore the remaining edges of the current pixel; a neighbor at
            // a lower grey level takes over as the current pixel
            while cur_edge < 4 {
                let neighbor = match cur_edge {
                    0 => (x + 1 < width).then(|| cur_pixel + 1),
                    1 => (y + 1 < height).then(|| cur_pixel + width),
                    2 => (x > 0).then(|| cur_pixel - 1),
                    _ => (y > 0).then(|| cur_pixel - width),
                };

                if let Some(neighbor) = neighbor {
                    if !accessible[neighbor] {
                        accessible[neighbor] = true;
                        let neighbor_level = i32::from(grey[neighbor]);

                        if neighbor_level >= cur_level {
                            boundary[neighbor_level as usize].push((neighbor as u32, 0));
                            priority = priority.min(neighbor_level as usize);
                        } else {
                            boundary[cur_level as usize].push((cur_pixel as u32, cur_edge + 1));
                            priority = priority.min(cur_level as usize);

                            cur_pixel = neighbor;
                            cur_edge = 0;
                            cur_level = neighbor_level;

                            let idx = alloc(&mut nodes, cur_level);
                            stack.push(idx);
                            continue 'outer;
                        }
                    }
                }

                cur_edge += 1;
            }

            let top = *stack.last().unwrap();
            nodes[top].accumulate(x as i32, y as i32);

            if priority == LEVEL_CAP as usize {
                break;
            }

            let (pixel, edge) = boundary[priority].pop().unwrap();
            cur_pixel = pixel as usize;
            cur_edge = edge;

            while priority < LEVEL_CAP as usize && boundary[priority].is_empty() {
                priority += 1;
            }

            let new_level = i32::from(grey[cur_pixel]);
            if new_level != cur_level {
                cur_level = new_level;
                Self::raise_level(&mut nodes, &mut stack, new_level);
            }
        }

        let root = *stack.last().unwrap();
        Self { nodes, root }
    }

    /// Collapses stack components up to `new_level`, recording the merge
    /// history as parent / child links.
    #[allow(clippy::unwrap_used)] // the sentinel keeps the stack non-empty
    fn raise_level(nodes: &mut Vec<Node>, stack: &mut Vec<usize>, new_level: i32) {
        loop {
            let top = stack.pop().unwrap();
            let under = *stack.last().unwrap();

            if new_level < nodes[under].level {
                nodes.push(Node::new(new_level));
                let idx = nodes.len() - 1;
                Self::attach(nodes, idx, top);
                stack.push(idx);
                return;
            }

            Self::attach(nodes, under, top);

            if new_level <= nodes[under].level {
                return;
            }
        }
    }

    /// Makes `child` a child of `parent`, folding its pixels into the parent.
    fn attach(nodes: &mut [Node], parent: usize, child: usize) {
        debug_assert!(nodes[child].level < nodes[parent].level);

        nodes[parent].area += nodes[child].area;
        for i in 0..5 {
            nodes[parent].moments[i] += nodes[child].moments[i];
        }
        nodes[parent].left = nodes[parent].left.min(nodes[child].left);
        nodes[parent].top = nodes[parent].top.min(nodes[child].top);
        nodes[parent].right = nodes[parent].right.max(nodes[child].right);
        nodes[parent].bottom = nodes[parent].bottom.max(nodes[child].bottom);

        nodes[child].next = nodes[parent].child;
        nodes[parent].child = Some(child);
        nodes[child].parent = Some(parent);
    }

    fn detect(mut self, options: &MserOptions, total_pixels: usize) -> Vec<Region> {
        let min_pixels = (options.min_area * total_pixels as f64) as usize;
        let max_pixels = (options.max_area * total_pixels as f64) as usize;

        self.measure(self.root, options.delta as i32, min_pixels, max_pixels, options.max_variation);

        let mut regions = Vec::new();
        self.collect(self.root, options.min_diversity, &mut regions);

        debug!("extracted {} stable regions", regions.len());

        regions
    }

    /// Top-down variation pass.
    ///
    /// A node's variation compares it against the last ancestor no more than
    /// `delta` levels above it; the node is stable when that variation is a
    /// local minimum along the parent chain, small enough, and the area is
    /// inside the configured band. Parents are measured before their children
    /// so the local-minimum test can read the parent's variation.
    fn measure(
        &mut self,
        idx: usize,
        delta: i32,
        min_pixels: usize,
        max_pixels: usize,
        max_variation: f64,
    ) {
        let level = self.nodes[idx].level;
        let area = self.nodes[idx].area;

        let mut ancestor = idx;
        while let Some(parent) = self.nodes[ancestor].parent {
            if self.nodes[parent].level > level + delta {
                break;
            }
            ancestor = parent;
        }

        // a node that never accumulated a pixel can never be stable
        let variation = if area == 0 {
            f64::INFINITY
        } else {
            (self.nodes[ancestor].area - area) as f64 / area as f64
        };
        self.nodes[idx].variation = variation;

        let is_minimum = self.nodes[idx]
            .parent
            .is_none_or(|parent| variation <= self.nodes[parent].variation);
        let candidate = is_minimum
            && area >= min_pixels
            && area <= max_pixels
            && variation <= max_variation;

        let mut child = self.nodes[idx].child;
        let mut leaf = true;

        while let Some(c) = child {
            leaf = false;
            self.measure(c, delta, min_pixels, max_pixels, max_variation);

            if candidate && variation < self.nodes[c].variation {
                self.nodes[idx].stable = true;
            }

            child = self.nodes[c].next;
        }

        if leaf && candidate {
            self.nodes[idx].stable = true;
        }
    }

    /// Diversity pruning and read-out, pre-order over the forest.
    ///
    /// A stable node is dropped when an accepted ancestor or descendant is
    /// within `min_diversity` relative size of it.
    fn collect(&mut self, idx: usize, min_diversity: f64, out: &mut Vec<Region>) {
        if self.nodes[idx].stable {
            let area = self.nodes[idx].area;
            let variation = self.nodes[idx].variation;

            let min_parent_area = (area as f64 / (1.0 - min_diversity) + 0.5) as usize;

            let mut ancestor = idx;
            while let Some(parent) = self.nodes[ancestor].parent {
                if self.nodes[parent].area >= min_parent_area {
                    break;
                }
                ancestor = parent;

                if self.nodes[parent].stable && self.nodes[parent].variation <= variation {
                    self.nodes[idx].stable = false;
                    break;
                }
            }

            if self.nodes[idx].stable {
                let max_child_area = (area as f64 * (1.0 - min_diversity) + 0.5) as usize;

                if !self.dominates(idx, variation, max_child_area) {
                    self.nodes[idx].stable = false;
                }
            }
        }

        if self.nodes[idx].stable {
            let node = &self.nodes[idx];
            out.push(Region {
                level: node.level,
                moments: node.moments,
                area: node.area,
                variation: node.variation,
                stable: true,
                rect: node.rect(),
            });
        }

        let mut child = self.nodes[idx].child;
        while let Some(c) = child {
            self.collect(c, min_diversity, out);
            child = self.nodes[c].next;
        }
    }

    /// True when no sufficiently large descendant is more stable than
    /// `variation`.
    fn dominates(&self, idx: usize, variation: f64, max_child_area: usize) -> bool {
        if self.nodes[idx].area <= max_child_area {
            return true;
        }

        if self.nodes[idx].stable && self.nodes[idx].variation < variation {
            return false;
        }

        let mut child = self.nodes[idx].child;
        while let Some(c) = child {
            if !self.dominates(c, variation, max_child_area) {
                return false;
            }
            child = self.nodes[c].next;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_util::binarize;
    use image::Rgba;

    fn options() -> MserOptions {
        MserOptions {
            delta: 0,
            min_area: 0.0,
            max_area: 0.5,
            max_variation: 0.5,
            min_diversity: 0.33,
        }
    }

    fn canvas(width: u32, height: u32, blobs: &[Rect]) -> RgbaImage {
        let mut image = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));

        for blob in blobs {
            for y in blob.top()..blob.bottom() {
                for x in blob.left()..blob.right() {
                    image.put_pixel(x as u32, y as u32, Rgba([200, 80, 10, 255]));
                }
            }
        }

        binarize(&image, [0, 0, 0], [255, 255, 255])
    }

    #[test]
    fn validation_catches_bad_options() {
        assert!(options().validate().is_ok());

        let mut bad = options();
        bad.min_area = 0.6;
        bad.max_area = 0.5;
        assert!(matches!(
            bad.validate(),
            Err(MserError::InvalidAreaBounds { .. })
        ));

        let mut bad = options();
        bad.max_variation = 0.0;
        assert!(matches!(
            bad.validate(),
            Err(MserError::InvalidMaxVariation(_))
        ));

        let mut bad = options();
        bad.min_diversity = 1.0;
        assert!(matches!(
            bad.validate(),
            Err(MserError::InvalidMinDiversity(_))
        ));
    }

    #[test]
    fn solid_blob_round_trips_to_its_bounds() {
        let bounds = Rect::new(5, 7, 10, 6);
        let mask = canvas(40, 40, &[bounds]);

        let mser = Mser::new(options()).unwrap();
        let regions = mser.extract(&mask);

        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].rect, bounds);
        assert_eq!(regions[0].area, 60);
        assert!(regions[0].stable);
    }

    #[test]
    fn uniform_image_yields_no_regions() {
        let mask = canvas(32, 32, &[]);

        let mser = Mser::new(options()).unwrap();
        assert!(mser.extract(&mask).is_empty());
    }

    #[test]
    fn separate_blobs_are_detected_individually() {
        let blobs = [
            Rect::new(2, 2, 6, 6),
            Rect::new(20, 3, 5, 8),
            Rect::new(4, 20, 8, 4),
        ];
        let mask = canvas(48, 48, &blobs);

        let mser = Mser::new(options()).unwrap();
        let regions = mser.extract(&mask);

        assert_eq!(regions.len(), 3);

        let mut rects = regions.iter().map(|r| r.rect).collect::<Vec<_>>();
        rects.sort_by_key(|r| (r.y, r.x));
        let mut expected = blobs.to_vec();
        expected.sort_by_key(|r| (r.y, r.x));

        assert_eq!(rects, expected);
    }

    #[test]
    fn extraction_is_deterministic() {
        let blobs = [Rect::new(1, 1, 4, 4), Rect::new(10, 6, 3, 7)];
        let mask = canvas(24, 24, &blobs);

        let mser = Mser::new(options()).unwrap();
        let first = mser.extract(&mask);
        let second = mser.extract(&mask);

        assert_eq!(first, second);
    }

    #[test]
    fn centroid_of_a_solid_blob_is_its_center() {
        let mask = canvas(20, 20, &[Rect::new(4, 4, 5, 5)]);

        let mser = Mser::new(options()).unwrap();
        let regions = mser.extract(&mask);

        assert_eq!(regions.len(), 1);
        let (cx, cy) = regions[0].centroid();
        assert!((cx - 6.0).abs() < 1e-9);
        assert!((cy - 6.0).abs() < 1e-9);
    }

    #[test]
    fn merge_rects_reaches_a_fixed_point() {
        let rects = [
            Rect::new(0, 0, 4, 4),
            Rect::new(2, 2, 4, 4),
            // only touches the second rect, folds in through the chain
            Rect::new(5, 5, 1, 1),
            Rect::new(20, 20, 2, 2),
        ];

        let merged = merge_rects(&rects);

        assert_eq!(
            merged,
            vec![Rect::from_bounds(0, 0, 6, 6), Rect::new(20, 20, 2, 2)]
        );
    }

    #[test]
    fn merge_rects_handles_containment_without_overlap_area() {
        // zero-area rect inside a larger one: no overlap area, still contained
        let rects = [Rect::new(0, 0, 10, 10), Rect::new(3, 3, 0, 0)];
        let merged = merge_rects(&rects);

        assert_eq!(merged, vec![Rect::new(0, 0, 10, 10)]);
    }
}
