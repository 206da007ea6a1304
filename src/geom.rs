/// Axis-aligned rectangle in pixel coordinates.
///
/// `width` and `height` are never negative; a zero-area rect is valid and
/// means "no selection". The `x`/`y`/`width`/`height` view and the
/// `left`/`top`/`right`/`bottom` view are interchangeable, with `right` and
/// `bottom` exclusive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        debug_assert!(width >= 0 && height >= 0);

        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a rect from exclusive bounds. Inverted bounds collapse to zero
    /// width / height.
    #[must_use]
    pub const fn from_bounds(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            x: left,
            y: top,
            width: if right > left { right - left } else { 0 },
            height: if bottom > top { bottom - top } else { 0 },
        }
    }

    #[must_use]
    pub const fn left(&self) -> i32 {
        self.x
    }

    #[must_use]
    pub const fn top(&self) -> i32 {
        self.y
    }

    #[must_use]
    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Width / height aspect ratio, `None` for a zero-height rect.
    #[must_use]
    pub fn ratio(&self) -> Option<f64> {
        if self.height == 0 {
            None
        } else {
            Some(f64::from(self.width) / f64::from(self.height))
        }
    }

    /// Covered area in pixels.
    #[must_use]
    pub const fn size(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Grows this rect in place to the bounding union with `other`.
    pub fn merge(&mut self, other: &Self) {
        *self = self.merged(other);
    }

    /// Bounding union of both rects.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());

        Self::from_bounds(left, top, right, bottom)
    }

    /// Overlap of both rects, zero-area when they are disjoint.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        Self::from_bounds(left, top, right, bottom)
    }

    #[must_use]
    pub const fn contains(&self, other: &Self) -> bool {
        self.left() <= other.left()
            && self.top() <= other.top()
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }

    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.intersect(other).size() > 0
    }

    /// Grows the rect to cover the pixel at (`x`, `y`).
    pub fn add(&mut self, x: i32, y: i32) {
        if self.is_empty() {
            *self = Self::new(x, y, 1, 1);
            return;
        }

        let left = self.left().min(x);
        let top = self.top().min(y);
        let right = self.right().max(x + 1);
        let bottom = self.bottom().max(y + 1);

        *self = Self::from_bounds(left, top, right, bottom);
    }
}

/// 2D placement offset. Offsets are fractional: recentering an animation can
/// shift frames by half a pixel.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Canvas extent, same fractional convention as [`Point`].
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_views_are_interchangeable() {
        let rect = Rect::new(3, 4, 10, 20);

        assert_eq!(rect.left(), 3);
        assert_eq!(rect.top(), 4);
        assert_eq!(rect.right(), 13);
        assert_eq!(rect.bottom(), 24);
        assert_eq!(Rect::from_bounds(3, 4, 13, 24), rect);
    }

    #[test]
    fn merge_takes_extreme_bounds() {
        let mut rect = Rect::new(5, 5, 2, 2);
        rect.merge(&Rect::new(0, 8, 3, 3));
        rect.merge(&Rect::new(9, 0, 1, 1));

        assert_eq!(rect, Rect::from_bounds(0, 0, 10, 11));
    }

    #[test]
    fn merge_is_commutative_and_associative() {
        let a = Rect::new(0, 0, 4, 4);
        let b = Rect::new(10, 2, 3, 3);
        let c = Rect::new(-2, 7, 1, 1);

        assert_eq!(a.merged(&b), b.merged(&a));
        assert_eq!(a.merged(&b).merged(&c), a.merged(&b.merged(&c)));
        assert_eq!(c.merged(&a).merged(&b), a.merged(&b).merged(&c));
    }

    #[test]
    fn intersect_of_disjoint_rects_is_empty() {
        let a = Rect::new(0, 0, 4, 4);
        let b = Rect::new(10, 10, 4, 4);

        let overlap = a.intersect(&b);
        assert_eq!(overlap.size(), 0);
        assert!(overlap.is_empty());
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn intersect_of_overlapping_rects() {
        let a = Rect::new(0, 0, 6, 6);
        let b = Rect::new(4, 2, 6, 6);

        assert_eq!(a.intersect(&b), Rect::new(4, 2, 2, 4));
        assert!(a.overlaps(&b));
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = Rect::new(0, 0, 4, 4);
        let b = Rect::new(4, 0, 4, 4);

        assert!(!a.overlaps(&b));
    }

    #[test]
    fn contains_includes_equal_rects() {
        let a = Rect::new(1, 1, 5, 5);

        assert!(a.contains(&a));
        assert!(a.contains(&Rect::new(2, 2, 2, 2)));
        assert!(!a.contains(&Rect::new(0, 2, 2, 2)));
    }

    #[test]
    fn ratio_is_guarded_against_zero_height() {
        assert_eq!(Rect::new(0, 0, 10, 5).ratio(), Some(2.0));
        assert_eq!(Rect::new(0, 0, 10, 0).ratio(), None);
    }

    #[test]
    fn add_grows_to_cover_pixel() {
        let mut rect = Rect::default();
        rect.add(4, 7);
        assert_eq!(rect, Rect::new(4, 7, 1, 1));

        rect.add(2, 9);
        assert_eq!(rect, Rect::from_bounds(2, 7, 5, 10));
    }
}
