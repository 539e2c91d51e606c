//! Screen-space rectangles for widget bounds.
//!
//! Widgets on small displays address pixels with signed 16-bit coordinates.
//! A [`Rectangle`] stores its four edges directly and treats both the minimum
//! and maximum edges as part of the rectangle, so a one-pixel widget has
//! `x_min == x_max`.

/// A rectangle described by four inclusive edge coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rectangle {
    /// Left edge.
    pub x_min: i16,
    /// Top edge.
    pub y_min: i16,
    /// Right edge (inclusive).
    pub x_max: i16,
    /// Bottom edge (inclusive).
    pub y_max: i16,
}

impl Rectangle {
    /// Create a rectangle from its edges.
    #[inline]
    pub const fn new(x_min: i16, y_min: i16, x_max: i16, y_max: i16) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Create a rectangle from a top-left corner and a size in pixels.
    ///
    /// A zero width or height yields a rectangle whose maximum edge sits one
    /// pixel before its minimum edge, which contains no points.
    #[inline]
    pub fn from_origin_size(x: i16, y: i16, width: i16, height: i16) -> Self {
        Self {
            x_min: x,
            y_min: y,
            x_max: x.saturating_add(width).saturating_sub(1),
            y_max: y.saturating_add(height).saturating_sub(1),
        }
    }

    /// The single pixel at the origin, equal to `Rectangle::default()`.
    ///
    /// Edges are inclusive, so this covers the point (0, 0). Use
    /// [`from_origin_size`](Self::from_origin_size) with a zero size for a
    /// rectangle that contains nothing.
    pub const ZERO: Self = Self::new(0, 0, 0, 0);

    /// Width in pixels, counting both edges.
    #[inline]
    pub fn width(&self) -> i32 {
        i32::from(self.x_max) - i32::from(self.x_min) + 1
    }

    /// Height in pixels, counting both edges.
    #[inline]
    pub fn height(&self) -> i32 {
        i32::from(self.y_max) - i32::from(self.y_min) + 1
    }

    /// Check whether the point lies inside the rectangle, edges included.
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= i32::from(self.x_min)
            && x <= i32::from(self.x_max)
            && y >= i32::from(self.y_min)
            && y <= i32::from(self.y_max)
    }

    /// Check whether two rectangles share at least one pixel.
    pub fn intersects(&self, other: &Rectangle) -> bool {
        self.intersect(other).is_some()
    }

    /// Compute the overlapping region of two rectangles.
    pub fn intersect(&self, other: &Rectangle) -> Option<Rectangle> {
        let x_min = self.x_min.max(other.x_min);
        let y_min = self.y_min.max(other.y_min);
        let x_max = self.x_max.min(other.x_max);
        let y_max = self.y_max.min(other.y_max);

        if x_min <= x_max && y_min <= y_max {
            Some(Rectangle::new(x_min, y_min, x_max, y_max))
        } else {
            None
        }
    }
}
