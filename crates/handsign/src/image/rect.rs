use std::fmt;

use super::AspectRatio;

/// An axis-aligned rectangle in pixel coordinates.
///
/// Coordinates are `f32` so that network outputs can be represented without rounding. Conversion
/// to integer pixel positions happens only when sampling or drawing.
#[derive(Clone, Copy, PartialEq)]
pub struct Rect {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
}

impl Rect {
    /// Constructs a [`Rect`] from its center and size.
    pub fn from_center(x_center: f32, y_center: f32, width: f32, height: f32) -> Self {
        Self {
            x: x_center - width / 2.0,
            y: y_center - height / 2.0,
            w: width,
            h: height,
        }
    }

    /// Constructs a [`Rect`] from its top-left corner and size.
    pub fn from_top_left(top_left_x: f32, top_left_y: f32, width: f32, height: f32) -> Self {
        Self {
            x: top_left_x,
            y: top_left_y,
            w: width,
            h: height,
        }
    }

    /// Computes the smallest rectangle containing all `points`.
    ///
    /// Returns [`None`] if `points` is empty.
    pub fn bounding<I: IntoIterator<Item = [f32; 2]>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let [x, y] = iter.next()?;
        let (mut min, mut max) = ([x, y], [x, y]);
        for [x, y] in iter {
            min = [min[0].min(x), min[1].min(y)];
            max = [max[0].max(x), max[1].max(y)];
        }

        Some(Self::from_top_left(
            min[0],
            min[1],
            max[0] - min[0],
            max[1] - min[1],
        ))
    }

    /// Scales width and height by `scale`, keeping the center in place.
    #[must_use]
    pub fn scale(&self, scale: f32) -> Self {
        self.resize(self.w * scale, self.h * scale)
    }

    /// Grows this rectangle by adding a margin relative to width and height.
    ///
    /// `amount` is the relative amount of the rectangle's width and height to add to *each* side.
    #[must_use]
    pub fn grow_rel(&self, amount: f32) -> Self {
        self.resize(self.w * (1.0 + 2.0 * amount), self.h * (1.0 + 2.0 * amount))
    }

    /// Symmetrically extends one dimension of `self` so that the result has the given aspect ratio.
    #[must_use]
    pub fn grow_to_fit_aspect(&self, target_aspect: AspectRatio) -> Self {
        let target_width = self.h * target_aspect.as_f32();
        if target_width >= self.w {
            self.resize(target_width, self.h)
        } else {
            self.resize(self.w, self.w / target_aspect.as_f32())
        }
    }

    fn resize(&self, width: f32, height: f32) -> Self {
        let [xc, yc] = self.center();
        Self::from_center(xc, yc, width, height)
    }

    /// Moves the rectangle by an offset.
    #[must_use]
    pub fn move_by(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.w
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.h
    }

    pub fn x_center(&self) -> f32 {
        self.x + self.w / 2.0
    }

    pub fn y_center(&self) -> f32 {
        self.y + self.h / 2.0
    }

    pub fn center(&self) -> [f32; 2] {
        [self.x_center(), self.y_center()]
    }

    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    /// Computes the overlapping area of `self` and `other`, or [`None`] if they are disjoint.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x_min = self.x.max(other.x);
        let y_min = self.y.max(other.y);
        let x_max = (self.x + self.w).min(other.x + other.w);
        let y_max = (self.y + self.h).min(other.y + other.h);
        if x_min > x_max || y_min > y_max {
            return None;
        }

        Some(Rect::from_top_left(x_min, y_min, x_max - x_min, y_max - y_min))
    }

    /// Computes the Intersection over Union (IOU) of `self` and `other`.
    ///
    /// Returns 0.0 if both rectangles are empty.
    pub fn iou(&self, other: &Self) -> f32 {
        let intersection = self.intersection(other).map_or(0.0, |rect| rect.area());
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        self.x <= x && self.y <= y && self.x + self.w >= x && self.y + self.h >= y
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect @ ({},{})/{}x{}",
            self.x, self.y, self.w, self.h
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn bounding_rect() {
        assert_eq!(Rect::bounding([]), None);
        let rect = Rect::bounding([[1.0, 5.0], [3.0, 2.0], [2.0, 4.0]]).unwrap();
        assert_eq!(rect, Rect::from_top_left(1.0, 2.0, 2.0, 3.0));
    }

    #[test]
    fn grow_keeps_center() {
        let rect = Rect::from_center(10.0, 20.0, 4.0, 2.0);
        let grown = rect.grow_rel(0.5);
        assert_eq!(grown.center(), [10.0, 20.0]);
        assert_eq!(grown.width(), 8.0);
        assert_eq!(grown.height(), 4.0);

        let square = rect.grow_to_fit_aspect(AspectRatio::SQUARE);
        assert_eq!(square, Rect::from_center(10.0, 20.0, 4.0, 4.0));
    }

    #[test]
    fn iou() {
        let a = Rect::from_top_left(0.0, 0.0, 2.0, 2.0);
        let b = Rect::from_top_left(1.0, 0.0, 2.0, 2.0);
        assert_relative_eq!(a.iou(&b), 2.0 / 6.0);
        assert_eq!(a.iou(&a), 1.0);
        assert_eq!(a.iou(&a.move_by(5.0, 5.0)), 0.0);
    }

    #[test]
    fn contains() {
        let rect = Rect::from_top_left(0.0, 0.0, 1.0, 1.0);
        assert!(rect.contains_point(0.5, 1.0));
        assert!(!rect.contains_point(1.5, 0.5));
    }
}
