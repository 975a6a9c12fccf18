//! Normalized landmark positions.

use serde::{Deserialize, Serialize};

/// A single landmark position produced by a hand landmark network.
///
/// `x` and `y` are normalized to the image frame: `(0, 0)` is the top-left corner, `(1, 1)` the
/// bottom-right corner, and Y increases downwards. Values slightly outside of `0.0..=1.0` occur
/// when a hand is partially out of frame.
///
/// `z` is the depth relative to the wrist, in roughly the same scale as `x`. The optional
/// visibility and presence scores are reported by some providers and are carried along unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    x: f32,
    y: f32,
    #[serde(default)]
    z: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    visibility: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    presence: Option<f32>,
}

impl Landmark {
    /// Creates a landmark at the given normalized image position, with a depth of 0.
    pub const fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility: None,
            presence: None,
        }
    }

    #[must_use]
    pub fn with_z(self, z: f32) -> Self {
        Self { z, ..self }
    }

    #[must_use]
    pub fn with_visibility(self, visibility: f32) -> Self {
        Self {
            visibility: Some(visibility),
            ..self
        }
    }

    #[must_use]
    pub fn with_presence(self, presence: f32) -> Self {
        Self {
            presence: Some(presence),
            ..self
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
    pub fn z(&self) -> f32 {
        self.z
    }

    pub fn visibility(&self) -> Option<f32> {
        self.visibility
    }

    pub fn presence(&self) -> Option<f32> {
        self.presence
    }

    /// Returns the planar `[x, y]` position.
    pub fn position(&self) -> [f32; 2] {
        [self.x, self.y]
    }

    /// Computes the planar Euclidean distance to `other`. See [`distance`].
    pub fn distance_to(&self, other: &Landmark) -> f32 {
        distance(self, other)
    }
}

/// Computes the Euclidean distance between the `(x, y)` positions of two landmarks.
///
/// The result is in normalized frame units. Depth (`z`) is ignored. This is symmetric, never
/// negative, and exact for purely horizontal or vertical offsets.
pub fn distance(p: &Landmark, q: &Landmark) -> f32 {
    (p.x - q.x).hypot(p.y - q.y)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Landmark::new(0.1, 0.2);
        let b = Landmark::new(0.4, 0.6);
        assert_relative_eq!(distance(&a, &b), 0.5);
        assert_eq!(distance(&a, &b), distance(&b, &a));
        assert_eq!(distance(&a, &a), 0.0);
    }

    #[test]
    fn distance_ignores_depth() {
        let a = Landmark::new(0.5, 0.5).with_z(-0.3);
        let b = Landmark::new(0.5, 0.5).with_z(0.7);
        assert_eq!(a.distance_to(&b), 0.0);
    }

    #[test]
    fn axis_aligned_distance_is_exact() {
        let a = Landmark::new(0.0, 0.25);
        assert_eq!(distance(&a, &Landmark::new(0.05, 0.25)), 0.05);
        assert_eq!(distance(&a, &Landmark::new(0.0, 0.2999)), 0.2999 - 0.25);
    }

    #[test]
    fn json_defaults() {
        let lm: Landmark = serde_json::from_str(r#"{"x":0.5,"y":0.25}"#).unwrap();
        assert_eq!(lm, Landmark::new(0.5, 0.25));
        assert_eq!(serde_json::to_string(&lm).unwrap(), r#"{"x":0.5,"y":0.25,"z":0.0}"#);
    }
}
