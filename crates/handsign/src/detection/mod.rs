//! Object detection building blocks shared by the palm detector.

pub mod nms;
pub mod ssd;

use crate::image::{draw, Color, Image, Rect};

/// A detected object, with a bounding box, confidence score and keypoints.
///
/// Positions are in the coordinate system of the image the detector was run on.
#[derive(Debug, Clone)]
pub struct Detection {
    confidence: f32,
    rect: Rect,
    angle: f32,
    keypoints: Vec<Keypoint>,
}

impl Detection {
    pub fn new(confidence: f32, rect: Rect) -> Self {
        Self::with_keypoints(confidence, rect, Vec::new())
    }

    pub fn with_keypoints(confidence: f32, rect: Rect, keypoints: Vec<Keypoint>) -> Self {
        Self {
            confidence,
            rect,
            angle: 0.0,
            keypoints,
        }
    }

    /// Returns the detection's confidence score, in range `0.0..=1.0`.
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn bounding_rect(&self) -> Rect {
        self.rect
    }

    pub fn set_bounding_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    /// Returns the clockwise rotation of the detected object, in radians.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn set_angle(&mut self, angle: f32) {
        self.angle = angle;
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn keypoints_mut(&mut self) -> &mut Vec<Keypoint> {
        &mut self.keypoints
    }

    /// Applies `f` to the bounding rectangle and to every keypoint position.
    ///
    /// Used to move detections from network input coordinates into image coordinates.
    pub fn map_positions(&mut self, f: impl Fn([f32; 2]) -> [f32; 2]) {
        let [x0, y0] = f([self.rect.x(), self.rect.y()]);
        let [x1, y1] = f([
            self.rect.x() + self.rect.width(),
            self.rect.y() + self.rect.height(),
        ]);
        self.rect = Rect::from_top_left(x0, y0, x1 - x0, y1 - y0);
        for kp in &mut self.keypoints {
            [kp.x, kp.y] = f([kp.x, kp.y]);
        }
    }

    /// Draws the bounding box, keypoints and confidence onto an image.
    pub fn draw(&self, image: &mut Image) {
        draw::rect(image, self.rect).color(Color::YELLOW);
        for kp in &self.keypoints {
            draw::marker(image, kp.x, kp.y).color(Color::YELLOW);
        }
        let label = format!("{:.2}", self.confidence);
        draw::text(image, self.rect.x_center(), self.rect.y(), &label)
            .align_top()
            .color(Color::YELLOW);
    }
}

/// A 2D point of interest that is part of a [`Detection`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    x: f32,
    y: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }
}
