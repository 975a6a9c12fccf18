//! Non-Maximum Suppression and Averaging.
//!
//! The palm detector produces many overlapping detections for every visible hand. Non-Maximum
//! Suppression (NMS) filters these duplicates out, leaving a single detection per hand.
//!
//! Two variants are implemented, selected with [`SuppressionMode`]: classic suppression, which
//! drops every overlapping detection with lower confidence ([`SuppressionMode::Remove`]), and
//! averaging, which merges overlapping detections into their confidence-weighted mean
//! ([`SuppressionMode::Average`]). Averaging reduces jitter between frames and is the default.

use itertools::Itertools;

use crate::{image::Rect, num::TotalF32};

use super::{Detection, Keypoint};

/// A non-maximum suppression algorithm.
pub struct NonMaxSuppression {
    iou_thresh: f32,
    avg_buf: Vec<Detection>,
    out_buf: Vec<Detection>,
    mode: SuppressionMode,
}

impl NonMaxSuppression {
    /// The default intersection-over-union threshold used to determine if two detections overlap.
    pub const DEFAULT_IOU_THRESH: f32 = 0.3;

    /// Creates a new non-maximum suppressor using [`SuppressionMode::Average`].
    pub fn new() -> Self {
        Self {
            iou_thresh: Self::DEFAULT_IOU_THRESH,
            avg_buf: Vec::new(),
            out_buf: Vec::new(),
            mode: SuppressionMode::Average,
        }
    }

    /// Sets the intersection-over-union threshold to consider two detections as overlapping.
    pub fn set_iou_thresh(&mut self, iou_thresh: f32) {
        self.iou_thresh = iou_thresh;
    }

    pub fn set_mode(&mut self, mode: SuppressionMode) {
        self.mode = mode;
    }

    /// Performs non-maximum suppression on `detections`.
    ///
    /// `detections` is drained in the process. The filtered detections are returned in order of
    /// descending confidence.
    pub fn process(
        &mut self,
        detections: &mut Vec<Detection>,
    ) -> impl Iterator<Item = Detection> + '_ {
        self.out_buf.clear();

        // Sort by ascending confidence, process highest confidence first by starting at the back.
        detections.sort_unstable_by_key(|det| TotalF32(det.confidence()));

        while let Some(seed) = detections.pop() {
            match self.mode {
                SuppressionMode::Remove => {
                    let iou_thresh = self.iou_thresh;
                    detections.retain(|other| {
                        seed.bounding_rect().iou(&other.bounding_rect()) < iou_thresh
                    });
                    self.out_buf.push(seed);
                }
                SuppressionMode::Average => {
                    self.avg_buf.clear();
                    let iou_thresh = self.iou_thresh;
                    let mut i = 0;
                    while i < detections.len() {
                        if seed.bounding_rect().iou(&detections[i].bounding_rect()) >= iou_thresh {
                            self.avg_buf.push(detections.swap_remove(i));
                        } else {
                            i += 1;
                        }
                    }
                    // `swap_remove` shuffles the remaining detections, restore the order.
                    detections.sort_unstable_by_key(|det| TotalF32(det.confidence()));

                    self.avg_buf.push(seed);
                    let averaged = average(&self.avg_buf);
                    self.out_buf.push(averaged);
                }
            }
        }

        self.avg_buf.clear();
        self.out_buf.drain(..)
    }
}

/// Computes the confidence-weighted average of overlapping detections.
///
/// The last detection in `group` is the seed; its confidence becomes the result's confidence.
fn average(group: &[Detection]) -> Detection {
    let seed = &group[group.len() - 1];
    let keypoint_count = seed.keypoints().len();

    let mut keypoints = vec![Keypoint::new(0.0, 0.0); keypoint_count];
    let (mut x, mut y, mut w, mut h, mut angle) = (0.0, 0.0, 0.0, 0.0, 0.0);
    let mut divisor = 0.0;
    for det in group {
        let factor = det.confidence();
        divisor += factor;
        for (acc, kp) in keypoints.iter_mut().zip_eq(det.keypoints()) {
            acc.x += kp.x * factor;
            acc.y += kp.y * factor;
        }
        let rect = det.bounding_rect();
        x += rect.x_center() * factor;
        y += rect.y_center() * factor;
        w += rect.width() * factor;
        h += rect.height() * factor;
        angle += det.angle() * factor;
    }

    for kp in &mut keypoints {
        kp.x /= divisor;
        kp.y /= divisor;
    }

    let rect = Rect::from_center(x / divisor, y / divisor, w / divisor, h / divisor);
    let mut acc = Detection::with_keypoints(seed.confidence(), rect, keypoints);
    acc.set_angle(angle / divisor);
    acc
}

impl Default for NonMaxSuppression {
    fn default() -> Self {
        Self::new()
    }
}

/// Describes how [`NonMaxSuppression`] should deal with overlapping detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressionMode {
    /// Remove overlapping detections, only retain the detection with highest confidence score.
    Remove,

    /// Compute a confidence-weighted average of overlapping detections.
    Average,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nms_suppresses_non_maximum() {
        let mut nms = NonMaxSuppression::new();
        nms.set_mode(SuppressionMode::Remove);

        let rect = Rect::from_center(0.0, 0.0, 1.0, 1.0);
        let a = Detection::new(0.6, rect);
        let b = Detection::new(0.55, rect.scale(1.5));
        let detections = nms.process(&mut vec![b, a]).collect::<Vec<_>>();
        assert_eq!(detections.len(), 1);

        let d = &detections[0];
        assert_eq!(d.confidence(), 0.6);
        assert_eq!(d.bounding_rect(), rect);
    }

    #[test]
    fn nms_ignores_nonoverlapping() {
        let mut nms = NonMaxSuppression::new();
        nms.set_mode(SuppressionMode::Remove);

        let a = Detection::new(0.8, Rect::from_center(0.0, 0.0, 1.0, 1.0));
        let b = Detection::new(0.9, Rect::from_center(5.0, 0.0, 1.0, 1.0));

        let detections = nms.process(&mut vec![a, b]).collect::<Vec<_>>();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].confidence(), 0.9);
    }

    #[test]
    fn nma_averages_detections() {
        let mut nms = NonMaxSuppression::new();
        nms.set_iou_thresh(0.0);

        let rect = Rect::from_center(-1.0, 3.0, 1.0, 1.0);
        let a = Detection::with_keypoints(1.0, rect, vec![Keypoint::new(0.0, 0.0)]);
        let b = Detection::with_keypoints(0.5, rect.scale(4.0), vec![Keypoint::new(3.0, 3.0)]);
        let detections = nms.process(&mut vec![a, b]).collect::<Vec<_>>();
        assert_eq!(detections.len(), 1);

        let d = &detections[0];
        let rect = d.bounding_rect();
        assert_eq!(d.confidence(), 1.0);
        assert_eq!(rect.center(), [-1.0, 3.0]);
        assert_eq!(rect.width(), 2.0);
        assert_eq!(rect.height(), 2.0);
        assert_eq!(d.keypoints(), &[Keypoint::new(1.0, 1.0)]);
    }
}
