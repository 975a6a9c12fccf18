//! Palm detection.

use std::path::Path;

use anyhow::bail;
use nalgebra::{Point2, Rotation2, Vector2};

use crate::{
    detection::{
        nms::NonMaxSuppression,
        ssd::{Anchor, Anchors, LayerInfo},
        Detection, Keypoint,
    },
    image::{AspectRatio, Image, Rect, Resolution},
    nn::{tensor::Tensor, Cnn, CnnInputShape, ColorMapper, NeuralNetwork},
    num::sigmoid,
    timer::Timer,
};

/// A keypoint of a palm [`Detection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PalmKeypoint {
    Wrist = 0,
    IndexFingerMcp = 1,
    MiddleFingerMcp = 2,
    RingFingerMcp = 3,
    PinkyMcp = 4,
    ThumbCmc = 5,
    ThumbMcp = 6,
}

const NUM_KEYPOINTS: usize = 7;
/// 4 bounding box parameters followed by the keypoint coordinates.
const BOX_PARAMS: usize = 4 + 2 * NUM_KEYPOINTS;

/// Finds palms in images using the MediaPipe palm detection network.
///
/// Both the lite and the full variant of the network share the same input and output layout.
/// Palms are much easier to find than whole hands, so the detections are only used as a starting
/// point for the [`HandLandmarker`](super::landmark::HandLandmarker).
pub struct PalmDetector {
    cnn: Cnn,
    anchors: Anchors,
    nms: NonMaxSuppression,
    thresh: f32,
    raw: Vec<Detection>,
    t_infer: Timer,
    t_nms: Timer,
}

impl PalmDetector {
    pub const DEFAULT_THRESHOLD: f32 = 0.5;

    /// Loads the palm detection network from an ONNX file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let cnn = Cnn::new(
            NeuralNetwork::load(path)?,
            CnnInputShape::NCHW,
            ColorMapper::linear(0.0..=1.0),
        )?;
        Ok(Self::new(cnn))
    }

    pub fn new(cnn: Cnn) -> Self {
        Self {
            cnn,
            anchors: Anchors::calculate(&[LayerInfo::new(2, 24, 24), LayerInfo::new(6, 12, 12)]),
            nms: NonMaxSuppression::new(),
            thresh: Self::DEFAULT_THRESHOLD,
            raw: Vec::new(),
            t_infer: Timer::new("palm infer"),
            t_nms: Timer::new("palm nms"),
        }
    }

    /// Sets the minimum confidence of reported detections.
    pub fn set_threshold(&mut self, thresh: f32) {
        self.thresh = thresh;
    }

    pub fn input_resolution(&self) -> Resolution {
        self.cnn.input_resolution()
    }

    /// Detects palms in `image`.
    ///
    /// The image is padded to the network's square input shape, so that hands near the edges are
    /// still found. Returned detections are in `image` pixel coordinates, ordered by descending
    /// confidence.
    pub fn detect(&mut self, image: &Image) -> anyhow::Result<Vec<Detection>> {
        let input_res = self.cnn.input_resolution();
        let view = image.view(image.rect().grow_to_fit_aspect(
            input_res.aspect_ratio().unwrap_or(AspectRatio::SQUARE),
        ));

        let outputs = self.t_infer.time(|| self.cnn.estimate(&view))?;
        outputs.expect_at_least(2)?;

        self.raw.clear();
        decode(
            &self.anchors,
            input_res,
            &outputs[0],
            &outputs[1],
            self.thresh,
            &mut self.raw,
        )?;
        for det in &mut self.raw {
            det.map_positions(|[x, y]| view.transform_out(input_res, x, y));
        }

        let _guard = self.t_nms.start();
        Ok(self.nms.process(&mut self.raw).collect())
    }

    pub fn timers(&self) -> impl IntoIterator<Item = &Timer> + '_ {
        [&self.t_infer, &self.t_nms]
    }
}

/// Decodes the box and score tensors into detections in network input coordinates.
fn decode(
    anchors: &Anchors,
    input_res: Resolution,
    boxes: &Tensor,
    scores: &Tensor,
    thresh: f32,
    out: &mut Vec<Detection>,
) -> anyhow::Result<()> {
    let count = anchors.anchor_count();
    if boxes.shape() != [1, count, BOX_PARAMS] || scores.shape() != [1, count, 1] {
        bail!(
            "unexpected palm detection output shapes {:?} and {:?} (expected [1, {count}, {BOX_PARAMS}] and [1, {count}, 1])",
            boxes.shape(),
            scores.shape(),
        );
    }

    for (index, &score) in scores.as_slice().iter().enumerate() {
        let confidence = sigmoid(score);
        if confidence < thresh {
            continue;
        }

        out.push(extract_detection(
            &anchors[index],
            input_res,
            boxes.index([0, index]),
            confidence,
        ));
    }
    Ok(())
}

fn extract_detection(
    anchor: &Anchor,
    input_res: Resolution,
    params: &[f32],
    confidence: f32,
) -> Detection {
    let input_w = input_res.width() as f32;
    let input_h = input_res.height() as f32;
    let offset = |x: f32, y: f32| {
        [
            x + anchor.x_center() * input_w,
            y + anchor.y_center() * input_h,
        ]
    };

    let [xc, yc] = offset(params[0], params[1]);
    let keypoints = params[4..BOX_PARAMS]
        .chunks_exact(2)
        .map(|kp| {
            let [x, y] = offset(kp[0], kp[1]);
            Keypoint::new(x, y)
        })
        .collect::<Vec<_>>();

    let point = |kp: PalmKeypoint| {
        let kp = keypoints[kp as usize];
        Point2::new(kp.x(), kp.y())
    };
    let rel = point(PalmKeypoint::Wrist) - point(PalmKeypoint::MiddleFingerMcp);
    // Coincident keypoints have no direction, treat the palm as upright.
    let angle = if rel.norm() > f32::EPSILON {
        Rotation2::rotation_between(&Vector2::y(), &rel).angle()
    } else {
        0.0
    };

    let mut det = Detection::with_keypoints(
        confidence,
        Rect::from_center(xc, yc, params[2], params[3]),
        keypoints,
    );
    det.set_angle(angle);
    det
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use approx::assert_relative_eq;

    use super::*;

    fn anchors() -> Anchors {
        Anchors::calculate(&[LayerInfo::new(2, 24, 24), LayerInfo::new(6, 12, 12)])
    }

    #[test]
    fn extracts_upright_palm() {
        let anchor = anchors()[0];
        let mut params = [0.0; BOX_PARAMS];
        params[2] = 20.0;
        params[3] = 30.0;
        // Wrist below the middle finger knuckle.
        params[4 + 2 * PalmKeypoint::Wrist as usize + 1] = 10.0;
        params[4 + 2 * PalmKeypoint::MiddleFingerMcp as usize + 1] = -10.0;

        let det = extract_detection(&anchor, Resolution::new(192, 192), &params, 0.9);
        // The first anchor sits in the center of the top left cell of the 24x24 grid.
        let rect = det.bounding_rect();
        assert_relative_eq!(rect.x_center(), 4.0);
        assert_relative_eq!(rect.y_center(), 4.0);
        assert_relative_eq!(rect.width(), 20.0);
        assert_relative_eq!(rect.height(), 30.0);
        assert_eq!(det.keypoints().len(), NUM_KEYPOINTS);
        assert_relative_eq!(det.keypoints()[0].y(), 14.0);
        assert_relative_eq!(det.angle(), 0.0);
    }

    #[test]
    fn palm_angle() {
        let anchor = anchors()[0];
        let mut params = [0.0; BOX_PARAMS];
        params[2] = 20.0;
        params[3] = 20.0;
        // Fingers pointing right.
        params[4 + 2 * PalmKeypoint::Wrist as usize] = -10.0;
        params[4 + 2 * PalmKeypoint::MiddleFingerMcp as usize] = 10.0;
        let det = extract_detection(&anchor, Resolution::new(192, 192), &params, 0.9);
        assert_relative_eq!(det.angle(), FRAC_PI_2, epsilon = 1e-5);

        // Fingers pointing left.
        params[4 + 2 * PalmKeypoint::Wrist as usize] = 10.0;
        params[4 + 2 * PalmKeypoint::MiddleFingerMcp as usize] = -10.0;
        let det = extract_detection(&anchor, Resolution::new(192, 192), &params, 0.9);
        assert_relative_eq!(det.angle(), -FRAC_PI_2, epsilon = 1e-5);

        // Coincident keypoints.
        let params = [0.0; BOX_PARAMS];
        let det = extract_detection(&anchor, Resolution::new(192, 192), &params, 0.9);
        assert_eq!(det.angle(), 0.0);
    }

    #[test]
    fn decode_filters_by_score() {
        let anchors = anchors();
        let count = anchors.anchor_count();
        let boxes = Tensor::from_iter(&[1, count, BOX_PARAMS], vec![0.0; count * BOX_PARAMS]);
        let scores = Tensor::from_iter(
            &[1, count, 1],
            (0..count).map(|i| if i == 100 || i == 2015 { 5.0 } else { -5.0 }),
        );

        let mut out = Vec::new();
        decode(&anchors, Resolution::new(192, 192), &boxes, &scores, 0.5, &mut out).unwrap();
        assert_eq!(out.len(), 2);
        assert_relative_eq!(out[0].confidence(), sigmoid(5.0));
        assert_eq!(
            out[1].bounding_rect().center(),
            [
                anchors[2015].x_center() * 192.0,
                anchors[2015].y_center() * 192.0,
            ]
        );
    }

    #[test]
    fn decode_rejects_wrong_shape() {
        let boxes = Tensor::from_iter(&[1, 1, BOX_PARAMS], vec![0.0; BOX_PARAMS]);
        let scores = Tensor::from_iter(&[1, 1, 1], [0.0]);
        let err = decode(
            &anchors(),
            Resolution::new(192, 192),
            &boxes,
            &scores,
            0.5,
            &mut Vec::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("output shapes"), "{err}");
    }
}
