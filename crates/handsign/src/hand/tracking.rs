//! Hand tracking across video frames.
//!
//! Running the palm detector on every frame is expensive, so the [`HandTracker`] only uses it to
//! find new hands. Once a hand is found, its region of interest (RoI) is derived from the
//! landmarks of the previous frame, and only the landmark network is run on it. A hand is dropped
//! when the landmark network's presence score falls below the confidence threshold.

use std::{
    path::Path,
    time::{Duration, Instant},
};

use crate::{
    detection::Detection,
    image::{AspectRatio, Image, ImageView, Rect, Resolution},
    landmark::Landmark,
    provider::LandmarkProvider,
    timer::Timer,
};

use super::{
    detection::PalmDetector,
    landmark::{HandLandmarker, LandmarkResult},
    Hand,
};

/// Amount by which a palm detection is enlarged to cover the whole hand.
const PALM_TO_HAND_SCALE: f32 = 2.6;
/// Fraction of the palm's height by which the RoI is moved towards the fingers.
const PALM_SHIFT: f32 = 0.5;
/// Margin added to each side of the landmark bounding box for the next frame's RoI.
const LANDMARK_ROI_MARGIN: f32 = 0.3;
/// RoIs overlapping more than this are considered to contain the same hand.
const SAME_HAND_IOU: f32 = 0.5;

/// A [`LandmarkProvider`] that finds and tracks hands with the MediaPipe hand networks.
pub struct HandTracker {
    detector: PalmDetector,
    landmarker: HandLandmarker,
    max_hands: usize,
    min_confidence: f32,
    redetect_interval: Duration,
    last_detection: Option<Instant>,
    rois: Vec<Rect>,
    t_total: Timer,
}

impl HandTracker {
    pub const DEFAULT_MAX_HANDS: usize = 2;
    pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.7;
    pub const DEFAULT_REDETECT_INTERVAL: Duration = Duration::from_millis(300);

    /// Loads the palm detection and hand landmark networks from ONNX files.
    pub fn load<P, L>(palm_model: P, landmark_model: L) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
        L: AsRef<Path>,
    {
        let detector = PalmDetector::load(palm_model)?;
        let landmarker = HandLandmarker::load(landmark_model)?;
        log::debug!(
            "loaded hand networks (palm detection at {}, landmarks at {})",
            detector.input_resolution(),
            landmarker.input_resolution(),
        );
        Ok(Self::new(detector, landmarker))
    }

    pub fn new(detector: PalmDetector, landmarker: HandLandmarker) -> Self {
        let mut this = Self {
            detector,
            landmarker,
            max_hands: Self::DEFAULT_MAX_HANDS,
            min_confidence: Self::DEFAULT_MIN_CONFIDENCE,
            redetect_interval: Self::DEFAULT_REDETECT_INTERVAL,
            last_detection: None,
            rois: Vec::new(),
            t_total: Timer::new("track"),
        };
        this.set_min_confidence(Self::DEFAULT_MIN_CONFIDENCE);
        this
    }

    /// Sets the maximum number of hands to track at the same time.
    pub fn set_max_hands(&mut self, max_hands: usize) {
        self.max_hands = max_hands;
        self.rois.truncate(max_hands);
    }

    /// Sets the minimum palm detection and landmark presence confidence.
    pub fn set_min_confidence(&mut self, min_confidence: f32) {
        self.min_confidence = min_confidence;
        self.detector.set_threshold(min_confidence);
    }

    /// Sets how often the palm detector looks for new hands while some are already tracked.
    pub fn set_redetect_interval(&mut self, interval: Duration) {
        self.redetect_interval = interval;
    }

    /// Returns the number of hands currently being tracked.
    pub fn tracked_hands(&self) -> usize {
        self.rois.len()
    }

    fn should_detect(&self) -> bool {
        if self.rois.len() >= self.max_hands {
            return false;
        }
        if self.rois.is_empty() {
            return true;
        }
        self.last_detection
            .map_or(true, |t| t.elapsed() >= self.redetect_interval)
    }

    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_total]
            .into_iter()
            .chain(self.detector.timers())
            .chain(self.landmarker.timers())
    }
}

impl LandmarkProvider for HandTracker {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Vec<Hand>> {
        let _guard = self.t_total.start();

        if self.should_detect() {
            self.last_detection = Some(Instant::now());
            for det in self.detector.detect(image)? {
                if self.rois.len() >= self.max_hands {
                    break;
                }
                let roi = roi_from_detection(&det);
                if !overlaps_any(&self.rois, &roi) {
                    log::trace!("new hand at {:?}", roi);
                    self.rois.push(roi);
                }
            }
        }

        let input_res = self.landmarker.input_resolution();
        let aspect = input_res.aspect_ratio().unwrap_or(AspectRatio::SQUARE);
        let mut hands = Vec::with_capacity(self.rois.len());
        let mut next_rois = Vec::with_capacity(self.rois.len());
        for roi in &self.rois {
            let view = image.view(roi.grow_to_fit_aspect(aspect));
            let result = self.landmarker.estimate(view)?;
            if result.presence() < self.min_confidence {
                log::trace!("lost hand at {:?} (presence {:.2})", roi, result.presence());
                continue;
            }

            let hand = to_hand(&result, &view, input_res, image.resolution());
            let Some(next) = roi_from_landmarks(&result, &view, input_res) else {
                continue;
            };
            if overlaps_any(&next_rois, &next) {
                continue;
            }
            next_rois.push(next);
            hands.push(hand);
        }
        self.rois = next_rois;

        Ok(hands)
    }
}

fn overlaps_any(rois: &[Rect], roi: &Rect) -> bool {
    rois.iter().any(|other| other.iou(roi) > SAME_HAND_IOU)
}

/// Computes a square RoI covering the whole hand from a palm detection.
///
/// The RoI is moved along the detection's angle, towards the fingers.
fn roi_from_detection(det: &Detection) -> Rect {
    let rect = det.bounding_rect();
    let angle = det.angle();
    let (dx, dy) = (angle.sin(), -angle.cos());

    let shift = PALM_SHIFT * rect.height();
    let size = rect.width().max(rect.height()) * PALM_TO_HAND_SCALE;
    Rect::from_center(
        rect.x_center() + dx * shift,
        rect.y_center() + dy * shift,
        size,
        size,
    )
}

/// Computes the RoI for the next frame from the landmarks found in `view`.
fn roi_from_landmarks(
    result: &LandmarkResult,
    view: &ImageView<'_>,
    input_res: Resolution,
) -> Option<Rect> {
    let points = result
        .positions()
        .iter()
        .map(|&[x, y, _]| view.transform_out(input_res, x, y));
    let rect = Rect::bounding(points)?;
    Some(
        rect.grow_to_fit_aspect(AspectRatio::SQUARE)
            .grow_rel(LANDMARK_ROI_MARGIN),
    )
}

/// Converts landmarks from network input coordinates into a [`Hand`] normalized to the image.
fn to_hand(
    result: &LandmarkResult,
    view: &ImageView<'_>,
    input_res: Resolution,
    image_res: Resolution,
) -> Hand {
    let (img_w, img_h) = (image_res.width() as f32, image_res.height() as f32);
    // Depth uses the same scale as X.
    let z_scale = view.rect().width() / input_res.width() as f32 / img_w;
    let landmarks = result.positions().map(|[x, y, z]| {
        let [x, y] = view.transform_out(input_res, x, y);
        Landmark::new(x / img_w, y / img_h).with_z(z * z_scale)
    });
    Hand::from_array(landmarks)
        .with_handedness(result.handedness())
        .with_confidence(result.presence())
}
