//! Hand landmark prediction.

use std::path::Path;

use anyhow::bail;
use itertools::Itertools;

use crate::{
    image::{ImageView, Resolution},
    nn::{Cnn, CnnInputShape, ColorMapper, NeuralNetwork, Outputs},
    timer::Timer,
};

use super::{Hand, Handedness, LandmarkIdx};

/// Landmarks estimated by the [`HandLandmarker`] for a single hand crop.
#[derive(Debug, Clone)]
pub struct LandmarkResult {
    /// `[x, y, z]` positions in the coordinate system of the network input.
    positions: [[f32; 3]; Hand::NUM_LANDMARKS],
    presence: f32,
    raw_handedness: f32,
}

impl LandmarkResult {
    pub fn positions(&self) -> &[[f32; 3]; Hand::NUM_LANDMARKS] {
        &self.positions
    }

    pub fn position(&self, idx: LandmarkIdx) -> [f32; 3] {
        self.positions[idx as usize]
    }

    /// Returns the network's confidence that the input actually contains a hand.
    pub fn presence(&self) -> f32 {
        self.presence
    }

    /// Returns the estimated handedness of the hand in the network input.
    ///
    /// Only meaningful when [`LandmarkResult::presence`] is high.
    pub fn handedness(&self) -> Handedness {
        if self.raw_handedness > 0.5 {
            Handedness::Right
        } else {
            Handedness::Left
        }
    }
}

/// Estimates the 21 hand landmarks in an image crop containing a single hand.
///
/// The crop should be roughly centered on the hand with some margin, like the regions computed
/// by the [`HandTracker`](super::tracking::HandTracker).
pub struct HandLandmarker {
    cnn: Cnn,
    t_infer: Timer,
}

impl HandLandmarker {
    /// Loads the hand landmark network from an ONNX file.
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
            t_infer: Timer::new("landmark infer"),
        }
    }

    pub fn input_resolution(&self) -> Resolution {
        self.cnn.input_resolution()
    }

    /// Runs the network on `view`, which is stretched to the network's input resolution.
    pub fn estimate(&mut self, view: ImageView<'_>) -> anyhow::Result<LandmarkResult> {
        let outputs = self.t_infer.time(|| self.cnn.estimate(&view))?;
        extract(&outputs)
    }

    pub fn timers(&self) -> impl IntoIterator<Item = &Timer> + '_ {
        [&self.t_infer]
    }
}

pub(super) fn extract(outputs: &Outputs) -> anyhow::Result<LandmarkResult> {
    outputs.expect_at_least(3)?;
    let screen_landmarks = &outputs[0];
    let presence = &outputs[1];
    let handedness = &outputs[2];

    if screen_landmarks.shape() != [1, 3 * Hand::NUM_LANDMARKS]
        || presence.shape() != [1, 1]
        || handedness.shape() != [1, 1]
    {
        bail!(
            "unexpected hand landmark output shapes {:?}, {:?}, {:?}",
            screen_landmarks.shape(),
            presence.shape(),
            handedness.shape(),
        );
    }

    let mut positions = [[0.0; 3]; Hand::NUM_LANDMARKS];
    for (out, xyz) in positions
        .iter_mut()
        .zip_eq(screen_landmarks.as_slice().chunks_exact(3))
    {
        out.copy_from_slice(xyz);
    }

    Ok(LandmarkResult {
        positions,
        presence: presence.as_slice()[0],
        raw_handedness: handedness.as_slice()[0],
    })
}

#[cfg(test)]
mod tests {
    use crate::nn::tensor::Tensor;

    use super::*;

    fn outputs(landmark_values: usize, presence: f32, handedness: f32) -> Outputs {
        Outputs::from(vec![
            Tensor::from_iter(&[1, landmark_values], (0..landmark_values).map(|i| i as f32)),
            Tensor::from_iter(&[1, 1], [presence]),
            Tensor::from_iter(&[1, 1], [handedness]),
        ])
    }

    #[test]
    fn extracts_landmarks() {
        let res = extract(&outputs(63, 0.9, 0.8)).unwrap();
        assert_eq!(res.presence(), 0.9);
        assert_eq!(res.handedness(), Handedness::Right);
        assert_eq!(res.position(LandmarkIdx::Wrist), [0.0, 1.0, 2.0]);
        assert_eq!(res.position(LandmarkIdx::PinkyTip), [60.0, 61.0, 62.0]);

        let res = extract(&outputs(63, 0.1, 0.2)).unwrap();
        assert_eq!(res.handedness(), Handedness::Left);
    }

    #[test]
    fn rejects_wrong_shapes() {
        assert!(extract(&outputs(60, 0.9, 0.8)).is_err());
        assert!(extract(&Outputs::from(Vec::new())).is_err());
    }
}
