//! Hand skeletons, fingers, and hand tracking.
//!
//! A [`Hand`] is the 21-landmark skeleton of one hand in one frame. Hands are produced by a
//! [`LandmarkProvider`](crate::provider::LandmarkProvider), such as the neural network based
//! [`tracking::HandTracker`], and consumed by the gesture classifier.

pub mod detection;
pub mod landmark;
pub mod tracking;

use std::{fmt, ops::Index};

use serde::{Deserialize, Serialize};

use crate::{
    image::{draw, Color, Image},
    landmark::Landmark,
};

/// Errors produced when constructing a [`Hand`] or selecting a [`Finger`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandError {
    #[error("a hand has exactly {expected} landmarks, got {actual}")]
    LandmarkCount { expected: usize, actual: usize },
    #[error("invalid finger index {0} (fingers are numbered 0 to 4, thumb to pinky)")]
    InvalidFinger(usize),
}

/// Which hand is shown, as reported by the landmark network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

/// The 21 landmarks of a single hand.
///
/// A `Hand` always holds exactly [`Hand::NUM_LANDMARKS`] landmarks, in [`LandmarkIdx`] order.
/// Constructing one from a landmark list of any other length fails with
/// [`HandError::LandmarkCount`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHand", into = "RawHand")]
pub struct Hand {
    landmarks: [Landmark; Hand::NUM_LANDMARKS],
    handedness: Option<Handedness>,
    confidence: Option<f32>,
}

impl Hand {
    pub const NUM_LANDMARKS: usize = 21;

    /// Creates a hand from a list of landmarks in [`LandmarkIdx`] order.
    pub fn new(landmarks: &[Landmark]) -> Result<Self, HandError> {
        let landmarks: [Landmark; Self::NUM_LANDMARKS] =
            landmarks.try_into().map_err(|_| HandError::LandmarkCount {
                expected: Self::NUM_LANDMARKS,
                actual: landmarks.len(),
            })?;
        Ok(Self::from_array(landmarks))
    }

    /// Creates a hand from an array of landmarks in [`LandmarkIdx`] order.
    pub fn from_array(landmarks: [Landmark; Self::NUM_LANDMARKS]) -> Self {
        Self {
            landmarks,
            handedness: None,
            confidence: None,
        }
    }

    #[must_use]
    pub fn with_handedness(self, handedness: Handedness) -> Self {
        Self {
            handedness: Some(handedness),
            ..self
        }
    }

    /// Attaches the provider's confidence that this is a hand, in range `0.0..=1.0`.
    #[must_use]
    pub fn with_confidence(self, confidence: f32) -> Self {
        Self {
            confidence: Some(confidence),
            ..self
        }
    }

    pub fn landmarks(&self) -> &[Landmark; Self::NUM_LANDMARKS] {
        &self.landmarks
    }

    pub fn landmark(&self, idx: LandmarkIdx) -> &Landmark {
        &self.landmarks[idx as usize]
    }

    pub fn handedness(&self) -> Option<Handedness> {
        self.handedness
    }

    pub fn confidence(&self) -> Option<f32> {
        self.confidence
    }

    /// Returns whether `finger` is extended, meaning it points upwards with its joints in order.
    ///
    /// A finger is extended iff `tip.y < middle.y < base.y` (Y points down). The same rule is used
    /// for the thumb, which in practice bends sideways rather than up, so thumb extension is less
    /// reliable than for the other fingers.
    pub fn is_extended(&self, finger: Finger) -> bool {
        let joints = finger.joints();
        let base = self.landmark(joints.base).y();
        let middle = self.landmark(joints.middle).y();
        let tip = self.landmark(joints.tip).y();
        tip < middle && middle < base
    }

    /// Draws the hand skeleton onto `target`, scaling normalized positions to its size.
    pub fn draw(&self, target: &mut Image) {
        let (w, h) = (target.width() as f32, target.height() as f32);
        let px = |idx: LandmarkIdx| {
            let [x, y] = self.landmark(idx).position();
            [x * w, y * h]
        };

        for &(a, b) in CONNECTIVITY {
            draw::line(target, px(a), px(b)).color(Color::WHITE);
        }
        for idx in LandmarkIdx::ALL {
            let [x, y] = px(idx);
            draw::marker(target, x, y).color(Color::RED);
        }
    }
}

impl Index<LandmarkIdx> for Hand {
    type Output = Landmark;

    fn index(&self, idx: LandmarkIdx) -> &Landmark {
        self.landmark(idx)
    }
}

impl TryFrom<Vec<Landmark>> for Hand {
    type Error = HandError;

    fn try_from(landmarks: Vec<Landmark>) -> Result<Self, HandError> {
        Self::new(&landmarks)
    }
}

/// Serialized form of a [`Hand`], validated on deserialization.
#[derive(Serialize, Deserialize)]
struct RawHand {
    landmarks: Vec<Landmark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    handedness: Option<Handedness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    confidence: Option<f32>,
}

impl TryFrom<RawHand> for Hand {
    type Error = HandError;

    fn try_from(raw: RawHand) -> Result<Self, HandError> {
        let mut hand = Hand::new(&raw.landmarks)?;
        hand.handedness = raw.handedness;
        hand.confidence = raw.confidence;
        Ok(hand)
    }
}

impl From<Hand> for RawHand {
    fn from(hand: Hand) -> Self {
        Self {
            landmarks: hand.landmarks.to_vec(),
            handedness: hand.handedness,
            confidence: hand.confidence,
        }
    }
}

/// Names for the hand landmarks, in the order the landmark network outputs them.
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MCP**: [Metacarpophalangeal joint], the lower joint forming the knuckles near the palm of
///   the hand.
/// - **IP**: Interphalangeal joint, the middle joint of the thumb.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: This landmark is just placed on the tip of the finger, above the DIP.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

impl LandmarkIdx {
    /// All landmarks, in network output order.
    pub const ALL: [LandmarkIdx; Hand::NUM_LANDMARKS] = {
        use LandmarkIdx::*;
        [
            Wrist,
            ThumbCmc,
            ThumbMcp,
            ThumbIp,
            ThumbTip,
            IndexFingerMcp,
            IndexFingerPip,
            IndexFingerDip,
            IndexFingerTip,
            MiddleFingerMcp,
            MiddleFingerPip,
            MiddleFingerDip,
            MiddleFingerTip,
            RingFingerMcp,
            RingFingerPip,
            RingFingerDip,
            RingFingerTip,
            PinkyMcp,
            PinkyPip,
            PinkyDip,
            PinkyTip,
        ]
    };
}

/// Pairs of landmarks connected by a bone, used for drawing the skeleton.
pub const CONNECTIVITY: &[(LandmarkIdx, LandmarkIdx)] = {
    use LandmarkIdx::*;
    &[
        // Palm outline:
        (Wrist, ThumbCmc),
        (ThumbCmc, IndexFingerMcp),
        (IndexFingerMcp, MiddleFingerMcp),
        (MiddleFingerMcp, RingFingerMcp),
        (RingFingerMcp, PinkyMcp),
        (PinkyMcp, Wrist),
        // Thumb:
        (ThumbCmc, ThumbMcp),
        (ThumbMcp, ThumbIp),
        (ThumbIp, ThumbTip),
        // Index:
        (IndexFingerMcp, IndexFingerPip),
        (IndexFingerPip, IndexFingerDip),
        (IndexFingerDip, IndexFingerTip),
        // Middle:
        (MiddleFingerMcp, MiddleFingerPip),
        (MiddleFingerPip, MiddleFingerDip),
        (MiddleFingerDip, MiddleFingerTip),
        // Ring:
        (RingFingerMcp, RingFingerPip),
        (RingFingerPip, RingFingerDip),
        (RingFingerDip, RingFingerTip),
        // Pinky:
        (PinkyMcp, PinkyPip),
        (PinkyPip, PinkyDip),
        (PinkyDip, PinkyTip),
    ]
};

/// One of the five fingers of a hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

/// The three joints of a [`Finger`] that decide whether it is extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerJoints {
    /// The knuckle (MCP).
    pub base: LandmarkIdx,
    /// The middle joint (PIP, or IP for the thumb).
    pub middle: LandmarkIdx,
    pub tip: LandmarkIdx,
}

impl Finger {
    /// All fingers, from thumb to pinky.
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    /// Selects a finger by its position in [`Finger::ALL`].
    pub fn from_index(index: usize) -> Result<Self, HandError> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(HandError::InvalidFinger(index))
    }

    /// Returns this finger's position in [`Finger::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn joints(self) -> FingerJoints {
        use LandmarkIdx::*;
        let (base, middle, tip) = match self {
            Finger::Thumb => (ThumbMcp, ThumbIp, ThumbTip),
            Finger::Index => (IndexFingerMcp, IndexFingerPip, IndexFingerTip),
            Finger::Middle => (MiddleFingerMcp, MiddleFingerPip, MiddleFingerTip),
            Finger::Ring => (RingFingerMcp, RingFingerPip, RingFingerTip),
            Finger::Pinky => (PinkyMcp, PinkyPip, PinkyTip),
        };
        FingerJoints { base, middle, tip }
    }

    pub fn name(self) -> &'static str {
        match self {
            Finger::Thumb => "thumb",
            Finger::Index => "index",
            Finger::Middle => "middle",
            Finger::Ring => "ring",
            Finger::Pinky => "pinky",
        }
    }
}

impl fmt::Display for Finger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upright() -> Hand {
        let mut landmarks = [Landmark::new(0.5, 0.9); Hand::NUM_LANDMARKS];
        for (i, finger) in Finger::ALL.into_iter().enumerate() {
            let x = 0.3 + 0.1 * i as f32;
            let joints = finger.joints();
            landmarks[joints.base as usize] = Landmark::new(x, 0.7);
            landmarks[joints.middle as usize] = Landmark::new(x, 0.5);
            landmarks[joints.tip as usize] = Landmark::new(x, 0.3);
        }
        landmarks[LandmarkIdx::MiddleFingerMcp as usize] = Landmark::new(0.5, 0.7);
        Hand::from_array(landmarks)
    }

    #[test]
    fn rejects_wrong_landmark_count() {
        for count in [0, 20, 22] {
            let err = Hand::new(&vec![Landmark::default(); count]).unwrap_err();
            assert_eq!(
                err,
                HandError::LandmarkCount {
                    expected: 21,
                    actual: count
                }
            );
        }
        assert!(Hand::new(&[Landmark::default(); 21]).is_ok());
        assert!(Hand::try_from(vec![Landmark::default(); 21]).is_ok());
    }

    #[test]
    fn landmark_order() {
        assert_eq!(LandmarkIdx::ALL.len(), Hand::NUM_LANDMARKS);
        for (i, idx) in LandmarkIdx::ALL.into_iter().enumerate() {
            assert_eq!(idx as usize, i);
        }
        assert_eq!(LandmarkIdx::ThumbTip as usize, 4);
        assert_eq!(LandmarkIdx::IndexFingerTip as usize, 8);
        assert_eq!(LandmarkIdx::PinkyTip as usize, 20);
    }

    #[test]
    fn finger_selection() {
        for (i, finger) in Finger::ALL.into_iter().enumerate() {
            assert_eq!(Finger::from_index(i), Ok(finger));
            assert_eq!(finger.index(), i);
        }
        assert_eq!(Finger::from_index(5), Err(HandError::InvalidFinger(5)));

        let thumb = Finger::Thumb.joints();
        assert_eq!(
            (thumb.base, thumb.middle, thumb.tip),
            (LandmarkIdx::ThumbMcp, LandmarkIdx::ThumbIp, LandmarkIdx::ThumbTip)
        );
        let ring = Finger::Ring.joints();
        assert_eq!(
            (ring.base, ring.middle, ring.tip),
            (
                LandmarkIdx::RingFingerMcp,
                LandmarkIdx::RingFingerPip,
                LandmarkIdx::RingFingerTip
            )
        );
    }

    #[test]
    fn extension_requires_strict_order() {
        let hand = upright();
        assert!(Finger::ALL.into_iter().all(|f| hand.is_extended(f)));

        let mut landmarks = *hand.landmarks();
        // Tip level with the middle joint.
        landmarks[LandmarkIdx::IndexFingerTip as usize] = Landmark::new(0.4, 0.5);
        // Finger pointing down.
        landmarks[LandmarkIdx::PinkyTip as usize] = Landmark::new(0.7, 0.9);
        let hand = Hand::from_array(landmarks);
        assert!(!hand.is_extended(Finger::Index));
        assert!(!hand.is_extended(Finger::Pinky));
        assert!(hand.is_extended(Finger::Middle));
    }

    #[test]
    fn serde_validates_landmark_count() {
        let hand = upright().with_confidence(0.75);
        let json = serde_json::to_string(&hand).unwrap();
        let back: Hand = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hand);

        let err = serde_json::from_str::<Hand>(r#"{"landmarks":[{"x":0.0,"y":0.0}]}"#)
            .unwrap_err()
            .to_string();
        assert!(err.contains("got 1"), "{err}");
    }

    #[test]
    fn draw_marks_landmarks() {
        let mut image = Image::filled(100, 100, Color::BLACK);
        upright().draw(&mut image);
        assert_eq!(image.get(50, 30), Color::RED);
    }
}
