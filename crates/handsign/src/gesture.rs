//! Rule-based hand gesture classification.
//!
//! Classification looks at a single [`Hand`] and nothing else: which fingers are extended (see
//! [`Hand::is_extended`]) and how far the thumb tip is from the index finger tip. These
//! [`Features`] are checked against a fixed, ordered list of rules, and the first matching rule
//! decides the [`Gesture`].
//!
//! | Order | Gesture | Rule |
//! |-------|---------|------|
//! | 1 | [`Gesture::CallMe`] | thumb and index extended, others folded |
//! | 2 | [`Gesture::Loser`] | thumb and pinky extended, others folded |
//! | 3 | [`Gesture::HighFive`] | all fingers extended |
//! | 4 | [`Gesture::Peace`] | index and middle extended, others folded |
//! | 5 | [`Gesture::Rock`] | thumb, index and pinky extended, middle and ring folded |
//! | 6 | [`Gesture::Ok`] | thumb tip closer than [`OK_DISTANCE`] to index tip |
//! | 7 | [`Gesture::Dislike`] | only the pinky extended |
//! | 8 | [`Gesture::Fist`] | no finger extended |

use std::{fmt, ops::Index, str::FromStr};

use crate::{
    hand::{Finger, Hand, LandmarkIdx},
    landmark::distance,
};

/// Thumb tip and index tip must be closer than this (in normalized frame units) to form an "ok".
pub const OK_DISTANCE: f32 = 0.05;

/// One of the recognized hand gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    CallMe,
    Loser,
    HighFive,
    Peace,
    Rock,
    Ok,
    Dislike,
    Fist,
}

impl Gesture {
    /// All gestures, in rule order.
    pub const ALL: [Gesture; 8] = [
        Gesture::CallMe,
        Gesture::Loser,
        Gesture::HighFive,
        Gesture::Peace,
        Gesture::Rock,
        Gesture::Ok,
        Gesture::Dislike,
        Gesture::Fist,
    ];

    /// Returns the machine-readable tag of this gesture, like `high_five`.
    pub fn tag(self) -> &'static str {
        match self {
            Gesture::CallMe => "call_me",
            Gesture::Loser => "loser",
            Gesture::HighFive => "high_five",
            Gesture::Peace => "peace",
            Gesture::Rock => "rock",
            Gesture::Ok => "ok",
            Gesture::Dislike => "dislike",
            Gesture::Fist => "fist",
        }
    }

    /// Returns the phrase that is displayed and spoken for this gesture.
    pub fn phrase(self) -> &'static str {
        match self {
            Gesture::CallMe => "call me",
            Gesture::Loser => "loser",
            Gesture::HighFive => "high-five",
            Gesture::Peace => "peace",
            Gesture::Rock => "rock",
            Gesture::Ok => "ok",
            Gesture::Dislike => "dislike",
            Gesture::Fist => "fist",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Gesture::CallMe => "Thumb and index finger extended",
            Gesture::Loser => "Thumb and pinky extended",
            Gesture::HighFive => "All fingers extended",
            Gesture::Peace => "Index and middle fingers extended",
            Gesture::Rock => "Thumb, index, and pinky extended",
            Gesture::Ok => "Thumb and index finger forming a circle",
            Gesture::Dislike => "Only pinky extended",
            Gesture::Fist => "No fingers extended",
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error returned when parsing an unknown gesture tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown gesture '{0}'")]
pub struct UnknownGesture(String);

impl FromStr for Gesture {
    type Err = UnknownGesture;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|g| g.tag() == s)
            .ok_or_else(|| UnknownGesture(s.to_string()))
    }
}

/// Which fingers of a hand are extended, indexable by [`Finger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extension([bool; 5]);

impl Extension {
    /// Creates an extension vector from flags in thumb-to-pinky order.
    pub const fn new(extended: [bool; 5]) -> Self {
        Self(extended)
    }

    pub fn of(hand: &Hand) -> Self {
        Self(Finger::ALL.map(|finger| hand.is_extended(finger)))
    }

    /// Returns `true` if exactly the fingers in `fingers` are extended, and no others.
    pub fn is_exactly(&self, fingers: &[Finger]) -> bool {
        Finger::ALL
            .into_iter()
            .all(|finger| self[finger] == fingers.contains(&finger))
    }

    pub fn count(&self) -> usize {
        self.0.iter().filter(|&&ext| ext).count()
    }

    pub fn as_array(&self) -> [bool; 5] {
        self.0
    }
}

impl Index<Finger> for Extension {
    type Output = bool;

    fn index(&self, finger: Finger) -> &bool {
        &self.0[finger.index()]
    }
}

impl fmt::Display for Extension {
    /// Formats as one character per finger, `|` for extended and `_` for folded.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ext in self.0 {
            f.write_str(if ext { "|" } else { "_" })?;
        }
        Ok(())
    }
}

/// Everything the classification rules look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Features {
    pub extension: Extension,
    /// Distance between thumb tip and index finger tip.
    pub thumb_index_distance: f32,
}

impl Features {
    pub fn of(hand: &Hand) -> Self {
        Self {
            extension: Extension::of(hand),
            thumb_index_distance: distance(
                &hand[LandmarkIdx::ThumbTip],
                &hand[LandmarkIdx::IndexFingerTip],
            ),
        }
    }

    /// Applies the classification rules, returning the gesture of the first rule that matches.
    pub fn classify(&self) -> Option<Gesture> {
        RULES
            .iter()
            .find(|(_, rule)| rule(self))
            .map(|&(gesture, _)| gesture)
    }
}

type Rule = fn(&Features) -> bool;

static RULES: &[(Gesture, Rule)] = &[
    (Gesture::CallMe, |f| {
        f.extension.is_exactly(&[Finger::Thumb, Finger::Index])
    }),
    (Gesture::Loser, |f| {
        f.extension.is_exactly(&[Finger::Thumb, Finger::Pinky])
    }),
    (Gesture::HighFive, |f| f.extension.count() == 5),
    (Gesture::Peace, |f| {
        f.extension.is_exactly(&[Finger::Index, Finger::Middle])
    }),
    (Gesture::Rock, |f| {
        f.extension
            .is_exactly(&[Finger::Thumb, Finger::Index, Finger::Pinky])
    }),
    (Gesture::Ok, |f| f.thumb_index_distance < OK_DISTANCE),
    (Gesture::Dislike, |f| f.extension.is_exactly(&[Finger::Pinky])),
    (Gesture::Fist, |f| f.extension.count() == 0),
];

/// Classifies the gesture shown by `hand`.
///
/// Returns [`None`] if no rule matches. The result depends only on `hand`.
pub fn classify(hand: &Hand) -> Option<Gesture> {
    Features::of(hand).classify()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rayon::prelude::*;

    use crate::landmark::Landmark;

    use super::*;

    const T: bool = true;
    const F: bool = false;

    /// Builds a hand with the given fingers extended. Fingers are spaced 0.2 apart horizontally,
    /// so the thumb and index tips start out 0.2 apart.
    fn fingers(extended: [bool; 5]) -> [Landmark; 21] {
        let mut landmarks = [Landmark::new(0.5, 0.95); 21];
        for (finger, ext) in Finger::ALL.into_iter().zip(extended) {
            let x = 0.1 + 0.2 * finger.index() as f32;
            let (base, middle, tip) = if ext {
                (0.8, 0.6, 0.4)
            } else {
                // Middle joint below the base; stays folded wherever the tip goes.
                (0.6, 0.7, 0.65)
            };
            let joints = finger.joints();
            landmarks[joints.base as usize] = Landmark::new(x, base);
            landmarks[joints.middle as usize] = Landmark::new(x, middle);
            landmarks[joints.tip as usize] = Landmark::new(x, tip);
        }
        landmarks
    }

    fn with_tips(mut landmarks: [Landmark; 21], thumb: [f32; 2], index: [f32; 2]) -> Hand {
        landmarks[LandmarkIdx::ThumbTip as usize] = Landmark::new(thumb[0], thumb[1]);
        landmarks[LandmarkIdx::IndexFingerTip as usize] = Landmark::new(index[0], index[1]);
        Hand::from_array(landmarks)
    }

    fn classify_ext(extended: [bool; 5]) -> Option<Gesture> {
        classify(&Hand::from_array(fingers(extended)))
    }

    #[test]
    fn extension_vector() {
        let ext = Extension::of(&Hand::from_array(fingers([T, F, T, F, T])));
        assert_eq!(ext.as_array(), [T, F, T, F, T]);
        assert!(ext[Finger::Middle]);
        assert!(!ext[Finger::Ring]);
        assert_eq!(ext.count(), 3);
        assert_eq!(ext.to_string(), "|_|_|");
    }

    #[test]
    fn single_gestures() {
        assert_eq!(classify_ext([F, F, F, F, F]), Some(Gesture::Fist));
        assert_eq!(classify_ext([T, T, T, T, T]), Some(Gesture::HighFive));
        assert_eq!(classify_ext([T, T, F, F, F]), Some(Gesture::CallMe));
        assert_eq!(classify_ext([T, F, F, F, T]), Some(Gesture::Loser));
        assert_eq!(classify_ext([F, T, T, F, F]), Some(Gesture::Peace));
        assert_eq!(classify_ext([T, T, F, F, T]), Some(Gesture::Rock));
        assert_eq!(classify_ext([F, F, F, F, T]), Some(Gesture::Dislike));
    }

    #[test]
    fn high_five_ignores_tip_distance() {
        let hand = with_tips(fingers([T; 5]), [0.2, 0.4], [0.2, 0.4]);
        assert_eq!(Features::of(&hand).thumb_index_distance, 0.0);
        assert_eq!(classify(&hand), Some(Gesture::HighFive));
    }

    #[test]
    fn ok_precedes_fist() {
        let hand = with_tips(fingers([F; 5]), [0.3, 0.5], [0.3, 0.5]);
        assert_eq!(Extension::of(&hand), Extension::new([F; 5]));
        assert_eq!(classify(&hand), Some(Gesture::Ok));
    }

    #[test]
    fn ok_precedes_dislike() {
        let hand = with_tips(fingers([F, F, F, F, T]), [0.3, 0.5], [0.32, 0.5]);
        assert_eq!(classify(&hand), Some(Gesture::Ok));
    }

    #[test]
    fn ok_threshold_is_strict() {
        let hand = with_tips(fingers([F; 5]), [0.0, 0.5], [0.05, 0.5]);
        assert_eq!(Features::of(&hand).thumb_index_distance, 0.05);
        assert_eq!(classify(&hand), Some(Gesture::Fist));

        let hand = with_tips(fingers([F; 5]), [0.0, 0.5], [0.0499, 0.5]);
        assert_relative_eq!(Features::of(&hand).thumb_index_distance, 0.0499);
        assert_eq!(classify(&hand), Some(Gesture::Ok));
    }

    #[test]
    fn no_match() {
        for ext in [
            [F, F, T, F, F],
            [F, T, F, F, F],
            [T, F, F, F, F],
            [F, T, T, T, F],
            [T, T, T, T, F],
        ] {
            let hand = Hand::from_array(fingers(ext));
            assert!(Features::of(&hand).thumb_index_distance >= OK_DISTANCE);
            assert_eq!(classify(&hand), None, "{ext:?}");
        }
    }

    #[test]
    fn features_classify_directly() {
        let features = Features {
            extension: Extension::new([F, T, T, F, F]),
            thumb_index_distance: 0.01,
        };
        assert_eq!(features.classify(), Some(Gesture::Peace));
        let features = Features {
            extension: Extension::new([F, T, F, T, F]),
            thumb_index_distance: 0.01,
        };
        assert_eq!(features.classify(), Some(Gesture::Ok));
    }

    #[test]
    fn tags_roundtrip() {
        for gesture in Gesture::ALL {
            assert_eq!(gesture.tag().parse::<Gesture>(), Ok(gesture));
            assert_eq!(gesture.to_string(), gesture.tag());
        }
        assert_eq!(Gesture::HighFive.phrase(), "high-five");
        assert_eq!(
            "thumbs_up".parse::<Gesture>(),
            Err(UnknownGesture("thumbs_up".into()))
        );
    }

    /// Straightforward restatement of the rules, checked against the table.
    fn expected(ext: [bool; 5], dist: f32) -> Option<Gesture> {
        let [thumb, index, middle, ring, pinky] = ext;
        if thumb && index && !middle && !ring && !pinky {
            Some(Gesture::CallMe)
        } else if thumb && pinky && !index && !middle && !ring {
            Some(Gesture::Loser)
        } else if ext.iter().all(|&e| e) {
            Some(Gesture::HighFive)
        } else if index && middle && !thumb && !ring && !pinky {
            Some(Gesture::Peace)
        } else if thumb && index && pinky && !middle && !ring {
            Some(Gesture::Rock)
        } else if dist < OK_DISTANCE {
            Some(Gesture::Ok)
        } else if pinky && !thumb && !index && !middle && !ring {
            Some(Gesture::Dislike)
        } else if ext.iter().all(|&e| !e) {
            Some(Gesture::Fist)
        } else {
            None
        }
    }

    fn random_hand(rng: &mut fastrand::Rng) -> Hand {
        let mut landmarks = [Landmark::default(); 21];
        for lm in &mut landmarks {
            *lm = Landmark::new(rng.f32(), rng.f32());
        }
        if rng.bool() {
            // Pull the thumb tip close to the index tip, so that "ok" is exercised.
            let [x, y] = landmarks[LandmarkIdx::IndexFingerTip as usize].position();
            landmarks[LandmarkIdx::ThumbTip as usize] =
                Landmark::new(x + (rng.f32() - 0.5) * 0.1, y + (rng.f32() - 0.5) * 0.1);
        }
        Hand::from_array(landmarks)
    }

    #[test]
    fn random_hands_follow_rules() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        for _ in 0..10_000 {
            let hand = random_hand(&mut rng);
            let ext = Finger::ALL.map(|finger| {
                let j = finger.joints();
                let (b, m, t) = (hand[j.base].y(), hand[j.middle].y(), hand[j.tip].y());
                t < m && m < b
            });
            let dist = distance(&hand[LandmarkIdx::ThumbTip], &hand[LandmarkIdx::IndexFingerTip]);

            let gesture = classify(&hand);
            assert_eq!(gesture, expected(ext, dist), "{hand:?}");
            assert_eq!(classify(&hand), gesture);
        }
    }

    #[test]
    fn concurrent_classification() {
        let mut rng = fastrand::Rng::with_seed(7);
        let hands = (0..1000).map(|_| random_hand(&mut rng)).collect::<Vec<_>>();
        let sequential = hands.iter().map(classify).collect::<Vec<_>>();
        let parallel = hands.par_iter().map(classify).collect::<Vec<_>>();
        assert_eq!(sequential, parallel);
    }
}
