//! Per-frame recognition: find hands, classify them, draw the overlay, announce gestures.

use std::io::Write;

use crate::{
    gesture::{Features, Gesture},
    hand::{Hand, LandmarkIdx},
    image::{draw, Color, Image},
    provider::LandmarkProvider,
    recording::Recorder,
    speech::Announcer,
    timer::Timer,
};

/// Position of the first gesture label, in pixels from the top left corner.
const LABEL_ORIGIN: (f32, f32) = (50.0, 50.0);
/// Vertical distance between the labels of multiple hands.
const LABEL_SPACING: f32 = 30.0;

/// A hand found in a frame, and the gesture it shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub hand: Hand,
    pub features: Features,
    /// The recognized gesture, or [`None`] if the hand doesn't match any.
    pub gesture: Option<Gesture>,
}

/// Runs the recognition pipeline on a stream of frames.
///
/// For every frame passed to [`FrameProcessor::process`], this:
///
/// - mirrors the frame (if enabled), so that it looks like a mirror image to the user,
/// - asks the [`LandmarkProvider`] for the hands in the frame,
/// - classifies every hand,
/// - draws each hand's skeleton and gesture label onto the frame,
/// - hands the phrase of every recognized gesture to the [`Announcer`],
/// - and appends the hands to the recording, if one is attached.
pub struct FrameProcessor<P, A> {
    provider: P,
    announcer: A,
    mirror: bool,
    recorder: Option<Recorder<Box<dyn Write + Send>>>,
    t_detect: Timer,
    t_overlay: Timer,
}

impl<P: LandmarkProvider, A: Announcer> FrameProcessor<P, A> {
    pub fn new(provider: P, announcer: A) -> Self {
        Self {
            provider,
            announcer,
            mirror: true,
            recorder: None,
            t_detect: Timer::new("detect"),
            t_overlay: Timer::new("overlay"),
        }
    }

    /// Sets whether frames are mirrored horizontally before processing. Enabled by default.
    pub fn set_mirror(&mut self, mirror: bool) {
        self.mirror = mirror;
    }

    /// Records the hands of every processed frame with `recorder`.
    pub fn record_to<W: Write + Send + 'static>(&mut self, recorder: Recorder<W>) {
        self.recorder = Some(recorder.boxed());
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// Processes a single frame, drawing the overlay into `image`.
    ///
    /// Returns every hand the provider found, in provider order, including those that do not
    /// show a known gesture.
    pub fn process(&mut self, image: &mut Image) -> anyhow::Result<Vec<Recognition>> {
        if self.mirror {
            image.flip_horizontal_in_place();
        }

        let hands = self.t_detect.time(|| self.provider.detect(image))?;
        if let Some(recorder) = &mut self.recorder {
            recorder.record(&hands)?;
        }

        let recognitions = hands
            .into_iter()
            .map(|hand| {
                let features = Features::of(&hand);
                Recognition {
                    gesture: features.classify(),
                    features,
                    hand,
                }
            })
            .collect::<Vec<_>>();

        self.t_overlay.time(|| draw_overlay(image, &recognitions));

        for gesture in recognitions.iter().filter_map(|rec| rec.gesture) {
            log::trace!("recognized {gesture}");
            self.announcer.announce(gesture.phrase());
        }

        Ok(recognitions)
    }

    /// Flushes the attached recording, if any.
    pub fn flush(&mut self) -> anyhow::Result<()> {
        match &mut self.recorder {
            Some(recorder) => recorder.flush(),
            None => Ok(()),
        }
    }

    pub fn timers(&self) -> impl IntoIterator<Item = &Timer> + '_ {
        [&self.t_detect, &self.t_overlay]
    }
}

fn draw_overlay(image: &mut Image, recognitions: &[Recognition]) {
    let (w, h) = (image.width() as f32, image.height() as f32);
    for rec in recognitions {
        rec.hand.draw(image);

        let [x, y] = rec.hand[LandmarkIdx::Wrist].position();
        let ext = rec.features.extension.to_string();
        draw::text(image, x * w, y * h + 20.0, &ext).color(Color::YELLOW);
    }

    let (x, mut y) = LABEL_ORIGIN;
    for gesture in recognitions.iter().filter_map(|rec| rec.gesture) {
        draw::text(image, x, y, gesture.phrase())
            .align_left()
            .color(Color::GREEN);
        y += LABEL_SPACING;
    }
}
