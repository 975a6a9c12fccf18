//! Hand gesture recognition from a webcam.
//!
//! Every webcam frame is mirrored, the [`HandTracker`] estimates 21 landmarks per visible hand,
//! and [`gesture::classify`] turns each hand's landmarks into one of a small set of
//! [`Gesture`]s. Recognized gestures are drawn onto the frame, displayed in a window, and spoken
//! by an external text-to-speech program.
//!
//! Classification only looks at the image-space landmarks of a single hand and is independent of
//! where the landmarks come from. Anything implementing [`LandmarkProvider`] can feed the
//! pipeline, including a [`Replay`] of previously recorded landmarks.
//!
//! # Coordinates
//!
//! Landmark coordinates are normalized to the frame: X points right and Y points *down*, both in
//! range 0 to 1. A finger pointing upwards thus has *decreasing* Y coordinates from base to tip.
//!
//! # Environment Variables
//!
//! The `handsign` binary is configured through environment variables, see [`Config`] for the
//! full list. Logging is controlled with `RUST_LOG`, as usual for [`env_logger`].
//!
//! [`HandTracker`]: hand::tracking::HandTracker
//! [`Gesture`]: gesture::Gesture
//! [`LandmarkProvider`]: provider::LandmarkProvider
//! [`Replay`]: recording::Replay
//! [`Config`]: config::Config

use log::LevelFilter;

pub mod config;
pub mod detection;
pub mod frame;
pub mod gesture;
pub mod gui;
pub mod hand;
pub mod image;
pub mod landmark;
pub mod nn;
pub mod num;
pub mod provider;
pub mod recording;
pub mod speech;
pub mod termination;
pub mod timer;
pub mod video;

pub use handsign_macros::main;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_CRATE_NAME")), log_level)
        .filter(Some("wgpu"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and `handsign` log at *debug* level, `wgpu` at *warn* level. `RUST_LOG`
/// overrides both.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn run<F, R>(cb: F) -> !
where
    F: FnOnce() -> R + Send + 'static,
    R: termination::Termination + Send,
{
    gui::run(cb)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    #[test]
    fn license_file_exists() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(env!("CARGO_PKG_LICENSE_FILE"));
        assert!(path.is_file(), "missing {}", path.display());
    }
}
