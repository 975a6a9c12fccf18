//! Sources of hand landmarks.

use crate::{hand::Hand, image::Image};

/// Finds hands in images.
///
/// Implementations return landmarks normalized to the frame passed to [`detect`], one [`Hand`]
/// per visible hand. An empty list means no hand was found; errors are reserved for failures of
/// the provider itself (for example, a network that could not be evaluated).
///
/// Providers may keep state between frames (like tracked regions of interest), so they are
/// invoked with `&mut self`, and frames are expected to be passed in chronological order.
///
/// [`detect`]: LandmarkProvider::detect
pub trait LandmarkProvider {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Vec<Hand>>;
}

impl<P: LandmarkProvider + ?Sized> LandmarkProvider for Box<P> {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Vec<Hand>> {
        (**self).detect(image)
    }
}

impl<P: LandmarkProvider + ?Sized> LandmarkProvider for &mut P {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Vec<Hand>> {
        (**self).detect(image)
    }
}
