//! V4L2 webcam capture.
//!
//! Only `VIDEO_CAPTURE` devices that deliver JPEG or Motion JPEG frames in discrete sizes and
//! frame rates are supported, which covers virtually every USB webcam.

use std::fmt;

use anyhow::{bail, Context};
use linuxvideo::{
    format::{FrameIntervals, FrameSizes, PixFormat, Pixelformat},
    stream::ReadStream,
    BufType, CapabilityFlags, Device, Fract,
};

use crate::{
    image::{Image, Resolution},
    num::TotalF32,
    timer::Timer,
};

/// Which camera parameter to keep when the desired resolution and frame rate can't both be had.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamPreference {
    /// Keep the resolution, and pick the highest frame rate available at that resolution.
    #[default]
    Resolution,
    /// Keep the frame rate, and pick the highest resolution available at that frame rate.
    Framerate,
}

#[derive(Debug, Default, Clone, Copy)]
struct FramePrefs {
    resolution: Option<Resolution>,
    fps: Option<u32>,
    pref: ParamPreference,
}

/// Options for opening a [`Webcam`].
#[derive(Debug, Default, Clone)]
pub struct WebcamOptions {
    name: Option<String>,
    prefs: FramePrefs,
}

impl WebcamOptions {
    /// Only opens the webcam whose V4L2 card name is `name`.
    pub fn name(self, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    /// Sets the minimum desired resolution.
    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.prefs.resolution = Some(resolution);
        self
    }

    /// Sets the minimum desired frame rate.
    pub fn fps(mut self, fps: u32) -> Self {
        self.prefs.fps = Some(fps);
        self
    }

    pub fn prefer(mut self, pref: ParamPreference) -> Self {
        self.prefs.pref = pref;
        self
    }
}

/// A frame size and interval supported by a webcam.
#[derive(Clone, Copy, PartialEq)]
struct FrameFormat {
    resolution: Resolution,
    frame_interval: Fract,
}

impl FrameFormat {
    fn fps(&self) -> f32 {
        1.0 / self.frame_interval.as_f32()
    }
}

impl fmt::Debug for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {:.1}Hz", self.resolution, self.fps())
    }
}

fn supported_formats(device: &Device) -> anyhow::Result<(Pixelformat, Vec<FrameFormat>)> {
    let mut pixel_format = None;
    for format in device.formats(BufType::VIDEO_CAPTURE) {
        let format = format?;
        if [Pixelformat::JPEG, Pixelformat::MJPG].contains(&format.pixelformat()) {
            pixel_format = Some(format.pixelformat());
            break;
        }
    }
    let Some(pixel_format) = pixel_format else {
        bail!("device does not support JPEG or MJPG frames");
    };

    let FrameSizes::Discrete(sizes) = device.frame_sizes(pixel_format)? else {
        bail!("stepwise or continuous frame sizes are not supported");
    };
    let mut formats = Vec::new();
    for size in sizes {
        let FrameIntervals::Discrete(intervals) =
            device.frame_intervals(pixel_format, size.width(), size.height())?
        else {
            bail!("stepwise or continuous frame intervals are not supported");
        };
        for interval in intervals {
            formats.push(FrameFormat {
                resolution: Resolution::new(size.width(), size.height()),
                frame_interval: *interval.fract(),
            });
        }
    }

    Ok((pixel_format, formats))
}

/// Picks the best format satisfying `prefs`, dropping preferences until one matches.
///
/// The preference that is *not* selected by [`FramePrefs::pref`] is given up first.
fn choose_format(formats: &[FrameFormat], mut prefs: FramePrefs) -> Option<FrameFormat> {
    loop {
        if let Some(format) = best_format(formats, prefs) {
            return Some(format);
        }

        log::debug!("no webcam format matches {:?}", prefs);
        let dropped = match prefs.pref {
            ParamPreference::Resolution => {
                prefs.fps.take().is_some() || prefs.resolution.take().is_some()
            }
            ParamPreference::Framerate => {
                prefs.resolution.take().is_some() || prefs.fps.take().is_some()
            }
        };
        if !dropped {
            return None;
        }
    }
}

fn best_format(formats: &[FrameFormat], prefs: FramePrefs) -> Option<FrameFormat> {
    let mut eligible = formats
        .iter()
        .filter(|fmt| {
            prefs.resolution.map_or(true, |res| {
                fmt.resolution.width() >= res.width() && fmt.resolution.height() >= res.height()
            }) && prefs
                .fps
                .map_or(true, |fps| fmt.fps().round() >= fps as f32)
        })
        .copied()
        .collect::<Vec<_>>();
    match prefs.pref {
        ParamPreference::Resolution => {
            eligible.sort_by_key(|fmt| (fmt.resolution.num_pixels(), TotalF32(fmt.fps())))
        }
        ParamPreference::Framerate => {
            eligible.sort_by_key(|fmt| (TotalF32(fmt.fps()), fmt.resolution.num_pixels()))
        }
    }
    eligible.last().copied()
}

/// A webcam producing a stream of [`Image`]s.
pub struct Webcam {
    stream: ReadStream,
    resolution: Resolution,
    t_dequeue: Timer,
    t_decode: Timer,
}

impl Webcam {
    /// Opens the first supported webcam matching `options`.
    ///
    /// This can block for a few hundred milliseconds while the camera initializes.
    pub fn open(options: WebcamOptions) -> anyhow::Result<Self> {
        if let Some(name) = &options.name {
            log::debug!("looking for webcam '{name}'");
        }
        for res in linuxvideo::list()? {
            match res {
                Ok(dev) => match Self::open_device(dev, &options) {
                    Ok(Some(webcam)) => return Ok(webcam),
                    Ok(None) => {}
                    Err(e) => log::debug!("{e:#}"),
                },
                Err(e) => log::warn!("{e}"),
            }
        }

        match &options.name {
            Some(name) => bail!("no supported webcam named '{name}' found"),
            None => bail!("no supported webcam found"),
        }
    }

    fn open_device(dev: Device, options: &WebcamOptions) -> anyhow::Result<Option<Self>> {
        let caps = dev.capabilities()?;
        if options.name.as_deref().map_or(false, |name| caps.card() != name) {
            return Ok(None);
        }

        let flags = caps.device_capabilities();
        let path = dev.path()?;
        log::debug!("device {} ({}): {:?}", caps.card(), path.display(), flags);
        if !flags.contains(CapabilityFlags::VIDEO_CAPTURE) {
            return Ok(None);
        }

        let (pixel_format, formats) = supported_formats(&dev)
            .with_context(|| format!("unsupported device {}", caps.card()))?;
        let Some(format) = choose_format(&formats, options.prefs) else {
            bail!("failed to negotiate a format with {}", caps.card());
        };

        let capture = dev.video_capture(PixFormat::new(
            format.resolution.width(),
            format.resolution.height(),
            pixel_format,
        ))?;
        let actual = capture.format();
        let resolution = Resolution::new(actual.width(), actual.height());
        let interval = capture.set_frame_interval(format.frame_interval)?;

        log::info!(
            "opened {} ({}), {} @ {:.1}Hz",
            caps.card(),
            path.display(),
            resolution,
            1.0 / interval.as_f32(),
        );

        Ok(Some(Self {
            stream: capture.into_stream(2)?,
            resolution,
            t_dequeue: Timer::new("dequeue"),
            t_decode: Timer::new("decode"),
        }))
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Reads the next frame, blocking until one is available.
    ///
    /// Corrupted frames are logged and replaced by a blank image, so that a single bad frame
    /// doesn't stop the stream.
    pub fn read(&mut self) -> anyhow::Result<Image> {
        let dequeue = self.t_dequeue.start();
        let (t_decode, res) = (&self.t_decode, self.resolution);
        let image = self.stream.dequeue(|buf| {
            drop(dequeue);
            let image = match t_decode.time(|| Image::decode_jpeg(&buf)) {
                Ok(image) => image,
                Err(e) => {
                    log::error!("webcam decode error: {e}");
                    Image::new(res.width(), res.height())
                }
            };
            Ok(image)
        })?;
        Ok(image)
    }

    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_dequeue, &self.t_decode].into_iter()
    }
}

impl<'a> IntoIterator for &'a mut Webcam {
    type Item = anyhow::Result<Image>;
    type IntoIter = Frames<'a>;

    fn into_iter(self) -> Self::IntoIter {
        Frames { webcam: self }
    }
}

/// Endless iterator over the frames captured by a [`Webcam`].
pub struct Frames<'a> {
    webcam: &'a mut Webcam,
}

impl Iterator for Frames<'_> {
    type Item = anyhow::Result<Image>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.webcam.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(width: u32, height: u32, fps: u32) -> FrameFormat {
        FrameFormat {
            resolution: Resolution::new(width, height),
            frame_interval: Fract::new(1, fps),
        }
    }

    fn formats() -> Vec<FrameFormat> {
        vec![
            fmt(640, 480, 30),
            fmt(640, 480, 60),
            fmt(1280, 720, 30),
            fmt(1920, 1080, 15),
            fmt(1920, 1080, 30),
        ]
    }

    fn prefs(
        resolution: Option<Resolution>,
        fps: Option<u32>,
        pref: ParamPreference,
    ) -> FramePrefs {
        FramePrefs {
            resolution,
            fps,
            pref,
        }
    }

    #[test]
    fn no_prefs_maximizes_preferred_param() {
        let formats = formats();
        let best = choose_format(&formats, prefs(None, None, ParamPreference::Resolution));
        assert_eq!(best, Some(fmt(1920, 1080, 30)));
        let best = choose_format(&formats, prefs(None, None, ParamPreference::Framerate));
        assert_eq!(best, Some(fmt(640, 480, 60)));
    }

    #[test]
    fn exact_match() {
        let best = choose_format(
            &formats(),
            prefs(Some(Resolution::RES_720P), Some(30), ParamPreference::Framerate),
        );
        assert_eq!(best, Some(fmt(1920, 1080, 30)));
    }

    #[test]
    fn drops_framerate_to_keep_resolution() {
        let best = choose_format(
            &formats(),
            prefs(Some(Resolution::RES_1080P), Some(60), ParamPreference::Resolution),
        );
        assert_eq!(best, Some(fmt(1920, 1080, 30)));
    }

    #[test]
    fn drops_resolution_to_keep_framerate() {
        let best = choose_format(
            &formats(),
            prefs(Some(Resolution::RES_1080P), Some(60), ParamPreference::Framerate),
        );
        assert_eq!(best, Some(fmt(640, 480, 60)));
    }

    #[test]
    fn no_formats() {
        assert_eq!(choose_format(&[], FramePrefs::default()), None);
    }
}
