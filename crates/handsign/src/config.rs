//! Runtime configuration from `HANDSIGN_*` environment variables.

use std::{env::VarError, fmt, path::PathBuf, str::FromStr};

use anyhow::{bail, Context};

use crate::speech::SpeechCommand;

/// Which variant of the hand tracking networks to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkKind {
    /// Faster, less accurate networks.
    Lite,
    /// Slower, more accurate networks.
    Full,
}

impl NetworkKind {
    pub fn name(self) -> &'static str {
        match self {
            NetworkKind::Lite => "lite",
            NetworkKind::Full => "full",
        }
    }
}

impl fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NetworkKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lite" => Ok(Self::Lite),
            "full" => Ok(Self::Full),
            _ => bail!("expected `lite` or `full`"),
        }
    }
}

/// Application settings.
///
/// | Variable | Meaning | Default |
/// |---|---|---|
/// | `HANDSIGN_WEBCAM_NAME` | V4L2 card name of the webcam to open | first compatible device |
/// | `HANDSIGN_MODEL_DIR` | directory holding the ONNX networks | `3rdparty/onnx` |
/// | `HANDSIGN_NETWORK` | `lite` or `full` | `full` |
/// | `HANDSIGN_MAX_HANDS` | maximum number of tracked hands | `2` |
/// | `HANDSIGN_MIN_CONFIDENCE` | detection and tracking threshold | `0.7` |
/// | `HANDSIGN_MIRROR` | mirror frames before processing (`1` or `0`) | `1` |
/// | `HANDSIGN_SPEECH` | text-to-speech command line, or `off` | `espeak-ng` |
/// | `HANDSIGN_RECORD` | path of a landmark recording to write | none |
#[derive(Debug, Clone)]
pub struct Config {
    pub webcam_name: Option<String>,
    pub model_dir: PathBuf,
    pub network: NetworkKind,
    pub max_hands: usize,
    pub min_confidence: f32,
    pub mirror: bool,
    /// [`None`] if speech is turned off.
    pub speech: Option<SpeechCommand>,
    pub record: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webcam_name: None,
            model_dir: PathBuf::from("3rdparty/onnx"),
            network: NetworkKind::Full,
            max_hands: 2,
            min_confidence: 0.7,
            mirror: true,
            speech: Some(SpeechCommand::default()),
            record: None,
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|var| std::env::var(var))
    }

    /// Reads the configuration using `lookup` to fetch variables.
    ///
    /// Unset variables use their default value. Variables that are set to an invalid value (or
    /// to non-Unicode data) are reported as errors.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let parse = |var: &str| match lookup(var) {
            Ok(value) => Ok(Some(value)),
            Err(VarError::NotPresent) => Ok(None),
            Err(e @ VarError::NotUnicode(_)) => {
                Err(anyhow::Error::new(e).context(format!("invalid value for `{var}`")))
            }
        };

        let mut config = Self::default();
        if let Some(name) = parse("HANDSIGN_WEBCAM_NAME")? {
            config.webcam_name = Some(name);
        }
        if let Some(dir) = parse("HANDSIGN_MODEL_DIR")? {
            config.model_dir = dir.into();
        }
        if let Some(network) = parse("HANDSIGN_NETWORK")? {
            config.network = network
                .parse()
                .with_context(|| format!("invalid value for `HANDSIGN_NETWORK`: '{network}'"))?;
        }
        if let Some(max) = parse("HANDSIGN_MAX_HANDS")? {
            config.max_hands = match max.parse::<usize>() {
                Ok(0) | Err(_) => bail!(
                    "invalid value for `HANDSIGN_MAX_HANDS`: '{max}' (expected a positive number)"
                ),
                Ok(n) => n,
            };
        }
        if let Some(conf) = parse("HANDSIGN_MIN_CONFIDENCE")? {
            config.min_confidence = match conf.parse::<f32>() {
                Ok(c) if (0.0..=1.0).contains(&c) => c,
                _ => bail!(
                    "invalid value for `HANDSIGN_MIN_CONFIDENCE`: '{conf}' (expected a number between 0 and 1)"
                ),
            };
        }
        if let Some(mirror) = parse("HANDSIGN_MIRROR")? {
            config.mirror = match &*mirror {
                "1" => true,
                "0" => false,
                _ => bail!("invalid value for `HANDSIGN_MIRROR`: '{mirror}' (expected 1 or 0)"),
            };
        }
        if let Some(speech) = parse("HANDSIGN_SPEECH")? {
            config.speech = match speech.trim() {
                "off" => None,
                cmdline => Some(
                    SpeechCommand::parse(cmdline)
                        .context("invalid value for `HANDSIGN_SPEECH`: expected a command or `off`")?,
                ),
            };
        }
        if let Some(path) = parse("HANDSIGN_RECORD")? {
            config.record = Some(path.into());
        }

        Ok(config)
    }

    /// Returns the path of the palm detection network.
    pub fn palm_detection_model(&self) -> PathBuf {
        self.model_dir
            .join(format!("palm_detection_{}.onnx", self.network))
    }

    /// Returns the path of the hand landmark network.
    pub fn hand_landmark_model(&self) -> PathBuf {
        self.model_dir
            .join(format!("hand_landmark_{}.onnx", self.network))
    }
}
