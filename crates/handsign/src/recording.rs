//! Recording and replaying hand landmarks.
//!
//! Recordings are JSON lines files: every line holds the hands found in one frame.
//!
//! ```text
//! {"hands":[{"landmarks":[{"x":0.51,"y":0.83,"z":0.0}, ...],"handedness":"Left","confidence":0.98}]}
//! ```
//!
//! Replaying a recording through a [`Replay`] yields the exact same hands, so gestures can be
//! classified offline without a camera or the hand tracking networks.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{hand::Hand, image::Image, provider::LandmarkProvider};

#[derive(Serialize, Deserialize)]
struct FrameRecord<H> {
    hands: H,
}

/// Writes hand landmarks to a JSON lines recording.
pub struct Recorder<W: Write> {
    writer: W,
    frames: usize,
}

impl Recorder<BufWriter<File>> {
    /// Creates (or truncates) the recording file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("failed to create recording '{}'", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> Recorder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, frames: 0 }
    }

    /// Appends one frame containing `hands`.
    pub fn record(&mut self, hands: &[Hand]) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.writer, &FrameRecord { hands })?;
        self.writer.write_all(b"\n")?;
        self.frames += 1;
        Ok(())
    }

    /// Returns the number of frames recorded so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn flush(&mut self) -> anyhow::Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Erases the writer type, keeping the frame count.
    pub fn boxed(self) -> Recorder<Box<dyn Write + Send>>
    where
        W: Send + 'static,
    {
        Recorder {
            writer: Box::new(self.writer),
            frames: self.frames,
        }
    }
}

/// Reads frames of hand landmarks back from a recording.
///
/// As an [`Iterator`], this yields the hands of each frame in turn. As a [`LandmarkProvider`], it
/// ignores the image and returns the next frame's hands, or no hands once the recording is
/// exhausted.
pub struct Replay<R: BufRead> {
    reader: R,
    line: String,
    line_number: usize,
}

impl Replay<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open recording '{}'", path.display()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> Replay<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
        }
    }

    fn next_frame(&mut self) -> anyhow::Result<Option<Vec<Hand>>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = self.line.trim();
            if line.is_empty() {
                continue;
            }

            let record: FrameRecord<Vec<Hand>> = serde_json::from_str(line)
                .with_context(|| format!("invalid frame on line {}", self.line_number))?;
            return Ok(Some(record.hands));
        }
    }
}

impl<R: BufRead> Iterator for Replay<R> {
    type Item = anyhow::Result<Vec<Hand>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

impl<R: BufRead> LandmarkProvider for Replay<R> {
    fn detect(&mut self, _image: &Image) -> anyhow::Result<Vec<Hand>> {
        Ok(self.next_frame()?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::{
        gesture::{classify, Gesture},
        hand::{Finger, Handedness},
        landmark::Landmark,
    };

    use super::*;

    fn fist() -> Hand {
        let mut landmarks = [Landmark::new(0.5, 0.5); 21];
        for (i, finger) in Finger::ALL.into_iter().enumerate() {
            let x = 0.2 + 0.15 * i as f32;
            let joints = finger.joints();
            landmarks[joints.base as usize] = Landmark::new(x, 0.6).with_z(-0.01);
            landmarks[joints.middle as usize] = Landmark::new(x, 0.7).with_z(-0.02);
            landmarks[joints.tip as usize] = Landmark::new(x, 0.65).with_z(-0.03);
        }
        Hand::from_array(landmarks)
            .with_handedness(Handedness::Right)
            .with_confidence(0.96)
    }

    #[test]
    fn roundtrip() {
        let mut recorder = Recorder::new(Vec::new());
        recorder.record(&[fist()]).unwrap();
        recorder.record(&[]).unwrap();
        recorder.record(&[fist(), fist()]).unwrap();
        assert_eq!(recorder.frames(), 3);

        let data = recorder.into_inner();
        assert_eq!(data.iter().filter(|&&b| b == b'\n').count(), 3);

        let frames = Replay::new(Cursor::new(data))
            .collect::<anyhow::Result<Vec<_>>>()
            .unwrap();
        assert_eq!(frames, [vec![fist()], vec![], vec![fist(), fist()]]);
        assert_eq!(classify(&frames[0][0]), Some(Gesture::Fist));
    }

    #[test]
    fn skips_blank_lines() {
        let data = "\n{\"hands\":[]}\n\n";
        let frames = Replay::new(data.as_bytes())
            .collect::<anyhow::Result<Vec<_>>>()
            .unwrap();
        assert_eq!(frames, [Vec::<Hand>::new()]);
    }

    #[test]
    fn rejects_malformed_hand() {
        let data = "{\"hands\":[]}\n{\"hands\":[{\"landmarks\":[{\"x\":0.1,\"y\":0.2}]}]}\n";
        let mut replay = Replay::new(data.as_bytes());
        assert!(replay.next().unwrap().unwrap().is_empty());

        let err = replay.next().unwrap().unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
        assert!(format!("{err:#}").contains("got 1"), "{err:#}");
    }

    #[test]
    fn replay_as_provider() {
        let mut recorder = Recorder::new(Vec::new());
        recorder.record(&[fist()]).unwrap();
        let mut replay = Replay::new(Cursor::new(recorder.into_inner()));

        let image = Image::new(4, 4);
        assert_eq!(replay.detect(&image).unwrap(), [fist()]);
        assert!(replay.detect(&image).unwrap().is_empty());
    }

    #[test]
    fn file_roundtrip() {
        let path = std::env::temp_dir().join(format!(
            "handsign-recording-{}-{}.jsonl",
            std::process::id(),
            fastrand::u64(..)
        ));
        let mut recorder = Recorder::create(&path).unwrap().boxed();
        recorder.record(&[fist()]).unwrap();
        recorder.record(&[]).unwrap();
        assert_eq!(recorder.frames(), 2);
        recorder.flush().unwrap();
        drop(recorder);

        let frames = Replay::open(&path)
            .unwrap()
            .collect::<anyhow::Result<Vec<_>>>()
            .unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(frames, [vec![fist()], vec![]]);
    }

    #[test]
    fn create_reports_path() {
        let path = std::env::temp_dir()
            .join("handsign-missing-dir")
            .join("out.jsonl");
        let err = Recorder::create(&path).err().unwrap();
        assert!(format!("{err:#}").contains("out.jsonl"), "{err:#}");
    }
}
