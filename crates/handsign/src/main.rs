use std::io;

use handsign::{
    config::Config,
    frame::FrameProcessor,
    gui,
    hand::tracking::HandTracker,
    image::Image,
    recording::Recorder,
    speech::{Announcer, Silent},
    timer::FpsCounter,
    video::webcam::{Webcam, WebcamOptions},
};
use pawawwewism::Worker;

const WINDOW_TITLE: &str = "Hand Gesture Recognition";

type Processor = FrameProcessor<HandTracker, Box<dyn Announcer + Send>>;

#[handsign::main]
fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    log::debug!("{config:?}");

    let mut tracker = HandTracker::load(
        config.palm_detection_model(),
        config.hand_landmark_model(),
    )?;
    tracker.set_max_hands(config.max_hands);
    tracker.set_min_confidence(config.min_confidence);

    let announcer: Box<dyn Announcer + Send> = match config.speech.clone() {
        Some(command) => Box::new(command),
        None => Box::new(Silent),
    };
    let mut processor = FrameProcessor::new(tracker, announcer);
    processor.set_mirror(config.mirror);
    if let Some(path) = &config.record {
        log::info!("recording landmarks to '{}'", path.display());
        processor.record_to(Recorder::create(path)?);
    }

    let mut recognizer = recognizer(processor)?;

    let mut options = WebcamOptions::default();
    if let Some(name) = &config.webcam_name {
        options = options.name(name);
    }
    let mut webcam = Webcam::open(options)?;

    let mut fps = FpsCounter::new("webcam");
    loop {
        let image = webcam.read()?;
        recognizer.send(image);
        fps.tick_with(webcam.timers());
    }
}

fn recognizer(mut processor: Processor) -> Result<Worker<Image>, io::Error> {
    let mut fps = FpsCounter::new("recognizer");

    Worker::builder().name("recognizer").spawn(move |mut image: Image| {
        match processor.process(&mut image) {
            Ok(recognitions) => {
                for rec in &recognitions {
                    log::trace!("{} -> {:?}", rec.features.extension, rec.gesture);
                }
            }
            Err(e) => log::error!("recognition failed: {e:#}"),
        }
        gui::show_image(WINDOW_TITLE, &image);

        if let Err(e) = processor.flush() {
            log::error!("failed to flush recording: {e:#}");
        }
        fps.tick_with(
            processor
                .timers()
                .into_iter()
                .chain(processor.provider().timers()),
        );
    })
}
