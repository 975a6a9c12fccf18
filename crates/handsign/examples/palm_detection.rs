use handsign::{
    config::Config,
    gui,
    hand::detection::PalmDetector,
    timer::FpsCounter,
    video::webcam::{Webcam, WebcamOptions},
};

#[handsign::main]
fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let mut palm_detector = PalmDetector::load(config.palm_detection_model())?;
    palm_detector.set_threshold(config.min_confidence);

    let mut fps = FpsCounter::new("palm detector");
    let mut webcam = Webcam::open(WebcamOptions::default())?;

    loop {
        let mut image = webcam.read()?;
        if config.mirror {
            image.flip_horizontal_in_place();
        }

        for det in palm_detector.detect(&image)? {
            det.draw(&mut image);
        }

        gui::show_image("palm detection", &image);

        fps.tick_with(webcam.timers().chain(palm_detector.timers()));
    }
}
