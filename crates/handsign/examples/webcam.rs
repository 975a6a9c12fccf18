use handsign::{
    config::Config,
    gui,
    timer::FpsCounter,
    video::webcam::{Webcam, WebcamOptions},
};

#[handsign::main]
fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let mut options = WebcamOptions::default();
    if let Some(name) = config.webcam_name {
        options = options.name(name);
    }

    let mut webcam = Webcam::open(options)?;
    let mut fps = FpsCounter::new("webcam");
    loop {
        let image = webcam.read()?;
        fps.tick_with(webcam.timers());

        gui::show_image("webcam", &image);
    }
}
