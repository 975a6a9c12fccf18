//! Classifies the hands in a landmark recording and prints one line per frame.
//!
//! Recordings are written by the `handsign` binary when `HANDSIGN_RECORD` is set.
//!
//! Usage: `cargo run --example replay -- <recording.jsonl>`

use std::env;

use anyhow::Context;
use handsign::{gesture, recording::Replay};

fn main() -> anyhow::Result<()> {
    handsign::init_logger!();

    let path = env::args_os()
        .nth(1)
        .context("usage: replay <recording.jsonl>")?;
    let replay = Replay::open(&path)?;

    let mut frames = 0;
    let mut recognized = 0;
    for (i, hands) in replay.enumerate() {
        let hands = hands?;
        let gestures = hands
            .iter()
            .map(|hand| match gesture::classify(hand) {
                Some(gesture) => {
                    recognized += 1;
                    gesture.tag()
                }
                None => "-",
            })
            .collect::<Vec<_>>();
        println!("{i:>6}: {}", gestures.join(" "));
        frames += 1;
    }

    log::info!("{frames} frames, {recognized} recognized gestures");
    Ok(())
}
