use crate::cli::Demo;
use clap::Parser;
use kinesis::{Scene, SceneConfig};
use kinesis_utils::{AnyResult, AnyhowResultExt};
use log::*;

pub mod breakout;
pub mod bubbles;
pub mod cli;
pub mod rain;
pub mod swarm;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fixed frame time the demos are simulated at.
pub const FRAME_TIME: f32 = 1.0 / 60.0;

pub fn main() -> AnyResult {
    let args = cli::Args::parse();

    pretty_env_logger::formatted_builder()
        .format_indent(None)
        .format_timestamp(None)
        .filter_level(args.log_level.into())
        .init();

    info!("Kinesis demo {VERSION}");

    let config = match &args.config {
        Some(path) => SceneConfig::load(path)
            .otherwise(format!("couldn't load scene config from {}", path.display()))?,
        None => SceneConfig::default(),
    };
    debug!("Scene config: {config:#?}");

    match args.demo {
        Demo::Breakout => breakout::run(config, args.frames),
        Demo::Bubbles => bubbles::run(config, args.frames),
        Demo::Rain => rain::run(config, args.frames),
        Demo::Swarm => swarm::run(config, args.frames),
    }
}

/// Logs a short timing summary of the frames the scene still remembers.
pub fn report_timings(scene: &Scene) {
    let (frames, total) = scene
        .frame_history()
        .fold((0u32, 0.0f64), |(frames, total), timing| {
            (frames + 1, total + timing.total.as_secs_f64())
        });

    if frames == 0 {
        return;
    }

    info!(
        "Average frame time over the last {frames} frames: {:.3}ms",
        total / frames as f64 * 1000.0
    );

    if let Some(last) = scene.last_frame() {
        for timing in &last.system_timings {
            debug!(" - {}: {:?}", timing.label, timing.duration);
        }
    }
}
