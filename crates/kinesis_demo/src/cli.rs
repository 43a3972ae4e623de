use clap::{Parser, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

/// User-specified command line parameters
#[derive(Debug, Parser)]
#[clap(name = "Kinesis Demo", about)]
pub struct Args {
    /// Which demo scene to run.
    #[clap(value_enum)]
    pub demo: Demo,

    #[clap(long, short = 'f', default_value_t = 600)]
    /// Number of frames to simulate, at 60 frames per second.
    pub frames: u32,

    #[clap(long, short = 'c')]
    /// Path to a TOML scene config file.
    pub config: Option<PathBuf>,

    #[clap(long, value_enum, default_value_t = LogLevel::Info)]
    /// Most verbose log level to print.
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Demo {
    /// Paddle and ball, driven by commands, messages and collision callbacks.
    Breakout,
    /// Bubbles that get shot, bounce around and pop.
    Bubbles,
    /// Balls raining down on a floor, simulated by the rigid-body solver.
    Rain,
    /// A swarm of flickering bugs following the mouse.
    Swarm,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn arguments_parse() {
        Args::command().debug_assert();

        let args = Args::parse_from(["kinesis_demo", "rain", "--frames", "10", "--log-level", "debug"]);
        assert_eq!(args.demo, Demo::Rain);
        assert_eq!(args.frames, 10);
        assert_eq!(LevelFilter::from(args.log_level), LevelFilter::Debug);
        assert!(args.config.is_none());
    }
}
