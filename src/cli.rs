//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::params::{TickConfig, VisualParameters};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "Beatsphere")]
#[command(about = "Audio-reactive wireframe sphere visualizer", long_about = None)]
pub struct Args {
    /// WAV asset to play
    #[arg(long, value_name = "PATH", default_value = "static/beats.wav")]
    pub asset: PathBuf,

    /// Target tick rate (Hz)
    #[arg(long, value_name = "HZ", default_value = "30")]
    pub tick_hz: u32,

    /// Initial mesh color as R,G,B bytes
    #[arg(long, value_name = "R,G,B", default_value = "0,255,0")]
    pub color: String,

    /// Initial wave displacement amplitude
    #[arg(long, value_name = "UNITS", default_value = "0.1")]
    pub amplitude: f32,

    /// Start playback immediately instead of waiting for Space
    #[arg(long)]
    pub autoplay: bool,
}

impl Args {
    /// Initial visual parameters from the command line
    pub fn initial_params(&self) -> VisualParameters {
        VisualParameters {
            amplitude: self.amplitude.max(0.0),
            color_rgb: self.parse_color(),
            time_phase: 0.0,
        }
    }

    /// Loop tuning from the command line
    pub fn tick_config(&self) -> TickConfig {
        TickConfig {
            tick_hz: self.tick_hz.max(1),
            ..TickConfig::default()
        }
    }

    fn parse_color(&self) -> (u8, u8, u8) {
        let parts: Vec<_> = self
            .color
            .split(',')
            .map(|p| p.trim().parse::<u8>())
            .collect();

        match parts.as_slice() {
            [Ok(r), Ok(g), Ok(b)] => (*r, *g, *b),
            _ => {
                tracing::warn!(color = %self.color, "unparseable color, using green");
                (0, 255, 0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_with_color(color: &str) -> Args {
        Args::parse_from(["beatsphere", "--color", color])
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(args_with_color("10, 20,30").parse_color(), (10, 20, 30));
    }

    #[test]
    fn test_bad_color_falls_back_to_green() {
        assert_eq!(args_with_color("10,20").parse_color(), (0, 255, 0));
        assert_eq!(args_with_color("256,0,0").parse_color(), (0, 255, 0));
        assert_eq!(args_with_color("lime").parse_color(), (0, 255, 0));
    }

    #[test]
    fn test_tick_config_floors_at_one_hz() {
        let args = Args::parse_from(["beatsphere", "--tick-hz", "0"]);
        assert_eq!(args.tick_config().tick_hz, 1);
    }
}
