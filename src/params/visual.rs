//! Shared visual parameters and animation loop tuning.

use std::time::Duration;

/// User-adjustable visual parameters plus the loop-owned time phase.
///
/// Single shared instance for the lifetime of the process: the control
/// panel mutates `amplitude` and `color_rgb`, the animation loop advances
/// `time_phase` once per running tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualParameters {
    /// Wave displacement strength, in shader units along the vertex normal
    pub amplitude: f32,

    /// Mesh color, one byte per channel (the control panel's 0-255 sliders)
    pub color_rgb: (u8, u8, u8),

    /// Phase fed to the waving shader. Monotonically increasing while
    /// playing; wraps in f32 are acceptable since it feeds a sine.
    pub time_phase: f32,
}

impl Default for VisualParameters {
    fn default() -> Self {
        Self {
            amplitude: 0.1,
            color_rgb: (0, 255, 0), // Bright green for visibility
            time_phase: 0.0,
        }
    }
}

/// Animation loop scheduling and time-driven increments
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Target tick cadence (Hz). A soft guarantee: implemented as a fixed
    /// post-tick delay, not synced to display refresh.
    pub tick_hz: u32,

    /// `time_phase` advance per running tick (controls wave speed)
    pub phase_increment: f32,

    /// Decorative rotation advance per running tick (radians)
    pub rotation_increment: f32,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_hz: 30,
            phase_increment: 0.07,
            rotation_increment: 0.01,
        }
    }
}

impl TickConfig {
    /// Delay between the end of one tick body and the start of the next
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_hz.max(1) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_period() {
        let config = TickConfig::default();
        let period = config.tick_period();

        // 30 Hz = 33.3ms per tick
        assert!((period.as_secs_f64() - 1.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_tick_period_zero_hz_does_not_divide_by_zero() {
        let config = TickConfig {
            tick_hz: 0,
            ..TickConfig::default()
        };
        assert_eq!(config.tick_period(), Duration::from_secs(1));
    }
}
