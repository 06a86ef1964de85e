//! Frequency analyser configuration.

use crate::error::VizError;

/// Frequency analysis configuration.
///
/// The analyser reports byte-scale (0-255) bin amplitudes the way a
/// WebAudio analyser does: FFT magnitudes converted to decibels, then
/// mapped from a `[min_decibels, max_decibels]` window onto 0-255.
#[derive(Debug, Clone)]
pub struct AnalyserConfig {
    /// FFT window size in samples (must be a power of 2, and large enough
    /// that the spectrum covers `audio::BIN_COUNT` output bins)
    pub fft_size: usize,

    /// Analysis interval (milliseconds); independent of the render tick
    pub update_interval_ms: u64,

    /// Exponential smoothing factor in [0, 1); 0 disables smoothing
    pub smoothing_time_constant: f32,

    /// dB value mapped to byte 0
    pub min_decibels: f32,

    /// dB value mapped to byte 255
    pub max_decibels: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            update_interval_ms: 50,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl AnalyserConfig {
    /// Number of usable magnitude bins from one FFT pass
    pub fn spectrum_len(&self) -> usize {
        self.fft_size / 2
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> Result<(), VizError> {
        if !self.fft_size.is_power_of_two() {
            return Err(VizError::AnalyserConfig(format!(
                "FFT size must be power of 2, got {}",
                self.fft_size
            )));
        }
        if self.spectrum_len() < crate::audio::BIN_COUNT {
            return Err(VizError::AnalyserConfig(format!(
                "FFT size {} yields only {} spectrum bins, need at least {}",
                self.fft_size,
                self.spectrum_len(),
                crate::audio::BIN_COUNT
            )));
        }
        if !(0.0..1.0).contains(&self.smoothing_time_constant) {
            return Err(VizError::AnalyserConfig(format!(
                "smoothing time constant must be in [0, 1), got {}",
                self.smoothing_time_constant
            )));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(VizError::AnalyserConfig(format!(
                "min_decibels ({}) must be below max_decibels ({})",
                self.min_decibels, self.max_decibels
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AnalyserConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_power_of_two_fft() {
        let config = AnalyserConfig {
            fft_size: 1000,
            ..AnalyserConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_spectrum_smaller_than_bin_count() {
        let config = AnalyserConfig {
            fft_size: 32, // spectrum is only 16 bins
            ..AnalyserConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_db_window() {
        let config = AnalyserConfig {
            min_decibels: -30.0,
            max_decibels: -100.0,
            ..AnalyserConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
