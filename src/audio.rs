//! WAV playback and frequency analysis.
//!
//! `AudioSystem` decodes a WAV asset up front, plays it looped through the
//! default cpal output device, and runs an FFT analysis thread over the
//! samples actually sent to the device. Analysis results are exposed as
//! byte-scale (0-255) bin amplitudes, the convention of a WebAudio
//! analyser, so downstream visual mappings can assume that range.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::error::VizError;
use crate::params::AnalyserConfig;

/// Number of frequency bins reported per analysis pass
pub const BIN_COUNT: usize = 32;

/// Playback gain applied to every output sample
const PLAYBACK_VOLUME: f32 = 0.5;

/// One snapshot of frequency-domain data.
///
/// Bin amplitudes are on a 0-255 scale; `average_frequency` is the mean of
/// the bins. A zeroed sample means "no data yet", never an error.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisSample {
    pub average_frequency: f32,
    pub bins: [f32; BIN_COUNT],
}

impl Default for AnalysisSample {
    fn default() -> Self {
        Self {
            average_frequency: 0.0,
            bins: [0.0; BIN_COUNT],
        }
    }
}

impl AnalysisSample {
    pub fn from_bins(bins: [f32; BIN_COUNT]) -> Self {
        let average_frequency = bins.iter().sum::<f32>() / BIN_COUNT as f32;
        Self {
            average_frequency,
            bins,
        }
    }
}

/// Buffered audio playback with non-blocking frequency analysis
pub trait AudioSource {
    fn play(&mut self);
    fn pause(&mut self);
    fn is_playing(&self) -> bool;

    /// Last-known analysis data. Non-blocking; zeroed until the analyser
    /// has processed its first window.
    fn sample(&self) -> AnalysisSample;
}

/// Audio system managing WAV playback and FFT analysis
pub struct AudioSystem {
    /// Shared analysis snapshot (thread-safe)
    sample: Arc<Mutex<AnalysisSample>>,

    /// Playback gate read by the output callback
    playing: Arc<AtomicBool>,

    /// Audio output stream (kept alive)
    _stream: cpal::Stream,

    /// FFT analysis thread handle (optional, for cleanup)
    _analysis_thread: Option<thread::JoinHandle<()>>,
}

impl AudioSystem {
    /// Decode the asset, open the output device, and start the (paused)
    /// playback stream plus the analysis thread.
    pub fn load(path: &Path, config: AnalyserConfig) -> Result<Self, VizError> {
        config.validate()?;

        let (samples, wav_rate) = decode_wav(path)?;
        let samples = Arc::new(samples);

        // Shared state between the output callback and the analysis thread
        let playing = Arc::new(AtomicBool::new(false));
        let playing_cb = Arc::clone(&playing);

        let analysis_buffer = Arc::new(Mutex::new(Vec::<f32>::new()));
        let analysis_buffer_cb = Arc::clone(&analysis_buffer);

        let sample = Arc::new(Mutex::new(AnalysisSample::default()));
        let sample_analysis = Arc::clone(&sample);

        // Setup audio output device
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| VizError::AudioDevice("no output device found".into()))?;

        let device_config = device
            .default_output_config()
            .map_err(|e| VizError::AudioDevice(e.to_string()))?;

        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "unknown".into()),
            rate = device_config.sample_rate().0,
            "audio output ready"
        );

        let out_channels = device_config.channels() as usize;
        let out_rate = device_config.sample_rate().0 as f64;
        // Nearest-sample stepping keeps playback at the right pitch when
        // the device rate differs from the asset rate
        let step = wav_rate as f64 / out_rate;
        let mut position = 0.0_f64;

        let stream = device
            .build_output_stream(
                &device_config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !playing_cb.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }

                    let mut buf = analysis_buffer_cb.lock().unwrap();
                    for frame in data.chunks_mut(out_channels) {
                        let value = samples[position as usize] * PLAYBACK_VOLUME;
                        for slot in frame.iter_mut() {
                            *slot = value;
                        }
                        buf.push(value);

                        position += step;
                        // Looped playback
                        if position as usize >= samples.len() {
                            position = 0.0;
                        }
                    }
                },
                |err| tracing::error!("audio stream error: {err}"),
                None,
            )
            .map_err(|e| VizError::AudioStream(e.to_string()))?;

        // The stream itself always runs; pause is the atomic gate above
        stream
            .play()
            .map_err(|e| VizError::AudioStream(e.to_string()))?;

        let analysis_thread = spawn_analysis_thread(config, analysis_buffer, sample_analysis);

        Ok(Self {
            sample,
            playing,
            _stream: stream,
            _analysis_thread: Some(analysis_thread),
        })
    }
}

impl AudioSource for AudioSystem {
    fn play(&mut self) {
        self.playing.store(true, Ordering::Relaxed);
    }

    fn pause(&mut self) {
        self.playing.store(false, Ordering::Relaxed);
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    fn sample(&self) -> AnalysisSample {
        *self.sample.lock().unwrap()
    }
}

/// Decode a WAV file into mono f32 samples plus its sample rate
fn decode_wav(path: &Path) -> Result<(Vec<f32>, u32), VizError> {
    let asset_load = |source: hound::Error| VizError::AssetLoad {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = hound::WavReader::open(path).map_err(asset_load)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(asset_load)?,
        hound::SampleFormat::Int => {
            let max = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<Result<_, _>>()
                .map_err(asset_load)?
        }
    };

    if interleaved.is_empty() {
        return Err(asset_load(hound::Error::FormatError("empty audio asset")));
    }

    // Mix down to mono
    let mono: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    Ok((mono, spec.sample_rate))
}

/// Spawn the FFT analysis thread
fn spawn_analysis_thread(
    config: AnalyserConfig,
    analysis_buffer: Arc<Mutex<Vec<f32>>>,
    sample: Arc<Mutex<AnalysisSample>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.fft_size);
        let mut fft_input = vec![Complex::new(0.0, 0.0); config.fft_size];
        let mut smoothed = [0.0_f32; BIN_COUNT];

        loop {
            thread::sleep(Duration::from_millis(config.update_interval_ms));

            let mut buf = analysis_buffer.lock().unwrap();
            if buf.len() < config.fft_size {
                continue; // Not enough played audio yet; keep last sample
            }

            // Analyze the most recent window
            let start = buf.len() - config.fft_size;
            for (i, value) in buf[start..].iter().enumerate() {
                fft_input[i] = Complex::new(value * hann_window(i, config.fft_size), 0.0);
            }

            // 50% overlap; also bounds the buffer between passes
            let keep = config.fft_size / 2;
            let excess = buf.len() - keep;
            buf.drain(0..excess);
            drop(buf);

            fft.process(&mut fft_input);

            let spectrum: Vec<f32> = fft_input[..config.spectrum_len()]
                .iter()
                .map(|c| magnitude_to_byte(c.norm() * 2.0 / config.fft_size as f32, &config))
                .collect();

            let bins = fold_spectrum(&spectrum);
            let tc = config.smoothing_time_constant;
            for (s, b) in smoothed.iter_mut().zip(bins.iter()) {
                *s = tc * *s + (1.0 - tc) * b;
            }

            *sample.lock().unwrap() = AnalysisSample::from_bins(smoothed);
        }
    })
}

/// Hann window function for FFT analysis
fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}

/// Map a normalized FFT magnitude onto the 0-255 byte scale through the
/// configured decibel window
fn magnitude_to_byte(magnitude: f32, config: &AnalyserConfig) -> f32 {
    let db = 20.0 * magnitude.max(1e-12).log10();
    let normalized = (db - config.min_decibels) / (config.max_decibels - config.min_decibels);
    normalized.clamp(0.0, 1.0) * 255.0
}

/// Fold a full spectrum into `BIN_COUNT` bins by averaging equal chunks
fn fold_spectrum(spectrum: &[f32]) -> [f32; BIN_COUNT] {
    let chunk = (spectrum.len() / BIN_COUNT).max(1);
    let mut bins = [0.0_f32; BIN_COUNT];
    for (i, bin) in bins.iter_mut().enumerate() {
        let start = (i * chunk).min(spectrum.len() - 1);
        let end = ((i + 1) * chunk).min(spectrum.len());
        *bin = spectrum[start..end].iter().sum::<f32>() / (end - start) as f32;
    }
    bins
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window() {
        let size = 1024;

        // Hann window should be 0 at edges, 1 at center
        assert!((hann_window(0, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size - 1, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size / 2, size) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_magnitude_to_byte_endpoints() {
        let config = AnalyserConfig::default();

        // Silence pins to 0; anything at or above the max-dB window pins to 255
        assert_eq!(magnitude_to_byte(0.0, &config), 0.0);
        assert_eq!(magnitude_to_byte(1.0, &config), 255.0);

        // -65 dB sits at the middle of the [-100, -30] window
        let mid = magnitude_to_byte(10.0_f32.powf(-65.0 / 20.0), &config);
        assert!((mid - 127.5).abs() < 0.5);
    }

    #[test]
    fn test_fold_spectrum_length_and_average() {
        let spectrum = vec![10.0; 512];
        let bins = fold_spectrum(&spectrum);

        assert_eq!(bins.len(), BIN_COUNT);
        assert!(bins.iter().all(|b| (b - 10.0).abs() < 1e-6));
    }

    #[test]
    fn test_sample_average_is_mean_of_bins() {
        let mut bins = [0.0; BIN_COUNT];
        bins[0] = 64.0 * BIN_COUNT as f32;

        let sample = AnalysisSample::from_bins(bins);

        assert!((sample.average_frequency - 64.0).abs() < 1e-3);
    }

    #[test]
    fn test_default_sample_is_silence() {
        let sample = AnalysisSample::default();

        assert_eq!(sample.average_frequency, 0.0);
        assert!(sample.bins.iter().all(|b| *b == 0.0));
    }
}
