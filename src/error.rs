//! Error taxonomy for the visualizer.
//!
//! Only asset loading is allowed to abort startup; everything that happens
//! inside a running tick is absorbed locally (see `animation`).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VizError {
    /// The audio asset could not be read or decoded. Surfaced once to the
    /// host at load time, never retried.
    #[error("failed to load audio asset {path}: {source}")]
    AssetLoad {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    /// No usable output device, or the device rejected our stream config.
    #[error("audio device unavailable: {0}")]
    AudioDevice(String),

    /// The output stream could not be built or started.
    #[error("audio stream: {0}")]
    AudioStream(String),

    /// Analyser configuration is unusable (e.g. non-power-of-two FFT size).
    #[error("invalid analyser config: {0}")]
    AnalyserConfig(String),

    /// GPU setup failed before the first frame.
    #[error("render init: {0}")]
    RenderInit(String),

    /// The render target rejected a frame. Fatal to that tick only; the
    /// loop logs it and skips the frame.
    #[error("render target invalid: {0}")]
    RenderTarget(#[from] wgpu::SurfaceError),
}
