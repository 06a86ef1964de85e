//! Parameter definitions with documented units and semantics.
//!
//! All tunable numbers live here with:
//! - Units (Hz, radians, shader units)
//! - Documented ranges and meanings
//! - Defaults matching the reference visuals

mod analyser;
mod render;
mod visual;

// Re-export all types
pub use analyser::AnalyserConfig;
pub use render::RenderConfig;
pub use visual::{TickConfig, VisualParameters};
