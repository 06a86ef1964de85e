//! Beatsphere library - audio-reactive pulsing mesh visualizer

pub mod animation;
pub mod audio;
pub mod cli;
pub mod controls;
pub mod error;
pub mod mesh;
pub mod params;
pub mod rendering;
