//! The render-animation loop: one tick = sample, map, apply, draw.
//!
//! The loop owns its collaborators (an `AudioSource` and a `FrameSink`) and
//! a handle to the shared visual parameters. It has two states: `Idle` and
//! `Running`. While running, each tick pulls one analysis sample, derives
//! the scale factor, advances the time-driven phase and rotation, applies
//! the externally-set color and amplitude, and issues one draw. While idle,
//! ticks stop perturbing the audio- and time-driven state but still apply
//! parameter edits and re-render the last frame.
//!
//! Scheduling is single-flight: `run` waits on the `Ticker` only after a
//! tick body has finished, so draws never overlap and there is never more
//! than one live tick chain.

use std::thread;
use std::time::Duration;

use crate::audio::AudioSource;
use crate::controls::ParamHandle;
use crate::error::VizError;
use crate::params::TickConfig;

/// Fixed divisor mapping byte-scale average frequency onto the scale
/// factor. 128 keeps the analyser's 0-255 range inside roughly 1x-3x.
pub const FREQUENCY_DIVISOR: f32 = 128.0;

/// Scale factor derived from average frequency energy.
///
/// Pure and total: >= 1.0 for any non-negative input, exactly 1.0 at zero.
pub fn scale_factor(average_frequency: f32) -> f32 {
    1.0 + average_frequency.max(0.0) / FREQUENCY_DIVISOR
}

/// Everything the sink needs to draw one frame.
///
/// Recomputed from scratch every tick; only `rotation_angle` accumulates
/// across ticks (and `time_phase`, which lives in the shared parameters).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    pub scale_factor: f32,
    pub rotation_angle: f32,
    pub time_phase: f32,
    pub color_rgb: (u8, u8, u8),
    pub amplitude: f32,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            rotation_angle: 0.0,
            time_phase: 0.0,
            color_rgb: (0, 255, 0),
            amplitude: 0.1,
        }
    }
}

/// Draw target boundary. The mesh handles (GPU buffers, pipelines) live
/// behind this trait, opaque to the loop.
pub trait FrameSink {
    /// Draw one frame from the given state. An error is fatal to this
    /// frame only; the loop logs it and carries on.
    fn draw(&mut self, state: &RenderState) -> Result<(), VizError>;
}

/// Tick scheduling boundary, so cadence and cancellation are testable
/// without a real display.
pub trait Ticker {
    /// Block until the next tick is due. Returning `false` ends the chain.
    fn wait(&mut self) -> bool;
}

/// Fixed post-tick delay, like the original's `setTimeout(1000/30)`.
/// No drift compensation: the cadence is a soft target.
pub struct IntervalTicker {
    period: Duration,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn from_config(config: &TickConfig) -> Self {
        Self::new(config.tick_period())
    }
}

impl Ticker for IntervalTicker {
    fn wait(&mut self) -> bool {
        thread::sleep(self.period);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Idle,
    Running,
}

/// Drives the bounded-rate visual update cycle for a playing session
pub struct AnimationLoop<A: AudioSource, S: FrameSink> {
    audio: A,
    sink: S,
    params: ParamHandle,
    config: TickConfig,
    state: LoopState,
    render_state: RenderState,
    ticks: u64,
}

impl<A: AudioSource, S: FrameSink> AnimationLoop<A, S> {
    pub fn new(audio: A, sink: S, params: ParamHandle, config: TickConfig) -> Self {
        let initial = params.snapshot();
        let render_state = RenderState {
            color_rgb: initial.color_rgb,
            amplitude: initial.amplitude,
            time_phase: initial.time_phase,
            ..RenderState::default()
        };
        Self {
            audio,
            sink,
            params,
            config,
            state: LoopState::Idle,
            render_state,
            ticks: 0,
        }
    }

    /// Begin playback. Idempotent: a second start while running is a no-op,
    /// so toggling never stacks tick chains or playback sessions.
    pub fn start(&mut self) {
        if self.state == LoopState::Running {
            return;
        }
        self.audio.play();
        self.state = LoopState::Running;
        tracing::info!("session started");
    }

    /// Pause playback. The tick chain may keep firing; idle ticks stop
    /// perturbing audio- and time-driven render state.
    pub fn stop(&mut self) {
        if self.state == LoopState::Idle {
            return;
        }
        self.audio.pause();
        self.state = LoopState::Idle;
        tracing::info!("session stopped");
    }

    pub fn toggle(&mut self) {
        match self.state {
            LoopState::Idle => self.start(),
            LoopState::Running => self.stop(),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == LoopState::Running
    }

    /// State applied by the most recent tick
    pub fn render_state(&self) -> &RenderState {
        &self.render_state
    }

    /// Ticks executed so far (draws issued, barring sink failures)
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Execute one tick body: sample, derive, apply, draw.
    ///
    /// Never fails: missing analysis data reads as silence, and a rejected
    /// frame is logged and skipped.
    pub fn tick(&mut self) {
        if self.state == LoopState::Running {
            // Zeroed when the source has no buffered audio yet
            let sample = self.audio.sample();
            self.render_state.scale_factor = scale_factor(sample.average_frequency);
            self.render_state.time_phase = self.params.advance_phase(self.config.phase_increment);
            self.render_state.rotation_angle += self.config.rotation_increment;
        }

        // Control panel edits apply on the very next tick, playing or not
        let params = self.params.snapshot();
        self.render_state.color_rgb = params.color_rgb;
        self.render_state.amplitude = params.amplitude;

        if let Err(e) = self.sink.draw(&self.render_state) {
            tracing::warn!("frame skipped: {e}");
        }
        self.ticks += 1;
    }

    /// Run the tick chain until the ticker cancels it. The wait happens
    /// after each body, so tick N+1 is only scheduled once tick N is done.
    pub fn run(&mut self, ticker: &mut dyn Ticker) {
        loop {
            self.tick();
            if !ticker.wait() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AnalysisSample, BIN_COUNT};
    use crate::controls::ParamStore;
    use crate::params::VisualParameters;
    use std::cell::Cell;
    use std::rc::Rc;

    struct FakeSource {
        average_frequency: f32,
        playing: bool,
        play_calls: u32,
        pause_calls: u32,
    }

    impl FakeSource {
        fn with_level(average_frequency: f32) -> Self {
            Self {
                average_frequency,
                playing: false,
                play_calls: 0,
                pause_calls: 0,
            }
        }
    }

    impl AudioSource for FakeSource {
        fn play(&mut self) {
            self.playing = true;
            self.play_calls += 1;
        }

        fn pause(&mut self) {
            self.playing = false;
            self.pause_calls += 1;
        }

        fn is_playing(&self) -> bool {
            self.playing
        }

        fn sample(&self) -> AnalysisSample {
            AnalysisSample {
                average_frequency: self.average_frequency,
                bins: [self.average_frequency; BIN_COUNT],
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        draws: Rc<Cell<u32>>,
        fail: bool,
        last: Option<RenderState>,
    }

    impl FrameSink for RecordingSink {
        fn draw(&mut self, state: &RenderState) -> Result<(), VizError> {
            if self.fail {
                return Err(VizError::RenderTarget(wgpu::SurfaceError::Lost));
            }
            self.draws.set(self.draws.get() + 1);
            self.last = Some(*state);
            Ok(())
        }
    }

    fn make_loop(
        average_frequency: f32,
    ) -> (
        AnimationLoop<FakeSource, RecordingSink>,
        ParamStore,
        Rc<Cell<u32>>,
    ) {
        let store = ParamStore::new(VisualParameters::default());
        let sink = RecordingSink::default();
        let draws = Rc::clone(&sink.draws);
        let viz = AnimationLoop::new(
            FakeSource::with_level(average_frequency),
            sink,
            store.handle(),
            TickConfig::default(),
        );
        (viz, store, draws)
    }

    #[test]
    fn test_scale_factor_floor() {
        // Never below 1, even for silence or junk negative input
        assert_eq!(scale_factor(0.0), 1.0);
        assert_eq!(scale_factor(-5.0), 1.0);
        for f in [0.5, 64.0, 128.0, 255.0, 1000.0] {
            assert!(scale_factor(f) >= 1.0);
        }
    }

    #[test]
    fn test_scale_factor_reference_points() {
        assert_eq!(scale_factor(128.0), 2.0);
        assert!((scale_factor(64.0) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_phase_and_rotation_increase_monotonically() {
        let (mut viz, _store, _draws) = make_loop(10.0);
        viz.start();

        let mut last_phase = f32::MIN;
        let mut last_rotation = f32::MIN;
        for _ in 0..20 {
            viz.tick();
            let state = viz.render_state();
            assert!(state.time_phase > last_phase);
            assert!(state.rotation_angle > last_rotation);
            last_phase = state.time_phase;
            last_rotation = state.rotation_angle;
        }
    }

    #[test]
    fn test_start_stop_round_trip() {
        let (mut viz, _store, _draws) = make_loop(0.0);
        assert!(!viz.is_playing());

        viz.toggle();
        assert!(viz.is_playing());
        viz.toggle();
        assert!(!viz.is_playing());

        // Repeated starts don't stack playback sessions
        viz.start();
        viz.start();
        assert_eq!(viz.audio.play_calls, 2); // toggle + one effective start
        assert_eq!(viz.audio.pause_calls, 1);
    }

    #[test]
    fn test_color_change_applies_next_tick() {
        let (mut viz, mut store, _draws) = make_loop(0.0);
        viz.start();
        viz.tick();
        assert_eq!(viz.render_state().color_rgb, (0, 255, 0));

        store.set_channel(crate::controls::Channel::Red, 200);
        viz.tick();
        assert_eq!(viz.render_state().color_rgb, (200, 255, 0));
    }

    #[test]
    fn test_color_change_applies_while_idle() {
        let (mut viz, mut store, _draws) = make_loop(99.0);
        viz.start();
        viz.tick();
        viz.stop();

        store.set_channel(crate::controls::Channel::Blue, 7);
        viz.tick();
        assert_eq!(viz.render_state().color_rgb.2, 7);
    }

    #[test]
    fn test_idle_ticks_freeze_audio_and_time_state() {
        let (mut viz, _store, draws) = make_loop(128.0);
        viz.start();
        viz.tick();
        let frozen = *viz.render_state();
        assert_eq!(frozen.scale_factor, 2.0);

        viz.stop();
        // Louder audio after stopping must not perturb render state
        viz.audio.average_frequency = 255.0;
        for _ in 0..5 {
            viz.tick();
        }

        let state = viz.render_state();
        assert_eq!(state.scale_factor, frozen.scale_factor);
        assert_eq!(state.time_phase, frozen.time_phase);
        assert_eq!(state.rotation_angle, frozen.rotation_angle);
        // Re-rendering the last frame is allowed and expected
        assert_eq!(draws.get(), 6);
    }

    #[test]
    fn test_ten_tick_session() {
        let (mut viz, _store, draws) = make_loop(64.0);
        let increment = TickConfig::default().rotation_increment;
        viz.start();

        for _ in 0..10 {
            viz.tick();
            assert!((viz.render_state().scale_factor - 1.5).abs() < 1e-6);
        }

        assert_eq!(draws.get(), 10);
        assert!((viz.render_state().rotation_angle - 10.0 * increment).abs() < 1e-5);

        // The sink saw exactly the state the loop derived
        let drawn = viz.sink_mut().last.expect("sink drew at least once");
        assert_eq!(drawn, *viz.render_state());
    }

    #[test]
    fn test_sink_failure_does_not_kill_the_loop() {
        let (mut viz, _store, draws) = make_loop(64.0);
        viz.start();

        viz.sink_mut().fail = true;
        viz.tick();
        assert_eq!(draws.get(), 0);

        // Loop stays live; the next tick draws again
        viz.sink_mut().fail = false;
        viz.tick();
        assert_eq!(draws.get(), 1);
        assert_eq!(viz.ticks(), 2);
    }

    struct CountdownTicker {
        remaining: u32,
    }

    impl Ticker for CountdownTicker {
        fn wait(&mut self) -> bool {
            if self.remaining == 0 {
                return false;
            }
            self.remaining -= 1;
            true
        }
    }

    #[test]
    fn test_run_is_single_flight_and_cancellable() {
        let (mut viz, _store, draws) = make_loop(0.0);
        viz.start();

        // 7 waits allow exactly 8 tick bodies (one before each wait, one final)
        viz.run(&mut CountdownTicker { remaining: 7 });

        assert_eq!(draws.get(), 8);
        assert_eq!(viz.ticks(), 8);
    }
}
