//! Beatsphere - an audio-reactive wireframe sphere
//!
//! Plays a WAV asset and renders an icosphere that pulses with average
//! frequency energy, waves with a time-driven shader phase, and takes live
//! color/amplitude edits from the keyboard.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, ModifiersState, PhysicalKey},
    window::{Window, WindowId},
};

use beatsphere::animation::AnimationLoop;
use beatsphere::audio::AudioSystem;
use beatsphere::cli::Args;
use beatsphere::controls::{Channel, ParamStore};
use beatsphere::mesh::SphereMesh;
use beatsphere::params::{AnalyserConfig, RenderConfig, TickConfig};
use beatsphere::rendering::RenderSystem;

/// Color nudge per keypress (out of 255)
const COLOR_STEP: i16 = 5;

/// Amplitude nudge per keypress
const AMPLITUDE_STEP: f32 = 0.02;

/// Main application state
struct App {
    // Window and the loop that owns audio + rendering
    window: Option<Arc<Window>>,
    viz: Option<AnimationLoop<AudioSystem, RenderSystem>>,

    // Control panel state
    controls: ParamStore,
    modifiers: ModifiersState,

    // Configuration
    asset: PathBuf,
    autoplay: bool,
    tick_config: TickConfig,
    render_config: RenderConfig,

    // Tick pacing
    next_tick: Instant,
}

impl App {
    fn new(args: &Args) -> Self {
        let mut controls = ParamStore::new(args.initial_params());
        controls.subscribe(|change| tracing::info!(?change, "param change"));

        Self {
            window: None,
            viz: None,
            controls,
            modifiers: ModifiersState::empty(),
            asset: args.asset.clone(),
            autoplay: args.autoplay,
            tick_config: args.tick_config(),
            render_config: RenderConfig::default(),
            next_tick: Instant::now(),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        let window_attributes = Window::default_attributes()
            .with_title("Beatsphere")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                tracing::error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        let mesh = SphereMesh::icosphere(self.render_config.mesh_subdivisions);
        let render_system = match pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            &mesh,
            self.render_config.clone(),
        )) {
            Ok(rs) => rs,
            Err(e) => {
                tracing::error!("render init failed: {e}");
                event_loop.exit();
                return;
            }
        };

        // Asset load failure is surfaced once, here, and ends the app
        let audio = match AudioSystem::load(&self.asset, AnalyserConfig::default()) {
            Ok(audio) => audio,
            Err(e) => {
                tracing::error!("audio init failed: {e}");
                event_loop.exit();
                return;
            }
        };

        let mut viz = AnimationLoop::new(
            audio,
            render_system,
            self.controls.handle(),
            self.tick_config.clone(),
        );
        if self.autoplay {
            viz.start();
        }

        tracing::info!("Beatsphere is running. Space toggles playback, ESC quits.");

        self.window = Some(window);
        self.viz = Some(viz);
        self.next_tick = Instant::now();
    }

    fn about_to_wait(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        let Some(ref mut viz) = self.viz else {
            return;
        };

        // Fixed post-tick delay: the next tick is scheduled only after this
        // tick body returns, so draws never overlap
        let now = Instant::now();
        if now >= self.next_tick {
            viz.tick();
            self.next_tick = Instant::now() + self.tick_config.tick_period();
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_tick));
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(ref mut viz) = self.viz {
                    viz.sink_mut().resize(size.width, size.height);
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        ..
                    },
                ..
            } => self.handle_key(event_loop, code),
            _ => {}
        }
    }
}

impl App {
    /// Keyboard control panel: Space start/stop, R/G/B raise a color
    /// channel (Shift lowers), arrows adjust the wave amplitude
    fn handle_key(&mut self, event_loop: &winit::event_loop::ActiveEventLoop, code: KeyCode) {
        let step = if self.modifiers.shift_key() {
            -COLOR_STEP
        } else {
            COLOR_STEP
        };

        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::Space => {
                if let Some(ref mut viz) = self.viz {
                    viz.toggle();
                }
            }
            KeyCode::KeyR => self.controls.adjust_channel(Channel::Red, step),
            KeyCode::KeyG => self.controls.adjust_channel(Channel::Green, step),
            KeyCode::KeyB => self.controls.adjust_channel(Channel::Blue, step),
            KeyCode::ArrowUp => self.controls.adjust_amplitude(AMPLITUDE_STEP),
            KeyCode::ArrowDown => self.controls.adjust_amplitude(-AMPLITUDE_STEP),
            _ => {}
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beatsphere=info".into()),
        )
        .init();

    let args = Args::parse();
    let mut app = App::new(&args);

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.run_app(&mut app).context("event loop failed")?;
    Ok(())
}
