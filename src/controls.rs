//! Control panel boundary: the shared parameter store.
//!
//! `ParamStore` owns the single `VisualParameters` instance. The host's
//! control surface (keyboard, GUI, whatever) mutates it through the
//! setters here; the animation loop reads snapshots and advances the time
//! phase through a `ParamHandle`. Mutations go through a lock because the
//! audio and render sides of the host are not guaranteed to share a thread.

use std::sync::{Arc, Mutex};

use crate::params::VisualParameters;

/// A color channel as exposed by the control panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

/// One externally-visible parameter mutation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamChange {
    Color { channel: Channel, value: u8 },
    Amplitude(f32),
}

/// Shared-parameter handle for the animation loop
#[derive(Clone)]
pub struct ParamHandle {
    inner: Arc<Mutex<VisualParameters>>,
}

impl ParamHandle {
    /// Read the current parameters (non-blocking in practice; the lock is
    /// only ever held for plain field access)
    pub fn snapshot(&self) -> VisualParameters {
        *self.inner.lock().unwrap()
    }

    /// Advance the time phase by one tick's increment and return the new
    /// value. Called only by the loop, only while playing.
    pub fn advance_phase(&self, increment: f32) -> f32 {
        let mut params = self.inner.lock().unwrap();
        params.time_phase += increment;
        params.time_phase
    }
}

type Observer = Box<dyn FnMut(&ParamChange) + Send>;

/// Owns the shared `VisualParameters` and notifies observers on change
pub struct ParamStore {
    inner: Arc<Mutex<VisualParameters>>,
    observers: Vec<Observer>,
}

impl ParamStore {
    pub fn new(initial: VisualParameters) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
            observers: Vec::new(),
        }
    }

    /// Handle for the animation loop to read from
    pub fn handle(&self) -> ParamHandle {
        ParamHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Register an on-change observer. Observers run synchronously inside
    /// the mutating call, after the store has been updated.
    pub fn subscribe(&mut self, observer: impl FnMut(&ParamChange) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn snapshot(&self) -> VisualParameters {
        *self.inner.lock().unwrap()
    }

    /// Set one color channel to an absolute byte value
    pub fn set_channel(&mut self, channel: Channel, value: u8) {
        {
            let mut params = self.inner.lock().unwrap();
            let (r, g, b) = params.color_rgb;
            params.color_rgb = match channel {
                Channel::Red => (value, g, b),
                Channel::Green => (r, value, b),
                Channel::Blue => (r, g, value),
            };
        }
        self.notify(ParamChange::Color { channel, value });
    }

    /// Nudge one color channel, saturating at the byte range
    pub fn adjust_channel(&mut self, channel: Channel, delta: i16) {
        let current = {
            let params = self.inner.lock().unwrap();
            match channel {
                Channel::Red => params.color_rgb.0,
                Channel::Green => params.color_rgb.1,
                Channel::Blue => params.color_rgb.2,
            }
        };
        let value = (current as i16 + delta).clamp(0, u8::MAX as i16) as u8;
        self.set_channel(channel, value);
    }

    /// Set the wave amplitude (clamped at zero; no upper bound)
    pub fn set_amplitude(&mut self, amplitude: f32) {
        let amplitude = amplitude.max(0.0);
        self.inner.lock().unwrap().amplitude = amplitude;
        self.notify(ParamChange::Amplitude(amplitude));
    }

    /// Nudge the wave amplitude
    pub fn adjust_amplitude(&mut self, delta: f32) {
        let current = self.inner.lock().unwrap().amplitude;
        self.set_amplitude(current + delta);
    }

    fn notify(&mut self, change: ParamChange) {
        for observer in &mut self.observers {
            observer(&change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_set_channel_updates_shared_params() {
        let mut store = ParamStore::new(VisualParameters::default());
        let handle = store.handle();

        store.set_channel(Channel::Red, 200);

        assert_eq!(handle.snapshot().color_rgb, (200, 255, 0));
    }

    #[test]
    fn test_adjust_channel_saturates() {
        let mut store = ParamStore::new(VisualParameters::default());

        store.adjust_channel(Channel::Green, 100); // 255 + 100
        assert_eq!(store.snapshot().color_rgb.1, 255);

        store.adjust_channel(Channel::Red, -50); // 0 - 50
        assert_eq!(store.snapshot().color_rgb.0, 0);
    }

    #[test]
    fn test_amplitude_floors_at_zero() {
        let mut store = ParamStore::new(VisualParameters::default());

        store.adjust_amplitude(-10.0);

        assert_eq!(store.snapshot().amplitude, 0.0);
    }

    #[test]
    fn test_observer_sees_each_change() {
        let mut store = ParamStore::new(VisualParameters::default());
        let count = Arc::new(AtomicUsize::new(0));
        let count_obs = Arc::clone(&count);

        store.subscribe(move |change| {
            if let ParamChange::Color { channel, value } = change {
                assert_eq!(*channel, Channel::Blue);
                assert_eq!(*value, 42);
            }
            count_obs.fetch_add(1, Ordering::SeqCst);
        });

        store.set_channel(Channel::Blue, 42);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_advance_phase_is_monotonic() {
        let store = ParamStore::new(VisualParameters::default());
        let handle = store.handle();

        let a = handle.advance_phase(0.07);
        let b = handle.advance_phase(0.07);

        assert!(b > a);
        assert!((b - 0.14).abs() < 1e-6);
    }
}
