//! The host's global time multiplier and audio switch.
//!
//! The pause coordinator freezes and restores these around ad breaks. Hosts
//! that already own a clock implement `TimeControl` for it; everyone else
//! can share a `GlobalClock`.

use std::cell::Cell;
use std::time::Duration;

/// Process-wide time scale and audio mute state.
///
/// Methods take `&self` so one instance can be shared (via `Rc`) between the
/// pause coordinator and whatever advances game time.
pub trait TimeControl {
    fn time_scale(&self) -> f32;
    fn set_time_scale(&self, scale: f32);
    fn audio_paused(&self) -> bool;
    fn set_audio_paused(&self, paused: bool);
}

/// The default in-process clock: a scale multiplier and a mute flag.
#[derive(Debug)]
pub struct GlobalClock {
    time_scale: Cell<f32>,
    audio_paused: Cell<bool>,
}

impl Default for GlobalClock {
    fn default() -> Self {
        Self {
            time_scale: Cell::new(1.0),
            audio_paused: Cell::new(false),
        }
    }
}

impl GlobalClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock starting at `scale` (e.g. slow motion) rather than `1.0`.
    pub fn with_time_scale(scale: f32) -> Self {
        let clock = Self::default();
        clock.time_scale.set(scale);
        clock
    }

    pub fn is_frozen(&self) -> bool {
        self.time_scale.get() <= 0.0
    }

    /// Converts a span of real time into game time at the current scale.
    pub fn scaled(&self, real: Duration) -> Duration {
        real.mul_f32(self.time_scale.get().max(0.0))
    }
}

impl TimeControl for GlobalClock {
    fn time_scale(&self) -> f32 {
        self.time_scale.get()
    }

    fn set_time_scale(&self, scale: f32) {
        self.time_scale.set(scale);
    }

    fn audio_paused(&self) -> bool {
        self.audio_paused.get()
    }

    fn set_audio_paused(&self, paused: bool) {
        self.audio_paused.set(paused);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_time_follows_the_multiplier() {
        let clock = GlobalClock::with_time_scale(0.5);
        assert_eq!(clock.scaled(Duration::from_secs(2)), Duration::from_secs(1));

        clock.set_time_scale(0.0);
        assert!(clock.is_frozen());
        assert_eq!(clock.scaled(Duration::from_secs(2)), Duration::ZERO);
    }
}
