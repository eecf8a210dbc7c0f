//! Contains common, primitive types shared by every Elementum component.
//!
//! This module defines the handle types returned by the hub and the pause
//! coordinator, the closed `GameState` enumeration, and the screen position
//! carried by gesture signals.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;

new_key_type! {
    /// Uniquely and safely identifies a handler registered with the `EventHub`.
    ///
    /// Keys are versioned, so an id that has been released never aliases a
    /// handler registered later in the same slot.
    pub struct SubscriptionId;

    /// Identifies a direct observer registered with the `PauseCoordinator`.
    pub struct ObserverId;
}

/// The phase the core loop is currently in. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameState {
    /// Normal play. Taps add mass.
    #[default]
    Playing,
    /// Frozen while an ad is on screen.
    Paused,
    /// End-game intensity phase. Taps still add mass.
    Collapse,
    /// Target mass reached with no hostile entities left.
    Win,
    /// Reserved terminal state.
    Lose,
}

impl GameState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameState::Playing => "Playing",
            GameState::Paused => "Paused",
            GameState::Collapse => "Collapse",
            GameState::Win => "Win",
            GameState::Lose => "Lose",
        }
    }

    /// Whether gestures are allowed to change progress in this state.
    pub fn accepts_input(&self) -> bool {
        matches!(self, GameState::Playing | GameState::Collapse)
    }

    /// Whether the run is over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameState::Win | GameState::Lose)
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A position on screen, in pixels, as reported by the gesture source.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}
