//! Defines every signal carried by the `EventHub`.
//!
//! This module is the public contract between the core and its listeners.
//! Topic names are part of that contract: UI, analytics and tooling address
//! topics by these exact strings.

use crate::common::{GameState, ScreenPoint};
use crate::error::UnknownTopic;
use std::fmt;
use std::str::FromStr;

/// Well-known `reason` strings attached to `GameEvent::MassChanged`.
pub mod reason {
    /// Mass gained from a player tap.
    pub const TAP: &str = "tap";
    /// Zero-delta baseline published when a run starts.
    pub const RUN_START: &str = "run-start";
}

/// A named channel on the hub. Every `GameEvent` belongs to exactly one topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    GestureTap,
    GestureSwipe,
    GestureHold,
    StateChanged,
    MassChanged,
    MilestoneRequested,
    CollapseStarted,
    WinReached,
    AdOpened,
    AdClosed,
    RewardGranted,
    SaveRequested,
}

impl Topic {
    /// All topics, in declaration order.
    pub const ALL: [Topic; 12] = [
        Topic::GestureTap,
        Topic::GestureSwipe,
        Topic::GestureHold,
        Topic::StateChanged,
        Topic::MassChanged,
        Topic::MilestoneRequested,
        Topic::CollapseStarted,
        Topic::WinReached,
        Topic::AdOpened,
        Topic::AdClosed,
        Topic::RewardGranted,
        Topic::SaveRequested,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::GestureTap => "gesture-tap",
            Topic::GestureSwipe => "gesture-swipe",
            Topic::GestureHold => "gesture-hold",
            Topic::StateChanged => "state-changed",
            Topic::MassChanged => "mass-changed",
            Topic::MilestoneRequested => "milestone-requested",
            Topic::CollapseStarted => "collapse-started",
            Topic::WinReached => "win-reached",
            Topic::AdOpened => "ad-opened",
            Topic::AdClosed => "ad-closed",
            Topic::RewardGranted => "reward-granted",
            Topic::SaveRequested => "save-requested",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .iter()
            .copied()
            .find(|topic| topic.as_str() == s.trim())
            .ok_or_else(|| UnknownTopic(s.to_string()))
    }
}

/// A signal published on the hub, with its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// A classified tap from the gesture source.
    GestureTap { position: ScreenPoint },
    /// A classified swipe. The core loop does not consume it.
    GestureSwipe {
        start: ScreenPoint,
        end: ScreenPoint,
        duration_secs: f32,
    },
    /// A classified hold. The core loop does not consume it.
    GestureHold {
        position: ScreenPoint,
        duration_secs: f32,
    },
    /// The core loop entered a new state.
    StateChanged { state: GameState },
    /// Mass changed by `delta` (negative on removal) and now equals `mass`.
    MassChanged {
        mass: i64,
        delta: i64,
        reason: String,
    },
    /// A one-shot reward-choice checkpoint was crossed.
    MilestoneRequested { checkpoint_percent: u8 },
    CollapseStarted,
    WinReached,
    AdOpened,
    AdClosed,
    RewardGranted,
    /// Ask the persistence service to write now.
    SaveRequested,
}

impl GameEvent {
    /// The topic this event is dispatched on.
    pub fn topic(&self) -> Topic {
        match self {
            GameEvent::GestureTap { .. } => Topic::GestureTap,
            GameEvent::GestureSwipe { .. } => Topic::GestureSwipe,
            GameEvent::GestureHold { .. } => Topic::GestureHold,
            GameEvent::StateChanged { .. } => Topic::StateChanged,
            GameEvent::MassChanged { .. } => Topic::MassChanged,
            GameEvent::MilestoneRequested { .. } => Topic::MilestoneRequested,
            GameEvent::CollapseStarted => Topic::CollapseStarted,
            GameEvent::WinReached => Topic::WinReached,
            GameEvent::AdOpened => Topic::AdOpened,
            GameEvent::AdClosed => Topic::AdClosed,
            GameEvent::RewardGranted => Topic::RewardGranted,
            GameEvent::SaveRequested => Topic::SaveRequested,
        }
    }

    pub(crate) fn mass_changed(mass: i64, delta: i64, reason: impl Into<String>) -> Self {
        GameEvent::MassChanged {
            mass,
            delta,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_names_parse_back() {
        for topic in Topic::ALL {
            assert_eq!(topic.as_str().parse::<Topic>(), Ok(topic));
        }
        assert_eq!(
            "mass changed".parse::<Topic>(),
            Err(UnknownTopic("mass changed".to_string()))
        );
    }

    #[test]
    fn events_route_to_their_topic() {
        let event = GameEvent::mass_changed(5, 1, reason::TAP);
        assert_eq!(event.topic(), Topic::MassChanged);
        assert_eq!(
            GameEvent::MilestoneRequested {
                checkpoint_percent: 33
            }
            .topic(),
            Topic::MilestoneRequested
        );
        assert_eq!(GameEvent::SaveRequested.topic().to_string(), "save-requested");
    }
}
