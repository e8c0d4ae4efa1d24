//! Screens.

use std::fmt;

/// The mutually exclusive screens of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    /// Intro reveal and call-to-action.
    #[default]
    Welcome,
    /// The scenario catalog.
    ScenarioList,
    /// A scenario being played.
    Play,
}

impl Screen {
    /// Returns true if the machine may move from `self` to `to`.
    #[must_use]
    pub fn can_move_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Welcome | Self::Play, Self::ScenarioList) | (Self::ScenarioList, Self::Play)
        )
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Welcome => f.write_str("welcome"),
            Self::ScenarioList => f.write_str("scenario-list"),
            Self::Play => f.write_str("play"),
        }
    }
}
