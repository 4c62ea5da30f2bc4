//! Game controller vocabulary, as far as state estimation cares about it.
//!
//! Discriminants match the values the game controller puts on the wire, so they can be stored
//! as a single byte in recordings.
use strum::{Display, FromRepr};

/// The different competition types.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, FromRepr)]
#[repr(u8)]
pub enum CompetitionType {
    /// Normal game mode.
    #[default]
    Normal = 0,
    /// One versus one challenge.
    OneVsOneChallenge = 1,
    /// Shared autonomy challenge.
    SharedAutonomy = 2,
}

impl CompetitionType {
    /// Whether the localiser runs its game-state driven resets for this competition.
    #[must_use]
    pub fn has_game_resets(self) -> bool {
        matches!(self, Self::Normal | Self::OneVsOneChallenge)
    }
}

/// The different game phases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, FromRepr)]
#[repr(u8)]
pub enum GamePhase {
    #[default]
    Normal = 0,
    PenaltyShoot = 1,
    Overtime = 2,
    Timeout = 3,
}

/// The different game states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, FromRepr)]
#[repr(u8)]
pub enum GameState {
    #[default]
    Initial = 0,
    Ready = 1,
    Set = 2,
    Playing = 3,
    Finished = 4,
}

impl GameState {
    /// Ready, set and playing: the states in which the robot is on the field.
    #[must_use]
    pub fn is_on_field(self) -> bool {
        matches!(self, Self::Ready | Self::Set | Self::Playing)
    }
}

/// The different set plays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, FromRepr)]
#[repr(u8)]
pub enum SetPlay {
    #[default]
    None = 0,
    GoalKick = 1,
    PushingFreeKick = 2,
    CornerKick = 3,
    KickIn = 4,
    PenaltyKick = 5,
}

/// The different penalty states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, FromRepr)]
#[repr(u8)]
pub enum Penalty {
    #[default]
    None = 0,
    /// Ball holding / playing with hands.
    IllegalBallContact = 1,
    PlayerPushing = 2,
    /// Moved after the whistle in set.
    IllegalMotionInSet = 3,
    /// Fallen, inactive
    InactivePlayer = 4,
    IllegalPosition = 5,
    LeavingTheField = 6,
    RequestForPickup = 7,
    LocalGameStuck = 8,
    IllegalPositionInSet = 9,
    Substitute = 14,
    Manual = 15,
}

impl Penalty {
    #[must_use]
    pub fn is_penalised(self) -> bool {
        self != Self::None
    }
}
