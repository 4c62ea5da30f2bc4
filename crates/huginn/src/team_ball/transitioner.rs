use nalgebra::{Vector2, vector};

use crate::field::{CORNER_KICK_ABS_X, CORNER_KICK_ABS_Y, GOAL_KICK_ABS_X, GOAL_KICK_ABS_Y};
use crate::types::{EstimatorInfoIn, EstimatorInfoInit, SetPlay};

/// Where the referee places the ball at the start of a set play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetPlayReset {
    OffenseGoalKick,
    DefenseGoalKick,
    OffenseCornerKick,
    DefenseCornerKick,
}

impl SetPlayReset {
    /// The placement on the side of the field the ball was last estimated on.
    #[must_use]
    pub fn position(self, prior_y: f32) -> Vector2<f32> {
        let side = if prior_y > 0.0 { 1.0 } else { -1.0 };
        match self {
            Self::OffenseGoalKick => vector![-GOAL_KICK_ABS_X, side * GOAL_KICK_ABS_Y],
            Self::DefenseGoalKick => vector![GOAL_KICK_ABS_X, side * GOAL_KICK_ABS_Y],
            Self::OffenseCornerKick => vector![CORNER_KICK_ABS_X, side * CORNER_KICK_ABS_Y],
            Self::DefenseCornerKick => vector![-CORNER_KICK_ABS_X, side * CORNER_KICK_ABS_Y],
        }
    }
}

/// Watches the set play for the start of a goal kick or corner kick.
#[derive(Debug, Clone)]
pub struct TeamBallTransitioner {
    team_number: i32,
    prev_set_play: SetPlay,
}

impl TeamBallTransitioner {
    #[must_use]
    pub fn new(init: &EstimatorInfoInit) -> Self {
        Self {
            team_number: init.team_number,
            prev_set_play: init.set_play,
        }
    }

    pub fn handle_transition(&mut self, input: &EstimatorInfoIn) -> Option<SetPlayReset> {
        let kicking = input.kicking_team == self.team_number;
        let changed = input.set_play != self.prev_set_play;
        self.prev_set_play = input.set_play;

        if !changed {
            return None;
        }

        let reset = match (input.set_play, kicking) {
            (SetPlay::GoalKick, true) => SetPlayReset::OffenseGoalKick,
            (SetPlay::GoalKick, false) => SetPlayReset::DefenseGoalKick,
            (SetPlay::CornerKick, true) => SetPlayReset::OffenseCornerKick,
            (SetPlay::CornerKick, false) => SetPlayReset::DefenseCornerKick,
            _ => return None,
        };
        tracing::debug!(?reset, "set play changed, placing team ball");
        Some(reset)
    }
}
