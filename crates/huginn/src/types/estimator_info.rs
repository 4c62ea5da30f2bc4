//! The records passed through the estimators each cycle.
use std::str::FromStr;

use strum::{Display, EnumString};

use super::{
    AbsCoord, ActionCommand, BallInfo, BehaviourSharedData, BodyCommand, BroadcastData,
    CompetitionType, FieldFeatureInfo, GamePhase, GameState, Odometry, Penalty, RobotObstacle,
    RobotVisionInfo, RrCoord, SensorValues, SetPlay, SharedStateEstimationBundle,
};

/// Where the localiser puts the robot on startup and after an initial state reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString)]
pub enum InitialPoseType {
    /// Sideline poses per player number.
    #[default]
    #[strum(serialize = "GAME")]
    Game,
    #[strum(serialize = "ONEVSONE")]
    OneVsOne,
    /// The pose from the configuration.
    #[strum(serialize = "SPECIFIED")]
    Specified,
    /// The poses a robot is placed on when returning from a penalty.
    #[strum(serialize = "UNPENALISED")]
    Unpenalised,
}

impl InitialPoseType {
    /// Parses a pose type name, falling back to [`InitialPoseType::Game`] for unknown names.
    #[must_use]
    pub fn parse_or_game(name: &str) -> Self {
        Self::from_str(name).unwrap_or_else(|_| {
            tracing::warn!("unknown initial pose type `{name}`, using GAME");
            Self::Game
        })
    }
}

/// Everything the estimators need to know at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct EstimatorInfoInit {
    pub player_number: i32,
    pub team_number: i32,
    pub initial_pose_type: InitialPoseType,
    pub specified_initial_pose: AbsCoord,
    /// Name of the behaviour skill that is running, e.g. `Game`
    pub skill: String,
    pub competition_type: CompetitionType,
    pub state: GameState,
    pub game_phase: GamePhase,
    pub set_play: SetPlay,
    pub handle_referee_mistakes: bool,
}

impl Default for EstimatorInfoInit {
    fn default() -> Self {
        Self {
            player_number: 1,
            team_number: 0,
            initial_pose_type: InitialPoseType::Game,
            specified_initial_pose: AbsCoord::default(),
            skill: "Game".to_string(),
            competition_type: CompetitionType::Normal,
            state: GameState::Initial,
            game_phase: GamePhase::Normal,
            set_play: SetPlay::None,
            handle_referee_mistakes: true,
        }
    }
}

impl EstimatorInfoInit {
    /// Whether the behaviour skill is driven by the game controller.
    #[must_use]
    pub fn is_game_skill(&self) -> bool {
        self.skill == "Game" || self.skill == "OneVsOne"
    }
}

/// The observations and game information for a single cycle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EstimatorInfoIn {
    pub field_features: Vec<FieldFeatureInfo>,
    pub balls: Vec<BallInfo>,
    pub competition_type: CompetitionType,
    pub state: GameState,
    pub game_phase: GamePhase,
    pub set_play: SetPlay,
    pub kicking_team: i32,
    pub behaviour_shared_data: BehaviourSharedData,
    pub penalty: Penalty,
    pub active: ActionCommand,
    /// Per teammate, whether it reported itself as incapacitated
    pub incapacitated: Vec<bool>,
    pub have_pending_outgoing_shared_bundle: bool,
    pub have_pending_incoming_shared_bundle: Vec<bool>,
    /// Only the broadcasts that arrived since the last cycle
    pub incoming_broadcast_data: Vec<BroadcastData>,
    pub visual_robots: Vec<RobotVisionInfo>,
    pub head_yaw: f32,
    pub is_incapacitated: bool,
    pub odometry_diff: Odometry,
    pub dt_in_seconds: f32,
    pub action_command_body: BodyCommand,
    pub sensor_values: SensorValues,
}

/// Gating flags computed by the localiser and read by the estimators after it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EstimatorInfoMiddle {
    pub can_localise_in_state: bool,
    pub can_do_observations: bool,
}

impl Default for EstimatorInfoMiddle {
    fn default() -> Self {
        Self {
            can_localise_in_state: true,
            can_do_observations: true,
        }
    }
}

/// The estimates produced by a single cycle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EstimatorInfoOut {
    pub robot_pos: AbsCoord,
    pub robot_pos_uncertainty: f32,
    pub robot_heading_uncertainty: f32,
    pub all_robot_pos: Vec<AbsCoord>,
    pub ball_pos_rr: RrCoord,
    pub ball_pos_rrc: AbsCoord,
    pub ball_vel_rrc: AbsCoord,
    pub ball_pos: AbsCoord,
    pub ball_vel: AbsCoord,
    pub team_ball_pos: AbsCoord,
    pub team_ball_vel: AbsCoord,
    pub team_ball_pos_uncertainty: f32,
    pub shared_state_estimation_bundle: SharedStateEstimationBundle,
    pub robot_obstacles: Vec<RobotObstacle>,
    pub had_team_ball_update: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_pose_type_names() {
        assert_eq!(InitialPoseType::parse_or_game("ONEVSONE"), InitialPoseType::OneVsOne);
        assert_eq!(InitialPoseType::parse_or_game("UNPENALISED"), InitialPoseType::Unpenalised);
        assert_eq!(InitialPoseType::parse_or_game("bogus"), InitialPoseType::Game);
        assert_eq!(InitialPoseType::Specified.to_string(), "SPECIFIED");
    }
}
