//! Data exchanged between teammates over the team network.
use super::{AbsCoord, ActionType, GameState, RrCoord};

/// The part of a robot's state estimate shared with its teammates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SharedStateEstimationBundle {
    pub robot_pos: AbsCoord,
    /// Ball position, robot relative cartesian
    pub ball_pos_rrc: AbsCoord,
    /// Ball velocity, robot relative cartesian
    pub ball_vel_rrc: AbsCoord,
    /// Whether the ball was observed since the last bundle was sent
    pub have_ball_update: bool,
}

impl SharedStateEstimationBundle {
    /// Rejects bundles with non-finite values before they reach a filter.
    #[must_use]
    pub fn is_sane(&self) -> bool {
        [self.robot_pos, self.ball_pos_rrc, self.ball_vel_rrc]
            .iter()
            .all(|coord| filter::all_finite(&coord.vec) && filter::all_finite(&coord.var))
    }
}

/// Behaviour state shared with teammates. State estimation only forwards it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BehaviourSharedData {
    pub seconds_since_last_kick: i32,
    pub role: i32,
    pub playing_ball: bool,
    pub need_assistance: bool,
    pub is_assisting: bool,
    pub is_kicked_off: bool,
    pub walking_to_x: f32,
    pub walking_to_y: f32,
    pub walking_to_h: f32,
    pub kick_notification: bool,
}

/// A single message received from a teammate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BroadcastData {
    pub player_num: i32,
    /// `[x, y, theta]`
    pub robot_pos: [f32; 3],
    pub ball_pos_abs: AbsCoord,
    pub ball_pos_rr: RrCoord,
    pub shared_state_estimation_bundle: SharedStateEstimationBundle,
    pub behaviour_shared_data: BehaviourSharedData,
    pub action_type: ActionType,
    /// Seconds since the sender booted
    pub uptime: f32,
    pub game_state: GameState,
}

impl Default for BroadcastData {
    fn default() -> Self {
        Self {
            player_num: 0,
            robot_pos: [0.0; 3],
            ball_pos_abs: AbsCoord::default(),
            ball_pos_rr: RrCoord::default(),
            shared_state_estimation_bundle: SharedStateEstimationBundle::default(),
            behaviour_shared_data: BehaviourSharedData::default(),
            action_type: ActionType::Limp,
            uptime: 0.0,
            game_state: GameState::Initial,
        }
    }
}
