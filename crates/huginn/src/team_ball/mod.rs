//! Fusion of the balls reported by teammates into a single estimate in field coordinates.
mod transitioner;

pub use transitioner::{SetPlayReset, TeamBallTransitioner};

use filter::{CovMat, KalmanFilter, StateVec};
use nalgebra::{Matrix2, Vector2, matrix, vector};

use crate::ball::{acceleration_noise, rolling_motion, unknown_ball_covariance};
use crate::config::TeamBallConfig;
use crate::estimator::Estimator;
use crate::field::{FIELD_LENGTH, FIELD_WIDTH};
use crate::types::{
    AbsCoord, BroadcastData, EstimatorInfoIn, EstimatorInfoInit, EstimatorInfoMiddle,
    EstimatorInfoOut, rotation,
};

/// Friction deceleration assumed for the team ball, in mm/s².
pub const TEAM_BALL_ACCELERATION: f32 = -318.9;
const MAX_SPEED: f32 = 10000.0;
const MAX_PREDICT_DT: f32 = 1.0;

/// The team ball is observed directly, position and velocity.
const OBSERVATION_MODEL: CovMat<4> = matrix![
    1.0, 0.0, 0.0, 0.0;
    0.0, 1.0, 0.0, 0.0;
    0.0, 0.0, 1.0, 0.0;
    0.0, 0.0, 0.0, 1.0
];

fn set_play_covariance() -> CovMat<4> {
    CovMat::<4>::from_diagonal(&vector![10000.0, 10000.0, 1000.0, 1000.0])
}

/// Keeps the ball on the field and its speed plausible.
fn clamp_to_field(state: &mut StateVec<4>) {
    state[0] = state[0].clamp(-FIELD_LENGTH / 2.0, FIELD_LENGTH / 2.0);
    state[1] = state[1].clamp(-FIELD_WIDTH / 2.0, FIELD_WIDTH / 2.0);
    state[2] = state[2].clamp(-MAX_SPEED, MAX_SPEED);
    state[3] = state[3].clamp(-MAX_SPEED, MAX_SPEED);
}

/// A teammate's ball observation turned into field coordinates, with its noise.
fn absolute_observation(broadcast: &BroadcastData) -> (StateVec<4>, CovMat<4>) {
    let bundle = &broadcast.shared_state_estimation_bundle;
    let robot = &bundle.robot_pos;
    let rotation = rotation(robot.theta());

    let ball = bundle.ball_pos_rrc.position();
    let position = robot.position() + rotation * ball;
    let velocity = rotation * bundle.ball_vel_rrc.position();

    let ball_covariance = bundle.ball_pos_rrc.var.fixed_view::<2, 2>(0, 0).into_owned();
    let robot_covariance = robot.var.fixed_view::<2, 2>(0, 0).into_owned();
    // A heading error moves the ball sideways, proportional to its distance.
    let sideways = ball.norm() * robot.var[(2, 2)].sqrt().sin();
    let heading_covariance = Matrix2::new(0.0, 0.0, 0.0, sideways * sideways);
    let velocity_covariance = bundle.ball_vel_rrc.var.fixed_view::<2, 2>(0, 0).into_owned();

    let mut noise = CovMat::<4>::zeros();
    noise.fixed_view_mut::<2, 2>(0, 0).copy_from(
        &(rotation * ball_covariance * rotation.transpose()
            + robot_covariance
            + rotation * heading_covariance * rotation.transpose()),
    );
    noise
        .fixed_view_mut::<2, 2>(2, 2)
        .copy_from(&(rotation * velocity_covariance * rotation.transpose()));

    (vector![position.x, position.y, velocity.x, velocity.y], noise)
}

/// Kalman filter over `(x, y, u, v)` of the ball in field coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamBallKf {
    pub filter: KalmanFilter<4>,
    config: TeamBallConfig,
}

impl TeamBallKf {
    #[must_use]
    pub fn new(config: TeamBallConfig) -> Self {
        Self {
            filter: KalmanFilter::new(StateVec::<4>::zeros(), unknown_ball_covariance()),
            config,
        }
    }

    #[must_use]
    pub fn position(&self) -> Vector2<f32> {
        self.filter.state.xy()
    }

    #[must_use]
    pub fn velocity(&self) -> Vector2<f32> {
        vector![self.filter.state[2], self.filter.state[3]]
    }

    /// Places the ball where the referee puts it for a set play.
    pub fn reset(&mut self, reset: SetPlayReset) {
        let position = reset.position(self.filter.state.y);
        self.filter = KalmanFilter::new(
            vector![position.x, position.y, 0.0, 0.0],
            set_play_covariance(),
        );
    }

    pub fn predict(&mut self, dt: f32) {
        if dt > MAX_PREDICT_DT {
            return;
        }

        let (transition, control) = rolling_motion(&self.filter.state, dt, TEAM_BALL_ACCELERATION);
        let process_noise = acceleration_noise(
            dt,
            self.config.std_acceleration_x,
            self.config.std_acceleration_y,
        );
        self.filter.predict(&transition, &control, &process_noise);
        clamp_to_field(&mut self.filter.state);
    }

    /// Fuses every broadcast that carries a fresh ball observation.
    ///
    /// Returns whether any of them did.
    pub fn update(&mut self, broadcasts: &[BroadcastData]) -> bool {
        let mut had_update = false;

        for broadcast in broadcasts {
            let bundle = &broadcast.shared_state_estimation_bundle;
            if !bundle.have_ball_update {
                continue;
            }
            if !bundle.is_sane() {
                tracing::warn!(
                    player = broadcast.player_num,
                    "ignoring non-finite shared ball"
                );
                continue;
            }
            had_update = true;

            let (observation, noise) = absolute_observation(broadcast);
            let residual = observation - self.filter.state;
            match self.filter.update(&OBSERVATION_MODEL, residual, &noise) {
                Ok(_) => clamp_to_field(&mut self.filter.state),
                Err(error) => {
                    tracing::warn!(?error, "team ball update failed, resetting covariance");
                    self.filter.covariance = unknown_ball_covariance();
                }
            }
        }

        had_update
    }

    #[must_use]
    pub fn ball_pos(&self) -> AbsCoord {
        let position = self.position();
        let mut coord = AbsCoord::new(position.x, position.y, 0.0);
        coord
            .var
            .fixed_view_mut::<2, 2>(0, 0)
            .copy_from(&self.filter.covariance.fixed_view::<2, 2>(0, 0));
        coord
    }

    #[must_use]
    pub fn ball_vel(&self) -> AbsCoord {
        let velocity = self.velocity();
        let mut coord = AbsCoord::new(velocity.x, velocity.y, 0.0);
        coord
            .var
            .fixed_view_mut::<2, 2>(0, 0)
            .copy_from(&self.filter.covariance.fixed_view::<2, 2>(2, 2));
        coord
    }

    #[must_use]
    pub fn position_uncertainty(&self) -> f32 {
        filter::ellipse_area(&self.filter.covariance.fixed_view::<2, 2>(0, 0).into_owned())
    }
}

/// Runs the team ball filter on the broadcasts received this cycle.
#[derive(Debug, Clone)]
pub struct TeamBallTracker {
    kf: TeamBallKf,
    transitioner: TeamBallTransitioner,
}

impl TeamBallTracker {
    #[must_use]
    pub fn new(init: &EstimatorInfoInit, config: TeamBallConfig) -> Self {
        Self {
            kf: TeamBallKf::new(config),
            transitioner: TeamBallTransitioner::new(init),
        }
    }

    #[must_use]
    pub fn ball(&self) -> &TeamBallKf {
        &self.kf
    }
}

impl Estimator for TeamBallTracker {
    fn tick(
        &mut self,
        input: &EstimatorInfoIn,
        _middle: &mut EstimatorInfoMiddle,
        out: &mut EstimatorInfoOut,
    ) {
        if let Some(reset) = self.transitioner.handle_transition(input) {
            self.kf.reset(reset);
        }

        self.kf.predict(input.dt_in_seconds);
        let had_update = self.kf.update(&input.incoming_broadcast_data);

        out.team_ball_pos = self.kf.ball_pos();
        out.team_ball_vel = self.kf.ball_vel();
        out.team_ball_pos_uncertainty = self.kf.position_uncertainty();
        out.had_team_ball_update = had_update;
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;
    use crate::field::{CORNER_KICK_ABS_X, CORNER_KICK_ABS_Y};
    use crate::types::{SetPlay, SharedStateEstimationBundle};

    fn broadcast(
        robot_pos: AbsCoord,
        ball_x: f32,
        ball_y: f32,
        have_ball_update: bool,
    ) -> BroadcastData {
        let mut ball = AbsCoord::new(ball_x, ball_y, 0.0);
        ball.var = nalgebra::Matrix3::from_diagonal(&vector![100.0, 100.0, 0.0]);
        let mut velocity = AbsCoord::new(0.0, 0.0, 0.0);
        velocity.var = nalgebra::Matrix3::from_diagonal(&vector![100.0, 100.0, 0.0]);

        BroadcastData {
            shared_state_estimation_bundle: SharedStateEstimationBundle {
                robot_pos,
                ball_pos_rrc: ball,
                ball_vel_rrc: velocity,
                have_ball_update,
            },
            ..Default::default()
        }
    }

    fn confident_pose(x: f32, y: f32, theta: f32) -> AbsCoord {
        let mut pose = AbsCoord::new(x, y, theta);
        pose.var = nalgebra::Matrix3::from_diagonal(&vector![100.0, 100.0, 0.0]);
        pose
    }

    #[test]
    fn teammate_ball_is_fused_in_field_coordinates() {
        let mut tracker =
            TeamBallTracker::new(&EstimatorInfoInit::default(), TeamBallConfig::default());
        let input = EstimatorInfoIn {
            incoming_broadcast_data: vec![broadcast(
                confident_pose(1000.0, 1000.0, FRAC_PI_2),
                500.0,
                0.0,
                true,
            )],
            ..Default::default()
        };
        let mut out = EstimatorInfoOut::default();

        for _ in 0..5 {
            tracker.tick(&input, &mut EstimatorInfoMiddle::default(), &mut out);
        }

        assert!(out.had_team_ball_update);
        assert!((out.team_ball_pos.x() - 1000.0).abs() < 10.0);
        assert!((out.team_ball_pos.y() - 1500.0).abs() < 10.0);
        assert!(out.team_ball_pos_uncertainty < 1_000_000.0);
    }

    #[test]
    fn reports_without_ball_update_change_nothing() {
        let mut tracker =
            TeamBallTracker::new(&EstimatorInfoInit::default(), TeamBallConfig::default());
        let mut out = EstimatorInfoOut::default();
        tracker.tick(
            &EstimatorInfoIn::default(),
            &mut EstimatorInfoMiddle::default(),
            &mut out,
        );
        let before = tracker.ball().filter.clone();
        let uncertainty = out.team_ball_pos_uncertainty;

        let input = EstimatorInfoIn {
            incoming_broadcast_data: vec![
                broadcast(confident_pose(0.0, 0.0, 0.0), 500.0, 0.0, false),
                broadcast(confident_pose(-2000.0, 0.0, 0.0), 100.0, 100.0, false),
            ],
            ..Default::default()
        };
        tracker.tick(&input, &mut EstimatorInfoMiddle::default(), &mut out);

        assert_eq!(tracker.ball().filter, before);
        assert!(!out.had_team_ball_update);
        assert!((out.team_ball_pos_uncertainty - uncertainty).abs() < f32::EPSILON);
    }

    #[test]
    fn stale_reports_only_let_the_ball_roll() {
        let mut tracker =
            TeamBallTracker::new(&EstimatorInfoInit::default(), TeamBallConfig::default());
        let mut out = EstimatorInfoOut::default();
        tracker.tick(
            &EstimatorInfoIn::default(),
            &mut EstimatorInfoMiddle::default(),
            &mut out,
        );
        let mut predicted = tracker.ball().clone();
        predicted.predict(0.1);

        let input = EstimatorInfoIn {
            dt_in_seconds: 0.1,
            incoming_broadcast_data: vec![
                broadcast(confident_pose(0.0, 0.0, 0.0), 500.0, 0.0, false),
                broadcast(confident_pose(-2000.0, 0.0, 0.0), 100.0, 100.0, false),
            ],
            ..Default::default()
        };
        let before = tracker.ball().filter.covariance;
        tracker.tick(&input, &mut EstimatorInfoMiddle::default(), &mut out);

        assert!(!out.had_team_ball_update);
        assert_eq!(tracker.ball(), &predicted);
        let after = tracker.ball().filter.covariance;
        assert!(after[(0, 0)] > before[(0, 0)]);
        assert!(after[(2, 2)] > before[(2, 2)]);
    }

    #[test]
    fn corner_kick_places_ball_in_the_corner() {
        let mut tracker =
            TeamBallTracker::new(&EstimatorInfoInit::default(), TeamBallConfig::default());
        let input = EstimatorInfoIn {
            set_play: SetPlay::CornerKick,
            kicking_team: 0,
            ..Default::default()
        };
        let mut out = EstimatorInfoOut::default();

        tracker.tick(&input, &mut EstimatorInfoMiddle::default(), &mut out);

        assert_eq!(
            out.team_ball_pos.position(),
            vector![CORNER_KICK_ABS_X, -CORNER_KICK_ABS_Y]
        );
        assert!((out.team_ball_pos.var[(0, 0)] - 10000.0).abs() < 1e-3);
    }

    #[test]
    fn estimate_stays_on_the_field() {
        let mut kf = TeamBallKf::new(TeamBallConfig::default());
        kf.filter.state = vector![4000.0, 0.0, 9000.0, 0.0];

        kf.predict(0.5);

        assert!((kf.position().x - FIELD_LENGTH / 2.0).abs() < f32::EPSILON);
        assert!(kf.velocity().x <= MAX_SPEED);
    }
}
