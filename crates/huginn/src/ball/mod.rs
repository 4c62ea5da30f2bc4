//! Ball tracking in robot relative coordinates.
//!
//! The state of a ball filter is `(x, y, u, v)`: position and velocity relative to the robot, in
//! mm and mm/s.
mod ego;
mod multi;

pub use ego::EgoBallTracker;
pub use multi::MultiBallTracker;

use filter::{CovMat, CrossCovMat, Innovation, KalmanFilter, StateVec};
use nalgebra::{Matrix2, Vector2, matrix, vector};

use crate::config::BallConfig;
use crate::field::{FIELD_LENGTH, FIELD_WIDTH};
use crate::types::{
    AbsCoord, BallInfo, BodyCommand, EstimatorInfoOut, Odometry, RrCoord, SensorValues,
    normalise_theta, rotation,
};

/// Friction deceleration of a rolling ball, in mm/s². Shared with behaviour.
pub const BALL_ACCELERATION: f32 = -390.0;
/// How far outside the field a ball estimate may be reported.
pub const POSSIBLE_OFF_FIELD_BALL_MARGIN: f32 = 400.0;
pub const COLLISION_ROBOT_RADIUS: f32 = 100.0;
pub const COLLISION_COEFF_OF_RESTITUTION: f32 = 0.4;
/// In degrees
const COLLISION_ACCEPTABLE_HEADING_DIFF: f32 = 20.0;
/// Gyroscope readings below this, in degrees per second, count as standing still.
const STABLE_GYROSCOPE: f32 = 4.0;
/// Predictions over longer gaps are skipped.
const MAX_PREDICT_DT: f32 = 1.0;

const OBSERVATION_MODEL: CrossCovMat<2, 4> = matrix![
    1.0, 0.0, 0.0, 0.0;
    0.0, 1.0, 0.0, 0.0
];

/// Uncertainty of a ball nobody has seen yet.
#[must_use]
pub fn unknown_ball_covariance() -> CovMat<4> {
    CovMat::<4>::from_diagonal(&vector![1_000_000.0, 1_000_000.0, 1000.0, 1000.0])
}

/// Process noise of a constant velocity model driven by a random acceleration, per axis.
#[must_use]
pub fn acceleration_noise(dt: f32, std_acceleration_x: f32, std_acceleration_y: f32) -> CovMat<4> {
    let dt2 = dt * dt;
    let half_dt3 = dt2 * dt / 2.0;
    let quarter_dt4 = dt2 * dt2 / 4.0;
    let qx = std_acceleration_x * std_acceleration_x;
    let qy = std_acceleration_y * std_acceleration_y;

    matrix![
        quarter_dt4 * qx, 0.0, half_dt3 * qx, 0.0;
        0.0, quarter_dt4 * qy, 0.0, half_dt3 * qy;
        half_dt3 * qx, 0.0, dt2 * qx, 0.0;
        0.0, half_dt3 * qy, 0.0, dt2 * qy
    ]
}

/// Transition matrix and friction control input of a rolling ball over `dt` seconds.
///
/// The deceleration never exceeds what brings the ball to a stop within `dt`.
#[must_use]
pub fn rolling_motion(state: &StateVec<4>, dt: f32, acceleration: f32) -> (CovMat<4>, StateVec<4>) {
    let mut transition = CovMat::<4>::identity();
    transition[(0, 2)] = dt;
    transition[(1, 3)] = dt;

    let velocity = Vector2::new(state[2], state[3]);
    let speed = velocity.norm();
    let direction = velocity.y.atan2(velocity.x);
    let deceleration = if dt > 0.0 {
        acceleration.max(-speed / dt)
    } else {
        0.0
    };

    let (sin, cos) = direction.sin_cos();
    let half_dt2 = dt * dt / 2.0;
    let control = vector![
        half_dt2 * cos,
        half_dt2 * sin,
        dt * cos,
        dt * sin
    ] * deceleration;

    (transition, control)
}

/// A single ball hypothesis.
#[derive(Debug, Clone, PartialEq)]
pub struct BallFilter {
    pub filter: KalmanFilter<4>,
    pub weight: f32,
}

impl Default for BallFilter {
    fn default() -> Self {
        Self::new(StateVec::<4>::zeros(), 1.0)
    }
}

impl BallFilter {
    #[must_use]
    pub fn new(state: StateVec<4>, weight: f32) -> Self {
        Self {
            filter: KalmanFilter::new(state, unknown_ball_covariance()),
            weight,
        }
    }

    /// A new hypothesis at an observed ball, at rest.
    #[must_use]
    pub fn from_observation(ball: &BallInfo, weight: f32) -> Self {
        let position = ball.rr.to_cartesian();
        Self::new(vector![position.x, position.y, 0.0, 0.0], weight)
    }

    #[must_use]
    pub fn position(&self) -> Vector2<f32> {
        self.filter.state.xy()
    }

    #[must_use]
    pub fn velocity(&self) -> Vector2<f32> {
        vector![self.filter.state[2], self.filter.state[3]]
    }

    #[must_use]
    pub fn distance(&self) -> f32 {
        self.position().norm()
    }

    /// Position and its covariance as a robot relative cartesian coordinate.
    #[must_use]
    pub fn ball_pos_rrc(&self) -> AbsCoord {
        let position = self.position();
        let mut coord = AbsCoord::new(position.x, position.y, 0.0);
        coord
            .var
            .fixed_view_mut::<2, 2>(0, 0)
            .copy_from(&self.filter.covariance.fixed_view::<2, 2>(0, 0));
        coord
    }

    /// Velocity and its covariance as a robot relative cartesian coordinate.
    #[must_use]
    pub fn ball_vel_rrc(&self) -> AbsCoord {
        let velocity = self.velocity();
        let mut coord = AbsCoord::new(velocity.x, velocity.y, 0.0);
        coord
            .var
            .fixed_view_mut::<2, 2>(0, 0)
            .copy_from(&self.filter.covariance.fixed_view::<2, 2>(2, 2));
        coord
    }

    /// Bounces a ball rolling into the robot, or pushes a ball out of the robot.
    pub fn predict_collision(&mut self) {
        let position = self.position();
        let distance = position.norm();
        if distance >= COLLISION_ROBOT_RADIUS {
            return;
        }

        let velocity = self.velocity();
        let heading = position.y.atan2(position.x);
        let roll_direction = velocity.y.atan2(velocity.x);
        let rolling_towards_robot = normalise_theta(heading + std::f32::consts::PI - roll_direction)
            .abs()
            < COLLISION_ACCEPTABLE_HEADING_DIFF.to_radians();

        let state = &mut self.filter.state;
        if rolling_towards_robot {
            state[2] *= -COLLISION_COEFF_OF_RESTITUTION;
            state[3] *= -COLLISION_COEFF_OF_RESTITUTION;
        } else {
            let push = COLLISION_ROBOT_RADIUS - distance;
            state.x += push * heading.cos();
            state.y += push * heading.sin();
        }
    }

    /// Rolls the ball forward by `dt` seconds. Gaps longer than a second are not predicted.
    pub fn predict(&mut self, dt: f32, config: &BallConfig) {
        if dt > MAX_PREDICT_DT {
            return;
        }

        let (transition, control) = rolling_motion(&self.filter.state, dt, BALL_ACCELERATION);
        let process_noise =
            acceleration_noise(dt, config.std_acceleration_x, config.std_acceleration_y);
        self.filter.predict(&transition, &control, &process_noise);
    }

    /// Moves the ball into the robot's frame after it walked by `odometry`.
    ///
    /// The covariance is only rotated, the translation does not add uncertainty.
    pub fn predict_with_odometry(&mut self, odometry: &Odometry) {
        let turn = -odometry.turn;
        let position = self.position() - vector![odometry.forward, odometry.left];
        let rotation = rotation(turn);
        let position = rotation * position;
        let velocity = rotation * self.velocity();

        self.filter.state = vector![position.x, position.y, velocity.x, velocity.y];

        let mut rotation4 = CovMat::<4>::zeros();
        rotation4.fixed_view_mut::<2, 2>(0, 0).copy_from(&rotation);
        rotation4.fixed_view_mut::<2, 2>(2, 2).copy_from(&rotation);
        self.filter.rotate_covariance(&rotation4);
    }

    /// Updates the position with a ball observation. The noise is smaller while the robot stands
    /// still.
    pub fn update(
        &mut self,
        ball: &BallInfo,
        body: &BodyCommand,
        sensors: &SensorValues,
        config: &BallConfig,
    ) -> filter::Result<Innovation<2>> {
        let noise = observation_noise(&ball.rr, body, sensors, config);
        let residual = ball.rr.to_cartesian() - OBSERVATION_MODEL * self.filter.state;
        self.filter.update(&OBSERVATION_MODEL, residual, &noise)
    }
}

/// Polar observation noise rotated into the robot frame.
fn observation_noise(
    rr: &RrCoord,
    body: &BodyCommand,
    sensors: &SensorValues,
    config: &BallConfig,
) -> Matrix2<f32> {
    let gyroscope_stable = sensors.gyroscope_x < STABLE_GYROSCOPE.to_radians()
        && sensors.gyroscope_y < STABLE_GYROSCOPE.to_radians();

    let (base, rate, head) = if body.is_stationary() && gyroscope_stable {
        (
            config.std_observation_dist_base_standing,
            config.std_observation_dist_increase_rate_standing,
            config.std_observation_head_standing,
        )
    } else {
        (
            config.std_observation_dist_base_walking,
            config.std_observation_dist_increase_rate_walking,
            config.std_observation_head_walking,
        )
    };

    let forward = base + rate * rr.distance();
    let left = rr.distance() * head.to_radians();
    let relative = Matrix2::new(forward * forward, 0.0, 0.0, left * left);
    let rotation = rotation(rr.heading());
    rotation * relative * rotation.transpose()
}

/// Writes the ball estimate of `kf` into the outputs, both robot relative and in field
/// coordinates using the already estimated robot pose.
pub fn write_ball_outputs(kf: &BallFilter, have_ball_update: bool, out: &mut EstimatorInfoOut) {
    let ball_pos_rrc = kf.ball_pos_rrc();
    let ball_vel_rrc = kf.ball_vel_rrc();

    out.ball_pos_rrc = ball_pos_rrc;
    out.ball_vel_rrc = ball_vel_rrc;
    out.shared_state_estimation_bundle.ball_pos_rrc = ball_pos_rrc;
    out.shared_state_estimation_bundle.ball_vel_rrc = ball_vel_rrc;
    out.shared_state_estimation_bundle.have_ball_update = have_ball_update;

    let robot_pos = out.robot_pos;
    let rotation = rotation(robot_pos.theta());
    let world = robot_pos.transform(kf.position());
    let x_limit = (FIELD_LENGTH + POSSIBLE_OFF_FIELD_BALL_MARGIN) / 2.0;
    let y_limit = (FIELD_WIDTH + POSSIBLE_OFF_FIELD_BALL_MARGIN) / 2.0;

    let mut ball_pos = AbsCoord::new(
        world.x.clamp(-x_limit, x_limit),
        world.y.clamp(-y_limit, y_limit),
        0.0,
    );
    let position_covariance = kf.filter.covariance.fixed_view::<2, 2>(0, 0).into_owned();
    ball_pos
        .var
        .fixed_view_mut::<2, 2>(0, 0)
        .copy_from(&(rotation * position_covariance * rotation.transpose()));
    out.ball_pos = ball_pos;

    out.ball_pos_rr = RrCoord::from_cartesian(kf.position());

    let velocity = rotation * kf.velocity();
    out.ball_vel = AbsCoord::new(velocity.x, velocity.y, 0.0);
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;
    use crate::types::ActionType;

    fn ball_at(x: f32, y: f32, u: f32, v: f32) -> BallFilter {
        BallFilter::new(vector![x, y, u, v], 1.0)
    }

    #[test]
    fn rolling_into_robot_bounces_back() {
        let mut kf = ball_at(80.0, 0.0, -1000.0, 0.0);
        kf.predict_collision();

        assert!((kf.velocity().x - 400.0).abs() < 1e-3);
        assert!(kf.velocity().y.abs() < 1e-3);
        assert!((kf.velocity().norm() - COLLISION_COEFF_OF_RESTITUTION * 1000.0).abs() < 1e-3);
        assert_eq!(kf.position(), vector![80.0, 0.0]);
    }

    #[test]
    fn ball_inside_robot_is_pushed_out() {
        let mut kf = ball_at(0.0, 50.0, 0.0, 300.0);
        kf.predict_collision();

        assert!((kf.distance() - COLLISION_ROBOT_RADIUS).abs() < 1e-3);
        assert!(kf.position().x.abs() < 1e-3);
        assert_eq!(kf.velocity(), vector![0.0, 300.0]);
    }

    #[test]
    fn friction_stops_the_ball_without_reversing() {
        let config = BallConfig::default();
        let mut kf = ball_at(1000.0, 0.0, 100.0, 0.0);

        kf.predict(0.1, &config);
        assert!((kf.velocity().x - 61.0).abs() < 1e-3);

        kf.predict(0.5, &config);
        assert!(kf.velocity().x.abs() < 1e-3);
    }

    #[test]
    fn zero_dt_predict_keeps_state() {
        let config = BallConfig::default();
        let mut kf = ball_at(1000.0, 200.0, 100.0, -50.0);
        let before = kf.clone();

        kf.predict(0.0, &config);

        assert_eq!(kf.filter.state, before.filter.state);
        assert_eq!(kf.filter.covariance, before.filter.covariance);
    }

    #[test]
    fn long_gaps_are_not_predicted() {
        let mut kf = ball_at(1000.0, 0.0, 500.0, 0.0);
        let before = kf.clone();
        kf.predict(1.5, &BallConfig::default());
        assert_eq!(kf, before);
    }

    #[test]
    fn odometry_moves_ball_into_new_frame() {
        let mut kf = ball_at(1000.0, 0.0, 0.0, 100.0);
        kf.predict_with_odometry(&Odometry::new(500.0, 0.0, FRAC_PI_2));

        assert!(kf.position().x.abs() < 1e-2);
        assert!((kf.position().y + 500.0).abs() < 1e-2);
        assert!((kf.velocity().x - 100.0).abs() < 1e-2);
    }

    #[test]
    fn update_pulls_towards_observation() {
        let mut kf = BallFilter::default();
        let ball = BallInfo::new(RrCoord::new(1000.0, 0.0, 0.0));
        let body = BodyCommand {
            action_type: ActionType::Stand,
            ..Default::default()
        };

        kf.update(&ball, &body, &SensorValues::default(), &BallConfig::default())
            .unwrap();

        assert!(kf.position().x > 800.0 && kf.position().x < 1000.0);
        assert!(kf.position().y.abs() < 1e-3);
        assert!(kf.filter.covariance[(0, 0)] < 1_000_000.0);
    }

    #[test]
    fn stationary_robot_observes_more_accurately() {
        let config = BallConfig::default();
        let rr = RrCoord::new(2000.0, 0.0, 0.0);
        let standing = BodyCommand {
            action_type: ActionType::Stand,
            ..Default::default()
        };
        let walking = BodyCommand {
            action_type: ActionType::Walk,
            forward: 200,
            ..Default::default()
        };

        let accurate = observation_noise(&rr, &standing, &SensorValues::default(), &config);
        let noisy = observation_noise(&rr, &walking, &SensorValues::default(), &config);
        assert!(accurate[(0, 0)] < noisy[(0, 0)]);
    }
}
