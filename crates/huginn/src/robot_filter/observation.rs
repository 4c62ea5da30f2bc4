use nalgebra::{Vector2, vector};

use crate::types::{Odometry, RobotType, RobotVisionInfo, RrCoord, angle_difference, rotation};

pub const MIN_WEIGHT: i32 = 1;
pub const MAX_WEIGHT: i32 = 10;
const WEIGHT_RANGE: i32 = MAX_WEIGHT - MIN_WEIGHT;

const MAX_LIFE_SCORE: i32 = 1000;
/// Life lost per cycle while the observation should be visible but was not matched again.
const ON_SCREEN_SCORE_REDUCER: i32 = 16;
const OFF_SCREEN_SCORE_REDUCER: i32 = 6;
/// Scaled by how far the observation sits from the centre of its group.
const DISTANCE_SCORE_REDUCER: f32 = 10.0;

/// Half of the horizontal field of view of the cameras, in degrees.
const HALF_FIELD_OF_VIEW: f32 = 60.97 / 2.0;

/// A single sighting of a robot, kept alive for a while after it was made.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotObservation {
    pub rr: RrCoord,
    pub kind: RobotType,
    life_score: i32,
}

impl RobotObservation {
    #[must_use]
    pub fn new(robot: &RobotVisionInfo) -> Self {
        Self {
            rr: robot.rr,
            kind: robot.kind,
            life_score: MAX_LIFE_SCORE,
        }
    }

    /// Moves the observation with the robot and ages it.
    ///
    /// `distance_to_group` is the distance to the group centre as a fraction of the largest
    /// merge ellipse.
    pub fn tick(&mut self, odometry: &Odometry, head_yaw: f32, distance_to_group: f32) {
        let reducer = if self.in_view(head_yaw) {
            ON_SCREEN_SCORE_REDUCER
        } else {
            OFF_SCREEN_SCORE_REDUCER
        };
        let distance_reducer = (DISTANCE_SCORE_REDUCER * distance_to_group) as i32;
        self.life_score -= reducer + distance_reducer;

        let moved = rotation(-odometry.turn)
            * (self.cartesian() - vector![odometry.forward, odometry.left]);
        self.rr = RrCoord::from_cartesian(moved);
    }

    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.life_score <= 0
    }

    #[must_use]
    pub fn cartesian(&self) -> Vector2<f32> {
        self.rr.to_cartesian()
    }

    /// Between [`MIN_WEIGHT`] and [`MAX_WEIGHT`], higher for fresher observations.
    #[must_use]
    pub fn weight(&self) -> i32 {
        MIN_WEIGHT + self.life_score.max(0) * WEIGHT_RANGE / MAX_LIFE_SCORE
    }

    /// Whether the cameras would see the observation with the head turned to `head_yaw`.
    #[must_use]
    pub fn in_view(&self, head_yaw: f32) -> bool {
        angle_difference(self.rr.heading(), head_yaw).abs() < HALF_FIELD_OF_VIEW.to_radians()
    }
}
