use std::f32::consts::FRAC_PI_2;

use nalgebra::{Vector2, vector};

use super::observation::{MAX_WEIGHT, MIN_WEIGHT, RobotObservation};
use crate::field::{FIELD_LENGTH, FIELD_WIDTH};
use crate::types::{
    AbsCoord, Odometry, RobotObstacle, RobotType, RobotVisionInfo, RrCoord, normalise_theta,
};

/// Width of a robot, including some clearance, in mm.
pub const ROBOT_WIDTH: f32 = 450.0;

/// Groups with fewer observations might be noise.
const IMPORTANT_MIN_OBSERVATIONS: usize = 3;

const MIN_MERGE_SCALE: f32 = 1.0;
const MAX_MERGE_SCALE: f32 = 2.0;
/// The merge ellipse is long along the viewing direction, where distance estimates are poor.
const ELLIPSE_VERTICAL: f32 = 800.0;
const ELLIPSE_HORIZONTAL: f32 = 400.0;
const ELLIPSE_RATIO: f32 = ELLIPSE_VERTICAL / ELLIPSE_HORIZONTAL;

/// Observations believed to be the same robot, aggregated into a single position.
#[derive(Debug, Clone)]
pub struct GroupedRobots {
    observations: Vec<RobotObservation>,
    robot_pos: AbsCoord,
    rrc: Vector2<f32>,
    rr: RrCoord,
    pos: AbsCoord,
}

impl GroupedRobots {
    #[must_use]
    pub fn new(robot: &RobotVisionInfo, robot_pos: AbsCoord) -> Self {
        let mut group = Self {
            observations: Vec::new(),
            robot_pos,
            rrc: Vector2::zeros(),
            rr: RrCoord::default(),
            pos: AbsCoord::default(),
        };
        group.merge(robot);
        group
    }

    #[must_use]
    pub fn observations(&self) -> &[RobotObservation] {
        &self.observations
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    #[must_use]
    pub fn rr(&self) -> RrCoord {
        self.rr
    }

    #[must_use]
    pub fn abs(&self) -> AbsCoord {
        self.pos
    }

    pub fn merge(&mut self, robot: &RobotVisionInfo) {
        self.observations.push(RobotObservation::new(robot));
        self.calculate_coordinates();
    }

    /// Ages every observation by one cycle and drops the stale ones.
    pub fn tick(&mut self, odometry: &Odometry, head_yaw: f32, robot_pos: AbsCoord) {
        self.robot_pos = robot_pos;

        let centre = self.rr;
        for observation in &mut self.observations {
            let offset = scaled_offset(&centre, &observation.rr);
            observation.tick(odometry, head_yaw, offset.norm() / ELLIPSE_VERTICAL);
        }
        self.observations.retain(|observation| !observation.is_stale());

        self.calculate_coordinates();
    }

    /// Distance from the group centre to a detection.
    #[must_use]
    pub fn distance_to(&self, robot: &RobotVisionInfo) -> f32 {
        offset(&self.rr, &robot.rr).norm()
    }

    /// Whether a detection lies within the merge ellipse. Groups holding a fresh observation use
    /// a smaller ellipse.
    #[must_use]
    pub fn can_merge(&self, robot: &RobotVisionInfo) -> bool {
        let scale = merge_scale(self.largest_weight());
        scaled_offset(&self.rr, &robot.rr).norm() < ELLIPSE_VERTICAL * scale
    }

    /// Enough concurrent observations to be treated as an obstacle.
    #[must_use]
    pub fn is_important_obstacle(&self) -> bool {
        self.observations.len() >= IMPORTANT_MIN_OBSERVATIONS
    }

    #[must_use]
    pub fn is_on_field(&self) -> bool {
        self.pos.x().abs() * 2.0 <= FIELD_LENGTH && self.pos.y().abs() * 2.0 <= FIELD_WIDTH
    }

    /// A colour is only trusted if it outnumbers the other one more than two to one.
    #[must_use]
    pub fn kind(&self) -> RobotType {
        let count = |kind| {
            self.observations
                .iter()
                .filter(|observation| observation.kind == kind)
                .count()
        };
        let red = count(RobotType::Red);
        let blue = count(RobotType::Blue);

        if blue * 2 < red {
            RobotType::Red
        } else if red * 2 < blue {
            RobotType::Blue
        } else {
            RobotType::Unknown
        }
    }

    /// Headings of the left and right edges of the robot.
    #[must_use]
    pub fn tangent_headings(&self) -> (f32, f32) {
        let offset = if self.rr.distance() < ROBOT_WIDTH {
            FRAC_PI_2
        } else {
            (ROBOT_WIDTH / self.rr.distance()).atan()
        };
        (self.rr.heading() + offset, self.rr.heading() - offset)
    }

    /// Vectors that pass the robot on its left and right, tangent to a circle of
    /// [`ROBOT_WIDTH`] around it.
    #[must_use]
    pub fn evade_vectors(&self) -> (RrCoord, RrCoord) {
        let r = ROBOT_WIDTH;
        let d = self.rr.distance();

        if d < r {
            return (
                RrCoord::new(r, FRAC_PI_2, 0.0),
                RrCoord::new(r, -FRAC_PI_2, 0.0),
            );
        }

        let r2 = r * r;
        let d2 = d * d;
        let x = d - r2 / d;
        let y = (r2 - r2 * r2 / d2).sqrt();
        let distance = (d2 - r2).sqrt().max(ROBOT_WIDTH);
        let turn = FRAC_PI_2 - x.atan2(y);

        (
            RrCoord::new(distance, normalise_theta(self.rr.heading() + turn), 0.0),
            RrCoord::new(distance, normalise_theta(self.rr.heading() - turn), 0.0),
        )
    }

    #[must_use]
    pub fn obstacle(&self) -> RobotObstacle {
        let (tangent_heading_left, tangent_heading_right) = self.tangent_headings();
        let (evade_vector_left, evade_vector_right) = self.evade_vectors();

        RobotObstacle {
            rr: self.rr,
            kind: self.kind(),
            rrc: AbsCoord::new(self.rrc.x, self.rrc.y, 0.0),
            pos: self.pos,
            tangent_heading_left,
            tangent_heading_right,
            evade_vector_left,
            evade_vector_right,
        }
    }

    fn largest_weight(&self) -> i32 {
        self.observations
            .iter()
            .map(RobotObservation::weight)
            .max()
            .unwrap_or(MIN_WEIGHT)
    }

    fn calculate_coordinates(&mut self) {
        let (sum, total_weight) = self.observations.iter().fold(
            (Vector2::zeros(), 0.0),
            |(sum, total): (Vector2<f32>, f32), observation| {
                let weight = observation.weight() as f32;
                (sum + observation.cartesian() * weight, total + weight)
            },
        );

        self.rrc = if total_weight > 0.0 {
            sum / total_weight
        } else {
            Vector2::zeros()
        };
        self.rr = RrCoord::from_cartesian(self.rrc);

        let world = self.robot_pos.transform(self.rrc);
        self.pos = AbsCoord::new(world.x, world.y, 0.0);
    }
}

/// Cartesian offset of `robot` from `centre`, in a frame whose x-axis points from the robot
/// towards the centre.
fn offset(centre: &RrCoord, robot: &RrCoord) -> Vector2<f32> {
    let relative = RrCoord::new(robot.distance(), robot.heading() - centre.heading(), 0.0);
    relative.to_cartesian() - vector![centre.distance(), 0.0]
}

/// The offset with the sideways axis stretched, turning the merge ellipse into a circle.
fn scaled_offset(centre: &RrCoord, robot: &RrCoord) -> Vector2<f32> {
    let offset = offset(centre, robot);
    vector![offset.x, offset.y * ELLIPSE_RATIO]
}

/// Between [`MAX_MERGE_SCALE`] for the weakest and [`MIN_MERGE_SCALE`] for the strongest group.
fn merge_scale(weight: i32) -> f32 {
    let range = MAX_WEIGHT - MIN_WEIGHT;
    let inverse = range - (weight - MIN_WEIGHT);
    MIN_MERGE_SCALE + (MAX_MERGE_SCALE - MIN_MERGE_SCALE) * inverse as f32 / range as f32
}
