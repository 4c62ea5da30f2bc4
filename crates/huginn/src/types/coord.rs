use std::f32::consts::{PI, TAU};

use nalgebra::{Matrix2, Matrix3, Rotation2, Vector2, Vector3};

use crate::field::{FULL_FIELD_LENGTH, FULL_FIELD_WIDTH};

/// Wraps an angle into `(-pi, pi]`. Angles already in range are returned unchanged.
#[must_use]
pub fn normalise_theta(theta: f32) -> f32 {
    if theta > -PI && theta <= PI {
        return theta;
    }

    let wrapped = theta.rem_euclid(TAU);
    if wrapped > PI { wrapped - TAU } else { wrapped }
}

/// Smallest signed difference `a - b` between two angles.
#[must_use]
pub fn angle_difference(a: f32, b: f32) -> f32 {
    normalise_theta(a - b)
}

/// Rotation matrix for a counter-clockwise rotation of `angle` radians.
#[must_use]
pub fn rotation(angle: f32) -> Matrix2<f32> {
    *Rotation2::new(angle).matrix()
}

/// A position relative to the robot, in polar form.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RrCoord {
    /// `(distance, heading, orientation)`
    pub vec: Vector3<f32>,
    pub var: Matrix3<f32>,
}

impl RrCoord {
    #[must_use]
    pub fn new(distance: f32, heading: f32, orientation: f32) -> Self {
        Self {
            vec: Vector3::new(distance, heading, orientation),
            var: Matrix3::zeros(),
        }
    }

    /// Builds the polar coordinate of a robot-relative cartesian point.
    #[must_use]
    pub fn from_cartesian(point: Vector2<f32>) -> Self {
        Self::new(point.norm(), point.y.atan2(point.x), 0.0)
    }

    /// Distance to the object
    #[must_use]
    pub fn distance(&self) -> f32 {
        self.vec[0]
    }

    /// Heading to the object
    #[must_use]
    pub fn heading(&self) -> f32 {
        self.vec[1]
    }

    /// Angle between the robot's front and the object's front
    #[must_use]
    pub fn orientation(&self) -> f32 {
        self.vec[2]
    }

    #[must_use]
    pub fn to_cartesian(&self) -> Vector2<f32> {
        Vector2::new(
            self.distance() * self.heading().cos(),
            self.distance() * self.heading().sin(),
        )
    }

    /// Squared distance between two polar coordinates, by the law of cosines.
    #[must_use]
    pub fn distance_squared_to(&self, other: &RrCoord) -> f32 {
        let (d0, d1) = (self.distance(), other.distance());
        d0 * d0 + d1 * d1 - 2.0 * d0 * d1 * (self.heading() - other.heading()).cos()
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        filter::all_finite(&self.vec) && filter::all_finite(&self.var)
    }
}

/// A pose or position in the absolute field frame.
///
/// The same representation is used for robot-relative cartesian quantities (`ball_pos_rrc`),
/// where `theta` is unused.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbsCoord {
    /// `(x, y, theta)`
    pub vec: Vector3<f32>,
    pub var: Matrix3<f32>,
    pub weight: f32,
}

impl Default for AbsCoord {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl AbsCoord {
    /// Creates a coordinate with a variance spanning the entire field.
    #[must_use]
    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        Self {
            vec: Vector3::new(x, y, theta),
            var: Matrix3::from_diagonal(&Vector3::new(
                FULL_FIELD_LENGTH * FULL_FIELD_LENGTH,
                FULL_FIELD_WIDTH * FULL_FIELD_WIDTH,
                PI * PI,
            )),
            weight: 1.0,
        }
    }

    #[must_use]
    pub fn x(&self) -> f32 {
        self.vec[0]
    }

    #[must_use]
    pub fn y(&self) -> f32 {
        self.vec[1]
    }

    #[must_use]
    pub fn theta(&self) -> f32 {
        self.vec[2]
    }

    #[must_use]
    pub fn position(&self) -> Vector2<f32> {
        self.vec.xy()
    }

    /// Distance from the origin of the frame.
    #[must_use]
    pub fn distance(&self) -> f32 {
        self.x().hypot(self.y())
    }

    /// Polar coordinate of this point as seen from `robot_pose`.
    #[must_use]
    pub fn to_robot_relative(&self, robot_pose: &AbsCoord) -> RrCoord {
        let diff = self.position() - robot_pose.position();
        RrCoord::new(
            diff.norm(),
            normalise_theta(diff.y.atan2(diff.x) - robot_pose.theta()),
            0.0,
        )
    }

    /// Transforms a robot-relative cartesian point into this pose's absolute frame.
    #[must_use]
    pub fn transform(&self, relative: Vector2<f32>) -> Vector2<f32> {
        self.position() + rotation(self.theta()) * relative
    }
}
