//! Per-cycle detections produced by the vision pipeline.
use strum::{Display, FromRepr};

use super::{AbsCoord, RrCoord};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, FromRepr)]
#[repr(u8)]
pub enum FieldFeatureType {
    #[default]
    None = 0,
    Line,
    Corner,
    TJunction,
    PenaltySpot,
    CentreCircle,
    FieldLinePoint,
    XJunction,
    ParallelLines,
    GoalBoxCorner,
}

/// A detected field landmark.
///
/// For point features `rr` is the polar vector to the feature and its orientation. For lines,
/// `rr.distance()` is the perpendicular distance and `rr.heading()` the direction of the
/// perpendicular.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FieldFeatureInfo {
    pub rr: RrCoord,
    pub kind: FieldFeatureType,
}

impl FieldFeatureInfo {
    #[must_use]
    pub fn new(rr: RrCoord, kind: FieldFeatureType) -> Self {
        Self { rr, kind }
    }
}

/// A detected ball.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BallInfo {
    pub rr: RrCoord,
    /// Radius in the image, in pixels
    pub radius: i32,
    pub image_x: i32,
    pub image_y: i32,
    pub top_camera: bool,
}

impl BallInfo {
    #[must_use]
    pub fn new(rr: RrCoord) -> Self {
        Self {
            rr,
            ..Default::default()
        }
    }
}

/// Jersey classification of a detected robot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, FromRepr)]
#[repr(u8)]
pub enum RobotType {
    #[default]
    Unknown = 0,
    Blue,
    Red,
}

/// A detected robot.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RobotVisionInfo {
    pub rr: RrCoord,
    pub kind: RobotType,
}

impl RobotVisionInfo {
    #[must_use]
    pub fn new(rr: RrCoord, kind: RobotType) -> Self {
        Self { rr, kind }
    }
}

/// A tracked robot that should be avoided.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RobotObstacle {
    pub rr: RrCoord,
    pub kind: RobotType,
    /// Robot relative cartesian position
    pub rrc: AbsCoord,
    pub pos: AbsCoord,
    pub tangent_heading_left: f32,
    pub tangent_heading_right: f32,
    pub evade_vector_left: RrCoord,
    pub evade_vector_right: RrCoord,
}
