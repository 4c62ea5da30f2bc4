//! Dimensions of the standard platform league field and the canonical locations of its
//! landmarks.
//!
//! All values are in millimetres, in the absolute frame: the origin is the centre spot and the
//! positive x-axis points towards the opponent's goal.
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use nalgebra::{Vector3, vector};

pub const FIELD_LENGTH: f32 = 9010.0;
pub const FIELD_WIDTH: f32 = 6020.0;

/// Width of the border strip around the field lines.
pub const FIELD_LENGTH_OFFSET: f32 = 700.0;
pub const FIELD_WIDTH_OFFSET: f32 = 700.0;

pub const FULL_FIELD_LENGTH: f32 = FIELD_LENGTH + 2.0 * FIELD_LENGTH_OFFSET;
pub const FULL_FIELD_WIDTH: f32 = FIELD_WIDTH + 2.0 * FIELD_WIDTH_OFFSET;

pub const GOAL_BOX_LENGTH: f32 = 615.0;
pub const GOAL_BOX_WIDTH: f32 = 2220.0;

pub const PENALTY_AREA_LENGTH: f32 = 1650.0;
pub const PENALTY_AREA_WIDTH: f32 = 4000.0;

pub const DIST_GOAL_LINE_TO_PENALTY_CROSS: f32 = 1290.0;
pub const PENALTY_CROSS_ABS_X: f32 = FIELD_LENGTH / 2.0 - DIST_GOAL_LINE_TO_PENALTY_CROSS;

pub const CENTER_CIRCLE_DIAMETER: f32 = 1500.0;

pub const BALL_RADIUS: f32 = 50.0;

pub const GOAL_KICK_ABS_X: f32 = PENALTY_CROSS_ABS_X;
pub const GOAL_KICK_ABS_Y: f32 = GOAL_BOX_WIDTH / 2.0;
pub const CORNER_KICK_ABS_X: f32 = FIELD_LENGTH / 2.0;
pub const CORNER_KICK_ABS_Y: f32 = FIELD_WIDTH / 2.0;

/// Returns true if the point lies within the field lines plus `margin` on every side.
#[must_use]
pub fn within_field(x: f32, y: f32, margin: f32) -> bool {
    x.abs() <= FIELD_LENGTH / 2.0 + margin && y.abs() <= FIELD_WIDTH / 2.0 + margin
}

/// The canonical locations of every landmark the localiser can match against.
///
/// Point features are stored as `(x, y, orientation)`, where the orientation is the direction the
/// feature "faces" (e.g. the bisector of a corner pointing into the field).
#[derive(Debug, Clone)]
pub struct FieldFeatureLocations {
    pub corners: Vec<Vector3<f32>>,
    pub t_junctions: Vec<Vector3<f32>>,
    pub centre_circles: Vec<Vector3<f32>>,
    /// x coordinates of lines running parallel to the y-axis
    pub constant_x_lines: Vec<f32>,
    /// y coordinates of lines running parallel to the x-axis
    pub constant_y_lines: Vec<f32>,
}

impl Default for FieldFeatureLocations {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldFeatureLocations {
    #[must_use]
    pub fn new() -> Self {
        const HALF_LENGTH: f32 = FIELD_LENGTH / 2.0;
        const HALF_WIDTH: f32 = FIELD_WIDTH / 2.0;
        const HALF_GOAL_BOX: f32 = GOAL_BOX_WIDTH / 2.0;
        const HALF_PENALTY_AREA: f32 = PENALTY_AREA_WIDTH / 2.0;
        const THREE_FRAC_PI_4: f32 = 3.0 * FRAC_PI_4;

        let corners = vec![
            // our half
            vector![-HALF_LENGTH, HALF_WIDTH, -FRAC_PI_4],
            vector![-HALF_LENGTH + GOAL_BOX_LENGTH, HALF_GOAL_BOX, -THREE_FRAC_PI_4],
            vector![-HALF_LENGTH + GOAL_BOX_LENGTH, -HALF_GOAL_BOX, THREE_FRAC_PI_4],
            vector![-HALF_LENGTH + PENALTY_AREA_LENGTH, HALF_PENALTY_AREA, -THREE_FRAC_PI_4],
            vector![-HALF_LENGTH + PENALTY_AREA_LENGTH, -HALF_PENALTY_AREA, THREE_FRAC_PI_4],
            vector![-HALF_LENGTH, -HALF_WIDTH, FRAC_PI_4],
            // their half
            vector![HALF_LENGTH, HALF_WIDTH, -THREE_FRAC_PI_4],
            vector![HALF_LENGTH - GOAL_BOX_LENGTH, HALF_GOAL_BOX, -FRAC_PI_4],
            vector![HALF_LENGTH - GOAL_BOX_LENGTH, -HALF_GOAL_BOX, FRAC_PI_4],
            vector![HALF_LENGTH - PENALTY_AREA_LENGTH, HALF_PENALTY_AREA, -FRAC_PI_4],
            vector![HALF_LENGTH - PENALTY_AREA_LENGTH, -HALF_PENALTY_AREA, FRAC_PI_4],
            vector![HALF_LENGTH, -HALF_WIDTH, THREE_FRAC_PI_4],
        ];

        let t_junctions = vec![
            vector![-HALF_LENGTH, HALF_GOAL_BOX, 0.0],
            vector![-HALF_LENGTH, -HALF_GOAL_BOX, 0.0],
            vector![-HALF_LENGTH, HALF_PENALTY_AREA, 0.0],
            vector![-HALF_LENGTH, -HALF_PENALTY_AREA, 0.0],
            vector![0.0, HALF_WIDTH, -FRAC_PI_2],
            vector![0.0, -HALF_WIDTH, FRAC_PI_2],
            vector![HALF_LENGTH, HALF_GOAL_BOX, PI],
            vector![HALF_LENGTH, -HALF_GOAL_BOX, PI],
            vector![HALF_LENGTH, HALF_PENALTY_AREA, PI],
            vector![HALF_LENGTH, -HALF_PENALTY_AREA, PI],
        ];

        let centre_circles = vec![vector![0.0, 0.0, FRAC_PI_2], vector![0.0, 0.0, -FRAC_PI_2]];

        Self {
            corners,
            t_junctions,
            centre_circles,
            constant_x_lines: vec![
                -HALF_LENGTH,
                -HALF_LENGTH + PENALTY_AREA_LENGTH,
                0.0,
                HALF_LENGTH,
                HALF_LENGTH - PENALTY_AREA_LENGTH,
            ],
            constant_y_lines: vec![HALF_WIDTH, -HALF_WIDTH],
        }
    }
}
