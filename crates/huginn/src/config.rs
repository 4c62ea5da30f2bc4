//! Tunables of the state estimation, loaded from `state_estimation.toml`.
//!
//! Every table may be partial: fields that are left out keep their default value.
use odal::Config;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateEstimationConfig {
    pub adapter: AdapterConfig,
    pub localiser: LocaliserConfig,
    pub ego_ball: BallConfig,
    pub multi_ball: MultiBallConfig,
    pub team_ball: TeamBallConfig,
}

impl Config for StateEstimationConfig {
    const PATH: &'static str = "state_estimation.toml";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// One of `GAME`, `ONEVSONE`, `SPECIFIED` or `UNPENALISED`
    pub initial_pose_type: String,
    /// Initial pose used with `SPECIFIED`, in mm
    pub specified_initial_x: i32,
    pub specified_initial_y: i32,
    /// In degrees
    pub specified_initial_theta: i32,
    /// Delay resets after a penalty to survive referees toggling penalties by mistake
    pub handle_referee_mistakes: bool,
    /// Track several ball hypotheses instead of a single one
    pub use_multi_ball: bool,
    /// Name of the behaviour skill, the localiser only gates on game states for `Game` and
    /// `OneVsOne`
    pub skill: String,
    /// A tick taking longer than this is logged
    pub cycle_budget_ms: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            initial_pose_type: "GAME".to_string(),
            specified_initial_x: 0,
            specified_initial_y: 0,
            specified_initial_theta: 0,
            handle_referee_mistakes: true,
            use_multi_ball: false,
            skill: "Game".to_string(),
            cycle_budget_ms: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaliserConfig {
    /// Weight factor applied to each hypothesis created for a point feature
    pub mode_split_weight_multiply_factor: f32,
    /// Weight factor applied to each hypothesis created for a line
    pub line_mode_split_weight_multiply_factor: f32,
    pub odometry_forward_multiply_factor: f32,
    pub odometry_left_multiply_factor: f32,
    pub odometry_heading_multiply_factor: f32,
    /// Tangential uncertainty of an observation, in degrees
    pub angle_uncertainty: f32,
    /// Heading uncertainty of an observation, in degrees
    pub update_heading_uncertainty: f32,
    /// Hypotheses closer than these thresholds are merged. Heading in degrees, x and y in mm.
    pub similar_heading_thresh: f32,
    pub similar_x_thresh: f32,
    pub similar_y_thresh: f32,
    /// Hypotheses at or below this weight are dropped
    pub min_cmkf_weight: f32,
}

impl Default for LocaliserConfig {
    fn default() -> Self {
        Self {
            mode_split_weight_multiply_factor: 0.5,
            line_mode_split_weight_multiply_factor: 0.2,
            odometry_forward_multiply_factor: 20.0,
            odometry_left_multiply_factor: 20.0,
            odometry_heading_multiply_factor: 0.5,
            angle_uncertainty: 20.0,
            update_heading_uncertainty: 20.0,
            similar_heading_thresh: 30.0,
            similar_x_thresh: 500.0,
            similar_y_thresh: 500.0,
            min_cmkf_weight: 0.03,
        }
    }
}

/// Noise model of a ball filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallConfig {
    /// Standard deviation of the ball acceleration, in mm/s²
    pub std_acceleration_x: f32,
    pub std_acceleration_y: f32,
    /// Distance standard deviation of an observation is `base + rate * distance`
    pub std_observation_dist_base_walking: f32,
    pub std_observation_dist_increase_rate_walking: f32,
    /// In degrees
    pub std_observation_head_walking: f32,
    pub std_observation_dist_base_standing: f32,
    pub std_observation_dist_increase_rate_standing: f32,
    /// In degrees
    pub std_observation_head_standing: f32,
}

impl Default for BallConfig {
    fn default() -> Self {
        Self {
            std_acceleration_x: 70000.0,
            std_acceleration_y: 70000.0,
            std_observation_dist_base_walking: 20.0,
            std_observation_dist_increase_rate_walking: 0.5,
            std_observation_head_walking: 20.0,
            std_observation_dist_base_standing: 20.0,
            std_observation_dist_increase_rate_standing: 0.3,
            std_observation_head_standing: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiBallConfig {
    #[serde(flatten)]
    pub ball: BallConfig,
    /// An observation is associated if closer than `constant + linear * filter distance`
    pub similar_thresh_linear: f32,
    pub similar_thresh_constant: f32,
    /// Weight lost per cycle by filters within 1.5m of the robot
    pub close_decay_rate: f32,
    pub far_decay_rate: f32,
    pub weight_growth: f32,
    pub weight_initial: f32,
}

impl Default for MultiBallConfig {
    fn default() -> Self {
        Self {
            ball: BallConfig::default(),
            similar_thresh_linear: 0.2,
            similar_thresh_constant: 200.0,
            close_decay_rate: 0.5,
            far_decay_rate: 0.1,
            weight_growth: 1.5,
            weight_initial: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamBallConfig {
    pub std_acceleration_x: f32,
    pub std_acceleration_y: f32,
}

impl Default for TeamBallConfig {
    fn default() -> Self {
        Self {
            std_acceleration_x: 70000.0,
            std_acceleration_y: 70000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(StateEstimationConfig::PATH),
            "[adapter]\nuse_multi_ball = true\n\n[multi_ball]\nweight_initial = 5.0\n",
        )
        .unwrap();

        let config = StateEstimationConfig::load(dir.path()).unwrap();

        assert!(config.adapter.use_multi_ball);
        assert_eq!(config.adapter.initial_pose_type, "GAME");
        assert!((config.multi_ball.weight_initial - 5.0).abs() < f32::EPSILON);
        assert!((config.multi_ball.ball.std_acceleration_x - 70000.0).abs() < f32::EPSILON);
        assert_eq!(config.localiser, LocaliserConfig::default());
    }
}
