//! State estimation for the robot.
//!
//! Every perception cycle the [`StateEstimationAdapter`] gathers the observations of the other
//! modules and runs a fixed sequence of [`Estimator`]s over them:
//!
//! 1. the [`Localiser`], a multi-modal Kalman filter over the robot pose,
//! 2. a ball tracker, either a single filter or a bank of hypotheses,
//! 3. the [`TeamBallTracker`], fusing the balls seen by teammates,
//! 4. the [`RobotFilter`], tracking the robots around us as obstacles.
//!
//! All distances are in millimetres and all angles in radians.
pub mod adapter;
pub mod ball;
pub mod codec;
pub mod config;
pub mod error;
pub mod estimator;
pub mod field;
pub mod localiser;
pub mod robot_filter;
pub mod team_ball;
pub mod timer;
pub mod types;

pub use adapter::{Blackboard, GameControllerInfo, PerceptionFrame, StateEstimationAdapter};
pub use codec::{Decode, Encode};
pub use config::StateEstimationConfig;
pub use error::{Error, Result};
pub use estimator::{Estimator, EstimatorKind, Estimators};
pub use localiser::Localiser;
pub use robot_filter::RobotFilter;
pub use team_ball::TeamBallTracker;
