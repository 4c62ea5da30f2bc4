mod action;
mod broadcast;
mod coord;
mod estimator_info;
mod game;
mod vision;

pub use action::{ActionCommand, ActionType, BodyCommand, HeadCommand, Odometry, SensorValues};
pub use broadcast::{BehaviourSharedData, BroadcastData, SharedStateEstimationBundle};
pub use coord::{AbsCoord, RrCoord, angle_difference, normalise_theta, rotation};
pub use estimator_info::{
    EstimatorInfoIn, EstimatorInfoInit, EstimatorInfoMiddle, EstimatorInfoOut, InitialPoseType,
};
pub use game::{CompetitionType, GamePhase, GameState, Penalty, SetPlay};
pub use vision::{
    BallInfo, FieldFeatureInfo, FieldFeatureType, RobotObstacle, RobotType, RobotVisionInfo,
};
