//! The estimator interface and the fixed set of estimators run every cycle.
use strum::Display;

use crate::ball::{EgoBallTracker, MultiBallTracker};
use crate::config::StateEstimationConfig;
use crate::localiser::Localiser;
use crate::robot_filter::RobotFilter;
use crate::team_ball::TeamBallTracker;
use crate::types::{EstimatorInfoIn, EstimatorInfoInit, EstimatorInfoMiddle, EstimatorInfoOut};

/// A single stage of the state estimation.
///
/// A tick never fails: problems with individual observations are logged and the observation is
/// skipped.
pub trait Estimator: Send {
    /// Consumes the observations of one cycle, may set gating flags in `middle` for the
    /// estimators after it and writes its estimates into `out`.
    fn tick(
        &mut self,
        input: &EstimatorInfoIn,
        middle: &mut EstimatorInfoMiddle,
        out: &mut EstimatorInfoOut,
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EstimatorKind {
    Localiser,
    EgoBallTracker,
    MultiBallTracker,
    TeamBallTracker,
    RobotFilter,
}

/// The estimators in the order they run. Later estimators read what earlier ones wrote into the
/// output, e.g. the ball trackers use the robot pose of this cycle.
pub struct Estimators {
    estimators: Vec<(EstimatorKind, Box<dyn Estimator>)>,
}

impl Estimators {
    #[must_use]
    pub fn new(init: &EstimatorInfoInit, config: &StateEstimationConfig) -> Self {
        let ball: (EstimatorKind, Box<dyn Estimator>) = if config.adapter.use_multi_ball {
            (
                EstimatorKind::MultiBallTracker,
                Box::new(MultiBallTracker::new(config.multi_ball.clone())),
            )
        } else {
            (
                EstimatorKind::EgoBallTracker,
                Box::new(EgoBallTracker::new(config.ego_ball.clone())),
            )
        };

        let estimators: Vec<(EstimatorKind, Box<dyn Estimator>)> = vec![
            (
                EstimatorKind::Localiser,
                Box::new(Localiser::new(init, config.localiser.clone())),
            ),
            ball,
            (
                EstimatorKind::TeamBallTracker,
                Box::new(TeamBallTracker::new(init, config.team_ball.clone())),
            ),
            (EstimatorKind::RobotFilter, Box::new(RobotFilter::new())),
        ];

        Self { estimators }
    }

    /// The kinds of the registered estimators, in order.
    pub fn kinds(&self) -> impl Iterator<Item = EstimatorKind> + '_ {
        self.estimators.iter().map(|(kind, _)| *kind)
    }

    /// Runs every estimator once.
    pub fn tick(
        &mut self,
        input: &EstimatorInfoIn,
        middle: &mut EstimatorInfoMiddle,
        out: &mut EstimatorInfoOut,
    ) {
        for (kind, estimator) in &mut self.estimators {
            let _span = tracing::trace_span!("estimator", %kind).entered();
            estimator.tick(input, middle, out);
        }
    }
}

impl std::fmt::Debug for Estimators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_order() {
        let mut config = StateEstimationConfig::default();
        let estimators = Estimators::new(&EstimatorInfoInit::default(), &config);
        assert_eq!(
            estimators.kinds().collect::<Vec<_>>(),
            [
                EstimatorKind::Localiser,
                EstimatorKind::EgoBallTracker,
                EstimatorKind::TeamBallTracker,
                EstimatorKind::RobotFilter,
            ]
        );

        config.adapter.use_multi_ball = true;
        let estimators = Estimators::new(&EstimatorInfoInit::default(), &config);
        assert_eq!(
            estimators.kinds().nth(1),
            Some(EstimatorKind::MultiBallTracker)
        );
    }
}
