use super::{BallFilter, write_ball_outputs};
use crate::config::BallConfig;
use crate::estimator::Estimator;
use crate::types::{EstimatorInfoIn, EstimatorInfoMiddle, EstimatorInfoOut};

/// Tracks a single ball with the first ball detection of every cycle.
#[derive(Debug, Clone, Default)]
pub struct EgoBallTracker {
    kf: BallFilter,
    config: BallConfig,
    /// Latched until the outgoing bundle has been sent.
    have_outgoing_ball_update: bool,
}

impl EgoBallTracker {
    #[must_use]
    pub fn new(config: BallConfig) -> Self {
        Self {
            kf: BallFilter::default(),
            config,
            have_outgoing_ball_update: false,
        }
    }

    #[must_use]
    pub fn ball(&self) -> &BallFilter {
        &self.kf
    }
}

impl Estimator for EgoBallTracker {
    fn tick(
        &mut self,
        input: &EstimatorInfoIn,
        _middle: &mut EstimatorInfoMiddle,
        out: &mut EstimatorInfoOut,
    ) {
        if !input.have_pending_outgoing_shared_bundle {
            self.have_outgoing_ball_update = false;
        }

        self.kf.predict_collision();
        self.kf.predict(input.dt_in_seconds, &self.config);
        self.kf.predict_with_odometry(&input.odometry_diff);

        if let Some(ball) = input.balls.first() {
            if !ball.rr.is_finite() {
                tracing::warn!(?ball, "ignoring non-finite ball observation");
            } else {
                match self.kf.update(
                    ball,
                    &input.action_command_body,
                    &input.sensor_values,
                    &self.config,
                ) {
                    Ok(_) => self.have_outgoing_ball_update = true,
                    Err(error) => tracing::warn!(?error, "skipping ball update"),
                }
            }
        }

        write_ball_outputs(&self.kf, self.have_outgoing_ball_update, out);
    }
}
