use std::f32::consts::FRAC_PI_2;

use itertools::Itertools;
use ordered_float::OrderedFloat;

use super::{BallFilter, write_ball_outputs};
use crate::config::MultiBallConfig;
use crate::estimator::Estimator;
use crate::field::{FIELD_LENGTH, FIELD_LENGTH_OFFSET, FIELD_WIDTH, FIELD_WIDTH_OFFSET};
use crate::types::{
    ActionType, BallInfo, EstimatorInfoIn, EstimatorInfoMiddle, EstimatorInfoOut, RrCoord,
};

/// Upper bound of a ball hypothesis weight.
const MAX_WEIGHT: f32 = 200.0;
/// Hypotheses below this weight are never reported.
const MIN_REPORTED_WEIGHT: f32 = 1.0;
/// Hypotheses closer than this, in mm, decay with the close decay rate.
const CLOSE_DISTANCE: f32 = 1500.0;
/// Seconds after a kick during which a ball moving away from the feet is still associated.
const KICK_WINDOW: f32 = 2.0;
/// Caps the time since the last kick, longer than any game.
const MAX_TIME_SINCE_LAST_KICK: f32 = 2.0 * 10.0 * 60.0;
const DOMINANT_WEIGHT_RATIO: f32 = 10.0;

/// Tracks every ball candidate and reports the closest convincing one on our half.
#[derive(Debug, Clone, Default)]
pub struct MultiBallTracker {
    kfs: Vec<BallFilter>,
    config: MultiBallConfig,
    have_outgoing_ball_update: bool,
    time_since_last_kick: f32,
}

impl MultiBallTracker {
    #[must_use]
    pub fn new(config: MultiBallConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn hypotheses(&self) -> &[BallFilter] {
        &self.kfs
    }

    /// Index of the finite, unused observation closest to where `kf` will be shortly.
    fn closest_observation(
        kf: &BallFilter,
        balls: &[BallInfo],
        used: &[bool],
        dt: f32,
    ) -> Option<(usize, f32)> {
        let look_ahead = RrCoord::from_cartesian(kf.position() + kf.velocity() * dt * 4.0);

        balls
            .iter()
            .enumerate()
            .filter(|(index, ball)| {
                if !ball.rr.is_finite() {
                    tracing::warn!(?ball, "ignoring non-finite ball observation");
                    return false;
                }
                !used[*index]
            })
            .map(|(index, ball)| (index, look_ahead.distance_squared_to(&ball.rr).max(0.0).sqrt()))
            .min_by_key(|(_, distance)| OrderedFloat(*distance))
    }

    fn associate(&mut self, input: &EstimatorInfoIn, kicking: bool) -> Vec<bool> {
        let config = &self.config;
        let balls = &input.balls;
        let mut used = vec![false; balls.len()];

        for kf in &mut self.kfs {
            let Some((index, distance)) =
                Self::closest_observation(kf, balls, &used, input.dt_in_seconds)
            else {
                continue;
            };

            let close = distance
                < config.similar_thresh_constant + kf.distance() * config.similar_thresh_linear;
            // A ball kicked away from the feet moves further than the association threshold.
            let kicked = (kicking || self.time_since_last_kick < KICK_WINDOW)
                && kf.distance() < config.similar_thresh_constant * 4.0
                && balls[index].rr.heading() < FRAC_PI_2
                && distance < config.similar_thresh_constant * 4.0;

            if !(close || kicked) {
                continue;
            }

            match kf.update(
                &balls[index],
                &input.action_command_body,
                &input.sensor_values,
                &config.ball,
            ) {
                Ok(innovation) => {
                    kf.weight = ((kf.weight + config.weight_growth)
                        * innovation.likelihood(0.25, 0.01))
                    .min(MAX_WEIGHT);
                    used[index] = true;
                    self.have_outgoing_ball_update = true;
                }
                Err(error) => tracing::warn!(?error, "skipping ball update"),
            }
        }

        used
    }

    /// Drops hypotheses that are far outside the field according to the current robot pose.
    fn delete_off_field(&mut self, out: &EstimatorInfoOut) {
        let x_clip = FIELD_LENGTH / 2.0 + FIELD_LENGTH_OFFSET;
        let y_clip = FIELD_WIDTH / 2.0 + FIELD_WIDTH_OFFSET;
        self.kfs.retain(|kf| {
            let world = out.robot_pos.transform(kf.position());
            world.x.abs() <= x_clip && world.y.abs() <= y_clip
        });
    }

    fn merge(&mut self) {
        let threshold = self.config.similar_thresh_constant;
        for (i, j) in (0..self.kfs.len()).tuple_combinations() {
            let (head, tail) = self.kfs.split_at_mut(j);
            let (kept, absorbed) = (&mut head[i], &mut tail[0]);
            if kept.weight <= 0.0 || absorbed.weight <= 0.0 {
                continue;
            }
            let diff = kept.position() - absorbed.position();
            if diff.x.abs() < threshold && diff.y.abs() < threshold {
                merge_pair(kept, absorbed);
            }
        }

        self.kfs.retain(|kf| kf.weight >= 0.0);
    }

    fn decay(&mut self) {
        for kf in &mut self.kfs {
            kf.weight -= if kf.distance() < CLOSE_DISTANCE {
                self.config.close_decay_rate
            } else {
                self.config.far_decay_rate
            };
        }
        self.kfs.retain(|kf| kf.weight > 0.0);
    }

    /// The closest hypothesis that is convincing enough and lies on our half of the field.
    fn selected(&self, out: &EstimatorInfoOut) -> Option<&BallFilter> {
        self.kfs
            .iter()
            .filter(|kf| kf.weight >= MIN_REPORTED_WEIGHT)
            .filter(|kf| out.robot_pos.transform(kf.position()).x < 0.0)
            .min_by_key(|kf| OrderedFloat(kf.distance()))
    }
}

/// Like the pose merge, except that comparable hypotheses only blend their covariance.
fn merge_pair(kept: &mut BallFilter, absorbed: &mut BallFilter) {
    let sum = kept.weight + absorbed.weight;

    if absorbed.weight > DOMINANT_WEIGHT_RATIO * kept.weight {
        kept.filter = absorbed.filter.clone();
    } else if kept.weight <= DOMINANT_WEIGHT_RATIO * absorbed.weight {
        kept.filter.covariance = (kept.weight / sum) * kept.filter.covariance
            + (absorbed.weight / sum) * absorbed.filter.covariance;
    }

    kept.weight = sum;
    absorbed.weight = -1.0;
}

impl Estimator for MultiBallTracker {
    fn tick(
        &mut self,
        input: &EstimatorInfoIn,
        middle: &mut EstimatorInfoMiddle,
        out: &mut EstimatorInfoOut,
    ) {
        if !input.have_pending_outgoing_shared_bundle {
            self.have_outgoing_ball_update = false;
        }

        let kicking = input.action_command_body.action_type == ActionType::Kick;
        self.time_since_last_kick = if kicking {
            0.0
        } else {
            (self.time_since_last_kick + input.dt_in_seconds).min(MAX_TIME_SINCE_LAST_KICK)
        };

        for kf in &mut self.kfs {
            kf.predict_collision();
            kf.predict(input.dt_in_seconds, &self.config.ball);
            kf.predict_with_odometry(&input.odometry_diff);
        }

        let used = if middle.can_do_observations {
            self.associate(input, kicking)
        } else {
            vec![false; input.balls.len()]
        };

        for (ball, _) in input.balls.iter().zip(used).filter(|(_, used)| !used) {
            if !ball.rr.is_finite() {
                continue;
            }
            self.kfs
                .push(BallFilter::from_observation(ball, self.config.weight_initial));
            self.have_outgoing_ball_update = true;
        }

        if middle.can_do_observations {
            self.delete_off_field(out);
            self.merge();
            self.decay();
        }
        tracing::trace!(hypotheses = self.kfs.len(), "tracked balls");

        if let Some(kf) = self.selected(out) {
            write_ball_outputs(kf, self.have_outgoing_ball_update, out);
        }
    }
}
