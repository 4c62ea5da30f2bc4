//! A bank of weighted pose hypotheses that splits on ambiguous landmarks and merges hypotheses
//! that agree.
use nalgebra::{Matrix3, vector};

use super::cmkf::Cmkf;
use super::transitioner::{LocaliserTransitioner, PoseReset};
use crate::config::LocaliserConfig;
use crate::field::{FIELD_LENGTH_OFFSET, FieldFeatureLocations, within_field};
use crate::types::{
    EstimatorInfoIn, EstimatorInfoInit, EstimatorInfoMiddle, EstimatorInfoOut, FieldFeatureInfo,
    FieldFeatureType, angle_difference,
};

/// A hypothesis that outweighs the other by more than this factor absorbs it without blending.
const DOMINANT_WEIGHT_RATIO: f32 = 10.0;

/// Initial uncertainty of every hypothesis created by a reset.
fn reset_covariance() -> Matrix3<f32> {
    Matrix3::from_diagonal(&vector![100_000.0, 100_000.0, 0.5])
}

#[derive(Debug, Clone)]
pub struct MultiModalCmkf {
    kfs: Vec<Cmkf>,
    /// Copy of the best hypothesis, kept when the bank runs empty.
    best: Cmkf,
    transitioner: LocaliserTransitioner,
    field: FieldFeatureLocations,
    config: LocaliserConfig,
}

impl MultiModalCmkf {
    #[must_use]
    pub fn new(init: &EstimatorInfoInit, config: LocaliserConfig) -> Self {
        let mut mmcmkf = Self {
            kfs: Vec::new(),
            best: Cmkf::new(vector![0.0, 0.0, 0.0], reset_covariance(), 0.0),
            transitioner: LocaliserTransitioner::new(init),
            field: FieldFeatureLocations::new(),
            config,
        };
        mmcmkf.reset(PoseReset::Initial, init);
        mmcmkf.determine_best();
        mmcmkf
    }

    #[must_use]
    pub fn hypotheses(&self) -> &[Cmkf] {
        &self.kfs
    }

    #[must_use]
    pub fn best(&self) -> &Cmkf {
        &self.best
    }

    /// Replaces every hypothesis with the poses of `reset`.
    pub fn reset(&mut self, reset: PoseReset, init: &EstimatorInfoInit) {
        self.kfs = reset
            .poses(init)
            .into_iter()
            .map(|pose| Cmkf::new(pose.vec, reset_covariance(), 1.0))
            .collect();
    }

    pub fn tick(
        &mut self,
        init: &EstimatorInfoInit,
        input: &EstimatorInfoIn,
        middle: &EstimatorInfoMiddle,
        out: &mut EstimatorInfoOut,
    ) {
        if let Some(reset) = self.transitioner.handle_transition(init, input) {
            self.reset(reset, init);
        }

        if middle.can_localise_in_state {
            for kf in &mut self.kfs {
                kf.predict(&input.odometry_diff, &self.config);
            }

            if middle.can_do_observations {
                let splits = self.split_on_observations(&input.field_features);
                self.kfs.extend(splits);

                if !input.field_features.is_empty() {
                    self.delete_off_field();
                    self.merge();
                    self.normalise_weights();
                    self.delete_low_weight();
                }
            }
        }

        self.determine_best();
        tracing::trace!(hypotheses = self.kfs.len(), "localised");

        out.all_robot_pos = self.kfs.iter().map(Cmkf::robot_abs_coord).collect();
        out.robot_pos = self.best.robot_abs_coord();
        out.robot_pos_uncertainty = self.best.robot_pos_uncertainty();
        out.robot_heading_uncertainty = self.best.robot_heading_uncertainty();
        out.shared_state_estimation_bundle.robot_pos = out.robot_pos;
    }

    /// Proposes one updated copy of every hypothesis per candidate location of every observed
    /// feature. The copies are only added to the bank by the caller.
    fn split_on_observations(&self, features: &[FieldFeatureInfo]) -> Vec<Cmkf> {
        let config = &self.config;
        let mut splits = Vec::new();

        for kf in &self.kfs {
            for feature in features {
                if !feature.rr.is_finite() {
                    tracing::warn!(?feature, "ignoring non-finite field feature");
                    continue;
                }

                let locations = match feature.kind {
                    FieldFeatureType::Corner => &self.field.corners,
                    FieldFeatureType::TJunction => &self.field.t_junctions,
                    FieldFeatureType::CentreCircle => &self.field.centre_circles,
                    FieldFeatureType::Line => {
                        let factor = config.line_mode_split_weight_multiply_factor;
                        for &x in &self.field.constant_x_lines {
                            for on_positive_side in [true, false] {
                                let mut split = kf.split(factor);
                                split.update_constant_x_line(feature, x, on_positive_side);
                                splits.push(split);
                            }
                        }
                        for &y in &self.field.constant_y_lines {
                            for on_positive_side in [true, false] {
                                let mut split = kf.split(factor);
                                split.update_constant_y_line(feature, y, on_positive_side);
                                splits.push(split);
                            }
                        }
                        continue;
                    }
                    _ => continue,
                };

                for location in locations {
                    let mut split = kf.split(config.mode_split_weight_multiply_factor);
                    split.update_point(feature, location, config);
                    splits.push(split);
                }
            }
        }

        splits
    }

    fn delete_off_field(&mut self) {
        self.kfs
            .retain(|kf| within_field(kf.state().x, kf.state().y, FIELD_LENGTH_OFFSET));
    }

    fn similar(&self, a: &Cmkf, b: &Cmkf) -> bool {
        let diff = a.state() - b.state();
        angle_difference(a.heading(), b.heading()).abs()
            < self.config.similar_heading_thresh.to_radians()
            && diff.x.abs() < self.config.similar_x_thresh
            && diff.y.abs() < self.config.similar_y_thresh
    }

    /// Merges every similar pair into the earlier hypothesis, summing their weights.
    pub fn merge(&mut self) {
        for i in 0..self.kfs.len() {
            if self.kfs[i].weight <= 0.0 {
                continue;
            }
            for j in i + 1..self.kfs.len() {
                if self.kfs[j].weight > 0.0 && self.similar(&self.kfs[i], &self.kfs[j]) {
                    let (head, tail) = self.kfs.split_at_mut(j);
                    merge_pair(&mut head[i], &mut tail[0]);
                }
            }
        }

        self.kfs.retain(|kf| kf.weight >= 0.0);
    }

    /// Scales the weights to sum to one.
    pub fn normalise_weights(&mut self) {
        let sum: f32 = self.kfs.iter().map(|kf| kf.weight).sum();
        if sum <= 0.0 {
            return;
        }
        for kf in &mut self.kfs {
            kf.weight /= sum;
        }
    }

    fn delete_low_weight(&mut self) {
        let min_weight = self.config.min_cmkf_weight;
        self.kfs.retain(|kf| kf.weight > min_weight);
    }

    fn determine_best(&mut self) {
        let best = self
            .kfs
            .iter()
            .filter(|kf| kf.weight > 0.0)
            .reduce(|best, kf| if kf.weight > best.weight { kf } else { best });

        if let Some(best) = best {
            self.best = best.clone();
        }
    }
}

/// Absorbs `absorbed` into `kept`. `absorbed` is marked for deletion with a negative weight.
fn merge_pair(kept: &mut Cmkf, absorbed: &mut Cmkf) {
    let sum = kept.weight + absorbed.weight;

    if absorbed.weight > DOMINANT_WEIGHT_RATIO * kept.weight {
        kept.filter = absorbed.filter.clone();
    } else if kept.weight <= DOMINANT_WEIGHT_RATIO * absorbed.weight {
        let kept_ratio = kept.weight / sum;
        let absorbed_ratio = absorbed.weight / sum;

        let sin = kept_ratio * kept.heading().sin() + absorbed_ratio * absorbed.heading().sin();
        let cos = kept_ratio * kept.heading().cos() + absorbed_ratio * absorbed.heading().cos();

        let filter = &mut kept.filter;
        filter.state = kept_ratio * filter.state + absorbed_ratio * absorbed.filter.state;
        filter.state.z = sin.atan2(cos);
        filter.covariance =
            kept_ratio * filter.covariance + absorbed_ratio * absorbed.filter.covariance;
    }

    kept.weight = sum;
    absorbed.weight = -1.0;
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;
    use crate::types::{GameState, RrCoord};

    fn bank(kfs: Vec<Cmkf>) -> MultiModalCmkf {
        let mut mmcmkf =
            MultiModalCmkf::new(&EstimatorInfoInit::default(), LocaliserConfig::default());
        mmcmkf.kfs = kfs;
        mmcmkf
    }

    fn hypothesis(x: f32, y: f32, heading: f32, weight: f32) -> Cmkf {
        Cmkf::new(vector![x, y, heading], reset_covariance(), weight)
    }

    #[test]
    fn starts_at_the_game_pose() {
        let mmcmkf =
            MultiModalCmkf::new(&EstimatorInfoInit::default(), LocaliserConfig::default());
        assert_eq!(mmcmkf.hypotheses().len(), 1);
        assert_eq!(mmcmkf.best().state(), &vector![-3500.0, 3000.0, -FRAC_PI_2]);
    }

    #[test]
    fn dominant_hypothesis_absorbs_without_blending() {
        let mut mmcmkf = bank(vec![
            hypothesis(100.0, 100.0, 0.1, 0.95),
            hypothesis(300.0, 0.0, -0.1, 0.05),
        ]);

        mmcmkf.merge();

        assert_eq!(mmcmkf.hypotheses().len(), 1);
        let kf = &mmcmkf.hypotheses()[0];
        assert_eq!(kf.state(), &vector![100.0, 100.0, 0.1]);
        assert!((kf.weight - 1.0).abs() < 1e-6);
    }

    #[test]
    fn comparable_hypotheses_are_blended() {
        let mut mmcmkf = bank(vec![
            hypothesis(0.0, 0.0, 0.2, 0.6),
            hypothesis(400.0, -200.0, -0.2, 0.4),
        ]);

        mmcmkf.merge();

        assert_eq!(mmcmkf.hypotheses().len(), 1);
        let kf = &mmcmkf.hypotheses()[0];
        assert!((kf.state().x - 160.0).abs() < 1e-3);
        assert!((kf.state().y - -80.0).abs() < 1e-3);
        let expected = (0.6 * 0.2_f32.sin() - 0.4 * 0.2_f32.sin())
            .atan2(0.6 * 0.2_f32.cos() + 0.4 * 0.2_f32.cos());
        assert!((kf.heading() - expected).abs() < 1e-6);
        assert!((kf.weight - 1.0).abs() < 1e-6);
    }

    #[test]
    fn distinct_hypotheses_are_not_merged() {
        let mut mmcmkf = bank(vec![
            hypothesis(0.0, 0.0, 0.0, 0.5),
            hypothesis(0.0, 0.0, 3.0, 0.5),
            hypothesis(2000.0, 0.0, 0.0, 0.5),
        ]);

        mmcmkf.merge();

        assert_eq!(mmcmkf.hypotheses().len(), 3);
    }

    #[test]
    fn normalised_weights_sum_to_one() {
        let mut mmcmkf = bank(vec![
            hypothesis(0.0, 0.0, 0.0, 0.3),
            hypothesis(1000.0, 0.0, 0.0, 0.02),
            hypothesis(-1000.0, 0.0, 0.0, 1.7),
        ]);

        mmcmkf.normalise_weights();

        let sum: f32 = mmcmkf.hypotheses().iter().map(|kf| kf.weight).sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn observation_splits_and_prunes() {
        let init = EstimatorInfoInit {
            state: GameState::Playing,
            ..Default::default()
        };
        let mut mmcmkf = MultiModalCmkf::new(&init, LocaliserConfig::default());
        mmcmkf.kfs = vec![hypothesis(0.0, 0.0, 0.0, 1.0)];

        let input = EstimatorInfoIn {
            state: GameState::Playing,
            field_features: vec![FieldFeatureInfo::new(
                RrCoord::new(3010.0, FRAC_PI_2, 0.0),
                FieldFeatureType::TJunction,
            )],
            ..Default::default()
        };
        let mut out = EstimatorInfoOut::default();
        mmcmkf.tick(&init, &input, &EstimatorInfoMiddle::default(), &mut out);

        // Normalised before the unlikely splits were dropped.
        let sum: f32 = mmcmkf.hypotheses().iter().map(|kf| kf.weight).sum();
        assert!(sum <= 1.0 + 1e-5 && sum > 0.9);
        assert!(mmcmkf.hypotheses().iter().all(|kf| kf.weight > 0.03));
        assert_eq!(out.all_robot_pos.len(), mmcmkf.hypotheses().len());
        assert!(out.robot_pos.position().norm() < 500.0);
    }

    #[test]
    fn non_finite_features_are_skipped() {
        let init = EstimatorInfoInit {
            state: GameState::Playing,
            ..Default::default()
        };
        let mut mmcmkf = MultiModalCmkf::new(&init, LocaliserConfig::default());
        let before = mmcmkf.hypotheses().to_vec();

        let input = EstimatorInfoIn {
            state: GameState::Playing,
            field_features: vec![FieldFeatureInfo::new(
                RrCoord::new(f32::NAN, 0.0, 0.0),
                FieldFeatureType::Corner,
            )],
            ..Default::default()
        };
        mmcmkf.tick(
            &init,
            &input,
            &EstimatorInfoMiddle::default(),
            &mut EstimatorInfoOut::default(),
        );

        assert_eq!(mmcmkf.hypotheses(), before.as_slice());
    }
}
