//! A single weighted pose hypothesis and its measurement models.
use filter::{CovMat, KalmanFilter, StateVec};
use nalgebra::{Matrix2, Matrix3, Vector3, vector};

use crate::config::LocaliserConfig;
use crate::types::{AbsCoord, FieldFeatureInfo, Odometry, normalise_theta, rotation};

/// Variance used for the unobserved axis of a line observation.
const UNOBSERVED_VARIANCE: f32 = 1.0e12;

/// Pose hypothesis: `(x, y, heading)` in the absolute frame with a weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Cmkf {
    pub filter: KalmanFilter<3>,
    pub weight: f32,
}

impl Cmkf {
    #[must_use]
    pub fn new(state: Vector3<f32>, covariance: Matrix3<f32>, weight: f32) -> Self {
        Self {
            filter: KalmanFilter::new(state, covariance),
            weight,
        }
    }

    /// Copy of this hypothesis with its weight scaled by `factor`.
    #[must_use]
    pub fn split(&self, factor: f32) -> Self {
        Self {
            filter: self.filter.clone(),
            weight: self.weight * factor,
        }
    }

    #[must_use]
    pub fn state(&self) -> &StateVec<3> {
        &self.filter.state
    }

    #[must_use]
    pub fn covariance(&self) -> &CovMat<3> {
        &self.filter.covariance
    }

    #[must_use]
    pub fn heading(&self) -> f32 {
        self.filter.state.z
    }

    #[must_use]
    pub fn robot_abs_coord(&self) -> AbsCoord {
        AbsCoord {
            vec: self.filter.state,
            var: self.filter.covariance,
            weight: self.weight,
        }
    }

    /// Square root of the area spanned by the position covariance ellipse.
    #[must_use]
    pub fn robot_pos_uncertainty(&self) -> f32 {
        filter::ellipse_area(&self.filter.covariance.fixed_view::<2, 2>(0, 0).into_owned())
    }

    #[must_use]
    pub fn robot_heading_uncertainty(&self) -> f32 {
        self.filter.covariance[(2, 2)].sqrt()
    }

    /// Moves the hypothesis by a robot relative odometry step.
    pub fn predict(&mut self, odometry: &Odometry, config: &LocaliserConfig) {
        let state = &mut self.filter.state;
        let (sin, cos) = state.z.sin_cos();
        state.x += odometry.forward * cos - odometry.left * sin;
        state.y += odometry.forward * sin + odometry.left * cos;
        state.z = normalise_theta(state.z + odometry.turn);

        let heading = state.z;
        let relative_covariance = Matrix2::new(
            odometry.forward * odometry.forward * config.odometry_forward_multiply_factor,
            0.0,
            0.0,
            odometry.left * odometry.left * config.odometry_left_multiply_factor,
        );
        let rotation = rotation(heading);
        let odometry_covariance = rotation * relative_covariance * rotation.transpose();

        let distance_travelled = odometry.forward.hypot(odometry.left);
        let mut jacobian = CovMat::<3>::identity();
        jacobian[(0, 2)] = -distance_travelled * heading.sin();
        jacobian[(1, 2)] = distance_travelled * heading.cos();

        let mut process_noise = CovMat::<3>::zeros();
        process_noise
            .fixed_view_mut::<2, 2>(0, 0)
            .copy_from(&odometry_covariance);
        process_noise[(2, 2)] =
            config.odometry_heading_multiply_factor * odometry.turn * odometry.turn;

        self.filter.propagate(&jacobian, &process_noise);
    }

    /// Updates against a point feature (corner, T-junction, centre circle) at `location`, given as
    /// `(x, y, orientation)`.
    pub fn update_point(
        &mut self,
        observation: &FieldFeatureInfo,
        location: &Vector3<f32>,
        config: &LocaliserConfig,
    ) {
        let rr = &observation.rr;
        let distance = rr.distance();

        // Where we must stand to see the feature like this.
        let x = location.x + distance * (location.z + rr.orientation()).cos();
        let y = location.y + distance * (location.z + rr.orientation()).sin();
        let theta = normalise_theta((location.y - y).atan2(location.x - x) - rr.heading());

        let state = self.filter.state;
        let residual = vector![x - state.x, y - state.y, normalise_theta(theta - state.z)];

        // Polar uncertainty converted to cartesian.
        let radial = distance / 4.0;
        let tangential = distance * config.angle_uncertainty.to_radians().tan();
        let a = radial * radial;
        let b = tangential * tangential;
        let c = a - b;
        let (sin, cos) = theta.sin_cos();
        let heading_uncertainty = config.update_heading_uncertainty.to_radians();

        let mut noise = CovMat::<3>::zeros();
        noise[(0, 0)] = cos * cos * a + sin * sin * b;
        noise[(0, 1)] = 0.5 * (2.0 * theta).sin() * c;
        noise[(1, 0)] = noise[(0, 1)];
        noise[(1, 1)] = cos * cos * b + sin * sin * a;
        noise[(2, 2)] = heading_uncertainty * heading_uncertainty;

        self.apply(residual, &noise);
    }

    /// Updates against a line running parallel to the y-axis at `x`.
    pub fn update_constant_x_line(
        &mut self,
        observation: &FieldFeatureInfo,
        x: f32,
        on_positive_side: bool,
    ) {
        let rr = &observation.rr;
        let my_x = if on_positive_side {
            x + rr.distance()
        } else {
            x - rr.distance()
        };
        let my_heading = if on_positive_side {
            normalise_theta(std::f32::consts::PI - rr.heading())
        } else {
            -rr.heading()
        };

        let state = self.filter.state;
        let residual = vector![my_x - state.x, 0.0, normalise_theta(my_heading - state.z)];
        let noise = CovMat::<3>::from_diagonal(&vector![
            rr.var[(0, 0)],
            UNOBSERVED_VARIANCE,
            rr.var[(1, 1)]
        ]);

        self.apply(residual, &noise);
    }

    /// Updates against a line running parallel to the x-axis at `y`.
    pub fn update_constant_y_line(
        &mut self,
        observation: &FieldFeatureInfo,
        y: f32,
        on_positive_side: bool,
    ) {
        use std::f32::consts::FRAC_PI_2;

        let rr = &observation.rr;
        let my_y = if on_positive_side {
            y + rr.distance()
        } else {
            y - rr.distance()
        };
        let my_heading = if on_positive_side {
            normalise_theta(-FRAC_PI_2 - rr.heading())
        } else {
            normalise_theta(FRAC_PI_2 - rr.heading())
        };

        let state = self.filter.state;
        let residual = vector![0.0, my_y - state.y, normalise_theta(my_heading - state.z)];
        let noise = CovMat::<3>::from_diagonal(&vector![
            UNOBSERVED_VARIANCE,
            rr.var[(0, 0)],
            rr.var[(1, 1)]
        ]);

        self.apply(residual, &noise);
    }

    /// Full-state update with `H = I`. A failed inversion leaves the hypothesis unchanged.
    fn apply(&mut self, residual: StateVec<3>, noise: &CovMat<3>) {
        match self
            .filter
            .update(&CovMat::<3>::identity(), residual, noise)
        {
            Ok(innovation) => {
                self.filter.state.z = normalise_theta(self.filter.state.z);
                self.weight *= innovation.likelihood(0.5, 0.01);
            }
            Err(error) => {
                tracing::warn!(?error, "skipping pose update");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;
    use crate::types::{FieldFeatureType, RrCoord};

    fn hypothesis(x: f32, y: f32, heading: f32) -> Cmkf {
        Cmkf::new(
            vector![x, y, heading],
            Matrix3::from_diagonal(&vector![100_000.0, 100_000.0, 0.5]),
            1.0,
        )
    }

    #[test]
    fn zero_odometry_predict_is_identity_on_state() {
        let mut kf = hypothesis(100.0, -200.0, 0.3);
        let before = kf.clone();

        kf.predict(&Odometry::default(), &LocaliserConfig::default());

        assert_eq!(kf.state(), before.state());
        assert_eq!(kf.covariance(), before.covariance());
    }

    #[test]
    fn predict_moves_in_heading_frame_and_grows_covariance() {
        let mut kf = hypothesis(0.0, 0.0, FRAC_PI_2);
        let before = kf.covariance()[(0, 0)];

        kf.predict(&Odometry::new(100.0, 0.0, 0.1), &LocaliserConfig::default());

        assert!(kf.state().x.abs() < 1e-3);
        assert!((kf.state().y - 100.0).abs() < 1e-3);
        assert!((kf.heading() - (FRAC_PI_2 + 0.1)).abs() < 1e-5);
        assert!(kf.covariance()[(0, 0)] > before);
        assert!(kf.covariance()[(2, 2)] > 0.5);
    }

    #[test]
    fn consistent_point_observation_keeps_weight() {
        // Standing on the centre spot, looking at the T-junction on the left sideline.
        let location = vector![0.0, 3010.0, -FRAC_PI_2];
        let mut kf = hypothesis(0.0, 0.0, 0.0);
        let observation = FieldFeatureInfo::new(
            RrCoord::new(3010.0, FRAC_PI_2, 0.0),
            FieldFeatureType::TJunction,
        );

        kf.update_point(&observation, &location, &LocaliserConfig::default());

        assert!((kf.weight - 1.0).abs() < 1e-3);
        assert!(kf.state().xy().norm() < 1.0);
        assert!(kf.heading().abs() < 1e-3);
    }

    #[test]
    fn line_update_only_moves_observed_axis() {
        let mut kf = hypothesis(-4000.0, 500.0, 0.0);
        let mut rr = RrCoord::new(400.0, std::f32::consts::PI, 0.0);
        rr.var = Matrix3::from_diagonal(&vector![100.0, 0.01, 0.0]);
        let observation = FieldFeatureInfo::new(rr, FieldFeatureType::Line);

        kf.update_constant_x_line(&observation, -4505.0, true);

        assert!((kf.state().x - -4105.0).abs() < 5.0);
        assert!((kf.state().y - 500.0).abs() < 1e-2);
        assert!(kf.weight < 1.0);
    }

    #[test]
    fn singular_update_leaves_hypothesis_untouched() {
        let mut kf = Cmkf::new(vector![0.0, 0.0, 0.0], Matrix3::zeros(), 0.7);
        let observation =
            FieldFeatureInfo::new(RrCoord::new(0.0, 0.0, 0.0), FieldFeatureType::Corner);
        let before = kf.clone();

        kf.update_point(&observation, &vector![0.0, 0.0, 0.0], &LocaliserConfig::default());

        assert_eq!(kf, before);
    }
}
