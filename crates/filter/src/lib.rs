use nalgebra::{SMatrix, SVector};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Matrix is not invertible")]
    Inversion,
    #[error("Matrix contains non-finite values")]
    NonFinite,
}

pub type Result<T> = std::result::Result<T, Error>;

pub type StateVec<const D: usize> = SVector<f32, D>;
pub type CovMat<const D: usize> = SMatrix<f32, D, D>;
pub type CrossCovMat<const D1: usize, const D2: usize> = SMatrix<f32, D1, D2>;

/// Returns `true` if every element of the matrix is finite.
#[must_use]
pub fn all_finite<const R: usize, const C: usize>(matrix: &SMatrix<f32, R, C>) -> bool {
    matrix.iter().all(|value| value.is_finite())
}

/// Area of the smallest rectangle that fits around the 1-sigma ellipse of a 2D covariance.
///
/// This is `sqrt(|l1|) * sqrt(|l2|)` for the eigenvalues `l1`, `l2`, which for a 2x2 matrix
/// equals the square root of the absolute determinant.
#[must_use]
pub fn ellipse_area(covariance: &CovMat<2>) -> f32 {
    covariance.determinant().abs().sqrt()
}

/// The innovation of a single measurement update.
#[derive(Debug, Clone)]
pub struct Innovation<const M: usize> {
    pub residual: StateVec<M>,
    pub covariance: CovMat<M>,
    pub covariance_inverse: CovMat<M>,
}

impl<const M: usize> Innovation<M> {
    /// Squared Mahalanobis distance of the residual, `vᵀ S⁻¹ v`.
    #[must_use]
    pub fn mahalanobis_squared(&self) -> f32 {
        (self.residual.transpose() * self.covariance_inverse * self.residual)[(0, 0)]
    }

    /// Gaussian likelihood factor `exp(-scale * vᵀ S⁻¹ v)` clamped to `[min, 1]`.
    #[must_use]
    pub fn likelihood(&self, scale: f32, min: f32) -> f32 {
        (-scale * self.mahalanobis_squared()).exp().clamp(min, 1.0)
    }
}

/// A linear Kalman filter with a `D` dimensional state.
///
/// Measurements are applied with the Joseph form covariance update, which keeps the covariance
/// symmetric positive semi-definite under rounding.
#[derive(Debug, Clone, PartialEq)]
pub struct KalmanFilter<const D: usize> {
    pub state: StateVec<D>,
    pub covariance: CovMat<D>,
}

impl<const D: usize> KalmanFilter<D> {
    #[must_use]
    pub fn new<S, C>(state: S, covariance: C) -> Self
    where
        S: Into<StateVec<D>>,
        C: Into<CovMat<D>>,
    {
        Self {
            state: state.into(),
            covariance: covariance.into(),
        }
    }

    /// `x = F x + u`, `P = F P Fᵀ + Q`
    pub fn predict(
        &mut self,
        transition: &CovMat<D>,
        control: &StateVec<D>,
        process_noise: &CovMat<D>,
    ) {
        self.state = transition * self.state + control;
        self.covariance = transition * self.covariance * transition.transpose() + process_noise;
    }

    /// Propagates only the covariance through a jacobian, `P = J P Jᵀ + Q`.
    pub fn propagate(&mut self, jacobian: &CovMat<D>, process_noise: &CovMat<D>) {
        self.covariance = jacobian * self.covariance * jacobian.transpose() + process_noise;
    }

    /// Computes the innovation of a residual without touching the filter.
    pub fn innovation<const M: usize>(
        &self,
        observation_model: &CrossCovMat<M, D>,
        residual: StateVec<M>,
        measurement_noise: &CovMat<M>,
    ) -> Result<Innovation<M>> {
        let covariance = measurement_noise
            + observation_model * self.covariance * observation_model.transpose();
        let covariance_inverse = covariance.try_inverse().ok_or(Error::Inversion)?;

        if !all_finite(&covariance_inverse) {
            return Err(Error::NonFinite);
        }

        Ok(Innovation {
            residual,
            covariance,
            covariance_inverse,
        })
    }

    /// Applies a measurement given its residual `z - H x`.
    ///
    /// On error the filter is left untouched.
    pub fn update<const M: usize>(
        &mut self,
        observation_model: &CrossCovMat<M, D>,
        residual: StateVec<M>,
        measurement_noise: &CovMat<M>,
    ) -> Result<Innovation<M>> {
        let innovation = self.innovation(observation_model, residual, measurement_noise)?;

        let kalman_gain: CrossCovMat<D, M> =
            self.covariance * observation_model.transpose() * innovation.covariance_inverse;
        let joseph = CovMat::<D>::identity() - kalman_gain * observation_model;

        self.state += kalman_gain * innovation.residual;
        self.covariance = joseph * self.covariance * joseph.transpose()
            + kalman_gain * measurement_noise * kalman_gain.transpose();

        Ok(innovation)
    }

    /// Re-expresses the covariance in a rotated frame, `P = R P Rᵀ`.
    pub fn rotate_covariance(&mut self, rotation: &CovMat<D>) {
        self.covariance = rotation * self.covariance * rotation.transpose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{matrix, vector};
    use rand::Rng;

    #[test]
    fn predict_applies_transition_and_noise() {
        let mut filter = KalmanFilter::<2>::new(vector![1.0, 2.0], CovMat::<2>::identity());
        let transition = matrix![1.0, 0.5; 0.0, 1.0];

        filter.predict(&transition, &vector![0.0, 1.0], &CovMat::<2>::identity());

        assert_eq!(filter.state, vector![2.0, 3.0]);
        assert!((filter.covariance[(0, 0)] - 2.25).abs() < 1e-6);
        assert!((filter.covariance[(1, 1)] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn update_moves_towards_measurement_and_shrinks_covariance() {
        let mut filter =
            KalmanFilter::<2>::new(vector![0.0, 0.0], CovMat::<2>::identity() * 4.0);
        let model = CrossCovMat::<1, 2>::new(1.0, 0.0);

        let innovation = filter
            .update(&model, vector![2.0], &(CovMat::<1>::identity() * 4.0))
            .expect("update should succeed");

        assert!((filter.state.x - 1.0).abs() < 1e-6);
        assert!(filter.covariance[(0, 0)] < 4.0);
        assert!((filter.covariance[(1, 1)] - 4.0).abs() < 1e-6);
        assert!((innovation.mahalanobis_squared() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn singular_innovation_leaves_filter_untouched() {
        let mut filter = KalmanFilter::<2>::new(vector![1.0, 1.0], CovMat::<2>::zeros());
        let before = filter.clone();

        let result = filter.update(
            &CovMat::<2>::identity(),
            vector![1.0, 1.0],
            &CovMat::<2>::zeros(),
        );

        assert!(matches!(result, Err(Error::Inversion)));
        assert_eq!(filter, before);
    }

    #[test]
    fn joseph_update_keeps_covariance_symmetric() {
        let mut rng = rand::rng();

        for _ in 0..50 {
            let a: CovMat<3> = CovMat::from_fn(|_, _| rng.random_range(-1.0..1.0));
            let covariance = a * a.transpose() + CovMat::<3>::identity();
            let mut filter = KalmanFilter::<3>::new(StateVec::<3>::zeros(), covariance);
            let residual = StateVec::<3>::from_fn(|_, _| rng.random_range(-10.0..10.0));

            filter
                .update(&CovMat::<3>::identity(), residual, &CovMat::<3>::identity())
                .expect("positive definite innovation");

            let asymmetry = filter.covariance - filter.covariance.transpose();
            assert!(asymmetry.abs().max() < 1e-4);
        }
    }

    #[test]
    fn likelihood_is_clamped() {
        let innovation = Innovation::<1> {
            residual: vector![100.0],
            covariance: CovMat::<1>::identity(),
            covariance_inverse: CovMat::<1>::identity(),
        };

        assert!((innovation.likelihood(0.5, 0.01) - 0.01).abs() < f32::EPSILON);
    }

    #[test]
    fn ellipse_area_of_diagonal_covariance() {
        let covariance = matrix![4.0, 0.0; 0.0, 9.0];
        assert!((ellipse_area(&covariance) - 6.0).abs() < 1e-6);
    }
}
