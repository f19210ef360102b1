//! Measurement update with a chi-square gate

use nalgebra::{Matrix2x5, Matrix5};

use super::state::{Measurement, TrackState};
use crate::errors::FilterFailure;

/// Outcome of an accepted update
#[derive(Debug, Clone)]
pub struct FilterResult {
    /// Updated state
    pub state: TrackState,
    /// Chi-square contribution of the measurement
    pub delta_chi2: f64,
}

/// Projection of the state onto the measured (x, y)
#[inline]
fn projection() -> Matrix2x5<f64> {
    #[rustfmt::skip]
    let h = Matrix2x5::new(
        1.0, 0.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0, 0.0,
    );
    h
}

/// Update a predicted state with a 2D measurement
///
/// The chi-square increment is computed from the predicted residual,
/// `r^T (V + H C H^T)^-1 r`, and the update is refused when it exceeds
/// `max_delta_chi2`. The covariance uses the Joseph form.
pub fn filter(
    predicted: &TrackState,
    measurement: &Measurement,
    max_delta_chi2: f64,
) -> Result<FilterResult, FilterFailure> {
    let h = projection();
    let residual = measurement.pos - h * predicted.params;
    let s = measurement.cov + h * predicted.cov * h.transpose();
    let s_inv = s.try_inverse().ok_or(FilterFailure::SingularInnovation)?;

    let delta_chi2 = (residual.transpose() * s_inv * residual)[(0, 0)];
    if !delta_chi2.is_finite() {
        return Err(FilterFailure::SingularInnovation);
    }
    if delta_chi2 > max_delta_chi2 {
        return Err(FilterFailure::GateExceeded {
            delta_chi2,
            max_delta_chi2,
        });
    }

    let gain = predicted.cov * h.transpose() * s_inv;
    let params = predicted.params + gain * residual;
    let i_minus_kh = Matrix5::identity() - gain * h;
    let cov = i_minus_kh * predicted.cov * i_minus_kh.transpose()
        + gain * measurement.cov * gain.transpose();

    Ok(FilterResult {
        state: TrackState::new(predicted.z, params, cov),
        delta_chi2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector5;

    fn prior() -> TrackState {
        TrackState::new(
            1.0,
            Vector5::new(0.0, 0.0, 0.1, 0.1, -0.5),
            Matrix5::identity() * 1e-4,
        )
    }

    #[test]
    fn test_update_pulls_toward_measurement() {
        let m = Measurement::point(0.01, -0.01, 1e-2);
        let result = filter(&prior(), &m, 100.0).unwrap();
        // Equal prior and measurement variance: halfway
        assert!((result.state.x() - 0.005).abs() < 1e-12);
        assert!((result.state.y() + 0.005).abs() < 1e-12);
        assert!((result.state.var_x() - 5e-5).abs() < 1e-12);
        // chi2 = 2 * (0.01² / 2e-4)
        assert!((result.delta_chi2 - 1.0).abs() < 1e-9);
        // Slopes are uncorrelated with position in the prior
        assert_eq!(result.state.tx(), 0.1);
    }

    #[test]
    fn test_gate_rejects_outlier() {
        let m = Measurement::point(1.0, 1.0, 1e-3);
        let err = filter(&prior(), &m, 60.0).unwrap_err();
        assert!(matches!(err, FilterFailure::GateExceeded { .. }));
    }

    #[test]
    fn test_singular_residual_covariance() {
        let mut state = prior();
        state.cov = Matrix5::zeros();
        let m = Measurement::point(0.0, 0.0, 0.0);
        assert_eq!(
            filter(&state, &m, 60.0).unwrap_err(),
            FilterFailure::SingularInnovation
        );
    }
}
