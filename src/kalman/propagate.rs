//! State prediction along z through a magnetic field
//!
//! Parameters are transported with a fixed-step 4th order Runge-Kutta
//! integration of the equations of motion in z-parametrisation:
//!
//! ```text
//! dx/dz  = tx
//! dy/dz  = ty
//! dtx/dz = k q/p n ( tx ty Bx - (1 + tx²) By + ty Bz )
//! dty/dz = k q/p n ( (1 + ty²) Bx - tx ty By - tx Bz )
//! ```
//!
//! with `n = sqrt(1 + tx² + ty²)` and `k = 0.299792458 GeV/(T m)`. The
//! transport Jacobian is obtained by central differences and the covariance
//! picks up a slope noise term proportional to the distance travelled.

use nalgebra::{Matrix5, Vector4, Vector5};

use super::state::TrackState;
use super::{IDX_QP, IDX_TX, IDX_TY, IDX_X, IDX_Y, STATE_DIM};
use crate::config::EstimatorConfig;
use crate::errors::TrackingError;
use crate::field::MagneticField;

/// Speed of light factor converting T·m to GeV/c
pub const LORENTZ_FACTOR: f64 = 0.299_792_458;

/// Finite-difference steps per parameter
const JACOBIAN_STEPS: [f64; STATE_DIM] = [1e-5, 1e-5, 1e-6, 1e-6, 1e-6];

/// Transports track states between z positions
#[derive(Debug, Clone, Copy)]
pub struct Propagator<'a> {
    field: &'a dyn MagneticField,
    max_step: f64,
    scattering_variance_per_meter: f64,
}

impl<'a> Propagator<'a> {
    /// Create a propagator over a field
    pub fn new(field: &'a dyn MagneticField, config: &EstimatorConfig) -> Self {
        Self {
            field,
            max_step: config.max_step,
            scattering_variance_per_meter: config.scattering_variance_per_meter,
        }
    }

    /// Derivative of (x, y, tx, ty) with respect to z
    fn derivative(&self, z: f64, s: &Vector4<f64>, qp: f64) -> Vector4<f64> {
        let (x, y, tx, ty) = (s[0], s[1], s[2], s[3]);
        let b = self.field.field_at(x, y, z);
        let n = (1.0 + tx * tx + ty * ty).sqrt();
        let k = LORENTZ_FACTOR * qp * n;
        Vector4::new(
            tx,
            ty,
            k * (tx * ty * b.x - (1.0 + tx * tx) * b.y + ty * b.z),
            k * ((1.0 + ty * ty) * b.x - tx * ty * b.y - tx * b.z),
        )
    }

    /// Transport the parameter vector from `z_from` to `z_to`
    pub fn transport(&self, params: &Vector5<f64>, z_from: f64, z_to: f64) -> Vector5<f64> {
        let dz_total = z_to - z_from;
        if dz_total == 0.0 {
            return *params;
        }
        let steps = (dz_total.abs() / self.max_step).ceil().max(1.0) as usize;
        let h = dz_total / steps as f64;
        let qp = params[IDX_QP];

        let mut s = Vector4::new(params[IDX_X], params[IDX_Y], params[IDX_TX], params[IDX_TY]);
        let mut z = z_from;
        for _ in 0..steps {
            let k1 = self.derivative(z, &s, qp);
            let k2 = self.derivative(z + 0.5 * h, &(s + k1 * (0.5 * h)), qp);
            let k3 = self.derivative(z + 0.5 * h, &(s + k2 * (0.5 * h)), qp);
            let k4 = self.derivative(z + h, &(s + k3 * h), qp);
            s += (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (h / 6.0);
            z += h;
        }
        Vector5::new(s[0], s[1], s[2], s[3], qp)
    }

    /// Transport Jacobian d(params at z_to)/d(params at z_from)
    pub fn jacobian(&self, params: &Vector5<f64>, z_from: f64, z_to: f64) -> Matrix5<f64> {
        let mut jac = Matrix5::zeros();
        for (i, &eps) in JACOBIAN_STEPS.iter().enumerate() {
            let mut up = *params;
            let mut down = *params;
            up[i] += eps;
            down[i] -= eps;
            let column = (self.transport(&up, z_from, z_to) - self.transport(&down, z_from, z_to))
                / (2.0 * eps);
            jac.set_column(i, &column);
        }
        jac
    }

    /// Slope noise accumulated over a transport of `dz`
    fn process_noise(&self, dz: f64) -> Matrix5<f64> {
        let mut q = Matrix5::zeros();
        if self.scattering_variance_per_meter == 0.0 {
            return q;
        }
        let len = dz.abs();
        let var = self.scattering_variance_per_meter * len;
        for (pos, slope) in [(IDX_X, IDX_TX), (IDX_Y, IDX_TY)] {
            q[(slope, slope)] = var;
            q[(pos, pos)] = var * len * len / 3.0;
            q[(pos, slope)] = var * dz / 2.0;
            q[(slope, pos)] = var * dz / 2.0;
        }
        q
    }

    /// Predict a state to a new longitudinal position
    pub fn predict(&self, state: &TrackState, z: f64) -> Result<TrackState, TrackingError> {
        let params = self.transport(&state.params, state.z, z);
        let jac = self.jacobian(&state.params, state.z, z);
        let cov = jac * state.cov * jac.transpose() + self.process_noise(z - state.z);
        let predicted = TrackState::new(z, params, cov);
        if predicted.is_finite() {
            Ok(predicted)
        } else {
            Err(TrackingError::NumericalInstability {
                description: format!("prediction from z={} to z={} is not finite", state.z, z),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::UniformField;

    fn config(scattering: f64) -> EstimatorConfig {
        EstimatorConfig {
            scattering_variance_per_meter: scattering,
            ..EstimatorConfig::default()
        }
    }

    #[test]
    fn test_straight_line_without_field() {
        let field = UniformField::zero();
        let prop = Propagator::new(&field, &config(0.0));
        let state = TrackState::new(
            2.0,
            Vector5::new(1.0, 0.5, 0.5, 0.25, -0.5),
            Matrix5::identity() * 1e-4,
        );
        let pred = prop.predict(&state, 1.0).unwrap();
        assert_eq!(pred.z, 1.0);
        assert!((pred.x() - 0.5).abs() < 1e-12);
        assert!((pred.y() - 0.25).abs() < 1e-12);
        assert!((pred.tx() - 0.5).abs() < 1e-12);
        assert_eq!(pred.qp(), -0.5);
        // var(x) = var(x0) + dz² var(tx)
        assert!((pred.var_x() - 2e-4).abs() < 1e-9);
    }

    #[test]
    fn test_solenoid_bends_transverse_direction() {
        let field = UniformField::along_z(1.0);
        let prop = Propagator::new(&field, &config(0.0));
        let params = Vector5::new(0.0, 0.0, 0.5, 0.0, -1.0);
        let out = prop.transport(&params, 0.0, 1.0);
        // Negative particle in +Bz: dty/dz = -k qp n tx Bz > 0
        assert!(out[IDX_TY] > 0.0);
        // Transverse slope magnitude is conserved in a pure solenoid
        let before = 0.5_f64;
        let after = out[IDX_TX].hypot(out[IDX_TY]);
        assert!((before - after).abs() < 1e-6);
    }

    #[test]
    fn test_jacobian_matches_straight_line() {
        let field = UniformField::zero();
        let prop = Propagator::new(&field, &config(0.0));
        let jac = prop.jacobian(&Vector5::new(0.1, 0.2, 0.3, 0.4, -0.5), 1.0, 1.5);
        assert!((jac[(IDX_X, IDX_TX)] - 0.5).abs() < 1e-6);
        assert!((jac[(IDX_Y, IDX_TY)] - 0.5).abs() < 1e-6);
        assert!((jac[(IDX_X, IDX_X)] - 1.0).abs() < 1e-6);
        assert!(jac[(IDX_X, IDX_QP)].abs() < 1e-9);
    }

    #[test]
    fn test_scattering_inflates_slope_variance() {
        let field = UniformField::zero();
        let prop = Propagator::new(&field, &config(1e-6));
        let state = TrackState::new(0.0, Vector5::zeros(), Matrix5::identity() * 1e-6);
        let pred = prop.predict(&state, 2.0).unwrap();
        assert!((pred.cov[(IDX_TX, IDX_TX)] - 3e-6).abs() < 1e-12);
    }

    #[test]
    fn test_zero_distance_is_identity() {
        let field = UniformField::along_z(1.5);
        let prop = Propagator::new(&field, &config(1e-6));
        let state = TrackState::new(
            1.0,
            Vector5::new(0.1, 0.2, 0.3, 0.4, -0.5),
            Matrix5::identity() * 1e-3,
        );
        let pred = prop.predict(&state, 1.0).unwrap();
        assert_eq!(pred.params, state.params);
        assert!((pred.cov - state.cov).abs().max() < 1e-12);
    }
}
