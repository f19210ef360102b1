//! Track state and 2D measurements

use nalgebra::{Matrix2, Matrix5, Vector2, Vector5};

use super::{IDX_QP, IDX_TX, IDX_TY, IDX_X, IDX_Y};
use crate::detector::Hit;

/// Trajectory parameters `[x, y, tx, ty, q/p]` at a longitudinal position
///
/// `tx`, `ty` are dx/dz and dy/dz; `q/p` is in 1/GeV.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackState {
    /// Longitudinal position the parameters refer to (m)
    pub z: f64,
    /// Parameter vector
    pub params: Vector5<f64>,
    /// Parameter covariance
    pub cov: Matrix5<f64>,
}

impl TrackState {
    /// Create a new state
    pub fn new(z: f64, params: Vector5<f64>, cov: Matrix5<f64>) -> Self {
        Self { z, params, cov }
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.params[IDX_X]
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.params[IDX_Y]
    }

    #[inline]
    pub fn tx(&self) -> f64 {
        self.params[IDX_TX]
    }

    #[inline]
    pub fn ty(&self) -> f64 {
        self.params[IDX_TY]
    }

    #[inline]
    pub fn qp(&self) -> f64 {
        self.params[IDX_QP]
    }

    /// Variance of x
    #[inline]
    pub fn var_x(&self) -> f64 {
        self.cov[(IDX_X, IDX_X)]
    }

    /// Variance of y
    #[inline]
    pub fn var_y(&self) -> f64 {
        self.cov[(IDX_Y, IDX_Y)]
    }

    /// Transverse distance from the beam line
    #[inline]
    pub fn r(&self) -> f64 {
        self.x().hypot(self.y())
    }

    /// All parameters and covariance entries are finite
    pub fn is_finite(&self) -> bool {
        self.z.is_finite()
            && self.params.iter().all(|v| v.is_finite())
            && self.cov.iter().all(|v| v.is_finite())
    }
}

/// A 2D position measurement in the plane transverse to z
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Measured (x, y)
    pub pos: Vector2<f64>,
    /// Measurement covariance
    pub cov: Matrix2<f64>,
}

impl Measurement {
    /// Create a new measurement
    pub fn new(pos: Vector2<f64>, cov: Matrix2<f64>) -> Self {
        Self { pos, cov }
    }

    /// Point measurement with the same resolution on both axes
    pub fn point(x: f64, y: f64, sigma: f64) -> Self {
        Self::new(Vector2::new(x, y), Matrix2::identity() * (sigma * sigma))
    }

    /// Measurement of a tracker hit
    ///
    /// The hit resolution is given along the radial and azimuthal directions
    /// and rotated into (x, y) at the hit's azimuth.
    pub fn from_hit(hit: &Hit, sigma_r: f64, sigma_rphi: f64) -> Self {
        let (s, c) = hit.phi.sin_cos();
        let rot = Matrix2::new(c, -s, s, c);
        let local = Matrix2::new(sigma_r * sigma_r, 0.0, 0.0, sigma_rphi * sigma_rphi);
        Self::new(Vector2::new(hit.x, hit.y), rot * local * rot.transpose())
    }
}
