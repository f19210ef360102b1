//! Magnetic field models used by track propagation
//!
//! The solenoid map is tabulated on a cylindrical (z, r) grid with a 1 cm
//! pitch. Lookups take metres, interpolate bilinearly and return the field
//! in tesla as a Cartesian vector. Outside the tabulated region the field is
//! zero.

use std::fs;
use std::path::Path;

use nalgebra::Vector3;

use crate::errors::TrackingError;

/// Source of the magnetic field along a trajectory
pub trait MagneticField: std::fmt::Debug + Send + Sync {
    /// Field at a lab position (m), in tesla
    fn field_at(&self, x: f64, y: f64, z: f64) -> Vector3<f64>;
}

/// Constant field, zero by default
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UniformField {
    /// Field vector in tesla
    pub b: Vector3<f64>,
}

impl UniformField {
    /// No field: tracks are straight lines
    pub fn zero() -> Self {
        Self::default()
    }

    /// Solenoidal field along z
    pub fn along_z(bz: f64) -> Self {
        Self {
            b: Vector3::new(0.0, 0.0, bz),
        }
    }
}

impl MagneticField for UniformField {
    #[inline]
    fn field_at(&self, _x: f64, _y: f64, _z: f64) -> Vector3<f64> {
        self.b
    }
}

const GAUSS_PER_TESLA: f64 = 1.0e4;
const CM_PER_M: f64 = 100.0;

/// Cylindrically symmetric field map on a 1 cm (z, r) grid
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMap {
    z_bins: usize,
    r_bins: usize,
    /// Offset added to z (cm) to obtain the grid row
    z_shift_cm: f64,
    /// Row-major [z][r] axial component (T)
    bz: Vec<f64>,
    /// Row-major [z][r] radial component (T)
    br: Vec<f64>,
}

impl FieldMap {
    /// Empty (zero) map covering `z_bins` x `r_bins` centimetre cells
    pub fn zeros(z_bins: usize, r_bins: usize, z_shift_cm: f64) -> Self {
        Self {
            z_bins,
            r_bins,
            z_shift_cm,
            bz: vec![0.0; z_bins * r_bins],
            br: vec![0.0; z_bins * r_bins],
        }
    }

    /// Parse a whitespace separated table with columns `r z Br Bz`
    /// (positions in cm, field in gauss). Blank lines and lines starting
    /// with `#` are skipped. Entries outside the grid are ignored.
    pub fn parse(
        table: &str,
        z_bins: usize,
        r_bins: usize,
        z_shift_cm: f64,
    ) -> Result<Self, TrackingError> {
        let mut map = Self::zeros(z_bins, r_bins, z_shift_cm);
        for (line_no, line) in table.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let values = line
                .split_whitespace()
                .map(str::parse::<f64>)
                .collect::<Result<Vec<f64>, _>>()
                .map_err(|e| TrackingError::FieldMap {
                    line: Some(line_no + 1),
                    description: e.to_string(),
                })?;
            if values.len() != 4 {
                return Err(TrackingError::FieldMap {
                    line: Some(line_no + 1),
                    description: format!("expected 4 columns, found {}", values.len()),
                });
            }
            let z_pos = (values[1] + z_shift_cm).trunc().abs() as usize;
            let r_pos = values[0].trunc().abs() as usize;
            if z_pos < z_bins && r_pos < r_bins {
                let idx = z_pos * r_bins + r_pos;
                map.br[idx] = values[2] / GAUSS_PER_TESLA;
                map.bz[idx] = values[3] / GAUSS_PER_TESLA;
            } else {
                log::trace!("field map entry outside grid at line {}", line_no + 1);
            }
        }
        log::debug!("loaded field map with {} x {} cells", z_bins, r_bins);
        Ok(map)
    }

    /// Load a table from disk, see [`FieldMap::parse`]
    pub fn load<P: AsRef<Path>>(
        path: P,
        z_bins: usize,
        r_bins: usize,
        z_shift_cm: f64,
    ) -> Result<Self, TrackingError> {
        let path = path.as_ref();
        let table = fs::read_to_string(path).map_err(|e| TrackingError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&table, z_bins, r_bins, z_shift_cm)
    }

    /// Set one grid node (field in tesla)
    pub fn set_node(&mut self, z_index: usize, r_index: usize, br: f64, bz: f64) {
        let idx = z_index * self.r_bins + r_index;
        self.br[idx] = br;
        self.bz[idx] = bz;
    }

    #[inline]
    fn node(&self, z_index: usize, r_index: usize) -> (f64, f64) {
        let idx = z_index * self.r_bins + r_index;
        (self.br[idx], self.bz[idx])
    }

    /// Radial and axial components at (r, z) in grid units (cm)
    fn interpolate(&self, r: f64, z: f64) -> Option<(f64, f64)> {
        if r < 0.0 || z <= 0.0 {
            return None;
        }
        let r_min = r as usize;
        let z_min = z as usize;
        let (r_max, z_max) = (r_min + 1, z_min + 1);
        if r_max >= self.r_bins || z_max >= self.z_bins {
            return None;
        }

        let (br11, bz11) = self.node(z_min, r_min);
        let (br12, bz12) = self.node(z_min, r_max);
        let (br21, bz21) = self.node(z_max, r_min);
        let (br22, bz22) = self.node(z_max, r_max);

        // Unit cell, so the normalisation (r_max - r_min)(z_max - z_min) is 1
        let w11 = (z_max as f64 - z) * (r_max as f64 - r);
        let w21 = (z - z_min as f64) * (r_max as f64 - r);
        let w12 = (z_max as f64 - z) * (r - r_min as f64);
        let w22 = (z - z_min as f64) * (r - r_min as f64);

        let br = br11 * w11 + br21 * w21 + br12 * w12 + br22 * w22;
        let bz = bz11 * w11 + bz21 * w21 + bz12 * w12 + bz22 * w22;
        Some((br, bz))
    }
}

impl MagneticField for FieldMap {
    fn field_at(&self, x: f64, y: f64, z: f64) -> Vector3<f64> {
        let (x, y) = (x * CM_PER_M, y * CM_PER_M);
        let z = z * CM_PER_M + self.z_shift_cm;
        let r = x.hypot(y);
        match self.interpolate(r, z) {
            Some((br, bz)) if r > 0.0 => Vector3::new(br * x / r, br * y / r, bz),
            Some((_, bz)) => Vector3::new(0.0, 0.0, bz),
            None => Vector3::zeros(),
        }
    }
}
