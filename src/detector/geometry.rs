//! Static tracker geometry

use serde::{Deserialize, Serialize};

use crate::errors::TrackingError;

/// Number of tracker planes
pub const NUM_PLANES: usize = 5;

/// Most upstream plane used for seeding
pub const FRONT_SEED_PLANE: usize = 2;

/// Middle seed plane
pub const MID_SEED_PLANE: usize = 3;

/// Most downstream plane, also the back seed plane
pub const BACK_SEED_PLANE: usize = 4;

/// One readout module of a plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModuleGeometry {
    /// Azimuth of the module's centre line in the lab frame (rad)
    pub phi_in_lab: f64,
}

/// One tracker plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaneGeometry {
    /// Longitudinal position (m)
    pub z: f64,
    /// Readout modules
    pub modules: Vec<ModuleGeometry>,
}

impl PlaneGeometry {
    /// Plane with a single module
    pub fn single_module(z: f64, phi_in_lab: f64) -> Self {
        Self {
            z,
            modules: vec![ModuleGeometry { phi_in_lab }],
        }
    }

    /// Number of modules
    #[inline]
    pub fn num_modules(&self) -> usize {
        self.modules.len()
    }
}

/// Tracker planes plus the calorimeter face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detector {
    /// Planes ordered from upstream (0) to downstream
    pub planes: [PlaneGeometry; NUM_PLANES],
    /// Longitudinal position of the calorimeter face (m)
    pub calorimeter_z: f64,
}

impl Detector {
    /// Create and validate a detector description
    ///
    /// Planes must be strictly ordered in z and all lie upstream of the
    /// calorimeter, every plane needs at least one module, and the front seed
    /// plane must consist of exactly one module since it defines the
    /// reference rotation.
    pub fn new(planes: [PlaneGeometry; NUM_PLANES], calorimeter_z: f64) -> Result<Self, TrackingError> {
        let detector = Self {
            planes,
            calorimeter_z,
        };
        detector.validate()?;
        Ok(detector)
    }

    fn validate(&self) -> Result<(), TrackingError> {
        for (i, plane) in self.planes.iter().enumerate() {
            if plane.modules.is_empty() {
                return Err(TrackingError::Geometry {
                    description: format!("plane {} has no modules", i),
                });
            }
            if !plane.z.is_finite() {
                return Err(TrackingError::Geometry {
                    description: format!("plane {} has a non-finite z", i),
                });
            }
        }
        if self.planes.windows(2).any(|w| w[0].z >= w[1].z) {
            return Err(TrackingError::Geometry {
                description: "plane z positions must increase strictly downstream".to_string(),
            });
        }
        if self.calorimeter_z <= self.planes[NUM_PLANES - 1].z {
            return Err(TrackingError::Geometry {
                description: "calorimeter must lie downstream of the last plane".to_string(),
            });
        }
        if self.planes[FRONT_SEED_PLANE].num_modules() != 1 {
            return Err(TrackingError::Geometry {
                description: format!(
                    "plane {} must have exactly one module, found {}",
                    FRONT_SEED_PLANE,
                    self.planes[FRONT_SEED_PLANE].num_modules()
                ),
            });
        }
        Ok(())
    }

    /// Longitudinal position of a plane
    #[inline]
    pub fn plane_z(&self, plane: usize) -> f64 {
        self.planes[plane].z
    }

    /// Azimuth defining the common seeding frame
    #[inline]
    pub fn reference_phi(&self) -> f64 {
        self.planes[FRONT_SEED_PLANE].modules[0].phi_in_lab
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planes(zs: [f64; NUM_PLANES]) -> [PlaneGeometry; NUM_PLANES] {
        zs.map(|z| PlaneGeometry::single_module(z, 0.2))
    }

    #[test]
    fn test_valid_detector() {
        let det = Detector::new(planes([1.5, 1.8, 2.0, 2.5, 2.6]), 2.75).unwrap();
        assert_eq!(det.plane_z(3), 2.5);
        assert_eq!(det.reference_phi(), 0.2);
    }

    #[test]
    fn test_unordered_planes_rejected() {
        let err = Detector::new(planes([1.5, 1.4, 2.0, 2.5, 2.6]), 2.75).unwrap_err();
        assert!(matches!(err, TrackingError::Geometry { .. }));
    }

    #[test]
    fn test_calorimeter_must_be_downstream() {
        assert!(Detector::new(planes([1.5, 1.8, 2.0, 2.5, 2.6]), 2.6).is_err());
    }

    #[test]
    fn test_reference_plane_needs_one_module() {
        let mut p = planes([1.5, 1.8, 2.0, 2.5, 2.6]);
        p[FRONT_SEED_PLANE]
            .modules
            .push(ModuleGeometry { phi_in_lab: 0.4 });
        assert!(Detector::new(p, 2.75).is_err());
    }
}
