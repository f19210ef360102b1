//! Configuration types for the track finder
//!
//! Every tolerance, window and combinatorial cap used by the finder lives
//! here. Defaults are the empirically tuned values for the five-plane
//! forward tracker; they are configuration, not law, but should only be
//! changed together with a study of efficiency and fake rate.
//!
//! Configuration is fixed at construction of a
//! [`TrackFinder`](crate::finder::TrackFinder) and never reloaded mid-run.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::TrackingError;

// ============================================================================
// Stage configurations
// ============================================================================

/// Angular and radial proximity window between a hit and a calorimeter
/// cluster. Both deltas are `cluster - hit`; bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaloMatchWindow {
    /// Lower bound on the wrapped azimuthal difference (rad)
    pub dphi_min: f64,
    /// Upper bound on the wrapped azimuthal difference (rad)
    pub dphi_max: f64,
    /// Lower bound on the radial difference (m)
    pub dr_min: f64,
    /// Upper bound on the radial difference (m)
    pub dr_max: f64,
}

impl CaloMatchWindow {
    /// Create a new window
    pub fn new(dphi_min: f64, dphi_max: f64, dr_min: f64, dr_max: f64) -> Self {
        Self {
            dphi_min,
            dphi_max,
            dr_min,
            dr_max,
        }
    }

    /// Whether a (dphi, dr) pair falls strictly inside the window
    #[inline]
    pub fn contains(&self, dphi: f64, dr: f64) -> bool {
        dphi > self.dphi_min && dphi < self.dphi_max && dr > self.dr_min && dr < self.dr_max
    }
}

/// Doublet seed construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Hit count per plane above which a plane pair is skipped for the event
    pub max_hits_per_plane: usize,
    /// Lower edge of the polar angle acceptance (rad)
    pub theta_min: f64,
    /// Upper edge of the polar angle acceptance (rad)
    pub theta_max: f64,
    /// Maximum distance between the extrapolated pair and the cluster (m)
    pub calo_residual_max: f64,
    /// Cluster match window for hits on the mid seed plane
    pub mid_plane_window: CaloMatchWindow,
    /// Cluster match window for hits on the back seed plane
    pub back_plane_window: CaloMatchWindow,
    /// Charge sign assumed for every seed
    pub assumed_charge: f64,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            max_hits_per_plane: 1500,
            theta_min: 0.3,
            theta_max: 0.7,
            calo_residual_max: 0.05,
            mid_plane_window: CaloMatchWindow::new(-0.025, 0.035, 0.02, 0.18),
            back_plane_window: CaloMatchWindow::new(-0.03, 0.03, -0.01, 0.11),
            assumed_charge: -1.0,
        }
    }
}

/// Triplet merging and seed state initialisation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Total doublet count above which merging is skipped for the event
    pub max_seeds: usize,
    /// Allowed |dx| between the extrapolated and the measured back hit (m)
    pub triplet_tolerance_x: f64,
    /// Allowed |dy| between the extrapolated and the measured back hit (m)
    pub triplet_tolerance_y: f64,
    /// Factor applied to the seed position variances
    pub position_variance_inflation: f64,
    /// Initial variance of each slope
    pub slope_variance: f64,
    /// Initial variance of q/p
    pub qp_variance: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            max_seeds: 10_000,
            triplet_tolerance_x: 0.01,
            triplet_tolerance_y: 0.006,
            position_variance_inflation: 10.0,
            slope_variance: 0.001,
            qp_variance: 0.0025,
        }
    }
}

/// Plane-by-plane following
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowConfig {
    /// Hits inside one search window above which the window is abandoned
    pub max_window_hits: usize,
    /// Half-width of the radial pre-selection around the predicted radius (m)
    pub radial_window: f64,
    /// Search radius used while the covariance is not yet trusted (m)
    pub fixed_window_radius: f64,
    /// Window half-width in units of the predicted position sigma
    pub sigma_window_scale: f64,
    /// Accepted hits needed before the covariance-scaled window is used
    pub min_hits_for_sigma_window: usize,
    /// Charge asymmetry below which a site counts as two-channel consistent
    pub charge_asymmetry_max: f64,
    /// Consistent sites needed to keep a candidate
    pub min_symmetric_sites: usize,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            max_window_hits: 100,
            radial_window: 0.03,
            fixed_window_radius: 0.05,
            sigma_window_scale: 10.0,
            min_hits_for_sigma_window: 2,
            charge_asymmetry_max: 0.6,
            min_symmetric_sites: 3,
        }
    }
}

/// Vertex finding against the beam spot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VertexConfig {
    /// Longitudinal centre of the target (m)
    pub target_center: f64,
    /// Largest accepted |z_vertex - target_center| (m)
    pub max_vertex_offset: f64,
    /// Resolution assigned to the beam position measurement (m)
    pub beam_resolution: f64,
    /// Chi-square gate of the beam update; large enough to never cut
    pub beam_gate: f64,
}

impl Default for VertexConfig {
    fn default() -> Self {
        Self {
            target_center: 0.1,
            max_vertex_offset: 0.25,
            beam_resolution: 3.0e-4,
            beam_gate: 1.0e9,
        }
    }
}

/// Estimator tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Radial hit resolution (m)
    pub hit_resolution_r: f64,
    /// Azimuthal hit resolution, as an arc length (m)
    pub hit_resolution_rphi: f64,
    /// Missing planes tolerated before a candidate is declared dead
    pub max_missing_planes: usize,
    /// Longest single Runge-Kutta step (m)
    pub max_step: f64,
    /// Slope variance added per metre of transport
    pub scattering_variance_per_meter: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            hit_resolution_r: 4.0e-4,
            hit_resolution_rphi: 4.5e-5,
            max_missing_planes: 2,
            max_step: 0.1,
            scattering_variance_per_meter: 2.0e-7,
        }
    }
}

// ============================================================================
// FinderConfig
// ============================================================================

/// Complete configuration of the track finder
///
/// # Example
/// ```
/// use gem_track_finder::config::FinderConfig;
///
/// let config = FinderConfig::builder()
///     .chi2_per_ndf_cut(20.0)
///     .theta_window(0.25, 0.75)
///     .build();
/// assert!(config.validate().is_ok());
/// assert_eq!(config.max_delta_chi2(), 40.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinderConfig {
    /// Chi-square per degree of freedom above which a candidate is rejected.
    /// Also sets the per-update gate (two measured coordinates per hit).
    pub chi2_per_ndf_cut: f64,
    /// Doublet seed construction
    pub seed: SeedConfig,
    /// Triplet merging and candidate initialisation
    pub merge: MergeConfig,
    /// Plane-by-plane following
    pub follow: FollowConfig,
    /// Vertex finding
    pub vertex: VertexConfig,
    /// Estimator tuning
    pub estimator: EstimatorConfig,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            chi2_per_ndf_cut: 30.0,
            seed: SeedConfig::default(),
            merge: MergeConfig::default(),
            follow: FollowConfig::default(),
            vertex: VertexConfig::default(),
            estimator: EstimatorConfig::default(),
        }
    }
}

impl FinderConfig {
    /// Create with builder pattern.
    pub fn builder() -> FinderConfigBuilder {
        FinderConfigBuilder::default()
    }

    /// Gate applied to every hit update
    #[inline]
    pub fn max_delta_chi2(&self) -> f64 {
        crate::kalman::MEASUREMENT_DIM as f64 * self.chi2_per_ndf_cut
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, TrackingError> {
        let config: FinderConfig =
            serde_json::from_str(json).map_err(|e| TrackingError::Configuration {
                description: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, TrackingError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| TrackingError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&content)
    }

    /// Serialise to pretty-printed JSON.
    pub fn to_json_string(&self) -> String {
        // A struct of plain numbers cannot fail to serialise.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Check that all values are usable.
    pub fn validate(&self) -> Result<(), TrackingError> {
        fn positive(name: &str, value: f64) -> Result<(), TrackingError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(TrackingError::Configuration {
                    description: format!("{} must be positive and finite, got {}", name, value),
                })
            }
        }

        positive("chi2_per_ndf_cut", self.chi2_per_ndf_cut)?;
        positive("seed.calo_residual_max", self.seed.calo_residual_max)?;
        positive("merge.triplet_tolerance_x", self.merge.triplet_tolerance_x)?;
        positive("merge.triplet_tolerance_y", self.merge.triplet_tolerance_y)?;
        positive(
            "merge.position_variance_inflation",
            self.merge.position_variance_inflation,
        )?;
        positive("merge.slope_variance", self.merge.slope_variance)?;
        positive("merge.qp_variance", self.merge.qp_variance)?;
        positive("follow.radial_window", self.follow.radial_window)?;
        positive("follow.fixed_window_radius", self.follow.fixed_window_radius)?;
        positive("follow.sigma_window_scale", self.follow.sigma_window_scale)?;
        positive("vertex.max_vertex_offset", self.vertex.max_vertex_offset)?;
        positive("vertex.beam_resolution", self.vertex.beam_resolution)?;
        positive("vertex.beam_gate", self.vertex.beam_gate)?;
        positive("estimator.hit_resolution_r", self.estimator.hit_resolution_r)?;
        positive(
            "estimator.hit_resolution_rphi",
            self.estimator.hit_resolution_rphi,
        )?;
        positive("estimator.max_step", self.estimator.max_step)?;

        if !(self.seed.theta_min < self.seed.theta_max) {
            return Err(TrackingError::Configuration {
                description: format!(
                    "seed.theta_min ({}) must be below seed.theta_max ({})",
                    self.seed.theta_min, self.seed.theta_max
                ),
            });
        }
        if self.seed.assumed_charge == 0.0 || !self.seed.assumed_charge.is_finite() {
            return Err(TrackingError::Configuration {
                description: "seed.assumed_charge must be a non-zero charge".to_string(),
            });
        }
        if !(self.estimator.scattering_variance_per_meter >= 0.0) {
            return Err(TrackingError::Configuration {
                description: "estimator.scattering_variance_per_meter must be >= 0".to_string(),
            });
        }
        if self.follow.max_window_hits == 0 {
            return Err(TrackingError::Configuration {
                description: "follow.max_window_hits must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for [`FinderConfig`] covering the commonly tuned values.
#[derive(Debug, Default)]
pub struct FinderConfigBuilder {
    config: FinderConfig,
}

impl FinderConfigBuilder {
    /// Set the chi-square per degree of freedom cut.
    pub fn chi2_per_ndf_cut(mut self, cut: f64) -> Self {
        self.config.chi2_per_ndf_cut = cut;
        self
    }

    /// Set the seed polar angle acceptance.
    pub fn theta_window(mut self, min: f64, max: f64) -> Self {
        self.config.seed.theta_min = min;
        self.config.seed.theta_max = max;
        self
    }

    /// Set the per-plane hit cap for seeding.
    pub fn max_hits_per_plane(mut self, cap: usize) -> Self {
        self.config.seed.max_hits_per_plane = cap;
        self
    }

    /// Set the total doublet cap for merging.
    pub fn max_seeds(mut self, cap: usize) -> Self {
        self.config.merge.max_seeds = cap;
        self
    }

    /// Set the per-window hit cap for following.
    pub fn max_window_hits(mut self, cap: usize) -> Self {
        self.config.follow.max_window_hits = cap;
        self
    }

    /// Set the target centre and the accepted vertex offset.
    pub fn target(mut self, center: f64, max_vertex_offset: f64) -> Self {
        self.config.vertex.target_center = center;
        self.config.vertex.max_vertex_offset = max_vertex_offset;
        self
    }

    /// Set the tolerated number of missing planes.
    pub fn max_missing_planes(mut self, planes: usize) -> Self {
        self.config.estimator.max_missing_planes = planes;
        self
    }

    /// Set the scattering noise of the estimator.
    pub fn scattering_variance_per_meter(mut self, variance: f64) -> Self {
        self.config.estimator.scattering_variance_per_meter = variance;
        self
    }

    /// Finish building.
    pub fn build(self) -> FinderConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = FinderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.seed.max_hits_per_plane, 1500);
        assert_eq!(config.merge.max_seeds, 10_000);
        assert!((config.max_delta_chi2() - 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_calo_window_is_exclusive() {
        let window = CaloMatchWindow::new(-0.03, 0.03, -0.01, 0.11);
        assert!(window.contains(0.0, 0.05));
        assert!(!window.contains(0.03, 0.05));
        assert!(!window.contains(0.0, 0.11));
    }

    #[test]
    fn test_json_partial_override() {
        let config =
            FinderConfig::from_json_str(r#"{ "chi2_per_ndf_cut": 12.5, "seed": { "theta_min": 0.2 } }"#)
                .unwrap();
        assert_eq!(config.chi2_per_ndf_cut, 12.5);
        assert_eq!(config.seed.theta_min, 0.2);
        // Untouched values keep their defaults
        assert_eq!(config.seed.theta_max, 0.7);
        assert_eq!(config.follow.max_window_hits, 100);
    }

    #[test]
    fn test_json_round_trip() {
        let config = FinderConfig::builder().max_seeds(42).build();
        let parsed = FinderConfig::from_json_str(&config.to_json_string()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_theta_window_rejected() {
        let config = FinderConfig::builder().theta_window(0.7, 0.3).build();
        assert!(matches!(
            config.validate(),
            Err(TrackingError::Configuration { .. })
        ));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(FinderConfig::from_json_str("{ not json").is_err());
    }
}
