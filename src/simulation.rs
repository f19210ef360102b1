//! Event generation for tests and benchmarks
//!
//! Produces straight tracks from the target through the five planes of a
//! single-sector detector, with Gaussian hit smearing, correlated two-channel
//! charges, optional noise hits and one calorimeter cluster per track. Every
//! hit carries a truth tag so the efficiency diagnostics are filled.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::detector::{
    BeamSpot, CaloCluster, Detector, EventHits, Hit, PlaneGeometry, TruthTag, NUM_PLANES,
};
use crate::errors::TrackingError;

/// Plane positions of the forward tracker (m)
pub const DEFAULT_PLANE_Z: [f64; NUM_PLANES] = [1.575, 1.855, 1.9875, 2.4925, 2.61];

/// Calorimeter front face used with [`DEFAULT_PLANE_Z`] (m)
pub const DEFAULT_CALORIMETER_Z: f64 = 2.75;

/// One-sector detector with the default plane positions
pub fn default_detector() -> Detector {
    // Strictly increasing planes, single modules, calorimeter downstream
    Detector {
        planes: DEFAULT_PLANE_Z.map(|z| PlaneGeometry::single_module(z, 0.0)),
        calorimeter_z: DEFAULT_CALORIMETER_Z,
    }
}

/// Generator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Signal tracks per event
    pub tracks_per_event: usize,
    /// Polar angle range (rad)
    pub theta_range: (f64, f64),
    /// Azimuth range (rad)
    pub phi_range: (f64, f64),
    /// Momentum range (GeV)
    pub momentum_range: (f64, f64),
    /// Target centre (m)
    pub target_center: f64,
    /// Half length of the vertex distribution around the centre (m)
    pub target_half_length: f64,
    /// Gaussian spread of the beam position (m)
    pub beam_spread: f64,
    /// Probability for a track to leave a hit on a plane
    pub plane_efficiency: f64,
    /// Radial hit smearing (m)
    pub hit_resolution_r: f64,
    /// Azimuthal hit smearing as an arc length (m)
    pub hit_resolution_rphi: f64,
    /// Cluster position smearing (m)
    pub cluster_resolution: f64,
    /// Relative cluster energy smearing
    pub energy_resolution: f64,
    /// Mean charge collected per channel
    pub charge_mean: f64,
    /// Relative spread between the two channels of a signal hit
    pub charge_sharing_sigma: f64,
    /// Uniform noise hits per plane
    pub noise_hits_per_plane: usize,
    /// Radial range of noise hits (m)
    pub noise_r_range: (f64, f64),
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            tracks_per_event: 1,
            theta_range: (0.40, 0.60),
            phi_range: (-0.2, 0.2),
            momentum_range: (2.0, 6.0),
            target_center: 0.1,
            target_half_length: 0.2,
            beam_spread: 0.0,
            plane_efficiency: 1.0,
            hit_resolution_r: 4.0e-4,
            hit_resolution_rphi: 4.5e-5,
            cluster_resolution: 0.005,
            energy_resolution: 0.05,
            charge_mean: 1000.0,
            charge_sharing_sigma: 0.1,
            noise_hits_per_plane: 0,
            noise_r_range: (0.6, 1.6),
        }
    }
}

impl GeneratorConfig {
    fn validate(&self) -> Result<(), TrackingError> {
        let ranges = [
            ("theta_range", self.theta_range),
            ("phi_range", self.phi_range),
            ("momentum_range", self.momentum_range),
            ("noise_r_range", self.noise_r_range),
        ];
        for (name, (lo, hi)) in ranges {
            if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
                return Err(TrackingError::Configuration {
                    description: format!("{} must be an ordered finite range", name),
                });
            }
        }
        if !(0.0..=1.0).contains(&self.plane_efficiency) {
            return Err(TrackingError::Configuration {
                description: "plane_efficiency must lie in [0, 1]".to_string(),
            });
        }
        if self.momentum_range.0 <= 0.0 {
            return Err(TrackingError::Configuration {
                description: "momentum_range must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Parameters of one generated track
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeneratedTrack {
    /// Truth id carried by the track's hits (starts at 1)
    pub id: i32,
    pub vertex_z: f64,
    pub theta: f64,
    pub phi: f64,
    pub momentum: f64,
}

/// A generated event ready for the finder
#[derive(Debug, Clone)]
pub struct SimulatedEvent {
    pub hits: EventHits,
    pub clusters: Vec<CaloCluster>,
    pub beam: BeamSpot,
    pub tracks: Vec<GeneratedTrack>,
}

/// Deterministic event generator
#[derive(Debug)]
pub struct EventGenerator {
    detector: Detector,
    config: GeneratorConfig,
    rng: StdRng,
    unit: Normal<f64>,
}

impl EventGenerator {
    /// Create a generator seeded with `seed`
    ///
    /// Fails if the configuration ranges are not usable.
    pub fn new(detector: Detector, config: GeneratorConfig, seed: u64) -> Result<Self, TrackingError> {
        config.validate()?;
        let unit = Normal::new(0.0, 1.0).map_err(|e| TrackingError::Configuration {
            description: e.to_string(),
        })?;
        Ok(Self {
            detector,
            config,
            rng: StdRng::seed_from_u64(seed),
            unit,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn uniform(&mut self, (lo, hi): (f64, f64)) -> f64 {
        lo + (hi - lo) * self.rng.gen::<f64>()
    }

    fn gauss(&mut self, sigma: f64) -> f64 {
        sigma * self.unit.sample(&mut self.rng)
    }

    fn signal_charges(&mut self) -> (f64, f64) {
        let u = self.config.charge_mean * (1.0 + self.gauss(0.2)).abs();
        let v = u * (1.0 + self.gauss(self.config.charge_sharing_sigma)).abs();
        (u, v)
    }

    /// Generate the next event
    pub fn generate(&mut self) -> Result<SimulatedEvent, TrackingError> {
        let cfg = self.config.clone();
        let beam = BeamSpot::new(self.gauss(cfg.beam_spread), self.gauss(cfg.beam_spread));
        let mut hits = Vec::new();
        let mut clusters = Vec::new();
        let mut tracks = Vec::with_capacity(cfg.tracks_per_event);
        let plane_z: [f64; NUM_PLANES] = std::array::from_fn(|p| self.detector.plane_z(p));
        let calorimeter_z = self.detector.calorimeter_z;

        for n in 0..cfg.tracks_per_event {
            let track = GeneratedTrack {
                id: n as i32 + 1,
                vertex_z: cfg.target_center + self.uniform((-cfg.target_half_length, cfg.target_half_length)),
                theta: self.uniform(cfg.theta_range),
                phi: self.uniform(cfg.phi_range),
                momentum: self.uniform(cfg.momentum_range),
            };
            let (sin_phi, cos_phi) = track.phi.sin_cos();
            let slope = track.theta.tan();
            let position = |z: f64| {
                let d = (z - track.vertex_z) * slope;
                (beam.x + d * cos_phi, beam.y + d * sin_phi)
            };

            for (plane, &z) in plane_z.iter().enumerate() {
                if !self.rng.gen_bool(cfg.plane_efficiency) {
                    continue;
                }
                let (x, y) = position(z);
                let r = x.hypot(y) + self.gauss(cfg.hit_resolution_r);
                let phi = y.atan2(x) + self.gauss(cfg.hit_resolution_rphi) / r;
                let (u, v) = self.signal_charges();
                hits.push(
                    Hit::from_polar(plane, 0, r, phi, z)
                        .with_charges(u, v)
                        .with_truth(TruthTag::signal(track.id)),
                );
            }

            let (x, y) = position(calorimeter_z);
            clusters.push(CaloCluster::new(
                x + self.gauss(cfg.cluster_resolution),
                y + self.gauss(cfg.cluster_resolution),
                track.momentum * (1.0 + self.gauss(cfg.energy_resolution)),
            ));
            tracks.push(track);
        }

        for (plane, &z) in plane_z.iter().enumerate() {
            for _ in 0..cfg.noise_hits_per_plane {
                let r = self.uniform(cfg.noise_r_range);
                let phi = self.uniform(cfg.phi_range);
                let u = self.uniform((0.0, 2.0 * cfg.charge_mean));
                let v = self.uniform((0.0, 2.0 * cfg.charge_mean));
                hits.push(
                    Hit::from_polar(plane, 0, r, phi, z)
                        .with_charges(u, v)
                        .with_truth(TruthTag::new(0, 0)),
                );
            }
        }

        Ok(SimulatedEvent {
            hits: EventHits::from_hits(&self.detector, hits)?,
            clusters,
            beam,
            tracks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_detector_is_valid() {
        let det = default_detector();
        assert!(Detector::new(det.planes.clone(), det.calorimeter_z).is_ok());
    }

    #[test]
    fn test_same_seed_same_event() {
        let mut a = EventGenerator::new(default_detector(), GeneratorConfig::default(), 11).unwrap();
        let mut b = EventGenerator::new(default_detector(), GeneratorConfig::default(), 11).unwrap();
        let (ea, eb) = (a.generate().unwrap(), b.generate().unwrap());
        assert_eq!(ea.tracks, eb.tracks);
        assert_eq!(ea.clusters, eb.clusters);
    }

    #[test]
    fn test_hits_per_plane() {
        let config = GeneratorConfig {
            tracks_per_event: 3,
            noise_hits_per_plane: 4,
            ..GeneratorConfig::default()
        };
        let mut generator = EventGenerator::new(default_detector(), config, 5).unwrap();
        let event = generator.generate().unwrap();
        for plane in 0..NUM_PLANES {
            assert_eq!(event.hits.plane_hit_count(plane), 7);
        }
        assert_eq!(event.clusters.len(), 3);
        assert!(event.hits.has_truth());
    }

    #[test]
    fn test_signal_hits_follow_track() {
        let config = GeneratorConfig {
            hit_resolution_r: 0.0,
            hit_resolution_rphi: 0.0,
            ..GeneratorConfig::default()
        };
        let mut generator = EventGenerator::new(default_detector(), config, 3).unwrap();
        let event = generator.generate().unwrap();
        let track = event.tracks[0];
        for (_, hit) in event.hits.plane_hits(4) {
            let expected = (hit.z - track.vertex_z) * track.theta.tan();
            assert!((hit.r - expected).abs() < 1e-12);
            assert_eq!(hit.signal_track(), Some(1));
        }
    }

    #[test]
    fn test_invalid_range_rejected() {
        let config = GeneratorConfig {
            theta_range: (0.6, 0.4),
            ..GeneratorConfig::default()
        };
        assert!(EventGenerator::new(default_detector(), config, 1).is_err());
    }
}
