//! Doublet seed generation
//!
//! A doublet pairs one hit from each of two seed planes. The pair is kept
//! when the downstream hit sits in a calorimeter cluster's coarse window,
//! its local polar angle is in the acceptance, and the straight line
//! through both hits lands on that cluster.

use serde::Serialize;

use super::frame::{delta_phi, straight_line_predict, ReferenceFrame};
use crate::config::SeedConfig;
use crate::detector::{
    CaloCluster, Detector, EventHits, Hit, HitId, BACK_SEED_PLANE, FRONT_SEED_PLANE,
    MID_SEED_PLANE, NUM_PLANES,
};

/// Which two of the three seed planes a doublet spans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SeedType {
    /// Front and mid seed planes
    FrontMid,
    /// Mid and back seed planes
    MidBack,
    /// Front and back seed planes, the mid plane skipped
    FrontBack,
}

impl SeedType {
    /// Number of seed types
    pub const COUNT: usize = 3;

    /// All seed types in pool order
    pub const ALL: [SeedType; SeedType::COUNT] =
        [SeedType::FrontMid, SeedType::MidBack, SeedType::FrontBack];

    /// Index into per-type arrays
    #[inline]
    pub fn index(self) -> usize {
        match self {
            SeedType::FrontMid => 0,
            SeedType::MidBack => 1,
            SeedType::FrontBack => 2,
        }
    }

    /// (front plane, back plane) of the type
    pub fn planes(self) -> (usize, usize) {
        match self {
            SeedType::FrontMid => (FRONT_SEED_PLANE, MID_SEED_PLANE),
            SeedType::MidBack => (MID_SEED_PLANE, BACK_SEED_PLANE),
            SeedType::FrontBack => (FRONT_SEED_PLANE, BACK_SEED_PLANE),
        }
    }

    /// Type spanned by a plane pair, if it is one of the seed pairs
    pub fn from_planes(front: usize, back: usize) -> Option<Self> {
        SeedType::ALL.into_iter().find(|t| t.planes() == (front, back))
    }
}

/// Two hits on two seed planes with the initial direction and momentum
/// derived from them and their calorimeter cluster
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DoubletSeed {
    pub seed_type: SeedType,
    /// Hit on the upstream plane of the pair
    pub front: HitId,
    /// Hit on the downstream plane of the pair
    pub back: HitId,
    /// Local polar angle (rad)
    pub theta: f64,
    /// Local azimuth of the pair's transverse displacement (rad)
    pub phi: f64,
    /// Momentum estimate from the cluster energy (GeV)
    pub momentum: f64,
    /// Assumed charge sign
    pub charge: f64,
    /// Index of the matched calorimeter cluster
    pub cluster: usize,
    /// Cleared once the seed is absorbed into a triplet
    pub active: bool,
    /// Polar angle inside the acceptance window
    pub angle_valid: bool,
}

impl DoubletSeed {
    /// Mark as absorbed into a triplet
    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

/// Result of seeding one plane pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedingOutcome {
    /// The pair was searched; this many seeds were added
    Seeded(usize),
    /// A plane exceeded the hit cap and the pair was skipped
    TooManyHits,
}

/// First cluster inside the coarse window of a hit on the mid or back plane
pub fn calo_match(config: &SeedConfig, hit: &Hit, clusters: &[CaloCluster]) -> Option<usize> {
    let window = match hit.plane {
        MID_SEED_PLANE => &config.mid_plane_window,
        BACK_SEED_PLANE => &config.back_plane_window,
        _ => return None,
    };
    clusters
        .iter()
        .position(|c| window.contains(delta_phi(c.phi(), hit.phi), c.r() - hit.r))
}

/// Build doublet seeds from the hits of planes `plane_j < plane_k`
///
/// Seeds are appended to `pool`. Whether the two hits matched the same
/// cluster is not checked: when both hits are on calorimeter-matched planes
/// the front hit's match is the one used.
///
/// # Panics
///
/// If the planes are not one of the three seed plane pairs.
#[allow(clippy::too_many_arguments)]
pub fn find_doublet_seeds(
    config: &SeedConfig,
    detector: &Detector,
    frame: &ReferenceFrame,
    hits: &EventHits,
    clusters: &[CaloCluster],
    plane_j: usize,
    plane_k: usize,
    pool: &mut Vec<DoubletSeed>,
) -> SeedingOutcome {
    assert!(
        plane_j >= FRONT_SEED_PLANE && plane_j < plane_k && plane_k < NUM_PLANES,
        "invalid seed plane pair ({}, {})",
        plane_j,
        plane_k
    );
    let seed_type = SeedType::from_planes(plane_j, plane_k)
        .unwrap_or_else(|| panic!("planes ({}, {}) are not a seed pair", plane_j, plane_k));

    let (count_j, count_k) = (hits.plane_hit_count(plane_j), hits.plane_hit_count(plane_k));
    if count_j > config.max_hits_per_plane || count_k > config.max_hits_per_plane {
        log::debug!(
            "{:?} seeding skipped: {} / {} hits exceed cap {}",
            seed_type,
            count_j,
            count_k,
            config.max_hits_per_plane
        );
        return SeedingOutcome::TooManyHits;
    }

    let calo_z = detector.calorimeter_z;
    let before = pool.len();

    for (id_k, hit_k) in hits.plane_hits(plane_k) {
        let Some(cluster_k) = calo_match(config, hit_k, clusters) else {
            continue;
        };

        for (id_j, hit_j) in hits.plane_hits(plane_j) {
            let cluster = if plane_j >= MID_SEED_PLANE {
                match calo_match(config, hit_j, clusters) {
                    Some(c) => c,
                    None => continue,
                }
            } else {
                cluster_k
            };
            let calo = &clusters[cluster];

            let theta = ((hit_k.r - hit_j.r) / (hit_k.z - hit_j.z)).atan();
            let phi = (hit_k.y - hit_j.y).atan2(hit_k.x - hit_j.x);
            let angle_valid = theta >= config.theta_min && theta <= config.theta_max;
            if !angle_valid {
                continue;
            }

            let (xk, yk) = frame.rotate(hit_k.x, hit_k.y);
            let (xj, yj) = frame.rotate(hit_j.x, hit_j.y);
            let (xc, yc) = frame.rotate(calo.x, calo.y);
            let px = straight_line_predict(xk, hit_k.z, xj, hit_j.z, calo_z);
            let py = straight_line_predict(yk, hit_k.z, yj, hit_j.z, calo_z);
            if (px - xc).hypot(py - yc) > config.calo_residual_max {
                continue;
            }

            pool.push(DoubletSeed {
                seed_type,
                front: id_j,
                back: id_k,
                theta,
                phi,
                momentum: calo.energy,
                charge: config.assumed_charge,
                cluster,
                active: true,
                angle_valid,
            });
        }
    }

    let added = pool.len() - before;
    log::trace!("{:?}: {} doublet seeds", seed_type, added);
    SeedingOutcome::Seeded(added)
}

/// Whether any seed in the pools was built from two signal hits
pub fn any_signal_seed(pools: &[Vec<DoubletSeed>], hits: &EventHits) -> bool {
    pools.iter().flatten().any(|s| {
        hits.get(s.front).signal_track().is_some() && hits.get(s.back).signal_track().is_some()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{PlaneGeometry, TruthTag};

    fn detector() -> Detector {
        let planes = [0.4, 0.7, 1.0, 1.3, 1.6].map(|z| PlaneGeometry::single_module(z, 0.0));
        Detector::new(planes, 2.2).unwrap()
    }

    fn relaxed() -> SeedConfig {
        SeedConfig {
            theta_min: 0.0,
            ..SeedConfig::default()
        }
    }

    #[test]
    fn test_seed_type_planes() {
        assert_eq!(SeedType::from_planes(2, 3), Some(SeedType::FrontMid));
        assert_eq!(SeedType::from_planes(3, 4), Some(SeedType::MidBack));
        assert_eq!(SeedType::from_planes(2, 4), Some(SeedType::FrontBack));
        assert_eq!(SeedType::from_planes(1, 2), None);
        for (i, t) in SeedType::ALL.iter().enumerate() {
            assert_eq!(t.index(), i);
        }
    }

    #[test]
    fn test_calo_match_windows() {
        let config = SeedConfig::default();
        let clusters = [CaloCluster::new(1.0, 0.0, 2.0)];
        // Back plane: dr must be in (-0.01, 0.11)
        let back = Hit::from_polar(4, 0, 0.95, 0.0, 1.6);
        assert_eq!(calo_match(&config, &back, &clusters), Some(0));
        // Mid plane: dr must exceed 0.02
        let mid = Hit::from_polar(3, 0, 0.99, 0.0, 1.3);
        assert_eq!(calo_match(&config, &mid, &clusters), None);
        // Front plane never matches
        let front = Hit::from_polar(2, 0, 0.95, 0.0, 1.0);
        assert_eq!(calo_match(&config, &front, &clusters), None);
    }

    #[test]
    fn test_first_matching_cluster_wins() {
        let config = SeedConfig::default();
        let clusters = [
            CaloCluster::new(2.0, 0.0, 1.0),
            CaloCluster::new(1.0, 0.0, 2.0),
            CaloCluster::new(1.01, 0.0, 3.0),
        ];
        let back = Hit::from_polar(4, 0, 0.95, 0.0, 1.6);
        assert_eq!(calo_match(&config, &back, &clusters), Some(1));
    }

    #[test]
    fn test_front_back_seed_from_straight_line() {
        let det = detector();
        let hits = EventHits::from_hits(
            &det,
            vec![
                Hit::from_cartesian(2, 0, 0.10, 0.0, 1.0),
                Hit::from_cartesian(4, 0, 0.11, 0.0, 1.6),
            ],
        )
        .unwrap();
        let clusters = [CaloCluster::new(0.12, 0.0, 2.0)];
        let frame = ReferenceFrame::new(det.reference_phi());
        let mut pool = Vec::new();
        let outcome =
            find_doublet_seeds(&relaxed(), &det, &frame, &hits, &clusters, 2, 4, &mut pool);
        assert_eq!(outcome, SeedingOutcome::Seeded(1));
        let seed = &pool[0];
        assert_eq!(seed.seed_type, SeedType::FrontBack);
        assert_eq!(seed.front.plane(), 2);
        assert_eq!(seed.back.plane(), 4);
        assert_eq!(seed.momentum, 2.0);
        assert_eq!(seed.charge, -1.0);
        assert!(seed.active);
        assert!((seed.theta - (0.01_f64 / 0.6).atan()).abs() < 1e-12);
    }

    #[test]
    fn test_angle_window_rejects_shallow_pair() {
        let det = detector();
        let hits = EventHits::from_hits(
            &det,
            vec![
                Hit::from_cartesian(2, 0, 0.10, 0.0, 1.0),
                Hit::from_cartesian(4, 0, 0.11, 0.0, 1.6),
            ],
        )
        .unwrap();
        let clusters = [CaloCluster::new(0.12, 0.0, 2.0)];
        let frame = ReferenceFrame::new(0.0);
        let mut pool = Vec::new();
        let outcome = find_doublet_seeds(
            &SeedConfig::default(),
            &det,
            &frame,
            &hits,
            &clusters,
            2,
            4,
            &mut pool,
        );
        assert_eq!(outcome, SeedingOutcome::Seeded(0));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_hit_cap_skips_pair() {
        let det = detector();
        let config = SeedConfig {
            max_hits_per_plane: 2,
            ..relaxed()
        };
        let mut all = vec![Hit::from_cartesian(4, 0, 0.11, 0.0, 1.6)];
        all.extend((0..3).map(|i| Hit::from_cartesian(2, 0, 0.10 + 1e-3 * i as f64, 0.0, 1.0)));
        let hits = EventHits::from_hits(&det, all).unwrap();
        let clusters = [CaloCluster::new(0.12, 0.0, 2.0)];
        let mut pool = Vec::new();
        let outcome = find_doublet_seeds(
            &config,
            &det,
            &ReferenceFrame::new(0.0),
            &hits,
            &clusters,
            2,
            4,
            &mut pool,
        );
        assert_eq!(outcome, SeedingOutcome::TooManyHits);
        assert!(pool.is_empty());
    }

    #[test]
    #[should_panic]
    fn test_invalid_plane_pair_panics() {
        let det = detector();
        let hits = EventHits::new(&det);
        let mut pool = Vec::new();
        find_doublet_seeds(
            &SeedConfig::default(),
            &det,
            &ReferenceFrame::new(0.0),
            &hits,
            &[],
            1,
            2,
            &mut pool,
        );
    }

    #[test]
    fn test_signal_seed_detection() {
        let det = detector();
        let hits = EventHits::from_hits(
            &det,
            vec![
                Hit::from_cartesian(2, 0, 0.10, 0.0, 1.0).with_truth(TruthTag::signal(1)),
                Hit::from_cartesian(4, 0, 0.11, 0.0, 1.6).with_truth(TruthTag::new(1, 0)),
            ],
        )
        .unwrap();
        let seed = DoubletSeed {
            seed_type: SeedType::FrontBack,
            front: HitId::new(2, 0, 0),
            back: HitId::new(4, 0, 0),
            theta: 0.5,
            phi: 0.0,
            momentum: 1.0,
            charge: -1.0,
            cluster: 0,
            active: true,
            angle_valid: true,
        };
        let pools = vec![vec![seed]];
        assert!(!any_signal_seed(&pools, &hits));
    }
}
