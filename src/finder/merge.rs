//! Seed merging and candidate initialisation
//!
//! Three doublets that close a triangle over the seed planes (front-mid,
//! mid-back and front-back sharing their endpoints) become one triplet
//! candidate. Doublets that were not absorbed start candidates of their own.

use nalgebra::{Matrix5, Vector3, Vector5};

use super::frame::straight_line_predict;
use super::seed::{DoubletSeed, SeedType};
use super::{SeedTag, StageEnv, TrackCandidate};
use crate::config::FinderConfig;
use crate::detector::{EventHits, Hit, HitId};
use crate::kalman::{Measurement, Site, TrackState, TrackSystem};

/// Result of the merge stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Candidates were created
    Merged {
        /// Candidates started from triplets
        triplets: usize,
        /// Candidates started from leftover doublets
        doublets: usize,
    },
    /// The seed count exceeded the cap and no candidates were created
    TooManySeeds(usize),
}

/// Initial estimator state of a seed, anchored at its back hit
///
/// Slopes come from the seed direction, q/p from the assumed charge and the
/// cluster momentum. The position covariance is the hit resolution rotated
/// to the hit azimuth and inflated so the anchor does not over-constrain.
pub fn seed_state(config: &FinderConfig, seed: &DoubletSeed, back: &Hit) -> TrackState {
    let dir = Vector3::new(seed.phi.cos(), seed.phi.sin(), 1.0 / seed.theta.tan()).normalize();
    let params = Vector5::new(
        back.x,
        back.y,
        dir.x / dir.z,
        dir.y / dir.z,
        seed.charge / seed.momentum,
    );

    let (sin, cos) = back.phi.sin_cos();
    let dr = config.estimator.hit_resolution_r;
    let drphi = config.estimator.hit_resolution_rphi;
    let dx = (cos * dr).hypot(sin * drphi);
    let dy = (sin * dr).hypot(cos * drphi);

    let merge = &config.merge;
    let cov = Matrix5::from_diagonal(&Vector5::new(
        merge.position_variance_inflation * dx * dx,
        merge.position_variance_inflation * dy * dy,
        merge.slope_variance,
        merge.slope_variance,
        merge.qp_variance,
    ));
    TrackState::new(back.z, params, cov)
}

/// Candidate anchored on a seed, with no measured hits yet
fn candidate_from_seed(
    env: &StageEnv<'_>,
    hits: &EventHits,
    seed: &DoubletSeed,
    tag: SeedTag,
) -> TrackCandidate {
    let state = seed_state(env.config, seed, hits.get(seed.back));
    let system = TrackSystem::new(
        Site::seed(seed.back, state),
        env.config.estimator.max_missing_planes,
    );
    TrackCandidate::new(system, tag, seed.charge, seed.angle_valid)
}

/// Add one initial hit; a refused update kills the candidate
fn add_initial_hit(env: &StageEnv<'_>, hits: &EventHits, candidate: &mut TrackCandidate, id: HitId) {
    if !candidate.system.is_alive() {
        return;
    }
    let hit = hits.get(id);
    let measurement = Measurement::from_hit(
        hit,
        env.config.estimator.hit_resolution_r,
        env.config.estimator.hit_resolution_rphi,
    );
    if let Err(failure) = candidate.system.add_and_filter(
        &env.propagator,
        id,
        hit.z,
        &measurement,
        env.config.max_delta_chi2(),
    ) {
        log::trace!("{:?} candidate rejected at plane {}: {}", candidate.seed, id.plane(), failure);
        candidate.system.kill();
    }
}

/// Whether the line through the front and mid hits reaches the back hit
fn triplet_consistent(env: &StageEnv<'_>, hits: &EventHits, fm: &DoubletSeed, mb: &DoubletSeed) -> bool {
    let (a, b, c) = (hits.get(fm.front), hits.get(fm.back), hits.get(mb.back));
    let (xa, ya) = env.frame.rotate(a.x, a.y);
    let (xb, yb) = env.frame.rotate(b.x, b.y);
    let (xc, yc) = env.frame.rotate(c.x, c.y);

    let px = straight_line_predict(xa, a.z, xb, b.z, c.z);
    let py = straight_line_predict(ya, a.z, yb, b.z, c.z);
    (px - xc).abs() <= env.config.merge.triplet_tolerance_x
        && (py - yc).abs() <= env.config.merge.triplet_tolerance_y
}

/// Merge the doublet pools into track candidates
///
/// Triplet candidates are filtered with the back, mid and front hits in
/// that order; leftover doublets register one missing plane and are
/// filtered back hit first.
pub(crate) fn merge_seeds(
    env: &StageEnv<'_>,
    hits: &EventHits,
    pools: &mut [Vec<DoubletSeed>; SeedType::COUNT],
    candidates: &mut Vec<TrackCandidate>,
) -> MergeOutcome {
    let total: usize = pools.iter().map(Vec::len).sum();
    if total > env.config.merge.max_seeds {
        log::debug!(
            "Seed merging skipped: {} seeds exceed cap {}",
            total,
            env.config.merge.max_seeds
        );
        return MergeOutcome::TooManySeeds(total);
    }
    candidates.reserve(total);

    let fm_pool = SeedType::FrontMid.index();
    let mb_pool = SeedType::MidBack.index();
    let fb_pool = SeedType::FrontBack.index();

    let mut triplets = 0;
    for i in 0..pools[mb_pool].len() {
        for j in 0..pools[fm_pool].len() {
            let (mb, fm) = (pools[mb_pool][i], pools[fm_pool][j]);
            if mb.front != fm.back {
                continue;
            }
            for k in 0..pools[fb_pool].len() {
                let fb = pools[fb_pool][k];
                if fb.front != fm.front || fb.back != mb.back {
                    continue;
                }
                if !triplet_consistent(env, hits, &fm, &mb) {
                    continue;
                }

                pools[mb_pool][i].deactivate();
                pools[fm_pool][j].deactivate();
                pools[fb_pool][k].deactivate();

                let mut candidate = candidate_from_seed(env, hits, &fb, SeedTag::Triplet);
                for id in [mb.back, mb.front, fb.front] {
                    add_initial_hit(env, hits, &mut candidate, id);
                }
                candidates.push(candidate);
                triplets += 1;
            }
        }
    }

    let mut doublets = 0;
    for seed_type in SeedType::ALL {
        for seed in pools[seed_type.index()].iter().filter(|s| s.active) {
            let mut candidate = candidate_from_seed(env, hits, seed, SeedTag::Doublet(seed_type));
            // Without a triplet partner one seed plane went unmatched
            candidate.system.add_missing_hit();
            add_initial_hit(env, hits, &mut candidate, seed.back);
            add_initial_hit(env, hits, &mut candidate, seed.front);
            candidates.push(candidate);
            doublets += 1;
        }
    }

    log::debug!("Merged seeds: {} triplets, {} doublets", triplets, doublets);
    MergeOutcome::Merged { triplets, doublets }
}
