//! Plane-by-plane track following
//!
//! Each live candidate is predicted upstream one plane at a time. The hits
//! in a window around the prediction are collected, the closest one is
//! filtered, and a plane without an accepted hit counts as missing.

use super::seed::SeedType;
use super::{SeedTag, StageEnv, TrackCandidate};
use crate::config::FollowConfig;
use crate::detector::{EventHits, HitId};
use crate::kalman::{filter, Measurement, Site, TrackState};

/// Result of a window search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSearch {
    /// This many hits were collected into the buffer
    Found(usize),
    /// More hits than the cap fell into the window
    Overflow,
}

/// Collect the unused hits of `plane` around a predicted state into `window`
///
/// Hits are pre-selected by radius, relying on each module being sorted by
/// radius. With `sigma_window` the window is a box of
/// `sigma_window_scale` predicted sigmas, otherwise a fixed-radius disc.
pub fn collect_window_hits(
    config: &FollowConfig,
    hits: &EventHits,
    plane: usize,
    predicted: &TrackState,
    sigma_window: bool,
    window: &mut Vec<HitId>,
) -> WindowSearch {
    window.clear();
    let (x, y) = (predicted.x(), predicted.y());
    let r = predicted.r();
    let half_x = config.sigma_window_scale * predicted.var_x().sqrt();
    let half_y = config.sigma_window_scale * predicted.var_y().sqrt();

    for module in 0..hits.num_modules(plane) {
        for (index, hit) in hits.module_hits(plane, module).iter().enumerate() {
            if hit.used || hit.r < r - config.radial_window {
                continue;
            }
            if hit.r > r + config.radial_window {
                break;
            }
            let inside = if sigma_window {
                (hit.x - x).abs() < half_x && (hit.y - y).abs() < half_y
            } else {
                (hit.x - x).hypot(hit.y - y) < config.fixed_window_radius
            };
            if inside {
                window.push(HitId::new(plane, module, index));
                if window.len() > config.max_window_hits {
                    return WindowSearch::Overflow;
                }
            }
        }
    }
    WindowSearch::Found(window.len())
}

/// Hit in the window closest to (x, y); the first one wins a tie
pub fn closest_hit(hits: &EventHits, window: &[HitId], x: f64, y: f64) -> Option<HitId> {
    window
        .iter()
        .map(|&id| {
            let hit = hits.get(id);
            (id, (hit.x - x).hypot(hit.y - y))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

/// Number of measured sites whose two charge channels agree
pub fn symmetric_sites(config: &FollowConfig, hits: &EventHits, candidate: &TrackCandidate) -> usize {
    candidate
        .system
        .measured_sites()
        .filter(|s| hits.get(s.hit).charge_asymmetry() < config.charge_asymmetry_max)
        .count()
}

/// Follow one candidate upstream and apply the post-follow cuts
pub(crate) fn follow_candidate(
    env: &StageEnv<'_>,
    hits: &EventHits,
    window: &mut Vec<HitId>,
    candidate: &mut TrackCandidate,
) {
    if !candidate.system.check_status() {
        return;
    }
    let follow = &env.config.follow;
    let estimator = &env.config.estimator;
    let gate = env.config.max_delta_chi2();

    let mut plane = candidate.system.current_site().plane();
    // This seed type already passed the front seed plane without a hit
    if candidate.seed == SeedTag::Doublet(SeedType::MidBack) {
        plane = plane.saturating_sub(1);
    }

    while plane > 0 {
        plane -= 1;
        if !candidate.system.check_status() {
            break;
        }

        let predicted = match env
            .propagator
            .predict(candidate.system.current_state(), env.detector.plane_z(plane))
        {
            Ok(state) => state,
            Err(e) => {
                log::debug!("{:?} candidate lost at plane {}: {}", candidate.seed, plane, e);
                candidate.system.kill();
                break;
            }
        };

        let sigma_window = candidate.system.num_hits() >= follow.min_hits_for_sigma_window;
        let chosen = match collect_window_hits(follow, hits, plane, &predicted, sigma_window, window) {
            WindowSearch::Overflow => {
                log::trace!("Window overflow on plane {}", plane);
                None
            }
            WindowSearch::Found(_) => closest_hit(hits, window, predicted.x(), predicted.y()),
        };

        let Some(id) = chosen else {
            candidate.system.add_missing_hit();
            continue;
        };

        let measurement =
            Measurement::from_hit(hits.get(id), estimator.hit_resolution_r, estimator.hit_resolution_rphi);
        match filter(&predicted, &measurement, gate) {
            Ok(result) => candidate
                .system
                .add_site(Site::measured(id, predicted, result.state, result.delta_chi2)),
            Err(failure) => {
                log::trace!("Plane {} hit refused: {}", plane, failure);
                candidate.system.add_missing_hit();
            }
        }
    }

    if !candidate.system.check_status() {
        return;
    }
    if candidate.system.chi2_per_ndf() > env.config.chi2_per_ndf_cut {
        candidate.system.kill();
        return;
    }
    if symmetric_sites(follow, hits, candidate) < follow.min_symmetric_sites {
        candidate.system.kill();
    }
}

/// Whether a live candidate consists of signal hits only
pub fn all_signal_hits(hits: &EventHits, candidate: &TrackCandidate) -> bool {
    candidate.system.is_alive()
        && candidate
            .system
            .measured_sites()
            .all(|s| hits.get(s.hit).signal_track().is_some())
}
