//! Final ranking and duplicate-hit removal

use std::cmp::Ordering;

use super::TrackCandidate;
use crate::detector::{EventHits, NUM_PLANES};
use crate::output::TrackRecord;

/// Ranking order: live candidates first, then lower chi-square per degree
/// of freedom, then more hits
pub fn rank(a: &TrackCandidate, b: &TrackCandidate) -> Ordering {
    b.system
        .is_alive()
        .cmp(&a.system.is_alive())
        .then_with(|| a.system.chi2_per_ndf().total_cmp(&b.system.chi2_per_ndf()))
        .then_with(|| b.system.num_hits().cmp(&a.system.num_hits()))
}

/// Whether a candidate uses a hit position already claimed on the same plane
fn shares_claimed_hit(
    candidate: &TrackCandidate,
    hits: &EventHits,
    claimed: &[Vec<(f64, f64)>; NUM_PLANES],
) -> bool {
    candidate.system.measured_sites().any(|site| {
        let hit = hits.get(site.hit);
        claimed[site.plane()]
            .iter()
            .any(|&(x, y)| x == hit.x && y == hit.y)
    })
}

/// Rank the candidates in place and accept those not sharing a hit with a
/// better-ranked accepted candidate
///
/// Returns the accepted records, best first, and the number of live
/// candidates rejected as duplicates.
///
/// # Panics
///
/// Panics if a live candidate has no vertex fit, i.e. vertexing was not run
/// before selection.
pub(crate) fn select_tracks(
    hits: &EventHits,
    candidates: &mut [TrackCandidate],
    claimed: &mut [Vec<(f64, f64)>; NUM_PLANES],
) -> (Vec<TrackRecord>, usize) {
    candidates.sort_by(rank);

    let mut accepted = Vec::new();
    let mut duplicates = 0;
    for candidate in candidates.iter().filter(|c| c.system.is_alive()) {
        let Some(fit) = candidate.vertex.as_ref() else {
            panic!(
                "live {:?} candidate reached selection without a vertex fit",
                candidate.seed
            );
        };
        if shares_claimed_hit(candidate, hits, claimed) {
            duplicates += 1;
            continue;
        }
        for site in candidate.system.measured_sites() {
            let hit = hits.get(site.hit);
            claimed[site.plane()].push((hit.x, hit.y));
        }
        accepted.push(TrackRecord::from_candidate(candidate, fit, hits));
    }
    log::debug!(
        "Selected {} tracks, {} duplicates rejected",
        accepted.len(),
        duplicates
    );
    (accepted, duplicates)
}
