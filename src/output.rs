//! Per-event results handed to the caller

use serde::Serialize;

use crate::detector::{EventHits, HitId, NUM_PLANES};
use crate::finder::{SeedTag, SeedType, TrackCandidate, VertexFit};

/// One hit of an accepted track
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackHit {
    pub id: HitId,
    pub plane: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// An accepted track
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackRecord {
    /// Candidate status at acceptance (always alive)
    pub status: bool,
    /// The coarse fit converged
    pub coarse_fit: bool,
    /// The seed angle was inside the acceptance window
    pub angle_flag: bool,
    /// How the candidate was seeded
    pub seed: SeedTag,
    pub charge: f64,
    /// Degrees of freedom of the coarse fit
    pub ndf: i32,
    /// Chi-square of the coarse fit
    pub chi2: f64,
    /// Momentum at the vertex (GeV)
    pub momentum: f64,
    /// Longitudinal vertex position (m)
    pub vertex_z: f64,
    /// Polar angle at the vertex (rad)
    pub theta: f64,
    /// Azimuth at the vertex (rad)
    pub phi: f64,
    /// Hits from the most downstream plane to the most upstream one
    pub hits: Vec<TrackHit>,
    /// Generated track all hits belong to, for simulated events
    pub truth_track: Option<i32>,
}

impl TrackRecord {
    /// Copy an accepted candidate together with its vertex fit
    pub fn from_candidate(candidate: &TrackCandidate, fit: &VertexFit, hits: &EventHits) -> Self {
        let track_hits: Vec<TrackHit> = candidate
            .system
            .measured_sites()
            .map(|site| {
                let hit = hits.get(site.hit);
                TrackHit {
                    id: site.hit,
                    plane: site.plane(),
                    x: hit.x,
                    y: hit.y,
                    z: hit.z,
                }
            })
            .collect();

        let mut truth = track_hits.iter().map(|h| hits.get(h.id).signal_track());
        let truth_track = match truth.next().flatten() {
            Some(first) if truth.all(|t| t == Some(first)) => Some(first),
            _ => None,
        };

        Self {
            status: candidate.system.is_alive(),
            coarse_fit: true,
            angle_flag: candidate.angle_flag,
            seed: candidate.seed,
            charge: candidate.charge,
            ndf: candidate.system.ndf(),
            chi2: candidate.system.chi2(),
            momentum: fit.momentum,
            vertex_z: fit.vertex_z,
            theta: fit.theta,
            phi: fit.phi,
            hits: track_hits,
            truth_track,
        }
    }

    /// Number of hits
    pub fn num_hits(&self) -> usize {
        self.hits.len()
    }

    /// Chi-square per degree of freedom (ndf floored at one)
    pub fn chi2_per_ndf(&self) -> f64 {
        self.chi2 / self.ndf.max(1) as f64
    }
}

/// Counters describing how an event went through the stages
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventDiagnostics {
    /// Doublet seeds per type, in `SeedType::ALL` order
    pub seeds: [usize; SeedType::COUNT],
    /// Plane pairs skipped for exceeding the hit cap, in `SeedType::ALL` order
    pub seeding_skipped: [bool; SeedType::COUNT],
    /// Merging skipped for exceeding the seed cap
    pub merge_skipped: bool,
    /// Candidates started from triplets
    pub triplet_candidates: usize,
    /// Candidates started from leftover doublets
    pub doublet_candidates: usize,
    /// Candidates alive after following
    pub alive_after_follow: usize,
    /// Candidates alive after vertexing
    pub alive_after_vertex: usize,
    /// Candidates rejected for sharing a hit with a better one
    pub duplicates_rejected: usize,
    /// Hits per plane in the event
    pub hits_per_plane: [usize; NUM_PLANES],
    /// Some seed was built from two signal hits (simulated events only)
    pub seed_efficiency: Option<bool>,
    /// Some candidate surviving the follow cuts is pure signal (simulated events only)
    pub track_efficiency: Option<bool>,
}

impl EventDiagnostics {
    /// Total doublet seeds
    pub fn total_seeds(&self) -> usize {
        self.seeds.iter().sum()
    }

    /// Total candidates created by merging
    pub fn total_candidates(&self) -> usize {
        self.triplet_candidates + self.doublet_candidates
    }
}

/// Result of processing one event
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventOutput {
    /// Accepted tracks, best first
    pub tracks: Vec<TrackRecord>,
    pub diagnostics: EventDiagnostics,
}

impl EventOutput {
    /// Serialize to a JSON string
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
