//! Calorimeter-assisted track finding
//!
//! One event runs through five stages:
//!
//! 1. [`seed`] - doublets on the three seed plane pairs, checked against the
//!    calorimeter clusters
//! 2. [`merge`] - triplets from endpoint-sharing doublets, one candidate per
//!    surviving seed
//! 3. [`follow`] - plane-by-plane extension upstream with window search
//! 4. [`vertex`] - back-projection to the beam line and beam-spot refinement
//! 5. [`select`] - ranking and duplicate-hit removal
//!
//! [`TrackFinder::process_event`] runs all of them; the per-stage methods are
//! exposed for callers that want to inspect intermediate state through
//! [`TrackFinder::context`].

pub mod follow;
pub mod frame;
pub mod merge;
pub mod seed;
pub mod select;
pub mod vertex;

use serde::Serialize;

pub use frame::ReferenceFrame;
pub use merge::MergeOutcome;
pub use seed::{DoubletSeed, SeedType, SeedingOutcome};
pub use vertex::VertexFit;

use crate::config::FinderConfig;
use crate::detector::{
    BeamSpot, CaloCluster, Detector, EventHits, HitId, BACK_SEED_PLANE, FRONT_SEED_PLANE,
    MID_SEED_PLANE, NUM_PLANES,
};
use crate::errors::TrackingError;
use crate::field::{MagneticField, UniformField};
use crate::kalman::{Propagator, TrackSystem};
use crate::output::{EventDiagnostics, EventOutput, TrackRecord};
use crate::reporter::{NoOpReporter, StageReporter};

/// Plane pairs in seeding order
pub const SEED_PLANE_PAIRS: [(usize, usize); SeedType::COUNT] = [
    (MID_SEED_PLANE, BACK_SEED_PLANE),
    (FRONT_SEED_PLANE, BACK_SEED_PLANE),
    (FRONT_SEED_PLANE, MID_SEED_PLANE),
];

/// How a candidate was seeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SeedTag {
    Triplet,
    Doublet(SeedType),
}

/// A track hypothesis under construction
#[derive(Debug, Clone)]
pub struct TrackCandidate {
    /// Sites, fit quality and health
    pub system: TrackSystem,
    pub seed: SeedTag,
    pub charge: f64,
    /// Seed polar angle was inside the acceptance
    pub angle_flag: bool,
    /// Set once vertexing succeeded
    pub vertex: Option<VertexFit>,
}

impl TrackCandidate {
    /// Create a candidate that has not been vertexed yet
    pub fn new(system: TrackSystem, seed: SeedTag, charge: f64, angle_flag: bool) -> Self {
        Self {
            system,
            seed,
            charge,
            angle_flag,
            vertex: None,
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.system.is_alive()
    }

    /// Handles of the measured hits, most downstream first
    pub fn hit_ids(&self) -> impl Iterator<Item = HitId> + '_ {
        self.system.measured_sites().map(|s| s.hit)
    }
}

/// Per-event scratch state, reset at the start of every event
#[derive(Debug, Default)]
pub struct EventContext {
    seeds: [Vec<DoubletSeed>; SeedType::COUNT],
    claimed: [Vec<(f64, f64)>; NUM_PLANES],
    window: Vec<HitId>,
    candidates: Vec<TrackCandidate>,
    diagnostics: EventDiagnostics,
}

impl EventContext {
    /// Clear everything, keeping allocations
    pub fn reset(&mut self) {
        self.seeds.iter_mut().for_each(Vec::clear);
        self.claimed.iter_mut().for_each(Vec::clear);
        self.window.clear();
        self.candidates.clear();
        self.diagnostics = EventDiagnostics::default();
    }

    /// Doublet pool of one type
    pub fn seeds(&self, seed_type: SeedType) -> &[DoubletSeed] {
        &self.seeds[seed_type.index()]
    }

    /// Candidate arena; ranked order once selection has run
    pub fn candidates(&self) -> &[TrackCandidate] {
        &self.candidates
    }

    /// Hit positions claimed by accepted tracks on a plane
    pub fn claimed(&self, plane: usize) -> &[(f64, f64)] {
        &self.claimed[plane]
    }

    pub fn diagnostics(&self) -> &EventDiagnostics {
        &self.diagnostics
    }
}

/// What every stage reads: configuration, geometry, frame and propagator
#[derive(Debug, Clone, Copy)]
pub(crate) struct StageEnv<'a> {
    pub config: &'a FinderConfig,
    pub detector: &'a Detector,
    pub frame: ReferenceFrame,
    pub propagator: Propagator<'a>,
}

/// Track finder for the five-plane tracker
///
/// # Example
///
/// ```
/// use gem_track_finder::finder::TrackFinder;
/// use gem_track_finder::simulation::default_detector;
/// use gem_track_finder::detector::{BeamSpot, EventHits};
/// use gem_track_finder::FinderConfig;
///
/// let detector = default_detector();
/// let mut finder = TrackFinder::new(FinderConfig::default(), detector.clone()).unwrap();
/// let hits = EventHits::new(&detector);
/// let output = finder.process_event(&hits, &[], BeamSpot::default());
/// assert!(output.tracks.is_empty());
/// ```
#[derive(Debug)]
pub struct TrackFinder {
    config: FinderConfig,
    detector: Detector,
    frame: ReferenceFrame,
    field: Box<dyn MagneticField>,
    context: EventContext,
}

impl TrackFinder {
    /// Create a finder without a magnetic field
    ///
    /// Fails if the configuration does not validate.
    pub fn new(config: FinderConfig, detector: Detector) -> Result<Self, TrackingError> {
        config.validate()?;
        let frame = ReferenceFrame::new(detector.reference_phi());
        Ok(Self {
            config,
            detector,
            frame,
            field: Box::new(UniformField::zero()),
            context: EventContext::default(),
        })
    }

    /// Propagate through `field` instead
    pub fn with_field<F: MagneticField + 'static>(mut self, field: F) -> Self {
        self.field = Box::new(field);
        self
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    pub fn frame(&self) -> ReferenceFrame {
        self.frame
    }

    /// Scratch state of the current (or last) event
    pub fn context(&self) -> &EventContext {
        &self.context
    }

    fn split(&mut self) -> (StageEnv<'_>, &mut EventContext) {
        let Self {
            config,
            detector,
            frame,
            field,
            context,
        } = self;
        let propagator = Propagator::new(&**field, &config.estimator);
        let env = StageEnv {
            config,
            detector,
            frame: *frame,
            propagator,
        };
        (env, context)
    }

    /// Reset the scratch state for a new event
    pub fn begin_event(&mut self) {
        self.context.reset();
    }

    /// Seed one plane pair into its pool
    ///
    /// # Panics
    ///
    /// If the planes are not a seed plane pair.
    pub fn generate_seeds(
        &mut self,
        hits: &EventHits,
        clusters: &[CaloCluster],
        plane_j: usize,
        plane_k: usize,
    ) -> SeedingOutcome {
        let (env, ctx) = self.split();
        let seed_type = SeedType::from_planes(plane_j, plane_k)
            .unwrap_or_else(|| panic!("planes ({}, {}) are not a seed pair", plane_j, plane_k));
        let outcome = seed::find_doublet_seeds(
            &env.config.seed,
            env.detector,
            &env.frame,
            hits,
            clusters,
            plane_j,
            plane_k,
            &mut ctx.seeds[seed_type.index()],
        );
        let slot = seed_type.index();
        match outcome {
            SeedingOutcome::Seeded(n) => ctx.diagnostics.seeds[slot] += n,
            SeedingOutcome::TooManyHits => ctx.diagnostics.seeding_skipped[slot] = true,
        }
        outcome
    }

    /// Turn the seed pools into candidates
    pub fn merge_seeds(&mut self, hits: &EventHits) -> MergeOutcome {
        let (env, ctx) = self.split();
        let outcome = merge::merge_seeds(&env, hits, &mut ctx.seeds, &mut ctx.candidates);
        match outcome {
            MergeOutcome::Merged { triplets, doublets } => {
                ctx.diagnostics.triplet_candidates = triplets;
                ctx.diagnostics.doublet_candidates = doublets;
            }
            MergeOutcome::TooManySeeds(_) => ctx.diagnostics.merge_skipped = true,
        }
        outcome
    }

    /// Follow every live candidate upstream
    pub fn follow_tracks(&mut self, hits: &EventHits) {
        let (env, ctx) = self.split();
        for candidate in ctx.candidates.iter_mut() {
            follow::follow_candidate(&env, hits, &mut ctx.window, candidate);
        }
        ctx.diagnostics.alive_after_follow = ctx.candidates.iter().filter(|c| c.is_alive()).count();
        if hits.has_truth() {
            ctx.diagnostics.track_efficiency = Some(
                ctx.candidates
                    .iter()
                    .any(|c| follow::all_signal_hits(hits, c)),
            );
        }
    }

    /// Vertex every live candidate
    pub fn find_vertices(&mut self, beam: BeamSpot) {
        let (env, ctx) = self.split();
        for candidate in ctx.candidates.iter_mut() {
            vertex::fit_vertex(&env, beam, candidate);
        }
        ctx.diagnostics.alive_after_vertex = ctx.candidates.iter().filter(|c| c.is_alive()).count();
    }

    /// Rank the candidates and accept the non-duplicates
    ///
    /// # Panics
    ///
    /// If a live candidate was never vertexed; call
    /// [`find_vertices`](Self::find_vertices) first.
    pub fn select_tracks(&mut self, hits: &EventHits) -> Vec<TrackRecord> {
        let ctx = &mut self.context;
        let (tracks, duplicates) = select::select_tracks(hits, &mut ctx.candidates, &mut ctx.claimed);
        ctx.diagnostics.duplicates_rejected = duplicates;
        tracks
    }

    /// Find the tracks of one event
    pub fn process_event(
        &mut self,
        hits: &EventHits,
        clusters: &[CaloCluster],
        beam: BeamSpot,
    ) -> EventOutput {
        self.process_event_with_reporter(hits, clusters, beam, &mut NoOpReporter)
    }

    /// Find the tracks of one event, reporting after every stage
    pub fn process_event_with_reporter<R: StageReporter>(
        &mut self,
        hits: &EventHits,
        clusters: &[CaloCluster],
        beam: BeamSpot,
        reporter: &mut R,
    ) -> EventOutput {
        self.begin_event();
        self.context.diagnostics.hits_per_plane = std::array::from_fn(|p| hits.plane_hit_count(p));

        for (plane_j, plane_k) in SEED_PLANE_PAIRS {
            let outcome = self.generate_seeds(hits, clusters, plane_j, plane_k);
            if let Some(seed_type) = SeedType::from_planes(plane_j, plane_k) {
                reporter.on_seeds(seed_type, self.context.seeds(seed_type), outcome);
            }
        }
        if hits.has_truth() {
            self.context.diagnostics.seed_efficiency =
                Some(seed::any_signal_seed(&self.context.seeds, hits));
        }

        let merged = self.merge_seeds(hits);
        reporter.on_merge(merged, &self.context.candidates);

        self.follow_tracks(hits);
        reporter.on_follow(&self.context.candidates);

        self.find_vertices(beam);
        reporter.on_vertex(&self.context.candidates);

        let tracks = self.select_tracks(hits);
        reporter.on_selection(&tracks, self.context.diagnostics.duplicates_rejected);

        log::debug!(
            "Event done: {} hits, {} seeds, {} candidates, {} tracks",
            hits.total_hits(),
            self.context.diagnostics.total_seeds(),
            self.context.candidates.len(),
            tracks.len()
        );

        EventOutput {
            tracks,
            diagnostics: self.context.diagnostics.clone(),
        }
    }
}
