//! Observability for track finding.
//!
//! This module provides the [`StageReporter`] trait for debugging and
//! monitoring. Reporters receive a callback after each stage of
//! [`TrackFinder::process_event_with_reporter`](crate::finder::TrackFinder::process_event_with_reporter)
//! without polluting the stage code.
//!
//! # Zero-Cost Abstraction
//!
//! The default [`NoOpReporter`] compiles to zero overhead - all callback
//! methods are empty and will be optimized away by the compiler.
//!
//! # Example
//!
//! ```no_run
//! use gem_track_finder::finder::TrackFinder;
//! use gem_track_finder::reporter::DebugReporter;
//! use gem_track_finder::simulation::{default_detector, EventGenerator, GeneratorConfig};
//! use gem_track_finder::FinderConfig;
//!
//! let detector = default_detector();
//! let mut finder = TrackFinder::new(FinderConfig::default(), detector.clone()).unwrap();
//! let mut generator = EventGenerator::new(detector, GeneratorConfig::default(), 7).unwrap();
//! let event = generator.generate().unwrap();
//!
//! let mut reporter = DebugReporter::new();
//! finder.process_event_with_reporter(&event.hits, &event.clusters, event.beam, &mut reporter);
//! println!("{} merge events captured", reporter.merge_events().len());
//! ```

use crate::finder::{DoubletSeed, MergeOutcome, SeedType, SeedingOutcome, TrackCandidate};
use crate::output::TrackRecord;

// ============================================================================
// StageReporter Trait
// ============================================================================

/// Observability trait for the finder stages.
///
/// All methods have default empty implementations, so you only need to
/// override the events you care about.
///
/// Callbacks receive references to avoid cloning overhead. If you need
/// to store the data, clone it within your callback implementation.
///
/// # Example
///
/// ```
/// use gem_track_finder::reporter::StageReporter;
/// use gem_track_finder::finder::TrackCandidate;
///
/// struct AliveCounter {
///     after_follow: usize,
/// }
///
/// impl StageReporter for AliveCounter {
///     fn on_follow(&mut self, candidates: &[TrackCandidate]) {
///         self.after_follow += candidates.iter().filter(|c| c.is_alive()).count();
///     }
/// }
/// ```
pub trait StageReporter {
    /// Called after one plane pair has been seeded.
    ///
    /// `seeds` is the whole pool of that seed type.
    fn on_seeds(&mut self, _seed_type: SeedType, _seeds: &[DoubletSeed], _outcome: SeedingOutcome) {}

    /// Called after seeds have been merged into candidates.
    fn on_merge(&mut self, _outcome: MergeOutcome, _candidates: &[TrackCandidate]) {}

    /// Called after every candidate has been followed and cut.
    fn on_follow(&mut self, _candidates: &[TrackCandidate]) {}

    /// Called after vertex finding.
    fn on_vertex(&mut self, _candidates: &[TrackCandidate]) {}

    /// Called with the accepted tracks and the number of duplicates dropped.
    fn on_selection(&mut self, _tracks: &[TrackRecord], _duplicates: usize) {}
}

// ============================================================================
// NoOpReporter
// ============================================================================

/// Zero-cost reporter that does nothing.
///
/// This is the reporter used by [`TrackFinder::process_event`](crate::finder::TrackFinder::process_event).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReporter;

impl NoOpReporter {
    /// Create a new no-op reporter.
    pub fn new() -> Self {
        Self
    }
}

impl StageReporter for NoOpReporter {
    // All methods use default empty implementations
}

// ============================================================================
// DebugReporter
// ============================================================================

/// Reporter that captures all events for debugging.
///
/// Candidate lists are cloned at every stage, so later analysis can compare
/// a candidate before and after following. Candidate order is the merge
/// order until selection ranks them.
///
/// # Memory Usage
///
/// This reporter stores clones of every candidate at three stages per
/// event. Clear it between events for long runs.
#[derive(Debug, Clone, Default)]
pub struct DebugReporter {
    /// (type, pool size, outcome) per seeded plane pair
    seeds: Vec<(SeedType, usize, SeedingOutcome)>,

    /// Merge outcomes with the candidates just created
    merges: Vec<(MergeOutcome, Vec<TrackCandidate>)>,

    /// Candidates after following
    follows: Vec<Vec<TrackCandidate>>,

    /// Candidates after vertexing
    vertices: Vec<Vec<TrackCandidate>>,

    /// Accepted tracks with duplicate counts
    selections: Vec<(Vec<TrackRecord>, usize)>,
}

impl DebugReporter {
    /// Create a new debug reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all captured events.
    pub fn clear(&mut self) {
        self.seeds.clear();
        self.merges.clear();
        self.follows.clear();
        self.vertices.clear();
        self.selections.clear();
    }

    /// Get captured seeding events.
    pub fn seed_events(&self) -> &[(SeedType, usize, SeedingOutcome)] {
        &self.seeds
    }

    /// Get captured merge events.
    pub fn merge_events(&self) -> &[(MergeOutcome, Vec<TrackCandidate>)] {
        &self.merges
    }

    /// Get captured follow events.
    pub fn follow_events(&self) -> &[Vec<TrackCandidate>] {
        &self.follows
    }

    /// Get captured vertex events.
    pub fn vertex_events(&self) -> &[Vec<TrackCandidate>] {
        &self.vertices
    }

    /// Get captured selection events.
    pub fn selection_events(&self) -> &[(Vec<TrackRecord>, usize)] {
        &self.selections
    }

    /// Total number of captured events across all types.
    pub fn total_events(&self) -> usize {
        self.seeds.len()
            + self.merges.len()
            + self.follows.len()
            + self.vertices.len()
            + self.selections.len()
    }
}

impl StageReporter for DebugReporter {
    fn on_seeds(&mut self, seed_type: SeedType, seeds: &[DoubletSeed], outcome: SeedingOutcome) {
        self.seeds.push((seed_type, seeds.len(), outcome));
    }

    fn on_merge(&mut self, outcome: MergeOutcome, candidates: &[TrackCandidate]) {
        self.merges.push((outcome, candidates.to_vec()));
    }

    fn on_follow(&mut self, candidates: &[TrackCandidate]) {
        self.follows.push(candidates.to_vec());
    }

    fn on_vertex(&mut self, candidates: &[TrackCandidate]) {
        self.vertices.push(candidates.to_vec());
    }

    fn on_selection(&mut self, tracks: &[TrackRecord], duplicates: usize) {
        self.selections.push((tracks.to_vec(), duplicates));
    }
}

// ============================================================================
// LoggingReporter
// ============================================================================

/// Reporter that logs stage summaries using the log crate.
///
/// # Log Levels
///
/// - `on_selection`: INFO
/// - `on_merge`, `on_follow`, `on_vertex`: DEBUG
/// - `on_seeds`: TRACE
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingReporter {
    /// Whether to log every accepted track
    verbose: bool,
}

impl LoggingReporter {
    /// Create a new logging reporter.
    pub fn new() -> Self {
        Self { verbose: false }
    }

    /// Create a verbose logging reporter that includes track details.
    pub fn verbose() -> Self {
        Self { verbose: true }
    }
}

fn alive(candidates: &[TrackCandidate]) -> usize {
    candidates.iter().filter(|c| c.is_alive()).count()
}

impl StageReporter for LoggingReporter {
    fn on_seeds(&mut self, seed_type: SeedType, seeds: &[DoubletSeed], outcome: SeedingOutcome) {
        log::trace!("Seeding {:?}: {:?}, pool size {}", seed_type, outcome, seeds.len());
    }

    fn on_merge(&mut self, outcome: MergeOutcome, candidates: &[TrackCandidate]) {
        log::debug!(
            "Merge: {:?}, {} candidates, {} alive",
            outcome,
            candidates.len(),
            alive(candidates)
        );
    }

    fn on_follow(&mut self, candidates: &[TrackCandidate]) {
        log::debug!("Follow complete: {} of {} candidates alive", alive(candidates), candidates.len());
    }

    fn on_vertex(&mut self, candidates: &[TrackCandidate]) {
        log::debug!("Vertexing complete: {} of {} candidates alive", alive(candidates), candidates.len());
    }

    fn on_selection(&mut self, tracks: &[TrackRecord], duplicates: usize) {
        log::info!("Selected {} tracks ({} duplicates)", tracks.len(), duplicates);
        if self.verbose {
            for (i, t) in tracks.iter().enumerate() {
                log::debug!(
                    "  Track {}: p={:.3}, theta={:.4}, phi={:.4}, vz={:.4}, chi2/ndf={:.2}, hits={}",
                    i,
                    t.momentum,
                    t.theta,
                    t.phi,
                    t.vertex_z,
                    t.chi2_per_ndf(),
                    t.num_hits()
                );
            }
        }
    }
}

// ============================================================================
// CompositeReporter
// ============================================================================

/// Reporter that forwards events to two child reporters.
#[derive(Debug, Clone)]
pub struct CompositeReporter<A: StageReporter, B: StageReporter> {
    first: A,
    second: B,
}

impl<A: StageReporter, B: StageReporter> CompositeReporter<A, B> {
    /// Create a new composite reporter.
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    /// Get a reference to the first reporter.
    pub fn first(&self) -> &A {
        &self.first
    }

    /// Get a reference to the second reporter.
    pub fn second(&self) -> &B {
        &self.second
    }

    /// Consume and return both reporters.
    pub fn into_parts(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: StageReporter, B: StageReporter> StageReporter for CompositeReporter<A, B> {
    fn on_seeds(&mut self, seed_type: SeedType, seeds: &[DoubletSeed], outcome: SeedingOutcome) {
        self.first.on_seeds(seed_type, seeds, outcome);
        self.second.on_seeds(seed_type, seeds, outcome);
    }

    fn on_merge(&mut self, outcome: MergeOutcome, candidates: &[TrackCandidate]) {
        self.first.on_merge(outcome, candidates);
        self.second.on_merge(outcome, candidates);
    }

    fn on_follow(&mut self, candidates: &[TrackCandidate]) {
        self.first.on_follow(candidates);
        self.second.on_follow(candidates);
    }

    fn on_vertex(&mut self, candidates: &[TrackCandidate]) {
        self.first.on_vertex(candidates);
        self.second.on_vertex(candidates);
    }

    fn on_selection(&mut self, tracks: &[TrackRecord], duplicates: usize) {
        self.first.on_selection(tracks, duplicates);
        self.second.on_selection(tracks, duplicates);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_reporter_captures() {
        let mut reporter = DebugReporter::new();
        reporter.on_seeds(SeedType::MidBack, &[], SeedingOutcome::Seeded(0));
        reporter.on_merge(MergeOutcome::TooManySeeds(20_000), &[]);
        reporter.on_follow(&[]);
        reporter.on_vertex(&[]);
        reporter.on_selection(&[], 0);

        assert_eq!(reporter.total_events(), 5);
        assert_eq!(reporter.seed_events()[0].0, SeedType::MidBack);
        assert_eq!(reporter.merge_events()[0].0, MergeOutcome::TooManySeeds(20_000));

        reporter.clear();
        assert_eq!(reporter.total_events(), 0);
    }

    #[test]
    fn test_composite_forwards_to_both() {
        let mut composite = CompositeReporter::new(DebugReporter::new(), LoggingReporter::verbose());
        composite.on_follow(&[]);
        composite.on_selection(&[], 2);
        assert_eq!(composite.first().follow_events().len(), 1);
        assert_eq!(composite.first().selection_events()[0].1, 2);
    }

    #[test]
    fn test_noop_reporter() {
        let mut reporter = NoOpReporter::new();
        reporter.on_follow(&[]);
        reporter.on_vertex(&[]);
    }
}
