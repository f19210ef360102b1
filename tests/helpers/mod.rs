//! Shared fixtures for the integration tests
//!
//! Each test file pulls this in with `mod helpers;`, so not every helper is
//! used by every file.

#![allow(dead_code)]

use gem_track_finder::detector::{Detector, EventHits, Hit, PlaneGeometry, TruthTag, NUM_PLANES};
use gem_track_finder::simulation::{default_detector, EventGenerator, GeneratorConfig, SimulatedEvent};
use gem_track_finder::{CaloCluster, DebugReporter, EventOutput, FinderConfig, TrackFinder};

//=============================================================================
// Finders and generators
//=============================================================================

/// Finder with default cuts on the default detector
pub fn finder() -> TrackFinder {
    finder_with(FinderConfig::default())
}

/// Finder with custom cuts on the default detector
pub fn finder_with(config: FinderConfig) -> TrackFinder {
    TrackFinder::new(config, default_detector()).expect("valid finder configuration")
}

/// Seeded generator on the default detector
pub fn generator(config: GeneratorConfig, seed: u64) -> EventGenerator {
    EventGenerator::new(default_detector(), config, seed).expect("valid generator configuration")
}

/// Several tracks on top of uniform noise
pub fn busy_config() -> GeneratorConfig {
    GeneratorConfig {
        tracks_per_event: 3,
        noise_hits_per_plane: 6,
        ..GeneratorConfig::default()
    }
}

/// Run one event while capturing every stage
pub fn run_debug(finder: &mut TrackFinder, event: &SimulatedEvent) -> (EventOutput, DebugReporter) {
    let mut reporter = DebugReporter::new();
    let output =
        finder.process_event_with_reporter(&event.hits, &event.clusters, event.beam, &mut reporter);
    (output, reporter)
}

//=============================================================================
// Hand-built events
//=============================================================================

/// Short detector used by the three-hit seeding scenario
pub fn compact_detector() -> Detector {
    let planes = [0.4, 0.7, 1.0, 1.3, 1.6].map(|z| PlaneGeometry::single_module(z, 0.0));
    Detector::new(planes, 2.2).expect("valid compact detector")
}

/// Three collinear hits on the seed planes of the compact detector and a
/// cluster on their extrapolation
pub fn three_hit_event(detector: &Detector) -> (EventHits, Vec<CaloCluster>) {
    let hits = EventHits::from_hits(
        detector,
        [
            Hit::from_cartesian(2, 0, 0.10, 0.0, 1.0),
            Hit::from_cartesian(3, 0, 0.105, 0.0, 1.3),
            Hit::from_cartesian(4, 0, 0.11, 0.0, 1.6),
        ],
    )
    .expect("hits on existing planes");
    (hits, vec![CaloCluster::new(0.12, 0.0, 2.0)])
}

/// Copy of an event's hits with extra noise hits appended on one plane
pub fn with_extra_hits(detector: &Detector, hits: &EventHits, plane: usize, count: usize) -> EventHits {
    let z = detector.plane_z(plane);
    let existing = (0..NUM_PLANES).flat_map(|p| hits.plane_hits(p).map(|(_, h)| h.clone()));
    let extra = (0..count).map(|n| {
        Hit::from_polar(plane, 0, 0.7 + 0.01 * n as f64, 0.15, z)
            .with_charges(500.0, 500.0)
            .with_truth(TruthTag::new(0, 0))
    });
    EventHits::from_hits(detector, existing.chain(extra).collect::<Vec<_>>()).expect("hits on existing planes")
}

