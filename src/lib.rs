/*!
# GEM track finder - calorimeter-assisted Kalman track finding

Pattern recognition for a five-plane GEM tracker in front of an
electromagnetic calorimeter. Each event's hits are turned into tracks by:

- doublet seeds on the three downstream planes, required to point at a
  calorimeter cluster
- triplet merging of endpoint-sharing doublets
- Kalman following upstream with a window search on every plane
- vertex finding against the beam position
- ranking and duplicate-hit removal

## Modules

- [`finder`] - the track finder and its stages
- [`kalman`] - track state, propagation, filtering and track systems
- [`detector`] - geometry, hits, clusters and the beam spot
- [`field`] - magnetic field models
- [`config`] - tunable cuts and windows
- [`output`] - accepted tracks and event diagnostics
- [`reporter`] - stage callbacks for debugging and logging
- [`simulation`] - event generator for tests and benchmarks

## Example

```rust,no_run
use gem_track_finder::simulation::{default_detector, EventGenerator, GeneratorConfig};
use gem_track_finder::{FinderConfig, TrackFinder};

let detector = default_detector();
let mut finder = TrackFinder::new(FinderConfig::default(), detector.clone()).unwrap();
let mut generator = EventGenerator::new(detector, GeneratorConfig::default(), 42).unwrap();

let event = generator.generate().unwrap();
let output = finder.process_event(&event.hits, &event.clusters, event.beam);
for track in &output.tracks {
    println!("p={:.2} GeV theta={:.3} vz={:.3}", track.momentum, track.theta, track.vertex_z);
}
```
*/

// ============================================================================
// Core modules
// ============================================================================

/// Track finding stages and the per-event driver
pub mod finder;

/// Estimator: states, prediction, filtering and track systems
pub mod kalman;

/// Detector geometry and per-event inputs
pub mod detector;

/// Magnetic field models
pub mod field;

/// Configuration types
pub mod config;

/// Error types
pub mod errors;

/// Output records
pub mod output;

/// Stage observability
pub mod reporter;

/// Event generation for tests and benchmarks
pub mod simulation;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use config::FinderConfig;
pub use detector::{BeamSpot, CaloCluster, Detector, EventHits, Hit, HitId};
pub use errors::{FilterFailure, TrackingError};
pub use field::{FieldMap, MagneticField, UniformField};
pub use finder::{SeedTag, SeedType, TrackCandidate, TrackFinder};
pub use output::{EventDiagnostics, EventOutput, TrackRecord};
pub use reporter::{CompositeReporter, DebugReporter, LoggingReporter, NoOpReporter, StageReporter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
