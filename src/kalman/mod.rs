//! Track estimator: states, prediction through the field, filtering and
//! the site/track-system bookkeeping the finder drives.

mod filter;
mod propagate;
mod state;
mod system;

pub use filter::{filter, FilterResult};
pub use propagate::{Propagator, LORENTZ_FACTOR};
pub use state::{Measurement, TrackState};
pub use system::{Site, SiteKind, TrackSystem};

/// Number of track parameters
pub const STATE_DIM: usize = 5;

/// Number of measured coordinates per hit
pub const MEASUREMENT_DIM: usize = 2;

pub const IDX_X: usize = 0;
pub const IDX_Y: usize = 1;
pub const IDX_TX: usize = 2;
pub const IDX_TY: usize = 3;
pub const IDX_QP: usize = 4;
