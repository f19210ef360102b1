//! Error types for track finding and its estimator
//!
//! Data conditions (too many hits, a failed gate, an implausible vertex) are
//! never errors: the affected candidate or sub-step is dropped and the event
//! continues. The types here cover wiring problems and numerical failures.

use std::fmt;

/// Errors raised while setting up or feeding the track finder
#[derive(Debug, Clone)]
pub enum TrackingError {
    /// Invalid configuration value
    Configuration {
        /// Description of the configuration issue
        description: String,
    },

    /// Detector geometry does not satisfy the finder's requirements
    Geometry {
        /// Description of the geometry issue
        description: String,
    },

    /// A hit refers to a plane or module the geometry does not have
    HitOutOfRange {
        /// Plane index carried by the hit
        plane: usize,
        /// Module index carried by the hit
        module: usize,
    },

    /// Field map table could not be parsed
    FieldMap {
        /// Line number (1-based) where parsing failed, if known
        line: Option<usize>,
        /// Description of the problem
        description: String,
    },

    /// Reading a configuration or field map file failed
    Io {
        /// Path that was being read
        path: String,
        /// Underlying error message
        message: String,
    },

    /// Numerical instability detected during propagation
    NumericalInstability {
        /// Description of the issue
        description: String,
    },
}

impl fmt::Display for TrackingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingError::Configuration { description } => {
                write!(f, "Configuration error: {}", description)
            }
            TrackingError::Geometry { description } => {
                write!(f, "Geometry error: {}", description)
            }
            TrackingError::HitOutOfRange { plane, module } => {
                write!(
                    f,
                    "Hit references plane {} module {} which the geometry does not define",
                    plane, module
                )
            }
            TrackingError::FieldMap { line, description } => match line {
                Some(line) => write!(f, "Field map error at line {}: {}", line, description),
                None => write!(f, "Field map error: {}", description),
            },
            TrackingError::Io { path, message } => {
                write!(f, "Failed to read {}: {}", path, message)
            }
            TrackingError::NumericalInstability { description } => {
                write!(f, "Numerical instability: {}", description)
            }
        }
    }
}

impl std::error::Error for TrackingError {}

/// Reasons a measurement update can be refused
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterFailure {
    /// The chi-square increment exceeded the gate
    GateExceeded {
        /// Chi-square increment of the attempted update
        delta_chi2: f64,
        /// Gate that was applied
        max_delta_chi2: f64,
    },

    /// The residual covariance could not be inverted
    SingularInnovation,

    /// Propagation to the measurement plane produced a non-finite state
    PropagationFailed,
}

impl fmt::Display for FilterFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterFailure::GateExceeded {
                delta_chi2,
                max_delta_chi2,
            } => write!(
                f,
                "Chi-square increment {:.3} exceeds gate {:.3}",
                delta_chi2, max_delta_chi2
            ),
            FilterFailure::SingularInnovation => write!(f, "Singular residual covariance"),
            FilterFailure::PropagationFailed => write!(f, "Propagation produced a non-finite state"),
        }
    }
}

impl std::error::Error for FilterFailure {}

impl From<FilterFailure> for TrackingError {
    fn from(e: FilterFailure) -> Self {
        TrackingError::NumericalInstability {
            description: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_error_display() {
        let err = TrackingError::HitOutOfRange { plane: 7, module: 2 };
        assert!(err.to_string().contains("plane 7"));
        assert!(err.to_string().contains("module 2"));

        let err = TrackingError::FieldMap {
            line: Some(12),
            description: "expected 4 columns".to_string(),
        };
        assert!(err.to_string().contains("line 12"));
    }

    #[test]
    fn test_filter_failure_display() {
        let err = FilterFailure::GateExceeded {
            delta_chi2: 75.0,
            max_delta_chi2: 60.0,
        };
        assert!(err.to_string().contains("75.000"));
        assert!(err.to_string().contains("60.000"));
    }

    #[test]
    fn test_error_conversion() {
        let err: TrackingError = FilterFailure::SingularInnovation.into();
        assert!(matches!(err, TrackingError::NumericalInstability { .. }));
    }
}
