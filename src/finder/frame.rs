//! Reference-frame helpers shared by the seeding and merging stages

use std::f64::consts::PI;

/// Rotation taking lab (x, y) into the sector frame of the reference plane
///
/// The frame is fixed per run by the azimuth of the single module on the
/// front seed plane; points are rotated by minus that azimuth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceFrame {
    phi: f64,
    sin: f64,
    cos: f64,
}

impl ReferenceFrame {
    /// Frame for a reference module at lab azimuth `phi`
    pub fn new(phi: f64) -> Self {
        let (sin, cos) = (-phi).sin_cos();
        Self { phi, sin, cos }
    }

    /// Lab azimuth of the reference module
    #[inline]
    pub fn phi(&self) -> f64 {
        self.phi
    }

    /// Rotate a lab point into the frame
    #[inline]
    pub fn rotate(&self, x: f64, y: f64) -> (f64, f64) {
        (self.cos * x - self.sin * y, self.sin * x + self.cos * y)
    }
}

/// Value at `z` of the straight line through `(z1, x1)` and `(z2, x2)`
#[inline]
pub fn straight_line_predict(x1: f64, z1: f64, x2: f64, z2: f64, z: f64) -> f64 {
    (x1 - x2) / (z1 - z2) * (z - z1) + x1
}

/// `phi1 - phi2` wrapped into [-pi, pi)
#[inline]
pub fn delta_phi(phi1: f64, phi2: f64) -> f64 {
    (phi1 - phi2 + PI).rem_euclid(2.0 * PI) - PI
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_rotation_into_reference_sector() {
        let frame = ReferenceFrame::new(FRAC_PI_2);
        let (x, y) = frame.rotate(0.0, 1.0);
        assert!((x - 1.0).abs() < 1e-12);
        assert!(y.abs() < 1e-12);
        assert_eq!(frame.phi(), FRAC_PI_2);
    }

    #[test]
    fn test_identity_frame() {
        let frame = ReferenceFrame::new(0.0);
        assert_eq!(frame.rotate(0.3, -0.2), (0.3, -0.2));
    }

    #[test]
    fn test_straight_line() {
        assert!((straight_line_predict(0.11, 1.6, 0.10, 1.0, 2.2) - 0.12).abs() < 1e-12);
        // Extrapolating upstream works the same way
        assert!((straight_line_predict(2.0, 2.0, 1.0, 1.0, 0.0)).abs() < 1e-12);
    }

    #[test]
    fn test_delta_phi_wraps() {
        assert!((delta_phi(3.1, -3.1) - (6.2 - 2.0 * PI)).abs() < 1e-12);
        assert!((delta_phi(-3.1, 3.1) - (2.0 * PI - 6.2)).abs() < 1e-12);
        assert!((delta_phi(0.2, 0.1) - 0.1).abs() < 1e-12);
    }
}
