//! Tracker hits and calorimeter clusters

use serde::Serialize;

/// Handle to a hit inside [`EventHits`](super::EventHits)
///
/// Valid for the event the hits belong to. Two handles are equal exactly
/// when they refer to the same stored hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HitId {
    /// Plane index (0 = most upstream)
    pub plane: u8,
    /// Module index within the plane
    pub module: u16,
    /// Position in the module's radius-sorted hit list
    pub index: u32,
}

impl HitId {
    /// Create a new handle
    ///
    /// Indices must fit the packed field widths (`u8`, `u16`, `u32`).
    pub fn new(plane: usize, module: usize, index: usize) -> Self {
        debug_assert!(plane <= u8::MAX as usize, "plane index {} out of range", plane);
        debug_assert!(module <= u16::MAX as usize, "module index {} out of range", module);
        debug_assert!(index <= u32::MAX as usize, "hit index {} out of range", index);
        Self {
            plane: plane as u8,
            module: module as u16,
            index: index as u32,
        }
    }

    /// Plane index as usize
    #[inline]
    pub fn plane(&self) -> usize {
        self.plane as usize
    }
}

/// Simulation truth attached to a hit
///
/// Each of the two readout channels remembers which generated track
/// deposited its charge (0 or negative for noise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TruthTag {
    /// Generated track id seen by the u channel
    pub u_track: i32,
    /// Generated track id seen by the v channel
    pub v_track: i32,
}

impl TruthTag {
    /// Create a tag from both channel ids
    pub fn new(u_track: i32, v_track: i32) -> Self {
        Self { u_track, v_track }
    }

    /// Tag for a hit where both channels saw the same track
    pub fn signal(track: i32) -> Self {
        Self::new(track, track)
    }

    /// Generated track id when both channels agree on a real track
    #[inline]
    pub fn signal_track(&self) -> Option<i32> {
        (self.u_track > 0 && self.u_track == self.v_track).then_some(self.u_track)
    }
}

/// A reconstructed 2D position on one tracker plane
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// Plane index (0 = most upstream)
    pub plane: usize,
    /// Module index within the plane
    pub module: usize,
    /// Radius from the beam line (m)
    pub r: f64,
    /// Azimuth in the lab frame (rad)
    pub phi: f64,
    /// Cartesian x (m)
    pub x: f64,
    /// Cartesian y (m)
    pub y: f64,
    /// Longitudinal position (m)
    pub z: f64,
    /// Charge collected on the u readout channel
    pub charge_u: f64,
    /// Charge collected on the v readout channel
    pub charge_v: f64,
    /// Claimed by an accepted track in an earlier pass
    pub used: bool,
    /// Generator truth, only present for simulated events
    pub truth: Option<TruthTag>,
}

impl Hit {
    /// Build a hit from its polar position
    pub fn from_polar(plane: usize, module: usize, r: f64, phi: f64, z: f64) -> Self {
        Self {
            plane,
            module,
            r,
            phi,
            x: r * phi.cos(),
            y: r * phi.sin(),
            z,
            charge_u: 0.0,
            charge_v: 0.0,
            used: false,
            truth: None,
        }
    }

    /// Build a hit from its Cartesian position
    pub fn from_cartesian(plane: usize, module: usize, x: f64, y: f64, z: f64) -> Self {
        let mut hit = Self::from_polar(plane, module, x.hypot(y), y.atan2(x), z);
        // Keep the caller's Cartesian values exactly
        hit.x = x;
        hit.y = y;
        hit
    }

    /// Attach the two channel charges
    pub fn with_charges(mut self, charge_u: f64, charge_v: f64) -> Self {
        self.charge_u = charge_u;
        self.charge_v = charge_v;
        self
    }

    /// Attach simulation truth
    pub fn with_truth(mut self, truth: TruthTag) -> Self {
        self.truth = Some(truth);
        self
    }

    /// |u - v| / (u + v); NaN when no charge was collected
    #[inline]
    pub fn charge_asymmetry(&self) -> f64 {
        ((self.charge_u - self.charge_v) / (self.charge_u + self.charge_v)).abs()
    }

    /// Generated track id if this is a signal hit
    #[inline]
    pub fn signal_track(&self) -> Option<i32> {
        self.truth.and_then(|t| t.signal_track())
    }
}

/// A calorimeter cluster
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CaloCluster {
    /// Cartesian x at the calorimeter face (m)
    pub x: f64,
    /// Cartesian y at the calorimeter face (m)
    pub y: f64,
    /// Deposited energy estimate (GeV)
    pub energy: f64,
}

impl CaloCluster {
    /// Create a new cluster
    pub fn new(x: f64, y: f64, energy: f64) -> Self {
        Self { x, y, energy }
    }

    /// Radius from the beam line
    #[inline]
    pub fn r(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Azimuth in the lab frame
    #[inline]
    pub fn phi(&self) -> f64 {
        self.y.atan2(self.x)
    }
}

/// Transverse beam position for one event, from the beam position monitors
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BeamSpot {
    /// Beam x (m)
    pub x: f64,
    /// Beam y (m)
    pub y: f64,
}

impl BeamSpot {
    /// Create a new beam spot
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
