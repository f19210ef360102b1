//! Sites and the track system that strings them together

use smallvec::SmallVec;

use super::filter::filter;
use super::propagate::Propagator;
use super::state::{Measurement, TrackState};
use super::{MEASUREMENT_DIM, STATE_DIM};
use crate::detector::HitId;
use crate::errors::FilterFailure;

/// Role of a site in a track system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteKind {
    /// Virtual anchor carrying the seed state; no measurement, no chi-square
    Seed,
    /// A real tracker hit
    Measured,
}

/// One (hit, estimator state) pairing
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    /// Seed anchor or measured hit
    pub kind: SiteKind,
    /// Hit the site refers to; the seed anchor refers to its seed's back hit
    pub hit: HitId,
    /// State predicted to the site before the update
    pub predicted: TrackState,
    /// State after the update (equal to `predicted` for the seed anchor)
    pub filtered: TrackState,
    /// Chi-square contribution
    pub delta_chi2: f64,
}

impl Site {
    /// Virtual seed anchor
    pub fn seed(hit: HitId, state: TrackState) -> Self {
        Self {
            kind: SiteKind::Seed,
            hit,
            predicted: state.clone(),
            filtered: state,
            delta_chi2: 0.0,
        }
    }

    /// Site for an accepted hit update
    pub fn measured(hit: HitId, predicted: TrackState, filtered: TrackState, delta_chi2: f64) -> Self {
        Self {
            kind: SiteKind::Measured,
            hit,
            predicted,
            filtered,
            delta_chi2,
        }
    }

    /// Whether this is the seed anchor
    #[inline]
    pub fn is_virtual(&self) -> bool {
        self.kind == SiteKind::Seed
    }

    /// Plane of the referenced hit
    #[inline]
    pub fn plane(&self) -> usize {
        self.hit.plane()
    }
}

/// An ordered list of sites with fit-quality and health bookkeeping
///
/// The first site is always the virtual seed anchor. Once the system is
/// dead it never comes back to life.
#[derive(Debug, Clone)]
pub struct TrackSystem {
    sites: SmallVec<[Site; 8]>,
    chi2: f64,
    missing_hits: usize,
    max_missing_hits: usize,
    alive: bool,
}

impl TrackSystem {
    /// Start a system from its seed anchor
    pub fn new(seed: Site, max_missing_hits: usize) -> Self {
        debug_assert!(seed.is_virtual());
        let mut sites = SmallVec::new();
        sites.push(seed);
        Self {
            sites,
            chi2: 0.0,
            missing_hits: 0,
            max_missing_hits,
            alive: true,
        }
    }

    /// All sites, seed anchor first
    #[inline]
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// Sites holding real hits
    pub fn measured_sites(&self) -> impl Iterator<Item = &Site> + '_ {
        self.sites.iter().filter(|s| !s.is_virtual())
    }

    /// Most recently added site
    #[inline]
    pub fn current_site(&self) -> &Site {
        // Never empty: constructed with the seed anchor
        &self.sites[self.sites.len() - 1]
    }

    /// Filtered state of the most recent site
    #[inline]
    pub fn current_state(&self) -> &TrackState {
        &self.current_site().filtered
    }

    /// Number of real hits
    pub fn num_hits(&self) -> usize {
        self.measured_sites().count()
    }

    /// Cumulative chi-square
    #[inline]
    pub fn chi2(&self) -> f64 {
        self.chi2
    }

    /// Degrees of freedom: two coordinates per hit minus the five parameters
    pub fn ndf(&self) -> i32 {
        (MEASUREMENT_DIM * self.num_hits()) as i32 - STATE_DIM as i32
    }

    /// Chi-square per degree of freedom (ndf floored at one)
    pub fn chi2_per_ndf(&self) -> f64 {
        self.chi2 / self.ndf().max(1) as f64
    }

    /// Planes crossed without an accepted hit
    #[inline]
    pub fn missing_hits(&self) -> usize {
        self.missing_hits
    }

    /// Record a plane without an accepted hit
    pub fn add_missing_hit(&mut self) {
        self.missing_hits += 1;
    }

    /// Whether the system is still alive
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Declare the system dead
    pub fn kill(&mut self) {
        self.alive = false;
    }

    /// Re-evaluate health; returns whether the system is still alive.
    ///
    /// Too many missing planes or a non-finite current state kill it.
    pub fn check_status(&mut self) -> bool {
        if self.alive
            && (self.missing_hits > self.max_missing_hits || !self.current_state().is_finite())
        {
            self.alive = false;
        }
        self.alive
    }

    /// Append an accepted site and accumulate its chi-square
    pub fn add_site(&mut self, site: Site) {
        debug_assert!(self.alive, "sites are never added to a dead track system");
        self.chi2 += site.delta_chi2;
        self.sites.push(site);
    }

    /// Predict to the hit, update, and append on success
    ///
    /// On failure the system is left untouched; the caller decides whether
    /// that counts as a missing plane or kills the candidate.
    pub fn add_and_filter(
        &mut self,
        propagator: &Propagator<'_>,
        hit: HitId,
        z: f64,
        measurement: &Measurement,
        max_delta_chi2: f64,
    ) -> Result<(), FilterFailure> {
        let predicted = propagator
            .predict(self.current_state(), z)
            .map_err(|_| FilterFailure::PropagationFailed)?;
        let result = filter(&predicted, measurement, max_delta_chi2)?;
        self.add_site(Site::measured(hit, predicted, result.state, result.delta_chi2));
        Ok(())
    }
}
