//! Detector description and per-event measurements
//!
//! - [`Detector`] - static plane/module geometry and the calorimeter face
//! - [`EventHits`] - the hits of one event, grouped by plane and module
//! - [`CaloCluster`], [`BeamSpot`] - the other per-event inputs

mod geometry;
mod hit;

pub use geometry::{
    Detector, ModuleGeometry, PlaneGeometry, BACK_SEED_PLANE, FRONT_SEED_PLANE, MID_SEED_PLANE,
    NUM_PLANES,
};
pub use hit::{BeamSpot, CaloCluster, Hit, HitId, TruthTag};

use crate::errors::TrackingError;

/// Hits of one event, per plane and per module
///
/// Hits inside a module are sorted by increasing radius, which the window
/// search depends on for its early exit. [`HitId`] handles index into this
/// sorted layout.
#[derive(Debug, Clone)]
pub struct EventHits {
    planes: [Vec<Vec<Hit>>; NUM_PLANES],
}

impl EventHits {
    /// Empty storage shaped after the detector's modules
    pub fn new(detector: &Detector) -> Self {
        Self {
            planes: std::array::from_fn(|p| vec![Vec::new(); detector.planes[p].num_modules()]),
        }
    }

    /// Store hits, sorting every module by radius
    ///
    /// Fails if a hit names a plane or module the detector does not have.
    pub fn from_hits<I>(detector: &Detector, hits: I) -> Result<Self, TrackingError>
    where
        I: IntoIterator<Item = Hit>,
    {
        let mut store = Self::new(detector);
        for hit in hits {
            let (plane, module) = (hit.plane, hit.module);
            store
                .planes
                .get_mut(plane)
                .and_then(|modules| modules.get_mut(module))
                .ok_or(TrackingError::HitOutOfRange { plane, module })?
                .push(hit);
        }
        for modules in store.planes.iter_mut() {
            for hits in modules.iter_mut() {
                hits.sort_by(|a, b| a.r.total_cmp(&b.r));
            }
        }
        Ok(store)
    }

    /// Number of modules on a plane
    #[inline]
    pub fn num_modules(&self, plane: usize) -> usize {
        self.planes[plane].len()
    }

    /// Hits of one module, sorted by radius
    #[inline]
    pub fn module_hits(&self, plane: usize, module: usize) -> &[Hit] {
        &self.planes[plane][module]
    }

    /// Total hit count on a plane
    pub fn plane_hit_count(&self, plane: usize) -> usize {
        self.planes[plane].iter().map(Vec::len).sum()
    }

    /// Total hit count in the event
    pub fn total_hits(&self) -> usize {
        (0..NUM_PLANES).map(|p| self.plane_hit_count(p)).sum()
    }

    /// Resolve a handle
    #[inline]
    pub fn get(&self, id: HitId) -> &Hit {
        &self.planes[id.plane as usize][id.module as usize][id.index as usize]
    }

    /// Iterate over a plane's hits together with their handles
    pub fn plane_hits(&self, plane: usize) -> impl Iterator<Item = (HitId, &Hit)> + '_ {
        self.planes[plane]
            .iter()
            .enumerate()
            .flat_map(move |(module, hits)| {
                hits.iter()
                    .enumerate()
                    .map(move |(index, hit)| (HitId::new(plane, module, index), hit))
            })
    }

    /// Whether any hit carries simulation truth
    pub fn has_truth(&self) -> bool {
        self.planes
            .iter()
            .flatten()
            .flatten()
            .any(|h| h.truth.is_some())
    }

    /// Flag a hit as consumed so later passes skip it in window searches.
    ///
    /// The finder itself never calls this; it is for drivers running several
    /// passes over one event.
    pub fn mark_used(&mut self, id: HitId) {
        self.planes[id.plane as usize][id.module as usize][id.index as usize].used = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> Detector {
        let mut planes: [PlaneGeometry; NUM_PLANES] =
            [1.5, 1.8, 2.0, 2.5, 2.6].map(|z| PlaneGeometry::single_module(z, 0.0));
        planes[0].modules.push(ModuleGeometry { phi_in_lab: 0.5 });
        Detector::new(planes, 2.75).unwrap()
    }

    #[test]
    fn test_hits_sorted_by_radius() {
        let det = detector();
        let hits = vec![
            Hit::from_polar(1, 0, 0.9, 0.0, 1.8),
            Hit::from_polar(1, 0, 0.7, 0.0, 1.8),
            Hit::from_polar(1, 0, 0.8, 0.0, 1.8),
        ];
        let store = EventHits::from_hits(&det, hits).unwrap();
        let radii: Vec<f64> = store.module_hits(1, 0).iter().map(|h| h.r).collect();
        assert_eq!(radii, vec![0.7, 0.8, 0.9]);
        assert_eq!(store.get(HitId::new(1, 0, 0)).r, 0.7);
    }

    #[test]
    fn test_out_of_range_hit_rejected() {
        let det = detector();
        let err = EventHits::from_hits(&det, vec![Hit::from_polar(2, 3, 1.0, 0.0, 2.0)])
            .unwrap_err();
        assert!(matches!(
            err,
            TrackingError::HitOutOfRange { plane: 2, module: 3 }
        ));
    }

    #[test]
    fn test_plane_iteration_and_counts() {
        let det = detector();
        let hits = vec![
            Hit::from_polar(0, 0, 0.7, 0.0, 1.5),
            Hit::from_polar(0, 1, 0.7, 0.5, 1.5),
            Hit::from_polar(4, 0, 1.2, 0.0, 2.6),
        ];
        let store = EventHits::from_hits(&det, hits).unwrap();
        assert_eq!(store.plane_hit_count(0), 2);
        assert_eq!(store.total_hits(), 3);

        let ids: Vec<HitId> = store.plane_hits(0).map(|(id, _)| id).collect();
        assert_eq!(ids, vec![HitId::new(0, 0, 0), HitId::new(0, 1, 0)]);
        assert!(!store.has_truth());
    }

    #[test]
    fn test_mark_used() {
        let det = detector();
        let mut store =
            EventHits::from_hits(&det, vec![Hit::from_polar(3, 0, 1.0, 0.0, 2.5)]).unwrap();
        let id = HitId::new(3, 0, 0);
        assert!(!store.get(id).used);
        store.mark_used(id);
        assert!(store.get(id).used);
    }
}
