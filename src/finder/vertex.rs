//! Vertex finding against the beam spot

use nalgebra::Vector3;
use serde::Serialize;

use super::{StageEnv, TrackCandidate};
use crate::detector::BeamSpot;
use crate::kalman::{filter, Measurement, TrackState};

/// Kinematics of a candidate at its vertex
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct VertexFit {
    /// Momentum magnitude (GeV)
    pub momentum: f64,
    /// Polar angle at the vertex (rad)
    pub theta: f64,
    /// Azimuth at the vertex (rad)
    pub phi: f64,
    /// Longitudinal vertex position (m)
    pub vertex_z: f64,
}

/// Point of closest approach to the beam line, for a state at `z_ref`
///
/// Linear back-projection along the state's slopes; non-finite when the
/// track is parallel to the beam.
pub fn closest_approach_z(state: &TrackState, beam: BeamSpot, z_ref: f64) -> f64 {
    let (tx, ty) = (state.tx(), state.ty());
    z_ref + (tx * (beam.x - state.x()) + ty * (beam.y - state.y())) / (tx * tx + ty * ty)
}

/// Momentum and angles from a state at the vertex
pub fn kinematics(state: &TrackState, charge: f64, vertex_z: f64) -> VertexFit {
    let (tx, ty) = (state.tx(), state.ty());
    let dir_z = 1.0 / (tx * tx + ty * ty + 1.0).sqrt();
    let dir = Vector3::new(tx * dir_z, ty * dir_z, dir_z).normalize();
    let (sx, sy) = (dir.x / dir.z, dir.y / dir.z);
    VertexFit {
        momentum: charge / state.qp(),
        theta: (1.0 / (1.0 + sx * sx + sy * sy).sqrt()).acos(),
        phi: dir.y.atan2(dir.x),
        vertex_z,
    }
}

/// Find the vertex of one candidate and refine it with the beam spot
///
/// Candidates that cannot reach the target centre, or whose vertex lies too
/// far from it, are marked dead. The beam-spot update only refines: when it
/// is refused, or the state cannot be carried to the vertex, the kinematics
/// come from the best state available and the candidate stays alive.
///
/// # Panics
///
/// If the propagator does not land on the target centre.
pub(crate) fn fit_vertex(env: &StageEnv<'_>, beam: BeamSpot, candidate: &mut TrackCandidate) {
    if !candidate.system.check_status() {
        return;
    }
    let config = &env.config.vertex;
    let center = config.target_center;
    let last = candidate.system.current_state().clone();

    let at_target = match env.propagator.predict(&last, center) {
        Ok(state) => state,
        Err(e) => {
            log::debug!("{:?} candidate lost on the way to the target: {}", candidate.seed, e);
            candidate.system.kill();
            return;
        }
    };
    assert!(
        (at_target.z - center).abs() < 0.01,
        "prediction to target centre landed at z={}",
        at_target.z
    );

    let vertex_z = closest_approach_z(&at_target, beam, center);
    if !vertex_z.is_finite() || (vertex_z - center).abs() > config.max_vertex_offset {
        log::trace!("Vertex z={:.4} outside target window", vertex_z);
        candidate.system.kill();
        return;
    }

    let at_vertex = match env.propagator.predict(&last, vertex_z) {
        Ok(state) => state,
        Err(e) => {
            log::debug!("Prediction to vertex z={:.4} failed: {}", vertex_z, e);
            at_target
        }
    };
    let beam_measurement = Measurement::point(beam.x, beam.y, config.beam_resolution);
    let state = match filter(&at_vertex, &beam_measurement, config.beam_gate) {
        Ok(result) => result.state,
        Err(failure) => {
            log::debug!("Beam spot update refused: {}", failure);
            at_vertex
        }
    };
    candidate.vertex = Some(kinematics(&state, candidate.charge, vertex_z));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FinderConfig;
    use crate::detector::{Detector, HitId, PlaneGeometry};
    use crate::field::UniformField;
    use crate::finder::{ReferenceFrame, SeedTag, SeedType};
    use crate::kalman::{Propagator, Site, TrackSystem};
    use nalgebra::{Matrix5, Vector5};

    /// Straight track at z = 1.5 crossing the beam axis at z = 0.15
    fn candidate() -> TrackCandidate {
        let slope = 0.3;
        let state = TrackState::new(
            1.5,
            Vector5::new(slope * (1.5 - 0.15), 0.0, slope, 0.0, -0.25),
            Matrix5::identity() * 1e-4,
        );
        let system = TrackSystem::new(Site::seed(HitId::new(0, 0, 0), state), 2);
        TrackCandidate::new(system, SeedTag::Doublet(SeedType::FrontBack), -1.0, true)
    }

    fn run(config: &FinderConfig, beam: BeamSpot, candidate: &mut TrackCandidate) {
        let planes = [1.5, 1.8, 2.0, 2.5, 2.6].map(|z| PlaneGeometry::single_module(z, 0.0));
        let detector = Detector::new(planes, 2.75).unwrap();
        let field = UniformField::zero();
        let env = StageEnv {
            config,
            detector: &detector,
            frame: ReferenceFrame::new(0.0),
            propagator: Propagator::new(&field, &config.estimator),
        };
        fit_vertex(&env, beam, candidate);
    }

    #[test]
    fn test_vertex_found_on_beam_axis() {
        let mut c = candidate();
        run(&FinderConfig::default(), BeamSpot::default(), &mut c);
        assert!(c.is_alive());
        let fit = c.vertex.unwrap();
        assert!((fit.vertex_z - 0.15).abs() < 1e-9);
        assert!((fit.theta - 0.3_f64.atan()).abs() < 1e-6);
        assert!((fit.momentum - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_vertex_outside_window_kills() {
        let config = FinderConfig::builder().target(0.9, 0.25).build();
        let mut c = candidate();
        run(&config, BeamSpot::default(), &mut c);
        assert!(!c.is_alive());
        assert!(c.vertex.is_none());
    }

    #[test]
    fn test_refused_beam_update_keeps_candidate() {
        let mut config = FinderConfig::default();
        config.vertex.beam_gate = 1e-30;
        let mut c = candidate();
        // Beam 5 cm off in y; the slope is along x so the vertex z is unchanged
        run(&config, BeamSpot::new(0.0, 0.05), &mut c);

        assert!(c.is_alive());
        let fit = c.vertex.unwrap();
        assert!((fit.vertex_z - 0.15).abs() < 1e-9);
        // Kinematics from the state predicted to the vertex
        assert!((fit.theta - 0.3_f64.atan()).abs() < 1e-9);
        assert_eq!(fit.phi, 0.0);
        assert!((fit.momentum - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_dead_candidate_left_alone() {
        let mut c = candidate();
        c.system.kill();
        run(&FinderConfig::default(), BeamSpot::default(), &mut c);
        assert!(c.vertex.is_none());
    }

    #[test]
    fn test_closest_approach_on_axis() {
        // Passing through the beam line at z = 0.15 with slope 0.5
        let state = TrackState::new(
            0.1,
            Vector5::new(-0.025, 0.0, 0.5, 0.0, -0.5),
            Matrix5::identity(),
        );
        let z = closest_approach_z(&state, BeamSpot::default(), 0.1);
        assert!((z - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_closest_approach_with_beam_offset() {
        let state = TrackState::new(
            0.1,
            Vector5::new(0.0, 0.01, 0.0, 0.5, -0.5),
            Matrix5::identity(),
        );
        let z = closest_approach_z(&state, BeamSpot::new(0.0, 0.02), 0.1);
        assert!((z - 0.12).abs() < 1e-12);
    }

    #[test]
    fn test_parallel_track_has_no_vertex() {
        let state = TrackState::new(0.1, Vector5::new(0.01, 0.0, 0.0, 0.0, -0.5), Matrix5::identity());
        assert!(!closest_approach_z(&state, BeamSpot::default(), 0.1).is_finite());
    }

    #[test]
    fn test_kinematics() {
        let tx = 0.3_f64;
        let ty = -0.4_f64;
        let state = TrackState::new(0.1, Vector5::new(0.0, 0.0, tx, ty, -0.25), Matrix5::identity());
        let fit = kinematics(&state, -1.0, 0.1);
        assert_eq!(fit.momentum, 4.0);
        assert!((fit.theta - 0.5_f64.atan()).abs() < 1e-12);
        assert!((fit.phi - ty.atan2(tx)).abs() < 1e-12);
        assert_eq!(fit.vertex_z, 0.1);
    }
}
