use nalgebra::zero;

use crate::concurrency::par_iter_mut1;
use crate::force_model::ForceModelTrait;
use crate::mesh_state::{MeshState, VertexVec};
use crate::simulation_parameters::SimulationParams;
use crate::V2;

/// Hookean springs along the links plus short-range repulsion between every
/// close pair of enabled vertices.
pub struct SpringModel;

impl ForceModelTrait for SpringModel {
    fn accumulate_forces(&self, mesh: &mut MeshState, simulation_params: SimulationParams) {
        spring_forces(mesh, simulation_params);
        collision_forces(mesh, simulation_params);
    }
}

/**
 * One sequential pass over the link array. Each spring is visited exactly
 * once and writes the same force with opposite signs to both endpoints, so
 * the pair forces cancel by construction.
 */
fn spring_forces(mesh: &mut MeshState, simulation_params: SimulationParams) {
    let VertexVec {
        position,
        force,
        enabled,
        ..
    } = &mut mesh.verts;

    for link in mesh.links.iter() {
        if link[0] < 0 {
            continue;
        }
        let i = link[0] as usize;
        let j = link[1] as usize;
        debug_assert!(enabled[i] && enabled[j], "active link on disabled vertex");

        let diff = position[j] - position[i];
        let dist = diff.norm();
        if dist < simulation_params.min_distance {
            // coincident endpoints have no usable direction
            continue;
        }

        let magnitude = simulation_params.spring_stiffness * (simulation_params.rest_length - dist);
        let f = diff * (magnitude / dist);
        force[i] -= f;
        force[j] += f;
    }
}

/**
 * Pairwise repulsion with a quintic falloff inside the collision radius.
 * O(n^2) over all enabled vertices; acceptable at arena scale (<= 640) and
 * run as a parallel gather, each vertex only ever writing its own entry.
 */
fn collision_forces(mesh: &mut MeshState, simulation_params: SimulationParams) {
    let VertexVec {
        position,
        force,
        enabled,
        ..
    } = &mut mesh.verts;
    let position: &[V2] = position;
    let enabled: &[bool] = enabled;

    par_iter_mut1(force, |i, force_i| {
        if !enabled[i] {
            return;
        }
        let mut accumulated: V2 = zero();
        for j in 0..position.len() {
            if j == i || !enabled[j] {
                continue;
            }
            let diff = position[j] - position[i];
            let dist = diff.norm();
            if dist >= simulation_params.collision_radius || dist < simulation_params.min_distance {
                continue;
            }
            let overlap = 1. + simulation_params.collision_radius - dist;
            let magnitude = simulation_params.spring_stiffness
                * (overlap.powi(simulation_params.collision_power) - 1.);
            accumulated -= diff * (magnitude / dist);
        }
        *force_i += accumulated;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player_index::PlayerLayout;
    use crate::{vec2f, vec2i};

    fn two_vertex_mesh(separation: crate::floating_type_mod::FT) -> MeshState {
        let layout = PlayerLayout {
            player_count: 1,
            verts_per_player: 2,
            links_per_player: 1,
            faces_per_player: 0,
        };
        let mut mesh = MeshState::new(layout);
        mesh.verts.enabled[0] = true;
        mesh.verts.enabled[1] = true;
        mesh.verts.position[0] = vec2f(0., 0.);
        mesh.verts.position[1] = vec2f(separation, 0.);
        mesh.links[0] = vec2i(0, 1);
        mesh
    }

    #[test]
    fn spring_forces_obey_newtons_third_law() {
        let params = SimulationParams::default_springs();
        // far enough apart that the collision term stays silent
        let mut mesh = two_vertex_mesh(2.);

        SpringModel.accumulate_forces(&mut mesh, params);

        let f0 = mesh.verts.force[0];
        let f1 = mesh.verts.force[1];
        assert!((f0 + f1).norm() < 1e-4, "pair forces must cancel, got {} {}", f0, f1);

        // stretched past rest length, so the spring pulls the endpoints together
        assert!(f0.x > 0.);
        assert!(f1.x < 0.);
        crate::assert_ft_approx_eq(
            f0.norm(),
            params.spring_stiffness * (2. - params.rest_length),
            1e-2,
            || format!("spring force magnitude"),
        );
    }

    #[test]
    fn coincident_vertices_produce_no_force() {
        let params = SimulationParams::default_springs();
        let mut mesh = two_vertex_mesh(0.);

        SpringModel.accumulate_forces(&mut mesh, params);

        assert_eq!(mesh.verts.force[0], vec2f(0., 0.));
        assert_eq!(mesh.verts.force[1], vec2f(0., 0.));
    }

    #[test]
    fn close_vertices_repel() {
        let params = SimulationParams::default_springs();
        // no link, just two loose vertices inside the collision radius
        let mut mesh = two_vertex_mesh(0.5);
        mesh.links[0] = vec2i(-1, -1);

        SpringModel.accumulate_forces(&mut mesh, params);

        // vertex 0 is pushed away from vertex 1
        assert!(mesh.verts.force[0].x < 0.);
        assert!(mesh.verts.force[1].x > 0.);

        // the falloff vanishes exactly at the collision radius
        let expected = params.spring_stiffness
            * ((1. + params.collision_radius - 0.5).powi(params.collision_power) - 1.);
        crate::assert_ft_approx_eq(mesh.verts.force[1].x, expected, 1e-2, || {
            format!("repulsion magnitude")
        });
    }

    #[test]
    fn disabled_vertices_are_ignored() {
        let params = SimulationParams::default_springs();
        let mut mesh = two_vertex_mesh(0.5);
        mesh.links[0] = vec2i(-1, -1);
        mesh.verts.enabled[1] = false;

        SpringModel.accumulate_forces(&mut mesh, params);

        assert_eq!(mesh.verts.force[0], vec2f(0., 0.));
        assert_eq!(mesh.verts.force[1], vec2f(0., 0.));
    }
}
