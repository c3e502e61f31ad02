use crate::concurrency::par_iter_mut3;
use crate::floating_type_mod::FT;
use crate::mesh_state::VertexVec;
use crate::simulation_parameters::{DampingModel, SimulationParams};
use crate::V2;

/// Static obstacle for the boundary condition pass. The response is
/// one-sided and lossy: the velocity component pointing into the obstacle is
/// dropped, nothing is reflected.
#[derive(Debug, Clone, Copy)]
pub enum Obstacle {
    /// Solid disc; vertices inside lose their inward radial velocity.
    Ball { center: V2, radius: FT },

    /// Keep-inside box; outward velocity is zeroed per axis at the walls.
    Walls { min: V2, max: V2 },
}

/**
 * One sub-step of semi-implicit Euler over the enabled vertices: damping,
 * velocity update from the accumulated forces, obstacle clipping, then the
 * position update with the fresh velocity.
 */
pub fn integrate_substep(
    verts: &mut VertexVec,
    obstacles: &[Obstacle],
    simulation_params: SimulationParams,
    dt: FT,
) {
    let VertexVec {
        position,
        velocity,
        force,
        enabled,
    } = verts;
    let enabled: &[bool] = enabled;

    par_iter_mut3(force, velocity, position, |i, force, velocity, position| {
        if !enabled[i] {
            return;
        }

        match simulation_params.damping_model {
            DampingModel::LinearDrag => {
                *force -= *velocity * simulation_params.damping;
                *velocity += *force * dt;
            }
            DampingModel::Exponential => {
                *velocity += *force * dt;
                *velocity *= FT::exp(-dt * simulation_params.damping);
            }
        }

        for obstacle in obstacles {
            clip_velocity(obstacle, position, velocity);
        }

        *position += *velocity * dt;

        debug_assert!(
            position.x.is_finite() && position.y.is_finite(),
            "vertex {} left the number line",
            i
        );
    });
}

fn clip_velocity(obstacle: &Obstacle, position: &V2, velocity: &mut V2) {
    match *obstacle {
        Obstacle::Ball { center, radius } => {
            let disp = position - center;
            let disp_sq = disp.norm_squared();
            if disp_sq <= radius * radius && disp_sq > 0. {
                let inward = velocity.dot(&disp);
                if inward < 0. {
                    *velocity -= disp * (inward / disp_sq);
                }
            }
        }
        Obstacle::Walls { min, max } => {
            for axis in 0..2 {
                if (position[axis] < min[axis] && velocity[axis] < 0.)
                    || (position[axis] > max[axis] && velocity[axis] > 0.)
                {
                    velocity[axis] = 0.;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec2f;

    fn single_vertex(position: V2, velocity: V2) -> VertexVec {
        let mut verts = VertexVec::default(1);
        verts.enabled[0] = true;
        verts.position[0] = position;
        verts.velocity[0] = velocity;
        verts
    }

    fn drag_free_params() -> SimulationParams {
        let mut params = SimulationParams::default_springs();
        params.damping = 0.;
        params
    }

    #[test]
    fn constant_force_matches_closed_form_kinematics() {
        let params = drag_free_params();
        let x0 = vec2f(1., 2.);
        let v0 = vec2f(0.2, -0.1);
        let acceleration = vec2f(1., 0.5);
        let mut verts = single_vertex(x0, v0);

        let dt = 1e-3;
        let steps = 1000;
        for _ in 0..steps {
            verts.force[0] = acceleration;
            integrate_substep(&mut verts, &[], params, dt);
        }

        let t = steps as FT * dt;

        // semi-implicit Euler is exact against its own discrete sum:
        // x_n = x0 + v0*n*dt + a*dt^2*n*(n+1)/2
        let discrete =
            x0 + v0 * t + acceleration * (dt * dt * (steps * (steps + 1)) as FT / 2.);
        assert!(
            (verts.position[0] - discrete).norm() < 1e-3,
            "discrete closed form violated: {} vs {}",
            verts.position[0],
            discrete
        );

        // and within O(dt) of continuous kinematics x0 + v0*t + a*t^2/2
        let continuous = x0 + v0 * t + acceleration * (t * t / 2.);
        assert!((verts.position[0] - continuous).norm() < 3e-3);

        let velocity_closed_form = v0 + acceleration * t;
        assert!((verts.velocity[0] - velocity_closed_form).norm() < 1e-3);
    }

    #[test]
    fn disabled_vertices_do_not_move() {
        let params = drag_free_params();
        let mut verts = single_vertex(vec2f(0., 0.), vec2f(1., 1.));
        verts.enabled[0] = false;
        verts.force[0] = vec2f(100., 100.);

        integrate_substep(&mut verts, &[], params, 0.01);

        assert_eq!(verts.position[0], vec2f(0., 0.));
        assert_eq!(verts.velocity[0], vec2f(1., 1.));
    }

    #[test]
    fn ball_obstacle_zeroes_inward_velocity_component() {
        let params = drag_free_params();
        let ball = Obstacle::Ball {
            center: vec2f(0., 0.),
            radius: 1.,
        };

        // inside the ball, moving straight at the center
        let mut verts = single_vertex(vec2f(0.5, 0.), vec2f(-2., 1.));
        integrate_substep(&mut verts, &[ball], params, 0.);
        // the radial part is gone, the tangential part survives
        assert_eq!(verts.velocity[0], vec2f(0., 1.));

        // moving outward is left alone
        let mut verts = single_vertex(vec2f(0.5, 0.), vec2f(2., 1.));
        integrate_substep(&mut verts, &[ball], params, 0.);
        assert_eq!(verts.velocity[0], vec2f(2., 1.));
    }

    #[test]
    fn walls_zero_outward_velocity_per_axis() {
        let params = drag_free_params();
        let walls = Obstacle::Walls {
            min: vec2f(0., 0.),
            max: vec2f(1., 1.),
        };

        let mut verts = single_vertex(vec2f(-0.1, 0.5), vec2f(-1., -2.));
        integrate_substep(&mut verts, &[walls], params, 0.);
        assert_eq!(verts.velocity[0], vec2f(0., -2.));

        let mut verts = single_vertex(vec2f(0.5, 1.2), vec2f(0.5, 3.));
        integrate_substep(&mut verts, &[walls], params, 0.);
        assert_eq!(verts.velocity[0], vec2f(0.5, 0.));
    }

    #[test]
    fn exponential_damping_decays_velocity() {
        let mut params = drag_free_params();
        params.damping_model = DampingModel::Exponential;
        params.damping = 2.;

        let mut verts = single_vertex(vec2f(0., 0.), vec2f(1., 0.));
        integrate_substep(&mut verts, &[], params, 0.1);

        crate::assert_ft_approx_eq(verts.velocity[0].x, FT::exp(-0.2), 1e-5, || {
            format!("exp damping factor")
        });
    }
}
