use crate::floating_type_mod::FT;
use crate::force_model::ForceModelTrait;
use crate::mesh_state::{MeshState, VertexVec};
use crate::simulation_parameters::SimulationParams;
use crate::{vec2f, M2};

/**
 * Neo-Hookean triangle elements. Every active face contributes the energy
 * `V * phi(F)` with `F = D * B`, where `D` holds the current edge vectors,
 * `B` is the inverse rest-state edge matrix and `V` the doubled face area.
 * Forces are the closed-form negative gradient of that energy with `V` held
 * constant, scaled by the inverse vertex mass so the integrator can treat
 * them as accelerations (`v += f * dt`).
 */
pub struct NeoHookeanModel {
    inv_vertex_mass: FT,
}

impl NeoHookeanModel {
    /// `edge_length` is the rest spacing of the mesh; a vertex weighs
    /// `density * edge_length^2`.
    pub fn new(density: FT, edge_length: FT) -> NeoHookeanModel {
        assert!(density > 0. && edge_length > 0., "non-positive vertex mass");
        NeoHookeanModel {
            inv_vertex_mass: 1. / (density * edge_length * edge_length),
        }
    }

    pub fn inv_vertex_mass(&self) -> FT {
        self.inv_vertex_mass
    }

    /// Strain energy density, zero in the rest configuration (`F = I`).
    /// The determinant is clamped before the log so degenerate or inverted
    /// faces yield large finite forces instead of NaN.
    pub fn energy_density(deformation: &M2, mu: FT, lam: FT, min_det: FT) -> FT {
        let log_j = FT::max(deformation.determinant(), min_det).ln();
        mu / 2. * ((deformation.transpose() * deformation).trace() - 2.) - mu * log_j
            + lam / 2. * log_j * log_j
    }

    /// First Piola-Kirchhoff stress `P(F) = mu*F + (lam*ln(J) - mu)*F^-T`.
    fn piola_stress(deformation: &M2, mu: FT, lam: FT, min_det: FT) -> M2 {
        let f = deformation;
        let det = FT::max(f.determinant(), min_det);
        let log_j = det.ln();
        // F^-T written out so the clamped determinant is used for the inverse
        let f_inv_t = M2::new(f[(1, 1)], -f[(1, 0)], -f[(0, 1)], f[(0, 0)]) / det;
        f * mu + f_inv_t * (lam * log_j - mu)
    }

    /// Deformation gradient of one face at the given positions.
    pub fn face_deformation(mesh: &MeshState, face: usize) -> M2 {
        let tri = mesh.faces[face];
        let a = mesh.verts.position[tri[0] as usize];
        let b = mesh.verts.position[tri[1] as usize];
        let c = mesh.verts.position[tri[2] as usize];
        M2::from_columns(&[a - c, b - c]) * mesh.face_shape_inv[face]
    }

    /// Doubled area of one face at the given positions.
    pub fn face_measure(mesh: &MeshState, face: usize) -> FT {
        let tri = mesh.faces[face];
        let a = mesh.verts.position[tri[0] as usize];
        let b = mesh.verts.position[tri[1] as usize];
        let c = mesh.verts.position[tri[2] as usize];
        (a - c).perp(&(b - c)).abs()
    }

    /// Total strain energy over all active faces.
    pub fn total_energy(&self, mesh: &MeshState, simulation_params: SimulationParams) -> FT {
        let mu = simulation_params.lame_mu();
        let lam = simulation_params.lame_lambda();
        let mut energy = 0.;
        for face in 0..mesh.faces.len() {
            if !mesh.face_active(face) {
                continue;
            }
            let deformation = Self::face_deformation(mesh, face);
            energy += Self::face_measure(mesh, face)
                * Self::energy_density(&deformation, mu, lam, simulation_params.min_det);
        }
        energy
    }
}

impl ForceModelTrait for NeoHookeanModel {
    fn accumulate_forces(&self, mesh: &mut MeshState, simulation_params: SimulationParams) {
        let mu = simulation_params.lame_mu();
        let lam = simulation_params.lame_lambda();

        let VertexVec {
            position, force, ..
        } = &mut mesh.verts;

        for (face, tri) in mesh.faces.iter().enumerate() {
            if tri[0] < 0 {
                continue;
            }
            let ia = tri[0] as usize;
            let ib = tri[1] as usize;
            let ic = tri[2] as usize;

            let a = position[ia];
            let b = position[ib];
            let c = position[ic];

            let edge1 = a - c;
            let edge2 = b - c;
            let measure = edge1.perp(&edge2).abs();

            let shape_inv = mesh.face_shape_inv[face];
            let deformation = M2::from_columns(&[edge1, edge2]) * shape_inv;
            let stress = Self::piola_stress(&deformation, mu, lam, simulation_params.min_det);

            // dU/dD = V * P * B^T; columns are the energy gradients wrt a and b
            let gradient = stress * shape_inv.transpose() * (measure * self.inv_vertex_mass);
            let grad_a = vec2f(gradient[(0, 0)], gradient[(1, 0)]);
            let grad_b = vec2f(gradient[(0, 1)], gradient[(1, 1)]);

            force[ia] -= grad_a;
            force[ib] -= grad_b;
            force[ic] += grad_a + grad_b;
        }
    }
}
