use crate::{mesh_state::MeshState, simulation_parameters::SimulationParams};

mod fem_model;
mod spring_model;

use enum_dispatch::enum_dispatch;
pub use fem_model::NeoHookeanModel;
pub use spring_model::SpringModel;

#[enum_dispatch]
pub trait ForceModelTrait {
    /// Accumulate internal forces for the current positions into
    /// `mesh.verts.force`. The caller clears the force array first.
    fn accumulate_forces(&self, mesh: &mut MeshState, simulation_params: SimulationParams);
}

/// The two solver variants. Selected once at configuration time, never
/// switched mid-round.
#[enum_dispatch(ForceModelTrait)]
pub enum ForceModel {
    SpringModel(SpringModel),
    NeoHookeanModel(NeoHookeanModel),
}
