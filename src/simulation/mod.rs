
pub mod concurrency;
pub mod destruction;
pub mod force_model;
pub mod integrator;
pub mod mesh_asset;
pub mod mesh_state;
pub mod player_index;
pub mod player_input;
pub mod simulation_parameters;
pub mod simulation;

pub type IT = i32;

#[cfg(feature = "double-precision")]
pub mod floating_type_mod {
    pub type FT = f64;
    pub use std::f64::consts::{PI, TAU};
}

#[cfg(not(feature = "double-precision"))]
pub mod floating_type_mod {
    pub type FT = f32;
    pub use std::f32::consts::{PI, TAU};
}

use floating_type_mod::FT;

use nalgebra::{SMatrix, SVector};

pub type V<T, const D: usize> = SVector<T, D>;

pub type VF<const D: usize> = V<FT, D>;
pub type VI<const D: usize> = V<IT, D>;

pub type V2 = V<FT, 2>;
pub type M2 = SMatrix<FT, 2, 2>;

pub fn vec2f(x: FT, y: FT) -> V<FT, 2> {
    [x, y].into()
}

pub fn vec2i(x: IT, y: IT) -> V<IT, 2> {
    [x, y].into()
}

pub fn vec3i(x: IT, y: IT, z: IT) -> V<IT, 3> {
    [x, y, z].into()
}

pub use simulation::*;
