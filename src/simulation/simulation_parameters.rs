use crate::floating_type_mod::FT;
use serde::{Deserialize, Serialize};

#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ForceModelKind {
    Springs,
    NeoHookean,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum DampingModel {
    // `f -= damping * v` before the velocity update (mass-spring variant)
    LinearDrag,

    // `v *= exp(-dt * damping)` after the velocity update (finite-element variant)
    Exponential,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimulationParams {
    pub force_model: ForceModelKind,

    pub damping_model: DampingModel,
    pub damping: FT,

    /// Input impulse scale: `v += dt * speed * input`.
    pub speed: FT,

    /// Frame dt is clamped to this before sub-stepping, so a slow frame
    /// slows the game down instead of blowing up the mesh.
    pub max_dt: FT,
    pub substeps: usize,

    // only used with ForceModelKind::Springs
    pub spring_stiffness: FT,
    pub rest_length: FT,
    pub collision_radius: FT,
    pub collision_power: i32,

    // only used with ForceModelKind::NeoHookean
    pub youngs_modulus: FT,
    pub poisson_ratio: FT,
    pub density: FT,

    // numeric guards: below these a direction / log has no usable value
    pub min_distance: FT,
    pub min_det: FT,

    /// Inputs older than this many sim-seconds count as "no input".
    pub input_max_age: FT,

    /// Players with fewer enabled vertices than this get eliminated.
    pub elimination_threshold: u32,
}

impl SimulationParams {
    pub fn lame_mu(&self) -> FT {
        self.youngs_modulus / 2. / (1. + self.poisson_ratio)
    }

    pub fn lame_lambda(&self) -> FT {
        self.youngs_modulus * self.poisson_ratio
            / (1. + self.poisson_ratio)
            / (1. - 2. * self.poisson_ratio)
    }

    pub fn substep_dt(&self, frame_dt: FT) -> FT {
        FT::min(frame_dt, self.max_dt) / self.substeps as FT
    }

    /// Arena defaults for the mass-spring variant.
    pub fn default_springs() -> SimulationParams {
        SimulationParams {
            force_model: ForceModelKind::Springs,
            damping_model: DampingModel::LinearDrag,
            damping: 15.,
            speed: 1500.,
            max_dt: 0.02,
            substeps: 10,
            spring_stiffness: 3000.,
            rest_length: 1.,
            collision_radius: 0.95,
            collision_power: 5,
            youngs_modulus: 5e4,
            poisson_ratio: 0.4,
            density: 10.,
            min_distance: 1e-6,
            min_det: 1e-6,
            input_max_age: 3.,
            elimination_threshold: 5,
        }
    }

    /// Deformable-blob defaults for the finite-element variant.
    pub fn default_neo_hookean() -> SimulationParams {
        SimulationParams {
            force_model: ForceModelKind::NeoHookean,
            damping_model: DampingModel::Exponential,
            damping: 2.,
            speed: 40.,
            max_dt: 0.001,
            substeps: 10,
            ..Self::default_springs()
        }
    }
}

#[test]
fn lame_parameters_match_textbook_values() {
    let params = SimulationParams::default_springs();
    // E = 5e4, nu = 0.4
    crate::assert_ft_approx_eq(params.lame_mu(), 17857.143, 0.5, || format!("mu"));
    crate::assert_ft_approx_eq(params.lame_lambda(), 71428.57, 0.5, || format!("lambda"));
}
