use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::fmt::Write;
use std::time::{Duration, Instant};

use nalgebra::zero;
use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::concurrency::par_iter_mut1;
use crate::destruction;
use crate::floating_type_mod::{FT, TAU};
use crate::force_model::{ForceModel, ForceModelTrait, NeoHookeanModel, SpringModel};
use crate::integrator::{integrate_substep, Obstacle};
use crate::mesh_asset::MeshAsset;
use crate::mesh_state::{MeshState, VertexVec};
use crate::player_index::PlayerLayout;
use crate::player_input::InputBuffer;
use crate::simulation_parameters::{ForceModelKind, SimulationParams};
use crate::{vec2f, vec2i, vec3i, IT, M2, V2};

struct PhaseTimers {
    enabled: bool,
    running: HashMap<&'static str, Instant>,
    totals: BTreeMap<&'static str, (Duration, u32)>,
}

impl PhaseTimers {
    fn new(enabled: bool) -> PhaseTimers {
        PhaseTimers {
            enabled,
            running: HashMap::new(),
            totals: BTreeMap::new(),
        }
    }

    fn begin(&mut self, id: &'static str) {
        if self.enabled {
            self.running.insert(id, Instant::now());
        }
    }

    fn end(&mut self, id: &'static str) {
        if self.enabled {
            let started = self.running.remove(id).expect("phase ended without begin");
            let entry = self.totals.entry(id).or_insert((Duration::ZERO, 0));
            entry.0 += started.elapsed();
            entry.1 += 1;
        }
    }
}

#[derive(Clone, Copy)]
struct ValueStat {
    min: FT,
    max: FT,
    sum: FT,
    count: u32,
}

struct ValueStats {
    enabled: bool,
    stats: BTreeMap<&'static str, ValueStat>,
}

impl ValueStats {
    fn new(enabled: bool) -> ValueStats {
        ValueStats {
            enabled,
            stats: BTreeMap::new(),
        }
    }

    fn add(&mut self, id: &'static str, value: FT) {
        if !self.enabled {
            return;
        }
        let stat = self.stats.entry(id).or_insert(ValueStat {
            min: FT::INFINITY,
            max: FT::NEG_INFINITY,
            sum: 0.,
            count: 0,
        });
        stat.min = FT::min(stat.min, value);
        stat.max = FT::max(stat.max, value);
        stat.sum += value;
        stat.count += 1;
    }
}

/// Where each player's copy of the mesh asset lands on reset: evenly spaced
/// on a circle of radius `spread` around `center`, scaled by `scale`.
#[derive(Debug, Clone, Copy)]
pub struct PlayerPlacement {
    pub center: V2,
    pub spread: FT,
    pub scale: FT,
}

impl PlayerPlacement {
    fn player_offset(&self, player: usize, player_count: usize) -> V2 {
        let angle = TAU * player as FT / player_count as FT;
        self.center + vec2f(angle.cos(), angle.sin()) * self.spread
    }
}

/**
 * The owning simulation object: mesh state, force model, inputs, per-player
 * derived data and phase counters. One instance per game, no globals.
 */
pub struct MeshSimulation {
    pub mesh: MeshState,
    pub force_model: ForceModel,
    pub inputs: InputBuffer,
    pub obstacles: Vec<Obstacle>,

    /// Centroid of each player's enabled vertices. A fully destroyed player
    /// keeps its last centroid instead of dividing by zero.
    pub player_centers: Vec<V2>,
    pub player_verts_alive: Vec<u32>,
    pub player_alive: Vec<bool>,

    pub time: FT,
    step_number: usize,

    asset: MeshAsset,
    placement: PlayerPlacement,

    ptimers: PhaseTimers,
    vstats: ValueStats,
}

impl MeshSimulation {
    pub fn new(
        asset: MeshAsset,
        player_count: usize,
        force_model: ForceModel,
        placement: PlayerPlacement,
        obstacles: Vec<Obstacle>,
        counters_enabled: bool,
    ) -> MeshSimulation {
        assert!(player_count > 0, "need at least one player");
        assert!(!asset.positions.is_empty(), "mesh asset has no vertices");
        assert!(asset.indices_in_range(), "mesh asset references out-of-range vertices");

        let layout = PlayerLayout {
            player_count,
            verts_per_player: asset.positions.len(),
            links_per_player: asset.links.len(),
            faces_per_player: asset.faces.len(),
        };

        let mut simulation = MeshSimulation {
            mesh: MeshState::new(layout),
            force_model,
            inputs: InputBuffer::new(player_count),
            obstacles,
            player_centers: vec![zero(); player_count],
            player_verts_alive: vec![0; player_count],
            player_alive: vec![false; player_count],
            time: 0.,
            step_number: 0,
            asset,
            placement,
            ptimers: PhaseTimers::new(counters_enabled),
            vstats: ValueStats::new(counters_enabled),
        };
        simulation.reset();
        simulation
    }

    pub fn num_verts(&self) -> usize {
        self.mesh.vert_count()
    }

    pub fn step_number(&self) -> usize {
        self.step_number
    }

    /**
     * Rebuild the canonical starting state: stamp the asset into every
     * player's slice, zero all velocities, recompute the reference shape
     * matrices. Deterministic, so repeated resets are bit-identical.
     */
    pub fn reset(&mut self) {
        let layout = self.mesh.layout;

        self.mesh.verts = VertexVec::default(layout.vert_count());
        for link in self.mesh.links.iter_mut() {
            *link = vec2i(-1, -1);
        }
        for face in self.mesh.faces.iter_mut() {
            *face = vec3i(-1, -1, -1);
        }

        for player in 0..layout.player_count {
            let offset = self.placement.player_offset(player, layout.player_count);

            for (local, point) in self.asset.positions.iter().enumerate() {
                let vert = layout.player_vert(player, local);
                self.mesh.verts.enabled[vert] = true;
                self.mesh.verts.position[vert] = *point * self.placement.scale + offset;
            }
            for (local, link) in self.asset.links.iter().enumerate() {
                self.mesh.links[layout.player_link(player, local)] = vec2i(
                    layout.player_vert(player, link[0] as usize) as IT,
                    layout.player_vert(player, link[1] as usize) as IT,
                );
            }
            for (local, face) in self.asset.faces.iter().enumerate() {
                self.mesh.faces[layout.player_face(player, local)] = vec3i(
                    layout.player_vert(player, face[0] as usize) as IT,
                    layout.player_vert(player, face[1] as usize) as IT,
                    layout.player_vert(player, face[2] as usize) as IT,
                );
            }
        }

        // reference shape matrices from the rest positions, fixed until the
        // next reset
        for face in 0..self.mesh.faces.len() {
            if !self.mesh.face_active(face) {
                continue;
            }
            let tri = self.mesh.faces[face];
            let a = self.mesh.verts.position[tri[0] as usize];
            let b = self.mesh.verts.position[tri[1] as usize];
            let c = self.mesh.verts.position[tri[2] as usize];
            self.mesh.face_shape_inv[face] = M2::from_columns(&[a - c, b - c])
                .try_inverse()
                .expect("degenerate face in the rest mesh");
        }

        self.time = 0.;
        self.step_number = 0;
        self.update_player_stats();
    }

    /**
     * Advance one rendered frame. The frame dt is clamped and divided over
     * the configured sub-steps; inputs are sampled once per frame.
     */
    pub fn advance_frame(&mut self, frame_dt: FT, simulation_params: SimulationParams) {
        let dt = simulation_params.substep_dt(frame_dt);
        let inputs = self
            .inputs
            .sampled(self.time, simulation_params.input_max_age);

        for _ in 0..simulation_params.substeps {
            self.single_step(&inputs, simulation_params, dt);
        }

        self.vstats.add(
            "verts-alive",
            self.player_verts_alive.iter().sum::<u32>() as FT,
        );
    }

    fn single_step(&mut self, inputs: &[V2], simulation_params: SimulationParams, dt: FT) {
        debug_assert_eq!(inputs.len(), self.mesh.layout.player_count);

        self.ptimers.begin("input");
        {
            let layout = self.mesh.layout;
            let impulse_scale = simulation_params.speed * dt;
            // applied to the whole slice; disabled vertices never integrate,
            // so the write is inert
            par_iter_mut1(&mut self.mesh.verts.velocity, |i, velocity| {
                *velocity += inputs[layout.vert_player(i)] * impulse_scale;
            });
        }
        self.ptimers.end("input");

        self.ptimers.begin("forces");
        par_iter_mut1(&mut self.mesh.verts.force, |_i, force| *force = zero());
        self.force_model
            .accumulate_forces(&mut self.mesh, simulation_params);
        self.ptimers.end("forces");

        self.ptimers.begin("integrate");
        integrate_substep(&mut self.mesh.verts, &self.obstacles, simulation_params, dt);
        self.ptimers.end("integrate");

        self.update_player_stats();

        self.time += dt;
        self.step_number += 1;
    }

    fn update_player_stats(&mut self) {
        let layout = self.mesh.layout;
        for player in 0..layout.player_count {
            let mut center: V2 = zero();
            let mut alive = 0u32;
            for vert in layout.player_verts(player) {
                if self.mesh.verts.enabled[vert] {
                    center += self.mesh.verts.position[vert];
                    alive += 1;
                }
            }
            self.player_verts_alive[player] = alive;
            self.player_alive[player] = alive > 0;
            if alive > 0 {
                self.player_centers[player] = center / alive as FT;
            }
        }
    }

    // ---- game-rule triggers; each restores the cascade rule and the
    // per-player derived data before returning

    pub fn destroy_in_radius(&mut self, center: V2, radius: FT, margin: FT) {
        self.ptimers.begin("destruction");
        destruction::destroy_in_radius(&mut self.mesh, center, radius, margin);
        self.ptimers.end("destruction");
        self.update_player_stats();
    }

    pub fn destroy_outside_ring(&mut self, center: V2, radius: FT) {
        self.ptimers.begin("destruction");
        destruction::destroy_outside_ring(&mut self.mesh, center, radius);
        self.ptimers.end("destruction");
        self.update_player_stats();
    }

    pub fn kill_outside_borders(&mut self, min: V2, max: V2) {
        self.ptimers.begin("destruction");
        destruction::kill_outside_borders(&mut self.mesh, min, max);
        self.ptimers.end("destruction");
        self.update_player_stats();
    }

    pub fn kill_player(&mut self, player: usize) {
        self.ptimers.begin("destruction");
        destruction::kill_player(&mut self.mesh, player);
        self.ptimers.end("destruction");
        self.update_player_stats();
    }
}

// ---------------------------------------------------------------------------
// scene configuration

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SceneMesh {
    r#type: String,
    n: Option<usize>,
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScenePlacement {
    center: Vec<FT>,
    spread: FT,
    scale: FT,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SceneObstacle {
    r#type: String,
    center: Option<Vec<FT>>,
    radius: Option<FT>,
    min: Option<Vec<FT>>,
    max: Option<Vec<FT>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneRing {
    pub start_radius: FT,
    pub shrink_rate: FT,
    pub interval_frames: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneBomb {
    pub period: FT,
    pub radius: FT,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    pub player_count: usize,
    mesh: SceneMesh,
    placement: ScenePlacement,
    #[serde(default)]
    obstacles: Vec<SceneObstacle>,
    pub map_min: Vec<FT>,
    pub map_max: Vec<FT>,
    #[serde(default)]
    pub ring: Option<SceneRing>,
    #[serde(default)]
    pub bomb: Option<SceneBomb>,
}

impl SceneConfig {
    pub fn map_center(&self) -> V2 {
        (vec2f(self.map_min[0], self.map_min[1]) + vec2f(self.map_max[0], self.map_max[1])) / 2.
    }
}

fn vec2_from(values: &[FT]) -> V2 {
    assert!(values.len() == 2, "expected a 2d vector in the scene file");
    vec2f(values[0], values[1])
}

pub fn init_mesh_sim(
    simulation_params: SimulationParams,
    scene_config: &SceneConfig,
    counters_enabled: bool,
) -> MeshSimulation {
    let asset = match scene_config.mesh.r#type.as_str() {
        "round" => MeshAsset::round(),
        "grid" => MeshAsset::grid(
            scene_config
                .mesh
                .n
                .expect("grid mesh needs an edge count `n`"),
        ),
        "file" => {
            let path = scene_config
                .mesh
                .path
                .as_ref()
                .expect("file mesh needs a `path`");
            MeshAsset::read_mesh_file(std::path::Path::new(path)).expect("failed reading mesh asset")
        }
        other => panic!("unknown mesh type `{}`", other),
    };

    let force_model: ForceModel = match simulation_params.force_model {
        ForceModelKind::Springs => {
            assert!(
                !asset.links.is_empty(),
                "the spring force model needs a mesh with links"
            );
            SpringModel.into()
        }
        ForceModelKind::NeoHookean => {
            assert!(
                !asset.faces.is_empty(),
                "the finite-element force model needs a mesh with faces"
            );
            let n = scene_config
                .mesh
                .n
                .expect("the finite-element force model needs a grid mesh");
            NeoHookeanModel::new(simulation_params.density, 1. / n as FT).into()
        }
    };

    let obstacles = scene_config
        .obstacles
        .iter()
        .map(|obstacle| match obstacle.r#type.as_str() {
            "ball" => Obstacle::Ball {
                center: vec2_from(obstacle.center.as_ref().expect("ball obstacle needs a center")),
                radius: obstacle.radius.expect("ball obstacle needs a radius"),
            },
            "walls" => Obstacle::Walls {
                min: vec2_from(obstacle.min.as_ref().expect("walls obstacle needs min")),
                max: vec2_from(obstacle.max.as_ref().expect("walls obstacle needs max")),
            },
            other => panic!("unknown obstacle type `{}`", other),
        })
        .collect();

    let placement = PlayerPlacement {
        center: vec2_from(&scene_config.placement.center),
        spread: scene_config.placement.spread,
        scale: scene_config.placement.scale,
    };

    let simulation = MeshSimulation::new(
        asset,
        scene_config.player_count,
        force_model,
        placement,
        obstacles,
        counters_enabled,
    );

    println!(
        "INIT {} PLAYERS, {} VERTS, {} LINKS, {} FACES",
        scene_config.player_count,
        simulation.num_verts(),
        simulation.mesh.active_link_count(),
        simulation.mesh.active_face_count(),
    );

    simulation
}

pub fn write_statistics(simulation: &MeshSimulation) -> String {
    let mut s = String::new();

    for (label, (total, calls)) in simulation.ptimers.totals.iter() {
        writeln!(
            s,
            "{}: total:{:.1}ms avg:{:.4}ms calls:{}",
            label,
            total.as_secs_f64() * 1000.,
            total.as_secs_f64() * 1000. / *calls as f64,
            calls
        )
        .unwrap();
    }

    for (label, stat) in simulation.vstats.stats.iter() {
        writeln!(
            s,
            "{}: min:{} max:{} avg:{}",
            label,
            stat.min,
            stat.max,
            stat.sum / stat.count as FT
        )
        .unwrap();
    }

    s
}

pub fn is_ft_approx_eq<FT: Float>(a: FT, b: FT, tolerance: FT) -> bool {
    assert!(!a.is_nan());
    assert!(!b.is_nan());
    b <= a + tolerance && b >= a - tolerance
}

pub fn assert_ft_approx_eq<FT: Float + Display>(a: FT, b: FT, tolerance: FT, s: impl FnOnce() -> String) {
    if !is_ft_approx_eq(a, b, tolerance) {
        panic!(
            "{} value not equal with a tolerance of {}:\n\ta={}\n\tb={}\n",
            s(),
            tolerance,
            a,
            b
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destruction::no_dangling_topology;

    fn arena_simulation(player_count: usize) -> MeshSimulation {
        MeshSimulation::new(
            MeshAsset::round(),
            player_count,
            SpringModel.into(),
            PlayerPlacement {
                center: vec2f(0., 0.),
                spread: 10.,
                scale: 1.,
            },
            Vec::new(),
            false,
        )
    }

    fn triangle_asset() -> MeshAsset {
        MeshAsset {
            positions: vec![vec2f(0., 0.), vec2f(1., 0.), vec2f(0.5, FT::sqrt(3.) / 2.)],
            links: vec![[0, 1], [1, 2], [2, 0]],
            faces: Vec::new(),
        }
    }

    #[test]
    fn repeated_reset_is_bit_identical() {
        let params = SimulationParams::default_springs();
        let mut simulation = arena_simulation(2);

        let positions = simulation.mesh.verts.position.clone();
        let links = simulation.mesh.links.clone();
        let enabled = simulation.mesh.verts.enabled.clone();

        simulation.inputs.set(0, vec2f(1., 0.), 0.);
        for _ in 0..30 {
            simulation.advance_frame(0.016, params);
        }
        simulation.destroy_in_radius(simulation.player_centers[0], 2., params.collision_radius);
        simulation.reset();

        assert_eq!(simulation.mesh.verts.position, positions);
        assert_eq!(simulation.mesh.links, links);
        assert_eq!(simulation.mesh.verts.enabled, enabled);
        assert!(simulation.mesh.verts.velocity.iter().all(|v| *v == vec2f(0., 0.)));
        assert_eq!(simulation.time, 0.);
    }

    #[test]
    fn damped_triangles_come_to_rest() {
        let params = SimulationParams::default_springs();
        let mut simulation = MeshSimulation::new(
            triangle_asset(),
            2,
            SpringModel.into(),
            PlayerPlacement {
                center: vec2f(0., 0.),
                spread: 5.,
                scale: 1.,
            },
            Vec::new(),
            false,
        );

        // stretch both triangles slightly out of rest
        for player in 0..2 {
            let center = simulation.player_centers[player];
            for vert in simulation.mesh.layout.player_verts(player) {
                let position = simulation.mesh.verts.position[vert];
                simulation.mesh.verts.position[vert] = center + (position - center) * 1.02;
            }
        }

        for _ in 0..150 {
            simulation.advance_frame(0.01, params);
        }

        for velocity in &simulation.mesh.verts.velocity {
            assert!(
                velocity.norm() < 1e-3,
                "velocity failed to damp out: {}",
                velocity
            );
        }
    }

    #[test]
    fn kill_player_leaves_other_players_intact() {
        let mut simulation = arena_simulation(2);
        let layout = simulation.mesh.layout;

        simulation.kill_player(1);

        for vert in layout.player_verts(1) {
            assert!(!simulation.mesh.verts.enabled[vert]);
        }
        for link in layout.player_links(1) {
            assert!(!simulation.mesh.link_active(link));
        }
        assert!(!simulation.player_alive[1]);
        assert_eq!(simulation.player_verts_alive[1], 0);

        for vert in layout.player_verts(0) {
            assert!(simulation.mesh.verts.enabled[vert]);
        }
        for link in layout.player_links(0) {
            assert!(simulation.mesh.link_active(link));
        }
        assert!(simulation.player_alive[0]);
        assert_eq!(simulation.player_verts_alive[0], 7);
    }

    #[test]
    fn destruction_upholds_the_cascade_rule() {
        let params = SimulationParams::default_springs();
        let mut simulation = arena_simulation(4);

        // chip away at one player, then clip everything to a tight box
        let target = simulation.player_centers[2];
        simulation.destroy_in_radius(target, 1., params.collision_radius);
        assert!(no_dangling_topology(&simulation.mesh));

        simulation.kill_outside_borders(vec2f(-9., -9.), vec2f(9., 9.));
        assert!(no_dangling_topology(&simulation.mesh));

        simulation.destroy_outside_ring(vec2f(0., 0.), 7.);
        assert!(no_dangling_topology(&simulation.mesh));

        // stepping after heavy destruction stays well-behaved
        simulation.advance_frame(0.016, params);
        assert!(no_dangling_topology(&simulation.mesh));
        for position in &simulation.mesh.verts.position {
            assert!(position.x.is_finite() && position.y.is_finite());
        }
    }

    #[test]
    fn dead_player_centroid_is_left_untouched() {
        let mut simulation = arena_simulation(2);
        let center_before = simulation.player_centers[1];

        simulation.kill_player(1);
        let params = SimulationParams::default_springs();
        simulation.advance_frame(0.016, params);

        assert_eq!(simulation.player_centers[1], center_before);
        assert!(simulation.player_centers[1].x.is_finite());
    }

    #[test]
    fn input_impulse_moves_only_the_steered_player() {
        let params = SimulationParams::default_springs();
        let mut simulation = arena_simulation(2);

        simulation.inputs.set(0, vec2f(1., 0.), 0.);
        let center0_before = simulation.player_centers[0];
        let center1_before = simulation.player_centers[1];

        for _ in 0..10 {
            simulation.advance_frame(0.016, params);
        }

        assert!(simulation.player_centers[0].x > center0_before.x + 0.1);
        let drift1 = (simulation.player_centers[1] - center1_before).norm();
        assert!(drift1 < 0.1, "unsteered player drifted {}", drift1);
    }
}
