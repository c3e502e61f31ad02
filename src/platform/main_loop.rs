use std::path::Path;
use std::time::Instant;

use clap::{App, AppSettings, Arg, SubCommand};
use rand::Rng;

use crate::floating_type_mod::FT;
use crate::force_model::SpringModel;
use crate::mesh_asset::MeshAsset;
use crate::simulation_parameters::SimulationParams;
use crate::{
    init_mesh_sim, vec2f, write_statistics, MeshSimulation, PlayerPlacement, SceneConfig,
};

const CARGO_PKG_VERSION: &'static str = env!("CARGO_PKG_VERSION");
const CARGO_PKG_DESCRIPTION: &'static str = env!("CARGO_PKG_DESCRIPTION");

pub fn start() {
    let matches = App::new("Flubsim")
        .version(CARGO_PKG_VERSION)
        .about(CARGO_PKG_DESCRIPTION)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("run")
                .about("Run the headless arena game with the given configs")
                .arg(
                    Arg::with_name("SIMULATION_CONFIG")
                        .help("Sets the simulation parameters")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::with_name("SCENE_CONFIG")
                        .help("Scene setup")
                        .required(true)
                        .index(2),
                )
                .arg(
                    Arg::with_name("MAX_SECONDS")
                        .long("max-seconds")
                        .short("s")
                        .required(false)
                        .takes_value(true)
                        .help("Stop the game after the given amount of simulated seconds"),
                )
                .arg(
                    Arg::with_name("STATISTICS_ENABLED")
                        .help("Track performance of individual phases")
                        .short("p")
                        .long("statistics-enabled")
                        .takes_value(false),
                )
                .arg(
                    Arg::with_name("STATISTICS_PATH")
                        .long("statistics-path")
                        .short("w")
                        .required(false)
                        .takes_value(true)
                        .help("Where to write statistics to"),
                ),
        )
        .subcommand(
            SubCommand::with_name("rest-mesh")
                .about(
                    "Relax the built-in round mesh under the spring model until its forces \
                     vanish and write the rested mesh asset to a file",
                )
                .arg(
                    Arg::with_name("OUTPUT")
                        .help("Mesh asset file to write")
                        .required(true)
                        .index(1),
                ),
        )
        .get_matches();

    if let Some(run_matches) = matches.subcommand_matches("run") {
        let parameter_file = run_matches
            .value_of("SIMULATION_CONFIG")
            .expect("missing simulation config");
        let params_yaml = std::fs::read_to_string(parameter_file).expect("failed reading parameter file");
        let simulation_params: SimulationParams =
            serde_yaml::from_str(&params_yaml).expect("failed parsing simulation config file");
        println!("{:?}", simulation_params);

        let scene_file_path = run_matches.value_of("SCENE_CONFIG").expect("missing scene config");
        let scene_yaml = std::fs::read_to_string(scene_file_path).expect("failed reading scene file");
        let scene_config: SceneConfig = serde_yaml::from_str(&scene_yaml).expect("failed parsing scene config file");
        println!("{:?}", scene_config);

        let max_seconds = run_matches.value_of("MAX_SECONDS").map(|x| x.parse::<FT>().unwrap());
        let counters_enabled = run_matches.is_present("STATISTICS_ENABLED");
        let statistics_path_opt = run_matches.value_of("STATISTICS_PATH").map(String::from);

        let simulation = game_main(simulation_params, &scene_config, max_seconds, counters_enabled);

        if counters_enabled {
            let s = write_statistics(&simulation);
            print!("{}", s);
            if let Some(statistics_path) = statistics_path_opt {
                std::fs::write(statistics_path, s).unwrap();
            }
        }
    } else if let Some(subcmd_matches) = matches.subcommand_matches("rest-mesh") {
        let output_path = subcmd_matches.value_of("OUTPUT").unwrap();
        rest_mesh_main(Path::new(output_path));
    } else {
        unreachable!()
    }
}

fn game_main(
    simulation_params: SimulationParams,
    scene_config: &SceneConfig,
    max_seconds: Option<FT>,
    counters_enabled: bool,
) -> MeshSimulation {
    let mut simulation = init_mesh_sim(simulation_params, scene_config, counters_enabled);

    let player_count = scene_config.player_count;
    let map_center = scene_config.map_center();
    let map_min = vec2f(scene_config.map_min[0], scene_config.map_min[1]);
    let map_max = vec2f(scene_config.map_max[0], scene_config.map_max[1]);

    let frame_dt: FT = 1. / 60.;
    let mut ring_radius = scene_config.ring.as_ref().map(|ring| ring.start_radius);
    let mut next_bomb_time = scene_config.bomb.as_ref().map(|bomb| bomb.period);
    let mut eliminated = vec![false; player_count];
    let mut rng = rand::thread_rng();

    let mut frame_number: usize = 0;
    let mut total_msecs = 0.;

    loop {
        let frame_started = Instant::now();
        frame_number += 1;

        // stand-in for the remote input poller: every half second each
        // surviving player picks a new random steering direction
        if frame_number % 30 == 1 {
            for player in 0..player_count {
                if !eliminated[player] {
                    let x: FT = rng.gen_range(-1.0..1.0);
                    let y: FT = rng.gen_range(-1.0..1.0);
                    simulation.inputs.set(player, vec2f(x, y), simulation.time);
                }
            }
        }

        if let (Some(ring), Some(radius)) = (scene_config.ring.as_ref(), ring_radius.as_mut()) {
            if frame_number % ring.interval_frames == 0 {
                simulation.destroy_outside_ring(map_center, *radius);
                simulation.kill_outside_borders(map_min, map_max);
            }
            *radius -= ring.shrink_rate * frame_dt;
        }

        if let (Some(bomb), Some(next_time)) = (scene_config.bomb.as_ref(), next_bomb_time.as_mut()) {
            if simulation.time >= *next_time {
                let range = ring_radius.unwrap_or((map_max - map_min).x / 2.).max(1.);
                let target = map_center + vec2f(rng.gen_range(-range..range), rng.gen_range(-range..range));
                simulation.destroy_in_radius(target, bomb.radius, simulation_params.collision_radius);
                *next_time += bomb.period;
            }
        }

        simulation.advance_frame(frame_dt, simulation_params);

        for player in 0..player_count {
            if !eliminated[player]
                && simulation.player_verts_alive[player] < simulation_params.elimination_threshold
            {
                println!("eliminated player {}", player);
                simulation.kill_player(player);
                eliminated[player] = true;
            }
        }

        total_msecs += frame_started.elapsed().as_secs_f64() * 1000.;

        if frame_number % 60 == 0 {
            let alive_verts: u32 = simulation.player_verts_alive.iter().sum();
            println!(
                "{:05}: {} players alive, {} verts alive, {:.2}msec AVG",
                frame_number,
                eliminated.iter().filter(|eliminated| !**eliminated).count(),
                alive_verts,
                total_msecs / frame_number as f64
            );
        }

        // last player standing ends the round; a single-player scene just
        // runs out its time budget
        let players_left = eliminated.iter().filter(|eliminated| !**eliminated).count();
        if players_left == 0 || (player_count > 1 && players_left == 1) {
            match eliminated.iter().position(|eliminated| !*eliminated) {
                Some(winner) => println!("player {} wins after {:.1}s", winner, simulation.time),
                None => println!("nobody survived ({:.1}s)", simulation.time),
            }
            break;
        }

        if let Some(max_seconds) = max_seconds {
            if simulation.time >= max_seconds {
                println!("time budget reached ({:.1}s)", simulation.time);
                break;
            }
        }
    }

    simulation
}

/**
 * The rounded starting mesh is hand-built and not at spring rest lengths.
 * Relax it with strong damping and no input until the summed force magnitude
 * dies down, then re-center it and save the result as the canonical asset.
 */
fn rest_mesh_main(output_path: &Path) {
    let mut simulation_params = SimulationParams::default_springs();
    simulation_params.damping = 30.;

    let mut simulation = MeshSimulation::new(
        MeshAsset::round(),
        1,
        SpringModel.into(),
        PlayerPlacement {
            center: vec2f(0., 0.),
            spread: 0.,
            scale: 1.,
        },
        Vec::new(),
        false,
    );

    let frame_dt: FT = 1. / 60.;
    let mut total_force = FT::INFINITY;
    let mut frame_number = 0usize;
    while total_force >= 1. {
        simulation.advance_frame(frame_dt, simulation_params);
        total_force = simulation
            .mesh
            .verts
            .force
            .iter()
            .map(|force| force.x.abs() + force.y.abs())
            .sum();
        frame_number += 1;
        if frame_number % 60 == 0 {
            println!("{:05}: residual force {:.3}", frame_number, total_force);
        }
        if frame_number >= 100_000 {
            println!("giving up after {} frames, residual force {:.3}", frame_number, total_force);
            break;
        }
    }

    let center = simulation.player_centers[0];
    let positions = simulation
        .mesh
        .verts
        .position
        .iter()
        .map(|position| position - center)
        .collect();

    let rested = MeshAsset {
        positions,
        links: MeshAsset::round().links,
        faces: Vec::new(),
    };
    rested
        .write_mesh_file(output_path)
        .expect("failed writing mesh asset");
    println!(
        "wrote rested mesh ({} verts, {} links) to {}",
        rested.positions.len(),
        rested.links.len(),
        output_path.display()
    );
}
