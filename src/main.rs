//! Billiards IK headless driver
//!
//! Usage: `billiards-ik [config.json] [frames]`
//!
//! Runs the simulation at a fixed 60 Hz frame rate, sweeps the cue down
//! toward the table for the first second, and logs ball and end-effector
//! state once per simulated second. Set `RUST_LOG=info` (or `debug`) to see
//! the output.

use std::process::ExitCode;

use billiards_ik::SimConfig;
use billiards_ik::sim::{Simulation, TickInput};
use glam::DVec3;

const FRAME_DT: f32 = 1.0 / 60.0;
const DEFAULT_FRAMES: u64 = 600;

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Billiards IK (native) starting...");

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => match SimConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Failed to load {path}: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => {
            log::info!("Using default config");
            SimConfig::default()
        }
    };
    let frames = match args.next().map(|s| s.parse::<u64>()) {
        Some(Ok(n)) => n,
        Some(Err(e)) => {
            log::error!("Invalid frame count: {e}");
            return ExitCode::FAILURE;
        }
        None => DEFAULT_FRAMES,
    };

    let mut sim = match Simulation::new(&config) {
        Ok(sim) => sim,
        Err(e) => {
            log::error!("Failed to build rig: {e}");
            return ExitCode::FAILURE;
        }
    };

    sim.start_reach(DVec3::new(0.0, -0.5, -0.5), 1.0);
    let input = TickInput::default();
    let mut fallbacks = 0;

    for frame in 0..frames {
        let report = sim.frame(FRAME_DT, &input);
        if report.ik.is_some_and(|step| step.fallback) {
            fallbacks += 1;
        }

        if frame % 60 == 59 {
            let tip = sim.end_effector_position();
            log::info!(
                "t={:.1}s cue tip ({:.3}, {:.3}, {:.3})",
                (frame + 1) as f32 * FRAME_DT,
                tip.x,
                tip.y,
                tip.z
            );
            for ball in sim.balls() {
                log::info!(
                    "  ball {} pos ({:.3}, {:.3}) speed {:.3}",
                    ball.id,
                    ball.position.x,
                    ball.position.z,
                    ball.speed()
                );
            }
        }
    }

    log::info!(
        "Ran {frames} frames; theta {:?}; {fallbacks} IK fallbacks",
        sim.solver().theta()
    );
    ExitCode::SUCCESS
}
