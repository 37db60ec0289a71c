//! Headless runner: plays through the bundled stage pack, applies each known
//! solution, prints the playback and verifies determinism and replays.
//!
//! Run with: `RUST_LOG=debug cargo run --package numflow-session --example headless_runner`

use std::path::Path;

use numflow_core::direction::GridPosition;
use numflow_core::engine::SimulationEngine;
use numflow_core::report::SnapshotEvent;
use numflow_core::validation::validate_determinism;
use numflow_session::{Campaign, SessionState};
use tracing_subscriber::EnvFilter;

fn solution(id: &str) -> &'static [(i32, i32)] {
    match id {
        "stage001" => &[(1, 2), (3, 2)],
        "stage002" => &[(2, 2), (4, 2)],
        "stage003" => &[(3, 1), (4, 3), (1, 3)],
        "stage004" => &[(2, 0), (4, 4), (6, 6), (6, 6), (6, 6), (2, 1)],
        _ => &[],
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,numflow_session=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let stages_dir = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../numflow-data/stages"));
    let mut campaign = Campaign::load(stages_dir).expect("failed to load stage pack");
    println!("Stages: {}\n", campaign.len());

    loop {
        let id = campaign.current_id().to_string();
        let session = campaign.session_mut();
        println!("--- {id}: {} ---", session.stage().name());

        // As authored.
        let report = session.run().expect("authored stage aborted");
        println!("    As authored: {}", report.reason());
        session.finish_playback();
        session.retry().expect("retry after verdict");

        for &(x, y) in solution(&id) {
            session
                .rotate(GridPosition::new(x, y))
                .expect("rotation while idle");
        }

        session.run().expect("solved stage aborted");
        let mut frame = 0;
        while let Some(step) = session.next_frame() {
            frame += 1;
            let cells: Vec<String> = step
                .signals
                .iter()
                .map(|s| match s.event {
                    SnapshotEvent::Delivered => format!("{}=>{}", s.position, s.value),
                    _ => format!("{}:{}", s.position, s.value),
                })
                .collect();
            println!("      [{frame:>3}] {}", cells.join("  "));
        }
        println!("    Solved: {:?}", session.state());
        if session.state() != SessionState::Success {
            std::process::exit(1);
        }

        // Determinism and replay checks.
        let check = validate_determinism(&SimulationEngine::default(), session.stage())
            .expect("determinism check aborted");
        let replay = session.verify_replay().expect("stage rebuild failed");
        if check.is_deterministic && replay.is_verified {
            println!(
                "    Determinism: PASS (hash {:#018x}), replay: PASS ({} commands)",
                check.hashes.0, replay.commands_executed
            );
        } else {
            println!("    Determinism or replay FAILED: {check:?} {:?}", replay.first_mismatch);
            std::process::exit(1);
        }
        println!();

        if campaign.is_finished() {
            break;
        }
        campaign.advance().expect("advance after success");
    }

    println!("All {} stages cleared.", campaign.len());
}
