//! Tests against the bundled stage pack.

use numflow_core::direction::GridPosition;
use numflow_core::engine::SimulationEngine;
use numflow_core::report::{DisconnectCause, Failure};
use numflow_data::{load_stage_pack, StagePack};
use std::path::PathBuf;

fn pack_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("stages")
}

fn pack() -> StagePack {
    load_stage_pack(&pack_dir()).unwrap()
}

fn solution(id: &str) -> Vec<GridPosition> {
    let cells: &[(i32, i32)] = match id {
        "stage001" => &[(1, 2), (3, 2)],
        "stage002" => &[(2, 2), (4, 2)],
        "stage003" => &[(3, 1), (4, 3), (1, 3)],
        "stage004" => &[(2, 0), (4, 4), (6, 6), (6, 6), (6, 6), (2, 1)],
        other => panic!("no solution recorded for {other}"),
    };
    cells.iter().map(|&(x, y)| GridPosition::new(x, y)).collect()
}

#[test]
fn pack_loads_in_order() {
    let pack = pack();
    assert_eq!(
        pack.catalog.ids().collect::<Vec<_>>(),
        vec!["stage001", "stage002", "stage003", "stage004"]
    );
    assert_eq!(pack.config.max_steps, 1000);
}

#[test]
fn every_stage_starts_unsolved() {
    let pack = pack();
    let engine = SimulationEngine::new(pack.config.clone());
    for id in pack.catalog.ids() {
        let stage = pack.catalog.build(id).unwrap().unwrap();
        let report = engine.run(&stage).unwrap();
        assert!(!report.is_clear(), "{id} is already solved as authored");
    }
}

#[test]
fn every_stage_is_solvable() {
    let pack = pack();
    let engine = SimulationEngine::new(pack.config.clone());
    for id in pack.catalog.ids() {
        let mut stage = pack.catalog.build(id).unwrap().unwrap();
        for cell in solution(id) {
            assert!(stage.rotate(cell), "{id}: {cell:?} is not rotatable");
        }
        let report = engine.run(&stage).unwrap();
        assert!(report.is_clear(), "{id}: {}", report.reason());
    }
}

#[test]
fn first_stage_disconnects_at_the_first_hop() {
    let pack = pack();
    let stage = pack.catalog.build("stage001").unwrap().unwrap();
    let report = SimulationEngine::default().run(&stage).unwrap();
    assert_eq!(
        report.failure,
        Some(Failure::Disconnected {
            position: GridPosition::new(0, 1),
            cause: DisconnectCause::MissingTile,
        })
    );
}

#[test]
fn split_stage_delivers_both_targets() {
    let pack = pack();
    let mut stage = pack.catalog.build("stage003").unwrap().unwrap();
    for cell in solution("stage003") {
        stage.rotate(cell);
    }
    let report = SimulationEngine::default().run(&stage).unwrap();
    assert_eq!(report.reached[&GridPosition::new(7, 3)], 16);
    assert_eq!(report.reached[&GridPosition::new(-1, 3)], 4);
}

#[test]
fn long_stage_arithmetic() {
    let pack = pack();
    let mut stage = pack.catalog.build("stage004").unwrap().unwrap();
    for cell in solution("stage004") {
        stage.rotate(cell);
    }
    let report = SimulationEngine::default().run(&stage).unwrap();
    assert!(report.is_clear(), "{}", report.reason());
    assert_eq!(report.steps, 14);

    let values: Vec<i64> = report
        .log
        .steps()
        .iter()
        .flat_map(|step| step.signals.iter())
        .filter(|s| s.operator_label().is_some_and(|l| !l.is_empty()))
        .map(|s| s.value)
        .collect();
    assert_eq!(values, vec![15, 17, 7, 4, 7]);
}

#[test]
fn fixed_tiles_refuse_rotation() {
    let pack = pack();
    let mut stage = pack.catalog.build("stage001").unwrap().unwrap();
    assert!(!stage.rotate(GridPosition::new(0, 2)));
    assert!(!stage.rotate(GridPosition::new(4, 2)));
}
