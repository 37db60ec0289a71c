//! Session and campaign tests against the bundled stage pack.

use std::path::{Path, PathBuf};

use numflow_core::direction::GridPosition;
use numflow_core::replay::{ReplayLog, replay_and_verify};
use numflow_core::report::{FailureKind, SnapshotEvent};
use numflow_session::{Campaign, SessionError, SessionState};

fn stages_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../numflow-data/stages")
}

fn rotate_all(campaign: &mut Campaign, cells: &[(i32, i32)]) {
    for &(x, y) in cells {
        assert!(campaign.session_mut().rotate(GridPosition::new(x, y)).unwrap());
    }
}

fn clear(campaign: &mut Campaign) {
    let session = campaign.session_mut();
    session.run().unwrap();
    assert_eq!(session.finish_playback(), SessionState::Success);
}

fn play_out(campaign: &mut Campaign) {
    let session = campaign.session_mut();
    session.run().unwrap();
    session.finish_playback();
}

#[test]
fn full_campaign_playthrough() {
    let mut campaign = Campaign::load(&stages_dir()).unwrap();
    assert_eq!(campaign.len(), 4);

    let solutions: [&[(i32, i32)]; 4] = [
        &[(1, 2), (3, 2)],
        &[(2, 2), (4, 2)],
        &[(3, 1), (4, 3), (1, 3)],
        &[(2, 0), (4, 4), (6, 6), (6, 6), (6, 6), (2, 1)],
    ];
    for (i, cells) in solutions.iter().enumerate() {
        assert_eq!(campaign.index(), i);
        rotate_all(&mut campaign, cells);
        clear(&mut campaign);
        if i + 1 < solutions.len() {
            campaign.advance().unwrap();
        }
    }
    assert!(campaign.is_finished());
}

#[test]
fn failed_attempt_then_retry() {
    let mut campaign = Campaign::load(&stages_dir()).unwrap();
    let session = campaign.session_mut();

    // One of the two scrambled pipes fixed: the other still blocks the flow.
    session.rotate(GridPosition::new(1, 2)).unwrap();
    let report = session.run().unwrap();
    assert_eq!(report.failure_kind(), Some(FailureKind::Disconnected));
    assert_eq!(session.finish_playback(), SessionState::Failure);
    assert!(matches!(
        campaign.advance(),
        Err(SessionError::NotCleared { .. })
    ));

    let session = campaign.session_mut();
    session.retry().unwrap();
    session.rotate(GridPosition::new(3, 2)).unwrap();
    session.run().unwrap();

    let mut last = None;
    while let Some(step) = session.next_frame() {
        last = Some(step.clone());
    }
    let last = last.unwrap();
    assert_eq!(last.signals[0].event, SnapshotEvent::Delivered);
    assert_eq!(last.signals[0].value, 4);
    assert_eq!(session.state(), SessionState::Success);
}

#[test]
fn replay_log_survives_serialization() {
    let mut campaign = Campaign::load(&stages_dir()).unwrap();
    rotate_all(&mut campaign, &[(1, 2), (3, 2)]);
    clear(&mut campaign);

    let session = campaign.session();
    let bytes = session.replay_log().serialize().unwrap();
    let restored = ReplayLog::deserialize(&bytes).unwrap();
    assert_eq!(&restored, session.replay_log());

    let result = session.verify_replay().unwrap();
    assert!(result.is_verified);
    assert_eq!(result.stage.layout_hash(), session.stage().layout_hash());
}

#[test]
fn tampered_replay_is_detected() {
    let mut campaign = Campaign::load(&stages_dir()).unwrap();
    rotate_all(&mut campaign, &[(1, 2)]);
    play_out(&mut campaign);

    let session = campaign.session();
    let mut log = session.replay_log().clone();
    log.hash_checkpoints[1].1 ^= 1;
    let result = replay_and_verify(session.stage().definition(), &log).unwrap();
    assert!(!result.is_verified);
    assert_eq!(result.first_mismatch.unwrap().command_index, 1);
}
