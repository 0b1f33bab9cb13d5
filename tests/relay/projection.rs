//! Projection Tests
//!
//! Catch-up projection with persisted checkpoints.

use crate::common::*;
use streamlog::relay::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore, Projector};

#[test]
fn projection_sees_every_event_once_across_runs() {
    let log = TestLog::with_page_size(3);
    log.fill("a", 4);
    log.fill("b", 3);

    let projector = Projector::new(log.events.clone(), MemoryCheckpointStore::new(), "totals")
        .with_batch_size(2);

    let mut seen = Vec::new();
    projector
        .run(|e| {
            seen.push(e.global_position);
            Ok::<_, String>(())
        })
        .unwrap();

    log.fill("c", 2);
    projector
        .run(|e| {
            seen.push(e.global_position);
            Ok::<_, String>(())
        })
        .unwrap();

    assert_eq!(seen, (1..=9).collect::<Vec<_>>());
}

#[test]
fn file_checkpoint_survives_new_projector() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checkpoints.json");
    let log = TestLog::new();
    log.fill("s", 5);

    let first = Projector::new(log.events.clone(), FileCheckpointStore::new(&path), "audit");
    assert_eq!(first.run(|_| Ok::<_, String>(())).unwrap(), 5);

    log.fill("t", 2);
    let second = Projector::new(log.events.clone(), FileCheckpointStore::new(&path), "audit");
    let mut seen = Vec::new();
    second
        .run(|e| {
            seen.push((e.stream_id.clone(), e.version));
            Ok::<_, String>(())
        })
        .unwrap();
    assert_eq!(seen, vec![("t".to_string(), 1), ("t".to_string(), 2)]);

    let cp = FileCheckpointStore::new(&path)
        .load_checkpoint("audit")
        .unwrap()
        .unwrap();
    assert_eq!(cp.position, 7);
}

#[test]
fn consumers_keep_separate_checkpoints() {
    let log = TestLog::new();
    log.fill("s", 4);
    let checkpoints = std::sync::Arc::new(MemoryCheckpointStore::new());

    let fast = Projector::new(log.events.clone(), checkpoints.clone(), "fast");
    fast.run(|_| Ok::<_, String>(())).unwrap();

    let slow = Projector::new(log.events.clone(), checkpoints.clone(), "slow").with_batch_size(1);
    let err = slow
        .run(|e| {
            if e.version == 3 {
                Err("not yet")
            } else {
                Ok(())
            }
        })
        .unwrap_err();
    assert!(err.to_string().contains("not yet"));

    assert_eq!(checkpoints.load_checkpoint("fast").unwrap().unwrap().position, 4);
    assert_eq!(checkpoints.load_checkpoint("slow").unwrap().unwrap().position, 2);
}
