//! Change Feed Relay Tests
//!
//! Appends flow from the store's change feed onto queues.

use crate::common::*;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use streamlog::relay::{ChangeRelay, EventMessage, MemoryQueue, RelayConfig};

/// Relay everything on the feed after `after`; returns the new high-water mark
fn pump(log: &TestLog, relay: &ChangeRelay<MemoryQueue>, after: u64) -> u64 {
    let records = log.store.changes_since(after, usize::MAX);
    relay.handle(&records).unwrap();
    records.last().map_or(after, |r| r.sequence)
}

fn relay(queues: &[&str]) -> ChangeRelay<MemoryQueue> {
    let config = RelayConfig {
        queues: queues.iter().map(|q| q.to_string()).collect(),
        ..RelayConfig::default()
    };
    ChangeRelay::from_config(MemoryQueue::with_queues(queues), &config)
}

#[test]
fn appends_are_relayed_to_every_queue() {
    let log = TestLog::new();
    let relay = relay(&["orders", "audit"]);

    log.fill("order-1", 2);
    log.fill("order-2", 1);
    pump(&log, &relay, 0);

    for queue in ["orders", "audit"] {
        let messages = relay.publisher().messages(queue);
        assert_eq!(messages.len(), 3, "queue {}", queue);
        let groups: Vec<_> = messages.iter().map(|m| m.group_id.as_str()).collect();
        assert_eq!(groups, vec!["order-1", "order-1", "order-2"]);
    }
}

#[test]
fn counter_updates_are_not_relayed() {
    let log = TestLog::new();
    let relay = relay(&["orders"]);

    log.fill("s", 3);
    // Three event inserts plus the counter writes
    assert!(log.store.changes_since(0, usize::MAX).len() > 3);

    pump(&log, &relay, 0);
    assert_eq!(relay.publisher().messages("orders").len(), 3);
}

#[test]
fn bodies_decode_to_committed_events() {
    let log = TestLog::new();
    let relay = relay(&["orders"]);
    log.events.append("s", 1, "Placed", b"payload".to_vec()).unwrap();
    pump(&log, &relay, 0);

    let stored = log.events.stream_head("s").unwrap().unwrap();
    let messages = relay.publisher().messages("orders");
    assert_eq!(EventMessage::decode(&messages[0].body).unwrap(), stored);
}

#[test]
fn relay_resumes_from_high_water_mark() {
    let log = TestLog::new();
    let relay = relay(&["orders"]);

    log.fill("s", 2);
    let mark = pump(&log, &relay, 0);
    log.events.append("s", 3, "T", vec![]).unwrap();
    pump(&log, &relay, mark);

    let versions: Vec<u64> = relay
        .publisher()
        .messages("orders")
        .iter()
        .map(|m| EventMessage::decode(&m.body).unwrap().version)
        .collect();
    assert_eq!(versions, vec![1, 2, 3]);
}

#[test]
fn rejected_appends_produce_no_messages() {
    let log = TestLog::new();
    let relay = relay(&["orders"]);
    log.fill("s", 1);
    assert!(log.events.append("s", 1, "T", vec![]).is_err());
    pump(&log, &relay, 0);
    assert_eq!(relay.publisher().messages("orders").len(), 1);
}

#[test]
fn relay_running_alongside_appends_misses_nothing() {
    let log = TestLog::new();
    let relay = relay(&["orders"]);
    let writers = 4;
    let per_writer = 200;
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        let pumper = s.spawn(|| {
            let mut mark = 0;
            loop {
                let finished = done.load(Ordering::Acquire);
                mark = pump(&log, &relay, mark);
                log.store.trim_through(mark);
                if finished {
                    break;
                }
            }
        });

        let appenders: Vec<_> = (0..writers)
            .map(|w| {
                let log = &log;
                s.spawn(move || log.fill(&format!("stream-{}", w), per_writer))
            })
            .collect();
        for a in appenders {
            a.join().unwrap();
        }
        done.store(true, Ordering::Release);
        pumper.join().unwrap();
    });

    let relayed: Vec<(String, u64)> = relay
        .publisher()
        .messages("orders")
        .iter()
        .map(|m| {
            let event = EventMessage::decode(&m.body).unwrap();
            (event.stream_id, event.version)
        })
        .collect();
    let unique: BTreeSet<_> = relayed.iter().cloned().collect();
    assert_eq!(relayed.len(), writers * per_writer as usize);
    assert_eq!(unique.len(), relayed.len());
    assert_eq!(log.store.feed_len(), 0);
}
