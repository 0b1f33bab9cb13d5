//! Concurrency Tests
//!
//! Many uncoordinated writers against one store. Positions must come out
//! unique and gap-free; each stream version must be won by exactly one
//! writer.

use crate::common::*;
use rand::Rng;
use std::collections::HashSet;
use std::thread;

#[test]
fn two_writers_on_new_streams_get_consecutive_positions() {
    let log = TestLog::new();
    let (a, b) = thread::scope(|s| {
        let a = s.spawn(|| log.events.append("first", 1, "T", vec![]).unwrap());
        let b = s.spawn(|| log.events.append("second", 1, "T", vec![]).unwrap());
        (a.join().unwrap(), b.join().unwrap())
    });

    assert_ne!(a, b);
    let mut both = [a, b];
    both.sort_unstable();
    assert_eq!(both, [1, 2]);
}

#[test]
fn concurrent_appends_are_gap_free() {
    let log = TestLog::new();
    let threads = 8;
    let per_thread = 40;

    let positions: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let events = log.events.clone();
                s.spawn(move || {
                    let stream = format!("stream-{}", t);
                    (1..=per_thread)
                        .map(|v| events.append(&stream, v, "T", vec![]).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let total = threads * per_thread;
    let unique: HashSet<u64> = positions.iter().copied().collect();
    assert_eq!(unique.len(), total as usize);
    assert_eq!(unique, (1..=total).collect::<HashSet<_>>());

    // The global index agrees with what the writers were told
    let all = log
        .events
        .read_all_forward(ReadFrom::Start, ReadCount::All)
        .unwrap();
    assert_eq!(all.len(), total as usize);
    assert!(all.windows(2).all(|w| w[0].global_position + 1 == w[1].global_position));
}

#[test]
fn contended_version_has_exactly_one_winner() {
    let log = TestLog::new();
    let writers = 10;

    for round in 1..=5u64 {
        let results: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..writers)
                .map(|w| {
                    let events = log.events.clone();
                    s.spawn(move || events.append("hot", round, &format!("writer-{}", w), vec![]))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "round {}", round);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.is_conflict()));
    }

    let stream = log
        .events
        .read_stream_forward("hot", ReadFrom::Start, ReadCount::All)
        .unwrap();
    assert_eq!(versions(&stream), vec![1, 2, 3, 4, 5]);
}

#[test]
fn optimistic_retry_loop_converges() {
    let log = TestLog::with_page_size(7);
    let writers = 6;
    let per_writer = 15;

    thread::scope(|s| {
        for w in 0..writers {
            let events = log.events.clone();
            s.spawn(move || {
                let mut rng = rand::thread_rng();
                for i in 0..per_writer {
                    loop {
                        let version = events.next_version("shared").unwrap();
                        match events.append("shared", version, "T", vec![w as u8, i as u8]) {
                            Ok(_) => break,
                            Err(e) if e.is_conflict() => {
                                if rng.gen_bool(0.5) {
                                    thread::yield_now();
                                }
                            }
                            Err(e) => panic!("unexpected error: {}", e),
                        }
                    }
                }
            });
        }
    });

    let stream = log
        .events
        .read_stream_forward("shared", ReadFrom::Start, ReadCount::All)
        .unwrap();
    let total = writers * per_writer;
    assert_eq!(versions(&stream), (1..=total as u64).collect::<Vec<_>>());

    // Positions are unique even where conflicts burned some
    let unique: HashSet<u64> = positions(&stream).into_iter().collect();
    assert_eq!(unique.len(), total);
}

#[test]
fn readers_run_alongside_writers() {
    let log = TestLog::with_page_size(5);
    log.fill("s", 10);

    thread::scope(|s| {
        let events = log.events.clone();
        s.spawn(move || {
            for v in 11..=60 {
                events.append("s", v, "T", vec![]).unwrap();
            }
        });

        for _ in 0..20 {
            let read = log
                .events
                .read_stream_forward("s", ReadFrom::Start, ReadCount::All)
                .unwrap();
            assert!(read.len() >= 10);
            assert_eq!(versions(&read), (1..=read.len() as u64).collect::<Vec<_>>());
        }
    });
}
