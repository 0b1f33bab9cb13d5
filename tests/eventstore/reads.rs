//! Range Read Tests
//!
//! Inclusive bounds, sentinels, count limits and paging across tokens.

use crate::common::*;

// ============================================================================
// Stream Reads
// ============================================================================

#[test]
fn backward_from_end_with_count() {
    let log = TestLog::new();
    log.fill("s", 5);

    let events = log
        .events
        .read_stream_backward("s", ReadFrom::End, ReadCount::Limit(2))
        .unwrap();
    assert_eq!(versions(&events), vec![5, 4]);
}

#[test]
fn backward_from_version_includes_start_bound() {
    let log = TestLog::new();
    log.fill("s", 5);

    let events = log
        .events
        .read_stream_backward("s", ReadFrom::At(3), ReadCount::All)
        .unwrap();
    assert_eq!(versions(&events), vec![3, 2, 1]);

    let one = log
        .events
        .read_stream_backward("s", ReadFrom::At(3), ReadCount::Limit(1))
        .unwrap();
    assert_eq!(versions(&one), vec![3]);
}

#[test]
fn forward_from_version_includes_start_bound() {
    let log = TestLog::new();
    log.fill("s", 5);

    let events = log
        .events
        .read_stream_forward("s", ReadFrom::At(4), ReadCount::All)
        .unwrap();
    assert_eq!(versions(&events), vec![4, 5]);
}

#[test]
fn bound_past_the_end_is_empty() {
    let log = TestLog::new();
    log.fill("s", 3);

    assert!(log
        .events
        .read_stream_forward("s", ReadFrom::At(4), ReadCount::All)
        .unwrap()
        .is_empty());

    let back = log
        .events
        .read_stream_backward("s", ReadFrom::At(100), ReadCount::All)
        .unwrap();
    assert_eq!(versions(&back), vec![3, 2, 1]);
}

#[test]
fn streams_do_not_leak_into_each_other() {
    let log = TestLog::new();
    log.fill("a", 3);
    log.fill("b", 2);

    let b = log
        .events
        .read_stream_forward("b", ReadFrom::Start, ReadCount::All)
        .unwrap();
    assert_eq!(b.len(), 2);
    assert!(b.iter().all(|e| e.stream_id == "b"));
}

// ============================================================================
// Count Sentinels
// ============================================================================

#[test]
fn zero_count_is_zero_items_not_unbounded() {
    let log = TestLog::new();
    log.fill("s", 5);

    for events in [
        log.events.read_stream_forward("s", ReadFrom::Start, ReadCount::Limit(0)),
        log.events.read_stream_backward("s", ReadFrom::End, ReadCount::Limit(0)),
        log.events.read_all_forward(ReadFrom::Start, ReadCount::Limit(0)),
        log.events.read_all_backward(ReadFrom::End, ReadCount::Limit(0)),
    ] {
        assert!(events.unwrap().is_empty());
    }
}

#[test]
fn raw_sentinels_convert() {
    let log = TestLog::new();
    log.fill("s", 4);

    let from = ReadFrom::from_raw(streamlog::core::POSITION_END).unwrap();
    let count = ReadCount::from_raw(streamlog::core::COUNT_ALL).unwrap();
    let events = log.events.read_stream_backward("s", from, count).unwrap();
    assert_eq!(versions(&events), vec![4, 3, 2, 1]);

    let none = ReadCount::from_raw(0).unwrap();
    assert!(log
        .events
        .read_stream_backward("s", from, none)
        .unwrap()
        .is_empty());
}

#[test]
fn count_larger_than_stream() {
    let log = TestLog::new();
    log.fill("s", 3);
    let events = log
        .events
        .read_stream_forward("s", ReadFrom::Start, ReadCount::Limit(50))
        .unwrap();
    assert_eq!(events.len(), 3);
}

// ============================================================================
// Global Reads
// ============================================================================

#[test]
fn global_reads_follow_positions() {
    let log = TestLog::new();
    for v in 1..=4 {
        log.events.append("a", v, "T", vec![]).unwrap();
        log.events.append("b", v, "T", vec![]).unwrap();
    }

    let fwd = log
        .events
        .read_all_forward(ReadFrom::At(3), ReadCount::Limit(3))
        .unwrap();
    assert_eq!(positions(&fwd), vec![3, 4, 5]);

    let back = log
        .events
        .read_all_backward(ReadFrom::At(3), ReadCount::All)
        .unwrap();
    assert_eq!(positions(&back), vec![3, 2, 1]);
}

#[test]
fn empty_log_reads_are_empty() {
    let log = TestLog::new();
    assert!(log
        .events
        .read_all_forward(ReadFrom::Start, ReadCount::All)
        .unwrap()
        .is_empty());
    assert!(log
        .events
        .read_stream_backward("nothing", ReadFrom::End, ReadCount::All)
        .unwrap()
        .is_empty());
    assert_eq!(log.events.last_position().unwrap(), None);
}

// ============================================================================
// Paging
// ============================================================================

#[test]
fn reads_span_many_pages() {
    let log = TestLog::with_page_size(3);
    log.fill("s", 20);

    let all = log
        .events
        .read_all_forward(ReadFrom::Start, ReadCount::All)
        .unwrap();
    assert_eq!(positions(&all), (1..=20).collect::<Vec<_>>());

    let some = log
        .events
        .read_stream_backward("s", ReadFrom::At(17), ReadCount::Limit(7))
        .unwrap();
    assert_eq!(versions(&some), (11..=17).rev().collect::<Vec<_>>());
}

#[test]
fn lazy_iteration_matches_eager_read() {
    let log = TestLog::with_page_size(4);
    log.fill("s", 13);

    let eager = log
        .events
        .read_all_backward(ReadFrom::End, ReadCount::All)
        .unwrap();
    let lazy: Vec<Event> = log
        .events
        .all_backward(ReadFrom::End, ReadCount::All)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(eager, lazy);
}

#[test]
fn lazy_iterators_are_independent() {
    let log = TestLog::with_page_size(2);
    log.fill("s", 6);

    let mut first = log.events.stream_forward("s", ReadFrom::Start, ReadCount::All).unwrap();
    let mut second = log.events.stream_forward("s", ReadFrom::Start, ReadCount::All).unwrap();

    assert_eq!(first.next().unwrap().unwrap().version, 1);
    assert_eq!(first.next().unwrap().unwrap().version, 2);
    assert_eq!(first.next().unwrap().unwrap().version, 3);
    assert_eq!(second.next().unwrap().unwrap().version, 1);
    assert_eq!(first.count(), 3);
    assert_eq!(second.count(), 5);
}

#[test]
fn lazy_iterator_sees_events_appended_while_paging() {
    let log = TestLog::with_page_size(2);
    log.fill("s", 3);

    let mut pages = log.events.all_forward(ReadFrom::Start, ReadCount::All);
    assert_eq!(pages.next().unwrap().unwrap().global_position, 1);

    // The next page is only fetched once the first is drained
    log.events.append("s", 4, "T", vec![]).unwrap();
    let rest: Vec<u64> = pages.map(|e| e.unwrap().global_position).collect();
    assert_eq!(rest, vec![2, 3, 4]);
}
