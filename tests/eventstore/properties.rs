//! Property Tests
//!
//! Read-window symmetry and stream ordering over arbitrary logs.

use crate::common::*;
use proptest::prelude::*;

/// Build a log from a list of stream picks; returns events per stream
fn build(picks: &[u8], page_size: usize) -> (TestLog, Vec<u64>) {
    let log = TestLog::with_page_size(page_size);
    let mut next = vec![1u64; 4];
    for &pick in picks {
        let s = (pick % 4) as usize;
        log.events
            .append(&format!("s{}", s), next[s], "T", vec![pick])
            .unwrap();
        next[s] += 1;
    }
    (log, next.into_iter().map(|n| n - 1).collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn forward_then_backward_window_is_reversed(
        picks in proptest::collection::vec(any::<u8>(), 1..40),
        page_size in 1usize..8,
        start_seed in any::<usize>(),
        count_seed in any::<usize>(),
    ) {
        let (log, _) = build(&picks, page_size);

        // A window that lies inside the log
        let len = picks.len();
        let start = 1 + start_seed % len;
        let count = 1 + count_seed % (len - start + 1);

        let fwd = log.events.read_all_forward(ReadFrom::At(start as u64), ReadCount::Limit(count)).unwrap();
        prop_assert_eq!(fwd.len(), count);

        let end = (start + count - 1) as u64;
        let mut back = log.events.read_all_backward(ReadFrom::At(end), ReadCount::Limit(count)).unwrap();
        back.reverse();
        prop_assert_eq!(fwd, back);
    }

    #[test]
    fn each_stream_reads_back_one_to_n(
        picks in proptest::collection::vec(any::<u8>(), 0..40),
        page_size in 1usize..8,
    ) {
        let (log, counts) = build(&picks, page_size);

        for (s, n) in counts.iter().enumerate() {
            let events = log
                .events
                .read_stream_forward(&format!("s{}", s), ReadFrom::Start, ReadCount::All)
                .unwrap();
            prop_assert_eq!(versions(&events), (1..=*n).collect::<Vec<_>>());

            let back = log
                .events
                .read_stream_backward(&format!("s{}", s), ReadFrom::End, ReadCount::All)
                .unwrap();
            prop_assert_eq!(versions(&back), (1..=*n).rev().collect::<Vec<_>>());
        }

        let all = log.events.read_all_forward(ReadFrom::Start, ReadCount::All).unwrap();
        prop_assert_eq!(positions(&all), (1..=picks.len() as u64).collect::<Vec<_>>());
    }

    #[test]
    fn limited_reads_are_prefixes(
        picks in proptest::collection::vec(any::<u8>(), 0..30),
        page_size in 1usize..6,
        count in 0usize..35,
    ) {
        let (log, _) = build(&picks, page_size);

        let all = log.events.read_all_backward(ReadFrom::End, ReadCount::All).unwrap();
        let some = log.events.read_all_backward(ReadFrom::End, ReadCount::Limit(count)).unwrap();
        prop_assert_eq!(some.len(), count.min(all.len()));
        prop_assert_eq!(&all[..some.len()], &some[..]);
    }
}
