//! Range Query Engine
//!
//! Four reads, each an inclusive, ordered scan:
//!
//! | Read | Scans | Bound from `At(n)` |
//! |------|-------|--------------------|
//! | stream forward | table partition, by version | `version >= n` |
//! | stream backward | table partition, by version | `version <= n` |
//! | all forward | position index, by position | `position >= n` |
//! | all backward | position index, by position | `position <= n` |
//!
//! `Start` is unbounded going forward and empty going backward; `End` is the
//! reverse. Each read pages through the store with an explicit loop over
//! continuation tokens and stops as soon as the count is met. [`EventPages`]
//! is the lazy form: it fetches one page at a time as the caller iterates.

use std::collections::VecDeque;
use std::sync::Arc;
use streamlog_core::codec::{self, ACTIVE};
use streamlog_core::{
    AttributeValue, ContinuationToken, Direction, Error, Event, EventStoreConfig, Item,
    KeyRangeStore, QueryRequest, ReadCount, ReadFrom, RequestOptions, Result, SortBound,
};
use tracing::trace;

/// Executes paged range reads over the event table and position index
pub struct RangeQueryEngine<S: ?Sized> {
    store: Arc<S>,
    event_table: String,
    position_index: String,
    options: RequestOptions,
}

impl<S: KeyRangeStore + ?Sized> RangeQueryEngine<S> {
    /// Create a query engine over the configured event table
    pub fn new(store: Arc<S>, config: &EventStoreConfig) -> Self {
        Self {
            store,
            event_table: config.event_table.clone(),
            position_index: config.position_index.clone(),
            options: RequestOptions::with_timeout(config.request_timeout()),
        }
    }

    /// Events of one stream with `version >= from`, ascending
    pub fn read_stream_forward(
        &self,
        stream_id: &str,
        from: ReadFrom,
        count: ReadCount,
    ) -> Result<Vec<Event>> {
        let scan = self.stream_scan(stream_id, from, Direction::Forward)?;
        self.collect(scan, count)
    }

    /// Events of one stream with `version <= from`, descending
    pub fn read_stream_backward(
        &self,
        stream_id: &str,
        from: ReadFrom,
        count: ReadCount,
    ) -> Result<Vec<Event>> {
        let scan = self.stream_scan(stream_id, from, Direction::Backward)?;
        self.collect(scan, count)
    }

    /// All events with `global_position >= from`, ascending
    pub fn read_all_forward(&self, from: ReadFrom, count: ReadCount) -> Result<Vec<Event>> {
        self.collect(self.global_scan(from, Direction::Forward), count)
    }

    /// All events with `global_position <= from`, descending
    pub fn read_all_backward(&self, from: ReadFrom, count: ReadCount) -> Result<Vec<Event>> {
        self.collect(self.global_scan(from, Direction::Backward), count)
    }

    /// Lazy form of [`read_stream_forward`](Self::read_stream_forward)
    pub fn stream_forward(
        &self,
        stream_id: &str,
        from: ReadFrom,
        count: ReadCount,
    ) -> Result<EventPages<S>> {
        let scan = self.stream_scan(stream_id, from, Direction::Forward)?;
        Ok(EventPages::new(Arc::clone(&self.store), scan, count))
    }

    /// Lazy form of [`read_stream_backward`](Self::read_stream_backward)
    pub fn stream_backward(
        &self,
        stream_id: &str,
        from: ReadFrom,
        count: ReadCount,
    ) -> Result<EventPages<S>> {
        let scan = self.stream_scan(stream_id, from, Direction::Backward)?;
        Ok(EventPages::new(Arc::clone(&self.store), scan, count))
    }

    /// Lazy form of [`read_all_forward`](Self::read_all_forward)
    pub fn all_forward(&self, from: ReadFrom, count: ReadCount) -> EventPages<S> {
        EventPages::new(
            Arc::clone(&self.store),
            self.global_scan(from, Direction::Forward),
            count,
        )
    }

    /// Lazy form of [`read_all_backward`](Self::read_all_backward)
    pub fn all_backward(&self, from: ReadFrom, count: ReadCount) -> EventPages<S> {
        EventPages::new(
            Arc::clone(&self.store),
            self.global_scan(from, Direction::Backward),
            count,
        )
    }

    fn stream_scan(
        &self,
        stream_id: &str,
        from: ReadFrom,
        direction: Direction,
    ) -> Result<Option<QueryRequest>> {
        if stream_id.is_empty() {
            return Err(Error::InvalidArgument("stream id must not be empty".into()));
        }
        let request = QueryRequest::new(
            self.event_table.clone(),
            AttributeValue::S(stream_id.to_string()),
        );
        Ok(self.scan(request, from, direction))
    }

    fn global_scan(&self, from: ReadFrom, direction: Direction) -> Option<QueryRequest> {
        let request = QueryRequest::new(self.event_table.clone(), AttributeValue::N(ACTIVE))
            .index(self.position_index.clone());
        self.scan(request, from, direction)
    }

    /// Apply bound and direction; `None` if the range is empty
    fn scan(
        &self,
        request: QueryRequest,
        from: ReadFrom,
        direction: Direction,
    ) -> Option<QueryRequest> {
        let bound = sort_bound(from, direction)?;
        Some(
            request
                .bound(bound)
                .direction(direction)
                .options(self.options),
        )
    }

    /// Page through a scan until it is exhausted or `count` rows are held
    fn collect(&self, scan: Option<QueryRequest>, count: ReadCount) -> Result<Vec<Event>> {
        let scan = match scan {
            Some(scan) if !count.is_satisfied_by(0) => scan,
            _ => return Ok(Vec::new()),
        };

        let mut rows: Vec<Item> = Vec::new();
        let mut token: Option<ContinuationToken> = None;
        loop {
            let request = scan
                .clone()
                .limit(count.remaining(rows.len()))
                .start_after(token.take());
            let page = self.store.query(request)?;
            trace!(
                table = %scan.table,
                index = ?scan.index,
                rows = page.items.len(),
                "fetched page"
            );
            rows.extend(page.items);
            token = page.continuation;

            if token.is_none() || count.is_satisfied_by(rows.len()) {
                break;
            }
        }

        if let Some(limit) = count.limit() {
            rows.truncate(limit);
        }
        rows.iter().map(codec::decode).collect()
    }
}

/// Inclusive sort bound for a read, `None` if nothing can match
///
/// The outer `Option` is emptiness; the inner one is "unbounded".
fn sort_bound(from: ReadFrom, direction: Direction) -> Option<Option<SortBound>> {
    match (from, direction) {
        (ReadFrom::Start, Direction::Forward) | (ReadFrom::End, Direction::Backward) => Some(None),
        (ReadFrom::End, Direction::Forward) | (ReadFrom::Start, Direction::Backward) => None,
        (ReadFrom::At(n), Direction::Forward) => {
            // Nothing is stored above i64::MAX
            i64::try_from(n).ok().map(|n| Some(SortBound::AtLeast(n)))
        }
        (ReadFrom::At(n), Direction::Backward) => {
            Some(Some(SortBound::AtMost(i64::try_from(n).unwrap_or(i64::MAX))))
        }
    }
}

/// Lazy, page-at-a-time sequence of events
///
/// Each call on the query engine starts an independent sequence; nothing is
/// shared between iterators. A store or decode error is yielded once and
/// ends the sequence.
pub struct EventPages<S: ?Sized> {
    store: Arc<S>,
    scan: Option<QueryRequest>,
    count: ReadCount,
    buffer: VecDeque<Item>,
    token: Option<ContinuationToken>,
    yielded: usize,
    pages: usize,
}

impl<S: KeyRangeStore + ?Sized> EventPages<S> {
    fn new(store: Arc<S>, scan: Option<QueryRequest>, count: ReadCount) -> Self {
        Self {
            store,
            scan,
            count,
            buffer: VecDeque::new(),
            token: None,
            yielded: 0,
            pages: 0,
        }
    }

    /// Store round trips made so far
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    fn fetch(&mut self) -> Result<()> {
        let scan = match &self.scan {
            Some(scan) => scan,
            None => return Ok(()),
        };
        let request = scan
            .clone()
            .limit(self.count.remaining(self.yielded))
            .start_after(self.token.take());

        let page = self.store.query(request)?;
        self.pages += 1;
        trace!(
            table = %scan.table,
            index = ?scan.index,
            rows = page.items.len(),
            page = self.pages,
            "fetched page"
        );

        self.buffer.extend(page.items);
        self.token = page.continuation;
        if self.token.is_none() {
            self.scan = None;
        }
        Ok(())
    }

    fn finish(&mut self) {
        self.scan = None;
        self.buffer.clear();
    }
}

impl<S: KeyRangeStore + ?Sized> Iterator for EventPages<S> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.count.is_satisfied_by(self.yielded) {
                return None;
            }
            if let Some(item) = self.buffer.pop_front() {
                self.yielded += 1;
                let event = codec::decode(&item);
                if event.is_err() {
                    self.finish();
                }
                return Some(event);
            }
            self.scan.as_ref()?;
            if let Err(e) = self.fetch() {
                self.finish();
                return Some(Err(e));
            }
        }
    }
}
