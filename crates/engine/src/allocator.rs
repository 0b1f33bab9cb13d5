//! Sequence Allocator
//!
//! Hands out global positions from a single counter record using
//! compare-and-swap: read the current value `c`, then conditionally write
//! `c + 1` guarded by "value still equals `c`". A lost race re-runs the
//! whole read-then-update cycle. Only the winning update commits, so each
//! position is returned to exactly one caller.
//!
//! The counter is never derived from the tail of the log.

use std::sync::Arc;
use std::thread;
use streamlog_core::codec::attr;
use streamlog_core::{
    AttributeValue, Condition, Error, EventStoreConfig, GetRequest, Item, KeyRangeStore,
    PutRequest, RequestOptions, Result, RetryConfig, StoreError, UpdateRequest,
};
use tracing::{debug, warn};

/// Allocates gap-free global positions from a counter record
pub struct SequenceAllocator<S: ?Sized> {
    store: Arc<S>,
    table: String,
    name: String,
    retry: RetryConfig,
    options: RequestOptions,
}

impl<S: KeyRangeStore + ?Sized> SequenceAllocator<S> {
    /// Create an allocator over the configured counter record
    pub fn new(store: Arc<S>, config: &EventStoreConfig) -> Self {
        Self {
            store,
            table: config.counter_table.clone(),
            name: config.counter_name.clone(),
            retry: config.retry,
            options: RequestOptions::with_timeout(config.request_timeout()),
        }
    }

    /// Obtain the next global position
    ///
    /// # Errors
    ///
    /// - `SequenceContention` when every attempt lost its race
    /// - `StorageUnavailable` / `Timeout` from the store, not retried
    pub fn allocate(&self) -> Result<u64> {
        let attempts = self.retry.max_attempts();

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.retry.delay_for(attempt - 1);
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
            }

            let current = self.read_or_create()?;
            let next = current.checked_add(1).ok_or_else(|| {
                Error::InvariantViolation(format!("counter '{}' overflowed", self.name))
            })?;

            let request = UpdateRequest::new(self.table.clone(), self.key())
                .set(attr::COUNTER_VALUE, AttributeValue::N(next))
                .condition(Condition::AttributeEquals(
                    attr::COUNTER_VALUE.to_string(),
                    AttributeValue::N(current),
                ))
                .options(self.options);

            match self.store.update(request) {
                Ok(_) => {
                    debug!(counter = %self.name, position = next, attempt, "allocated position");
                    // next > current >= 0
                    return Ok(next as u64);
                }
                Err(StoreError::ConditionFailed { .. }) => {
                    warn!(
                        counter = %self.name,
                        expected = current,
                        attempt,
                        "counter moved during allocation, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(counter = %self.name, attempts, "sequence allocation gave up");
        Err(Error::SequenceContention { attempts })
    }

    /// Last position handed out, `0` if none yet
    pub fn current(&self) -> Result<u64> {
        let request = GetRequest::new(self.table.clone(), self.key()).options(self.options);
        match self.store.get(request)? {
            // value >= 0 is checked by counter_value
            Some(item) => Ok(counter_value(&item)? as u64),
            None => Ok(0),
        }
    }

    fn key(&self) -> Item {
        Item::from([(
            attr::COUNTER_NAME.to_string(),
            AttributeValue::S(self.name.clone()),
        )])
    }

    /// Current counter value, creating the record at 0 if absent
    fn read_or_create(&self) -> Result<i64> {
        let request = GetRequest::new(self.table.clone(), self.key()).options(self.options);
        if let Some(item) = self.store.get(request)? {
            return counter_value(&item);
        }

        let mut item = self.key();
        item.insert(attr::COUNTER_VALUE.to_string(), AttributeValue::N(0));
        let create = PutRequest::new(self.table.clone(), item)
            .condition(Condition::ItemNotExists)
            .options(self.options);

        match self.store.put(create) {
            Ok(()) => {
                debug!(counter = %self.name, "created sequence counter");
                Ok(0)
            }
            // Another allocator created it first; the CAS against 0 will
            // fail and the next attempt reads the real value.
            Err(StoreError::ConditionFailed { .. }) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

fn counter_value(item: &Item) -> Result<i64> {
    match item.get(attr::COUNTER_VALUE) {
        None | Some(AttributeValue::Null) => Ok(0),
        Some(AttributeValue::N(n)) if *n >= 0 => Ok(*n),
        Some(other) => Err(Error::Decode {
            attribute: attr::COUNTER_VALUE.to_string(),
            reason: format!("invalid counter value {}", other),
        }),
    }
}
