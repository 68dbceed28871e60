//! In-memory implementation of the EventStore trait for testing and development

use crate::{EventRecord, EventStore, EventStoreError};
use async_trait::async_trait;
use chrono::Utc;
use event_bus::EntityKind;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Millisecond-epoch clock, injectable so tests can simulate expiry
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Event store over a BTreeMap keyed by `(pk, sk)`
///
/// The map's ordering gives sort-key-ascending partition scans for free.
/// TTL filtering uses the injected clock, so the expiry law can be checked
/// at a simulated time instead of sleeping through real minutes.
#[derive(Clone)]
pub struct InMemoryEventStore {
    records: Arc<Mutex<BTreeMap<(String, String), EventRecord>>>,
    clock: Clock,
}

impl InMemoryEventStore {
    /// Store using the wall clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(|| Utc::now().timestamp_millis()))
    }

    /// Store using an injected millisecond-epoch clock
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            records: Arc::new(Mutex::new(BTreeMap::new())),
            clock,
        }
    }

    fn now_secs(&self) -> i64 {
        (self.clock)() / 1000
    }

    /// Number of live (non-expired) records, for tests
    pub fn len(&self) -> usize {
        let now_secs = self.now_secs();
        self.records
            .lock()
            .expect("event store mutex poisoned")
            .values()
            .filter(|r| !r.expired_at(now_secs))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, record: EventRecord) -> Result<EventRecord, EventStoreError> {
        let mut records = self.records.lock().expect("event store mutex poisoned");
        // Last-write-wins: an existing key is overwritten silently
        records.insert((record.pk.clone(), record.sk.clone()), record.clone());
        Ok(record)
    }

    async fn query_by_entity(
        &self,
        kind: EntityKind,
        subject_id: &str,
    ) -> Result<Vec<EventRecord>, EventStoreError> {
        let pk = EventRecord::partition_key(kind, subject_id);
        let now_secs = self.now_secs();
        let records = self.records.lock().expect("event store mutex poisoned");
        Ok(records
            .range((pk.clone(), String::new())..)
            .take_while(|((record_pk, _), _)| *record_pk == pk)
            .filter(|(_, record)| !record.expired_at(now_secs))
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn query_by_customer(
        &self,
        email: &str,
        event_type_prefix: Option<&str>,
    ) -> Result<Vec<EventRecord>, EventStoreError> {
        let now_secs = self.now_secs();
        let records = self.records.lock().expect("event store mutex poisoned");
        let mut matches: Vec<EventRecord> = records
            .values()
            .filter(|record| record.email == email)
            .filter(|record| {
                event_type_prefix
                    .map(|prefix| record.event_type.starts_with(prefix))
                    .unwrap_or(true)
            })
            .filter(|record| !record.expired_at(now_secs))
            .cloned()
            .collect();
        // Secondary index ordering: event type, then occurrence time
        matches.sort_by(|a, b| {
            a.event_type
                .cmp(&b.event_type)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(matches)
    }
}
