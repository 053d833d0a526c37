// ── Query cache ──
//
// Keyed read cache in front of the gateway. Concurrent reads of the same
// key share one in-flight fetch, mutations mark whole resource domains
// stale, and per-key generations keep late responses from overwriting
// newer data.

mod key;

pub use key::{CacheKey, CacheKeyBuilder, ResourceType};

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::debug;

use crate::error::CoreError;

const NOTICE_CHANNEL_SIZE: usize = 64;

type Value = Arc<dyn Any + Send + Sync>;
type SharedFetch = Shared<BoxFuture<'static, Result<Value, CoreError>>>;

struct CacheEntry {
    value: Value,
    fetched_at: Instant,
    fresh: bool,
    generation: u64,
}

struct InFlight {
    generation: u64,
    future: SharedFetch,
}

/// Per-key bookkeeping.
#[derive(Default)]
struct Slot {
    entry: Option<CacheEntry>,
    /// Last generation handed to a fetch.
    issued: u64,
    /// Generations at or below this were issued before the last
    /// invalidation and are never stored.
    floor: u64,
    in_flight: Option<InFlight>,
}

enum Lookup {
    Hit(Value),
    Pending { generation: u64, future: SharedFetch },
}

/// Read-through cache keyed by canonical query.
///
/// Values are stored type-erased and handed back as `Arc<T>`; a key must
/// always be read with the same `T`.
pub struct QueryCache {
    slots: DashMap<CacheKey, Slot>,
    max_age: Option<Duration>,
    notices: broadcast::Sender<ResourceType>,
}

impl QueryCache {
    /// A cache whose entries stay fresh until invalidated.
    pub fn new() -> Self {
        Self::with_max_age(None)
    }

    /// A cache whose entries additionally go stale `max_age` after fetch.
    pub fn with_max_age(max_age: Option<Duration>) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CHANNEL_SIZE);
        Self {
            slots: DashMap::new(),
            max_age,
            notices,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Serve `key` from cache, or fetch it.
    ///
    /// - fresh entry → returned without calling `fetcher`
    /// - fetch already in flight for `key` → joins it
    /// - otherwise → `fetcher` runs under a new generation and its
    ///   success is stored as fresh
    ///
    /// Failures are returned to every joined reader and never stored.
    /// `fetcher` is invoked while the key's shard is locked, so it must
    /// only construct its future, not touch the cache.
    pub async fn read<T, F, Fut>(&self, key: &CacheKey, fetcher: F) -> Result<Arc<T>, CoreError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        let (generation, future) = match self.begin(key, fetcher) {
            Lookup::Hit(value) => return downcast(key, value),
            Lookup::Pending { generation, future } => (generation, future),
        };

        let result = future.await;
        self.complete(key, generation, &result);
        downcast(key, result?)
    }

    fn begin<T, F, Fut>(&self, key: &CacheKey, fetcher: F) -> Lookup
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        let mut slot = self.slots.entry(key.clone()).or_default();

        if let Some(entry) = &slot.entry {
            if self.is_entry_fresh(entry) {
                debug!(%key, generation = entry.generation, "cache hit");
                return Lookup::Hit(Arc::clone(&entry.value));
            }
        }

        if let Some(in_flight) = &slot.in_flight {
            debug!(%key, generation = in_flight.generation, "joining in-flight fetch");
            return Lookup::Pending {
                generation: in_flight.generation,
                future: in_flight.future.clone(),
            };
        }

        slot.issued += 1;
        let generation = slot.issued;
        debug!(%key, generation, "cache miss, fetching");

        let future = fetcher()
            .map(|result| result.map(|value| Arc::new(value) as Value))
            .boxed()
            .shared();
        slot.in_flight = Some(InFlight {
            generation,
            future: future.clone(),
        });
        Lookup::Pending { generation, future }
    }

    fn complete(&self, key: &CacheKey, generation: u64, result: &Result<Value, CoreError>) {
        let Some(mut slot) = self.slots.get_mut(key) else {
            return;
        };
        let slot = slot.value_mut();

        if slot
            .in_flight
            .as_ref()
            .is_some_and(|f| f.generation == generation)
        {
            slot.in_flight = None;
        }

        let Ok(value) = result else {
            return;
        };

        let applied = slot.entry.as_ref().map_or(0, |e| e.generation);
        if generation == applied {
            // Another reader of the same fetch got here first.
            return;
        }
        if generation < applied || generation <= slot.floor {
            debug!(
                %key,
                generation,
                applied,
                floor = slot.floor,
                "discarding superseded response"
            );
            return;
        }

        slot.entry = Some(CacheEntry {
            value: Arc::clone(value),
            fetched_at: Instant::now(),
            fresh: true,
            generation,
        });
    }

    /// Last stored value for `key`, fresh or stale.
    pub fn peek<T: Send + Sync + 'static>(&self, key: &CacheKey) -> Option<Arc<T>> {
        let slot = self.slots.get(key)?;
        let value = Arc::clone(&slot.entry.as_ref()?.value);
        value.downcast::<T>().ok()
    }

    pub fn is_fresh(&self, key: &CacheKey) -> bool {
        self.slots.get(key).is_some_and(|slot| {
            slot.entry
                .as_ref()
                .is_some_and(|entry| self.is_entry_fresh(entry))
        })
    }

    fn is_entry_fresh(&self, entry: &CacheEntry) -> bool {
        entry.fresh
            && self
                .max_age
                .is_none_or(|age| entry.fetched_at.elapsed() < age)
    }

    /// Number of stored entries, fresh or stale.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Invalidation ─────────────────────────────────────────────────

    /// Mark every entry of `resource` stale and detach its in-flight
    /// fetches. Detached fetches still resolve for their readers but are
    /// never stored. Returns how many fresh entries were marked.
    pub fn invalidate(&self, resource: ResourceType) -> usize {
        let mut marked = 0;
        for mut slot in self.slots.iter_mut() {
            if slot.key().resource() != resource {
                continue;
            }
            let slot = slot.value_mut();
            slot.floor = slot.issued;
            slot.in_flight = None;
            if let Some(entry) = slot.entry.as_mut() {
                if entry.fresh {
                    entry.fresh = false;
                    marked += 1;
                }
            }
        }
        debug!(%resource, marked, "invalidated cached queries");
        // No subscribers is fine.
        let _ = self.notices.send(resource);
        marked
    }

    /// Invalidation notices, one per `invalidate` call.
    pub fn subscribe(&self) -> broadcast::Receiver<ResourceType> {
        self.notices.subscribe()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.len())
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

fn downcast<T: Send + Sync + 'static>(key: &CacheKey, value: Value) -> Result<Arc<T>, CoreError> {
    value
        .downcast::<T>()
        .map_err(|_| CoreError::Internal(format!("cache entry {key} holds an unexpected type")))
}
