//! Time-boxed persistence for content fetched from the backend.
//!
//! [`CacheStore`] is the raw key/value backing (a directory of JSON files, or
//! memory in tests). [`ContentCache`] layers typed, timestamped entries on top,
//! applies a per-key TTL and knows which keys each domain event invalidates.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use neurolearn_logging::{learn_debug, learn_error, learn_info, learn_warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::persist::CacheDir;
use crate::Loaded;

pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.lock().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.lock().remove(key);
    }
}

/// One `{key}.json` file per entry inside a cache directory.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: CacheDir,
}

impl FileCacheStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir: CacheDir::new(dir),
        }
    }
}

fn file_name_for(key: &str) -> String {
    format!("{key}.json")
}

impl CacheStore for FileCacheStore {
    fn get(&self, key: &str) -> Option<String> {
        self.dir.read(&file_name_for(key)).unwrap_or_else(|err| {
            learn_warn!("Failed to read cache entry {}: {}", key, err);
            None
        })
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(err) = self.dir.write(&file_name_for(key), value) {
            learn_error!("Failed to write cache entry {}: {}", key, err);
        }
    }

    fn remove(&self, key: &str) {
        if let Err(err) = self.dir.remove(&file_name_for(key)) {
            learn_warn!("Failed to remove cache entry {}: {}", key, err);
        }
    }
}

pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.now.fetch_add(by, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    SummaryText,
    ReferenceLinks,
    AvailableFiles,
    ChatHistory,
}

impl CacheKey {
    pub const ALL: [CacheKey; 4] = [
        CacheKey::SummaryText,
        CacheKey::ReferenceLinks,
        CacheKey::AvailableFiles,
        CacheKey::ChatHistory,
    ];

    pub fn storage_key(self) -> &'static str {
        match self {
            CacheKey::SummaryText => "neurolearn_summary_text",
            CacheKey::ReferenceLinks => "neurolearn_reference_links",
            CacheKey::AvailableFiles => "neurolearn_available_files",
            CacheKey::ChatHistory => "neurolearn_chat_history",
        }
    }
}

/// Domain events that force cached content to be refetched regardless of age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationEvent {
    Upload,
    LearningTabOpened,
    ProcessingCompleted,
}

impl InvalidationEvent {
    pub fn keys(self) -> &'static [CacheKey] {
        match self {
            InvalidationEvent::Upload => &CacheKey::ALL,
            InvalidationEvent::LearningTabOpened | InvalidationEvent::ProcessingCompleted => {
                &[CacheKey::SummaryText, CacheKey::ReferenceLinks]
            }
        }
    }
}

/// Per-key time-to-live. `None` keeps an entry until it is invalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    pub summary_ttl: Option<Duration>,
    pub links_ttl: Option<Duration>,
    pub files_ttl: Option<Duration>,
    pub chat_ttl: Option<Duration>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            summary_ttl: Some(Duration::from_secs(5 * 60)),
            links_ttl: Some(Duration::from_secs(5 * 60)),
            files_ttl: Some(Duration::from_secs(2 * 60)),
            chat_ttl: None,
        }
    }
}

impl CachePolicy {
    pub fn ttl(&self, key: CacheKey) -> Option<Duration> {
        match key {
            CacheKey::SummaryText => self.summary_ttl,
            CacheKey::ReferenceLinks => self.links_ttl,
            CacheKey::AvailableFiles => self.files_ttl,
            CacheKey::ChatHistory => self.chat_ttl,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct StoredEntry<T> {
    value: T,
    stored_at_ms: u64,
}

pub struct ContentCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    policy: CachePolicy,
}

impl ContentCache {
    pub fn new(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>, policy: CachePolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Returns the cached value if present, decodable and younger than its TTL.
    pub fn read<T: DeserializeOwned>(&self, key: CacheKey) -> Option<T> {
        let raw = self.store.get(key.storage_key())?;
        let entry: StoredEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                learn_warn!("Dropping undecodable cache entry {:?}: {}", key, err);
                self.store.remove(key.storage_key());
                return None;
            }
        };

        if let Some(ttl) = self.policy.ttl(key) {
            let age = self.clock.now_ms().saturating_sub(entry.stored_at_ms);
            let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
            if age >= ttl_ms {
                learn_debug!("Cache entry {:?} expired (age {} ms)", key, age);
                return None;
            }
        }

        Some(entry.value)
    }

    pub fn write<T: Serialize>(&self, key: CacheKey, value: &T) {
        let entry = StoredEntry {
            value,
            stored_at_ms: self.clock.now_ms(),
        };
        match serde_json::to_string(&entry) {
            Ok(text) => {
                self.store.set(key.storage_key(), &text);
                learn_debug!("Cached {:?}", key);
            }
            Err(err) => learn_error!("Failed to serialize cache entry {:?}: {}", key, err),
        }
    }

    pub fn invalidate(&self, key: CacheKey) {
        self.store.remove(key.storage_key());
    }

    pub fn invalidate_for(&self, event: InvalidationEvent) {
        for key in event.keys() {
            self.invalidate(*key);
        }
        learn_info!("Cleared cache for {:?}", event);
    }

    /// Serves `key` from cache while fresh; otherwise runs `fetch` and caches its result.
    ///
    /// `force` drops the entry first, bypassing the TTL. Failed fetches leave the
    /// cache untouched.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: CacheKey,
        force: bool,
        fetch: F,
    ) -> Result<Loaded<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if force {
            self.invalidate(key);
        } else if let Some(value) = self.read(key) {
            learn_debug!("Loaded {:?} from cache", key);
            return Ok(Loaded {
                value,
                from_cache: true,
            });
        }

        let value = fetch().await?;
        self.write(key, &value);
        Ok(Loaded {
            value,
            from_cache: false,
        })
    }
}
