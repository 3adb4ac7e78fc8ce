//! Process-wide emoji image cache with single-flight fetching.
//!
//! Each asset URL is fetched and decoded at most once until [`EmojiAssetCache::clear`] is called,
//! no matter how many threads ask for it concurrently. Failures are terminal too: a URL that
//! failed stays failed (and is never refetched) until the cache is cleared.

use crate::decode;
use crate::error::AssetError;
use crate::source::AssetSource;
use glyphcast_core::CaptionConfig;
use lru::LruCache;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use tiny_skia::Pixmap;
use url::Url;

pub const DEFAULT_CACHE_CAPACITY: usize = 512;
/// Edge length SVG assets are rasterized at (Twemoji's 72x72 PNG size).
pub const DEFAULT_RASTER_SIZE: u32 = 72;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// Maximum number of terminal entries kept; `None` is unbounded.
    pub capacity: Option<NonZeroUsize>,
    pub raster_size: u32,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            capacity: NonZeroUsize::new(DEFAULT_CACHE_CAPACITY),
            raster_size: DEFAULT_RASTER_SIZE,
        }
    }
}

impl CacheOptions {
    /// `cache.capacity` (0 = unbounded) and `cache.rasterSize`.
    pub fn from_config(config: &CaptionConfig) -> Self {
        let d = Self::default();
        let capacity = match config.get_u64("cache.capacity") {
            Some(n) => usize::try_from(n).ok().and_then(NonZeroUsize::new),
            None => d.capacity,
        };
        let raster_size = config
            .get_u64("cache.rasterSize")
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0)
            .unwrap_or(d.raster_size);
        Self {
            capacity,
            raster_size,
        }
    }
}

/// A decoded emoji bitmap, shared read-only between every paint that uses it.
pub struct EmojiImage {
    url: Url,
    pixmap: Pixmap,
}

impl EmojiImage {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }
}

impl fmt::Debug for EmojiImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmojiImage")
            .field("url", &self.url.as_str())
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

type Outcome = Result<Arc<EmojiImage>, AssetError>;

#[derive(Debug, Clone)]
pub enum EntryState {
    Pending,
    Ready(Arc<EmojiImage>),
    Failed(AssetError),
}

impl EntryState {
    fn from_outcome(outcome: &Outcome) -> Self {
        match outcome {
            Ok(img) => Self::Ready(Arc::clone(img)),
            Err(err) => Self::Failed(err.clone()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Snapshot of one cache slot.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: Url,
    pub state: EntryState,
}

struct InFlight {
    result: Mutex<Option<Outcome>>,
    cv: Condvar,
}

impl InFlight {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            cv: Condvar::new(),
        }
    }

    fn set(&self, outcome: Outcome) {
        let mut slot = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(outcome);
        self.cv.notify_all();
    }

    fn wait(&self) -> Outcome {
        let mut slot = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            slot = self.cv.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

struct Slots {
    done: LruCache<Url, Outcome>,
    in_flight: HashMap<Url, Arc<InFlight>>,
}

enum Lookup {
    Done(Outcome),
    Wait(Arc<InFlight>),
    Fetch(Arc<InFlight>),
}

pub struct EmojiAssetCache {
    slots: Mutex<Slots>,
    source: Arc<dyn AssetSource>,
    options: CacheOptions,
    fetches: AtomicUsize,
}

impl fmt::Debug for EmojiAssetCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmojiAssetCache")
            .field("options", &self.options)
            .field("len", &self.len())
            .field("fetches", &self.fetch_count())
            .finish()
    }
}

impl EmojiAssetCache {
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self::with_options(source, CacheOptions::default())
    }

    pub fn with_options(source: Arc<dyn AssetSource>, options: CacheOptions) -> Self {
        let done = match options.capacity {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            slots: Mutex::new(Slots {
                done,
                in_flight: HashMap::new(),
            }),
            source,
            options,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the decoded image for `url`, fetching it if no other caller has.
    ///
    /// Concurrent callers for the same URL block until the single owner finishes and then all
    /// observe the same outcome.
    pub fn resolve(&self, url: &Url) -> Result<Arc<EmojiImage>, AssetError> {
        match self.lookup(url) {
            Lookup::Done(outcome) => outcome,
            Lookup::Wait(flight) => flight.wait(),
            Lookup::Fetch(flight) => self.run_flight(url, &flight),
        }
    }

    /// Like [`EmojiAssetCache::resolve`], but returns `None` instead of waiting when another
    /// caller is already fetching `url`.
    pub fn resolve_unless_pending(
        &self,
        url: &Url,
    ) -> Option<Result<Arc<EmojiImage>, AssetError>> {
        match self.lookup(url) {
            Lookup::Done(outcome) => Some(outcome),
            Lookup::Wait(_) => None,
            Lookup::Fetch(flight) => Some(self.run_flight(url, &flight)),
        }
    }

    fn lookup(&self, url: &Url) -> Lookup {
        let mut slots = self.lock();
        if let Some(outcome) = slots.done.get(url) {
            Lookup::Done(outcome.clone())
        } else if let Some(flight) = slots.in_flight.get(url) {
            Lookup::Wait(Arc::clone(flight))
        } else {
            let flight = Arc::new(InFlight::new());
            slots.in_flight.insert(url.clone(), Arc::clone(&flight));
            Lookup::Fetch(flight)
        }
    }

    fn run_flight(&self, url: &Url, flight: &InFlight) -> Outcome {
        let mut guard = FlightGuard {
            cache: self,
            url,
            flight,
            finished: false,
        };
        let outcome = self.fetch_and_decode(url);
        guard.finish(outcome.clone(), true);
        outcome
    }

    /// Ready image for `url` without fetching or touching recency.
    pub fn peek(&self, url: &Url) -> Option<Arc<EmojiImage>> {
        match self.lock().done.peek(url) {
            Some(Ok(img)) => Some(Arc::clone(img)),
            _ => None,
        }
    }

    pub fn state(&self, url: &Url) -> Option<EntryState> {
        let slots = self.lock();
        if let Some(outcome) = slots.done.peek(url) {
            return Some(EntryState::from_outcome(outcome));
        }
        slots
            .in_flight
            .contains_key(url)
            .then_some(EntryState::Pending)
    }

    pub fn entry(&self, url: &Url) -> Option<CacheEntry> {
        self.state(url).map(|state| CacheEntry {
            key: url.clone(),
            state,
        })
    }

    /// Drops every terminal entry, so failed URLs become fetchable again. Fetches already in
    /// flight still complete and land in the emptied cache.
    pub fn clear(&self) {
        let mut slots = self.lock();
        let dropped = slots.done.len();
        slots.done.clear();
        tracing::debug!(dropped, "emoji cache cleared");
    }

    /// Number of terminal (ready or failed) entries.
    pub fn len(&self) -> usize {
        self.lock().done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total source fetches issued since construction.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    fn fetch_and_decode(&self, url: &Url) -> Outcome {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(url = %url, "fetching emoji asset");
        let bytes = self.source.fetch(url).map_err(|err| {
            tracing::warn!(url = %url, error = %err, "emoji fetch failed");
            AssetError::Fetch(err)
        })?;
        let pixmap = decode::decode_image(&bytes, self.options.raster_size).map_err(|source| {
            tracing::warn!(url = %url, error = %source, "emoji decode failed");
            AssetError::Decode {
                url: url.to_string(),
                source,
            }
        })?;
        Ok(Arc::new(EmojiImage {
            url: url.clone(),
            pixmap,
        }))
    }

    fn finish(&self, url: &Url, flight: &InFlight, outcome: Outcome, store: bool) {
        {
            let mut slots = self.lock();
            if store {
                if let Some((evicted, _)) = slots.done.push(url.clone(), outcome.clone()) {
                    if &evicted != url {
                        tracing::trace!(url = %evicted, "emoji cache evicted entry");
                    }
                }
            }
            slots.in_flight.remove(url);
        }
        flight.set(outcome);
    }
}

/// Releases waiters even if the owning fetch unwinds.
struct FlightGuard<'a> {
    cache: &'a EmojiAssetCache,
    url: &'a Url,
    flight: &'a InFlight,
    finished: bool,
}

impl FlightGuard<'_> {
    fn finish(&mut self, outcome: Outcome, store: bool) {
        self.finished = true;
        self.cache.finish(self.url, self.flight, outcome, store);
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let aborted = Err(AssetError::Aborted {
                url: self.url.to_string(),
            });
            self.finish(aborted, false);
        }
    }
}
