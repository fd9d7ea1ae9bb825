//! Per-screen page-size preference.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::clock::{Clock, SystemClock};
use crate::query::PageSizeOptions;

/// Default lifetime of a remembered page size.
pub const DEFAULT_PAGE_SIZE_TTL_DAYS: i64 = 30;

/// Where page-size choices are kept between requests.
pub trait PageSizeStore: Send {
    fn get(&self, screen: &str) -> Option<u32>;
    fn set(&mut self, screen: &str, size: u32, ttl: Duration);
}

/// Process-local store with expiry.
pub struct InMemoryPageSizeStore {
    entries: HashMap<String, (u32, DateTime<Utc>)>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryPageSizeStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl InMemoryPageSizeStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            clock,
        }
    }
}

impl PageSizeStore for InMemoryPageSizeStore {
    fn get(&self, screen: &str) -> Option<u32> {
        let now = self.clock.now();
        self.entries
            .get(screen)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(size, _)| *size)
    }

    fn set(&mut self, screen: &str, size: u32, ttl: Duration) {
        let expires_at = self.clock.now() + ttl;
        self.entries.insert(screen.to_string(), (size, expires_at));
    }
}

/// Effective page size for `screen`: a valid requested size (which is
/// then remembered), else a remembered one, else the default.
pub fn resolve_page_size(
    store: &mut dyn PageSizeStore,
    options: &PageSizeOptions,
    screen: &str,
    requested: Option<u32>,
    ttl: Duration,
) -> u32 {
    if let Some(size) = options.accept(requested) {
        if store.get(screen) != Some(size) {
            debug!(screen, size, "Remembering page size");
        }
        store.set(screen, size, ttl);
        return size;
    }
    options
        .accept(store.get(screen))
        .unwrap_or(options.default_size)
}
