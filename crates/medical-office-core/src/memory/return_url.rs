//! Return-URL memory.
//!
//! When a detail, create, edit or delete screen is opened from a list,
//! the list URL it came from is remembered for that list's screen. The
//! detail screen links back to it, and when it finishes (saved, deleted
//! or cancelled) it consumes it to redirect the user to exactly that
//! view. Entering the list itself clears the memory, so a fresh visit
//! starts unfiltered.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::clock::{Clock, SystemClock};
use crate::query::ListState;

/// Default lifetime of a remembered URL.
pub const DEFAULT_RETURN_URL_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone)]
struct Remembered {
    url: String,
    expires_at: DateTime<Utc>,
}

/// Remembered list URL per screen.
pub struct ReturnUrlMemory {
    entries: HashMap<String, Remembered>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl Default for ReturnUrlMemory {
    fn default() -> Self {
        Self::new(
            Duration::minutes(DEFAULT_RETURN_URL_TTL_MINUTES),
            Arc::new(SystemClock),
        )
    }
}

impl std::fmt::Debug for ReturnUrlMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReturnUrlMemory")
            .field("entries", &self.entries)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Strip scheme and host from an absolute URL.
fn path_and_query(url: &str) -> &str {
    match url.find("://") {
        Some(i) => {
            let rest = &url[i + 3..];
            rest.find('/').map(|j| &rest[j..]).unwrap_or("/")
        }
        None => url,
    }
}

impl ReturnUrlMemory {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            clock,
        }
    }

    /// Remember `url` for `screen`, replacing anything older.
    pub fn capture(&mut self, screen: &str, url: impl Into<String>) {
        let url = url.into();
        debug!(screen, url = %url, "Capturing return URL");
        self.entries.insert(
            screen.to_string(),
            Remembered {
                url,
                expires_at: self.clock.now() + self.ttl,
            },
        );
    }

    /// Remember the URL of a displayed list.
    pub fn capture_state(&mut self, state: &ListState) {
        self.capture(&state.screen, state.url());
    }

    /// Remember `referrer` if it is a list URL of `screen` carrying query
    /// state (`/{screen}?...`). Returns whether it was captured.
    pub fn capture_from_referrer(&mut self, screen: &str, referrer: &str) -> bool {
        let url = path_and_query(referrer.trim());
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, query),
            None => return false,
        };
        let path = path.trim_end_matches('/');
        let is_list = path.eq_ignore_ascii_case(&format!("/{}", screen))
            || path.eq_ignore_ascii_case(&format!("/{}/Index", screen));
        if !is_list || query.is_empty() {
            return false;
        }
        self.capture(screen, url);
        true
    }

    /// The remembered URL for `screen`, if present and not expired.
    pub fn peek(&self, screen: &str) -> Option<&str> {
        let now = self.clock.now();
        self.entries
            .get(screen)
            .filter(|e| e.expires_at > now)
            .map(|e| e.url.as_str())
    }

    /// Take the remembered URL for `screen`. Expired entries are dropped
    /// and yield `None`.
    pub fn consume(&mut self, screen: &str) -> Option<String> {
        let now = self.clock.now();
        self.entries
            .remove(screen)
            .filter(|e| e.expires_at > now)
            .map(|e| e.url)
    }

    pub fn clear(&mut self, screen: &str) {
        if self.entries.remove(screen).is_some() {
            debug!(screen, "Cleared return URL");
        }
    }

    /// URL for a "back to list" link: the remembered view, else the bare
    /// list.
    pub fn return_url(&self, screen: &str) -> String {
        self.peek(screen)
            .map(str::to_string)
            .unwrap_or_else(|| format!("/{}", screen))
    }

    /// Consume and produce the redirect target after a detail action
    /// completes.
    pub fn redirect_url(&mut self, screen: &str) -> String {
        self.consume(screen)
            .unwrap_or_else(|| format!("/{}", screen))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::memory::ManualClock;
    use crate::query::{ListRequest, PatientSort, PATIENT_SCREEN};

    fn memory() -> (ReturnUrlMemory, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap());
        let memory = ReturnUrlMemory::new(Duration::minutes(30), Arc::new(clock.clone()));
        (memory, clock)
    }

    fn patient_state(search: &str, page: u32) -> ListState {
        ListRequest::new()
            .with_search(search)
            .with_page(page)
            .resolve::<PatientSort>(&PATIENT_SCREEN, 10)
            .0
    }

    #[test]
    fn test_capture_then_consume_returns_exact_url() {
        let (mut memory, _) = memory();
        let state = patient_state("flint", 2);
        memory.capture_state(&state);
        assert_eq!(memory.return_url("Patient"), state.url());
        assert_eq!(memory.redirect_url("Patient"), state.url());
        // Consumed
        assert_eq!(memory.redirect_url("Patient"), "/Patient");
    }

    #[test]
    fn test_capture_from_referrer() {
        let (mut memory, _) = memory();
        assert!(!memory.capture_from_referrer("Patient", "/Patient"));
        assert!(!memory.capture_from_referrer("Patient", "/Doctor?page=2"));
        assert!(!memory.capture_from_referrer("Patient", "/Patient/Edit/3?x=1"));
        assert!(memory.peek("Patient").is_none());

        assert!(memory.capture_from_referrer(
            "Patient",
            "https://office.example/Patient?SearchString=fl&page=2"
        ));
        assert_eq!(memory.peek("Patient"), Some("/Patient?SearchString=fl&page=2"));
    }

    #[test]
    fn test_screens_are_independent() {
        let (mut memory, _) = memory();
        memory.capture_state(&patient_state("flint", 1));
        assert!(memory.peek("Doctor").is_none());
        assert_eq!(memory.return_url("Doctor"), "/Doctor");
        memory.clear("Doctor");
        assert!(memory.peek("Patient").is_some());
    }

    #[test]
    fn test_entries_expire() {
        let (mut memory, clock) = memory();
        memory.capture_state(&patient_state("flint", 1));
        clock.advance(Duration::minutes(29));
        assert!(memory.peek("Patient").is_some());
        clock.advance(Duration::minutes(1));
        assert!(memory.peek("Patient").is_none());
        assert!(memory.consume("Patient").is_none());
    }

    #[test]
    fn test_later_capture_replaces() {
        let (mut memory, _) = memory();
        memory.capture_state(&patient_state("flint", 1));
        let newer = patient_state("rubble", 1);
        memory.capture_state(&newer);
        assert_eq!(memory.consume("Patient"), Some(newer.url()));
    }
}
