//! Screen-level operations: what each list, detail, edit and delete
//! screen does, including return-URL bookkeeping.
//!
//! An [`Office`] owns the database, the configuration, the image resizer
//! and the per-user [`Session`] (return URLs and page-size preferences).
//! Entering a list screen clears that screen's return URL. Opening a
//! detail-type screen with the list as referrer captures the list URL.
//! Finishing or cancelling consumes it and yields the redirect target.

mod appointments;
mod doctors;
mod lookups;
mod patients;

pub use appointments::*;
pub use doctors::*;
pub use lookups::*;
pub use patients::*;

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

use medical_office_imaging::{ImageResizer, PngResizer};

use crate::config::OfficeConfig;
use crate::db::{Database, DbResult};
use crate::error::{OfficeError, OfficeResult, StoreContext};
use crate::memory::{
    resolve_page_size, Clock, InMemoryPageSizeStore, PageSizeStore, ReturnUrlMemory, SystemClock,
};
use crate::models::ValidationContext;
use crate::query::{filter_feedback, ListRequest, ListState, Page, ScreenSpec, SortField, SortState};

/// Per-user navigation state.
pub struct Session {
    pub return_urls: ReturnUrlMemory,
    page_sizes: Box<dyn PageSizeStore>,
}

impl Session {
    pub fn new(config: &OfficeConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            return_urls: ReturnUrlMemory::new(config.return_url_ttl(), clock.clone()),
            page_sizes: Box::new(InMemoryPageSizeStore::new(clock)),
        }
    }

    /// Keep page-size preferences somewhere other than process memory.
    pub fn with_page_size_store(mut self, store: Box<dyn PageSizeStore>) -> Self {
        self.page_sizes = store;
        self
    }
}

/// One page of a list screen plus what the screen needs to render it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListView<T> {
    pub page: Page<T>,
    /// Resolved state; `page` is the page actually shown
    pub state: ListState,
    /// URL reproducing this view
    pub url: String,
    pub filter_count: usize,
    /// e.g. "(2 Filters Applied)"
    pub filter_feedback: String,
    pub page_size_options: Vec<u32>,
}

/// A detail-type screen model with its "back to list" link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screen<T> {
    pub model: T,
    pub return_url: String,
}

/// A successful save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Saved {
    pub id: i64,
    pub redirect_url: String,
}

/// The office application.
pub struct Office {
    db: Database,
    config: OfficeConfig,
    resizer: Box<dyn ImageResizer>,
    session: Session,
    clock: Arc<dyn Clock>,
}

impl Office {
    /// Wrap an open database.
    pub fn new(db: Database, config: OfficeConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let mut db = db;
        db.set_acting_user(config.acting_user.clone());
        Self {
            session: Session::new(&config, clock.clone()),
            db,
            config,
            resizer: Box::new(PngResizer::default()),
            clock,
        }
    }

    /// Open the database named by `config` (in memory when it names
    /// none), seeding it when asked to.
    pub fn open(config: OfficeConfig) -> OfficeResult<Self> {
        let db = match &config.database_path {
            Some(path) => Database::open(path),
            None => Database::open_in_memory(),
        }
        .map_err(|e| OfficeError::from_store(e, &StoreContext::READ))?;
        if config.seed_sample_data {
            db.seed_sample_data()
                .map_err(|e| OfficeError::from_store(e, &StoreContext::SAVE))?;
        }
        info!(path = ?config.database_path, "Opened medical office");
        Ok(Self::new(db, config))
    }

    /// Use `clock` for expiry and for "today" in validation. Resets the
    /// session.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.session = Session::new(&self.config, clock.clone());
        self.clock = clock;
        self
    }

    pub fn with_resizer(mut self, resizer: Box<dyn ImageResizer>) -> Self {
        self.resizer = resizer;
        self
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &OfficeConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Change the user recorded in audit columns.
    pub fn set_acting_user(&mut self, user: impl Into<String>) {
        self.db.set_acting_user(user);
    }

    /// The office's local date according to its clock, in the configured
    /// UTC offset or else the host's time zone.
    pub fn today(&self) -> NaiveDate {
        let now = self.clock.now();
        match self.config.utc_offset() {
            Some(offset) => now.with_timezone(&offset).date_naive(),
            None => now.with_timezone(&Local).date_naive(),
        }
    }

    fn validation_context(&self) -> ValidationContext {
        ValidationContext::new(self.today())
    }

    /// Read helper: map store errors with the generic wording.
    fn read<T>(&self, result: DbResult<T>) -> OfficeResult<T> {
        result.map_err(|e| OfficeError::from_store(e, &StoreContext::READ))
    }

    /// Entering a list: forget the remembered return URL, resolve page
    /// size and sort, and produce the state to query with.
    fn enter_list<F: SortField>(
        &mut self,
        screen: &ScreenSpec,
        request: &ListRequest,
    ) -> (ListState, SortState<F>) {
        self.session.return_urls.clear(screen.key);
        let page_size = resolve_page_size(
            self.session.page_sizes.as_mut(),
            &self.config.page_sizes,
            screen.key,
            request.page_size,
            self.config.page_size_ttl(),
        );
        request.resolve::<F>(screen, page_size)
    }

    fn list_view<T>(&self, page: Page<T>, mut state: ListState, filter_count: usize) -> ListView<T> {
        state.page = page.page_index;
        ListView {
            url: state.url(),
            filter_count,
            filter_feedback: filter_feedback(filter_count),
            page_size_options: self.config.page_sizes.options.clone(),
            page,
            state,
        }
    }

    /// Opening a detail-type screen: capture the list URL if we came from
    /// the list, and give back the link to return to.
    fn enter_detail(&mut self, screen: &ScreenSpec, referrer: Option<&str>) -> String {
        if let Some(referrer) = referrer {
            self.session.return_urls.capture_from_referrer(screen.key, referrer);
        }
        self.session.return_urls.return_url(screen.key)
    }

    fn screen<T>(&mut self, screen: &ScreenSpec, referrer: Option<&str>, model: T) -> Screen<T> {
        Screen {
            return_url: self.enter_detail(screen, referrer),
            model,
        }
    }

    /// Current "back to list" link for `screen` without consuming it.
    pub fn return_url(&self, screen: &ScreenSpec) -> String {
        self.session.return_urls.return_url(screen.key)
    }

    /// Leave a detail-type screen without saving.
    pub fn cancel(&mut self, screen: &ScreenSpec) -> String {
        self.session.return_urls.redirect_url(screen.key)
    }

    fn finish(&mut self, screen: &ScreenSpec) -> String {
        self.session.return_urls.redirect_url(screen.key)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::memory::ManualClock;
    use crate::query::{PatientSort, PATIENT_SCREEN};

    fn office() -> Office {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap());
        let config = OfficeConfig {
            utc_offset_minutes: Some(0),
            ..OfficeConfig::default()
        };
        Office::new(Database::open_in_memory().unwrap(), config).with_clock(Arc::new(clock))
    }

    #[test]
    fn test_today_uses_configured_offset() {
        let late_evening = Utc.with_ymd_and_hms(2024, 6, 15, 23, 30, 0).unwrap();
        let office_at = |minutes: i32| {
            let config = OfficeConfig {
                utc_offset_minutes: Some(minutes),
                ..OfficeConfig::default()
            };
            Office::new(Database::open_in_memory().unwrap(), config)
                .with_clock(Arc::new(ManualClock::new(late_evening)))
        };
        assert_eq!(office_at(-240).today(), NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        assert_eq!(office_at(0).today(), NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        assert_eq!(office_at(120).today(), NaiveDate::from_ymd_opt(2024, 6, 16).unwrap());
    }

    #[test]
    fn test_enter_list_clears_return_url_and_remembers_page_size() {
        let mut office = office();
        office
            .session
            .return_urls
            .capture("Patient", "/Patient?page=2");

        let (state, _) = office.enter_list::<PatientSort>(&PATIENT_SCREEN, &ListRequest::new().with_page_size(5));
        assert_eq!(state.page_size, 5);
        assert_eq!(office.return_url(&PATIENT_SCREEN), "/Patient");

        let (state, _) = office.enter_list::<PatientSort>(&PATIENT_SCREEN, &ListRequest::new());
        assert_eq!(state.page_size, 5);
    }

    #[test]
    fn test_cancel_redirects_to_captured_list() {
        let mut office = office();
        let back = office.enter_detail(&PATIENT_SCREEN, Some("/Patient?SearchString=fl&page=1"));
        assert_eq!(back, "/Patient?SearchString=fl&page=1");
        assert_eq!(office.cancel(&PATIENT_SCREEN), "/Patient?SearchString=fl&page=1");
        assert_eq!(office.cancel(&PATIENT_SCREEN), "/Patient");
    }

    #[test]
    fn test_open_seeds_when_configured() {
        let config = OfficeConfig {
            seed_sample_data: true,
            acting_user: "admin".into(),
            ..OfficeConfig::default()
        };
        let office = Office::open(config).unwrap();
        assert_eq!(office.db().list_doctors().unwrap().len(), 3);
        assert_eq!(office.db().acting_user(), "admin");
    }
}
