//! Generic list-query pipeline: filter, then sort, then page.
//!
//! Each list screen carries its state in the query string
//! (`SearchString`, per-screen filter ids, `sortField`, `sortDirection`,
//! `page`, `pageSizeID`, and the transient `actionButton`). A
//! [`ListRequest`] is that raw input; a [`ListState`] is the resolved
//! state, whose [`ListState::url`] is what gets remembered as the return
//! URL for the screen.
//!
//! Two execution paths produce identical pages: [`filter_sort_page`] over
//! rows already in memory, and the SQL listing functions in `db`, which
//! push the same predicates and ordering into the query.

mod filter;
mod pagination;
mod params;
mod screens;
mod sort;

pub use filter::*;
pub use pagination::*;
pub use params::{encode_pairs, parse_pairs};
pub use screens::*;
pub use sort::*;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const SEARCH_PARAM: &str = "SearchString";
pub const SORT_FIELD_PARAM: &str = "sortField";
pub const SORT_DIRECTION_PARAM: &str = "sortDirection";
pub const PAGE_PARAM: &str = "page";
pub const PAGE_SIZE_PARAM: &str = "pageSizeID";
pub const ACTION_PARAM: &str = "actionButton";

/// Static description of one list screen's query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSpec {
    /// Screen name; also the list path (`/{key}`) and the memory key.
    pub key: &'static str,
    /// Integer filter parameters (`DoctorID`, ...).
    pub id_params: &'static [&'static str],
    /// Free-valued filter parameters other than `SearchString`.
    pub value_params: &'static [&'static str],
}

impl ScreenSpec {
    /// The bare list URL with no state.
    pub fn base_url(&self) -> String {
        format!("/{}", self.key)
    }
}

/// Raw list parameters as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {
    pub search: Option<String>,
    pub ids: BTreeMap<String, i64>,
    pub values: BTreeMap<String, String>,
    pub sort_field: Option<String>,
    pub sort_direction: Option<SortDirection>,
    pub action_button: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ListRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string for `screen`. Unknown keys and values that do
    /// not parse are dropped.
    pub fn parse(query: &str, screen: &ScreenSpec) -> Self {
        let mut request = ListRequest::new();
        for (key, value) in parse_pairs(query) {
            let value = value.trim().to_string();
            match key.as_str() {
                SEARCH_PARAM => request.search = Some(value),
                SORT_FIELD_PARAM => request.sort_field = Some(value),
                SORT_DIRECTION_PARAM => request.sort_direction = value.parse().ok(),
                ACTION_PARAM => request.action_button = Some(value),
                PAGE_PARAM => request.page = value.parse().ok(),
                PAGE_SIZE_PARAM => request.page_size = value.parse().ok(),
                k if screen.id_params.contains(&k) => {
                    if let Ok(id) = value.parse::<i64>() {
                        request.ids.insert(key, id);
                    }
                }
                k if screen.value_params.contains(&k) => {
                    if !value.is_empty() {
                        request.values.insert(key, value);
                    }
                }
                _ => {}
            }
        }
        request
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_id(mut self, param: impl Into<String>, id: i64) -> Self {
        self.ids.insert(param.into(), id);
        self
    }

    pub fn with_value(mut self, param: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(param.into(), value.into());
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_field = Some(field.into());
        self.sort_direction = Some(direction);
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action_button = Some(action.into());
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn id(&self, param: &str) -> Option<i64> {
        self.ids.get(param).copied()
    }

    pub fn value(&self, param: &str) -> Option<&str> {
        self.values.get(param).map(String::as_str)
    }

    /// Resolve sort and page against `screen`. `page_size` is the
    /// already-resolved effective size.
    pub fn resolve<F: SortField>(&self, screen: &ScreenSpec, page_size: u32) -> (ListState, SortState<F>) {
        let resolution = SortState::<F>::resolve(
            self.sort_field.as_deref(),
            self.sort_direction,
            self.action_button.as_deref(),
        );
        let page = if resolution.reset_page {
            1
        } else {
            self.page.unwrap_or(1).max(1)
        };
        let state = ListState {
            screen: screen.key.to_string(),
            search: filter::normalize_search(self.search.as_deref()),
            ids: self
                .ids
                .iter()
                .filter(|(k, _)| screen.id_params.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            values: self
                .values
                .iter()
                .filter(|(k, v)| screen.value_params.contains(&k.as_str()) && !v.trim().is_empty())
                .map(|(k, v)| (k.clone(), v.trim().to_string()))
                .collect(),
            sort_field: resolution.sort.field.name().to_string(),
            sort_direction: resolution.sort.direction,
            page,
            page_size,
        };
        (state, resolution.sort)
    }
}

/// Fully resolved list state: what the screen shows and what its return
/// URL reproduces. `actionButton` is never part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListState {
    pub screen: String,
    pub search: Option<String>,
    pub ids: BTreeMap<String, i64>,
    pub values: BTreeMap<String, String>,
    pub sort_field: String,
    pub sort_direction: SortDirection,
    pub page: u32,
    pub page_size: u32,
}

impl ListState {
    /// Canonical query string: search, id filters, value filters, sort,
    /// page, page size.
    pub fn to_query_string(&self) -> String {
        let mut pairs: Vec<(String, String)> = Vec::new();
        if let Some(search) = &self.search {
            pairs.push((SEARCH_PARAM.to_string(), search.clone()));
        }
        for (k, v) in &self.ids {
            pairs.push((k.clone(), v.to_string()));
        }
        for (k, v) in &self.values {
            pairs.push((k.clone(), v.clone()));
        }
        pairs.push((SORT_FIELD_PARAM.to_string(), self.sort_field.clone()));
        pairs.push((SORT_DIRECTION_PARAM.to_string(), self.sort_direction.to_string()));
        pairs.push((PAGE_PARAM.to_string(), self.page.to_string()));
        pairs.push((PAGE_SIZE_PARAM.to_string(), self.page_size.to_string()));

        encode_pairs(&pairs)
    }

    /// `/{screen}?{query}`.
    pub fn url(&self) -> String {
        format!("/{}?{}", self.screen, self.to_query_string())
    }

    /// Back to a request, e.g. to re-run the list from a remembered URL.
    pub fn to_request(&self) -> ListRequest {
        ListRequest {
            search: self.search.clone(),
            ids: self.ids.clone(),
            values: self.values.clone(),
            sort_field: Some(self.sort_field.clone()),
            sort_direction: Some(self.sort_direction),
            action_button: None,
            page: Some(self.page),
            page_size: Some(self.page_size),
        }
    }
}

/// In-memory pipeline: filter, sort, then cut the requested page.
pub fn filter_sort_page<T, S>(
    items: Vec<T>,
    filters: &FilterSet<T>,
    sort: S,
    requested_page: u32,
    page_size: u32,
) -> Page<T>
where
    S: FnOnce(&mut [T]),
{
    let mut rows = filters.apply(items);
    sort(&mut rows);
    paginate(rows, requested_page, page_size)
}
