//! Composable list filters.
//!
//! A [`FilterSet`] is an AND of independent predicates. Each active
//! criterion contributes exactly one predicate, so the number of
//! predicates doubles as the "filters applied" count shown to the user.

use std::fmt;

type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

struct NamedFilter<T> {
    name: &'static str,
    predicate: Predicate<T>,
}

/// Conjunction of named predicates over list rows.
pub struct FilterSet<T> {
    filters: Vec<NamedFilter<T>>,
}

impl<T> Default for FilterSet<T> {
    fn default() -> Self {
        Self { filters: Vec::new() }
    }
}

impl<T> fmt::Debug for FilterSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl<T> FilterSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate under `name`.
    pub fn add<F>(&mut self, name: &'static str, predicate: F) -> &mut Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filters.push(NamedFilter {
            name,
            predicate: Box::new(predicate),
        });
        self
    }

    /// Builder form of [`FilterSet::add`].
    pub fn with<F>(mut self, name: &'static str, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.add(name, predicate);
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name).collect()
    }

    /// True when every predicate accepts `item`.
    pub fn matches(&self, item: &T) -> bool {
        self.filters.iter().all(|f| (f.predicate)(item))
    }

    /// Keep the rows every predicate accepts, preserving input order.
    pub fn apply(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().filter(|item| self.matches(item)).collect()
    }

    /// Feedback label for the filter toggle, e.g. `"(2 Filters Applied)"`.
    /// Empty when no filter is active.
    pub fn feedback(&self) -> String {
        filter_feedback(self.len())
    }
}

/// Label shown next to the filter toggle when `count` filters are active.
pub fn filter_feedback(count: usize) -> String {
    match count {
        0 => String::new(),
        1 => "(1 Filter Applied)".to_string(),
        n => format!("({} Filters Applied)", n),
    }
}

/// Case-insensitive substring test.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Trimmed search text, or `None` when blank.
pub fn normalize_search(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
