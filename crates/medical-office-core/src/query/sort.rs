//! Sort state and stable total ordering of list rows.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Direction of the primary sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    /// Apply this direction to an ascending comparison.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }

    /// SQL keyword for this direction.
    pub fn sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("Unknown sort direction: {}", other)),
        }
    }
}

/// A sortable column of one list screen.
pub trait SortField: Copy + Eq + fmt::Debug + 'static {
    /// Every field, in column order.
    const ALL: &'static [Self];

    /// The field used when none (or an unknown one) is requested.
    fn default_field() -> Self;

    /// Name as it appears on the column button and in the URL.
    fn name(&self) -> &'static str;

    /// Direction applied when the user switches to this field.
    fn default_direction(&self) -> SortDirection {
        SortDirection::Asc
    }

    fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }
}

/// Resolved sort of a list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState<F: SortField> {
    pub field: F,
    pub direction: SortDirection,
}

/// Outcome of [`SortState::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortResolution<F: SortField> {
    pub sort: SortState<F>,
    /// Any action button resets the page index to 1.
    pub reset_page: bool,
}

impl<F: SortField> Default for SortState<F> {
    fn default() -> Self {
        let field = F::default_field();
        Self {
            field,
            direction: field.default_direction(),
        }
    }
}

impl<F: SortField> SortState<F> {
    pub fn new(field: F, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Work out the effective sort from the carried `sortField` /
    /// `sortDirection` and the optional action button.
    ///
    /// Pressing the button of the current field flips the direction;
    /// pressing another field's button switches to it with that field's
    /// default direction. Any non-empty action (including filter and
    /// clear buttons) resets paging.
    pub fn resolve(
        requested_field: Option<&str>,
        requested_direction: Option<SortDirection>,
        action_button: Option<&str>,
    ) -> SortResolution<F> {
        let mut sort = match requested_field.and_then(F::from_name) {
            Some(field) => SortState {
                field,
                direction: requested_direction.unwrap_or_else(|| field.default_direction()),
            },
            None => SortState::default(),
        };

        let action = action_button.map(str::trim).filter(|a| !a.is_empty());
        if let Some(field) = action.and_then(F::from_name) {
            if field == sort.field {
                sort.direction = sort.direction.toggle();
            } else {
                sort = SortState {
                    field,
                    direction: field.default_direction(),
                };
            }
        }

        SortResolution {
            sort,
            reset_page: action.is_some(),
        }
    }
}

/// Sort `items` by `primary` in `direction`, then by `tiebreak` always
/// ascending. `tiebreak` must be a total order (end it on a unique id) so
/// the result is deterministic for equal primary keys.
pub fn sort_with<T, P, B>(items: &mut [T], direction: SortDirection, primary: P, tiebreak: B)
where
    P: Fn(&T, &T) -> Ordering,
    B: Fn(&T, &T) -> Ordering,
{
    items.sort_by(|a, b| {
        direction
            .apply(primary(a, b))
            .then_with(|| tiebreak(a, b))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Col {
        Name,
        Count,
    }

    impl SortField for Col {
        const ALL: &'static [Self] = &[Col::Name, Col::Count];

        fn default_field() -> Self {
            Col::Name
        }

        fn name(&self) -> &'static str {
            match self {
                Col::Name => "Name",
                Col::Count => "Count",
            }
        }

        fn default_direction(&self) -> SortDirection {
            match self {
                Col::Name => SortDirection::Asc,
                Col::Count => SortDirection::Desc,
            }
        }
    }

    #[test]
    fn test_direction_parse_and_toggle() {
        assert_eq!("DESC".parse::<SortDirection>(), Ok(SortDirection::Desc));
        assert!("sideways".parse::<SortDirection>().is_err());
        assert_eq!(SortDirection::Asc.toggle(), SortDirection::Desc);
    }

    #[test]
    fn test_resolve_defaults() {
        let r = SortState::<Col>::resolve(None, None, None);
        assert_eq!(r.sort, SortState::new(Col::Name, SortDirection::Asc));
        assert!(!r.reset_page);

        let r = SortState::<Col>::resolve(Some("Bogus"), Some(SortDirection::Desc), None);
        assert_eq!(r.sort, SortState::new(Col::Name, SortDirection::Asc));
    }

    #[test]
    fn test_resolve_keeps_carried_sort() {
        let r = SortState::<Col>::resolve(Some("Count"), Some(SortDirection::Asc), None);
        assert_eq!(r.sort, SortState::new(Col::Count, SortDirection::Asc));
    }

    #[test]
    fn test_same_field_toggles() {
        let r = SortState::<Col>::resolve(Some("Name"), Some(SortDirection::Asc), Some("Name"));
        assert_eq!(r.sort.direction, SortDirection::Desc);
        assert!(r.reset_page);
    }

    #[test]
    fn test_new_field_uses_its_default_direction() {
        let r = SortState::<Col>::resolve(Some("Name"), Some(SortDirection::Asc), Some("Count"));
        assert_eq!(r.sort, SortState::new(Col::Count, SortDirection::Desc));
    }

    #[test]
    fn test_filter_action_resets_page_only() {
        let r = SortState::<Col>::resolve(Some("Count"), Some(SortDirection::Asc), Some("Filter"));
        assert_eq!(r.sort, SortState::new(Col::Count, SortDirection::Asc));
        assert!(r.reset_page);

        let r = SortState::<Col>::resolve(None, None, Some("  "));
        assert!(!r.reset_page);
    }

    #[test]
    fn test_sort_with_tiebreak_stays_ascending() {
        let mut rows = vec![(1, "b"), (2, "a"), (1, "a"), (2, "b")];
        sort_with(
            &mut rows,
            SortDirection::Desc,
            |a, b| a.0.cmp(&b.0),
            |a, b| a.1.cmp(b.1),
        );
        assert_eq!(rows, vec![(2, "a"), (2, "b"), (1, "a"), (1, "b")]);
    }
}
