//! Many-to-many reconciliation.
//!
//! Edit forms for patients (conditions) and doctors (specialties) submit
//! the full set of checked option ids. [`reconcile`] turns that selection
//! into the minimal set of join rows to insert and delete, relative to
//! what the record currently has.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Join rows to add and remove. Both sets are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationDelta {
    pub to_add: BTreeSet<i64>,
    pub to_remove: BTreeSet<i64>,
}

impl AssociationDelta {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Apply to an in-memory id set.
    pub fn apply_to(&self, current: &mut BTreeSet<i64>) {
        for id in &self.to_remove {
            current.remove(id);
        }
        current.extend(self.to_add.iter().copied());
    }
}

/// Compute the delta that makes `current` match `desired`, considering
/// only ids in `options`.
///
/// `desired = None` means nothing was checked (browsers omit empty
/// checkbox groups) and clears every option. Desired ids that are not
/// options are ignored; current ids that are not options are left alone.
pub fn reconcile<'a, I>(options: I, current: &BTreeSet<i64>, desired: Option<&[i64]>) -> AssociationDelta
where
    I: IntoIterator<Item = &'a i64>,
{
    let desired: BTreeSet<i64> = desired.unwrap_or_default().iter().copied().collect();
    let mut delta = AssociationDelta::default();
    for &id in options {
        match (desired.contains(&id), current.contains(&id)) {
            (true, false) => {
                delta.to_add.insert(id);
            }
            (false, true) => {
                delta.to_remove.insert(id);
            }
            _ => {}
        }
    }
    delta
}

/// One option in a two-list (selected / available) picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub id: i64,
    pub name: String,
}

/// Split `options` into those in `current` and the rest, each sorted by
/// name then id.
pub fn selection_lists(
    options: &[(i64, String)],
    current: &BTreeSet<i64>,
) -> (Vec<SelectOption>, Vec<SelectOption>) {
    let mut sorted: Vec<&(i64, String)> = options.iter().collect();
    sorted.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
    let (selected, available): (Vec<_>, Vec<_>) = sorted
        .into_iter()
        .map(|(id, name)| SelectOption {
            id: *id,
            name: name.clone(),
        })
        .partition(|o| current.contains(&o.id));
    (selected, available)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[i64]) -> BTreeSet<i64> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_add_and_remove() {
        let delta = reconcile(&[1, 2, 3, 4], &set(&[1, 2]), Some(&[2, 3]));
        assert_eq!(delta.to_add, set(&[3]));
        assert_eq!(delta.to_remove, set(&[1]));
    }

    #[test]
    fn test_no_change_is_empty() {
        let delta = reconcile(&[1, 2, 3], &set(&[1, 3]), Some(&[3, 1, 1]));
        assert!(delta.is_empty());
    }

    #[test]
    fn test_absent_selection_clears_all() {
        let delta = reconcile(&[1, 2, 3], &set(&[1, 3]), None);
        assert!(delta.to_add.is_empty());
        assert_eq!(delta.to_remove, set(&[1, 3]));
    }

    #[test]
    fn test_unknown_ids_ignored() {
        let delta = reconcile(&[1, 2], &set(&[1, 9]), Some(&[2, 42]));
        assert_eq!(delta.to_add, set(&[2]));
        assert_eq!(delta.to_remove, set(&[1]));
    }

    #[test]
    fn test_apply_to_reaches_desired() {
        let mut current = set(&[1, 2]);
        let delta = reconcile(&[1, 2, 3], &current, Some(&[3]));
        delta.apply_to(&mut current);
        assert_eq!(current, set(&[3]));
    }

    #[test]
    fn test_selection_lists() {
        let options = vec![
            (1, "Diabetes".to_string()),
            (2, "Asthma".to_string()),
            (3, "Cancer".to_string()),
        ];
        let (selected, available) = selection_lists(&options, &set(&[1, 2]));
        let names = |v: &[SelectOption]| v.iter().map(|o| o.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&selected), vec!["Asthma", "Diabetes"]);
        assert_eq!(names(&available), vec!["Cancer"]);
    }
}
