//! Structural diff between two property maps.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::property::PropertyMap;

/// Keys whose modification forces the resource to be replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceKeys {
    /// Only the listed top-level keys force replacement.
    Only(&'static [&'static str]),
    /// Every changed key forces replacement.
    All,
}

/// Whether a diff found anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DiffChanges {
    /// Old and new maps are identical.
    None,
    /// At least one key differs.
    Some,
}

/// The kind of change for one top-level key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyDiffKind {
    /// Key was added.
    Add,
    /// Key was added and forces replacement.
    AddReplace,
    /// Key was removed.
    Delete,
    /// Key was removed and forces replacement.
    DeleteReplace,
    /// Key changed.
    Update,
    /// Key changed and forces replacement.
    UpdateReplace,
}

/// Per-key diff detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDiff {
    /// Kind of change.
    pub kind: PropertyDiffKind,
    /// True when the change was computed against inputs rather than outputs.
    pub input_diff: bool,
}

/// Result of diffing old and new properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResponse {
    /// Whether anything changed.
    pub changes: DiffChanges,
    /// Keys forcing replacement, sorted.
    pub replaces: Vec<String>,
    /// Per-key detail for every changed key.
    pub detailed_diff: BTreeMap<String, PropertyDiff>,
    /// Always true; the detail above is complete.
    pub has_detailed_diff: bool,
    /// Whether the old object must be deleted before its replacement is created.
    pub delete_before_replace: bool,
}

impl PropertyDiffKind {
    /// Returns the replacing counterpart of this kind.
    #[must_use]
    pub const fn as_replace(self) -> Self {
        match self {
            Self::Add | Self::AddReplace => Self::AddReplace,
            Self::Delete | Self::DeleteReplace => Self::DeleteReplace,
            Self::Update | Self::UpdateReplace => Self::UpdateReplace,
        }
    }

    /// Returns true for the replacing kinds.
    #[must_use]
    pub const fn is_replace(self) -> bool {
        matches!(self, Self::AddReplace | Self::DeleteReplace | Self::UpdateReplace)
    }
}

impl ReplaceKeys {
    /// Returns true if a change to `key` forces replacement.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        match self {
            Self::Only(keys) => keys.contains(&key),
            Self::All => true,
        }
    }
}

impl DiffResponse {
    /// A response reporting no changes.
    #[must_use]
    pub const fn no_changes() -> Self {
        Self {
            changes: DiffChanges::None,
            replaces: Vec::new(),
            detailed_diff: BTreeMap::new(),
            has_detailed_diff: true,
            delete_before_replace: false,
        }
    }

    /// Returns true if anything changed.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.changes == DiffChanges::Some
    }
}

/// Compares `olds` with `news` key by key.
///
/// A change anywhere inside a nested value counts as a change of its
/// top-level key. Unknown values never compare equal to known ones.
#[must_use]
pub fn diff(olds: &PropertyMap, news: &PropertyMap, replace_keys: ReplaceKeys) -> DiffResponse {
    let keys: BTreeSet<&String> = olds.keys().chain(news.keys()).collect();
    let mut detailed_diff = BTreeMap::new();

    for key in keys {
        let kind = match (olds.get(key), news.get(key)) {
            (None, Some(_)) => PropertyDiffKind::Add,
            (Some(_), None) => PropertyDiffKind::Delete,
            (Some(old), Some(new)) if old != new || new.is_computed() => PropertyDiffKind::Update,
            _ => continue,
        };
        let kind = if replace_keys.contains(key) {
            kind.as_replace()
        } else {
            kind
        };
        detailed_diff.insert(
            key.clone(),
            PropertyDiff {
                kind,
                input_diff: true,
            },
        );
    }

    if detailed_diff.is_empty() {
        return DiffResponse::no_changes();
    }

    let replaces: Vec<String> = detailed_diff
        .iter()
        .filter(|(_, d)| d.kind.is_replace())
        .map(|(k, _)| k.clone())
        .collect();

    debug!(
        changed = detailed_diff.len(),
        replaces = replaces.len(),
        "computed property diff"
    );

    DiffResponse {
        changes: DiffChanges::Some,
        delete_before_replace: !replaces.is_empty(),
        replaces,
        detailed_diff,
        has_detailed_diff: true,
    }
}

impl std::fmt::Display for PropertyDiffKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Add => "add",
            Self::AddReplace => "add (replace)",
            Self::Delete => "delete",
            Self::DeleteReplace => "delete (replace)",
            Self::Update => "update",
            Self::UpdateReplace => "update (replace)",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for DiffResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.has_changes() {
            return write!(f, "no changes");
        }
        for (i, (key, detail)) in self.detailed_diff.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}: {}", detail.kind)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyValue;
    use crate::props;

    const IDENTITY: ReplaceKeys = ReplaceKeys::Only(&["organization", "name"]);

    fn base() -> PropertyMap {
        props! {
            "organization" => "acme",
            "name" => "web",
            "description" => "old",
        }
    }

    #[test]
    fn test_identical_maps_report_no_changes() {
        let result = diff(&base(), &base(), IDENTITY);
        assert_eq!(result.changes, DiffChanges::None);
        assert!(result.replaces.is_empty());
        assert!(!result.delete_before_replace);
    }

    #[test]
    fn test_non_replace_change_is_in_place() {
        let mut news = base();
        news.insert("description", "new");
        let result = diff(&base(), &news, IDENTITY);
        assert_eq!(result.changes, DiffChanges::Some);
        assert!(result.replaces.is_empty());
        assert!(!result.delete_before_replace);
        assert_eq!(
            result.detailed_diff.get("description").map(|d| d.kind),
            Some(PropertyDiffKind::Update)
        );
    }

    #[test]
    fn test_replace_key_change_forces_delete_before_replace() {
        let mut news = base();
        news.insert("name", "api");
        let result = diff(&base(), &news, IDENTITY);
        assert_eq!(result.replaces, vec!["name".to_string()]);
        assert!(result.delete_before_replace);
        assert_eq!(
            result.detailed_diff.get("name").map(|d| d.kind),
            Some(PropertyDiffKind::UpdateReplace)
        );
    }

    #[test]
    fn test_added_and_removed_keys() {
        let mut news = base();
        news.remove("description");
        news.insert("extra", true);
        let result = diff(&base(), &news, IDENTITY);
        assert_eq!(
            result.detailed_diff.get("description").map(|d| d.kind),
            Some(PropertyDiffKind::Delete)
        );
        assert_eq!(
            result.detailed_diff.get("extra").map(|d| d.kind),
            Some(PropertyDiffKind::Add)
        );
    }

    #[test]
    fn test_nested_change_marks_top_level_key() {
        let olds = props! { "tags" => props! { "a" => "1", "b" => "2" } };
        let news = props! { "tags" => props! { "a" => "1", "b" => "3" } };
        let result = diff(&olds, &news, ReplaceKeys::Only(&[]));
        assert_eq!(result.detailed_diff.len(), 1);
        assert!(result.detailed_diff.contains_key("tags"));
    }

    #[test]
    fn test_all_keys_replace() {
        let mut news = base();
        news.insert("description", "new");
        let result = diff(&base(), &news, ReplaceKeys::All);
        assert_eq!(result.replaces, vec!["description".to_string()]);
        assert!(result.delete_before_replace);
    }

    #[test]
    fn test_computed_value_is_a_change() {
        let mut news = base();
        news.insert("description", PropertyValue::Computed);
        let mut olds = base();
        olds.insert("description", PropertyValue::Computed);
        let result = diff(&olds, &news, IDENTITY);
        assert!(result.has_changes());
    }

    #[test]
    fn test_secretness_change_is_a_change() {
        let mut news = base();
        news.insert("description", PropertyValue::secret("old"));
        let result = diff(&base(), &news, IDENTITY);
        assert!(result.has_changes());
    }
}
