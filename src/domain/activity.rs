//! Activity kinds recorded for the recommendation feed and the gate that
//! canonicalizes raw labels into them.
//!
//! Both lookup tables are process-wide statics built on first use and never
//! mutated afterwards, so concurrent callers share them without locking.

use chrono::{DateTime, SubsecRound, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ActivityError;

/// Opaque key/value bag attached to an activity
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Canonical user-behavior labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    ViewProduct,
    AddToCart,
    Purchase,
    Search,
    Review,
}

/// Alternate labels accepted from callers, each mapped to exactly one kind.
/// No key here may also be a canonical label.
const ALIAS_TABLE: &[(&str, ActivityKind)] = &[
    ("view", ActivityKind::ViewProduct),
    ("view_item", ActivityKind::ViewProduct),
    ("cart", ActivityKind::AddToCart),
    ("buy", ActivityKind::Purchase),
];

static CANONICAL_KINDS: Lazy<HashMap<&'static str, ActivityKind>> = Lazy::new(|| {
    ActivityKind::ALL
        .iter()
        .map(|kind| (kind.as_str(), *kind))
        .collect()
});

static ALIASES: Lazy<HashMap<&'static str, ActivityKind>> =
    Lazy::new(|| ALIAS_TABLE.iter().copied().collect());

impl ActivityKind {
    pub const ALL: [ActivityKind; 5] = [
        ActivityKind::ViewProduct,
        ActivityKind::AddToCart,
        ActivityKind::Purchase,
        ActivityKind::Search,
        ActivityKind::Review,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::ViewProduct => "view_product",
            ActivityKind::AddToCart => "add_to_cart",
            ActivityKind::Purchase => "purchase",
            ActivityKind::Search => "search",
            ActivityKind::Review => "review",
        }
    }

    /// Resolve a raw caller label to its canonical kind.
    ///
    /// Matching is exact and case-sensitive: the label is first looked up
    /// among the canonical names, then among the aliases. `None`, the empty
    /// string and anything unmapped all resolve to `None`.
    pub fn canonicalize(raw: Option<&str>) -> Option<Self> {
        let raw = raw.filter(|label| !label.is_empty())?;
        CANONICAL_KINDS
            .get(raw)
            .or_else(|| ALIASES.get(raw))
            .copied()
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse of a stored canonical label. Aliases are rejected here;
/// use [`ActivityKind::canonicalize`] for caller input.
impl FromStr for ActivityKind {
    type Err = ActivityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CANONICAL_KINDS
            .get(s)
            .copied()
            .ok_or_else(|| ActivityError::CorruptRecord {
                message: format!("unknown activity type '{}'", s),
            })
    }
}

/// The alias table as `(alias, canonical kind)` pairs
pub fn activity_aliases() -> &'static [(&'static str, ActivityKind)] {
    ALIAS_TABLE
}

/// A recorded user activity. `id` is assigned by storage on insert.
///
/// `created_at` carries microsecond precision, the finest every backend keeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: Option<Uuid>,
    pub actor_id: i64,
    pub subject_id: i64,
    pub activity_type: ActivityKind,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn new(actor_id: i64, subject_id: i64, activity_type: ActivityKind, metadata: Metadata) -> Self {
        Self {
            id: None,
            actor_id,
            subject_id,
            activity_type,
            metadata,
            created_at: Utc::now().trunc_subsecs(6),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_labels_resolve_to_themselves() {
        for kind in ActivityKind::ALL {
            assert_eq!(ActivityKind::canonicalize(Some(kind.as_str())), Some(kind));
        }
    }

    #[test]
    fn test_aliases_resolve_to_mapped_kind() {
        assert_eq!(ActivityKind::canonicalize(Some("view")), Some(ActivityKind::ViewProduct));
        assert_eq!(ActivityKind::canonicalize(Some("view_item")), Some(ActivityKind::ViewProduct));
        assert_eq!(ActivityKind::canonicalize(Some("cart")), Some(ActivityKind::AddToCart));
        assert_eq!(ActivityKind::canonicalize(Some("buy")), Some(ActivityKind::Purchase));
    }

    #[test]
    fn test_missing_and_empty_labels_are_rejected() {
        assert_eq!(ActivityKind::canonicalize(None), None);
        assert_eq!(ActivityKind::canonicalize(Some("")), None);
    }

    #[test]
    fn test_matching_is_exact() {
        assert_eq!(ActivityKind::canonicalize(Some("invalid_activity")), None);
        assert_eq!(ActivityKind::canonicalize(Some("VIEW")), None);
        assert_eq!(ActivityKind::canonicalize(Some("Purchase")), None);
        assert_eq!(ActivityKind::canonicalize(Some(" view")), None);
        assert_eq!(ActivityKind::canonicalize(Some("buy ")), None);
    }

    #[test]
    fn test_alias_keys_never_shadow_canonical_labels() {
        for (alias, _) in activity_aliases() {
            assert!(!CANONICAL_KINDS.contains_key(alias), "{} is both alias and kind", alias);
        }
    }

    #[test]
    fn test_from_str_only_accepts_canonical_labels() {
        assert_eq!("review".parse::<ActivityKind>().unwrap(), ActivityKind::Review);
        assert!("buy".parse::<ActivityKind>().is_err());
        assert!("".parse::<ActivityKind>().is_err());
    }

    #[test]
    fn test_serde_uses_canonical_labels() {
        let json = serde_json::to_string(&ActivityKind::AddToCart).unwrap();
        assert_eq!(json, "\"add_to_cart\"");
        for kind in ActivityKind::ALL {
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
        }
    }

    #[test]
    fn test_new_event_is_unsaved() {
        let event = ActivityEvent::new(7, 42, ActivityKind::Search, Metadata::new());
        assert!(event.id.is_none());
        assert_eq!(event.actor_id, 7);
        assert_eq!(event.subject_id, 42);
    }

    #[test]
    fn test_new_event_timestamp_has_microsecond_precision() {
        for _ in 0..50 {
            let event = ActivityEvent::new(1, 1, ActivityKind::ViewProduct, Metadata::new());
            assert_eq!(event.created_at.timestamp_subsec_nanos() % 1_000, 0);
        }
    }
}
