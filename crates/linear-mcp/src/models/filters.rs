//! Comparator filters passed through to Linear's GraphQL `filter` arguments.

use serde::{Deserialize, Serialize};

/// Comparator for ID fields.
///
/// `ne` is accepted as an alias of `neq` on input; Linear only knows `neq`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdComparator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eq: Option<String>,

    #[serde(default, alias = "ne", skip_serializing_if = "Option::is_none")]
    pub neq: Option<String>,

    #[serde(default, rename = "in", skip_serializing_if = "Option::is_none")]
    pub in_: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nin: Option<Vec<String>>,
}

impl IdComparator {
    /// Match exactly one id.
    #[must_use]
    pub fn eq(id: impl Into<String>) -> Self {
        Self { eq: Some(id.into()), ..Self::default() }
    }
}

/// `{ id: IdComparator }`, used for relation filters such as assignee and state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdFilter {
    pub id: IdComparator,
}

/// Comparator for date fields.
///
/// Values are ISO-8601 dates or durations (e.g. `2024-06-01`, `-P2W`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateComparator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eq: Option<String>,

    #[serde(default, alias = "ne", skip_serializing_if = "Option::is_none")]
    pub neq: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<String>,

    #[serde(default, rename = "in", skip_serializing_if = "Option::is_none")]
    pub in_: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nin: Option<Vec<String>>,

    /// `true` matches null values, `false` matches non-null values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null: Option<bool>,
}
