//! Team model.

use serde::{Deserialize, Serialize};

use super::IdComparator;

/// A Linear team.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,

    /// Short key used as the issue identifier prefix (e.g. "ENG").
    #[serde(default)]
    pub key: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub issue_count: Option<i64>,

    #[serde(default)]
    pub private: Option<bool>,
}

/// `TeamFilter` subset accepted by `list_teams`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<IdComparator>,
}
