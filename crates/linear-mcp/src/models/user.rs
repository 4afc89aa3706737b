//! User model.

use serde::{Deserialize, Serialize};

/// A Linear workspace member.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,

    #[serde(default)]
    pub active: Option<bool>,

    #[serde(default)]
    pub avatar_url: Option<String>,

    /// Number of issues created by the user.
    #[serde(default)]
    pub created_issue_count: Option<i64>,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    /// Guests only see the teams they were invited to.
    #[serde(default)]
    pub guest: Option<bool>,

    #[serde(default)]
    pub timezone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sparse_user() {
        let user: User = serde_json::from_str(r#"{"id": "u1", "displayName": "ada"}"#).unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.display_name.as_deref(), Some("ada"));
        assert!(user.email.is_none());
    }
}
