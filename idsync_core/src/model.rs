//! Shared data types for the reconciliation engine
//!
//! A [`UserRow`] is one change request read from the source table. Blank
//! fields mean "leave unchanged"; the literal sentinel [`NONE_SENTINEL`]
//! explicitly clears collection-valued fields (teams, managed teams, IP
//! restrictions) and nothing else.

use serde::Serialize;

/// Literal cell value that clears a collection-valued field (case-sensitive)
pub const NONE_SENTINEL: &str = "NONE";

/// Status string persisted for completed rows; reruns skip rows carrying it
pub const STATUS_SUCCESS: &str = "success";

/// One change request from the source table. All fields are raw cell
/// contents; `None` is a blank cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserRow {
    pub service_account: Option<String>,
    pub active: Option<String>,
    /// Required unique key; a blank username fails the row outright
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    /// Comma-separated allow-list of login IPs, or the clear sentinel
    pub restrict_login_ips: Option<String>,
    pub login_enabled: Option<String>,
    pub custom: [Option<String>; 5],
    /// Comma-separated team names, or the clear sentinel
    pub teams: Option<String>,
    /// Comma-separated role names
    pub roles: Option<String>,
    /// Comma-separated names of teams this user administers
    pub teams_managed: Option<String>,
}

impl UserRow {
    /// Whether the row describes an API service account. Any non-blank cell
    /// counts as set, except an explicit "false".
    pub fn is_service_account(&self) -> bool {
        truthy(&self.service_account)
    }
}

fn truthy(cell: &Option<String>) -> bool {
    match cell {
        Some(value) => {
            let trimmed = value.trim();
            !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("false")
        }
        None => false,
    }
}

/// Trimmed cell contents, or `None` when the cell is blank
pub fn non_blank(cell: &Option<String>) -> Option<&str> {
    cell.as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Splits a comma-separated cell into trimmed, non-empty tokens
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Team relationship on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Relationship {
    #[serde(rename = "MEMBER")]
    Member,
    #[serde(rename = "ADMIN")]
    Admin,
}

/// Membership entry as the identity API expects it:
/// `{"team_id": "...", "relationship": {"name": "MEMBER"}}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamMembership {
    pub team_id: String,
    pub relationship: RelationshipName,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipName {
    pub name: Relationship,
}

impl TeamMembership {
    pub fn new(team_id: impl Into<String>, relationship: Relationship) -> Self {
        Self {
            team_id: team_id.into(),
            relationship: RelationshipName { name: relationship },
        }
    }
}

/// Credentials issued when a new service account requested them
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCredentials {
    pub api_id: String,
    pub api_secret: String,
}

/// Terminal result of one processing pass over a row, persisted verbatim
/// into the source's outcome columns
#[derive(Debug, Clone, PartialEq)]
pub struct RowOutcome {
    pub status: String,
    pub credentials: Option<ApiCredentials>,
}

impl RowOutcome {
    pub fn success(credentials: Option<ApiCredentials>) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            credentials,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: message.into(),
            credentials: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_trims_and_drops_empty_tokens() {
        assert_eq!(split_list("QA, Dev ,Ops"), vec!["QA", "Dev", "Ops"]);
        assert_eq!(split_list("QA,"), vec!["QA"]);
        assert!(split_list("  ").is_empty());
    }

    #[test]
    fn non_blank_treats_whitespace_as_blank() {
        assert_eq!(non_blank(&Some(" alice ".to_string())), Some("alice"));
        assert_eq!(non_blank(&Some("   ".to_string())), None);
        assert_eq!(non_blank(&None), None);
    }

    #[test]
    fn service_account_flag_is_truthy_unless_false() {
        let mut row = UserRow {
            service_account: Some("TRUE".to_string()),
            ..Default::default()
        };
        assert!(row.is_service_account());

        row.service_account = Some("false".to_string());
        assert!(!row.is_service_account());

        row.service_account = None;
        assert!(!row.is_service_account());
    }

    #[test]
    fn membership_serializes_with_nested_relationship() {
        let membership = TeamMembership::new("t-1", Relationship::Admin);
        let value = serde_json::to_value(&membership).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"team_id": "t-1", "relationship": {"name": "ADMIN"}})
        );
    }

    #[test]
    fn outcome_success_carries_the_status_constant() {
        let outcome = RowOutcome::success(None);
        assert!(outcome.is_success());
        assert_eq!(outcome.status, STATUS_SUCCESS);

        let failed = RowOutcome::failure("User with name 'bob' not found");
        assert!(!failed.is_success());
    }
}
