//! Request-body construction
//!
//! A [`UserPayload`] is assembled field by field from a row and serialized
//! exactly once at the gateway boundary. Every rule is a no-op when its
//! source field is blank; only collection-valued fields honor the clear
//! sentinel.

use crate::error::Result;
use crate::model::{NONE_SENTINEL, TeamMembership, UserRow, non_blank, split_list};
use crate::teams::TeamResolver;
use serde::Serialize;

/// Base permission granted to every newly created service account
pub const API_USER_PERMISSION: &str = "apiUser";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleRef {
    pub role_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermissionRef {
    pub permission_name: String,
}

/// Partial create/update body for the users endpoint. Omitted keys leave the
/// corresponding remote state untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserPayload {
    /// Present on creation only; updates address the user by id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_restricted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_ip_addresses: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_enabled: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_one: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_two: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_three: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_four: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_five: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<RoleRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<TeamMembership>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<PermissionRef>>,
}

impl UserPayload {
    /// Whether the body carries any role or team change. Updates without one
    /// are "nothing to do" and must not be sent.
    pub fn mutates_permissions(&self) -> bool {
        self.roles.is_some() || self.teams.is_some()
    }
}

/// Builds create/update bodies, resolving team names through the shared
/// resolver as needed
pub struct PayloadBuilder<'a> {
    resolver: &'a TeamResolver,
}

impl<'a> PayloadBuilder<'a> {
    pub fn new(resolver: &'a TeamResolver) -> Self {
        Self { resolver }
    }

    pub async fn build(&self, row: &UserRow, is_new: bool) -> Result<UserPayload> {
        let mut payload = UserPayload::default();

        if is_new {
            payload.user_name = non_blank(&row.username).map(String::from);
            if row.is_service_account() {
                payload.permissions = Some(vec![PermissionRef {
                    permission_name: API_USER_PERMISSION.to_string(),
                }]);
            }
        }

        payload.active = copied(&row.active);
        payload.first_name = copied(&row.first_name);
        payload.last_name = copied(&row.last_name);
        payload.email_address = copied(&row.email);
        payload.phone = copied(&row.phone);
        payload.title = copied(&row.position);
        payload.login_enabled = copied(&row.login_enabled).map(|value| value.to_lowercase());
        payload.custom_one = copied(&row.custom[0]);
        payload.custom_two = copied(&row.custom[1]);
        payload.custom_three = copied(&row.custom[2]);
        payload.custom_four = copied(&row.custom[3]);
        payload.custom_five = copied(&row.custom[4]);

        self.apply_ip_restrictions(&mut payload, row);
        self.apply_roles(&mut payload, row);
        self.apply_teams(&mut payload, row).await?;

        Ok(payload)
    }

    fn apply_ip_restrictions(&self, payload: &mut UserPayload, row: &UserRow) {
        match non_blank(&row.restrict_login_ips) {
            None => {}
            Some(NONE_SENTINEL) => {
                payload.ip_restricted = Some(false);
                payload.allowed_ip_addresses = Some(Vec::new());
            }
            Some(raw) => {
                let addresses = split_list(raw);
                if !addresses.is_empty() {
                    payload.ip_restricted = Some(true);
                    payload.allowed_ip_addresses = Some(addresses);
                }
            }
        }
    }

    fn apply_roles(&self, payload: &mut UserPayload, row: &UserRow) {
        if let Some(raw) = non_blank(&row.roles) {
            let roles: Vec<RoleRef> = split_list(raw)
                .into_iter()
                .map(|role_name| RoleRef { role_name })
                .collect();
            if !roles.is_empty() {
                payload.roles = Some(roles);
            }
        }
    }

    async fn apply_teams(&self, payload: &mut UserPayload, row: &UserRow) -> Result<()> {
        let teams = non_blank(&row.teams);
        let managed = non_blank(&row.teams_managed);

        // The clear sentinel on the member list wins over any managed value.
        if teams == Some(NONE_SENTINEL) {
            payload.teams = Some(Vec::new());
            return Ok(());
        }
        if teams.is_none() && managed.is_none() {
            return Ok(());
        }

        let member_names = teams.map(split_list).unwrap_or_default();
        let managed_names = managed.map(split_list).unwrap_or_default();
        let memberships = self
            .resolver
            .resolve_memberships(&member_names, &managed_names)
            .await?;
        if !memberships.is_empty() {
            payload.teams = Some(memberships);
        }
        Ok(())
    }
}

fn copied(cell: &Option<String>) -> Option<String> {
    non_blank(cell).map(String::from)
}

#[cfg(test)]
mod tests {
    // Import through the external crate name so these types match the
    // library instance idsync-test-utils was compiled against.
    use idsync_core::*;
    use idsync_core::payload::RoleRef;
    use idsync_test_utils::{MockGateway, embedded_teams};
    use serde_json::json;
    use std::sync::Arc;

    fn harness() -> (Arc<MockGateway>, TeamResolver) {
        let gateway = Arc::new(MockGateway::new());
        let resolver = TeamResolver::new(
            gateway.clone() as Arc<dyn ApiGateway>,
            RetryPolicy::immediate(10),
            Arc::new(TeamCache::new()),
            Arc::new(AttemptCounter::new()),
        );
        (gateway, resolver)
    }

    fn row(username: &str) -> UserRow {
        UserRow {
            username: Some(username.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn blank_fields_are_omitted_from_the_body() {
        let (_gateway, resolver) = harness();
        let payload = PayloadBuilder::new(&resolver)
            .build(&row("alice"), false)
            .await
            .unwrap();

        assert_eq!(serde_json::to_value(&payload).unwrap(), json!({}));
        assert!(!payload.mutates_permissions());
    }

    #[tokio::test]
    async fn scalars_are_copied_verbatim() {
        let (_gateway, resolver) = harness();
        let mut input = row("alice");
        input.first_name = Some("Alice".to_string());
        input.email = Some("alice@example.com".to_string());
        input.login_enabled = Some("TRUE".to_string());
        input.custom[2] = Some("cost-center-7".to_string());

        let payload = PayloadBuilder::new(&resolver)
            .build(&input, false)
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "first_name": "Alice",
                "email_address": "alice@example.com",
                "login_enabled": "true",
                "custom_three": "cost-center-7",
            })
        );
    }

    #[tokio::test]
    async fn creation_carries_username_and_service_account_permission() {
        let (_gateway, resolver) = harness();
        let mut input = row("svc-scan");
        input.service_account = Some("true".to_string());

        let payload = PayloadBuilder::new(&resolver)
            .build(&input, true)
            .await
            .unwrap();

        assert_eq!(payload.user_name.as_deref(), Some("svc-scan"));
        assert_eq!(
            serde_json::to_value(&payload).unwrap()["permissions"],
            json!([{"permission_name": "apiUser"}])
        );
    }

    #[tokio::test]
    async fn update_never_carries_the_username() {
        let (_gateway, resolver) = harness();
        let mut input = row("alice");
        input.roles = Some("submitter".to_string());

        let payload = PayloadBuilder::new(&resolver)
            .build(&input, false)
            .await
            .unwrap();

        assert!(payload.user_name.is_none());
        assert_eq!(
            payload.roles,
            Some(vec![RoleRef {
                role_name: "submitter".to_string()
            }])
        );
    }

    #[tokio::test]
    async fn roles_are_split_and_trimmed() {
        let (_gateway, resolver) = harness();
        let mut input = row("alice");
        input.roles = Some("submitter , reviewer".to_string());

        let payload = PayloadBuilder::new(&resolver)
            .build(&input, false)
            .await
            .unwrap();

        let names: Vec<&str> = payload
            .roles
            .as_ref()
            .unwrap()
            .iter()
            .map(|role| role.role_name.as_str())
            .collect();
        assert_eq!(names, vec!["submitter", "reviewer"]);
    }

    #[tokio::test]
    async fn team_clear_sentinel_empties_memberships_without_any_call() {
        let (gateway, resolver) = harness();
        let mut input = row("alice");
        input.teams = Some("NONE".to_string());
        // A managed value must not override the clear.
        input.teams_managed = Some("QA".to_string());

        let payload = PayloadBuilder::new(&resolver)
            .build(&input, false)
            .await
            .unwrap();

        assert_eq!(payload.teams, Some(Vec::new()));
        assert_eq!(serde_json::to_value(&payload).unwrap(), json!({"teams": []}));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn teams_are_resolved_with_relationships() {
        let (gateway, resolver) = harness();
        gateway.push(200, embedded_teams(&[("QA", "t-qa")]));
        gateway.push(200, embedded_teams(&[("Ops", "t-ops")]));

        let mut input = row("alice");
        input.teams = Some("QA".to_string());
        input.teams_managed = Some("Ops".to_string());

        let payload = PayloadBuilder::new(&resolver)
            .build(&input, false)
            .await
            .unwrap();

        let teams = payload.teams.as_ref().unwrap();
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].team_id, "t-qa");
        assert_eq!(teams[0].relationship.name, Relationship::Member);
        assert_eq!(teams[1].team_id, "t-ops");
        assert_eq!(teams[1].relationship.name, Relationship::Admin);
    }

    #[tokio::test]
    async fn ip_sentinel_disables_the_restriction() {
        let (_gateway, resolver) = harness();
        let mut input = row("alice");
        input.restrict_login_ips = Some("NONE".to_string());

        let payload = PayloadBuilder::new(&resolver)
            .build(&input, false)
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"ip_restricted": false, "allowed_ip_addresses": []})
        );
    }

    #[tokio::test]
    async fn ip_list_enables_the_restriction_with_trimmed_entries() {
        let (_gateway, resolver) = harness();
        let mut input = row("alice");
        input.restrict_login_ips = Some("10.0.0.1 , 10.0.0.2".to_string());

        let payload = PayloadBuilder::new(&resolver)
            .build(&input, false)
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "ip_restricted": true,
                "allowed_ip_addresses": ["10.0.0.1", "10.0.0.2"],
            })
        );
    }
}
