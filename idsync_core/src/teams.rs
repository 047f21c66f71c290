//! Team name resolution
//!
//! Maps human-readable team names to backend identifiers: cache first, then
//! a retried lookup, then lazy creation. The cache lives for the whole run,
//! so each distinct name triggers at most one lookup-then-create sequence.

use crate::error::{Error, ResolveError, Result};
use crate::gateway::{ApiGateway, ApiRequest, find_exact_match};
use crate::model::{Relationship, TeamMembership};
use crate::retry::{AttemptCounter, RetryPolicy};
use log::info;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const TEAMS_PATH: &str = "api/authn/v2/teams";

/// Run-scoped team name → id cache. Keys are the trimmed names as written
/// in the source (case-sensitive); API-side comparison is case-insensitive.
#[derive(Debug, Default)]
pub struct TeamCache {
    inner: Mutex<HashMap<String, String>>,
}

impl TeamCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
    }

    pub fn insert(&self, name: &str, team_id: &str) {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name.to_string(), team_id.to_string());
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolves team names to identifiers, creating missing teams on demand
pub struct TeamResolver {
    gateway: Arc<dyn ApiGateway>,
    retry: RetryPolicy,
    cache: Arc<TeamCache>,
    attempts: Arc<AttemptCounter>,
}

impl TeamResolver {
    pub fn new(
        gateway: Arc<dyn ApiGateway>,
        retry: RetryPolicy,
        cache: Arc<TeamCache>,
        attempts: Arc<AttemptCounter>,
    ) -> Self {
        Self {
            gateway,
            retry,
            cache,
            attempts,
        }
    }

    /// Team id for `name`: cache hit, exact-match lookup, or lazy creation,
    /// in that order
    pub async fn resolve_team(&self, name: &str) -> Result<String> {
        if let Some(team_id) = self.cache.get(name) {
            return Ok(team_id);
        }

        let team_id = match self.lookup_team(name).await {
            Ok(team_id) => team_id,
            Err(Error::Resolve(
                ResolveError::NoExactMatch { .. } | ResolveError::NoResult(_),
            )) => {
                info!("No team named {name} found. Creating new team.");
                self.create_team(name).await?
            }
            Err(other) => return Err(other),
        };

        self.cache.insert(name, &team_id);
        Ok(team_id)
    }

    /// Resolves every distinct name across both lists and assigns
    /// relationships: managed names are ADMIN, member-only names are MEMBER.
    /// ADMIN always overwrites an earlier MEMBER entry for the same name.
    pub async fn resolve_memberships(
        &self,
        member_names: &[String],
        managed_names: &[String],
    ) -> Result<Vec<TeamMembership>> {
        let mut memberships: Vec<TeamMembership> = Vec::new();
        let mut index_by_name: HashMap<String, usize> = HashMap::new();

        for name in member_names {
            if index_by_name.contains_key(name) {
                continue;
            }
            let team_id = self.resolve_team(name).await?;
            index_by_name.insert(name.clone(), memberships.len());
            memberships.push(TeamMembership::new(team_id, Relationship::Member));
        }

        for name in managed_names {
            if let Some(&index) = index_by_name.get(name) {
                memberships[index].relationship.name = Relationship::Admin;
            } else {
                let team_id = self.resolve_team(name).await?;
                index_by_name.insert(name.clone(), memberships.len());
                memberships.push(TeamMembership::new(team_id, Relationship::Admin));
            }
        }

        Ok(memberships)
    }

    async fn lookup_team(&self, name: &str) -> Result<String> {
        let request = ApiRequest::get(TEAMS_PATH)
            .with_query("all_for_org", "true")
            .with_query("team_name", name);
        let response = self
            .retry
            .fetch(
                self.gateway.as_ref(),
                request,
                &self.attempts,
                &format!("teams named {name}"),
            )
            .await?;

        let teams = response.embedded_list("teams").unwrap_or(&[]);
        if teams.is_empty() {
            return Err(Error::Resolve(ResolveError::NoResult(format!(
                "ERROR: No teams named '{name}' found"
            ))));
        }
        let team = find_exact_match(teams, "team_name", name).ok_or_else(|| {
            Error::Resolve(ResolveError::NoExactMatch {
                field: "team_name".to_string(),
                value: name.to_string(),
            })
        })?;
        team_id_of(team, response.status, &response.body)
    }

    async fn create_team(&self, name: &str) -> Result<String> {
        let request = ApiRequest::post(TEAMS_PATH, json!({ "team_name": name }));
        // Creation is never retried.
        let response = self.gateway.call(request).await?;
        if response.status != 201 {
            return Err(Error::Resolve(ResolveError::UnableToCreateTeam {
                status: response.status,
                body: response.body,
            }));
        }
        info!("Successfully created team: {name}.");
        team_id_of(&response.body, response.status, &response.body)
    }
}

fn team_id_of(team: &Value, status: u16, body: &Value) -> Result<String> {
    team.get("team_id")
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| {
            Error::Resolve(ResolveError::UnableToCreateTeam {
                status,
                body: body.clone(),
            })
        })
}

#[cfg(test)]
mod tests {
    // Import through the external crate name so these types match the
    // library instance idsync-test-utils was compiled against.
    use idsync_core::*;
    use idsync_core::gateway::Method;
    use idsync_test_utils::{MockGateway, embedded_teams};
    use serde_json::json;
    use std::sync::Arc;

    fn resolver(gateway: &Arc<MockGateway>) -> TeamResolver {
        TeamResolver::new(
            gateway.clone() as Arc<dyn ApiGateway>,
            RetryPolicy::immediate(10),
            Arc::new(TeamCache::new()),
            Arc::new(AttemptCounter::new()),
        )
    }

    #[tokio::test]
    async fn lookup_hit_is_cached_and_reused() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push(200, embedded_teams(&[("QA", "t-qa")]));
        let resolver = resolver(&gateway);

        assert_eq!(resolver.resolve_team("QA").await.unwrap(), "t-qa");
        // Second resolution must come from the cache: the script is empty.
        assert_eq!(resolver.resolve_team("QA").await.unwrap(), "t-qa");
        assert_eq!(gateway.calls().len(), 1);
    }

    #[tokio::test]
    async fn lookup_matches_case_insensitively() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push(200, embedded_teams(&[("qa", "t-qa")]));
        let resolver = resolver(&gateway);

        assert_eq!(resolver.resolve_team("QA").await.unwrap(), "t-qa");
    }

    #[tokio::test]
    async fn missing_team_is_created_lazily() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push(200, json!({"_embedded": {"teams": []}}));
        gateway.push(201, json!({"team_id": "t-new", "team_name": "QA"}));
        let resolver = resolver(&gateway);

        assert_eq!(resolver.resolve_team("QA").await.unwrap(), "t-new");

        let calls = gateway.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].method, Method::Post);
        assert_eq!(calls[1].body, Some(json!({"team_name": "QA"})));
    }

    #[tokio::test]
    async fn inexact_result_set_also_falls_back_to_creation() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push(200, embedded_teams(&[("QA-Extended", "t-other")]));
        gateway.push(201, json!({"team_id": "t-new"}));
        let resolver = resolver(&gateway);

        assert_eq!(resolver.resolve_team("QA").await.unwrap(), "t-new");
    }

    #[tokio::test]
    async fn failed_creation_is_terminal() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push(200, json!({"_embedded": {"teams": []}}));
        gateway.push(403, json!({"message": "quota exceeded"}));
        let resolver = resolver(&gateway);

        let err = resolver.resolve_team("QA").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Resolve(ResolveError::UnableToCreateTeam { status: 403, .. })
        ));
        // The failed creation must not be retried.
        assert_eq!(gateway.calls().len(), 2);
    }

    #[tokio::test]
    async fn admin_relationship_dominates_member() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push(200, embedded_teams(&[("QA", "t-qa")]));
        gateway.push(200, embedded_teams(&[("Ops", "t-ops")]));
        let resolver = resolver(&gateway);

        let memberships = resolver
            .resolve_memberships(
                &["QA".to_string(), "Ops".to_string()],
                &["QA".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(memberships.len(), 2);
        assert_eq!(memberships[0].team_id, "t-qa");
        assert_eq!(memberships[0].relationship.name, Relationship::Admin);
        assert_eq!(memberships[1].relationship.name, Relationship::Member);
        // "QA" resolved once despite appearing in both lists.
        assert_eq!(gateway.calls().len(), 2);
    }

    #[tokio::test]
    async fn managed_only_names_become_admins() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push(200, embedded_teams(&[("Sec", "t-sec")]));
        let resolver = resolver(&gateway);

        let memberships = resolver
            .resolve_memberships(&[], &["Sec".to_string()])
            .await
            .unwrap();

        assert_eq!(memberships.len(), 1);
        assert_eq!(memberships[0].relationship.name, Relationship::Admin);
    }

    #[tokio::test]
    async fn empty_inputs_resolve_to_no_memberships() {
        let gateway = Arc::new(MockGateway::new());
        let resolver = resolver(&gateway);

        let memberships = resolver.resolve_memberships(&[], &[]).await.unwrap();
        assert!(memberships.is_empty());
        assert!(gateway.calls().is_empty());
    }
}
