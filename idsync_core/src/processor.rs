//! Per-row reconciliation
//!
//! One row flows through: username check → user resolution (active probe,
//! then inactive probe) → create or update → outcome. Resolution failures
//! bubble to the batch driver; transport failures bubble past it.

use crate::error::{Error, ResolveError, Result};
use crate::gateway::{ApiGateway, ApiRequest, ApiResponse, find_exact_match};
use crate::model::{ApiCredentials, RowOutcome, UserRow, non_blank};
use crate::payload::PayloadBuilder;
use crate::retry::{AttemptCounter, RetryPolicy};
use crate::teams::{TeamCache, TeamResolver};
use log::{debug, info};
use serde_json::Value;
use std::sync::Arc;

pub const USERS_PATH: &str = "api/authn/v2/users";

/// Capability flags for a run
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessorOptions {
    /// Create accounts for usernames with no existing match
    pub allow_create: bool,
    /// Request API credentials when creating service accounts
    pub generate_credentials: bool,
}

/// Processes one row end-to-end against the identity API
pub struct RowProcessor {
    gateway: Arc<dyn ApiGateway>,
    resolver: TeamResolver,
    retry: RetryPolicy,
    attempts: Arc<AttemptCounter>,
    options: ProcessorOptions,
}

impl RowProcessor {
    pub fn new(
        gateway: Arc<dyn ApiGateway>,
        retry: RetryPolicy,
        cache: Arc<TeamCache>,
        attempts: Arc<AttemptCounter>,
        options: ProcessorOptions,
    ) -> Self {
        let resolver = TeamResolver::new(
            gateway.clone(),
            retry.clone(),
            cache,
            attempts.clone(),
        );
        Self {
            gateway,
            resolver,
            retry,
            attempts,
            options,
        }
    }

    /// Reconciles one row. `Ok` outcomes (success or failure) are persisted
    /// by the caller; `Err` values are resolution or transport failures.
    pub async fn process(&self, row: &UserRow) -> Result<RowOutcome> {
        let Some(username) = non_blank(&row.username) else {
            return Ok(RowOutcome::failure("Empty username field found"));
        };

        match self.find_user_id(username).await? {
            Some(user_id) => self.update_user(username, &user_id, row).await,
            None if self.options.allow_create => self.create_user(username, row).await,
            None => Ok(RowOutcome::failure(format!(
                "User with name '{username}' not found"
            ))),
        }
    }

    /// Exact-match lookup among active accounts, falling back to inactive
    /// accounts before concluding the user does not exist
    async fn find_user_id(&self, username: &str) -> Result<Option<String>> {
        match self.lookup_user(username, false).await {
            Ok(Some(user_id)) => return Ok(Some(user_id)),
            Ok(None) => {}
            // A non-empty active result set without our user still allows an
            // inactive match.
            Err(Error::Resolve(ResolveError::NoExactMatch { .. })) => {}
            Err(other) => return Err(other),
        }
        info!("Active user {username} not found, looking for inactive users");
        self.lookup_user(username, true).await
    }

    async fn lookup_user(&self, username: &str, inactive: bool) -> Result<Option<String>> {
        let mut request = ApiRequest::get(USERS_PATH).with_query("deleted", "false");
        if inactive {
            request = request.with_query("inactive", "true");
        }
        request = request.with_query("user_name", username);

        let response = self
            .retry
            .fetch(
                self.gateway.as_ref(),
                request,
                &self.attempts,
                &format!("users named {username}"),
            )
            .await?;

        let users = response.embedded_list("users").unwrap_or(&[]);
        if users.is_empty() {
            return Ok(None);
        }
        let user = find_exact_match(users, "user_name", username).ok_or_else(|| {
            Error::Resolve(ResolveError::NoExactMatch {
                field: "user_name".to_string(),
                value: username.to_string(),
            })
        })?;
        Ok(user.get("user_id").and_then(Value::as_str).map(String::from))
    }

    async fn create_user(&self, username: &str, row: &UserRow) -> Result<RowOutcome> {
        info!("Creating user: {username}");
        let payload = PayloadBuilder::new(&self.resolver).build(row, true).await?;
        let generate = self.options.generate_credentials && row.is_service_account();

        let request = ApiRequest::post(USERS_PATH, serde_json::to_value(&payload)?)
            .with_query("generate_api_creds", if generate { "true" } else { "false" });
        debug!("creating {username} via POST {USERS_PATH}");
        // Mutations are issued exactly once; a failure is a row failure.
        let response = self.gateway.call(request).await?;

        if response.status == 200 || response.status == 201 {
            info!("Successfully created {username}.");
            let credentials = if self.options.generate_credentials {
                extract_credentials(&response.body)
            } else {
                None
            };
            Ok(RowOutcome::success(credentials))
        } else {
            Ok(RowOutcome::failure(operation_failure(username, &response)))
        }
    }

    async fn update_user(&self, username: &str, user_id: &str, row: &UserRow) -> Result<RowOutcome> {
        info!("Updating user permissions for: {username}");
        let payload = PayloadBuilder::new(&self.resolver).build(row, false).await?;

        if !payload.mutates_permissions() {
            return Ok(RowOutcome::failure(format!(
                "No teams or roles found for user '{username}', skipped this line"
            )));
        }

        let request = ApiRequest::put(
            format!("{USERS_PATH}/{user_id}"),
            serde_json::to_value(&payload)?,
        )
        .with_query("partial", "true");
        debug!("updating {username} via PUT {USERS_PATH}/{user_id}");
        let response = self.gateway.call(request).await?;

        if response.status == 200 {
            info!("Successfully modified user permissions for {username}.");
            Ok(RowOutcome::success(None))
        } else {
            Ok(RowOutcome::failure(operation_failure(username, &response)))
        }
    }
}

fn extract_credentials(body: &Value) -> Option<ApiCredentials> {
    let credentials = body.get("api_credentials")?;
    Some(ApiCredentials {
        api_id: credentials.get("api_id")?.as_str()?.to_string(),
        api_secret: credentials.get("api_secret")?.as_str()?.to_string(),
    })
}

fn operation_failure(username: &str, response: &ApiResponse) -> String {
    if response.body.is_null() {
        format!("Operation failed for user {username}: {}", response.status)
    } else {
        format!(
            "Operation failed for user {username}: {} - {}",
            response.status, response.body
        )
    }
}
