//! Builders for identity API response envelopes

use serde_json::{Value, json};

/// `GET users` response body: `{"_embedded": {"users": [...]}}`
pub fn embedded_users(users: &[(&str, &str)]) -> Value {
    let entries: Vec<Value> = users
        .iter()
        .map(|(user_name, user_id)| json!({"user_name": user_name, "user_id": user_id}))
        .collect();
    json!({"_embedded": {"users": entries}})
}

/// `GET teams` response body: `{"_embedded": {"teams": [...]}}`
pub fn embedded_teams(teams: &[(&str, &str)]) -> Value {
    let entries: Vec<Value> = teams
        .iter()
        .map(|(team_name, team_id)| json!({"team_name": team_name, "team_id": team_id}))
        .collect();
    json!({"_embedded": {"teams": entries}})
}
