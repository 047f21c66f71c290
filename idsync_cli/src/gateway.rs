//! Signed HTTP gateway
//!
//! The only place requests leave the process. Signs each request, sends it,
//! and hands the parsed JSON body back to the engine. Never retries: the
//! retry policy lives in the engine, where the idempotency of each call is
//! known.

use crate::config::AppConfig;
use crate::signer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use idsync_core::error::GatewayError;
use idsync_core::gateway::{ApiGateway, ApiRequest, ApiResponse, Method};
use log::debug;
use reqwest::Url;
use serde_json::Value;

/// Fixed descriptive client identifier sent with every request
pub const CLIENT_USER_AGENT: &str = "idsync bulk user reconciliation";

pub struct HttpGateway {
    client: reqwest::Client,
    base: Url,
    key_id: String,
    key_secret: String,
}

impl HttpGateway {
    pub fn new(config: &AppConfig, verify_ssl: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!verify_ssl)
            .build()
            .context("Failed to build HTTP client")?;
        let base = Url::parse(&config.api_base())
            .with_context(|| format!("Invalid API base URL: {}", config.api_base()))?;
        Ok(Self {
            client,
            base,
            key_id: config.api.key_id.clone(),
            key_secret: config.api.key_secret.clone(),
        })
    }

    fn transport(&self, path: &str, message: impl ToString) -> GatewayError {
        GatewayError::Transport {
            path: path.to_string(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl ApiGateway for HttpGateway {
    async fn call(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        let mut url = self
            .base
            .join(&request.path)
            .map_err(|err| self.transport(&request.path, err))?;
        for (key, value) in &request.query {
            url.query_pairs_mut().append_pair(key, value);
        }
        debug!("Calling: {url}");

        let authorization =
            signer::auth_header(&self.key_id, &self.key_secret, &url, request.method)?;
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
        };

        let mut builder = self
            .client
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .header(reqwest::header::USER_AGENT, CLIENT_USER_AGENT)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| self.transport(&request.path, err))?;
        let status = response.status().as_u16();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        debug!("status code {status}");

        Ok(ApiResponse::new(status, body))
    }
}
