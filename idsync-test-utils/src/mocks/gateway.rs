//! Scripted mock of the API gateway
//!
//! Responses are consumed in FIFO order, mirroring the engine's strictly
//! sequential, one-request-in-flight call pattern. Every request is
//! recorded for assertions; an exhausted script behaves like a transport
//! failure, which the engine treats as a fatal gateway outage.

use async_trait::async_trait;
use idsync_core::error::GatewayError;
use idsync_core::gateway::{ApiGateway, ApiRequest, ApiResponse};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Mock implementation of [`ApiGateway`] for testing
///
/// # Examples
///
/// ```
/// use idsync_test_utils::MockGateway;
/// use serde_json::json;
///
/// let gateway = MockGateway::new();
/// gateway.push(200, json!({"_embedded": {"teams": []}}));
/// gateway.push(201, json!({"team_id": "t-1"}));
/// ```
#[derive(Debug, Default)]
pub struct MockGateway {
    script: Mutex<VecDeque<ApiResponse>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a scripted response
    pub fn push(&self, status: u16, body: Value) {
        self.script
            .lock()
            .unwrap()
            .push_back(ApiResponse::new(status, body));
    }

    /// All requests issued so far, in order
    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of scripted responses not yet consumed
    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl ApiGateway for MockGateway {
    async fn call(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        self.calls.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(GatewayError::Transport {
                path: request.path,
                message: "mock script exhausted".to_string(),
            })
    }
}
