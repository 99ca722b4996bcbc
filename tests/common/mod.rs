//! Mock prediction API setup for integration tests

#![allow(dead_code)]

use mockito::{Matcher, Mock, Server, ServerGuard};
use panelkit::providers::{ReplicateConfig, ReplicateProvider};
use std::time::Duration;

pub const TEST_TOKEN: &str = "r8_test_token";

/// Test fixture that owns a mock server standing in for the prediction API
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self { server, base_url }
    }

    /// Adapter pointed at the mock server with a fast poll loop
    pub fn provider(&self, max_poll_attempts: u32) -> ReplicateProvider {
        let config = ReplicateConfig::new()
            .with_base_url(&self.base_url)
            .with_poll_interval(Duration::from_millis(10))
            .with_max_poll_attempts(max_poll_attempts);
        ReplicateProvider::with_config(TEST_TOKEN, config).expect("provider")
    }

    /// Mock the submission endpoint
    pub async fn mock_submit(&mut self, status: usize, body: &str, hits: usize) -> Mock {
        self.server
            .mock("POST", "/v1/predictions")
            .match_header("authorization", format!("Bearer {}", TEST_TOKEN).as_str())
            .match_header("prefer", Matcher::Regex("^wait".to_string()))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    /// Mock the status endpoint for one job
    pub async fn mock_status(&mut self, job_id: &str, status: usize, body: &str, hits: usize) -> Mock {
        self.server
            .mock("GET", format!("/v1/predictions/{}", job_id).as_str())
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    pub async fn mock_cancel(&mut self, job_id: &str, status: usize) -> Mock {
        self.server
            .mock("POST", format!("/v1/predictions/{}/cancel", job_id).as_str())
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(format!(r#"{{"id":"{}","status":"canceled"}}"#, job_id))
            .create_async()
            .await
    }
}

pub fn prediction(id: &str, status: &str) -> String {
    format!(r#"{{"id":"{}","status":"{}","output":null,"error":null}}"#, id, status)
}

pub fn succeeded(id: &str, url: &str) -> String {
    format!(
        r#"{{"id":"{}","status":"succeeded","output":["{}"],"error":null}}"#,
        id, url
    )
}
