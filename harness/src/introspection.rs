//! Client for the credit stub's log-introspection surface
//!
//! The HTTP side effects of the service under test are only observable
//! through the stub's recorded log; this client is how the orchestrator
//! reads it.

use std::time::Duration;

use shared::{HarnessError, HarnessResult};

#[derive(Clone)]
pub struct RequestLogClient {
    base_url: String,
    client: reqwest::Client,
}

impl RequestLogClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Most recently recorded request body, if any.
    pub async fn last_request(&self) -> HarnessResult<Option<String>> {
        let response = self
            .client
            .get(format!("{}/log/requests", self.base_url))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(response.error_for_status()?.text().await?))
    }

    /// Request body recorded at `index`, if any.
    pub async fn request_at(&self, index: usize) -> HarnessResult<Option<String>> {
        let response = self
            .client
            .get(format!("{}/log/requests", self.base_url))
            .query(&[("requestNo", index.to_string())])
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(response.error_for_status()?.text().await?))
    }

    pub async fn num_requests(&self) -> HarnessResult<usize> {
        let body = self
            .client
            .get(format!("{}/log/numRequests", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        body.trim().parse().map_err(|_| HarnessError::Protocol {
            message: format!("numRequests returned non-numeric body: {body:?}"),
        })
    }

    pub async fn clear(&self) -> HarnessResult<()> {
        self.client
            .delete(format!("{}/log/clear", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Readiness probe used during bring-up.
    pub async fn is_ready(&self) -> bool {
        match self
            .client
            .get(format!("{}/log", self.base_url))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
