//! Stub admin account-credit service
//!
//! Mimics the credit endpoints the service under test calls, recording every
//! credit request body, and exposes a harness-only introspection surface
//! over the recorded log. The introspection routes are never called by the
//! service under test.

use std::net::SocketAddr;

use axum::{
    Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::Json,
    routing::{delete, get, post},
};
use serde::Deserialize;
use tokio::net::TcpListener;

use crate::request_log::RequestLog;

/// Content type of the canned admin credit documents.
const CREDIT_DOC_CONTENT_TYPE: &str = "application/vnd.blinkboxbooks.data.v1+json";

/// Document returned for every issued credit.
const CREDIT_DOCUMENT: &str =
    r#"{"type":"urn:blinkboxbooks:schema:admin:credit","amount":"10.00","currency":"GBP"}"#;

/// Canned credit history returned on reads.
const CREDIT_HISTORY_DOCUMENT: &str = r#"{"type":"urn:blinkboxbooks:schema:list","items":[{"type":"urn:blinkboxbooks:schema:admin:credit","amount":"1092.65","currency":"GBP"},{"type":"urn:blinkboxbooks:schema:admin:credit","amount":"30.19","currency":"EUR"}]}"#;

/// Running credit-service stub. Dropping the handle does not stop the
/// server; call [`shutdown`](CreditServiceStub::shutdown).
pub struct CreditServiceStub {
    addr: SocketAddr,
    log: RequestLog,
    server: tokio::task::JoinHandle<()>,
}

impl CreditServiceStub {
    /// Bind and start the stub. Port 0 picks a free port.
    pub async fn start(port: u16) -> std::io::Result<Self> {
        let log = RequestLog::new();
        let app = router(log.clone());

        let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
        let addr = listener.local_addr()?;

        let server = tokio::spawn(async move {
            tracing::info!("credit service stub listening on {}", addr);
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("credit service stub error: {}", e);
            }
        });

        Ok(Self { addr, log, server })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The log the stub records into; shared with the server task.
    pub fn log(&self) -> &RequestLog {
        &self.log
    }

    pub fn shutdown(&self) {
        self.server.abort();
    }
}

fn router(log: RequestLog) -> Router {
    Router::new()
        // Surface the service under test calls
        .route(
            "/admin/users/:id/credit",
            post(issue_credit).get(credit_history),
        )
        // Harness-only introspection surface
        .route("/log", get(full_log))
        .route("/log/requests", get(request_by_number))
        .route("/log/numRequests", get(num_requests))
        .route("/log/clear", delete(clear_log))
        .with_state(log)
}

async fn issue_credit(
    State(log): State<RequestLog>,
    body: String,
) -> ([(header::HeaderName, &'static str); 1], &'static str) {
    let index = log.record(body);
    tracing::debug!("recorded credit request #{}", index);
    ([(header::CONTENT_TYPE, CREDIT_DOC_CONTENT_TYPE)], CREDIT_DOCUMENT)
}

async fn credit_history() -> ([(header::HeaderName, &'static str); 1], &'static str) {
    ([(header::CONTENT_TYPE, CREDIT_DOC_CONTENT_TYPE)], CREDIT_HISTORY_DOCUMENT)
}

#[derive(Deserialize)]
struct RequestNumber {
    #[serde(rename = "requestNo")]
    request_no: Option<usize>,
}

async fn request_by_number(
    State(log): State<RequestLog>,
    Query(query): Query<RequestNumber>,
) -> Result<String, StatusCode> {
    let body = match query.request_no {
        Some(index) => log.at(index),
        None => log.last(),
    };
    body.ok_or(StatusCode::NOT_FOUND)
}

async fn num_requests(State(log): State<RequestLog>) -> String {
    log.count().to_string()
}

async fn full_log(State(log): State<RequestLog>) -> Json<Vec<String>> {
    Json(log.all())
}

async fn clear_log(State(log): State<RequestLog>) -> &'static str {
    log.clear();
    "cleared log"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_credit_requests_and_serves_the_log() {
        let stub = CreditServiceStub::start(0).await.unwrap();
        let client = reqwest::Client::new();
        let base = stub.base_url();

        let response = client
            .post(format!("{base}/admin/users/123/credit"))
            .body(r#"{"amount":"10.00"}"#)
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        assert_eq!(response.text().await.unwrap(), CREDIT_DOCUMENT);

        let count = client
            .get(format!("{base}/log/numRequests"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(count, "1");

        let last = client
            .get(format!("{base}/log/requests"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(last, r#"{"amount":"10.00"}"#);

        let by_index = client
            .get(format!("{base}/log/requests?requestNo=0"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(by_index, r#"{"amount":"10.00"}"#);

        stub.shutdown();
    }

    #[tokio::test]
    async fn missing_entries_are_not_found() {
        let stub = CreditServiceStub::start(0).await.unwrap();
        let client = reqwest::Client::new();
        let base = stub.base_url();

        let response = client
            .get(format!("{base}/log/requests"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

        let response = client
            .get(format!("{base}/log/requests?requestNo=7"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

        stub.shutdown();
    }

    #[tokio::test]
    async fn clear_resets_the_count() {
        let stub = CreditServiceStub::start(0).await.unwrap();
        let client = reqwest::Client::new();
        let base = stub.base_url();

        client
            .post(format!("{base}/admin/users/123/credit"))
            .body("body")
            .send()
            .await
            .unwrap();
        client
            .delete(format!("{base}/log/clear"))
            .send()
            .await
            .unwrap();

        let count = client
            .get(format!("{base}/log/numRequests"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(count, "0");

        stub.shutdown();
    }
}
