//! Stub auth service
//!
//! Canned token issuance and user lookup. The user document feeds the
//! expected email and reporting fixtures, so its field values must stay in
//! step with `shared::fixtures`.

use std::net::SocketAddr;

use axum::{
    Router,
    http::header,
    routing::{get, post},
};
use tokio::net::TcpListener;

const TOKEN_DOCUMENT: &str = r#"{
    "access_token": "eyJraWQiOiJ0ZXN0L2VuYy9yc2EvMSJ9.acceptance-harness-canned-token",
    "token_type": "bearer",
    "expires_in": 1800,
    "refresh_token": "of8VY_DlPIIA_w2aBh64d38h8FjqO27BVkbbp38K2zc",
    "user_id": "urn:blinkbox:zuul:user:470",
    "user_uri": "/users/470",
    "user_username": "muld4@mail.ru",
    "user_first_name": "Muld-Live",
    "user_last_name": "testblinknow"
}"#;

const USER_DOCUMENT: &str = r#"{
    "user_id": "urn:blinkbox:zuul:user:814",
    "user_uri": "https://auth.blinkboxbooks.com/users/123",
    "user_username": "acceptance-test@blinkbox.com",
    "user_first_name": "acceptance",
    "user_last_name": "test",
    "user_allow_marketing_communications": true
}"#;

/// Running auth-service stub.
pub struct AuthServiceStub {
    addr: SocketAddr,
    server: tokio::task::JoinHandle<()>,
}

impl AuthServiceStub {
    /// Bind and start the stub. Port 0 picks a free port.
    pub async fn start(port: u16) -> std::io::Result<Self> {
        let app = Router::new()
            .route("/oauth2/token", post(issue_token))
            .route("/admin/users/:id", get(user_lookup));

        let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
        let addr = listener.local_addr()?;

        let server = tokio::spawn(async move {
            tracing::info!("auth service stub listening on {}", addr);
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("auth service stub error: {}", e);
            }
        });

        Ok(Self { addr, server })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn shutdown(&self) {
        self.server.abort();
    }
}

async fn issue_token() -> ([(header::HeaderName, &'static str); 1], &'static str) {
    ([(header::CONTENT_TYPE, "application/json")], TOKEN_DOCUMENT)
}

async fn user_lookup() -> ([(header::HeaderName, &'static str); 1], &'static str) {
    ([(header::CONTENT_TYPE, "application/json")], USER_DOCUMENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_canned_token_and_user_documents() {
        let stub = AuthServiceStub::start(0).await.unwrap();
        let client = reqwest::Client::new();
        let base = stub.base_url();

        let token: serde_json::Value = client
            .post(format!("{base}/oauth2/token"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(token["token_type"], "bearer");

        let user: serde_json::Value = client
            .get(format!("{base}/admin/users/123"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(user["user_username"], "acceptance-test@blinkbox.com");
        assert_eq!(user["user_first_name"], "acceptance");
        assert_eq!(user["user_last_name"], "test");

        stub.shutdown();
    }
}
