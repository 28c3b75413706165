use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::app::{app, AppState};
use crate::config::AppConfig;

/// Test utilities: an application instance over its own temporary data directory
pub struct TestContext {
    pub state: AppState,
    router: Router,
    _dir: TempDir,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let state = AppState::build(AppConfig::for_data_root(dir.path()))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to build test state: {}", e))?;

        Ok(Self {
            router: app(state.clone()),
            state,
            _dir: dir,
        })
    }

    /// Send one request through the router and decode the JSON body
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, json))
    }

    /// Log in and return the session token
    pub async fn login(&self, email: &str, password: &str) -> anyhow::Result<String> {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/login",
                Some(serde_json::json!({ "email": email, "password": password })),
                None,
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed with {}: {}", status, body);
        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("login response has no token: {}", body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn health_and_banner() {
        let ctx = TestContext::new().await.unwrap();
        let (status, body) = ctx.request(Method::GET, "/health", None, None).await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");

        let (status, body) = ctx.request(Method::GET, "/", None, None).await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Bazaar API");
    }

    #[tokio::test]
    async fn protected_routes_require_a_session() {
        let ctx = TestContext::new().await.unwrap();
        let (status, body) = ctx.request(Method::GET, "/api/profile", None, None).await.unwrap();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");

        // Knowing a user id is not enough
        let (status, _) = ctx.request(Method::GET, "/api/profile", None, Some("1")).await.unwrap();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn profile_round_trip_with_bearer_token() {
        let ctx = TestContext::new().await.unwrap();
        let token = ctx.login("test@example.com", "password123").await.unwrap();

        let (status, body) = ctx.request(Method::GET, "/api/profile", None, Some(&token)).await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["email"], "test@example.com");
        assert!(body["data"].get("password").is_none());

        let (status, body) = ctx
            .request(Method::PUT, "/api/profile", Some(json!({ "username": "renamed" })), Some(&token))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], "renamed");
    }

    #[tokio::test]
    async fn malformed_json_uses_error_envelope() {
        let ctx = TestContext::new().await.unwrap();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = ctx.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "INVALID_JSON");
    }

    #[tokio::test]
    async fn invalid_query_is_a_validation_error() {
        let ctx = TestContext::new().await.unwrap();
        let (status, body) = ctx
            .request(Method::GET, "/api/products?sortBy=random", None, None)
            .await
            .unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["field_errors"]["sortBy"].is_string());
    }
}
