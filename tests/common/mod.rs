#![allow(dead_code)]

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{header, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use bazaar_api::config::AppConfig;
use bazaar_api::{serve, AppState};

pub const SEED_EMAIL: &str = "test@example.com";
pub const SEED_PASSWORD: &str = "password123";

/// A server bound to a free port over its own temporary data directory
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
    pub state: AppState,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<std::io::Result<()>>>,
    dir: TempDir,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        let dir = tempfile::tempdir().context("failed to create data dir")?;
        Self::spawn_with(AppConfig::for_data_root(dir.path()), dir).await
    }

    pub async fn spawn_with(mut config: AppConfig, dir: TempDir) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        config.api.port = port;

        let state = AppState::build(config)
            .await
            .map_err(|e| anyhow::anyhow!("failed to build state: {}", e))?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind port {}", port))?;

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve(listener, state.clone(), async move {
            let _ = rx.await;
        }));

        let server = Self {
            port,
            base_url: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
            state,
            shutdown: Some(tx),
            handle: Some(handle),
            dir,
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(res) = self.client.get(self.url("/health")).send().await {
                if res.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn data_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("data")
    }

    /// Graceful stop; the store is closed before this returns
    pub async fn stop(mut self) -> Result<TempDir> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await??;
        }
        let dir = tempfile::tempdir()?;
        Ok(std::mem::replace(&mut self.dir, dir))
    }

    /// Log in; returns the token and the raw session cookie pair
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let res = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());

        let cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
            .context("login did not set a cookie")?;
        let body = res.json::<Value>().await?;
        let token = body["data"]["token"].as_str().context("no token in body")?.to_string();
        Ok(Session { token, cookie })
    }

    pub async fn login_seed(&self) -> Result<Session> {
        self.login(SEED_EMAIL, SEED_PASSWORD).await
    }

    pub async fn register(&self, email: &str, username: &str, password: &str) -> Result<Value> {
        let res = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "email": email, "username": username, "password": password }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());
        Ok(res.json::<Value>().await?["data"].clone())
    }

    /// Create a product through the multipart endpoint
    pub async fn create_product(&self, session: &Session, fields: &[(&str, &str)]) -> Result<reqwest::Response> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in fields {
            form = form.text(name.to_string(), value.to_string());
        }
        Ok(self
            .client
            .post(self.url("/api/products"))
            .bearer_auth(&session.token)
            .multipart(form)
            .send()
            .await?)
    }

    pub async fn list_products(&self, query: &str) -> Result<Value> {
        let res = self.client.get(self.url(&format!("/api/products{}", query))).send().await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "list failed: {}", res.status());
        Ok(res.json::<Value>().await?["data"].clone())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    /// `auth_token=<value>` as sent back in a Cookie header
    pub cookie: String,
}

pub fn titles(page: &Value) -> Vec<String> {
    page["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|p| p["title"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
