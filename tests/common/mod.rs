#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use firm_site_api::config::AppConfig;
use firm_site_api::database::MemoryRecordStore;
use firm_site_api::rate_limit::RateLimiter;
use firm_site_api::routes;
use firm_site_api::services::users::{AdminUser, NewUserInput};
use firm_site_api::state::AppState;

/// An in-process app over the memory store and a scratch content directory.
pub struct TestApp {
    pub store: Arc<MemoryRecordStore>,
    pub state: AppState,
    pub router: Router,
    content: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Result<Self> {
        let content = tempfile::tempdir().context("failed to create content dir")?;
        let locales = content.path().join("locales");
        let landing = content.path().join("landing");

        write_json(&locales.join("pt/home.json"), &json!({"hero": {"title": "Contabilidade"}}))?;
        write_json(&locales.join("en/home.json"), &json!({"hero": {"title": "Accounting"}}))?;
        write_json(&locales.join("pt/common.json"), &json!({"cta": "Fale conosco"}))?;
        write_json(&landing.join("pt/agronegocio.json"), &json!({"hero": "Agro"}))?;

        let env: HashMap<&str, String> = HashMap::from([
            ("DATABASE_URL", "postgres://localhost/unused".to_string()),
            ("JWT_SECRET", "integration-test-secret".to_string()),
            ("SECURITY_PASSWORD_COST", "4".to_string()),
            ("SECURITY_CORS_ORIGINS", "http://localhost:5173".to_string()),
            ("RATE_LIMIT_LOGIN_REQUESTS", "5".to_string()),
            ("RATE_LIMIT_LOGIN_WINDOW_SECS", "60".to_string()),
            ("CONTENT_STATIC_DIR", locales.display().to_string()),
            ("CONTENT_LANDING_DIR", landing.display().to_string()),
        ]);
        let config = AppConfig::from_lookup(|key| env.get(key).cloned());
        config.validate()?;

        let store = Arc::new(MemoryRecordStore::new());
        let state = AppState::new(config, store.clone(), Arc::new(RateLimiter::new()));
        let router = routes::app(state.clone());

        Ok(Self {
            store,
            state,
            router,
            content,
        })
    }

    pub fn content_dir(&self) -> &Path {
        self.content.path()
    }

    /// Create an account directly through the service and sign a token for it.
    pub async fn user(&self, email: &str, role: &str) -> Result<(AdminUser, String)> {
        let user = self
            .state
            .users()
            .bootstrap(NewUserInput {
                email: email.to_string(),
                name: email.split('@').next().unwrap_or(email).to_string(),
                password: "correct-password".to_string(),
                role: role.to_string(),
                permissions: vec![],
            })
            .await?
            .into_inner();
        let token = self.state.tokens.issue(&user.principal())?;
        Ok((user, token))
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<TestResponse> {
        self.send(Method::GET, uri, token, None, &[]).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Result<TestResponse> {
        self.send(Method::POST, uri, token, Some(body), &[]).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> Result<TestResponse> {
        self.send(Method::PUT, uri, token, Some(body), &[]).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Result<TestResponse> {
        self.send(Method::DELETE, uri, token, None, &[]).await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
        extra_headers: &[(&str, &str)],
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        for (name, value) in extra_headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        Ok(TestResponse { status, headers, body })
    }
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_vec_pretty(value)?)?;
    Ok(())
}
