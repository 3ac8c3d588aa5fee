#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use http_body_util::BodyExt;
use memberdesk::api::AppState;
use memberdesk::clients::mail::{MailMessage, MemoryMailer};
use memberdesk::config::Config;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub mailer: Arc<MemoryMailer>,
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // One pooled connection keeps the in-memory database shared.
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config(), MemoryMailer::new()).await
    }

    pub async fn spawn_with(config: Config, mailer: MemoryMailer) -> Self {
        let mailer = Arc::new(mailer);
        let state = memberdesk::api::create_app_state_with_mailer(config, mailer.clone())
            .await
            .expect("Failed to create app state");
        let router = memberdesk::api::router(state.clone()).await;

        Self {
            router,
            state,
            mailer,
        }
    }

    pub async fn raw(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.raw(request).await;
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn register_admin(&self, name: &str, email: &str, password: &str) -> Value {
        let (status, body) = self
            .request(
                "POST",
                "/api/admin/register",
                None,
                Some(serde_json::json!({
                    "name": name,
                    "email": email,
                    "password": password,
                    "password_confirmation": password,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["data"].clone()
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.request(
            "POST",
            "/api/admin/login",
            None,
            Some(serde_json::json!({ "email": email, "password": password })),
        )
        .await
    }

    pub async fn login_with_otp(&self, email: &str, password: &str, code: &str) -> (StatusCode, Value) {
        self.request(
            "POST",
            "/api/admin/login",
            None,
            Some(serde_json::json!({
                "email": email,
                "password": password,
                "otp_code": code,
            })),
        )
        .await
    }

    /// Register an admin and return a bearer token for it.
    pub async fn authenticated(&self) -> String {
        self.register_admin("Root", "root@example.com", "secret123")
            .await;
        let (status, body) = self.login("root@example.com", "secret123").await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    /// Wait for `count` messages addressed to `to`.
    pub async fn mails_to(&self, to: &str, count: usize) -> Vec<MailMessage> {
        self.wait_for_mail(count, |m| m.to == to).await
    }

    /// Wait until `count` login codes reached `to` and return the latest one.
    pub async fn otp_code(&self, to: &str, count: usize) -> String {
        let mails = self
            .wait_for_mail(count, |m| m.to == to && m.subject == "Your login code")
            .await;
        assert_eq!(mails.len(), count, "expected {count} login code mails");
        extract_code(&mails[count - 1].body).expect("mail has no code")
    }

    async fn wait_for_mail(
        &self,
        count: usize,
        filter: impl Fn(&MailMessage) -> bool,
    ) -> Vec<MailMessage> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let matching: Vec<MailMessage> = self
                .mailer
                .messages()
                .into_iter()
                .filter(|m| filter(m))
                .collect();
            if matching.len() >= count || tokio::time::Instant::now() >= deadline {
                return matching;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

pub fn extract_code(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim)
        .find(|line| line.len() == 6 && line.bytes().all(|b| b.is_ascii_digit()))
        .map(ToString::to_string)
}
