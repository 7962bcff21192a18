#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use mentor_market::{
    app::create_router,
    app_state::AppState,
    config::{
        AppConfig, Config, Environment, PaymentConfig, ServerConfig, SessionConfig, StoreBackend,
        StoreConfig, VideoConfig,
    },
    db::{MemoryStore, Store},
    domain::AvailabilityMap,
    session::SessionStore,
};

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
        },
        store: StoreConfig {
            backend: StoreBackend::Memory,
            database_url: None,
            max_connections: 1,
            min_connections: 1,
        },
        session: SessionConfig {
            ttl: Duration::from_secs(3600),
            snapshot_path: None,
        },
        video: VideoConfig {
            app_id: 7,
            server_secret: SecretString::from("test-room-secret".to_string()),
            max_users: 2,
        },
        payment: PaymentConfig {
            key_id: "rzp_test_key".to_string(),
            currency: "INR".to_string(),
            merchant_name: "AI Mentor".to_string(),
        },
        app: AppConfig {
            name: "AI Mentor".to_string(),
            environment: Environment::Development,
            static_dir: None,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

/// A logged-in account.
pub struct Account {
    pub token: String,
    pub user_id: Uuid,
    pub profile_id: Option<Uuid>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(
            store.clone(),
            Arc::new(test_config()),
            SessionStore::new(Duration::from_secs(3600)),
        );
        Self {
            router: create_router(state),
            store,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let body = body.map(|body| ("application/json", body.to_string()));
        self.send_raw(method, uri, token, body).await
    }

    /// Send an arbitrary body with the given content type.
    pub async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<(&str, String)>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some((content_type, body)) => request
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body)),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn register(&self, email: &str, name: &str, role: &str) -> (StatusCode, Value) {
        self.post(
            "/auth/register",
            None,
            json!({
                "email": email,
                "password": "s3cret-pass",
                "confirm_password": "s3cret-pass",
                "role": role,
                "name": name,
            }),
        )
        .await
    }

    pub async fn login(&self, email: &str) -> Account {
        let (status, body) = self
            .post(
                "/auth/login",
                None,
                json!({"email": email, "password": "s3cret-pass"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let principal = &body["principal"];
        let profile_id = principal["mentor_id"]
            .as_str()
            .or_else(|| principal["freelancer_id"].as_str())
            .map(|id| id.parse().unwrap());
        Account {
            token: body["token"].as_str().unwrap().to_string(),
            user_id: principal["user"]["id"].as_str().unwrap().parse().unwrap(),
            profile_id,
        }
    }

    pub async fn signup(&self, email: &str, name: &str, role: &str) -> Account {
        let (status, body) = self.register(email, name, role).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        self.login(email).await
    }

    /// Replace a mentor's availability directly in the store.
    pub async fn set_availability(&self, mentor_id: Uuid, availability: Value) {
        let mentor = self.store.get_mentor(mentor_id).await.unwrap().unwrap();
        let availability: AvailabilityMap = serde_json::from_value(availability).unwrap();
        self.store
            .save_availability(mentor_id, &availability, mentor.updated_at)
            .await
            .unwrap();
    }
}

pub fn error_kind(body: &Value) -> &str {
    body["error"]["kind"].as_str().unwrap_or_default()
}
