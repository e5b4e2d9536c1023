//! Common test utilities for integration tests
//!
//! These tests need a PostgreSQL database reachable through `DATABASE_URL`.
//! When it is unset, [`TestContext::new`] returns `None` and the test
//! returns early. A configured database that cannot be reached fails the test.
//!
//! Every user, project and tag is created with a unique suffix so tests
//! can run in parallel against one database.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Mutex;
use taskify_api::app::{build_router, AppState};
use taskify_api::config::Config;
use taskify_shared::auth::{jwt, password};
use taskify_shared::db::migrations::run_migrations;
use taskify_shared::models::user::{CreateUser, Role, User};
use tower::Service as _;
use uuid::Uuid;

pub const PASSWORD: &str = "Secret123";

const SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// A user created for one test, with a valid bearer token
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub config: Config,
    created_users: Mutex<Vec<Uuid>>,
}

impl TestContext {
    pub async fn new() -> Option<Self> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping integration test");
            return None;
        };

        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some(url.clone()),
            "JWT_SECRET" => Some(SECRET.to_string()),
            _ => None,
        })
        .expect("Invalid test configuration");

        let db = PgPool::connect(&config.database.url)
            .await
            .expect("Failed to connect to DATABASE_URL");
        run_migrations(&db).await.expect("Migrations failed");

        let state = AppState::new(db.clone(), config.clone());
        let app = build_router(state);

        Some(TestContext {
            db,
            app,
            config,
            created_users: Mutex::new(Vec::new()),
        })
    }

    /// Inserts a user directly and issues a token for it
    pub async fn user(&self, role: Role) -> TestUser {
        let suffix = Uuid::new_v4().simple().to_string();
        let user = User::create(
            &self.db,
            CreateUser {
                username: format!("user-{}", &suffix[..12]),
                email: format!("user-{}@example.com", suffix),
                password_hash: password::hash_password(PASSWORD).unwrap(),
                role,
            },
        )
        .await
        .unwrap();
        self.created_users.lock().unwrap().push(user.id);

        let (token, _) = jwt::issue_for_user(&user, &self.config.jwt).unwrap();

        TestUser {
            id: user.id,
            email: user.email,
            token,
        }
    }

    /// Remembers a user created through the API for cleanup
    pub fn track_user(&self, id: Uuid) {
        self.created_users.lock().unwrap().push(id);
    }

    /// Sends a request and returns the status and JSON body (Null when empty)
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("non-JSON body ({}): {}", status, String::from_utf8_lossy(&bytes))
            })
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(&user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(&user.token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(&user.token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(&user.token), None).await
    }

    /// Creates a project through the API and returns its id
    pub async fn create_project(&self, owner: &TestUser, name: &str) -> Uuid {
        let (status, body) = self
            .post("/api/projects", owner, serde_json::json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        id_of(&body)
    }

    /// Creates a task through the API and returns its id
    pub async fn create_task(&self, creator: &TestUser, body: Value) -> Uuid {
        let (status, body) = self.post("/api/tasks", creator, body).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        id_of(&body)
    }

    /// Deletes the data created by this context
    pub async fn cleanup(&self) {
        let ids = self.created_users.lock().unwrap().clone();
        sqlx::query("DELETE FROM tasks WHERE created_by = ANY($1)")
            .bind(&ids[..])
            .execute(&self.db)
            .await
            .unwrap();
        sqlx::query("DELETE FROM activity_logs WHERE user_id = ANY($1)")
            .bind(&ids[..])
            .execute(&self.db)
            .await
            .unwrap();
        sqlx::query("DELETE FROM users WHERE id = ANY($1)")
            .bind(&ids[..])
            .execute(&self.db)
            .await
            .unwrap();
    }
}

pub fn id_of(body: &Value) -> Uuid {
    body["id"]
        .as_str()
        .and_then(|id| id.parse().ok())
        .unwrap_or_else(|| panic!("response has no id: {}", body))
}

/// Short unique suffix for names with unique constraints
pub fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..8])
}
