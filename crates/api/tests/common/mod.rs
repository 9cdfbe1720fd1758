//! Shared helpers for API integration tests.
//!
//! The app is built with the production router and a stub provider that
//! accepts every job as a task and reports it half-done forever.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use pixora_api::auth::jwt::{Claims, JwtConfig};
use pixora_api::config::ServerConfig;
use pixora_api::router::build_app_router;
use pixora_api::state::AppState;
use pixora_core::roles::{ROLE_ADMIN, ROLE_USER};
use pixora_db::models::generation_job::{GenerationJob, NewGenerationJob};
use pixora_db::models::point_transaction::CreditEntry;
use pixora_db::models::status::PointTransactionKind;
use pixora_db::models::user::CreateUser;
use pixora_db::repositories::{GenerationJobRepo, LedgerRepo, UserRepo};
use pixora_pipeline::{
    ArtifactMirror, Engine, ObjectStore, ProviderFactory, StorageError, StoredObject,
};
use pixora_providers::{
    DispatchOutcome, GenerationRequest, ImageProvider, PollOutcome, ProviderError,
    ProviderSettings,
};
use sqlx::PgPool;
use tower::ServiceExt;

pub const STUB_PROGRESS: i16 = 40;

// ---------------------------------------------------------------------------
// Stub provider and store
// ---------------------------------------------------------------------------

struct StubProvider;

#[async_trait]
impl ImageProvider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn dispatch(&self, request: &GenerationRequest) -> Result<DispatchOutcome, ProviderError> {
        Ok(DispatchOutcome::Submitted {
            task_id: format!("task-{}", request.job_id),
        })
    }

    async fn poll(&self, _task_id: &str) -> Result<PollOutcome, ProviderError> {
        Ok(PollOutcome::pending(STUB_PROGRESS))
    }
}

struct StubFactory;

impl ProviderFactory for StubFactory {
    fn build(&self, _settings: &ProviderSettings) -> Result<Arc<dyn ImageProvider>, ProviderError> {
        Ok(Arc::new(StubProvider))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, StoredObject>>,
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: Some(content_type.to_string()),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<StoredObject, StorageError> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                key: key.to_string(),
            })
    }

    fn public_base_url(&self) -> &str {
        "/api/v1/media"
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        reconcile_interval_secs: 0,
        jwt: JwtConfig {
            secret: "api-test-secret-long-enough-for-hmac".to_string(),
        },
    }
}

pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_store(pool, Arc::new(MemoryStore::default()))
}

pub fn build_test_app_with_store(pool: PgPool, store: Arc<MemoryStore>) -> Router {
    let config = test_config();
    let mirror = ArtifactMirror::new(store, reqwest::Client::new());
    let engine = Engine::new(pool.clone(), Arc::new(StubFactory), Arc::new(mirror));

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        engine,
    };
    build_app_router(state, &config)
}

/// Sign a token the way the account service does.
fn sign_token(user_id: i64, role: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        exp: now + 15 * 60,
        iat: now,
    };
    let secret = test_config().jwt.secret;
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}

pub fn user_token(user_id: i64) -> String {
    sign_token(user_id, ROLE_USER)
}

pub fn admin_token(user_id: i64) -> String {
    sign_token(user_id, ROLE_ADMIN)
}

// ---------------------------------------------------------------------------
// Database seeding
// ---------------------------------------------------------------------------

pub async fn seed_user(pool: &PgPool, name: &str, points: i64) -> i64 {
    let user = UserRepo::create(
        pool,
        &CreateUser {
            username: name.to_string(),
            is_admin: false,
        },
    )
    .await
    .unwrap();
    if points > 0 {
        LedgerRepo::credit(
            pool,
            &CreditEntry {
                user_id: user.id,
                amount: points,
                kind: PointTransactionKind::Adjust,
                description: "seed".into(),
                related_order_id: None,
                related_job_id: None,
            },
        )
        .await
        .unwrap();
    }
    user.id
}

/// Insert a pending job directly, with one provider task attached.
pub async fn seed_pending_job(pool: &PgPool, user_id: i64) -> GenerationJob {
    let mut conn = pool.acquire().await.unwrap();
    let job = GenerationJobRepo::insert_batch(
        &mut conn,
        &NewGenerationJob {
            user_id,
            job_type: "text_to_image".into(),
            prompt: "a paper boat".into(),
            reference_images: vec![],
            model: "test-model".into(),
            size_ratio: Some("1:1".into()),
            resolution: "1K".into(),
            explicit_size: None,
            cost: 2,
        },
        1,
    )
    .await
    .unwrap()
    .remove(0);
    drop(conn);

    GenerationJobRepo::attach_task(pool, job.id, &format!("task-{}", job.id))
        .await
        .unwrap();
    job
}

/// Seed a job and complete it.
pub async fn seed_completed_job(pool: &PgPool, user_id: i64) -> GenerationJob {
    let job = seed_pending_job(pool, user_id).await;
    GenerationJobRepo::complete(pool, job.id, &["/api/v1/media/x.png".to_string()])
        .await
        .unwrap();
    GenerationJobRepo::find_by_id(pool, job.id).await.unwrap().unwrap()
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, method: Method, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json_auth(app: Router, uri: &str, body: serde_json::Value, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
