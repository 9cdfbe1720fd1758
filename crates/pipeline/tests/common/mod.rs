//! Shared fixtures for engine tests: a scripted provider, an in-memory
//! object store, and database seeding helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
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

pub const MEDIA_BASE: &str = "https://media.test";

// ---------------------------------------------------------------------------
// Scripted provider
// ---------------------------------------------------------------------------

/// What every dispatch call returns.
#[derive(Debug, Clone)]
pub enum DispatchScript {
    Images(Vec<String>),
    /// Submit and return `{prefix}-{n}` as the task id.
    Submit(String),
    Fail(String),
}

/// What a poll for one task id returns.
#[derive(Debug, Clone)]
pub enum PollScript {
    Pending(i16),
    Succeeded(Vec<String>),
    Failed(String),
    Http(u16),
}

pub struct ScriptedProvider {
    dispatch: DispatchScript,
    polls: Mutex<HashMap<String, PollScript>>,
    pub dispatch_calls: AtomicUsize,
    pub poll_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(dispatch: DispatchScript) -> Arc<Self> {
        Arc::new(Self {
            dispatch,
            polls: Mutex::new(HashMap::new()),
            dispatch_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
        })
    }

    pub fn on_poll(&self, task_id: &str, script: PollScript) {
        self.polls
            .lock()
            .unwrap()
            .insert(task_id.to_string(), script);
    }

    pub fn polls_made(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn dispatch(&self, _request: &GenerationRequest) -> Result<DispatchOutcome, ProviderError> {
        let n = self.dispatch_calls.fetch_add(1, Ordering::SeqCst);
        match &self.dispatch {
            DispatchScript::Images(images) => Ok(DispatchOutcome::Images(images.clone())),
            DispatchScript::Submit(prefix) => Ok(DispatchOutcome::Submitted {
                task_id: format!("{prefix}-{n}"),
            }),
            DispatchScript::Fail(body) => Err(ProviderError::Api {
                status: 401,
                body: body.clone(),
            }),
        }
    }

    async fn poll(&self, task_id: &str) -> Result<PollOutcome, ProviderError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        let script = self
            .polls
            .lock()
            .unwrap()
            .get(task_id)
            .cloned()
            .unwrap_or(PollScript::Pending(0));
        match script {
            PollScript::Pending(p) => Ok(PollOutcome::pending(p)),
            PollScript::Succeeded(images) => Ok(PollOutcome::succeeded(images)),
            PollScript::Failed(msg) => Ok(PollOutcome::failed(msg)),
            PollScript::Http(status) => Err(ProviderError::Api {
                status,
                body: "scripted".into(),
            }),
        }
    }
}

/// Hands out the same scripted provider whatever the settings say.
pub struct ScriptedFactory(pub Arc<ScriptedProvider>);

impl ProviderFactory for ScriptedFactory {
    fn build(&self, _settings: &ProviderSettings) -> Result<Arc<dyn ImageProvider>, ProviderError> {
        Ok(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// In-memory object store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    pub objects: Mutex<HashMap<String, StoredObject>>,
    pub fail_puts: bool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            fail_puts: true,
        }
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        if self.fail_puts {
            return Err(StorageError::PutObject("scripted outage".into()));
        }
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
        MEDIA_BASE
    }
}

// ---------------------------------------------------------------------------
// Engine and database helpers
// ---------------------------------------------------------------------------

pub fn build_engine(pool: PgPool, provider: Arc<ScriptedProvider>, store: Arc<MemoryStore>) -> Engine {
    let mirror = ArtifactMirror::new(store, reqwest::Client::new());
    Engine::new(pool, Arc::new(ScriptedFactory(provider)), Arc::new(mirror))
}

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

/// Insert a pending job directly, bypassing dispatch.
pub async fn insert_pending_job(pool: &PgPool, user_id: i64, cost: i64, task_ids: &[&str]) -> GenerationJob {
    let mut conn = pool.acquire().await.unwrap();
    let job = GenerationJobRepo::insert_batch(
        &mut conn,
        &NewGenerationJob {
            user_id,
            job_type: "text_to_image".into(),
            prompt: "a lantern".into(),
            reference_images: vec![],
            model: "test-model".into(),
            size_ratio: Some("1:1".into()),
            resolution: "1K".into(),
            explicit_size: None,
            cost,
        },
        1,
    )
    .await
    .unwrap()
    .remove(0);
    drop(conn);

    for task_id in task_ids {
        GenerationJobRepo::attach_task(pool, job.id, task_id).await.unwrap();
    }
    GenerationJobRepo::find_by_id(pool, job.id).await.unwrap().unwrap()
}

/// Move a job's creation time into the past.
pub async fn age_job(pool: &PgPool, job_id: i64, minutes: i64) -> GenerationJob {
    sqlx::query("UPDATE generation_jobs SET created_at = NOW() - make_interval(mins => $2) WHERE id = $1")
        .bind(job_id)
        .bind(minutes as i32)
        .execute(pool)
        .await
        .unwrap();
    GenerationJobRepo::find_by_id(pool, job_id).await.unwrap().unwrap()
}

/// Wait for background dispatch to leave a job in a stable state.
pub async fn wait_for<F>(pool: &PgPool, job_id: i64, done: F) -> GenerationJob
where
    F: Fn(&GenerationJob) -> bool,
{
    for _ in 0..200 {
        let job = GenerationJobRepo::find_by_id(pool, job_id).await.unwrap().unwrap();
        if done(&job) {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {job_id} did not reach the expected state in time");
}

pub async fn refund_count(pool: &PgPool, job_id: i64) -> usize {
    LedgerRepo::find_refunds_for_job(pool, job_id).await.unwrap().len()
}
