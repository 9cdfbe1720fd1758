//! Integration tests for generation job persistence and its terminal
//! transitions.

use pixora_db::models::generation_job::{JobListQuery, NewGenerationJob};
use pixora_db::models::status::GenerationStatus;
use pixora_db::models::user::CreateUser;
use pixora_db::repositories::{GenerationJobRepo, UserRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_user(pool: &PgPool, name: &str) -> i64 {
    UserRepo::create(
        pool,
        &CreateUser {
            username: name.to_string(),
            is_admin: false,
        },
    )
    .await
    .unwrap()
    .id
}

fn new_job(user_id: i64) -> NewGenerationJob {
    NewGenerationJob {
        user_id,
        job_type: "text_to_image".to_string(),
        prompt: "a red fox".to_string(),
        reference_images: vec![],
        model: "gpt-image-1".to_string(),
        size_ratio: Some("1:1".to_string()),
        resolution: "1K".to_string(),
        explicit_size: None,
        cost: 2,
    }
}

async fn insert(pool: &PgPool, user_id: i64, count: u32) -> Vec<i64> {
    let mut conn = pool.acquire().await.unwrap();
    GenerationJobRepo::insert_batch(&mut conn, &new_job(user_id), count)
        .await
        .unwrap()
        .into_iter()
        .map(|j| j.id)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn batch_insert_creates_one_row_per_image(pool: PgPool) {
    let user = seed_user(&pool, "u1").await;
    let ids = insert(&pool, user, 3).await;
    assert_eq!(ids.len(), 3);

    for id in ids {
        let job = GenerationJobRepo::find_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(job.quantity, 1);
        assert_eq!(job.cost, 2);
        assert!(job.is_pending());
        assert!(job.task_ids.0.is_empty());
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn fail_if_pending_transitions_exactly_once(pool: PgPool) {
    let user = seed_user(&pool, "u2").await;
    let id = insert(&pool, user, 1).await[0];

    let mut conn = pool.acquire().await.unwrap();
    let first = GenerationJobRepo::fail_if_pending(&mut conn, id, "boom").await.unwrap();
    let second = GenerationJobRepo::fail_if_pending(&mut conn, id, "boom again").await.unwrap();

    let failed = first.expect("first caller owns the transition");
    assert_eq!(failed.status(), Some(GenerationStatus::Failed));
    assert_eq!(failed.error_message.as_deref(), Some("boom"));
    assert!(second.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn complete_never_resurrects_failed_job(pool: PgPool) {
    let user = seed_user(&pool, "u3").await;
    let id = insert(&pool, user, 1).await[0];

    let mut conn = pool.acquire().await.unwrap();
    GenerationJobRepo::fail_if_pending(&mut conn, id, "timed out").await.unwrap();
    drop(conn);

    let urls = vec!["https://cdn.example.com/a.png".to_string()];
    assert!(!GenerationJobRepo::complete(&pool, id, &urls).await.unwrap());

    let job = GenerationJobRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(job.status(), Some(GenerationStatus::Failed));
    assert!(job.result_urls.0.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn complete_is_repeatable(pool: PgPool) {
    let user = seed_user(&pool, "u4").await;
    let id = insert(&pool, user, 1).await[0];
    let urls = vec!["https://cdn.example.com/a.png".to_string()];

    assert!(GenerationJobRepo::complete(&pool, id, &urls).await.unwrap());
    assert!(GenerationJobRepo::complete(&pool, id, &urls).await.unwrap());

    let job = GenerationJobRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(job.progress, 100);
    assert_eq!(job.result_urls.0, urls);
    assert!(job.completed_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn attach_task_only_while_pending(pool: PgPool) {
    let user = seed_user(&pool, "u5").await;
    let id = insert(&pool, user, 1).await[0];

    assert!(GenerationJobRepo::attach_task(&pool, id, "task-1").await.unwrap());
    assert!(GenerationJobRepo::attach_task(&pool, id, "task-2").await.unwrap());
    let job = GenerationJobRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(job.task_ids.0, vec!["task-1", "task-2"]);

    let mut conn = pool.acquire().await.unwrap();
    GenerationJobRepo::fail_if_pending(&mut conn, id, "x").await.unwrap();
    drop(conn);
    assert!(!GenerationJobRepo::attach_task(&pool, id, "task-3").await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn terminal_transitions_drop_task_handles(pool: PgPool) {
    let user = seed_user(&pool, "u7").await;
    let ids = insert(&pool, user, 2).await;
    let (done, gone) = (ids[0], ids[1]);
    GenerationJobRepo::attach_task(&pool, done, "done").await.unwrap();
    GenerationJobRepo::attach_task(&pool, gone, "gone").await.unwrap();

    let urls = vec!["https://cdn.example.com/a.png".to_string()];
    assert!(GenerationJobRepo::complete(&pool, done, &urls).await.unwrap());
    let mut conn = pool.acquire().await.unwrap();
    let failed = GenerationJobRepo::fail_if_pending(&mut conn, gone, "not found")
        .await
        .unwrap()
        .expect("job was pending");
    drop(conn);
    assert!(failed.task_ids.0.is_empty());

    for id in [done, gone] {
        let job = GenerationJobRepo::find_by_id(&pool, id).await.unwrap().unwrap();
        assert!(!job.is_pending());
        assert!(job.task_ids.0.is_empty(), "job {id} kept {:?}", job.task_ids.0);
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn terminal_row_with_handles_is_rejected(pool: PgPool) {
    let user = seed_user(&pool, "u8").await;
    let id = insert(&pool, user, 1).await[0];

    let result = sqlx::query(
        "UPDATE generation_jobs SET status_id = $2, task_ids = '[\"t\"]'::jsonb WHERE id = $1",
    )
    .bind(id)
    .bind(GenerationStatus::Completed.id())
    .execute(&pool)
    .await;
    assert!(result.is_err());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_filters_by_user_and_status(pool: PgPool) {
    let a = seed_user(&pool, "owner").await;
    let b = seed_user(&pool, "other").await;
    let a_ids = insert(&pool, a, 2).await;
    insert(&pool, b, 1).await;

    let urls = vec!["https://cdn.example.com/a.png".to_string()];
    GenerationJobRepo::complete(&pool, a_ids[0], &urls).await.unwrap();

    let all_a = GenerationJobRepo::list(&pool, Some(a), &JobListQuery::default())
        .await
        .unwrap();
    assert_eq!(all_a.len(), 2);

    let completed = GenerationJobRepo::list(
        &pool,
        Some(a),
        &JobListQuery {
            status: Some("completed".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, a_ids[0]);

    let everyone = GenerationJobRepo::list(&pool, None, &JobListQuery::default())
        .await
        .unwrap();
    assert_eq!(everyone.len(), 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn pending_jobs_cannot_be_deleted(pool: PgPool) {
    let user = seed_user(&pool, "u6").await;
    let id = insert(&pool, user, 1).await[0];

    assert!(!GenerationJobRepo::delete_terminal(&pool, id).await.unwrap());

    let urls = vec!["https://cdn.example.com/a.png".to_string()];
    GenerationJobRepo::complete(&pool, id, &urls).await.unwrap();
    assert!(GenerationJobRepo::delete_terminal(&pool, id).await.unwrap());
    assert!(GenerationJobRepo::find_by_id(&pool, id).await.unwrap().is_none());
}
