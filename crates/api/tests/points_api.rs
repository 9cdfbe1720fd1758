//! HTTP-level tests for balances and admin credits.

mod common;

use axum::http::StatusCode;
use common::{admin_token, body_json, get_auth, post_json_auth, seed_user, user_token};
use pixora_db::repositories::LedgerRepo;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn points_returns_balance_and_history(pool: PgPool) {
    let user = seed_user(&pool, "mia", 30).await;
    let app = common::build_test_app(pool);

    let response = get_auth(app, "/api/v1/points", &user_token(user)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["balance"], 30);
    let history = json["data"]["transactions"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["kind"], "adjust");
    assert_eq!(history[0]["balance_after"], 30);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn replayed_recharge_credits_once(pool: PgPool) {
    let admin = seed_user(&pool, "root", 0).await;
    let user = seed_user(&pool, "nina", 0).await;
    let uri = format!("/api/v1/admin/users/{user}/points");
    let body = json!({ "amount": 50, "kind": "recharge", "order_id": "ord-7781" });

    let app = common::build_test_app(pool.clone());
    let first = post_json_auth(app, &uri, body.clone(), &admin_token(admin)).await;
    assert_eq!(first.status(), StatusCode::OK);
    let first = body_json(first).await;

    let app = common::build_test_app(pool.clone());
    let second = body_json(post_json_auth(app, &uri, body, &admin_token(admin)).await).await;

    assert_eq!(first["data"]["id"], second["data"]["id"]);
    assert_eq!(LedgerRepo::balance(&pool, user).await.unwrap(), 50);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn recharge_without_order_id_is_400(pool: PgPool) {
    let admin = seed_user(&pool, "root", 0).await;
    let user = seed_user(&pool, "olga", 0).await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app,
        &format!("/api/v1/admin/users/{user}/points"),
        json!({ "amount": 50, "kind": "recharge" }),
        &admin_token(admin),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn non_admin_cannot_credit(pool: PgPool) {
    let user = seed_user(&pool, "pete", 0).await;
    let app = common::build_test_app(pool.clone());

    let response = post_json_auth(
        app,
        &format!("/api/v1/admin/users/{user}/points"),
        json!({ "amount": 1000, "kind": "adjust" }),
        &user_token(user),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(LedgerRepo::balance(&pool, user).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn crediting_unknown_user_is_404(pool: PgPool) {
    let admin = seed_user(&pool, "root", 0).await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/admin/users/424242/points",
        json!({ "amount": 5, "kind": "adjust" }),
        &admin_token(admin),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
