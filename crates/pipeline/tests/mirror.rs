//! Artifact mirror against a fake image host.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use common::{MemoryStore, MEDIA_BASE};
use pixora_pipeline::ArtifactMirror;

async fn spawn_host() -> String {
    let app = Router::new()
        .route(
            "/img/cat.webp",
            get(|| async { ([(header::CONTENT_TYPE, "image/webp")], vec![9u8, 8, 7]).into_response() }),
        )
        .route(
            "/img/expired.png",
            get(|| async { StatusCode::NOT_FOUND.into_response() }),
        )
        .route(
            "/img/large.png",
            get(|| async { ([(header::CONTENT_TYPE, "image/png")], vec![1u8; 64]).into_response() }),
        )
        .route(
            "/img/streamed.png",
            get(|| async {
                let chunks = futures::stream::iter((0..4).map(|_| Ok::<_, std::io::Error>(vec![2u8; 16])));
                ([(header::CONTENT_TYPE, "image/png")], Body::from_stream(chunks)).into_response()
            }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn downloads_are_stored_with_inferred_extension() {
    let host = spawn_host().await;
    let store = Arc::new(MemoryStore::default());
    let mirror = ArtifactMirror::new(store.clone(), reqwest::Client::new());

    let urls = mirror.persist(&[format!("{host}/img/cat.webp")], 5).await;

    assert_eq!(urls.len(), 1);
    assert!(urls[0].starts_with(&format!("{MEDIA_BASE}/generations/5/0-")));
    assert!(urls[0].ends_with(".webp"));
    let objects = store.objects.lock().unwrap();
    let stored = objects.values().next().unwrap();
    assert_eq!(stored.body, vec![9, 8, 7]);
    assert_eq!(stored.content_type.as_deref(), Some("image/webp"));
}

#[tokio::test]
async fn failed_download_keeps_original_and_preserves_order() {
    let host = spawn_host().await;
    let store = Arc::new(MemoryStore::default());
    let mirror = ArtifactMirror::new(store.clone(), reqwest::Client::new());
    let expired = format!("{host}/img/expired.png");
    let durable = format!("{MEDIA_BASE}/generations/1/0-1.png");

    let urls = mirror
        .persist(&[expired.clone(), durable.clone(), format!("{host}/img/cat.webp")], 9)
        .await;

    assert_eq!(urls[0], expired);
    assert_eq!(urls[1], durable);
    assert!(urls[2].starts_with(&format!("{MEDIA_BASE}/generations/9/2-")));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn unsupported_references_pass_through() {
    let store = Arc::new(MemoryStore::default());
    let mirror = ArtifactMirror::new(store.clone(), reqwest::Client::new());

    let urls = mirror.persist(&["ftp://old.example.com/x.png".to_string()], 1).await;

    assert_eq!(urls, vec!["ftp://old.example.com/x.png".to_string()]);
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn oversized_images_keep_provider_reference() {
    let host = spawn_host().await;
    let store = Arc::new(MemoryStore::default());
    let mirror = ArtifactMirror::new(store.clone(), reqwest::Client::new()).with_max_download_bytes(32);
    let large = format!("{host}/img/large.png");
    let streamed = format!("{host}/img/streamed.png");

    let urls = mirror
        .persist(&[large.clone(), streamed.clone(), format!("{host}/img/cat.webp")], 3)
        .await;

    assert_eq!(urls[0], large);
    assert_eq!(urls[1], streamed);
    assert!(urls[2].starts_with(&format!("{MEDIA_BASE}/generations/3/2-")));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn streamed_body_within_limit_is_stored() {
    let host = spawn_host().await;
    let store = Arc::new(MemoryStore::default());
    let mirror = ArtifactMirror::new(store.clone(), reqwest::Client::new()).with_max_download_bytes(64);

    let urls = mirror.persist(&[format!("{host}/img/streamed.png")], 4).await;

    assert!(urls[0].starts_with(&format!("{MEDIA_BASE}/generations/4/0-")));
    let objects = store.objects.lock().unwrap();
    assert_eq!(objects.values().next().unwrap().body.len(), 64);
}
