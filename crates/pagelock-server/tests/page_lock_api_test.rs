//! End-to-end tests for the page lock HTTP API
//!
//! Runs the full route table against an in-process service, including the
//! live event stream.

use std::future::poll_fn;
use std::pin::Pin;
use std::time::Duration;

use actix_web::body::MessageBody;
use actix_web::{App, test, web};
use pagelock_core::LockEvent;
use pagelock_core::frame::{Frame, FrameDecoder};
use pagelock_server::api::route;
use pagelock_server::model::common::AppState;

async fn read_frames<B>(body: &mut Pin<Box<B>>, decoder: &mut FrameDecoder, count: usize) -> Vec<Frame>
where
    B: MessageBody,
    B::Error: std::fmt::Debug,
{
    let mut frames = Vec::new();
    while frames.len() < count {
        let chunk = tokio::time::timeout(
            Duration::from_secs(5),
            poll_fn(|cx| body.as_mut().poll_next(cx)),
        )
        .await
        .expect("timed out waiting for a frame")
        .expect("stream ended")
        .unwrap();
        frames.extend(decoder.push(&chunk));
    }
    frames
}

fn lock_request(page_id: &str, user: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri(&format!("/api/page-locks/{}/lock", page_id))
        .insert_header(("X-User-Id", user))
}

#[actix_web::test]
async fn test_lock_lifecycle() {
    let data = web::Data::new(AppState::with_defaults());
    let app = test::init_service(App::new().app_data(data.clone()).configure(route::configure)).await;

    let resp = test::call_service(&app, lock_request("doc-1", "alice").to_request()).await;
    assert_eq!(resp.status(), 200);

    let resp = test::call_service(&app, lock_request("doc-1", "bob").to_request()).await;
    assert_eq!(resp.status(), 409);

    let req = test::TestRequest::get().uri("/api/page-locks").to_request();
    let locks: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(locks.as_array().unwrap().len(), 1);
    assert_eq!(locks[0]["lockedBy"], "alice");

    let req = test::TestRequest::delete().uri("/api/page-locks/doc-1").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    // Freed page can be taken by somebody else
    let resp = test::call_service(&app, lock_request("doc-1", "bob").to_request()).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::get().uri("/api/page-locks").to_request();
    let locks: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(locks[0]["lockedBy"], "bob");
}

#[actix_web::test]
async fn test_concurrent_lock_requests_have_one_winner() {
    let data = web::Data::new(AppState::with_defaults());
    let app = test::init_service(App::new().app_data(data.clone()).configure(route::configure)).await;

    let requests = (0..10).map(|i| test::call_service(&app, lock_request("shared", &format!("user-{}", i)).to_request()));
    let responses = futures::future::join_all(requests).await;

    let ok = responses.iter().filter(|r| r.status() == 200).count();
    let conflicts = responses.iter().filter(|r| r.status() == 409).count();
    assert_eq!(ok, 1);
    assert_eq!(conflicts, 9);
}

#[actix_web::test]
async fn test_stream_catch_up_and_live_events() {
    let data = web::Data::new(AppState::with_defaults());
    let app = test::init_service(App::new().app_data(data.clone()).configure(route::configure)).await;

    test::call_service(&app, lock_request("p1", "bob").to_request()).await;

    let req = test::TestRequest::get().uri("/api/page-locks/stream").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let mut body = Box::pin(resp.into_body());
    let mut decoder = FrameDecoder::new();

    let frames = read_frames(&mut body, &mut decoder, 2).await;
    assert_eq!(frames[0].event.as_deref(), Some("connected"));
    assert_eq!(frames[0].data.as_deref(), Some(r#"{"type":"connected"}"#));
    match frames[1].to_event() {
        Some(LockEvent::PageLocked { page_id, locked_by, .. }) => {
            assert_eq!(page_id, "p1");
            assert_eq!(locked_by, "bob");
        }
        other => panic!("expected page-locked, got {:?}", other),
    }

    test::call_service(&app, lock_request("p2", "carol").to_request()).await;
    let req = test::TestRequest::delete().uri("/api/page-locks/p1").to_request();
    test::call_service(&app, req).await;

    let frames = read_frames(&mut body, &mut decoder, 2).await;
    assert_eq!(frames[0].event.as_deref(), Some("page-locked"));
    assert!(frames[0].data.as_deref().unwrap().contains(r#""pageId":"p2""#));
    assert_eq!(frames[1].to_event(), Some(LockEvent::page_unlocked("p1")));
}

#[actix_web::test]
async fn test_disconnected_stream_is_unregistered() {
    let data = web::Data::new(AppState::with_defaults());
    let app = test::init_service(App::new().app_data(data.clone()).configure(route::configure)).await;

    let req = test::TestRequest::get().uri("/api/page-locks/stream").to_request();
    let resp = test::call_service(&app, req).await;
    let mut body = Box::pin(resp.into_body());
    read_frames(&mut body, &mut FrameDecoder::new(), 1).await;
    assert_eq!(data.service.subscriber_count(), 1);

    drop(body);
    tokio::time::timeout(Duration::from_secs(5), async {
        while data.service.subscriber_count() != 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("subscriber was not removed");

    // Locking keeps working with nobody listening
    let resp = test::call_service(&app, lock_request("p1", "alice").to_request()).await;
    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
async fn test_server_shutdown_ends_stream() {
    let data = web::Data::new(AppState::with_defaults());
    let app = test::init_service(App::new().app_data(data.clone()).configure(route::configure)).await;

    let req = test::TestRequest::get().uri("/api/page-locks/stream").to_request();
    let resp = test::call_service(&app, req).await;
    let mut body = Box::pin(resp.into_body());
    read_frames(&mut body, &mut FrameDecoder::new(), 1).await;

    data.shutdown.shutdown();

    let end = tokio::time::timeout(
        Duration::from_secs(5),
        poll_fn(|cx| body.as_mut().poll_next(cx)),
    )
    .await
    .expect("stream did not end");
    assert!(end.is_none());
    assert_eq!(data.service.subscriber_count(), 0);
}

#[actix_web::test]
async fn test_health_and_metrics() {
    let data = web::Data::new(AppState::with_defaults());
    let app = test::init_service(App::new().app_data(data.clone()).configure(route::configure)).await;

    let req = test::TestRequest::get().uri("/health/liveness").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::get().uri("/health/readiness").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    // No recorder is installed for in-process tests
    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 503);
}
