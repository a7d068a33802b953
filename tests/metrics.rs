mod common;

use std::collections::HashSet;
use std::sync::atomic::Ordering;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_util::debugging::DebuggingRecorder;
use serde_json::json;

use common::{get, json_request, send, test_app};
use topzonal::application::payments::SIGNATURE_HEADER;

#[tokio::test]
async fn service_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let app = test_app();
    let listing = app.repos.insert_listing("owner", "metered");
    app.repos.insert_reviews(listing.id, 1);

    // Miss and recompute, then a hit.
    for _ in 0..2 {
        let response = send(&app.router, get("/api/listings/popular")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    app.index.failing.store(true, Ordering::SeqCst);
    let response = send(
        &app.router,
        json_request(
            "POST",
            "/api/listings",
            Some("user_a"),
            json!({
                "title": "Flat",
                "description": "Second floor",
                "price": "99.00",
                "latitude": 44.4,
                "longitude": 26.1
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(
        &app.router,
        Request::post("/api/stripe/webhook")
            .header(SIGNATURE_HEADER, "t=1,v1=00")
            .body(Body::from("{}"))
            .expect("request should build"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "topzonal_ranking_cache_hit_total",
        "topzonal_ranking_cache_miss_total",
        "topzonal_ranking_recompute_total",
        "topzonal_mirror_failure_total",
        "topzonal_webhook_rejected_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
