mod common;

use common::*;

use http::StatusCode;
use media_backend::storage::ObjectAcl;
use serde_json::json;

const VIDEO_KEY: &str = "videos/rust-101/lesson-1.mp4";

/// Starts a session through the API and returns its upload id
async fn start_session(setup: &TestSetup, total_parts: i32) -> String {
    let response = setup
        .send_post_request(
            "/v1/uploads/multipart",
            start_multipart_request(VIDEO_KEY, total_parts),
        )
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    body["upload_id"].as_str().unwrap().to_string()
}

/// Uploads every part the way a browser would and returns the collected ETags
async fn upload_parts(setup: &TestSetup, upload_id: &str, chunks: &[&str]) -> Vec<(i32, String)> {
    let mut parts = Vec::new();
    for (part_number, chunk) in (1..).zip(chunks) {
        let e_tag = setup
            .store
            .upload_part(upload_id, part_number, chunk.to_string())
            .await
            .unwrap();
        parts.push((part_number, e_tag));
    }
    parts
}

// Happy path tests

#[tokio::test]
async fn test_start_multipart_upload_issues_ordered_parts() {
    let setup = TestSetup::new();

    let response = setup
        .send_post_request(
            "/v1/uploads/multipart",
            start_multipart_request(VIDEO_KEY, 3),
        )
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["bucket"], UPLOAD_BUCKET);
    assert_eq!(body["key"], VIDEO_KEY);
    assert_eq!(body["status"], "parts_issued");
    assert!(body["upload_id"].is_string());

    let parts = body["parts"].as_array().unwrap();
    let numbers: Vec<i64> = parts
        .iter()
        .map(|part| part["part_number"].as_i64().unwrap())
        .collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    // All part URLs share one expiry
    let expiry = &parts[0]["expires_at"];
    assert!(parts.iter().all(|part| &part["expires_at"] == expiry));
    assert!(parts
        .iter()
        .all(|part| part["url"].as_str().unwrap().contains("X-Amz-Expires=3600")));

    // Multipart sessions are private
    let upload_id = body["upload_id"].as_str().unwrap();
    assert_eq!(
        setup.store.session_acl(upload_id).await,
        Some(ObjectAcl::Private)
    );
}

#[tokio::test]
async fn test_multipart_upload_full_flow() {
    let setup = TestSetup::new();

    let upload_id = start_session(&setup, 3).await;
    let mut parts = upload_parts(&setup, &upload_id, &["aaa", "bbb", "cc"]).await;

    // Clients report parts in whatever order their uploads finished
    parts.reverse();

    let response = setup
        .send_post_request(
            "/v1/uploads/multipart/complete",
            complete_multipart_request(VIDEO_KEY, &upload_id, &parts),
        )
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["bucket"], UPLOAD_BUCKET);
    assert_eq!(body["key"], VIDEO_KEY);
    assert!(body["e_tag"].is_string());
    assert_eq!(
        body["playback_path"],
        format!("/api/video/{VIDEO_KEY}")
    );

    let object = setup.store.object(UPLOAD_BUCKET, VIDEO_KEY).await.unwrap();
    assert_eq!(&object.data[..], b"aaabbbcc");
    assert_eq!(object.acl, ObjectAcl::Private);
    assert_eq!(setup.store.completed_part_orders().await, vec![vec![1, 2, 3]]);
}

#[tokio::test]
async fn test_issue_part_urls_for_open_session() {
    let setup = TestSetup::new();
    let upload_id = start_session(&setup, 2).await;

    let response = setup
        .send_post_request(
            "/v1/uploads/multipart/parts",
            json!({ "key": VIDEO_KEY, "upload_id": upload_id, "total_parts": 4 }),
        )
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["parts"].as_array().unwrap().len(), 4);
    assert_eq!(body["parts"][3]["part_number"], 4);
}

#[tokio::test]
async fn test_create_presigned_upload_url() {
    let setup = TestSetup::new();

    let response = setup
        .send_post_request(
            "/v1/uploads/presigned-url",
            json!({ "key": "thumbnails/rust-101.png", "content_type": "image/png" }),
        )
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["acl"], "public-read");
    assert_eq!(body["headers"]["x-amz-acl"], "public-read");
    assert_eq!(body["headers"]["content-type"], "image/png");
    assert!(body["url"].as_str().unwrap().contains("X-Amz-Expires=600"));
    assert_eq!(
        body["public_url"],
        format!("{PUBLIC_ASSET_BASE_URL}/thumbnails/rust-101.png")
    );
    assert!(body["expires_at"].is_string());
}

#[tokio::test]
async fn test_abort_multipart_upload() {
    let setup = TestSetup::new();
    let upload_id = start_session(&setup, 2).await;

    let payload = json!({ "key": VIDEO_KEY, "upload_id": upload_id });

    let response = setup
        .send_post_request("/v1/uploads/multipart/abort", payload.clone())
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "aborted");
    assert_eq!(setup.store.open_sessions().await, 0);

    // A second abort finds nothing to discard
    let response = setup
        .send_post_request("/v1/uploads/multipart/abort", payload)
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"]["code"], "upload_not_found");
}

// Completion failure tests

#[tokio::test]
async fn test_complete_with_missing_part_is_rejected() {
    let setup = TestSetup::new();
    let upload_id = start_session(&setup, 3).await;
    let parts = upload_parts(&setup, &upload_id, &["a", "b", "c"]).await;

    // Part 2 never reported
    let reported = vec![parts[0].clone(), parts[2].clone()];

    let response = setup
        .send_post_request(
            "/v1/uploads/multipart/complete",
            complete_multipart_request(VIDEO_KEY, &upload_id, &reported),
        )
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = parse_response_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["allowRetry"], false);
    assert_eq!(body["error"]["code"], "completion_failed");

    // Nothing reached the store and the session stays open
    assert!(setup.store.completed_part_orders().await.is_empty());
    assert_eq!(setup.store.open_sessions().await, 1);
}

#[tokio::test]
async fn test_complete_with_empty_part_list_is_rejected() {
    let setup = TestSetup::new();
    let upload_id = start_session(&setup, 1).await;

    let response = setup
        .send_post_request(
            "/v1/uploads/multipart/complete",
            complete_multipart_request(VIDEO_KEY, &upload_id, &[]),
        )
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"]["code"], "completion_failed");
}

#[tokio::test]
async fn test_complete_unknown_session_is_rejected() {
    let setup = TestSetup::new();

    let response = setup
        .send_post_request(
            "/v1/uploads/multipart/complete",
            complete_multipart_request(VIDEO_KEY, "no-such-upload", &[(1, "\"e1\"".to_string())]),
        )
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"]["code"], "completion_failed");
}

#[tokio::test]
async fn test_complete_twice_is_rejected() {
    let setup = TestSetup::new();
    let upload_id = start_session(&setup, 1).await;
    let parts = upload_parts(&setup, &upload_id, &["only"]).await;
    let payload = complete_multipart_request(VIDEO_KEY, &upload_id, &parts);

    let response = setup
        .send_post_request("/v1/uploads/multipart/complete", payload.clone())
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let response = setup
        .send_post_request("/v1/uploads/multipart/complete", payload)
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// Validation error tests

#[tokio::test]
async fn test_start_with_invalid_part_count() {
    let setup = TestSetup::new();

    for total_parts in [0, -1, 10_001] {
        let response = setup
            .send_post_request(
                "/v1/uploads/multipart",
                start_multipart_request(VIDEO_KEY, total_parts),
            )
            .await
            .expect("Failed to send request");

        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "Failed for total_parts: {total_parts}"
        );
    }

    assert_eq!(setup.store.open_sessions().await, 0);
}

#[tokio::test]
async fn test_start_with_invalid_key() {
    let setup = TestSetup::new();

    for key in ["/videos/a.mp4", "videos/../a.mp4", "videos//a.mp4"] {
        let response = setup
            .send_post_request("/v1/uploads/multipart", start_multipart_request(key, 1))
            .await
            .expect("Failed to send request");

        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "Failed for key: {key}"
        );
        let body = parse_response_body(response).await;
        assert_eq!(body["error"]["code"], "invalid_input");
    }
}

#[tokio::test]
async fn test_key_length_is_bounded() {
    let setup = TestSetup::new();

    let longest = format!("videos/{}", "k".repeat(1024 - "videos/".len()));
    let response = setup
        .send_post_request("/v1/uploads/multipart", start_multipart_request(&longest, 1))
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let too_long = format!("{longest}k");
    let response = setup
        .send_post_request("/v1/uploads/multipart", start_multipart_request(&too_long, 1))
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = setup
        .send_post_request(
            "/v1/uploads/presigned-url",
            json!({ "key": too_long, "content_type": "image/png" }),
        )
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_issue_part_urls_rejects_traversal_key() {
    let setup = TestSetup::new();
    let upload_id = start_session(&setup, 1).await;

    let response = setup
        .send_post_request(
            "/v1/uploads/multipart/parts",
            json!({ "key": "/videos/../x.mp4", "upload_id": upload_id, "total_parts": 2 }),
        )
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn test_presigned_url_with_invalid_content_type() {
    let setup = TestSetup::new();

    let response = setup
        .send_post_request(
            "/v1/uploads/presigned-url",
            json!({ "key": "thumbnails/a.png", "content_type": "not a mime type" }),
        )
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn test_start_with_unknown_field() {
    let setup = TestSetup::new();

    let mut payload = start_multipart_request(VIDEO_KEY, 1);
    payload["bucket"] = json!("someone-elses-bucket");

    let response = setup
        .send_post_request("/v1/uploads/multipart", payload)
        .await
        .expect("Failed to send request");

    assert!(response.status().is_client_error());
}

// Storage failure tests

#[tokio::test]
async fn test_storage_unavailable() {
    let setup = TestSetup::new();
    setup.store.set_unavailable(true);

    let response = setup
        .send_post_request(
            "/v1/uploads/multipart",
            start_multipart_request(VIDEO_KEY, 2),
        )
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = parse_response_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["allowRetry"], true);
    assert_eq!(body["error"]["code"], "storage_unavailable");
}

#[tokio::test]
async fn test_part_presign_failure_fails_whole_request() {
    let setup = TestSetup::new();
    setup.store.fail_presign_for_part(2).await;

    let response = setup
        .send_post_request(
            "/v1/uploads/multipart",
            start_multipart_request(VIDEO_KEY, 3),
        )
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"]["code"], "storage_unavailable");
}
