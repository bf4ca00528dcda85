use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::json;

/// Parse response body to JSON
pub async fn parse_response_body(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Collect the raw response body
pub async fn response_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub fn start_multipart_request(key: &str, total_parts: i32) -> serde_json::Value {
    json!({
        "key": key,
        "content_type": "video/mp4",
        "total_parts": total_parts
    })
}

pub fn complete_multipart_request(
    key: &str,
    upload_id: &str,
    parts: &[(i32, String)],
) -> serde_json::Value {
    let parts: Vec<_> = parts
        .iter()
        .map(|(part_number, e_tag)| json!({ "part_number": part_number, "e_tag": e_tag }))
        .collect();

    json!({
        "key": key,
        "upload_id": upload_id,
        "parts": parts
    })
}
