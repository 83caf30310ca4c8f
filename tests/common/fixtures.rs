//! Mock Listmonk API responses

use super::config::{API_PASS, API_USER};
use listmonk_backup::{Resource, ResponseShape};
use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{basic_auth, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Wrap `records` in the envelope `resource` is served with
pub fn envelope(resource: Resource, records: Value) -> Value {
    match resource.shape() {
        ResponseShape::Paged => json!({"data": {"results": records}}),
        ResponseShape::Bare => json!({"data": records}),
    }
}

/// Serve `records` for `resource`, requiring credentials and `per_page=all`
pub async fn mount_collection(server: &MockServer, resource: Resource, records: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/{}", resource.endpoint())))
        .and(query_param("per_page", "all"))
        .and(basic_auth(API_USER, API_PASS))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(resource, records)))
        .with_priority(1)
        .mount(server)
        .await;
}

/// Answer `resource` with a bare status code
pub async fn mount_status(server: &MockServer, resource: Resource, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/api/{}", resource.endpoint())))
        .respond_with(ResponseTemplate::new(status).set_body_string("internal error"))
        .with_priority(1)
        .mount(server)
        .await;
}

/// Answer `resource` only after `delay`, long enough to trip the client timeout
pub async fn mount_stalled(server: &MockServer, resource: Resource, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(format!("/api/{}", resource.endpoint())))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(resource, json!([])))
                .set_delay(delay),
        )
        .with_priority(1)
        .mount(server)
        .await;
}

/// Fallback: every resource not mounted otherwise returns an empty collection
pub async fn mount_empty_api(server: &MockServer) {
    for resource in Resource::ALL {
        Mock::given(method("GET"))
            .and(path(format!("/api/{}", resource.endpoint())))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(resource, json!([]))))
            .with_priority(10)
            .mount(server)
            .await;
    }
}

/// Serve a binary upload at `/uploads/{name}`
pub async fn mount_upload(server: &MockServer, encoded_name: &str, bytes: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/uploads/{encoded_name}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes.to_vec()))
        .mount(server)
        .await;
}

/// A media listing entry the way Listmonk returns it
pub fn media_item(server: &MockServer, id: u64, filename: &str) -> Value {
    json!({
        "id": id,
        "uuid": format!("00000000-0000-0000-0000-{id:012}"),
        "filename": filename,
        "content_type": "image/png",
        "url": format!("{}/uploads/{filename}", server.uri()),
        "created_at": "2025-01-01T00:00:00Z"
    })
}
