//! HttpClient against an in-process fake InfluxDB (axum)

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use influxdb2_client::{
    Authorization, AuthorizationStatus, Bucket, ClientError, ClientOptions, HttpClient,
    InfluxClient, Permission, PermissionAction, PermissionResource, RetentionRule,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TOKEN: &str = "test-token";

#[derive(Clone, Default)]
struct FakeInflux {
    buckets: Arc<Mutex<HashMap<String, Value>>>,
    authorizations: Arc<Mutex<Vec<Value>>>,
    next_id: Arc<Mutex<u64>>,
}

impl FakeInflux {
    fn next_id(&self) -> String {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        format!("{:016x}", *next)
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"code": "unauthorized", "message": "unauthorized access"})),
    )
        .into_response()
}

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"code": "not found", "message": format!("{} not found", what)})),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Token {}", TOKEN))
        .unwrap_or(false)
}

async fn ready() -> Json<Value> {
    Json(json!({"status": "ready", "started": "2024-05-01T10:00:00Z", "up": "1h0m0s"}))
}

async fn create_bucket(
    State(state): State<FakeInflux>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let id = state.next_id();
    body["id"] = json!(id);
    body["type"] = json!("user");
    body["createdAt"] = json!("2024-05-01T10:00:00Z");
    body["updatedAt"] = json!("2024-05-01T10:00:00Z");
    state.buckets.lock().unwrap().insert(id, body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn get_bucket(
    State(state): State<FakeInflux>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    match state.buckets.lock().unwrap().get(&id) {
        Some(bucket) => Json(bucket.clone()).into_response(),
        None => not_found("bucket"),
    }
}

async fn patch_bucket(
    State(state): State<FakeInflux>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut buckets = state.buckets.lock().unwrap();
    let Some(bucket) = buckets.get_mut(&id) else {
        return not_found("bucket");
    };
    for (key, value) in patch.as_object().cloned().unwrap_or_default() {
        bucket[key] = value;
    }
    bucket["updatedAt"] = json!("2024-05-02T10:00:00Z");
    Json(bucket.clone()).into_response()
}

async fn delete_bucket(
    State(state): State<FakeInflux>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    match state.buckets.lock().unwrap().remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found("bucket"),
    }
}

async fn create_authorization(
    State(state): State<FakeInflux>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    body["id"] = json!(state.next_id());
    body["token"] = json!("issued-secret");
    body["userID"] = json!("user1");
    state.authorizations.lock().unwrap().push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn list_authorizations(
    State(state): State<FakeInflux>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let org = params.get("orgID").cloned();
    let list: Vec<Value> = state
        .authorizations
        .lock()
        .unwrap()
        .iter()
        .filter(|a| org.as_deref().is_none_or(|o| a["orgID"] == json!(o)))
        .map(|a| {
            let mut a = a.clone();
            a.as_object_mut().unwrap().remove("token");
            a
        })
        .collect();
    Json(json!({"authorizations": list})).into_response()
}

async fn patch_authorization(
    State(state): State<FakeInflux>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut authorizations = state.authorizations.lock().unwrap();
    match authorizations.iter_mut().find(|a| a["id"] == json!(id)) {
        Some(a) => {
            a["status"] = patch["status"].clone();
            Json(a.clone()).into_response()
        }
        None => not_found("authorization"),
    }
}

async fn delete_authorization(
    State(state): State<FakeInflux>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut authorizations = state.authorizations.lock().unwrap();
    let before = authorizations.len();
    authorizations.retain(|a| a["id"] != json!(id));
    if authorizations.len() == before {
        return not_found("authorization");
    }
    StatusCode::NO_CONTENT.into_response()
}

/// Start the fake server on an ephemeral port and return its base URL
async fn start_fake_influx() -> String {
    let app = Router::new()
        .route("/ready", get(ready))
        .route("/api/v2/buckets", axum::routing::post(create_bucket))
        .route(
            "/api/v2/buckets/{id}",
            get(get_bucket).patch(patch_bucket).delete(delete_bucket),
        )
        .route(
            "/api/v2/authorizations",
            get(list_authorizations).post(create_authorization),
        )
        .route(
            "/api/v2/authorizations/{id}",
            axum::routing::patch(patch_authorization).delete(delete_authorization),
        )
        .with_state(FakeInflux::default());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn temp_bucket(org_id: &str) -> Bucket {
    Bucket {
        name: "temp".to_string(),
        description: Some(String::new()),
        org_id: Some(org_id.to_string()),
        rp: Some(String::new()),
        retention_rules: vec![RetentionRule {
            rule_type: Some("expire".to_string()),
            every_seconds: 2592000,
            shard_group_duration_seconds: None,
        }],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_ready() {
    let url = start_fake_influx().await;
    let client = HttpClient::new(&url, TOKEN).unwrap();

    let ready = client.ready().await.unwrap();
    assert_eq!(ready.status.as_deref(), Some("ready"));
    assert!(ready.started.is_some());
    assert_eq!(client.server_url(), url);
}

#[tokio::test]
async fn test_bucket_lifecycle() {
    let url = start_fake_influx().await;
    let client = HttpClient::new(&url, TOKEN).unwrap();
    let buckets = client.buckets_api();

    let created = buckets.create_bucket(&temp_bucket("org1")).await.unwrap();
    let id = created.id.clone().unwrap();
    assert!(created.created_at.is_some());

    let found = buckets.find_bucket_by_id(&id).await.unwrap();
    assert_eq!(found.name, "temp");
    assert_eq!(found.org_id.as_deref(), Some("org1"));

    let mut changed = found.clone();
    changed.name = "temp-renamed".to_string();
    changed.description = Some("renamed".to_string());
    let updated = buckets.update_bucket(&changed).await.unwrap();
    assert_eq!(updated.name, "temp-renamed");
    assert_eq!(updated.description.as_deref(), Some("renamed"));

    buckets.delete_bucket_with_id(&id).await.unwrap();

    let err = buckets.find_bucket_by_id(&id).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 404, .. }));
    assert_eq!(err.to_string(), "not found: bucket not found");

    // Deleting twice surfaces the server's answer
    let err = buckets.delete_bucket_with_id(&id).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 404, .. }));
}

#[tokio::test]
async fn test_wrong_token_is_api_error() {
    let url = start_fake_influx().await;
    let client = HttpClient::new(&url, "wrong").unwrap();

    let err = client
        .buckets_api()
        .create_bucket(&temp_bucket("org1"))
        .await
        .unwrap_err();
    match err {
        ClientError::Api { status, code, .. } => {
            assert_eq!(status, 401);
            assert_eq!(code, "unauthorized");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_update_without_id_is_rejected_locally() {
    let url = start_fake_influx().await;
    let client = HttpClient::new(&url, TOKEN).unwrap();

    let err = client
        .buckets_api()
        .update_bucket(&temp_bucket("org1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_authorization_lifecycle() {
    let url = start_fake_influx().await;
    let client = HttpClient::new(&url, TOKEN).unwrap();
    let api = client.authorizations_api();

    let request = Authorization {
        org_id: Some("org1".to_string()),
        description: Some(String::new()),
        status: Some(AuthorizationStatus::Active),
        permissions: vec![Permission {
            action: PermissionAction::Read,
            resource: PermissionResource {
                resource_type: "buckets".to_string(),
                id: Some("b1".to_string()),
                org_id: Some("org1".to_string()),
                ..Default::default()
            },
        }],
        ..Default::default()
    };

    let created = api.create_authorization(&request).await.unwrap();
    let id = created.id.clone().unwrap();
    assert_eq!(created.token.as_deref(), Some("issued-secret"));
    assert_eq!(created.user_id.as_deref(), Some("user1"));

    let listed = api.find_authorizations_by_org_id("org1").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id.as_deref(), Some(id.as_str()));
    assert_eq!(listed[0].token, None);

    assert!(
        api.find_authorizations_by_org_id("other-org")
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(api.find_authorizations_by_org_id("").await.unwrap().len(), 1);

    let updated = api
        .update_authorization_status(&id, AuthorizationStatus::Inactive)
        .await
        .unwrap();
    assert_eq!(updated.status, Some(AuthorizationStatus::Inactive));

    api.delete_authorization(&id).await.unwrap();
    assert!(matches!(
        api.delete_authorization(&id).await.unwrap_err(),
        ClientError::Api { status: 404, .. }
    ));
}

#[tokio::test]
async fn test_connection_refused_is_http_error() {
    // Bind and drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpClient::new(&format!("http://{}", addr), TOKEN).unwrap();
    let err = client.ready().await.unwrap_err();
    assert!(matches!(err, ClientError::Http(_)));
}

/// Server whose `/ready` reports the caller's user agent, after `delay`
async fn start_slow_influx(delay: Duration) -> String {
    let app = Router::new().route(
        "/ready",
        get(move |headers: HeaderMap| async move {
            tokio::time::sleep(delay).await;
            let agent = headers
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            Json(json!({"status": agent}))
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_client_options_applied() {
    let url = start_slow_influx(Duration::ZERO).await;
    let options = ClientOptions {
        user_agent: "influx-test/1.0".to_string(),
        ..Default::default()
    };
    let client = HttpClient::with_options(&url, TOKEN, options).unwrap();

    let ready = client.ready().await.unwrap();
    assert_eq!(ready.status.as_deref(), Some("influx-test/1.0"));
}

#[tokio::test]
async fn test_request_timeout_is_http_error() {
    let url = start_slow_influx(Duration::from_secs(5)).await;
    let options = ClientOptions {
        timeout: Duration::from_millis(100),
        ..Default::default()
    };
    let client = HttpClient::with_options(&url, TOKEN, options).unwrap();

    match client.ready().await.unwrap_err() {
        ClientError::Http(err) => assert!(err.is_timeout()),
        other => panic!("expected a timeout, got {:?}", other),
    }
}
