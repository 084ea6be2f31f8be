//! API integration tests.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use choreo_api::{create_router, ApiConfig, AppState};
use choreo_vendor::VendorConfig;

fn app(vendor: VendorConfig) -> Router {
    let state = AppState::new(ApiConfig::default(), vendor).expect("app state");
    create_router(state, None)
}

fn unconfigured_app() -> Router {
    app(VendorConfig::default())
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    session: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(session) = session {
        builder = builder.header("X-Session-Id", session);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn node_body(scene: &str, action: &str) -> Value {
    json!({
        "scene_id": scene,
        "description": format!("Joey {action}"),
        "characters": ["Joey"],
        "action": action,
    })
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = unconfigured_app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_storyboard_crud_flow() {
    let app = unconfigured_app();

    let (status, first) = send(&app, "POST", "/api/storyboard", None, Some(node_body("fight", "throws a jab"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["success"], true);
    assert_eq!(first["node"]["position"], 0);
    assert_eq!(first["node"]["camera"], "Static");
    assert_eq!(first["node"]["lighting"], "Daylight");
    assert_eq!(first["node"]["duration"], 2.0);

    let (_, second) = send(&app, "POST", "/api/storyboard", None, Some(node_body("fight", "ducks"))).await;
    assert_eq!(second["node"]["position"], 1);

    let first_id = first["node"]["id"].as_str().unwrap().to_string();
    let second_id = second["node"]["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/storyboard?node_id={first_id}"),
        None,
        Some(json!({"camera": "Handheld", "duration": 3.5})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["node"]["camera"], "Handheld");
    assert_eq!(updated["node"]["duration"], 3.5);
    assert_eq!(updated["node"]["action"], "throws a jab");

    let (status, deleted) = send(&app, "DELETE", &format!("/api/storyboard?node_id={first_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["success"], true);

    let (status, listed) = send(&app, "GET", "/api/storyboard?scene_id=fight", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let nodes = listed["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0]["id"], second_id.as_str());
    // Deleting a node never renumbers the others
    assert_eq!(nodes[0]["position"], 1);
}

#[tokio::test]
async fn test_create_node_requires_fields() {
    let app = unconfigured_app();
    let (status, body) = send(&app, "POST", "/api/storyboard", None, Some(json!({"scene_id": "fight"}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "validation_error");
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(fields.contains(&"action"));
    assert!(fields.contains(&"description"));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = unconfigured_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/storyboard")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_and_delete_unknown_node() {
    let app = unconfigured_app();

    let (status, body) = send(&app, "PUT", "/api/storyboard?node_id=missing", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, _) = send(&app, "DELETE", "/api/storyboard?node_id=missing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "DELETE", "/api/storyboard", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad request: Node ID is required");
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let app = unconfigured_app();

    let (status, _) = send(&app, "POST", "/api/storyboard", Some("alice"), Some(node_body("s1", "kicks"))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, alice) = send(&app, "GET", "/api/storyboard", Some("alice"), None).await;
    let (_, bob) = send(&app, "GET", "/api/storyboard", Some("bob"), None).await;
    let (_, default) = send(&app, "GET", "/api/storyboard", None, None).await;

    assert_eq!(alice["nodes"].as_array().unwrap().len(), 1);
    assert!(bob["nodes"].as_array().unwrap().is_empty());
    assert!(default["nodes"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_session_header_is_rejected() {
    let app = unconfigured_app();
    let (status, body) = send(&app, "GET", "/api/storyboard", Some("not a valid id"), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_learning_records_and_reports() {
    let app = unconfigured_app();

    for _ in 0..3 {
        let (status, body) = send(
            &app,
            "POST",
            "/api/learning",
            None,
            Some(json!({"type": "camera_usage", "data": {"camera": "Pan"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated_preferences"]["top_camera"], "Pan");
    }

    let (status, body) = send(
        &app,
        "POST",
        "/api/learning",
        None,
        Some(json!({"type": "action_pattern", "data": {"pattern": "punch", "duration": 3}, "outcome": "success"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated_preferences"]["successful_patterns"], json!(["punch"]));

    let (_, stats) = send(&app, "GET", "/api/learning", None, None).await;
    assert_eq!(stats["stats"]["total_learning_events"], 4);
    assert_eq!(stats["stats"]["top_camera"], "Pan");
    assert_eq!(stats["stats"]["most_successful_pattern"], "punch");

    let (_, suggestions) = send(&app, "GET", "/api/learning?type=suggestions", None, None).await;
    assert_eq!(suggestions["suggestions"]["camera_suggestion"], "Pan");
    assert_eq!(suggestions["suggestions"]["recommended_patterns"], json!(["punch"]));

    let (_, preferences) = send(&app, "GET", "/api/learning?type=preferences", None, None).await;
    assert!(preferences["preferences"]["camera"].is_object());
}

#[tokio::test]
async fn test_learning_rejects_unknown_event_type() {
    let app = unconfigured_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/learning",
        None,
        Some(json!({"type": "telepathy", "data": {}})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_learning_requires_type_and_data() {
    let app = unconfigured_app();

    for body in [
        json!({"type": "camera_usage"}),
        json!({"type": "camera_usage", "data": null}),
        json!({"data": {"camera": "Pan"}}),
    ] {
        let (status, response) = send(&app, "POST", "/api/learning", None, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], "Bad request: Type and data are required");
    }

    let (_, stats) = send(&app, "GET", "/api/learning", None, None).await;
    assert_eq!(stats["stats"]["total_learning_events"], 0);
}

#[tokio::test]
async fn test_ingest_text_creates_nodes() {
    let app = unconfigured_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/storyboard/ingest",
        None,
        Some(json!({"scene_id": "alley", "text": "@Joey throws a jab @Mia ducks under it"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "text");
    assert_eq!(body["complete"], true);
    let created = body["created"].as_array().unwrap();
    assert_eq!(created.len(), 2);
    assert_eq!(created[0]["characters"], json!(["Joey"]));
    assert_eq!(created[1]["position"], 1);
}

#[tokio::test]
async fn test_ingest_with_analysis_falls_back_without_credentials() {
    let app = unconfigured_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/storyboard/ingest",
        None,
        Some(json!({"scene_id": "alley", "text": "@Joey spins", "analyze": true})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "text");
    assert_eq!(body["setup_required"], true);
    assert!(body["analysis_error"].as_str().unwrap().contains("AI_API_KEY"));
    assert_eq!(body["created"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_job_submission_without_credentials_requires_setup() {
    let app = unconfigured_app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/video/stitch",
        None,
        Some(json!({"video_clips": [{"description": "jab"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert_eq!(body["setup_required"], true);
    assert_eq!(body["kind"], "configuration_error");

    let (status, body) = send(&app, "POST", "/api/characters/generate", None, Some(json!({"name": "Joey", "description": "boxer"}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["setup_required"], true);
}

#[tokio::test]
async fn test_job_requests_validate_input() {
    let app = unconfigured_app();

    let (status, _) = send(&app, "POST", "/api/video/stitch", None, Some(json!({"video_clips": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/api/video/generate", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", "/api/video/stitch", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad request: Job ID is required");
}

#[tokio::test]
async fn test_status_lists_missing_setup() {
    let app = unconfigured_app();
    let (status, body) = send(&app, "GET", "/api/status", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["environment"]["runcomfy_api_key"], false);
    assert_eq!(body["status"]["apis"]["stitch"]["configured"], false);
    assert_eq!(body["status"]["apis"]["storyboard"]["configured"], true);
    assert!(!body["status"]["setup_needed"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_render_scene_submits_and_polls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/deployments/dep-stitch/inference"))
        .and(header("authorization", "rc-key"))
        .and(body_partial_json(json!({"overrides": {"output_duration": 5.0, "fps": 24}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "job-9"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/jobs/job-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed",
            "progress": 100,
            "result": {"video_url": "https://cdn.example/out.mp4"}
        })))
        .mount(&server)
        .await;

    let vendor = VendorConfig {
        runcomfy_api_key: Some("rc-key".into()),
        framepack_deployment_id: Some("dep-stitch".into()),
        ..VendorConfig::default()
    }
    .with_base_url(server.uri());
    let app = app(vendor);

    let mut first = node_body("finale", "lands the uppercut");
    first["duration"] = json!(3);
    let mut second = node_body("finale", "falls");
    second["duration"] = json!(2);
    send(&app, "POST", "/api/storyboard", None, Some(first)).await;
    send(&app, "POST", "/api/storyboard", None, Some(second)).await;

    let (status, submitted) = send(&app, "POST", "/api/storyboard/render", None, Some(json!({"scene_id": "finale"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submitted["job_id"], "job-9");
    assert_eq!(submitted["deployment_id"], "dep-stitch");
    assert_eq!(submitted["clip_count"], 2);

    let (status, polled) = send(&app, "GET", "/api/storyboard/render?job_id=job-9", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(polled["status"], "completed");
    assert_eq!(polled["progress"], 100);
    assert_eq!(polled["result"]["video_url"], "https://cdn.example/out.mp4");
    assert!(polled["endpoint"].as_str().unwrap().ends_with("/jobs/job-9"));
}

#[tokio::test]
async fn test_render_empty_scene_is_rejected() {
    let app = unconfigured_app();
    let (status, body) = send(&app, "POST", "/api/storyboard/render", None, Some(json!({"scene_id": "nothing"}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
}

#[tokio::test]
async fn test_slow_request_times_out_with_408() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs/job-slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "processing"}))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let vendor = VendorConfig {
        runcomfy_api_key: Some("rc-key".into()),
        framepack_deployment_id: Some("dep-stitch".into()),
        ..VendorConfig::default()
    }
    .with_base_url(server.uri());
    let config = ApiConfig {
        request_timeout: Duration::from_millis(100),
        ..ApiConfig::default()
    };
    let app = create_router(AppState::new(config, vendor).expect("app state"), None);

    let (status, _) = send(&app, "GET", "/api/video/stitch?job_id=job-slow", None, None).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
}

#[tokio::test]
async fn test_fusionx_submits_with_workflow_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/deployments/dep-fusionx/inference"))
        .and(body_partial_json(json!({"overrides": {
            "prompt": "rooftop chase at dusk",
            "negative_prompt": "blurry, low quality, distorted",
            "width": 1024,
            "height": 576,
            "num_frames": 48,
            "fps": 24,
            "seed": -1,
            "steps": 25,
            "cfg_scale": 7.5
        }})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"job_id": "fx-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let vendor = VendorConfig {
        runcomfy_api_key: Some("rc-key".into()),
        fusionx_deployment_id: Some("dep-fusionx".into()),
        ..VendorConfig::default()
    }
    .with_base_url(server.uri());
    let app = app(vendor);

    let (status, body) = send(
        &app,
        "POST",
        "/api/video/fusionx",
        None,
        Some(json!({"prompt": "rooftop chase at dusk"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["job_id"], "fx-1");
    assert_eq!(body["deployment_id"], "dep-fusionx");

    let (status, body) = send(&app, "POST", "/api/video/fusionx", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
}
