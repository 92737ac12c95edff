//! End-to-end tests of the `/generate-video` endpoint with real provider
//! clients pointed at fake Gemini and Daytona servers.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use mathmotion::config::{Config, ModelConfig, SandboxProviderConfig};
use mathmotion::server::{router, AppState};
use secrecy::SecretString;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FAKE_MP4: &[u8] = b"\x00\x00\x00\x18ftypmp42";

async fn fake_gemini() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "text": "```python\nfrom manim import *\n\nclass EquationExplanation(Scene):\n    def construct(self):\n        pass\n```"
                    }]
                }
            }]
        })))
        .mount(&server)
        .await;
    server
}

async fn state_for(gemini: &MockServer, daytona: &MockServer) -> AppState {
    let config = Config {
        model: ModelConfig {
            api_key: SecretString::from("gm-key".to_string()),
            base_url: gemini.uri(),
            ..Default::default()
        },
        sandbox: SandboxProviderConfig {
            api_key: SecretString::from("dt-key".to_string()),
            base_url: daytona.uri(),
            ..Default::default()
        },
    };
    AppState::from_config(config).unwrap()
}

fn generate_request() -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/generate-video")
        .header("content-type", "application/json")
        .body(Body::from(
            r#"{"latex":"E=mc^2","explanations":"E is energy, m is mass, c is speed of light"}"#,
        ))
        .unwrap()
}

#[tokio::test]
async fn full_pipeline_returns_video_and_destroys_sandbox() {
    let gemini = fake_gemini().await;
    let daytona = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sandbox"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "sbx-e2e" })),
        )
        .expect(1)
        .mount(&daytona)
        .await;

    // Serves both the install and the render command
    Mock::given(method("POST"))
        .and(path("/toolbox/sbx-e2e/process/execute"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "exitCode": 0,
            "result": ""
        })))
        .expect(2)
        .mount(&daytona)
        .await;

    Mock::given(method("POST"))
        .and(path("/toolbox/sbx-e2e/files/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&daytona)
        .await;

    Mock::given(method("GET"))
        .and(path("/toolbox/sbx-e2e/files/download"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(FAKE_MP4))
        .expect(1)
        .mount(&daytona)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/sandbox/sbx-e2e"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&daytona)
        .await;

    let app = router(state_for(&gemini, &daytona).await);
    let response = app.oneshot(generate_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "video/mp4"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], FAKE_MP4);
    // Mock expectations verify destroy ran exactly once, after download.
}

#[tokio::test]
async fn install_failure_returns_500_and_still_destroys_sandbox() {
    let gemini = fake_gemini().await;
    let daytona = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sandbox"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "sbx-bad" })),
        )
        .expect(1)
        .mount(&daytona)
        .await;

    Mock::given(method("POST"))
        .and(path("/toolbox/sbx-bad/process/execute"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "exitCode": 1,
            "result": "ERROR: No matching distribution found for manim"
        })))
        .expect(1)
        .mount(&daytona)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/sandbox/sbx-bad"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&daytona)
        .await;

    let app = router(state_for(&gemini, &daytona).await);
    let response = app.oneshot(generate_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("Failed to install Manim"));
    assert!(message.contains("No matching distribution"));
}

#[tokio::test]
async fn missing_artifact_returns_500_and_still_destroys_sandbox() {
    let gemini = fake_gemini().await;
    let daytona = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sandbox"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "sbx-gone" })),
        )
        .mount(&daytona)
        .await;

    Mock::given(method("POST"))
        .and(path("/toolbox/sbx-gone/process/execute"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "exitCode": 0,
            "result": ""
        })))
        .mount(&daytona)
        .await;

    Mock::given(method("POST"))
        .and(path("/toolbox/sbx-gone/files/upload"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&daytona)
        .await;

    Mock::given(method("GET"))
        .and(path("/toolbox/sbx-gone/files/download"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&daytona)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/sandbox/sbx-gone"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&daytona)
        .await;

    let app = router(state_for(&gemini, &daytona).await);
    let response = app.oneshot(generate_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(json["error"].as_str().unwrap().contains("Artifact not found"));
}
