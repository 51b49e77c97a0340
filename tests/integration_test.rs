use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use workflow_bridge::bridge::{BridgeSettings, WorkflowBridge, SDK_UNAVAILABLE};
use workflow_bridge::config::CredentialsConfig;
use workflow_bridge::runner::http::HttpRunner;
use workflow_bridge::runner::WorkflowRunner;

fn settings(workflows_dir: &Path) -> BridgeSettings {
    BridgeSettings {
        workflows_dir: workflows_dir.to_path_buf(),
        credentials: CredentialsConfig {
            openai_api_key: Some("sk-openai".into()),
            gemini_api_key: Some("gm-gemini".into()),
            deepseek_api_key: Some("ds-deepseek".into()),
            base_url: "https://api.openai.com/v1".into(),
        },
    }
}

/// Serve the bridge on an ephemeral port and return its base URL.
async fn spawn_bridge(bridge: WorkflowBridge) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = workflow_bridge::web::router(bridge);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn http_runner(upstream: &MockServer) -> Option<Arc<dyn WorkflowRunner>> {
    Some(Arc::new(HttpRunner::new(&upstream.uri()).unwrap()))
}

#[tokio::test]
async fn test_health_reports_sdk_state() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = MockServer::start().await;

    let loaded = spawn_bridge(WorkflowBridge::new(http_runner(&upstream), settings(dir.path()))).await;
    let missing = spawn_bridge(WorkflowBridge::new(None, settings(dir.path()))).await;

    let client = reqwest::Client::new();
    for _ in 0..2 {
        let res = client.get(format!("{}/health", loaded)).send().await.unwrap();
        assert_eq!(res.status(), 200);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body, json!({"status": "healthy", "sdk_loaded": true}));

        let body: Value = client
            .get(format!("{}/health", missing))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, json!({"status": "healthy", "sdk_loaded": false}));
    }
}

#[tokio::test]
async fn test_run_workflow_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("gemini_sentiment.yaml"), "graph: {}").unwrap();
    let resolved = dir.path().join("gemini_sentiment.yaml");

    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .and(body_partial_json(json!({
            "yaml_file": resolved.to_string_lossy(),
            "task_prompt": "BTC breaks 100k",
            "variables": {
                "API_KEY": "gm-gemini",
                "BASE_URL": "https://api.openai.com/v1",
                "ticker": "BTC"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "final_message": {
                "role": "assistant",
                "content": [{"type": "text", "text": "BULLISH. Recommend BUY."}]
            },
            "meta_info": {
                "session_name": "sentiment_20250101",
                "output_dir": "/srv/WareHouse/sentiment_20250101",
                "token_usage": {"prompt": 120, "completion": 30, "total": 150}
            }
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let base = spawn_bridge(WorkflowBridge::new(http_runner(&upstream), settings(dir.path()))).await;

    let res = reqwest::Client::new()
        .post(format!("{}/run-workflow", base))
        .json(&json!({
            "workflow_yaml": "gemini_sentiment.yaml",
            "task_prompt": "BTC breaks 100k",
            "variables": {"ticker": "BTC"}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "status": "success",
            "result": "BULLISH. Recommend BUY.",
            "meta_info": {
                "session_name": "sentiment_20250101",
                "output_dir": "/srv/WareHouse/sentiment_20250101",
                "token_usage": {"prompt": 120, "completion": 30, "total": 150}
            },
            "error": null
        })
    );
}

#[tokio::test]
async fn test_null_variables_get_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .and(body_partial_json(json!({
            "yaml_file": "deepseek_task.yaml",
            "variables": {
                "API_KEY": "ds-deepseek",
                "BASE_URL": "https://api.openai.com/v1"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "final_message": null,
            "meta_info": {"session_name": "s2", "output_dir": "/tmp/s2", "token_usage": {}}
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let base = spawn_bridge(WorkflowBridge::new(http_runner(&upstream), settings(dir.path()))).await;

    let body: Value = reqwest::Client::new()
        .post(format!("{}/run-workflow", base))
        .json(&json!({
            "workflow_yaml": "deepseek_task.yaml",
            "task_prompt": "summarize",
            "variables": null
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "success");
    assert_eq!(body["result"], "");
    assert_eq!(body["meta_info"]["session_name"], "s2");
}

#[tokio::test]
async fn test_upstream_failure_is_error_response() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"detail": "YAML parse error at line 3"})),
        )
        .mount(&upstream)
        .await;

    let base = spawn_bridge(WorkflowBridge::new(http_runner(&upstream), settings(dir.path()))).await;

    let res = reqwest::Client::new()
        .post(format!("{}/run-workflow", base))
        .json(&json!({"workflow_yaml": "broken.yaml", "task_prompt": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "status": "error",
            "result": null,
            "meta_info": null,
            "error": "runner returned 500: YAML parse error at line 3"
        })
    );
}

#[tokio::test]
async fn test_undecodable_result_is_error_response() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&upstream)
        .await;

    let base = spawn_bridge(WorkflowBridge::new(http_runner(&upstream), settings(dir.path()))).await;

    let body: Value = reqwest::Client::new()
        .post(format!("{}/run-workflow", base))
        .json(&json!({"workflow_yaml": "flow.yaml", "task_prompt": "x"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "error");
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("failed to decode runner result"));
}

#[tokio::test]
async fn test_runner_not_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let base = spawn_bridge(WorkflowBridge::new(None, settings(dir.path()))).await;

    let res = reqwest::Client::new()
        .post(format!("{}/run-workflow", base))
        .json(&json!({"workflow_yaml": "flow.yaml", "task_prompt": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], SDK_UNAVAILABLE);
}

#[tokio::test]
async fn test_missing_required_field_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let base = spawn_bridge(WorkflowBridge::new(None, settings(dir.path()))).await;

    let res = reqwest::Client::new()
        .post(format!("{}/run-workflow", base))
        .json(&json!({"workflow_yaml": "flow.yaml"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 422);
}
