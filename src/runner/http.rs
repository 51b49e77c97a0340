// Workflow Bridge — HTTP runner (sidecar orchestration runtime)

use super::*;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// HttpRunner forwards each call to an orchestration runtime over HTTP:
/// `POST {base}/run` with the [`RunRequest`] as JSON, answered by a
/// [`RunResult`].
pub struct HttpRunner {
    endpoint: String,
    client: Client,
}

impl HttpRunner {
    pub fn new(base_url: &str) -> Result<Self, RunnerError> {
        let parsed = url::Url::parse(base_url).map_err(|source| RunnerError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RunnerError::Unavailable(format!(
                "unsupported runner url scheme '{}'",
                parsed.scheme()
            )));
        }

        // No overall timeout: workflows run as long as they need.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        let mut endpoint = parsed;
        endpoint
            .path_segments_mut()
            .map_err(|_| {
                RunnerError::Unavailable(format!("runner url '{}' cannot be a base", base_url))
            })?
            .pop_if_empty()
            .push("run");
        endpoint.set_fragment(None);

        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Pull a human-readable message out of an error body.
fn upstream_message(body: &str) -> String {
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(body) {
        for key in ["detail", "error", "message"] {
            if let Some(Value::String(s)) = obj.get(key) {
                return s.clone();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "(empty response body)".to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl WorkflowRunner for HttpRunner {
    fn name(&self) -> &str {
        "http"
    }

    async fn run_workflow(&self, request: &RunRequest) -> Result<RunResult, RunnerError> {
        tracing::debug!(url = %self.endpoint, yaml_file = %request.yaml_file, "Sending runner request");

        let res = self.client.post(&self.endpoint).json(request).send().await?;
        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(RunnerError::Upstream {
                status: status.as_u16(),
                message: upstream_message(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
