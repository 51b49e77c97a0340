// Workflow Bridge — Request shaping, delegation and response shaping
//
// One call in, one call out: resolve the workflow reference, fill in the
// provider credential and base URL, hand the call to the runner and flatten
// whatever comes back into a `WorkflowResponse`.

use crate::config::{Config, CredentialsConfig};
use crate::credentials::infer_provider;
use crate::runner::{RunRequest, RunResult, RunnerError, VariableSet, WorkflowRunner};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Instrument;

pub const SDK_UNAVAILABLE: &str = "Workflow SDK could not be loaded";

const PREVIEW_CHARS: usize = 100;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub workflow_yaml: String,
    pub task_prompt: String,
    #[serde(default)]
    pub variables: Option<VariableSet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaInfo {
    pub session_name: String,
    pub output_dir: String,
    pub token_usage: Value,
}

/// Response body of `/run-workflow`. Unused fields serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResponse {
    pub status: ResponseStatus,
    pub result: Option<String>,
    pub meta_info: Option<MetaInfo>,
    pub error: Option<String>,
}

impl WorkflowResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            result: None,
            meta_info: None,
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

impl From<RunResult> for WorkflowResponse {
    fn from(result: RunResult) -> Self {
        // A result without a final message is still a success.
        let text = result
            .final_message
            .as_ref()
            .map(|m| m.text_content())
            .unwrap_or_default();

        Self {
            status: ResponseStatus::Success,
            result: Some(text),
            meta_info: Some(MetaInfo {
                session_name: result.meta_info.session_name,
                output_dir: result.meta_info.output_dir.to_string_lossy().into_owned(),
                token_usage: result.meta_info.token_usage,
            }),
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub sdk_loaded: bool,
}

// ---------------------------------------------------------------------------
// Bridge service
// ---------------------------------------------------------------------------

/// Read-only settings the bridge consults per request.
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub workflows_dir: PathBuf,
    pub credentials: CredentialsConfig,
}

impl BridgeSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            workflows_dir: cfg.workflows_path(),
            credentials: cfg.credentials.clone(),
        }
    }
}

pub struct WorkflowBridge {
    runner: Option<Arc<dyn WorkflowRunner>>,
    settings: BridgeSettings,
}

impl WorkflowBridge {
    /// `runner` is `None` when no runner could be loaded at start-up.
    pub fn new(runner: Option<Arc<dyn WorkflowRunner>>, settings: BridgeSettings) -> Self {
        Self { runner, settings }
    }

    /// Load the configured runner and build the bridge around it. A runner
    /// that fails to load is logged and left out.
    pub fn from_config(cfg: &Config) -> Self {
        let runner = match crate::runner::factory::load_runner(&cfg.runner) {
            Ok(runner) => Some(runner),
            Err(e) => {
                tracing::warn!(
                    kind = %cfg.runner.kind,
                    error = %e,
                    "Workflow runner not loaded, requests will be answered with an error"
                );
                None
            }
        };
        Self::new(runner, BridgeSettings::from_config(cfg))
    }

    pub fn sdk_loaded(&self) -> bool {
        self.runner.is_some()
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy".to_string(),
            sdk_loaded: self.sdk_loaded(),
        }
    }

    /// Rewrite a relative reference to a file in the workflows directory when
    /// one exists. Anything else is returned unchanged.
    pub fn resolve_workflow_ref(&self, workflow_ref: &str) -> String {
        if Path::new(workflow_ref).is_absolute() {
            return workflow_ref.to_string();
        }
        let local = self.settings.workflows_dir.join(workflow_ref);
        if local.exists() {
            std::path::absolute(&local)
                .unwrap_or(local)
                .to_string_lossy()
                .into_owned()
        } else {
            workflow_ref.to_string()
        }
    }

    /// Merge caller variables with the inferred `API_KEY` and `BASE_URL`.
    /// Caller-supplied values are never overwritten.
    pub fn prepare_variables(
        &self,
        workflow_ref: &str,
        caller: Option<VariableSet>,
    ) -> VariableSet {
        let mut vars = caller.unwrap_or_default();
        let creds = &self.settings.credentials;

        if !vars.contains_key("API_KEY") {
            let provider = infer_provider(workflow_ref, Some(&vars));
            let key = provider.api_key(creds);
            tracing::debug!(
                provider = %provider,
                key_configured = key.is_some(),
                "Selected provider credential"
            );
            vars.insert(
                "API_KEY".to_string(),
                key.map(Value::from).unwrap_or(Value::Null),
            );
        }

        if !vars.contains_key("BASE_URL") {
            vars.insert(
                "BASE_URL".to_string(),
                Value::String(creds.base_url.clone()),
            );
        }

        vars
    }

    /// Run one workflow request. Never fails: every problem becomes an error
    /// response, with the details logged here.
    pub async fn run(&self, request: WorkflowRequest) -> WorkflowResponse {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("run_workflow", %request_id);
        self.run_inner(request).instrument(span).await
    }

    async fn run_inner(&self, request: WorkflowRequest) -> WorkflowResponse {
        let Some(runner) = self.runner.clone() else {
            tracing::warn!(workflow = %request.workflow_yaml, "Rejecting workflow: runner not loaded");
            return WorkflowResponse::error(SDK_UNAVAILABLE);
        };

        match self.execute(runner, request).await {
            Ok(result) => {
                let response = WorkflowResponse::from(result);
                let preview: String = response
                    .result
                    .as_deref()
                    .unwrap_or_default()
                    .chars()
                    .take(PREVIEW_CHARS)
                    .collect();
                tracing::info!(preview = %preview, "Workflow succeeded");
                response
            }
            Err(e) => {
                tracing::error!(error = %e, detail = ?e, "Workflow failed");
                WorkflowResponse::error(e.to_string())
            }
        }
    }

    async fn execute(
        &self,
        runner: Arc<dyn WorkflowRunner>,
        request: WorkflowRequest,
    ) -> Result<RunResult, RunnerError> {
        let yaml_file = self.resolve_workflow_ref(&request.workflow_yaml);
        tracing::info!(
            workflow = %yaml_file,
            prompt = %request.task_prompt,
            runner = runner.name(),
            "Running workflow"
        );

        let variables = self.prepare_variables(&yaml_file, request.variables);
        let call = RunRequest {
            yaml_file,
            task_prompt: request.task_prompt,
            variables,
        };

        // Own task so a panicking runner surfaces as an error, not a dropped connection.
        let handle = tokio::spawn(async move { runner.run_workflow(&call).await });
        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(RunnerError::Panicked(panic_message(e.into_panic()))),
            Err(e) => Err(RunnerError::Execution(format!("runner task failed: {}", e))),
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
