// Workflow Bridge — Workflow runner abstraction
//
// The orchestration engine lives outside this crate. A runner is the adapter
// that hands it one call and brings back the result.

pub mod command;
pub mod factory;
pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use thiserror::Error;

/// Variables handed to the workflow (name → arbitrary JSON value).
pub type VariableSet = Map<String, Value>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("{0}")]
    Unavailable(String),
    #[error("invalid runner url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("runner request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("runner returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("failed to decode runner result: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to launch runner: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Execution(String),
    #[error("runner panicked: {0}")]
    Panicked(String),
}

// ---------------------------------------------------------------------------
// Call / result types
// ---------------------------------------------------------------------------

/// One delegated call, as sent to the runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub yaml_file: String,
    pub task_prompt: String,
    #[serde(default)]
    pub variables: VariableSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(default)]
    pub final_message: Option<FinalMessage>,
    pub meta_info: RunMetaInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetaInfo {
    pub session_name: String,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub token_usage: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalMessage {
    #[serde(default)]
    pub role: Option<String>,
    pub content: MessageContent,
}

/// Message content is either plain text or a list of typed blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl FinalMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            role: Some("assistant".into()),
            content: MessageContent::Text(content.into()),
        }
    }

    /// Plain-text view of the message. Non-text blocks are skipped.
    pub fn text_content(&self) -> String {
        match &self.content {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter(|b| b.block_type == "text")
                .filter_map(|b| b.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

// ---------------------------------------------------------------------------
// Runner trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait WorkflowRunner: Send + Sync {
    /// Short name used in logs and status output.
    fn name(&self) -> &str;

    async fn run_workflow(&self, request: &RunRequest) -> Result<RunResult, RunnerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_content_plain() {
        let msg = FinalMessage::text("done");
        assert_eq!(msg.text_content(), "done");
    }

    #[test]
    fn test_text_content_blocks() {
        let msg: FinalMessage = serde_json::from_value(json!({
            "role": "assistant",
            "content": [
                {"type": "text", "text": "first"},
                {"type": "image", "url": "file:///tmp/chart.png"},
                {"type": "text", "text": "second"}
            ]
        }))
        .unwrap();
        assert_eq!(msg.text_content(), "first\nsecond");
    }

    #[test]
    fn test_parse_result_without_final_message() {
        let result: RunResult = serde_json::from_value(json!({
            "meta_info": {"session_name": "s1", "output_dir": "/tmp/out"}
        }))
        .unwrap();
        assert!(result.final_message.is_none());
        assert_eq!(result.meta_info.session_name, "s1");
        assert!(result.meta_info.token_usage.is_null());
    }

    #[test]
    fn test_error_display() {
        let err = RunnerError::Upstream {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "runner returned 500: boom");
        assert_eq!(
            RunnerError::Execution("workflow not found".into()).to_string(),
            "workflow not found"
        );
    }
}
