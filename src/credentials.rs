// Workflow Bridge — Provider credential selection

use crate::config::CredentialsConfig;
use serde_json::{Map, Value};

/// Model provider whose credential is injected as `API_KEY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Deepseek,
    OpenAi,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Deepseek => "deepseek",
            Provider::OpenAi => "openai",
        }
    }

    /// The configured credential for this provider, if any.
    pub fn api_key<'a>(&self, creds: &'a CredentialsConfig) -> Option<&'a str> {
        match self {
            Provider::Gemini => creds.gemini_api_key.as_deref(),
            Provider::Deepseek => creds.deepseek_api_key.as_deref(),
            Provider::OpenAi => creds.openai_api_key.as_deref(),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guess the provider from the workflow reference and the caller's variables.
///
/// Case-insensitive substring match over the reference and the serialized
/// variable map. Gemini wins over Deepseek when both appear; OpenAI is the
/// fallback.
pub fn infer_provider(workflow_ref: &str, variables: Option<&Map<String, Value>>) -> Provider {
    let reference = workflow_ref.to_lowercase();
    let vars = variables
        .map(|v| Value::Object(v.clone()).to_string().to_lowercase())
        .unwrap_or_default();

    let mentions = |needle: &str| reference.contains(needle) || vars.contains(needle);

    if mentions("gemini") {
        Provider::Gemini
    } else if mentions("deepseek") {
        Provider::Deepseek
    } else {
        Provider::OpenAi
    }
}
