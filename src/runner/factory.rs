// Workflow Bridge — Runner factory

use super::command::CommandRunner;
use super::http::HttpRunner;
use super::{RunnerError, WorkflowRunner};
use crate::config::{RunnerConfig, RunnerKind};
use std::path::PathBuf;
use std::sync::Arc;

/// Build the runner selected in the config.
///
/// Called once at start-up. An error means the runner is not loaded and every
/// workflow request will be answered with an error response.
pub fn load_runner(cfg: &RunnerConfig) -> Result<Arc<dyn WorkflowRunner>, RunnerError> {
    let runner: Arc<dyn WorkflowRunner> = match cfg.kind {
        RunnerKind::Disabled => {
            return Err(RunnerError::Unavailable(
                "no workflow runner configured".into(),
            ))
        }
        RunnerKind::Http => Arc::new(HttpRunner::new(&cfg.url)?),
        RunnerKind::Command => Arc::new(CommandRunner::new(
            &cfg.command,
            cfg.args.clone(),
            cfg.working_dir.as_ref().map(PathBuf::from),
        )?),
    };

    tracing::info!(runner = runner.name(), "Workflow runner loaded");
    Ok(runner)
}
