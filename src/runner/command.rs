// Workflow Bridge — Subprocess runner
//
// Spawns the orchestration entry point once per call. The request goes in as
// JSON on stdin, the result comes back as JSON on stdout.

use super::*;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub struct CommandRunner {
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandRunner {
    /// Resolve `program` (a path, or a name looked up on `PATH`) and build the
    /// runner. Fails with `Unavailable` when the program cannot be found.
    pub fn new(
        program: &str,
        args: Vec<String>,
        working_dir: Option<PathBuf>,
    ) -> Result<Self, RunnerError> {
        if program.is_empty() {
            return Err(RunnerError::Unavailable("runner command is not set".into()));
        }
        let program = resolve_program(program).ok_or_else(|| {
            RunnerError::Unavailable(format!("runner command '{}' not found", program))
        })?;

        if let Some(dir) = &working_dir {
            if !dir.is_dir() {
                return Err(RunnerError::Unavailable(format!(
                    "runner working directory '{}' does not exist",
                    dir.display()
                )));
            }
        }

        Ok(Self {
            program,
            args,
            working_dir,
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

fn resolve_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|p| p.is_file())
}

#[async_trait]
impl WorkflowRunner for CommandRunner {
    fn name(&self) -> &str {
        "command"
    }

    async fn run_workflow(&self, request: &RunRequest) -> Result<RunResult, RunnerError> {
        let payload = serde_json::to_vec(request)?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(
            program = %self.program.display(),
            yaml_file = %request.yaml_file,
            "Spawning runner process"
        );

        let mut child = cmd.spawn()?;

        // Feed stdin concurrently so a chatty child cannot block on a full pipe.
        let writer = child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move {
                stdin.write_all(&payload).await?;
                stdin.shutdown().await
            })
        });

        let output = child.wait_with_output().await?;

        if let Some(handle) = writer {
            match handle.await {
                Ok(Ok(())) => {}
                // Child may exit without reading its input; its exit status decides.
                Ok(Err(e)) => tracing::debug!(error = %e, "Runner stdin closed early"),
                Err(e) => tracing::warn!(error = %e, "Runner stdin task failed"),
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr.trim();
            return Err(RunnerError::Execution(if message.is_empty() {
                format!("runner exited with {}", output.status)
            } else {
                message.to_string()
            }));
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}
