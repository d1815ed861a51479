use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::ClassifierError;

/// How to reach the `claude` CLI.
#[derive(Debug, Clone)]
pub struct ClaudeCliConfig {
    /// Program name or path of the CLI binary.
    pub program: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for ClaudeCliConfig {
    fn default() -> Self {
        Self {
            program: "claude".to_string(),
            model: "claude-3-5-haiku-latest".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Run one non-interactive prompt through the CLI and return its stdout.
///
/// The user prompt is written to the child's stdin so reply text never ends
/// up in the process argument list. The child is killed if the timeout fires.
pub async fn invoke_claude(
    system_prompt: &str,
    user_prompt: &str,
    config: &ClaudeCliConfig,
) -> Result<String, ClassifierError> {
    debug!(
        program = %config.program,
        model = %config.model,
        prompt_len = user_prompt.len(),
        "Invoking claude CLI"
    );

    let mut child = Command::new(&config.program)
        .args([
            "-p",
            "--system-prompt",
            system_prompt,
            "--model",
            &config.model,
            "--output-format",
            "text",
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ClassifierError::Cli(format!("Failed to spawn {}: {e}", config.program)))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| ClassifierError::Cli("claude stdin unavailable".to_string()))?;
    let prompt = user_prompt.to_string();

    let run = async move {
        stdin.write_all(prompt.as_bytes()).await?;
        drop(stdin);
        child.wait_with_output().await
    };

    let output = tokio::time::timeout(config.timeout, run)
        .await
        .map_err(|_| ClassifierError::Timeout(config.timeout.as_secs()))?
        .map_err(|e| ClassifierError::Cli(format!("claude I/O failed: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(status = %output.status, stderr = %stderr, "Claude CLI failed");
        return Err(ClassifierError::Cli(format!(
            "claude exited {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if stdout.trim().is_empty() {
        return Err(ClassifierError::Cli("Claude returned empty response".to_string()));
    }

    Ok(stdout)
}

/// Check whether the CLI binary runs at all.
pub async fn check_cli_available(program: &str) -> bool {
    match Command::new(program).arg("--version").output().await {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}
