//! Subprocess execution with timeout and cancellation.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{RunnerError, RunnerResult};

/// Captured output of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run `program args...` in `dir`, racing completion against the timeout
/// and the cancel token. The child is killed if either fires first.
pub async fn run_command(
    program: &str,
    args: &[String],
    dir: &Path,
    timeout_seconds: u64,
    cancel: &CancellationToken,
) -> RunnerResult<CommandOutput> {
    debug!("Executing: {} {}", program, format_args_for_log(args));

    let child = Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RunnerError::ToolNotAvailable(program.to_string()),
            _ => RunnerError::ExecutionFailed(format!("Failed to spawn {}: {}", program, e)),
        })?;

    let start = Instant::now();
    let deadline = async {
        if timeout_seconds > 0 {
            tokio::time::sleep(Duration::from_secs(timeout_seconds)).await
        } else {
            std::future::pending::<()>().await
        }
    };

    // Dropping the wait future drops the child, which kills it.
    let output = tokio::select! {
        output = child.wait_with_output() => output?,
        _ = deadline => return Err(RunnerError::Timeout(timeout_seconds)),
        _ = cancel.cancelled() => return Err(RunnerError::Cancelled),
    };

    Ok(CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Whether `program args...` runs and exits successfully.
pub async fn probe(program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

fn format_args_for_log(args: &[String]) -> String {
    args.iter()
        .map(|arg| {
            if arg.contains(' ') || arg.contains('=') {
                format!("'{}'", arg)
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_args_quotes_spaces() {
        let args = vec![
            "-destination".to_string(),
            "platform=iOS Simulator,name=iPhone 15".to_string(),
            "build".to_string(),
        ];
        assert_eq!(
            format_args_for_log(&args),
            "-destination 'platform=iOS Simulator,name=iPhone 15' build"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_captures_output() {
        let cancel = CancellationToken::new();
        let output = run_command(
            "sh",
            &["-c".to_string(), "echo out; echo err 1>&2; exit 3".to_string()],
            Path::new("."),
            10,
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(output.exit_code, 3);
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_times_out() {
        let cancel = CancellationToken::new();
        let result = run_command(
            "sleep",
            &["5".to_string()],
            Path::new("."),
            1,
            &cancel,
        )
        .await;

        assert!(matches!(result, Err(RunnerError::Timeout(1))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_cancelled() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = run_command("sleep", &["5".to_string()], Path::new("."), 0, &cancel).await;
        assert!(matches!(result, Err(RunnerError::Cancelled)));
    }

    #[tokio::test]
    async fn test_missing_tool() {
        let cancel = CancellationToken::new();
        let result = run_command(
            "definitely-not-a-real-tool-xyz",
            &[],
            Path::new("."),
            5,
            &cancel,
        )
        .await;
        assert!(matches!(result, Err(RunnerError::ToolNotAvailable(_))));
    }
}
