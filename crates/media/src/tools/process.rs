use std::{process::Stdio, time::Duration};

use {
    tokio::process::Command,
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
};

use crate::error::{Error, Result};

/// Longest diagnostic excerpt carried into error messages.
const MAX_DIAGNOSTIC_BYTES: usize = 1500;

/// Captured result of a finished subprocess.
#[derive(Debug)]
pub struct ToolOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Tail of stderr (or stdout when stderr is empty), trimmed for chat.
    pub fn diagnostics(&self) -> String {
        let text = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        tail(text, MAX_DIAGNOSTIC_BYTES).to_string()
    }

    pub fn describe_exit(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit code {code}"),
            None => "termination by signal".to_string(),
        }
    }
}

/// Keep the last `max_bytes` of `text`, cut at a char boundary.
fn tail(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    &text[text.ceil_char_boundary(text.len() - max_bytes)..]
}

/// Run `cmd` to completion, capturing its output.
///
/// The child is killed when `cancel` fires or `timeout` elapses, reported as
/// [`Error::Cancelled`] and [`Error::TimedOut`]. A non-zero exit is not an
/// error at this level; callers inspect [`ToolOutput::success`].
pub async fn run_tool(
    tool: &'static str,
    mut cmd: Command,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<ToolOutput> {
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    // Dropping the wait future below drops the child, which kills it.
    cmd.kill_on_drop(true);
    // Own process group, so helpers the tool starts (ffmpeg under yt-dlp)
    // can be killed with it.
    #[cfg(unix)]
    cmd.process_group(0);

    debug!(tool, timeout_secs = timeout.as_secs(), "spawning");
    let child = cmd
        .spawn()
        .map_err(|e| Error::external(format!("failed to start {tool}"), e))?;
    let pid = child.id();

    let output = tokio::select! {
        () = cancel.cancelled() => {
            warn!(tool, "request cancelled, killing subprocess");
            kill_process_group(tool, pid);
            return Err(Error::Cancelled { tool });
        },
        result = tokio::time::timeout(timeout, child.wait_with_output()) => match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(Error::external(format!("failed to run {tool}"), e)),
            Err(_) => {
                warn!(tool, timeout_secs = timeout.as_secs(), "subprocess timed out, killing");
                kill_process_group(tool, pid);
                return Err(Error::TimedOut {
                    tool,
                    secs: timeout.as_secs(),
                });
            },
        },
    };

    let output = ToolOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    debug!(
        tool,
        exit_code = ?output.exit_code,
        stdout_len = output.stdout.len(),
        stderr_len = output.stderr.len(),
        "subprocess finished"
    );
    Ok(output)
}

/// SIGKILL the group led by `pid`. The leader itself is also killed when its
/// handle drops.
#[cfg(unix)]
fn kill_process_group(tool: &'static str, pid: Option<u32>) {
    use nix::{
        sys::signal::{Signal, killpg},
        unistd::Pid,
    };

    let Some(pid) = pid else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        debug!(tool, pid, error = %e, "process group already gone");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_tool: &'static str, _pid: Option<u32>) {}
