//! Deadline-bounded execution of one oracle process.
//!
//! Waiting for exit and draining both output pipes run as a single future
//! bound to a wall-clock deadline. If the deadline fires first the future is
//! cancelled, the child is killed and then awaited so no zombie is left
//! behind.

use crate::{OracleError, OracleResult};
use std::ffi::OsStr;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Result of a bounded run.
#[derive(Debug)]
pub enum RunOutcome {
    /// The process exited before the deadline.
    Completed {
        elapsed: Duration,
        status: ExitStatus,
        /// Standard output followed by standard error, lossily decoded.
        output: String,
    },
    /// The deadline expired; the process was killed and reaped.
    TimedOut { bound: Duration },
}

/// Run `program` with `args`, giving it at most `timeout` of wall-clock time.
pub async fn run_bounded<I, S>(program: &Path, args: I, timeout: Duration) -> OracleResult<RunOutcome>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let deadline = start + timeout;

    let mut child = command.spawn().map_err(|source| OracleError::Launch {
        program: program.to_path_buf(),
        source,
    })?;
    let pid = child.id();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let finished = {
        let child = &mut child;
        async move {
            let (status, out, err) = tokio::join!(child.wait(), drain(stdout), drain(stderr));
            Ok::<_, std::io::Error>((status?, out?, err?))
        }
    };
    let result = tokio::time::timeout_at(deadline, finished).await;

    match result {
        Ok(Ok((status, out, err))) => {
            let elapsed = start.elapsed();
            let mut output = String::from_utf8_lossy(&out).into_owned();
            output.push_str(&String::from_utf8_lossy(&err));
            if !status.success() {
                debug!(?pid, %status, "oracle exited with non-zero status");
            }
            Ok(RunOutcome::Completed {
                elapsed,
                status,
                output,
            })
        }
        Ok(Err(source)) => Err(OracleError::Wait { pid, source }),
        Err(_) => {
            warn!(?pid, timeout_secs = timeout.as_secs_f64(), "oracle deadline reached, killing");
            // kill() sends SIGKILL and then waits, which reaps the child.
            child
                .kill()
                .await
                .map_err(|source| OracleError::Kill { pid, source })?;
            Ok(RunOutcome::TimedOut { bound: timeout })
        }
    }
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_launch_failure() {
        let err = run_bounded(
            Path::new("/nonexistent/cavesweep-oracle"),
            ["-e", "0"],
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, OracleError::Launch { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_collects_stdout_and_stderr() {
        let outcome = run_bounded(
            Path::new("sh"),
            ["-c", "echo out; echo err 1>&2"],
            Duration::from_secs(10),
        )
        .await
        .unwrap();
        match outcome {
            RunOutcome::Completed { output, status, .. } => {
                assert!(status.success());
                assert!(output.contains("out"));
                assert!(output.contains("err"));
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }
}
