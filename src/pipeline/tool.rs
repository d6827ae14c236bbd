//! Child-process plumbing shared by the rasterizer and OCR adapters.
//!
//! Both external tools are run through [`run_tool`], which separates "could
//! not start the binary" from "the binary ran and failed" so the adapters can
//! map each to the right [`crate::error::Pdf2CsvError`] variant. Children are
//! killed when their future is dropped, which is what makes the optional
//! timeout effective.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Why a tool invocation produced no [`Output`].
#[derive(Debug, Error)]
pub enum ToolError {
    /// The binary could not be started (missing, not executable).
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The process started but collecting its output failed.
    #[error("failed to wait for '{program}': {source}")]
    Wait {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The process did not exit within the timeout and was killed.
    #[error("'{program}' did not finish within {secs}s")]
    TimedOut { program: PathBuf, secs: u64 },
}

/// Resolve a configured tool location to the binary to execute.
///
/// * empty → `name`, looked up on `PATH`
/// * a directory → `<dir>/<name>` (Poppler's `bin` folder convention)
/// * anything else → used as the binary itself
pub fn resolve_binary(configured: &Path, name: &str) -> PathBuf {
    let exe = executable_name(name);
    if configured.as_os_str().is_empty() {
        PathBuf::from(exe)
    } else if configured.is_dir() {
        configured.join(exe)
    } else {
        configured.to_path_buf()
    }
}

fn executable_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

/// Run `program` with `args` to completion, capturing stdout and stderr.
///
/// A non-zero exit status is *not* an error here; callers inspect
/// `output.status` themselves.
pub async fn run_tool<I, S>(
    program: &Path,
    args: I,
    timeout_secs: Option<u64>,
) -> Result<Output, ToolError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("Running {:?}", cmd.as_std());

    let child = cmd.spawn().map_err(|source| ToolError::Spawn {
        program: program.to_path_buf(),
        source,
    })?;

    let wait = child.wait_with_output();
    let result = match timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), wait)
            .await
            .map_err(|_| ToolError::TimedOut {
                program: program.to_path_buf(),
                secs,
            })?,
        None => wait.await,
    };

    result.map_err(|source| ToolError::Wait {
        program: program.to_path_buf(),
        source,
    })
}

/// Lossy UTF-8 view of a tool's stderr, trimmed, for error messages.
pub fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}
