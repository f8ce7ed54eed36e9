//! git::command
//!
//! Subprocess runner for every git write and network operation.
//!
//! # Environment
//!
//! Every command is built by [`GitRunner::command`], which applies:
//! - `GIT_TERMINAL_PROMPT=0` so a missing credential fails instead of hanging
//! - `GIT_EXEC_PATH` when one is configured
//! - the configured credential helper, passed through `GIT_CONFIG_COUNT` so
//!   helpers from the user's own config are reset first
//! - `LC_ALL=C` so failure text can be classified
//! - `core.quotepath=false` so non-ASCII paths come back verbatim
//!
//! # Streaming
//!
//! [`GitRunner::run_streaming`] reads stderr incrementally, splits it on `\r`
//! and `\n`, and forwards each parsed segment to a [`ProgressSink`] in the
//! order the tool printed it. Cancellation is polled once per segment; when it
//! trips the child is killed and [`StreamOutcome::Canceled`] is returned.

use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;

use tracing::{debug, warn};

use super::error::GitError;
use super::progress::{parse_progress_line, LineSplitter};
use crate::core::config::Config;
use crate::progress::ProgressSink;

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Outcome of a streamed subprocess.
#[derive(Debug)]
pub enum StreamOutcome {
    Finished(CommandOutput),
    Canceled,
}

/// Builds and runs git subprocesses in one working directory.
#[derive(Debug, Clone)]
pub struct GitRunner {
    git_path: String,
    work_dir: PathBuf,
    exec_path: Option<String>,
    credential_helper: Option<String>,
}

impl GitRunner {
    pub fn new(work_dir: &Path, config: &Config) -> Self {
        Self {
            git_path: config.git_path().to_string(),
            work_dir: work_dir.to_path_buf(),
            exec_path: config.git_exec_path().map(str::to_string),
            credential_helper: config.credential_helper().map(str::to_string),
        }
    }

    /// Same settings, different working directory.
    pub fn in_dir(&self, work_dir: &Path) -> Self {
        Self {
            work_dir: work_dir.to_path_buf(),
            ..self.clone()
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn git_path(&self) -> &str {
        &self.git_path
    }

    /// A command with the hardened environment applied.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.git_path);
        cmd.current_dir(&self.work_dir);
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.env("LC_ALL", "C");
        if let Some(exec_path) = &self.exec_path {
            cmd.env("GIT_EXEC_PATH", exec_path);
        }
        if let Some(helper) = &self.credential_helper {
            cmd.env("GIT_CONFIG_COUNT", "2");
            cmd.env("GIT_CONFIG_KEY_0", "credential.helper");
            cmd.env("GIT_CONFIG_VALUE_0", "");
            cmd.env("GIT_CONFIG_KEY_1", "credential.helper");
            cmd.env("GIT_CONFIG_VALUE_1", helper);
        }
        cmd.args(["-c", "core.quotepath=false"]);
        cmd.stdin(Stdio::null());
        cmd
    }

    /// Run to completion, capturing output. Does not check the exit status.
    pub fn run<I, S>(&self, args: I) -> Result<CommandOutput, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args = collect_args(args);
        debug!(args = %display_args(&args), dir = %self.work_dir.display(), "git");
        let output = self
            .command()
            .args(&args)
            .output()
            .map_err(|e| self.spawn_error(e))?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run to completion and return stdout, classifying a failure.
    pub fn run_checked<I, S>(&self, args: I) -> Result<String, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args = collect_args(args);
        let output = self.run(&args)?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(GitError::from_command(
                &subcommand(&args),
                output.code,
                &output.stderr,
            ))
        }
    }

    /// Run while forwarding progress from stderr, honoring cancellation.
    pub fn run_streaming<I, S>(
        &self,
        args: I,
        progress: &dyn ProgressSink,
    ) -> Result<StreamOutcome, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        if progress.is_canceled() {
            return Ok(StreamOutcome::Canceled);
        }

        let args = collect_args(args);
        debug!(args = %display_args(&args), dir = %self.work_dir.display(), "git (streaming)");
        let mut child = self
            .command()
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // Drain stdout separately so a full pipe cannot stall the child
        let stdout_reader = child.stdout.take().map(|mut out| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = out.read_to_end(&mut buf);
                buf
            })
        });

        let mut stderr_text = String::new();
        let mut canceled = false;
        if let Some(mut stderr) = child.stderr.take() {
            let mut splitter = LineSplitter::new();
            let mut chunk = [0u8; 4096];
            'read: loop {
                let read = match stderr.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        kill(&mut child);
                        return Err(GitError::Io(e));
                    }
                };
                for line in splitter.push(&chunk[..read]) {
                    forward(&line, progress, &mut stderr_text);
                    if progress.is_canceled() {
                        canceled = true;
                        break 'read;
                    }
                }
            }
            if !canceled {
                if let Some(line) = splitter.finish() {
                    forward(&line, progress, &mut stderr_text);
                }
            }
        }

        if canceled || progress.is_canceled() {
            warn!(args = %display_args(&args), "canceling git process");
            kill(&mut child);
            if let Some(handle) = stdout_reader {
                let _ = handle.join();
            }
            return Ok(StreamOutcome::Canceled);
        }

        let status = child.wait()?;
        let stdout = stdout_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        Ok(StreamOutcome::Finished(CommandOutput {
            success: status.success(),
            code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: stderr_text,
        }))
    }

    fn spawn_error(&self, err: std::io::Error) -> GitError {
        if err.kind() == std::io::ErrorKind::NotFound {
            GitError::ToolNotFound(self.git_path.clone())
        } else {
            GitError::Io(err)
        }
    }
}

fn forward(line: &str, progress: &dyn ProgressSink, stderr_text: &mut String) {
    stderr_text.push_str(line);
    stderr_text.push('\n');
    if let Some(update) = parse_progress_line(line) {
        progress.update(
            update.phase,
            update.current,
            update.max,
            update.text.as_deref(),
        );
    }
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn collect_args<I, S>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    args.into_iter().map(|a| a.as_ref().to_os_string()).collect()
}

fn display_args(args: &[OsString]) -> String {
    args.iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The git subcommand named by `args`, skipping leading `-c key=value` pairs.
fn subcommand(args: &[OsString]) -> String {
    let mut iter = args.iter().map(|a| a.to_string_lossy());
    while let Some(arg) = iter.next() {
        if arg == "-c" || arg == "-C" {
            iter.next();
            continue;
        }
        if !arg.starts_with('-') {
            return arg.into_owned();
        }
    }
    String::from("git")
}

/// Check whether an executable exists on PATH.
pub fn command_exists(name: &str) -> bool {
    let Some(path_var) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path_var).any(|dir| {
        let candidate = dir.join(name);
        candidate.is_file() || (cfg!(windows) && candidate.with_extension("exe").is_file())
    })
}
