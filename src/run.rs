//! Process stdout as a line stream. The waiter thread holds the pipe's write
//! end until the process is reaped, so the stream ends after any failure report.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

use nix::fcntl::OFlag;
use nix::unistd::pipe2;
use tracing::{debug, warn};

use crate::source::{pump_lines, PumpError};
use crate::stream::{stage, LineStream};

/// A process that could not be started or did not exit successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessFailure {
    pub program: String,
    pub args: Vec<String>,
    pub reason: String,
    /// Exit code, when the process ran and exited on its own.
    pub code: Option<i32>,
    /// Everything the process wrote to stderr.
    pub stderr: String,
}

impl fmt::Display for ProcessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed {} {:?}: {}", self.program, self.args, self.reason)
    }
}

/// Side channel for failures that are deliberately kept out of the stream.
pub trait Diagnostics: Send + Sync {
    fn process_failed(&self, failure: &ProcessFailure);
}

/// Reports through `tracing` at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn process_failed(&self, failure: &ProcessFailure) {
        warn!(
            program = %failure.program,
            args = ?failure.args,
            code = ?failure.code,
            stderr = %failure.stderr,
            "{failure}"
        );
    }
}

/// Run `program` with `args`, streaming its stdout line by line.
pub fn run<I, S>(program: &str, args: I) -> LineStream
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    run_with(program, args, Arc::new(TracingDiagnostics))
}

/// [`run`] with an explicit diagnostics sink.
pub fn run_with<I, S>(program: &str, args: I, diagnostics: Arc<dyn Diagnostics>) -> LineStream
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let program = program.to_string();
    let args: Vec<String> = args.into_iter().map(Into::into).collect();
    let failure = {
        let (program, args) = (program.clone(), args.clone());
        move |reason: String, code: Option<i32>, stderr: String| ProcessFailure {
            program: program.clone(),
            args: args.clone(),
            reason,
            code,
            stderr,
        }
    };

    // O_CLOEXEC keeps the write end out of unrelated children spawned concurrently.
    let (read_fd, write_fd) = match pipe2(OFlag::O_CLOEXEC) {
        Ok(fds) => fds,
        Err(e) => {
            diagnostics.process_failed(&failure(format!("pipe: {e}"), None, String::new()));
            return stage("run", |_| Ok(()));
        }
    };

    let mut cmd = Command::new(&program);
    cmd.args(&args).stdin(Stdio::null()).stdout(Stdio::from(write_fd)).stderr(Stdio::piped());

    let waiter = {
        let diagnostics = Arc::clone(&diagnostics);
        move || {
            let outcome = match cmd.spawn() {
                Err(e) => Some(failure(e.to_string(), None, String::new())),
                Ok(mut child) => {
                    let mut captured = Vec::new();
                    if let Some(mut stderr) = child.stderr.take() {
                        if let Err(e) = stderr.read_to_end(&mut captured) {
                            debug!(error = %e, "reading stderr");
                        }
                    }
                    let stderr = String::from_utf8_lossy(&captured).into_owned();
                    match child.wait() {
                        Ok(status) if status.success() => None,
                        Ok(status) => Some(failure(status.to_string(), status.code(), stderr)),
                        Err(e) => Some(failure(e.to_string(), None, stderr)),
                    }
                }
            };
            if let Some(f) = outcome {
                diagnostics.process_failed(&f);
            }
            // Releases the parent's write end: the bridge sees end-of-file.
            drop(cmd);
        }
    };
    if let Err(e) = thread::Builder::new().name("sh-run-wait".into()).spawn(waiter) {
        // The closure, and the write end with it, is gone; the bridge still ends.
        diagnostics.process_failed(&ProcessFailure {
            program: program.clone(),
            args: args.clone(),
            reason: format!("spawn process waiter: {e}"),
            code: None,
            stderr: String::new(),
        });
    }

    let reader = BufReader::new(File::from(read_fd));
    stage("run", move |out| match pump_lines(reader, out) {
        Ok(()) | Err(PumpError::Closed) => Ok(()),
        Err(PumpError::Io(e)) => {
            debug!(error = %e, "process output ended with a read error");
            Ok(())
        }
    })
}
