//! Job and outcome records

use super::children::ChildRegistry;
use crate::command::shell_quote;
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

/// One external command to run for one sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    index: usize,
    key: String,
    program: String,
    args: Vec<String>,
}

impl Job {
    pub fn new(index: usize, key: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            index,
            key: key.into(),
            program: program.into(),
            args,
        }
    }

    /// Position in submission order
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Shell-safe rendering of the full command line
    pub fn rendered(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run to completion in `working_dir`, never returning an error
    ///
    /// Spawn failures are folded into the outcome so a broken job is
    /// reported like any other failed one. The child is registered in
    /// `children` for as long as it runs.
    pub(crate) fn execute(
        &self,
        working_dir: &Path,
        log_dir: Option<&Path>,
        children: &ChildRegistry,
    ) -> JobOutcome {
        let start = Instant::now();
        let status = match self.spawn_and_wait(working_dir, log_dir, children) {
            Ok(exit) => JobStatus::from_exit(exit),
            Err(e) => JobStatus::SpawnFailed {
                reason: e.to_string(),
            },
        };

        JobOutcome {
            index: self.index,
            key: self.key.clone(),
            command: self.rendered(),
            status,
            duration: start.elapsed(),
        }
    }

    fn spawn_and_wait(
        &self,
        working_dir: &Path,
        log_dir: Option<&Path>,
        children: &ChildRegistry,
    ) -> std::io::Result<ExitStatus> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(working_dir).stdin(Stdio::null());

        // Own group, so an interrupt reaches the pipeline's own children too
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        if let Some(dir) = log_dir {
            let log = File::create(dir.join(format!("{}.log", self.key)))?;
            cmd.stdout(log.try_clone()?).stderr(log);
        }

        let mut child = cmd.spawn()?;
        let pid = child.id();
        children.register(pid);
        let status = child.wait();
        children.unregister(pid);
        status
    }
}

/// Completion status of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Succeeded,
    /// Non-zero exit; `None` when terminated by a signal
    Failed { exit_code: Option<i32> },
    /// The process could not be started at all
    SpawnFailed { reason: String },
}

impl JobStatus {
    fn from_exit(status: ExitStatus) -> Self {
        if status.success() {
            JobStatus::Succeeded
        } else {
            JobStatus::Failed {
                exit_code: status.code(),
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Succeeded)
    }
}

/// Result slot contents for one completed job
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub index: usize,
    pub key: String,
    pub command: String,
    #[serde(flatten)]
    pub status: JobStatus,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl JobOutcome {
    pub fn succeeded(&self) -> bool {
        self.status.is_success()
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}
