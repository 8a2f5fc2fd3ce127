//! A submitted spark-submit child process

use std::fs::File;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};

use crate::runtime::command::SparkSubmitCommand;

/// Identifies a job within one launcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u32);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Lifecycle of a submitted job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Command built, process not spawned yet
    Created,
    /// Process is running
    Running,
    /// Process exited (None when killed by a signal)
    Completed(Option<i32>),
    /// Deadline passed before the process exited
    TimedOut,
    /// Log stayed silent for too long
    Hung,
}

impl JobState {
    pub fn is_running(&self) -> bool {
        matches!(self, JobState::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed(_) | JobState::TimedOut | JobState::Hung
        )
    }
}

/// How waiting on a job ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Exited with code 0
    Succeeded,
    /// Completion marker appeared in the log; the process was stopped
    CompletedBySentinel,
    /// Exited with a non-zero code, or was killed by a signal (None)
    Failed { code: Option<i32> },
    /// Still running when the deadline passed
    TimedOut,
    /// No new log output for the configured retry window
    Hung,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded | JobOutcome::CompletedBySentinel)
    }
}

impl std::fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobOutcome::Succeeded => f.write_str("succeeded"),
            JobOutcome::CompletedBySentinel => f.write_str("completed (marker seen in log)"),
            JobOutcome::Failed { code: Some(code) } => write!(f, "failed with exit code {code}"),
            JobOutcome::Failed { code: None } => f.write_str("killed by signal"),
            JobOutcome::TimedOut => f.write_str("timed out"),
            JobOutcome::Hung => f.write_str("hung"),
        }
    }
}

/// A spark-submit process together with its debug files
pub struct SparkJob {
    pub id: JobId,
    /// Job counter value at submission; names the log file
    pub index: u32,
    pub name: String,
    /// Program and arguments that were run
    pub argv: Vec<String>,
    pub pid: Option<u32>,
    pub exit_code: Option<i32>,
    pub state: JobState,
    /// `command.sh` the command line was appended to
    pub command_file: PathBuf,
    /// Combined stdout/stderr of the child
    pub log_file: PathBuf,
    pub started_at: Option<Instant>,
    /// Set once a wait has reached a verdict
    pub outcome: Option<JobOutcome>,
    child: Option<Child>,
}

impl SparkJob {
    pub fn new(
        id: JobId,
        index: u32,
        command: &SparkSubmitCommand,
        command_file: PathBuf,
        log_file: PathBuf,
    ) -> Self {
        Self {
            id,
            index,
            name: command.job_name.clone(),
            argv: command.argv.clone(),
            pid: None,
            exit_code: None,
            state: JobState::Created,
            command_file,
            log_file,
            started_at: None,
            outcome: None,
            child: None,
        }
    }

    /// Spawn the process with stdout and stderr both appended to `log_file`
    pub fn start(&mut self) -> Result<(), ProcessError> {
        if self.state != JobState::Created {
            return Err(ProcessError::AlreadyStarted(self.name.clone()));
        }

        let Some((program, args)) = self.argv.split_first() else {
            return Err(self.spawn_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty command line",
            )));
        };

        let log = File::options()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .map_err(|e| self.spawn_error(e))?;
        let log_err = log.try_clone().map_err(|e| self.spawn_error(e))?;

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        self.pid = child.id();
        self.state = JobState::Running;
        self.started_at = Some(Instant::now());
        self.child = Some(child);
        log::info!(
            "[{}] Local Spark job submitted with pid: {}",
            self.name,
            self.pid.unwrap_or(0)
        );
        Ok(())
    }

    fn spawn_error(&self, source: std::io::Error) -> ProcessError {
        ProcessError::SpawnFailed {
            name: self.name.clone(),
            source,
        }
    }

    /// Non-blocking exit check. Returns the new state once the process has exited.
    pub fn poll_exit(&mut self) -> Result<Option<JobState>, ProcessError> {
        let Some(child) = self.child.as_mut() else {
            return Ok(self.state.is_terminal().then_some(self.state));
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                self.record_exit(status.code());
                Ok(Some(self.state))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(ProcessError::Wait {
                name: self.name.clone(),
                source: e,
            }),
        }
    }

    fn record_exit(&mut self, code: Option<i32>) {
        self.exit_code = code;
        if !self.state.is_terminal() {
            self.state = JobState::Completed(code);
        }
        self.pid = None;
        self.child = None;
    }

    /// Mark the job with a terminal state that is not a plain exit
    pub fn mark(&mut self, state: JobState) {
        self.state = state;
    }

    /// SIGTERM, then SIGKILL if the process outlives `grace`
    pub async fn terminate(&mut self, grace: Duration) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        log::warn!("[{}] Terminating spark job", self.name);

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.pid {
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            }
        }

        #[cfg(not(unix))]
        {
            let _ = child.start_kill();
        }

        let code = match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => status.code(),
            Ok(Err(e)) => {
                log::error!("[{}] Error waiting for process: {}", self.name, e);
                None
            }
            Err(_) => {
                log::warn!(
                    "[{}] Process did not exit after {:?}, forcing kill",
                    self.name,
                    grace
                );
                if let Err(e) = child.kill().await {
                    log::error!("[{}] Failed to kill process: {}", self.name, e);
                }
                None
            }
        };
        self.record_exit(code);
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|t| t.elapsed())
    }
}

/// Errors that can occur with job processes
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Job '{0}' was already started")]
    AlreadyStarted(String),

    #[error("Failed to spawn job '{name}': {source}")]
    SpawnFailed {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to check status of job '{name}': {source}")]
    Wait {
        name: String,
        #[source]
        source: std::io::Error,
    },
}
