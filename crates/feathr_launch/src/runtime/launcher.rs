//! Local Spark launcher - submits jobs and waits for them

use crate::config::{JobInvocation, LauncherConfig, LauncherConfigError};
use crate::runtime::command::SparkSubmitCommand;
use crate::runtime::process::{JobId, JobOutcome, JobState, ProcessError, SparkJob};
use crate::runtime::tail::LogTail;
use indexmap::IndexMap;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

/// Runs Feathr jobs through a local `spark-submit`.
///
/// Meant for development and tests: there is no authentication and every
/// job is a child of the current process. Each [`submit`](Self::submit)
/// returns a [`JobId`]; any number of jobs can be tracked, and the most
/// recent one is remembered for [`wait_for_latest`](Self::wait_for_latest).
pub struct LocalSparkLauncher {
    config: LauncherConfig,
    jobs: IndexMap<JobId, SparkJob>,
    job_counter: u32,
    latest: Option<JobId>,
}

impl LocalSparkLauncher {
    pub fn new(config: LauncherConfig) -> Result<Self, LaunchError> {
        config.validate()?;
        Ok(Self {
            config,
            jobs: IndexMap::new(),
            job_counter: 0,
            latest: None,
        })
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    /// Local jobs read files in place, nothing is uploaded
    pub fn upload_or_get_cloud_path(&self, local_or_http_path: &str) -> String {
        local_or_http_path.to_string()
    }

    /// The command `submit` would run, without running it
    pub fn plan(&self, job: &JobInvocation) -> Result<SparkSubmitCommand, LaunchError> {
        Ok(SparkSubmitCommand::build(&self.config, job)?)
    }

    /// Start `job` and return its id
    pub async fn submit(&mut self, job: &JobInvocation) -> Result<JobId, LaunchError> {
        log::warn!(
            "[{}] Local Spark mode only supports basic parameters and is meant for testing",
            job.name
        );
        log::info!(
            "[{}] Running on local Spark with master: {}",
            job.name,
            self.config.master()
        );

        let command = self.plan(job)?;
        let debug_dir = self.debug_dir_for(&job.name)?;
        let index = self.job_counter;
        let command_file = debug_dir.join("command.sh");
        let log_file = debug_dir.join(format!("log_{index}.txt"));

        let id = JobId(index);
        let mut spark_job = SparkJob::new(id, index, &command, command_file, log_file);
        spark_job.start()?;
        self.job_counter += 1;

        append_command(&spark_job.command_file, &command).map_err(|e| {
            LaunchError::DebugFiles {
                path: spark_job.command_file.clone(),
                source: e,
            }
        })?;
        log::info!(
            "[{}] Job stdout and stderr are in {}",
            job.name,
            spark_job.log_file.display()
        );

        self.jobs.insert(id, spark_job);
        self.latest = Some(id);
        Ok(id)
    }

    /// `<debug_folder>/<job_name><timestamp>`, created if missing
    fn debug_dir_for(&self, job_name: &str) -> Result<PathBuf, LaunchError> {
        let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
        let dir = self.config.debug_dir().join(format!("{job_name}{stamp}"));
        std::fs::create_dir_all(&dir).map_err(|e| LaunchError::DebugFiles {
            path: dir.clone(),
            source: e,
        })?;
        Ok(dir)
    }

    pub fn job(&self, id: JobId) -> Option<&SparkJob> {
        self.jobs.get(&id)
    }

    /// All jobs in submission order
    pub fn jobs(&self) -> impl Iterator<Item = &SparkJob> {
        self.jobs.values()
    }

    pub fn latest(&self) -> Option<JobId> {
        self.latest
    }

    /// Number of jobs submitted so far
    pub fn job_count(&self) -> u32 {
        self.job_counter
    }

    fn job_mut(&mut self, id: JobId) -> Result<&mut SparkJob, LaunchError> {
        self.jobs.get_mut(&id).ok_or(LaunchError::UnknownJob(id))
    }

    /// Raw exit code; None while the job runs or if a signal ended it
    pub fn get_status(&mut self, id: JobId) -> Result<Option<i32>, LaunchError> {
        let job = self.job_mut(id)?;
        job.poll_exit()?;
        Ok(job.exit_code)
    }

    pub fn state(&mut self, id: JobId) -> Result<JobState, LaunchError> {
        let job = self.job_mut(id)?;
        job.poll_exit()?;
        Ok(job.state)
    }

    /// Stop a running job (SIGTERM, then SIGKILL after the grace period)
    pub async fn terminate(&mut self, id: JobId) -> Result<(), LaunchError> {
        let grace = self.config.termination_grace();
        self.job_mut(id)?.terminate(grace).await;
        Ok(())
    }

    /// Wait on the most recently submitted job
    pub async fn wait_for_latest(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<JobOutcome, LaunchError> {
        let id = self.latest.ok_or(LaunchError::NoJobSubmitted)?;
        self.wait_for_completion(id, timeout).await
    }

    /// Block until the job exits, prints the completion marker, goes silent
    /// for too long, or `timeout` passes (None waits forever).
    ///
    /// The log is re-read whenever it changes and at every poll interval.
    /// Once the process has exited its exit code decides the outcome, even if
    /// the marker was printed. Timed-out and hung jobs are terminated when
    /// `clean_up` is set.
    pub async fn wait_for_completion(
        &mut self,
        id: JobId,
        timeout: Option<Duration>,
    ) -> Result<JobOutcome, LaunchError> {
        let poll_interval = self.config.poll_interval();
        let hang_after = self.config.hang_after();
        let grace = self.config.termination_grace();
        let clean_up = self.config.clean_up;
        let sentinel = self.config.sentinel.clone();
        let running = self.jobs.values().filter(|j| j.state.is_running()).count();

        let job = self.job_mut(id)?;
        if let Some(outcome) = job.outcome {
            return Ok(outcome);
        }

        log::info!(
            "[{}] Waiting for {} ({} job(s) running); command in {}, output in {}",
            job.name,
            id,
            running,
            job.command_file.display(),
            job.log_file.display()
        );

        let mut tail = LogTail::new(&job.log_file);
        let (change_tx, mut change_rx) = mpsc::unbounded_channel();
        let _watcher = watch_log(&job.log_file, change_tx);

        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let started = Instant::now();
        let deadline = timeout.map(|t| started + t);
        let mut last_output = started;
        let mut last_line: Option<String> = None;

        loop {
            let lines = tail
                .read_new_lines()
                .await
                .map_err(|e| LaunchError::Log {
                    path: job.log_file.clone(),
                    source: e,
                })?;

            if lines.is_empty() {
                log::trace!("[{}] waiting for output", job.name);
            } else {
                last_output = Instant::now();
                for line in &lines {
                    log::debug!("[{}] {}", job.name, line);
                }
                last_line = lines.last().cloned();
            }

            // An exited process is judged by its exit code alone
            if let Some(state) = job.poll_exit()? {
                let outcome = match state {
                    JobState::Completed(Some(0)) => JobOutcome::Succeeded,
                    JobState::Completed(code) => JobOutcome::Failed { code },
                    JobState::Hung => JobOutcome::Hung,
                    JobState::TimedOut => JobOutcome::TimedOut,
                    JobState::Created | JobState::Running => {
                        unreachable!("poll_exit only reports terminal states")
                    }
                };
                return Ok(finish(job, outcome));
            }

            let marker_seen = lines.iter().any(|line| line.contains(&sentinel))
                || tail.pending().contains(&sentinel);
            if marker_seen {
                log::info!("[{}] Completion marker found in log", job.name);
                job.terminate(grace).await;
                return Ok(finish(job, JobOutcome::CompletedBySentinel));
            }

            if let Some(hang_after) = hang_after {
                if last_output.elapsed() >= hang_after {
                    log::warn!(
                        "[{}] Spark job has been silent for {:?}; latest output: {:?}. Please check {}",
                        job.name,
                        hang_after,
                        last_line.as_deref().unwrap_or(""),
                        job.log_file.display()
                    );
                    job.mark(JobState::Hung);
                    if clean_up {
                        job.terminate(grace).await;
                    }
                    return Ok(finish(job, JobOutcome::Hung));
                }
            }

            if deadline.is_some_and(|d| Instant::now() >= d) {
                log::warn!(
                    "[{}] Spark job with pid {} not completed after {:?}, please check",
                    job.name,
                    job.pid.unwrap_or(0),
                    timeout.unwrap_or_default()
                );
                job.mark(JobState::TimedOut);
                if clean_up {
                    job.terminate(grace).await;
                }
                return Ok(finish(job, JobOutcome::TimedOut));
            }

            tokio::select! {
                _ = ticker.tick() => {}
                Some(()) = change_rx.recv() => {
                    while change_rx.try_recv().is_ok() {}
                }
                _ = until(deadline) => {}
            }
        }
    }
}

/// Record the outcome on the job and log it
fn finish(job: &mut SparkJob, outcome: JobOutcome) -> JobOutcome {
    let secs = job.elapsed().map(|d| d.as_secs()).unwrap_or(0);
    if outcome.is_success() {
        log::info!(
            "[{}] Spark job finished in {} seconds: {}",
            job.name,
            secs,
            outcome
        );
    } else {
        log::warn!(
            "[{}] Spark job is not successful after {} seconds: {}. Please check {}",
            job.name,
            secs,
            outcome,
            job.log_file.display()
        );
    }
    job.outcome = Some(outcome);
    outcome
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Wake the wait loop when the log changes. None falls back to polling only.
fn watch_log(path: &Path, tx: mpsc::UnboundedSender<()>) -> Option<RecommendedWatcher> {
    let handler = move |res: notify::Result<notify::Event>| {
        if let Ok(event) = res {
            if event.kind.is_modify() || event.kind.is_create() {
                let _ = tx.send(());
            }
        }
    };

    let mut watcher = match notify::recommended_watcher(handler) {
        Ok(watcher) => watcher,
        Err(e) => {
            log::debug!("Log watcher unavailable, polling only: {}", e);
            return None;
        }
    };
    if let Err(e) = watcher.watch(path, RecursiveMode::NonRecursive) {
        log::debug!("Cannot watch {}, polling only: {}", path.display(), e);
        return None;
    }
    Some(watcher)
}

fn append_command(path: &Path, command: &SparkSubmitCommand) -> std::io::Result<()> {
    let mut file = std::fs::File::options()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{}", command.to_shell_line())
}

/// Errors that can occur in the launcher
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error(transparent)]
    Config(#[from] LauncherConfigError),

    #[error("Failed to encode system properties: {0}")]
    Properties(#[from] serde_json::Error),

    #[error("Failed to prepare debug files at '{path}': {source}")]
    DebugFiles {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("Failed to read job log '{path}': {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown job: {0}")]
    UnknownJob(JobId),

    #[error("No job has been submitted")]
    NoJobSubmitted,
}
