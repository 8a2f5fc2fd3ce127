//! Feathr Local Spark Launcher
//!
//! Runs Feathr jobs through a local Spark distribution for development and
//! testing.
//!
//! # Overview
//!
//! The launcher:
//! - Builds a `spark-submit` command line for JAR, Maven-only or PySpark jobs
//! - Runs it as a child process with combined output in a per-job log file
//! - Records every command line in `<debug_folder>/<job><timestamp>/command.sh`
//! - Waits for completion with a timeout, a completion marker read from the
//!   log and detection of jobs that stop producing output
//!
//! # Example Job File
//!
//! ```yaml
//! args:
//!   join_config:
//!     default: "feature_join.conf"
//!
//! name: feathr_feature_join_job
//! main_class: com.linkedin.feathr.offline.job.FeatureJoinJob
//! arguments:
//!   - "--join-config"
//!   - "$(workspace)/$(arg join_config)"
//! configuration:
//!   spark.executor.memory: 2g
//! properties:
//!   feathr.local: "true"
//! ```

pub mod cli;
pub mod config;
pub mod runtime;

pub use cli::LaunchArgs;
pub use config::{
    JobFile, JobFileError, JobInvocation, LauncherConfig, LauncherConfigError,
    SubstitutionContext, SubstitutionError,
};
pub use runtime::{
    JobId, JobOutcome, JobState, LaunchError, LocalSparkLauncher, LogTail, ProcessError,
    SparkJob, SparkSubmitCommand, SubmitKind,
};
