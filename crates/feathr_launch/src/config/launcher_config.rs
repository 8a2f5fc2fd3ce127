//! Launcher settings, loaded once from YAML or taken from defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Maven coordinate of the Feathr runtime pulled in when no main artifact is given
pub const FEATHR_MAVEN_ARTIFACT: &str = "com.linkedin.feathr:feathr_2.12:0.9.0";

/// Log line the Feathr PySpark driver prints once its work is done
pub const DEFAULT_SENTINEL: &str = "Feathr Pyspark job completed";

/// Default master when none is configured
pub const DEFAULT_MASTER: &str = "local[*]";

/// Packages the Feathr runtime needs on a plain local Spark install.
/// Bump alongside the runtime's own dependency list.
pub const DEFAULT_PACKAGES: &[&str] = &[
    "org.apache.spark:spark-avro_2.12:3.3.0",
    "com.microsoft.sqlserver:mssql-jdbc:10.2.0.jre8",
    "com.microsoft.azure:spark-mssql-connector_2.12:1.2.0",
    "org.apache.logging.log4j:log4j-core:2.17.2",
    "com.typesafe:config:1.3.4",
    "com.fasterxml.jackson.core:jackson-databind:2.12.6.1",
    "org.apache.hadoop:hadoop-mapreduce-client-core:2.7.7",
    "org.apache.hadoop:hadoop-common:2.7.7",
    "org.apache.hadoop:hadoop-azure:3.2.0",
    "org.apache.avro:avro:1.8.2",
    "org.apache.xbean:xbean-asm6-shaded:4.10",
    "org.apache.spark:spark-sql-kafka-0-10_2.12:3.1.3",
    "com.microsoft.azure:azure-eventhubs-spark_2.12:2.3.21",
    "org.apache.kafka:kafka-clients:3.1.0",
    "com.google.guava:guava:31.1-jre",
    "it.unimi.dsi:fastutil:8.1.1",
    "org.mvel:mvel2:2.2.8.Final",
    "com.fasterxml.jackson.module:jackson-module-scala_2.12:2.13.3",
    "com.fasterxml.jackson.dataformat:jackson-dataformat-yaml:2.12.6",
    "com.fasterxml.jackson.dataformat:jackson-dataformat-csv:2.12.6",
    "com.jasonclawson:jackson-dataformat-hocon:1.1.0",
    "com.redislabs:spark-redis_2.12:3.1.0",
    "com.google.protobuf:protobuf-java:3.19.4",
    "net.snowflake:snowflake-jdbc:3.13.18",
    "net.snowflake:spark-snowflake_2.12:2.10.0-spark_3.2",
    "org.apache.commons:commons-lang3:3.12.0",
    "org.xerial:sqlite-jdbc:3.36.0.3",
    "com.github.changvvb:jackson-module-caseclass_2.12:1.1.1",
    "com.azure.cosmos.spark:azure-cosmos-spark_3-1_2-12:4.11.1",
    "org.eclipse.jetty:jetty-util:9.3.24.v20180605",
    "commons-io:commons-io:2.6",
    "org.apache.hadoop:hadoop-azure:2.7.4",
    "com.microsoft.azure:azure-storage:8.6.4",
];

/// Local launcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LauncherConfig {
    /// Workspace directory; relative paths below resolve against it
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    /// Spark master URL (None = `local[*]`)
    #[serde(default)]
    pub master: Option<String>,

    /// Where per-job command and log files go
    #[serde(default = "default_debug_folder")]
    pub debug_folder: PathBuf,

    /// Terminate jobs that time out or hang
    #[serde(default = "default_true")]
    pub clean_up: bool,

    /// Consecutive silent checks before a job counts as hung (0 = never)
    #[serde(default = "default_retry")]
    pub retry: u32,

    /// Seconds between silent checks
    #[serde(default = "default_retry_sec")]
    pub retry_sec: u64,

    /// spark-submit command; may carry leading arguments separated by whitespace
    #[serde(default = "default_spark_submit")]
    pub spark_submit: String,

    /// Exit status poll interval
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Completion marker searched for in the job log
    #[serde(default = "default_sentinel")]
    pub sentinel: String,

    /// Time between SIGTERM and SIGKILL when terminating a job
    #[serde(default = "default_grace_ms")]
    pub termination_grace_ms: u64,

    /// Placeholder main jar for Maven-only JAR jobs (default: `<workspace>/noop-1.0.jar`)
    #[serde(default)]
    pub noop_jar: Option<PathBuf>,

    /// Packages used when the job configuration has no `spark.jars.packages`
    #[serde(default = "default_packages")]
    pub packages: Vec<String>,

    /// Feathr runtime coordinate appended to every package list
    #[serde(default = "default_maven_artifact")]
    pub maven_artifact: String,
}

fn default_workspace() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn default_debug_folder() -> PathBuf {
    PathBuf::from("debug")
}

fn default_true() -> bool {
    true
}

fn default_retry() -> u32 {
    3
}

fn default_retry_sec() -> u64 {
    5
}

fn default_spark_submit() -> String {
    "spark-submit".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_sentinel() -> String {
    DEFAULT_SENTINEL.to_string()
}

fn default_grace_ms() -> u64 {
    5000
}

fn default_packages() -> Vec<String> {
    DEFAULT_PACKAGES.iter().map(|p| p.to_string()).collect()
}

fn default_maven_artifact() -> String {
    FEATHR_MAVEN_ARTIFACT.to_string()
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self::new(default_workspace())
    }
}

impl LauncherConfig {
    /// Defaults rooted at `workspace`
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            master: None,
            debug_folder: default_debug_folder(),
            clean_up: true,
            retry: default_retry(),
            retry_sec: default_retry_sec(),
            spark_submit: default_spark_submit(),
            poll_interval_ms: default_poll_interval_ms(),
            sentinel: default_sentinel(),
            termination_grace_ms: default_grace_ms(),
            noop_jar: None,
            packages: default_packages(),
            maven_artifact: default_maven_artifact(),
        }
    }

    /// Load from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LauncherConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| LauncherConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self, LauncherConfigError> {
        let config: LauncherConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LauncherConfigError> {
        if self.retry_sec == 0 {
            return Err(LauncherConfigError::Validation(
                "retry_sec must be positive".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(LauncherConfigError::Validation(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.spark_submit.split_whitespace().next().is_none() {
            return Err(LauncherConfigError::Validation(
                "spark_submit must name a program".to_string(),
            ));
        }
        if self.sentinel.is_empty() {
            return Err(LauncherConfigError::Validation(
                "sentinel must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn master(&self) -> &str {
        self.master.as_deref().unwrap_or(DEFAULT_MASTER)
    }

    /// Debug folder resolved against the workspace
    pub fn debug_dir(&self) -> PathBuf {
        self.resolve(&self.debug_folder)
    }

    pub fn noop_jar_path(&self) -> PathBuf {
        match &self.noop_jar {
            Some(path) => self.resolve(path),
            None => self.workspace.join("noop-1.0.jar"),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn termination_grace(&self) -> Duration {
        Duration::from_millis(self.termination_grace_ms)
    }

    /// How long a job may stay silent before it counts as hung
    pub fn hang_after(&self) -> Option<Duration> {
        (self.retry > 0).then(|| Duration::from_secs(self.retry_sec * u64::from(self.retry)))
    }

    /// Program and leading arguments of the spark-submit command
    pub fn spark_submit_argv(&self) -> Vec<String> {
        self.spark_submit
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }
}

/// Errors that can occur when loading launcher configuration
#[derive(Debug, thiserror::Error)]
pub enum LauncherConfigError {
    #[error("Failed to read launcher config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse launcher config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid launcher config: {0}")]
    Validation(String),
}
