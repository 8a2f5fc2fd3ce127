//! Job invocation and its YAML job file form

use crate::config::{SubstitutionContext, SubstitutionError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One spark-submit request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobInvocation {
    /// Spark application name; also prefixes the debug directory
    pub name: String,

    /// Main jar; when absent the Feathr runtime is pulled from Maven
    #[serde(default)]
    pub main_artifact: Option<String>,

    /// Main class for JAR jobs
    #[serde(default)]
    pub main_class: Option<String>,

    /// Arguments passed to the application
    #[serde(default)]
    pub arguments: Vec<String>,

    /// PySpark files; the first one is the entry point
    #[serde(default)]
    pub python_files: Vec<String>,

    /// Spark configuration
    #[serde(default)]
    pub configuration: IndexMap<String, String>,

    /// System properties, handed to the job as one JSON argument
    #[serde(default)]
    pub properties: IndexMap<String, String>,
}

impl JobInvocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_main_artifact(mut self, path: impl Into<String>) -> Self {
        self.main_artifact = Some(path.into());
        self
    }

    pub fn with_main_class(mut self, class: impl Into<String>) -> Self {
        self.main_class = Some(class.into());
        self
    }

    pub fn with_arguments<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_python_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.python_files.extend(files.into_iter().map(Into::into));
        self
    }

    pub fn with_conf(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.configuration.insert(key.into(), value.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Expand substitution patterns in every free-text field except the name
    pub fn substitute(&self, ctx: &SubstitutionContext) -> Result<Self, SubstitutionError> {
        let subst = |s: &String| ctx.substitute(s);
        let subst_map = |map: &IndexMap<String, String>| {
            map.iter()
                .map(|(k, v)| Ok((k.clone(), ctx.substitute(v)?)))
                .collect::<Result<IndexMap<_, _>, SubstitutionError>>()
        };

        Ok(Self {
            name: self.name.clone(),
            main_artifact: self.main_artifact.as_ref().map(subst).transpose()?,
            main_class: self.main_class.as_ref().map(subst).transpose()?,
            arguments: self.arguments.iter().map(subst).collect::<Result<_, _>>()?,
            python_files: self
                .python_files
                .iter()
                .map(subst)
                .collect::<Result<_, _>>()?,
            configuration: subst_map(&self.configuration)?,
            properties: subst_map(&self.properties)?,
        })
    }
}

/// Argument definition with a default value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgDefinition {
    pub default: ArgValue,
    #[serde(default)]
    pub description: Option<String>,
}

/// Argument defaults can be written as strings, booleans or numbers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl std::fmt::Display for ArgValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgValue::Bool(b) => write!(f, "{b}"),
            ArgValue::Int(i) => write!(f, "{i}"),
            ArgValue::Float(x) => write!(f, "{x}"),
            ArgValue::String(s) => f.write_str(s),
        }
    }
}

/// A job file: overridable arguments plus the invocation they feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobFile {
    #[serde(default)]
    pub args: IndexMap<String, ArgDefinition>,

    #[serde(flatten)]
    pub job: JobInvocation,
}

impl JobFile {
    pub fn from_file(path: &str) -> Result<Self, JobFileError> {
        let content = std::fs::read_to_string(path).map_err(|e| JobFileError::Io {
            path: path.to_string(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, JobFileError> {
        let job_file: JobFile = serde_yaml::from_str(content)?;
        job_file.validate()?;
        Ok(job_file)
    }

    pub fn validate(&self) -> Result<(), JobFileError> {
        if self.job.name.trim().is_empty() {
            return Err(JobFileError::Validation("job name is empty".to_string()));
        }
        if self.job.name.contains(['/', '\\']) {
            return Err(JobFileError::Validation(format!(
                "job name '{}' must not contain path separators",
                self.job.name
            )));
        }
        Ok(())
    }

    /// Argument values after applying `overrides` to the declared defaults
    pub fn resolve_args(
        &self,
        overrides: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, JobFileError> {
        let mut resolved: HashMap<String, String> = self
            .args
            .iter()
            .map(|(name, def)| (name.clone(), def.default.to_string()))
            .collect();

        for (name, value) in overrides {
            if !self.args.contains_key(name) {
                return Err(JobFileError::UnknownArgument(name.clone()));
            }
            resolved.insert(name.clone(), value.clone());
        }
        Ok(resolved)
    }

    /// The invocation with every pattern expanded
    pub fn resolve(
        &self,
        overrides: &HashMap<String, String>,
        base: SubstitutionContext,
    ) -> Result<JobInvocation, JobFileError> {
        let ctx = base.with_args(self.resolve_args(overrides)?);
        Ok(self.job.substitute(&ctx)?)
    }
}

/// Errors that can occur when loading a job file
#[derive(Debug, thiserror::Error)]
pub enum JobFileError {
    #[error("Failed to read job file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse job file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown argument: {0}")]
    UnknownArgument(String),

    #[error(transparent)]
    Substitution(#[from] SubstitutionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOB: &str = r#"
args:
  join_config:
    default: "feature_join.conf"
  partitions:
    default: 8
name: feathr_feature_join_job
main_class: com.linkedin.feathr.offline.job.FeatureJoinJob
arguments:
  - "--join-config"
  - "$(workspace)/$(arg join_config)"
configuration:
  spark.sql.shuffle.partitions: "$(arg partitions)"
properties:
  feathr.local: "true"
"#;

    #[test]
    fn test_parse_job_file() {
        let file = JobFile::from_yaml(JOB).unwrap();
        assert_eq!(file.job.name, "feathr_feature_join_job");
        assert_eq!(file.args.len(), 2);
        assert!(file.job.main_artifact.is_none());
        assert!(file.job.python_files.is_empty());
    }

    #[test]
    fn test_resolve_with_override() {
        let file = JobFile::from_yaml(JOB).unwrap();
        let overrides = HashMap::from([("partitions".to_string(), "2".to_string())]);
        let job = file
            .resolve(&overrides, SubstitutionContext::new().with_workspace("/ws"))
            .unwrap();

        assert_eq!(job.arguments[1], "/ws/feature_join.conf");
        assert_eq!(job.configuration["spark.sql.shuffle.partitions"], "2");
        assert_eq!(job.properties["feathr.local"], "true");
    }

    #[test]
    fn test_unknown_override_rejected() {
        let file = JobFile::from_yaml(JOB).unwrap();
        let overrides = HashMap::from([("nope".to_string(), "1".to_string())]);
        assert!(matches!(
            file.resolve_args(&overrides),
            Err(JobFileError::UnknownArgument(_))
        ));
    }

    #[test]
    fn test_bad_time_format_fails_resolve() {
        let yaml = "name: join\narguments:\n  - \"out_$(timestamp %Q)\"\n";
        let file = JobFile::from_yaml(yaml).unwrap();
        assert!(matches!(
            file.resolve(&HashMap::new(), SubstitutionContext::new()),
            Err(JobFileError::Substitution(SubstitutionError::InvalidFormat(_)))
        ));
    }

    #[test]
    fn test_name_with_separator_rejected() {
        let result = JobFile::from_yaml("name: ../escape\n");
        assert!(matches!(result, Err(JobFileError::Validation(_))));
    }

    #[test]
    fn test_missing_name_fails() {
        assert!(JobFile::from_yaml("main_class: Foo\n").is_err());
    }
}
