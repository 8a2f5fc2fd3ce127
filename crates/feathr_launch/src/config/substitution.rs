//! `$(arg)`, `$(env)`, `$(workspace)`, `$(timestamp)` and `$(date)` expansion for job files

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Matches `$(kind value)` and `$(kind)`
static PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\((\w+)\s+([^)]+)\)|\$\((\w+)\)").unwrap());

const MAX_PASSES: usize = 10;

/// Values available to job file substitutions
#[derive(Debug, Clone, Default)]
pub struct SubstitutionContext {
    /// Resolved job file arguments
    pub args: HashMap<String, String>,
    /// Environment overrides, consulted before the process environment
    pub env: HashMap<String, String>,
    /// Launcher workspace, exposed as `$(workspace)`
    pub workspace: Option<PathBuf>,
}

impl SubstitutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    pub fn with_args(mut self, args: HashMap<String, String>) -> Self {
        self.args.extend(args);
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    /// Expand every pattern in `input`, re-expanding values that themselves contain patterns
    pub fn substitute(&self, input: &str) -> Result<String, SubstitutionError> {
        let mut current = input.to_string();

        for _ in 0..MAX_PASSES {
            if !PATTERN.is_match(&current) {
                return Ok(current);
            }
            current = self.expand_once(&current)?;
        }

        if PATTERN.is_match(&current) {
            return Err(SubstitutionError::TooDeep(input.to_string()));
        }
        Ok(current)
    }

    fn expand_once(&self, input: &str) -> Result<String, SubstitutionError> {
        let mut failure: Option<SubstitutionError> = None;

        let expanded = PATTERN.replace_all(input, |caps: &Captures| {
            if failure.is_some() {
                return String::new();
            }
            let (kind, value) = match (caps.get(1), caps.get(2), caps.get(3)) {
                (Some(kind), Some(value), _) => (kind.as_str(), value.as_str().trim()),
                (_, _, Some(kind)) => (kind.as_str(), ""),
                _ => unreachable!("pattern always captures a kind"),
            };
            self.resolve(kind, value).unwrap_or_else(|e| {
                failure = Some(e);
                String::new()
            })
        });

        match failure {
            Some(e) => Err(e),
            None => Ok(expanded.into_owned()),
        }
    }

    fn resolve(&self, kind: &str, value: &str) -> Result<String, SubstitutionError> {
        match kind {
            "arg" => self
                .args
                .get(value)
                .cloned()
                .ok_or_else(|| SubstitutionError::UndefinedArg(value.to_string())),
            "env" => match self.env.get(value) {
                Some(v) => Ok(v.clone()),
                None => std::env::var(value)
                    .map_err(|_| SubstitutionError::UndefinedEnv(value.to_string())),
            },
            "workspace" => self
                .workspace
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned())
                .ok_or(SubstitutionError::NoWorkspace),
            "timestamp" => now(value, "%Y%m%d_%H%M%S"),
            "date" => now(value, "%Y-%m-%d"),
            other => Err(SubstitutionError::UnknownType(other.to_string())),
        }
    }
}

fn now(format: &str, default: &str) -> Result<String, SubstitutionError> {
    use std::fmt::Write;

    let format = if format.is_empty() { default } else { format };
    let mut out = String::new();
    write!(out, "{}", chrono::Local::now().format(format))
        .map_err(|_| SubstitutionError::InvalidFormat(format.to_string()))?;
    Ok(out)
}

/// Errors that can occur during substitution
#[derive(Debug, thiserror::Error)]
pub enum SubstitutionError {
    #[error("Unknown substitution type: {0}")]
    UnknownType(String),

    #[error("Undefined argument: {0}")]
    UndefinedArg(String),

    #[error("Undefined environment variable: {0}")]
    UndefinedEnv(String),

    #[error("$(workspace) used without a launcher workspace")]
    NoWorkspace,

    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Substitution did not settle after {MAX_PASSES} passes: {0}")]
    TooDeep(String),
}
