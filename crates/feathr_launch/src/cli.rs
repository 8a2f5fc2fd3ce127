//! Command-line interface for feathr_launch

use argh::FromArgs;
use std::collections::HashMap;
use std::time::Duration;

/// Submit a Feathr job to a local Spark installation
#[derive(FromArgs, Debug)]
pub struct LaunchArgs {
    /// path to the job file
    #[argh(positional)]
    pub job_file: String,

    /// launcher configuration file (default: built-in defaults rooted at the current directory)
    #[argh(option, short = 'c')]
    pub config: Option<String>,

    /// override job file arguments (format: key:=value)
    #[argh(option, short = 'a', from_str_fn(parse_arg_override))]
    pub arg: Vec<(String, String)>,

    /// seconds to wait for the job before giving up (default: 500, 0 = no limit)
    #[argh(option, short = 't', default = "500")]
    pub timeout: u64,

    /// print the spark-submit command without running it
    #[argh(switch)]
    pub dry_run: bool,

    /// validate the job file and exit
    #[argh(switch)]
    pub validate: bool,

    /// log level (error, warn, info, debug, trace)
    #[argh(option, short = 'l', default = "String::from(\"info\")")]
    pub log_level: String,
}

/// Parse argument override in format "key:=value"
fn parse_arg_override(s: &str) -> Result<(String, String), String> {
    match s.split_once(":=") {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!(
            "Invalid argument format '{}'. Expected 'key:=value'",
            s
        )),
    }
}

impl LaunchArgs {
    pub fn arg_overrides(&self) -> HashMap<String, String> {
        self.arg.iter().cloned().collect()
    }

    /// None when the timeout is disabled
    pub fn wait_timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }

    /// Filter for env_logger, unknown levels fall back to info
    pub fn log_filter(&self) -> &'static str {
        match self.log_level.to_lowercase().as_str() {
            "error" => "error",
            "warn" => "warn",
            "debug" => "debug",
            "trace" => "trace",
            _ => "info",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arg_override() {
        assert_eq!(
            parse_arg_override("join_config:=conf/join.conf"),
            Ok(("join_config".to_string(), "conf/join.conf".to_string()))
        );
    }

    #[test]
    fn test_parse_arg_override_keeps_later_separators() {
        assert_eq!(
            parse_arg_override("master:=spark://head:7077"),
            Ok(("master".to_string(), "spark://head:7077".to_string()))
        );
    }

    #[test]
    fn test_parse_arg_override_invalid() {
        assert!(parse_arg_override("invalid").is_err());
        assert!(parse_arg_override(":=value").is_err());
    }

    #[test]
    fn test_from_args() {
        let args = LaunchArgs::from_args(
            &["feathr_launch"],
            &["job.yaml", "-a", "x:=1", "-t", "0", "--dry-run", "-l", "DEBUG"],
        )
        .unwrap();
        assert_eq!(args.job_file, "job.yaml");
        assert_eq!(args.arg_overrides()["x"], "1");
        assert_eq!(args.wait_timeout(), None);
        assert!(args.dry_run);
        assert_eq!(args.log_filter(), "debug");
    }

    #[test]
    fn test_default_timeout() {
        let args = LaunchArgs::from_args(&["feathr_launch"], &["job.yaml"]).unwrap();
        assert_eq!(args.wait_timeout(), Some(Duration::from_secs(500)));
        assert_eq!(args.log_filter(), "info");
    }
}
