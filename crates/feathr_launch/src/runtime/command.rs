//! spark-submit command line construction

use crate::config::{JobInvocation, LauncherConfig};

/// Spark configuration key holding extra Maven packages
pub const PACKAGES_CONF: &str = "spark.jars.packages";

/// `--conf` options every local submission carries so `wasbs://` paths resolve
pub const FILESYSTEM_CONFS: &[&str] = &[
    "spark.hadoop.fs.wasbs.impl=org.apache.hadoop.fs.azure.NativeAzureFileSystem",
    "spark.hadoop.fs.wasbs=org.apache.hadoop.fs.azure.NativeAzureFileSystem",
];

/// What kind of application the command launches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitKind {
    /// User supplied main jar
    Jar,
    /// Feathr runtime from Maven, started through the no-op jar
    MavenJar,
    /// PySpark entry point with the Feathr runtime from Maven
    PySpark,
}

/// A fully assembled spark-submit command
#[derive(Debug, Clone)]
pub struct SparkSubmitCommand {
    pub job_name: String,
    pub kind: SubmitKind,
    /// Program followed by all arguments
    pub argv: Vec<String>,
}

impl SparkSubmitCommand {
    /// Build the command for `job` under `config`
    pub fn build(config: &LauncherConfig, job: &JobInvocation) -> Result<Self, serde_json::Error> {
        let mut argv = config.spark_submit_argv();
        argv.extend([
            "--master".to_string(),
            config.master().to_string(),
            "--name".to_string(),
            job.name.clone(),
        ]);
        for conf in FILESYSTEM_CONFS {
            argv.push("--conf".to_string());
            argv.push(conf.to_string());
        }
        for (key, value) in &job.configuration {
            if key != PACKAGES_CONF {
                argv.push("--conf".to_string());
                argv.push(format!("{key}={value}"));
            }
        }

        let kind = match &job.main_artifact {
            Some(artifact) => {
                push_class(&mut argv, job.main_class.as_deref());
                argv.push(artifact.clone());
                SubmitKind::Jar
            }
            None => {
                argv.push("--packages".to_string());
                argv.push(package_list(config, job));

                match job.python_files.split_first() {
                    None => {
                        push_class(&mut argv, job.main_class.as_deref());
                        argv.push(config.noop_jar_path().to_string_lossy().into_owned());
                        SubmitKind::MavenJar
                    }
                    Some((entry, rest)) => {
                        if !rest.is_empty() {
                            argv.push("--py-files".to_string());
                            argv.push(rest.join(","));
                        }
                        argv.push(entry.clone());
                        SubmitKind::PySpark
                    }
                }
            }
        };

        argv.extend(job.arguments.iter().cloned());

        if !job.properties.is_empty() {
            argv.push("--system-properties".to_string());
            argv.push(serde_json::to_string(&job.properties)?);
        }

        Ok(Self {
            job_name: job.name.clone(),
            kind,
            argv,
        })
    }

    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }

    /// Single line suitable for pasting into a shell
    pub fn to_shell_line(&self) -> String {
        self.argv
            .iter()
            .map(|a| shell_quote(a))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn push_class(argv: &mut Vec<String>, class: Option<&str>) {
    if let Some(class) = class {
        argv.push("--class".to_string());
        argv.push(class.to_string());
    }
}

/// Job-provided packages (or the configured defaults) followed by the Feathr runtime
fn package_list(config: &LauncherConfig, job: &JobInvocation) -> String {
    let base = match job.configuration.get(PACKAGES_CONF) {
        Some(packages) => packages.clone(),
        None => config.packages.join(","),
    };
    if base.is_empty() {
        config.maven_artifact.clone()
    } else {
        format!("{base},{}", config.maven_artifact)
    }
}

/// POSIX single-quote `arg` unless it is made only of safe characters
pub fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,@%+".contains(c));
    if safe {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

impl std::fmt::Display for SparkSubmitCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Spark Submit Plan")?;
        writeln!(f, "=================")?;
        writeln!(f)?;
        writeln!(f, "Job:  {}", self.job_name)?;
        writeln!(f, "Kind: {:?}", self.kind)?;
        writeln!(f)?;
        writeln!(f, "Command:")?;
        writeln!(f, "  {}", self.program())?;

        // One option per line, values kept beside their flag
        let mut args = self.args().iter().peekable();
        while let Some(arg) = args.next() {
            match args.peek() {
                Some(next) if arg.starts_with("--") && !next.starts_with("--") => {
                    writeln!(f, "    {} {}", arg, shell_quote(next))?;
                    args.next();
                }
                _ => writeln!(f, "    {}", shell_quote(arg))?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LauncherConfig {
        let mut config = LauncherConfig::new("/ws");
        config.packages = vec!["a:b:1".to_string(), "c:d:2".to_string()];
        config
    }

    fn position(argv: &[String], flag: &str) -> usize {
        argv.iter()
            .position(|a| a == flag)
            .unwrap_or_else(|| panic!("{flag} missing from {argv:?}"))
    }

    #[test]
    fn test_base_command() {
        let cmd = SparkSubmitCommand::build(
            &config(),
            &JobInvocation::new("join").with_main_artifact("/ws/app.jar"),
        )
        .unwrap();

        assert_eq!(
            &cmd.argv[..5],
            &["spark-submit", "--master", "local[*]", "--name", "join"]
        );
        assert_eq!(cmd.argv[5], "--conf");
        assert_eq!(cmd.argv[6], FILESYSTEM_CONFS[0]);
        assert_eq!(cmd.argv[8], FILESYSTEM_CONFS[1]);
    }

    #[test]
    fn test_jar_job_has_class_then_artifact() {
        let job = JobInvocation::new("join")
            .with_main_artifact("/ws/app.jar")
            .with_main_class("com.example.Main")
            .with_arguments(["--x", "1"]);
        let cmd = SparkSubmitCommand::build(&config(), &job).unwrap();

        assert_eq!(cmd.kind, SubmitKind::Jar);
        let class = position(&cmd.argv, "--class");
        assert_eq!(cmd.argv[class + 1], "com.example.Main");
        assert_eq!(cmd.argv[class + 2], "/ws/app.jar");
        assert_eq!(&cmd.argv[class + 3..], &["--x", "1"]);
        assert!(!cmd.argv.contains(&"--packages".to_string()));
    }

    #[test]
    fn test_maven_job_uses_noop_jar_and_default_packages() {
        let job = JobInvocation::new("join").with_main_class("com.example.Main");
        let cmd = SparkSubmitCommand::build(&config(), &job).unwrap();

        assert_eq!(cmd.kind, SubmitKind::MavenJar);
        let packages = position(&cmd.argv, "--packages");
        assert_eq!(
            cmd.argv[packages + 1],
            format!("a:b:1,c:d:2,{}", crate::config::FEATHR_MAVEN_ARTIFACT)
        );
        assert_eq!(cmd.argv.last().unwrap(), "/ws/noop-1.0.jar");
    }

    #[test]
    fn test_configured_packages_replace_defaults() {
        let job = JobInvocation::new("join").with_conf(PACKAGES_CONF, "x:y:3");
        let cmd = SparkSubmitCommand::build(&config(), &job).unwrap();

        let packages = position(&cmd.argv, "--packages");
        assert!(cmd.argv[packages + 1].starts_with("x:y:3,"));
        assert!(!cmd.argv[packages + 1].contains("a:b:1"));
        // consumed by --packages, not repeated as --conf
        assert!(!cmd.argv.iter().any(|a| a.starts_with(PACKAGES_CONF)));
    }

    #[test]
    fn test_pyspark_entry_point_and_py_files() {
        let job = JobInvocation::new("py").with_python_files(["main.py", "udf.py", "util.py"]);
        let cmd = SparkSubmitCommand::build(&config(), &job).unwrap();

        assert_eq!(cmd.kind, SubmitKind::PySpark);
        let py_files = position(&cmd.argv, "--py-files");
        assert_eq!(cmd.argv[py_files + 1], "udf.py,util.py");
        assert_eq!(cmd.argv[py_files + 2], "main.py");
        assert!(!cmd.argv.contains(&"--class".to_string()));
    }

    #[test]
    fn test_single_python_file_has_no_py_files() {
        let job = JobInvocation::new("py").with_python_files(["main.py"]);
        let cmd = SparkSubmitCommand::build(&config(), &job).unwrap();
        assert!(!cmd.argv.contains(&"--py-files".to_string()));
        assert_eq!(cmd.argv.last().unwrap(), "main.py");
    }

    #[test]
    fn test_properties_follow_arguments_as_json() {
        let job = JobInvocation::new("join")
            .with_main_artifact("app.jar")
            .with_arguments(["--flag"])
            .with_property("b", "2")
            .with_property("a", "1");
        let cmd = SparkSubmitCommand::build(&config(), &job).unwrap();

        let n = cmd.argv.len();
        assert_eq!(cmd.argv[n - 3], "--flag");
        assert_eq!(cmd.argv[n - 2], "--system-properties");
        assert_eq!(cmd.argv[n - 1], r#"{"b":"2","a":"1"}"#);
    }

    #[test]
    fn test_extra_configuration_becomes_conf() {
        let job = JobInvocation::new("join")
            .with_main_artifact("app.jar")
            .with_conf("spark.executor.memory", "2g");
        let cmd = SparkSubmitCommand::build(&config(), &job).unwrap();
        assert!(cmd.argv.contains(&"spark.executor.memory=2g".to_string()));
    }

    #[test]
    fn test_custom_master_and_submit_prefix() {
        let mut config = config();
        config.master = Some("spark://head:7077".to_string());
        config.spark_submit = "/bin/sh /tmp/fake-submit.sh".to_string();
        let cmd = SparkSubmitCommand::build(&config, &JobInvocation::new("j")).unwrap();

        assert_eq!(cmd.program(), "/bin/sh");
        assert_eq!(cmd.args()[0], "/tmp/fake-submit.sh");
        assert_eq!(cmd.args()[2], "spark://head:7077");
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("--master"), "--master");
        assert_eq!(shell_quote("local[*]"), "'local[*]'");
        assert_eq!(shell_quote(r#"{"a":"1"}"#), r#"'{"a":"1"}'"#);
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }
}
