//! Feathr local launcher CLI
//!
//! Usage:
//!   feathr_launch jobs/feature_join.yaml
//!   feathr_launch jobs/feature_join.yaml -c launcher.yaml -a join_config:=conf/join.conf
//!   feathr_launch jobs/feature_join.yaml --dry-run

use feathr_launch::{
    JobFile, JobOutcome, LaunchArgs, LauncherConfig, LocalSparkLauncher, SubstitutionContext,
};
use std::process::exit;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    let args: LaunchArgs = argh::from_env();

    let env = env_logger::Env::default().default_filter_or(args.log_filter());
    env_logger::init_from_env(env);

    log::info!("Loading job file: {}", args.job_file);
    let job_file = match JobFile::from_file(&args.job_file) {
        Ok(jf) => jf,
        Err(e) => {
            log::error!("Failed to load job file: {}", e);
            exit(1);
        }
    };

    if args.validate {
        println!("Job file '{}' is valid", args.job_file);
        println!("  Name: {}", job_file.job.name);
        println!("  Args: {}", job_file.args.len());
        println!("  Arguments: {}", job_file.job.arguments.len());
        println!("  Python files: {}", job_file.job.python_files.len());
        return;
    }

    let config = match &args.config {
        Some(path) => LauncherConfig::from_file(path),
        None => Ok(LauncherConfig::default()),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            log::error!("Failed to load launcher config: {}", e);
            exit(1);
        }
    };

    let base = SubstitutionContext::new().with_workspace(config.workspace.clone());
    let job = match job_file.resolve(&args.arg_overrides(), base) {
        Ok(job) => job,
        Err(e) => {
            log::error!("Failed to resolve job file: {}", e);
            exit(1);
        }
    };

    let mut launcher = match LocalSparkLauncher::new(config) {
        Ok(l) => l,
        Err(e) => {
            log::error!("Failed to create launcher: {}", e);
            exit(1);
        }
    };

    if args.dry_run {
        match launcher.plan(&job) {
            Ok(plan) => println!("{}", plan),
            Err(e) => {
                log::error!("Failed to build spark-submit command: {}", e);
                exit(1);
            }
        }
        return;
    }

    let (shutdown_tx, mut shutdown_rx) = watch::channel(());
    if let Err(e) = ctrlc::set_handler(move || {
        log::info!("Received Ctrl+C, stopping job...");
        let _ = shutdown_tx.send(());
    }) {
        log::error!("Error setting Ctrl+C handler: {}", e);
        exit(1);
    }

    let id = match launcher.submit(&job).await {
        Ok(id) => id,
        Err(e) => {
            log::error!("Submit failed: {}", e);
            exit(1);
        }
    };

    let waited = tokio::select! {
        result = launcher.wait_for_completion(id, args.wait_timeout()) => Some(result),
        _ = shutdown_rx.changed() => None,
    };

    let code = match waited {
        None => {
            if let Err(e) = launcher.terminate(id).await {
                log::error!("Failed to stop job: {}", e);
            }
            130
        }
        Some(Err(e)) => {
            log::error!("Waiting for job failed: {}", e);
            if let Err(e) = launcher.terminate(id).await {
                log::error!("Failed to stop job: {}", e);
            }
            1
        }
        Some(Ok(outcome)) => match outcome {
            JobOutcome::Succeeded | JobOutcome::CompletedBySentinel => 0,
            JobOutcome::Failed { .. } => 1,
            JobOutcome::TimedOut | JobOutcome::Hung => 2,
        },
    };

    log::info!("Feathr launcher exiting");
    exit(code);
}
