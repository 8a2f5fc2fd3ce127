//! End-to-end launcher tests against a fake spark-submit script

#![cfg(unix)]

use feathr_launch::{JobInvocation, JobOutcome, JobState, LauncherConfig, LocalSparkLauncher};
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Launcher whose spark-submit is `/bin/sh <script>` with `body` as the script
fn launcher(dir: &TempDir, body: &str) -> LocalSparkLauncher {
    let _ = env_logger::builder().is_test(true).try_init();

    let script = dir.path().join("fake-spark-submit.sh");
    std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();

    let mut config = LauncherConfig::new(dir.path());
    config.spark_submit = format!("/bin/sh {}", script.display());
    config.poll_interval_ms = 100;
    config.retry = 20;
    config.retry_sec = 1;
    config.termination_grace_ms = 2000;
    LocalSparkLauncher::new(config).unwrap()
}

fn jar_job(name: &str) -> JobInvocation {
    JobInvocation::new(name)
        .with_main_artifact("feathr-runtime.jar")
        .with_main_class("com.linkedin.feathr.offline.job.FeatureJoinJob")
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

fn is_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[tokio::test]
async fn exit_zero_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let mut launcher = launcher(&dir, "echo \"submitted $*\"\nexit 0");

    let id = launcher.submit(&jar_job("join")).await.unwrap();
    let outcome = launcher
        .wait_for_completion(id, Some(Duration::from_secs(20)))
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::Succeeded);
    assert!(outcome.is_success());
    assert_eq!(launcher.get_status(id).unwrap(), Some(0));
    assert_eq!(launcher.state(id).unwrap(), JobState::Completed(Some(0)));

    let job = launcher.job(id).unwrap();
    assert!(read(&job.log_file).contains("submitted --master local[*] --name join"));
    assert_eq!(job.log_file.file_name().unwrap(), "log_0.txt");
    assert_eq!(job.command_file.file_name().unwrap(), "command.sh");
    let debug_dir = job.log_file.parent().unwrap();
    assert_eq!(debug_dir.parent().unwrap(), dir.path().join("debug"));
    assert!(debug_dir
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("join"));
}

#[tokio::test]
async fn exit_one_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut launcher = launcher(&dir, "echo 'Exception in thread main' >&2\nexit 1");

    let id = launcher.submit(&jar_job("join")).await.unwrap();
    let outcome = launcher
        .wait_for_completion(id, Some(Duration::from_secs(20)))
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::Failed { code: Some(1) });
    assert!(!outcome.is_success());
    assert_eq!(launcher.get_status(id).unwrap(), Some(1));
    // stderr shares the log file with stdout
    assert!(read(&launcher.job(id).unwrap().log_file).contains("Exception in thread main"));
}

#[tokio::test]
async fn other_nonzero_exit_codes_fail() {
    let dir = tempfile::tempdir().unwrap();
    let mut launcher = launcher(&dir, "exit 3");

    let id = launcher.submit(&jar_job("join")).await.unwrap();
    let outcome = launcher
        .wait_for_completion(id, Some(Duration::from_secs(20)))
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::Failed { code: Some(3) });
}

#[tokio::test]
async fn timeout_terminates_the_job() {
    let dir = tempfile::tempdir().unwrap();
    let mut launcher = launcher(&dir, "echo started\nexec sleep 60");

    let id = launcher.submit(&jar_job("slow")).await.unwrap();
    let pid = launcher.job(id).unwrap().pid.unwrap();

    let started = Instant::now();
    let outcome = launcher
        .wait_for_completion(id, Some(Duration::from_secs(1)))
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::TimedOut);
    assert!(!outcome.is_success());
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(launcher.state(id).unwrap(), JobState::TimedOut);
    assert!(!is_alive(pid));
}

#[tokio::test]
async fn timeout_without_clean_up_leaves_job_running() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = launcher(&dir, "exec sleep 60").config().clone();
    config.clean_up = false;
    let mut launcher = LocalSparkLauncher::new(config).unwrap();

    let id = launcher.submit(&jar_job("slow")).await.unwrap();
    let pid = launcher.job(id).unwrap().pid.unwrap();
    let outcome = launcher
        .wait_for_completion(id, Some(Duration::from_millis(500)))
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::TimedOut);
    assert!(is_alive(pid));
    assert_eq!(launcher.get_status(id).unwrap(), None);

    launcher.terminate(id).await.unwrap();
    assert!(!is_alive(pid));
}

#[tokio::test]
async fn completion_marker_stops_the_job() {
    let dir = tempfile::tempdir().unwrap();
    let mut launcher = launcher(
        &dir,
        "echo 'stage 1'\necho 'Feathr Pyspark job completed'\nexec sleep 60",
    );

    let job = JobInvocation::new("py").with_python_files(["feathr_pyspark_driver.py"]);
    let id = launcher.submit(&job).await.unwrap();
    let pid = launcher.job(id).unwrap().pid.unwrap();

    let started = Instant::now();
    let outcome = launcher
        .wait_for_completion(id, Some(Duration::from_secs(30)))
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::CompletedBySentinel);
    assert!(outcome.is_success());
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!is_alive(pid));
}

#[tokio::test]
async fn exit_code_overrides_completion_marker() {
    let dir = tempfile::tempdir().unwrap();
    let mut launcher = launcher(&dir, "echo 'Feathr Pyspark job completed'\nexit 1");

    let id = launcher.submit(&jar_job("join")).await.unwrap();
    // let the script finish before the first look at the log
    tokio::time::sleep(Duration::from_millis(500)).await;

    let outcome = launcher
        .wait_for_completion(id, Some(Duration::from_secs(20)))
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::Failed { code: Some(1) });
    assert!(!outcome.is_success());
    assert_eq!(launcher.get_status(id).unwrap(), Some(1));
}

#[tokio::test]
async fn completion_marker_without_newline_is_seen() {
    let dir = tempfile::tempdir().unwrap();
    let mut launcher = launcher(&dir, "printf 'Feathr Pyspark job completed'\nexec sleep 60");

    let id = launcher.submit(&jar_job("join")).await.unwrap();
    let pid = launcher.job(id).unwrap().pid.unwrap();

    let outcome = launcher
        .wait_for_completion(id, Some(Duration::from_secs(30)))
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::CompletedBySentinel);
    assert!(!is_alive(pid));
}

#[tokio::test]
async fn silent_job_is_declared_hung() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = launcher(&dir, "echo 'one line then nothing'\nexec sleep 60")
        .config()
        .clone();
    config.retry = 1;
    config.retry_sec = 1;
    let mut launcher = LocalSparkLauncher::new(config).unwrap();

    let id = launcher.submit(&jar_job("quiet")).await.unwrap();
    let pid = launcher.job(id).unwrap().pid.unwrap();
    let outcome = launcher
        .wait_for_completion(id, Some(Duration::from_secs(30)))
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::Hung);
    assert_eq!(launcher.state(id).unwrap(), JobState::Hung);
    assert!(!is_alive(pid));
}

#[tokio::test]
async fn jobs_are_tracked_independently() {
    let dir = tempfile::tempdir().unwrap();
    let mut launcher = launcher(
        &dir,
        "case \"$*\" in *--name\\ bad*) exit 1 ;; esac\nexit 0",
    );

    let good = launcher.submit(&jar_job("good")).await.unwrap();
    let bad = launcher.submit(&jar_job("bad")).await.unwrap();
    assert_eq!(launcher.latest(), Some(bad));
    assert_eq!(launcher.job_count(), 2);

    let timeout = Some(Duration::from_secs(20));
    assert_eq!(
        launcher.wait_for_latest(timeout).await.unwrap(),
        JobOutcome::Failed { code: Some(1) }
    );
    assert_eq!(
        launcher.wait_for_completion(good, timeout).await.unwrap(),
        JobOutcome::Succeeded
    );
    // a finished job keeps its verdict
    assert_eq!(
        launcher.wait_for_completion(bad, timeout).await.unwrap(),
        JobOutcome::Failed { code: Some(1) }
    );
    assert_eq!(launcher.job(bad).unwrap().log_file.file_name().unwrap(), "log_1.txt");
}

#[tokio::test]
async fn resubmits_append_to_command_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut launcher = launcher(&dir, "exit 0");

    let job = jar_job("same").with_property("feathr.local", "true");
    let first = launcher.submit(&job).await.unwrap();
    let second = launcher.submit(&job).await.unwrap();

    for id in [first, second] {
        launcher
            .wait_for_completion(id, Some(Duration::from_secs(20)))
            .await
            .unwrap();
        let commands = read(&launcher.job(id).unwrap().command_file);
        assert!(commands.contains(r#"--system-properties '{"feathr.local":"true"}'"#));
    }

    let first_file = &launcher.job(first).unwrap().command_file;
    let second_file = &launcher.job(second).unwrap().command_file;
    if first_file == second_file {
        // both submissions landed in the same second
        assert_eq!(read(first_file).lines().count(), 2);
    }
}

#[tokio::test]
async fn missing_spark_submit_is_a_spawn_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = LauncherConfig::new(dir.path());
    config.spark_submit = dir
        .path()
        .join("does-not-exist")
        .to_string_lossy()
        .into_owned();
    let mut launcher = LocalSparkLauncher::new(config).unwrap();

    let result = launcher.submit(&jar_job("join")).await;
    assert!(matches!(
        result,
        Err(feathr_launch::LaunchError::Process(
            feathr_launch::ProcessError::SpawnFailed { .. }
        ))
    ));
    assert_eq!(launcher.job_count(), 0);
    assert_eq!(launcher.latest(), None);
}
