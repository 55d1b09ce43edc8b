//! Configuration management against the fake device.

mod common;

use assert_matches::assert_matches;

use asa_core::diff::{DiffStatus, SectionChange};
use asa_core::error::CoreError;
use asa_core::types::{CandidateKind, ConfigRetrieval};
use asa_driver::asa::CANDIDATE_LOADED;
use asa_driver::{CandidateSource, DriverError, NetworkDriver};

use common::{driver_on, fake_driver, mock_data_dir, FakeDevice};

fn fixture(name: &str) -> String {
    std::fs::read_to_string(mock_data_dir().join(name)).unwrap()
}

#[tokio::test]
async fn get_config_all_returns_running_and_startup() {
    let (mut driver, log) = fake_driver();
    let config = driver.get_config(ConfigRetrieval::All).await.unwrap();

    assert_eq!(config.running, fixture("show_running-config.txt"));
    assert_eq!(config.startup, fixture("show_startup-config.txt"));
    assert_eq!(config.candidate, "");
    assert_eq!(log.commands(), vec!["show startup-config", "show running-config"]);
}

#[tokio::test]
async fn get_config_only_fetches_requested_config() {
    let (mut driver, log) = fake_driver();

    let running = driver.get_config(ConfigRetrieval::Running).await.unwrap();
    assert!(running.running.contains("hostname fw01"));
    assert_eq!(running.startup, "");

    let candidate = driver.get_config(ConfigRetrieval::Candidate).await.unwrap();
    assert_eq!(candidate, Default::default());

    assert_eq!(log.commands(), vec!["show running-config"]);
}

#[tokio::test]
async fn replace_candidate_from_file_is_diffed_against_running() {
    let (mut driver, _) = fake_driver();
    let path = mock_data_dir().join("candidate_replace.cfg");

    let outcome = driver
        .load_replace_candidate(CandidateSource::File(&path))
        .await
        .unwrap();
    assert!(outcome.loaded);
    assert_eq!(outcome.message, CANDIDATE_LOADED);
    assert_eq!(driver.candidate().map(|c| c.kind), Some(CandidateKind::Replace));

    let diff = driver.compare_config().await.unwrap();
    assert!(diff.starts_with("--- running\n+++ candidate\n@@"), "{diff}");
    assert!(diff.contains("\n+logging timestamp"));
    assert!(diff.contains("\n-interface GigabitEthernet0/1"));
    assert!(diff.contains("\n-ASA Version 9.8(2)"));
    assert!(!diff.contains("\n-hostname fw01"));
}

#[tokio::test]
async fn replace_candidate_from_text() {
    let (mut driver, _) = fake_driver();
    driver
        .load_replace_candidate(CandidateSource::Text("hostname fw02\n"))
        .await
        .unwrap();

    let diff = driver.compare_config().await.unwrap();
    assert!(diff.contains("\n-hostname fw01"));
    assert!(diff.contains("\n+hostname fw02"));
}

#[tokio::test]
async fn identical_candidate_has_empty_diff() {
    let (mut driver, _) = fake_driver();
    let running = fixture("show_running-config.txt");
    driver
        .load_replace_candidate(CandidateSource::Text(&running))
        .await
        .unwrap();

    assert_eq!(driver.compare_config().await.unwrap(), "");
}

#[tokio::test]
async fn missing_candidate_file_is_reported() {
    let (mut driver, _) = fake_driver();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.cfg");

    assert_matches!(
        driver.load_replace_candidate(CandidateSource::File(&path)).await,
        Err(DriverError::CandidateFile { path: p, .. }) if p == path
    );
    assert!(driver.candidate().is_none());
}

#[tokio::test]
async fn candidate_file_written_at_runtime_is_loaded() {
    let (mut driver, _) = fake_driver();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("merge.cfg");
    std::fs::write(&path, "ntp server 192.0.2.123\n").unwrap();

    driver
        .load_merge_candidate(CandidateSource::File(&path))
        .await
        .unwrap();
    assert_eq!(driver.compare_config().await.unwrap(), "+ntp server 192.0.2.123");
}

#[tokio::test]
async fn compare_without_candidate_is_empty_and_sends_nothing() {
    let (mut driver, log) = fake_driver();
    assert_eq!(driver.compare_config().await.unwrap(), "");
    assert!(log.commands().is_empty());
}

#[tokio::test]
async fn discard_drops_candidate() {
    let (mut driver, _) = fake_driver();
    driver
        .load_replace_candidate(CandidateSource::Text("hostname fw02"))
        .await
        .unwrap();
    driver.discard_config();

    assert!(driver.candidate().is_none());
    assert_eq!(driver.compare_config().await.unwrap(), "");
}

#[tokio::test]
async fn merge_diff_lists_only_new_lines() {
    let (mut driver, _) = fake_driver();
    let path = mock_data_dir().join("candidate_merge.cfg");
    driver
        .load_merge_candidate(CandidateSource::File(&path))
        .await
        .unwrap();

    assert_eq!(
        driver.compare_config().await.unwrap(),
        "+logging timestamp\n+logging buffered informational"
    );
}

#[tokio::test]
async fn section_summary_classifies_blocks() {
    let (mut driver, _) = fake_driver();
    let path = mock_data_dir().join("candidate_replace.cfg");
    driver
        .load_replace_candidate(CandidateSource::File(&path))
        .await
        .unwrap();

    let sections = driver.compare_sections().await.unwrap();
    let status_of = |header: &str| {
        sections
            .iter()
            .find(|s| s.header == header)
            .map(|s| s.status)
    };

    assert_eq!(status_of("logging timestamp"), Some(DiffStatus::Added));
    assert_eq!(status_of("interface GigabitEthernet0/1"), Some(DiffStatus::Removed));
    assert_eq!(status_of("interface GigabitEthernet0/0"), Some(DiffStatus::Unchanged));
    assert!(sections.contains(&SectionChange {
        header: "hostname fw01".into(),
        status: DiffStatus::Unchanged,
    }));
}

#[tokio::test]
async fn commit_without_candidate_is_rejected() {
    let (mut driver, log) = fake_driver();
    assert_matches!(
        driver.commit_config().await,
        Err(DriverError::Core(CoreError::Validation(_)))
    );
    assert!(log.commands().is_empty());
}

#[tokio::test]
async fn commit_replace_is_not_implemented() {
    let (mut driver, log) = fake_driver();
    driver
        .load_replace_candidate(CandidateSource::Text("hostname fw02"))
        .await
        .unwrap();

    assert_matches!(
        driver.commit_config().await,
        Err(DriverError::Core(CoreError::NotImplemented(_)))
    );
    assert!(driver.candidate().is_some());
    assert!(log.commands().is_empty());
}

#[tokio::test]
async fn commit_merge_applies_lines_and_saves() {
    let device = FakeDevice::new()
        .with_response("logging timestamp", "")
        .with_response("logging buffered informational", "");
    let (mut driver, log) = driver_on(device);
    let path = mock_data_dir().join("candidate_merge.cfg");
    driver
        .load_merge_candidate(CandidateSource::File(&path))
        .await
        .unwrap();

    driver.commit_config().await.unwrap();

    assert_eq!(
        log.commands(),
        vec![
            "configure terminal",
            "logging timestamp",
            "logging buffered informational",
            "end",
            "write memory"
        ]
    );
    assert!(driver.candidate().is_none());
}

#[tokio::test]
async fn commit_merge_stops_at_rejected_line() {
    let device = FakeDevice::new()
        .with_response("object network web", "")
        .with_response(" host 10.0.0.11", "");
    let (mut driver, log) = driver_on(device);
    driver
        .load_merge_candidate(CandidateSource::Text(
            "object network web\n host 10.0.0.11\nbogus command\nlogging enable\n",
        ))
        .await
        .unwrap();

    assert_matches!(
        driver.commit_config().await,
        Err(DriverError::CommitFailed { line, output })
            if line == "bogus command" && output.contains("% Invalid input")
    );
    assert_eq!(
        log.commands(),
        vec![
            "configure terminal",
            "object network web",
            " host 10.0.0.11",
            "bogus command",
            "end"
        ]
    );
    assert!(driver.candidate().is_some());
}

#[tokio::test]
async fn rollback_is_not_implemented() {
    let (mut driver, _) = fake_driver();
    assert_matches!(
        driver.rollback().await,
        Err(DriverError::Core(CoreError::NotImplemented("rollback")))
    );
}
