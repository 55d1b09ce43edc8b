//! Subcommand execution against an open driver.

use anyhow::Context;
use serde::Serialize;

use asa_driver::{AsaDriver, CandidateSource, NetworkDriver};

use crate::cli::Command;

#[derive(Debug, Serialize)]
struct AliveStatus {
    is_alive: bool,
}

/// Run `command` and return the text to print on stdout.
pub async fn execute(driver: &mut AsaDriver, command: &Command) -> anyhow::Result<String> {
    match command {
        Command::GetConfig { retrieve } => to_json(&driver.get_config(*retrieve).await?),
        Command::Compare {
            file,
            merge,
            summary,
        } => {
            let source = CandidateSource::File(file);
            if *merge {
                driver.load_merge_candidate(source).await?;
            } else {
                driver.load_replace_candidate(source).await?;
            }

            let output = if *summary {
                to_json(&driver.compare_sections().await?)?
            } else {
                driver.compare_config().await?
            };
            driver.discard_config();
            Ok(output)
        }
        Command::Commit { file } => {
            driver.load_merge_candidate(CandidateSource::File(file)).await?;
            let diff = driver.compare_config().await?;
            if diff.is_empty() {
                driver.discard_config();
                return Ok("No changes to commit".to_string());
            }
            driver
                .commit_config()
                .await
                .with_context(|| format!("Failed to commit {}", file.display()))?;
            Ok(diff)
        }
        Command::Facts => to_json(&driver.get_facts().await?),
        Command::Interfaces => to_json(&driver.get_interfaces().await?),
        Command::InterfacesIp => to_json(&driver.get_interfaces_ip().await?),
        Command::Alive => to_json(&AliveStatus {
            is_alive: driver.is_alive(),
        }),
    }
}

fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize output")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use asa_core::types::ConfigRetrieval;
    use asa_driver::asa::DEFAULT_TIMEOUT;
    use asa_driver::OptionalArgs;
    use asa_session::{CliDevice, SessionError};

    const RUNNING: &str = "\
hostname fw01
interface Management0/0
 nameif management
logging enable
";

    /// Answers known commands from a map; anything else is accepted silently.
    struct MapDevice {
        replies: HashMap<&'static str, &'static str>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl CliDevice for MapDevice {
        async fn send_command(&mut self, command: &str) -> Result<String, SessionError> {
            self.sent.lock().unwrap().push(command.to_string());
            Ok(self.replies.get(command).copied().unwrap_or_default().to_string())
        }

        async fn enable(&mut self, _secret: &str) -> Result<(), SessionError> {
            Ok(())
        }

        async fn autodetect_fs(&mut self) -> Result<String, SessionError> {
            Ok("disk0:".into())
        }

        fn is_alive(&self) -> bool {
            true
        }

        async fn disconnect(&mut self) -> Result<(), SessionError> {
            Ok(())
        }
    }

    fn driver_with_running(running: &'static str) -> (AsaDriver, Arc<Mutex<Vec<String>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let device = MapDevice {
            replies: HashMap::from([
                ("show running-config", running),
                ("show startup-config", running),
            ]),
            sent: Arc::clone(&sent),
        };
        let args = OptionalArgs::default();
        let driver = AsaDriver::new("fw01", "admin", "admin", DEFAULT_TIMEOUT, args)
            .with_device(Box::new(device));
        (driver, sent)
    }

    fn driver() -> AsaDriver {
        driver_with_running(RUNNING).0
    }

    fn candidate_file(text: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candidate.cfg");
        std::fs::write(&path, text).unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn get_config_prints_json() {
        let mut driver = driver();
        let output = execute(
            &mut driver,
            &Command::GetConfig {
                retrieve: ConfigRetrieval::Running,
            },
        )
        .await
        .unwrap();

        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["running"], RUNNING);
        assert_eq!(json["startup"], "");
    }

    #[tokio::test]
    async fn compare_prints_diff_and_discards() {
        let mut driver = driver();
        let (_dir, file) = candidate_file("hostname fw02\n");
        let output = execute(
            &mut driver,
            &Command::Compare {
                file,
                merge: false,
                summary: false,
            },
        )
        .await
        .unwrap();

        assert!(output.contains("+hostname fw02"));
        assert!(driver.candidate().is_none());
    }

    #[tokio::test]
    async fn compare_summary_prints_sections() {
        let mut driver = driver();
        let (_dir, file) = candidate_file("hostname fw01\nlogging timestamp\n");
        let output = execute(
            &mut driver,
            &Command::Compare {
                file,
                merge: false,
                summary: true,
            },
        )
        .await
        .unwrap();

        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        let entries = json.as_array().unwrap();
        assert!(entries
            .iter()
            .any(|e| e["header"] == "logging timestamp" && e["status"] == "added"));
        assert!(entries
            .iter()
            .any(|e| e["header"] == "interface Management0/0" && e["status"] == "removed"));
    }

    #[tokio::test]
    async fn commit_without_changes_is_skipped() {
        let mut driver = driver();
        let (_dir, file) = candidate_file("logging enable\n");
        let output = execute(&mut driver, &Command::Commit { file }).await.unwrap();
        assert_eq!(output, "No changes to commit");
    }

    #[tokio::test]
    async fn commit_prints_applied_lines() {
        let mut driver = driver();
        let (_dir, file) = candidate_file("logging timestamp\n");
        let output = execute(&mut driver, &Command::Commit { file }).await.unwrap();
        assert_eq!(output, "+logging timestamp");
        assert!(driver.candidate().is_none());
    }

    #[tokio::test]
    async fn commit_moves_child_lines_between_interfaces() {
        const TWO_INTERFACES: &str = "\
interface GigabitEthernet0/0
 nameif outside
 security-level 0
interface GigabitEthernet0/1
 no nameif
 no security-level
";
        let (mut driver, sent) = driver_with_running(TWO_INTERFACES);
        let (_dir, file) =
            candidate_file("interface GigabitEthernet0/1\n nameif outside\n security-level 0\n");

        let output = execute(&mut driver, &Command::Commit { file }).await.unwrap();

        assert_eq!(
            output,
            " interface GigabitEthernet0/1\n+ nameif outside\n+ security-level 0"
        );
        assert_eq!(
            *sent.lock().unwrap(),
            vec![
                "show running-config",
                "configure terminal",
                "interface GigabitEthernet0/1",
                " nameif outside",
                " security-level 0",
                "end",
                "write memory",
            ]
        );
    }

    #[tokio::test]
    async fn alive_reports_session_state() {
        let mut driver = driver();
        let output = execute(&mut driver, &Command::Alive).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["is_alive"], true);
    }
}
