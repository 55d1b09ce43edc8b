//! Cisco ASA implementation of [`NetworkDriver`].

use std::time::Duration;

use async_trait::async_trait;

use asa_core::diff::{self, SectionChange};
use asa_core::error::CoreError;
use asa_core::parse::{self, SHOW_DOMAIN_NAME, SHOW_INTERFACE, SHOW_VERSION};
use asa_core::types::{
    Candidate, CandidateKind, ConfigRetrieval, ConfigSet, Facts, Interfaces, InterfacesIp,
};
use asa_session::retry::RetryConfig;
use asa_session::{CliDevice, CliSession, ConnectParams};

use crate::args::OptionalArgs;
use crate::driver::{CandidateSource, LoadOutcome, NetworkDriver};
use crate::error::DriverError;

/// Default timeout for connecting and for each command.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub const VENDOR: &str = "Cisco";

/// Reported on load: the ASA has no device-side candidate datastore.
pub const CANDIDATE_LOADED: &str = "Candidate loaded to memory (no ASA support)";

const SHOW_RUNNING: &str = "show running-config";
const SHOW_STARTUP: &str = "show startup-config";
const CHANGETO_SYSTEM: &str = "changeto system";
const CONFIGURE_TERMINAL: &str = "configure terminal";
const END: &str = "end";
const WRITE_MEMORY: &str = "write memory";

pub struct AsaDriver {
    hostname: String,
    username: String,
    password: String,
    timeout: Duration,
    args: OptionalArgs,
    device: Option<Box<dyn CliDevice>>,
    candidate: Option<Candidate>,
    dest_file_system: Option<String>,
}

impl AsaDriver {
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
        args: OptionalArgs,
    ) -> Self {
        let dest_file_system = args.dest_file_system.clone();
        Self {
            hostname: hostname.into(),
            username: username.into(),
            password: password.into(),
            timeout,
            args,
            device: None,
            candidate: None,
            dest_file_system,
        }
    }

    /// Use an already prepared device instead of connecting in `open`.
    pub fn with_device(mut self, device: Box<dyn CliDevice>) -> Self {
        self.device = Some(device);
        self
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// File system holding configuration files, known after `open`.
    pub fn dest_file_system(&self) -> Option<&str> {
        self.dest_file_system.as_deref()
    }

    pub fn candidate(&self) -> Option<&Candidate> {
        self.candidate.as_ref()
    }

    fn connect_params(&self) -> ConnectParams {
        let mut params = ConnectParams::new(
            &self.hostname,
            &self.username,
            &self.password,
            self.args.transport,
            self.timeout,
        );
        params.port = self.args.port();
        params
    }

    fn device_mut(&mut self) -> Result<&mut (dyn CliDevice + 'static), DriverError> {
        self.device
            .as_deref_mut()
            .ok_or_else(|| DriverError::NotConnected(self.hostname.clone()))
    }

    /// Run a single command on the open device.
    pub async fn send_command(&mut self, command: &str) -> Result<String, DriverError> {
        let output = self.device_mut()?.send_command(command).await?;
        tracing::debug!(command, bytes = output.len(), "Command completed");
        Ok(output)
    }

    /// Try `commands` in order until one is accepted by the device.
    ///
    /// Returns the output of the first command whose output is not an
    /// "invalid input" error, or the last output when none was accepted.
    pub async fn send_commands(&mut self, commands: &[&str]) -> Result<String, DriverError> {
        let mut output = None;
        for command in commands {
            let text = self.send_command(command).await?;
            if !parse::is_invalid_output(&text) {
                return Ok(text);
            }
            tracing::debug!(command, "Command rejected, trying next variant");
            output = Some(text);
        }
        output.ok_or_else(|| CoreError::Validation("no command given".into()).into())
    }

    /// Switch contexts, detect the file system and enter the target context.
    async fn prepare(&mut self) -> Result<(), DriverError> {
        let secret = self.args.secret.clone().unwrap_or_else(|| self.password.clone());
        self.device_mut()?.enable(&secret).await?;

        // Fails harmlessly on single-context devices.
        let output = self.send_command(CHANGETO_SYSTEM).await?;
        if parse::is_invalid_output(&output) {
            tracing::debug!(host = %self.hostname, "Device is in single-context mode");
        }

        if self.dest_file_system.is_none() {
            let fs = self.device_mut()?.autodetect_fs().await?;
            tracing::info!(
                host = %self.hostname,
                file_system = %fs,
                "Detected destination file system",
            );
            self.dest_file_system = Some(fs);
        }

        if !self.args.is_system_context() {
            let context = self.args.context.clone();
            let output = self.send_command(&format!("changeto context {context}")).await?;
            if parse::is_config_error(&output) {
                return Err(DriverError::ContextSwitch { context, output });
            }
            tracing::info!(host = %self.hostname, context = %context, "Changed security context");
        }

        Ok(())
    }

    async fn load_candidate(
        &mut self,
        kind: CandidateKind,
        source: CandidateSource<'_>,
    ) -> Result<LoadOutcome, DriverError> {
        let text = match source {
            CandidateSource::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| DriverError::CandidateFile {
                        path: path.to_path_buf(),
                        source,
                    })?
            }
            CandidateSource::Text(text) => text.to_string(),
        };

        if text.trim().is_empty() {
            return Err(CoreError::Validation("candidate configuration is empty".into()).into());
        }

        tracing::info!(host = %self.hostname, ?kind, bytes = text.len(), "Candidate loaded");
        self.candidate = Some(Candidate::new(kind, text));
        Ok(LoadOutcome::loaded(CANDIDATE_LOADED))
    }

    /// Top-level blocks changed by the candidate, for summaries.
    pub async fn compare_sections(&mut self) -> Result<Vec<SectionChange>, DriverError> {
        let Some(candidate) = self.candidate.clone() else {
            return Ok(Vec::new());
        };
        let running = self.get_config(ConfigRetrieval::Running).await?.running;
        Ok(diff::diff_sections(&running, &candidate.text))
    }

    async fn commit_merge(&mut self, candidate: &Candidate) -> Result<(), DriverError> {
        self.send_command(CONFIGURE_TERMINAL).await?;

        for line in candidate.config_lines() {
            let output = self.send_command(line).await?;
            if parse::is_config_error(&output) {
                tracing::warn!(host = %self.hostname, line, "Device rejected configuration line");
                if let Err(e) = self.send_command(END).await {
                    tracing::warn!(error = %e, "Failed to leave configuration mode");
                }
                return Err(DriverError::CommitFailed {
                    line: line.trim().to_string(),
                    output,
                });
            }
        }

        self.send_command(END).await?;
        let output = self.send_command(WRITE_MEMORY).await?;
        if parse::is_config_error(&output) {
            return Err(DriverError::CommitFailed {
                line: WRITE_MEMORY.to_string(),
                output,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl NetworkDriver for AsaDriver {
    async fn open(&mut self) -> Result<(), DriverError> {
        if self.is_alive() {
            return Ok(());
        }

        let params = self.connect_params();
        let retry = RetryConfig {
            max_attempts: self.args.connect_retries,
            ..Default::default()
        };
        tracing::info!(
            host = %self.hostname,
            port = params.port,
            transport = %params.kind,
            "Opening device session",
        );

        let session = CliSession::open(&params, &retry).await?;
        self.device = Some(Box::new(session));

        if let Err(e) = self.prepare().await {
            if let Some(mut device) = self.device.take() {
                let _ = device.disconnect().await;
            }
            return Err(e);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if let Some(mut device) = self.device.take() {
            device.disconnect().await?;
            tracing::info!(host = %self.hostname, "Device session closed");
        }
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.device.as_ref().is_some_and(|d| d.is_alive())
    }

    async fn get_config(&mut self, retrieve: ConfigRetrieval) -> Result<ConfigSet, DriverError> {
        let mut configs = ConfigSet::default();
        if retrieve.includes_startup() {
            configs.startup = self.send_command(SHOW_STARTUP).await?;
        }
        if retrieve.includes_running() {
            configs.running = self.send_command(SHOW_RUNNING).await?;
        }
        Ok(configs)
    }

    async fn load_replace_candidate(
        &mut self,
        source: CandidateSource<'_>,
    ) -> Result<LoadOutcome, DriverError> {
        self.load_candidate(CandidateKind::Replace, source).await
    }

    async fn load_merge_candidate(
        &mut self,
        source: CandidateSource<'_>,
    ) -> Result<LoadOutcome, DriverError> {
        self.load_candidate(CandidateKind::Merge, source).await
    }

    async fn compare_config(&mut self) -> Result<String, DriverError> {
        let Some(candidate) = self.candidate.clone() else {
            return Ok(String::new());
        };
        let running = self.get_config(ConfigRetrieval::Running).await?.running;

        Ok(match candidate.kind {
            CandidateKind::Replace => diff::unified_diff(&running, &candidate.text),
            CandidateKind::Merge => diff::merge_diff(&running, &candidate.text),
        })
    }

    fn discard_config(&mut self) {
        if self.candidate.take().is_some() {
            tracing::info!(host = %self.hostname, "Candidate discarded");
        }
    }

    async fn commit_config(&mut self) -> Result<(), DriverError> {
        let candidate = self
            .candidate
            .clone()
            .ok_or_else(|| CoreError::Validation("no candidate configuration loaded".into()))?;

        match candidate.kind {
            CandidateKind::Replace => {
                Err(CoreError::NotImplemented("commit_config for replace candidates").into())
            }
            CandidateKind::Merge => {
                self.commit_merge(&candidate).await?;
                self.candidate = None;
                tracing::info!(host = %self.hostname, "Merge candidate committed");
                Ok(())
            }
        }
    }

    async fn get_facts(&mut self) -> Result<Facts, DriverError> {
        let version = parse::parse_show_version(&self.send_command(SHOW_VERSION).await?)?;
        let domain = parse::parse_domain_name(&self.send_command(SHOW_DOMAIN_NAME).await?);
        let interfaces = parse::parse_show_interface(&self.send_command(SHOW_INTERFACE).await?);

        let hostname = if version.hostname.is_empty() {
            self.hostname.clone()
        } else {
            version.hostname
        };
        let fqdn = match domain {
            Some(domain) => format!("{hostname}.{domain}"),
            None => hostname.clone(),
        };

        Ok(Facts {
            hostname,
            fqdn,
            vendor: VENDOR.to_string(),
            model: version.model,
            os_version: version.os_version,
            serial_number: version.serial_number,
            uptime: version.uptime,
            interface_list: interfaces.into_keys().collect(),
        })
    }

    async fn get_interfaces(&mut self) -> Result<Interfaces, DriverError> {
        let output = self.send_command(SHOW_INTERFACE).await?;
        Ok(parse::parse_show_interface(&output))
    }

    async fn get_interfaces_ip(&mut self) -> Result<InterfacesIp, DriverError> {
        let output = self.send_command(SHOW_INTERFACE).await?;
        Ok(parse::parse_interface_ips(&output)?)
    }
}
