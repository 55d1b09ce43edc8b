//! Fake ASA answering commands from recorded output in `tests/mock_data`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock, Mutex};

use async_trait::async_trait;
use regex::Regex;

use asa_driver::asa::DEFAULT_TIMEOUT;
use asa_driver::{AsaDriver, OptionalArgs};
use asa_session::{CliDevice, SessionError};

/// What the ASA prints for a command it does not know.
pub const INVALID_INPUT: &str =
    "                ^\nERROR: % Invalid input detected at '^' marker.";

static MOCK_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\[\]\*\^\+\s\|]").expect("valid regex"));

/// Fixture file name for a command: special characters become `_`.
pub fn mock_file_name(command: &str) -> String {
    format!("{}.txt", MOCK_NAME_RE.replace_all(command, "_"))
}

pub fn mock_data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/mock_data")
}

/// Shared record of every command the fake received.
#[derive(Clone, Default)]
pub struct CommandLog(Arc<Mutex<Vec<String>>>);

impl CommandLog {
    pub fn commands(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn push(&self, command: &str) {
        self.0.lock().unwrap().push(command.to_string());
    }
}

pub struct FakeDevice {
    dir: PathBuf,
    responses: HashMap<String, String>,
    log: CommandLog,
    alive: bool,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self {
            dir: mock_data_dir(),
            responses: HashMap::new(),
            log: CommandLog::default(),
            alive: true,
        }
    }

    /// Answer `command` with `output` instead of reading a fixture.
    pub fn with_response(mut self, command: &str, output: &str) -> Self {
        self.responses.insert(command.to_string(), output.to_string());
        self
    }

    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }
}

#[async_trait]
impl CliDevice for FakeDevice {
    async fn send_command(&mut self, command: &str) -> Result<String, SessionError> {
        if !self.alive {
            return Err(SessionError::NotConnected);
        }
        self.log.push(command);

        if let Some(output) = self.responses.get(command) {
            return Ok(output.clone());
        }
        let path = self.dir.join(mock_file_name(command));
        Ok(std::fs::read_to_string(path).unwrap_or_else(|_| INVALID_INPUT.to_string()))
    }

    async fn enable(&mut self, _secret: &str) -> Result<(), SessionError> {
        Ok(())
    }

    async fn autodetect_fs(&mut self) -> Result<String, SessionError> {
        Ok("disk0:".to_string())
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    async fn disconnect(&mut self) -> Result<(), SessionError> {
        self.alive = false;
        Ok(())
    }
}

/// A driver already "opened" on `device`.
pub fn driver_on(device: FakeDevice) -> (AsaDriver, CommandLog) {
    let log = device.log();
    let args = OptionalArgs::default();
    let driver = AsaDriver::new("asa.lab", "vagrant", "vagrant", DEFAULT_TIMEOUT, args)
        .with_device(Box::new(device));
    (driver, log)
}

pub fn fake_driver() -> (AsaDriver, CommandLog) {
    driver_on(FakeDevice::new())
}
