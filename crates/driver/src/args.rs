//! Driver options beyond hostname, credentials and timeout.
//!
//! Mirrors the free-form `optional_args` mapping of NAPALM drivers:
//!
//! | Key                | Meaning                                        | Default     |
//! |--------------------|------------------------------------------------|-------------|
//! | `context`          | Security context entered after login           | `system`    |
//! | `dest_file_system` | File system for config files (`disk0:`)        | autodetect  |
//! | `secret`           | Enable password                                | password    |
//! | `port`             | TCP port                                       | per transport |
//! | `transport`        | `ssh` or `telnet`                              | `ssh`       |
//! | `connect_retries`  | Connection attempts before giving up           | `3`         |

use std::collections::HashMap;

use asa_core::error::CoreError;
use asa_session::TransportKind;

/// The context every multi-context ASA starts in.
pub const SYSTEM_CONTEXT: &str = "system";

pub const DEFAULT_CONNECT_RETRIES: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalArgs {
    pub context: String,
    /// `None` means detect it from `dir` output on open.
    pub dest_file_system: Option<String>,
    /// `None` means reuse the login password.
    pub secret: Option<String>,
    /// `None` means the default port of `transport`.
    pub port: Option<u16>,
    pub transport: TransportKind,
    pub connect_retries: u32,
}

impl Default for OptionalArgs {
    fn default() -> Self {
        Self {
            context: SYSTEM_CONTEXT.to_string(),
            dest_file_system: None,
            secret: None,
            port: None,
            transport: TransportKind::default(),
            connect_retries: DEFAULT_CONNECT_RETRIES,
        }
    }
}

impl OptionalArgs {
    /// Build from a string map. Unknown keys are ignored (and logged).
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, CoreError> {
        let mut args = Self::default();

        for (key, value) in map {
            match key.as_str() {
                "context" => args.context = non_empty(key, value)?,
                "dest_file_system" => args.dest_file_system = Some(non_empty(key, value)?),
                "secret" => args.secret = Some(value.clone()),
                "port" => {
                    let port = value.parse::<u16>().ok().filter(|p| *p != 0).ok_or_else(|| {
                        CoreError::Validation(format!("port must be 1-65535, got '{value}'"))
                    })?;
                    args.port = Some(port);
                }
                "transport" => {
                    args.transport = value
                        .parse()
                        .map_err(|e| CoreError::Validation(format!("{e}")))?;
                }
                "connect_retries" => {
                    args.connect_retries = value.parse().map_err(|_| {
                        CoreError::Validation(format!(
                            "connect_retries must be a non-negative integer, got '{value}'"
                        ))
                    })?;
                }
                _ => tracing::debug!(key = %key, "Ignoring unknown optional argument"),
            }
        }

        Ok(args)
    }

    /// Port to connect to after applying the transport default.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.transport.default_port())
    }

    pub fn is_system_context(&self) -> bool {
        self.context == SYSTEM_CONTEXT
    }
}

fn non_empty(key: &str, value: &str) -> Result<String, CoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::Validation(format!("{key} must not be empty")));
    }
    Ok(value.to_string())
}
