use std::time::Duration;

use clap::Args;

use asa_driver::args::{OptionalArgs, SYSTEM_CONTEXT};
use asa_driver::AsaDriver;
use asa_session::TransportKind;

/// Connection settings for one device.
///
/// Every flag falls back to an environment variable (a `.env` file in the
/// working directory is loaded first):
///
/// | Env Var                | Default   |
/// |------------------------|-----------|
/// | `ASA_HOST`             | required  |
/// | `ASA_USERNAME`         | required  |
/// | `ASA_PASSWORD`         | required  |
/// | `ASA_SECRET`           | password  |
/// | `ASA_PORT`             | 22 / 23   |
/// | `ASA_TRANSPORT`        | `ssh`     |
/// | `ASA_CONTEXT`          | `system`  |
/// | `ASA_DEST_FILE_SYSTEM` | detected  |
/// | `ASA_TIMEOUT_SECS`     | `60`      |
/// | `ASA_CONNECT_RETRIES`  | `3`       |
#[derive(Debug, Clone, Args)]
pub struct DeviceConfig {
    /// Device hostname or IP address.
    #[arg(long, env = "ASA_HOST")]
    pub host: String,

    #[arg(long, env = "ASA_USERNAME")]
    pub username: String,

    #[arg(long, env = "ASA_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Enable password, when different from the login password.
    #[arg(long, env = "ASA_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    #[arg(long, env = "ASA_PORT")]
    pub port: Option<u16>,

    /// `ssh` or `telnet`.
    #[arg(long, env = "ASA_TRANSPORT", default_value = "ssh")]
    pub transport: TransportKind,

    /// Security context to enter after login.
    #[arg(long, env = "ASA_CONTEXT", default_value = SYSTEM_CONTEXT)]
    pub context: String,

    /// File system for configuration files, e.g. `disk0:`.
    #[arg(long, env = "ASA_DEST_FILE_SYSTEM")]
    pub dest_file_system: Option<String>,

    /// Connect and per-command timeout in seconds.
    #[arg(long, env = "ASA_TIMEOUT_SECS", default_value_t = 60)]
    pub timeout_secs: u64,

    #[arg(long, env = "ASA_CONNECT_RETRIES", default_value_t = 3)]
    pub connect_retries: u32,
}

impl DeviceConfig {
    pub fn optional_args(&self) -> OptionalArgs {
        OptionalArgs {
            context: self.context.clone(),
            dest_file_system: self.dest_file_system.clone(),
            secret: self.secret.clone(),
            port: self.port,
            transport: self.transport,
            connect_retries: self.connect_retries,
        }
    }

    pub fn build_driver(&self) -> AsaDriver {
        AsaDriver::new(
            &self.host,
            &self.username,
            &self.password,
            Duration::from_secs(self.timeout_secs),
            self.optional_args(),
        )
    }
}
