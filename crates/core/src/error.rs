#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Failed to parse output of '{command}': {reason}")]
    Parse { command: &'static str, reason: String },

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),
}
