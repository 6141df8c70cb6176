//! Engine error types.
//!
//! Only startup and collaborator failures surface here. Gate, entry and exit
//! logic report blocked paths through typed outcomes instead.

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("engine disabled by [engine] engine_enable")]
    EngineDisabled,

    #[error("bar feed error: {reason}")]
    Feed { reason: String },

    #[error("order adapter error: {reason}")]
    Order { reason: String },

    #[error("audit report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub(crate) fn missing(section: &str, key: &str) -> Self {
        EngineError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        EngineError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(
            self,
            EngineError::ConfigParse { .. }
                | EngineError::ConfigMissing { .. }
                | EngineError::ConfigInvalid { .. }
        )
    }
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err {
            EngineError::Io(_) => 1,
            EngineError::ConfigParse { .. }
            | EngineError::ConfigMissing { .. }
            | EngineError::ConfigInvalid { .. } => 2,
            EngineError::Feed { .. } | EngineError::Csv(_) => 3,
            EngineError::Order { .. } | EngineError::Report { .. } => 4,
            EngineError::EngineDisabled => 6,
        };
        std::process::ExitCode::from(code)
    }
}
