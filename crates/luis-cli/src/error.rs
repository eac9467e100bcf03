use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("missing setting: pass --{flag} or set {env}")]
    MissingSetting {
        flag: &'static str,
        env: &'static str,
    },

    #[error("application '{0}' not found")]
    AppNotFound(String),

    #[error(transparent)]
    Luis(#[from] luis_core::LuisError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::MissingSetting { .. } => 2,
            Self::AppNotFound(_) => 3,
            Self::Luis(luis_core::LuisError::InvalidConfig(_)) => 2,
            Self::Luis(luis_core::LuisError::Cancelled) => 130,
            Self::Luis(_) => 1,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
