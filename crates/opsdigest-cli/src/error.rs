use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] opsdigest_core::ConfigError),

    #[error(transparent)]
    Date(#[from] opsdigest_core::DateError),

    #[error(transparent)]
    Mail(#[from] opsdigest_core::MailError),

    #[error(transparent)]
    Run(#[from] opsdigest_core::RunFailure),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Date(_) => 2,
            Self::Mail(_) => 2,
            Self::Run(_) => 3,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
