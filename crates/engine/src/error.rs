use shardhaven_protocol::HavenId;

/// Failures of layout operations.
///
/// `Rejected` carries the message shown to the editor user verbatim.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("No haven ID given.")]
    MissingHaven,

    #[error("No such haven found.")]
    HavenNotFound(HavenId),

    #[error("No layout for that haven.")]
    NoLayout(HavenId),

    #[error("{0}")]
    Rejected(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
