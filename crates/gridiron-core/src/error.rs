use thiserror::Error;

/// Error taxonomy shared by every layer. Each variant carries a readable cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridironError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("unknown stat type: {0}")]
    UnknownStat(String),
    #[error("fetch failed: {0}")]
    BackendFetch(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("migration error: {0}")]
    Migration(String),
}

impl GridironError {
    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            GridironError::Validation(_) => "validation_error",
            GridironError::UnknownStat(_) => "unknown_stat",
            GridironError::BackendFetch(_) => "backend_fetch_error",
            GridironError::Persistence(_) => "persistence_error",
            GridironError::Migration(_) => "migration_error",
        }
    }

    /// The cause without the variant prefix.
    pub fn detail(&self) -> &str {
        match self {
            GridironError::Validation(s)
            | GridironError::UnknownStat(s)
            | GridironError::BackendFetch(s)
            | GridironError::Persistence(s)
            | GridironError::Migration(s) => s,
        }
    }
}
