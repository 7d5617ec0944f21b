use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Connectivity error: service={service}, {message}")]
    Connectivity { service: String, message: String },

    #[error("Tool execution error: tool={tool}, {message}")]
    ToolExecution { tool: String, message: String },

    #[error("HTTP error: service={service}, status={status}, {body}")]
    Http {
        service: String,
        status: u16,
        body: String,
    },

    #[error("Storage error: {0}")]
    Storage(rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type RagResult<T> = Result<T, RagError>;

impl RagError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn connectivity(service: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Connectivity {
            service: service.into(),
            message: message.to_string(),
        }
    }

    pub fn tool(tool: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::ToolExecution {
            tool: tool.into(),
            message: message.to_string(),
        }
    }

    /// `true` for failures of an external capability (store, model server).
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }
}

/// Unopenable, busy, or locked databases are connectivity failures; the rest
/// are storage errors.
impl From<rusqlite::Error> for RagError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ffi::ErrorCode;
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if matches!(
                    e.code,
                    ErrorCode::CannotOpen
                        | ErrorCode::DatabaseBusy
                        | ErrorCode::DatabaseLocked
                        | ErrorCode::NotADatabase
                ) =>
            {
                Self::connectivity("vector-store", err)
            }
            _ => Self::Storage(err),
        }
    }
}
