//! Error taxonomy shared by the store, renderer and exporters.

use thiserror::Error;

pub type InvoiceResult<T> = Result<T, InvoiceError>;

#[derive(Debug, Error)]
pub enum InvoiceError {
    /// Input rejected before it reached storage or export.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("invoice not found: {0}")]
    NotFound(String),

    /// The same destructive action is already running for this invoice.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backend unavailable or write rejected.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// Rendering or writing an export artifact failed; nothing was produced.
    #[error("export failed: {0}")]
    Export(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl InvoiceError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Export(_) => "EXPORT_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }
}

fn sqlite_error_string(err: &rusqlite::Error) -> String {
    match err {
        rusqlite::Error::SqliteFailure(code, msg) => {
            let message = msg.clone().unwrap_or_default();
            format!(
                "sqlite(code={:?}, extended_code={}, msg={})",
                code.code, code.extended_code, message
            )
        }
        other => other.to_string(),
    }
}

impl From<rusqlite::Error> for InvoiceError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(sqlite_error_string(&err))
    }
}

impl From<serde_json::Error> for InvoiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for InvoiceError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<config::ConfigError> for InvoiceError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(InvoiceError::Validation(String::new()).code(), "VALIDATION_ERROR");
        assert_eq!(InvoiceError::NotFound(String::new()).code(), "NOT_FOUND");
        assert_eq!(InvoiceError::Storage(String::new()).code(), "STORAGE_ERROR");
        assert_eq!(InvoiceError::Export(String::new()).code(), "EXPORT_ERROR");
    }

    #[test]
    fn sqlite_failures_map_to_storage() {
        let err: InvoiceError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, InvoiceError::Storage(_)));
    }

    #[test]
    fn json_failures_map_to_serialization() {
        let err: InvoiceError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, InvoiceError::Serialization(_)));
    }
}
