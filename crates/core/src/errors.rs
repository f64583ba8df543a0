use thiserror::Error;

/// Unified error type for the entire app-sales-core library.
/// Every fallible public function returns `Result<T, CoreError>`.
///
/// `Clone` is required because fetch results (including errors) are
/// shared between coalesced callers through `futures::future::Shared`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    // ── Reporting API ───────────────────────────────────────────────
    #[error("The credentials for this account are incorrect")]
    InvalidCredentials,

    #[error("The API key does not have the right permissions")]
    WrongPermissions,

    #[error("The daily limit of API requests has been exceeded")]
    ExceededLimit,

    /// The provider has no report for the requested date yet.
    /// Absorbed at the per-date fetch boundary; callers of the batch
    /// API never see it as a failure when other dates succeeded.
    #[error("Report data is not yet available")]
    NoDataAvailable,

    #[error("Unknown API error: {0}")]
    Unknown(String),

    // ── Network / Transport ─────────────────────────────────────────
    #[error("Network error: {0}")]
    Network(String),

    // ── Serialization / Storage ─────────────────────────────────────
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("File I/O error: {0}")]
    FileIO(String),

    // ── Business Logic ──────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl CoreError {
    /// Whether this error means the report for a single date is simply
    /// absent (an empty, non-fatal result).
    pub fn is_no_data(&self) -> bool {
        matches!(self, CoreError::NoDataAvailable)
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // Sanitize error message: strip query parameters from URLs so
        // request details never leak into logs or user-facing errors.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
