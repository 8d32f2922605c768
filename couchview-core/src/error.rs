use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Boxed cause carried by a [`CouchError::QueryFailure`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type CouchResult<T> = Result<T, CouchError>;

/// Error kinds surfaced by every couchview operation.
///
/// `NotFound` and `Conflict` are recoverable by the caller (treat as empty,
/// or retry with a fresh revision). `QueryFailure` and `EncodingFailure` are
/// fatal to the operation that raised them.
#[derive(Debug, Error)]
pub enum CouchError {
    #[error("not found: {message}{}", Reason(.reason))]
    NotFound {
        message: String,
        reason: Option<String>,
    },

    #[error("conflict: {message}{}", Reason(.reason))]
    Conflict {
        message: String,
        reason: Option<String>,
    },

    #[error("already exists: {message}{}", Reason(.reason))]
    AlreadyExists {
        message: String,
        reason: Option<String>,
    },

    #[error("query failed: {message}{}", Reason(.reason))]
    QueryFailure {
        message: String,
        reason: Option<String>,
        #[source]
        source: Option<BoxError>,
    },

    #[error("encoding failed: {message}")]
    EncodingFailure {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

struct Reason<'a>(&'a Option<String>);

impl fmt::Display for Reason<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(reason) => write!(f, " (reason: {})", reason),
            None => Ok(()),
        }
    }
}

impl CouchError {
    pub fn not_found(message: impl Into<String>) -> Self {
        CouchError::NotFound {
            message: message.into(),
            reason: None,
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        CouchError::Conflict {
            message: message.into(),
            reason: None,
        }
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        CouchError::AlreadyExists {
            message: message.into(),
            reason: None,
        }
    }

    pub fn query_failure(message: impl Into<String>) -> Self {
        CouchError::QueryFailure {
            message: message.into(),
            reason: None,
            source: None,
        }
    }

    /// Query failure wrapping an underlying transport or parse error.
    pub fn query_failure_with(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        CouchError::QueryFailure {
            message: message.into(),
            reason: None,
            source: Some(source.into()),
        }
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        CouchError::EncodingFailure {
            message: message.into(),
            source: None,
        }
    }

    pub fn encoding_with(message: impl Into<String>, source: serde_json::Error) -> Self {
        CouchError::EncodingFailure {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Map a non-success HTTP status and the server's JSON error body
    /// (`{"error": ..., "reason": ...}`) onto an error kind.
    pub fn from_status(status: u16, message: impl Into<String>, body: Option<&Value>) -> Self {
        let mut message = message.into();
        let error = body.and_then(|b| b.get("error")).and_then(Value::as_str);
        let reason = body
            .and_then(|b| b.get("reason"))
            .and_then(Value::as_str)
            .or(error)
            .map(str::to_string);
        if let Some(error) = error {
            message = format!("{} [{}]", message, error);
        }
        match status {
            404 => CouchError::NotFound { message, reason },
            409 => CouchError::Conflict { message, reason },
            412 => CouchError::AlreadyExists { message, reason },
            _ => CouchError::QueryFailure {
                message: format!("{} (HTTP {})", message, status),
                reason,
                source: None,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CouchError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, CouchError::Conflict { .. })
    }

    /// Whether a caller can reasonably recover (treat as empty, or retry
    /// with a fresh revision).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CouchError::NotFound { .. } | CouchError::Conflict { .. }
        )
    }

    /// Server-supplied reason text, when the server sent one.
    pub fn reason(&self) -> Option<&str> {
        match self {
            CouchError::NotFound { reason, .. }
            | CouchError::Conflict { reason, .. }
            | CouchError::AlreadyExists { reason, .. }
            | CouchError::QueryFailure { reason, .. } => reason.as_deref(),
            CouchError::EncodingFailure { .. } => None,
        }
    }
}

impl From<serde_json::Error> for CouchError {
    fn from(err: serde_json::Error) -> Self {
        CouchError::encoding_with(format!("JSON error: {}", err), err)
    }
}
