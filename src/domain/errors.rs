//! Crawl error taxonomy with retry classification.
//!
//! Handlers return typed failure kinds; the run coordinator inspects
//! them to decide retry vs. permanent failure. No task failure aborts
//! the run — only startup configuration errors are fatal.

use thiserror::Error;

/// Failure of the fetch collaborator for one request.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("bad response status {status} from {url}")]
    BadStatus { status: u16, url: String },

    #[error("page at {url} looks blocked ({marker})")]
    Blocked { url: String, marker: String },
}

impl FetchError {
    pub fn network(url: &str, message: impl std::fmt::Display) -> Self {
        Self::Network {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    pub fn blocked(url: &str, marker: &str) -> Self {
        Self::Blocked {
            url: url.to_string(),
            marker: marker.to_string(),
        }
    }

    /// Whether another attempt can plausibly succeed.
    ///
    /// Authorization and not-found statuses will not change on retry;
    /// everything else (timeouts, 5xx, rate limits, blocked sessions)
    /// is worth the configured retry budget.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::BadStatus { status, .. } => !matches!(*status, 401 | 403 | 404 | 410),
            Self::Network { .. } | Self::Timeout { .. } | Self::Blocked { .. } => true,
        }
    }
}

/// Failure of the extractor collaborator on a fetched page.
#[derive(Error, Debug, Clone)]
pub enum ExtractionError {
    #[error("page structure mismatch at {url}: {reason}")]
    StructureMismatch { url: String, reason: String },

    #[error("required listing signal '{field}' missing at {url}")]
    MissingSignal { field: String, url: String },

    #[error("transient extraction failure at {url}: {reason}")]
    Transient { url: String, reason: String },
}

impl ExtractionError {
    pub fn structure_mismatch(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::StructureMismatch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn missing_signal(url: &str, field: &str) -> Self {
        Self::MissingSignal {
            field: field.to_string(),
            url: url.to_string(),
        }
    }

    /// A structural mismatch will not fix itself on retry; only
    /// collaborator-classified transient failures re-enter the queue.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Outcome classification for one fetch+handle cycle.
#[derive(Error, Debug, Clone)]
pub enum TaskError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The output sink rejected an accepted record. The ledger has
    /// already unpublished the item id, so a retry re-offers it.
    #[error("output sink failure: {message}")]
    Sink { message: String },
}

impl TaskError {
    pub fn sink(err: impl std::fmt::Display) -> Self {
        Self::Sink {
            message: err.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_retryable(),
            Self::Extraction(e) => e.is_retryable(),
            Self::Sink { .. } => true,
        }
    }
}

pub type TaskResult<T> = Result<T, TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_retry_classification() {
        assert!(FetchError::network("https://a", "reset").is_retryable());
        assert!(
            FetchError::Timeout {
                url: "https://a".into(),
                timeout_secs: 30
            }
            .is_retryable()
        );
        assert!(
            FetchError::BadStatus {
                status: 503,
                url: "https://a".into()
            }
            .is_retryable()
        );
        assert!(
            !FetchError::BadStatus {
                status: 404,
                url: "https://a".into()
            }
            .is_retryable()
        );
        assert!(FetchError::blocked("https://a", "g-recaptcha").is_retryable());
    }

    #[test]
    fn test_extraction_retry_classification() {
        assert!(!ExtractionError::structure_mismatch("https://a", "no cells").is_retryable());
        assert!(!ExtractionError::missing_signal("https://a", "price bounds").is_retryable());
        assert!(
            ExtractionError::Transient {
                url: "https://a".into(),
                reason: "partial render".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_task_error_delegates() {
        let err: TaskError = FetchError::network("https://a", "reset").into();
        assert!(err.is_retryable());
        let err: TaskError = ExtractionError::structure_mismatch("https://a", "layout").into();
        assert!(!err.is_retryable());
    }
}
