//! Error types for the DME client.

use std::time::Duration;

use thiserror::Error;

use super::envelope::QUOTA_CONTROL_CODE;
use super::types::TaskOutcome;

/// Errors raised by the DME session, call, and task layers.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DmeError {
    /// Raised when the array cannot be reached or no session is active.
    ///
    /// Every transport-level failure is normalised to this variant so the
    /// graceful call layer can treat it as a single retryable sentinel.
    #[error("unconnected: {url}: {reason}")]
    Unconnected {
        /// URL the request targeted.
        url: String,
        /// Underlying transport failure.
        reason: String,
    },
    /// Raised when the array rejects the session token.
    #[error("authentication error {code}: {description}")]
    Auth {
        /// Error code reported by the array.
        code: String,
        /// Description reported by the array.
        description: String,
    },
    /// Raised when the array rejects a request for domain reasons.
    #[error("business error {code}: {message}")]
    Business {
        /// Error code reported by the array.
        code: String,
        /// Error message reported by the array.
        message: String,
    },
    /// Raised when the login flow itself fails.
    #[error("login failed: {exception_id} ({exception_type})")]
    Login {
        /// Exception identifier reported by the array.
        exception_id: String,
        /// Exception type reported by the array.
        exception_type: String,
    },
    /// Raised for non-success statuses that carry no error envelope.
    #[error("unexpected HTTP status {status} from {path}: {body}")]
    Http {
        /// Request path.
        path: String,
        /// HTTP status code.
        status: u16,
        /// Response body, lossily decoded.
        body: String,
    },
    /// Raised when a response body does not match the expected shape.
    #[error("failed to decode response from {path}: {message}")]
    Decode {
        /// Request path.
        path: String,
        /// Parser error message.
        message: String,
    },
    /// Raised when a request body cannot be serialised.
    #[error("failed to encode request body: {0}")]
    Encode(String),
    /// Raised when a mutating endpoint answers without a task id.
    #[error("{path} returned an empty task id")]
    EmptyTask {
        /// Request path.
        path: String,
    },
    /// Raised when the array reports a task as failed.
    #[error("task {task_id} {outcome}: {detail}")]
    TaskFailed {
        /// Task identifier.
        task_id: String,
        /// Terminal failure reported by the array.
        outcome: TaskOutcome,
        /// Detail text supplied by the array.
        detail: String,
    },
    /// Raised when the array reports a status code this client does not know.
    #[error("task {task_id} reported unknown status {status}")]
    TaskUnknownStatus {
        /// Task identifier.
        task_id: String,
        /// Raw status code.
        status: u32,
    },
    /// Raised when a task does not finish before the wait ceiling.
    #[error("timed out after {waited:?} waiting for task {task_id}")]
    TaskTimeout {
        /// Task identifier.
        task_id: String,
        /// Time spent waiting.
        waited: Duration,
    },
    /// Raised when credentials cannot be obtained for a backend.
    #[error("credentials unavailable for backend {backend_id}: {message}")]
    Credentials {
        /// Backend whose credentials were requested.
        backend_id: String,
        /// Failure description.
        message: String,
    },
    /// Raised when the storage identity behind a backend cannot be resolved.
    #[error("identity resolution failed for backend {backend_id}: {message}")]
    Identity {
        /// Backend being resolved.
        backend_id: String,
        /// Failure description.
        message: String,
    },
    /// Raised when an admission gate has been closed.
    #[error("admission gate closed: {0}")]
    Gate(String),
    /// Raised when the client is built from an incomplete configuration.
    #[error("client configuration error: {0}")]
    Config(String),
}

impl DmeError {
    /// Returns `true` when one relogin followed by one retry may succeed.
    #[must_use]
    pub fn needs_relogin(&self) -> bool {
        match self {
            Self::Unconnected { .. } => true,
            Self::Auth { code, .. } => super::envelope::auth_code_needs_retry(code),
            _ => false,
        }
    }

    /// Returns `true` for the business code the array uses to signal quota
    /// control on filesystem creation.
    #[must_use]
    pub fn is_quota_control(&self) -> bool {
        matches!(self, Self::Business { code, .. } if code == QUOTA_CONTROL_CODE)
    }

    pub(crate) fn unconnected(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unconnected {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DmeError::unconnected("https://a", "refused"), true)]
    #[case(DmeError::Auth { code: String::from("-401"), description: String::new() }, true)]
    #[case(DmeError::Auth { code: String::from("1077949069"), description: String::new() }, true)]
    #[case(DmeError::Auth { code: String::from("1077949070"), description: String::new() }, false)]
    #[case(DmeError::Business { code: String::from("-401"), message: String::new() }, false)]
    #[case(DmeError::Login { exception_id: String::from("x"), exception_type: String::from("y") }, false)]
    fn needs_relogin_only_for_transport_and_session_codes(
        #[case] error: DmeError,
        #[case] expected: bool,
    ) {
        assert_eq!(error.needs_relogin(), expected);
    }

    #[test]
    fn quota_control_is_a_business_code() {
        let quota = DmeError::Business {
            code: String::from(QUOTA_CONTROL_CODE),
            message: String::from("quota control"),
        };
        assert!(quota.is_quota_control());

        let auth = DmeError::Auth {
            code: String::from(QUOTA_CONTROL_CODE),
            description: String::new(),
        };
        assert!(!auth.is_quota_control());
    }
}
