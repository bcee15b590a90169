//! Structured error envelope probing and typed response decoding.
//!
//! DME answers failures with one of three object shapes that may share a
//! body with ordinary fields. Every response passes through [`decode`], which
//! probes the envelope once and only then deserialises the caller's type.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::error::DmeError;
use super::transport::HttpResponse;

/// Auth code reported when the session has been taken offline.
pub const SESSION_OFFLINE_CODE: &str = "1077949069";
/// Auth code reported when the token is not (or no longer) authenticated.
pub const NOT_AUTHENTICATED_CODE: &str = "-401";
/// Business code reported when filesystem creation hits quota control.
pub const QUOTA_CONTROL_CODE: &str = "1077950049";

pub(crate) fn auth_code_needs_retry(code: &str) -> bool {
    code == SESSION_OFFLINE_CODE || code == NOT_AUTHENTICATED_CODE
}

/// Error codes arrive as strings or bare numbers depending on the service.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawCode {
    Text(String),
    Number(i64),
}

impl RawCode {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

fn populated(code: Option<RawCode>) -> Option<String> {
    code.map(RawCode::into_string)
        .map(|code| code.trim().to_owned())
        .filter(|code| !code.is_empty())
}

#[derive(Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    code: Option<RawCode>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<RawCode>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default, rename = "exceptionId")]
    exception_id: Option<String>,
    #[serde(default, rename = "exceptionType")]
    exception_type: Option<String>,
}

impl ErrorEnvelope {
    fn into_error(self) -> Option<DmeError> {
        if let Some(code) = populated(self.code) {
            return Some(DmeError::Auth {
                code,
                description: self.description.unwrap_or_default(),
            });
        }
        if let Some(code) = populated(self.error_code) {
            return Some(DmeError::Business {
                code,
                message: self.error_message.unwrap_or_default(),
            });
        }
        let exception_id = self.exception_id.unwrap_or_default();
        if !exception_id.trim().is_empty() {
            return Some(DmeError::Login {
                exception_id,
                exception_type: self.exception_type.unwrap_or_default(),
            });
        }
        None
    }
}

/// Decodes `response` into `T`, surfacing any structured error first.
///
/// Bodies that are JSON arrays bypass the probe entirely. Empty bodies decode
/// as `null` so unit and optional targets work for bodiless answers.
///
/// # Errors
///
/// Returns [`DmeError::Auth`], [`DmeError::Business`], or [`DmeError::Login`]
/// when the envelope carries an error, [`DmeError::Http`] for non-success
/// statuses without an envelope, and [`DmeError::Decode`] when the body does
/// not match `T`.
pub fn decode<T: DeserializeOwned>(path: &str, response: &HttpResponse) -> Result<T, DmeError> {
    let body = response.body.trim_ascii_start();
    if body.first() == Some(&b'[') {
        return parse(path, body);
    }

    if !body.is_empty() {
        // Non-object bodies (plain strings, numbers) carry no envelope.
        let envelope = serde_json::from_slice::<ErrorEnvelope>(body).unwrap_or_default();
        if let Some(error) = envelope.into_error() {
            return Err(error);
        }
    }

    if !response.is_success() {
        return Err(DmeError::Http {
            path: path.to_owned(),
            status: response.status,
            body: String::from_utf8_lossy(body).into_owned(),
        });
    }

    if body.is_empty() {
        return parse(path, b"null");
    }
    parse(path, body)
}

fn parse<T: DeserializeOwned>(path: &str, body: &[u8]) -> Result<T, DmeError> {
    serde_json::from_slice(body).map_err(|err| DmeError::Decode {
        path: path.to_owned(),
        message: err.to_string(),
    })
}
