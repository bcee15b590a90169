//! HTTP transport seam between the session layer and the network.
//!
//! The session manager only ever talks to a [`Transport`]; production code
//! obtains one from [`HttpConnector`], tests substitute a scripted double.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use super::error::DmeError;

/// Header carrying the session token.
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// HTTP methods used by the DME API.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Returns the upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully resolved request handed to a transport.
#[derive(Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Session token, if any.
    pub token: Option<String>,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("body", &self.body)
            .finish()
    }
}

/// Raw response returned by a transport.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Builds a response from a status and a JSON/text body.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Returns the body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Connection-level failure; the session layer maps it to
/// [`DmeError::Unconnected`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{message}")]
pub struct TransportError {
    /// Failure description.
    pub message: String,
}

impl TransportError {
    /// Creates a transport error from any displayable cause.
    pub fn new(message: impl ToString) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Future returned by [`Transport::send`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send + 'a>>;

/// Executes a single HTTP exchange.
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the raw response.
    fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Produces a fresh transport for every login.
pub trait Connector: Send + Sync {
    /// Builds a new transport with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`DmeError::Config`] when the transport cannot be built.
    fn connect(&self) -> Result<Arc<dyn Transport>, DmeError>;
}

/// Connector backed by `reqwest` with rustls.
#[derive(Clone, Debug)]
pub struct HttpConnector {
    timeout: Duration,
    insecure_skip_verify: bool,
}

impl HttpConnector {
    /// Creates a connector with the given request timeout and TLS policy.
    #[must_use]
    pub const fn new(timeout: Duration, insecure_skip_verify: bool) -> Self {
        Self {
            timeout,
            insecure_skip_verify,
        }
    }
}

impl Connector for HttpConnector {
    fn connect(&self) -> Result<Arc<dyn Transport>, DmeError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(self.insecure_skip_verify)
            .build()
            .map_err(|err| DmeError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(Arc::new(ReqwestTransport { client }))
    }
}

struct ReqwestTransport {
    client: reqwest::Client,
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
        Box::pin(async move {
            let mut builder = self
                .client
                .request(request.method.as_reqwest(), &request.url)
                .header(reqwest::header::ACCEPT, "application/json");
            if let Some(token) = &request.token {
                builder = builder.header(AUTH_TOKEN_HEADER, token);
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await.map_err(TransportError::new)?;
            let status = response.status().as_u16();
            let body = response.bytes().await.map_err(TransportError::new)?;
            Ok(HttpResponse {
                status,
                body: body.to_vec(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_debug_hides_token() {
        let request = HttpRequest {
            method: Method::Get,
            url: String::from("https://dme/rest"),
            token: Some(String::from("secret-token")),
            body: None,
        };
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn success_range_is_2xx() {
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(302, "").is_success());
        assert!(!HttpResponse::new(401, "").is_success());
    }
}
