//! Calls that re-authenticate once on session failures.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::DmeClient;
use super::error::DmeError;
use super::transport::Method;

impl DmeClient {
    /// Issues a `GET` with one relogin-and-retry on session errors.
    ///
    /// # Errors
    ///
    /// Returns the retried call's error, the relogin error, or any
    /// non-session error from the first attempt.
    pub async fn graceful_get<T: DeserializeOwned>(&self, path: &str) -> Result<T, DmeError> {
        self.graceful_call(Method::Get, path, None).await
    }

    /// Issues a request with a JSON body, retrying once like
    /// [`DmeClient::graceful_get`].
    ///
    /// # Errors
    ///
    /// Returns [`DmeError::Encode`] when `body` cannot be serialised, and
    /// otherwise behaves like [`DmeClient::graceful_get`].
    pub async fn graceful_send<T, B>(&self, method: Method, path: &str, body: &B) -> Result<T, DmeError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body).map_err(|err| DmeError::Encode(err.to_string()))?;
        self.graceful_call(method, path, Some(body)).await
    }

    async fn graceful_call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, DmeError> {
        let observed = self.current_token().await;
        match self.call(method, path, body.clone()).await {
            Err(err) if err.needs_relogin() => {
                tracing::warn!(
                    backend_id = %self.backend_id,
                    method = %method,
                    path,
                    error = %err,
                    "session error, re-authenticating before one retry"
                );
                self.relogin_from(observed.as_deref()).await?;
                self.call(method, path, body).await
            }
            other => other,
        }
    }
}
