//! Session lifecycle and the raw `call` primitive.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::{Value, json};
use uuid::Uuid;
use zeroize::{Zeroize, Zeroizing};

use super::envelope::decode;
use super::error::DmeError;
use super::paths;
use super::redaction::LogMode;
use super::transport::{HttpRequest, HttpResponse, Method, Transport};
use super::types::{Page, Storage, SystemInfo};
use super::{BackendIdentity, DmeClient};
use crate::credentials::AuthInfo;

/// Authenticated session pinned to one base URL.
///
/// Sessions are immutable; relogin replaces the whole value.
pub struct Session {
    token: String,
    base_url: String,
    user: String,
    transport: Arc<dyn Transport>,
}

impl Session {
    /// Returns the session token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the URL this session is pinned to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the user that owns the session.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    fn route(&self) -> Route<'_> {
        Route {
            transport: self.transport.as_ref(),
            base_url: &self.base_url,
            token: Some(&self.token),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"***")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Where a single request goes and which token it carries.
struct Route<'a> {
    transport: &'a dyn Transport,
    base_url: &'a str,
    token: Option<&'a str>,
}

/// Password grant sent to the sessions endpoint.
struct LoginBody(Value);

impl LoginBody {
    fn new(auth: &AuthInfo) -> Zeroizing<Self> {
        Zeroizing::new(Self(json!({
            "grantType": "password",
            "userName": auth.user.as_str(),
            "value": auth.password.as_str(),
        })))
    }

    const fn json(&self) -> &Value {
        &self.0
    }
}

impl Zeroize for LoginBody {
    fn zeroize(&mut self) {
        if let Some(Value::String(password)) = self.0.get_mut("value") {
            password.zeroize();
        }
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(rename = "accessSession")]
    access_session: String,
}

impl DmeClient {
    /// Logs in against the first reachable candidate URL.
    ///
    /// Every login uses a fresh transport. On the first success the array
    /// identity behind the backend is resolved.
    ///
    /// # Errors
    ///
    /// Returns the transport, credential, or identity failure, or the last
    /// per-URL failure when no candidate accepts the credentials. The backend
    /// is reported offline on every failure.
    pub async fn login(&self) -> Result<(), DmeError> {
        let _guard = self.relogin_lock.lock().await;
        self.login_unlocked().await
    }

    async fn login_unlocked(&self) -> Result<(), DmeError> {
        let outcome = self.authenticate().await;
        if let Err(err) = &outcome {
            tracing::warn!(backend_id = %self.backend_id, error = %err, "login failed");
            self.status_sink.set_online_status(&self.backend_id, false);
        }
        outcome
    }

    async fn authenticate(&self) -> Result<(), DmeError> {
        let transport = self.connector.connect()?;
        let auth = self
            .credentials
            .auth_info_for_backend(&self.backend_id)
            .await?;
        let user = auth.user.clone();
        let body = LoginBody::new(&auth);
        drop(auth);

        let mut last_error = None;
        for url in &self.urls {
            match self.open_session(&transport, url, &user, body.json()).await {
                Ok(session) => {
                    tracing::info!(backend_id = %self.backend_id, url = %url, user = %user, "logged in");
                    *self.session.write().await = Some(Arc::new(session));
                    return self.ensure_identity_after_login().await;
                }
                Err(err) => {
                    tracing::warn!(backend_id = %self.backend_id, url = %url, error = %err, "login attempt failed");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            DmeError::Config(format!("backend {} has no candidate URLs", self.backend_id))
        }))
    }

    async fn open_session(
        &self,
        transport: &Arc<dyn Transport>,
        base_url: &str,
        user: &str,
        body: &Value,
    ) -> Result<Session, DmeError> {
        let route = Route {
            transport: transport.as_ref(),
            base_url,
            token: None,
        };
        let response = self
            .execute(&route, Method::Put, paths::SESSIONS, Some(body.clone()))
            .await?;
        let login: LoginResponse = decode(paths::SESSIONS, &response)?;
        if login.access_session.trim().is_empty() {
            return Err(DmeError::Login {
                exception_id: String::from("empty.access.session"),
                exception_type: String::from("login response carried no token"),
            });
        }
        Ok(Session {
            token: login.access_session,
            base_url: base_url.to_owned(),
            user: user.to_owned(),
            transport: Arc::clone(transport),
        })
    }

    async fn ensure_identity_after_login(&self) -> Result<(), DmeError> {
        if self.identity.get().is_some() {
            return Ok(());
        }
        match self.resolve_identity().await {
            Ok(identity) => {
                tracing::info!(
                    backend_id = %self.backend_id,
                    storage_id = %identity.storage_id,
                    device_sn = %identity.device_sn,
                    "resolved backend identity"
                );
                if self.identity.set(identity).is_err() {
                    tracing::debug!(backend_id = %self.backend_id, "identity already resolved");
                }
                Ok(())
            }
            Err(err) => {
                *self.session.write().await = None;
                Err(err)
            }
        }
    }

    async fn resolve_identity(&self) -> Result<BackendIdentity, DmeError> {
        let system: SystemInfo = self.call(Method::Get, paths::SYSTEM_INFO, None).await?;
        let storages: Page<Storage> = self.call(Method::Get, paths::STORAGES, None).await?;
        let storage = storages
            .datas
            .into_iter()
            .find(|storage| storage.sn == system.sn)
            .ok_or_else(|| DmeError::Identity {
                backend_id: self.backend_id.clone(),
                message: format!("no storage registered with serial number {}", system.sn),
            })?;
        Ok(BackendIdentity {
            backend_id: self.backend_id.clone(),
            storage_id: storage.id,
            device_sn: system.sn,
        })
    }

    /// Returns the storage id, logging in first when the identity is unknown.
    pub(crate) async fn storage_id(&self) -> Result<&str, DmeError> {
        if self.identity.get().is_none() {
            self.relogin_from(None).await?;
        }
        self.identity
            .get()
            .map(|identity| identity.storage_id.as_str())
            .ok_or_else(|| DmeError::Identity {
                backend_id: self.backend_id.clone(),
                message: String::from("identity unresolved after login"),
            })
    }

    /// Replaces the current session with a fresh login.
    ///
    /// Concurrent callers that observed the same token share one login.
    ///
    /// # Errors
    ///
    /// Propagates the login failure.
    pub async fn relogin(&self) -> Result<(), DmeError> {
        let observed = self.current_token().await;
        self.relogin_from(observed.as_deref()).await
    }

    /// Re-authenticates unless the token changed since `observed` was read.
    pub(crate) async fn relogin_from(&self, observed: Option<&str>) -> Result<(), DmeError> {
        let _guard = self.relogin_lock.lock().await;
        let current = self.current_session().await;
        let current_token = current.as_deref().map(Session::token);
        if current_token.is_some() && current_token != observed {
            tracing::debug!(backend_id = %self.backend_id, "session already refreshed");
            return Ok(());
        }

        if let Some(stale) = current {
            *self.session.write().await = None;
            if let Err(err) = self.close(&stale).await {
                tracing::warn!(backend_id = %self.backend_id, error = %err, "logout of stale session failed");
            }
        }
        self.login_unlocked().await
    }

    /// Logs out and clears the session.
    ///
    /// # Errors
    ///
    /// Returns the logout request failure; the session is cleared either way.
    pub async fn logout(&self) -> Result<(), DmeError> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };
        self.close(&session).await?;
        tracing::info!(backend_id = %self.backend_id, "logged out");
        Ok(())
    }

    async fn close(&self, session: &Session) -> Result<(), DmeError> {
        let response = self
            .execute(&session.route(), Method::Delete, paths::SESSIONS, None)
            .await?;
        decode::<IgnoredAny>(paths::SESSIONS, &response).map(|_| ())
    }

    /// Returns the active session, if any.
    pub async fn current_session(&self) -> Option<Arc<Session>> {
        self.session.read().await.clone()
    }

    pub(crate) async fn current_token(&self) -> Option<String> {
        self.current_session()
            .await
            .map(|session| session.token.clone())
    }

    /// Sends one request over the active session and decodes the answer.
    ///
    /// No relogin or retry happens here; see the graceful helpers for that.
    ///
    /// # Errors
    ///
    /// Returns [`DmeError::Unconnected`] without a session or on transport
    /// failure, and any envelope or decode error otherwise.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, DmeError> {
        let session = self
            .current_session()
            .await
            .ok_or_else(|| DmeError::unconnected(path, "no active session"))?;
        let response = self.execute(&session.route(), method, path, body).await?;
        decode(path, &response)
    }

    async fn execute(
        &self,
        route: &Route<'_>,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<HttpResponse, DmeError> {
        let url = format!("{}{path}", route.base_url);
        let request_id = Uuid::new_v4();
        let mode = LogMode::for_request(method, path);
        mode.log_request(request_id, method, &url, body.as_ref());

        let _client_permit = self
            .client_gate
            .acquire()
            .await
            .map_err(|err| DmeError::Gate(err.to_string()))?;
        let device_gate = self
            .device_gates
            .gate(self.identity.get().map(|identity| identity.device_sn.as_str()));
        let _device_permit = device_gate
            .acquire_owned()
            .await
            .map_err(|err| DmeError::Gate(err.to_string()))?;

        let request = HttpRequest {
            method,
            url: url.clone(),
            token: route.token.map(str::to_owned),
            body,
        };
        let response = route.transport.send(request).await.map_err(|err| {
            tracing::warn!(request_id = %request_id, method = %method, url = %url, error = %err, "request failed");
            DmeError::unconnected(url.as_str(), err)
        })?;
        mode.log_response(request_id, &url, &response);
        Ok(response)
    }
}
