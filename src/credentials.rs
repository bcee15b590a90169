//! Credential lookup for backend logins.
//!
//! The client never stores passwords itself: every login asks a
//! [`CredentialStore`] for a fresh [`AuthInfo`], copies the password into the
//! request, and lets the value wipe itself on drop.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::client::DmeError;

/// User name and password for one backend.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AuthInfo {
    /// Login user name.
    pub user: String,
    /// Login password; wiped when the value is dropped.
    pub password: String,
}

impl AuthInfo {
    /// Creates credentials from a user name and password.
    #[must_use]
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for AuthInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthInfo")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Future returned by [`CredentialStore`] lookups.
pub type CredentialFuture<'a> = Pin<Box<dyn Future<Output = Result<AuthInfo, DmeError>> + Send + 'a>>;

/// Source of backend credentials.
pub trait CredentialStore: Send + Sync {
    /// Returns the credentials configured for `backend_id`.
    fn auth_info_for_backend<'a>(&'a self, backend_id: &'a str) -> CredentialFuture<'a>;

    /// Returns the credentials stored in the secret `namespace/name`.
    fn auth_info_from_secret<'a>(&'a self, name: &'a str, namespace: &'a str)
    -> CredentialFuture<'a>;
}

/// In-memory credential store populated up front.
#[derive(Clone, Debug, Default)]
pub struct StaticCredentials {
    backends: HashMap<String, AuthInfo>,
    secrets: HashMap<(String, String), AuthInfo>,
}

impl StaticCredentials {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers credentials for a backend.
    #[must_use]
    pub fn with_backend(mut self, backend_id: impl Into<String>, auth: AuthInfo) -> Self {
        self.backends.insert(backend_id.into(), auth);
        self
    }

    /// Registers credentials under a secret name and namespace.
    #[must_use]
    pub fn with_secret(
        mut self,
        name: impl Into<String>,
        namespace: impl Into<String>,
        auth: AuthInfo,
    ) -> Self {
        self.secrets.insert((namespace.into(), name.into()), auth);
        self
    }
}

impl CredentialStore for StaticCredentials {
    fn auth_info_for_backend<'a>(&'a self, backend_id: &'a str) -> CredentialFuture<'a> {
        Box::pin(async move {
            self.backends
                .get(backend_id)
                .cloned()
                .ok_or_else(|| DmeError::Credentials {
                    backend_id: backend_id.to_owned(),
                    message: String::from("no credentials registered"),
                })
        })
    }

    fn auth_info_from_secret<'a>(
        &'a self,
        name: &'a str,
        namespace: &'a str,
    ) -> CredentialFuture<'a> {
        Box::pin(async move {
            self.secrets
                .get(&(namespace.to_owned(), name.to_owned()))
                .cloned()
                .ok_or_else(|| DmeError::Credentials {
                    backend_id: format!("{namespace}/{name}"),
                    message: String::from("secret not found"),
                })
        })
    }
}
