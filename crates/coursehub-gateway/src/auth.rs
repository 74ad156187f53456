//! Session authentication for connections and API requests.

use crate::bridge::PersistenceBridge;
use crate::error::GatewayError;
use crate::Result;
use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use coursehub_core::Identity;
use tracing::debug;

/// A session token presented by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Opaque session token.
    pub token: String,
}

impl Credentials {
    /// Wrap a token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Extract credentials from an upgrade or API request.
    ///
    /// Sources are checked in order: `Authorization: Bearer`, the session
    /// cookie, then the `token` query parameter.
    pub fn from_parts(headers: &HeaderMap, query: Option<&str>, cookie_name: &str) -> Option<Self> {
        bearer_token(headers)
            .or_else(|| cookie_token(headers, cookie_name))
            .or_else(|| query.and_then(query_token))
            .map(Self::new)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn cookie_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn query_token(query: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, value)| *name == "token" && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Resolves credentials to an identity.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Authenticate a caller. Fails with [`GatewayError::Auth`] when the
    /// credentials do not name a live session.
    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity>;
}

/// Authenticator backed by stored login sessions.
pub struct SessionAuthenticator {
    bridge: PersistenceBridge,
}

impl SessionAuthenticator {
    /// Create an authenticator over the store.
    pub fn new(bridge: PersistenceBridge) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl Authenticator for SessionAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity> {
        let user = self
            .bridge
            .resolve_session(credentials.token.clone())
            .await?
            .ok_or_else(|| GatewayError::Auth("invalid or expired session".to_string()))?;

        debug!("Authenticated session for {}", user.username);
        Ok(Identity::for_user(&user))
    }
}
