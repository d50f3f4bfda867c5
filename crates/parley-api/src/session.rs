//! Session/identity store.
//!
//! Holds the opaque session token for the lifetime of the client and
//! decodes identity claims from it on demand. The token is optionally
//! mirrored to a file so a restarted client resumes the same session.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use tracing::{info, warn};

use parley_types::api::Claims;

use crate::error::SessionError;

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

#[derive(Default)]
struct SessionInner {
    token: RwLock<Option<String>>,
    token_file: Option<PathBuf>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store backed by `path`. An existing non-empty file
    /// becomes the current token.
    pub fn with_token_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let token = match std::fs::read_to_string(&path) {
            Ok(contents) => Some(contents.trim().to_string()).filter(|t| !t.is_empty()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Cannot read token file {}: {}", path.display(), e);
                None
            }
        };

        if token.is_some() {
            info!("Resumed session from {}", path.display());
        }

        Self {
            inner: Arc::new(SessionInner {
                token: RwLock::new(token),
                token_file: Some(path),
            }),
        }
    }

    pub fn login(&self, token: impl Into<String>) {
        let token = token.into();
        if let Some(path) = &self.inner.token_file {
            persist(path, &token);
        }
        *self.inner.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    pub fn logout(&self) {
        let previous = self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(path) = &self.inner.token_file {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Cannot remove token file {}: {}", path.display(), e);
                }
            }
        }

        if previous.is_some() {
            info!("Session ended");
        }
    }

    pub fn token(&self) -> Option<String> {
        self.inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Decode identity claims from the current token. Only call this where
    /// the caller already knows the session is authenticated.
    pub fn claims(&self) -> Result<Claims, SessionError> {
        let token = self.token().ok_or(SessionError::Missing)?;
        decode_claims(&token)
    }
}

/// Read the payload of a session token without checking its signature.
pub fn decode_claims(token: &str) -> Result<Claims, SessionError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

fn persist(path: &Path, token: &str) {
    if let Err(e) = std::fs::write(path, token) {
        warn!("Cannot write token file {}: {}", path.display(), e);
    }
}
