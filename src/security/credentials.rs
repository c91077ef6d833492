//! Credential gate.
//!
//! Validates HTTP Basic `user:secret` pairs against the static token table
//! loaded at startup. The table is read-only afterwards, so the store is
//! shared between request tasks without locking.

use std::collections::HashMap;
use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::config::schema::CredentialConfig;

/// Why a request failed authentication.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authorization required")]
    Missing,
    #[error("Authorization header is malformed")]
    Malformed,
    #[error("Only Basic Authorization is accepted")]
    UnsupportedScheme,
    #[error("Unknown user")]
    UnknownUser,
    #[error("Incorrect token")]
    IncorrectSecret,
}

impl AuthError {
    /// Short label for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::Missing => "missing",
            AuthError::Malformed => "malformed",
            AuthError::UnsupportedScheme => "scheme",
            AuthError::UnknownUser => "unknown_user",
            AuthError::IncorrectSecret => "incorrect_secret",
        }
    }
}

/// An authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub name: String,
    pub stage: String,
    pub deprecated: bool,
}

struct Entry {
    secret: Vec<u8>,
    credential: Credential,
}

/// The token table.
#[derive(Default)]
pub struct CredentialStore {
    entries: HashMap<String, Entry>,
}

impl CredentialStore {
    pub fn from_config(table: &HashMap<String, CredentialConfig>) -> Self {
        let entries = table
            .iter()
            .map(|(user, cfg)| {
                let entry = Entry {
                    secret: cfg.secret.as_bytes().to_vec(),
                    credential: Credential {
                        name: user.clone(),
                        stage: cfg.stage.clone(),
                        deprecated: cfg.deprecated,
                    },
                };
                (user.clone(), entry)
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Authenticate a raw `Authorization` header value.
    pub fn authenticate(&self, header: Option<&[u8]>) -> Result<&Credential, AuthError> {
        let header = header.ok_or(AuthError::Missing)?;
        if header.is_empty() {
            return Err(AuthError::Missing);
        }

        let split = header
            .iter()
            .position(|&b| b == b' ')
            .ok_or(AuthError::Malformed)?;
        let (scheme, encoded) = (&header[..split], &header[split + 1..]);
        if !scheme.eq_ignore_ascii_case(b"Basic") {
            return Err(AuthError::UnsupportedScheme);
        }

        let decoded = STANDARD
            .decode(encoded.trim_ascii())
            .map_err(|_| AuthError::Malformed)?;
        let colon = decoded
            .iter()
            .position(|&b| b == b':')
            .ok_or(AuthError::Malformed)?;

        let user = std::str::from_utf8(&decoded[..colon]).map_err(|_| AuthError::UnknownUser)?;
        self.check(user, &decoded[colon + 1..])
    }

    /// Check a decoded user/secret pair.
    pub fn check(&self, user: &str, secret: &[u8]) -> Result<&Credential, AuthError> {
        let entry = self.entries.get(user).ok_or(AuthError::UnknownUser)?;
        if bool::from(entry.secret.as_slice().ct_eq(secret)) {
            Ok(&entry.credential)
        } else {
            Err(AuthError::IncorrectSecret)
        }
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("users", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
