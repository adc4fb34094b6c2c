//! Token-backed sessions and role checks.
//!
//! Sessions are held by a [`SessionRegistry`] owned by whoever serves requests
//! and passed to handlers explicitly. Tokens and their users come from
//! configuration (`APP_API_TOKENS`); a token must be logged in before it
//! resolves to a session.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    /// Admins may do everything a user may.
    pub const fn permits(self, required: Role) -> bool {
        matches!((self, required), (Self::Admin, _) | (Self::User, Self::User))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = SessionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(SessionError::UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub username: String,
    pub role: Role,
}

/// An authenticated caller for the lifetime of one login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    #[serde(skip)]
    pub token: String,
    pub user: SessionUser,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn require(&self, role: Role) -> Result<(), SessionError> {
        if self.user.role.permits(role) {
            Ok(())
        } else {
            Err(SessionError::Forbidden {
                username: self.user.username.clone(),
                required: role,
            })
        }
    }

    pub fn is_admin(&self) -> bool {
        self.user.role == Role::Admin
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("user '{username}' lacks the {required} role")]
    Forbidden { username: String, required: Role },
    #[error("malformed token entry '{0}', expected token=username:role")]
    MalformedEntry(String),
    #[error("unknown role '{0}', expected admin or user")]
    UnknownRole(String),
    #[error("session store unavailable")]
    Unavailable,
}

/// Known tokens and the user each one authenticates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenTable {
    entries: BTreeMap<String, SessionUser>,
}

impl TokenTable {
    /// Parses `token=username:role` entries separated by commas. Blank entries are skipped.
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        let mut entries = BTreeMap::new();
        for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            let malformed = || SessionError::MalformedEntry(entry.to_string());
            let (token, identity) = entry.split_once('=').ok_or_else(malformed)?;
            let (username, role) = identity.split_once(':').ok_or_else(malformed)?;
            let (token, username) = (token.trim(), username.trim());
            if token.is_empty() || username.is_empty() {
                return Err(malformed());
            }

            entries.insert(
                token.to_string(),
                SessionUser {
                    username: username.to_string(),
                    role: role.parse()?,
                },
            );
        }
        Ok(Self { entries })
    }

    pub fn with_entry(mut self, token: impl Into<String>, username: impl Into<String>, role: Role) -> Self {
        self.entries.insert(
            token.into(),
            SessionUser {
                username: username.into(),
                role,
            },
        );
        self
    }

    pub fn lookup(&self, token: &str) -> Option<&SessionUser> {
        self.entries.get(token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Active sessions keyed by token.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    tokens: TokenTable,
    active: Mutex<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new(tokens: TokenTable) -> Self {
        Self {
            tokens,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Starts a session for a configured token. Logging in again keeps the
    /// original session.
    pub fn login(&self, token: &str, now: DateTime<Utc>) -> Result<Session, SessionError> {
        let user = self
            .tokens
            .lookup(token)
            .cloned()
            .ok_or(SessionError::InvalidToken)?;

        let mut active = self.active.lock().map_err(|_| SessionError::Unavailable)?;
        let session = active
            .entry(token.to_string())
            .or_insert_with(|| Session {
                token: token.to_string(),
                user,
                started_at: now,
            })
            .clone();
        Ok(session)
    }

    pub fn logout(&self, token: &str) -> Result<Session, SessionError> {
        let mut active = self.active.lock().map_err(|_| SessionError::Unavailable)?;
        active.remove(token).ok_or(SessionError::InvalidToken)
    }

    pub fn resolve(&self, token: &str) -> Result<Session, SessionError> {
        let active = self.active.lock().map_err(|_| SessionError::Unavailable)?;
        active.get(token).cloned().ok_or(SessionError::InvalidToken)
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().map(|active| active.len()).unwrap_or(0)
    }
}
