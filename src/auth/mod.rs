use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::fmt;
use uuid::Uuid;


/// Authentication and session errors.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    /// No Authorization header (or token parameter) at all.
    Missing,
    /// Header present but not "Bearer <token>", or the token is empty.
    InvalidFormat,
    /// Token was never issued by this process, or was already pruned.
    Unknown,
    /// Token issued but past its expiry.
    Expired,
    /// Login credentials do not match the configuration.
    BadCredentials,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Missing => write!(f, "authorization token not provided"),
            AuthError::InvalidFormat => write!(f, "invalid authorization token format"),
            AuthError::Unknown => write!(f, "unknown session token"),
            AuthError::Expired => write!(f, "session token is expired"),
            AuthError::BadCredentials => write!(f, "invalid user credentials"),
        }
    }
}

impl std::error::Error for AuthError {}

/// A live login session.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub user: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates opaque session tokens against the configured
/// credentials.
pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
    user: String,
    password: String,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(user: impl Into<String>, password: impl Into<String>, ttl_minutes: i64) -> Self {
        Self {
            sessions: DashMap::new(),
            user: user.into(),
            password: password.into(),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Checks credentials and issues a fresh token.
    pub fn login(&self, user: &str, password: &str) -> Result<String, AuthError> {
        if user != self.user || password != self.password {
            return Err(AuthError::BadCredentials);
        }

        let token = Uuid::new_v4().to_string();
        self.sessions.insert(
            token.clone(),
            Session {
                user: user.to_string(),
                expires_at: Utc::now() + self.ttl,
            },
        );
        Ok(token)
    }

    /// Validates a token, pruning it if it has expired.
    pub fn validate(&self, token: &str) -> Result<Session, AuthError> {
        let session = {
            let entry = self.sessions.get(token).ok_or(AuthError::Unknown)?;
            entry.clone()
        };
        if session.expires_at < Utc::now() {
            self.sessions.remove(token);
            return Err(AuthError::Expired);
        }
        Ok(session)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Pulls the bearer token out of an Authorization header.
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthError::Missing)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat)?;

    let (scheme, token) = header.split_once(' ').ok_or(AuthError::InvalidFormat)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidFormat);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidFormat);
    }
    Ok(token.to_string())
}
