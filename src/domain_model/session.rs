use crate::domain_model::{TokenPair, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct SessionId(pub uuid::Uuid);

impl SessionId {
    pub fn new_v4() -> Self {
        SessionId(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(SessionId)
    }
}

/// Lifecycle of a session row. `Invalidated` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Invalidated { at: DateTime<Utc> },
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub state: SessionState,
}

impl Session {
    pub fn new(id: SessionId, user_id: UserId, pair: &TokenPair, now: DateTime<Utc>) -> Self {
        Session {
            id,
            user_id,
            access_token: pair.access_token.0.clone(),
            refresh_token: pair.refresh_token.0.clone(),
            access_expires_at: pair.access_token_expires_at,
            refresh_expires_at: pair.refresh_token_expires_at,
            created_at: now,
            updated_at: now,
            state: SessionState::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active)
    }

    pub fn access_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && now < self.access_expires_at
    }

    pub fn refresh_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && now < self.refresh_expires_at
    }

    /// Marks the session invalidated. An already invalidated session keeps its
    /// original timestamp.
    pub fn invalidate(&mut self, now: DateTime<Utc>) {
        if self.is_active() {
            self.state = SessionState::Invalidated { at: now };
            self.updated_at = now;
        }
    }

    /// Replaces the token pair in place; identity and creation time are kept.
    pub fn rotate(&mut self, pair: &TokenPair, now: DateTime<Utc>) {
        debug_assert!(self.is_active(), "rotating an invalidated session");
        self.access_token = pair.access_token.0.clone();
        self.refresh_token = pair.refresh_token.0.clone();
        self.access_expires_at = pair.access_token_expires_at;
        self.refresh_expires_at = pair.refresh_token_expires_at;
        self.updated_at = now;
    }

    pub fn invalidated_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            SessionState::Active => None,
            SessionState::Invalidated { at } => Some(at),
        }
    }
}
