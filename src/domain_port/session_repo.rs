use crate::domain_model::*;
use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum SessionRepoError {
    #[error("session not found")]
    NotFound,
    #[error("store error: {0}")]
    Store(String),
}

#[async_trait::async_trait]
pub trait SessionRepo: Send + Sync {
    async fn create(&self, session: &Session) -> Result<(), SessionRepoError>;

    /// Exact match on the access token string. Invalidated rows are returned too.
    async fn find_by_access_token(&self, token: &str) -> Result<Session, SessionRepoError>;

    /// Exact match on the refresh token string. Invalidated rows are returned too.
    async fn find_by_refresh_token(&self, token: &str) -> Result<Session, SessionRepoError>;

    async fn find_active_by_user_id(&self, user_id: UserId)
    -> Result<Vec<Session>, SessionRepoError>;

    /// Overwrites the row with the same id.
    async fn update(&self, session: &Session) -> Result<(), SessionRepoError>;

    /// Writes the rotated token pair only if the row is still active and its
    /// refresh token is still `replaced_refresh_token`. Otherwise `NotFound`.
    async fn rotate(
        &self,
        session: &Session,
        replaced_refresh_token: &str,
    ) -> Result<(), SessionRepoError>;

    async fn invalidate_by_user_id(
        &self,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<u64, SessionRepoError>;

    /// Invalidates active rows whose refresh expiry is at or before `now`.
    async fn invalidate_expired(&self, now: DateTime<Utc>) -> Result<u64, SessionRepoError>;

    /// Hard delete. Administrative only.
    async fn delete(&self, id: SessionId) -> Result<(), SessionRepoError>;
}
