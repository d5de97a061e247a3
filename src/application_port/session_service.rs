use crate::domain_model::{Session, SessionId, TokenPair, TokenType, UserId};
use crate::domain_port::SessionRepoError;

/// Why a token failed cryptographic validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFault {
    Expired,
    NotYetValid,
    BadSignature,
    Malformed,
}

impl std::fmt::Display for TokenFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TokenFault::Expired => "expired",
            TokenFault::NotYetValid => "not yet valid",
            TokenFault::BadSignature => "bad signature",
            TokenFault::Malformed => "malformed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("token invalid: {0}")]
    TokenInvalid(TokenFault),
    #[error("wrong token type: expected {expected}, found {found}")]
    WrongTokenType {
        expected: TokenType,
        found: TokenType,
    },
    #[error("session not found")]
    SessionNotFound,
    #[error("session {session_id} expired or invalidated")]
    SessionExpiredOrInvalidated { session_id: SessionId },
    #[error("user mismatch: expected {expected}, found {found}")]
    UserMismatch { expected: UserId, found: UserId },
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SessionRepoError> for SessionError {
    fn from(err: SessionRepoError) -> Self {
        match err {
            SessionRepoError::NotFound => SessionError::SessionNotFound,
            SessionRepoError::Store(e) => SessionError::PersistenceFailure(e),
        }
    }
}

/// Decides whether a token/session combination is usable and owns every
/// session state transition.
#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    async fn create_session(&self, user_id: UserId) -> Result<TokenPair, SessionError>;

    async fn create_session_with_email(
        &self,
        user_id: UserId,
        email: Option<String>,
    ) -> Result<TokenPair, SessionError>;

    async fn validate_access_token(&self, access_token: &str) -> Result<Session, SessionError>;

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, SessionError>;

    async fn logout(&self, user_id: UserId, access_token: &str) -> Result<(), SessionError>;

    /// Returns the number of sessions that were invalidated.
    async fn invalidate_all_user_sessions(&self, user_id: UserId) -> Result<u64, SessionError>;

    /// Invalidates sessions whose refresh expiry has elapsed. Returns the count.
    async fn cleanup_expired_sessions(&self) -> Result<u64, SessionError>;

    async fn active_sessions(&self, user_id: UserId) -> Result<Vec<Session>, SessionError>;
}
