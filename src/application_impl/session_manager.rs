use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use chrono::Utc;
use std::sync::Arc;

pub struct SessionManager {
    session_repo: Arc<dyn SessionRepo>,
    token_codec: Arc<dyn TokenCodec>,
}

impl SessionManager {
    pub fn new(session_repo: Arc<dyn SessionRepo>, token_codec: Arc<dyn TokenCodec>) -> Self {
        Self {
            session_repo,
            token_codec,
        }
    }

    fn ensure_owner(expected: UserId, found: UserId) -> Result<(), SessionError> {
        if expected != found {
            return Err(SessionError::UserMismatch { expected, found });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionService for SessionManager {
    async fn create_session(&self, user_id: UserId) -> Result<TokenPair, SessionError> {
        self.create_session_with_email(user_id, None).await
    }

    async fn create_session_with_email(
        &self,
        user_id: UserId,
        email: Option<String>,
    ) -> Result<TokenPair, SessionError> {
        let pair = self
            .token_codec
            .generate_token_pair(user_id, email.as_deref())
            .await?;

        let session = Session::new(SessionId::new_v4(), user_id, &pair, Utc::now());
        self.session_repo.create(&session).await?;

        info!(session_id = %session.id, %user_id, "session created");
        Ok(pair)
    }

    async fn validate_access_token(&self, access_token: &str) -> Result<Session, SessionError> {
        let claims = self
            .token_codec
            .validate_access_token(access_token)
            .await
            .inspect_err(|e| debug!(error = %e, "access token rejected"))?;

        let session = self.session_repo.find_by_access_token(access_token).await?;

        if !session.access_usable_at(Utc::now()) {
            return Err(SessionError::SessionExpiredOrInvalidated {
                session_id: session.id,
            });
        }
        Self::ensure_owner(session.user_id, claims.user_id)?;

        Ok(session)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        let claims = self
            .token_codec
            .validate_refresh_token(refresh_token)
            .await
            .inspect_err(|e| debug!(error = %e, "refresh token rejected"))?;

        let mut session = self.session_repo.find_by_refresh_token(refresh_token).await?;

        if !session.refresh_usable_at(Utc::now()) {
            return Err(SessionError::SessionExpiredOrInvalidated {
                session_id: session.id,
            });
        }
        Self::ensure_owner(session.user_id, claims.user_id)?;

        let pair = self
            .token_codec
            .generate_token_pair(session.user_id, claims.email.as_deref())
            .await?;

        // Rotation: same row, new pair. Conditional on the old refresh token.
        session.rotate(&pair, Utc::now());
        match self.session_repo.rotate(&session, refresh_token).await {
            Ok(()) => {}
            Err(SessionRepoError::NotFound) => {
                warn!(session_id = %session.id, "refresh token already rotated");
                return Err(SessionError::SessionNotFound);
            }
            Err(SessionRepoError::Store(e)) => return Err(SessionError::PersistenceFailure(e)),
        }

        info!(session_id = %session.id, user_id = %session.user_id, "session rotated");
        Ok(pair)
    }

    async fn logout(&self, user_id: UserId, access_token: &str) -> Result<(), SessionError> {
        let mut session = self.session_repo.find_by_access_token(access_token).await?;
        Self::ensure_owner(user_id, session.user_id)?;

        if !session.is_active() {
            debug!(session_id = %session.id, "session already invalidated");
            return Ok(());
        }

        session.invalidate(Utc::now());
        self.session_repo.update(&session).await?;

        info!(session_id = %session.id, %user_id, "session logged out");
        Ok(())
    }

    async fn invalidate_all_user_sessions(&self, user_id: UserId) -> Result<u64, SessionError> {
        let count = self
            .session_repo
            .invalidate_by_user_id(user_id, Utc::now())
            .await?;
        info!(%user_id, count, "user sessions invalidated");
        Ok(count)
    }

    async fn cleanup_expired_sessions(&self) -> Result<u64, SessionError> {
        let count = self.session_repo.invalidate_expired(Utc::now()).await?;
        info!(count, "expired sessions swept");
        Ok(count)
    }

    async fn active_sessions(&self, user_id: UserId) -> Result<Vec<Session>, SessionError> {
        Ok(self.session_repo.find_active_by_user_id(user_id).await?)
    }
}
