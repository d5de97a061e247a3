use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Session rows held in process memory. Used by the `memory` backend and tests.
#[derive(Default)]
pub struct InMemorySessionRepo {
    sessions: DashMap<SessionId, Session>,
}

impl InMemorySessionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, id: SessionId) -> Option<Session> {
        self.sessions.get(&id).map(|row| row.value().clone())
    }

    fn find_by(&self, pred: impl Fn(&Session) -> bool) -> Result<Session, SessionRepoError> {
        self.sessions
            .iter()
            .find(|row| pred(row.value()))
            .map(|row| row.value().clone())
            .ok_or(SessionRepoError::NotFound)
    }

    fn invalidate_where(&self, at: DateTime<Utc>, pred: impl Fn(&Session) -> bool) -> u64 {
        let mut count = 0;
        for mut row in self.sessions.iter_mut() {
            let session = row.value_mut();
            if session.is_active() && pred(session) {
                session.invalidate(at);
                count += 1;
            }
        }
        count
    }
}

#[async_trait::async_trait]
impl SessionRepo for InMemorySessionRepo {
    async fn create(&self, session: &Session) -> Result<(), SessionRepoError> {
        if self.sessions.contains_key(&session.id) {
            return Err(SessionRepoError::Store(format!(
                "duplicate session id {}",
                session.id
            )));
        }
        self.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn find_by_access_token(&self, token: &str) -> Result<Session, SessionRepoError> {
        self.find_by(|s| s.access_token == token)
    }

    async fn find_by_refresh_token(&self, token: &str) -> Result<Session, SessionRepoError> {
        self.find_by(|s| s.refresh_token == token)
    }

    async fn find_active_by_user_id(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Session>, SessionRepoError> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|row| row.user_id == user_id && row.is_active())
            .map(|row| row.value().clone())
            .collect();
        sessions.sort_by_key(|s| s.created_at);
        Ok(sessions)
    }

    async fn update(&self, session: &Session) -> Result<(), SessionRepoError> {
        let mut row = self
            .sessions
            .get_mut(&session.id)
            .ok_or(SessionRepoError::NotFound)?;
        *row = session.clone();
        Ok(())
    }

    async fn rotate(
        &self,
        session: &Session,
        replaced_refresh_token: &str,
    ) -> Result<(), SessionRepoError> {
        // the shard lock held by get_mut makes check-and-write atomic
        match self.sessions.get_mut(&session.id) {
            Some(mut row) if row.is_active() && row.refresh_token == replaced_refresh_token => {
                *row = session.clone();
                Ok(())
            }
            _ => Err(SessionRepoError::NotFound),
        }
    }

    async fn invalidate_by_user_id(
        &self,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<u64, SessionRepoError> {
        Ok(self.invalidate_where(at, |s| s.user_id == user_id))
    }

    async fn invalidate_expired(&self, now: DateTime<Utc>) -> Result<u64, SessionRepoError> {
        Ok(self.invalidate_where(now, |s| s.refresh_expires_at <= now))
    }

    async fn delete(&self, id: SessionId) -> Result<(), SessionRepoError> {
        self.sessions
            .remove(&id)
            .map(|_| ())
            .ok_or(SessionRepoError::NotFound)
    }
}
