use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

const SELECT_COLUMNS: &str = r#"
SELECT id, user_id, access_token, refresh_token,
       access_token_expires_at, refresh_token_expires_at,
       created_at, updated_at, is_deleted, deleted_at
FROM auth_session
"#;

pub struct MySqlSessionRepo {
    pool: MySqlPool,
}

impl MySqlSessionRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlSessionRepo { pool }
    }

    #[inline]
    fn sid_as_bytes(id: &SessionId) -> &[u8] {
        id.0.as_bytes()
    }

    #[inline]
    fn sid_from_bytes(id: &[u8]) -> Result<SessionId, SessionRepoError> {
        Ok(SessionId(
            Uuid::from_slice(id).map_err(|e| SessionRepoError::Store(e.to_string()))?,
        ))
    }

    fn row_to_session(row: MySqlRow) -> Result<Session, SessionRepoError> {
        fn get<'r, T>(row: &'r MySqlRow, column: &str) -> Result<T, SessionRepoError>
        where
            T: sqlx::Decode<'r, sqlx::MySql> + sqlx::Type<sqlx::MySql>,
        {
            row.try_get(column)
                .map_err(|e| SessionRepoError::Store(format!("column {column}: {e}")))
        }

        let id_bytes: Vec<u8> = get(&row, "id")?;
        let is_deleted: bool = get(&row, "is_deleted")?;
        let deleted_at: Option<DateTime<Utc>> = get(&row, "deleted_at")?;
        let updated_at: DateTime<Utc> = get(&row, "updated_at")?;

        let state = if is_deleted {
            SessionState::Invalidated {
                at: deleted_at.unwrap_or(updated_at),
            }
        } else {
            SessionState::Active
        };

        Ok(Session {
            id: Self::sid_from_bytes(&id_bytes)?,
            user_id: UserId(get(&row, "user_id")?),
            access_token: get(&row, "access_token")?,
            refresh_token: get(&row, "refresh_token")?,
            access_expires_at: get(&row, "access_token_expires_at")?,
            refresh_expires_at: get(&row, "refresh_token_expires_at")?,
            created_at: get(&row, "created_at")?,
            updated_at,
            state,
        })
    }

    async fn fetch_one_by(&self, column: &str, token: &str) -> Result<Session, SessionRepoError> {
        let sql = format!("{SELECT_COLUMNS} WHERE {column} = ? LIMIT 1");
        let row_opt: Option<MySqlRow> = sqlx::query(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SessionRepoError::Store(e.to_string()))?;

        row_opt
            .map(Self::row_to_session)
            .transpose()?
            .ok_or(SessionRepoError::NotFound)
    }
}

#[async_trait::async_trait]
impl SessionRepo for MySqlSessionRepo {
    async fn create(&self, session: &Session) -> Result<(), SessionRepoError> {
        sqlx::query(
            r#"
INSERT INTO auth_session (id, user_id, access_token, refresh_token,
                          access_token_expires_at, refresh_token_expires_at,
                          created_at, updated_at, is_deleted, deleted_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(Self::sid_as_bytes(&session.id))
        .bind(session.user_id)
        .bind(&session.access_token)
        .bind(&session.refresh_token)
        .bind(session.access_expires_at)
        .bind(session.refresh_expires_at)
        .bind(session.created_at)
        .bind(session.updated_at)
        .bind(!session.is_active())
        .bind(session.invalidated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| SessionRepoError::Store(e.to_string()))?;

        Ok(())
    }

    async fn find_by_access_token(&self, token: &str) -> Result<Session, SessionRepoError> {
        self.fetch_one_by("access_token", token).await
    }

    async fn find_by_refresh_token(&self, token: &str) -> Result<Session, SessionRepoError> {
        self.fetch_one_by("refresh_token", token).await
    }

    async fn find_active_by_user_id(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Session>, SessionRepoError> {
        let sql =
            format!("{SELECT_COLUMNS} WHERE user_id = ? AND is_deleted = FALSE ORDER BY created_at");
        let rows: Vec<MySqlRow> = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SessionRepoError::Store(e.to_string()))?;

        rows.into_iter().map(Self::row_to_session).collect()
    }

    async fn update(&self, session: &Session) -> Result<(), SessionRepoError> {
        let result = sqlx::query(
            r#"
UPDATE auth_session
SET access_token = ?, refresh_token = ?,
    access_token_expires_at = ?, refresh_token_expires_at = ?,
    updated_at = ?, is_deleted = ?, deleted_at = ?
WHERE id = ?
"#,
        )
        .bind(&session.access_token)
        .bind(&session.refresh_token)
        .bind(session.access_expires_at)
        .bind(session.refresh_expires_at)
        .bind(session.updated_at)
        .bind(!session.is_active())
        .bind(session.invalidated_at())
        .bind(Self::sid_as_bytes(&session.id))
        .execute(&self.pool)
        .await
        .map_err(|e| SessionRepoError::Store(e.to_string()))?;

        // MySQL reports matched-but-unchanged rows as 0 affected; re-check existence.
        if result.rows_affected() == 0 {
            let exists: Option<MySqlRow> = sqlx::query("SELECT 1 FROM auth_session WHERE id = ?")
                .bind(Self::sid_as_bytes(&session.id))
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| SessionRepoError::Store(e.to_string()))?;
            if exists.is_none() {
                return Err(SessionRepoError::NotFound);
            }
        }
        Ok(())
    }

    async fn rotate(
        &self,
        session: &Session,
        replaced_refresh_token: &str,
    ) -> Result<(), SessionRepoError> {
        let result = sqlx::query(
            r#"
UPDATE auth_session
SET access_token = ?, refresh_token = ?,
    access_token_expires_at = ?, refresh_token_expires_at = ?,
    updated_at = ?
WHERE id = ? AND refresh_token = ? AND is_deleted = FALSE
"#,
        )
        .bind(&session.access_token)
        .bind(&session.refresh_token)
        .bind(session.access_expires_at)
        .bind(session.refresh_expires_at)
        .bind(session.updated_at)
        .bind(Self::sid_as_bytes(&session.id))
        .bind(replaced_refresh_token)
        .execute(&self.pool)
        .await
        .map_err(|e| SessionRepoError::Store(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(SessionRepoError::NotFound);
        }
        Ok(())
    }

    async fn invalidate_by_user_id(
        &self,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<u64, SessionRepoError> {
        let result = sqlx::query(
            r#"
UPDATE auth_session
SET is_deleted = TRUE, deleted_at = ?, updated_at = ?
WHERE user_id = ? AND is_deleted = FALSE
"#,
        )
        .bind(at)
        .bind(at)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| SessionRepoError::Store(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn invalidate_expired(&self, now: DateTime<Utc>) -> Result<u64, SessionRepoError> {
        let result = sqlx::query(
            r#"
UPDATE auth_session
SET is_deleted = TRUE, deleted_at = ?, updated_at = ?
WHERE is_deleted = FALSE AND refresh_token_expires_at <= ?
"#,
        )
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| SessionRepoError::Store(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: SessionId) -> Result<(), SessionRepoError> {
        let result = sqlx::query("DELETE FROM auth_session WHERE id = ?")
            .bind(Self::sid_as_bytes(&id))
            .execute(&self.pool)
            .await
            .map_err(|e| SessionRepoError::Store(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(SessionRepoError::NotFound);
        }
        Ok(())
    }
}
