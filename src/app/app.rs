use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::logger::*;
use crate::settings::{Settings, StoreBackend};
use sqlx::{MySql, Pool};
use std::sync::Arc;

/// Codec, repository and manager wired from settings.
pub struct App {
    pub session_service: Arc<dyn SessionService>,
    pub session_repo: Arc<dyn SessionRepo>,
    pool: Option<Pool<MySql>>,
}

impl App {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::try_new(JwtConfig {
            issuer: settings.token.issuer.clone(),
            access_ttl: settings.token.access_ttl(),
            refresh_ttl: settings.token.refresh_ttl(),
            leeway: settings.token.leeway(),
            signing_key: settings.token.signing_key()?,
        })?);

        let mut pool = None;
        let session_repo: Arc<dyn SessionRepo> = match settings.store.backend {
            StoreBackend::Memory => {
                warn!("using in-memory session store; sessions do not survive restarts");
                Arc::new(InMemorySessionRepo::new())
            }
            StoreBackend::Mysql => {
                let dsn = settings
                    .store
                    .dsn
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("store.dsn is required for the mysql backend"))?;
                let mysql = Pool::<MySql>::connect(dsn).await?;
                pool = Some(mysql.clone());
                Arc::new(MySqlSessionRepo::new(mysql))
            }
        };

        let session_service: Arc<dyn SessionService> =
            Arc::new(SessionManager::new(session_repo.clone(), token_codec));

        info!(backend = ?settings.store.backend, "session service ready");

        Ok(Self {
            session_service,
            session_repo,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
        info!("session service stopped");
    }
}
