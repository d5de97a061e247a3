//! Walks one session through login, refresh and sign-out-everywhere
//! against the in-memory store.
//! $ cargo run --bin session_demo

use cadence::application_impl::*;
use cadence::application_port::*;
use cadence::domain_model::UserId;
use cadence::infra_memory::InMemorySessionRepo;
use cadence::logger::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    logger.reload_from_config(&LogConfig {
        filter: "debug".to_string(),
        ansi: true,
    })?;

    let codec = JwtHs256Codec::try_new(JwtConfig {
        issuer: "cadence.demo".to_string(),
        access_ttl: Duration::from_secs(60 * 60),
        refresh_ttl: Duration::from_secs(30 * 24 * 60 * 60),
        leeway: Duration::from_secs(30),
        signing_key: b"demo-signing-key".to_vec(),
    })?;
    let manager = SessionManager::new(Arc::new(InMemorySessionRepo::new()), Arc::new(codec));

    let user = UserId(42);
    let first = manager.create_session(user).await?;
    info!(
        access_expires_at = %first.access_token_expires_at,
        refresh_expires_at = %first.refresh_token_expires_at,
        "logged in"
    );

    let session = manager.validate_access_token(&first.access_token.0).await?;
    info!(session_id = %session.id, user_id = %session.user_id, "access token accepted");

    let second = manager.refresh_token(&first.refresh_token.0).await?;
    match manager.validate_access_token(&first.access_token.0).await {
        Err(e) => info!(error = %e, "old access token rejected after rotation"),
        Ok(_) => error!("old access token still accepted"),
    }
    manager.validate_access_token(&second.access_token.0).await?;
    info!("rotated access token accepted");

    let count = manager.invalidate_all_user_sessions(user).await?;
    info!(count, "signed out everywhere");
    match manager.validate_access_token(&second.access_token.0).await {
        Err(e) => info!(error = %e, "access token rejected after revocation"),
        Ok(_) => error!("revoked access token still accepted"),
    }

    Ok(())
}
