use cadence::app::App;
use cadence::application_port::SessionService;
use cadence::domain_model::{SessionId, UserId};
use cadence::domain_port::SessionRepo;
use cadence::logger::*;
use cadence::settings::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    info!(?project_settings);
    let logger_config = LogConfig {
        filter: project_settings.log.filter.clone(),
        ansi: project_settings.log.ansi,
    };
    logger.reload_from_config(&logger_config)?;
    project_settings.store.require_persistent()?;

    let app = App::try_new(&project_settings).await?;
    let result = run(&app, cli.command).await;
    app.shutdown().await;
    result
}

async fn run(app: &App, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Cleanup => {
            let count = app.session_service.cleanup_expired_sessions().await?;
            println!("invalidated {count} expired session(s)");
        }
        Command::Revoke { user_id } => {
            let count = app
                .session_service
                .invalidate_all_user_sessions(UserId(user_id))
                .await?;
            println!("invalidated {count} session(s) of user {user_id}");
        }
        Command::List { user_id } => {
            let sessions = app.session_service.active_sessions(UserId(user_id)).await?;
            for session in &sessions {
                println!(
                    "{}  created {}  access until {}  refresh until {}",
                    session.id,
                    session.created_at,
                    session.access_expires_at,
                    session.refresh_expires_at
                );
            }
            println!("{} active session(s)", sessions.len());
        }
        Command::Purge { session_id } => {
            let session_id: SessionId = session_id.parse()?;
            app.session_repo.delete(session_id).await?;
            warn!(%session_id, "session row hard-deleted");
            println!("deleted {session_id}");
        }
    }
    Ok(())
}
