use super::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "cadence", about = "Session store maintenance")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Invalidate every session whose refresh token has expired.
    Cleanup,
    /// Sign a user out everywhere.
    Revoke {
        #[arg(long)]
        user_id: u64,
    },
    /// Print a user's active sessions.
    List {
        #[arg(long)]
        user_id: u64,
    },
    /// Hard-delete one session row.
    Purge {
        #[arg(long)]
        session_id: String,
    },
}
