//! Settings are read from TOML through the `config` crate.
//! `cargo run -- --settings=settings/dev.toml list --user-id 42`

mod cli;
pub use clap::{Parser, Subcommand};
pub use cli::*;

mod settings;
pub use settings::*;
