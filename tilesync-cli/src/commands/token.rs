//! Token CLI commands.
//!
//! The bearer token is issued out of band; these commands only store,
//! inspect and remove it.

use clap::Subcommand;
use tilesync::auth::{FileTokenStore, TokenStore};
use tilesync::config::ConfigFile;

use crate::error::CliError;

/// Characters of the token shown by `token show`.
const VISIBLE_PREFIX: usize = 8;

/// Token subcommands.
#[derive(Debug, Subcommand)]
pub enum TokenCommands {
    /// Store a bearer token, replacing any existing one
    Set {
        /// The token value
        token: String,
    },

    /// Show whether a token is stored
    Show,

    /// Remove the stored token
    Clear,
}

/// Run a token subcommand.
pub fn run(command: TokenCommands) -> Result<(), CliError> {
    let config = ConfigFile::load()?.to_sync_config();
    let store = FileTokenStore::open(config.token_path())?;

    match command {
        TokenCommands::Set { token } => {
            let token = token.trim();
            if token.is_empty() {
                return Err(CliError::Config("Token must not be empty.".to_string()));
            }
            store.set(Some(token.to_string()))?;
            println!("Token saved to {}", store.path().display());
        }
        TokenCommands::Show => match store.get() {
            Some(token) => println!("{}", mask(&token)),
            None => println!("(not set)"),
        },
        TokenCommands::Clear => {
            store.set(None)?;
            println!("Token cleared");
        }
    }
    Ok(())
}

/// Keep a short prefix of the token and hide the rest.
fn mask(token: &str) -> String {
    let prefix: String = token.chars().take(VISIBLE_PREFIX).collect();
    if prefix.len() == token.len() {
        "*".repeat(token.chars().count())
    } else {
        format!("{}...", prefix)
    }
}
