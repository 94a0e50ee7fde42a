//! `devfusion auth`: API keys in the OS keychain.

use std::io::{BufRead, IsTerminal};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use devfusion_core::{Provider, clear_api_key, store_api_key};

#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Store a key. Reads it from stdin when --key is omitted.
    Set {
        /// gemini, judge0 or firestore
        provider: Provider,
        #[arg(long)]
        key: Option<String>,
    },

    /// Remove a stored key
    Clear {
        /// gemini, judge0 or firestore
        provider: Provider,
    },
}

pub fn execute(args: AuthArgs) -> Result<()> {
    match args.command {
        AuthCommands::Set { provider, key } => {
            let key = match key {
                Some(key) => key,
                None => read_key(provider)?,
            };
            if key.trim().is_empty() {
                bail!("No API key given for {provider}");
            }
            store_api_key(provider, &key)?;
            println!("Stored {provider} API key in the keychain");
        }
        AuthCommands::Clear { provider } => {
            clear_api_key(provider)?;
            println!("Removed {provider} API key from the keychain");
        }
    }
    Ok(())
}

fn read_key(provider: Provider) -> Result<String> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        eprint!("{provider} API key: ");
    }
    let mut line = String::new();
    stdin
        .lock()
        .read_line(&mut line)
        .context("Failed to read API key from stdin")?;
    Ok(line.trim().to_string())
}
