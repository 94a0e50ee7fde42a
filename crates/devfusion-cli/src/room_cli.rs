//! `devfusion room` and `devfusion watch`.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use devfusion_core::{DevFusionConfig, RemoteOutcome, SessionError, StoreBackend, create_room};
use devfusion_proto::RoomId;
use tracing::{info, warn};

use crate::display::{render_room, render_tree};
use crate::{open_session, open_store};

#[derive(Parser, Debug)]
pub struct RoomArgs {
    #[command(subcommand)]
    pub command: RoomCommands,
}

#[derive(Subcommand, Debug)]
pub enum RoomCommands {
    /// Create a new, empty room and print its id
    Create {
        /// What the room is for
        #[arg(default_value = "")]
        objective: String,
    },

    /// Print a room's objective and file tree
    Show {
        /// Room id
        room: RoomId,
    },
}

#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Room id
    pub room: RoomId,
}

pub async fn execute(config: &DevFusionConfig, args: RoomArgs) -> Result<()> {
    match args.command {
        RoomCommands::Create { objective } => {
            if config.store.backend == StoreBackend::Memory {
                warn!("The memory backend does not outlive this process");
            }
            let store = open_store(config)?;
            let room = create_room(store.as_ref(), &objective)
                .await
                .context("Failed to create room")?;
            println!("{}", room.id);
            Ok(())
        }
        RoomCommands::Show { room } => {
            let session = open_session(config, &room).await?;
            let Some(room) = session.room() else {
                bail!("Room {room} has no data");
            };
            print!("{}", render_room(room, session.active_file().map(|f| &f.id)));
            Ok(())
        }
    }
}

/// Prints the tree on join and after every remote change until the room
/// is deleted or the user interrupts.
pub async fn watch(config: &DevFusionConfig, args: WatchArgs) -> Result<()> {
    let mut session = open_session(config, &args.room).await?;
    if let Some(room) = session.room() {
        print!("{}", render_room(room, session.active_file().map(|f| &f.id)));
    }
    info!(room_id = %args.room, "Watching for changes (Ctrl-C to stop)");

    loop {
        let outcome = tokio::select! {
            outcome = session.sync() => outcome,
            _ = tokio::signal::ctrl_c() => return Ok(()),
        };

        match outcome {
            Ok(RemoteOutcome::Unchanged) => {}
            Ok(RemoteOutcome::Closed) => {
                println!("{}", "Room was deleted.".yellow());
                return Ok(());
            }
            Ok(RemoteOutcome::Loaded | RemoteOutcome::Updated { .. }) => {
                let Some(tree) = session.file_tree() else {
                    continue;
                };
                println!(
                    "\n{} {}",
                    "Updated".cyan().bold(),
                    chrono::Local::now().format("%H:%M:%S")
                );
                print!("{}", render_tree(tree, session.active_file().map(|f| &f.id)));
            }
            Err(SessionError::SubscriptionEnded) => {
                bail!("Subscription to room {} ended", args.room)
            }
            // The poller keeps running after a failed fetch.
            Err(e) => warn!(room_id = %args.room, error = %e, "Sync failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(subcommand)]
        command: RoomCommands,
    }

    #[test]
    fn create_objective_is_optional() {
        let cli = TestCli::try_parse_from(["room", "create"]).unwrap();
        assert!(matches!(
            cli.command,
            RoomCommands::Create { objective } if objective.is_empty()
        ));
    }

    #[test]
    fn show_rejects_invalid_room_ids() {
        assert!(TestCli::try_parse_from(["room", "show", "a/b"]).is_err());
        let cli = TestCli::try_parse_from(["room", "show", "r1"]).unwrap();
        assert!(matches!(cli.command, RoomCommands::Show { room } if room.as_str() == "r1"));
    }
}
