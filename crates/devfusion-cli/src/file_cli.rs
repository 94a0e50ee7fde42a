//! `devfusion file` and `devfusion run`.
//!
//! Files are addressed by id or by name when the name is unique in the room.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use devfusion_core::{DevFusionConfig, RoomSession};
use devfusion_proto::{FileId, RoomId};
use tracing::debug;

use crate::display::{render_run_output, render_tree, spinner};
use crate::open_session;

#[derive(Parser, Debug)]
pub struct FileArgs {
    /// Room id
    #[arg(short, long)]
    pub room: RoomId,

    #[command(subcommand)]
    pub command: FileCommands,
}

#[derive(Subcommand, Debug)]
pub enum FileCommands {
    /// List the room's file tree
    Ls,

    /// Create a file, seeded with a comment naming it
    New {
        name: String,
        /// Folder to create the file in (id or name)
        #[arg(long)]
        parent: Option<String>,
    },

    /// Create a folder
    Mkdir {
        name: String,
        /// Folder to create the folder in (id or name)
        #[arg(long)]
        parent: Option<String>,
    },

    /// Delete a file, or a folder and everything in it
    Rm { entry: String },

    /// Rename a file or folder
    Mv { entry: String, new_name: String },

    /// Print a file's content
    Cat { file: String },

    /// Replace a file's content from a local file or stdin
    Write {
        file: String,
        /// Read content from this path instead of stdin
        #[arg(long)]
        from: Option<PathBuf>,
    },
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Room id
    pub room: RoomId,

    /// File to run (id or name)
    pub file: String,

    /// Text passed to the program's standard input
    #[arg(long)]
    pub stdin: Option<String>,

    /// Read the program's standard input from this file
    #[arg(long, conflicts_with = "stdin")]
    pub stdin_file: Option<PathBuf>,
}

fn resolve_parent(session: &RoomSession, parent: Option<&str>) -> Result<Option<FileId>> {
    parent
        .map(|query| session.resolve(query))
        .transpose()
        .context("Failed to resolve parent folder")
}

fn read_content(from: Option<&PathBuf>) -> Result<String> {
    match from {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read stdin")?;
            Ok(content)
        }
    }
}

pub async fn execute(config: &DevFusionConfig, args: FileArgs) -> Result<()> {
    let mut session = open_session(config, &args.room).await?;

    match args.command {
        FileCommands::Ls => {
            if let Some(tree) = session.file_tree() {
                print!("{}", render_tree(tree, session.active_file().map(|f| &f.id)));
            }
        }
        FileCommands::New { name, parent } => {
            let parent = resolve_parent(&session, parent.as_deref())?;
            let id = session.create_file(&name, parent).await?;
            println!("{} {name} ({id})", "Created".green());
        }
        FileCommands::Mkdir { name, parent } => {
            let parent = resolve_parent(&session, parent.as_deref())?;
            let id = session.create_folder(&name, parent).await?;
            println!("{} {name}/ ({id})", "Created".green());
        }
        FileCommands::Rm { entry } => {
            let id = session.resolve(&entry)?;
            session.delete(&id).await?;
            println!("{} {entry}", "Deleted".red());
        }
        FileCommands::Mv { entry, new_name } => {
            let id = session.resolve(&entry)?;
            session.rename(&id, &new_name).await?;
            println!("{} {entry} -> {new_name}", "Renamed".green());
        }
        FileCommands::Cat { file } => {
            let entry = session.select(&file)?;
            print!("{}", entry.text());
        }
        FileCommands::Write { file, from } => {
            let content = read_content(from.as_ref())?;
            session.select(&file)?;
            if session.edit_active(&content).await? {
                println!("{} {file}", "Saved".green());
            } else {
                println!("{file} unchanged");
            }
        }
    }
    Ok(())
}

pub async fn run(config: &DevFusionConfig, args: RunArgs) -> Result<()> {
    let stdin = match (&args.stdin, &args.stdin_file) {
        (Some(text), _) => Some(text.clone()),
        (None, Some(path)) => Some(read_content(Some(path))?),
        (None, None) => None,
    };

    let mut session = open_session(config, &args.room).await?;
    let file_name = session.select(&args.file)?.name.clone();
    let runner = devfusion_adapters::build_runner(config)?;

    debug!(file = %file_name, "Starting run");
    let bar = spinner(&format!("Running {file_name}..."));
    let result = session.run_active(&runner, stdin).await;
    bar.finish_and_clear();

    print!("{}", render_run_output(&result?));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(subcommand)]
        command: TestCommands,
    }

    #[derive(Subcommand, Debug)]
    enum TestCommands {
        File(FileArgs),
        Run(RunArgs),
    }

    #[test]
    fn file_commands_take_room_before_action() {
        let cli =
            TestCli::try_parse_from(["t", "file", "-r", "r1", "new", "main.py", "--parent", "src"])
                .unwrap();
        let TestCommands::File(args) = cli.command else {
            panic!("expected file command");
        };
        assert_eq!(args.room.as_str(), "r1");
        assert!(matches!(
            args.command,
            FileCommands::New { name, parent } if name == "main.py" && parent.as_deref() == Some("src")
        ));
    }

    #[test]
    fn file_commands_require_a_room() {
        assert!(TestCli::try_parse_from(["t", "file", "ls"]).is_err());
    }

    #[test]
    fn run_stdin_sources_conflict() {
        assert!(
            TestCli::try_parse_from([
                "t", "run", "r1", "main.py", "--stdin", "x", "--stdin-file", "in.txt"
            ])
            .is_err()
        );
        let cli = TestCli::try_parse_from(["t", "run", "r1", "main.py", "--stdin", "5"]).unwrap();
        let TestCommands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.stdin.as_deref(), Some("5"));
    }

    #[test]
    fn read_content_reads_a_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.py");
        std::fs::write(&path, "print('hi')\n").unwrap();
        assert_eq!(read_content(Some(&path)).unwrap(), "print('hi')\n");
        assert!(read_content(Some(&dir.path().join("missing"))).is_err());
    }
}
