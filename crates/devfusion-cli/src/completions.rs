//! Shell completion generation for the DevFusion CLI.

use clap::{CommandFactory, Parser};
use clap_complete::{Shell, generate};
use std::io;

/// Arguments for the completions subcommand.
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,

    /// Override the binary name used in the completion script
    #[arg(long, default_value = "devfusion")]
    pub name: String,
}

/// Prints a completion script for the requested shell to stdout.
pub fn generate_completions(args: &CompletionsArgs) {
    let mut cmd = crate::Cli::command();
    generate(args.shell, &mut cmd, args.name.as_str(), &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bash_script_mentions_subcommands() {
        let mut cmd = crate::Cli::command();
        let mut out = Vec::new();
        generate(Shell::Bash, &mut cmd, "devfusion", &mut out);
        let script = String::from_utf8(out).unwrap();
        assert!(script.contains("devfusion"));
        assert!(script.contains("watch"));
        assert!(script.contains("completions"));
    }
}
