//! `devfusion ai`: assistant actions over one file in a room.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use devfusion_core::{AssistIntent, AssistOutcome, DevFusionConfig};
use devfusion_proto::RoomId;
use tracing::debug;

use crate::display::{print_report, spinner};
use crate::open_session;

/// Assistant action as spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IntentArg {
    /// Continue the code at the end of the file
    Complete,
    /// Explain what the code does
    Explain,
    /// Look for bugs and suggest fixes
    Bugs,
    /// Rewrite the file in place
    Refactor,
}

impl From<IntentArg> for AssistIntent {
    fn from(arg: IntentArg) -> Self {
        match arg {
            IntentArg::Complete => AssistIntent::Complete,
            IntentArg::Explain => AssistIntent::Explain,
            IntentArg::Bugs => AssistIntent::FindBugs,
            IntentArg::Refactor => AssistIntent::Refactor,
        }
    }
}

#[derive(Parser, Debug)]
pub struct AiArgs {
    #[arg(value_enum)]
    pub action: IntentArg,

    /// Room id
    pub room: RoomId,

    /// File to work on (id or name)
    pub file: String,
}

pub async fn execute(config: &DevFusionConfig, args: AiArgs) -> Result<()> {
    let intent = AssistIntent::from(args.action);
    let mut session = open_session(config, &args.room).await?;
    session.select(&args.file)?;
    let model = devfusion_adapters::build_model(config)?;
    debug!(model = model.model(), intent = %intent, "Asking the assistant");

    let bar = spinner(intent.progress_message());
    let outcome = session.assist(&model, intent).await;
    bar.finish_and_clear();

    match outcome? {
        AssistOutcome::Applied { .. } => {
            let verb = if intent == AssistIntent::Complete {
                "Completed"
            } else {
                "Refactored"
            };
            println!("{} {}", verb.green(), args.file);
        }
        AssistOutcome::NoChange => println!("The assistant suggested no changes."),
        AssistOutcome::Report { title, text } => print_report(title, &text),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_intent_has_a_command_line_name() {
        for arg in IntentArg::value_variants() {
            let intent = AssistIntent::from(*arg);
            let name = arg.to_possible_value().unwrap().get_name().to_string();
            assert_eq!(name, intent.to_string());
        }
        assert_eq!(IntentArg::value_variants().len(), AssistIntent::all().len());
    }

    #[test]
    fn parses_action_room_and_file() {
        let args = AiArgs::try_parse_from(["ai", "bugs", "r1", "main.py"]).unwrap();
        assert_eq!(args.action, IntentArg::Bugs);
        assert_eq!(args.file, "main.py");
        assert!(AiArgs::try_parse_from(["ai", "translate", "r1", "main.py"]).is_err());
    }
}
