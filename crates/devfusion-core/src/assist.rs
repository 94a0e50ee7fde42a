//! Prompt construction and response cleanup for the AI assistant.

use std::fmt;
use std::sync::LazyLock;

use devfusion_proto::{LanguageModel, ModelResult};
use regex::Regex;
use tracing::debug;

static OPENING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[a-z]*\n").expect("valid fence regex"));

/// What the user asked the assistant to do with the active file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssistIntent {
    /// Continue the code; the reply is appended to the file.
    Complete,
    /// Explain the code; the reply is a report.
    Explain,
    /// Look for defects; the reply is a report.
    FindBugs,
    /// Rewrite the code; the reply replaces the file.
    Refactor,
}

impl AssistIntent {
    pub fn all() -> &'static [AssistIntent] {
        &[
            AssistIntent::Complete,
            AssistIntent::Explain,
            AssistIntent::FindBugs,
            AssistIntent::Refactor,
        ]
    }

    /// True when the reply is code written back into the file.
    pub fn edits_file(self) -> bool {
        matches!(self, AssistIntent::Complete | AssistIntent::Refactor)
    }

    /// Progress line shown while the request is in flight.
    pub fn progress_message(self) -> &'static str {
        match self {
            AssistIntent::Complete => "AI is completing your code...",
            AssistIntent::Explain => "AI is explaining the code...",
            AssistIntent::FindBugs => "AI is looking for bugs...",
            AssistIntent::Refactor => "AI is refactoring your code...",
        }
    }

    /// Heading for report-style replies.
    pub fn report_title(self) -> &'static str {
        match self {
            AssistIntent::Complete => "AI Completion",
            AssistIntent::Explain => "AI Explanation",
            AssistIntent::FindBugs => "AI Bug Report",
            AssistIntent::Refactor => "AI Refactor",
        }
    }
}

impl fmt::Display for AssistIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssistIntent::Complete => write!(f, "complete"),
            AssistIntent::Explain => write!(f, "explain"),
            AssistIntent::FindBugs => write!(f, "bugs"),
            AssistIntent::Refactor => write!(f, "refactor"),
        }
    }
}

/// Builds the prompt sent to the model for `intent` over `code`.
pub fn build_prompt(intent: AssistIntent, code: &str) -> String {
    match intent {
        AssistIntent::Complete => format!(
            "You are a world-class AI coding assistant. Your task is to complete the following code snippet. \
Only return the code that should be added, without any explanation or markdown formatting.\n\n\
Code to complete:\n```\n{code}\n```"
        ),
        AssistIntent::Explain => format!(
            "You are a world-class AI coding assistant. Explain the following code snippet in a clear, \
concise, and easy-to-understand way. Use bullet points for key aspects.\n\n\
Code:\n```\n{code}\n```"
        ),
        AssistIntent::FindBugs => format!(
            "You are a world-class AI code analyst. Analyze the following code for potential bugs, \
security vulnerabilities, or logical errors. If you find issues, describe them clearly and suggest a fix. \
If no bugs are found, simply respond with \"No obvious bugs found.\"\n\n\
Code:\n```\n{code}\n```"
        ),
        AssistIntent::Refactor => format!(
            "You are a world-class AI coding assistant. Refactor the following code to improve its \
readability, performance, and maintainability. Only return the refactored code without any explanation \
or markdown formatting.\n\n\
Code to refactor:\n```\n{code}\n```"
        ),
    }
}

/// Strips markdown code fences from a model reply and trims it.
pub fn clean_response(text: &str) -> String {
    OPENING_FENCE
        .replace_all(text, "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Runs one assistant request: prompt, generate, clean.
pub async fn assist(
    model: &dyn LanguageModel,
    intent: AssistIntent,
    code: &str,
) -> ModelResult<String> {
    let prompt = build_prompt(intent, code);
    debug!(intent = %intent, prompt_len = prompt.len(), "Sending assistant request");
    let raw = model.generate(&prompt).await?;
    Ok(clean_response(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct EchoModel {
        reply: String,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LanguageModel for EchoModel {
        async fn generate(&self, prompt: &str) -> ModelResult<String> {
            self.seen.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    #[test]
    fn prompts_wrap_code_in_a_fence() {
        for intent in AssistIntent::all() {
            let prompt = build_prompt(*intent, "let x = 1;");
            assert!(prompt.contains("```\nlet x = 1;\n```"), "{intent}");
            assert!(prompt.starts_with("You are a world-class AI"));
        }
    }

    #[test]
    fn bug_prompt_names_the_no_bug_reply() {
        let prompt = build_prompt(AssistIntent::FindBugs, "");
        assert!(prompt.contains("\"No obvious bugs found.\""));
    }

    #[test]
    fn clean_response_strips_fences_and_whitespace() {
        let raw = "```javascript\nconsole.log('hi');\n```\n";
        assert_eq!(clean_response(raw), "console.log('hi');");

        let bare = "  ```\nx\n```  ";
        assert_eq!(clean_response(bare), "x");
    }

    #[test]
    fn clean_response_leaves_plain_text_alone() {
        assert_eq!(clean_response("- point one\n- point two"), "- point one\n- point two");
    }

    #[test]
    fn only_complete_and_refactor_edit_the_file() {
        let editing: Vec<_> = AssistIntent::all()
            .iter()
            .filter(|intent| intent.edits_file())
            .collect();
        assert_eq!(editing, [&AssistIntent::Complete, &AssistIntent::Refactor]);
        assert_eq!(AssistIntent::FindBugs.to_string(), "bugs");
    }

    #[tokio::test]
    async fn assist_sends_prompt_and_cleans_reply() {
        let model = EchoModel {
            reply: "```python\nprint('done')\n```".to_string(),
            seen: Mutex::new(Vec::new()),
        };

        let out = assist(&model, AssistIntent::Complete, "def f():")
            .await
            .unwrap();

        assert_eq!(out, "print('done')");
        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("def f():"));
    }
}
