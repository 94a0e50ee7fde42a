//! Terminal rendering for rooms, run results and assistant replies.
//!
//! Coloring follows `colored`'s global override, which `main` sets from
//! `--color`.

use std::time::Duration;

use colored::Colorize;
use devfusion_proto::{FileEntry, FileId, FileTree, Room, RunOutput};
use indicatif::{ProgressBar, ProgressStyle};

/// Renders the file tree as an indented listing.
///
/// Entries whose parent is missing are shown at the top level. The active
/// file is marked with `*`.
pub fn render_tree(tree: &FileTree, active: Option<&FileId>) -> String {
    if tree.is_empty() {
        return "(empty room)\n".to_string();
    }

    let roots: Vec<&FileEntry> = sorted(
        tree.iter()
            .filter(|entry| entry.parent_id.as_ref().is_none_or(|p| !tree.contains(p)))
            .collect(),
    );

    let mut out = String::new();
    for entry in roots {
        render_entry(tree, entry, 0, active, &mut out);
    }
    out
}

fn sorted(mut entries: Vec<&FileEntry>) -> Vec<&FileEntry> {
    entries.sort_by(|a, b| {
        b.is_folder()
            .cmp(&a.is_folder())
            .then_with(|| a.name.cmp(&b.name))
    });
    entries
}

// Recursion always starts at a root, so entries caught in a parent cycle
// are never reached.
fn render_entry(
    tree: &FileTree,
    entry: &FileEntry,
    depth: usize,
    active: Option<&FileId>,
    out: &mut String,
) {
    let is_active = active == Some(&entry.id);
    let name = if entry.is_folder() {
        format!("{}/", entry.name).blue().bold()
    } else if is_active {
        entry.name.as_str().green().bold()
    } else {
        entry.name.as_str().normal()
    };
    out.push_str(&format!(
        "{} {}{name}  {}\n",
        if is_active { "*" } else { " " },
        "  ".repeat(depth),
        entry.id.as_str().dimmed()
    ));

    if entry.is_folder() {
        for child in sorted(tree.children_of(Some(&entry.id)).collect()) {
            render_entry(tree, child, depth + 1, active, out);
        }
    }
}

/// One-paragraph room summary followed by the tree.
pub fn render_room(room: &Room, active: Option<&FileId>) -> String {
    let mut out = format!("{}\n", format!("Room {}", room.id).bold());
    if !room.objective.is_empty() {
        out.push_str(&format!("Objective: {}\n", room.objective));
    }
    if let Some(created) = room.created_at {
        out.push_str(&format!("Created:   {}\n", created.format("%Y-%m-%d %H:%M UTC")));
    }
    out.push('\n');
    out.push_str(&render_tree(&room.file_tree, active));
    out
}

/// Formats a run result: status line, then each non-empty output stream.
pub fn render_run_output(output: &RunOutput) -> String {
    let mut status = output.status.description.clone();
    if let Some(time) = &output.time {
        status.push_str(&format!(" in {time}s"));
    }
    if let Some(memory) = output.memory {
        status.push_str(&format!(", {memory} KB"));
    }
    let status = if output.status.is_success() {
        status.green().bold()
    } else {
        status.red().bold()
    };

    let mut out = format!("{status}\n");
    for (label, stream) in [
        ("stdout", &output.stdout),
        ("stderr", &output.stderr),
        ("compile output", &output.compile_output),
        ("message", &output.message),
    ] {
        if let Some(text) = stream.as_deref().filter(|t| !t.trim().is_empty()) {
            out.push_str(&format!("\n{}\n{}", format!("── {label} ──").dimmed(), text));
            if !text.ends_with('\n') {
                out.push('\n');
            }
        }
    }
    out
}

/// Prints an assistant report as terminal markdown.
pub fn print_report(title: &str, text: &str) {
    let skin = termimad::MadSkin::default();
    skin.print_text(&format!("# {title}\n\n{text}"));
}

/// Starts a spinner on stderr with `message`.
pub fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
