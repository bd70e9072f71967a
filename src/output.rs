//! Output formatting for the pinboard CLI.
//!
//! This module provides two output modes:
//! - **JSON**: Compact machine-readable output (default, matches the notes
//!   API response shapes)
//! - **Pretty**: Human-readable formatted output (enabled via `--pretty` flag)

use crate::db::NotesError;
use crate::models::{Label, Message, Note, NoteState, NoteView};
use crate::pagination::Page;
use crate::query::{NotesListing, PinnedNotes};
use serde::Serialize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Output mode for CLI results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Compact JSON output.
    Json,
    /// Human-readable formatted output.
    Pretty,
}

/// Serialize a value to compact JSON and print to stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), NotesError> {
    let json = serde_json::to_string(value)?;
    println!("{}", json);
    Ok(())
}

/// Cuts `text` to at most `width` terminal columns, marking the cut with `…`.
/// Wide characters (CJK, emoji) count as two columns.
pub fn fit_width(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// Pads `text` with spaces to `width` columns, truncating when longer.
pub fn pad_width(text: &str, width: usize) -> String {
    let fitted = fit_width(text, width);
    let fill = width.saturating_sub(UnicodeWidthStr::width(fitted.as_str()));
    format!("{}{}", fitted, " ".repeat(fill))
}

/// Print a label in human-readable format.
///
/// Format:
/// ```text
/// Label: Work
/// ID:    <uuid>
/// User:  u1
/// Style: outlined (#ff0000 on #ffffff)
/// ```
pub fn print_pretty_label(label: &Label) {
    println!("Label: {}", label.name);
    println!("ID:    {}", label.id);
    println!("User:  {}", label.user_id);
    println!("Style: {} ({} on {})", label.style, label.font_color, label.color);
    println!("Created: {}", label.created_at);
    println!("Updated: {}", label.updated_at);
}

pub fn print_pretty_labels(page: &Page<Label>) {
    if page.docs.is_empty() {
        println!("(no labels)");
    }
    for label in &page.docs {
        println!("{} | {} | {}", label.id, pad_width(&label.name, 24), label.style);
    }
    print_page_footer(page);
}

fn label_names(labels: &[Label]) -> String {
    labels.iter().map(|l| l.name.as_str()).collect::<Vec<_>>().join(", ")
}

/// Print a note with its resolved labels.
pub fn print_pretty_note(note: &NoteView) {
    println!("Name:    {}", note.name);
    println!("ID:      {}", note.id);
    println!("Author:  {}", note.author);
    if note.labels.is_empty() {
        println!("Labels:  (none)");
    } else {
        println!("Labels:  {}", label_names(&note.labels));
    }
    if note.label_array_size > note.labels.len() {
        println!("         ({} of {} shown)", note.labels.len(), note.label_array_size);
    }
    println!("Pinned:  {}", if note.settings.pinned { "yes" } else { "no" });
    if let Some(ref color) = note.settings.note_background_color {
        println!("Color:   {}", color);
    }
    println!("Created: {}", note.created_at);
    println!("Updated: {}", note.updated_at);
    if !note.body.is_empty() {
        println!();
        println!("{}", note.body);
    }
}

/// Print a stored note record (label ids unresolved).
pub fn print_pretty_record(note: &Note) {
    println!("Name:    {}", note.name);
    println!("ID:      {}", note.id);
    println!("Author:  {}", note.author);
    println!("State:   {}", note.state);
    println!("Labels:  {}", note.labels.len());
    println!("Pinned:  {}", if note.settings.pinned { "yes" } else { "no" });
    println!("Updated: {}", note.updated_at);
}

pub fn print_pretty_state(state: &NoteState) {
    println!("State:   {}", state.id);
    println!("Note:    {}", state.note_id.as_deref().unwrap_or("(unlinked)"));
    println!("Updated: {}", state.updated_at);
    println!();
    println!("{}", state.state);
}

/// One line per note: `<id> | <name> | <labels>`.
fn print_note_lines(page: &Page<NoteView>) {
    if page.docs.is_empty() {
        println!("(no notes)");
    }
    for note in &page.docs {
        println!("{} | {} | {}", note.id, pad_width(&note.name, 32), label_names(&note.labels));
    }
    print_page_footer(page);
}

fn print_page_footer<T>(page: &Page<T>) {
    println!(
        "-- page {} of {} ({} total)",
        page.page,
        page.total_pages.max(1),
        page.total_docs
    );
}

pub fn print_pretty_listing(listing: &NotesListing) {
    match &listing.pinned_notes {
        PinnedNotes::Page(pinned) => {
            println!("Pinned");
            print_note_lines(pinned);
            println!();
            println!("Others");
        }
        PinnedNotes::Unpartitioned(_) => println!("Results"),
    }
    print_note_lines(&listing.notes);
}

pub fn print_pretty_message(message: &Message) {
    println!("{}", message.message);
}

/// Generic output dispatcher that handles both JSON and Pretty modes.
///
/// ```ignore
/// print(mode, &label, || print_pretty_label(&label))?;
/// ```
pub fn print<T: Serialize>(mode: OutputMode, value: &T, pretty_fn: impl FnOnce()) -> Result<(), NotesError> {
    match mode {
        OutputMode::Json => print_json(value),
        OutputMode::Pretty => {
            pretty_fn();
            Ok(())
        }
    }
}
