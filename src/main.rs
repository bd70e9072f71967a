//! Pinboard CLI: personal notes with labels and a pinned view.
//!
//! This binary provides the `pinboard` command. Each subcommand mirrors one
//! operation of the notes API and prints its response as JSON (or, with
//! `--pretty`, a human-readable rendering). Errors are printed to stderr as
//! `{"message": ..., "status": ...}`.

mod attach;
mod db;
mod labels;
mod models;
mod notes;
mod output;
mod pagination;
mod pin;
mod projection;
mod query;
mod tui;

use clap::{Parser, Subcommand};
use db::NotesError;
use models::{LabelStyle, Message};
use output::OutputMode;
use pagination::{PageRequest, DEFAULT_PAGE_LIMIT};
use projection::LabelProjection;
use query::{ListNotesParams, DEFAULT_PINNED_PAGE_SIZE};
use std::io::{self, Read as _};
use std::path::PathBuf;
use std::process;

/// Input validation for the CLI boundary.
mod validation {
    use crate::db::NotesError;
    use crate::pagination::MAX_PAGE_LIMIT;

    pub const MAX_NOTE_NAME_LEN: usize = 500;
    pub const MAX_LABEL_NAME_LEN: usize = 100;
    pub const MAX_COLOR_LEN: usize = 32;
    pub const MAX_BODY_LEN: usize = 10_000_000; // 10 MB
    pub const MAX_STATE_LEN: usize = 10_000_000; // 10 MB
    pub const MAX_LABELS_PER_REQUEST: usize = 50;
    pub const MAX_SEARCH_LEN: usize = 200;

    pub fn validate_note_name(name: &str) -> Result<(), NotesError> {
        if name.trim().is_empty() {
            return Err(NotesError::InvalidInput("Note name must not be empty".to_string()));
        }
        if name.chars().count() > MAX_NOTE_NAME_LEN {
            return Err(NotesError::InvalidInput(format!(
                "Note name too long (max {} characters)",
                MAX_NOTE_NAME_LEN
            )));
        }
        Ok(())
    }

    pub fn validate_label_name(name: &str) -> Result<(), NotesError> {
        if name.trim().is_empty() {
            return Err(NotesError::InvalidInput("Label name must not be empty".to_string()));
        }
        if name.chars().count() > MAX_LABEL_NAME_LEN {
            return Err(NotesError::InvalidInput(format!(
                "Label name too long (max {} characters)",
                MAX_LABEL_NAME_LEN
            )));
        }
        Ok(())
    }

    /// Accepts `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa` or a plain colour
    /// keyword such as `teal`.
    pub fn validate_color(color: &str) -> Result<(), NotesError> {
        if color.is_empty() || color.len() > MAX_COLOR_LEN {
            return Err(NotesError::InvalidInput(format!("Invalid colour '{}'", color)));
        }
        let valid = match color.strip_prefix('#') {
            Some(hex) => matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit()),
            None => color.chars().all(|c| c.is_ascii_alphabetic()),
        };
        if !valid {
            return Err(NotesError::InvalidInput(format!("Invalid colour '{}'", color)));
        }
        Ok(())
    }

    pub fn validate_body(body: &str) -> Result<(), NotesError> {
        if body.len() > MAX_BODY_LEN {
            return Err(NotesError::InvalidInput(format!("Body too long (max {} bytes)", MAX_BODY_LEN)));
        }
        Ok(())
    }

    pub fn validate_state(state: &str) -> Result<(), NotesError> {
        if state.len() > MAX_STATE_LEN {
            return Err(NotesError::InvalidInput(format!("State too long (max {} bytes)", MAX_STATE_LEN)));
        }
        Ok(())
    }

    pub fn validate_label_ids(ids: &[String]) -> Result<(), NotesError> {
        if ids.len() > MAX_LABELS_PER_REQUEST {
            return Err(NotesError::InvalidInput(format!(
                "Too many labels in one request (max {})",
                MAX_LABELS_PER_REQUEST
            )));
        }
        if ids.iter().any(|id| id.trim().is_empty()) {
            return Err(NotesError::InvalidInput("Label id must not be empty".to_string()));
        }
        Ok(())
    }

    /// The pinned partition is paged like any other listing, so its size
    /// shares the caller `limit` bounds.
    pub fn validate_pinned_page_size(size: u32) -> Result<(), NotesError> {
        if size == 0 || size > MAX_PAGE_LIMIT {
            return Err(NotesError::InvalidInput(format!(
                "--pinned-page-size must be between 1 and {}",
                MAX_PAGE_LIMIT
            )));
        }
        Ok(())
    }

    pub fn validate_search(term: &str) -> Result<(), NotesError> {
        if term.chars().count() > MAX_SEARCH_LEN {
            return Err(NotesError::InvalidInput(format!("Search term too long (max {} characters)", MAX_SEARCH_LEN)));
        }
        Ok(())
    }
}

/// Personal notes with labels and a pinned view.
///
/// All output is JSON by default; use --pretty for human-readable format.
/// Set RUST_LOG=debug to trace store operations on stderr.
#[derive(Parser)]
#[command(name = "pinboard", version, about)]
struct Cli {
    /// Output in human-readable format instead of JSON.
    #[arg(long, global = true)]
    pretty: bool,

    /// Path to the SQLite database (default: ~/.pinboard/notes.db).
    #[arg(long, global = true, env = "PINBOARD_PATH")]
    db: Option<PathBuf>,

    /// Page size of the pinned partition when browsing.
    #[arg(long, global = true, env = "PINBOARD_PINNED_PAGE_SIZE", default_value_t = DEFAULT_PINNED_PAGE_SIZE)]
    pinned_page_size: u32,

    /// Embed only the first label of each browsed note.
    #[arg(long, global = true)]
    legacy_label_projection: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List notes.
    Notes {
        #[command(subcommand)]
        action: NotesAction,
    },
    /// Work with a single note.
    Note {
        #[command(subcommand)]
        action: NoteAction,
    },
    /// List a user's labels.
    Labels {
        /// Owner of the labels.
        user_id: String,
        /// Only labels whose name contains this text.
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
        limit: u32,
    },
    /// Manage labels.
    Label {
        #[command(subcommand)]
        action: LabelAction,
    },
    /// Interactive TUI browser for an author's notes.
    Browse {
        /// Author whose notes to browse.
        author: String,
    },
}

#[derive(Subcommand)]
enum NotesAction {
    /// List an author's notes: unpinned and pinned partitions, or search results.
    List {
        /// Page of the unpinned partition (or of search results), 1-based.
        page: u32,
        /// Author whose notes to list.
        author: String,
        /// Match note names and label names.
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
        limit: u32,
        /// Page of the pinned partition, 1-based.
        #[arg(long, default_value_t = 1)]
        pinned_notes_page: u32,
    },
}

#[derive(Subcommand)]
enum NoteAction {
    /// Create a note.
    Create {
        /// Author of the note.
        author: String,
        #[arg(long)]
        name: String,
        /// Plain-text body. Omit to read from stdin with --stdin.
        #[arg(long)]
        body: Option<String>,
        /// Read body from stdin.
        #[arg(long)]
        stdin: bool,
        /// Serialized editor state.
        #[arg(long, default_value = "")]
        state: String,
        #[arg(long)]
        image: Option<String>,
        /// Background colour.
        #[arg(long)]
        color: Option<String>,
    },
    /// Get a note with its labels.
    Get {
        id: String,
        /// Caller; must be the note's author.
        #[arg(long)]
        author: String,
    },
    /// Edit a note's content and editor state.
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        body: Option<String>,
        /// Read body from stdin.
        #[arg(long)]
        stdin: bool,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },
    /// Rename a note.
    Rename { id: String, name: String },
    /// Set or clear a note's background colour.
    Color {
        id: String,
        /// Omit to clear.
        color: Option<String>,
    },
    /// Delete a note and its editor state.
    Delete { id: String },
    /// Show a note's editor state.
    State { id: String },
    /// Attach labels to a note.
    AddLabels {
        note_id: String,
        #[arg(required = true)]
        label_ids: Vec<String>,
    },
    /// Detach one label from a note.
    DeleteLabel { label_id: String, note_id: String },
    /// Detach every label from a note.
    DeleteAllLabels { note_id: String },
    /// Pin or unpin a note.
    Pin {
        note_id: String,
        #[arg(long, action = clap::ArgAction::Set)]
        condition: bool,
    },
}

#[derive(Subcommand)]
enum LabelAction {
    /// Create a label.
    Add {
        user_id: String,
        #[arg(long)]
        name: String,
        /// Chip colour.
        #[arg(long)]
        color: String,
        /// Text colour.
        #[arg(long)]
        font_color: String,
        /// Chip style (default, outlined).
        #[arg(long, default_value = "default")]
        selected_style: String,
    },
    /// Get a label by ID.
    Get { id: String },
    /// Edit a label owned by the user.
    Edit {
        user_id: String,
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        font_color: Option<String>,
        /// Chip style (default, outlined).
        #[arg(long = "type")]
        style: Option<String>,
    },
    /// Delete a label. Notes keep its id.
    Delete { id: String },
}

/// Read body content from --body flag or --stdin.
fn read_body(body: &Option<String>, stdin: bool) -> Result<Option<String>, NotesError> {
    if stdin {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(Some(buf))
    } else {
        Ok(body.clone())
    }
}

/// Parse a label style string, returning InvalidInput on failure.
fn parse_label_style(s: &str) -> Result<LabelStyle, NotesError> {
    LabelStyle::from_str(s).ok_or_else(|| {
        NotesError::InvalidInput(format!("Unknown label type '{}'. Valid types: default, outlined", s))
    })
}

fn acknowledge(mode: OutputMode, text: impl Into<String>) -> Result<(), NotesError> {
    let message = Message::new(text);
    output::print(mode, &message, || output::print_pretty_message(&message))
}

fn run(cli: Cli) -> Result<(), NotesError> {
    let mode = if cli.pretty {
        OutputMode::Pretty
    } else {
        OutputMode::Json
    };
    let projection = if cli.legacy_label_projection {
        LabelProjection::FirstOnly
    } else {
        LabelProjection::Full
    };
    validation::validate_pinned_page_size(cli.pinned_page_size)?;

    let path = db::db_path(cli.db.as_deref())?;
    let mut conn = db::open_connection(&path)?;

    match cli.command {
        Commands::Notes {
            action:
                NotesAction::List {
                    page,
                    author,
                    search,
                    limit,
                    pinned_notes_page,
                },
        } => {
            if let Some(ref term) = search {
                validation::validate_search(term)?;
            }
            let params = ListNotesParams {
                author,
                page,
                limit,
                pinned_page: pinned_notes_page,
                search,
                projection,
            };
            let listing = query::list_notes(&conn, &params, cli.pinned_page_size)?;
            output::print(mode, &listing, || output::print_pretty_listing(&listing))?;
        }

        Commands::Note { action } => match action {
            NoteAction::Create {
                author,
                name,
                body,
                stdin,
                state,
                image,
                color,
            } => {
                validation::validate_note_name(&name)?;
                let body = read_body(&body, stdin)?.unwrap_or_default();
                validation::validate_body(&body)?;
                validation::validate_state(&state)?;
                if let Some(ref c) = color {
                    validation::validate_color(c)?;
                }
                let note = notes::create_note(
                    &conn,
                    &notes::NewNote {
                        author,
                        name,
                        body,
                        image,
                        state,
                        background_color: color,
                    },
                )?;
                output::print(mode, &note, || output::print_pretty_record(&note))?;
            }
            NoteAction::Get { id, author } => {
                let note = query::get_note(&conn, &id, &author)?;
                let response = serde_json::json!({ "note": note });
                output::print(mode, &response, || output::print_pretty_note(&note))?;
            }
            NoteAction::Edit {
                id,
                name,
                body,
                stdin,
                state,
                image,
            } => {
                if let Some(ref n) = name {
                    validation::validate_note_name(n)?;
                }
                let body = read_body(&body, stdin)?;
                if let Some(ref b) = body {
                    validation::validate_body(b)?;
                }
                if let Some(ref s) = state {
                    validation::validate_state(s)?;
                }
                let note = notes::update_note_content(
                    &conn,
                    &id,
                    &notes::NoteEdit {
                        name,
                        body,
                        image,
                        state,
                    },
                )?;
                output::print(mode, &note, || output::print_pretty_record(&note))?;
            }
            NoteAction::Rename { id, name } => {
                validation::validate_note_name(&name)?;
                let note = notes::rename_note(&conn, &id, &name)?;
                output::print(mode, &note, || output::print_pretty_record(&note))?;
            }
            NoteAction::Color { id, color } => {
                if let Some(ref c) = color {
                    validation::validate_color(c)?;
                }
                let note = notes::set_background_color(&conn, &id, color.as_deref())?;
                output::print(mode, &note, || output::print_pretty_record(&note))?;
            }
            NoteAction::Delete { id } => {
                notes::delete_note(&conn, &id)?;
                acknowledge(mode, "Note deleted successfully")?;
            }
            NoteAction::State { id } => {
                let state = notes::get_note_state(&conn, &id)?;
                output::print(mode, &state, || output::print_pretty_state(&state))?;
            }
            NoteAction::AddLabels { note_id, label_ids } => {
                validation::validate_label_ids(&label_ids)?;
                let outcome = attach::attach_labels(&mut conn, &note_id, &label_ids)?;
                acknowledge(mode, format!("{} label(s) added to note", outcome.added.len()))?;
            }
            NoteAction::DeleteLabel { label_id, note_id } => {
                attach::detach_label(&mut conn, &note_id, &label_id)?;
                acknowledge(mode, "Label removed from note")?;
            }
            NoteAction::DeleteAllLabels { note_id } => {
                attach::detach_all_labels(&conn, &note_id)?;
                acknowledge(mode, "All labels removed from note")?;
            }
            NoteAction::Pin { note_id, condition } => {
                pin::pin_note(&conn, &note_id, condition)?;
                acknowledge(mode, if condition { "Note pinned" } else { "Note unpinned" })?;
            }
        },

        Commands::Labels {
            user_id,
            search,
            page,
            limit,
        } => {
            if let Some(ref term) = search {
                validation::validate_search(term)?;
            }
            let request = PageRequest::new(page, limit)?;
            let labels = labels::view_labels(&conn, &user_id, search.as_deref(), request)?;
            output::print(mode, &labels, || output::print_pretty_labels(&labels))?;
        }

        Commands::Label { action } => match action {
            LabelAction::Add {
                user_id,
                name,
                color,
                font_color,
                selected_style,
            } => {
                validation::validate_label_name(&name)?;
                validation::validate_color(&color)?;
                validation::validate_color(&font_color)?;
                let style = parse_label_style(&selected_style)?;
                labels::create_label(&conn, &user_id, &name, &color, &font_color, style)?;
                acknowledge(mode, "Label created successfully")?;
            }
            LabelAction::Get { id } => {
                let label = labels::get_label(&conn, &id)?;
                output::print(mode, &label, || output::print_pretty_label(&label))?;
            }
            LabelAction::Edit {
                user_id,
                id,
                name,
                color,
                font_color,
                style,
            } => {
                if let Some(ref n) = name {
                    validation::validate_label_name(n)?;
                }
                for c in [&color, &font_color].into_iter().flatten() {
                    validation::validate_color(c)?;
                }
                let style = style.as_deref().map(parse_label_style).transpose()?;
                labels::edit_label(
                    &conn,
                    &user_id,
                    &id,
                    &labels::LabelEdit {
                        name,
                        color,
                        font_color,
                        style,
                    },
                )?;
                acknowledge(mode, "Label updated successfully")?;
            }
            LabelAction::Delete { id } => {
                labels::delete_label(&conn, &id)?;
                acknowledge(mode, "Label deleted successfully")?;
            }
        },

        Commands::Browse { author } => {
            tui::run_browse(&conn, &author, cli.pinned_page_size, projection)?;
        }
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        let status = e.status();
        let error_json = serde_json::json!({
            "message": e.to_string(),
            "status": status,
        });
        eprintln!("{}", error_json);
        process::exit(if status == 401 { 2 } else { 1 });
    }
}
