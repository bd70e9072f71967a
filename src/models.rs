//! Core data structures for notes, labels and note state.
//!
//! These structs are the shared language between the store modules (SQL),
//! the CLI layer (clap), and the output layer (serde_json). Serialized field
//! names follow the camelCase shape consumers of the notes API expect.

use serde::Serialize;

/// A user-owned tag that can be attached to any number of notes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub color: String,
    pub font_color: String,
    #[serde(rename = "type")]
    pub style: LabelStyle,
    pub created_at: String,
    pub updated_at: String,
}

/// Visual style of a label chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelStyle {
    Default,
    Outlined,
}

impl LabelStyle {
    /// Parse from a CLI string. Returns None for unrecognized styles.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "default" => Some(Self::Default),
            "outlined" => Some(Self::Outlined),
            _ => None,
        }
    }

    /// The string stored in SQLite and displayed in output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Outlined => "outlined",
        }
    }
}

impl std::fmt::Display for LabelStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-note display and sharing settings.
///
/// `shared` and `permissions` are stored and returned but never enforced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSettings {
    pub pinned: bool,
    pub shared: bool,
    pub permissions: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_background_color: Option<String>,
}

impl Default for NoteSettings {
    fn default() -> Self {
        Self {
            pinned: false,
            shared: false,
            permissions: serde_json::Value::Array(vec![]),
            note_background_color: None,
        }
    }
}

/// A note record as stored: `labels` holds raw label ids in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub author: String,
    pub name: String,
    pub body: String,
    pub labels: Vec<String>,
    pub image: Option<String>,
    pub state: String,
    pub settings: NoteSettings,
    pub created_at: String,
    pub updated_at: String,
}

/// Opaque serialized editor content, stored apart from note metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteState {
    pub id: String,
    pub state: String,
    /// None only while the owning note is being created.
    pub note_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A note with its label ids resolved to label documents.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteView {
    pub id: String,
    pub author: String,
    pub name: String,
    pub body: String,
    pub labels: Vec<Label>,
    /// Length of the stored id array, including duplicates and ids whose
    /// label no longer exists.
    pub label_array_size: usize,
    pub image: Option<String>,
    pub state: String,
    pub settings: NoteSettings,
    pub created_at: String,
    pub updated_at: String,
}

/// Plain `{ "message": ... }` acknowledgement returned by mutations.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_style_roundtrip() {
        for s in ["default", "outlined"] {
            let parsed = LabelStyle::from_str(s).unwrap_or_else(|| panic!("should parse '{}'", s));
            assert_eq!(parsed.as_str(), s);
        }
    }

    #[test]
    fn label_style_rejects_unknown() {
        assert!(LabelStyle::from_str("filled").is_none());
    }

    #[test]
    fn label_serializes_style_as_type() {
        let label = Label {
            id: "l1".into(),
            user_id: "u1".into(),
            name: "Work".into(),
            color: "#ff0000".into(),
            font_color: "#ffffff".into(),
            style: LabelStyle::Outlined,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let json = serde_json::to_value(&label).unwrap();
        assert_eq!(json["type"], "outlined");
        assert_eq!(json["fontColor"], "#ffffff");
        assert_eq!(json["userId"], "u1");
    }

    #[test]
    fn settings_omit_missing_background() {
        let json = serde_json::to_value(NoteSettings::default()).unwrap();
        assert_eq!(json, serde_json::json!({"pinned": false, "shared": false, "permissions": []}));
    }
}
