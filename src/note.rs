//! Plaintext note model.
//!
//! The note-taking client owns editing and validation; this crate only
//! serializes notes for encryption and reconstructs them after retrieval.
//! The wire shape is the camelCase JSON the client has always persisted,
//! so notes uploaded by older builds keep decoding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A decrypted note as the client hands it to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaintextNote {
    pub title: String,

    pub content: String,

    /// Template identifier chosen by the editor ("plain", "checklist", ...).
    /// Opaque to the pipeline.
    pub template: String,

    /// Per-line completion timestamps for checklist templates, keyed by
    /// line index, values are ISO-8601 strings.
    #[serde(default)]
    pub completion_timestamps: BTreeMap<u32, String>,
}

impl PlaintextNote {
    /// Create a note with no checklist state.
    pub fn new(title: impl Into<String>, content: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            template: template.into(),
            completion_timestamps: BTreeMap::new(),
        }
    }

    /// Placeholder entry for an anchor record that has no content pointer
    /// yet. The caller can still render the row and show its permanence
    /// flag; title and content make the missing payload obvious.
    pub fn placeholder(note_id: u64) -> Self {
        Self::new(
            format!("Note #{}", note_id),
            "Content not yet uploaded",
            "plain",
        )
    }

    /// Serialize to the JSON wire form used inside envelopes.
    pub fn to_wire_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a note from envelope plaintext.
    pub fn from_wire_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
