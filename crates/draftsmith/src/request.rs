//! Normalised generation request and the document-state snapshot derived from it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What kind of design document the caller is working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Screen,
    Model,
    Api,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Screen => "screen",
            TargetKind::Model => "model",
            TargetKind::Api => "api",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "screen" => Ok(TargetKind::Screen),
            "model" | "database" => Ok(TargetKind::Model),
            "api" => Ok(TargetKind::Api),
            other => Err(format!("unknown target kind: {other}")),
        }
    }
}

/// One inbound generation call, immutable once built.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub prompt: String,
    pub target_kind: Option<TargetKind>,
    pub project_context: Option<Map<String, Value>>,
    pub prior_document_state: Option<Map<String, Value>>,
    pub references: Vec<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_target_kind(mut self, kind: Option<TargetKind>) -> Self {
        self.target_kind = kind;
        self
    }

    #[must_use]
    pub fn with_project_context(mut self, context: Option<Map<String, Value>>) -> Self {
        self.project_context = context;
        self
    }

    #[must_use]
    pub fn with_document_state(mut self, state: Option<Map<String, Value>>) -> Self {
        self.prior_document_state = state;
        self
    }

    #[must_use]
    pub fn with_references(mut self, references: Vec<String>) -> Self {
        self.references = references;
        self
    }

    /// Project name from the context, if one was given.
    pub fn project_name(&self) -> Option<&str> {
        self.project_context
            .as_ref()
            .and_then(|ctx| ctx.get("name"))
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty())
    }

    pub fn document(&self) -> DocumentSnapshot {
        self.prior_document_state
            .as_ref()
            .map(DocumentSnapshot::from_state)
            .unwrap_or_default()
    }
}

/// Counts and presence flags describing the caller's current document.
///
/// Only the diagram text is carried verbatim; prose, table contents and the
/// mockup image are reduced to sizes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub conditions_chars: usize,
    pub supplement_chars: usize,
    pub table_entries: usize,
    pub has_mockup: bool,
    pub diagram: Option<String>,
}

impl DocumentSnapshot {
    pub const CONDITIONS_KEY: &'static str = "conditionsMarkdown";
    pub const SUPPLEMENT_KEY: &'static str = "supplementMarkdown";
    pub const TABLE_KEY: &'static str = "spreadsheetData";
    pub const MOCKUP_KEY: &'static str = "mockupImage";
    pub const DIAGRAM_KEY: &'static str = "mermaidCode";

    pub fn from_state(state: &Map<String, Value>) -> Self {
        let text = |key: &str| {
            state
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };

        Self {
            conditions_chars: text(Self::CONDITIONS_KEY).map_or(0, |s| s.chars().count()),
            supplement_chars: text(Self::SUPPLEMENT_KEY).map_or(0, |s| s.chars().count()),
            table_entries: state.get(Self::TABLE_KEY).map_or(0, count_table_entries),
            has_mockup: text(Self::MOCKUP_KEY).is_some(),
            diagram: text(Self::DIAGRAM_KEY).map(str::to_string),
        }
    }

    /// At least three of the four editable parts are empty.
    pub fn is_blank(&self) -> bool {
        [
            self.conditions_chars == 0,
            self.supplement_chars == 0,
            self.table_entries == 0,
            !self.has_mockup,
        ]
        .into_iter()
        .filter(|empty| *empty)
        .count()
            >= 3
    }
}

/// Row count for a flat row list, or cell count of the first sheet for
/// sheet-shaped data (`[{celldata: [...]}, ...]`).
fn count_table_entries(value: &Value) -> usize {
    let Some(items) = value.as_array() else {
        return 0;
    };
    match items.first().and_then(|first| first.get("celldata")) {
        Some(cells) => cells.as_array().map_or(0, Vec::len),
        None => items.len(),
    }
}
