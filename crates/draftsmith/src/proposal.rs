//! Modification proposals: suggested edits to an existing design document.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::extract::{ExtractionError, extract_json_object};

const DEFAULT_SUMMARY: &str = "Proposed changes to the design document";
const DEFAULT_REASON: &str = "No reason given";
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Document part a change applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeTarget {
    Conditions,
    Supplement,
    Spreadsheet,
    Mermaid,
}

impl ChangeTarget {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "conditions" => Some(Self::Conditions),
            "supplement" | "supplementary" => Some(Self::Supplement),
            "spreadsheet" => Some(Self::Spreadsheet),
            "mermaid" => Some(Self::Mermaid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Add,
    Modify,
    Delete,
}

impl ChangeAction {
    /// Unknown actions are treated as edits.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "add" => Self::Add,
            "delete" => Self::Delete,
            _ => Self::Modify,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedChange {
    pub target: ChangeTarget,
    pub action: ChangeAction,
    pub location: String,
    pub original_content: String,
    pub new_content: String,
    pub reason: String,
    /// Always within `[0, 1]`.
    pub confidence: f64,
}

impl ProposedChange {
    /// Normalise one model-supplied change; `None` when the target is unknown.
    fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let text = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let target = match object.get("target").and_then(Value::as_str) {
            Some(raw) if !raw.trim().is_empty() => match ChangeTarget::parse(raw) {
                Some(target) => target,
                None => {
                    debug!(change_target = raw, "Dropping change with unknown target");
                    return None;
                }
            },
            _ => ChangeTarget::Conditions,
        };

        let reason = text("reason");
        Some(Self {
            target,
            action: object
                .get("action")
                .and_then(Value::as_str)
                .map_or(ChangeAction::Modify, ChangeAction::parse),
            location: text("location"),
            original_content: text("originalContent"),
            new_content: text("newContent"),
            reason: if reason.trim().is_empty() {
                DEFAULT_REASON.to_string()
            } else {
                reason
            },
            confidence: object
                .get("confidence")
                .and_then(Value::as_f64)
                .map_or(DEFAULT_CONFIDENCE, |c| c.clamp(0.0, 1.0)),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModificationProposal {
    pub summary: String,
    pub changes: Vec<ProposedChange>,
    pub risks: Vec<String>,
}

impl ModificationProposal {
    /// Build from a parsed JSON object; requires a `changes` array.
    pub fn from_object(object: &Map<String, Value>) -> Result<Self, ExtractionError> {
        let changes = object
            .get("changes")
            .and_then(Value::as_array)
            .ok_or(ExtractionError::MissingField("changes"))?;

        let summary = object
            .get("summary")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SUMMARY)
            .to_string();

        let risks = object
            .get("risks")
            .and_then(Value::as_array)
            .map(|risks| {
                risks
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            summary,
            changes: changes.iter().filter_map(ProposedChange::from_value).collect(),
            risks,
        })
    }
}

/// Locate and normalise a proposal in a model reply.
pub fn extract_proposal(raw: &str) -> Result<ModificationProposal, ExtractionError> {
    extract_json_object(raw, ModificationProposal::from_object)
}
