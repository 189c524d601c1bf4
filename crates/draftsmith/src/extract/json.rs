//! JSON object extraction.
//!
//! Candidates are found with a balanced-brace scan that understands string
//! literals and escapes, so braces inside strings or several independent
//! objects in one reply do not confuse it. Each candidate (leftmost first) is
//! parsed strictly and offered to an `accept` callback that checks for the
//! fields the caller needs. When no balanced candidate is accepted, the
//! greedy first-`{`-to-last-`}` span is tried as a last resort.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use super::ExtractionError;
use super::table::is_header_label;
use crate::document::{TableRow, is_required_marker};

/// Fields accepted as the tabular part of a draft.
const TABLE_FIELDS: &[&str] = &["spreadsheetData", "tableRows"];
/// Fields accepted as a single combined long-form text.
const MARKDOWN_FIELDS: &[&str] = &["markdownContent", "longForm"];

/// Find the first JSON object in `raw` that `accept` turns into a value.
///
/// Returns the last rejection reason when objects were found but none was
/// accepted, `JsonNotFound` when nothing parsed at all.
pub fn extract_json_object<T>(
    raw: &str,
    accept: impl Fn(&Map<String, Value>) -> Result<T, ExtractionError>,
) -> Result<T, ExtractionError> {
    let mut rejection = None;

    for (start, _) in raw.match_indices('{') {
        let Some(end) = balanced_end(raw, start) else {
            continue;
        };
        if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(&raw[start..end]) {
            match accept(&object) {
                Ok(value) => return Ok(value),
                Err(e) => rejection = Some(e),
            }
        }
    }

    if let (Some(first), Some(last)) = (raw.find('{'), raw.rfind('}'))
        && first < last
        && let Ok(Value::Object(object)) = serde_json::from_str::<Value>(&raw[first..=last])
    {
        debug!("Balanced scan found nothing usable, accepted greedy span");
        return accept(&object);
    }

    Err(rejection.unwrap_or(ExtractionError::JsonNotFound))
}

/// Byte offset one past the `}` closing the object that opens at `start`.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

// ============================================================================
// Draft
// ============================================================================

/// Long-form text as the model delivered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LongForm {
    /// One Markdown document still to be split into sections.
    Combined(String),
    /// Sections already separated by the model.
    Split {
        conditions: String,
        supplement: String,
    },
}

/// The two parts every JSON draft must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftFields {
    pub table_rows: Vec<TableRow>,
    pub long_form: LongForm,
}

/// Extract a draft object holding a tabular field and a long-form field.
pub fn extract_json_draft(raw: &str) -> Result<DraftFields, ExtractionError> {
    extract_json_object(raw, draft_fields)
}

fn draft_fields(object: &Map<String, Value>) -> Result<DraftFields, ExtractionError> {
    let table = TABLE_FIELDS
        .iter()
        .find_map(|key| object.get(*key))
        .filter(|value| value.is_array())
        .ok_or(ExtractionError::MissingField("spreadsheetData"))?;

    let long_form = match MARKDOWN_FIELDS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
    {
        Some(markdown) => LongForm::Combined(markdown.to_string()),
        None => {
            let conditions = object.get("conditions").and_then(Value::as_str);
            let supplement = object.get("supplement").and_then(Value::as_str);
            if conditions.is_none() && supplement.is_none() {
                return Err(ExtractionError::MissingField("markdownContent"));
            }
            LongForm::Split {
                conditions: conditions.unwrap_or_default().to_string(),
                supplement: supplement.unwrap_or_default().to_string(),
            }
        }
    };

    Ok(DraftFields {
        table_rows: table_rows_from_value(table),
        long_form,
    })
}

/// Rows from either a list of row objects or a list of grid cells
/// (`{r, c, v}`), optionally wrapped in a sheet (`[{celldata: [...]}]`).
fn table_rows_from_value(value: &Value) -> Vec<TableRow> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    if let Some(cells) = items
        .first()
        .and_then(|first| first.get("celldata"))
        .and_then(Value::as_array)
    {
        return rows_from_cells(cells);
    }
    if items.iter().any(is_cell) {
        return rows_from_cells(items);
    }

    items
        .iter()
        .filter_map(|item| serde_json::from_value::<TableRow>(item.clone()).ok())
        .filter(|row| !row.name.trim().is_empty() && !is_header_label(&row.name))
        .collect()
}

fn is_cell(value: &Value) -> bool {
    value.get("r").is_some_and(Value::is_u64) && value.get("c").is_some_and(Value::is_u64)
}

fn rows_from_cells(cells: &[Value]) -> Vec<TableRow> {
    let mut grid: BTreeMap<u64, BTreeMap<u64, String>> = BTreeMap::new();
    for cell in cells {
        let (Some(r), Some(c)) = (
            cell.get("r").and_then(Value::as_u64),
            cell.get("c").and_then(Value::as_u64),
        ) else {
            continue;
        };
        if let Some(text) = cell.get("v").and_then(cell_text) {
            grid.entry(r).or_default().insert(c, text);
        }
    }

    grid.into_values()
        .filter_map(|columns| {
            let column = |c: u64| columns.get(&c).map(String::as_str).unwrap_or_default();
            let name = column(0).trim();
            if name.is_empty() || is_header_label(name) {
                return None;
            }
            Some(TableRow::new(
                name,
                column(1).trim(),
                is_required_marker(column(2)),
                column(3).trim(),
            ))
        })
        .collect()
}

/// Cell values are plain scalars or objects carrying `v` / `m`.
fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(inner) => inner.get("v").or_else(|| inner.get("m")).and_then(cell_text),
        _ => None,
    }
}
