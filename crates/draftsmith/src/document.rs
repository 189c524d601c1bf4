//! Structured draft: tabular field definitions plus named prose sections.

use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Section name for display/access conditions.
pub const CONDITIONS_SECTION: &str = "conditions";
/// Section name for supplementary notes.
pub const SUPPLEMENT_SECTION: &str = "supplement";

/// One field definition row.
///
/// Accepts the English keys as well as the Japanese column headers
/// (`項目名`, `データ型`, `必須`, `説明`) models tend to echo back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    #[serde(alias = "項目名", alias = "field")]
    pub name: String,
    #[serde(rename = "type", alias = "データ型", alias = "型", alias = "dataType", default)]
    pub data_type: String,
    #[serde(alias = "必須", default, deserialize_with = "deserialize_required")]
    pub required: bool,
    #[serde(alias = "説明", default)]
    pub description: String,
}

impl TableRow {
    pub fn new(name: &str, data_type: &str, required: bool, description: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            required,
            description: description.to_string(),
        }
    }
}

/// Interpret a "required" marker: booleans, or strings such as `○`, `yes`, `必須`.
pub fn is_required_marker(marker: &str) -> bool {
    matches!(
        marker.trim().to_lowercase().as_str(),
        "○" | "◯" | "o" | "y" | "yes" | "true" | "required" | "必須" | "✓" | "✔"
    )
}

fn deserialize_required<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Marker {
        Flag(bool),
        Text(String),
        Null(()),
    }

    match Marker::deserialize(deserializer) {
        Ok(Marker::Flag(flag)) => Ok(flag),
        Ok(Marker::Text(text)) => Ok(is_required_marker(&text)),
        Ok(Marker::Null(())) => Ok(false),
        Err(_) => Err(de::Error::custom("expected a boolean or a marker string")),
    }
}

/// Tabular rows plus long-form sections keyed by section name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredDraft {
    pub table_rows: Vec<TableRow>,
    pub long_form_sections: BTreeMap<String, String>,
}

impl StructuredDraft {
    pub fn new(table_rows: Vec<TableRow>, conditions: String, supplement: String) -> Self {
        let mut long_form_sections = BTreeMap::new();
        long_form_sections.insert(CONDITIONS_SECTION.to_string(), conditions);
        long_form_sections.insert(SUPPLEMENT_SECTION.to_string(), supplement);
        Self {
            table_rows,
            long_form_sections,
        }
    }

    pub fn section(&self, name: &str) -> Option<&str> {
        self.long_form_sections.get(name).map(String::as_str)
    }
}
