//! Pull structured payloads out of free-form model replies.

mod diagram;
mod json;
mod markup;
mod table;

pub use diagram::{DIAGRAM_KEYWORD, entity_names, extract_diagram, relationship_count, repair};
pub use json::{DraftFields, LongForm, extract_json_draft, extract_json_object};
pub use markup::extract_markup;
pub use table::{markdown_table_rows, strip_code_fences};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no diagram found in model output")]
    DiagramNotFound,

    #[error("no JSON object found in model output")]
    JsonNotFound,

    #[error("JSON object is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("no HTML document found in model output")]
    MarkupNotFound,
}
