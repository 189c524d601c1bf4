//! Prompt assembly.
//!
//! Pure string templating: a prompt is a function of the kind, the request
//! and a timestamp. The timestamp is cosmetic and never shapes what the
//! extractors look for.

mod domain;
mod templates;

pub use domain::DomainHint;

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::request::{DocumentSnapshot, GenerationRequest};

/// Template family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Diagram,
    Draft,
    Chat,
    Mockup,
    Modification,
}

pub fn build_prompt(kind: PromptKind, request: &GenerationRequest) -> String {
    build_at(kind, request, Utc::now())
}

pub fn build_at(kind: PromptKind, request: &GenerationRequest, now: DateTime<Utc>) -> String {
    let snapshot = request.document();
    let context = describe_context(request, &snapshot, kind.includes_diagram_text());
    let timestamp = now.format("%Y-%m-%d %H:%M:%S UTC").to_string();

    match kind {
        PromptKind::Diagram => templates::diagram(&request.prompt, &context, &timestamp),
        PromptKind::Draft => {
            let target = match request.target_kind {
                Some(kind) => kind.to_string(),
                None => DomainHint::infer(&request.prompt).to_string(),
            };
            if snapshot.is_blank() {
                templates::complete_draft(&request.prompt, &context, &target, &timestamp)
            } else {
                templates::incremental_draft(&request.prompt, &context, &target, &timestamp)
            }
        }
        PromptKind::Chat => {
            let document_type = request
                .target_kind
                .map_or("general", |kind| kind.as_str());
            templates::chat(&request.prompt, &context, document_type)
        }
        PromptKind::Mockup => templates::mockup(&request.prompt, &context, &timestamp),
        PromptKind::Modification => {
            templates::modification(&request.prompt, &context, &timestamp)
        }
    }
}

impl PromptKind {
    fn includes_diagram_text(&self) -> bool {
        matches!(self, PromptKind::Diagram | PromptKind::Modification)
    }
}

/// Human-readable summary of the caller's project and document.
///
/// Sizes and presence flags only; the diagram text is the one verbatim
/// inclusion, and only when `with_diagram` is set.
fn describe_context(
    request: &GenerationRequest,
    snapshot: &DocumentSnapshot,
    with_diagram: bool,
) -> String {
    let chars = |n: usize| {
        if n == 0 {
            "empty".to_string()
        } else {
            format!("{n} characters")
        }
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "- Project: {}",
        request.project_name().unwrap_or("unspecified")
    );
    let _ = writeln!(out, "- Display conditions: {}", chars(snapshot.conditions_chars));
    let _ = writeln!(out, "- Supplement: {}", chars(snapshot.supplement_chars));
    let _ = writeln!(out, "- Table entries: {}", snapshot.table_entries);
    let _ = writeln!(
        out,
        "- Mockup image: {}",
        if snapshot.has_mockup { "attached" } else { "none" }
    );
    let _ = writeln!(
        out,
        "- Data model diagram: {}",
        if snapshot.diagram.is_some() { "present" } else { "none" }
    );
    let _ = writeln!(
        out,
        "- References: {}",
        if request.references.is_empty() {
            "none".to_string()
        } else {
            request.references.join(", ")
        }
    );

    if with_diagram && let Some(ref diagram) = snapshot.diagram {
        let _ = write!(out, "\nCurrent diagram:\n```mermaid\n{diagram}\n```\n");
    }
    out
}
