//! Canned payloads for when generation cannot complete.
//!
//! Content depends only on the kind, never on the request or the failure, so
//! every fallback of one kind is byte-identical apart from its metadata.

use std::fmt;

use crate::document::{StructuredDraft, TableRow};
use crate::envelope::{ChatPayload, DiagramPayload, MockupPayload, Payload, ResponseEnvelope};
use crate::prompt::PromptKind;
use crate::proposal::{ChangeAction, ChangeTarget, ModificationProposal, ProposedChange};
use crate::splitter::DEFAULT_CONDITIONS;

pub const FALLBACK_DIAGRAM: &str = "\
erDiagram
    USER {
        string id PK
        string name
        string email
        datetime created_at
        datetime updated_at
    }

    PROJECT {
        string id PK
        string name
        string description
        string owner_id FK
        datetime created_at
        datetime updated_at
    }

    DOCUMENT {
        string id PK
        string project_id FK
        string name
        string type
        json content
        datetime created_at
        datetime updated_at
    }

    USER ||--o{ PROJECT : owns
    PROJECT ||--o{ DOCUMENT : contains";

const FALLBACK_DIAGRAM_SUPPLEMENT: &str = "\
## Data Model (fallback)

No model could be generated, so a basic project/document model is shown instead.

### Things to check
1. Provider credentials are set in the environment.
2. The provider endpoints are reachable.
3. The provider service is available.

### Entities
- **USER**: a person using the system
- **PROJECT**: a design project owned by a user
- **DOCUMENT**: a design document within a project

Send the request again once generation is available.";

const FALLBACK_SUPPLEMENT: &str = "\
## Supplement (fallback)
- No draft could be generated; these rows are placeholders.
- Send the request again once generation is available.";

const FALLBACK_REPLY: &str =
    "Sorry, a reply could not be generated right now. Please try again in a moment.";

const FALLBACK_MARKUP: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Mockup unavailable</title>
<style>
  body { font-family: sans-serif; margin: 0; background: #f5f5f5; color: #333; }
  main { max-width: 640px; margin: 80px auto; padding: 32px; background: #fff; border: 1px dashed #bbb; }
</style>
</head>
<body>
<main>
  <h1>Mockup unavailable</h1>
  <p>The mockup could not be generated. Send the request again once generation is available.</p>
</main>
</body>
</html>"#;

fn fallback_rows() -> Vec<TableRow> {
    vec![
        TableRow::new("id", "string", true, "Unique identifier"),
        TableRow::new("name", "string", true, "Display name"),
        TableRow::new("created_at", "datetime", true, "Creation time"),
        TableRow::new("updated_at", "datetime", false, "Last update time"),
    ]
}

fn fallback_proposal() -> ModificationProposal {
    ModificationProposal {
        summary: "Automatic analysis failed; the change request needs manual handling".to_string(),
        changes: vec![ProposedChange {
            target: ChangeTarget::Conditions,
            action: ChangeAction::Add,
            location: "end".to_string(),
            original_content: String::new(),
            new_content: "## Requested change\n*This change request could not be analysed automatically. Apply it manually.*"
                .to_string(),
            reason: "Automatic analysis failed".to_string(),
            confidence: 0.1,
        }],
        risks: vec!["The change must be reviewed and applied by hand".to_string()],
    }
}

/// Deterministic substitute content for one kind.
pub fn payload(kind: PromptKind) -> Payload {
    match kind {
        PromptKind::Diagram => DiagramPayload {
            diagram_text: FALLBACK_DIAGRAM.to_string(),
            supplement: FALLBACK_DIAGRAM_SUPPLEMENT.to_string(),
        }
        .into(),
        PromptKind::Draft => StructuredDraft::new(
            fallback_rows(),
            DEFAULT_CONDITIONS.to_string(),
            FALLBACK_SUPPLEMENT.to_string(),
        )
        .into(),
        PromptKind::Chat => ChatPayload {
            reply: FALLBACK_REPLY.to_string(),
        }
        .into(),
        PromptKind::Mockup => MockupPayload {
            markup: FALLBACK_MARKUP.to_string(),
        }
        .into(),
        PromptKind::Modification => fallback_proposal().into(),
    }
}

/// `mode=fallback` envelope for provider or extraction failures.
pub fn fallback(kind: PromptKind, prompt: &str, reason: impl fmt::Display) -> ResponseEnvelope {
    ResponseEnvelope::fallback(payload(kind), prompt, reason)
}

/// `mode=error` envelope for unexpected faults.
pub fn error(kind: PromptKind, prompt: &str, message: impl fmt::Display) -> ResponseEnvelope {
    ResponseEnvelope::error(payload(kind), prompt, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Mode;
    use crate::extract::{entity_names, extract_diagram, extract_markup};

    const KINDS: [PromptKind; 5] = [
        PromptKind::Diagram,
        PromptKind::Draft,
        PromptKind::Chat,
        PromptKind::Mockup,
        PromptKind::Modification,
    ];

    #[test]
    fn payloads_are_deterministic() {
        for kind in KINDS {
            let a = fallback(kind, "first prompt", "no provider");
            let b = fallback(kind, "another prompt", "timed out");
            assert_eq!(
                serde_json::to_string(&a.payload).unwrap(),
                serde_json::to_string(&b.payload).unwrap()
            );
        }
    }

    #[test]
    fn modes_and_reasons() {
        let envelope = fallback(PromptKind::Chat, "p", "no provider available");
        assert_eq!(envelope.mode(), Mode::Fallback);
        assert_eq!(envelope.metadata.provider_used, None);
        assert_eq!(envelope.metadata.error.as_deref(), Some("no provider available"));

        let envelope = error(PromptKind::Chat, "p", "boom");
        assert_eq!(envelope.mode(), Mode::Error);
        assert_eq!(envelope.metadata.error.as_deref(), Some("boom"));
    }

    #[test]
    fn fallback_diagram_parses_with_extraction_grammar() {
        assert_eq!(extract_diagram(FALLBACK_DIAGRAM).unwrap(), FALLBACK_DIAGRAM);
        assert_eq!(
            entity_names(FALLBACK_DIAGRAM),
            vec!["USER", "PROJECT", "DOCUMENT"]
        );
    }

    #[test]
    fn fallback_markup_parses_with_extraction_grammar() {
        assert_eq!(extract_markup(FALLBACK_MARKUP).unwrap(), FALLBACK_MARKUP);
    }

    #[test]
    fn fallback_draft_has_both_sections() {
        let Payload::Draft(draft) = payload(PromptKind::Draft) else {
            panic!("expected a draft");
        };
        assert_eq!(draft.table_rows.len(), 4);
        assert_eq!(draft.section("conditions"), Some(DEFAULT_CONDITIONS));
        assert!(draft.section("supplement").is_some());
    }
}
