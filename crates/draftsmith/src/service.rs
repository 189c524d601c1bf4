//! Generation pipelines: prompt, provider chain, extraction, fallback.

use std::fmt::Write;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::document::StructuredDraft;
use crate::envelope::{ChatPayload, DiagramPayload, MockupPayload, Payload, ResponseEnvelope};
use crate::extract::{
    ExtractionError, LongForm, entity_names, extract_diagram, extract_json_draft, extract_markup,
    markdown_table_rows, relationship_count, strip_code_fences,
};
use crate::fallback;
use crate::llm::{ProviderChain, ProviderId};
use crate::prompt::{PromptKind, build_prompt};
use crate::proposal::extract_proposal;
use crate::request::GenerationRequest;
use crate::splitter::{self, Sections};

/// Stateless service shared by every request handler.
#[derive(Clone)]
pub struct GenerationService {
    chain: Arc<ProviderChain>,
}

impl GenerationService {
    pub fn new(chain: ProviderChain) -> Self {
        Self {
            chain: Arc::new(chain),
        }
    }

    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.chain.provider_ids()
    }

    pub async fn generate_data_model(&self, request: &GenerationRequest) -> ResponseEnvelope {
        self.run(PromptKind::Diagram, request, |raw| {
            let diagram_text = extract_diagram(raw)?;
            let supplement = diagram_supplement(&diagram_text, request);
            Ok(DiagramPayload {
                diagram_text,
                supplement,
            })
        })
        .await
    }

    pub async fn generate_design_draft(&self, request: &GenerationRequest) -> ResponseEnvelope {
        self.run(PromptKind::Draft, request, |raw| Ok(draft_from_reply(raw)))
            .await
            .with_target_kind(request.target_kind)
    }

    pub async fn generate_chat_response(&self, request: &GenerationRequest) -> ResponseEnvelope {
        self.run(PromptKind::Chat, request, |raw| {
            Ok(ChatPayload {
                reply: raw.trim().to_string(),
            })
        })
        .await
        .with_target_kind(request.target_kind)
    }

    pub async fn generate_mockup_html(&self, request: &GenerationRequest) -> ResponseEnvelope {
        self.run(PromptKind::Mockup, request, |raw| {
            Ok(MockupPayload {
                markup: extract_markup(raw)?,
            })
        })
        .await
    }

    pub async fn generate_modification_proposal(
        &self,
        request: &GenerationRequest,
    ) -> ResponseEnvelope {
        self.run(PromptKind::Modification, request, extract_proposal)
            .await
    }

    async fn run<P, F>(&self, kind: PromptKind, request: &GenerationRequest, parse: F) -> ResponseEnvelope
    where
        P: Into<Payload>,
        F: FnOnce(&str) -> Result<P, ExtractionError>,
    {
        let prompt = build_prompt(kind, request);

        let result = match self.chain.invoke(&prompt).await {
            Ok(result) => result,
            Err(e) => {
                warn!(kind = ?kind, error = %e, "Generation unavailable, returning fallback");
                return fallback::fallback(kind, &request.prompt, e);
            }
        };

        match parse(&result.raw_text) {
            Ok(payload) => ResponseEnvelope::generated(payload, &request.prompt, result.provider_id),
            Err(e) => {
                warn!(
                    kind = ?kind,
                    provider = %result.provider_id,
                    error = %e,
                    "Could not extract payload, returning fallback"
                );
                fallback::fallback(kind, &request.prompt, e)
            }
        }
    }
}

/// Draft from a JSON reply, else from the reply's Markdown.
fn draft_from_reply(raw: &str) -> StructuredDraft {
    match extract_json_draft(raw) {
        Ok(fields) => {
            let sections = match fields.long_form {
                LongForm::Combined(markdown) => splitter::split(&markdown),
                LongForm::Split {
                    conditions,
                    supplement,
                } => Sections::from_parts(&conditions, &supplement),
            };
            StructuredDraft::new(fields.table_rows, sections.conditions, sections.supplement)
        }
        Err(e) => {
            debug!(error = %e, "No JSON draft in reply, parsing text");
            let text = strip_code_fences(raw);
            let sections = splitter::split(&text);
            StructuredDraft::new(
                markdown_table_rows(&text),
                sections.conditions,
                sections.supplement,
            )
        }
    }
}

/// Markdown summary of a generated model. Deterministic for a given diagram
/// and request.
fn diagram_supplement(diagram: &str, request: &GenerationRequest) -> String {
    let entities = entity_names(diagram);
    let list_or_none = |items: &[String]| {
        if items.is_empty() {
            "none".to_string()
        } else {
            items.join(", ")
        }
    };

    let mut out = String::from("## Data Model\n\n### Overview\n");
    let _ = writeln!(out, "Entity-relationship model designed for: {}\n", request.prompt);
    let _ = writeln!(
        out,
        "- **Project**: {}",
        request.project_name().unwrap_or("unspecified")
    );
    let _ = writeln!(out, "- **Entities**: {}", entities.len());
    let _ = writeln!(out, "- **Relationships**: {}", relationship_count(diagram));
    let _ = writeln!(out, "- **Detected entities**: {}", list_or_none(&entities));
    let _ = writeln!(out, "\n### References\n{}", list_or_none(&request.references));
    out.push_str(
        "\n### Next steps\n\
         1. Review the diagram.\n\
         2. Adjust entities and relationships as needed.\n\
         3. Check consistency with the screen design documents.",
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TableRow;
    use crate::envelope::Mode;
    use crate::llm::testing::{MockProvider, Script, chain_of};
    use crate::proposal::ChangeTarget;
    use crate::request::TargetKind;
    use crate::splitter::DEFAULT_CONDITIONS;
    use serde_json::{Map, Value, json};

    fn service_replying(text: &str) -> (GenerationService, Arc<MockProvider>) {
        let provider = MockProvider::replying(ProviderId::OpenAI, text);
        (GenerationService::new(chain_of(vec![provider.clone()])), provider)
    }

    fn no_providers() -> GenerationService {
        GenerationService::new(chain_of(Vec::new()))
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    const REPLY_DIAGRAM: &str = "Here is the model:\n```mermaid\nerDiagram\n    `CUSTOMER` {\n        int id PK\n    }\n    ORDER {\n        int id PK\n        int customer_id PK FK\n    }\n    CUSTOMER ||--o{ ORDER : places\n```";

    #[tokio::test]
    async fn diagram_is_extracted_and_repaired() {
        let (service, provider) = service_replying(REPLY_DIAGRAM);
        let request = GenerationRequest::new("online shop")
            .with_project_context(Some(object(json!({"name": "Shop"}))))
            .with_references(vec!["checkout".to_string()]);

        let envelope = service.generate_data_model(&request).await;
        assert_eq!(envelope.mode(), Mode::Generated);
        assert_eq!(envelope.metadata.provider_used, Some(ProviderId::OpenAI));
        assert!(provider.last_prompt().unwrap().contains("online shop"));

        let Payload::Diagram(payload) = envelope.payload else {
            panic!("expected a diagram payload");
        };
        assert!(!payload.diagram_text.contains('`'));
        assert!(payload.diagram_text.contains("int customer_id PK\n"));
        assert!(payload.supplement.contains("- **Entities**: 2"));
        assert!(payload.supplement.contains("- **Relationships**: 1"));
        assert!(payload.supplement.contains("CUSTOMER, ORDER"));
        assert!(payload.supplement.contains("- **Project**: Shop"));
        assert!(payload.supplement.contains("checkout"));
    }

    #[tokio::test]
    async fn existing_diagram_reaches_prompt() {
        let (service, provider) = service_replying(REPLY_DIAGRAM);
        let request = GenerationRequest::new("add invoices").with_document_state(Some(object(
            json!({"mermaidCode": "erDiagram\n    LEGACY_TABLE {\n    }"}),
        )));
        service.generate_data_model(&request).await;
        assert!(provider.last_prompt().unwrap().contains("LEGACY_TABLE"));
    }

    #[tokio::test]
    async fn zero_providers_fall_back_to_parseable_diagram() {
        let service = no_providers();
        let envelope = service
            .generate_data_model(&GenerationRequest::new("anything"))
            .await;
        assert_eq!(envelope.mode(), Mode::Fallback);
        assert_eq!(envelope.metadata.provider_used, None);
        assert_eq!(envelope.metadata.prompt_echo, "anything");

        let Payload::Diagram(payload) = envelope.payload else {
            panic!("expected a diagram payload");
        };
        assert_eq!(extract_diagram(&payload.diagram_text).unwrap(), payload.diagram_text);
    }

    #[tokio::test]
    async fn unusable_diagram_reply_falls_back() {
        let (service, _) = service_replying("I would need more details first.");
        let envelope = service
            .generate_data_model(&GenerationRequest::new("x"))
            .await;
        assert_eq!(envelope.mode(), Mode::Fallback);
        assert_eq!(envelope.metadata.provider_used, None);
        assert_eq!(
            envelope.metadata.error.as_deref(),
            Some("no diagram found in model output")
        );
    }

    #[tokio::test]
    async fn failing_provider_falls_back() {
        let provider = MockProvider::new(ProviderId::Bedrock, Script::Fail(500));
        let service = GenerationService::new(chain_of(vec![provider.clone()]));
        let envelope = service
            .generate_chat_response(&GenerationRequest::new("hello"))
            .await;
        assert_eq!(envelope.mode(), Mode::Fallback);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn draft_from_json_reply() {
        let reply = r###"```json
{
  "spreadsheetData": [
    {"項目名": "email", "データ型": "string", "必須": "○", "説明": "Login id"}
  ],
  "markdownContent": "# Login\n\n## 表示条件\n- Guests only\n\n## 項目定義\n| email | string |\n\n## 補足\n- Lock after 5 failures"
}
```"###;
        let (service, _) = service_replying(reply);
        let request = GenerationRequest::new("login").with_target_kind(Some(TargetKind::Screen));
        let envelope = service.generate_design_draft(&request).await;
        assert_eq!(envelope.mode(), Mode::Generated);
        assert_eq!(envelope.metadata.target_kind, Some(TargetKind::Screen));

        let Payload::Draft(draft) = envelope.payload else {
            panic!("expected a draft payload");
        };
        assert_eq!(
            draft.table_rows,
            vec![TableRow::new("email", "string", true, "Login id")]
        );
        assert_eq!(draft.section("conditions"), Some("## 表示条件\n- Guests only"));
        assert_eq!(draft.section("supplement"), Some("## 補足\n- Lock after 5 failures"));
    }

    #[tokio::test]
    async fn draft_from_split_json_sections() {
        let reply = r#"{"type": "mixed", "spreadsheetData": [], "conditions": "", "supplement": " ## Notes\n- none "}"#;
        let (service, _) = service_replying(reply);
        let envelope = service
            .generate_design_draft(&GenerationRequest::new("x"))
            .await;
        let Payload::Draft(draft) = envelope.payload else {
            panic!("expected a draft payload");
        };
        assert_eq!(draft.section("conditions"), Some(DEFAULT_CONDITIONS));
        assert_eq!(draft.section("supplement"), Some("## Notes\n- none"));
    }

    #[tokio::test]
    async fn split_json_sections_drop_tables_and_field_definitions() {
        let reply = r###"{"spreadsheetData": [], "conditions": "# 表示条件\n- 会員のみ\n| email | string |", "supplement": "## 項目定義\nemail, name\n\n# 補足説明\n- なし"}"###;
        let (service, _) = service_replying(reply);
        let envelope = service
            .generate_design_draft(&GenerationRequest::new("x"))
            .await;
        let Payload::Draft(draft) = envelope.payload else {
            panic!("expected a draft payload");
        };
        assert_eq!(draft.section("conditions"), Some("# 表示条件\n- 会員のみ"));
        assert_eq!(draft.section("supplement"), Some("# 補足説明\n- なし"));
    }

    #[tokio::test]
    async fn draft_from_plain_text_reply() {
        let reply = "```markdown\n## Access conditions\n- Members only\n\n| Field | Type | Required |\n|---|---|---|\n| nickname | string | yes |\n\n## Notes\n- Max 20 chars\n```";
        let (service, _) = service_replying(reply);
        let envelope = service
            .generate_design_draft(&GenerationRequest::new("profile"))
            .await;
        assert_eq!(envelope.mode(), Mode::Generated);

        let Payload::Draft(draft) = envelope.payload else {
            panic!("expected a draft payload");
        };
        assert_eq!(
            draft.table_rows,
            vec![TableRow::new("nickname", "string", true, "")]
        );
        assert_eq!(
            draft.section("conditions"),
            Some("## Access conditions\n- Members only")
        );
        assert_eq!(draft.section("supplement"), Some("## Notes\n- Max 20 chars"));
    }

    #[tokio::test]
    async fn chat_reply_is_trimmed() {
        let (service, _) = service_replying("\n  Add a password reset link.  \n");
        let envelope = service
            .generate_chat_response(&GenerationRequest::new("what is missing?"))
            .await;
        let Payload::Chat(chat) = envelope.payload else {
            panic!("expected a chat payload");
        };
        assert_eq!(chat.reply, "Add a password reset link.");
    }

    #[tokio::test]
    async fn mockup_extracted_or_fallback() {
        let (service, _) = service_replying("```html\n<!DOCTYPE html><html><body>hi</body></html>\n```");
        let envelope = service
            .generate_mockup_html(&GenerationRequest::new("landing"))
            .await;
        assert_eq!(envelope.mode(), Mode::Generated);
        let Payload::Mockup(mockup) = envelope.payload else {
            panic!("expected a mockup payload");
        };
        assert_eq!(mockup.markup, "<!DOCTYPE html><html><body>hi</body></html>");

        let (service, _) = service_replying("<div>just a fragment</div>");
        let envelope = service
            .generate_mockup_html(&GenerationRequest::new("landing"))
            .await;
        assert_eq!(envelope.mode(), Mode::Fallback);
    }

    #[tokio::test]
    async fn modification_proposal_generated_or_fallback() {
        let (service, _) = service_replying(
            r#"{"summary": "Tighten access", "changes": [{"target": "conditions", "action": "modify", "newContent": "- Admins only"}]}"#,
        );
        let envelope = service
            .generate_modification_proposal(&GenerationRequest::new("admins only"))
            .await;
        assert_eq!(envelope.mode(), Mode::Generated);
        let Payload::Proposal(proposal) = envelope.payload else {
            panic!("expected a proposal payload");
        };
        assert_eq!(proposal.summary, "Tighten access");
        assert_eq!(proposal.changes[0].target, ChangeTarget::Conditions);

        let (service, _) = service_replying("Sure, I will change it.");
        let envelope = service
            .generate_modification_proposal(&GenerationRequest::new("admins only"))
            .await;
        assert_eq!(envelope.mode(), Mode::Fallback);
        let Payload::Proposal(proposal) = envelope.payload else {
            panic!("expected a proposal payload");
        };
        assert_eq!(proposal.changes.len(), 1);
        assert_eq!(proposal.changes[0].confidence, 0.1);
    }

    #[test]
    fn supplement_is_deterministic() {
        let request = GenerationRequest::new("blog");
        let diagram = "erDiagram\n    POST {\n        int id PK\n    }";
        let a = diagram_supplement(diagram, &request);
        assert_eq!(a, diagram_supplement(diagram, &request));
        assert!(a.contains("- **Detected entities**: POST"));
        assert!(a.contains("### References\nnone"));
    }
}
