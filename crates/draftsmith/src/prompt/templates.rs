//! Instruction templates, one per prompt family.

pub(super) fn diagram(user: &str, context: &str, timestamp: &str) -> String {
    format!(
        r#"You are an experienced database designer. Design an entity-relationship model for the request below.

Request: {user}
Requested at: {timestamp}

## Current project
{context}
## Output rules
- Respond only with a single fenced code block that opens with ```mermaid on its own line.
- The first line inside the block must be `erDiagram`, and the block closes with ```.
- Declare every entity as `NAME {{ type field_name [PK|FK] }}` with one field per line.
- Give each field at most one key annotation: either PK or FK, never both.
- Never use backticks inside the diagram.
- Declare relationships as `A ||--o{{ B : label`.
- If a current diagram is shown above, extend it instead of starting over.
"#
    )
}

const DRAFT_EXAMPLE: &str = r###"```json
{
  "spreadsheetData": [
    {"項目名": "email", "データ型": "string", "必須": "○", "説明": "Login identifier"},
    {"項目名": "display_name", "データ型": "string", "必須": "-", "説明": "Shown in the header"}
  ],
  "markdownContent": "## Display Conditions\n- ...\n\n## Supplement\n- ..."
}
```"###;

pub(super) fn complete_draft(user: &str, context: &str, target: &str, timestamp: &str) -> String {
    format!(
        r#"You are an experienced author of screen design documents. The document is still empty, so produce a complete design draft in one pass.

Request: {user}
Target: {target}
Requested at: {timestamp}

## Current document
{context}
## Output format
Respond as a single JSON object with exactly two fields:
- `spreadsheetData`: an array of field definitions, 10 to 15 rows, each with `項目名`, `データ型`, `必須` (`○` or `-`) and `説明`.
- `markdownContent`: Markdown with a `## Display Conditions` section (access rules, visibility, transitions) followed by a `## Supplement` section (security, performance, maintainability notes).

Example:
{DRAFT_EXAMPLE}

Do not repeat the field definitions as a Markdown table inside `markdownContent`.
"#
    )
}

pub(super) fn incremental_draft(
    user: &str,
    context: &str,
    target: &str,
    timestamp: &str,
) -> String {
    format!(
        r#"You are an experienced author of screen design documents. Extend the existing document according to the request; keep what is already there consistent.

Request: {user}
Target: {target}
Requested at: {timestamp}

## Current document
{context}
## Output format
Respond as a single JSON object with exactly two fields, `spreadsheetData` (new or changed field definitions only) and `markdownContent` (Markdown for the display conditions and supplement sections):
{DRAFT_EXAMPLE}
"#
    )
}

pub(super) fn chat(user: &str, context: &str, document_type: &str) -> String {
    format!(
        r#"You are an assistant helping a team write software design documents. Answer concisely and concretely, in the language of the question. Suggest specific edits when they help.

Document type: {document_type}

## Current project
{context}
## Question
{user}"#
    )
}

pub(super) fn mockup(user: &str, context: &str, timestamp: &str) -> String {
    format!(
        r#"You are a UI designer. Produce a static HTML mockup of the screen described below.

Request: {user}
Requested at: {timestamp}

## Current project
{context}
## Output rules
- Respond with one complete HTML document in a fenced code block tagged `html`, starting with `<!DOCTYPE html>`.
- Inline all CSS in a `<style>` element; no external stylesheets, fonts, images or scripts.
- Use realistic sample data and a layout that fits a 1280px wide viewport.
"#
    )
}

pub(super) fn modification(user: &str, context: &str, timestamp: &str) -> String {
    format!(
        r#"You are reviewing a software design document. Turn the change request below into concrete, minimal edits.

Change request: {user}
Requested at: {timestamp}

## Current document
{context}
## Output format
Respond with a single JSON object in a fenced code block tagged `json`:
```json
{{
  "summary": "One-sentence description of the change",
  "changes": [
    {{
      "target": "conditions",
      "action": "add",
      "location": "Where in the target the edit applies",
      "originalContent": "Text being replaced (empty for add)",
      "newContent": "Text after the edit",
      "reason": "Why this edit is needed",
      "confidence": 0.85
    }}
  ],
  "risks": ["Possible side effect"]
}}
```
- `target` must be one of `conditions`, `supplement`, `spreadsheet`, `mermaid`.
- `action` must be one of `add`, `modify`, `delete`.
- `confidence` is a number between 0 and 1.
- For entity or relationship changes use `target: "mermaid"` and write `newContent` as `erDiagram` syntax with at most one key annotation per field.
"#
    )
}
