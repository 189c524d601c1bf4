//! ER-diagram extraction and syntax repair.
//!
//! Grammar, tried in order:
//! 1. A fenced block (optionally tagged `mermaid`) whose first line starts with
//!    the `erDiagram` keyword; the block interior is returned, trimmed.
//! 2. The first occurrence of the keyword anywhere; everything from there to
//!    the end of the text is returned, trimmed.
//!
//! The keyword match is case-insensitive. Extraction is followed by
//! [`repair`].

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::ExtractionError;

/// Keyword every diagram must start with.
pub const DIAGRAM_KEYWORD: &str = "erDiagram";

static FENCED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```[ \t]*(?:mermaid)?[ \t]*\r?\n?[ \t]*(erdiagram.*?)```")
        .expect("valid regex")
});

static UNFENCED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)(erdiagram.*)").expect("valid regex"));

/// Two key annotations on one field; the diagram syntax accepts one.
static DOUBLE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"PK[ \t]+FK|FK[ \t]+PK").expect("valid regex"));

static ENTITY_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*([A-Za-z_][A-Za-z0-9_]*)[ \t]*\{").expect("valid regex")
});

static RELATIONSHIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*[A-Za-z_][A-Za-z0-9_]*[ \t]+[|}o][|o]?(?:--|\.\.)[|o][|o{]?[ \t]+[A-Za-z_][A-Za-z0-9_]*[ \t]*:",
    )
    .expect("valid regex")
});

/// Locate the diagram in free-form model output and repair it.
pub fn extract_diagram(raw: &str) -> Result<String, ExtractionError> {
    let found = FENCED
        .captures(raw)
        .or_else(|| UNFENCED.captures(raw))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .ok_or(ExtractionError::DiagramNotFound)?;

    let repaired = repair(found);
    debug!(
        entities = ?entity_names(&repaired),
        relationships = relationship_count(&repaired),
        "Extracted diagram"
    );
    Ok(repaired)
}

/// Deterministic syntax fixes, applied in order:
///
/// 1. Remove every backtick.
/// 2. Collapse `PK FK` / `FK PK` into `PK`, repeated until none remain.
///
/// Idempotent; text outside the matched tokens is left byte-for-byte intact.
pub fn repair(diagram: &str) -> String {
    let backticks = diagram.matches('`').count();
    let mut fixed = diagram.replace('`', "");

    let mut collapsed = 0;
    while DOUBLE_KEY.is_match(&fixed) {
        collapsed += DOUBLE_KEY.find_iter(&fixed).count();
        fixed = DOUBLE_KEY.replace_all(&fixed, "PK").into_owned();
    }

    if backticks > 0 || collapsed > 0 {
        debug!(backticks, collapsed, "Repaired diagram syntax");
    }
    fixed
}

/// Names of entity blocks (`NAME {`), in order of appearance.
pub fn entity_names(diagram: &str) -> Vec<String> {
    ENTITY_HEADER
        .captures_iter(diagram)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|name| !name.eq_ignore_ascii_case(DIAGRAM_KEYWORD))
        .collect()
}

/// Number of relationship lines (`A ||--o{ B : label`).
pub fn relationship_count(diagram: &str) -> usize {
    RELATIONSHIP.find_iter(diagram).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "erDiagram\n    USER {\n        int id PK\n        string name\n    }\n    ORDER {\n        int id PK\n        int user_id FK\n    }\n    USER ||--o{ ORDER : places";

    #[test]
    fn fenced_block_returns_interior() {
        let raw = format!("Here you go:\n\n```mermaid\n{BODY}\n```\n\nLet me know!");
        assert_eq!(extract_diagram(&raw).unwrap(), BODY);
    }

    #[test]
    fn untagged_fence_is_accepted() {
        let raw = format!("```\n{BODY}\n```");
        assert_eq!(extract_diagram(&raw).unwrap(), BODY);
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let raw = "```Mermaid\nERDIAGRAM\n    A {\n        int id PK\n    }\n```";
        assert_eq!(
            extract_diagram(raw).unwrap(),
            "ERDIAGRAM\n    A {\n        int id PK\n    }"
        );
    }

    #[test]
    fn unfenced_takes_rest_of_text() {
        let raw = format!("The model is below.\n{BODY}\n\n");
        assert_eq!(extract_diagram(&raw).unwrap(), BODY);
    }

    #[test]
    fn fence_for_other_language_is_skipped() {
        let raw = format!("```sql\nSELECT 1;\n```\n\n```mermaid\n{BODY}\n```");
        assert_eq!(extract_diagram(&raw).unwrap(), BODY);
    }

    #[test]
    fn missing_keyword_is_not_found() {
        let raw = "```mermaid\ngraph TD\n  A --> B\n```";
        assert!(matches!(
            extract_diagram(raw),
            Err(ExtractionError::DiagramNotFound)
        ));
        assert!(extract_diagram("").is_err());
    }

    #[test]
    fn extraction_applies_repairs() {
        let raw = "```mermaid\nerDiagram\n    `order_items` {\n        int order_id PK FK\n    }\n```";
        assert_eq!(
            extract_diagram(raw).unwrap(),
            "erDiagram\n    order_items {\n        int order_id PK\n    }"
        );
    }

    #[test]
    fn repair_strips_backticks() {
        assert_eq!(repair("`User` {\n  int `id` PK\n}"), "User {\n  int id PK\n}");
        assert_eq!(repair("stray ` tick"), "stray  tick");
    }

    #[test]
    fn repair_collapses_double_keys() {
        assert_eq!(repair("int a PK FK\nint b FK PK\n"), "int a PK\nint b PK\n");
        assert_eq!(repair("int a PK\tFK \"note\""), "int a PK \"note\"");
    }

    #[test]
    fn repair_handles_chained_annotations() {
        assert_eq!(repair("x PK FK FK"), "x PK");
        assert_eq!(repair("x FK PK FK"), "x PK");
        assert_eq!(repair("x PK `FK`"), "x PK");
    }

    #[test]
    fn repair_preserves_untouched_whitespace() {
        let input = "erDiagram\r\n\tA {\r\n\t\tint id PK\r\n\t}\r\n\r\n";
        assert_eq!(repair(input), input);
    }

    /// Small deterministic generator so the property checks need no extra crates.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> usize {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (self.0 >> 33) as usize
        }
    }

    fn noisy_diagram(rng: &mut Lcg) -> String {
        const PIECES: &[&str] = &[
            "PK", "FK", " ", "  ", "\t", "\n", "`", "``", "PK FK", "FK PK", "PK  FK", "int id",
            "string name", "USER {", "}", "||--o{", ":", "\"label\"", "UK", "P", "K", "F",
        ];
        let mut out = String::from("erDiagram\n");
        for _ in 0..(5 + rng.next() % 60) {
            out.push_str(PIECES[rng.next() % PIECES.len()]);
        }
        out
    }

    #[test]
    fn repair_properties_hold_for_random_input() {
        let mut rng = Lcg(42);
        for _ in 0..500 {
            let input = noisy_diagram(&mut rng);
            let once = repair(&input);
            assert!(!once.contains('`'), "backtick survived in {once:?}");
            assert!(!once.contains("PK FK"), "PK FK survived in {once:?}");
            assert!(!once.contains("FK PK"), "FK PK survived in {once:?}");
            assert_eq!(repair(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn entity_and_relationship_detection() {
        assert_eq!(entity_names(BODY), vec!["USER", "ORDER"]);
        assert_eq!(relationship_count(BODY), 1);
        assert_eq!(
            relationship_count("A }|..|{ B : \"tags\"\nC |o--|| D : owns"),
            2
        );
    }
}
