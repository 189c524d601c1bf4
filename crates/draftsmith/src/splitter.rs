//! Partition generated long-form Markdown into conditions and supplement.
//!
//! One forward pass over the lines with a current section tag. Per line, first
//! match wins:
//!
//! 1. heading with a conditions keyword: switch to conditions, keep line
//! 2. heading with a field-definition keyword: switch to skip
//! 3. heading with a supplement keyword: switch to supplement, keep line
//! 4. any other `##` heading: leave skip/conditions for supplement, keep line
//! 5. table row (`|...`): drop
//! 6. blank line while skipping: drop
//! 7. anything else: append to the current section unless skipping
//!
//! Text before the first recognised heading lands in the supplement.
//! The first `# ` heading is dropped as a document title unless it matches a
//! keyword set.

/// Used when no line was ever assigned to the conditions section.
pub const DEFAULT_CONDITIONS: &str =
    "## Display Conditions\n- Accessible to authenticated users only";

const CONDITIONS_KEYWORDS: &[&str] = &["条件", "condition", "access", "権限"];
const FIELD_DEFINITION_KEYWORDS: &[&str] = &["項目定義", "項目一覧", "field definition", "fields"];
const SUPPLEMENT_KEYWORDS: &[&str] = &[
    "補足", "supplement", "remark", "備考", "note", "detail", "詳細", "layout", "レイアウト",
    "spec", "仕様",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Conditions,
    Supplement,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sections {
    pub conditions: String,
    pub supplement: String,
}

impl Sections {
    /// Sections that arrived already separated. Table rows and field
    /// definitions are still dropped, and empty conditions get the default.
    pub fn from_parts(conditions: &str, supplement: &str) -> Self {
        Self {
            conditions: or_default_conditions(filter_lines(conditions.trim())),
            supplement: filter_lines(supplement.trim()),
        }
    }
}

pub fn split(text: &str) -> Sections {
    let mut conditions: Vec<&str> = Vec::new();
    let mut supplement: Vec<&str> = Vec::new();
    let mut current = Section::Supplement;
    let mut seen_top_level = false;
    let mut title: Option<&str> = None;

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with('#') {
            let keyword_section = keyword_section(trimmed);
            if !seen_top_level && is_top_level_heading(trimmed) {
                seen_top_level = true;
                if keyword_section.is_none() {
                    title = Some(trimmed);
                }
            }
            let next = keyword_section
                .or_else(|| is_second_level_heading(trimmed).then_some(Section::Supplement));
            if let Some(section) = next {
                current = section;
            }
        } else if trimmed.starts_with('|') {
            continue;
        } else if trimmed.is_empty() && current == Section::Skip {
            continue;
        }

        match current {
            Section::Conditions => conditions.push(line),
            Section::Supplement => supplement.push(line),
            Section::Skip => {}
        }
    }

    let conditions = trim_blank_lines(&conditions.join("\n"));
    let mut supplement = trim_blank_lines(&supplement.join("\n"));

    if let Some(title) = title {
        let (first, rest) = supplement
            .split_once('\n')
            .unwrap_or((supplement.as_str(), ""));
        if first.trim() == title {
            supplement = trim_blank_lines(rest);
        }
    }

    Sections {
        conditions: or_default_conditions(conditions),
        supplement,
    }
}

/// Drop table rows and field-definition blocks from one section's text.
fn filter_lines(text: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut skipping = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            skipping = keyword_section(trimmed) == Some(Section::Skip);
            if skipping {
                continue;
            }
        } else if trimmed.starts_with('|') || skipping {
            continue;
        }
        kept.push(line);
    }

    trim_blank_lines(&kept.join("\n"))
}

/// Section selected by a heading's keywords, in priority order.
fn keyword_section(heading: &str) -> Option<Section> {
    let lowered = heading.to_lowercase();
    if contains_any(&lowered, CONDITIONS_KEYWORDS) {
        Some(Section::Conditions)
    } else if contains_any(&lowered, FIELD_DEFINITION_KEYWORDS) {
        Some(Section::Skip)
    } else if contains_any(&lowered, SUPPLEMENT_KEYWORDS) {
        Some(Section::Supplement)
    } else {
        None
    }
}

fn or_default_conditions(conditions: String) -> String {
    if conditions.is_empty() {
        DEFAULT_CONDITIONS.to_string()
    } else {
        conditions
    }
}

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| haystack.contains(keyword))
}

fn is_top_level_heading(trimmed: &str) -> bool {
    trimmed.starts_with("# ")
}

fn is_second_level_heading(trimmed: &str) -> bool {
    trimmed.starts_with("##") && !trimmed.starts_with("###")
}

/// Strip leading and trailing blank lines, leaving inner text untouched.
fn trim_blank_lines(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(start), Some(end)) => lines[start..=end].join("\n"),
        _ => String::new(),
    }
}
