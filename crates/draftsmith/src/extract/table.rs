//! Text heuristics for replies that did not contain a usable JSON draft.

use crate::document::{TableRow, is_required_marker};

/// Column titles that mark a header row rather than data.
const HEADER_LABELS: &[&str] = &["項目名", "項目", "フィールド名", "name", "field", "field name"];

pub(crate) fn is_header_label(cell: &str) -> bool {
    let cell = cell.trim();
    HEADER_LABELS
        .iter()
        .any(|label| cell.eq_ignore_ascii_case(label))
}

/// Drop code-fence marker lines, keeping the fenced content.
pub fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Data rows of every Markdown table in `text`.
///
/// A row needs at least two cells. Separator rows (`|---|:--:|`) and the
/// header row directly above a separator are skipped. Columns map to name,
/// type, required marker, description.
pub fn markdown_table_rows(text: &str) -> Vec<TableRow> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let mut rows = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let Some(cells) = table_cells(line) else {
            continue;
        };
        if is_separator(&cells) {
            continue;
        }
        let is_header = lines
            .get(i + 1)
            .and_then(|next| table_cells(next))
            .is_some_and(|next| is_separator(&next));
        if is_header || cells.len() < 2 || is_header_label(cells[0]) || cells[0].is_empty() {
            continue;
        }

        let cell = |n: usize| cells.get(n).copied().unwrap_or_default();
        rows.push(TableRow::new(
            cells[0],
            cell(1),
            is_required_marker(cell(2)),
            cell(3),
        ));
    }
    rows
}

fn table_cells(line: &str) -> Option<Vec<&str>> {
    let inner = line.strip_prefix('|')?;
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    Some(inner.split('|').map(str::trim).collect())
}

fn is_separator(cells: &[&str]) -> bool {
    cells.iter().all(|cell| {
        !cell.is_empty() && cell.chars().all(|c| matches!(c, '-' | ':' | ' '))
    })
}
