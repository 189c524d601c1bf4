use std::sync::LazyLock;

use regex::Regex;

use super::ExtractionError;

static FENCED_HTML: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```[ \t]*html[ \t]*\r?\n(.*?)```").expect("valid regex"));

static DOCUMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(?:<!doctype\s+html|<html\b).*</html\s*>").expect("valid regex")
});

/// A self-contained HTML document: a fenced `html` block, else the span from
/// `<!DOCTYPE html>` (or `<html`) through the last `</html>`.
pub fn extract_markup(raw: &str) -> Result<String, ExtractionError> {
    if let Some(inner) = FENCED_HTML
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|inner| !inner.is_empty())
    {
        return Ok(inner.to_string());
    }

    DOCUMENT
        .find(raw)
        .map(|m| m.as_str().to_string())
        .ok_or(ExtractionError::MarkupNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "<!DOCTYPE html>\n<html lang=\"ja\">\n<body><h1>ログイン</h1></body>\n</html>";

    #[test]
    fn fenced_html_block() {
        let raw = format!("Here is the mockup:\n```html\n{PAGE}\n```\nEnjoy.");
        assert_eq!(extract_markup(&raw).unwrap(), PAGE);
    }

    #[test]
    fn bare_document() {
        let raw = format!("Sure, see below.\n\n{PAGE}\n\nHope this helps.");
        assert_eq!(extract_markup(&raw).unwrap(), PAGE);
    }

    #[test]
    fn html_without_doctype() {
        let raw = "prefix <HTML><body>x</body></HTML> suffix";
        assert_eq!(extract_markup(raw).unwrap(), "<HTML><body>x</body></HTML>");
    }

    #[test]
    fn missing_markup() {
        assert_eq!(
            extract_markup("<div>fragment only</div>").unwrap_err(),
            ExtractionError::MarkupNotFound
        );
        assert!(extract_markup("```html\n\n```").is_err());
    }
}
