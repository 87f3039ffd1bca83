//! Text cleanup passes applied to extracted content.
//!
//! Each pass is a function `&str -> String` (or a small classifier). The walker
//! runs inline text through [`clean_inline`], code through [`clean_code`], and
//! asks [`code_language`] for language hints found on class attributes.

use std::sync::LazyLock;

use regex::Regex;

/// Clean a run of inline text: drop zero-width characters and anchor glyphs,
/// collapse whitespace, trim.
pub(crate) fn clean_inline(text: &str) -> String {
    let result = strip_zero_width(text);
    let result = collapse_whitespace(&result);
    strip_anchor_glyphs(&result)
}

/// Clean the raw text of a code block, keeping inner whitespace intact.
pub(crate) fn clean_code(raw: &str) -> String {
    let result = normalize_line_endings(raw);
    let result = strip_zero_width(&result);
    trim_blank_edges(&result)
}

// ---------------------------------------------------------------------------
// Pass 1: Zero-width characters
// ---------------------------------------------------------------------------

/// Remove zero-width spaces, joiners and BOMs that doc generators sprinkle
/// into headings and permalinks.
fn strip_zero_width(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}'))
        .collect()
}

// ---------------------------------------------------------------------------
// Pass 2: Whitespace
// ---------------------------------------------------------------------------

/// Collapse any run of whitespace (including non-breaking spaces) into a
/// single space and trim the ends.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split(|c: char| c.is_whitespace() || c == '\u{00A0}') {
        if word.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

// ---------------------------------------------------------------------------
// Pass 3: Permalink glyphs
// ---------------------------------------------------------------------------

/// Drop trailing permalink markers (`¶`, `#`, `🔗`) left over from heading anchors.
fn strip_anchor_glyphs(text: &str) -> String {
    static GLYPH_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s*(?:¶|🔗|#)+$").expect("valid regex"));

    // "#" alone, "C#" and "F#" are content, not permalinks.
    if text.len() > 1 && !text.ends_with("C#") && !text.ends_with("F#") {
        GLYPH_RE.replace(text, "").to_string()
    } else {
        text.to_string()
    }
}

// ---------------------------------------------------------------------------
// Pass 4: Code blocks
// ---------------------------------------------------------------------------

fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Remove leading and trailing blank lines and trailing whitespace at the end.
fn trim_blank_edges(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(start), Some(end)) => lines[start..=end].join("\n").trim_end().to_string(),
        _ => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Language hints
// ---------------------------------------------------------------------------

/// Extract a language hint from one class name.
///
/// Handles `language-js`, `lang-python`, `highlight-source-rust`, `highlight-rust`.
pub(crate) fn code_language(class: &str) -> Option<String> {
    static LANG_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^(?:language-|lang-|highlight-source-|highlight-)([A-Za-z0-9_+#.-]+)$")
            .expect("valid regex")
    });

    let lang = LANG_PREFIX_RE.captures(class)?.get(1)?.as_str().to_lowercase();
    match lang.as_str() {
        "default" | "none" | "text" | "plaintext" => None,
        _ => Some(lang),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
