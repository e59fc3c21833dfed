use std::sync::LazyLock;

use regex::Regex;

struct Patterns {
    link: Regex,
    line_marker: Regex,
    bold: Regex,
    italic: Regex,
    underline: Regex,
    strike: Regex,
    code: Regex,
    annotation: Regex,
    whitespace: Regex,
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in normalization pattern compiles")
}

static PATTERNS: LazyLock<Patterns> = LazyLock::new(|| Patterns {
    link: compile(r"!?\[([^\]]*)\]\([^)]*\)"),
    line_marker: compile(r"(?m)^[ \t]{0,3}(?:#{1,6}[ \t]+|>[ \t]?|[-*+][ \t]+)"),
    bold: compile(r"(?:\*\*([^*]+)\*\*|__([^_]+)__)"),
    italic: compile(r"\*([^*\s][^*]*)\*"),
    underline: compile(r"_([^_]+)_"),
    strike: compile(r"~~([^~]+)~~"),
    code: compile(r"`([^`]*)`"),
    annotation: compile(r"\[[^\]]*\]"),
    whitespace: compile(r"\s+"),
});

const ENTITIES: [(&str, &str); 7] = [
    ("&#x200B;", ""),
    ("\u{200B}", ""),
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
];

/// Normalize story text for narration and subtitles.
///
/// Markdown markup is stripped (link labels and emphasized words are kept), bracketed
/// annotations like `[removed]` are dropped, common HTML entities are decoded, and whitespace
/// runs collapse to a single space. The result is what the segmenter splits into words.
pub fn normalize_text(raw: &str) -> String {
    let p = &*PATTERNS;

    let mut text = raw.to_string();
    for (entity, replacement) in ENTITIES {
        text = text.replace(entity, replacement);
    }
    // `&amp;` last so `&amp;lt;` decodes to a literal `&lt;`.
    text = text.replace("&amp;", "&");

    let text = p.link.replace_all(&text, "$1");
    let text = p.line_marker.replace_all(&text, "");
    let text = p.bold.replace_all(&text, "$1$2");
    let text = p.italic.replace_all(&text, "$1");
    let text = p.underline.replace_all(&text, "$1");
    let text = p.strike.replace_all(&text, "$1");
    let text = p.code.replace_all(&text, "$1");
    let text = p.annotation.replace_all(&text, "");
    let text = p.whitespace.replace_all(&text, " ");
    text.trim().to_string()
}

#[cfg(test)]
#[path = "../../tests/unit/text/normalize.rs"]
mod tests;
