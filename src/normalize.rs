//! Turns a raw description fragment into bounded plain text. Idempotent:
//! running it over its own output is a no-op.

use regex::Regex;

/// Upper bound on normalized description length. The destination database
/// enforces its own 2,000-character per-field ceiling downstream; this bound
/// keeps the text small enough for the optional AI pass as well.
pub const MAX_DESCRIPTION_CHARS: usize = 5000;

pub fn normalize(raw_markup: &str) -> String {
    let mut text = raw_markup.replace("\r\n", "\n").replace('\r', "\n");

    // Script and style bodies are noise, not content.
    text = replace_all(&text, r"(?is)<script\b[^>]*>.*?</script>", "");
    text = replace_all(&text, r"(?is)<style\b[^>]*>.*?</style>", "");

    // Structure we want to keep as line breaks before the tags go away.
    text = replace_all(&text, r"(?i)<br\s*/?>", "\n");
    text = replace_all(&text, r"(?i)<li\b[^>]*>", "\n\u{2022} ");
    text = replace_all(
        &text,
        r"(?i)</(?:p|div|h[1-6]|ul|ol|li|tr|section|article|blockquote)\s*>",
        "\n\n",
    );

    // Everything else is markup to strip. Only tag-shaped tokens: a bare
    // "<" in prose (or one produced by entity decoding on a second pass)
    // must survive.
    text = replace_all(&text, r"(?s)</?[A-Za-z][^>]*>|<!--.*?-->", "");

    text = decode_entities(&text);

    // Collapse: runs of spaces/tabs to one space, spaces hugging a newline
    // away, runs of 3+ newlines to a paragraph break.
    text = replace_all(&text, r"[ \t]+", " ");
    text = replace_all(&text, r" ?\n ?", "\n");
    text = replace_all(&text, r"\n{3,}", "\n\n");

    truncate_chars(text.trim())
}

fn replace_all(text: &str, pattern: &str, replacement: &str) -> String {
    // Patterns are fixed literals; a parse failure just skips the step.
    match Regex::new(pattern) {
        Ok(re) => re.replace_all(text, replacement).into_owned(),
        Err(_) => text.to_string(),
    }
}

fn decode_entities(text: &str) -> String {
    // The handful that actually shows up in job descriptions. `&amp;` must
    // go last or double-encoded text decodes twice.
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn truncate_chars(text: &str) -> String {
    if text.chars().count() <= MAX_DESCRIPTION_CHARS {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(MAX_DESCRIPTION_CHARS - 1).collect();
    truncated.truncate(truncated.trim_end().len());
    truncated.push('\u{2026}');
    truncated
}
