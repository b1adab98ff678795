use std::sync::LazyLock;

use regex::Regex;

// Runs on already-escaped text, so the URL cannot contain a raw quote.
static LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\((https?://[^\s)]+)\)").expect("link pattern should compile")
});

/// Minimal markdown: HTML escaping, `[label](http(s)://...)` links and line
/// breaks. Escaping always happens first.
pub fn render_markdown(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let escaped = escape_html(text);
    let linked = LINK_PATTERN.replace_all(
        &escaped,
        r#"<a href="$2" target="_blank" rel="noopener">$1</a>"#,
    );
    linked.replace('\n', "<br>")
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
