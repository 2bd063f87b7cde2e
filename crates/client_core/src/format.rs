//! Text formatting for display: HTML escaping, the small markup subset used in
//! chat turns, and human-readable byte sizes.
//!
//! Escaping always runs before markup is applied, so markup can only ever wrap
//! already-escaped text.

use once_cell::sync::Lazy;
use regex::Regex;

static FENCED_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```([A-Za-z0-9_+\-]*)[ \t]*\n?(.*?)```").expect("fenced code pattern")
});
static INLINE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`\n]+)`").expect("inline code pattern"));
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^\n]+?)\*\*").expect("bold pattern"));

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Escapes `raw` and renders fenced code blocks, inline code, bold spans and
/// line breaks.
pub fn format_content(raw: &str) -> String {
    let escaped = escape_html(raw);
    let mut out = String::with_capacity(escaped.len());
    let mut cursor = 0;

    for caps in FENCED_CODE.captures_iter(&escaped) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&format_prose(&escaped[cursor..whole.start()]));

        let language = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let code = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        let code = code.strip_suffix('\n').unwrap_or(code);
        if language.is_empty() {
            out.push_str("<pre><code>");
        } else {
            out.push_str(&format!("<pre><code class=\"language-{language}\">"));
        }
        out.push_str(code);
        out.push_str("</code></pre>");
        cursor = whole.end();
    }
    out.push_str(&format_prose(&escaped[cursor..]));
    out
}

fn format_prose(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut cursor = 0;
    for caps in INLINE_CODE.captures_iter(escaped) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&format_spans(&escaped[cursor..whole.start()]));
        out.push_str("<code>");
        out.push_str(caps.get(1).map(|m| m.as_str()).unwrap_or_default());
        out.push_str("</code>");
        cursor = whole.end();
    }
    out.push_str(&format_spans(&escaped[cursor..]));
    out
}

fn format_spans(escaped: &str) -> String {
    BOLD.replace_all(escaped, "<strong>$1</strong>")
        .replace("\r\n", "\n")
        .replace('\n', "<br>")
}

/// `0 Bytes`, `1 KB`, `1.5 KB`, ... using base-1024 units up to GB, rounded
/// to two decimals with trailing zeros dropped.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut divisor = 1u64;
    while unit + 1 < SIZE_UNITS.len() && bytes >= divisor * 1024 {
        divisor *= 1024;
        unit += 1;
    }

    let value = bytes as f64 / divisor as f64;
    let text = format!("{value:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text} {}", SIZE_UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sizes_use_binary_prefixes() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(1), "1 Bytes");
        assert_eq!(format_file_size(1000), "1000 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1_048_576), "1 MB");
        assert_eq!(format_file_size(5 * 1024 * 1024 + 300 * 1024), "5.29 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3 GB");
        assert_eq!(format_file_size(2048 * 1024 * 1024 * 1024), "2048 GB");
    }

    #[test]
    fn escapes_tags_before_markup() {
        let html = format_content("<b>hi</b> and **hi**");
        assert!(!html.contains("<b>"));
        assert!(html.contains("&lt;b&gt;hi&lt;/b&gt;"));
        assert!(html.contains("<strong>hi</strong>"));
    }

    #[test]
    fn markup_cannot_smuggle_structure() {
        let html = format_content("**<script>alert(1)</script>**");
        assert_eq!(
            html,
            "<strong>&lt;script&gt;alert(1)&lt;/script&gt;</strong>"
        );
    }

    #[test]
    fn renders_fenced_code_without_line_break_tags() {
        let html = format_content("Run:\n```rust\nfn main() {\n    **x**\n}\n```\ndone");
        assert_eq!(
            html,
            "Run:<br><pre><code class=\"language-rust\">fn main() {\n    **x**\n}</code></pre><br>done"
        );
    }

    #[test]
    fn inline_code_is_not_bolded() {
        let html = format_content("use `**kwargs` here, **really**");
        assert_eq!(
            html,
            "use <code>**kwargs</code> here, <strong>really</strong>"
        );
    }

    #[test]
    fn plain_text_is_a_fixed_point() {
        let text = "The answer is 42 on page 3";
        let once = format_content(text);
        assert_eq!(once, text);
        assert_eq!(format_content(&once), once);
    }

    #[test]
    fn converts_line_breaks() {
        assert_eq!(format_content("a\nb\r\nc"), "a<br>b<br>c");
    }

    #[test]
    fn escapes_quotes_and_ampersands() {
        assert_eq!(escape_html(r#"Tom & "Jerry's""#), "Tom &amp; &quot;Jerry&#39;s&quot;");
    }
}
