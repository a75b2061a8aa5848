//! Reduce fetched markup to the visible text used for comparison.
//!
//! Pure: the same input always yields the same output. Markup that never
//! renders (scripts, styles, comments, templates) is dropped, block-level
//! tags become line breaks, remaining tags are stripped, common entities
//! are decoded, and whitespace is collapsed line by line.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static COMMENTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static SCRIPTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid regex"));
static STYLES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("valid regex"));
static NOSCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<noscript\b[^>]*>.*?</noscript\s*>").expect("valid regex"));
static TEMPLATES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<template\b[^>]*>.*?</template\s*>").expect("valid regex"));
static HEAD_META: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<!doctype[^>]*>|<\?xml[^>]*\?>").expect("valid regex"));
static BLOCK_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)</?(p|div|h[1-6]|li|ul|ol|tr|td|th|table|br|hr|section|article|header|footer|nav|main|aside|blockquote|pre|title|dd|dt)\b[^>]*>",
    )
    .expect("valid regex")
});
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid regex"));
static NUMERIC_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(?:[xX]([0-9a-fA-F]{1,6})|([0-9]{1,7}));").expect("valid regex"));

/// Normalize raw fetched content into comparable text.
pub fn normalize(raw: &str) -> String {
    if !looks_like_markup(raw) {
        return collapse_whitespace(raw);
    }

    let text = COMMENTS.replace_all(raw, " ");
    let text = SCRIPTS.replace_all(&text, " ");
    let text = STYLES.replace_all(&text, " ");
    let text = NOSCRIPT.replace_all(&text, " ");
    let text = TEMPLATES.replace_all(&text, " ");
    let text = HEAD_META.replace_all(&text, " ");
    let text = BLOCK_TAGS.replace_all(&text, "\n");
    let text = ANY_TAG.replace_all(&text, " ");

    collapse_whitespace(&decode_entities(&text))
}

fn looks_like_markup(raw: &str) -> bool {
    let trimmed = raw.trim_start();
    trimmed.starts_with('<') || ANY_TAG.is_match(raw)
}

/// Collapse runs of whitespace inside each line and drop blank lines.
fn collapse_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(input: &str) -> String {
    let decoded = NUMERIC_ENTITY.replace_all(input, |caps: &Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (_, Some(dec)) => dec.as_str().parse::<u32>().ok(),
            _ => None,
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    // `&amp;` goes last so "&amp;lt;" decodes to the literal "&lt;".
    decoded
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
