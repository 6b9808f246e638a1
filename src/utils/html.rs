use html2text::from_read;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

static IMG_ALT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<img\s+[^>]*alt=["']([^"']+)["'][^>]*>"#).unwrap());

/// Turns a rendered title fragment into plain display text.
///
/// Tags are dropped, entities decoded (`&#8217;` -> `’`) and runs of whitespace
/// collapsed to a single space.
pub fn decode_title(fragment: &str) -> String {
    let parsed = Html::parse_fragment(fragment);
    let text: String = parsed.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Plain-text preview of a post body, wrapped to `width` columns.
/// Images with alt text become `[Image: alt]`.
pub fn content_preview(html: &str, width: usize) -> String {
    let with_placeholders = IMG_ALT_REGEX.replace_all(html, "[Image: $1]");
    let mut bytes = with_placeholders.as_bytes();
    from_read(&mut bytes, width.max(10)).unwrap_or_default()
}
