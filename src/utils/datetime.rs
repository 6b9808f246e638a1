use jiff::civil::{Date, DateTime};

/// Format a post's `published_at` for display, e.g. "1 May 2024".
///
/// Accepts WordPress' zone-less `2024-05-01T10:20:30` as well as full RFC 3339
/// timestamps. Anything else is shown verbatim.
pub fn format_published(published_at: &str) -> String {
    let trimmed = published_at.trim();
    if let Ok(ts) = trimmed.parse::<jiff::Timestamp>() {
        return ts.strftime("%-d %b %Y").to_string();
    }
    match trimmed.parse::<DateTime>() {
        Ok(dt) => dt.strftime("%-d %b %Y").to_string(),
        Err(_) => trimmed.to_string(),
    }
}

/// Header date shown above the feed, day-month-year without padding ("16-10-2026").
pub fn format_header_date(date: Date) -> String {
    format!("{}-{}-{}", date.day(), date.month(), date.year())
}
