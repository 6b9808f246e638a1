use std::fmt::Write;

use jiff::civil::Date;

use crate::internal::feed::FeedState;
use crate::internal::models::FeedItem;
use crate::utils::datetime::{format_header_date, format_published};

const STRIP_TITLE_WIDTH: usize = 28;
const STRIP_LEN: usize = 5;

/// Wrap a title to `width` columns, leaving `prefix` columns for the list marker.
pub fn wrap_title(title: &str, width: usize, prefix: usize) -> Vec<String> {
    let available = width.saturating_sub(prefix).max(10);
    textwrap::wrap(title, available)
        .into_iter()
        .map(|line| line.into_owned())
        .collect()
}

fn truncate(title: &str, max: usize) -> String {
    if title.chars().count() <= max {
        return title.to_string();
    }
    let mut out: String = title.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn strip_entry(index: usize, item: &FeedItem) -> String {
    let marker = if item.image_url.is_some() { "▣" } else { "□" };
    format!("{marker} [{index}] {}", truncate(&item.title, STRIP_TITLE_WIDTH))
}

/// Render the home feed as text: date header, the "Latest Fact Checks" strip and
/// the "Top Picks" list. Items are numbered by their index for selection.
pub fn render_feed(state: &FeedState, today: Date, width: usize) -> String {
    let mut out = String::new();

    if state.is_loading {
        let _ = writeln!(out, "Loading latest fact checks…");
        return out;
    }

    let _ = writeln!(out, "{}", format_header_date(today));
    let _ = writeln!(out, "Discover");
    let _ = writeln!(out, "Latest Fact Checks");
    if state.is_refreshing {
        let _ = writeln!(out, "  ↻ refreshing…");
    }

    if state.items.is_empty() {
        let _ = writeln!(out, "  No fact checks published yet.");
        return out;
    }

    let strip: Vec<String> = state
        .items
        .iter()
        .take(STRIP_LEN)
        .enumerate()
        .map(|(i, item)| strip_entry(i, item))
        .collect();
    let _ = writeln!(out, "  {}", strip.join("  │  "));
    if state.items.len() > STRIP_LEN {
        let _ = writeln!(out, "  … {} more", state.items.len() - STRIP_LEN);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Top Picks");
    for (i, item) in state.items.iter().enumerate() {
        let prefix = format!("{:>3}. ", i);
        let lines = wrap_title(&item.title, width, prefix.len());
        for (n, line) in lines.iter().enumerate() {
            if n == 0 {
                let _ = writeln!(out, "{prefix}{line}");
            } else {
                let _ = writeln!(out, "{:width$}{line}", "", width = prefix.len());
            }
        }
        let _ = writeln!(
            out,
            "{:width$}{}",
            "",
            format_published(&item.published_at),
            width = prefix.len()
        );
    }

    out
}
