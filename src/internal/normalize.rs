use std::collections::HashSet;

use reqwest::Url;
use serde_json::Value;

use crate::api::FetchError;
use crate::internal::models::{FeedId, FeedItem, RawId, RawPost};
use crate::utils::html::decode_title;

/// Normalize a single raw post. Never fails; absent fields become empty/`None`.
pub fn normalize(raw: RawPost) -> FeedItem {
    normalize_at(raw, 0)
}

/// Normalize a raw post found at `position` in the response. The position is the
/// fallback list key when the post carries no usable id.
pub fn normalize_at(raw: RawPost, position: usize) -> FeedItem {
    let image_url = raw.first_og_image_url().and_then(absolute_url);
    let title = raw.rendered_title().map(decode_title).unwrap_or_default();
    let content_html = raw.rendered_content().unwrap_or_default().to_string();

    let id = match raw.id {
        Some(RawId::Number(id)) => FeedId::Post(id),
        Some(RawId::Text(id)) if !id.trim().is_empty() => FeedId::Text(id),
        _ => FeedId::Position(position),
    };

    FeedItem {
        id,
        title,
        content_html,
        image_url,
        published_at: raw.date.unwrap_or_default(),
    }
}

fn absolute_url(candidate: &str) -> Option<String> {
    let candidate = candidate.trim();
    match Url::parse(candidate) {
        Ok(url) if url.has_host() => Some(candidate.to_string()),
        _ => {
            tracing::debug!(url = candidate, "ignoring non-absolute og_image url");
            None
        }
    }
}

/// Normalize a response array in order. Later posts whose list key repeats an
/// earlier one are dropped so keys stay unique within the batch. Keys are compared
/// in their string form, so `"1"` and `1` count as the same post.
pub fn normalize_batch(values: Vec<Value>) -> Vec<FeedItem> {
    let mut seen = HashSet::with_capacity(values.len());
    let mut items = Vec::with_capacity(values.len());

    for (position, value) in values.into_iter().enumerate() {
        let item = normalize_at(RawPost::from_value(value), position);
        if !seen.insert(item.id.key()) {
            tracing::warn!(id = %item.id, position, "dropping post with duplicate id");
            continue;
        }
        items.push(item);
    }

    items
}

/// Decode a response body into feed items. The body must be a JSON array.
pub fn decode_posts(body: &[u8]) -> Result<Vec<FeedItem>, FetchError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| FetchError::Decode {
        reason: e.to_string(),
    })?;

    match value {
        Value::Array(values) => Ok(normalize_batch(values)),
        other => Err(FetchError::Decode {
            reason: format!("expected a JSON array of posts, got {}", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
