use serde::Serialize;

use super::models::FeedItem;

/// Parameters handed to the detail screen when a post is selected.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailParams {
    pub title: String,
    pub content_html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub published_at: String,
}

/// Field-for-field copy of a feed item into the detail contract.
pub fn to_detail_params(item: &FeedItem) -> DetailParams {
    DetailParams {
        title: item.title.clone(),
        content_html: item.content_html.clone(),
        image_url: item.image_url.clone(),
        published_at: item.published_at.clone(),
    }
}

impl From<&FeedItem> for DetailParams {
    fn from(item: &FeedItem) -> Self {
        to_detail_params(item)
    }
}
