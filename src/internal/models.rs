use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;

/// Deserialize a field as `Some(T)` when it has the expected shape and `None` otherwise.
///
/// The posts endpoint is an external API; a field with an unexpected type must not
/// fail the whole record.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Post identifier as sent by the API (WordPress uses integers, other backends strings).
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum RawId {
    Number(u64),
    Text(String),
}

/// `{ "rendered": "..." }` wrapper used by WordPress for title and content.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct Rendered {
    #[serde(default, deserialize_with = "lenient")]
    pub rendered: Option<String>,
}

/// SEO metadata block; only the social image list is relied upon.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct YoastHead {
    #[serde(default, deserialize_with = "lenient")]
    pub og_image: Option<Vec<Value>>,
}

/// A post record straight off the wire. Every field is optional and lenient.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct RawPost {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<RawId>,
    #[serde(default, deserialize_with = "lenient")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<Rendered>,
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<Rendered>,
    #[serde(default, deserialize_with = "lenient")]
    pub yoast_head_json: Option<YoastHead>,
}

impl RawPost {
    /// Build from an arbitrary JSON value. Non-object values yield an empty post.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    pub fn rendered_title(&self) -> Option<&str> {
        self.title.as_ref().and_then(|t| t.rendered.as_deref())
    }

    pub fn rendered_content(&self) -> Option<&str> {
        self.content.as_ref().and_then(|c| c.rendered.as_deref())
    }

    /// `url` of the first `og_image` entry, if the whole chain is present.
    pub fn first_og_image_url(&self) -> Option<&str> {
        self.yoast_head_json
            .as_ref()?
            .og_image
            .as_ref()?
            .first()?
            .get("url")?
            .as_str()
    }
}

/// Stable list key of a feed item. Its `Display` form is the string key handed to
/// renderers; see [`FeedId::key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedId {
    Post(u64),
    Text(String),
    /// Position in the response, used when the API gave no usable id.
    Position(usize),
}

impl FeedId {
    /// String list key. `Position` keys carry a `#` prefix so they never read as a
    /// numeric post id.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedId::Post(id) => write!(f, "{id}"),
            FeedId::Text(id) => f.write_str(id),
            FeedId::Position(pos) => write!(f, "#{pos}"),
        }
    }
}

/// A render-ready post. Built once by the normalizer and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub id: FeedId,
    pub title: String,
    pub content_html: String,
    pub image_url: Option<String>,
    /// ISO-8601 as sent by the API; formatting is left to the renderer.
    pub published_at: String,
}
