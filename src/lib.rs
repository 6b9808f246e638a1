pub mod api;
pub mod config;
pub mod internal;
pub mod utils;

pub use api::{FeedClient, FeedSource, FetchError};
pub use internal::feed::{FeedEvent, FeedIntent, FeedPhase, FeedScreen, FeedState};
pub use internal::models::{FeedId, FeedItem, RawPost};
pub use internal::navigation::{DetailParams, to_detail_params};
pub use internal::normalize::{normalize, normalize_batch};
