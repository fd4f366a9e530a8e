use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A public-account article scraped from an mp.weixin.qq.com page.
///
/// `content_html` is the concatenation of the non-empty body paragraphs,
/// each re-wrapped in a `<p>` tag. Decorative fields that the page may or
/// may not carry are optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeixinArticle {
    pub url: String,
    pub title: String,
    pub content_html: String,
    pub author: Option<String>,
    pub publish_time: Option<String>,
    pub qr_code: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// One entry of the portal's scrolling banner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopStory {
    pub title: String,
    pub link: String,
    pub desc: String,
    pub profile: String,
    pub profile_link: String,
    /// Rewritten from the page's mixed date/clock markup, see
    /// `wx_scrapers::sogou::rewrite_publish_time`.
    pub publish_time: String,
}

/// An entry of the portal's hot-search box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotSearch {
    pub title: String,
    pub link: String,
}

/// An entry of the portal's hot-favourites list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favourite {
    pub image: String,
    pub title: String,
    pub link: String,
    pub profile: String,
    pub profile_link: String,
    pub publish_time: String,
}

/// An article card from the portal's category listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub title: String,
    pub link: String,
    pub short_desc: String,
    pub profile_name: String,
    pub profile_logo: String,
    pub profile_link: String,
    pub qr_code: String,
    pub read_count: u64,
    pub publish_time: Option<DateTime<Utc>>,
}

/// Everything extracted from one pass over the portal front page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalSnapshot {
    pub top_stories: Vec<TopStory>,
    pub hot_searches: Vec<HotSearch>,
    pub hot_words: Vec<String>,
    pub favourites: Vec<Favourite>,
    pub categories: Vec<CategoryEntry>,
    pub fetched_at: DateTime<Utc>,
}
