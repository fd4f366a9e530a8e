use async_trait::async_trait;

use crate::page::Page;
use crate::types::{PortalSnapshot, TopStory, WeixinArticle};
use crate::Result;

/// Collection name inferred from a type name: CamelCase becomes snake_case
/// with an `s` appended. The pluralization is deliberately naive, so
/// `TopStory` maps to `top_storys`; renaming here would strand existing
/// collections.
pub fn collection_name(type_name: &str) -> String {
    let chars: Vec<char> = type_name.chars().collect();
    let mut out = String::with_capacity(type_name.len() + 4);
    for (i, c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let boundary = match i.checked_sub(1).map(|p| chars[p]) {
                None => false,
                Some(prev) if prev.is_lowercase() || prev.is_ascii_digit() => true,
                Some(prev) if prev.is_uppercase() => {
                    chars.get(i + 1).map_or(false, |next| next.is_lowercase())
                }
                Some(_) => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(*c);
        }
    }
    out.push('s');
    out
}

/// A record type bound to a document-store collection.
pub trait Document {
    /// The collection the type persists into, inferred from the type name
    /// unless overridden.
    fn collection() -> String
    where
        Self: Sized,
    {
        let name = std::any::type_name::<Self>()
            .rsplit("::")
            .next()
            .unwrap_or("document");
        collection_name(name)
    }
}

impl Document for WeixinArticle {}
impl Document for TopStory {}
impl Document for PortalSnapshot {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// An index to be ensured on a collection once at backend startup.
#[derive(Debug, Clone)]
pub struct IndexSpec {
    pub keys: Vec<(String, Order)>,
    pub unique: bool,
}

impl IndexSpec {
    pub fn ascending(key: impl Into<String>) -> Self {
        Self {
            keys: vec![(key.into(), Order::Asc)],
            unique: false,
        }
    }

    pub fn descending(key: impl Into<String>) -> Self {
        Self {
            keys: vec![(key.into(), Order::Desc)],
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// The indexes every backend ensures before first use.
pub fn default_indexes() -> Vec<(String, IndexSpec)> {
    vec![
        (
            WeixinArticle::collection(),
            IndexSpec::ascending("url").unique(),
        ),
        (TopStory::collection(), IndexSpec::ascending("link").unique()),
        (
            PortalSnapshot::collection(),
            IndexSpec::descending("fetched_at"),
        ),
    ]
}

/// Storage for scraped records. Backends are internally synchronized;
/// callers share them behind an `Arc`.
#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Store an article, replacing any previous record with the same URL.
    async fn store_article(&self, article: &WeixinArticle) -> Result<()>;

    async fn article_by_url(&self, url: &str) -> Result<Option<WeixinArticle>>;

    async fn delete_article(&self, url: &str) -> Result<()>;

    /// List stored articles, newest first. Pages are 1-based.
    async fn list_articles(&self, page: u64, per_page: u64) -> Result<Page<WeixinArticle>>;

    /// Store a portal snapshot and upsert its top stories by link.
    async fn store_snapshot(&self, snapshot: &PortalSnapshot) -> Result<()>;

    async fn latest_snapshot(&self) -> Result<Option<PortalSnapshot>>;

    async fn list_top_stories(&self, page: u64, per_page: u64) -> Result<Page<TopStory>>;

    /// Ensure `default_indexes` on the backend. Called once at startup.
    async fn ensure_indexes(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_name() {
        assert_eq!(collection_name("WeixinArticle"), "weixin_articles");
        assert_eq!(collection_name("PortalSnapshot"), "portal_snapshots");
        // naive pluralization, kept on purpose
        assert_eq!(collection_name("TopStory"), "top_storys");
        assert_eq!(collection_name("HTTPServer"), "http_servers");
        assert_eq!(collection_name("Model2Record"), "model2_records");
    }

    #[test]
    fn test_document_collection() {
        assert_eq!(WeixinArticle::collection(), "weixin_articles");
        assert_eq!(TopStory::collection(), "top_storys");
        assert_eq!(PortalSnapshot::collection(), "portal_snapshots");
    }

    #[test]
    fn test_default_indexes() {
        let indexes = default_indexes();
        assert_eq!(indexes.len(), 3);
        let (collection, spec) = &indexes[0];
        assert_eq!(collection, "weixin_articles");
        assert!(spec.unique);
        assert_eq!(spec.keys, vec![("url".to_string(), Order::Asc)]);
    }
}
