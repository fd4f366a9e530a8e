use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use wx_core::{ArticleStorage, IndexSpec, Page, PortalSnapshot, Result, TopStory, WeixinArticle};

#[derive(Default)]
struct MemoryInner {
    articles: Vec<WeixinArticle>,
    top_stories: Vec<TopStory>,
    snapshots: Vec<PortalSnapshot>,
    // recorded for parity with real backends, otherwise inert
    indexes: Vec<(String, IndexSpec)>,
}

/// In-memory backend. Keeps everything in vectors behind an `RwLock`;
/// useful for tests and one-shot runs where nothing should persist.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<MemoryInner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of index specs recorded by `ensure_indexes`.
    pub async fn index_count(&self) -> usize {
        self.inner.read().await.indexes.len()
    }
}

fn paginate<T: Clone>(items: &[T], page: u64, per_page: u64) -> Page<T> {
    let total = items.len() as u64;
    let skip = page.saturating_sub(1).saturating_mul(per_page) as usize;
    let slice = items
        .iter()
        .skip(skip)
        .take(per_page as usize)
        .cloned()
        .collect();
    Page::new(slice, page, per_page, total)
}

#[async_trait]
impl ArticleStorage for MemoryStorage {
    async fn store_article(&self, article: &WeixinArticle) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.articles.iter_mut().find(|a| a.url == article.url) {
            *existing = article.clone();
        } else {
            inner.articles.push(article.clone());
        }
        Ok(())
    }

    async fn article_by_url(&self, url: &str) -> Result<Option<WeixinArticle>> {
        let inner = self.inner.read().await;
        Ok(inner.articles.iter().find(|a| a.url == url).cloned())
    }

    async fn delete_article(&self, url: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.articles.retain(|a| a.url != url);
        Ok(())
    }

    async fn list_articles(&self, page: u64, per_page: u64) -> Result<Page<WeixinArticle>> {
        let inner = self.inner.read().await;
        let mut articles = inner.articles.clone();
        articles.sort_by(|a, b| b.fetched_at.cmp(&a.fetched_at));
        Ok(paginate(&articles, page, per_page))
    }

    async fn store_snapshot(&self, snapshot: &PortalSnapshot) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.snapshots.push(snapshot.clone());
        for story in &snapshot.top_stories {
            if let Some(existing) = inner.top_stories.iter_mut().find(|s| s.link == story.link) {
                *existing = story.clone();
            } else {
                inner.top_stories.push(story.clone());
            }
        }
        Ok(())
    }

    async fn latest_snapshot(&self) -> Result<Option<PortalSnapshot>> {
        let inner = self.inner.read().await;
        Ok(inner
            .snapshots
            .iter()
            .max_by_key(|s| s.fetched_at)
            .cloned())
    }

    async fn list_top_stories(&self, page: u64, per_page: u64) -> Result<Page<TopStory>> {
        let inner = self.inner.read().await;
        Ok(paginate(&inner.top_stories, page, per_page))
    }

    async fn ensure_indexes(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.indexes = wx_core::default_indexes();
        Ok(())
    }
}
