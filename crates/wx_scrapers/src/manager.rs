use std::sync::Arc;

use tracing::info;
use wx_core::{ArticleStorage, Error, PortalSnapshot, Result, WeixinArticle};

use crate::fetch::Fetcher;
use crate::scrapers::{ArticleStatus, Scraper, SogouPortalScraper, WeixinArticleScraper};

/// Routes URLs to the scraper that can handle them and persists whatever
/// comes back.
pub struct ScraperManager {
    storage: Arc<dyn ArticleStorage>,
    scrapers: Vec<Box<dyn Scraper>>,
    portal: SogouPortalScraper,
}

impl ScraperManager {
    pub fn new(storage: Arc<dyn ArticleStorage>, fetcher: Fetcher) -> Self {
        let scrapers: Vec<Box<dyn Scraper>> =
            vec![Box::new(WeixinArticleScraper::new(fetcher.clone()))];
        Self {
            storage,
            scrapers,
            portal: SogouPortalScraper::new(fetcher),
        }
    }

    pub fn add_scraper(&mut self, scraper: Box<dyn Scraper>) {
        self.scrapers.push(scraper);
    }

    /// Names of the sources this manager covers.
    pub fn sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = self.scrapers.iter().map(|s| s.source()).collect();
        sources.push(self.portal.source());
        sources
    }

    fn scraper_for_url(&self, url: &str) -> Result<&dyn Scraper> {
        self.scrapers
            .iter()
            .find(|s| s.can_handle(url))
            .map(|s| s.as_ref())
            .ok_or_else(|| Error::Scrape(format!("no scraper found for URL: {}", url)))
    }

    /// Scrape one article page, store it, and report whether the store
    /// already knew it.
    pub async fn scrape_url(&self, url: &str) -> Result<(WeixinArticle, ArticleStatus)> {
        let scraper = self.scraper_for_url(url)?;
        info!("📰 Scraping article from {}", scraper.source());
        let article = scraper.scrape_article(url).await?;

        let status = match self.storage.article_by_url(url).await? {
            Some(existing) if existing.content_html == article.content_html => {
                ArticleStatus::Unchanged
            }
            Some(_) => ArticleStatus::Updated,
            None => ArticleStatus::New,
        };

        self.storage.store_article(&article).await?;
        Ok((article, status))
    }

    /// Scrape the portal front page and persist the snapshot.
    pub async fn scrape_portal(&self) -> Result<PortalSnapshot> {
        info!("📰 Scraping {}", self.portal.source());
        let snapshot = self.portal.scrape().await?;
        self.storage.store_snapshot(&snapshot).await?;
        info!(
            "💾 Stored snapshot: {} top stories, {} categories",
            snapshot.top_stories.len(),
            snapshot.categories.len()
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;
    use wx_core::{Page, TopStory};

    #[derive(Default)]
    struct MockStorage {
        articles: Mutex<Vec<WeixinArticle>>,
    }

    #[async_trait]
    impl ArticleStorage for MockStorage {
        async fn store_article(&self, article: &WeixinArticle) -> Result<()> {
            let mut articles = self.articles.lock().unwrap();
            articles.retain(|a| a.url != article.url);
            articles.push(article.clone());
            Ok(())
        }

        async fn article_by_url(&self, url: &str) -> Result<Option<WeixinArticle>> {
            Ok(self
                .articles
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.url == url)
                .cloned())
        }

        async fn delete_article(&self, url: &str) -> Result<()> {
            self.articles.lock().unwrap().retain(|a| a.url != url);
            Ok(())
        }

        async fn list_articles(&self, page: u64, per_page: u64) -> Result<Page<WeixinArticle>> {
            let articles = self.articles.lock().unwrap();
            Ok(Page::new(articles.clone(), page, per_page, articles.len() as u64))
        }

        async fn store_snapshot(&self, _snapshot: &PortalSnapshot) -> Result<()> {
            Ok(())
        }

        async fn latest_snapshot(&self) -> Result<Option<PortalSnapshot>> {
            Ok(None)
        }

        async fn list_top_stories(&self, page: u64, per_page: u64) -> Result<Page<TopStory>> {
            Ok(Page::new(Vec::new(), page, per_page, 0))
        }

        async fn ensure_indexes(&self) -> Result<()> {
            Ok(())
        }
    }

    struct StubScraper {
        content: String,
    }

    #[async_trait]
    impl Scraper for StubScraper {
        fn source(&self) -> &str {
            "stub"
        }

        fn can_handle(&self, url: &str) -> bool {
            url.starts_with("stub://")
        }

        async fn scrape_article(&self, url: &str) -> Result<WeixinArticle> {
            Ok(WeixinArticle {
                url: url.to_string(),
                title: "stub".to_string(),
                content_html: self.content.clone(),
                author: None,
                publish_time: None,
                qr_code: None,
                fetched_at: Utc::now(),
            })
        }
    }

    fn manager_with_stub(content: &str) -> ScraperManager {
        let storage = Arc::new(MockStorage::default());
        let mut manager = ScraperManager::new(storage, Fetcher::new().unwrap());
        manager.add_scraper(Box::new(StubScraper {
            content: content.to_string(),
        }));
        manager
    }

    #[tokio::test]
    async fn test_scrape_url_reports_status() {
        let manager = manager_with_stub("<p>v1</p>");
        let (_, status) = manager.scrape_url("stub://a").await.unwrap();
        assert_eq!(status, ArticleStatus::New);

        let (_, status) = manager.scrape_url("stub://a").await.unwrap();
        assert_eq!(status, ArticleStatus::Unchanged);
    }

    #[tokio::test]
    async fn test_scrape_url_detects_updates() {
        let storage = Arc::new(MockStorage::default());
        let mut manager = ScraperManager::new(storage.clone(), Fetcher::new().unwrap());
        manager.add_scraper(Box::new(StubScraper {
            content: "<p>v1</p>".to_string(),
        }));
        manager.scrape_url("stub://a").await.unwrap();

        let mut manager = ScraperManager::new(storage, Fetcher::new().unwrap());
        manager.add_scraper(Box::new(StubScraper {
            content: "<p>v2</p>".to_string(),
        }));
        let (_, status) = manager.scrape_url("stub://a").await.unwrap();
        assert_eq!(status, ArticleStatus::Updated);
    }

    #[tokio::test]
    async fn test_unknown_url_is_an_error() {
        let manager = manager_with_stub("<p>v1</p>");
        let result = manager.scrape_url("ftp://nowhere").await;
        assert!(matches!(result, Err(Error::Scrape(_))));
    }

    #[tokio::test]
    async fn test_sources_include_portal() {
        let manager = manager_with_stub("<p>v1</p>");
        let sources = manager.sources();
        assert!(sources.contains(&"WeChat articles"));
        assert!(sources.contains(&"Sogou WeChat portal"));
    }
}
