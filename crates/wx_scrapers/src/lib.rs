pub mod fetch;
pub mod manager;
pub mod scrapers;

pub use fetch::Fetcher;
pub use manager::ScraperManager;
pub use scrapers::{ArticleStatus, Scraper, SogouPortalScraper, WeixinArticleScraper};

pub mod prelude {
    pub use crate::scrapers::Scraper;
    pub use wx_core::{Error, PortalSnapshot, Result, WeixinArticle};
}
