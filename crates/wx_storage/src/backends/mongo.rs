use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, Document as BsonDocument};
use mongodb::options::{
    Acknowledgment, ClientOptions, FindOneOptions, FindOptions, IndexOptions, ReplaceOptions,
    WriteConcern,
};
use mongodb::{Client, Collection, Database, IndexModel};
use wx_core::{
    default_indexes, ArticleStorage, Document, Error, IndexSpec, Order, Page, PortalSnapshot,
    Result, TopStory, WeixinArticle,
};

use crate::StorageOptions;

pub const DEFAULT_URL: &str = "mongodb://localhost:27017";
const DEFAULT_DATABASE: &str = "weixin";

/// Connection settings for the MongoDB backend. Everything except the URL
/// and database name is forwarded to the driver's `ClientOptions` as-is.
#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub url: String,
    pub database: String,
    pub max_pool_size: Option<u32>,
    pub connect_timeout: Option<Duration>,
    pub write_concern: Option<String>,
    pub journal: Option<bool>,
    pub w_timeout: Option<Duration>,
    pub replica_set: Option<String>,
}

impl MongoConfig {
    pub fn from_options(options: &StorageOptions) -> Self {
        Self {
            url: options.url.clone().unwrap_or_else(|| DEFAULT_URL.to_string()),
            database: options
                .database
                .clone()
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            max_pool_size: options.max_pool_size,
            connect_timeout: options.connect_timeout,
            write_concern: options.write_concern.clone(),
            journal: options.journal,
            w_timeout: options.w_timeout,
            replica_set: options.replica_set.clone(),
        }
    }
}

fn storage_err(e: mongodb::error::Error) -> Error {
    Error::Storage(e.to_string())
}

fn acknowledgment(w: &str) -> Acknowledgment {
    match w.parse::<u32>() {
        Ok(nodes) => Acknowledgment::Nodes(nodes),
        Err(_) => Acknowledgment::from(w.to_string()),
    }
}

fn index_keys(spec: &IndexSpec) -> BsonDocument {
    let mut keys = BsonDocument::new();
    for (field, order) in &spec.keys {
        let direction = match order {
            Order::Asc => 1,
            Order::Desc => -1,
        };
        keys.insert(field, direction);
    }
    keys
}

/// MongoDB backend. Collections are named through `Document::collection`,
/// so records land where the collection-name inference points.
pub struct MongoStorage {
    db: Database,
    articles: Collection<WeixinArticle>,
    top_stories: Collection<TopStory>,
    snapshots: Collection<PortalSnapshot>,
}

impl MongoStorage {
    pub async fn connect(config: MongoConfig) -> Result<Self> {
        let mut options = ClientOptions::parse(&config.url).await.map_err(storage_err)?;
        if let Some(max_pool_size) = config.max_pool_size {
            options.max_pool_size = Some(max_pool_size);
        }
        if let Some(connect_timeout) = config.connect_timeout {
            options.connect_timeout = Some(connect_timeout);
        }
        if let Some(replica_set) = config.replica_set.clone() {
            options.repl_set_name = Some(replica_set);
        }
        if config.write_concern.is_some() || config.journal.is_some() || config.w_timeout.is_some()
        {
            options.write_concern = Some(
                WriteConcern::builder()
                    .w(config.write_concern.as_deref().map(acknowledgment))
                    .journal(config.journal)
                    .w_timeout(config.w_timeout)
                    .build(),
            );
        }

        let client = Client::with_options(options).map_err(storage_err)?;
        let db = client.database(&config.database);
        Ok(Self {
            articles: db.collection(&WeixinArticle::collection()),
            top_stories: db.collection(&TopStory::collection()),
            snapshots: db.collection(&PortalSnapshot::collection()),
            db,
        })
    }
}

#[async_trait]
impl ArticleStorage for MongoStorage {
    async fn store_article(&self, article: &WeixinArticle) -> Result<()> {
        self.articles
            .replace_one(
                doc! { "url": &article.url },
                article,
                ReplaceOptions::builder().upsert(true).build(),
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn article_by_url(&self, url: &str) -> Result<Option<WeixinArticle>> {
        self.articles
            .find_one(doc! { "url": url }, None)
            .await
            .map_err(storage_err)
    }

    async fn delete_article(&self, url: &str) -> Result<()> {
        self.articles
            .delete_one(doc! { "url": url }, None)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn list_articles(&self, page: u64, per_page: u64) -> Result<Page<WeixinArticle>> {
        let total = self
            .articles
            .count_documents(None, None)
            .await
            .map_err(storage_err)?;
        // fetched_at round-trips as an RFC3339 string, which sorts
        // chronologically
        let options = FindOptions::builder()
            .sort(doc! { "fetched_at": -1 })
            .skip(page.saturating_sub(1).saturating_mul(per_page))
            .limit(per_page as i64)
            .build();
        let items = self
            .articles
            .find(None, options)
            .await
            .map_err(storage_err)?
            .try_collect()
            .await
            .map_err(storage_err)?;
        Ok(Page::new(items, page, per_page, total))
    }

    async fn store_snapshot(&self, snapshot: &PortalSnapshot) -> Result<()> {
        self.snapshots
            .insert_one(snapshot, None)
            .await
            .map_err(storage_err)?;
        for story in &snapshot.top_stories {
            self.top_stories
                .replace_one(
                    doc! { "link": &story.link },
                    story,
                    ReplaceOptions::builder().upsert(true).build(),
                )
                .await
                .map_err(storage_err)?;
        }
        Ok(())
    }

    async fn latest_snapshot(&self) -> Result<Option<PortalSnapshot>> {
        let options = FindOneOptions::builder()
            .sort(doc! { "fetched_at": -1 })
            .build();
        self.snapshots
            .find_one(None, options)
            .await
            .map_err(storage_err)
    }

    async fn list_top_stories(&self, page: u64, per_page: u64) -> Result<Page<TopStory>> {
        let total = self
            .top_stories
            .count_documents(None, None)
            .await
            .map_err(storage_err)?;
        let options = FindOptions::builder()
            .sort(doc! { "_id": 1 })
            .skip(page.saturating_sub(1).saturating_mul(per_page))
            .limit(per_page as i64)
            .build();
        let items = self
            .top_stories
            .find(None, options)
            .await
            .map_err(storage_err)?
            .try_collect()
            .await
            .map_err(storage_err)?;
        Ok(Page::new(items, page, per_page, total))
    }

    async fn ensure_indexes(&self) -> Result<()> {
        for (collection, spec) in default_indexes() {
            let model = IndexModel::builder()
                .keys(index_keys(&spec))
                .options(IndexOptions::builder().unique(spec.unique).build())
                .build();
            self.db
                .collection::<BsonDocument>(&collection)
                .create_index(model, None)
                .await
                .map_err(storage_err)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = MongoConfig::from_options(&StorageOptions::default());
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.database, "weixin");
        assert!(config.max_pool_size.is_none());
    }

    #[test]
    fn test_acknowledgment_parsing() {
        assert!(matches!(acknowledgment("2"), Acknowledgment::Nodes(2)));
        assert!(matches!(acknowledgment("majority"), Acknowledgment::Majority));
    }

    #[test]
    fn test_index_keys_directions() {
        let spec = IndexSpec::descending("fetched_at");
        let keys = index_keys(&spec);
        assert_eq!(keys.get_i32("fetched_at").unwrap(), -1);
    }
}
