use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use wx_core::{ArticleStorage, Error, Result, WeixinArticle};
use wx_scrapers::{ArticleStatus, Fetcher, ScraperManager};
use wx_storage::StorageOptions;
use wx_web::AppState;

/// Durations like `1h`, `30m`, `1d` or `1h15m30s`; a bare number means
/// seconds.
#[derive(Debug, Clone)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if !c.is_whitespace() {
                let num: u64 = current_number
                    .parse()
                    .map_err(|_| format!("expected a number before unit: {}", c))?;
                let scale = match c {
                    's' => 1,
                    'm' => 60,
                    'h' => 3600,
                    'd' => 86400,
                    _ => return Err(format!("invalid duration unit: {}", c)),
                };
                total_seconds += num * scale;
                current_number.clear();
            }
        }

        // trailing bare number counts as seconds
        if !current_number.is_empty() {
            let num: u64 = current_number
                .parse()
                .map_err(|_| "invalid number in duration".to_string())?;
            total_seconds += num;
        } else if total_seconds == 0 {
            return Err("duration must include a number".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Storage backend: memory or mongo
    #[arg(long, default_value = "memory")]
    storage: String,
    /// Document-database connection string
    #[arg(long)]
    db_url: Option<String>,
    #[arg(long, default_value = "weixin")]
    database: String,
    /// Driver connection-pool size
    #[arg(long)]
    pool_size: Option<u32>,
    /// Write concern, e.g. "majority" or a node count
    #[arg(long)]
    write_concern: Option<String>,
    #[arg(long)]
    journal: Option<bool>,
    #[arg(long)]
    replica_set: Option<String>,
    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scrape a single article page
    Article { url: String },
    /// Scrape the portal front page
    Portal {
        /// Run in periodic mode with the given interval (e.g. 1h, 30m, 1h15m30s)
        #[arg(long)]
        interval: Option<HumanDuration>,
    },
    /// Serve the stored records over HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
    },
    /// List available scrapers
    List,
}

async fn check_storage(storage: &Arc<dyn ArticleStorage>) -> Result<()> {
    let test_article = WeixinArticle {
        url: "wxcrawl://healthcheck".to_string(),
        title: "healthcheck".to_string(),
        content_html: String::new(),
        author: None,
        publish_time: None,
        qr_code: None,
        fetched_at: Utc::now(),
    };

    storage.store_article(&test_article).await?;
    if storage.article_by_url(&test_article.url).await?.is_none() {
        return Err(Error::Storage(
            "failed to read back health-check article".to_string(),
        ));
    }
    if let Err(e) = storage.delete_article(&test_article.url).await {
        warn!("⚠️ Failed to clean up health-check article: {}", e);
    }
    Ok(())
}

fn status_emoji(status: ArticleStatus) -> &'static str {
    match status {
        ArticleStatus::New => "🆕",
        ArticleStatus::Updated => "📝",
        ArticleStatus::Unchanged => "⏭️",
    }
}

async fn run_portal(manager: &ScraperManager) -> Result<()> {
    let snapshot = manager.scrape_portal().await?;

    println!("Top stories:");
    for story in &snapshot.top_stories {
        println!("  {} ({}) - {}", story.title, story.publish_time, story.link);
    }
    println!("Hot searches:");
    for entry in &snapshot.hot_searches {
        println!("  {} - {}", entry.title, entry.link);
    }
    println!("Hot words:");
    for word in &snapshot.hot_words {
        println!("  {}", word);
    }
    println!("Favourites:");
    for favourite in &snapshot.favourites {
        println!("  {} ({})", favourite.title, favourite.publish_time);
    }
    println!("Categories:");
    for entry in &snapshot.categories {
        println!("  {} [{} reads] - {}", entry.title, entry.read_count, entry.link);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let options = StorageOptions {
        url: cli.db_url.clone(),
        database: Some(cli.database.clone()),
        max_pool_size: cli.pool_size,
        write_concern: cli.write_concern.clone(),
        journal: cli.journal,
        replica_set: cli.replica_set.clone(),
        ..Default::default()
    };

    let storage = wx_storage::create_storage(&cli.storage, &options).await?;
    info!("💾 Checking storage connection...");
    storage.ensure_indexes().await?;
    check_storage(&storage).await?;
    info!("✨ Storage initialized successfully (using {})", cli.storage);

    let fetcher = Fetcher::with_timeout(Duration::from_secs(cli.timeout))?;
    let manager = ScraperManager::new(storage.clone(), fetcher);

    match cli.command {
        Commands::Article { url } => {
            info!("📰 Scraping single URL: {}", url);
            let (article, status) = manager.scrape_url(&url).await?;
            println!("{} {} - {}", status_emoji(status), article.title, url);
            if let Some(author) = &article.author {
                println!("by {}", author);
            }
            if let Some(publish_time) = &article.publish_time {
                println!("published {}", publish_time);
            }
            println!("{}", article.content_html);
        }
        Commands::Portal { interval } => {
            if let Some(HumanDuration(interval)) = interval {
                info!(
                    "Running in periodic mode with {}s interval",
                    interval.as_secs()
                );
                loop {
                    if let Err(e) = run_portal(&manager).await {
                        error!("portal scrape failed: {}", e);
                    }
                    info!("Waiting {}s before next scrape", interval.as_secs());
                    tokio::time::sleep(interval).await;
                }
            } else {
                run_portal(&manager).await?;
            }
        }
        Commands::Serve { addr } => {
            wx_web::serve(addr, AppState { storage }).await?;
        }
        Commands::List => {
            println!("Available scrapers:");
            for source in manager.sources() {
                println!("  - {}", source);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_duration() {
        assert_eq!(
            "1h15m30s".parse::<HumanDuration>().unwrap().0,
            Duration::from_secs(4530)
        );
        assert_eq!(
            "90".parse::<HumanDuration>().unwrap().0,
            Duration::from_secs(90)
        );
        assert_eq!(
            "1d".parse::<HumanDuration>().unwrap().0,
            Duration::from_secs(86400)
        );
        assert!("".parse::<HumanDuration>().is_err());
        assert!("h".parse::<HumanDuration>().is_err());
        assert!("5x".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
