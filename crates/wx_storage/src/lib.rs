use std::sync::Arc;
use std::time::Duration;

use wx_core::{ArticleStorage, Error, Result};

pub mod backends;

pub use backends::memory::MemoryStorage;
#[cfg(feature = "mongo")]
pub use backends::mongo::{MongoConfig, MongoStorage};

/// Driver options read from configuration and passed through unchanged to
/// whichever backend consumes them. The memory backend ignores all of them.
#[derive(Debug, Clone, Default)]
pub struct StorageOptions {
    pub url: Option<String>,
    pub database: Option<String>,
    pub max_pool_size: Option<u32>,
    pub connect_timeout: Option<Duration>,
    pub write_concern: Option<String>,
    pub journal: Option<bool>,
    pub w_timeout: Option<Duration>,
    pub replica_set: Option<String>,
}

/// Build a storage backend by name. `memory` is always available; `mongo`
/// needs the crate feature of the same name.
pub async fn create_storage(kind: &str, options: &StorageOptions) -> Result<Arc<dyn ArticleStorage>> {
    tracing::debug!(backend = kind, ?options, "initializing storage backend");
    match kind {
        "memory" => Ok(Arc::new(MemoryStorage::new())),
        #[cfg(feature = "mongo")]
        "mongo" => {
            let config = MongoConfig::from_options(options);
            Ok(Arc::new(MongoStorage::connect(config).await?))
        }
        other => Err(Error::Config(format!(
            "unsupported storage backend: {}",
            other
        ))),
    }
}

pub mod prelude {
    pub use super::backends::memory::MemoryStorage;
    pub use super::{create_storage, StorageOptions};
    pub use wx_core::ArticleStorage;
}
