pub mod error;
pub mod page;
pub mod storage;
pub mod types;

pub use error::Error;
pub use page::Page;
pub use storage::{collection_name, default_indexes, ArticleStorage, Document, IndexSpec, Order};
pub use types::{CategoryEntry, Favourite, HotSearch, PortalSnapshot, TopStory, WeixinArticle};

pub type Result<T> = std::result::Result<T, Error>;
