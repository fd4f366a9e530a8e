use std::sync::Arc;

use wx_core::ArticleStorage;

pub struct AppState {
    pub storage: Arc<dyn ArticleStorage>,
}
