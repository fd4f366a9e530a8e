use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use wx_core::Result;

pub mod handlers;
pub mod state;

pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/articles", get(handlers::list_articles))
        .route("/api/articles/:url", get(handlers::get_article))
        .route("/api/top-stories", get(handlers::list_top_stories))
        .route("/api/snapshot", get(handlers::latest_snapshot))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🌐 Listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub mod prelude {
    pub use crate::AppState;
    pub use wx_core::{Error, Result, WeixinArticle};
}
