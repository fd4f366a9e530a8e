use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use wx_core::{Page, PortalSnapshot, TopStory, WeixinArticle};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

fn internal_error(e: wx_core::Error) -> StatusCode {
    tracing::error!("storage error: {}", e);
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Out-of-range pages abort with 404: page numbers below 1 always, and any
/// empty page other than the first.
fn check_page_bounds<T>(page: &Page<T>, requested: u64) -> Result<(), StatusCode> {
    if requested < 1 || (page.items.is_empty() && requested != 1) {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(())
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<WeixinArticle>>, StatusCode> {
    if params.page < 1 {
        return Err(StatusCode::NOT_FOUND);
    }
    let page = state
        .storage
        .list_articles(params.page, params.per_page)
        .await
        .map_err(internal_error)?;
    check_page_bounds(&page, params.page)?;
    Ok(Json(page))
}

/// Single-article lookup; a missing record is a 404, not an empty body.
pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(url): Path<String>,
) -> Result<Json<WeixinArticle>, StatusCode> {
    let article = state
        .storage
        .article_by_url(&url)
        .await
        .map_err(internal_error)?;
    article.map(Json).ok_or(StatusCode::NOT_FOUND)
}

pub async fn list_top_stories(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<TopStory>>, StatusCode> {
    if params.page < 1 {
        return Err(StatusCode::NOT_FOUND);
    }
    let page = state
        .storage
        .list_top_stories(params.page, params.per_page)
        .await
        .map_err(internal_error)?;
    check_page_bounds(&page, params.page)?;
    Ok(Json(page))
}

pub async fn latest_snapshot(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PortalSnapshot>, StatusCode> {
    let snapshot = state
        .storage
        .latest_snapshot()
        .await
        .map_err(internal_error)?;
    snapshot.map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wx_core::ArticleStorage;
    use wx_storage::MemoryStorage;

    fn article(url: &str) -> WeixinArticle {
        WeixinArticle {
            url: url.to_string(),
            title: "title".to_string(),
            content_html: "<p>x</p>".to_string(),
            author: None,
            publish_time: None,
            qr_code: None,
            fetched_at: Utc::now(),
        }
    }

    async fn state_with_articles(urls: &[&str]) -> State<Arc<AppState>> {
        let storage = MemoryStorage::new();
        for url in urls {
            storage.store_article(&article(url)).await.unwrap();
        }
        State(Arc::new(AppState {
            storage: Arc::new(storage),
        }))
    }

    fn params(page: u64, per_page: u64) -> Query<PageParams> {
        Query(PageParams { page, per_page })
    }

    #[tokio::test]
    async fn test_list_articles_first_page_may_be_empty() {
        let state = state_with_articles(&[]).await;
        let Json(page) = list_articles(state, params(1, 20)).await.unwrap();
        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_list_articles_beyond_range_is_404() {
        let state = state_with_articles(&["u1"]).await;
        let result = list_articles(state, params(5, 20)).await;
        assert_eq!(result.err(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_list_articles_page_zero_is_404() {
        let state = state_with_articles(&["u1"]).await;
        let result = list_articles(state, params(0, 20)).await;
        assert_eq!(result.err(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_get_article_found_and_missing() {
        let state = state_with_articles(&["u1"]).await;
        let Json(found) = get_article(state.clone(), Path("u1".to_string()))
            .await
            .unwrap();
        assert_eq!(found.url, "u1");

        let missing = get_article(state, Path("nope".to_string())).await;
        assert_eq!(missing.err(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_latest_snapshot_missing_is_404() {
        let state = state_with_articles(&[]).await;
        let result = latest_snapshot(state).await;
        assert_eq!(result.err(), Some(StatusCode::NOT_FOUND));
    }
}
