use async_trait::async_trait;
use wx_core::{Result, WeixinArticle};

pub mod sogou;
pub mod weixin;

pub use sogou::SogouPortalScraper;
pub use weixin::WeixinArticleScraper;

/// How a freshly scraped article relates to what the store already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleStatus {
    New,
    Updated,
    Unchanged,
}

#[async_trait]
pub trait Scraper: Send + Sync {
    /// Name of the source this scraper covers.
    fn source(&self) -> &str;

    /// Whether this scraper knows how to handle the given URL.
    fn can_handle(&self, url: &str) -> bool;

    /// Fetch and parse a single article page.
    async fn scrape_article(&self, url: &str) -> Result<WeixinArticle>;
}

/// Selector helpers shared by the page scrapers.
pub(crate) mod select {
    use scraper::{ElementRef, Html, Selector};
    use wx_core::{Error, Result};

    pub fn selector(expr: &str) -> Result<Selector> {
        Selector::parse(expr).map_err(|e| Error::Scrape(format!("invalid selector {:?}: {}", expr, e)))
    }

    /// Concatenated, trimmed text of an element's subtree.
    pub fn text_of(element: ElementRef) -> String {
        element.text().collect::<String>().trim().to_string()
    }

    pub fn first<'a>(document: &'a Html, selector: &Selector) -> Option<ElementRef<'a>> {
        document.select(selector).next()
    }

    pub fn first_in<'a>(element: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
        element.select(selector).next()
    }

    /// Element children in document order, the positional view the page
    /// layouts are addressed by.
    pub fn element_children(element: ElementRef) -> Vec<ElementRef> {
        element.children().filter_map(ElementRef::wrap).collect()
    }

    /// Concatenated text nodes that are direct children of the element,
    /// i.e. loose text sitting between its child tags.
    pub fn own_text(element: ElementRef) -> String {
        element
            .children()
            .filter_map(|node| node.value().as_text().map(|t| t.to_string()))
            .collect::<String>()
            .trim()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::select;
    use scraper::Html;

    #[test]
    fn test_selector_rejects_garbage() {
        assert!(select::selector("p[").is_err());
        assert!(select::selector("div.wx-news").is_ok());
    }

    #[test]
    fn test_own_text_skips_child_tags() {
        let html = r##"<div id="t"><a href="#">inner</a> 07 - 16 <span>s</span></div>"##;
        let document = Html::parse_document(html);
        let selector = select::selector("#t").unwrap();
        let element = select::first(&document, &selector).unwrap();
        assert_eq!(select::own_text(element), "07 - 16");
    }

    #[test]
    fn test_element_children_are_positional() {
        let html = "<ul id=\"l\"><li>a</li>text<li>b</li></ul>";
        let document = Html::parse_document(html);
        let selector = select::selector("#l").unwrap();
        let element = select::first(&document, &selector).unwrap();
        let children = select::element_children(element);
        assert_eq!(children.len(), 2);
        assert_eq!(select::text_of(children[0]), "a");
        assert_eq!(select::text_of(children[1]), "b");
    }
}
