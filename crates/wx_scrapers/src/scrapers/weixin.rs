use async_trait::async_trait;
use chrono::Utc;
use scraper::Html;
use wx_core::{Error, Result, WeixinArticle};

use crate::fetch::Fetcher;
use crate::scrapers::{select, Scraper};

const ARTICLE_HOST: &str = "mp.weixin.qq.com";

/// Scraper for public-account article pages.
///
/// The page layout is fixed: the title sits in `h2#activity-name`, the body
/// in `div#js_content`, and the byline/QR decoration in a handful of
/// id-addressed nodes.
pub struct WeixinArticleScraper {
    fetcher: Fetcher,
}

impl WeixinArticleScraper {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Scraper for WeixinArticleScraper {
    fn source(&self) -> &str {
        "WeChat articles"
    }

    fn can_handle(&self, url: &str) -> bool {
        url.contains(ARTICLE_HOST)
    }

    async fn scrape_article(&self, url: &str) -> Result<WeixinArticle> {
        let html = self.fetcher.fetch_html(url).await?;
        parse_article(url, &html)
    }
}

/// Parse an article page. The title is load-bearing; the byline, post date
/// and QR code degrade to `None` when the page does not carry them.
pub fn parse_article(url: &str, html: &str) -> Result<WeixinArticle> {
    let document = Html::parse_document(html);

    let title_selector = select::selector("h2#activity-name")?;
    let title = select::first(&document, &title_selector)
        .map(select::text_of)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::Scrape(format!("article page {} has no title node", url)))?;

    let paragraph_selector = select::selector("div#js_content p")?;
    let mut paragraphs = Vec::new();
    for element in document.select(&paragraph_selector) {
        let text = select::text_of(element);
        if !text.is_empty() {
            paragraphs.push(format!("<p>{}</p>", text));
        }
    }
    let content_html = paragraphs.concat();

    let qr_selector = select::selector("img#js_pc_qr_code_img")?;
    let qr_code = select::first(&document, &qr_selector)
        .and_then(|el| el.value().attr("src"))
        .map(str::to_string);

    let date_selector = select::selector("em#post-date")?;
    let publish_time = select::first(&document, &date_selector)
        .map(select::text_of)
        .filter(|t| !t.is_empty());

    let author_selector = select::selector("a#post-user")?;
    let author = select::first(&document, &author_selector)
        .map(select::text_of)
        .filter(|t| !t.is_empty());

    Ok(WeixinArticle {
        url: url.to_string(),
        title,
        content_html,
        author,
        publish_time,
        qr_code,
        fetched_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_HTML: &str = r#"
        <html><body>
            <h2 id="activity-name">
                A Headline With Padding
            </h2>
            <em id="post-date">2016-07-16</em>
            <a id="post-user">Some Account</a>
            <div id="js_content">
                <p>First paragraph.</p>
                <p>   </p>
                <p>Second <strong>paragraph</strong>.</p>
            </div>
            <img id="js_pc_qr_code_img" src="http://example.com/qr.png">
        </body></html>
    "#;

    #[test]
    fn test_parse_article() {
        let article = parse_article("http://mp.weixin.qq.com/s?src=3", ARTICLE_HTML).unwrap();
        assert_eq!(article.title, "A Headline With Padding");
        assert_eq!(
            article.content_html,
            "<p>First paragraph.</p><p>Second paragraph.</p>"
        );
        assert_eq!(article.author.as_deref(), Some("Some Account"));
        assert_eq!(article.publish_time.as_deref(), Some("2016-07-16"));
        assert_eq!(article.qr_code.as_deref(), Some("http://example.com/qr.png"));
        assert_eq!(article.url, "http://mp.weixin.qq.com/s?src=3");
    }

    #[test]
    fn test_missing_title_is_an_error() {
        let result = parse_article("http://mp.weixin.qq.com/s", "<html><body></body></html>");
        assert!(matches!(result, Err(Error::Scrape(_))));
    }

    #[test]
    fn test_decoration_is_optional() {
        let html = r#"<h2 id="activity-name">Bare</h2><div id="js_content"><p>x</p></div>"#;
        let article = parse_article("http://mp.weixin.qq.com/s", html).unwrap();
        assert!(article.author.is_none());
        assert!(article.publish_time.is_none());
        assert!(article.qr_code.is_none());
    }

    #[test]
    fn test_can_handle() {
        let scraper = WeixinArticleScraper::new(Fetcher::new().unwrap());
        assert!(scraper.can_handle("http://mp.weixin.qq.com/s?src=3&timestamp=1"));
        assert!(!scraper.can_handle("https://weixin.sogou.com/"));
    }
}
