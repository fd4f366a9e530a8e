use std::sync::OnceLock;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;
use wx_core::{CategoryEntry, Favourite, HotSearch, PortalSnapshot, Result, TopStory};

use crate::fetch::Fetcher;
use crate::scrapers::select;

pub const PORTAL_URL: &str = "https://weixin.sogou.com/";

fn read_count_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+").unwrap())
}

/// Scraper for the portal front page. One scrape walks all five fixed
/// sections of the page and returns them as a single snapshot.
pub struct SogouPortalScraper {
    fetcher: Fetcher,
}

impl SogouPortalScraper {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    pub fn source(&self) -> &str {
        "Sogou WeChat portal"
    }

    pub async fn scrape(&self) -> Result<PortalSnapshot> {
        let html = self.fetcher.fetch_html(PORTAL_URL).await?;
        parse_portal(&html, Utc::now().date_naive())
    }
}

/// Parse the portal front page. Blocks missing their load-bearing nodes are
/// skipped with a warning rather than failing the whole snapshot.
pub fn parse_portal(html: &str, today: NaiveDate) -> Result<PortalSnapshot> {
    let document = Html::parse_document(html);

    Ok(PortalSnapshot {
        top_stories: parse_top_stories(&document, today)?,
        hot_searches: parse_hot_searches(&document)?,
        hot_words: parse_hot_words(&document)?,
        favourites: parse_favourites(&document)?,
        categories: parse_categories(&document)?,
        fetched_at: Utc::now(),
    })
}

/// Rewrite the banner's mixed publish-time markup. The page shows either a
/// month/day fragment (entity-separated digits) for older stories or a bare
/// clock time for today's. Both become a date string anchored to `today`.
pub fn rewrite_publish_time(raw: &str, today: NaiveDate) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return format!("{}-{}-{}", today.year(), today.month(), today.day());
    }
    if raw.contains(':') {
        return format!("{}-{}-{} {}", today.year(), today.month(), today.day(), raw);
    }
    let runs: Vec<&str> = raw
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .collect();
    if runs.len() >= 2 {
        format!("{}-{}-{}", today.year(), runs[0], runs[1])
    } else {
        format!("{}-{}-{} {}", today.year(), today.month(), today.day(), raw)
    }
}

fn parse_top_stories(document: &Html, today: NaiveDate) -> Result<Vec<TopStory>> {
    let news_selector = select::selector("div.wx-news")?;
    let mut stories = Vec::new();
    for news in document.select(&news_selector) {
        match parse_top_story(news, today) {
            Some(story) => stories.push(story),
            None => warn!("banner block missing expected nodes, skipping"),
        }
    }
    Ok(stories)
}

// The banner blocks carry no per-field classes, so this walks them by
// position: title block, description block, then the profile/time line
// where the raw time is the loose text after the profile anchor.
fn parse_top_story(news: ElementRef, today: NaiveDate) -> Option<TopStory> {
    let children = select::element_children(news);
    if children.len() < 3 {
        return None;
    }

    let title_ele = select::element_children(children[0]).into_iter().next()?;
    let title = select::text_of(title_ele);
    if title.is_empty() {
        return None;
    }
    let link = title_ele.value().attr("href").unwrap_or("").to_string();

    let desc = select::element_children(children[1])
        .into_iter()
        .next()
        .map(select::text_of)
        .unwrap_or_default();

    let time_ele = children[2];
    let profile_anchor = select::element_children(time_ele).into_iter().next()?;
    let profile = select::element_children(profile_anchor)
        .into_iter()
        .next()
        .map(select::text_of)
        .unwrap_or_else(|| select::text_of(profile_anchor));
    let profile_link = profile_anchor.value().attr("href").unwrap_or("").to_string();
    let publish_time = rewrite_publish_time(&select::own_text(time_ele), today);

    Some(TopStory {
        title,
        link,
        desc,
        profile,
        profile_link,
        publish_time,
    })
}

fn parse_hot_searches(document: &Html) -> Result<Vec<HotSearch>> {
    let anchor_selector = select::selector("div.wx-ph a")?;
    Ok(document
        .select(&anchor_selector)
        .map(|anchor| HotSearch {
            title: anchor
                .value()
                .attr("title")
                .map(str::to_string)
                .unwrap_or_else(|| select::text_of(anchor)),
            link: anchor.value().attr("href").unwrap_or("").to_string(),
        })
        .filter(|entry| !entry.title.is_empty())
        .collect())
}

fn parse_hot_words(document: &Html) -> Result<Vec<String>> {
    let word_selector = select::selector("div.re-box span")?;
    Ok(document
        .select(&word_selector)
        .map(select::text_of)
        .filter(|word| !word.is_empty())
        .collect())
}

fn parse_favourites(document: &Html) -> Result<Vec<Favourite>> {
    let item_selector = select::selector("ul.sc_news li")?;
    let img_selector = select::selector("img")?;
    let title_selector = select::selector("p.tit a")?;
    let profile_selector = select::selector("p.time a")?;
    let time_selector = select::selector("p.time span")?;

    let mut favourites = Vec::new();
    for item in document.select(&item_selector) {
        let image = select::first_in(item, &img_selector)
            .and_then(|el| el.value().attr("src"))
            .map(str::to_string);
        let title_anchor = select::first_in(item, &title_selector);
        let profile_anchor = select::first_in(item, &profile_selector);

        let (Some(image), Some(title_anchor), Some(profile_anchor)) =
            (image, title_anchor, profile_anchor)
        else {
            warn!("favourite block missing expected nodes, skipping");
            continue;
        };

        favourites.push(Favourite {
            image,
            title: select::text_of(title_anchor),
            link: title_anchor.value().attr("href").unwrap_or("").to_string(),
            profile: select::text_of(profile_anchor),
            profile_link: profile_anchor.value().attr("href").unwrap_or("").to_string(),
            publish_time: select::first_in(item, &time_selector)
                .map(select::text_of)
                .unwrap_or_default(),
        });
    }
    Ok(favourites)
}

struct CategorySelectors {
    profile_p: Selector,
    profile_link: Selector,
    qr: Selector,
    article: Selector,
    short_desc: Selector,
    info: Selector,
    tm: Selector,
    img: Selector,
}

impl CategorySelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            profile_p: select::selector("div.pos-wxrw p")?,
            profile_link: select::selector("div.pos-wxrw a")?,
            qr: select::selector("div.fxf img")?,
            article: select::selector("div.wx-news-info2 a")?,
            short_desc: select::selector("a.wx-news-info")?,
            info: select::selector("div.s-p")?,
            tm: select::selector(r#"bb[t="tm"]"#)?,
            img: select::selector("img")?,
        })
    }
}

fn parse_categories(document: &Html) -> Result<Vec<CategoryEntry>> {
    let item_selector = select::selector("ul#pc_0_subd li")?;
    let selectors = CategorySelectors::new()?;

    let mut entries = Vec::new();
    for item in document.select(&item_selector) {
        match parse_category_entry(item, &selectors) {
            Some(entry) => entries.push(entry),
            None => warn!("category block missing expected nodes, skipping"),
        }
    }
    Ok(entries)
}

fn parse_category_entry(item: ElementRef, selectors: &CategorySelectors) -> Option<CategoryEntry> {
    let profiles: Vec<ElementRef> = item.select(&selectors.profile_p).collect();
    if profiles.len() < 2 {
        return None;
    }
    let profile_logo = select::first_in(profiles[0], &selectors.img)
        .and_then(|el| el.value().attr("src"))
        .unwrap_or("")
        .to_string();
    let profile_name = profiles[1].value().attr("title").unwrap_or("").to_string();
    let profile_link = select::first_in(item, &selectors.profile_link)
        .and_then(|el| el.value().attr("href"))
        .unwrap_or("")
        .to_string();
    let qr_code = select::first_in(item, &selectors.qr)
        .and_then(|el| el.value().attr("src"))
        .unwrap_or("")
        .to_string();

    let article = select::first_in(item, &selectors.article)?;
    let title = select::text_of(article);
    if title.is_empty() {
        return None;
    }
    let link = article.value().attr("href").unwrap_or("").to_string();
    let short_desc = select::first_in(item, &selectors.short_desc)
        .map(select::text_of)
        .unwrap_or_default();

    let info = select::first_in(item, &selectors.info);
    let read_count = info.map(extract_read_count).unwrap_or(0);
    let publish_time = info
        .and_then(|el| select::first_in(el, &selectors.tm))
        .and_then(|el| el.value().attr("v"))
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0));

    Some(CategoryEntry {
        title,
        link,
        short_desc,
        profile_name,
        profile_logo,
        profile_link,
        qr_code,
        read_count,
        publish_time,
    })
}

/// The read counter sits as loose digits between the last `</span>` of the
/// info line and its `<bb t="tm">` element, so it is dug out of the
/// serialized fragment rather than the node tree.
fn extract_read_count(info: ElementRef) -> u64 {
    let markup = info.inner_html();
    let before_tm = markup.split("<bb").next().unwrap_or("");
    let tail = before_tm.rsplit("</span>").next().unwrap_or("");
    read_count_regex()
        .find(tail)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}
