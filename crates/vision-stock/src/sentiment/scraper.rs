//! Google News headline scraper

use super::{HeadlineSentiment, NewsSentimentSummary, SentimentAnalyzer};
use crate::config::StockConfig;
use crate::error::{Result, StockError};
use chrono::Utc;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use regex::Regex;
use std::num::NonZeroU32;
use std::sync::{Arc, LazyLock};

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const SEARCH_URL: &str = "https://news.google.com/search";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Headlines this short are navigation labels, not news
const MIN_HEADLINE_CHARS: usize = 10;

static ARTICLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<article\b[^>]*>(.*?)</article>").expect("valid regex"));
static H3: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h3\b[^>]*>(.*?)</h3>").expect("valid regex"));
static ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b[^>]*>(.*?)</a>").expect("valid regex"));
static ROLE_HEADING_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<div\b[^>]*\brole\s*=\s*["']heading["'][^>]*>"#).expect("valid regex")
});
static DIV_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(/?)div\b[^>]*>").expect("valid regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("valid regex"));

/// Scrapes recent headlines for a search query and scores them
#[derive(Clone)]
pub struct NewsScraper {
    client: reqwest::Client,
    search_url: String,
    rate_limiter: SharedRateLimiter,
    analyzer: SentimentAnalyzer,
    head_limit: usize,
}

impl NewsScraper {
    /// Create a scraper using the timeout, rate limit and headline cap from `config`
    pub fn new(config: &StockConfig) -> Self {
        let quota = Quota::per_minute(
            NonZeroU32::new(config.scrape_rate_limit).unwrap_or(NonZeroU32::MIN),
        );

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.scrape_timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            search_url: SEARCH_URL.to_string(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            analyzer: SentimentAnalyzer::new(),
            head_limit: config.news_head_limit,
        }
    }

    /// Scrape a different search endpoint
    pub fn with_base_url(mut self, search_url: impl Into<String>) -> Self {
        self.search_url = search_url.into();
        self
    }

    /// Fetch one results page; fails immediately once the per-minute quota is spent
    async fn fetch_page(&self, query: &str) -> Result<String> {
        if self.rate_limiter.check().is_err() {
            return Err(StockError::ApiError("news scrape quota exhausted".to_string()));
        }

        let url = url::Url::parse_with_params(
            &self.search_url,
            &[("q", query), ("hl", "en-US"), ("gl", "US"), ("ceid", "US:en")],
        )
        .map_err(|e| StockError::ApiError(format!("Invalid news URL: {e}")))?;

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(StockError::ApiError(format!(
                "Google News returned {}",
                response.status()
            )));
        }

        Ok(response.text().await?)
    }

    /// Headlines for `query`; failures are logged and yield an empty list
    pub async fn fetch_headlines(&self, query: &str) -> Vec<String> {
        match self.fetch_page(query).await {
            Ok(html) => extract_headlines(&html, self.head_limit),
            Err(e) => {
                tracing::warn!(query, error = %e, "news scrape failed");
                Vec::new()
            }
        }
    }

    /// Scrape and score today's headlines for `query`
    pub async fn fetch_live_news_sentiment(&self, query: &str) -> Vec<HeadlineSentiment> {
        let today = Utc::now().date_naive();
        self.fetch_headlines(query)
            .await
            .into_iter()
            .map(|headline| HeadlineSentiment {
                date: today,
                sentiment: self.analyzer.polarity_scores(&headline).compound,
                headline,
            })
            .collect()
    }

    /// Scrape, score and summarise in one step
    pub async fn summarize(&self, query: &str) -> NewsSentimentSummary {
        let rows = self.fetch_live_news_sentiment(query).await;
        tracing::debug!(query, headlines = rows.len(), "scored news headlines");
        NewsSentimentSummary::aggregate(rows)
    }
}

/// Pull headline text out of a Google News results page
///
/// Selectors are tried in order (`article h3`, `h3 a`, `div[role=heading]`) and
/// the first one with any match wins. Only its first `limit` matches are kept,
/// and short labels are dropped after that cut.
pub fn extract_headlines(html: &str, limit: usize) -> Vec<String> {
    let selectors: [fn(&str) -> Vec<String>; 3] =
        [select_article_h3, select_h3_anchor, select_role_heading];

    for select in selectors {
        let found = select(html);
        if !found.is_empty() {
            return found
                .into_iter()
                .take(limit)
                .map(|fragment| inner_text(&fragment))
                .filter(|text| text.chars().count() > MIN_HEADLINE_CHARS)
                .collect();
        }
    }

    Vec::new()
}

fn captures(re: &Regex, haystack: &str) -> Vec<String> {
    re.captures_iter(haystack)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

fn select_article_h3(html: &str) -> Vec<String> {
    captures(&ARTICLE, html)
        .iter()
        .flat_map(|article| captures(&H3, article))
        .collect()
}

fn select_h3_anchor(html: &str) -> Vec<String> {
    captures(&H3, html)
        .iter()
        .flat_map(|h3| captures(&ANCHOR, h3))
        .collect()
}

/// Whole `div[role=heading]` bodies, nested divs included
fn select_role_heading(html: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut from = 0;

    while let Some(open) = ROLE_HEADING_OPEN.find_at(html, from) {
        let body_start = open.end();
        let mut depth = 1usize;
        let mut body_end = None;

        for tag in DIV_TAG.captures_iter(&html[body_start..]) {
            let (Some(whole), Some(slash)) = (tag.get(0), tag.get(1)) else {
                continue;
            };
            if slash.as_str().is_empty() {
                depth += 1;
            } else {
                depth -= 1;
                if depth == 0 {
                    body_end = Some((body_start + whole.start(), body_start + whole.end()));
                    break;
                }
            }
        }

        // unclosed heading, nothing more to match
        let Some((end, after)) = body_end else { break };
        out.push(html[body_start..end].to_string());
        from = after;
    }

    out
}

fn inner_text(fragment: &str) -> String {
    let stripped = TAG.replace_all(fragment, " ");
    let decoded = decode_entities(&stripped);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    let numeric = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures<'_>| {
        let code = &caps[1];
        let parsed = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        parsed
            .and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), String::from)
    });

    numeric
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_h3_selector_wins() {
        let html = r#"
            <div role="heading">Ignored because an earlier selector matched</div>
            <article class="x"><h3 class="ipQwMb"><a href="./a1">Apple shares climb after &amp; record iPhone sales</a></h3></article>
            <article><h3>Short one</h3></article>
            <article><div><h3><a>Nvidia&#39;s rally extends into a fifth session</a></h3></div></article>
        "#;

        let headlines = extract_headlines(html, 50);
        assert_eq!(
            headlines,
            vec![
                "Apple shares climb after & record iPhone sales".to_string(),
                "Nvidia's rally extends into a fifth session".to_string(),
            ]
        );
    }

    #[test]
    fn test_falls_back_to_h3_anchor_then_role_heading() {
        let html = r#"<h3><a href="x">Markets rally as yields fall sharply</a></h3>"#;
        assert_eq!(
            extract_headlines(html, 50),
            vec!["Markets rally as yields fall sharply".to_string()]
        );

        let html = r#"<div class="a" role='heading'>Oil slumps on demand worries</div>"#;
        assert_eq!(
            extract_headlines(html, 50),
            vec!["Oil slumps on demand worries".to_string()]
        );
    }

    #[test]
    fn test_limit_applies_before_length_filter() {
        let html = "<article><h3>tiny</h3></article>\
                    <article><h3>A perfectly reasonable headline</h3></article>";
        assert!(extract_headlines(html, 1).is_empty());
        assert_eq!(extract_headlines(html, 2).len(), 1);
    }

    #[test]
    fn test_role_heading_keeps_nested_divs() {
        let html = r#"
            <div role="heading"><div class="src">Reuters</div> Tesla deliveries beat estimates</div>
            <div role="heading">Unclosed heading <div>never ends"#;
        assert_eq!(
            extract_headlines(html, 50),
            vec!["Reuters Tesla deliveries beat estimates".to_string()]
        );
    }

    #[test]
    fn test_no_matches() {
        assert!(extract_headlines("<html><body>nothing here</body></html>", 50).is_empty());
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("AT&amp;T &#8212; &quot;up&quot; &#x27;ok&#x27;"), "AT&T \u{2014} \"up\" 'ok'");
    }

    fn unreachable_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{port}/search")
    }

    #[tokio::test]
    async fn test_unreachable_source_gives_empty_summary() {
        let scraper = NewsScraper::new(&StockConfig::default()).with_base_url(unreachable_url());
        assert!(scraper.fetch_headlines("AAPL stock").await.is_empty());
        assert_eq!(scraper.summarize("AAPL stock").await, NewsSentimentSummary::default());
    }

    #[tokio::test]
    async fn test_exhausted_quota_returns_without_waiting() {
        let config = StockConfig::builder().scrape_rate_limit(1).build().unwrap();
        let scraper = NewsScraper::new(&config).with_base_url(unreachable_url());

        scraper.summarize("first").await;
        let started = std::time::Instant::now();
        let summary = scraper.summarize("second").await;
        assert_eq!(summary, NewsSentimentSummary::default());
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_live_scrape() {
        let scraper = NewsScraper::new(&StockConfig::default());
        let rows = scraper.fetch_live_news_sentiment("AAPL stock").await;
        assert!(rows.iter().all(|r| (-1.0..=1.0).contains(&r.sentiment)));
    }
}
