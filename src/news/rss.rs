//! Google News RSS search feeds.
//!
//! Each configured topic maps to one search feed. Item descriptions are HTML
//! snippets (a link plus the publisher name), so they are reduced to plain
//! text before they reach the model.

use crate::config::LessonConfig;
use crate::error::LessonError;
use crate::models::{Story, Topic};
use crate::utils::normalize_whitespace;
use reqwest::Client;
use scraper::Html;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

const FEED_TIMEOUT: Duration = Duration::from_secs(15);

/// Candidate stories fetched for one topic, in feed order.
#[derive(Debug, Clone)]
pub struct TopicCandidates {
    pub topic: Topic,
    pub stories: Vec<Story>,
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    source: Option<Source>,
    #[serde(rename = "pubDate", default)]
    pub_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Source {
    #[serde(rename = "$text", default)]
    name: Option<String>,
}

/// Fetch the candidates of every configured feed, in configuration order.
///
/// # Arguments
///
/// * `client` - Shared HTTP client
/// * `config` - Feeds to search and how many candidates to keep per topic
///
/// # Returns
///
/// One [`TopicCandidates`] per configured feed, each non-empty.
///
/// # Errors
///
/// A single attempt per feed: any transport error, non-success status,
/// unparseable body or empty feed is a [`LessonError::ExternalDependency`]
/// and aborts the run.
#[instrument(level = "info", skip_all, fields(feeds = config.feeds.len()))]
pub async fn fetch_candidates(
    client: &Client,
    config: &LessonConfig,
) -> Result<Vec<TopicCandidates>, LessonError> {
    let mut candidates = Vec::with_capacity(config.feeds.len());
    for feed in &config.feeds {
        let url = config.feed_url(feed)?;
        let stories = fetch_feed(client, &url, feed.topic, config.candidates_per_topic).await?;
        info!(topic = %feed.topic, count = stories.len(), "Found feed candidates");
        candidates.push(TopicCandidates {
            topic: feed.topic,
            stories,
        });
    }
    Ok(candidates)
}

#[instrument(level = "info", skip_all, fields(%topic, %url))]
async fn fetch_feed(
    client: &Client,
    url: &Url,
    topic: Topic,
    limit: usize,
) -> Result<Vec<Story>, LessonError> {
    let what = format!("news feed ({topic})");
    let body = client
        .get(url.clone())
        .timeout(FEED_TIMEOUT)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| LessonError::external(&what, e))?
        .text()
        .await
        .map_err(|e| LessonError::external(&what, e))?;
    debug!(bytes = body.len(), "Downloaded feed");

    let stories = parse_feed(&body, topic, limit)
        .map_err(|e| LessonError::external(&what, format!("unparseable feed: {e}")))?;
    if stories.is_empty() {
        return Err(LessonError::external(what, "feed returned no items"));
    }
    Ok(stories)
}

/// Parse an RSS document into at most `limit` stories.
///
/// Items without a title are skipped; a missing publisher becomes `"News"`.
pub fn parse_feed(
    xml: &str,
    topic: Topic,
    limit: usize,
) -> Result<Vec<Story>, quick_xml::de::DeError> {
    let rss: Rss = quick_xml::de::from_str(xml)?;
    let stories = rss
        .channel
        .items
        .into_iter()
        .take(limit)
        .filter_map(|item| {
            let headline = normalize_whitespace(item.title.as_deref().unwrap_or_default());
            if headline.is_empty() {
                return None;
            }
            let body = item
                .description
                .as_deref()
                .map(html_to_text)
                .unwrap_or_default();
            let source = item
                .source
                .and_then(|s| s.name)
                .map(|s| normalize_whitespace(&s))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "News".to_string());
            Some(Story {
                headline,
                body,
                topic,
                source,
                published: item.pub_date.map(|d| d.trim().to_string()),
            })
        })
        .collect();
    Ok(stories)
}

/// Text content of an HTML snippet, entities decoded and whitespace collapsed.
fn html_to_text(fragment: &str) -> String {
    let html = Html::parse_fragment(fragment);
    let text = html.root_element().text().collect::<Vec<_>>().join(" ");
    normalize_whitespace(&text)
}


#[cfg(test)]
mod tests {
    use super::fixtures::FEED;
    use super::*;
    use std::thread;

    #[test]
    fn test_parse_feed_extracts_stories() {
        let stories = parse_feed(FEED, Topic::Economy, 8).unwrap();
        assert_eq!(stories.len(), 2);

        let first = &stories[0];
        assert_eq!(first.headline, "Fed holds rates steady as inflation cools - Reuters");
        assert_eq!(first.body, "Fed holds rates steady as inflation cools Reuters");
        assert_eq!(first.source, "Reuters");
        assert_eq!(first.topic, Topic::Economy);
        assert_eq!(first.published.as_deref(), Some("Thu, 15 Oct 2026 13:00:00 GMT"));

        let second = &stories[1];
        assert_eq!(second.headline, "Jobs report beats expectations & markets rally");
        assert_eq!(second.source, "News");
        assert!(second.body.is_empty());
    }

    #[test]
    fn test_parse_feed_respects_limit() {
        let stories = parse_feed(FEED, Topic::Economy, 1).unwrap();
        assert_eq!(stories.len(), 1);
    }

    #[test]
    fn test_parse_feed_rejects_garbage() {
        assert!(parse_feed("<html><body>blocked</body>", Topic::Politics, 8).is_err());
    }

    fn serve(status: u16, body: &'static str) -> String {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
        let base_url = format!("http://{}/rss/search", server.server_addr());
        thread::spawn(move || {
            for request in server.incoming_requests() {
                let _ = request
                    .respond(tiny_http::Response::from_string(body).with_status_code(status));
            }
        });
        base_url
    }

    #[tokio::test]
    async fn test_fetch_candidates_per_topic() {
        let config = LessonConfig {
            news_base_url: serve(200, FEED),
            ..LessonConfig::default()
        };
        let candidates = fetch_candidates(&Client::new(), &config).await.unwrap();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].topic, Topic::Politics);
        assert_eq!(candidates[2].topic, Topic::Technology);
        assert!(candidates.iter().all(|c| c.stories.len() == 2));
        assert_eq!(candidates[1].stories[0].topic, Topic::Economy);
    }

    #[tokio::test]
    async fn test_unreachable_feed_aborts() {
        let config = LessonConfig {
            news_base_url: serve(503, "unavailable"),
            ..LessonConfig::default()
        };
        let err = fetch_candidates(&Client::new(), &config).await.unwrap_err();
        assert!(matches!(err, LessonError::ExternalDependency { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_empty_feed_aborts() {
        let config = LessonConfig {
            news_base_url: serve(200, "<rss><channel><title>t</title></channel></rss>"),
            ..LessonConfig::default()
        };
        let err = fetch_candidates(&Client::new(), &config).await.unwrap_err();
        assert!(err.to_string().contains("no items"));
    }
}
