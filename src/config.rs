//! Lesson configuration.
//!
//! Everything that shapes a lesson but is not a credential lives here: the
//! header texts, the news feeds, and the upstream base URLs. The defaults
//! reproduce the daily lesson; an optional YAML file can override any field.
//!
//! ```yaml
//! title: Español con Noticias
//! level: A2-B1
//! candidates_per_topic: 5
//! feeds:
//!   - topic: economy
//!     query: US economy inflation jobs
//! ```

use crate::error::LessonError;
use crate::models::Topic;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LessonConfig {
    pub title: String,
    pub subtitle: String,
    pub level: String,
    pub feeds: Vec<FeedConfig>,
    /// How many RSS items per topic are offered to the story selector.
    pub candidates_per_topic: usize,
    pub news_base_url: String,
    pub images: ImageConfig,
}

/// One Google News search feed.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeedConfig {
    pub topic: Topic,
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ImageConfig {
    pub base_url: String,
    pub width: u32,
    pub height: u32,
}

impl Default for LessonConfig {
    fn default() -> Self {
        Self {
            title: "Español con Noticias".to_string(),
            subtitle: "Noticias de Estados Unidos".to_string(),
            level: "A2-B1".to_string(),
            feeds: vec![
                FeedConfig {
                    topic: Topic::Politics,
                    query: "US politics congress government".to_string(),
                },
                FeedConfig {
                    topic: Topic::Economy,
                    query: "US economy business markets".to_string(),
                },
                FeedConfig {
                    topic: Topic::Technology,
                    query: "technology AI tech companies".to_string(),
                },
            ],
            candidates_per_topic: 8,
            news_base_url: "https://news.google.com/rss/search".to_string(),
            images: ImageConfig::default(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.unsplash.com".to_string(),
            width: 800,
            height: 450,
        }
    }
}

impl LessonConfig {
    /// Load the configuration from `path`, or the defaults when no path is given.
    ///
    /// # Errors
    ///
    /// [`LessonError::Config`] if the file cannot be read or parsed.
    #[instrument(level = "info", skip_all)]
    pub async fn load(path: Option<&Path>) -> Result<Self, LessonError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)
            .await
            .map_err(|e| LessonError::Config(format!("read {}: {e}", path.display())))?;
        let config = Self::from_yaml(&raw)
            .map_err(|e| LessonError::Config(format!("parse {}: {e}", path.display())))?;
        info!(path = %path.display(), feeds = config.feeds.len(), "Loaded lesson configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    /// Search URL for one feed, restricted to the last day of US English news.
    pub fn feed_url(&self, feed: &FeedConfig) -> Result<Url, LessonError> {
        let q = format!("{} when:1d", feed.query);
        Url::parse_with_params(
            &self.news_base_url,
            &[
                ("q", q.as_str()),
                ("hl", "en-US"),
                ("gl", "US"),
                ("ceid", "US:en"),
            ],
        )
        .map_err(|e| LessonError::Config(format!("news_base_url {}: {e}", self.news_base_url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_three_topics() {
        let config = LessonConfig::default();
        let topics: Vec<Topic> = config.feeds.iter().map(|f| f.topic).collect();
        assert_eq!(topics, Topic::ALL.to_vec());
        assert_eq!(config.level, "A2-B1");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = LessonConfig::from_yaml(
            "level: B1\ncandidates_per_topic: 3\nimages:\n  width: 640\n",
        )
        .unwrap();
        assert_eq!(config.level, "B1");
        assert_eq!(config.candidates_per_topic, 3);
        assert_eq!(config.images.width, 640);
        assert_eq!(config.images.height, 450);
        assert_eq!(config.feeds.len(), 3);
        assert_eq!(config.title, "Español con Noticias");
    }

    #[test]
    fn test_yaml_feeds_override() {
        let config = LessonConfig::from_yaml(
            "feeds:\n  - topic: economy\n    query: US jobs report\n",
        )
        .unwrap();
        assert_eq!(config.feeds.len(), 1);
        assert_eq!(config.feeds[0].topic, Topic::Economy);
    }

    #[test]
    fn test_feed_url_encodes_query() {
        let config = LessonConfig::default();
        let url = config.feed_url(&config.feeds[1]).unwrap();
        assert_eq!(url.host_str(), Some("news.google.com"));
        let q = url
            .query_pairs()
            .find(|(k, _)| k == "q")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(q, "US economy business markets when:1d");
        assert!(url.as_str().contains("ceid=US%3Aen"));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_config_error() {
        let err = LessonConfig::load(Some(Path::new("/nonexistent/lesson.yaml")))
            .await
            .unwrap_err();
        assert!(matches!(err, LessonError::Config(_)));
    }
}
