//! Story selection: one story per topic.
//!
//! The model sees every candidate, numbered per topic, and answers with the
//! number it prefers for each topic. Anything unusable in that answer falls
//! back to the first candidate of the topic, so selection never aborts a run.

use super::rss::TopicCandidates;
use crate::api::AskAsync;
use crate::models::{Story, Topic};
use crate::utils::{strip_code_fences, truncate_for_log};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::{info, instrument, warn};

const SUMMARY_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct Pick {
    #[serde(default = "first_pick")]
    pick: usize,
    #[serde(default)]
    reason: Option<String>,
}

fn first_pick() -> usize {
    1
}

/// Pick one story per topic, asking `model` when one is available.
///
/// # Arguments
///
/// * `model` - Selection model, or `None` to take the first candidate
/// * `candidates` - Candidates per topic, as fetched
///
/// # Returns
///
/// One story per topic that has candidates, in topic order. Never fails:
/// an unreachable model or an unusable answer falls back to the first
/// candidate of each topic.
#[instrument(level = "info", skip_all, fields(topics = candidates.len()))]
pub async fn select_stories<A>(model: Option<&A>, candidates: &[TopicCandidates]) -> Vec<Story>
where
    A: AskAsync<Response = String>,
{
    let Some(model) = model else {
        info!("No selection model configured; using first candidate per topic");
        return first_per_topic(candidates);
    };

    let answer = match model.ask(&selection_prompt(candidates)).await {
        Ok(answer) => answer,
        Err(e) => {
            warn!(error = %e, "Story selection failed; using first candidate per topic");
            return first_per_topic(candidates);
        }
    };

    match serde_json::from_str::<BTreeMap<String, Pick>>(strip_code_fences(&answer)) {
        Ok(picks) => apply_picks(candidates, &picks),
        Err(e) => {
            warn!(
                error = %e,
                response_preview = %truncate_for_log(&answer, 300),
                "Selection answer is not JSON; using first candidate per topic"
            );
            first_per_topic(candidates)
        }
    }
}

/// The prompt listing every candidate, numbered from 1 within its topic.
pub fn selection_prompt(candidates: &[TopicCandidates]) -> String {
    let mut prompt = String::from(
        "You are a news editor selecting stories for a Spanish language learning PDF.\n\n\
         For each category below, pick the ONE best story that:\n\
         1. Is most newsworthy and significant\n\
         2. Has clear, concrete facts (names, numbers, events)\n\
         3. Would be interesting for Spanish learners in the US\n\
         4. Is NOT a duplicate or slight variation of another story\n\n\
         CANDIDATES BY CATEGORY:\n",
    );

    for group in candidates {
        let _ = writeln!(prompt, "\n## {}", group.topic.label());
        for (i, story) in group.stories.iter().enumerate() {
            let _ = writeln!(prompt, "{}. [{}] {}", i + 1, story.source, story.headline);
            if !story.body.is_empty() {
                let summary: String = story.body.chars().take(SUMMARY_CHARS).collect();
                let _ = writeln!(prompt, "   Summary: {summary}...");
            }
        }
    }

    prompt.push_str("\nRESPOND WITH JSON ONLY - pick one story number per category:\n{\n");
    let example = candidates
        .iter()
        .map(|g| format!("    \"{}\": {{\"pick\": 1, \"reason\": \"brief reason\"}}", g.topic.label()))
        .collect::<Vec<_>>()
        .join(",\n");
    prompt.push_str(&example);
    prompt.push_str("\n}\n");
    prompt
}

fn apply_picks(candidates: &[TopicCandidates], picks: &BTreeMap<String, Pick>) -> Vec<Story> {
    candidates
        .iter()
        .filter_map(|group| {
            let pick = picks
                .iter()
                .find(|(key, _)| Topic::from_label(key) == Some(group.topic))
                .map(|(_, pick)| pick);

            let index = match pick {
                Some(p) if (1..=group.stories.len()).contains(&p.pick) => p.pick - 1,
                Some(p) => {
                    warn!(topic = %group.topic, pick = p.pick, "Pick out of range; using first candidate");
                    0
                }
                None => {
                    warn!(topic = %group.topic, "No pick for topic; using first candidate");
                    0
                }
            };

            let story = group.stories.get(index)?;
            info!(
                topic = %group.topic,
                pick = index + 1,
                headline = %truncate_for_log(&story.headline, 80),
                reason = pick.and_then(|p| p.reason.as_deref()).unwrap_or("n/a"),
                "Selected story"
            );
            Some(story.clone())
        })
        .collect()
}

/// The first candidate of every topic that has one.
pub fn first_per_topic(candidates: &[TopicCandidates]) -> Vec<Story> {
    candidates
        .iter()
        .filter_map(|group| group.stories.first().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedModel;

    fn story(topic: Topic, headline: &str) -> Story {
        Story {
            headline: headline.to_string(),
            body: format!("{headline} summary"),
            topic,
            source: "AP".to_string(),
            published: None,
        }
    }

    fn candidates() -> Vec<TopicCandidates> {
        Topic::ALL
            .into_iter()
            .map(|topic| TopicCandidates {
                topic,
                stories: (1..=3)
                    .map(|i| story(topic, &format!("{} story {i}", topic.slug())))
                    .collect(),
            })
            .collect()
    }

    #[test]
    fn test_prompt_numbers_candidates_per_topic() {
        let prompt = selection_prompt(&candidates());
        assert!(prompt.contains("## Política\n1. [AP] politics story 1"));
        assert!(prompt.contains("3. [AP] technology story 3"));
        assert!(prompt.contains("\"Economía\": {\"pick\": 1"));
    }

    #[tokio::test]
    async fn test_model_picks_are_applied() {
        let model = ScriptedModel::new([r#"```json
{
  "Política": {"pick": 2, "reason": "concrete numbers"},
  "Economía": {"pick": 3, "reason": "broad impact"},
  "Tecnologia": {"pick": 1}
}
```"#]);
        let stories = select_stories(Some(&model), &candidates()).await;
        let headlines: Vec<&str> = stories.iter().map(|s| s.headline.as_str()).collect();
        assert_eq!(
            headlines,
            ["politics story 2", "economy story 3", "technology story 1"]
        );
    }

    #[tokio::test]
    async fn test_out_of_range_or_missing_picks_fall_back() {
        let model = ScriptedModel::new([r#"{"Política": {"pick": 9}}"#]);
        let stories = select_stories(Some(&model), &candidates()).await;
        assert_eq!(stories.len(), 3);
        assert!(stories.iter().all(|s| s.headline.ends_with("story 1")));
    }

    #[tokio::test]
    async fn test_model_failure_falls_back() {
        let model = ScriptedModel::new(Vec::<String>::new());
        let stories = select_stories(Some(&model), &candidates()).await;
        assert_eq!(stories.len(), 3);
        assert_eq!(stories[0].topic, Topic::Politics);
    }

    #[tokio::test]
    async fn test_without_model_uses_first_candidates() {
        let stories = select_stories::<ScriptedModel>(None, &candidates()).await;
        assert_eq!(stories, first_per_topic(&candidates()));
    }

    #[test]
    fn test_first_per_topic_skips_empty_topics() {
        let mut groups = candidates();
        groups[1].stories.clear();
        let stories = first_per_topic(&groups);
        assert_eq!(stories.len(), 2);
        assert_eq!(stories[1].topic, Topic::Technology);
    }
}
