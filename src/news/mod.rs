//! News fetching: candidate stories per topic, then one story per topic.
//!
//! The fetcher works in two phases:
//!
//! 1. **Indexing**: [`rss::fetch_candidates`] reads one Google News search feed
//!    per configured topic and keeps the first few items as candidates.
//! 2. **Selection**: [`select::select_stories`] lets the model pick the most
//!    useful candidate per topic, falling back to the first one.
//!
//! Feed failures abort the run; selection failures never do.

pub mod rss;
pub mod select;

pub use rss::{TopicCandidates, fetch_candidates};
pub use select::select_stories;
