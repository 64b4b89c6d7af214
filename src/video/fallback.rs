use serde::Serialize;
use tracing::warn;

use super::client::VideoSource;
use crate::catalog::Track;
use crate::offline::OfflineLibrary;
use crate::server::metrics;

/// Search results, possibly substituted by offline content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub tracks: Vec<Track>,
    /// True when `tracks` come from the offline library.
    pub fallback: bool,
}

/// Searches `source`, falling back to the offline library when no source is
/// configured or the search fails.
pub async fn search_with_fallback(
    source: Option<&dyn VideoSource>,
    offline: &OfflineLibrary,
    query: &str,
    max_results: u32,
) -> SearchOutcome {
    let reason = match source {
        Some(source) => match source.search(query, max_results).await {
            Ok(tracks) => {
                return SearchOutcome {
                    tracks,
                    fallback: false,
                }
            }
            Err(err) => err.to_string(),
        },
        None => "video API not configured".to_string(),
    };
    warn!("Serving offline results for {:?}: {}", query, reason);
    metrics::record_video_fallback();
    let mut tracks = offline.search(query);
    if tracks.is_empty() {
        tracks = offline.tracks().to_vec();
    }
    tracks.truncate(max_results.max(1) as usize);
    SearchOutcome {
        tracks,
        fallback: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::client::{MockVideoSource, VideoSearchError};

    #[tokio::test]
    async fn successful_search_is_passed_through() {
        let mut source = MockVideoSource::new();
        source
            .expect_search()
            .withf(|q, max| q == "lofi" && *max == 10)
            .times(1)
            .returning(|_, _| Ok(vec![Track::new("AAAAAAAAAAA", "Lofi", "Beats", None)]));

        let outcome =
            search_with_fallback(Some(&source), &OfflineLibrary::new(), "lofi", 10).await;
        assert!(!outcome.fallback);
        assert_eq!(outcome.tracks.len(), 1);
    }

    #[tokio::test]
    async fn failures_fall_back_to_offline_library() {
        let mut source = MockVideoSource::new();
        source
            .expect_search()
            .returning(|_, _| Err(VideoSearchError::QuotaExhausted { attempts: 2 }));

        let outcome =
            search_with_fallback(Some(&source), &OfflineLibrary::new(), "adele", 10).await;
        assert!(outcome.fallback);
        assert_eq!(outcome.tracks[0].channel, "Adele");
    }

    #[tokio::test]
    async fn unmatched_query_falls_back_to_whole_library() {
        let mut source = MockVideoSource::new();
        source
            .expect_search()
            .returning(|_, _| Err(VideoSearchError::QuotaExhausted { attempts: 2 }));

        let offline = OfflineLibrary::new();
        let outcome = search_with_fallback(Some(&source), &offline, "polka", 10).await;
        assert!(outcome.fallback);
        assert!(!outcome.tracks.is_empty());
        assert_eq!(outcome.tracks.len(), offline.tracks().len().min(10));
    }

    #[tokio::test]
    async fn missing_source_serves_offline_library() {
        let outcome = search_with_fallback(None, &OfflineLibrary::new(), "", 3).await;
        assert!(outcome.fallback);
        assert_eq!(outcome.tracks.len(), 3);
    }
}
