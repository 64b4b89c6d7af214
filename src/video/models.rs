//! Response bodies of the video platform API and the records built from them.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::catalog::Track;

lazy_static! {
    static ref ISO_DURATION_REGEX: Regex =
        Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$").unwrap();
}

/// Full metadata of a single video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoDetails {
    #[serde(flatten)]
    pub track: Track,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u64>,
}

/// Parses an ISO-8601 duration such as `PT1H2M3S` into seconds.
pub fn parse_iso8601_duration(value: &str) -> Option<u32> {
    let captures = ISO_DURATION_REGEX.captures(value)?;
    let part = |i: usize| -> Option<u32> {
        match captures.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    let (days, hours, minutes, seconds) = (part(1)?, part(2)?, part(3)?, part(4)?);
    days.checked_mul(86_400)?
        .checked_add(hours.checked_mul(3_600)?)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiList<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SearchItemId {
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchItem {
    pub id: SearchItemId,
    pub snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Snippet {
    pub title: String,
    #[serde(default)]
    pub channel_title: String,
    #[serde(default)]
    pub description: String,
    pub published_at: Option<String>,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct Thumbnails {
    pub high: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
    pub default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Thumbnail {
    pub url: String,
}

impl Thumbnails {
    fn best(&self) -> Option<String> {
        self.high
            .as_ref()
            .or(self.medium.as_ref())
            .or(self.default.as_ref())
            .map(|t| t.url.clone())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct VideoItem {
    pub id: String,
    pub snippet: Snippet,
    pub content_details: Option<ContentDetails>,
    pub statistics: Option<Statistics>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ContentDetails {
    pub duration: Option<String>,
}

/// Counters come back as decimal strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Statistics {
    pub view_count: Option<String>,
    pub like_count: Option<String>,
}

impl SearchItem {
    /// Channels and playlists carry no video id and are skipped.
    pub fn into_track(self) -> Option<Track> {
        let id = self.id.video_id?;
        let thumbnail = self.snippet.thumbnails.best();
        Some(Track::new(
            id,
            self.snippet.title,
            self.snippet.channel_title,
            thumbnail,
        ))
    }
}

impl VideoItem {
    pub fn into_details(self) -> VideoDetails {
        let mut track = Track::new(
            self.id,
            self.snippet.title,
            self.snippet.channel_title,
            self.snippet.thumbnails.best(),
        );
        track.duration_secs = self
            .content_details
            .and_then(|d| d.duration)
            .and_then(|d| parse_iso8601_duration(&d));
        let (view_count, like_count) = match self.statistics {
            Some(stats) => (
                stats.view_count.and_then(|v| v.parse().ok()),
                stats.like_count.and_then(|v| v.parse().ok()),
            ),
            None => (None, None),
        };
        VideoDetails {
            track,
            description: self.snippet.description,
            published_at: self.snippet.published_at,
            view_count,
            like_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_durations() {
        assert_eq!(parse_iso8601_duration("PT1H2M3S"), Some(3723));
        assert_eq!(parse_iso8601_duration("PT4M"), Some(240));
        assert_eq!(parse_iso8601_duration("PT45S"), Some(45));
        assert_eq!(parse_iso8601_duration("P1DT1S"), Some(86_401));
        assert_eq!(parse_iso8601_duration("P0D"), Some(0));
        assert_eq!(parse_iso8601_duration("1:02:03"), None);
        assert_eq!(parse_iso8601_duration(""), None);
    }

    #[test]
    fn search_items_without_video_id_are_skipped() {
        let body = r#"{"items":[
            {"id":{"videoId":"dQw4w9WgXcQ"},"snippet":{"title":"Song","channelTitle":"Artist",
             "thumbnails":{"medium":{"url":"http://img/m.jpg"},"default":{"url":"http://img/d.jpg"}}}},
            {"id":{"channelId":"UCxyz"},"snippet":{"title":"A channel"}}
        ]}"#;
        let list: ApiList<SearchItem> = serde_json::from_str(body).unwrap();
        let tracks: Vec<Track> = list.items.into_iter().filter_map(|i| i.into_track()).collect();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].channel, "Artist");
        assert_eq!(tracks[0].thumbnail.as_deref(), Some("http://img/m.jpg"));
    }

    #[test]
    fn video_item_maps_statistics() {
        let body = r#"{"id":"dQw4w9WgXcQ","snippet":{"title":"Song","channelTitle":"Artist",
            "description":"words","publishedAt":"2009-10-25T06:57:33Z"},
            "contentDetails":{"duration":"PT3M33S"},
            "statistics":{"viewCount":"1500000000","likeCount":"nope"}}"#;
        let item: VideoItem = serde_json::from_str(body).unwrap();
        let details = item.into_details();
        assert_eq!(details.track.duration_secs, Some(213));
        assert_eq!(details.view_count, Some(1_500_000_000));
        assert_eq!(details.like_count, None);
        assert_eq!(details.published_at.as_deref(), Some("2009-10-25T06:57:33Z"));
    }
}
