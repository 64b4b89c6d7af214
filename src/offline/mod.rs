//! Static sample library served while offline and when the video API is unavailable.

use crate::catalog::Track;

const SAMPLE_TRACKS: &[(&str, &str, &str, u32)] = &[
    ("dQw4w9WgXcQ", "Never Gonna Give You Up", "Rick Astley", 213),
    ("kJQP7kiw5Fk", "Despacito", "Luis Fonsi", 282),
    ("9bZkp7q19f0", "Gangnam Style", "PSY", 253),
    ("fJ9rUzIMcZQ", "Bohemian Rhapsody", "Queen Official", 355),
    ("JGwWNGJdvx8", "Shape of You", "Ed Sheeran", 264),
    ("hTWKbfoikeg", "Smells Like Teen Spirit", "Nirvana", 279),
    ("YQHsXMglC9A", "Hello", "Adele", 367),
    ("OPf0YbXqDm0", "Uptown Funk", "Mark Ronson", 271),
];

#[derive(Debug, Clone)]
pub struct OfflineLibrary {
    tracks: Vec<Track>,
}

impl Default for OfflineLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflineLibrary {
    pub fn new() -> Self {
        let tracks = SAMPLE_TRACKS
            .iter()
            .map(|(id, title, channel, duration)| {
                let mut track = Track::new(
                    *id,
                    *title,
                    *channel,
                    Some(format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", id)),
                );
                track.duration_secs = Some(*duration);
                track
            })
            .collect();
        Self { tracks }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Tracks whose title or channel contains `query`, ignoring case. A blank query
    /// returns the whole library.
    pub fn search(&self, query: &str) -> Vec<Track> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.tracks.clone();
        }
        self.tracks
            .iter()
            .filter(|t| {
                t.title.to_lowercase().contains(&query) || t.channel.to_lowercase().contains(&query)
            })
            .cloned()
            .collect()
    }
}
