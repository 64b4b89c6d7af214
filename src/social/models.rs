use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{Track, TrackValidationError};

pub const MAX_POST_LEN: usize = 2000;
pub const MAX_COMMENT_LEN: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Love,
    Laugh,
    Wow,
    Sad,
    Fire,
}

impl ReactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Love => "love",
            ReactionKind::Laugh => "laugh",
            ReactionKind::Wow => "wow",
            ReactionKind::Sad => "sad",
            ReactionKind::Fire => "fire",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "like" => Some(ReactionKind::Like),
            "love" => Some(ReactionKind::Love),
            "laugh" => Some(ReactionKind::Laugh),
            "wow" => Some(ReactionKind::Wow),
            "sad" => Some(ReactionKind::Sad),
            "fire" => Some(ReactionKind::Fire),
            _ => None,
        }
    }
}

/// Number of reactions per category. Categories nobody picked count zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCounts {
    pub like: u32,
    pub love: u32,
    pub laugh: u32,
    pub wow: u32,
    pub sad: u32,
    pub fire: u32,
}

impl ReactionCounts {
    pub fn add(&mut self, kind: ReactionKind, count: u32) {
        let slot = match kind {
            ReactionKind::Like => &mut self.like,
            ReactionKind::Love => &mut self.love,
            ReactionKind::Laugh => &mut self.laugh,
            ReactionKind::Wow => &mut self.wow,
            ReactionKind::Sad => &mut self.sad,
            ReactionKind::Fire => &mut self.fire,
        };
        *slot += count;
    }

    pub fn total(&self) -> u32 {
        self.like + self.love + self.laugh + self.wow + self.sad + self.fire
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub id: String,
    pub author_id: usize,
    pub author_handle: String,
    pub body: String,
    pub image_url: Option<String>,
    pub track: Option<Track>,
    pub created: i64,
    pub edited: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub author_id: usize,
    pub author_handle: String,
    pub body: String,
    pub created: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

/// A post as a given viewer sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub reactions: ReactionCounts,
    pub my_reaction: Option<ReactionKind>,
    pub comments: Vec<CommentNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactionSummary {
    pub post_id: String,
    pub reactions: ReactionCounts,
    pub my_reaction: Option<ReactionKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SocialValidationError {
    #[error("Post body must be between 1 and {MAX_POST_LEN} characters")]
    InvalidPostBody,
    #[error("Comment body must be between 1 and {MAX_COMMENT_LEN} characters")]
    InvalidCommentBody,
    #[error("Image URL must be an http(s) URL")]
    InvalidImageUrl,
    #[error(transparent)]
    InvalidTrack(#[from] TrackValidationError),
}

fn validate_body(body: &str, max: usize) -> bool {
    let len = body.trim().chars().count();
    len > 0 && len <= max
}

fn validate_image_url(url: &Option<String>) -> Result<(), SocialValidationError> {
    match url {
        Some(url) if !(url.starts_with("https://") || url.starts_with("http://")) => {
            Err(SocialValidationError::InvalidImageUrl)
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub body: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub track: Option<Track>,
}

impl NewPost {
    pub fn validate(&self) -> Result<(), SocialValidationError> {
        if !validate_body(&self.body, MAX_POST_LEN) {
            return Err(SocialValidationError::InvalidPostBody);
        }
        validate_image_url(&self.image_url)?;
        if let Some(track) = &self.track {
            track.validate()?;
        }
        Ok(())
    }
}

/// Author edit of a post. An empty `image_url` removes the image.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostEdit {
    pub body: Option<String>,
    pub image_url: Option<String>,
}

impl PostEdit {
    pub fn validate(&self) -> Result<(), SocialValidationError> {
        if let Some(body) = &self.body {
            if !validate_body(body, MAX_POST_LEN) {
                return Err(SocialValidationError::InvalidPostBody);
            }
        }
        match &self.image_url {
            Some(url) if url.is_empty() => Ok(()),
            other => validate_image_url(other),
        }
    }

    pub fn apply_to(&self, post: &mut Post) {
        if let Some(body) = &self.body {
            post.body = body.trim().to_string();
        }
        if let Some(url) = &self.image_url {
            post.image_url = if url.is_empty() {
                None
            } else {
                Some(url.clone())
            };
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    pub body: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), SocialValidationError> {
        if !validate_body(&self.body, MAX_COMMENT_LEN) {
            return Err(SocialValidationError::InvalidCommentBody);
        }
        Ok(())
    }
}

/// Realtime notification of a feed change, fanned out to every connected client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FeedEvent {
    PostCreated {
        post: Post,
    },
    PostUpdated {
        post: Post,
    },
    PostDeleted {
        post_id: String,
    },
    ReactionsChanged {
        post_id: String,
        reactions: ReactionCounts,
    },
    CommentAdded {
        comment: Comment,
    },
    CommentDeleted {
        post_id: String,
        comment_ids: Vec<String>,
    },
}

/// Nests comments under their parents, keeping creation order at every level.
/// Replies whose parent is missing are shown at the top level.
pub fn build_comment_tree(mut comments: Vec<Comment>) -> Vec<CommentNode> {
    comments.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));

    let known: std::collections::HashSet<String> =
        comments.iter().map(|c| c.id.clone()).collect();
    let mut children: HashMap<Option<String>, Vec<Comment>> = HashMap::new();
    for comment in comments {
        let parent = comment
            .parent_id
            .clone()
            .filter(|parent_id| known.contains(parent_id));
        children.entry(parent).or_default().push(comment);
    }

    fn attach(
        parent: Option<String>,
        children: &mut HashMap<Option<String>, Vec<Comment>>,
    ) -> Vec<CommentNode> {
        children
            .remove(&parent)
            .unwrap_or_default()
            .into_iter()
            .map(|comment| {
                let replies = attach(Some(comment.id.clone()), children);
                CommentNode { comment, replies }
            })
            .collect()
    }

    attach(None, &mut children)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: &str, parent: Option<&str>, created: i64) -> Comment {
        Comment {
            id: id.to_string(),
            post_id: "p".to_string(),
            parent_id: parent.map(str::to_string),
            author_id: 1,
            author_handle: "someone".to_string(),
            body: format!("comment {}", id),
            created,
        }
    }

    #[test]
    fn builds_nested_comment_tree() {
        let tree = build_comment_tree(vec![
            comment("c", Some("a"), 3),
            comment("a", None, 1),
            comment("b", None, 2),
            comment("d", Some("c"), 4),
        ]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].comment.id, "a");
        assert_eq!(tree[0].replies.len(), 1);
        assert_eq!(tree[0].replies[0].comment.id, "c");
        assert_eq!(tree[0].replies[0].replies[0].comment.id, "d");
        assert_eq!(tree[1].comment.id, "b");
        assert!(tree[1].replies.is_empty());
    }

    #[test]
    fn orphan_replies_surface_at_top_level() {
        let tree = build_comment_tree(vec![comment("x", Some("gone"), 1)]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].comment.id, "x");
    }

    #[test]
    fn reaction_counts_serialize_every_category() {
        let mut counts = ReactionCounts::default();
        counts.add(ReactionKind::Fire, 2);
        counts.add(ReactionKind::Like, 1);
        assert_eq!(counts.total(), 3);

        let json = serde_json::to_value(counts).unwrap();
        assert_eq!(json["fire"], 2);
        assert_eq!(json["like"], 1);
        assert_eq!(json["sad"], 0);
    }

    #[test]
    fn post_validation() {
        let mut post = NewPost {
            body: "  ".to_string(),
            image_url: None,
            track: None,
        };
        assert_eq!(post.validate(), Err(SocialValidationError::InvalidPostBody));

        post.body = "x".repeat(MAX_POST_LEN + 1);
        assert_eq!(post.validate(), Err(SocialValidationError::InvalidPostBody));

        post.body = "new favourite song".to_string();
        post.image_url = Some("ftp://nope".to_string());
        assert_eq!(post.validate(), Err(SocialValidationError::InvalidImageUrl));

        post.image_url = None;
        post.track = Some(Track::new("short", "t", "c", None));
        assert!(matches!(
            post.validate(),
            Err(SocialValidationError::InvalidTrack(_))
        ));

        post.track = Some(Track::new("dQw4w9WgXcQ", "t", "c", None));
        assert!(post.validate().is_ok());
    }

    #[test]
    fn feed_events_are_tagged() {
        let json = serde_json::to_value(FeedEvent::PostDeleted {
            post_id: "abc".to_string(),
        })
        .unwrap();
        assert_eq!(json["event"], "post_deleted");
        assert_eq!(json["post_id"], "abc");
    }

    #[test]
    fn reaction_kind_names() {
        for kind in [
            ReactionKind::Like,
            ReactionKind::Love,
            ReactionKind::Laugh,
            ReactionKind::Wow,
            ReactionKind::Sad,
            ReactionKind::Fire,
        ] {
            assert_eq!(ReactionKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(ReactionKind::from_str("angry"), None);
    }
}
