mod feed;
pub mod models;
mod store;

pub use feed::{Author, FeedQuery, FeedService, SocialError, SocialResult, MAX_FEED_PAGE};
pub use models::{
    Comment, CommentNode, FeedEvent, NewComment, NewPost, Post, PostEdit, PostView,
    ReactionCounts, ReactionKind, ReactionSummary,
};
pub use store::{SocialStore, SqliteSocialStore};
