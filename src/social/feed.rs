use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::models::{
    build_comment_tree, Comment, FeedEvent, NewComment, NewPost, Post, PostEdit, PostView,
    ReactionKind, ReactionSummary, SocialValidationError,
};
use super::store::SocialStore;
use crate::clock::now_millis;
use crate::user::policy::{authorize_content_removal, require, Actor, PolicyDenial};
use crate::user::{ActivityKind, Permission, UserManager};

pub const DEFAULT_FEED_PAGE: usize = 20;
pub const MAX_FEED_PAGE: usize = 100;
const EVENTS_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum SocialError {
    #[error(transparent)]
    Validation(#[from] SocialValidationError),
    #[error("Post not found")]
    PostNotFound,
    #[error("Comment not found")]
    CommentNotFound,
    #[error("Replies must target a comment of the same post")]
    InvalidParent,
    #[error(transparent)]
    Denied(#[from] PolicyDenial),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type SocialResult<T> = Result<T, SocialError>;

/// Who is acting, with the handle shown next to what they write.
#[derive(Debug, Clone)]
pub struct Author {
    pub actor: Actor,
    pub handle: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FeedQuery {
    pub before: Option<i64>,
    pub author_id: Option<usize>,
    pub limit: Option<usize>,
}

pub struct FeedService {
    store: Box<dyn SocialStore>,
    user_manager: Arc<Mutex<UserManager>>,
    events: broadcast::Sender<FeedEvent>,
}

impl FeedService {
    pub fn new(store: Box<dyn SocialStore>, user_manager: Arc<Mutex<UserManager>>) -> Self {
        let (events, _) = broadcast::channel(EVENTS_CAPACITY);
        Self {
            store,
            user_manager,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: FeedEvent) {
        // No receivers is not an error, nobody is listening right now.
        if let Err(err) = self.events.send(event) {
            debug!("Feed event not delivered: {}", err);
        }
    }

    fn log_activity(&self, user_id: usize, kind: ActivityKind, subject_id: &str, detail: Option<&str>) {
        let result = self
            .user_manager
            .lock()
            .unwrap()
            .record_activity(user_id, kind, subject_id, detail);
        if let Err(err) = result {
            warn!(
                "Could not record {} activity for user {}: {}",
                kind.as_str(),
                user_id,
                err
            );
        }
    }

    fn load_post(&self, post_id: &str) -> SocialResult<Post> {
        self.store
            .get_post(post_id)?
            .ok_or(SocialError::PostNotFound)
    }

    fn view(&self, post: Post, viewer_id: usize) -> SocialResult<PostView> {
        let reactions = self.store.reaction_counts(&post.id)?;
        let my_reaction = self.store.get_reaction(&post.id, viewer_id)?;
        let comments = build_comment_tree(self.store.list_comments(&post.id)?);
        Ok(PostView {
            post,
            reactions,
            my_reaction,
            comments,
        })
    }

    pub fn create_post(&self, author: &Author, new_post: NewPost) -> SocialResult<PostView> {
        require(&author.actor, Permission::SocialInteract)?;
        new_post.validate()?;

        let post = Post {
            id: uuid::Uuid::new_v4().to_string(),
            author_id: author.actor.user_id,
            author_handle: author.handle.clone(),
            body: new_post.body.trim().to_string(),
            image_url: new_post.image_url,
            track: new_post.track,
            created: now_millis(),
            edited: None,
        };
        self.store.create_post(&post)?;
        self.log_activity(post.author_id, ActivityKind::PostCreated, &post.id, None);
        self.publish(FeedEvent::PostCreated { post: post.clone() });
        self.view(post, author.actor.user_id)
    }

    pub fn get_post(&self, actor: &Actor, post_id: &str) -> SocialResult<PostView> {
        require(actor, Permission::SocialInteract)?;
        let post = self.load_post(post_id)?;
        self.view(post, actor.user_id)
    }

    pub fn feed(&self, actor: &Actor, query: FeedQuery) -> SocialResult<Vec<PostView>> {
        require(actor, Permission::SocialInteract)?;
        let limit = query
            .limit
            .unwrap_or(DEFAULT_FEED_PAGE)
            .clamp(1, MAX_FEED_PAGE);
        self.store
            .list_posts(query.before, query.author_id, limit)?
            .into_iter()
            .map(|post| self.view(post, actor.user_id))
            .collect()
    }

    /// Only the author may edit, moderators can delete but not rewrite.
    pub fn edit_post(&self, actor: &Actor, post_id: &str, edit: PostEdit) -> SocialResult<PostView> {
        require(actor, Permission::SocialInteract)?;
        edit.validate()?;
        let mut post = self.load_post(post_id)?;
        if post.author_id != actor.user_id {
            return Err(PolicyDenial::NotAuthor.into());
        }
        edit.apply_to(&mut post);
        post.edited = Some(now_millis());
        if !self.store.update_post(&post)? {
            return Err(SocialError::PostNotFound);
        }
        self.publish(FeedEvent::PostUpdated { post: post.clone() });
        self.view(post, actor.user_id)
    }

    pub fn delete_post(&self, actor: &Actor, post_id: &str) -> SocialResult<()> {
        let post = self.load_post(post_id)?;
        authorize_content_removal(actor, post.author_id)?;
        self.store.delete_post(post_id)?;
        self.publish(FeedEvent::PostDeleted {
            post_id: post_id.to_string(),
        });
        Ok(())
    }

    /// Reacting again with the same kind removes the reaction, a different kind replaces it.
    pub fn react(
        &self,
        actor: &Actor,
        post_id: &str,
        kind: ReactionKind,
    ) -> SocialResult<ReactionSummary> {
        require(actor, Permission::SocialInteract)?;
        self.load_post(post_id)?;

        let next = self
            .store
            .toggle_reaction(post_id, actor.user_id, kind, now_millis())?;
        if let Some(kind) = next {
            self.log_activity(
                actor.user_id,
                ActivityKind::ReactionAdded,
                post_id,
                Some(kind.as_str()),
            );
        }
        self.reactions_changed(actor, post_id)
    }

    pub fn remove_reaction(&self, actor: &Actor, post_id: &str) -> SocialResult<ReactionSummary> {
        require(actor, Permission::SocialInteract)?;
        self.load_post(post_id)?;
        self.store
            .set_reaction(post_id, actor.user_id, None, now_millis())?;
        self.reactions_changed(actor, post_id)
    }

    fn reactions_changed(&self, actor: &Actor, post_id: &str) -> SocialResult<ReactionSummary> {
        let reactions = self.store.reaction_counts(post_id)?;
        self.publish(FeedEvent::ReactionsChanged {
            post_id: post_id.to_string(),
            reactions,
        });
        Ok(ReactionSummary {
            post_id: post_id.to_string(),
            reactions,
            my_reaction: self.store.get_reaction(post_id, actor.user_id)?,
        })
    }

    pub fn add_comment(
        &self,
        author: &Author,
        post_id: &str,
        new_comment: NewComment,
    ) -> SocialResult<Comment> {
        require(&author.actor, Permission::SocialInteract)?;
        new_comment.validate()?;
        self.load_post(post_id)?;

        if let Some(parent_id) = &new_comment.parent_id {
            match self.store.get_comment(parent_id)? {
                Some(parent) if parent.post_id == post_id => {}
                _ => return Err(SocialError::InvalidParent),
            }
        }

        let comment = Comment {
            id: uuid::Uuid::new_v4().to_string(),
            post_id: post_id.to_string(),
            parent_id: new_comment.parent_id,
            author_id: author.actor.user_id,
            author_handle: author.handle.clone(),
            body: new_comment.body.trim().to_string(),
            created: now_millis(),
        };
        self.store.add_comment(&comment)?;
        self.log_activity(
            comment.author_id,
            ActivityKind::CommentAdded,
            post_id,
            Some(&comment.id),
        );
        self.publish(FeedEvent::CommentAdded {
            comment: comment.clone(),
        });
        Ok(comment)
    }

    /// Returns the ids of the comment and every reply removed with it.
    pub fn delete_comment(&self, actor: &Actor, comment_id: &str) -> SocialResult<Vec<String>> {
        let comment = self
            .store
            .get_comment(comment_id)?
            .ok_or(SocialError::CommentNotFound)?;
        authorize_content_removal(actor, comment.author_id)?;
        let comment_ids = self.store.delete_comment(comment_id)?;
        self.publish(FeedEvent::CommentDeleted {
            post_id: comment.post_id,
            comment_ids: comment_ids.clone(),
        });
        Ok(comment_ids)
    }
}
