use crate::catalog::Track;
use crate::sqlite_column;
use crate::sqlite_persistence::{
    open_versioned, Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
};
use anyhow::{Context, Result};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use super::models::{Comment, Post, ReactionCounts, ReactionKind};

pub trait SocialStore: Send + Sync {
    fn create_post(&self, post: &Post) -> Result<()>;

    fn get_post(&self, post_id: &str) -> Result<Option<Post>>;

    /// Overwrites body, image and edit time. Returns Ok(false) if the post is gone.
    fn update_post(&self, post: &Post) -> Result<bool>;

    /// Deletes the post together with its reactions and comments.
    fn delete_post(&self, post_id: &str) -> Result<bool>;

    /// Newest first, strictly older than `before` when given.
    fn list_posts(
        &self,
        before: Option<i64>,
        author_id: Option<usize>,
        limit: usize,
    ) -> Result<Vec<Post>>;

    fn get_reaction(&self, post_id: &str, user_id: usize) -> Result<Option<ReactionKind>>;

    /// Sets or clears the single reaction `user_id` has on a post.
    fn set_reaction(
        &self,
        post_id: &str,
        user_id: usize,
        kind: Option<ReactionKind>,
        created: i64,
    ) -> Result<()>;

    /// Atomically removes the user's reaction when it already is `kind`, otherwise
    /// sets it to `kind`. Returns the reaction left in place.
    fn toggle_reaction(
        &self,
        post_id: &str,
        user_id: usize,
        kind: ReactionKind,
        created: i64,
    ) -> Result<Option<ReactionKind>>;

    fn reaction_counts(&self, post_id: &str) -> Result<ReactionCounts>;

    fn add_comment(&self, comment: &Comment) -> Result<()>;

    fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>>;

    fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>>;

    /// Deletes a comment and all of its replies, returning every deleted id.
    fn delete_comment(&self, comment_id: &str) -> Result<Vec<String>>;
}

const POST_TABLE_V_0: Table = Table {
    name: "post",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!("author_id", &SqlType::Integer, non_null = true),
        sqlite_column!("author_handle", &SqlType::Text, non_null = true),
        sqlite_column!("body", &SqlType::Text, non_null = true),
        sqlite_column!("image_url", &SqlType::Text),
        sqlite_column!("track_id", &SqlType::Text),
        sqlite_column!("track_title", &SqlType::Text),
        sqlite_column!("track_channel", &SqlType::Text),
        sqlite_column!("track_thumbnail", &SqlType::Text),
        sqlite_column!("track_duration_secs", &SqlType::Integer),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
        sqlite_column!("edited", &SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[
        ("idx_post_created", "created"),
        ("idx_post_author_id", "author_id"),
    ],
};
const POST_REACTION_TABLE_V_0: Table = Table {
    name: "post_reaction",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!(
            "post_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "post",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("kind", &SqlType::Text, non_null = true),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
    ],
    unique_constraints: &[&["post_id", "user_id"]],
    indices: &[("idx_post_reaction_post_id", "post_id")],
};
const POST_COMMENT_TABLE_V_0: Table = Table {
    name: "post_comment",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!(
            "post_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "post",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!(
            "parent_id",
            &SqlType::Text,
            foreign_key = Some(&ForeignKey {
                foreign_table: "post_comment",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("author_id", &SqlType::Integer, non_null = true),
        sqlite_column!("author_handle", &SqlType::Text, non_null = true),
        sqlite_column!("body", &SqlType::Text, non_null = true),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
    ],
    unique_constraints: &[],
    indices: &[("idx_post_comment_post_id", "post_id")],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        POST_TABLE_V_0,
        POST_REACTION_TABLE_V_0,
        POST_COMMENT_TABLE_V_0,
    ],
    migration: None,
}];

const POST_COLUMNS: &str = "id, author_id, author_handle, body, image_url, track_id, track_title, track_channel, track_thumbnail, track_duration_secs, created, edited";
const COMMENT_COLUMNS: &str = "id, post_id, parent_id, author_id, author_handle, body, created";

fn post_from_row(row: &Row) -> rusqlite::Result<Post> {
    let track = match row.get::<usize, Option<String>>(5)? {
        Some(track_id) => Some(Track {
            id: track_id,
            title: row.get::<usize, Option<String>>(6)?.unwrap_or_default(),
            channel: row.get::<usize, Option<String>>(7)?.unwrap_or_default(),
            thumbnail: row.get(8)?,
            duration_secs: row.get(9)?,
        }),
        None => None,
    };
    Ok(Post {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_handle: row.get(2)?,
        body: row.get(3)?,
        image_url: row.get(4)?,
        track,
        created: row.get(10)?,
        edited: row.get(11)?,
    })
}

fn comment_from_row(row: &Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        parent_id: row.get(2)?,
        author_id: row.get(3)?,
        author_handle: row.get(4)?,
        body: row.get(5)?,
        created: row.get(6)?,
    })
}

fn reaction_kind_from_column(index: usize, value: String) -> rusqlite::Result<ReactionKind> {
    ReactionKind::from_str(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            Type::Text,
            format!("Unknown reaction {}", value).into(),
        )
    })
}

#[derive(Clone)]
pub struct SqliteSocialStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSocialStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned(db_path, VERSIONED_SCHEMAS)?;
        Ok(SqliteSocialStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl SocialStore for SqliteSocialStore {
    fn create_post(&self, post: &Post) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let track = post.track.as_ref();
        conn.execute(
            &format!(
                "INSERT INTO post ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                POST_COLUMNS
            ),
            params![
                post.id,
                post.author_id,
                post.author_handle,
                post.body,
                post.image_url,
                track.map(|t| &t.id),
                track.map(|t| &t.title),
                track.map(|t| &t.channel),
                track.and_then(|t| t.thumbnail.as_ref()),
                track.and_then(|t| t.duration_secs),
                post.created,
                post.edited,
            ],
        )
        .with_context(|| format!("Failed to create post {}", post.id))?;
        Ok(())
    }

    fn get_post(&self, post_id: &str) -> Result<Option<Post>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM post WHERE id = ?1", POST_COLUMNS),
                params![post_id],
                post_from_row,
            )
            .optional()?)
    }

    fn update_post(&self, post: &Post) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE post SET body = ?1, image_url = ?2, edited = ?3 WHERE id = ?4",
            params![post.body, post.image_url, post.edited, post.id],
        )?;
        Ok(changed > 0)
    }

    fn delete_post(&self, post_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM post WHERE id = ?1", params![post_id])?;
        Ok(deleted > 0)
    }

    fn list_posts(
        &self,
        before: Option<i64>,
        author_id: Option<usize>,
        limit: usize,
    ) -> Result<Vec<Post>> {
        let conn = self.conn.lock().unwrap();
        let posts = conn
            .prepare(&format!(
                "SELECT {} FROM post
                 WHERE (?1 IS NULL OR created < ?1) AND (?2 IS NULL OR author_id = ?2)
                 ORDER BY created DESC, rowid DESC LIMIT ?3",
                POST_COLUMNS
            ))?
            .query_map(params![before, author_id, limit as i64], post_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    fn get_reaction(&self, post_id: &str, user_id: usize) -> Result<Option<ReactionKind>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT kind FROM post_reaction WHERE post_id = ?1 AND user_id = ?2",
                params![post_id, user_id],
                |row| reaction_kind_from_column(0, row.get(0)?),
            )
            .optional()?)
    }

    fn set_reaction(
        &self,
        post_id: &str,
        user_id: usize,
        kind: Option<ReactionKind>,
        created: i64,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        match kind {
            Some(kind) => conn.execute(
                "INSERT INTO post_reaction (post_id, user_id, kind, created) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(post_id, user_id) DO UPDATE SET kind = excluded.kind, created = excluded.created",
                params![post_id, user_id, kind.as_str(), created],
            ),
            None => conn.execute(
                "DELETE FROM post_reaction WHERE post_id = ?1 AND user_id = ?2",
                params![post_id, user_id],
            ),
        }
        .with_context(|| format!("Failed to set reaction of {} on {}", user_id, post_id))?;
        Ok(())
    }

    fn toggle_reaction(
        &self,
        post_id: &str,
        user_id: usize,
        kind: ReactionKind,
        created: i64,
    ) -> Result<Option<ReactionKind>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let current = tx
            .query_row(
                "SELECT kind FROM post_reaction WHERE post_id = ?1 AND user_id = ?2",
                params![post_id, user_id],
                |row| reaction_kind_from_column(0, row.get(0)?),
            )
            .optional()?;
        let next = if current == Some(kind) {
            tx.execute(
                "DELETE FROM post_reaction WHERE post_id = ?1 AND user_id = ?2",
                params![post_id, user_id],
            )?;
            None
        } else {
            tx.execute(
                "INSERT INTO post_reaction (post_id, user_id, kind, created) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(post_id, user_id) DO UPDATE SET kind = excluded.kind, created = excluded.created",
                params![post_id, user_id, kind.as_str(), created],
            )
            .with_context(|| format!("Failed to set reaction of {} on {}", user_id, post_id))?;
            Some(kind)
        };
        tx.commit()?;
        Ok(next)
    }

    fn reaction_counts(&self, post_id: &str) -> Result<ReactionCounts> {
        let conn = self.conn.lock().unwrap();
        let rows = conn
            .prepare("SELECT kind, COUNT(*) FROM post_reaction WHERE post_id = ?1 GROUP BY kind")?
            .query_map(params![post_id], |row| {
                Ok((
                    reaction_kind_from_column(0, row.get(0)?)?,
                    row.get::<usize, u32>(1)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut counts = ReactionCounts::default();
        for (kind, count) in rows {
            counts.add(kind, count);
        }
        Ok(counts)
    }

    fn add_comment(&self, comment: &Comment) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO post_comment ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                COMMENT_COLUMNS
            ),
            params![
                comment.id,
                comment.post_id,
                comment.parent_id,
                comment.author_id,
                comment.author_handle,
                comment.body,
                comment.created,
            ],
        )
        .with_context(|| format!("Failed to add comment to post {}", comment.post_id))?;
        Ok(())
    }

    fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM post_comment WHERE id = ?1", COMMENT_COLUMNS),
                params![comment_id],
                comment_from_row,
            )
            .optional()?)
    }

    fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        let conn = self.conn.lock().unwrap();
        let comments = conn
            .prepare(&format!(
                "SELECT {} FROM post_comment WHERE post_id = ?1 ORDER BY created, rowid",
                COMMENT_COLUMNS
            ))?
            .query_map(params![post_id], comment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    fn delete_comment(&self, comment_id: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let ids = tx
            .prepare(
                "WITH RECURSIVE subtree(id) AS (
                    SELECT id FROM post_comment WHERE id = ?1
                    UNION ALL
                    SELECT c.id FROM post_comment c JOIN subtree s ON c.parent_id = s.id
                 )
                 SELECT id FROM subtree",
            )?
            .query_map(params![comment_id], |row| row.get::<usize, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        tx.execute("DELETE FROM post_comment WHERE id = ?1", params![comment_id])?;
        tx.commit()?;
        Ok(ids)
    }
}
