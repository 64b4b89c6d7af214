use crate::catalog::Track;
use crate::clock::now_millis;
use crate::sqlite_column;
use crate::sqlite_persistence::{
    open_versioned, Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
    DEFAULT_TIMESTAMP,
};
use crate::user::*;
use anyhow::{Context, Result};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use std::{
    path::Path,
    sync::{Arc, Mutex},
    time::{Duration, SystemTime},
};
use tracing::debug;

use rand::{rng, Rng};
use rand_distr::Alphanumeric;

const PLAYLIST_ID_LEN: usize = 16;

const USER_FK: ForeignKey = ForeignKey {
    foreign_table: "user",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!("handle", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "display_name",
            &SqlType::Text,
            non_null = true,
            default_value = Some("''")
        ),
        sqlite_column!(
            "bio",
            &SqlType::Text,
            non_null = true,
            default_value = Some("''")
        ),
        sqlite_column!("avatar_url", &SqlType::Text),
        sqlite_column!(
            "role",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'user'")
        ),
        sqlite_column!(
            "approved",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
    ],
    unique_constraints: &[],
    indices: &[("idx_user_handle", "handle")],
};
const AUTH_TOKEN_TABLE_V_0: Table = Table {
    name: "auth_token",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("value", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[("idx_auth_token_value", "value")],
};
const USER_PASSWORD_CREDENTIALS_V_0: Table = Table {
    name: "user_password_credentials",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            is_unique = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("salt", &SqlType::Text, non_null = true),
        sqlite_column!("hash", &SqlType::Text, non_null = true),
        sqlite_column!("hasher", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_tried", &SqlType::Integer),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[],
};
const PLAYLIST_TABLE_V_0: Table = Table {
    name: "playlist",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
    ],
    unique_constraints: &[],
    indices: &[("idx_playlist_user_id", "user_id")],
};
const PLAYLIST_TRACK_TABLE_V_0: Table = Table {
    name: "playlist_track",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!(
            "playlist_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "playlist",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
        sqlite_column!("track_id", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("channel", &SqlType::Text, non_null = true),
        sqlite_column!("thumbnail", &SqlType::Text),
        sqlite_column!("duration_secs", &SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[("idx_playlist_track_playlist_id", "playlist_id")],
};
const USER_HISTORY_TABLE_V_0: Table = Table {
    name: "user_history",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("track_id", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("channel", &SqlType::Text, non_null = true),
        sqlite_column!("thumbnail", &SqlType::Text),
        sqlite_column!("duration_secs", &SqlType::Integer),
        sqlite_column!("played_at", &SqlType::Integer, non_null = true),
    ],
    unique_constraints: &[],
    indices: &[
        ("idx_user_history_user_id", "user_id"),
        ("idx_user_history_played_at", "played_at"),
    ],
};

/// V 1
const USER_ACTIVITY_TABLE_V_1: Table = Table {
    name: "user_activity",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("kind", &SqlType::Text, non_null = true),
        sqlite_column!("subject_id", &SqlType::Text, non_null = true),
        sqlite_column!("detail", &SqlType::Text),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
    ],
    unique_constraints: &[],
    indices: &[("idx_user_activity_user_id", "user_id")],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[
            USER_TABLE_V_0,
            AUTH_TOKEN_TABLE_V_0,
            USER_PASSWORD_CREDENTIALS_V_0,
            PLAYLIST_TABLE_V_0,
            PLAYLIST_TRACK_TABLE_V_0,
            USER_HISTORY_TABLE_V_0,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            USER_TABLE_V_0,
            AUTH_TOKEN_TABLE_V_0,
            USER_PASSWORD_CREDENTIALS_V_0,
            PLAYLIST_TABLE_V_0,
            PLAYLIST_TRACK_TABLE_V_0,
            USER_HISTORY_TABLE_V_0,
            USER_ACTIVITY_TABLE_V_1,
        ],
        migration: Some(|conn: &Connection| {
            USER_ACTIVITY_TABLE_V_1.create(conn)?;
            Ok(())
        }),
    },
];

/// A random A-z0-9 string
fn random_string(len: usize) -> String {
    let bytes = rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .collect::<Vec<u8>>();
    String::from_utf8_lossy(&bytes).to_string()
}

fn system_time_from_column_result(value: i64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(value.max(0) as u64)
}

fn conversion_error(index: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, message.into())
}

const USER_COLUMNS: &str = "id, handle, display_name, bio, avatar_url, role, approved, created";

fn user_from_row(row: &Row) -> rusqlite::Result<UserRecord> {
    let role_name: String = row.get(5)?;
    let role = UserRole::from_str(&role_name)
        .ok_or_else(|| conversion_error(5, format!("Unknown role {}", role_name)))?;
    Ok(UserRecord {
        id: row.get(0)?,
        handle: row.get(1)?,
        display_name: row.get(2)?,
        bio: row.get(3)?,
        avatar_url: row.get(4)?,
        role,
        approved: row.get::<usize, i64>(6)? != 0,
        created: row.get(7)?,
    })
}

/// Reads `track_id, title, channel, thumbnail, duration_secs` starting at `offset`.
fn track_from_row(row: &Row, offset: usize) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(offset)?,
        title: row.get(offset + 1)?,
        channel: row.get(offset + 2)?,
        thumbnail: row.get(offset + 3)?,
        duration_secs: row.get(offset + 4)?,
    })
}

#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned(db_path, VERSIONED_SCHEMAS)?;
        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn insert_playlist_tracks(
        tx: &rusqlite::Transaction,
        playlist_id: &str,
        tracks: &[Track],
    ) -> Result<()> {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {} (playlist_id, position, track_id, title, channel, thumbnail, duration_secs) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            PLAYLIST_TRACK_TABLE_V_0.name
        ))?;
        for (position, track) in tracks.iter().enumerate() {
            stmt.execute(params![
                playlist_id,
                position as i64,
                track.id,
                track.title,
                track.channel,
                track.thumbnail,
                track.duration_secs,
            ])?;
        }
        Ok(())
    }

    fn load_playlist_tracks(conn: &Connection, playlist_id: &str) -> Result<Vec<Track>> {
        let tracks = conn
            .prepare(&format!(
                "SELECT track_id, title, channel, thumbnail, duration_secs FROM {} WHERE playlist_id = ?1 ORDER BY position",
                PLAYLIST_TRACK_TABLE_V_0.name
            ))?
            .query_map(params![playlist_id], |row| track_from_row(row, 0))?
            .collect::<Result<Vec<Track>, _>>()?;
        Ok(tracks)
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, handle: &str, role: UserRole, approved: bool) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO user (handle, display_name, role, approved, created) VALUES (?1, ?1, ?2, ?3, ?4)",
            params![handle, role.as_str(), approved as i64, now_millis()],
        )
        .with_context(|| format!("Failed to create user {}", handle))?;
        Ok(conn.last_insert_rowid() as usize)
    }

    fn get_user(&self, user_id: usize) -> Result<Option<UserRecord>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM user WHERE id = ?1", USER_COLUMNS),
                params![user_id],
                user_from_row,
            )
            .optional()?)
    }

    fn get_user_by_handle(&self, handle: &str) -> Result<Option<UserRecord>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM user WHERE handle = ?1", USER_COLUMNS),
                params![handle],
                user_from_row,
            )
            .optional()?)
    }

    fn get_all_users(&self) -> Result<Vec<UserRecord>> {
        let conn = self.conn.lock().unwrap();
        let users = conn
            .prepare(&format!("SELECT {} FROM user ORDER BY id", USER_COLUMNS))?
            .query_map([], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn update_profile(&self, user_id: usize, update: &ProfileUpdate) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut user = match tx
            .query_row(
                &format!("SELECT {} FROM user WHERE id = ?1", USER_COLUMNS),
                params![user_id],
                user_from_row,
            )
            .optional()?
        {
            Some(user) => user,
            None => return Ok(false),
        };
        update.apply_to(&mut user);
        tx.execute(
            "UPDATE user SET display_name = ?1, bio = ?2, avatar_url = ?3 WHERE id = ?4",
            params![user.display_name, user.bio, user.avatar_url, user_id],
        )?;
        tx.commit()?;
        Ok(true)
    }

    fn set_user_role(&self, user_id: usize, role: UserRole) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE user SET role = ?1 WHERE id = ?2",
            params![role.as_str(), user_id],
        )?;
        Ok(changed > 0)
    }

    fn set_user_approved(&self, user_id: usize, approved: bool) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE user SET approved = ?1 WHERE id = ?2",
            params![approved as i64, user_id],
        )?;
        Ok(changed > 0)
    }
}

impl UserAuthTokenStore for SqliteUserStore {
    fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT user_id, value, created, last_used FROM auth_token WHERE value = ?1",
                params![value.0],
                |row| {
                    Ok(AuthToken {
                        user_id: row.get(0)?,
                        value: AuthTokenValue(row.get(1)?),
                        created: system_time_from_column_result(row.get(2)?),
                        last_used: row
                            .get::<usize, Option<i64>>(3)?
                            .map(system_time_from_column_result),
                    })
                },
            )
            .optional()?)
    }

    fn delete_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let existing = match self.get_auth_token(token)? {
            Some(existing) => existing,
            None => return Ok(None),
        };
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM auth_token WHERE value = ?1", params![token.0])?;
        Ok(Some(existing))
    }

    fn update_auth_token_last_used(&self, token: &AuthTokenValue) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "UPDATE auth_token SET last_used = {} WHERE value = ?1",
                DEFAULT_TIMESTAMP
            ),
            params![token.0],
        )?;
        Ok(())
    }

    fn add_auth_token(&self, token: AuthToken) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO auth_token (value, user_id) VALUES (?1, ?2)",
            params![token.value.0, token.user_id],
        )?;
        Ok(())
    }

    fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!(
                "DELETE FROM auth_token WHERE COALESCE(last_used, created) < {} - ?1",
                DEFAULT_TIMESTAMP
            ),
            params![(unused_for_days * 24 * 60 * 60) as i64],
        )?;
        Ok(deleted)
    }
}

impl UserAuthCredentialsStore for SqliteUserStore {
    fn get_password_credentials(&self, user_handle: &str) -> Result<Option<PasswordCredentials>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT c.user_id, c.salt, c.hash, c.hasher, c.created, c.last_tried, c.last_used
                 FROM user_password_credentials c JOIN user u ON u.id = c.user_id
                 WHERE u.handle = ?1",
                params![user_handle],
                |row| {
                    Ok((
                        row.get::<usize, usize>(0)?,
                        row.get::<usize, String>(1)?,
                        row.get::<usize, String>(2)?,
                        row.get::<usize, String>(3)?,
                        row.get::<usize, i64>(4)?,
                        row.get::<usize, Option<i64>>(5)?,
                        row.get::<usize, Option<i64>>(6)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((user_id, salt, hash, hasher, created, last_tried, last_used)) => {
                Ok(Some(PasswordCredentials {
                    user_id,
                    salt,
                    hash,
                    hasher: hasher.parse()?,
                    created: system_time_from_column_result(created),
                    last_tried: last_tried.map(system_time_from_column_result),
                    last_used: last_used.map(system_time_from_column_result),
                }))
            }
        }
    }

    fn set_password_credentials(&self, credentials: PasswordCredentials) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO user_password_credentials (user_id, salt, hash, hasher) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET salt = excluded.salt, hash = excluded.hash, hasher = excluded.hasher",
            params![
                credentials.user_id,
                credentials.salt,
                credentials.hash,
                credentials.hasher.to_string(),
            ],
        )
        .with_context(|| format!("Failed to store password of user {}", credentials.user_id))?;
        Ok(())
    }

    fn record_password_attempt(&self, user_id: usize, succeeded: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let sql = if succeeded {
            format!(
                "UPDATE user_password_credentials SET last_tried = {0}, last_used = {0} WHERE user_id = ?1",
                DEFAULT_TIMESTAMP
            )
        } else {
            format!(
                "UPDATE user_password_credentials SET last_tried = {} WHERE user_id = ?1",
                DEFAULT_TIMESTAMP
            )
        };
        conn.execute(&sql, params![user_id])?;
        Ok(())
    }
}

impl UserPlaylistStore for SqliteUserStore {
    fn create_playlist(&self, user_id: usize, name: &str, tracks: &[Track]) -> Result<String> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let mut playlist_id = random_string(PLAYLIST_ID_LEN);
        while tx.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE id = ?1",
                PLAYLIST_TABLE_V_0.name
            ),
            params![playlist_id],
            |row| row.get::<usize, i64>(0),
        )? > 0
        {
            playlist_id = random_string(PLAYLIST_ID_LEN);
        }

        tx.execute(
            &format!(
                "INSERT INTO {} (id, user_id, name, created) VALUES (?1, ?2, ?3, ?4)",
                PLAYLIST_TABLE_V_0.name
            ),
            params![&playlist_id, user_id, name, now_millis()],
        )
        .context("Could not create playlist")?;
        Self::insert_playlist_tracks(&tx, &playlist_id, tracks)?;

        tx.commit()?;
        Ok(playlist_id)
    }

    fn get_playlist(&self, playlist_id: &str, user_id: usize) -> Result<Option<Playlist>> {
        let conn = self.conn.lock().unwrap();
        let header = conn
            .query_row(
                &format!(
                    "SELECT id, name, created FROM {} WHERE id = ?1 AND user_id = ?2",
                    PLAYLIST_TABLE_V_0.name
                ),
                params![playlist_id, user_id],
                |row| {
                    Ok((
                        row.get::<usize, String>(0)?,
                        row.get::<usize, String>(1)?,
                        row.get::<usize, i64>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, name, created)) = header else {
            return Ok(None);
        };
        let tracks = Self::load_playlist_tracks(&conn, &id)?;
        Ok(Some(Playlist {
            id,
            user_id,
            name,
            created,
            tracks,
        }))
    }

    fn get_user_playlists(&self, user_id: usize) -> Result<Vec<Playlist>> {
        let conn = self.conn.lock().unwrap();
        let headers = conn
            .prepare(&format!(
                "SELECT id, name, created FROM {} WHERE user_id = ?1 ORDER BY created, rowid",
                PLAYLIST_TABLE_V_0.name
            ))?
            .query_map(params![user_id], |row| {
                Ok((
                    row.get::<usize, String>(0)?,
                    row.get::<usize, String>(1)?,
                    row.get::<usize, i64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        headers
            .into_iter()
            .map(|(id, name, created)| {
                let tracks = Self::load_playlist_tracks(&conn, &id)?;
                Ok(Playlist {
                    id,
                    user_id,
                    name,
                    created,
                    tracks,
                })
            })
            .collect()
    }

    fn update_playlist(
        &self,
        playlist_id: &str,
        user_id: usize,
        name: Option<&str>,
        tracks: Option<&[Track]>,
    ) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let owner = tx
            .query_row(
                &format!(
                    "SELECT user_id FROM {} WHERE id = ?1",
                    PLAYLIST_TABLE_V_0.name
                ),
                params![playlist_id],
                |row| row.get::<usize, usize>(0),
            )
            .optional()?;
        if owner != Some(user_id) {
            debug!("update_playlist({playlist_id}) rejected, owner is {owner:?}");
            return Ok(false);
        }

        if let Some(name) = name {
            tx.execute(
                &format!(
                    "UPDATE {} SET name = ?1 WHERE id = ?2",
                    PLAYLIST_TABLE_V_0.name
                ),
                params![name, playlist_id],
            )?;
        }

        if let Some(tracks) = tracks {
            tx.execute(
                &format!(
                    "DELETE FROM {} WHERE playlist_id = ?1",
                    PLAYLIST_TRACK_TABLE_V_0.name
                ),
                params![playlist_id],
            )?;
            Self::insert_playlist_tracks(&tx, playlist_id, tracks)?;
        }
        tx.commit()?;
        Ok(true)
    }

    fn delete_playlist(&self, playlist_id: &str, user_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!(
                "DELETE FROM {} WHERE id = ?1 AND user_id = ?2",
                PLAYLIST_TABLE_V_0.name
            ),
            params![playlist_id, user_id],
        )?;
        Ok(deleted > 0)
    }
}

impl UserHistoryStore for SqliteUserStore {
    fn append_history(&self, user_id: usize, track: &Track, played_at: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (user_id, track_id, title, channel, thumbnail, duration_secs, played_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                USER_HISTORY_TABLE_V_0.name
            ),
            params![
                user_id,
                track.id,
                track.title,
                track.channel,
                track.thumbnail,
                track.duration_secs,
                played_at,
            ],
        )
        .with_context(|| format!("Failed to append history of user {}", user_id))?;
        Ok(())
    }

    fn get_history(&self, user_id: usize, limit: usize) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn.lock().unwrap();
        let entries = conn
            .prepare(&format!(
                "SELECT track_id, title, channel, thumbnail, duration_secs, played_at FROM {}
                 WHERE user_id = ?1 ORDER BY played_at DESC, id DESC LIMIT ?2",
                USER_HISTORY_TABLE_V_0.name
            ))?
            .query_map(params![user_id, limit as i64], |row| {
                Ok(HistoryEntry {
                    track: track_from_row(row, 0)?,
                    played_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn prune_history(&self, older_than: i64) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!(
                "DELETE FROM {} WHERE played_at < ?1",
                USER_HISTORY_TABLE_V_0.name
            ),
            params![older_than],
        )?;
        Ok(deleted)
    }
}

impl UserActivityStore for SqliteUserStore {
    fn record_activity(
        &self,
        user_id: usize,
        kind: ActivityKind,
        subject_id: &str,
        detail: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (user_id, kind, subject_id, detail, created) VALUES (?1, ?2, ?3, ?4, ?5)",
                USER_ACTIVITY_TABLE_V_1.name
            ),
            params![user_id, kind.as_str(), subject_id, detail, now_millis()],
        )?;
        Ok(())
    }

    fn get_activities(&self, user_id: usize, limit: usize) -> Result<Vec<ActivityEntry>> {
        let conn = self.conn.lock().unwrap();
        let activities = conn
            .prepare(&format!(
                "SELECT id, user_id, kind, subject_id, detail, created FROM {}
                 WHERE user_id = ?1 ORDER BY created DESC, id DESC LIMIT ?2",
                USER_ACTIVITY_TABLE_V_1.name
            ))?
            .query_map(params![user_id, limit as i64], |row| {
                let kind_name: String = row.get(2)?;
                let kind = ActivityKind::from_str(&kind_name).ok_or_else(|| {
                    conversion_error(2, format!("Unknown activity kind {}", kind_name))
                })?;
                Ok(ActivityEntry {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    kind,
                    subject_id: row.get(3)?,
                    detail: row.get(4)?,
                    created: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(activities)
    }
}
