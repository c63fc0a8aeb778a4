use super::models::*;
use super::schema::VERSIONED_SCHEMAS;
use super::{PlaylistStore, TrackStore, UserStore};
use crate::sqlite_persistence::open_versioned_db;
use crate::user::auth::{HashedPassword, PasswordHasher, UsernamePasswordCredentials};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{
    functions::FunctionFlags, params, Connection, OptionalExtension, Row, Transaction,
};
use std::{
    path::Path,
    str::FromStr,
    sync::{Arc, Mutex},
    time::{Duration, SystemTime},
};
use tracing::debug;
use uuid::Uuid;

const USER_SELECT: &str = "SELECT id, email, name, avatar FROM user";

const TRACK_SELECT: &str = "SELECT t.id, t.title, t.artist, t.duration_secs, t.created, u.id, u.name \
     FROM track t JOIN user u ON u.id = t.uploader_id";

// Same column layout as TRACK_SELECT, see track_from_row
const PLAYLIST_TRACKS_SELECT: &str = "SELECT t.id, t.title, t.artist, t.duration_secs, t.created, u.id, u.name \
     FROM playlist_track pt \
     JOIN track t ON t.id = pt.track_id \
     JOIN user u ON u.id = t.uploader_id \
     WHERE pt.playlist_id = ?1 ORDER BY pt.added, pt.id";

const PLAYLIST_SELECT: &str = "SELECT p.id, p.name, p.description, p.cover_image, p.created, u.id, u.name, \
     (SELECT COUNT(*) FROM playlist_track pt WHERE pt.playlist_id = p.id) \
     FROM playlist p JOIN user u ON u.id = p.user_id";

const NEWEST_FIRST: &str = "ORDER BY p.created DESC, p.rowid DESC";

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned_db(db_path, VERSIONED_SCHEMAS)?;
        register_casefold(&conn)?;
        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `write` in a transaction after checking that the playlist exists
    /// and belongs to `requester_id`. Only a `Done` outcome is committed.
    fn write_owned_playlist<T>(
        &self,
        playlist_id: &str,
        requester_id: &str,
        write: impl FnOnce(&Transaction<'_>) -> Result<PlaylistWrite<T>>,
    ) -> Result<PlaylistWrite<T>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let owner: Option<String> = tx
            .query_row(
                "SELECT user_id FROM playlist WHERE id = ?1",
                params![playlist_id],
                |row| row.get(0),
            )
            .optional()?;
        match owner {
            None => return Ok(PlaylistWrite::PlaylistNotFound),
            Some(owner) if owner != requester_id => {
                debug!("User {requester_id} does not own playlist {playlist_id} (owner {owner})");
                return Ok(PlaylistWrite::NotOwner);
            }
            Some(_) => {}
        }

        let outcome = write(&tx)?;
        if let PlaylistWrite::Done(_) = outcome {
            tx.commit()?;
        }
        Ok(outcome)
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn now_secs() -> i64 {
    Utc::now().timestamp()
}

fn datetime_from_column(value: Option<i64>) -> DateTime<Utc> {
    value
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_default()
}

fn system_time_from_column(value: i64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(value.max(0) as u64)
}

/// `casefold(text)`: Unicode lowercase. SQLite's own `lower()` only folds ASCII.
fn register_casefold(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "casefold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|text| text.to_lowercase()))
        },
    )
    .context("Failed to register casefold function")
}

/// Substring pattern for `casefold(column) LIKE ... ESCAPE '\'`.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        avatar: row.get(3)?,
    })
}

fn listing_from_row(row: &Row) -> rusqlite::Result<UserListing> {
    Ok(UserListing {
        user: user_from_row(row)?,
        playlist_count: row.get::<_, i64>(4)? as usize,
    })
}

fn track_from_row(row: &Row) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        title: row.get(1)?,
        artist: row.get(2)?,
        duration_secs: row.get(3)?,
        created_at: datetime_from_column(row.get(4)?),
        uploader: UserSummary {
            id: row.get(5)?,
            name: row.get(6)?,
        },
    })
}

fn playlist_from_row(row: &Row) -> rusqlite::Result<Playlist> {
    Ok(Playlist {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        cover_image: row.get(3)?,
        created_at: datetime_from_column(row.get(4)?),
        owner: UserSummary {
            id: row.get(5)?,
            name: row.get(6)?,
        },
        track_count: row.get::<_, i64>(7)? as usize,
        tracks: None,
    })
}

fn select_user(conn: &Connection, user_id: &str) -> Result<Option<User>> {
    Ok(conn
        .query_row(
            &format!("{USER_SELECT} WHERE id = ?1"),
            params![user_id],
            user_from_row,
        )
        .optional()?)
}

fn select_track(conn: &Connection, track_id: &str) -> Result<Option<Track>> {
    Ok(conn
        .query_row(
            &format!("{TRACK_SELECT} WHERE t.id = ?1"),
            params![track_id],
            track_from_row,
        )
        .optional()?)
}

/// Loads a playlist together with its tracks.
fn select_playlist(conn: &Connection, playlist_id: &str) -> Result<Option<Playlist>> {
    let playlist = conn
        .query_row(
            &format!("{PLAYLIST_SELECT} WHERE p.id = ?1"),
            params![playlist_id],
            playlist_from_row,
        )
        .optional()?;
    let Some(mut playlist) = playlist else {
        return Ok(None);
    };

    let tracks = conn
        .prepare(PLAYLIST_TRACKS_SELECT)?
        .query_map(params![playlist_id], track_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    playlist.tracks = Some(tracks);
    Ok(Some(playlist))
}

fn reselect_playlist(tx: &Transaction<'_>, playlist_id: &str) -> Result<PlaylistWrite<Playlist>> {
    let playlist = select_playlist(tx, playlist_id)?
        .with_context(|| format!("Playlist {} disappeared while being written", playlist_id))?;
    Ok(PlaylistWrite::Done(playlist))
}

impl UserStore for SqliteStore {
    fn create_user(
        &self,
        email: &str,
        name: &str,
        password: &HashedPassword,
    ) -> Result<Option<User>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let email_taken = tx
            .query_row("SELECT 1 FROM user WHERE email = ?1", params![email], |_| Ok(()))
            .optional()?
            .is_some();
        if email_taken {
            return Ok(None);
        }

        let user_id = new_id();
        tx.execute(
            "INSERT INTO user (id, email, name) VALUES (?1, ?2, ?3)",
            params![user_id, email, name],
        )
        .with_context(|| format!("Failed to create user {}", email))?;
        tx.execute(
            "INSERT INTO user_password_credentials (user_id, salt, hash, hasher) VALUES (?1, ?2, ?3, ?4)",
            params![
                user_id,
                password.salt,
                password.hash,
                password.hasher.to_string()
            ],
        )?;
        tx.commit()?;

        Ok(Some(User {
            id: user_id,
            email: email.to_string(),
            name: name.to_string(),
            avatar: None,
        }))
    }

    fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        select_user(&conn, user_id)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!("{USER_SELECT} WHERE email = ?1"),
                params![email],
                user_from_row,
            )
            .optional()?)
    }

    fn get_password_credentials(
        &self,
        user_id: &str,
    ) -> Result<Option<UsernamePasswordCredentials>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT user_id, salt, hash, hasher, created, last_tried, last_used \
                 FROM user_password_credentials WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                        row.get::<_, Option<i64>>(5)?,
                        row.get::<_, Option<i64>>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((user_id, salt, hash, hasher, created, last_tried, last_used)) = row else {
            return Ok(None);
        };
        Ok(Some(UsernamePasswordCredentials {
            user_id,
            password: HashedPassword {
                salt,
                hash,
                hasher: PasswordHasher::from_str(&hasher)?,
            },
            created: system_time_from_column(created.unwrap_or(0)),
            last_tried: last_tried.map(system_time_from_column),
            last_used: last_used.map(system_time_from_column),
        }))
    }

    fn record_login_attempt(&self, user_id: &str, succeeded: bool) -> Result<()> {
        let column = if succeeded { "last_used" } else { "last_tried" };
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!("UPDATE user_password_credentials SET {column} = ?1 WHERE user_id = ?2"),
            params![now_secs(), user_id],
        )?;
        Ok(())
    }

    fn update_user(
        &self,
        user_id: &str,
        changes: &UserChanges,
        new_password: Option<&HashedPassword>,
    ) -> Result<Option<User>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        if select_user(&tx, user_id)?.is_none() {
            return Ok(None);
        }
        if let Some(name) = &changes.name {
            tx.execute(
                "UPDATE user SET name = ?1 WHERE id = ?2",
                params![name, user_id],
            )?;
        }
        if let Some(avatar) = &changes.avatar {
            tx.execute(
                "UPDATE user SET avatar = ?1 WHERE id = ?2",
                params![avatar, user_id],
            )?;
        }
        if let Some(password) = new_password {
            debug!("update_user({user_id}) replacing password hash");
            tx.execute(
                "UPDATE user_password_credentials SET salt = ?1, hash = ?2, hasher = ?3 WHERE user_id = ?4",
                params![
                    password.salt,
                    password.hash,
                    password.hasher.to_string(),
                    user_id
                ],
            )?;
        }

        let user = select_user(&tx, user_id)?;
        tx.commit()?;
        Ok(user)
    }

    fn get_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let conn = self.conn.lock().unwrap();
        let Some(user) = select_user(&conn, user_id)? else {
            return Ok(None);
        };

        let playlists = conn
            .prepare(
                "SELECT id, name, description, cover_image FROM playlist \
                 WHERE user_id = ?1 ORDER BY created DESC, rowid DESC",
            )?
            .query_map(params![user_id], |row| {
                Ok(PlaylistSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    cover_image: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let uploaded_tracks = conn.query_row(
            "SELECT COUNT(*) FROM track WHERE uploader_id = ?1",
            params![user_id],
            |row| row.get::<_, i64>(0),
        )?;

        Ok(Some(UserProfile {
            counts: UserCounts {
                playlists: playlists.len(),
                tracks: uploaded_tracks as usize,
            },
            user,
            playlists,
        }))
    }

    fn search_users(
        &self,
        query: &str,
        exclude_user_id: &str,
        limit: usize,
    ) -> Result<Vec<UserListing>> {
        let conn = self.conn.lock().unwrap();
        let users = conn
            .prepare(
                "SELECT u.id, u.email, u.name, u.avatar, \
                 (SELECT COUNT(*) FROM playlist p WHERE p.user_id = u.id) \
                 FROM user u \
                 WHERE u.id != ?1 AND (casefold(u.name) LIKE ?2 ESCAPE '\\' \
                 OR casefold(u.email) LIKE ?2 ESCAPE '\\') \
                 ORDER BY u.name, u.rowid LIMIT ?3",
            )?
            .query_map(
                params![exclude_user_id, like_pattern(query), limit as i64],
                listing_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn get_top_users(&self, limit: usize) -> Result<Vec<UserListing>> {
        let conn = self.conn.lock().unwrap();
        let users = conn
            .prepare(
                "SELECT u.id, u.email, u.name, u.avatar, COUNT(p.id) AS playlist_count \
                 FROM user u LEFT JOIN playlist p ON p.user_id = u.id \
                 GROUP BY u.id \
                 ORDER BY playlist_count DESC, u.created ASC, u.rowid ASC LIMIT ?1",
            )?
            .query_map(params![limit as i64], listing_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }
}

impl TrackStore for SqliteStore {
    fn create_track(&self, uploader_id: &str, track: &NewTrack) -> Result<Track> {
        let conn = self.conn.lock().unwrap();
        let track_id = new_id();
        conn.execute(
            "INSERT INTO track (id, title, artist, duration_secs, uploader_id) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                track_id,
                track.title,
                track.artist,
                track.duration_secs,
                uploader_id
            ],
        )
        .with_context(|| format!("Failed to create track {}", track.title))?;
        select_track(&conn, &track_id)?.context("Track not found right after insert")
    }

    fn get_track(&self, track_id: &str) -> Result<Option<Track>> {
        let conn = self.conn.lock().unwrap();
        select_track(&conn, track_id)
    }
}

impl PlaylistStore for SqliteStore {
    fn create_playlist(&self, owner_id: &str, playlist: &NewPlaylist) -> Result<Playlist> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let playlist_id = new_id();
        tx.execute(
            "INSERT INTO playlist (id, name, description, cover_image, user_id) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                playlist_id,
                playlist.name,
                playlist.description,
                playlist.cover_image,
                owner_id
            ],
        )
        .context("Could not create playlist")?;

        let created = tx
            .query_row(
                &format!("{PLAYLIST_SELECT} WHERE p.id = ?1"),
                params![playlist_id],
                playlist_from_row,
            )
            .context("Playlist not found right after insert")?;
        tx.commit()?;
        Ok(created)
    }

    fn get_playlist(&self, playlist_id: &str) -> Result<Option<Playlist>> {
        let conn = self.conn.lock().unwrap();
        select_playlist(&conn, playlist_id)
    }

    fn update_playlist(
        &self,
        playlist_id: &str,
        requester_id: &str,
        changes: &PlaylistChanges,
    ) -> Result<PlaylistWrite<Playlist>> {
        self.write_owned_playlist(playlist_id, requester_id, |tx| {
            let updates = [
                ("name", &changes.name),
                ("description", &changes.description),
                ("cover_image", &changes.cover_image),
            ];
            for (column, value) in updates {
                if let Some(value) = value {
                    tx.execute(
                        &format!("UPDATE playlist SET {column} = ?1 WHERE id = ?2"),
                        params![value, playlist_id],
                    )?;
                }
            }
            reselect_playlist(tx, playlist_id)
        })
    }

    fn delete_playlist(&self, playlist_id: &str, requester_id: &str) -> Result<PlaylistWrite<()>> {
        self.write_owned_playlist(playlist_id, requester_id, |tx| {
            tx.execute("DELETE FROM playlist WHERE id = ?1", params![playlist_id])?;
            Ok(PlaylistWrite::Done(()))
        })
    }

    fn add_playlist_track(
        &self,
        playlist_id: &str,
        track_id: &str,
        requester_id: &str,
    ) -> Result<PlaylistWrite<Playlist>> {
        self.write_owned_playlist(playlist_id, requester_id, |tx| {
            let track_exists = tx
                .query_row("SELECT 1 FROM track WHERE id = ?1", params![track_id], |_| Ok(()))
                .optional()?
                .is_some();
            if !track_exists {
                return Ok(PlaylistWrite::TrackNotFound);
            }

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO playlist_track (playlist_id, track_id) VALUES (?1, ?2)",
                params![playlist_id, track_id],
            )?;
            debug!("add_playlist_track({playlist_id}, {track_id}) inserted {inserted} rows");
            reselect_playlist(tx, playlist_id)
        })
    }

    fn remove_playlist_track(
        &self,
        playlist_id: &str,
        track_id: &str,
        requester_id: &str,
    ) -> Result<PlaylistWrite<Playlist>> {
        self.write_owned_playlist(playlist_id, requester_id, |tx| {
            tx.execute(
                "DELETE FROM playlist_track WHERE playlist_id = ?1 AND track_id = ?2",
                params![playlist_id, track_id],
            )?;
            reselect_playlist(tx, playlist_id)
        })
    }

    fn get_user_playlists(&self, owner_id: &str) -> Result<Vec<Playlist>> {
        let conn = self.conn.lock().unwrap();
        let playlists = conn
            .prepare(&format!("{PLAYLIST_SELECT} WHERE p.user_id = ?1 {NEWEST_FIRST}"))?
            .query_map(params![owner_id], playlist_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(playlists)
    }

    fn search_playlists(&self, query: &str, limit: usize) -> Result<Vec<Playlist>> {
        let conn = self.conn.lock().unwrap();
        let playlists = conn
            .prepare(&format!(
                "{PLAYLIST_SELECT} \
                 WHERE casefold(p.name) LIKE ?1 ESCAPE '\\' \
                 OR casefold(p.description) LIKE ?1 ESCAPE '\\' \
                 {NEWEST_FIRST} LIMIT ?2"
            ))?
            .query_map(params![like_pattern(query), limit as i64], playlist_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(playlists)
    }
}
