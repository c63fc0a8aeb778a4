mod models;
mod schema;
mod sqlite_store;

pub use models::*;
pub use schema::VERSIONED_SCHEMAS;
pub use sqlite_store::SqliteStore;

use crate::user::auth::{HashedPassword, UsernamePasswordCredentials};
use anyhow::Result;

pub trait UserStore: Send + Sync {
    /// Creates a user together with its password credentials.
    /// Returns Ok(None) if the email is already registered.
    fn create_user(&self, email: &str, name: &str, password: &HashedPassword)
        -> Result<Option<User>>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    /// Exact, case-sensitive email lookup.
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    fn get_password_credentials(&self, user_id: &str)
        -> Result<Option<UsernamePasswordCredentials>>;

    /// Stamps `last_used` on success, `last_tried` otherwise.
    fn record_login_attempt(&self, user_id: &str, succeeded: bool) -> Result<()>;

    /// Applies the supplied changes, and the new password if any, in one
    /// transaction. Returns Ok(None) if the user does not exist.
    fn update_user(
        &self,
        user_id: &str,
        changes: &UserChanges,
        new_password: Option<&HashedPassword>,
    ) -> Result<Option<User>>;

    fn get_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;

    /// Case-insensitive substring match on name or email.
    fn search_users(
        &self,
        query: &str,
        exclude_user_id: &str,
        limit: usize,
    ) -> Result<Vec<UserListing>>;

    /// Users ordered by number of owned playlists, descending.
    fn get_top_users(&self, limit: usize) -> Result<Vec<UserListing>>;
}

pub trait TrackStore: Send + Sync {
    fn create_track(&self, uploader_id: &str, track: &NewTrack) -> Result<Track>;

    /// Returns Ok(None) if the track does not exist.
    fn get_track(&self, track_id: &str) -> Result<Option<Track>>;
}

pub trait PlaylistStore: Send + Sync {
    fn create_playlist(&self, owner_id: &str, playlist: &NewPlaylist) -> Result<Playlist>;

    /// Full playlist, including its tracks. Returns Ok(None) if it does not exist.
    fn get_playlist(&self, playlist_id: &str) -> Result<Option<Playlist>>;

    fn update_playlist(
        &self,
        playlist_id: &str,
        requester_id: &str,
        changes: &PlaylistChanges,
    ) -> Result<PlaylistWrite<Playlist>>;

    fn delete_playlist(&self, playlist_id: &str, requester_id: &str) -> Result<PlaylistWrite<()>>;

    /// Adding a track that is already in the playlist leaves it unchanged.
    fn add_playlist_track(
        &self,
        playlist_id: &str,
        track_id: &str,
        requester_id: &str,
    ) -> Result<PlaylistWrite<Playlist>>;

    /// Removing a track that is not in the playlist leaves it unchanged.
    fn remove_playlist_track(
        &self,
        playlist_id: &str,
        track_id: &str,
        requester_id: &str,
    ) -> Result<PlaylistWrite<Playlist>>;

    /// Playlists owned by the user, newest first.
    fn get_user_playlists(&self, owner_id: &str) -> Result<Vec<Playlist>>;

    /// Case-insensitive substring match on name or description.
    fn search_playlists(&self, query: &str, limit: usize) -> Result<Vec<Playlist>>;
}

/// Combined trait for the whole application storage
pub trait FullStore: UserStore + TrackStore + PlaylistStore {}

impl<T: UserStore + TrackStore + PlaylistStore> FullStore for T {}
