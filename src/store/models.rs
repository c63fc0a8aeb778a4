use chrono::{DateTime, Utc};
use serde::Serialize;

/// Public view of an account. The password hash is never part of it.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: Option<String>,
    pub duration_secs: Option<u32>,
    pub uploader: UserSummary,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub owner: UserSummary,
    pub created_at: DateTime<Utc>,
    pub track_count: usize,
    /// Only filled in by single-playlist reads and mutations, listings leave it out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracks: Option<Vec<Track>>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserCounts {
    pub playlists: usize,
    pub tracks: usize,
}

#[derive(Serialize, Debug, Clone)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub playlists: Vec<PlaylistSummary>,
    pub counts: UserCounts,
}

/// A user as shown in search results and rankings.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserListing {
    #[serde(flatten)]
    pub user: User,
    pub playlist_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPlaylist {
    pub name: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PlaylistChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTrack {
    pub title: String,
    pub artist: Option<String>,
    pub duration_secs: Option<u32>,
}

/// Result of a mutation that is only allowed to the playlist owner.
///
/// Ownership and track existence are checked inside the same transaction as
/// the write, so the outcome reflects the state the write was applied to.
#[derive(Debug)]
pub enum PlaylistWrite<T> {
    Done(T),
    PlaylistNotFound,
    NotOwner,
    TrackNotFound,
}
