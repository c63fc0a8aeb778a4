use axum::extract::FromRef;

use crate::catalog::TrackCatalog;
use crate::playlist::PlaylistManager;
use crate::user::{TokenIssuer, UserManager};
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedUserManager = Arc<UserManager>;
pub type GuardedPlaylistManager = Arc<PlaylistManager>;
pub type GuardedTrackCatalog = Arc<TrackCatalog>;
pub type GuardedTokenIssuer = Arc<TokenIssuer>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub hash: String,
    pub user_manager: GuardedUserManager,
    pub playlist_manager: GuardedPlaylistManager,
    pub track_catalog: GuardedTrackCatalog,
    pub token_issuer: GuardedTokenIssuer,
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedPlaylistManager {
    fn from_ref(input: &ServerState) -> Self {
        input.playlist_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedTrackCatalog {
    fn from_ref(input: &ServerState) -> Self {
        input.track_catalog.clone()
    }
}
