//! Track registration and lookup.
//!
//! Tracks are registered by metadata only; playlists reference them by id.

use crate::error::{ServiceError, ServiceResult};
use crate::store::{FullStore, NewTrack, Track};

use std::sync::Arc;
use tracing::info;

pub struct TrackCatalog {
    store: Arc<dyn FullStore>,
}

impl TrackCatalog {
    pub fn new(store: Arc<dyn FullStore>) -> Self {
        Self { store }
    }

    pub fn register_track(&self, uploader_id: &str, track: NewTrack) -> ServiceResult<Track> {
        let track = self.store.create_track(uploader_id, &track)?;
        info!("User {} registered track {}", uploader_id, track.id);
        Ok(track)
    }

    pub fn get_track(&self, track_id: &str) -> ServiceResult<Track> {
        self.store
            .get_track(track_id)?
            .ok_or(ServiceError::TrackNotFound)
    }
}
