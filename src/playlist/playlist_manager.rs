use crate::error::{ServiceError, ServiceResult};
use crate::store::{FullStore, NewPlaylist, Playlist, PlaylistChanges, PlaylistWrite};

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

pub const MAX_PLAYLIST_SEARCH_RESULTS: usize = 10;

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct DeleteConfirmation {
    pub message: String,
}

fn into_result<T>(outcome: PlaylistWrite<T>) -> ServiceResult<T> {
    match outcome {
        PlaylistWrite::Done(value) => Ok(value),
        PlaylistWrite::PlaylistNotFound => Err(ServiceError::PlaylistNotFound),
        PlaylistWrite::NotOwner => Err(ServiceError::Unauthorized),
        PlaylistWrite::TrackNotFound => Err(ServiceError::TrackNotFound),
    }
}

pub struct PlaylistManager {
    store: Arc<dyn FullStore>,
}

impl PlaylistManager {
    pub fn new(store: Arc<dyn FullStore>) -> Self {
        Self { store }
    }

    pub fn create(&self, owner_id: &str, playlist: NewPlaylist) -> ServiceResult<Playlist> {
        let created = self.store.create_playlist(owner_id, &playlist)?;
        info!("User {} created playlist {}", owner_id, created.id);
        Ok(created)
    }

    pub fn update(
        &self,
        playlist_id: &str,
        requester_id: &str,
        changes: PlaylistChanges,
    ) -> ServiceResult<Playlist> {
        into_result(
            self.store
                .update_playlist(playlist_id, requester_id, &changes)?,
        )
    }

    pub fn delete(&self, playlist_id: &str, requester_id: &str) -> ServiceResult<DeleteConfirmation> {
        into_result(self.store.delete_playlist(playlist_id, requester_id)?)?;
        info!("User {} deleted playlist {}", requester_id, playlist_id);
        Ok(DeleteConfirmation {
            message: "Playlist deleted".to_string(),
        })
    }

    pub fn get(&self, playlist_id: &str) -> ServiceResult<Playlist> {
        self.store
            .get_playlist(playlist_id)?
            .ok_or(ServiceError::PlaylistNotFound)
    }

    pub fn add_track(
        &self,
        playlist_id: &str,
        track_id: &str,
        requester_id: &str,
    ) -> ServiceResult<Playlist> {
        debug!("add_track({playlist_id}, {track_id}) by {requester_id}");
        into_result(
            self.store
                .add_playlist_track(playlist_id, track_id, requester_id)?,
        )
    }

    pub fn remove_track(
        &self,
        playlist_id: &str,
        track_id: &str,
        requester_id: &str,
    ) -> ServiceResult<Playlist> {
        debug!("remove_track({playlist_id}, {track_id}) by {requester_id}");
        into_result(
            self.store
                .remove_playlist_track(playlist_id, track_id, requester_id)?,
        )
    }

    pub fn list_owned(&self, owner_id: &str) -> ServiceResult<Vec<Playlist>> {
        Ok(self.store.get_user_playlists(owner_id)?)
    }

    pub fn search(&self, query: &str) -> ServiceResult<Vec<Playlist>> {
        Ok(self
            .store
            .search_playlists(query, MAX_PLAYLIST_SEARCH_RESULTS)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NewTrack, SqliteStore, Track, TrackStore, User, UserStore};
    use crate::user::HashedPassword;
    use tempfile::TempDir;

    struct Fixture {
        manager: PlaylistManager,
        store: Arc<SqliteStore>,
        alice: User,
        bob: User,
        track: Track,
        _temp_dir: TempDir,
    }

    fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::new(temp_dir.path().join("test.db")).unwrap());
        let password = HashedPassword::new("password123").unwrap();
        let alice = store
            .create_user("alice@example.com", "Alice", &password)
            .unwrap()
            .unwrap();
        let bob = store
            .create_user("bob@example.com", "Bob", &password)
            .unwrap()
            .unwrap();
        let track = store
            .create_track(
                &alice.id,
                &NewTrack {
                    title: "Highway Song".to_string(),
                    artist: None,
                    duration_secs: None,
                },
            )
            .unwrap();
        Fixture {
            manager: PlaylistManager::new(store.clone()),
            store,
            alice,
            bob,
            track,
            _temp_dir: temp_dir,
        }
    }

    fn road_trip() -> NewPlaylist {
        NewPlaylist {
            name: "Road Trip".to_string(),
            description: Some("Songs for the highway".to_string()),
            cover_image: None,
        }
    }

    #[test]
    fn non_owner_cannot_mutate() {
        let f = fixture();
        let playlist = f.manager.create(&f.alice.id, road_trip()).unwrap();

        assert!(matches!(
            f.manager.update(&playlist.id, &f.bob.id, PlaylistChanges::default()),
            Err(ServiceError::Unauthorized)
        ));
        assert!(matches!(
            f.manager.add_track(&playlist.id, &f.track.id, &f.bob.id),
            Err(ServiceError::Unauthorized)
        ));
        assert!(matches!(
            f.manager.remove_track(&playlist.id, &f.track.id, &f.bob.id),
            Err(ServiceError::Unauthorized)
        ));
        assert!(matches!(
            f.manager.delete(&playlist.id, &f.bob.id),
            Err(ServiceError::Unauthorized)
        ));

        let renamed = f
            .manager
            .update(
                &playlist.id,
                &f.alice.id,
                PlaylistChanges {
                    name: Some("Long Drive".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.name, "Long Drive");
        assert_eq!(renamed.description.as_deref(), Some("Songs for the highway"));
        assert_eq!(renamed.owner.id, f.alice.id);
    }

    #[test]
    fn missing_resources_are_reported() {
        let f = fixture();
        let playlist = f.manager.create(&f.alice.id, road_trip()).unwrap();

        assert!(matches!(
            f.manager.get("missing"),
            Err(ServiceError::PlaylistNotFound)
        ));
        assert!(matches!(
            f.manager.delete("missing", &f.alice.id),
            Err(ServiceError::PlaylistNotFound)
        ));
        assert!(matches!(
            f.manager.add_track(&playlist.id, "missing", &f.alice.id),
            Err(ServiceError::TrackNotFound)
        ));
    }

    #[test]
    fn track_membership_is_idempotent() {
        let f = fixture();
        let playlist = f.manager.create(&f.alice.id, road_trip()).unwrap();

        f.manager
            .add_track(&playlist.id, &f.track.id, &f.alice.id)
            .unwrap();
        let twice = f
            .manager
            .add_track(&playlist.id, &f.track.id, &f.alice.id)
            .unwrap();
        assert_eq!(twice.track_count, 1);
        assert_eq!(twice.tracks.as_ref().map(Vec::len), Some(1));

        let removed = f
            .manager
            .remove_track(&playlist.id, &f.track.id, &f.alice.id)
            .unwrap();
        assert_eq!(removed.track_count, 0);
        let removed_again = f
            .manager
            .remove_track(&playlist.id, &f.track.id, &f.alice.id)
            .unwrap();
        assert_eq!(removed_again.track_count, 0);
    }

    #[test]
    fn delete_confirms_and_removes() {
        let f = fixture();
        let playlist = f.manager.create(&f.alice.id, road_trip()).unwrap();

        let confirmation = f.manager.delete(&playlist.id, &f.alice.id).unwrap();
        assert_eq!(confirmation.message, "Playlist deleted");
        assert!(matches!(
            f.manager.get(&playlist.id),
            Err(ServiceError::PlaylistNotFound)
        ));
        assert!(f.store.get_track(&f.track.id).unwrap().is_some());
    }

    #[test]
    fn lists_and_searches() {
        let f = fixture();
        for i in 0..11 {
            f.manager
                .create(
                    &f.bob.id,
                    NewPlaylist {
                        name: format!("Chill {}", i),
                        description: None,
                        cover_image: None,
                    },
                )
                .unwrap();
        }
        let mine = f.manager.create(&f.alice.id, road_trip()).unwrap();

        let owned = f.manager.list_owned(&f.alice.id).unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].id, mine.id);

        assert_eq!(
            f.manager.search("CHILL").unwrap().len(),
            MAX_PLAYLIST_SEARCH_RESULTS
        );
        let by_description = f.manager.search("highway").unwrap();
        assert_eq!(by_description.len(), 1);
        assert_eq!(by_description[0].owner.name, "Alice");
    }
}
