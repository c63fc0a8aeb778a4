mod playlist_manager;

pub use playlist_manager::{DeleteConfirmation, PlaylistManager, MAX_PLAYLIST_SEARCH_RESULTS};
