mod track_catalog;

pub use track_catalog::TrackCatalog;
