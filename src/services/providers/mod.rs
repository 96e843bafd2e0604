/// Artwork provider abstraction
///
/// Track artwork is not part of the music catalog artifacts; it is looked up
/// on demand from an external music catalog. Providers sit behind a trait so
/// the HTTP layer can run without credentials and tests can substitute a mock.
use std::collections::HashMap;

use serde::Serialize;

use crate::error::AppResult;

pub mod spotify;

pub use spotify::SpotifyArtworkProvider;

/// Display metadata for one track
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackArtwork {
    pub image_url: Option<String>,
    pub preview_url: Option<String>,
}

/// Trait for external artwork sources
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ArtworkProvider: Send + Sync {
    /// Looks up artwork for the given track ids
    ///
    /// Ids the provider does not know are absent from the returned map.
    async fn track_artwork(&self, track_ids: &[String]) -> AppResult<HashMap<String, TrackArtwork>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
