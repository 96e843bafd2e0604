use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::Config;
use crate::error::{AppError, AppResult, CatalogError};
use crate::models::Domain;
use crate::services::providers::{ArtworkProvider, SpotifyArtworkProvider};
use crate::services::Recommender;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared application state
///
/// Recommenders are immutable after startup, so the state is cloned into
/// every handler without locking.
#[derive(Clone)]
pub struct AppState {
    recommenders: Arc<HashMap<Domain, Arc<Recommender>>>,
    artwork: Option<Arc<dyn ArtworkProvider>>,
    request_timeout: Duration,
    display_seed: Option<u64>,
}

impl AppState {
    /// Creates state serving the given recommenders, one per domain
    pub fn new(recommenders: Vec<Recommender>) -> Self {
        let recommenders = recommenders
            .into_iter()
            .map(|r| (r.domain(), Arc::new(r)))
            .collect();
        Self {
            recommenders: Arc::new(recommenders),
            artwork: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            display_seed: None,
        }
    }

    /// Loads every enabled domain's catalog and wires the configured providers
    pub fn load(config: &Config, domains: &[Domain]) -> Result<Self, CatalogError> {
        let mut recommenders = Vec::with_capacity(domains.len());
        for &domain in domains {
            let dir = config.domain_dir(domain);
            tracing::info!(domain = %domain, dir = %dir.display(), "Loading catalog");
            recommenders.push(Recommender::load(
                domain,
                &dir,
                Some(config.movie_image_base_url.clone()),
            )?);
        }

        let mut state = Self::new(recommenders)
            .with_request_timeout(config.request_timeout())
            .with_display_seed(config.display_seed);

        match config.spotify_credentials() {
            Some((client_id, client_secret)) => {
                state = state.with_artwork(Arc::new(SpotifyArtworkProvider::new(
                    client_id,
                    client_secret,
                    config.spotify_api_url.clone(),
                    config.spotify_auth_url.clone(),
                )));
            }
            None => tracing::warn!("Spotify credentials not configured, track artwork disabled"),
        }

        Ok(state)
    }

    pub fn with_artwork(mut self, provider: Arc<dyn ArtworkProvider>) -> Self {
        tracing::info!(provider = provider.name(), "Artwork provider enabled");
        self.artwork = Some(provider);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_display_seed(mut self, seed: Option<u64>) -> Self {
        self.display_seed = seed;
        self
    }

    /// Recommender for `domain`, or `DomainUnavailable` when it was not loaded
    pub fn recommender(&self, domain: Domain) -> AppResult<Arc<Recommender>> {
        self.recommenders
            .get(&domain)
            .cloned()
            .ok_or_else(|| AppError::DomainUnavailable(domain.to_string()))
    }

    /// Loaded domains in canonical order
    pub fn domains(&self) -> Vec<Domain> {
        Domain::ALL
            .into_iter()
            .filter(|d| self.recommenders.contains_key(d))
            .collect()
    }

    pub fn artwork(&self) -> Option<Arc<dyn ArtworkProvider>> {
        self.artwork.clone()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Random source for one request: seeded when configured, otherwise from entropy
    pub fn display_rng(&self) -> StdRng {
        match self.display_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
