/// Spotify Web API artwork provider
///
/// API Flow:
/// 1. Token: POST {auth_url} with client credentials → bearer token, cached until shortly before expiry
/// 2. Tracks: GET {api_url}/v1/tracks?ids=... in batches of 50 → album images and preview URLs
use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    services::providers::{ArtworkProvider, TrackArtwork},
};

/// Maximum ids per `/v1/tracks` request
const TRACK_BATCH_SIZE: usize = 50;
/// Tokens are refreshed this long before Spotify says they expire
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TracksResponse {
    #[serde(default)]
    tracks: Vec<Option<SpotifyTrack>>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: String,
    album: SpotifyAlbum,
    #[serde(default)]
    preview_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpotifyAlbum {
    #[serde(default)]
    images: Vec<SpotifyImage>,
}

#[derive(Debug, Deserialize)]
struct SpotifyImage {
    url: String,
}

pub struct SpotifyArtworkProvider {
    http_client: HttpClient,
    client_id: String,
    client_secret: String,
    api_url: String,
    auth_url: String,
    token: RwLock<Option<CachedToken>>,
}

impl SpotifyArtworkProvider {
    pub fn new(client_id: String, client_secret: String, api_url: String, auth_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            client_id,
            client_secret,
            api_url,
            auth_url,
            token: RwLock::new(None),
        }
    }

    /// Returns the cached token, fetching a new one when missing or about to expire
    async fn access_token(&self) -> AppResult<String> {
        if let Some(token) = self.token.read().await.as_ref() {
            if Utc::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let mut slot = self.token.write().await;
        // Another request may have refreshed it while we waited for the lock.
        if let Some(token) = slot.as_ref() {
            if Utc::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .http_client
            .post(&self.auth_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::ExternalApi(format!(
                "Spotify token endpoint returned status {}",
                status
            )));
        }

        let body: TokenResponse = response.json().await?;
        let token = CachedToken {
            value: body.access_token,
            expires_at: Utc::now()
                + Duration::seconds(body.expires_in - TOKEN_EXPIRY_MARGIN_SECS),
        };

        tracing::debug!(expires_at = %token.expires_at, "Refreshed Spotify access token");

        let value = token.value.clone();
        *slot = Some(token);
        Ok(value)
    }

    async fn fetch_batch(&self, token: &str, ids: &[String]) -> AppResult<TracksResponse> {
        let url = format!("{}/v1/tracks", self.api_url);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .query(&[("ids", ids.join(","))])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Spotify API returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }
}

fn into_artwork(response: TracksResponse) -> impl Iterator<Item = (String, TrackArtwork)> {
    response.tracks.into_iter().flatten().map(|track| {
        let artwork = TrackArtwork {
            image_url: track.album.images.into_iter().next().map(|image| image.url),
            preview_url: track.preview_url,
        };
        (track.id, artwork)
    })
}

#[async_trait::async_trait]
impl ArtworkProvider for SpotifyArtworkProvider {
    async fn track_artwork(&self, track_ids: &[String]) -> AppResult<HashMap<String, TrackArtwork>> {
        let mut details = HashMap::new();
        if track_ids.is_empty() {
            return Ok(details);
        }

        let token = self.access_token().await?;

        for batch in track_ids.chunks(TRACK_BATCH_SIZE) {
            // A failed batch leaves its tracks without artwork instead of failing the request.
            match self.fetch_batch(&token, batch).await {
                Ok(response) => details.extend(into_artwork(response)),
                Err(e) => {
                    tracing::warn!(error = %e, batch_size = batch.len(), "Spotify track batch failed");
                }
            }
        }

        tracing::info!(
            requested = track_ids.len(),
            found = details.len(),
            "Fetched track artwork"
        );

        Ok(details)
    }

    fn name(&self) -> &'static str {
        "spotify"
    }
}
