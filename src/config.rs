use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::models::Domain;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Root directory holding one artifact directory per domain
    #[serde(default = "default_catalog_dir")]
    pub catalog_dir: PathBuf,

    /// Comma-separated list of domains to load (movies, music, games)
    #[serde(default = "default_enabled_domains")]
    pub enabled_domains: String,

    /// Upper bound on a single recommendation computation
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Fixes the display score draw when set
    #[serde(default)]
    pub display_seed: Option<u64>,

    /// Prefix joined to movie poster paths
    #[serde(default = "default_movie_image_base_url")]
    pub movie_image_base_url: String,

    /// Spotify client credentials for track artwork; artwork lookups are disabled without them
    #[serde(default)]
    pub spotify_client_id: Option<String>,

    #[serde(default)]
    pub spotify_client_secret: Option<String>,

    #[serde(default = "default_spotify_api_url")]
    pub spotify_api_url: String,

    #[serde(default = "default_spotify_auth_url")]
    pub spotify_auth_url: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_catalog_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_enabled_domains() -> String {
    "movies,music,games".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_movie_image_base_url() -> String {
    "https://image.tmdb.org/t/p/w500".to_string()
}

fn default_spotify_api_url() -> String {
    "https://api.spotify.com".to_string()
}

fn default_spotify_auth_url() -> String {
    "https://accounts.spotify.com/api/token".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Parses `enabled_domains`, rejecting unknown names
    pub fn domains(&self) -> anyhow::Result<Vec<Domain>> {
        let mut domains = Vec::new();
        for name in self
            .enabled_domains
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let domain: Domain = name
                .parse()
                .map_err(|_| anyhow::anyhow!("Unknown domain in ENABLED_DOMAINS: {}", name))?;
            if !domains.contains(&domain) {
                domains.push(domain);
            }
        }
        if domains.is_empty() {
            anyhow::bail!("ENABLED_DOMAINS must name at least one domain");
        }
        Ok(domains)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Artifact directory for one domain
    pub fn domain_dir(&self, domain: Domain) -> PathBuf {
        self.catalog_dir.join(domain.as_str())
    }

    pub fn spotify_credentials(&self) -> Option<(String, String)> {
        match (&self.spotify_client_id, &self.spotify_client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some((id.clone(), secret.clone()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_domains(domains: &str) -> Config {
        let vars = vec![("ENABLED_DOMAINS".to_string(), domains.to_string())];
        envy::from_iter::<_, Config>(vars).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = envy::from_iter::<_, Config>(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.request_timeout_ms, 10_000);
        assert!(config.display_seed.is_none());
        assert!(config.spotify_credentials().is_none());
        assert_eq!(config.domain_dir(Domain::Games), PathBuf::from("cache/games"));
    }

    #[test]
    fn test_domains_parsed_and_deduplicated() {
        let config = config_with_domains("games, movies,games");
        assert_eq!(config.domains().unwrap(), vec![Domain::Games, Domain::Movies]);
    }

    #[test]
    fn test_unknown_domain_rejected() {
        let config = config_with_domains("movies,books");
        assert!(config.domains().is_err());
    }

    #[test]
    fn test_display_seed_from_env() {
        let vars = vec![("DISPLAY_SEED".to_string(), "42".to_string())];
        let config = envy::from_iter::<_, Config>(vars).unwrap();
        assert_eq!(config.display_seed, Some(42));
    }
}
