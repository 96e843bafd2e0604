use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

pub mod recommendation;

pub use recommendation::{
    Candidate, ItemView, ProfileSummary, RecommendationBucket, RecommendationRequest,
    RecommendationResponse,
};

/// Content vertical served by one recommender instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Movies,
    Music,
    Games,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Movies, Domain::Music, Domain::Games];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Movies => "movies",
            Domain::Music => "music",
            Domain::Games => "games",
        }
    }
}

impl Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "movies" => Ok(Domain::Movies),
            "music" => Ok(Domain::Music),
            "games" => Ok(Domain::Games),
            other => Err(other.to_string()),
        }
    }
}

/// Identifier of a catalog item: TMDB/Steam ids are numeric, Spotify track ids are strings
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Int(i64),
    Text(String),
}

impl Identifier {
    /// Collapses numeric strings onto `Int` so `"570"` and `570` address the same item
    pub fn normalized(self) -> Self {
        match self {
            Identifier::Text(text) => match text.trim().parse::<i64>() {
                Ok(value) => Identifier::Int(value),
                Err(_) => Identifier::Text(text),
            },
            id => id,
        }
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Identifier::Int(id) => write!(f, "{}", id),
            Identifier::Text(id) => write!(f, "{}", id),
        }
    }
}

impl From<i64> for Identifier {
    fn from(value: i64) -> Self {
        Identifier::Int(value)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::Text(value.to_string()).normalized()
    }
}

/// One content unit (movie, track or game) of a loaded catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogItem {
    pub id: Identifier,
    pub title: String,
    pub tags: Vec<String>,
    pub popularity: f64,
    pub quality: f64,
    pub authors: Vec<String>,
    pub release_year: Option<i32>,
    pub image_url: Option<String>,
    #[serde(skip)]
    pub search_text: String,
}

impl CatalogItem {
    /// Author used to group items for the diversity penalty
    pub fn primary_author(&self) -> Option<&str> {
        self.authors
            .first()
            .map(String::as_str)
            .filter(|a| !a.is_empty())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == tag)
    }
}
