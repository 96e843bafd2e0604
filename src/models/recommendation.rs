use serde::{ser::SerializeMap, Deserialize, Deserializer, Serialize, Serializer};

use super::{CatalogItem, Identifier};

/// Minimum number of seed items a recommendation request must carry
pub const MIN_SEED_ITEMS: usize = 3;

/// Request body for `POST /api/{domain}/recommend`
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationRequest {
    /// Missing or null lists fall through to the seed-count check
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        alias = "movie_ids",
        alias = "game_ids",
        alias = "track_ids"
    )]
    pub item_ids: Vec<Identifier>,
    #[serde(default, alias = "genre")]
    pub explore_tag: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Identifier>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Identifier>>::deserialize(deserializer)?.unwrap_or_default())
}

impl RecommendationRequest {
    pub fn new(item_ids: Vec<Identifier>, explore_tag: Option<&str>) -> Self {
        Self {
            item_ids,
            explore_tag: explore_tag.map(str::to_string),
        }
    }

    /// Explore tag with blank values treated as absent
    pub fn explore_tag(&self) -> Option<&str> {
        self.explore_tag
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// A catalog row moving through one scoring request
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub row: usize,
    pub similarity: f64,
    pub hybrid_score: f64,
    pub penalized_score: f64,
    pub display_score: Option<f64>,
}

impl Candidate {
    pub fn new(row: usize, similarity: f64) -> Self {
        Self {
            row,
            similarity,
            hybrid_score: 0.0,
            penalized_score: 0.0,
            display_score: None,
        }
    }

    /// Percentage shown to clients
    pub fn similarity_score(&self) -> Option<u8> {
        self.display_score
            .map(|score| score.round().clamp(0.0, 100.0) as u8)
    }
}

/// Named slice of a ranked candidate list
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationBucket {
    pub name: String,
    pub candidates: Vec<Candidate>,
}

/// Item as returned to clients
#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: CatalogItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<u8>,
}

impl ItemView {
    pub fn plain(item: &CatalogItem) -> Self {
        Self {
            item: item.clone(),
            similarity_score: None,
        }
    }

    pub fn scored(item: &CatalogItem, candidate: &Candidate) -> Self {
        Self {
            item: item.clone(),
            similarity_score: candidate.similarity_score(),
        }
    }
}

/// Buckets in allocation order, serialized as a JSON object
#[derive(Debug, Clone, Default)]
pub struct BucketViews(pub Vec<(String, Vec<ItemView>)>);

impl BucketViews {
    pub fn get(&self, name: &str) -> Option<&[ItemView]> {
        self.0
            .iter()
            .find(|(bucket, _)| bucket == name)
            .map(|(_, items)| items.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn total_items(&self) -> usize {
        self.0.iter().map(|(_, items)| items.len()).sum()
    }
}

impl Serialize for BucketViews {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, items) in &self.0 {
            map.serialize_entry(name, items)?;
        }
        map.end()
    }
}

/// Summary of the seed items a recommendation was built from
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub items: Vec<ItemView>,
    pub dominant_tag: Option<String>,
    pub tags: Vec<String>,
}

/// Response body for `POST /api/{domain}/recommend`
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResponse {
    pub recommendations: BucketViews,
    pub profile: ProfileSummary,
    pub selected_tag: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accepts_domain_aliases() {
        let request: RecommendationRequest =
            serde_json::from_str(r#"{"game_ids": [570, 730, 620], "genre": "RPG"}"#).unwrap();
        assert_eq!(request.item_ids.len(), 3);
        assert_eq!(request.explore_tag(), Some("RPG"));

        let request: RecommendationRequest =
            serde_json::from_str(r#"{"track_ids": ["a", "b", "c"]}"#).unwrap();
        assert_eq!(request.explore_tag(), None);
    }

    #[test]
    fn test_missing_or_null_ids_are_empty() {
        let request: RecommendationRequest = serde_json::from_str(r#"{"genre": "RPG"}"#).unwrap();
        assert!(request.item_ids.is_empty());

        let request: RecommendationRequest =
            serde_json::from_str(r#"{"game_ids": null}"#).unwrap();
        assert!(request.item_ids.is_empty());

        assert!(serde_json::from_str::<RecommendationRequest>(r#"{"game_ids": "570"}"#).is_err());
    }

    #[test]
    fn test_blank_explore_tag_is_absent() {
        let request = RecommendationRequest::new(vec![], Some("  "));
        assert_eq!(request.explore_tag(), None);
    }

    #[test]
    fn test_similarity_score_rounds() {
        let mut candidate = Candidate::new(0, 0.5);
        assert_eq!(candidate.similarity_score(), None);
        candidate.display_score = Some(97.6);
        assert_eq!(candidate.similarity_score(), Some(98));
    }

    #[test]
    fn test_bucket_views_keep_order() {
        let views = BucketViews(vec![
            ("main".to_string(), vec![]),
            ("hidden_gems".to_string(), vec![]),
            ("genre_favorites".to_string(), vec![]),
        ]);
        let json = serde_json::to_string(&views).unwrap();
        assert_eq!(json, r#"{"main":[],"hidden_gems":[],"genre_favorites":[]}"#);
    }
}
