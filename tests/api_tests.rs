use std::collections::HashSet;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use ndarray::Array2;
use serde_json::{json, Value};

use tastemap::api::{create_router, AppState};
use tastemap::catalog::CatalogStore;
use tastemap::models::{CatalogItem, Identifier};
use tastemap::services::{DomainProfile, Recommender};

fn game(id: i64, title: &str, tag: &str, developer: &str, quality: f64) -> CatalogItem {
    CatalogItem {
        id: Identifier::Int(id),
        title: title.to_string(),
        tags: vec![tag.to_string()],
        popularity: 1000.0 - id as f64,
        quality,
        authors: vec![developer.to_string()],
        release_year: Some(2015),
        image_url: None,
        search_text: format!("{} {}", title, developer).to_lowercase(),
    }
}

/// 15 action games (ids 100..115), 8 RPGs (200..208) and 4 strategy games (300..304)
fn games_recommender() -> Recommender {
    let mut items = Vec::new();
    let mut rows = Vec::new();
    for i in 0..15 {
        let quality = 0.80 + (i % 4) as f64 * 0.05;
        let studio = format!("Studio {}", i % 4);
        items.push(game(100 + i, &format!("Shooter {}", i), "Ação", &studio, quality));
        rows.extend([1.0 + 0.01 * i as f32, 0.0, 0.0]);
    }
    for i in 0..8 {
        let quality = 0.80 + (i % 4) as f64 * 0.05;
        let guild = format!("Guild {}", i % 3);
        items.push(game(200 + i, &format!("Quest {}", i), "RPG", &guild, quality));
        rows.extend([0.3, 1.0, 0.0]);
    }
    for i in 0..4 {
        items.push(game(300 + i, &format!("Empire {}", i), "Estratégia", "Paradox", 0.95));
        rows.extend([0.0, 0.0, 1.0]);
    }
    let features = Array2::from_shape_vec((items.len(), 3), rows).unwrap();
    let tags = vec!["Ação".to_string(), "Estratégia".to_string(), "RPG".to_string()];
    let store = CatalogStore::from_parts(items, features, tags).unwrap();
    Recommender::new(DomainProfile::games(), store)
}

fn create_test_server() -> TestServer {
    let state = AppState::new(vec![games_recommender()]).with_display_seed(Some(7));
    let app = create_router(state);
    TestServer::new(app).unwrap()
}

#[tokio::test]
async fn test_health_check_lists_loaded_domains() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "healthy", "domains": ["games"] }));
}

#[tokio::test]
async fn test_recommend_games_with_explore_tag() {
    let server = create_test_server();

    let response = server
        .post("/api/games/recommend")
        .json(&json!({
            "game_ids": [100, 101, 102],
            "genre": "RPG"
        }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    let recommendations = body["recommendations"].as_object().unwrap();
    let names: HashSet<&str> = recommendations.keys().map(String::as_str).collect();
    assert_eq!(names, HashSet::from(["main", "hidden_gems", "genre_favorites"]));

    let main = body["recommendations"]["main"].as_array().unwrap();
    assert_eq!(main.len(), 12);
    let top = main[0]["similarity_score"].as_u64().unwrap();
    assert!((98..=99).contains(&top));
    for item in &main[3..] {
        let score = item["similarity_score"].as_u64().unwrap();
        assert!((85..=94).contains(&score), "score {} outside games range", score);
    }

    let favorites = body["recommendations"]["genre_favorites"].as_array().unwrap();
    assert!(!favorites.is_empty());
    for item in favorites {
        assert_eq!(item["tags"], json!(["RPG"]));
    }

    // Without replacement: seeds excluded and no id repeated across buckets
    let seeds: HashSet<i64> = [100, 101, 102].into_iter().collect();
    let mut seen = HashSet::new();
    for bucket in recommendations.values() {
        for item in bucket.as_array().unwrap() {
            let id = item["id"].as_i64().unwrap();
            assert!(!seeds.contains(&id));
            assert!(seen.insert(id), "id {} appears in two buckets", id);
        }
    }

    assert_eq!(body["selected_tag"], "RPG");
    assert_eq!(body["profile"]["dominant_tag"], "Ação");
    assert_eq!(body["profile"]["items"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_recommend_is_deterministic_with_display_seed() {
    let server = create_test_server();
    let request = json!({ "item_ids": [100, 101, 102] });

    let first: Value = server.post("/api/games/recommend").json(&request).await.json();
    let second: Value = server.post("/api/games/recommend").json(&request).await.json();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_recommend_requires_three_seeds() {
    let server = create_test_server();
    let response = server
        .post("/api/games/recommend")
        .json(&json!({ "game_ids": [100, 101] }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "insufficient_seeds");
}

#[tokio::test]
async fn test_recommend_without_ids_is_insufficient_seeds() {
    let server = create_test_server();

    for request in [json!({ "genre": "RPG" }), json!({ "game_ids": null })] {
        let response = server.post("/api/games/recommend").json(&request).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "insufficient_seeds");
    }
}

#[tokio::test]
async fn test_malformed_body_gets_structured_error() {
    let server = create_test_server();

    let response = server
        .post("/api/games/recommend")
        .json(&json!({ "game_ids": "100,101,102" }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["code"], "invalid_body");
    assert!(body["error"].is_string());

    let response = server
        .post("/api/music/track-details")
        .json(&json!({ "track_ids": 7 }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["code"], "invalid_body");
}

#[tokio::test]
async fn test_recommend_with_unknown_seeds() {
    let server = create_test_server();
    let response = server
        .post("/api/games/recommend")
        .json(&json!({ "game_ids": [1, 2, 3] }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["code"], "empty_seed");
}

#[tokio::test]
async fn test_disabled_and_unknown_domains() {
    let server = create_test_server();

    let response = server.get("/api/movies/genres").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "domain_unavailable");

    let response = server.get("/api/books/genres").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search() {
    let server = create_test_server();

    let response = server
        .get("/api/games/search")
        .add_query_param("q", "quest 3")
        .await;
    response.assert_status_ok();
    let results: Vec<Value> = response.json();
    assert_eq!(results[0]["title"], "Quest 3");
    assert!(results.len() <= 30);

    let response = server.get("/api/games/search").add_query_param("q", "").await;
    response.assert_status_ok();
    response.assert_json(&json!([]));
}

#[tokio::test]
async fn test_genres_and_discover() {
    let server = create_test_server();

    let response = server.get("/api/games/genres").await;
    response.assert_status_ok();
    response.assert_json(&json!(["Ação", "Estratégia", "RPG"]));

    let response = server.get("/api/games/discover").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["iconic_games"].as_array().unwrap().is_empty());
    let explore = body["explore_games"].as_array().unwrap();
    assert!(explore.is_empty());
}

#[tokio::test]
async fn test_track_details_without_provider_is_empty() {
    let server = create_test_server();
    let response = server
        .post("/api/music/track-details")
        .json(&json!({ "track_ids": ["4uLU6hMCjMI75M1A2tKUQC"] }))
        .await;
    response.assert_status_ok();
    response.assert_json(&json!({}));
}

#[tokio::test]
async fn test_request_id_header() {
    let server = create_test_server();

    let response = server.get("/health").await;
    let generated = response.header("x-request-id");
    assert!(uuid::Uuid::parse_str(generated.to_str().unwrap()).is_ok());

    let id = uuid::Uuid::new_v4().to_string();
    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_str(&id).unwrap(),
        )
        .await;
    assert_eq!(response.header("x-request-id").to_str().unwrap(), id);
}
