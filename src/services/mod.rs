pub mod allocation;
pub mod dedup;
pub mod discover;
pub mod display;
pub mod diversity;
pub mod profile;
pub mod providers;
pub mod recommender;
pub mod scoring;
pub mod search;
pub mod similarity;

pub use recommender::{DomainProfile, Recommender};
pub use search::SearchSettings;
