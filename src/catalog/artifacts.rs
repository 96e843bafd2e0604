//! On-disk artifact formats produced by the offline cache builders.
//!
//! Field-name differences between the builders (`appid` vs `id`, `name` vs
//! `track_name`, `vote_average` vs `quality`, ...) are resolved here, once,
//! so the rest of the service only ever sees [`CatalogItem`].

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use ndarray::Array2;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::CatalogError;
use crate::models::{CatalogItem, Identifier};

/// Where an item's quality value comes from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QualitySource {
    /// The `quality` / `vote_average` column, used as-is
    Field,
    /// `popularity / 100`, for tables without a quality column
    PopularityPercent,
}

/// One feature matrix file and its weight in the combined feature space
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixSource {
    pub file: String,
    pub weight: f32,
}

impl MatrixSource {
    pub fn new(file: &str, weight: f32) -> Self {
        Self {
            file: file.to_string(),
            weight,
        }
    }
}

/// File names and normalisation rules for one domain's artifacts
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactLayout {
    pub items_file: String,
    pub tags_file: String,
    pub matrices: Vec<MatrixSource>,
    pub quality: QualitySource,
    /// Prefix joined to relative image paths (TMDB poster paths)
    pub image_base_url: Option<String>,
}

/// A field holding either a delimited string or a list of strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextOrList {
    List(Vec<String>),
    Text(String),
}

impl TextOrList {
    fn into_values(self, delimiter: char) -> Vec<String> {
        let values = match self {
            TextOrList::List(values) => values,
            TextOrList::Text(text) => text.split(delimiter).map(str::to_string).collect(),
        };
        values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect()
    }
}

/// Item record as written by any of the cache builders
#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(alias = "appid", alias = "track_id")]
    id: Identifier,
    #[serde(alias = "name", alias = "track_name")]
    title: String,
    #[serde(default)]
    original_title: Option<String>,
    #[serde(default, alias = "genres", alias = "track_genre")]
    tags: Option<TextOrList>,
    #[serde(default)]
    popularity: Option<f64>,
    #[serde(default, alias = "vote_average")]
    quality: Option<f64>,
    #[serde(default, alias = "developers", alias = "artists", alias = "artist_name")]
    authors: Option<TextOrList>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    release_year: Option<i32>,
    #[serde(default, alias = "poster_path", alias = "header_image", alias = "image_url")]
    image: Option<String>,
}

impl RawItem {
    fn into_item(self, layout: &ArtifactLayout) -> CatalogItem {
        let popularity = self.popularity.filter(|p| p.is_finite()).unwrap_or(0.0);
        let quality = match layout.quality {
            QualitySource::Field => self.quality.filter(|q| q.is_finite()).unwrap_or(0.0),
            QualitySource::PopularityPercent => self
                .quality
                .filter(|q| q.is_finite())
                .unwrap_or(popularity / 100.0),
        };
        let tags = self.tags.map(|t| t.into_values(',')).unwrap_or_default();
        let authors = self.authors.map(|a| a.into_values(';')).unwrap_or_default();
        let release_year = self
            .release_year
            .or_else(|| self.release_date.as_deref().and_then(parse_release_year));
        let image_url = self
            .image
            .filter(|path| !path.is_empty())
            .map(|path| match &layout.image_base_url {
                Some(base) if !path.starts_with("http") => format!("{}{}", base, path),
                _ => path,
            });

        let mut search_text = self.title.to_lowercase();
        if let Some(original) = &self.original_title {
            search_text.push(' ');
            search_text.push_str(&original.to_lowercase());
        }
        for author in &authors {
            search_text.push(' ');
            search_text.push_str(&author.to_lowercase());
        }

        CatalogItem {
            id: self.id.normalized(),
            title: self.title,
            tags,
            popularity,
            quality,
            authors,
            release_year,
            image_url,
            search_text,
        }
    }
}

/// Feature matrix as serialized by the cache builders
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MatrixArtifact {
    Csr {
        rows: usize,
        cols: usize,
        indptr: Vec<usize>,
        indices: Vec<usize>,
        values: Vec<f32>,
    },
    Dense {
        rows: usize,
        cols: usize,
        data: Vec<f32>,
    },
}

impl MatrixArtifact {
    fn into_dense(self, artifact: &str) -> Result<Array2<f32>, CatalogError> {
        let malformed = |reason: String| CatalogError::Malformed {
            artifact: artifact.to_string(),
            reason,
        };

        match self {
            MatrixArtifact::Dense { rows, cols, data } => {
                Array2::from_shape_vec((rows, cols), data).map_err(|e| malformed(e.to_string()))
            }
            MatrixArtifact::Csr {
                rows,
                cols,
                indptr,
                indices,
                values,
            } => {
                if indptr.len() != rows + 1 {
                    return Err(malformed(format!(
                        "indptr has {} entries for {} rows",
                        indptr.len(),
                        rows
                    )));
                }
                if indices.len() != values.len() || indptr[rows] != values.len() {
                    return Err(malformed("indices/values length disagree with indptr".into()));
                }

                let mut dense = Array2::<f32>::zeros((rows, cols));
                for row in 0..rows {
                    let (start, end) = (indptr[row], indptr[row + 1]);
                    if start > end || end > values.len() {
                        return Err(malformed(format!("indptr not monotonic at row {}", row)));
                    }
                    for k in start..end {
                        let col = indices[k];
                        if col >= cols {
                            return Err(malformed(format!(
                                "column index {} out of range at row {}",
                                col, row
                            )));
                        }
                        dense[[row, col]] += values[k];
                    }
                }
                Ok(dense)
            }
        }
    }
}

fn read_json<T: DeserializeOwned>(path: PathBuf) -> Result<T, CatalogError> {
    let bytes = fs::read(&path).map_err(|source| CatalogError::Io {
        path: path.clone(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| CatalogError::Parse { path, source })
}

/// Reads the item table, weighted feature matrices and tag vocabulary
pub(crate) fn load_artifacts(
    dir: &Path,
    layout: &ArtifactLayout,
) -> Result<(Vec<CatalogItem>, Array2<f32>, Vec<String>), CatalogError> {
    let raw_items: Vec<RawItem> = read_json(dir.join(&layout.items_file))?;
    let items: Vec<CatalogItem> = raw_items
        .into_iter()
        .map(|raw| raw.into_item(layout))
        .collect();

    if layout.matrices.is_empty() {
        return Err(CatalogError::Malformed {
            artifact: layout.items_file.clone(),
            reason: "no feature matrices configured".to_string(),
        });
    }

    let mut combined: Option<Array2<f32>> = None;
    for source in &layout.matrices {
        let matrix = read_json::<MatrixArtifact>(dir.join(&source.file))?.into_dense(&source.file)?;

        if matrix.nrows() != items.len() {
            return Err(CatalogError::RowMismatch {
                artifact: source.file.clone(),
                expected: items.len(),
                found: matrix.nrows(),
            });
        }

        combined = Some(match combined {
            None => matrix * source.weight,
            Some(acc) => {
                if acc.dim() != matrix.dim() {
                    return Err(CatalogError::ShapeMismatch {
                        artifact: source.file.clone(),
                        expected: acc.dim(),
                        found: matrix.dim(),
                    });
                }
                acc + matrix * source.weight
            }
        });

        tracing::debug!(file = %source.file, weight = source.weight, "Feature matrix loaded");
    }

    let tags: Vec<String> = read_json(dir.join(&layout.tags_file))?;

    // Guarded by the is_empty check above.
    let features = combined.unwrap_or_else(|| Array2::zeros((items.len(), 0)));
    Ok((items, features, tags))
}

/// Extracts a year from the date formats found in the source datasets
pub fn parse_release_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for format in ["%Y-%m-%d", "%d/%m/%Y", "%b %d, %Y", "%d %b, %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date.year());
        }
    }

    // Fall back to the first plausible four-digit run ("2019", "12/nov./2019", ...)
    let bytes = raw.as_bytes();
    bytes
        .windows(4)
        .enumerate()
        .filter(|(i, w)| {
            w.iter().all(u8::is_ascii_digit)
                && (*i == 0 || !bytes[i - 1].is_ascii_digit())
                && bytes.get(i + 4).map_or(true, |b| !b.is_ascii_digit())
        })
        .filter_map(|(_, w)| std::str::from_utf8(w).ok()?.parse::<i32>().ok())
        .find(|year| (1800..=2100).contains(year))
}
