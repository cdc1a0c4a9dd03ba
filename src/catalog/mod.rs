//! Movie metadata lookup.
//!
//! The database only stores catalog ids. When a TMDB key is configured the
//! list pages resolve those ids to titles; otherwise they show the bare id.

pub mod tmdb;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use tmdb::TmdbCatalog;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieInfo {
    pub id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
}

const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w92";

impl MovieInfo {
    pub fn poster_url(&self) -> Option<String> {
        self.poster_path
            .as_ref()
            .map(|path| format!("{}{}", POSTER_BASE_URL, path))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status {0} for movie {1}")]
    Status(u16, i64),
}

#[async_trait]
pub trait MovieCatalog: Send + Sync {
    /// `Ok(None)` means the catalog does not know this id.
    async fn lookup(&self, movie_id: i64) -> Result<Option<MovieInfo>, CatalogError>;
}

/// Catalog used when no remote source is configured.
#[derive(Debug, Default)]
pub struct OfflineCatalog;

#[async_trait]
impl MovieCatalog for OfflineCatalog {
    async fn lookup(&self, _movie_id: i64) -> Result<Option<MovieInfo>, CatalogError> {
        Ok(None)
    }
}
