use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use super::{CatalogError, MovieCatalog, MovieInfo};
use crate::config::TmdbConfig;

pub struct TmdbCatalog {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    cache: RwLock<HashMap<i64, Option<MovieInfo>>>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovie {
    id: i64,
    title: String,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
}

impl From<TmdbMovie> for MovieInfo {
    fn from(m: TmdbMovie) -> Self {
        MovieInfo {
            id: m.id,
            year: m.release_date.as_deref().and_then(parse_year),
            title: m.title,
            overview: m.overview.filter(|o| !o.is_empty()),
            poster_path: m.poster_path,
        }
    }
}

// TMDB sends "" for unknown release dates.
fn parse_year(date: &str) -> Option<i32> {
    date.get(..4).and_then(|y| y.parse().ok())
}

impl TmdbCatalog {
    pub fn new(config: &TmdbConfig) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            cache: RwLock::new(HashMap::new()),
        })
    }

    fn movie_url(&self, movie_id: i64) -> String {
        format!("{}/movie/{}", self.base_url, movie_id)
    }

    async fn fetch(&self, movie_id: i64) -> Result<Option<MovieInfo>, CatalogError> {
        let url = self.movie_url(movie_id);
        debug!("Fetching movie {} from {}", movie_id, url);

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let movie: TmdbMovie = response.json().await?;
                Ok(Some(movie.into()))
            }
            status => Err(CatalogError::Status(status.as_u16(), movie_id)),
        }
    }
}

#[async_trait]
impl MovieCatalog for TmdbCatalog {
    async fn lookup(&self, movie_id: i64) -> Result<Option<MovieInfo>, CatalogError> {
        {
            let cache = self.cache.read().await;
            if let Some(info) = cache.get(&movie_id) {
                return Ok(info.clone());
            }
        }

        let info = self.fetch(movie_id).await?;

        let mut cache = self.cache.write().await;
        cache.insert(movie_id, info.clone());

        Ok(info)
    }
}
