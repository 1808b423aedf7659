use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::Value;
use std::env;

use crate::models::{CastMember, Genre};

const TMDB_BASE: &str = "https://api.themoviedb.org/3";

#[async_trait]
pub trait TmdbApi: Send + Sync {
    /// Raw now-playing movie summaries, passed through unmodified.
    async fn now_playing(&self) -> Result<Vec<Value>>;
    async fn movie_details(&self, id: &str) -> Result<MovieDetails>;
    async fn movie_credits(&self, id: &str) -> Result<MovieCredits>;
}

/// The slice of the provider's movie-details response that ends up in the
/// stored movie document.
#[derive(Debug, Clone, Deserialize)]
pub struct MovieDetails {
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    pub release_date: Option<String>,
    pub original_language: String,
    pub tagline: Option<String>,
    pub vote_average: f32,
    pub runtime: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovieCredits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    token: String,
}

impl TmdbClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let token = env::var("TMDB_ACCESS_TOKEN").context("TMDB_ACCESS_TOKEN not set")?;
        Ok(Self::new(token))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let res = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .context("request failed")?;
        let status = res.status();
        let text = res.text().await.context("reading body failed")?;
        if !status.is_success() {
            return Err(anyhow!("{} -> {}", url, text));
        }
        let parsed: T = serde_json::from_str(&text).context("JSON parse failed")?;
        Ok(parsed)
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn now_playing(&self) -> Result<Vec<Value>> {
        #[derive(Deserialize)]
        struct NowPlayingResponse {
            results: Vec<Value>,
        }

        let url = format!("{TMDB_BASE}/movie/now_playing");
        let data: NowPlayingResponse = self.get_json(&url).await?;
        Ok(data.results)
    }

    async fn movie_details(&self, id: &str) -> Result<MovieDetails> {
        let url = format!("{TMDB_BASE}/movie/{id}");
        self.get_json(&url).await
    }

    async fn movie_credits(&self, id: &str) -> Result<MovieCredits> {
        let url = format!("{TMDB_BASE}/movie/{id}/credits");
        self.get_json(&url).await
    }
}
