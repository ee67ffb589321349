use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use rand::Rng;
use serde::Deserialize;

use crate::quiz::{Genre, Movie, MovieSource, QuizError, MISSING_VALUE};

/// What OMDb says when a search or lookup matched nothing.
const NOT_FOUND: &str = "Movie not found!";

/// Client for the OMDb API (https://www.omdbapi.com/).
#[derive(Debug, Clone)]
pub struct OmdbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Search", default)]
    search: Vec<SearchHit>,
    #[serde(rename = "Error")]
    error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    #[serde(rename = "Title", default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct MovieRecord {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Error")]
    error: Option<String>,
    #[serde(rename = "imdbID", default)]
    imdb_id: String,
    #[serde(rename = "Title", default)]
    title: String,
    #[serde(rename = "Director", default)]
    director: String,
    #[serde(rename = "Year", default)]
    year: String,
    #[serde(rename = "Genre", default)]
    genre: String,
    #[serde(rename = "Actors", default)]
    actors: String,
    #[serde(rename = "Poster")]
    poster: Option<String>,
}

impl MovieRecord {
    fn into_movie(self) -> Movie {
        let cast = self
            .actors
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty() && *name != MISSING_VALUE)
            .map(str::to_string)
            .collect();
        let poster_url = self.poster.filter(|url| url.starts_with("http"));

        Movie {
            imdb_id: self.imdb_id,
            title: self.title,
            director: self.director,
            year: self.year,
            genre: self.genre,
            cast,
            poster_url,
        }
    }
}

/// Maps a `"Response": "False"` reply to an error.
fn failure(error: Option<String>, genre: Genre) -> QuizError {
    match error {
        Some(message) if message == NOT_FOUND => QuizError::EmptyResult { genre },
        Some(message) => QuizError::Rejected(message),
        None => QuizError::Rejected("unknown error".to_string()),
    }
}

pub fn parse_search(body: &str, genre: Genre) -> Result<Vec<SearchHit>, QuizError> {
    let response: SearchResponse = serde_json::from_str(body)?;
    if response.response != "True" {
        return Err(failure(response.error, genre));
    }
    if response.search.is_empty() {
        return Err(QuizError::EmptyResult { genre });
    }
    Ok(response.search)
}

/// Parses a detail lookup made while looking for a movie of `genre`.
pub fn parse_movie(body: &str, genre: Genre) -> Result<Movie, QuizError> {
    let record: MovieRecord = serde_json::from_str(body)?;
    if record.response != "True" {
        return Err(failure(record.error, genre));
    }
    Ok(record.into_movie())
}

impl OmdbClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, QuizError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, api_key, http))
    }

    pub fn with_client(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn get(&self, query: &[(&str, &str)]) -> Result<String, QuizError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[("apikey", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(QuizError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }

    pub async fn search(&self, genre: Genre) -> Result<Vec<SearchHit>, QuizError> {
        debug!("Searching OMDb for {} movies", genre);
        let body = self.get(&[("type", "movie"), ("s", genre.name())]).await?;
        parse_search(&body, genre)
    }

    pub async fn movie(&self, imdb_id: &str, genre: Genre) -> Result<Movie, QuizError> {
        debug!("Fetching OMDb record {}", imdb_id);
        let body = self.get(&[("i", imdb_id)]).await?;
        parse_movie(&body, genre)
    }
}

#[async_trait]
impl MovieSource for OmdbClient {
    async fn random_movie(&self, genre: Genre) -> Result<Movie, QuizError> {
        let hits = self.search(genre).await?;
        let index = rand::thread_rng().gen_range(0..hits.len());
        let picked = &hits[index];
        debug!("Picked {:?} ({})", picked.title, picked.imdb_id);
        self.movie(&picked.imdb_id, genre).await
    }
}
