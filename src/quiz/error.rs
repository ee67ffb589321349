use crate::quiz::Genre;

/// Everything that can go wrong while fetching movies.
///
/// Only [`QuizError::EmptyResult`] means "nothing to ask about";
/// the other variants are network-level failures.
#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("movie API unreachable: {0}")]
    Network(#[from] reqwest::Error),

    #[error("movie API answered with status {0}")]
    Status(u16),

    #[error("malformed movie API response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("movie API rejected the request: {0}")]
    Rejected(String),

    #[error("no {genre} movies found")]
    EmptyResult { genre: Genre },
}

impl QuizError {
    pub fn is_empty_result(&self) -> bool {
        matches!(self, QuizError::EmptyResult { .. })
    }
}
