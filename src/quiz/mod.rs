pub mod distractors;
pub mod error;
pub mod game;
pub mod omdb;
pub mod questions;
pub mod scoreboard;

use async_trait::async_trait;

pub use error::QuizError;

/// OMDb's marker for a field it has no value for.
pub const MISSING_VALUE: &str = "N/A";

/// Whether a record field holds something that can be asked about.
pub fn has_value(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != MISSING_VALUE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Genre {
    Action,
    Thriller,
    Comedy,
    Drama,
}

impl Genre {
    pub const ALL: [Genre; 4] = [Genre::Action, Genre::Thriller, Genre::Comedy, Genre::Drama];

    /// Name shown to the player. It doubles as the OMDb search term.
    pub fn name(&self) -> &'static str {
        match self {
            Genre::Action => "Action",
            Genre::Thriller => "Thriller",
            Genre::Comedy => "Comedy",
            Genre::Drama => "Drama",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|genre| genre.name().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for Genre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Movie {
    pub imdb_id: String,
    pub title: String,
    pub director: String,
    pub year: String,
    pub genre: String,
    pub cast: Vec<String>,
    pub poster_url: Option<String>,
}

impl Movie {
    /// The value a question of `kind` asks about.
    /// For actors that is the first-billed cast member.
    pub fn field(&self, kind: questions::QuestionKind) -> &str {
        use questions::QuestionKind;

        match kind {
            QuestionKind::Director => &self.director,
            QuestionKind::Year => &self.year,
            QuestionKind::Genre => &self.genre,
            QuestionKind::Actor => self
                .cast
                .first()
                .map(String::as_str)
                .unwrap_or(MISSING_VALUE),
        }
    }
}

/// Four answer options, exactly one of which is correct.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Options {
    pub values: Vec<String>,
    pub correct_index: usize,
}

impl Options {
    pub fn correct(&self) -> &str {
        &self.values[self.correct_index]
    }

    pub fn is_correct(&self, index: usize) -> bool {
        index == self.correct_index
    }
}

/// Where the quiz gets its movies from.
#[async_trait]
pub trait MovieSource: Send + Sync {
    /// A uniformly random movie out of the search results for `genre`.
    async fn random_movie(&self, genre: Genre) -> Result<Movie, QuizError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Hands out scripted results in order; errors once the script runs dry.
    #[derive(Default)]
    pub struct ScriptedSource {
        script: Mutex<VecDeque<Result<Movie, QuizError>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedSource {
        pub fn new(script: Vec<Result<Movie, QuizError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl MovieSource for ScriptedSource {
        async fn random_movie(&self, genre: Genre) -> Result<Movie, QuizError> {
            *self.calls.lock().unwrap() += 1;
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(QuizError::EmptyResult { genre }))
        }
    }

    /// Every field is derived from `tag` so movies are easy to tell apart.
    pub fn movie(tag: &str) -> Movie {
        Movie {
            imdb_id: format!("tt-{tag}"),
            title: format!("Title {tag}"),
            director: format!("Director {tag}"),
            year: format!("Year {tag}"),
            genre: format!("Genre {tag}"),
            cast: vec![format!("Lead {tag}"), format!("Support {tag}")],
            poster_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::questions::QuestionKind;
    use super::*;

    #[test]
    fn genre_names_parse_back() {
        for genre in Genre::ALL {
            assert_eq!(Genre::from_name(genre.name()), Some(genre));
        }
        assert_eq!(Genre::from_name("  drama "), Some(Genre::Drama));
        assert_eq!(Genre::from_name("Western"), None);
    }

    #[test]
    fn actor_question_uses_first_billed() {
        let movie = testing::movie("a");
        assert_eq!(movie.field(QuestionKind::Actor), "Lead a");
        assert_eq!(movie.field(QuestionKind::Director), "Director a");

        let no_cast = Movie {
            cast: vec![],
            ..movie
        };
        assert_eq!(no_cast.field(QuestionKind::Actor), MISSING_VALUE);
    }

    #[test]
    fn blank_and_missing_fields_have_no_value() {
        assert!(has_value("John McTiernan"));
        assert!(!has_value(""));
        assert!(!has_value("   "));
        assert!(!has_value(MISSING_VALUE));
        assert!(!has_value(" N/A "));
    }
}
