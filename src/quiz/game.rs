//! The quiz state machine.
//!
//! A game moves `Lobby -> Playing -> {Playing | GameOver | Won}`. Every
//! change goes through [`QuizController::handle`], which takes the current
//! [`GameState`] by value together with an [`Event`] and returns the next
//! state plus the notices the front end should show.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};

use crate::quiz::distractors::{assemble, collect_distractors};
use crate::quiz::questions::{is_winning, select_answerable, select_question, QuestionKind};
use crate::quiz::{has_value, Genre, Movie, MovieSource, Options, QuizError};

/// Movies fetched for one question before giving up on records that lack
/// every eligible field.
const QUESTION_FETCHES: usize = 3;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Phase {
    Lobby,
    Playing,
    GameOver(GameOverReason),
    Won,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum GameOverReason {
    WrongAnswer { correct: String },
    NoMovies,
    Unreachable,
}

impl GameOverReason {
    fn from_fetch_error(err: &QuizError) -> Self {
        if err.is_empty_result() {
            GameOverReason::NoMovies
        } else {
            GameOverReason::Unreachable
        }
    }
}

/// One asked question.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Round {
    pub number: u32,
    pub movie: Movie,
    pub kind: QuestionKind,
    pub options: Options,
    /// Unix seconds.
    pub asked_at: u64,
}

impl Round {
    pub fn prompt(&self) -> String {
        self.kind.prompt(&self.movie.title)
    }

    /// Whether an answer given at `now` took longer than `away_after`.
    pub fn answered_late(&self, now: u64, away_after: Duration) -> bool {
        now.saturating_sub(self.asked_at) > away_after.as_secs()
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GameState {
    pub genre: Genre,
    pub phase: Phase,
    pub score: u32,
    /// Set when the player stepped away mid-question. Only a restart clears it.
    pub cheated: bool,
    /// Number of the latest round; answers for older rounds are stale.
    pub round: u32,
    pub current: Option<Round>,
}

impl GameState {
    pub fn new(genre: Genre) -> Self {
        Self {
            genre,
            phase: Phase::Lobby,
            score: 0,
            cheated: false,
            round: 0,
            current: None,
        }
    }

    /// A lobby state for `genre` whose rounds continue after `last_round`.
    pub fn after_round(genre: Genre, last_round: u32) -> Self {
        Self {
            round: last_round,
            ..Self::new(genre)
        }
    }

    pub fn is_playing(&self) -> bool {
        self.phase == Phase::Playing
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::GameOver(_) | Phase::Won)
    }

    fn end(&mut self, reason: GameOverReason) {
        self.phase = Phase::GameOver(reason);
        self.current = None;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start(Genre),
    Answer { round: u32, index: usize },
    FocusLost,
    Restart,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Correct,
    Question(Round),
    GameOver(GameOverReason),
    Won,
    /// The event did not apply to the current state and was dropped.
    Stale,
}

#[derive(Debug, Clone)]
pub struct Step {
    pub state: GameState,
    pub notices: Vec<Notice>,
}

impl Step {
    fn unchanged(state: GameState) -> Self {
        Self {
            state,
            notices: vec![],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Wrong,
}

/// Scores `index` against the current round.
///
/// A correct pick raises the score by one. A wrong pick ends the game.
/// Callers must only pass a state that is playing a round.
pub fn check_answer(state: &mut GameState, index: usize) -> Verdict {
    let Some(round) = state.current.as_ref() else {
        return Verdict::Wrong;
    };
    if round.options.is_correct(index) {
        state.score += 1;
        Verdict::Correct
    } else {
        let correct = round.options.correct().to_string();
        state.end(GameOverReason::WrongAnswer { correct });
        Verdict::Wrong
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

pub struct QuizController {
    source: Arc<dyn MovieSource>,
    distractor_attempts: usize,
}

impl QuizController {
    pub fn new(source: Arc<dyn MovieSource>, distractor_attempts: usize) -> Self {
        Self {
            source,
            distractor_attempts,
        }
    }

    pub async fn handle(&self, mut state: GameState, event: Event) -> Step {
        match event {
            Event::Start(genre) => self.start_quiz(genre, state.round).await,
            Event::Restart => self.reset_game(state).await,
            Event::FocusLost => {
                if state.is_playing() {
                    debug!("Player left round {} of a {} game", state.round, state.genre);
                    state.cheated = true;
                }
                Step::unchanged(state)
            }
            Event::Answer { round, index } => {
                if !state.is_playing() || round != state.round {
                    warn!(
                        "Dropping answer for round {} (current round {}, {:?})",
                        round, state.round, state.phase
                    );
                    return Step {
                        state,
                        notices: vec![Notice::Stale],
                    };
                }
                match check_answer(&mut state, index) {
                    Verdict::Correct => {
                        debug!("Correct answer, score is now {}", state.score);
                        self.next_question(state, vec![Notice::Correct]).await
                    }
                    Verdict::Wrong => {
                        info!("Game over at score {} ({} game)", state.score, state.genre);
                        let notices = match &state.phase {
                            Phase::GameOver(reason) => vec![Notice::GameOver(reason.clone())],
                            _ => vec![],
                        };
                        Step { state, notices }
                    }
                }
            }
        }
    }

    /// Fresh game for `genre`. Round numbers continue after `last_round` so
    /// buttons left over from earlier games stay stale.
    pub async fn start_quiz(&self, genre: Genre, last_round: u32) -> Step {
        info!("Starting a {} quiz", genre);
        let mut state = GameState::after_round(genre, last_round);
        state.phase = Phase::Playing;
        self.next_question(state, vec![]).await
    }

    /// Back to question one with the same genre. Clears the score and the
    /// cheat flag. Round numbers keep counting so old buttons stay stale.
    pub async fn reset_game(&self, mut state: GameState) -> Step {
        info!("Restarting the {} quiz", state.genre);
        state.score = 0;
        state.cheated = false;
        state.current = None;
        state.phase = Phase::Playing;
        self.next_question(state, vec![]).await
    }

    pub async fn fetch_random_movie(&self, genre: Genre) -> Result<Movie, QuizError> {
        self.source.random_movie(genre).await
    }

    pub async fn build_options(&self, genre: Genre, kind: QuestionKind, correct: &str) -> Options {
        let distractors = collect_distractors(
            self.source.as_ref(),
            genre,
            kind,
            correct,
            self.distractor_attempts,
        )
        .await;
        assemble(correct, distractors, &mut rand::thread_rng())
    }

    /// The drawn kind when `movie` has a value for it, otherwise another
    /// eligible kind it does have a value for.
    fn pick_kind(&self, score: u32, movie: &Movie) -> Option<QuestionKind> {
        let mut rng = rand::thread_rng();
        let drawn = select_question(score, &mut rng)?;
        if has_value(movie.field(drawn)) {
            return Some(drawn);
        }
        select_answerable(score, &mut rng, |kind| has_value(movie.field(kind)))
    }

    async fn next_question(&self, mut state: GameState, mut notices: Vec<Notice>) -> Step {
        if is_winning(state.score) {
            info!("Player won the {} quiz", state.genre);
            state.phase = Phase::Won;
            state.current = None;
            notices.push(Notice::Won);
            return Step { state, notices };
        }

        let mut question = None;
        for _ in 0..QUESTION_FETCHES {
            let movie = match self.fetch_random_movie(state.genre).await {
                Ok(movie) => movie,
                Err(err) => {
                    warn!("Could not load a question: {}", err);
                    let reason = GameOverReason::from_fetch_error(&err);
                    state.end(reason.clone());
                    notices.push(Notice::GameOver(reason));
                    return Step { state, notices };
                }
            };
            if let Some(kind) = self.pick_kind(state.score, &movie) {
                question = Some((movie, kind));
                break;
            }
            warn!("{:?} has nothing to ask about, fetching another movie", movie.title);
        }
        let Some((movie, kind)) = question else {
            state.end(GameOverReason::NoMovies);
            notices.push(Notice::GameOver(GameOverReason::NoMovies));
            return Step { state, notices };
        };

        let correct = movie.field(kind).trim().to_string();
        let options = self.build_options(state.genre, kind, &correct).await;
        debug!(
            "Round {}: {:?} about {:?}, answer in slot {}",
            state.round + 1,
            kind,
            movie.title,
            options.correct_index
        );

        state.round += 1;
        let round = Round {
            number: state.round,
            movie,
            kind,
            options,
            asked_at: unix_now(),
        };
        state.current = Some(round.clone());
        notices.push(Notice::Question(round));
        Step { state, notices }
    }
}
