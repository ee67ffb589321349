use log::{debug, warn};
use rand::Rng;

use crate::quiz::questions::QuestionKind;
use crate::quiz::{has_value, Genre, MovieSource, Options};

pub const DISTRACTOR_COUNT: usize = 3;

/// Fetches random movies of `genre` until `DISTRACTOR_COUNT` distinct wrong
/// values for `kind` are known.
///
/// Gives up after `max_attempts` fetches or on the first fetch error;
/// missing slots are then filled with placeholders, so the result always
/// holds exactly `DISTRACTOR_COUNT` values.
pub async fn collect_distractors(
    source: &dyn MovieSource,
    genre: Genre,
    kind: QuestionKind,
    correct: &str,
    max_attempts: usize,
) -> Vec<String> {
    let correct = correct.trim();
    let mut wrong: Vec<String> = Vec::with_capacity(DISTRACTOR_COUNT);
    let mut attempts = 0;

    while wrong.len() < DISTRACTOR_COUNT && attempts < max_attempts {
        attempts += 1;
        match source.random_movie(genre).await {
            Ok(movie) => {
                let value = movie.field(kind).trim();
                if is_usable(value, correct, &wrong) {
                    debug!("Distractor {:?} from {:?}", value, movie.title);
                    wrong.push(value.to_string());
                }
            }
            Err(err) => {
                warn!("Failed to fetch a distractor movie: {}", err);
                break;
            }
        }
    }

    if wrong.len() < DISTRACTOR_COUNT {
        warn!(
            "Only {} distractors after {} fetches, filling with placeholders",
            wrong.len(),
            attempts
        );
        fill_with_placeholders(&mut wrong, correct);
    }
    wrong
}

fn is_usable(value: &str, correct: &str, taken: &[String]) -> bool {
    has_value(value)
        && value != correct
        && !taken.iter().any(|t| t == value)
}

fn fill_with_placeholders(wrong: &mut Vec<String>, correct: &str) {
    let mut n = 1;
    while wrong.len() < DISTRACTOR_COUNT {
        let placeholder = format!("Wrong answer {}", n);
        if is_usable(&placeholder, correct, wrong) {
            wrong.push(placeholder);
        }
        n += 1;
    }
}

/// Puts the correct value at a uniformly random slot among the distractors.
pub fn assemble<R: Rng + ?Sized>(correct: &str, distractors: Vec<String>, rng: &mut R) -> Options {
    let mut values = distractors;
    let correct_index = rng.gen_range(0..=values.len());
    values.insert(correct_index, correct.to_string());
    Options {
        values,
        correct_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::testing::{movie, ScriptedSource};
    use crate::quiz::{Movie, QuizError, MISSING_VALUE};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn with_director(director: &str) -> Movie {
        Movie {
            director: director.to_string(),
            ..movie(director)
        }
    }

    #[tokio::test]
    async fn skips_duplicates_and_the_correct_value() {
        let source = ScriptedSource::new(vec![
            Ok(with_director("Nolan")),
            Ok(with_director("Scott")),
            Ok(with_director("Scott")),
            Ok(with_director(MISSING_VALUE)),
            Ok(with_director("Mann")),
            Ok(with_director("Bigelow")),
        ]);

        let wrong = collect_distractors(&source, Genre::Action, QuestionKind::Director, "Nolan", 12).await;

        assert_eq!(wrong, vec!["Scott", "Mann", "Bigelow"]);
        assert_eq!(source.calls(), 6);
    }

    #[tokio::test]
    async fn padded_answers_still_count_as_the_correct_value() {
        let source = ScriptedSource::new(vec![
            Ok(with_director("Nolan")),
            Ok(with_director("Scott")),
            Ok(with_director("Mann")),
            Ok(with_director("Bigelow")),
        ]);

        let wrong = collect_distractors(&source, Genre::Action, QuestionKind::Director, " Nolan ", 12).await;

        assert_eq!(wrong, vec!["Scott", "Mann", "Bigelow"]);
    }

    #[tokio::test]
    async fn fetch_error_falls_back_to_placeholders() {
        let source = ScriptedSource::new(vec![
            Ok(with_director("Scott")),
            Err(QuizError::Rejected("Request limit reached!".into())),
            Ok(with_director("Mann")),
        ]);

        let wrong = collect_distractors(&source, Genre::Drama, QuestionKind::Director, "Nolan", 12).await;

        assert_eq!(wrong, vec!["Scott", "Wrong answer 1", "Wrong answer 2"]);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn attempt_budget_bounds_the_loop() {
        let source = ScriptedSource::new((0..50).map(|_| Ok(with_director("Nolan"))).collect());

        let wrong = collect_distractors(&source, Genre::Drama, QuestionKind::Director, "Nolan", 5).await;

        assert_eq!(source.calls(), 5);
        assert_eq!(wrong.len(), DISTRACTOR_COUNT);
    }

    #[test]
    fn placeholders_never_collide_with_the_answer() {
        let mut wrong = vec!["Wrong answer 2".to_string()];
        fill_with_placeholders(&mut wrong, "Wrong answer 1");
        assert_eq!(wrong, vec!["Wrong answer 2", "Wrong answer 3", "Wrong answer 4"]);
    }

    #[test]
    fn correct_value_appears_exactly_once() {
        let mut rng = StdRng::seed_from_u64(11);
        let distractors = vec!["b".to_string(), "c".to_string(), "d".to_string()];
        for _ in 0..100 {
            let options = assemble("a", distractors.clone(), &mut rng);
            assert_eq!(options.values.len(), 4);
            assert_eq!(options.values.iter().filter(|v| *v == "a").count(), 1);
            assert_eq!(options.correct(), "a");
        }
    }

    #[test]
    fn correct_position_is_spread_over_all_slots() {
        let mut rng = StdRng::seed_from_u64(5);
        let distractors = vec!["b".to_string(), "c".to_string(), "d".to_string()];
        let mut hits = [0usize; 4];
        for _ in 0..4000 {
            hits[assemble("a", distractors.clone(), &mut rng).correct_index] += 1;
        }
        // Each slot should land near 1000.
        for count in hits {
            assert!((800..1200).contains(&count), "skewed slots: {:?}", hits);
        }
    }
}
