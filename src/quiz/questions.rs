use rand::seq::IteratorRandom;
use rand::Rng;

/// Score level at which the player wins instead of getting another question.
pub const WIN_THRESHOLD: u32 = 14;

/// Question kinds, ordered from easiest to hardest.
/// Higher score levels unlock the later ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum QuestionKind {
    Director,
    Year,
    Genre,
    Actor,
}

impl QuestionKind {
    pub const ALL: [QuestionKind; 4] = [
        QuestionKind::Director,
        QuestionKind::Year,
        QuestionKind::Genre,
        QuestionKind::Actor,
    ];

    pub fn prompt(&self, title: &str) -> String {
        match self {
            QuestionKind::Director => format!("Who directed \"{}\"?", title),
            QuestionKind::Year => format!("When was \"{}\" released?", title),
            QuestionKind::Genre => format!("Which genre is \"{}\"?", title),
            QuestionKind::Actor => format!("Name one of the lead actors of \"{}\".", title),
        }
    }
}

/// Number of question kinds eligible at `score`.
pub fn difficulty(score: u32) -> usize {
    (score as usize + 1).min(QuestionKind::ALL.len())
}

pub fn is_winning(score: u32) -> bool {
    score >= WIN_THRESHOLD
}

/// Picks the next question kind, or `None` once the player has won.
pub fn select_question<R: Rng + ?Sized>(score: u32, rng: &mut R) -> Option<QuestionKind> {
    if is_winning(score) {
        return None;
    }
    let index = rng.gen_range(0..difficulty(score));
    Some(QuestionKind::ALL[index])
}

/// Picks uniformly among the kinds eligible at `score` that `answerable`
/// accepts. `None` once the player has won or when no eligible kind fits.
pub fn select_answerable<R, F>(score: u32, rng: &mut R, answerable: F) -> Option<QuestionKind>
where
    R: Rng + ?Sized,
    F: Fn(QuestionKind) -> bool,
{
    if is_winning(score) {
        return None;
    }
    QuestionKind::ALL[..difficulty(score)]
        .iter()
        .copied()
        .filter(|kind| answerable(*kind))
        .choose(rng)
}
