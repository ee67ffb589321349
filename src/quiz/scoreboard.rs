use crate::quiz::questions::WIN_THRESHOLD;

/// Renders the score ladder from the top level down to zero,
/// marking the level the player stands on.
pub fn render(score: u32) -> String {
    let current = score.min(WIN_THRESHOLD);
    (0..=WIN_THRESHOLD)
        .rev()
        .map(|level| {
            let label = if level == WIN_THRESHOLD {
                format!("{:>2} 🏆", level)
            } else {
                format!("{:>2}", level)
            };
            if level == current {
                format!("▶ <b>{}</b>", label)
            } else {
                format!("   {}", label)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_one_line_per_level() {
        assert_eq!(render(0).lines().count(), WIN_THRESHOLD as usize + 1);
    }

    #[test]
    fn marks_exactly_the_current_level() {
        let ladder = render(3);
        let marked: Vec<_> = ladder.lines().filter(|l| l.starts_with('▶')).collect();
        assert_eq!(marked, vec!["▶ <b> 3</b>"]);
    }

    #[test]
    fn top_of_the_ladder_is_the_win() {
        let ladder = render(WIN_THRESHOLD);
        assert!(ladder.lines().next().unwrap().starts_with("▶ <b>14 🏆"));
        assert!(ladder.lines().last().unwrap().ends_with(" 0"));
    }
}
