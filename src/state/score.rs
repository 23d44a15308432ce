use std::time::Duration;

use crate::types::*;

/// Outcome of scoring one quiz round
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundTally {
    /// Number of guesses handed in
    pub total: usize,
    pub correct_count: usize,
    /// Correctness for every non-subject player (missing guesses count as wrong)
    pub outcomes: Vec<(PlayerId, bool)>,
}

/// A guess is correct only if it matches the true answers verbatim and in subject order
pub fn is_correct_guess(guess: &[String; 2], truth: &[String; 2]) -> bool {
    guess == truth
}

/// Points for a correct guess: 2.0 when instant, falling linearly to 0 at the round timeout
pub fn score_delta(round: Duration, elapsed: Duration) -> f64 {
    let round_ms = round.as_millis() as f64;
    if round_ms <= 0.0 {
        return 0.0;
    }
    let elapsed_ms = elapsed.as_millis() as f64;
    ((round_ms - elapsed_ms) / (round_ms / 2.0)).max(0.0)
}

/// Evaluate every non-subject player's guess and add the deltas to their scores
pub fn score_round(
    players: &mut [Player],
    subjects: &[PlayerId; 2],
    truth: &[String; 2],
    round: Duration,
) -> RoundTally {
    let mut tally = RoundTally::default();

    for player in players.iter_mut().filter(|p| !subjects.contains(&p.id)) {
        let correct = match &player.guess {
            Some(guess) => {
                tally.total += 1;
                let correct = is_correct_guess(&guess.answers, truth);
                if correct {
                    tally.correct_count += 1;
                    let delta = score_delta(round, guess.elapsed);
                    player.score = Some(player.score.unwrap_or(0.0) + delta);
                }
                correct
            }
            None => false,
        };
        tally.outcomes.push((player.id.clone(), correct));
    }

    tally
}

/// Players with a positive score, best first, truncated to `size`
pub fn leaderboard(players: &[Player], size: usize) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = players
        .iter()
        .filter_map(|p| match p.score {
            Some(score) if score > 0.0 => Some(LeaderboardEntry {
                name: p.name.clone(),
                score,
            }),
            _ => None,
        })
        .collect();

    entries.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    entries.truncate(size);
    entries
}
