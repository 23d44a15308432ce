//! Question distribution
//!
//! Every player answers two distinct prompts and every prompt that enters the
//! quiz pool is answered by exactly two distinct players. The assignment is a
//! randomized greedy pass followed by a local repair whenever the greedy step
//! runs out of candidates:
//!
//! 1. Prompts are shuffled and player `i` gets `prompts[i % M]` as primary.
//! 2. Players are shuffled; at walk step `i` the prompt `prompts[i % M]` goes
//!    as secondary to a random player whose primary differs and who has no
//!    secondary yet.
//! 3. If nobody qualifies, the stuck player (primary equals the prompt, no
//!    secondary) swaps primaries with a random donor whose prompts both differ
//!    from the current one, then takes the current prompt as secondary.
//! 4. Per prompt, primary holders are zipped with secondary holders into
//!    two-player assignments.
//!
//! Steps 1 and 2 hand out each prompt equally often as primary and as
//! secondary, and the swap preserves both counts. With `M >= 3` and `N >= 3` a
//! donor always exists. With `M == 2` and odd `N` the problem has no solution,
//! so a bounded number of reshuffled attempts ends in `Unsatisfiable`.

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

use crate::types::{AnswerRef, AnswerSlot, PlayerId, Prompt, PromptAssignment};

pub const MIN_PLAYERS: usize = 3;
pub const MIN_PROMPTS: usize = 2;
const MAX_ATTEMPTS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignError {
    #[error("At least 3 players are needed, got {0}")]
    TooFewPlayers(usize),

    #[error("At least 2 prompts are needed, got {0}")]
    NotEnoughPrompts(usize),

    #[error("No valid assignment of {prompts} prompts to {players} players")]
    Unsatisfiable { players: usize, prompts: usize },
}

/// Result of a successful distribution
#[derive(Debug, Clone)]
pub struct Distribution {
    /// `[first, second]` prompts per player, in input order
    pub player_prompts: Vec<(PlayerId, [Prompt; 2])>,
    /// One entry per answering pair, in shuffled prompt order
    pub assignments: Vec<PromptAssignment>,
}

/// Prompt indices held by one player
#[derive(Debug, Clone, Copy)]
struct Binding {
    primary: usize,
    secondary: Option<usize>,
}

pub fn assign_prompts<R: Rng + ?Sized>(
    players: &[PlayerId],
    prompts: &[Prompt],
    rng: &mut R,
) -> Result<Distribution, AssignError> {
    if players.len() < MIN_PLAYERS {
        return Err(AssignError::TooFewPlayers(players.len()));
    }
    if prompts.len() < MIN_PROMPTS {
        return Err(AssignError::NotEnoughPrompts(prompts.len()));
    }

    for attempt in 1..=MAX_ATTEMPTS {
        let mut shuffled = prompts.to_vec();
        shuffled.shuffle(rng);

        match distribute(players.len(), shuffled.len(), rng) {
            Some(pairs) if is_valid(&pairs, shuffled.len()) => {
                return Ok(build(players, &shuffled, &pairs));
            }
            _ => {
                tracing::debug!(
                    "Prompt assignment attempt {} failed for {} players / {} prompts",
                    attempt,
                    players.len(),
                    prompts.len()
                );
            }
        }
    }

    Err(AssignError::Unsatisfiable {
        players: players.len(),
        prompts: prompts.len(),
    })
}

/// Greedy pass with repair, returns `(primary, secondary)` per player
fn distribute<R: Rng + ?Sized>(n: usize, m: usize, rng: &mut R) -> Option<Vec<(usize, usize)>> {
    let mut bindings: Vec<Binding> = (0..n)
        .map(|i| Binding {
            primary: i % m,
            secondary: None,
        })
        .collect();

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);

    for step in 0..n {
        let prompt = step % m;

        let candidates: Vec<usize> = order
            .iter()
            .copied()
            .filter(|&p| bindings[p].primary != prompt && bindings[p].secondary.is_none())
            .collect();

        if let Some(&chosen) = candidates.choose(rng) {
            bindings[chosen].secondary = Some(prompt);
            continue;
        }

        let stuck = order
            .iter()
            .copied()
            .find(|&p| bindings[p].primary == prompt && bindings[p].secondary.is_none())?;
        let donors: Vec<usize> = order
            .iter()
            .copied()
            .filter(|&p| {
                bindings[p].primary != prompt
                    && matches!(bindings[p].secondary, Some(s) if s != prompt)
            })
            .collect();
        let &donor = donors.choose(rng)?;

        bindings[stuck].primary = bindings[donor].primary;
        bindings[stuck].secondary = Some(prompt);
        bindings[donor].primary = prompt;
    }

    bindings
        .into_iter()
        .map(|b| b.secondary.map(|s| (b.primary, s)))
        .collect()
}

fn is_valid(pairs: &[(usize, usize)], m: usize) -> bool {
    let mut primaries = vec![0usize; m];
    let mut secondaries = vec![0usize; m];
    for &(primary, secondary) in pairs {
        if primary == secondary {
            return false;
        }
        primaries[primary] += 1;
        secondaries[secondary] += 1;
    }
    primaries == secondaries
}

fn build(players: &[PlayerId], prompts: &[Prompt], pairs: &[(usize, usize)]) -> Distribution {
    let player_prompts = players
        .iter()
        .zip(pairs)
        .map(|(id, &(primary, secondary))| {
            (
                id.clone(),
                [prompts[primary].clone(), prompts[secondary].clone()],
            )
        })
        .collect();

    let mut assignments = Vec::new();
    for (index, prompt) in prompts.iter().enumerate() {
        let firsts = pairs.iter().enumerate().filter(|(_, p)| p.0 == index);
        let seconds = pairs.iter().enumerate().filter(|(_, p)| p.1 == index);

        for ((a, _), (b, _)) in firsts.zip(seconds) {
            assignments.push(PromptAssignment {
                prompt: prompt.clone(),
                answerers: [
                    AnswerRef {
                        player_id: players[a].clone(),
                        slot: AnswerSlot::First,
                    },
                    AnswerRef {
                        player_id: players[b].clone(),
                        slot: AnswerSlot::Second,
                    },
                ],
            });
        }
    }

    Distribution {
        player_prompts,
        assignments,
    }
}
