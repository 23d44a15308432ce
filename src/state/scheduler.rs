//! Phase scheduling: countdowns and the transitions they drive
//!
//! A session owns at most one countdown. The task only holds a weak handle and
//! the epoch it was started with, so a tick that arrives after the session was
//! destroyed or after its countdown was replaced does nothing.

use rand::Rng;
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::assign::assign_prompts;
use super::score::{leaderboard, score_round};
use super::session::{ActiveRound, Session};
use crate::error::{GameError, GameResult};
use crate::protocol::{QuizRoundInfo, ServerMessage};
use crate::types::*;

/// What a countdown does when it runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    EndAnswering,
    RevealRound,
}

pub(crate) struct Countdown {
    pub(crate) epoch: u64,
    task: JoinHandle<()>,
}

impl Session {
    /// Start the game: hand out prompts and open the Answering phase.
    /// On any error the session is left untouched.
    pub fn begin_answering<R: Rng>(
        &mut self,
        prompts: Vec<Prompt>,
        rng: &mut R,
    ) -> GameResult<()> {
        if self.started {
            return Err(GameError::GameAlreadyStarted(self.code.clone()));
        }

        let player_ids: Vec<PlayerId> = self.players.iter().map(|p| p.id.clone()).collect();
        let distribution = assign_prompts(&player_ids, &prompts, rng)?;

        for (player_id, pair) in distribution.player_prompts {
            if let Some(player) = self.player_mut(&player_id) {
                player.prompts = Some(pair);
            }
        }
        self.quiz_pool = distribution.assignments;
        self.started = true;
        self.phase = GamePhase::Answering;

        tracing::info!(
            "Room {}: game started with {} players and {} prompt assignments",
            self.code,
            self.players.len(),
            self.quiz_pool.len()
        );

        self.emit(Recipient::Players, ServerMessage::GameStartedAsPlayer);
        for player in &self.players {
            if let Some([first, second]) = &player.prompts {
                self.emit(
                    Recipient::Player(player.id.clone()),
                    ServerMessage::PromptsAssigned {
                        prompt1: first.clone(),
                        prompt2: second.clone(),
                    },
                );
            }
        }
        self.emit_phase_changed();
        let (answered, total) = self.answers_progress();
        self.emit(
            Recipient::Host,
            ServerMessage::AnswersProgress { answered, total },
        );

        self.start_countdown(self.config.answering_seconds, Expiry::EndAnswering);
        Ok(())
    }

    /// Answering -> Intermission. Assignments with a missing answer are dropped
    /// from the quiz pool.
    pub fn finish_answering(&mut self) {
        if self.phase != GamePhase::Answering || !self.started {
            return;
        }
        self.cancel_countdown();

        let before = self.quiz_pool.len();
        let players = &self.players;
        self.quiz_pool.retain(|assignment| {
            assignment.answerers.iter().all(|answerer| {
                players
                    .iter()
                    .find(|p| p.id == answerer.player_id)
                    .is_some_and(|p| p.answers[answerer.slot.index()].is_some())
            })
        });
        if self.quiz_pool.len() < before {
            tracing::info!(
                "Room {}: dropped {} incomplete assignments",
                self.code,
                before - self.quiz_pool.len()
            );
        }
        self.total_rounds = self.quiz_pool.len();

        self.phase = GamePhase::Intermission;
        self.emit_phase_changed();
    }

    /// Host-driven step out of Intermission or Reveal
    pub fn advance<R: Rng>(&mut self, rng: &mut R) -> GameResult<()> {
        match self.phase {
            GamePhase::Intermission | GamePhase::Reveal => {
                if self.quiz_pool.is_empty() {
                    self.finish_game();
                    Ok(())
                } else {
                    self.start_next_round(rng)
                }
            }
            phase => Err(GameError::InvalidPhase(phase)),
        }
    }

    /// Pick a random remaining assignment and open a Quizzing round on it
    pub fn start_next_round<R: Rng>(&mut self, rng: &mut R) -> GameResult<()> {
        self.cancel_countdown();

        if self.quiz_pool.is_empty() {
            self.finish_game();
            return Ok(());
        }
        let index = rng.random_range(0..self.quiz_pool.len());
        let assignment = self.quiz_pool.swap_remove(index);

        let mut round = match self.build_round(assignment) {
            Ok(round) => round,
            Err(e) => {
                tracing::error!("Room {}: {}; closing session", self.code, e);
                self.close();
                return Err(e);
            }
        };
        if rng.random_bool(0.5) {
            round.candidate_answers.swap(0, 1);
        }

        for player in self.players.iter_mut() {
            player.guess = None;
        }

        let info = QuizRoundInfo {
            total: self.total_rounds,
            remaining: self.quiz_pool.len(),
            prompt_text: round.assignment.prompt.text.clone(),
            subject_players: round.subject_names.clone(),
            candidate_answers: round.candidate_answers.clone(),
        };
        let subjects = round.subjects.clone();
        self.active_round = Some(round);
        self.round_started_at = Some(Instant::now());
        self.phase = GamePhase::Quizzing;

        tracing::info!(
            "Room {}: round {}/{} on \"{}\"",
            self.code,
            self.total_rounds - self.quiz_pool.len(),
            self.total_rounds,
            info.prompt_text
        );

        self.emit_phase_changed();
        self.emit(
            Recipient::Host,
            ServerMessage::QuizRound {
                round: info.clone(),
            },
        );
        for player in &self.players {
            let to = Recipient::Player(player.id.clone());
            if subjects.contains(&player.id) {
                self.emit(to, ServerMessage::QuizRoundYou {
                    round: info.clone(),
                });
            } else {
                self.emit(to, ServerMessage::QuizRound {
                    round: info.clone(),
                });
            }
        }

        self.start_countdown(self.config.quiz_seconds, Expiry::RevealRound);

        // Nobody left who could guess
        if self.all_guessed() {
            self.reveal_round();
        }
        Ok(())
    }

    fn build_round(&self, assignment: PromptAssignment) -> GameResult<ActiveRound> {
        let [first, second] = &assignment.answerers;
        if first.player_id == second.player_id {
            return Err(GameError::Invariant(format!(
                "round on \"{}\" has a single subject",
                assignment.prompt.text
            )));
        }

        let lookup = |answerer: &AnswerRef| -> GameResult<(String, String)> {
            let player = self.player(&answerer.player_id).ok_or_else(|| {
                GameError::Invariant(format!("subject {} is not in the room", answerer.player_id))
            })?;
            let answer = player.answers[answerer.slot.index()].clone().ok_or_else(|| {
                GameError::Invariant(format!("subject {} has no answer", player.name))
            })?;
            Ok((player.name.clone(), answer))
        };
        let (first_name, first_answer) = lookup(first)?;
        let (second_name, second_answer) = lookup(second)?;

        Ok(ActiveRound {
            subjects: [first.player_id.clone(), second.player_id.clone()],
            subject_names: [first_name, second_name],
            true_answers: [first_answer.clone(), second_answer.clone()],
            candidate_answers: [first_answer, second_answer],
            assignment,
        })
    }

    /// Quizzing -> Reveal: score guesses and publish the results
    pub fn reveal_round(&mut self) {
        if self.phase != GamePhase::Quizzing {
            return;
        }
        self.cancel_countdown();

        let Some(round) = self.active_round.clone() else {
            tracing::error!("Room {}: quizzing without an active round", self.code);
            self.close();
            return;
        };

        let round_length = self.config.quiz_duration();
        let tally = score_round(
            &mut self.players,
            &round.subjects,
            &round.true_answers,
            round_length,
        );
        self.phase = GamePhase::Reveal;

        tracing::info!(
            "Room {}: {}/{} guessed correctly",
            self.code,
            tally.correct_count,
            tally.total
        );

        self.emit_phase_changed();
        for (player_id, correct) in &tally.outcomes {
            self.emit(
                Recipient::Player(player_id.clone()),
                ServerMessage::GuessCorrectness { correct: *correct },
            );
        }
        self.emit(
            Recipient::Everyone,
            ServerMessage::RoundRevealed {
                total: tally.total,
                correct_count: tally.correct_count,
                subject_players: round.subject_names,
                true_answers: round.true_answers,
                top_five: leaderboard(&self.players, self.config.leaderboard_size),
            },
        );
    }

    /// Enter the terminal phase
    pub fn finish_game(&mut self) {
        if self.phase == GamePhase::Final {
            return;
        }
        self.cancel_countdown();
        self.active_round = None;
        self.round_started_at = None;
        self.phase = GamePhase::Final;

        tracing::info!("Room {}: game over", self.code);
        self.emit_phase_changed();
        self.emit(
            Recipient::Everyone,
            ServerMessage::FinalLeaderboard {
                top_five: leaderboard(&self.players, self.config.leaderboard_size),
            },
        );
    }

    /// Stop all scheduled work; later timer ticks become no-ops
    pub fn close(&mut self) {
        self.cancel_countdown();
        self.closed = true;
    }

    fn emit_phase_changed(&self) {
        self.emit(
            Recipient::Everyone,
            ServerMessage::PhaseChanged {
                phase: self.phase,
                phase_no: self.phase.number(),
                server_now: chrono::Utc::now().to_rfc3339(),
            },
        );
    }

    /// Replace the running countdown with a fresh one of `seconds`
    fn start_countdown(&mut self, seconds: u32, expiry: Expiry) {
        self.cancel_countdown();
        let seconds = seconds.max(1);

        self.countdown_epoch += 1;
        let epoch = self.countdown_epoch;
        self.emit(
            Recipient::Everyone,
            ServerMessage::TimeRemaining { seconds },
        );

        let task = tokio::spawn(run_countdown(self.this.clone(), epoch, seconds, expiry));
        self.countdown = Some(Countdown { epoch, task });
    }

    /// Idempotent
    fn cancel_countdown(&mut self) {
        if let Some(countdown) = self.countdown.take() {
            countdown.task.abort();
        }
    }

    pub fn has_countdown(&self) -> bool {
        self.countdown.is_some()
    }

    fn owns_countdown(&self, epoch: u64) -> bool {
        self.countdown.as_ref().is_some_and(|c| c.epoch == epoch)
    }

    fn on_countdown_expired(&mut self, expiry: Expiry) {
        match (expiry, self.phase) {
            (Expiry::EndAnswering, GamePhase::Answering) => self.finish_answering(),
            (Expiry::RevealRound, GamePhase::Quizzing) => self.reveal_round(),
            (expiry, phase) => {
                tracing::debug!(
                    "Room {}: ignoring {:?} countdown in {:?}",
                    self.code,
                    expiry,
                    phase
                );
            }
        }
    }
}

async fn run_countdown(
    session: Weak<Mutex<Session>>,
    epoch: u64,
    seconds: u32,
    expiry: Expiry,
) {
    let tick = Duration::from_secs(1);
    let mut ticker = tokio::time::interval_at(Instant::now() + tick, tick);
    let mut remaining = seconds;

    while remaining > 0 {
        ticker.tick().await;

        let Some(handle) = session.upgrade() else {
            tracing::debug!("Countdown outlived its session");
            return;
        };
        let mut guard = handle.lock().await;
        if guard.closed || !guard.owns_countdown(epoch) {
            return;
        }

        remaining -= 1;
        guard.emit(
            Recipient::Everyone,
            ServerMessage::TimeRemaining { seconds: remaining },
        );

        if remaining == 0 {
            // Detach our own handle so the transition's cancel doesn't abort us
            guard.countdown.take();
            guard.on_countdown_expired(expiry);
        }
    }
}
