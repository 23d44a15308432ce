use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Become the host of a fresh room
    RequestRoom,
    JoinRoom {
        code: RoomCode,
        name: String,
    },
    // Host-only messages
    StartGame {
        code: RoomCode,
    },
    AdvancePhase,
    // Player messages
    SubmitAnswers {
        answer1: String,
        answer2: String,
    },
    /// Candidate answers ordered to match the round's subject players
    SubmitGuess {
        answers: [String; 2],
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    RoomCreated {
        code: RoomCode,
    },
    /// Sent to the joiner with the names already in the room
    JoinAccepted {
        code: RoomCode,
        players: Vec<String>,
    },
    RoomNotFound {
        code: RoomCode,
    },
    PlayerJoined {
        name: String,
    },
    GameStartedAsHost,
    GameStartedAsPlayer,
    PromptsAssigned {
        prompt1: Prompt,
        prompt2: Prompt,
    },
    /// Host-only: how many players have handed in both answers
    AnswersProgress {
        answered: usize,
        total: usize,
    },
    PhaseChanged {
        phase: GamePhase,
        phase_no: u8,
        server_now: String,
    },
    TimeRemaining {
        seconds: u32,
    },
    /// Sent to the host and every player who may guess this round
    QuizRound {
        round: QuizRoundInfo,
    },
    /// Sent to the two players whose answers are being guessed
    QuizRoundYou {
        round: QuizRoundInfo,
    },
    GuessCorrectness {
        correct: bool,
    },
    RoundRevealed {
        total: usize,
        correct_count: usize,
        subject_players: [String; 2],
        true_answers: [String; 2],
        top_five: Vec<LeaderboardEntry>,
    },
    FinalLeaderboard {
        top_five: Vec<LeaderboardEntry>,
    },
    Error {
        code: String,
        msg: String,
    },
}

/// Public view of a quiz round (answer order does not reveal the mapping)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizRoundInfo {
    pub total: usize,
    pub remaining: usize,
    pub prompt_text: String,
    pub subject_players: [String; 2],
    pub candidate_answers: [String; 2],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_tags() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"join_room","code":"ABCD","name":"Ann"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::JoinRoom {
                code: "ABCD".to_string(),
                name: "Ann".to_string()
            }
        );

        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"submit_guess","answers":["a","b"]}"#).unwrap();
        assert!(matches!(msg, ClientMessage::SubmitGuess { .. }));
    }

    #[test]
    fn test_guess_requires_two_answers() {
        let result =
            serde_json::from_str::<ClientMessage>(r#"{"t":"submit_guess","answers":["a"]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_phase_changed_serialization() {
        let json = serde_json::to_value(ServerMessage::PhaseChanged {
            phase: GamePhase::Quizzing,
            phase_no: 3,
            server_now: "now".to_string(),
        })
        .unwrap();
        assert_eq!(json["t"], "phase_changed");
        assert_eq!(json["phase"], "QUIZZING");
        assert_eq!(json["phase_no"], 3);
    }
}
