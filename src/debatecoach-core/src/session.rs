//! Debate sessions and the round state machine.
//!
//! A session moves through rounds 1..=4 in order. Each user submission
//! records exactly one round for the current position; `advance_round` then
//! moves forward, or marks the debate complete once round 4 is done.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::DebateError;
use crate::grading::{FinalGrading, RoundGrading};
use crate::rubric::{ROUND_COUNT, RoundType};

/// Which side of the resolution a debater argues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Pro,
    Con,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Pro => Side::Con,
            Side::Con => Side::Pro,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Pro => "pro",
            Side::Con => "con",
        }
    }

    /// How the side reads in a prompt.
    pub fn stance(self) -> &'static str {
        match self {
            Side::Pro => "IN FAVOR OF",
            Side::Con => "AGAINST",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = DebateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pro" => Ok(Side::Pro),
            "con" => Ok(Side::Con),
            other => Err(DebateError::Validation(format!(
                "Side must be 'pro' or 'con', got '{}'",
                other
            ))),
        }
    }
}

/// Whether a piece of AI output came from the model or the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Ai,
    Fallback,
}

/// One debate turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub id: String,
    pub round_number: u8,
    pub round_type: RoundType,
    pub user_response: Option<String>,
    pub ai_response: Option<String>,
    pub ai_response_source: Option<Source>,
    pub grading: Option<RoundGrading>,
    pub created_at: DateTime<Utc>,
}

/// Result of an `advance_round` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundAdvance {
    pub current_round: u8,
    pub is_complete: bool,
}

/// A complete debate between the user and the AI opponent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub topic: String,
    pub refined_topic: String,
    pub side: Side,
    pub current_round: u8,
    pub rounds: Vec<Round>,
    pub is_complete: bool,
    pub final_grading: Option<FinalGrading>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(topic: impl Into<String>, refined_topic: impl Into<String>, side: Side) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.into(),
            refined_topic: refined_topic.into(),
            side,
            current_round: 1,
            rounds: Vec::new(),
            is_complete: false,
            final_grading: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Type of the round currently in play.
    pub fn current_round_type(&self) -> RoundType {
        // current_round is held within 1..=4
        RoundType::from_number(self.current_round).unwrap_or(RoundType::Closing)
    }

    /// Side the AI argues.
    pub fn ai_side(&self) -> Side {
        self.side.opposite()
    }

    /// Bump `updated_at`, never moving it backwards.
    pub fn touch(&mut self) {
        let now = Utc::now();
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    /// Record the round for the current position.
    pub fn add_round(&mut self, user_response: Option<String>) -> Result<&Round, DebateError> {
        if self.is_complete {
            return Err(DebateError::DebateComplete(self.id.clone()));
        }
        if self.rounds.len() >= usize::from(self.current_round) {
            return Err(DebateError::RoundAlreadyRecorded {
                round: self.current_round,
            });
        }

        let round = Round {
            id: Uuid::new_v4().to_string(),
            round_number: self.current_round,
            round_type: self.current_round_type(),
            user_response,
            ai_response: None,
            ai_response_source: None,
            grading: None,
            created_at: Utc::now(),
        };
        self.rounds.push(round);
        self.touch();

        let index = self.rounds.len() - 1;
        Ok(&self.rounds[index])
    }

    /// Record the user's response for the current position, filling a round
    /// that was opened empty or adding a new one.
    pub fn respond(&mut self, text: String) -> Result<&Round, DebateError> {
        if self.is_complete {
            return Err(DebateError::DebateComplete(self.id.clone()));
        }
        let open = self
            .rounds
            .iter()
            .position(|r| r.round_number == self.current_round && r.user_response.is_none());
        match open {
            Some(index) => {
                self.rounds[index].user_response = Some(text);
                self.touch();
                Ok(&self.rounds[index])
            }
            None => self.add_round(Some(text)),
        }
    }

    pub fn round(&self, round_id: &str) -> Result<&Round, DebateError> {
        self.rounds
            .iter()
            .find(|r| r.id == round_id)
            .ok_or_else(|| self.round_not_found(round_id))
    }

    pub fn round_mut(&mut self, round_id: &str) -> Result<&mut Round, DebateError> {
        let missing = self.round_not_found(round_id);
        self.rounds
            .iter_mut()
            .find(|r| r.id == round_id)
            .ok_or(missing)
    }

    fn round_not_found(&self, round_id: &str) -> DebateError {
        DebateError::RoundNotFound {
            session_id: self.id.clone(),
            round_id: round_id.to_string(),
        }
    }

    pub fn add_ai_response(
        &mut self,
        round_id: &str,
        text: impl Into<String>,
        source: Source,
    ) -> Result<&Round, DebateError> {
        let round = self.round_mut(round_id)?;
        round.ai_response = Some(text.into());
        round.ai_response_source = Some(source);
        self.touch();
        self.round(round_id)
    }

    /// Attach a grading to a round. A round is graded at most once.
    pub fn add_grading(
        &mut self,
        round_id: &str,
        grading: RoundGrading,
    ) -> Result<&Round, DebateError> {
        let round = self.round_mut(round_id)?;
        if round.grading.is_some() {
            return Err(DebateError::GradingAlreadyAttached {
                round_id: round_id.to_string(),
            });
        }
        if round.round_type != grading.round_type {
            return Err(DebateError::Validation(format!(
                "Cannot attach {} grading to a {} round",
                grading.round_type, round.round_type
            )));
        }
        round.grading = Some(grading);
        self.touch();
        self.round(round_id)
    }

    pub fn set_final_grading(&mut self, grading: FinalGrading) {
        self.final_grading = Some(grading);
        self.touch();
    }

    /// Move to the next round, or mark the debate complete after round 4.
    ///
    /// Calling this on a complete session changes nothing.
    pub fn advance_round(&mut self) -> RoundAdvance {
        if !self.is_complete {
            if self.current_round < ROUND_COUNT {
                self.current_round += 1;
            } else {
                self.is_complete = true;
            }
            self.touch();
        }
        RoundAdvance {
            current_round: self.current_round,
            is_complete: self.is_complete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::fallback_grading;

    fn session() -> Session {
        Session::new("Schools should require uniforms", "Schools should require uniforms.", Side::Pro)
    }

    #[test]
    fn test_new_session_starts_at_round_one() {
        let s = session();
        assert_eq!(s.current_round, 1);
        assert!(s.rounds.is_empty());
        assert!(!s.is_complete);
        assert!(s.final_grading.is_none());
        assert!(s.updated_at >= s.created_at);
        assert_eq!(s.ai_side(), Side::Con);
    }

    #[test]
    fn test_round_types_follow_position() {
        let mut s = session();
        for expected in RoundType::ALL {
            let round = s.add_round(Some("text".into())).unwrap();
            assert_eq!(round.round_type, expected);
            assert_eq!(round.round_number, expected.number());
            s.advance_round();
        }
        assert!(s.is_complete);
        assert_eq!(s.rounds.len(), 4);
    }

    #[test]
    fn test_one_round_per_position() {
        let mut s = session();
        s.add_round(None).unwrap();
        let err = s.add_round(None).unwrap_err();
        assert!(matches!(err, DebateError::RoundAlreadyRecorded { round: 1 }));
        assert!(s.rounds.len() <= usize::from(s.current_round));
    }

    #[test]
    fn test_respond_fills_an_empty_round() {
        let mut s = session();
        let opened = s.add_round(None).unwrap().id.clone();
        let filled = s.respond("Uniforms reduce bullying.".into()).unwrap();
        assert_eq!(filled.id, opened);
        assert_eq!(filled.user_response.as_deref(), Some("Uniforms reduce bullying."));
        assert_eq!(s.rounds.len(), 1);

        let err = s.respond("Again.".into()).unwrap_err();
        assert!(matches!(err, DebateError::RoundAlreadyRecorded { round: 1 }));
    }

    #[test]
    fn test_respond_after_skipped_position() {
        let mut s = session();
        s.advance_round();
        let round = s.respond("Cross-examination answer.".into()).unwrap();
        assert_eq!(round.round_number, 2);
        assert_eq!(round.round_type, RoundType::CrossEx);
    }

    #[test]
    fn test_advance_is_monotonic_and_idempotent_when_complete() {
        let mut s = session();
        let mut last = s.current_round;
        for _ in 0..10 {
            let was_complete = s.is_complete;
            let advance = s.advance_round();
            assert!(advance.current_round >= last);
            assert!((1..=4).contains(&advance.current_round));
            if was_complete {
                assert!(advance.is_complete);
            }
            last = advance.current_round;
        }
        assert_eq!(s.current_round, 4);
        assert!(s.is_complete);

        let err = s.add_round(Some("late".into())).unwrap_err();
        assert!(matches!(err, DebateError::DebateComplete(_)));
        assert!(s.rounds.is_empty());
    }

    #[test]
    fn test_grading_is_attached_once() {
        let mut s = session();
        let id = s.add_round(Some("text".into())).unwrap().id.clone();
        s.add_grading(&id, fallback_grading(RoundType::Constructive)).unwrap();
        let err = s
            .add_grading(&id, fallback_grading(RoundType::Constructive))
            .unwrap_err();
        assert!(matches!(err, DebateError::GradingAlreadyAttached { .. }));
    }

    #[test]
    fn test_grading_type_must_match_round() {
        let mut s = session();
        let id = s.add_round(None).unwrap().id.clone();
        assert!(s.add_grading(&id, fallback_grading(RoundType::Closing)).is_err());
    }

    #[test]
    fn test_unknown_round_is_not_found() {
        let mut s = session();
        let err = s.add_ai_response("nope", "text", Source::Ai).unwrap_err();
        assert!(matches!(err, DebateError::RoundNotFound { .. }));
    }

    #[test]
    fn test_updated_at_never_moves_backwards() {
        let mut s = session();
        let before = s.updated_at;
        s.add_round(None).unwrap();
        s.advance_round();
        assert!(s.updated_at >= before);
        assert!(s.updated_at >= s.created_at);
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!("PRO".parse::<Side>().unwrap(), Side::Pro);
        assert_eq!(" con ".parse::<Side>().unwrap(), Side::Con);
        assert!("maybe".parse::<Side>().is_err());
        assert_eq!(serde_json::to_string(&Side::Con).unwrap(), "\"con\"");
    }

    #[test]
    fn test_session_serializes_camel_case() {
        let value = serde_json::to_value(session()).unwrap();
        assert!(value.get("currentRound").is_some());
        assert!(value.get("refinedTopic").is_some());
        assert_eq!(value["isComplete"], serde_json::json!(false));
    }
}
