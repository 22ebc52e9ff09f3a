//! Debate orchestration logic.
//!
//! Resolves sessions by id, enforces the word cap, drives the round state
//! machine, and calls the AI adapter for counter-arguments and grading.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use std::time::Duration;

use crate::ai::{AiOutcome, ArgumentRequest, DebateAi, GradeRequest, TopicCheck};
use crate::config::Config;
use crate::error::DebateError;
use crate::grading::{FinalGrading, RoundGrading, aggregate, fallback_grading};
use crate::logging::{DebateLogger, NullLogger};
use crate::rubric::RoundType;
use crate::session::{Round, RoundAdvance, Session, Side, Source};
use crate::store::SessionStore;
use crate::word_cap::check_word_cap;

/// Default maximum words per argument.
pub const DEFAULT_WORD_CAP: usize = 180;

/// Result of a full round submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub round: Round,
    pub session: Session,
}

/// Runs debates between users and the AI opponent.
///
/// Mutations of one session are serialized by a per-session lock, so two
/// concurrent submissions land in consecutive rounds instead of racing.
pub struct DebateOrchestrator {
    store: Arc<dyn SessionStore>,
    ai: DebateAi,
    word_cap: usize,
    session_ttl: Option<Duration>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    logger: Arc<dyn DebateLogger>,
}

/// Held for the duration of one session operation.
struct SessionGuard<'a> {
    locks: &'a Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    id: String,
    lock: Arc<tokio::sync::Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.lock().unwrap_or_else(|poison| poison.into_inner());
        // Only the map and this guard still hold the lock: nobody is waiting.
        let idle = locks
            .get(&self.id)
            .is_some_and(|held| Arc::ptr_eq(held, &self.lock) && Arc::strong_count(held) == 2);
        if idle {
            locks.remove(&self.id);
        }
    }
}

impl DebateOrchestrator {
    pub fn new(store: Arc<dyn SessionStore>, ai: DebateAi) -> Self {
        Self {
            store,
            ai,
            word_cap: DEFAULT_WORD_CAP,
            session_ttl: None,
            locks: Mutex::new(HashMap::new()),
            logger: Arc::new(NullLogger),
        }
    }

    /// Build from config with the given store and logger.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn SessionStore>,
        logger: Arc<dyn DebateLogger>,
    ) -> Result<Self, DebateError> {
        config.validate()?;
        let ai = DebateAi::from_config(config)?.with_logger(logger.clone());
        let mut orchestrator = Self::new(store, ai)
            .with_word_cap(config.debate.word_cap)
            .with_logger(logger);
        if let Some(secs) = config.debate.session_ttl_secs {
            orchestrator = orchestrator.with_session_ttl(Duration::from_secs(secs));
        }
        Ok(orchestrator)
    }

    /// Set the word cap. Zero is treated as one.
    pub fn with_word_cap(mut self, word_cap: usize) -> Self {
        self.word_cap = word_cap.max(1);
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = Some(ttl);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn DebateLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn word_cap(&self) -> usize {
        self.word_cap
    }

    pub fn ai(&self) -> &DebateAi {
        &self.ai
    }

    /// Take the lock for one session. The map entry goes away with the last holder.
    async fn acquire(&self, id: &str) -> SessionGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poison| poison.into_inner());
            locks.entry(id.to_string()).or_default().clone()
        };
        let guard = lock.clone().lock_owned().await;
        SessionGuard {
            locks: &self.locks,
            id: id.to_string(),
            lock,
            guard: Some(guard),
        }
    }

    async fn load(&self, id: &str) -> Result<Session, DebateError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| DebateError::SessionNotFound(id.to_string()))
    }

    /// Load, change, and save one session while holding its lock.
    async fn mutate<T>(
        &self,
        id: &str,
        change: impl FnOnce(&mut Session) -> Result<T, DebateError>,
    ) -> Result<T, DebateError> {
        let _guard = self.acquire(id).await;

        let mut session = self.load(id).await?;
        let value = change(&mut session)?;
        self.store.update(session).await?;
        Ok(value)
    }

    async fn expire_idle(&self) -> Result<(), DebateError> {
        let Some(ttl) = self.session_ttl else {
            return Ok(());
        };
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| DebateError::ConfigError(format!("Invalid session TTL: {}", e)))?;
        let removed = self.store.expire(Utc::now() - ttl).await?;
        if removed > 0 {
            self.logger
                .log("session.expired", &format!("{} idle sessions removed", removed));
        }
        Ok(())
    }

    fn validate_response(&self, text: &str) -> Result<(), DebateError> {
        if text.trim().is_empty() {
            return Err(DebateError::Validation("Response text is required".to_string()));
        }
        let check = check_word_cap(text, self.word_cap);
        if !check.success {
            return Err(DebateError::WordCapExceeded {
                limit: check.limit,
                actual: check.word_count,
            });
        }
        Ok(())
    }

    /// Ask the AI judge whether a topic is debatable.
    pub async fn validate_topic(&self, topic: &str) -> Result<AiOutcome<TopicCheck>, DebateError> {
        if topic.trim().is_empty() {
            return Err(DebateError::Validation("Topic is required".to_string()));
        }
        Ok(self.ai.validate_topic(topic).await)
    }

    /// Start a debate. `refined_topic` defaults to the topic itself.
    pub async fn create_session(
        &self,
        topic: &str,
        refined_topic: Option<&str>,
        side: Side,
    ) -> Result<Session, DebateError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(DebateError::Validation("Topic is required".to_string()));
        }
        let refined = refined_topic
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(topic);

        self.expire_idle().await?;

        let session = Session::new(topic, refined, side);
        self.store.insert(session.clone()).await?;
        self.logger.log(
            "session.created",
            &format!("{} side={} topic={:?}", session.id, side, refined),
        );
        Ok(session)
    }

    pub async fn get_session(&self, id: &str) -> Result<Session, DebateError> {
        self.load(id).await
    }

    /// The session with the AI's latest response already attached.
    pub async fn get_ai_response(&self, id: &str) -> Result<Session, DebateError> {
        self.load(id).await
    }

    /// Record an empty round for the current position.
    pub async fn add_round(&self, id: &str) -> Result<Round, DebateError> {
        self.mutate(id, |session| session.add_round(None).cloned())
            .await
    }

    /// Validate and record the user's response for the current round without advancing.
    pub async fn submit_user_response(&self, id: &str, text: &str) -> Result<Round, DebateError> {
        self.mutate(id, |session| {
            if session.is_complete {
                return Err(DebateError::DebateComplete(session.id.clone()));
            }
            self.validate_response(text)?;
            session.respond(text.trim().to_string()).cloned()
        })
        .await
    }

    pub async fn add_ai_response(
        &self,
        id: &str,
        round_id: &str,
        text: &str,
        source: Source,
    ) -> Result<Round, DebateError> {
        self.mutate(id, |session| {
            session.add_ai_response(round_id, text, source).cloned()
        })
        .await
    }

    pub async fn add_grading(
        &self,
        id: &str,
        round_id: &str,
        grading: RoundGrading,
    ) -> Result<Round, DebateError> {
        self.mutate(id, |session| session.add_grading(round_id, grading).cloned())
            .await
    }

    pub async fn set_final_grading(
        &self,
        id: &str,
        grading: FinalGrading,
    ) -> Result<Session, DebateError> {
        self.mutate(id, |session| {
            session.set_final_grading(grading);
            Ok(session.clone())
        })
        .await
    }

    pub async fn advance_round(&self, id: &str) -> Result<RoundAdvance, DebateError> {
        self.mutate(id, |session| Ok(session.advance_round())).await
    }

    /// Play one full turn: record the user's response, answer it (or grade the
    /// whole debate after the closing round), and advance.
    pub async fn submit_round(&self, id: &str, text: &str) -> Result<SubmitOutcome, DebateError> {
        let _guard = self.acquire(id).await;

        let mut session = self.load(id).await?;
        if session.is_complete {
            return Err(DebateError::DebateComplete(session.id));
        }
        if let Err(e) = self.validate_response(text) {
            self.logger.log_error("round.rejected", &e);
            return Err(e);
        }

        let (round_id, round_type) = {
            let round = session.respond(text.trim().to_string())?;
            (round.id.clone(), round.round_type)
        };
        self.logger.log(
            "round.submitted",
            &format!("{} round={} ({})", session.id, round_type.number(), round_type),
        );

        if round_type == RoundType::Closing {
            self.grade_debate(&mut session).await?;
        } else {
            let request = ArgumentRequest {
                topic: session.refined_topic.clone(),
                side: session.ai_side(),
                round_type,
                prior_argument: Some(text.trim().to_string()),
                word_limit: self.word_cap,
            };
            let outcome = self.ai.generate_argument(&request).await;
            session.add_ai_response(&round_id, outcome.value, outcome.source)?;
        }

        let advance = session.advance_round();
        self.store.update(session.clone()).await?;

        if advance.is_complete {
            let score = session
                .final_grading
                .as_ref()
                .map(|g| g.final_score)
                .unwrap_or_default();
            self.logger.log(
                "debate.completed",
                &format!("{} final_score={}", session.id, score),
            );
        }

        let round = session.round(&round_id)?.clone();
        Ok(SubmitOutcome { round, session })
    }

    /// Grade every ungraded round and attach the final grading.
    async fn grade_debate(&self, session: &mut Session) -> Result<(), DebateError> {
        let pending: Vec<(String, GradeRequest)> = session
            .rounds
            .iter()
            .filter(|r| r.grading.is_none())
            .map(|r| {
                let request = GradeRequest {
                    round_type: r.round_type,
                    topic: session.refined_topic.clone(),
                    side: session.side,
                    user_response: r.user_response.clone().unwrap_or_default(),
                    ai_response: r.ai_response.clone(),
                };
                (r.id.clone(), request)
            })
            .collect();

        for (round_id, request) in &pending {
            let outcome = self.ai.grade_round(request).await;
            session.add_grading(round_id, outcome.value)?;
        }

        let mut gradings: Vec<RoundGrading> = session
            .rounds
            .iter()
            .filter_map(|r| r.grading.clone())
            .collect();
        for round_type in RoundType::ALL {
            if !gradings.iter().any(|g| g.round_type == round_type) {
                self.logger.log(
                    "round.skipped",
                    &format!("{} {} round was never played", session.id, round_type),
                );
                gradings.push(fallback_grading(round_type));
            }
        }
        let final_grading = aggregate(&gradings)?;
        session.set_final_grading(final_grading);
        Ok(())
    }
}
