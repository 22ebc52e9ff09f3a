//! DebateCoach Core Library
//!
//! Provides the four-round debate state machine, rubric scoring, and the
//! AI opponent/judge boundary with its deterministic fallbacks.

pub mod ai;
pub mod config;
pub mod error;
pub mod gibberish;
pub mod grading;
pub mod logging;
pub mod orchestrator;
pub mod parse;
pub mod rubric;
pub mod session;
pub mod store;
pub mod word_cap;

pub use ai::{AiOutcome, DebateAi, LlmClient, OpenAiClient, TopicCheck};
pub use config::{Config, default_config};
pub use error::{DebateError, ErrorKind};
pub use grading::{FinalGrading, RoundGrading};
pub use logging::{DebateLogger, TracingLogger};
pub use orchestrator::{DebateOrchestrator, SubmitOutcome};
pub use rubric::RoundType;
pub use session::{Round, Session, Side, Source};
pub use store::{InMemorySessionStore, SessionStore};
pub use word_cap::{WordCapCheck, check_word_cap};
