//! External AI boundary: topic validation, argument generation, and grading.
//!
//! Remote calls go through [`LlmClient`]. [`DebateAi`] wraps a client with
//! prompt building, strict parsing, a timeout, and deterministic fallbacks, so
//! every operation returns a usable value and never an error.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, LlmConfig, PromptsConfig, render_prompt};
use crate::error::DebateError;
use crate::gibberish::is_gibberish;
use crate::grading::{RoundGrading, fallback_grading};
use crate::logging::{DebateLogger, NullLogger};
use crate::parse::{ParseOutcome, parse_grading, parse_topic_check, sanitize_response};
use crate::rubric::{RoundType, rubric_for};
use crate::session::{Side, Source};
use crate::word_cap::{count_words, truncate_to_word_limit};

/// A chat-completion capability.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system: &str, user: &str, max_tokens: u32)
    -> Result<String, DebateError>;
}

/// [`LlmClient`] backed by an OpenAI-compatible API.
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Result<Self, DebateError> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| DebateError::ConfigError("OPENAI_API_KEY is not set".to_string()))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
            .build()
            .map_err(|e| {
                DebateError::ConfigError(format!("Failed to create HTTP client: {}", e))
            })?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&config.api_base);

        Ok(Self {
            client: Client::with_config(openai_config).with_http_client(http_client),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, DebateError> {
        let messages = vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: system.to_string().into(),
                name: None,
            }),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: user.to_string().into(),
                name: None,
            }),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_completion_tokens(max_tokens)
            .messages(messages)
            .build()?;

        let response = self.client.chat().create(request).await?;
        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| DebateError::AiUnavailable("response had no content".to_string()))
    }
}

/// Output of an AI operation, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiOutcome<T> {
    pub value: T,
    pub source: Source,
    /// Why the fallback was used.
    pub reason: Option<String>,
}

impl<T> AiOutcome<T> {
    fn ai(value: T) -> Self {
        Self {
            value,
            source: Source::Ai,
            reason: None,
        }
    }

    fn fallback(value: T, reason: impl Into<String>) -> Self {
        Self {
            value,
            source: Source::Fallback,
            reason: Some(reason.into()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == Source::Fallback
    }
}

/// Verdict on a proposed debate topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicCheck {
    pub is_valid: bool,
    pub refined_topic: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ArgumentRequest {
    pub topic: String,
    /// Side the AI argues.
    pub side: Side,
    pub round_type: RoundType,
    /// The user's argument to counter, if any.
    pub prior_argument: Option<String>,
    pub word_limit: usize,
}

#[derive(Debug, Clone)]
pub struct GradeRequest {
    pub round_type: RoundType,
    pub topic: String,
    /// The user's side.
    pub side: Side,
    pub user_response: String,
    pub ai_response: Option<String>,
}

/// AI opponent and judge with deterministic fallbacks.
pub struct DebateAi {
    client: Option<Arc<dyn LlmClient>>,
    prompts: PromptsConfig,
    timeout: Duration,
    argument_max_tokens: u32,
    grading_max_tokens: u32,
    logger: Arc<dyn DebateLogger>,
}

impl DebateAi {
    pub fn new(client: Option<Arc<dyn LlmClient>>, llm: &LlmConfig, prompts: PromptsConfig) -> Self {
        Self {
            client,
            prompts,
            timeout: Duration::from_secs(llm.timeout_secs),
            argument_max_tokens: llm.argument_max_tokens,
            grading_max_tokens: llm.grading_max_tokens,
            logger: Arc::new(NullLogger),
        }
    }

    /// Build from config, using the OpenAI client when an API key is present.
    pub fn from_config(config: &Config) -> Result<Self, DebateError> {
        let client: Option<Arc<dyn LlmClient>> = if config.llm.is_configured() {
            Some(Arc::new(OpenAiClient::new(&config.llm)?))
        } else {
            None
        };
        Ok(Self::new(client, &config.llm, config.prompts.clone()))
    }

    /// An adapter that never calls out and always uses fallbacks.
    pub fn fallback_only() -> Self {
        Self::new(None, &LlmConfig::default(), PromptsConfig::default())
    }

    pub fn with_logger(mut self, logger: Arc<dyn DebateLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    async fn call(&self, system: &str, user: &str, max_tokens: u32) -> Result<String, DebateError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| DebateError::AiUnavailable("no API key configured".to_string()))?;

        match tokio::time::timeout(self.timeout, client.complete(system, user, max_tokens)).await {
            Ok(result) => result,
            Err(_) => Err(DebateError::AiUnavailable(format!(
                "no response within {}s",
                self.timeout.as_secs_f32()
            ))),
        }
    }

    /// Check a topic and propose a cleaned-up resolution.
    pub async fn validate_topic(&self, topic: &str) -> AiOutcome<TopicCheck> {
        let topic = topic.trim();
        let response = match self.call(&self.prompts.topic, topic, 200).await {
            Ok(response) => response,
            Err(e) => {
                self.logger.log_error("ai.topic", &e);
                return AiOutcome::fallback(fallback_topic_check(topic), e.to_string());
            }
        };

        match parse_topic_check(&response) {
            ParseOutcome::Parsed(verdict) => AiOutcome::ai(TopicCheck {
                is_valid: verdict.valid,
                refined_topic: verdict
                    .refined_topic
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| topic.to_string()),
                reason: verdict.reason.unwrap_or_default(),
            }),
            ParseOutcome::ParseError(reason) => {
                self.logger.log_error("ai.topic.parse", &reason);
                AiOutcome::fallback(fallback_topic_check(topic), reason)
            }
        }
    }

    /// Produce the AI's argument for a round, always within the word limit.
    pub async fn generate_argument(&self, request: &ArgumentRequest) -> AiOutcome<String> {
        let limit = request.word_limit.to_string();
        let system = render_prompt(
            &self.prompts.arguer,
            &[
                ("topic", request.topic.as_str()),
                ("side", request.side.as_str()),
                ("stance", request.side.stance()),
                ("round_type", request.round_type.display_name()),
                ("instructions", request.round_type.instructions()),
                ("word_limit", limit.as_str()),
            ],
        );
        let user = match request.prior_argument.as_deref() {
            Some(prior) if !prior.trim().is_empty() => format!(
                "Your opponent argued:\n\"{}\"\n\nGive your {} response.",
                prior.trim(),
                request.round_type.display_name().to_lowercase()
            ),
            _ => format!(
                "Give your {} argument.",
                request.round_type.display_name().to_lowercase()
            ),
        };

        let reason = match self.call(&system, &user, self.argument_max_tokens).await {
            Ok(response) => {
                let cleaned = sanitize_response(&response);
                if count_words(&cleaned) > 0 {
                    return AiOutcome::ai(truncate_to_word_limit(&cleaned, request.word_limit));
                }
                "empty argument after sanitizing".to_string()
            }
            Err(e) => e.to_string(),
        };

        self.logger.log_error("ai.argument", &reason);
        AiOutcome::fallback(fallback_argument(request), reason)
    }

    /// Score one round against its rubric.
    pub async fn grade_round(&self, request: &GradeRequest) -> AiOutcome<RoundGrading> {
        let criteria = rubric_for(request.round_type)
            .iter()
            .map(|c| format!("- {} (weight {}): {}", c.name, c.weight, c.description))
            .collect::<Vec<_>>()
            .join("\n");
        let system = render_prompt(
            &self.prompts.judge,
            &[
                ("topic", request.topic.as_str()),
                ("side", request.side.as_str()),
                ("stance", request.side.stance()),
                ("round_type", request.round_type.display_name()),
                ("criteria", criteria.as_str()),
            ],
        );
        let user = format!(
            "STUDENT RESPONSE:\n{}\n\nOPPONENT RESPONSE:\n{}",
            request.user_response.trim(),
            request.ai_response.as_deref().unwrap_or("(none)")
        );

        let reason = match self.call(&system, &user, self.grading_max_tokens).await {
            Ok(response) => match parse_grading(&response, request.round_type) {
                ParseOutcome::Parsed(grading) => return AiOutcome::ai(grading),
                ParseOutcome::ParseError(reason) => reason,
            },
            Err(e) => e.to_string(),
        };

        self.logger.log_error("ai.grading", &reason);
        AiOutcome::fallback(fallback_grading(request.round_type), reason)
    }
}

fn fallback_topic_check(topic: &str) -> TopicCheck {
    let words = count_words(topic);
    if words < 3 {
        return TopicCheck {
            is_valid: false,
            refined_topic: topic.to_string(),
            reason: "Please enter a topic of at least three words.".to_string(),
        };
    }

    let mut refined = topic.split_whitespace().collect::<Vec<_>>().join(" ");
    if !refined.ends_with(['.', '!', '?']) {
        refined.push('.');
    }
    TopicCheck {
        is_valid: true,
        refined_topic: refined,
        reason: "Accepted without AI review.".to_string(),
    }
}

const PRO_ARGUMENTS: [&str; 4] = [
    "I stand in support of the resolution, \"{topic}\" The status quo leaves real problems unaddressed, and this change tackles them directly. It creates clear expectations, reduces the costs that fall hardest on those with the least, and has worked where it has been tried. The burden is on my opponent to show that these benefits are outweighed.",
    "My opponent has not explained who is harmed if we adopt this resolution, or why those harms are larger than the benefits. Can they name a concrete case where this policy made things worse? Until they do, the practical gains I described remain unanswered.",
    "My opponent's objections rest on worst-case assumptions rather than evidence. The concerns they raise can be handled through sensible implementation, and none of them erase the core benefit: fairer outcomes and clearer standards. My original case still stands.",
    "This debate comes down to whether we accept a known problem or try a proven remedy. I have shown that the benefits are concrete and the objections are manageable. Weighing the two, the case for \"{topic}\" is the stronger one.",
];

const CON_ARGUMENTS: [&str; 4] = [
    "I oppose the resolution, \"{topic}\" It treats a complicated issue as if one rule could fix it. The costs are real, they fall on people who had no say, and the promised benefits are uncertain. Good intentions are not enough to justify a sweeping change.",
    "My opponent assumes the benefits will appear automatically. What evidence shows this policy actually changes outcomes rather than just appearances? And who pays the costs when it does not work as promised?",
    "My opponent's case depends on best-case assumptions. The evidence they rely on is selective, and the downsides they wave away are exactly the ones that matter most to the people affected. Their rebuttal does not answer the cost or the loss of choice.",
    "The question is whether this change is worth its costs. I have shown the benefits are speculative while the burdens are certain. When we weigh them honestly, we should reject \"{topic}\"",
];

const PRO_CLARIFY: [&str; 2] = [
    "I could not find a clear argument in my opponent's last response, so let me restate why I support \"{topic}\" The change addresses a real problem, its benefits are practical, and no objection has yet shown otherwise.",
    "My opponent's response did not engage with the substance of the debate. My case for \"{topic}\" therefore stands unanswered: the benefits are concrete and the risks manageable.",
];

const CON_CLARIFY: [&str; 2] = [
    "I could not find a clear argument in my opponent's last response, so let me restate why I oppose \"{topic}\" The costs are certain, the benefits are speculative, and nothing yet offered changes that balance.",
    "My opponent's response did not engage with the substance of the debate. My case against \"{topic}\" therefore stands unanswered: the change is costly and its promised gains are unproven.",
];

/// Canned argument for when the model cannot be used.
pub fn fallback_argument(request: &ArgumentRequest) -> String {
    let index = usize::from(request.round_type.number() - 1);
    let degenerate = request
        .prior_argument
        .as_deref()
        .is_some_and(is_gibberish);

    let template = match (request.side, degenerate) {
        (Side::Pro, false) => PRO_ARGUMENTS[index],
        (Side::Con, false) => CON_ARGUMENTS[index],
        (Side::Pro, true) => PRO_CLARIFY[index % PRO_CLARIFY.len()],
        (Side::Con, true) => CON_CLARIFY[index % CON_CLARIFY.len()],
    };

    let text = template.replace("{topic}", request.topic.trim());
    truncate_to_word_limit(&text, request.word_limit)
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::logging::MemoryLogger;

    fn argument_request(prior: Option<&str>, word_limit: usize) -> ArgumentRequest {
        ArgumentRequest {
            topic: "Schools should require uniforms.".to_string(),
            side: Side::Con,
            round_type: RoundType::Constructive,
            prior_argument: prior.map(str::to_string),
            word_limit,
        }
    }

    fn grade_request(round_type: RoundType) -> GradeRequest {
        GradeRequest {
            round_type,
            topic: "Schools should require uniforms.".to_string(),
            side: Side::Pro,
            user_response: "Uniforms reduce bullying.".to_string(),
            ai_response: Some("They limit expression.".to_string()),
        }
    }

    #[tokio::test]
    async fn test_argument_from_model_is_sanitized_and_capped() {
        let llm = MockLlm::new(|_, _| {
            Ok("<think>plan</think>**Uniforms** stifle expression. They also cost families money every single year.".to_string())
        });
        let ai = adapter(llm.clone());
        let outcome = ai
            .generate_argument(&argument_request(Some("Uniforms are great for schools."), 5))
            .await;

        assert_eq!(outcome.source, Source::Ai);
        assert!(count_words(&outcome.value) <= 5);
        assert!(!outcome.value.contains('*'));
        assert!(!outcome.value.contains("plan"));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_argument_falls_back_when_unavailable() {
        let logger = MemoryLogger::new();
        let ai = adapter(MockLlm::failing()).with_logger(logger.clone());
        let outcome = ai.generate_argument(&argument_request(None, 180)).await;

        assert!(outcome.is_fallback());
        assert!(outcome.value.contains("Schools should require uniforms."));
        assert!(outcome.reason.unwrap().contains("connection refused"));
        assert!(logger.lines().iter().any(|l| l.starts_with("error ai.argument")));
    }

    #[tokio::test]
    async fn test_argument_falls_back_on_empty_output() {
        let ai = adapter(MockLlm::new(|_, _| Ok("<thinking>only thoughts</thinking>".to_string())));
        let outcome = ai.generate_argument(&argument_request(None, 180)).await;
        assert!(outcome.is_fallback());
    }

    #[tokio::test]
    async fn test_argument_timeout_counts_as_unavailable() {
        let ai = adapter(MockLlm::slow(Duration::from_secs(5), "too late"))
            .with_timeout(Duration::from_millis(20));
        let outcome = ai.generate_argument(&argument_request(None, 180)).await;
        assert!(outcome.is_fallback());
        assert!(outcome.reason.unwrap().contains("no response"));
    }

    #[tokio::test]
    async fn test_unconfigured_adapter_uses_fallbacks() {
        let ai = DebateAi::fallback_only();
        assert!(!ai.is_configured());
        assert!(ai.generate_argument(&argument_request(None, 180)).await.is_fallback());
        assert!(ai.grade_round(&grade_request(RoundType::Rebuttal)).await.is_fallback());
        assert!(ai.validate_topic("Schools should require uniforms").await.is_fallback());
    }

    #[test]
    fn test_fallback_argument_respects_side_and_input() {
        let sane = fallback_argument(&argument_request(Some("Uniforms help students focus in class."), 180));
        let mashed = fallback_argument(&argument_request(Some("asdfghjkl"), 180));
        assert!(sane.starts_with("I oppose"));
        assert!(mashed.starts_with("I could not find a clear argument"));

        let mut pro = argument_request(None, 180);
        pro.side = Side::Pro;
        assert!(fallback_argument(&pro).starts_with("I stand in support"));
    }

    #[test]
    fn test_fallback_argument_within_limit() {
        for limit in [1, 10, 25, 180] {
            for round_type in RoundType::ALL {
                let mut request = argument_request(Some("qqqqqq"), limit);
                request.round_type = round_type;
                assert!(count_words(&fallback_argument(&request)) <= limit);
                request.prior_argument = None;
                assert!(count_words(&fallback_argument(&request)) <= limit);
            }
        }
    }

    #[tokio::test]
    async fn test_grading_parsed_from_model() {
        let ai = adapter(debate_llm("unused"));
        let outcome = ai.grade_round(&grade_request(RoundType::Closing)).await;
        assert_eq!(outcome.source, Source::Ai);
        // 4/5 of 25
        assert_eq!(outcome.value.subtotal, 20.0);
        assert_eq!(outcome.value.feedback.as_deref(), Some("Solid."));
    }

    #[tokio::test]
    async fn test_grading_falls_back_on_unparseable_output() {
        let ai = adapter(MockLlm::new(|_, _| Ok("Great job, 9/10!".to_string())));
        let outcome = ai.grade_round(&grade_request(RoundType::Constructive)).await;
        assert!(outcome.is_fallback());
        assert_eq!(outcome.value, fallback_grading(RoundType::Constructive));
        assert_eq!(outcome.value.subtotal, 18.0);
    }

    #[tokio::test]
    async fn test_topic_validation_from_model() {
        let ai = adapter(MockLlm::new(|_, _| {
            Ok(r#"{"valid": true, "refinedTopic": "Schools should require uniforms.", "reason": "Arguable."}"#.to_string())
        }));
        let outcome = ai.validate_topic("  uniforms in schools??  ").await;
        assert_eq!(outcome.source, Source::Ai);
        assert!(outcome.value.is_valid);
        assert_eq!(outcome.value.refined_topic, "Schools should require uniforms.");
    }

    #[tokio::test]
    async fn test_topic_fallback_rules() {
        let ai = DebateAi::fallback_only();
        let short = ai.validate_topic("uniforms").await;
        assert!(!short.value.is_valid);

        let ok = ai.validate_topic("Schools  should require uniforms").await;
        assert!(ok.value.is_valid);
        assert_eq!(ok.value.refined_topic, "Schools should require uniforms.");

        let question = ai.validate_topic("Should schools require uniforms?").await;
        assert_eq!(question.value.refined_topic, "Should schools require uniforms?");
    }
}
