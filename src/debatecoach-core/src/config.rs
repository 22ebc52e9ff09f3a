//! Configuration module for loading TOML config files.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::DebateError;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub debate: DebateSettings,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

/// Debate rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DebateSettings {
    /// Maximum words per argument, for both the user and the AI.
    pub word_cap: usize,
    /// Drop sessions idle for longer than this. Unset keeps them for the process lifetime.
    pub session_ttl_secs: Option<u64>,
}

impl Default for DebateSettings {
    fn default() -> Self {
        Self {
            word_cap: 180,
            session_ttl_secs: None,
        }
    }
}

/// OpenAI-compatible endpoint settings. The API key comes from the environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub api_base: String,
    #[serde(skip)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub argument_max_tokens: u32,
    pub grading_max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            timeout_secs: 30,
            argument_max_tokens: 400,
            grading_max_tokens: 400,
        }
    }
}

impl LlmConfig {
    /// Whether enough is configured to attempt remote calls.
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// Prompt templates.
///
/// Placeholders: `{topic}`, `{side}`, `{stance}`, `{round_type}`,
/// `{instructions}`, `{word_limit}`, `{criteria}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub arguer: String,
    pub judge: String,
    pub topic: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            arguer: DEFAULT_ARGUER_PROMPT.to_string(),
            judge: DEFAULT_JUDGE_PROMPT.to_string(),
            topic: DEFAULT_TOPIC_PROMPT.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DebateError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| DebateError::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::from_str(&content)
    }

    /// Load configuration from string content.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, DebateError> {
        let config: Config = toml::from_str(content)
            .map_err(|e| DebateError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DebateError> {
        if self.debate.word_cap == 0 {
            return Err(DebateError::ConfigError(
                "debate.word_cap must be positive".to_string(),
            ));
        }
        if self.llm.timeout_secs == 0 {
            return Err(DebateError::ConfigError(
                "llm.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fill a prompt template.
pub fn render_prompt(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{}}}", key), value)
    })
}

/// Default configuration embedded in the binary.
pub fn default_config() -> Config {
    Config {
        server: ServerConfig::default(),
        debate: DebateSettings::default(),
        llm: LlmConfig::default(),
        prompts: PromptsConfig::default(),
    }
}

const DEFAULT_ARGUER_PROMPT: &str = r#"You are a skilled competitive debater.

DEBATE TOPIC: {topic}

YOUR POSITION: You are arguing {stance} the topic ({side}).
CURRENT ROUND: {round_type}. {instructions}

RULES:
- Respond directly to your opponent's most recent argument when one is given
- Use evidence and clear reasoning
- Stay under {word_limit} words
- Do NOT acknowledge being an AI

OUTPUT RULES:
- Output ONLY your spoken argument as plain prose
- No headings, bullet points, markdown, or stage directions
"#;

const DEFAULT_JUDGE_PROMPT: &str = r#"You are an impartial debate judge.

DEBATE TOPIC: {topic}
The student argues {stance} the topic ({side}).
ROUND: {round_type}

Score the student's response on each criterion from 0 (absent) to 5 (excellent):
{criteria}

Respond with ONLY a JSON object in exactly this shape:
{"scores": {"<criterion name>": <number 0-5>, ...}, "feedback": "<two sentences of feedback>"}
"#;

const DEFAULT_TOPIC_PROMPT: &str = r#"You check whether a proposed topic can be debated.

A valid topic is a single arguable claim with reasonable positions on both sides.
If it is valid, rewrite it as a clear one-sentence resolution.

Respond with ONLY a JSON object in exactly this shape:
{"valid": <true|false>, "refinedTopic": "<resolution or empty>", "reason": "<short reason>"}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = default_config();
        assert_eq!(config.debate.word_cap, 180);
        assert_eq!(config.server.port, 3001);
        assert!(!config.llm.is_configured());
        assert!(config.prompts.judge.contains("{criteria}"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_str(
            r#"
[debate]
word_cap = 120

[llm]
model = "llama3:8b"
"#,
        )
        .unwrap();
        assert_eq!(config.debate.word_cap, 120);
        assert_eq!(config.llm.model, "llama3:8b");
        assert_eq!(config.llm.timeout_secs, 30);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.prompts.arguer.contains("{word_limit}"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_str("[debate]\nword_cap = 0\n").is_err());
        assert!(Config::from_str("[llm]\ntimeout_secs = 0\n").is_err());
        assert!(Config::from_str("not toml at all [").is_err());
    }

    #[test]
    fn test_render_prompt() {
        let out = render_prompt(
            "Argue {stance} {topic} in {word_limit} words. {unknown}",
            &[("stance", "AGAINST"), ("topic", "uniforms"), ("word_limit", "180")],
        );
        assert_eq!(out, "Argue AGAINST uniforms in 180 words. {unknown}");
    }

    #[test]
    fn test_api_key_presence() {
        let mut llm = LlmConfig::default();
        llm.api_key = Some("   ".to_string());
        assert!(!llm.is_configured());
        llm.api_key = Some("sk-test".to_string());
        assert!(llm.is_configured());
    }
}
