//! Gateway configuration.
//!
//! Precedence: environment (`FORMGUIDE_*`, nested keys with `__`) > TOML file at
//! `FORMGUIDE_CONFIG` (default `config/gateway.toml`) > defaults below. The API key is never
//! read from the file; see [`crate::openai_bridge::OpenAiResponsesBridge::from_env`].

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::openai_bridge::{DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::prompts::USER_QUESTION_LIMIT;

/// When the orchestrator stores the handle returned by a generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContinuationPolicy {
    /// After every call that returns a handle: one continuous chain per session.
    #[default]
    Always,
    /// Only after follow-up calls; first-touch results are discarded.
    FollowUpOnly,
    /// Never; every request starts a fresh context.
    Never,
}

/// Knobs for the assist orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistConfig {
    pub continuation_policy: ContinuationPolicy,
    /// Free-text input is clipped to this many characters.
    pub question_limit: usize,
    /// Follow-ups with a blank question fail with `MissingQuestion`. When off, the field's
    /// own question is used as the input turn.
    pub require_follow_up_question: bool,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            continuation_policy: ContinuationPolicy::Always,
            question_limit: USER_QUESTION_LIMIT,
            require_follow_up_question: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Full gateway configuration.
///
/// | Key | Default | Description |
/// |-----|---------|-------------|
/// | host | 127.0.0.1 | Bind address. |
/// | port | 5000 | Bind port. |
/// | llm_mode | mock | "mock" \| "openai". |
/// | model | gpt-4.1-nano | Responses API model. |
/// | api_base | https://api.openai.com/v1 | Responses API base URL. |
/// | request_timeout_secs | 60 | Generation request timeout. |
/// | schema_path | (built-in) | TOML schema with `[[field]]` entries. |
/// | validate_submissions | true | Type-check submitted values against the schema. |
/// | continuation_policy | always | "always" \| "follow_up_only" \| "never". |
/// | question_limit | 1000 | Free-text truncation bound, in characters. |
/// | require_follow_up_question | true | Blank follow-up questions are rejected. |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub llm_mode: String,
    pub model: String,
    pub api_base: String,
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub schema_path: Option<String>,
    #[serde(default = "default_true")]
    pub validate_submissions: bool,
    #[serde(default)]
    pub continuation_policy: ContinuationPolicy,
    pub question_limit: usize,
    #[serde(default = "default_true")]
    pub require_follow_up_question: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            llm_mode: "mock".to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_secs: 60,
            schema_path: None,
            validate_submissions: true,
            continuation_policy: ContinuationPolicy::Always,
            question_limit: USER_QUESTION_LIMIT,
            require_follow_up_question: true,
        }
    }
}

impl GatewayConfig {
    /// Load from `FORMGUIDE_CONFIG` (or `config/gateway.toml`) and the environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var("FORMGUIDE_CONFIG").unwrap_or_else(|_| "config/gateway.toml".to_string());
        Self::load_from(&path)
    }

    /// Load from an explicit file path (skipped when absent) and the environment.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        Self::layered(config_path, None)
    }

    /// `env` replaces the process environment as the `FORMGUIDE_*` source when given.
    fn layered(
        config_path: &str,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, config::ConfigError> {
        let d = Self::default();
        let builder = config::Config::builder()
            .set_default("host", d.host)?
            .set_default("port", i64::from(d.port))?
            .set_default("llm_mode", d.llm_mode)?
            .set_default("model", d.model)?
            .set_default("api_base", d.api_base)?
            .set_default("request_timeout_secs", d.request_timeout_secs as i64)?
            .set_default("validate_submissions", d.validate_submissions)?
            .set_default("continuation_policy", "always")?
            .set_default("question_limit", d.question_limit as i64)?
            .set_default("require_follow_up_question", d.require_follow_up_question)?;

        let path = Path::new(config_path);
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(
                config::Environment::with_prefix("FORMGUIDE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        let cfg: Self = built.try_deserialize()?;
        if cfg.question_limit == 0 {
            return Err(config::ConfigError::Message(
                "question_limit must be at least 1".to_string(),
            ));
        }
        Ok(cfg)
    }

    pub fn assist_config(&self) -> AssistConfig {
        AssistConfig {
            continuation_policy: self.continuation_policy,
            question_limit: self.question_limit,
            require_follow_up_question: self.require_follow_up_question,
        }
    }

    /// True when generation should go through the mock collaborator.
    pub fn is_mock(&self) -> bool {
        !self.llm_mode.trim().eq_ignore_ascii_case("openai")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
