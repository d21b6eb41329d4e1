//! FormGuide facade: the five verbs the HTTP layer calls, each mapped to one core operation.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{AssistConfig, GatewayConfig};
use crate::error::{FormError, FormResult, SchemaError};
use crate::generation::{Generator, MockGenerator};
use crate::openai_bridge::OpenAiResponsesBridge;
use crate::orchestrator::{AssistOrchestrator, AssistReply, AssistRequest};
use crate::schema::{Schema, SchemaRegistry};
use crate::session::{InMemorySessionStore, SessionId, SessionStore};
use crate::submission::{FormFields, InMemorySubmissionStore, SubmissionStore};

pub struct FormGuide {
    schema: Arc<SchemaRegistry>,
    sessions: Arc<dyn SessionStore>,
    submissions: Arc<dyn SubmissionStore>,
    orchestrator: AssistOrchestrator,
    validate_submissions: bool,
}

impl FormGuide {
    /// In-memory stores, submission type checks on.
    pub fn new(schema: SchemaRegistry, generator: Arc<dyn Generator>, assist: AssistConfig) -> Self {
        Self::with_stores(
            schema,
            Arc::new(InMemorySessionStore::new()),
            Arc::new(InMemorySubmissionStore::new()),
            generator,
            assist,
        )
    }

    pub fn with_stores(
        schema: SchemaRegistry,
        sessions: Arc<dyn SessionStore>,
        submissions: Arc<dyn SubmissionStore>,
        generator: Arc<dyn Generator>,
        assist: AssistConfig,
    ) -> Self {
        let schema = Arc::new(schema);
        let orchestrator =
            AssistOrchestrator::new(Arc::clone(&schema), Arc::clone(&sessions), generator, assist);
        Self {
            schema,
            sessions,
            submissions,
            orchestrator,
            validate_submissions: true,
        }
    }

    pub fn with_submission_validation(mut self, enabled: bool) -> Self {
        self.validate_submissions = enabled;
        self
    }

    /// Schema from `schema_path` (or the built-in form) and a collaborator per `llm_mode`.
    /// Falls back to the mock collaborator when `openai` is requested without `OPENAI_API_KEY`.
    pub fn from_config(cfg: &GatewayConfig) -> Result<Self, SchemaError> {
        let schema = match cfg.schema_path.as_deref() {
            Some(path) => SchemaRegistry::from_path(path)?,
            None => SchemaRegistry::builtin(),
        };
        tracing::info!(fields = schema.get().len(), source = cfg.schema_path.as_deref().unwrap_or("built-in"), "schema loaded");

        let generator: Arc<dyn Generator> = if cfg.is_mock() {
            Arc::new(MockGenerator::new())
        } else {
            match OpenAiResponsesBridge::from_env() {
                Some(bridge) => Arc::new(
                    bridge
                        .with_model(&cfg.model)
                        .with_api_base(&cfg.api_base)
                        .with_timeout(Duration::from_secs(cfg.request_timeout_secs)),
                ),
                None => {
                    tracing::warn!("llm_mode is openai but OPENAI_API_KEY is not set; using mock generation");
                    Arc::new(MockGenerator::new())
                }
            }
        };
        tracing::info!(generator = generator.name(), policy = ?cfg.continuation_policy, "generation collaborator ready");

        Ok(Self::new(schema, generator, cfg.assist_config())
            .with_submission_validation(cfg.validate_submissions))
    }

    pub fn schema(&self) -> &Schema {
        self.schema.get()
    }

    pub fn create_session(&self) -> SessionId {
        self.sessions.create_session()
    }

    pub fn session_exists(&self, id: &SessionId) -> bool {
        self.sessions.exists(id)
    }

    /// Replaces the session's submission. `None` (no body) is treated as empty.
    pub fn submit(&self, id: &SessionId, fields: Option<FormFields>) -> FormResult<FormFields> {
        if !self.sessions.exists(id) {
            return Err(FormError::SessionNotFound(id.clone()));
        }
        let fields = fields.filter(|f| !f.is_empty()).ok_or(FormError::EmptyPayload)?;
        if self.validate_submissions {
            self.schema.validate(&fields)?;
        }
        Ok(self.submissions.put(id, fields)?.fields)
    }

    pub fn submission(&self, id: &SessionId) -> FormResult<FormFields> {
        if !self.sessions.exists(id) {
            return Err(FormError::SessionNotFound(id.clone()));
        }
        Ok(self.submissions.get(id)?.fields)
    }

    pub async fn assist(&self, request: &AssistRequest) -> FormResult<AssistReply> {
        self.orchestrator.assist(request).await
    }

    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    /// Drops all sessions and submissions.
    pub fn reset(&self) {
        self.submissions.clear();
        self.sessions.clear();
    }
}
