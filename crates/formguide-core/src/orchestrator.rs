//! Assist orchestrator: turns one field-assistance request into a prompt, calls the
//! generation collaborator and records the continuation handle it returns.
//!
//! Validation order: field key, then session, then (follow-ups only) the free-text question.
//! No store lock is held across the generation call.

use std::sync::Arc;

use crate::config::{AssistConfig, ContinuationPolicy};
use crate::error::{FormError, FormResult};
use crate::generation::{GenerationRequest, Generator};
use crate::prompts::{first_touch_prompt, follow_up_prompt, truncate_user_input, PromptTemplate};
use crate::schema::SchemaRegistry;
use crate::session::{SessionId, SessionStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistRequest {
    pub session_id: SessionId,
    pub field_key: String,
    /// Applicant's own question. Ignored on first touch.
    pub question: Option<String>,
    pub first_touch: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistReply {
    /// Generated text, verbatim.
    pub text: String,
    pub template: PromptTemplate,
    /// Whether a prior continuation handle was attached to the call.
    pub chained: bool,
}

pub struct AssistOrchestrator {
    schema: Arc<SchemaRegistry>,
    sessions: Arc<dyn SessionStore>,
    generator: Arc<dyn Generator>,
    config: AssistConfig,
}

impl AssistOrchestrator {
    pub fn new(
        schema: Arc<SchemaRegistry>,
        sessions: Arc<dyn SessionStore>,
        generator: Arc<dyn Generator>,
        config: AssistConfig,
    ) -> Self {
        Self {
            schema,
            sessions,
            generator,
            config,
        }
    }

    pub fn config(&self) -> &AssistConfig {
        &self.config
    }

    pub async fn assist(&self, request: &AssistRequest) -> FormResult<AssistReply> {
        let field = self.schema.lookup(&request.field_key)?;
        let session_id = &request.session_id;
        if !self.sessions.exists(session_id) {
            return Err(FormError::SessionNotFound(session_id.clone()));
        }

        let prompt = if request.first_touch {
            first_touch_prompt(&field.question)
        } else {
            let asked = request
                .question
                .as_deref()
                .filter(|q| !q.trim().is_empty());
            let input = match asked {
                Some(q) => q,
                None if self.config.require_follow_up_question => {
                    return Err(FormError::MissingQuestion)
                }
                None => field.question.as_str(),
            };
            follow_up_prompt(
                &field.question,
                truncate_user_input(input, self.config.question_limit),
            )
        };

        // First touch always starts a fresh context, even when a handle exists.
        let continuation = match prompt.template {
            PromptTemplate::FirstTouch => None,
            PromptTemplate::FollowUp => self.sessions.get_continuation(session_id)?,
        };
        let chained = continuation.is_some();

        tracing::info!(
            session_id = %session_id,
            field = %field.key,
            template = prompt.template.as_str(),
            chained,
            generator = self.generator.name(),
            "assist requested"
        );

        let generation = self
            .generator
            .generate(GenerationRequest {
                system_prompt: prompt.system,
                user_input: prompt.input,
                continuation,
            })
            .await
            .map_err(|e| {
                tracing::warn!(session_id = %session_id, field = %field.key, error = %e, "generation failed");
                FormError::from(e)
            })?;

        if let Some(handle) = generation.continuation {
            if self.should_persist(prompt.template) {
                tracing::debug!(session_id = %session_id, handle = %handle, "continuation stored");
                self.sessions.set_continuation(session_id, handle)?;
            }
        }

        Ok(AssistReply {
            text: generation.text,
            template: prompt.template,
            chained,
        })
    }

    fn should_persist(&self, template: PromptTemplate) -> bool {
        match self.config.continuation_policy {
            ContinuationPolicy::Always => true,
            ContinuationPolicy::FollowUpOnly => template == PromptTemplate::FollowUp,
            ContinuationPolicy::Never => false,
        }
    }
}
