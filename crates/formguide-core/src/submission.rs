//! Submission store: the most recently submitted form payload per session.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::error::{FormError, FormResult};
use crate::session::SessionId;

/// Submitted field values, keyed by field key.
pub type FormFields = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub session_id: SessionId,
    pub fields: FormFields,
    pub submitted_at: DateTime<Utc>,
}

/// Per-session submission storage. A `put` replaces the whole payload; nothing is merged.
///
/// Callers check session existence first: the store alone cannot tell an unknown session
/// from one that never submitted, so `get` reports `NoSubmission` for both.
pub trait SubmissionStore: Send + Sync {
    fn put(&self, id: &SessionId, fields: FormFields) -> FormResult<Submission>;

    fn get(&self, id: &SessionId) -> FormResult<Submission>;

    /// Drops every submission. Tests only.
    fn clear(&self);
}

#[derive(Debug, Default)]
pub struct InMemorySubmissionStore {
    submissions: DashMap<SessionId, Submission>,
}

impl InMemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SubmissionStore for InMemorySubmissionStore {
    fn put(&self, id: &SessionId, fields: FormFields) -> FormResult<Submission> {
        if fields.is_empty() {
            return Err(FormError::EmptyPayload);
        }
        let submission = Submission {
            session_id: id.clone(),
            fields,
            submitted_at: Utc::now(),
        };
        self.submissions.insert(id.clone(), submission.clone());
        tracing::info!(session_id = %id, fields = submission.fields.len(), "submission stored");
        Ok(submission)
    }

    fn get(&self, id: &SessionId) -> FormResult<Submission> {
        self.submissions
            .get(id)
            .map(|s| s.clone())
            .ok_or_else(|| FormError::NoSubmission(id.clone()))
    }

    fn clear(&self) {
        self.submissions.clear();
    }
}
