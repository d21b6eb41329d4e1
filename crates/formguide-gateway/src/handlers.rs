//! HTTP handlers: one per core verb. Errors leave as `{"error": "..."}` with a status
//! derived from the error kind.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequestParts, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use formguide_core::{AssistRequest, FormError, FormFields, FormGuide, SessionId};
use std::sync::Arc;

pub type AppState = Arc<FormGuide>;

/// Error on the wire: a core `FormError`, or a query string axum could not decode.
pub enum ApiError {
    Form(FormError),
    Query(String),
}

impl From<FormError> for ApiError {
    fn from(err: FormError) -> Self {
        ApiError::Form(err)
    }
}

pub fn status_for(err: &FormError) -> StatusCode {
    if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else if err.is_input() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::BAD_GATEWAY
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Form(err) => (status_for(&err), err.to_string()),
            ApiError::Query(detail) => (StatusCode::BAD_REQUEST, detail),
        };
        if status.is_server_error() {
            tracing::warn!(error = %message, "request failed upstream");
        } else {
            tracing::debug!(error = %message, status = status.as_u16(), "request rejected");
        }
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Raw query pairs in arrival order. Repeated keys are kept, so the browser client's
/// `current_question=<field>&current_question=<text>` shape survives extraction.
#[derive(Debug, Default)]
pub struct QueryPairs(Vec<(String, String)>);

impl QueryPairs {
    fn first(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn session_id(&self) -> SessionId {
        SessionId::from(self.first("session_id").unwrap_or_default())
    }

    /// `field`/`question`, or the positional `current_question` pair: field key first,
    /// free text second.
    fn assist_request(&self) -> AssistRequest {
        let mut current = self.all("current_question");
        let field_key = self
            .first("field")
            .or_else(|| current.next())
            .unwrap_or_default()
            .to_string();
        let question = self
            .first("question")
            .or_else(|| current.next())
            .map(str::to_string);
        AssistRequest {
            session_id: self.session_id(),
            field_key,
            question,
            first_touch: parse_flag(self.first("first")),
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for QueryPairs {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::Query(e.body_text()))?;
        Ok(QueryPairs(pairs))
    }
}

pub async fn health() -> &'static str {
    "OK"
}

/// GET /api/scheme
pub async fn scheme(State(guide): State<AppState>) -> Response {
    Json(guide.schema()).into_response()
}

/// GET /api/create_session
pub async fn create_session(State(guide): State<AppState>) -> Json<serde_json::Value> {
    let id = guide.create_session();
    tracing::info!(session_id = %id, "session issued");
    Json(serde_json::json!({ "session_id": id }))
}

/// POST /api/submit_form?session_id=...  Body: JSON object of field values.
pub async fn submit_form(
    State(guide): State<AppState>,
    q: QueryPairs,
    body: Bytes,
) -> Result<Json<FormFields>, ApiError> {
    let fields = parse_fields(&body);
    let stored = guide.submit(&q.session_id(), fields)?;
    Ok(Json(stored))
}

/// GET /api/get_form_data?session_id=...
pub async fn get_form_data(
    State(guide): State<AppState>,
    q: QueryPairs,
) -> Result<Json<FormFields>, ApiError> {
    Ok(Json(guide.submission(&q.session_id())?))
}

/// GET /api/gpt_helper?session_id=...&field=...&question=...&first=true|false
/// (also `current_question=<field>&current_question=<text>`)
pub async fn gpt_helper(State(guide): State<AppState>, q: QueryPairs) -> Result<String, ApiError> {
    let reply = guide.assist(&q.assist_request()).await?;
    Ok(reply.text)
}

/// Anything other than a JSON object counts as no payload.
fn parse_fields(body: &[u8]) -> Option<FormFields> {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn parse_flag(raw: Option<&str>) -> bool {
    raw.map(|s| s.trim().eq_ignore_ascii_case("true")).unwrap_or(false)
}
