//! FormGuide core library.
//! Form schema, per-session state and field assistance orchestration for the guided
//! form-filling assistant. All state is in memory for the life of the process.

pub mod config;
pub mod error;
pub mod generation;
pub mod openai_bridge;
pub mod orchestrator;
pub mod prompts;
pub mod schema;
pub mod service;
pub mod session;
pub mod submission;

pub use config::{AssistConfig, ContinuationPolicy, GatewayConfig};
pub use error::{FormError, FormResult, SchemaError};
pub use generation::{Generation, GenerationError, GenerationRequest, Generator, MockGenerator};
pub use openai_bridge::OpenAiResponsesBridge;
pub use orchestrator::{AssistOrchestrator, AssistReply, AssistRequest};
pub use prompts::{PromptTemplate, USER_QUESTION_LIMIT};
pub use schema::{FieldDefinition, FieldKind, Schema, SchemaRegistry};
pub use service::FormGuide;
pub use session::{ConversationHandle, InMemorySessionStore, SessionId, SessionStore};
pub use submission::{FormFields, InMemorySubmissionStore, Submission, SubmissionStore};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
