//! Prompt templates for field assistance.
//!
//! Two mutually exclusive templates: an orientation prompt for the first touch of a field,
//! and an instructional system prompt paired with the applicant's own question for
//! follow-ups.

/// Maximum length, in characters, of free-text input placed into any prompt.
pub const USER_QUESTION_LIMIT: usize = 1000;

/// First-touch orientation prompt. `{field_question}` is the schema question.
pub const FIRST_TOUCH_TEMPLATE: &str = "Give a brief description of the field \"{field_question}\" \
and what the user should include in their answer. Be brief and to the point. \
Use only plain text and no special formatting like markdown or html.";

/// Follow-up system prompt. `{field_question}` is the schema question.
pub const FOLLOW_UP_SYSTEM_TEMPLATE: &str = "You are a helpful assistant that will help the user fill out \
their job application form. Only answer the question that is asked and stay within the scope of job \
applications and subjects relating to it. Give the applicant good advice to help them succeed in their \
application. Keep responses moderate in size. Use only plain text and no special formatting like markdown \
or html. If within the allowed rules, give the user the answer they are looking for. \
The current field being filled out is \"{field_question}\".";

/// Which template a request used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTemplate {
    FirstTouch,
    FollowUp,
}

impl PromptTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptTemplate::FirstTouch => "first_touch",
            PromptTemplate::FollowUp => "follow_up",
        }
    }
}

/// A prompt ready for the generation collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPrompt {
    pub template: PromptTemplate,
    /// System instructions; empty for first-touch, where everything is in the input turn.
    pub system: String,
    pub input: String,
}

/// Clips `text` to at most `limit` characters, never splitting a character.
pub fn truncate_user_input(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

pub fn first_touch_prompt(field_question: &str) -> BuiltPrompt {
    BuiltPrompt {
        template: PromptTemplate::FirstTouch,
        system: String::new(),
        input: FIRST_TOUCH_TEMPLATE.replace("{field_question}", field_question),
    }
}

/// `user_question` must already be truncated.
pub fn follow_up_prompt(field_question: &str, user_question: &str) -> BuiltPrompt {
    BuiltPrompt {
        template: PromptTemplate::FollowUp,
        system: FOLLOW_UP_SYSTEM_TEMPLATE.replace("{field_question}", field_question),
        input: user_question.to_string(),
    }
}
