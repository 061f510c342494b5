//! Prompt templates and decoding parameters.
//!
//! Templates are deterministic and not caller-configurable. The two
//! operations bound their input differently on purpose: classification sees
//! only the subject plus the first non-empty body line, while summarization
//! sees the body up to a fixed character budget. Keep the policies separate.

/// Character budget for the body view embedded in summarization prompts.
pub const BODY_CHAR_BUDGET: usize = 2000;

/// Marker appended when the body was cut at the budget.
pub const TRUNCATION_MARKER: &str = "...";

/// System instruction shared by both operations.
pub const SYSTEM_PROMPT: &str = "Respond with valid JSON only.";

/// Classification decoding: kept tight, runs on every inbox message.
pub const CLASSIFY_TEMPERATURE: f64 = 0.4;
pub const CLASSIFY_MAX_TOKENS: u32 = 300;

/// Summarization decoding: looser, the reply draft benefits from variety.
pub const SUMMARIZE_TEMPERATURE: f64 = 0.5;
pub const SUMMARIZE_MAX_TOKENS: u32 = 700;

/// First non-empty line of a body, or empty when there is none.
pub fn first_nonempty_line(body: &str) -> &str {
    body.lines().find(|line| !line.trim().is_empty()).unwrap_or("")
}

/// Body truncated to [`BODY_CHAR_BUDGET`] characters, with the marker
/// appended only when something was actually cut.
pub fn truncate_body(body: &str) -> String {
    let mut chars = body.chars();
    let view: String = chars.by_ref().take(BODY_CHAR_BUDGET).collect();
    if chars.next().is_some() {
        format!("{view}{TRUNCATION_MARKER}")
    } else {
        view
    }
}

/// User prompt for the classification operation.
pub fn classify_user_prompt(subject: &str, body: &str) -> String {
    format!(
        "You are a classification agent for email triage. Return a valid JSON:\n\
         \n\
         {{\n\
           \"priority\": \"high\" | \"medium\" | \"low\",\n\
           \"sentiment\": \"positive\" | \"neutral\" | \"negative\",\n\
           \"label\": \"otp\" | \"work\" | \"meeting\" | \"personal\" | \"transaction\" | \"support\" | \"marketing\" | \"other\",\n\
           \"intent\": \"inform\" | \"request\" | \"confirm\" | \"escalate\" | \"notify\"\n\
         }}\n\
         \n\
         Subject: {subject}\n\
         First line of body: {first_line}",
        first_line = first_nonempty_line(body),
    )
}

/// User prompt for the summarize-and-reply operation.
pub fn summarize_user_prompt(body: &str) -> String {
    format!(
        "You are an email assistant. Respond with valid JSON:\n\
         {{\n\
           \"summary\": \"...\",\n\
           \"reply\": \"...\"\n\
         }}\n\
         Email:\n\
         \"\"\"\n\
         {body}\n\
         \"\"\"",
        body = truncate_body(body),
    )
}
