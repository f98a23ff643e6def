// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting pieces.

/// Persona shared by every HR-facing prompt (rejection feedback, interviews).
pub const HR_PERSONA: &str = "You are an experienced, fair and encouraging HR professional. \
    Address the candidate directly. Be specific and actionable. \
    Never invent facts about the candidate that are not in the material provided.";

/// Caps free-form answers so one reply fits comfortably on a screen.
pub const BREVITY_INSTRUCTION: &str = "Keep the response under 150 words. \
    Plain text only, no markdown headings.";

/// Fills `{name}` placeholders in a prompt template.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), value)
    })
}

/// Upper bound on resume text embedded in a prompt.
pub const MAX_RESUME_CHARS: usize = 6000;

/// First `max` characters of `text`, cut on a char boundary.
pub fn excerpt(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
