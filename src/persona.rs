//! Assistant persona
//!
//! The relay speaks as a single fixed persona. Every completion request
//! carries its system prompt, and its placeholder reply stands in whenever
//! the model returns no content.

/// System prompt sent with every completion request
pub const SERENITY_SYSTEM_PROMPT: &str = "You are a compassionate, empathetic mental health \
support assistant. Your name is Serenity. Listen carefully to the user, validate their \
feelings, and offer gentle support. Keep responses concise, warm, and conversational. Do not \
provide medical diagnosis. If the user seems in danger, advise them to seek professional \
help. IMPORTANT: Always reply in the same language as the user.";

/// Reply used when the model answers with no content
pub const SERENITY_FALLBACK_REPLY: &str = "I'm listening. Please go on.";

/// Identity and tone of the assistant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    /// Display name
    pub name: String,

    /// System instruction defining tone and constraints
    pub system_prompt: String,

    /// Canned reply for empty completions
    pub fallback_reply: String,
}

impl Persona {
    /// The supportive-listener persona the relay ships with
    #[must_use]
    pub fn serenity() -> Self {
        Self {
            name: "Serenity".to_string(),
            system_prompt: SERENITY_SYSTEM_PROMPT.to_string(),
            fallback_reply: SERENITY_FALLBACK_REPLY.to_string(),
        }
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::serenity()
    }
}
