//! Conversational context: greeting, politeness, urgency and uncertainty
//! flags plus derived tone and formality. Detection runs on the original
//! text so casing cues (coded IDs) still count toward formality.

use serde::Serialize;

use crate::patterns::PatternLibrary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Friendly,
    Urgent,
    Helpful,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Formality {
    Formal,
    Casual,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationContext {
    pub is_greeting: bool,
    pub is_polite: bool,
    pub is_urgent: bool,
    pub is_uncertain: bool,
    pub tone: Tone,
    pub formality: Formality,
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self {
            is_greeting: false,
            is_polite: false,
            is_urgent: false,
            is_uncertain: false,
            tone: Tone::Neutral,
            formality: Formality::Casual,
        }
    }
}

/// Analyze the original utterance text.
pub fn analyze(lib: &PatternLibrary, text: &str) -> ConversationContext {
    let tone_sets = lib.tone();
    let is_greeting = tone_sets.greetings.is_match(text);
    let is_polite = tone_sets.polite.is_match(text);
    let is_urgent = tone_sets.urgency.is_match(text);
    let is_uncertain = tone_sets.uncertainty.is_match(text);

    // Urgency outranks uncertainty outranks greeting.
    let tone = if is_urgent {
        Tone::Urgent
    } else if is_uncertain {
        Tone::Helpful
    } else if is_greeting {
        Tone::Friendly
    } else {
        Tone::Neutral
    };
    let formality = if tone_sets.technical.is_match(text) {
        Formality::Formal
    } else {
        Formality::Casual
    };

    ConversationContext {
        is_greeting,
        is_polite,
        is_urgent,
        is_uncertain,
        tone,
        formality,
    }
}
