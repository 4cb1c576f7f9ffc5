//! Response style selection from context flags and extracted urgency.

use serde::{Deserialize, Serialize};

use crate::context::{ConversationContext, Formality};
use crate::entities::Entities;

/// How a downstream responder should phrase its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStyle {
    Casual,
    Formal,
    Urgent,
}

/// Urgency wins over register; otherwise formality decides.
pub fn select(context: &ConversationContext, entities: &Entities) -> ResponseStyle {
    if context.is_urgent || entities.urgency {
        ResponseStyle::Urgent
    } else if context.formality == Formality::Formal {
        ResponseStyle::Formal
    } else {
        ResponseStyle::Casual
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Tone;

    fn ctx(is_urgent: bool, formality: Formality) -> ConversationContext {
        ConversationContext {
            is_urgent,
            formality,
            tone: Tone::Neutral,
            ..ConversationContext::default()
        }
    }

    #[test]
    fn urgency_beats_formality() {
        let style = select(&ctx(true, Formality::Formal), &Entities::default());
        assert_eq!(style, ResponseStyle::Urgent);
    }

    #[test]
    fn entity_urgency_alone_is_enough() {
        let entities = Entities {
            urgency: true,
            ..Entities::default()
        };
        let style = select(&ctx(false, Formality::Casual), &entities);
        assert_eq!(style, ResponseStyle::Urgent);
    }

    #[test]
    fn formal_register_without_urgency() {
        let style = select(&ctx(false, Formality::Formal), &Entities::default());
        assert_eq!(style, ResponseStyle::Formal);
    }

    #[test]
    fn casual_is_the_default() {
        let style = select(&ctx(false, Formality::Casual), &Entities::default());
        assert_eq!(style, ResponseStyle::Casual);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ResponseStyle::Urgent).expect("serialize"),
            "\"urgent\""
        );
    }
}
