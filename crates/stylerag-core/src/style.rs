//! Style registry: maps a `StyleKey` to its index and prompt strategy.

use std::str::FromStr;

use crate::error::Error;
use crate::types::{IndexId, StyleKey};

/// Response contract a prompt template encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptStrategy {
    /// Imitate the retrieved emails and sign off with a fixed name.
    EmailMimic,
    /// Structured professional report.
    StructuredReport,
    /// Two-question critique with a per-answer word cap.
    FeedbackCritique,
    /// Plain helpful assistant.
    GeneralAssistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleBinding {
    pub style: StyleKey,
    pub index_id: IndexId,
    pub strategy: PromptStrategy,
}

pub fn resolve(style: StyleKey) -> StyleBinding {
    let (token, strategy) = match style {
        StyleKey::Email => ("mail", PromptStrategy::EmailMimic),
        StyleKey::Normal => ("normal", PromptStrategy::GeneralAssistant),
        StyleKey::Report => ("report", PromptStrategy::StructuredReport),
        StyleKey::Feedback => ("feedback", PromptStrategy::FeedbackCritique),
    };
    StyleBinding { style, index_id: IndexId::new(token), strategy }
}

/// Accepts the style name, its index token or its UI label, ignoring case.
/// Anything else is a configuration error rather than a silent default.
impl FromStr for StyleKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        StyleKey::ALL
            .into_iter()
            .find(|style| {
                let binding = resolve(*style);
                wanted.eq_ignore_ascii_case(style.name())
                    || wanted.eq_ignore_ascii_case(binding.index_id.as_str())
                    || wanted.eq_ignore_ascii_case(style.label())
            })
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "unknown style '{}' (expected one of: email, normal, report, feedback)",
                    wanted
                ))
            })
    }
}
