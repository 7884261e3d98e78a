//! Renders the per-style instruction prompt around the retrieved context.
use stylerag_core::config::PromptConfig;
use stylerag_core::error::{Error, Result};
use stylerag_core::style::PromptStrategy;
use stylerag_core::types::{KnowledgeLevel, WordLimit};

pub mod templates;

pub const CONTEXT_SLOT: &str = "{context}";
pub const QUESTION_SLOT: &str = "{question}";

/// A template with exactly one `{context}` and one `{question}` slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
    context_at: usize,
    question_at: usize,
}

impl PromptTemplate {
    pub fn parse(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let context_at = single_slot(&text, CONTEXT_SLOT)?;
        let question_at = single_slot(&text, QUESTION_SLOT)?;
        Ok(Self { text, context_at, question_at })
    }

    pub fn text(&self) -> &str { &self.text }

    /// Single pass: slot-like text inside `context` or `question` is copied
    /// through untouched.
    pub fn render(&self, context: &str, question: &str) -> String {
        let mut slots = [(self.context_at, CONTEXT_SLOT, context), (self.question_at, QUESTION_SLOT, question)];
        slots.sort_by_key(|s| s.0);
        let mut out = String::with_capacity(self.text.len() + context.len() + question.len());
        let mut cursor = 0;
        for (at, slot, value) in slots {
            out.push_str(&self.text[cursor..at]);
            out.push_str(value);
            cursor = at + slot.len();
        }
        out.push_str(&self.text[cursor..]);
        out
    }
}

fn single_slot(text: &str, slot: &str) -> Result<usize> {
    let mut hits = text.match_indices(slot).map(|(i, _)| i);
    match (hits.next(), hits.next()) {
        (Some(at), None) => Ok(at),
        (None, _) => Err(Error::Configuration(format!("prompt template has no {} placeholder", slot))),
        (Some(_), Some(_)) => Err(Error::Configuration(format!("prompt template has more than one {} placeholder", slot))),
    }
}

#[derive(Debug, Clone)]
pub struct PromptComposer {
    sign_off: String,
    feedback_answer_words: u32,
}

impl PromptComposer {
    pub fn new(sign_off: impl Into<String>, feedback_answer_words: u32) -> Self {
        Self { sign_off: sign_off.into(), feedback_answer_words }
    }

    pub fn from_config(config: &PromptConfig) -> Self { Self::new(config.sign_off.clone(), config.feedback_answer_words) }

    /// Build the template for `strategy` with the numeric parameters and the
    /// sign-off already interpolated.
    pub fn template(&self, strategy: PromptStrategy, knowledge: KnowledgeLevel, words: WordLimit) -> Result<PromptTemplate> {
        let raw = match strategy {
            PromptStrategy::EmailMimic => templates::EMAIL,
            PromptStrategy::StructuredReport => templates::REPORT,
            PromptStrategy::FeedbackCritique => templates::FEEDBACK,
            PromptStrategy::GeneralAssistant => templates::NORMAL,
        };
        let text = raw
            .replace("{knowledge}", &knowledge.get().to_string())
            .replace("{word_limit}", &words.get().to_string())
            .replace("{feedback_words}", &self.feedback_answer_words.to_string())
            .replace("{sign_off}", &self.sign_off);
        PromptTemplate::parse(text)
    }

    pub fn compose(
        &self,
        strategy: PromptStrategy,
        context: &str,
        question: &str,
        knowledge: KnowledgeLevel,
        words: WordLimit,
    ) -> Result<String> {
        let prompt = self.template(strategy, knowledge, words)?.render(context, question);
        tracing::debug!(?strategy, chars = prompt.len(), "prompt composed");
        Ok(prompt)
    }
}

impl Default for PromptComposer {
    fn default() -> Self { Self::from_config(&PromptConfig::default()) }
}
