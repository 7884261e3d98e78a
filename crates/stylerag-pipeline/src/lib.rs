//! Drives one request through index loading, retrieval, prompt composition
//! and generation. The first failing stage ends the request; nothing is
//! retried here.
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use stylerag_core::error::{Error, Result};
use stylerag_core::style::{resolve, PromptStrategy};
use stylerag_core::traits::Generator;
use stylerag_core::types::{
    validate_temperature, GenerationRequest, IndexId, KnowledgeLevel, RetrievedFragment, StyleKey, WordLimit,
};
use stylerag_index::{join_context, IndexProvisioner, Retriever, VectorIndexHandle};
use stylerag_prompt::PromptComposer;

pub mod error;

pub use error::{PipelineError, Stage};

pub const DEFAULT_TEMPERATURE: f32 = 0.5;
pub const DEFAULT_KNOWLEDGE: u8 = 5;
pub const DEFAULT_WORDS: u32 = 50;

/// Anything that can hand out an opened index for an id.
#[async_trait]
pub trait IndexSource: Send + Sync {
    async fn open(&self, id: &IndexId) -> Result<Arc<VectorIndexHandle>>;
}

#[async_trait]
impl IndexSource for IndexProvisioner {
    async fn open(&self, id: &IndexId) -> Result<Arc<VectorIndexHandle>> { IndexProvisioner::open(self, id).await }
}

#[async_trait]
impl<T: IndexSource + ?Sized> IndexSource for Arc<T> {
    async fn open(&self, id: &IndexId) -> Result<Arc<VectorIndexHandle>> { (**self).open(id).await }
}

/// A validated question plus its generation parameters.
#[derive(Debug, Clone)]
pub struct AskRequest {
    question: String,
    style: StyleKey,
    temperature: f32,
    knowledge: KnowledgeLevel,
    words: WordLimit,
}

impl AskRequest {
    pub fn new(question: impl Into<String>, style: StyleKey, temperature: f32, knowledge: u8, words: u32) -> Result<Self> {
        validate_temperature(temperature)?;
        Ok(Self {
            question: question.into(),
            style,
            temperature,
            knowledge: KnowledgeLevel::new(knowledge)?,
            words: WordLimit::new(words)?,
        })
    }

    /// Temperature 0.5, knowledge 5, 50 words.
    pub fn with_defaults(question: impl Into<String>, style: StyleKey) -> Result<Self> {
        Self::new(question, style, DEFAULT_TEMPERATURE, DEFAULT_KNOWLEDGE, DEFAULT_WORDS)
    }

    pub fn question(&self) -> &str { &self.question }
    pub fn style(&self) -> StyleKey { self.style }
    pub fn temperature(&self) -> f32 { self.temperature }
    pub fn knowledge(&self) -> KnowledgeLevel { self.knowledge }
    pub fn words(&self) -> WordLimit { self.words }
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub style: StyleKey,
    /// The fragments the prompt was built from, closest first.
    pub fragments: Vec<RetrievedFragment>,
}

pub struct Pipeline<S, G> {
    source: S,
    generator: G,
    retriever: Retriever,
    composer: PromptComposer,
}

impl<S: IndexSource, G: Generator> Pipeline<S, G> {
    pub fn new(source: S, generator: G, retriever: Retriever, composer: PromptComposer) -> Self {
        Self { source, generator, retriever, composer }
    }

    pub fn source(&self) -> &S { &self.source }

    pub async fn ask(&self, request: &AskRequest) -> std::result::Result<Answer, PipelineError> {
        if request.question.trim().is_empty() {
            return Err(PipelineError::Rejected("question is empty".to_string()));
        }
        let started = Instant::now();
        let binding = resolve(request.style);
        let style = request.style;

        tracing::info!(%style, index = %binding.index_id, stage = %Stage::IndexLoading, "stage started");
        let index = self
            .source
            .open(&binding.index_id)
            .await
            .map_err(|e| PipelineError::failed(Stage::IndexLoading, e))?;

        tracing::info!(%style, stage = %Stage::Retrieving, k = self.retriever.top_k(), "stage started");
        let fragments = self
            .retriever
            .search(&index, &request.question)
            .await
            .map_err(|e| PipelineError::failed(Stage::Retrieving, e))?;
        if fragments.is_empty() {
            tracing::warn!(index = %binding.index_id, "index returned no fragments; composing with empty context");
        }

        tracing::info!(%style, stage = %Stage::Composing, fragments = fragments.len(), "stage started");
        let generation = self
            .build_request(request, binding.strategy, &fragments)
            .map_err(|e| PipelineError::failed(Stage::Composing, e))?;

        tracing::info!(%style, stage = %Stage::Generating, "stage started");
        let text = self
            .generator
            .generate(&generation)
            .await
            .map_err(|e| PipelineError::failed(Stage::Generating, e))?;
        if text.trim().is_empty() {
            return Err(PipelineError::failed(Stage::Generating, Error::Generation("model returned an empty answer".into())));
        }

        tracing::info!(%style, ms = started.elapsed().as_millis() as u64, "request succeeded");
        Ok(Answer { text, style, fragments })
    }

    fn build_request(
        &self,
        request: &AskRequest,
        strategy: PromptStrategy,
        fragments: &[RetrievedFragment],
    ) -> Result<GenerationRequest> {
        let context = join_context(fragments);
        let prompt = self.composer.compose(strategy, &context, &request.question, request.knowledge, request.words)?;
        GenerationRequest::new(prompt, request.temperature)
    }
}
