use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use stylerag_core::style::resolve;
use stylerag_core::traits::{Embedder, Generator};
use stylerag_core::types::{GenerationRequest, IndexId, Meta, StyleKey};
use stylerag_core::Error;
use stylerag_embed::{FakeEmbedder, FAKE_MODEL_ID};
use stylerag_index::artifact::{ArtifactSet, StoredFragment};
use stylerag_index::{Retriever, VectorIndexHandle};
use stylerag_pipeline::{AskRequest, IndexSource, Pipeline, PipelineError, Stage};
use stylerag_prompt::templates::FEEDBACK_QUESTIONS;
use stylerag_prompt::PromptComposer;

const DIM: usize = 32;

fn index(id: &str, contents: &[&str]) -> Arc<VectorIndexHandle> {
    let embedder = FakeEmbedder::new(DIM);
    let set = ArtifactSet {
        model: FAKE_MODEL_ID.to_string(),
        dim: DIM,
        vectors: contents.iter().flat_map(|c| embedder.embed_text(c)).collect(),
        fragments: contents
            .iter()
            .enumerate()
            .map(|(i, c)| StoredFragment { id: format!("{}:{}", id, i), content: c.to_string(), metadata: Meta::new() })
            .collect(),
    };
    Arc::new(VectorIndexHandle::from_artifacts(IndexId::new(id), set))
}

struct FakeSource {
    contents: Vec<&'static str>,
    fail: bool,
    opened: Mutex<Vec<IndexId>>,
}

impl FakeSource {
    fn with(contents: &[&'static str]) -> Self { Self { contents: contents.to_vec(), fail: false, opened: Mutex::new(Vec::new()) } }
    fn failing() -> Self { Self { fail: true, ..Self::with(&[]) } }
    fn opens(&self) -> Vec<IndexId> { self.opened.lock().unwrap().clone() }
}

#[async_trait]
impl IndexSource for FakeSource {
    async fn open(&self, id: &IndexId) -> stylerag_core::Result<Arc<VectorIndexHandle>> {
        self.opened.lock().unwrap().push(id.clone());
        if self.fail {
            return Err(Error::provision(&format!("my_faiss_{}.vec", id), "object does not exist"));
        }
        Ok(index(id.as_str(), &self.contents))
    }
}

struct CountingEmbedder {
    inner: FakeEmbedder,
    fail: bool,
    calls: AtomicUsize,
}

impl CountingEmbedder {
    fn new() -> Self { Self { inner: FakeEmbedder::new(DIM), fail: false, calls: AtomicUsize::new(0) } }
    fn failing() -> Self { Self { fail: true, ..Self::new() } }
}

#[async_trait]
impl Embedder for CountingEmbedder {
    fn model_id(&self) -> &str { FAKE_MODEL_ID }
    fn dim(&self) -> usize { DIM }
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail { anyhow::bail!("embedding service returned 503"); }
        self.inner.embed_batch(texts).await
    }
}

#[derive(Default)]
struct StubGenerator {
    fail: bool,
    calls: AtomicUsize,
    last: Mutex<Option<GenerationRequest>>,
}

impl StubGenerator {
    fn failing() -> Self { Self { fail: true, ..Self::default() } }
    fn prompt(&self) -> String { self.last.lock().unwrap().as_ref().map(|r| r.prompt.clone()).unwrap_or_default() }
}

#[async_trait]
impl Generator for StubGenerator {
    async fn generate(&self, request: &GenerationRequest) -> stylerag_core::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(request.clone());
        if self.fail { return Err(Error::Generation("model overloaded".into())); }
        Ok("stub answer".to_string())
    }
}

struct Harness {
    source: Arc<FakeSource>,
    embedder: Arc<CountingEmbedder>,
    generator: Arc<StubGenerator>,
    pipeline: Pipeline<Arc<FakeSource>, Arc<StubGenerator>>,
}

fn harness(source: FakeSource, embedder: CountingEmbedder, generator: StubGenerator) -> Harness {
    let source = Arc::new(source);
    let embedder = Arc::new(embedder);
    let generator = Arc::new(generator);
    let pipeline = Pipeline::new(source.clone(), generator.clone(), Retriever::new(embedder.clone(), 3), PromptComposer::default());
    Harness { source, embedder, generator, pipeline }
}

impl Harness {
    fn embed_calls(&self) -> usize { self.embedder.calls.load(Ordering::SeqCst) }
    fn gen_calls(&self) -> usize { self.generator.calls.load(Ordering::SeqCst) }
}

const MAILS: &[&str] = &[
    "Hey team, quick one: standup moves to 10 tomorrow. Cheers",
    "Folks, the quarterly numbers are in and they look solid. Cheers",
    "Hi all, please send your offsite preferences by Friday. Cheers",
    "Team, huge thanks for the release push last night. Cheers",
    "Hey, can someone own the vendor renewal this week? Cheers",
];

#[tokio::test]
async fn blank_question_is_rejected_before_index_loading() {
    for style in StyleKey::ALL {
        let h = harness(FakeSource::with(MAILS), CountingEmbedder::new(), StubGenerator::default());
        let req = AskRequest::with_defaults(" \t\n", style).unwrap();
        let err = h.pipeline.ask(&req).await.unwrap_err();
        assert!(matches!(err, PipelineError::Rejected(_)), "{}", style);
        assert!(h.source.opens().is_empty());
        assert_eq!(h.embed_calls(), 0);
        assert_eq!(h.gen_calls(), 0);
    }
}

#[tokio::test]
async fn provisioning_failure_halts_the_request() {
    let h = harness(FakeSource::failing(), CountingEmbedder::new(), StubGenerator::default());
    let req = AskRequest::with_defaults("Invite everyone to lunch", StyleKey::Email).unwrap();

    let err = h.pipeline.ask(&req).await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::IndexLoading));
    assert!(matches!(err.cause(), Some(Error::Provision { .. })));
    assert!(err.to_string().contains("my_faiss_mail.vec"));
    assert_eq!(h.embed_calls(), 0);
    assert_eq!(h.gen_calls(), 0);
}

#[tokio::test]
async fn retrieval_fault_stops_before_generation() {
    let h = harness(FakeSource::with(MAILS), CountingEmbedder::failing(), StubGenerator::default());
    let req = AskRequest::with_defaults("Invite everyone to lunch", StyleKey::Email).unwrap();

    let err = h.pipeline.ask(&req).await.unwrap_err();
    match &err {
        PipelineError::Failed { stage: Stage::Retrieving, source: Error::Retrieval(cause) } => assert!(cause.contains("503")),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(h.gen_calls(), 0);
}

#[tokio::test]
async fn successful_request_returns_generator_text() {
    let h = harness(FakeSource::with(MAILS), CountingEmbedder::new(), StubGenerator::default());
    let req = AskRequest::new("Invite everyone to lunch", StyleKey::Email, 0.2, 3, 50).unwrap();

    let answer = h.pipeline.ask(&req).await.unwrap();
    assert_eq!(answer.text, "stub answer");
    assert_eq!(answer.style, StyleKey::Email);
    assert_eq!(answer.fragments.len(), 3);
    assert_eq!(h.source.opens(), vec![IndexId::new("mail")]);
    assert_eq!(h.embed_calls(), 1);
    assert_eq!(h.gen_calls(), 1);
    assert_eq!(h.generator.last.lock().unwrap().as_ref().map(|r| r.temperature), Some(0.2));
}

#[tokio::test]
async fn prompt_embeds_exactly_the_retrieved_fragments() {
    let h = harness(FakeSource::with(MAILS), CountingEmbedder::new(), StubGenerator::default());
    let req = AskRequest::with_defaults("quarterly numbers for the team", StyleKey::Normal).unwrap();

    let answer = h.pipeline.ask(&req).await.unwrap();
    let prompt = h.generator.prompt();
    let retrieved: Vec<&str> = answer.fragments.iter().map(|f| f.content.as_str()).collect();
    assert!(prompt.contains(&retrieved.join("\n\n")));
    for mail in MAILS {
        assert_eq!(prompt.contains(mail), retrieved.contains(mail), "{}", mail);
    }
    assert!(prompt.contains("Question: quarterly numbers for the team"));
}

#[tokio::test]
async fn each_style_reads_its_own_index() {
    for style in StyleKey::ALL {
        let h = harness(FakeSource::with(MAILS), CountingEmbedder::new(), StubGenerator::default());
        h.pipeline.ask(&AskRequest::with_defaults("status?", style).unwrap()).await.unwrap();
        assert_eq!(h.source.opens(), vec![resolve(style).index_id]);
    }
}

#[tokio::test]
async fn feedback_request_carries_both_questions_and_fragments() {
    let notes = &[
        "Alex ran the launch war room calmly and kept every team unblocked.",
        "Alex should share context earlier so others can plan around the launch.",
    ];
    let h = harness(FakeSource::with(notes), CountingEmbedder::new(), StubGenerator::default());
    let req = AskRequest::with_defaults("How did Alex perform on the launch?", StyleKey::Feedback).unwrap();

    h.pipeline.ask(&req).await.unwrap();
    let prompt = h.generator.prompt();
    for note in notes { assert!(prompt.contains(note)); }
    for q in FEEDBACK_QUESTIONS { assert!(prompt.contains(q)); }
    assert!(!prompt.contains("Limit the response to"));
}

#[tokio::test]
async fn empty_index_still_generates() {
    let h = harness(FakeSource::with(&[]), CountingEmbedder::new(), StubGenerator::default());
    let answer = h.pipeline.ask(&AskRequest::with_defaults("anything new?", StyleKey::Report).unwrap()).await.unwrap();
    assert!(answer.fragments.is_empty());
    assert!(h.generator.prompt().contains("<context>\n\n</context>"));
}

#[tokio::test]
async fn generation_failure_is_tagged_with_its_stage() {
    let h = harness(FakeSource::with(MAILS), CountingEmbedder::new(), StubGenerator::failing());
    let err = h.pipeline.ask(&AskRequest::with_defaults("hello", StyleKey::Normal).unwrap()).await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Generating));
    assert_eq!(err.cause().map(|e| e.kind()), Some("GenerationError"));
    assert!(err.to_string().starts_with("generation failed"));
}

#[test]
fn out_of_range_parameters_are_configuration_errors() {
    assert!(matches!(AskRequest::new("q", StyleKey::Normal, 1.5, 5, 50), Err(Error::Configuration(_))));
    assert!(matches!(AskRequest::new("q", StyleKey::Normal, 0.5, 0, 50), Err(Error::Configuration(_))));
    assert!(matches!(AskRequest::new("q", StyleKey::Normal, 0.5, 5, 5001), Err(Error::Configuration(_))));
    assert!(AskRequest::new("q", StyleKey::Normal, 0.0, 10, 5000).is_ok());
}
