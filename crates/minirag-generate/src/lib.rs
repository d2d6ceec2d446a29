//! Grounded answer generation with citation checking.
use std::sync::Arc;

use tracing::{info, warn};

use minirag_core::config::Settings;
use minirag_core::traits::LanguageModel;
use minirag_core::types::{Answer, Chunk, Citation, QueryOutcome};
use minirag_core::Result;

pub mod citation;
pub mod gemini;
pub mod prompt;

pub use citation::CitationParser;
pub use gemini::GeminiModel;
pub use prompt::REFUSAL_PHRASE;

pub struct AnswerGenerator {
    llm: Arc<dyn LanguageModel>,
    citations: CitationParser,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Result<Self> { Ok(Self { llm, citations: CitationParser::new()? }) }

    pub fn model_id(&self) -> &str { self.llm.model_id() }

    /// Answer `question` from `context`, numbered `1..=N` in the given order.
    pub async fn generate(&self, question: &str, context: &[Chunk]) -> Result<QueryOutcome> {
        if context.is_empty() {
            info!("no context retrieved; skipping model call");
            return Ok(QueryOutcome::NoAnswerFound);
        }
        let prompt = prompt::build_prompt(question, context);
        let raw = self.llm.generate(&prompt).await?;
        let resolved = self.citations.resolve(&raw, context.len());

        if citation::is_refusal(&resolved.text, !resolved.cited.is_empty()) {
            info!("model found no answer in the context");
            return Ok(QueryOutcome::NoAnswerFound);
        }
        if resolved.cited.is_empty() {
            warn!("answer carries no citations");
        }
        let citations = resolved
            .cited
            .iter()
            .map(|&n| {
                let chunk = &context[n - 1];
                Citation { source_id: n, chunk_id: chunk.id.clone(), descriptor: chunk.descriptor() }
            })
            .collect();
        Ok(QueryOutcome::Answered(Answer { text: resolved.text, citations }))
    }
}

/// Build the configured language model.
pub fn get_default_llm(settings: &Settings) -> Result<Arc<dyn LanguageModel>> {
    let model = GeminiModel::new(&settings.generation, &settings.network, &settings.keys)?;
    info!(model = %settings.generation.model, temperature = settings.generation.temperature, "using Gemini for generation");
    Ok(Arc::new(model))
}
