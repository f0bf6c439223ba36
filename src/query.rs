//! Query/answer stage.
//!
//! # Pipeline
//!
//! 1. Embed the question with the same provider used for indexing.
//! 2. Retrieve the `k` nearest chunks from the collection.
//! 3. Build the system prompt from the fixed instruction and the chunk texts.
//! 4. Send the system prompt and the question to the language model.
//! 5. Return the completion together with the chunks it was given.
//!
//! Nothing is retried here; every failure propagates to the caller.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::RagError;
use crate::llm::{GenerationRequest, LanguageModel, OllamaLlm, SamplingParams};
use crate::models::{AnswerResponse, Collection, ScoredChunk};
use crate::prompt::build_system_prompt;
use crate::store::{SimilarityMetric, SqliteVectorStore, VectorStore};

/// Retrieval and sampling knobs for [`QueryEngine`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuerySettings {
    pub k: usize,
    pub metric: SimilarityMetric,
    pub sampling: SamplingParams,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            k: 5,
            metric: SimilarityMetric::Cosine,
            sampling: SamplingParams::default(),
        }
    }
}

impl QuerySettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            k: config.retrieval.k,
            metric: config.retrieval.metric.parse()?,
            sampling: SamplingParams::from(&config.llm),
        })
    }
}

/// Answers questions against one existing collection.
pub struct QueryEngine<'a> {
    store: &'a dyn VectorStore,
    collection: Collection,
    provider: &'a dyn EmbeddingProvider,
    llm: &'a dyn LanguageModel,
    settings: QuerySettings,
}

impl<'a> QueryEngine<'a> {
    /// Bind to `collection_name`.
    ///
    /// # Errors
    ///
    /// [`RagError::CollectionNotFound`] if the collection was never created.
    pub async fn open(
        store: &'a dyn VectorStore,
        collection_name: &str,
        provider: &'a dyn EmbeddingProvider,
        llm: &'a dyn LanguageModel,
        settings: QuerySettings,
    ) -> Result<Self> {
        let collection = store
            .get_collection(collection_name)
            .await?
            .ok_or_else(|| RagError::CollectionNotFound(collection_name.to_string()))?;

        Ok(Self {
            store,
            collection,
            provider,
            llm,
            settings,
        })
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// The `k` chunks closest to `question`, best first.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<ScoredChunk>> {
        let query_vec = self.provider.embed_query(question).await?;
        let hits = self
            .store
            .similarity_search(
                &self.collection,
                &query_vec,
                self.settings.k,
                self.settings.metric,
            )
            .await?;
        tracing::info!(
            collection = %self.collection.name,
            metric = %self.settings.metric,
            hits = hits.len(),
            "retrieved context"
        );
        Ok(hits)
    }

    /// Retrieve context for `question` and ask the model.
    ///
    /// An empty collection still reaches the model, with an empty context.
    pub async fn ask(&self, question: &str) -> Result<AnswerResponse> {
        let context = self.retrieve(question).await?;
        let texts: Vec<&str> = context.iter().map(|c| c.chunk.text.as_str()).collect();

        let request = GenerationRequest {
            system: build_system_prompt(&texts),
            prompt: question.to_string(),
            sampling: self.settings.sampling,
        };
        let answer = self.llm.generate(&request).await?;
        tracing::info!(model = self.llm.model_name(), "received answer");

        Ok(AnswerResponse {
            question: question.to_string(),
            context,
            answer,
        })
    }
}

/// `rag ask`: answer `question` from the configured collection.
///
/// Prints the retrieved context and then the answer, or the whole
/// [`AnswerResponse`] as JSON with `json`. A store file that does not exist
/// yet is reported as a missing collection and is not created.
pub async fn run_ask(config: &Config, question: &str, json: bool) -> Result<AnswerResponse> {
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }
    let provider = embedding::create_provider(&config.embedding)?;
    let llm = OllamaLlm::new(&config.llm)?;
    let settings = QuerySettings::from_config(config)?;

    let store = SqliteVectorStore::open_existing(&config.store.path)
        .await?
        .ok_or_else(|| RagError::CollectionNotFound(config.store.collection.clone()))?;
    let result = answer_with(
        &store,
        &config.store.collection,
        provider.as_ref(),
        &llm,
        settings,
        question,
    )
    .await;
    store.close().await;
    let response = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print!("{}", format_answer(&response));
    }

    Ok(response)
}

/// Plain-text rendering of a response: each context chunk with its source
/// and score, then the answer.
pub fn format_answer(response: &AnswerResponse) -> String {
    let mut out = String::from("context:\n");
    if response.context.is_empty() {
        out.push_str("  none\n");
    }
    for (i, hit) in response.context.iter().enumerate() {
        out.push_str(&format!(
            "  [{}] {} #{} (score {:.4})\n",
            i + 1,
            hit.chunk.source,
            hit.chunk.chunk_index,
            hit.score
        ));
        for line in hit.chunk.text.lines() {
            out.push_str("      ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out.push_str("answer:\n");
    out.push_str(&response.answer);
    out.push('\n');
    out
}

async fn answer_with(
    store: &dyn VectorStore,
    collection_name: &str,
    provider: &dyn EmbeddingProvider,
    llm: &dyn LanguageModel,
    settings: QuerySettings,
    question: &str,
) -> Result<AnswerResponse> {
    let engine = QueryEngine::open(store, collection_name, provider, llm, settings).await?;
    let collection = engine.collection();
    tracing::info!(
        collection = %collection.name,
        id = %collection.id,
        "opened collection"
    );
    engine.ask(question).await
}
