//! End-to-end runs of extract -> index -> ask with fake model services.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use pdf_rag::chunk::RecursiveSplitter;
use pdf_rag::embedding::EmbeddingProvider;
use pdf_rag::error::RagError;
use pdf_rag::extract::{process_pdfs, PdfExtractor, TextExtractor};
use pdf_rag::index::{index_document, load_document};
use pdf_rag::llm::{GenerationRequest, LanguageModel};
use pdf_rag::query::{QueryEngine, QuerySettings};
use pdf_rag::store::{DuplicatePolicy, SqliteVectorStore, VectorStore};

/// Bag-of-letters embedding: similar words land close together.
struct LetterProvider;

#[async_trait]
impl EmbeddingProvider for LetterProvider {
    fn model_name(&self) -> &str {
        "letters"
    }
    fn dims(&self) -> usize {
        26
    }
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0f32; 26];
                for c in t.to_lowercase().chars().filter(|c| c.is_ascii_lowercase()) {
                    v[(c as u8 - b'a') as usize] += 1.0;
                }
                v
            })
            .collect())
    }
}

struct CannedLlm {
    answer: String,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl CannedLlm {
    fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LanguageModel for CannedLlm {
    fn model_name(&self) -> &str {
        "canned"
    }
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.answer.clone())
    }
}

/// Serves fixed text per file name; unknown files fail.
struct FixtureExtractor(HashMap<&'static str, &'static str>);

impl TextExtractor for FixtureExtractor {
    fn extract(&self, path: &Path) -> Result<String, RagError> {
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        self.0
            .get(name.as_str())
            .map(|t| t.to_string())
            .ok_or_else(|| RagError::extraction(name, "no fixture"))
    }
}

/// A one-page PDF drawing `text` in Courier.
fn pdf_with_text(text: &str) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

#[test]
fn real_pdf_is_extracted_and_broken_pdf_is_skipped() {
    let tmp = TempDir::new().unwrap();
    let pdf_dir = tmp.path().join("pdf_files");
    fs::create_dir(&pdf_dir).unwrap();
    fs::write(pdf_dir.join("car.pdf"), pdf_with_text("Top speed 120 km/h")).unwrap();
    fs::write(pdf_dir.join("broken.pdf"), b"%PDF-1.4 truncated").unwrap();
    fs::write(pdf_dir.join("readme.txt"), "not a pdf").unwrap();
    let out = tmp.path().join("extracted_text/combined_text.txt");

    let report = process_pdfs(&pdf_dir, &out, &PdfExtractor::default()).unwrap();
    let combined = fs::read_to_string(&out).unwrap();

    assert_eq!(report.extracted, vec!["car.pdf"]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].file, "broken.pdf");
    assert!(combined.starts_with("File: car.pdf\n"));
    assert!(combined.contains("speed"), "got: {:?}", combined);
    assert!(!combined.contains("readme"));
}

#[tokio::test]
async fn question_is_answered_from_the_indexed_pdf() {
    let tmp = TempDir::new().unwrap();
    let pdf_dir = tmp.path().join("pdf_files");
    fs::create_dir(&pdf_dir).unwrap();
    fs::write(pdf_dir.join("car.pdf"), b"placeholder").unwrap();
    let out = tmp.path().join("extracted_text/combined_text.txt");

    // Stage 1: extract
    let extractor = FixtureExtractor(HashMap::from([("car.pdf", "Top speed: 120 km/h")]));
    process_pdfs(&pdf_dir, &out, &extractor).unwrap();
    assert_eq!(
        fs::read_to_string(&out).unwrap(),
        "File: car.pdf\nTop speed: 120 km/h\n"
    );

    // Stage 2: index
    let store = SqliteVectorStore::open(&tmp.path().join("data/rag.sqlite"))
        .await
        .unwrap();
    let document = load_document(&out).unwrap();
    let report = index_document(
        &LetterProvider,
        &store,
        "myRag",
        &document,
        &RecursiveSplitter::default(),
        DuplicatePolicy::Append,
        64,
    )
    .await
    .unwrap();
    assert_eq!(report.chunks, 1);
    assert_eq!(report.total_entries, 1);

    // Stage 3: ask
    let llm = CannedLlm::new("The top speed is 120 km/h.");
    let engine = QueryEngine::open(
        &store,
        "myRag",
        &LetterProvider,
        &llm,
        QuerySettings::default(),
    )
    .await
    .unwrap();
    let response = engine.ask("What is the top speed?").await.unwrap();

    assert_eq!(response.answer, "The top speed is 120 km/h.");
    assert_eq!(
        response.context_texts(),
        vec!["File: car.pdf\nTop speed: 120 km/h"]
    );
    let requests = llm.requests.lock().unwrap();
    assert!(requests[0].system.ends_with("File: car.pdf\nTop speed: 120 km/h"));
    assert_eq!(requests[0].prompt, "What is the top speed?");
}

#[tokio::test]
async fn reindexing_follows_the_duplicate_policy() {
    let tmp = TempDir::new().unwrap();
    let store = SqliteVectorStore::open(&tmp.path().join("rag.sqlite"))
        .await
        .unwrap();
    let text = (0..30)
        .map(|i| format!("Section {}. {}", i, "The engine runs on diesel. ".repeat(5)))
        .collect::<Vec<_>>()
        .join("\n\n");
    let document = pdf_rag::models::Document::new("combined_text.txt", text);
    let splitter = RecursiveSplitter::default();

    let index = |policy: DuplicatePolicy| {
        let store = &store;
        let document = &document;
        let splitter = &splitter;
        async move {
            index_document(&LetterProvider, store, "myRag", document, splitter, policy, 8)
                .await
                .unwrap()
        }
    };

    let first = index(DuplicatePolicy::Append).await;
    assert!(first.chunks > 1);

    let skipped = index(DuplicatePolicy::SkipExisting).await;
    assert_eq!(skipped.inserted, 0);
    assert_eq!(skipped.total_entries, first.total_entries);

    let appended = index(DuplicatePolicy::Append).await;
    assert_eq!(appended.total_entries, 2 * first.total_entries);
}

#[tokio::test]
async fn asking_a_missing_collection_fails_before_calling_the_model() {
    let tmp = TempDir::new().unwrap();
    let store = SqliteVectorStore::open(&tmp.path().join("rag.sqlite"))
        .await
        .unwrap();
    let llm = CannedLlm::new("unused");

    let err = QueryEngine::open(
        &store,
        "myRag",
        &LetterProvider,
        &llm,
        QuerySettings::default(),
    )
    .await
    .err()
    .unwrap();

    assert!(matches!(
        err.downcast_ref::<RagError>(),
        Some(RagError::CollectionNotFound(_))
    ));
    assert!(llm.requests.lock().unwrap().is_empty());
    assert!(store.list_collections().await.unwrap().is_empty());
}
