use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;

use assistant_rag::chunk::Chunker;
use assistant_rag::client::OpenAIClient;
use assistant_rag::embedding::Embedder;
use assistant_rag::extract::load_corpus;
use assistant_rag::index::normalize_l2;
use assistant_rag::qa::{answer, OpenAIGenerator};
use assistant_rag::retrieval::SemanticIndex;
use assistant_rag::Result;
use async_trait::async_trait;
use mockito::{Matcher, Server};
use tempfile::TempDir;

const DIM: usize = 64;

/// Bag-of-words embedder with a vocabulary that grows as words are seen.
#[derive(Default)]
struct VocabularyEmbedder {
    vocab: Mutex<HashMap<String, usize>>,
}

impl VocabularyEmbedder {
    fn vector(&self, text: &str) -> Vec<f32> {
        let mut vocab = self.vocab.lock().unwrap();
        let mut v = vec![0.0; DIM];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
        {
            let next = vocab.len();
            let slot = *vocab.entry(word).or_insert(next);
            v[slot % DIM] += 1.0;
        }
        normalize_l2(&mut v);
        v
    }
}

#[async_trait]
impl Embedder for VocabularyEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

#[tokio::test]
async fn finds_the_passage_that_answers_the_question() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("people.txt");
    fs::write(&path, "Alice lives in Paris. Bob lives in Rome.").unwrap();

    let chunker = Chunker::new(20, 5).unwrap();
    let corpus = load_corpus(&[&path], &chunker).unwrap();
    assert!(corpus.chunks.len() >= 2);

    let index = SemanticIndex::build(VocabularyEmbedder::default(), corpus.chunks).await.unwrap();
    let hits = index.retrieve("Where does Alice live?", 6).await.unwrap();

    assert!(hits[0].text.contains("Alice lives in Paris"));
    assert!(hits.len() <= 6);
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn missing_documents_do_not_reach_the_index() {
    let dir = TempDir::new().unwrap();
    let present = dir.path().join("rome.md");
    fs::write(&present, "Bob lives in Rome.").unwrap();
    let missing = dir.path().join("paris.pdf");

    let chunker = Chunker::new(1200, 150).unwrap();
    let corpus = load_corpus(&[missing.clone(), present], &chunker).unwrap();

    assert_eq!(corpus.skipped, vec![missing]);
    let index = SemanticIndex::build(VocabularyEmbedder::default(), corpus.chunks).await.unwrap();
    assert_eq!(index.len(), 1);
}

#[tokio::test]
async fn answers_with_generated_text_from_responses_api() {
    let mut server = Server::new_async().await;
    let responses = server
        .mock("POST", "/responses")
        .match_body(Matcher::Regex("Alice lives in Paris".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"output": [{"type": "message", "role": "assistant",
                "content": [{"type": "output_text", "text": "Alice lives in Paris."}]}]}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let chunks = vec!["Alice lives in Paris".to_string(), "Bob lives in Rome".to_string()];
    let index = SemanticIndex::build(VocabularyEmbedder::default(), chunks).await.unwrap();
    let client = OpenAIClient::with_base_url("k".to_string(), &server.url());
    let generator = OpenAIGenerator::new(client, "gpt-4o-mini");

    let result = answer(&index, &generator, "Where does Alice live?", 1).await.unwrap();

    assert_eq!(result.text, "Alice lives in Paris.");
    assert_eq!(result.contexts.len(), 1);
    assert_eq!(result.contexts[0].text, "Alice lives in Paris");
    responses.assert_async().await;
}
