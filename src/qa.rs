//! Grounded question answering over retrieved context.

use std::future::Future;
use std::io::Write;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

use crate::client::OpenAIClient;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::retrieval::{Retrieved, SemanticIndex};

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

pub struct OpenAIGenerator {
    client: OpenAIClient,
    model: String,
}

impl OpenAIGenerator {
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self { client, model: model.into() }
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.client.create_response(&self.model, prompt).await
    }
}

pub fn build_prompt<S: AsRef<str>>(question: &str, contexts: &[S]) -> String {
    let context = contexts.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("\n\n");
    format!(
        "Use ONLY the context below to answer the question.\n\
         If the answer isn't in the context, say you don't know.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question: {question}\n\
         Answer:"
    )
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub contexts: Vec<Retrieved>,
}

pub async fn answer<E: Embedder, G: Generator + ?Sized>(
    index: &SemanticIndex<E>,
    generator: &G,
    question: &str,
    k: usize,
) -> Result<Answer> {
    let contexts = index.retrieve(question, k).await?;
    let texts: Vec<&str> = contexts.iter().map(|r| r.text.as_str()).collect();
    let prompt = build_prompt(question, &texts);
    debug!("Prompt has {} context passages ({} chars)", texts.len(), prompt.len());

    let text = generator.generate(&prompt).await?;
    Ok(Answer { text, contexts })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// An empty question was entered.
    Quit,
    EndOfInput,
    Interrupted,
}

fn say_bye<W: Write>(out: &mut W, end: SessionEnd) -> Result<SessionEnd> {
    writeln!(out, "\nbye")?;
    Ok(end)
}

/// Answers questions read line by line from `input` until an empty line,
/// end of input, or `interrupt` resolves. `interrupt` is raced against both
/// reading and answering, so it ends the session at any point.
pub async fn chat<E, G, R, W, I>(
    index: &SemanticIndex<E>,
    generator: &G,
    k: usize,
    input: R,
    out: &mut W,
    interrupt: I,
) -> Result<SessionEnd>
where
    E: Embedder,
    G: Generator + ?Sized,
    R: AsyncBufRead + Unpin,
    W: Write,
    I: Future<Output = ()>,
{
    tokio::pin!(interrupt);
    let mut lines = input.lines();

    loop {
        write!(out, "\nEnter your question (or Enter to quit): ")?;
        out.flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut interrupt => return say_bye(out, SessionEnd::Interrupted),
        };
        let Some(line) = line else {
            return say_bye(out, SessionEnd::EndOfInput);
        };
        let question = line.trim();
        if question.is_empty() {
            return Ok(SessionEnd::Quit);
        }

        let response = tokio::select! {
            response = answer(index, generator, question, k) => response?,
            _ = &mut interrupt => {
                info!("Interrupted while answering");
                return say_bye(out, SessionEnd::Interrupted);
            }
        };
        writeln!(out, "\n--- RESPONSE ---\n")?;
        writeln!(out, "{}", response.text)?;
    }
}
