//! Runs an assistant on a fresh thread and collects the files it produced.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use crate::client::types::{ContentPart, Message, RunStatus};
use crate::client::OpenAIClient;
use crate::config::{MESSAGE_LIMIT, POLL_INTERVAL_MS};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadResult {
    Saved(PathBuf),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub file_id: String,
    pub result: DownloadResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { downloads: Vec<DownloadReport> },
    Ended { status: RunStatus, error: Option<String> },
}

pub struct AssistantRunner<'a> {
    client: &'a OpenAIClient,
    out_dir: PathBuf,
    poll_interval: Duration,
    message_limit: u32,
}

impl<'a> AssistantRunner<'a> {
    pub fn new(client: &'a OpenAIClient, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            out_dir: out_dir.into(),
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
            message_limit: MESSAGE_LIMIT,
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn message_limit(mut self, limit: u32) -> Self {
        self.message_limit = limit;
        self
    }

    /// Asks `question` on a new thread, prints the assistant's reply to `out`
    /// and downloads every referenced file once.
    pub async fn run<W: Write>(
        &self,
        assistant_id: &str,
        question: &str,
        out: &mut W,
    ) -> Result<RunOutcome> {
        fs::create_dir_all(&self.out_dir)?;

        let thread = self.client.create_thread().await?;
        info!("Created thread {}", thread.id);
        self.client.create_message(&thread.id, question).await?;

        let run = self
            .client
            .create_and_poll_run(&thread.id, assistant_id, self.poll_interval)
            .await?;
        if run.status != RunStatus::Completed {
            let error = run.last_error.and_then(|e| e.message);
            match &error {
                Some(message) => writeln!(out, "Run ended with status: {} ({})", run.status, message)?,
                None => writeln!(out, "Run ended with status: {}", run.status)?,
            }
            warn!("Run {} ended with status {}", run.id, run.status);
            return Ok(RunOutcome::Ended { status: run.status, error });
        }
        info!("Run {} completed", run.id);

        let messages = self.client.list_messages(&thread.id, self.message_limit).await?;
        let mut file_ids = Vec::new();
        for message in messages.iter().filter(|m| m.role == "assistant") {
            file_ids.extend(print_message_content(message, out)?);
        }

        let mut downloads = Vec::new();
        for file_id in unique(file_ids) {
            let result = match download_file(self.client, &file_id, &self.out_dir).await {
                Ok(path) => {
                    writeln!(out, "Saved file: {}", path.display())?;
                    DownloadResult::Saved(path)
                }
                Err(e) => {
                    writeln!(out, "Could not download file {file_id}: {e}")?;
                    warn!("Could not download file {}: {}", file_id, e);
                    DownloadResult::Failed(e.to_string())
                }
            };
            downloads.push(DownloadReport { file_id, result });
        }

        Ok(RunOutcome::Completed { downloads })
    }
}

/// Prompts on `out` and reads one question from `input`. Returns `None` at
/// end of input or when the line is blank.
pub async fn read_question<R, W>(input: R, out: &mut W) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    write!(out, "Enter your question for the assistant: ")?;
    out.flush()?;
    let line = input.lines().next_line().await?;
    Ok(line.map(|l| l.trim().to_string()).filter(|q| !q.is_empty()))
}

/// Prints every content part of `message` and returns the file ids it references.
pub fn print_message_content<W: Write>(message: &Message, out: &mut W) -> Result<Vec<String>> {
    let mut file_ids = Vec::new();
    for part in &message.content {
        match part {
            ContentPart::Text { value } => writeln!(out, "\n--- TEXT ---\n\n{value}")?,
            ContentPart::ImageFile { file_id } => {
                writeln!(out, "\n--- IMAGE (file id) ---\n {file_id}")?;
                file_ids.push(file_id.clone());
            }
            ContentPart::OutputFile { file_id } => {
                writeln!(out, "\n--- OUTPUT FILE (file id) ---\n {file_id}")?;
                file_ids.push(file_id.clone());
            }
            ContentPart::FilePath { path } => writeln!(out, "\n--- FILE PATH (sandbox) ---\n {path}")?,
            ContentPart::Other { kind, raw } => {
                info!("Unhandled content part in message {}: {}", message.id, raw);
                writeln!(out, "\n--- {} (unhandled) ---\n {}", kind.to_uppercase(), raw)?;
            }
        }
    }
    Ok(file_ids)
}

fn unique(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// Local name for a downloaded file: the last component of the remote
/// filename, or `<file_id>.bin` when there is none.
pub fn local_file_name(file_id: &str, remote_name: Option<&str>) -> String {
    remote_name
        .and_then(|name| Path::new(name).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("{file_id}.bin"))
}

pub async fn download_file(client: &OpenAIClient, file_id: &str, out_dir: &Path) -> Result<PathBuf> {
    let meta = client.retrieve_file(file_id).await?;
    let out_path = out_dir.join(local_file_name(file_id, meta.filename.as_deref()));
    if let Some(bytes) = meta.bytes {
        debug!("Downloading {} ({} bytes) to {}", file_id, bytes, out_path.display());
    }
    let content = client.file_content(file_id).await?;
    fs::write(&out_path, content)?;
    Ok(out_path)
}
