use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct Thread {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Cancelling,
    RequiresAction,
    Cancelled,
    Failed,
    Completed,
    Expired,
    Incomplete,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Whether polling should stop. Unrecognized statuses count as terminal.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Queued | Self::InProgress | Self::Cancelling)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Cancelling => "cancelling",
            Self::RequiresAction => "requires_action",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Incomplete => "incomplete",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageList {
    pub data: Vec<Message>,
}

/// One piece of an assistant message. Kinds the client does not know about
/// are kept verbatim in [`ContentPart::Other`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum ContentPart {
    Text { value: String },
    ImageFile { file_id: String },
    OutputFile { file_id: String },
    FilePath { path: String },
    Other { kind: String, raw: Value },
}

impl ContentPart {
    pub fn kind(&self) -> &str {
        match self {
            Self::Text { .. } => "text",
            Self::ImageFile { .. } => "image_file",
            Self::OutputFile { .. } => "output_file",
            Self::FilePath { .. } => "file_path",
            Self::Other { kind, .. } => kind,
        }
    }

    /// Identifier of a downloadable file referenced by this part.
    pub fn file_id(&self) -> Option<&str> {
        match self {
            Self::ImageFile { file_id } | Self::OutputFile { file_id } => Some(file_id),
            _ => None,
        }
    }
}

fn nested_str<'a>(raw: &'a Value, outer: &str, inner: &str) -> Option<&'a str> {
    raw.get(outer)?.get(inner)?.as_str()
}

impl From<Value> for ContentPart {
    fn from(raw: Value) -> Self {
        let kind = raw.get("type").and_then(Value::as_str).unwrap_or("unknown").to_string();
        let known = match kind.as_str() {
            "text" => nested_str(&raw, "text", "value").map(|v| Self::Text { value: v.to_string() }),
            "image_file" => nested_str(&raw, "image_file", "file_id")
                .map(|id| Self::ImageFile { file_id: id.to_string() }),
            "output_file" => nested_str(&raw, "output_file", "file_id")
                .map(|id| Self::OutputFile { file_id: id.to_string() }),
            "file_path" => {
                nested_str(&raw, "file_path", "path").map(|p| Self::FilePath { path: p.to_string() })
            }
            _ => None,
        };
        known.unwrap_or(Self::Other { kind, raw })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileObject {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct EmbeddingRequest<'a> {
    pub model: &'a str,
    pub input: &'a [String],
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingData {
    pub index: usize,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
}

#[derive(Debug, Serialize)]
pub struct InputMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ResponseRequest<'a> {
    pub model: &'a str,
    pub input: Vec<InputMessage<'a>>,
}

#[derive(Debug, Deserialize)]
pub struct OutputContent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OutputItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseObject {
    #[serde(default)]
    pub output: Vec<OutputItem>,
}

impl ResponseObject {
    /// Concatenated text of every `output_text` part of every message output.
    pub fn output_text(&self) -> String {
        self.output
            .iter()
            .filter(|item| item.kind == "message")
            .flat_map(|item| item.content.iter())
            .filter(|part| part.kind == "output_text")
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_content_parts() {
        let parts: Vec<ContentPart> = serde_json::from_value(json!([
            {"type": "text", "text": {"value": "hi", "annotations": []}},
            {"type": "image_file", "image_file": {"file_id": "file-img"}},
            {"type": "output_file", "output_file": {"file_id": "file-out"}},
            {"type": "file_path", "file_path": {"path": "/mnt/data/a.csv"}}
        ]))
        .unwrap();

        assert_eq!(
            parts,
            vec![
                ContentPart::Text { value: "hi".into() },
                ContentPart::ImageFile { file_id: "file-img".into() },
                ContentPart::OutputFile { file_id: "file-out".into() },
                ContentPart::FilePath { path: "/mnt/data/a.csv".into() },
            ]
        );
        assert_eq!(parts[1].file_id(), Some("file-img"));
        assert_eq!(parts[3].file_id(), None);
    }

    #[test]
    fn unknown_content_parts_are_preserved() {
        let raw = json!({"type": "image_url", "image_url": {"url": "https://x/y.png"}});
        let part: ContentPart = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(part, ContentPart::Other { kind: "image_url".into(), raw });
        assert_eq!(part.kind(), "image_url");
    }

    #[test]
    fn malformed_known_part_falls_back_to_other() {
        let raw = json!({"type": "text", "text": "flat"});
        let part: ContentPart = serde_json::from_value(raw).unwrap();
        assert!(matches!(part, ContentPart::Other { ref kind, .. } if kind == "text"));
    }

    #[test]
    fn run_status_terminality() {
        let status: RunStatus = serde_json::from_value(json!("in_progress")).unwrap();
        assert!(!status.is_terminal());
        let status: RunStatus = serde_json::from_value(json!("requires_action")).unwrap();
        assert!(status.is_terminal());
        let status: RunStatus = serde_json::from_value(json!("brand_new_state")).unwrap();
        assert_eq!(status, RunStatus::Unknown);
        assert!(status.is_terminal());
        assert_eq!(RunStatus::Completed.to_string(), "completed");
    }

    #[test]
    fn output_text_joins_message_parts() {
        let response: ResponseObject = serde_json::from_value(json!({
            "output": [
                {"type": "reasoning", "content": []},
                {"type": "message", "content": [
                    {"type": "output_text", "text": "Paris"},
                    {"type": "refusal", "refusal": "no"},
                    {"type": "output_text", "text": ", France."}
                ]}
            ]
        }))
        .unwrap();
        assert_eq!(response.output_text(), "Paris, France.");
    }
}
