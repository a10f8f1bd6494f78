//! Plain-text extraction from local documents.

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::chunk::Chunker;
use crate::error::{Error, Result};

static HIDDEN_ELEMENTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<noscript\b[^>]*>.*?</noscript\s*>")
        .expect("hidden element pattern")
});
static COMMENTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern"));
static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern"));
static SPACE_BEFORE_NEWLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+\n").expect("whitespace pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    PlainText,
    Html,
    Docx,
    Other,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Self::Pdf,
            "txt" | "md" | "csv" => Self::PlainText,
            "html" | "htm" => Self::Html,
            "docx" => Self::Docx,
            _ => Self::Other,
        }
    }
}

/// Reads `path` and returns its text content according to the file extension.
pub fn extract_text(path: &Path) -> Result<String> {
    let kind = DocumentKind::from_path(path);
    let bytes = fs::read(path)?;
    debug!("Extracting {:?} ({} bytes) as {:?}", path, bytes.len(), kind);

    match kind {
        DocumentKind::Pdf => pdf_text(&bytes),
        DocumentKind::PlainText => Ok(decode_detected(&bytes)),
        DocumentKind::Html => Ok(html_to_text(&decode_utf8_lossy(&bytes))),
        DocumentKind::Docx => docx_text(&bytes),
        DocumentKind::Other => Ok(decode_utf8_lossy(&bytes)),
    }
}

fn pdf_text(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| Error::Pdf(e.to_string()))
}

/// Decodes bytes using a BOM if present, otherwise a detected encoding.
/// Malformed sequences are dropped.
pub fn decode_detected(bytes: &[u8]) -> String {
    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) => (encoding, &bytes[bom_len..]),
        None => {
            let mut detector = chardetng::EncodingDetector::new();
            detector.feed(bytes, true);
            (detector.guess(None, true), bytes)
        }
    };
    decode_dropping_errors(encoding, body)
}

/// Decodes bytes as UTF-8, dropping invalid sequences.
pub fn decode_utf8_lossy(bytes: &[u8]) -> String {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    decode_dropping_errors(UTF_8, body)
}

fn decode_dropping_errors(encoding: &'static Encoding, bytes: &[u8]) -> String {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        text.chars().filter(|c| *c != char::REPLACEMENT_CHARACTER).collect()
    } else {
        text.into_owned()
    }
}

/// Reduces an HTML document to its visible text.
pub fn html_to_text(html: &str) -> String {
    let text = HIDDEN_ELEMENTS.replace_all(html, "");
    let text = COMMENTS.replace_all(&text, "");
    let text = TAGS.replace_all(&text, " ");
    let text = html_escape::decode_html_entities(&text);
    SPACE_BEFORE_NEWLINE.replace_all(text.trim(), "\n").into_owned()
}

fn docx_text(bytes: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    archive.by_name("word/document.xml")?.read_to_string(&mut xml)?;
    docx_xml_to_text(&xml)
}

/// Collects paragraph text from a WordprocessingML body, one line per
/// non-empty paragraph. Text box content (`w:txbxContent`) is skipped.
pub fn docx_xml_to_text(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut text_box_depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"w:txbxContent" => text_box_depth += 1,
            Event::End(e) if e.name().as_ref() == b"w:txbxContent" => {
                text_box_depth = text_box_depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ if text_box_depth > 0 => {}
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => current.clear(),
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => current.push('\t'),
                b"w:br" | b"w:cr" => current.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => current.push_str(&t.unescape()?),
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    if !current.is_empty() {
                        paragraphs.push(std::mem::take(&mut current));
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    Ok(paragraphs.join("\n"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub path: PathBuf,
    pub chars: usize,
    pub chunks: usize,
}

/// Chunks of every readable input document, in input order.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub chunks: Vec<String>,
    pub documents: Vec<DocumentSummary>,
    pub skipped: Vec<PathBuf>,
}

impl Corpus {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Extracts and chunks each path. Missing paths are logged and skipped.
pub fn load_corpus<P: AsRef<Path>>(paths: &[P], chunker: &Chunker) -> Result<Corpus> {
    let mut corpus = Corpus::default();

    for path in paths {
        let path = path.as_ref();
        if !path.exists() {
            warn!("file not found: {}", path.display());
            corpus.skipped.push(path.to_path_buf());
            continue;
        }

        let text = extract_text(path)?;
        let chunks = chunker.split(&text);
        let chars = text.chars().count();
        info!("Read {} ({} chars, {} chunks)", path.display(), chars, chunks.len());

        corpus.documents.push(DocumentSummary {
            path: path.to_path_buf(),
            chars,
            chunks: chunks.len(),
        });
        corpus.chunks.extend(chunks);
    }

    Ok(corpus)
}
