pub mod chunking;
mod docx;

use futures::future::join_all;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

pub use chunking::{chunk_document, chunk_text, DocumentChunk};

const MIME_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const MIME_OCTET_STREAM: &str = "application/octet-stream";

/// A file handed to the app, before any extraction.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// What the session keeps about a file once its text has been extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

/// Plain text pulled out of one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub name: String,
    pub text: String,
    /// Extraction failed and `text` is a placeholder.
    pub degraded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    PlainText,
    Markdown,
    Csv,
    Json,
    Html,
    Pdf,
    Docx,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported file type: {0}")]
    Unsupported(String),
    #[error("PDF parse error: {0}")]
    Pdf(String),
    #[error("DOCX parse error: {0}")]
    Docx(String),
}

impl UploadedFile {
    /// An empty `mime_type` is filled in from the file extension.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mut mime_type = mime_type.into();
        if mime_type.trim().is_empty() {
            mime_type = mime_from_extension(&extension_of(&name)).to_string();
        }
        Self {
            size: bytes.len() as u64,
            name,
            mime_type,
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ExtractError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        let bytes = fs::read(path)?;
        Ok(Self::new(name, String::new(), bytes))
    }

    pub fn info(&self) -> FileInfo {
        FileInfo {
            name: self.name.clone(),
            size: self.size,
            mime_type: self.mime_type.clone(),
        }
    }

    fn extension(&self) -> String {
        extension_of(&self.name)
    }
}

impl ExtractedDocument {
    pub fn placeholder(name: impl Into<String>, reason: &str) -> Self {
        let name = name.into();
        Self {
            text: format!("[Unable to extract text from {}: {}]", name, reason),
            name,
            degraded: true,
        }
    }
}

fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

pub fn mime_from_extension(ext: &str) -> &'static str {
    match ext {
        "txt" | "log" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "html" | "htm" => "text/html",
        "pdf" => "application/pdf",
        "docx" => MIME_DOCX,
        _ => MIME_OCTET_STREAM,
    }
}

/// Decide how to read a file: MIME type first, then extension, then any `text/*`.
pub fn detect_kind(file: &UploadedFile) -> Option<FileKind> {
    let mime = file
        .mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    let by_mime = match mime.as_str() {
        "text/plain" => Some(FileKind::PlainText),
        "text/markdown" | "text/x-markdown" => Some(FileKind::Markdown),
        "text/csv" => Some(FileKind::Csv),
        "application/json" => Some(FileKind::Json),
        "text/html" => Some(FileKind::Html),
        "application/pdf" => Some(FileKind::Pdf),
        MIME_DOCX => Some(FileKind::Docx),
        _ => None,
    };
    if by_mime.is_some() {
        return by_mime;
    }

    let by_ext = match file.extension().as_str() {
        "txt" | "log" => Some(FileKind::PlainText),
        "md" | "markdown" => Some(FileKind::Markdown),
        "csv" => Some(FileKind::Csv),
        "json" => Some(FileKind::Json),
        "html" | "htm" => Some(FileKind::Html),
        "pdf" => Some(FileKind::Pdf),
        "docx" => Some(FileKind::Docx),
        _ => None,
    };
    if by_ext.is_some() {
        return by_ext;
    }

    mime.starts_with("text/").then_some(FileKind::PlainText)
}

/// Extract the plain text of one file.
pub fn extract(file: &UploadedFile) -> Result<ExtractedDocument, ExtractError> {
    let kind = detect_kind(file).ok_or_else(|| {
        ExtractError::Unsupported(format!("{} ({})", file.name, file.mime_type))
    })?;

    let text = match kind {
        FileKind::PlainText | FileKind::Markdown | FileKind::Csv => decode_utf8(&file.bytes),
        FileKind::Json => {
            let raw = decode_utf8(&file.bytes);
            match serde_json::from_str::<serde_json::Value>(&raw) {
                Ok(value) => serde_json::to_string_pretty(&value).unwrap_or(raw),
                Err(_) => raw,
            }
        }
        FileKind::Html => html_to_text(&decode_utf8(&file.bytes)),
        FileKind::Pdf => pdf_extract::extract_text_from_mem(&file.bytes)
            .map_err(|e| ExtractError::Pdf(e.to_string()))?,
        FileKind::Docx => docx::extract_text(&file.bytes)?,
    };

    Ok(ExtractedDocument {
        name: file.name.clone(),
        text,
        degraded: false,
    })
}

/// Parse a document file on disk into plain text
pub fn parse_file(path: &Path) -> Result<ExtractedDocument, ExtractError> {
    let file = UploadedFile::from_path(path)?;
    extract(&file)
}

/// Extract every file concurrently, one blocking task per file.
///
/// Output order matches input order. A file that cannot be read becomes a
/// placeholder document instead of failing the batch.
pub async fn extract_all(files: Vec<UploadedFile>) -> Vec<ExtractedDocument> {
    let tasks = files.into_iter().map(|file| async move {
        let name = file.name.clone();
        match tokio::task::spawn_blocking(move || extract(&file)).await {
            Ok(Ok(doc)) => doc,
            Ok(Err(e)) => {
                log::warn!("Extraction failed for {}: {}", name, e);
                ExtractedDocument::placeholder(name, &e.to_string())
            }
            Err(e) => {
                log::warn!("Extraction task for {} aborted: {}", name, e);
                ExtractedDocument::placeholder(name, "extraction aborted unexpectedly")
            }
        }
    });
    join_all(tasks).await
}

fn decode_utf8(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
}

struct HtmlPatterns {
    hidden: Regex,
    comment: Regex,
    block: Regex,
    tag: Regex,
    spaces: Regex,
}

static HTML: LazyLock<HtmlPatterns> = LazyLock::new(|| HtmlPatterns {
    hidden: Regex::new(r"(?is)<(?:script|style)\b[^>]*>.*?</(?:script|style)\s*>")
        .expect("valid script/style pattern"),
    comment: Regex::new(r"(?s)<!--.*?-->").expect("valid comment pattern"),
    block: Regex::new(
        r"(?i)</?(?:p|div|br|li|tr|ul|ol|table|pre|title|h[1-6]|blockquote|section|article|header|footer|main|aside|figure|figcaption|details|summary)\b[^>]*>",
    )
    .expect("valid block tag pattern"),
    // A tag must open with a name (or `!` for doctypes), so a bare `<` in text survives.
    tag: Regex::new(r"</?[A-Za-z!][^<>]*>").expect("valid tag pattern"),
    spaces: Regex::new(r"[ \t\u{a0}]+").expect("valid whitespace pattern"),
});

/// Strip markup from an HTML document, dropping `script`/`style` bodies.
fn html_to_text(html: &str) -> String {
    let patterns = &*HTML;
    let text = patterns.hidden.replace_all(html, "");
    let text = patterns.comment.replace_all(&text, "");
    let text = patterns.block.replace_all(&text, "\n");
    let text = patterns.tag.replace_all(&text, "");
    let text = html_escape::decode_html_entities(&text);
    let text = patterns.spaces.replace_all(&text, " ");
    collapse_blank_lines(&text)
}

fn collapse_blank_lines(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() && out.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_is_guessed_from_extension_when_missing() {
        let file = UploadedFile::new("Notes.MD", "", b"# hi".to_vec());
        assert_eq!(file.mime_type, "text/markdown");
        assert_eq!(file.size, 4);
        assert_eq!(detect_kind(&file), Some(FileKind::Markdown));
    }

    #[test]
    fn mime_wins_over_extension() {
        let file = UploadedFile::new("export.bin", "text/csv; charset=utf-8", b"a,b".to_vec());
        assert_eq!(detect_kind(&file), Some(FileKind::Csv));
    }

    #[test]
    fn octet_stream_falls_back_to_extension() {
        let file = UploadedFile::new("paper.pdf", MIME_OCTET_STREAM, Vec::new());
        assert_eq!(detect_kind(&file), Some(FileKind::Pdf));
    }

    #[test]
    fn unknown_text_subtype_reads_as_plain_text() {
        let file = UploadedFile::new("main.rs", "text/x-rust", b"fn main() {}".to_vec());
        assert_eq!(detect_kind(&file), Some(FileKind::PlainText));
        assert_eq!(extract(&file).unwrap().text, "fn main() {}");
    }

    #[test]
    fn unsupported_type_is_an_error() {
        let file = UploadedFile::new("photo.png", "image/png", vec![0x89, 0x50]);
        assert!(matches!(extract(&file), Err(ExtractError::Unsupported(_))));
    }

    #[test]
    fn plain_text_drops_bom() {
        let mut bytes = "\u{feff}hello".as_bytes().to_vec();
        bytes.extend_from_slice(b" world");
        let file = UploadedFile::new("a.txt", "", bytes);
        let doc = extract(&file).unwrap();
        assert_eq!(doc.text, "hello world");
        assert!(!doc.degraded);
    }

    #[test]
    fn json_is_pretty_printed_when_valid() {
        let file = UploadedFile::new("data.json", "", br#"{"a":1}"#.to_vec());
        assert_eq!(extract(&file).unwrap().text, "{\n  \"a\": 1\n}");

        let broken = UploadedFile::new("data.json", "", b"{not json".to_vec());
        assert_eq!(extract(&broken).unwrap().text, "{not json");
    }

    #[test]
    fn html_strips_tags_scripts_and_entities() {
        let html = "<html><head><title>T</title><style>p { color: red; }</style>\
                    <script>alert('<b>x</b>')</script></head>\
                    <body><h1>Heading</h1><p>Fish &amp; chips &lt;3</p></body></html>";
        assert_eq!(html_to_text(html), "T\n\nHeading\n\nFish & chips <3");
        assert_eq!(html_to_text("one<br>two"), "one\ntwo");
    }

    #[test]
    fn html_decodes_numeric_and_named_entities() {
        assert_eq!(
            html_to_text("<p>It&#8217;s &copy; 2024 &eacute;t&#xE9;</p>"),
            "It\u{2019}s \u{a9} 2024 \u{e9}t\u{e9}"
        );
        assert_eq!(html_to_text("a&nbsp;&nbsp;b"), "a b");
    }

    #[test]
    fn html_keeps_text_around_a_bare_less_than() {
        assert_eq!(
            html_to_text("<p>if x < 3 then stop.</p><p>Second</p>"),
            "if x < 3 then stop.\n\nSecond"
        );
        assert_eq!(html_to_text("<p>x < 3 means the tail"), "x < 3 means the tail");
        assert_eq!(html_to_text("hello <b"), "hello <b");
    }

    #[test]
    fn html_drops_comments_and_doctype() {
        let html = "<!DOCTYPE html><!-- draft <p>hidden</p> --><div>shown</div>";
        assert_eq!(html_to_text(html), "shown");
    }

    #[test]
    fn invalid_pdf_is_reported_not_panicked() {
        let file = UploadedFile::new("broken.pdf", "application/pdf", b"not a pdf".to_vec());
        assert!(matches!(extract(&file), Err(ExtractError::Pdf(_))));
    }

    #[test]
    fn parse_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readme.txt");
        fs::write(&path, "on disk").unwrap();
        let doc = parse_file(&path).unwrap();
        assert_eq!(doc.name, "readme.txt");
        assert_eq!(doc.text, "on disk");
    }

    #[tokio::test]
    async fn extract_all_keeps_order_and_degrades_failures() {
        let files = vec![
            UploadedFile::new("a.txt", "", b"alpha".to_vec()),
            UploadedFile::new("b.png", "image/png", vec![1, 2, 3]),
            UploadedFile::new("c.md", "", b"gamma".to_vec()),
        ];
        let docs = extract_all(files).await;

        let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.png", "c.md"]);
        assert_eq!(docs[0].text, "alpha");
        assert!(docs[1].degraded);
        assert!(docs[1].text.starts_with("[Unable to extract text from b.png:"));
        assert_eq!(docs[2].text, "gamma");
    }
}
