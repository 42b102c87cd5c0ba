use super::ExtractedDocument;
use serde::{Deserialize, Serialize};

/// A window of a document's text, as stored in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub source: String,
    pub index: usize,
    pub total: usize,
}

/// Split text into overlapping chunks for embedding.
///
/// Sizes are in characters. Consecutive windows share `overlap` characters
/// (before trimming); the step is always at least one character.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return vec![];
    }

    let chars: Vec<char> = text.chars().collect();
    let chunk_size = chunk_size.max(1);
    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        if end >= chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

pub fn chunk_document(doc: &ExtractedDocument, chunk_size: usize, overlap: usize) -> Vec<DocumentChunk> {
    let pieces = chunk_text(&doc.text, chunk_size, overlap);
    let total = pieces.len();
    pieces
        .into_iter()
        .enumerate()
        .map(|(index, text)| DocumentChunk {
            text,
            source: doc.name.clone(),
            index,
            total,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chunk_text_short() {
        let chunks = chunk_text("Hello world", 100, 20);
        assert_eq!(chunks, vec!["Hello world"]);
    }

    #[test]
    fn test_chunk_text_empty() {
        assert!(chunk_text("   \n\t ", 100, 20).is_empty());
    }

    #[test]
    fn test_chunk_text_overlap() {
        let text: String = ('a'..='z').cycle().take(100).collect();
        let chunks = chunk_text(&text, 40, 10);
        // windows start at 0, 30, 60; the third one reaches the end
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 40);
        assert_eq!(&chunks[0][30..], &chunks[1][..10]);
        assert_eq!(&chunks[1][30..], &chunks[2][..10]);
        assert!(text.ends_with(chunks[2].as_str()));
    }

    #[test]
    fn test_chunk_text_counts_chars_not_bytes() {
        let text = "é".repeat(10);
        let chunks = chunk_text(&text, 4, 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
        assert_eq!(chunks[0], "éééé");
        assert_eq!(chunk_text(&text, 10, 2), vec![text.clone()]);
    }

    #[test]
    fn test_chunk_text_degenerate_overlap_still_advances() {
        let chunks = chunk_text("abcdefgh", 3, 5);
        assert_eq!(chunks, vec!["abc", "bcd", "cde", "def", "efg", "fgh"]);
    }

    #[test]
    fn test_chunk_text_drops_whitespace_windows() {
        let text = format!("start{}end", " ".repeat(20));
        let chunks = chunk_text(&text, 8, 0);
        assert_eq!(chunks, vec!["start", "end"]);
    }

    #[test]
    fn test_chunk_document_stamps_position() {
        let doc = ExtractedDocument {
            name: "notes.txt".into(),
            text: "x".repeat(25),
            degraded: false,
        };
        let chunks = chunk_document(&doc, 10, 0);
        assert_eq!(chunks.len(), 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.source, "notes.txt");
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.total, 3);
        }
        assert_eq!(chunks[2].text, "xxxxx");
    }
}
