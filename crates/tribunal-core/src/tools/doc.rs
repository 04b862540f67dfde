//! Report document ingestion: text loading, chunking, keyword search.
//!
//! The ingestion format is UTF-8 text or markdown. Image extraction keeps
//! its interface slot but yields nothing until a rasterizer backend exists.

use crate::errors::DocumentLoadError;
use std::path::Path;

/// Load the full text of a document.
pub fn load_text(path: &Path) -> Result<String, DocumentLoadError> {
    if !path.exists() {
        return Err(DocumentLoadError::NotFound(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|source| DocumentLoadError::Unreadable {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and chunk a document in one step.
pub fn ingest(path: &Path, max_chars: usize) -> Result<Vec<String>, DocumentLoadError> {
    Ok(chunk_text(&load_text(path)?, max_chars))
}

/// Raw image blobs embedded in the document.
pub fn extract_images(path: &Path) -> Result<Vec<Vec<u8>>, DocumentLoadError> {
    if !path.exists() {
        return Err(DocumentLoadError::NotFound(path.to_path_buf()));
    }
    // Text ingestion carries no embedded images.
    Ok(Vec::new())
}

/// Split text into chunks of at most `max_chars` characters, respecting
/// paragraph boundaries where possible.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() || max_chars == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for para in text.split("\n\n") {
        let para = para.trim();
        if para.is_empty() {
            continue;
        }

        if !current.is_empty() && char_count(&current) + char_count(para) + 2 > max_chars {
            chunks.push(std::mem::take(&mut current));
            current = para.to_string();
        } else if current.is_empty() {
            current = para.to_string();
        } else {
            current.push_str("\n\n");
            current.push_str(para);
        }

        // A single paragraph can exceed the bound on its own.
        while char_count(&current) > max_chars {
            let split = byte_index_of_char(&current, max_chars);
            let rest = current[split..].trim_start().to_string();
            current.truncate(split);
            chunks.push(std::mem::take(&mut current));
            current = rest;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn char_count(s: &str) -> usize {
    s.chars().count()
}

fn byte_index_of_char(s: &str, nth: usize) -> usize {
    s.char_indices().nth(nth).map(|(i, _)| i).unwrap_or(s.len())
}

/// Top-k chunks ranked by case-insensitive keyword frequency.
///
/// Chunks without a hit are excluded; ties keep ingestion order.
pub fn keyword_search<'a>(chunks: &'a [String], query: &str, top_k: usize) -> Vec<&'a str> {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    let mut scored: Vec<(usize, &str)> = chunks
        .iter()
        .filter_map(|chunk| {
            let score = chunk.to_lowercase().matches(&needle).count();
            (score > 0).then_some((score, chunk.as_str()))
        })
        .collect();
    scored.sort_by_key(|(score, _)| std::cmp::Reverse(*score));
    scored.into_iter().take(top_k).map(|(_, c)| c).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_document_is_a_typed_error() {
        let err = load_text(Path::new("/no/such/report.md")).unwrap_err();
        assert!(matches!(err, DocumentLoadError::NotFound(_)));
    }

    #[test]
    fn chunking_respects_paragraph_boundaries() {
        let text = "first paragraph\n\nsecond paragraph\n\nthird";
        let chunks = chunk_text(text, 35);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].contains("first paragraph"));
        assert!(chunks[0].contains("second paragraph"));
        assert_eq!(chunks[1], "third");
    }

    #[test]
    fn oversized_paragraph_is_split_hard() {
        let text = "a".repeat(25);
        let chunks = chunk_text(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }

    #[test]
    fn chunking_survives_multibyte_text() {
        let text = "héllo wörld ".repeat(30);
        let chunks = chunk_text(&text, 50);
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.chars().count() <= 50));
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", 100).is_empty());
        assert!(chunk_text("\n\n\n\n", 100).is_empty());
    }

    #[test]
    fn keyword_search_ranks_by_frequency() {
        let chunks = vec![
            "trust debt appears once".to_string(),
            "trust debt and trust debt again".to_string(),
            "nothing relevant".to_string(),
        ];
        let hits = keyword_search(&chunks, "Trust Debt", 5);
        assert_eq!(hits.len(), 2);
        assert!(hits[0].contains("again"));
    }

    #[test]
    fn keyword_search_respects_top_k() {
        let chunks = vec!["x".to_string(), "x x".to_string(), "x x x".to_string()];
        let hits = keyword_search(&chunks, "x", 1);
        assert_eq!(hits, vec!["x x x"]);
    }

    #[test]
    fn image_extraction_is_empty_for_text_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        std::fs::write(&path, "# report").unwrap();
        assert!(extract_images(&path).unwrap().is_empty());
        assert!(extract_images(Path::new("/no/such.md")).is_err());
    }
}
