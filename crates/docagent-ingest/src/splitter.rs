//! Recursive character text splitter.
//!
//! Tries separators from coarsest to finest ("\n\n", "\n", " ", ""), keeps
//! each separator at the start of the piece that follows it, then greedily
//! merges pieces into chunks of at most `chunk_size` characters, carrying up
//! to `chunk_overlap` characters of trailing pieces into the next chunk.

use docagent_core::error::{DocAgentError, Result};
use docagent_core::types::DocumentChunk;

use crate::loader::LoadedDocument;

#[derive(Debug, Clone)]
pub struct RecursiveTextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl RecursiveTextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        Self::with_separators(
            chunk_size,
            chunk_overlap,
            vec!["\n\n".into(), "\n".into(), " ".into(), String::new()],
        )
    }

    pub fn with_separators(
        chunk_size: usize,
        chunk_overlap: usize,
        separators: Vec<String>,
    ) -> Result<Self> {
        if chunk_size == 0 {
            return Err(DocAgentError::Config("chunk_size must be > 0".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(DocAgentError::Config(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators,
        })
    }

    pub fn from_config(config: &docagent_core::config::ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    /// Split every document, copying its metadata onto each chunk.
    pub fn split_documents(&self, docs: &[LoadedDocument]) -> Vec<DocumentChunk> {
        docs.iter()
            .flat_map(|doc| {
                self.split_text(&doc.text)
                    .into_iter()
                    .map(|text| DocumentChunk {
                        text,
                        metadata: doc.metadata.clone(),
                    })
            })
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        // First separator present in the text; "" always matches.
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = "";
                break;
            }
            if text.contains(sep.as_str()) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut good: Vec<String> = Vec::new();
        for piece in split_keep_start(text, separator) {
            if char_len(&piece) < self.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                chunks.extend(self.merge(&good));
                good.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_recursive(&piece, remaining));
            }
        }
        if !good.is_empty() {
            chunks.extend(self.merge(&good));
        }
        chunks
    }

    /// Greedy merge with overlap. Pieces already carry their separators.
    fn merge(&self, pieces: &[String]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        "Created a chunk of size {total}, which is longer than the specified {}",
                        self.chunk_size
                    );
                }
                if !current.is_empty() {
                    push_joined(&mut docs, &current);
                    while total > self.chunk_overlap
                        || (total + len > self.chunk_size && total > 0)
                    {
                        total -= char_len(current.remove(0));
                    }
                }
            }
            current.push(piece);
            total += len;
        }
        push_joined(&mut docs, &current);
        docs
    }
}

fn push_joined(docs: &mut Vec<String>, parts: &[&str]) {
    let joined = parts.concat();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        docs.push(trimmed.to_string());
    }
}

/// Split on `separator`, attaching it to the start of every piece after the
/// first. An empty separator splits into single characters. Empty pieces are dropped.
fn split_keep_start(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }
    let mut pieces = Vec::new();
    let mut parts = text.split(separator);
    if let Some(first) = parts.next() {
        pieces.push(first.to_string());
    }
    pieces.extend(parts.map(|p| format!("{separator}{p}")));
    pieces.retain(|p| !p.is_empty());
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use docagent_core::types::ChunkMetadata;

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(RecursiveTextSplitter::new(0, 0).is_err());
        assert!(RecursiveTextSplitter::new(20, 20).is_err());
        assert!(RecursiveTextSplitter::new(200, 20).is_ok());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let splitter = RecursiveTextSplitter::new(200, 20).unwrap();
        assert_eq!(splitter.split_text("  Revenue grew 12%.  "), vec!["Revenue grew 12%."]);
        assert!(splitter.split_text("   ").is_empty());
    }

    #[test]
    fn test_split_keep_start() {
        assert_eq!(split_keep_start("a\n\nb\n\nc", "\n\n"), vec!["a", "\n\nb", "\n\nc"]);
        assert_eq!(split_keep_start("\n\nb", "\n\n"), vec!["\n\nb"]);
        assert_eq!(split_keep_start("ab", ""), vec!["a", "b"]);
    }

    #[test]
    fn test_word_level_split_with_overlap() {
        let splitter = RecursiveTextSplitter::new(10, 4).unwrap();
        let chunks = splitter.split_text("aaa bbb ccc ddd");
        assert_eq!(chunks, vec!["aaa bbb", "bbb ccc", "ccc ddd"]);
    }

    #[test]
    fn test_paragraphs_merge_until_full() {
        let splitter = RecursiveTextSplitter::new(12, 0).unwrap();
        let chunks = splitter.split_text("one\n\ntwo\n\nthree four five");
        assert_eq!(chunks, vec!["one\n\ntwo", "three four", "five"]);
    }

    #[test]
    fn test_chunks_respect_size() {
        let text = "Tech companies face supply constraints. ".repeat(40)
            + "\n\n"
            + &"Cloud revenue accelerated in Q4. ".repeat(30);
        let splitter = RecursiveTextSplitter::new(200, 20).unwrap();
        let chunks = splitter.split_text(&text);
        assert!(chunks.len() > 5);
        assert!(chunks.iter().all(|c| c.chars().count() <= 200));
    }

    #[test]
    fn test_unbreakable_word_falls_back_to_chars() {
        let splitter = RecursiveTextSplitter::new(5, 1).unwrap();
        let chunks = splitter.split_text("abcdefghij");
        assert!(chunks.iter().all(|c| c.chars().count() <= 5));
        assert_eq!(chunks.first().map(String::as_str), Some("abcde"));
    }

    #[test]
    fn test_splitting_is_deterministic() {
        let text = "Nvidia data center revenue rose.\nGaming was flat.\n\nGuidance raised for Q1. "
            .repeat(25);
        let splitter = RecursiveTextSplitter::new(200, 20).unwrap();
        assert_eq!(splitter.split_text(&text), splitter.split_text(&text));
    }

    #[test]
    fn test_split_documents_copies_metadata() {
        let doc = LoadedDocument {
            text: "word ".repeat(100),
            metadata: ChunkMetadata {
                title: "apple.pdf".into(),
                source: "https://app.box.com/file/7".into(),
                extra: Default::default(),
            },
        };
        let splitter = RecursiveTextSplitter::new(50, 5).unwrap();
        let chunks = splitter.split_documents(&[doc]);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.metadata.title == "apple.pdf"));
    }
}
