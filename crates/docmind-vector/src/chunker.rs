//! Overlapping fixed-size text windows.
//!
//! Window size and overlap are counted in `cl100k_base` BPE tokens, the
//! encoding of the OpenAI embedding models. Windows are cut only where the
//! decoded token stream lands on a character boundary, so every window is a
//! byte-exact slice of the source text.

use std::ops::Range;
use std::sync::OnceLock;

use tiktoken_rs::CoreBPE;

use docmind_core::config::ChunkingConfig;
use docmind_core::error::{DocmindError, Result};
use docmind_core::types::Chunk;

static CL100K: OnceLock<std::result::Result<CoreBPE, String>> = OnceLock::new();

/// Shared `cl100k_base` encoder, built on first use.
fn encoding() -> Result<&'static CoreBPE> {
    CL100K
        .get_or_init(|| tiktoken_rs::cl100k_base().map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| DocmindError::Config(format!("failed to load cl100k_base encoding: {e}")))
}

/// One window, as token and byte ranges of the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Window {
    tokens: Range<usize>,
    bytes: Range<usize>,
}

/// Splits document text into windows of at most `chunk_size` tokens where
/// each window after the first repeats about the last `overlap` tokens of its
/// predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentChunker {
    chunk_size: usize,
    overlap: usize,
}

impl DocumentChunker {
    pub const DEFAULT_CHUNK_SIZE: usize = 800;
    pub const DEFAULT_OVERLAP: usize = 80;

    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(DocmindError::invalid("chunk size must be greater than zero"));
        }
        if overlap >= chunk_size {
            return Err(DocmindError::invalid(format!(
                "overlap ({overlap}) must be smaller than chunk size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Number of tokens `text` encodes to.
    pub fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(encoding()?.encode_ordinary(text).len())
    }

    /// Split `text` into overlapping windows.
    ///
    /// Empty text yields no windows; text of at most `chunk_size` tokens
    /// yields itself.
    pub fn split(&self, text: &str) -> Result<Vec<String>> {
        self.windows(text)?
            .into_iter()
            .map(|w| {
                text.get(w.bytes.clone())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        DocmindError::Config(format!(
                            "tokenizer cut {:?} is not a character boundary",
                            w.bytes
                        ))
                    })
            })
            .collect()
    }

    /// Same windows as [`split`](Self::split), tagged with their position.
    pub fn chunks(&self, text: &str) -> Result<Vec<Chunk>> {
        Ok(self
            .split(text)?
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk { index, text })
            .collect())
    }

    fn windows(&self, text: &str) -> Result<Vec<Window>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let bpe = encoding()?;
        let tokens = bpe.encode_ordinary(text);
        let total = tokens.len();

        if total <= self.chunk_size {
            return Ok(vec![Window {
                tokens: 0..total,
                bytes: 0..text.len(),
            }]);
        }

        let cuts = cut_points(bpe, &tokens, text.len());
        let mut windows = Vec::with_capacity(total / (self.chunk_size - self.overlap) + 1);
        let mut start = 0;
        loop {
            let (start_tok, start_byte) = cuts[start];

            // Furthest cut within budget, but always take at least one group.
            let limit = start_tok + self.chunk_size;
            let end = (cuts.partition_point(|&(tok, _)| tok <= limit) - 1).max(start + 1);
            let (end_tok, end_byte) = cuts[end];
            windows.push(Window {
                tokens: start_tok..end_tok,
                bytes: start_byte..end_byte,
            });
            if end == cuts.len() - 1 {
                break;
            }

            let target = end_tok.saturating_sub(self.overlap);
            start = (cuts.partition_point(|&(tok, _)| tok <= target) - 1).max(start + 1);
        }
        Ok(windows)
    }
}

/// `(token index, byte offset)` of every position where the decoded prefix
/// ends on a character boundary, from `(0, 0)` to `(tokens.len(), text_len)`.
///
/// Tokens that carry only part of a multi-byte character are grouped with
/// their neighbours until the group decodes as UTF-8.
fn cut_points(bpe: &CoreBPE, tokens: &[u32], text_len: usize) -> Vec<(usize, usize)> {
    let mut cuts = Vec::with_capacity(tokens.len() + 1);
    cuts.push((0, 0));
    let mut group_start = 0;
    let mut offset = 0;
    for i in 0..tokens.len() {
        if let Ok(decoded) = bpe.decode(tokens[group_start..=i].to_vec()) {
            offset += decoded.len();
            cuts.push((i + 1, offset));
            group_start = i + 1;
        }
    }
    match cuts.last_mut() {
        Some(last) if last.0 == tokens.len() => last.1 = text_len,
        _ => cuts.push((tokens.len(), text_len)),
    }
    cuts
}

impl Default for DocumentChunker {
    fn default() -> Self {
        Self {
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            overlap: Self::DEFAULT_OVERLAP,
        }
    }
}
