//! Recursive separator-priority text splitter.
//!
//! Pieces are byte ranges into the document, so chunks are exact substrings and
//! their non-overlapping parts concatenate back to the original text, except for
//! whitespace-only runs too long to fold into a neighbouring chunk.
use std::collections::VecDeque;
use std::ops::Range;
use std::sync::Arc;

use tiktoken_rs::{cl100k_base, CoreBPE};
use tracing::debug;

use crate::config::{ChunkingSettings, LengthUnit};
use crate::error::{Error, Result};
use crate::identity::chunk_id;
use crate::types::{Chunk, Document};

pub type LengthFn = Arc<dyn Fn(&str) -> usize + Send + Sync>;

#[derive(Clone)]
enum Measure {
    Characters,
    Tokens(Arc<CoreBPE>),
    Custom(LengthFn),
}

impl Measure {
    fn len(&self, s: &str) -> usize {
        match self {
            Measure::Characters => s.chars().count(),
            Measure::Tokens(bpe) => bpe.encode_ordinary(s).len(),
            Measure::Custom(f) => f(s),
        }
    }
}

#[derive(Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
    measure: Measure,
}

impl Chunker {
    pub fn new(settings: &ChunkingSettings) -> Result<Self> {
        let measure = match settings.length_unit {
            LengthUnit::Characters => Measure::Characters,
            LengthUnit::Tokens => {
                let bpe = cl100k_base().map_err(|e| Error::InvalidConfig(format!("cl100k_base tokenizer unavailable: {e}")))?;
                Measure::Tokens(Arc::new(bpe))
            }
        };
        Self::build(settings, measure)
    }

    /// Chunker measuring length with a caller-supplied function.
    pub fn with_length_fn(settings: &ChunkingSettings, length: LengthFn) -> Result<Self> {
        Self::build(settings, Measure::Custom(length))
    }

    fn build(settings: &ChunkingSettings, measure: Measure) -> Result<Self> {
        if settings.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be positive".into()));
        }
        if settings.chunk_overlap > settings.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk overlap ({}) is larger than chunk size ({})",
                settings.chunk_overlap, settings.chunk_size
            )));
        }
        if settings.separators.is_empty() {
            return Err(Error::InvalidConfig("at least one separator is required".into()));
        }
        Ok(Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
            separators: settings.separators.clone(),
            measure,
        })
    }

    /// Length of `text` in the configured unit.
    pub fn measure(&self, text: &str) -> usize { self.measure.len(text) }

    /// Split a document into chunks with stable ids.
    pub fn chunk_document(&self, document: &Document) -> Result<Vec<Chunk>> {
        let spans = self.split_spans(&document.text)?;
        let chunks: Vec<Chunk> = spans
            .into_iter()
            .enumerate()
            .map(|(index, span)| {
                let text = document.text[span.clone()].to_string();
                let page = document.page_at(span.start);
                Chunk {
                    id: chunk_id(&document.source, page, index, span.start, &text),
                    source: document.source.clone(),
                    text,
                    index,
                    start: span.start,
                    end: span.end,
                    page,
                }
            })
            .collect();
        debug!(source = %document.source, chunks = chunks.len(), "chunked document");
        Ok(chunks)
    }

    /// Byte ranges of the chunks of `text`, in document order.
    pub fn split_spans(&self, text: &str) -> Result<Vec<Range<usize>>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let mut spans = Vec::new();
        self.split_recursive(text, 0..text.len(), &self.separators, &mut spans)?;
        Ok(self.absorb_blank_spans(text, spans))
    }

    fn split_recursive(&self, text: &str, span: Range<usize>, separators: &[String], out: &mut Vec<Range<usize>>) -> Result<()> {
        let piece = &text[span.clone()];

        // First separator present in the piece wins; the empty separator always matches.
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = "";
                break;
            }
            if piece.contains(sep.as_str()) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut good: Vec<(Range<usize>, usize)> = Vec::new();
        for split in split_keep_separator(piece, separator) {
            let split = (span.start + split.start)..(span.start + split.end);
            let len = self.measure.len(&text[split.clone()]);
            if len < self.chunk_size {
                good.push((split, len));
                continue;
            }
            if !good.is_empty() {
                out.extend(self.merge(&good));
                good.clear();
            }
            if !remaining.is_empty() {
                self.split_recursive(text, split, remaining, out)?;
            } else if len <= self.chunk_size {
                out.push(split);
            } else if !separator.is_empty() {
                // separators exhausted: hard character split
                self.split_recursive(text, split, &[String::new()], out)?;
            } else {
                return Err(Error::Chunking { unit_len: len, chunk_size: self.chunk_size });
            }
        }
        if !good.is_empty() {
            out.extend(self.merge(&good));
        }
        Ok(())
    }

    /// Fold whitespace-only spans into a neighbour when the result still fits
    /// and drop the ones that cannot be folded. No chunk is ever blank.
    fn absorb_blank_spans(&self, text: &str, spans: Vec<Range<usize>>) -> Vec<Range<usize>> {
        let mut out: Vec<Range<usize>> = Vec::with_capacity(spans.len());
        for span in spans {
            let blank = text[span.clone()].trim().is_empty();
            if let Some(prev) = out.last_mut() {
                if blank || text[prev.clone()].trim().is_empty() {
                    let merged = prev.start.min(span.start)..prev.end.max(span.end);
                    if self.measure.len(&text[merged.clone()]) <= self.chunk_size {
                        *prev = merged;
                        continue;
                    }
                }
            }
            out.push(span);
        }
        out.retain(|span| !text[span.clone()].trim().is_empty());
        out
    }

    /// Greedily pack adjacent splits up to `chunk_size`, carrying at most
    /// `chunk_overlap` of trailing splits into the next chunk.
    fn merge(&self, splits: &[(Range<usize>, usize)]) -> Vec<Range<usize>> {
        let mut docs = Vec::new();
        let mut current: VecDeque<&(Range<usize>, usize)> = VecDeque::new();
        let mut total = 0usize;
        for split in splits {
            let len = split.1;
            if total + len > self.chunk_size {
                if let (Some(first), Some(last)) = (current.front(), current.back()) {
                    docs.push(first.0.start..last.0.end);
                    while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                        match current.pop_front() {
                            Some(dropped) => total -= dropped.1,
                            None => break,
                        }
                    }
                }
            }
            current.push_back(split);
            total += len;
        }
        if let (Some(first), Some(last)) = (current.front(), current.back()) {
            docs.push(first.0.start..last.0.end);
        }
        docs
    }
}

/// Split `piece` on `separator`, keeping each separator at the start of the
/// piece that follows it. Ranges are relative to `piece` and never empty.
fn split_keep_separator(piece: &str, separator: &str) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return piece.char_indices().map(|(i, c)| i..i + c.len_utf8()).collect();
    }
    let mut out = Vec::new();
    let mut start = 0usize;
    for (pos, _) in piece.match_indices(separator) {
        if pos > start {
            out.push(start..pos);
        }
        start = pos;
    }
    if start < piece.len() {
        out.push(start..piece.len());
    }
    out
}
