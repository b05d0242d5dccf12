//! Post-processor pipeline: normalisation, chunking, dedup.
//!
//! Content flows through an optional per-MIME normaliser, then is cut into
//! overlapping chunks with character offsets. Chunk ends snap to sentence
//! boundaries when configured, so embeddings see coherent text.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::config::PipelineConfig;
use crate::domain::ports::Normalizer;

/// One chunk of processed text with its character offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    pub content: String,
    /// 0-based position within the producing batch.
    pub position: usize,
    /// Character offset of the span start.
    pub start_char: usize,
    /// Character offset one past the span end.
    pub end_char: usize,
}

/// Chunks and normalises document text.
pub struct PostProcessor {
    config: PipelineConfig,
    normalizers: HashMap<&'static str, Arc<dyn Normalizer>>,
}

impl PostProcessor {
    pub fn new(config: PipelineConfig) -> CoreResult<Self> {
        config.validate().map_err(CoreError::InvalidInput)?;
        Ok(Self {
            config,
            normalizers: HashMap::new(),
        })
    }

    /// Register a normaliser for every MIME type it declares.
    pub fn register_normalizer(&mut self, normalizer: Arc<dyn Normalizer>) {
        for mime in normalizer.mime_types() {
            self.normalizers.insert(mime, normalizer.clone());
        }
    }

    /// Run the normaliser registered for `mime_type`, if any.
    pub fn normalize(&self, mime_type: &str, content: &str) -> Option<String> {
        self.normalizers
            .get(mime_type)
            .map(|n| n.normalize(content))
    }

    /// Cut text into ordered, overlapping chunks with character offsets.
    ///
    /// Duplicate chunk contents are dropped (first occurrence wins) when
    /// dedup is enabled; positions are renumbered so they stay contiguous.
    pub fn chunk(&self, text: &str) -> Vec<ChunkSpan> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let byte_offsets: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        let total_chars = byte_offsets.len();
        let byte_at = |char_idx: usize| -> usize {
            if char_idx >= total_chars {
                text.len()
            } else {
                byte_offsets[char_idx]
            }
        };

        let mut spans = Vec::new();
        let mut start = 0usize;

        while start < total_chars {
            let mut end = (start + self.config.chunk_size).min(total_chars);

            if self.config.respect_boundaries && end < total_chars {
                if let Some(boundary) = Self::snap_to_boundary(text, &byte_offsets, start, end) {
                    end = boundary;
                }
            }

            let content = &text[byte_at(start)..byte_at(end)];
            if !content.trim().is_empty() {
                spans.push(ChunkSpan {
                    content: content.to_string(),
                    position: spans.len(),
                    start_char: start,
                    end_char: end,
                });
            }

            if end >= total_chars {
                break;
            }

            let next = end.saturating_sub(self.config.chunk_overlap);
            // Overlap must never stall the loop.
            start = if next > start { next } else { end };
        }

        if self.config.dedup {
            Self::dedup_spans(spans)
        } else {
            spans
        }
    }

    /// Find the last sentence boundary in `(start, end)`, if any.
    ///
    /// Returns the char index one past the boundary character, so the
    /// boundary itself stays inside the chunk.
    fn snap_to_boundary(
        text: &str,
        byte_offsets: &[usize],
        start: usize,
        end: usize,
    ) -> Option<usize> {
        let boundaries = ['.', '!', '?', '\n'];
        let slice = &text[byte_offsets[start]..byte_offsets[end]];
        let mut chars_seen = end - start;
        for c in slice.chars().rev() {
            if boundaries.contains(&c) && chars_seen > 1 {
                return Some(start + chars_seen);
            }
            chars_seen -= 1;
        }
        None
    }

    fn dedup_spans(spans: Vec<ChunkSpan>) -> Vec<ChunkSpan> {
        let mut seen = HashSet::new();
        let mut result = Vec::with_capacity(spans.len());
        for mut span in spans {
            if seen.insert(span.content.clone()) {
                span.position = result.len();
                result.push(span);
            }
        }
        result
    }
}

/// Strips HTML tags and decodes the common entities.
pub struct HtmlNormalizer;

impl Normalizer for HtmlNormalizer {
    fn mime_types(&self) -> &[&'static str] {
        &["text/html", "application/xhtml+xml"]
    }

    fn normalize(&self, content: &str) -> String {
        let mut out = String::with_capacity(content.len());
        let mut in_tag = false;
        for c in content.chars() {
            match c {
                '<' => in_tag = true,
                '>' => {
                    in_tag = false;
                    // Tag boundaries separate words in the rendered text.
                    if !out.ends_with(char::is_whitespace) && !out.is_empty() {
                        out.push(' ');
                    }
                }
                _ if !in_tag => out.push(c),
                _ => {}
            }
        }
        let decoded = out
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&nbsp;", " ");
        collapse_whitespace(&decoded)
    }
}

/// Cleans markdown down to its text: headings lose their markers, links keep
/// their labels, fence lines are dropped.
pub struct MarkdownNormalizer;

impl Normalizer for MarkdownNormalizer {
    fn mime_types(&self) -> &[&'static str] {
        &["text/markdown", "text/x-markdown"]
    }

    fn normalize(&self, content: &str) -> String {
        let mut lines = Vec::new();
        for line in content.lines() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                continue;
            }
            let line = trimmed.trim_start_matches('#').trim_start();
            lines.push(strip_md_links(line));
        }
        lines.join("\n").trim().to_string()
    }
}

/// Rewrite `[label](target)` into `label`.
fn strip_md_links(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '[' {
            let mut label = String::new();
            let mut closed = false;
            for inner in chars.by_ref() {
                if inner == ']' {
                    closed = true;
                    break;
                }
                label.push(inner);
            }
            if closed && chars.peek() == Some(&'(') {
                chars.next();
                for inner in chars.by_ref() {
                    if inner == ')' {
                        break;
                    }
                }
                out.push_str(&label);
            } else {
                out.push('[');
                out.push_str(&label);
                if closed {
                    out.push(']');
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = true;
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(if c == '\n' { '\n' } else { ' ' });
                last_was_space = true;
            }
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn processor(chunk_size: usize, chunk_overlap: usize) -> PostProcessor {
        PostProcessor::new(PipelineConfig {
            chunk_size,
            chunk_overlap,
            respect_boundaries: true,
            dedup: true,
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = PostProcessor::new(PipelineConfig {
            chunk_size: 100,
            chunk_overlap: 150,
            respect_boundaries: true,
            dedup: true,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_text_produces_no_chunks() {
        let p = processor(100, 10);
        assert!(p.chunk("").is_empty());
        assert!(p.chunk("   \n  ").is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let p = processor(100, 10);
        let spans = p.chunk("A short paragraph.");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].position, 0);
        assert_eq!(spans[0].start_char, 0);
        assert_eq!(spans[0].end_char, 18);
    }

    #[test]
    fn test_long_text_chunks_in_order() {
        let p = processor(50, 5);
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(10);
        let spans = p.chunk(&text);
        assert!(spans.len() > 1);
        for (i, span) in spans.iter().enumerate() {
            assert_eq!(span.position, i);
            assert!(span.start_char < span.end_char);
        }
    }

    #[test]
    fn test_boundary_snapping() {
        let p = processor(30, 0);
        let text = "First sentence here. Second sentence is a bit longer than that.";
        let spans = p.chunk(text);
        assert!(spans[0].content.ends_with('.'), "chunk should end at a sentence: {:?}", spans[0]);
    }

    #[test]
    fn test_dedup_drops_repeats_and_renumbers() {
        let p = PostProcessor::new(PipelineConfig {
            chunk_size: 10,
            chunk_overlap: 0,
            respect_boundaries: false,
            dedup: true,
        })
        .unwrap();
        // Ten identical 10-char segments.
        let text = "abcdefghij".repeat(10);
        let spans = p.chunk(&text);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].position, 0);
    }

    #[test]
    fn test_multibyte_text_offsets_are_char_based() {
        let p = PostProcessor::new(PipelineConfig {
            chunk_size: 4,
            chunk_overlap: 0,
            respect_boundaries: false,
            dedup: false,
        })
        .unwrap();
        let text = "héllo wörld";
        let spans = p.chunk(text);
        assert_eq!(spans[0].start_char, 0);
        assert_eq!(spans[0].end_char, 4);
        assert_eq!(spans[0].content, "héll");
    }

    #[test]
    fn test_html_normalizer() {
        let n = HtmlNormalizer;
        let out = n.normalize("<p>Hello <b>world</b> &amp; friends</p>");
        assert_eq!(out, "Hello world & friends");
    }

    #[test]
    fn test_markdown_normalizer() {
        let n = MarkdownNormalizer;
        let out = n.normalize("# Title\n\nSee [the docs](https://example.com) for more.\n```\ncode\n```\n");
        assert!(out.starts_with("Title"));
        assert!(out.contains("See the docs for more."));
        assert!(!out.contains("https://example.com"));
        assert!(!out.contains("```"));
    }

    #[test]
    fn test_normalize_dispatches_by_mime() {
        let mut p = processor(100, 0);
        p.register_normalizer(Arc::new(HtmlNormalizer));
        assert!(p.normalize("text/html", "<i>x</i>").is_some());
        assert!(p.normalize("text/plain", "x").is_none());
    }

    proptest! {
        #[test]
        fn prop_chunk_offsets_are_ordered_and_bounded(text in ".{0,400}", size in 5usize..64, overlap in 0usize..4) {
            let p = PostProcessor::new(PipelineConfig {
                chunk_size: size,
                chunk_overlap: overlap,
                respect_boundaries: true,
                dedup: false,
            }).unwrap();
            let total_chars = text.chars().count();
            let spans = p.chunk(&text);
            for span in &spans {
                prop_assert!(span.start_char < span.end_char);
                prop_assert!(span.end_char <= total_chars);
                prop_assert!(span.end_char - span.start_char <= size);
            }
            for pair in spans.windows(2) {
                prop_assert!(pair[0].start_char < pair[1].start_char);
            }
        }
    }
}
