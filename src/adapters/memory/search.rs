//! In-memory search engine.
//!
//! A small in-process analogue of the external engine: term-frequency
//! lexical scoring, cosine similarity over stored vectors, and
//! reciprocal-rank fusion for hybrid queries. Good enough for tests and
//! single-node dev deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::CoreResult;
use crate::domain::models::{Chunk, ScoredChunk, SearchMode, SearchOptions};
use crate::domain::ports::SearchEngine;

const RRF_K: f32 = 60.0;

/// Mutex-guarded inverted-map search engine.
#[derive(Default)]
pub struct MemorySearchEngine {
    chunks: RwLock<HashMap<String, Chunk>>,
}

impl MemorySearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn lexical_scores(query: &str, chunks: &[&Chunk]) -> Vec<(usize, f32)> {
        let terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if terms.is_empty() {
            return Vec::new();
        }

        let mut scores = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let content = chunk.content.to_lowercase();
            let mut score = 0.0f32;
            for term in &terms {
                let hits = content.matches(term.as_str()).count() as f32;
                if hits > 0.0 {
                    // Dampen repeats so one spammy chunk does not dominate.
                    score += 1.0 + hits.ln();
                }
            }
            if score > 0.0 {
                scores.push((idx, score));
            }
        }
        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scores
    }

    fn semantic_scores(embedding: &[f32], chunks: &[&Chunk]) -> Vec<(usize, f32)> {
        let mut scores = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            if let Some(vector) = &chunk.embedding {
                if let Some(similarity) = cosine_similarity(embedding, vector) {
                    scores.push((idx, similarity));
                }
            }
        }
        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scores
    }

    /// Fuse two rankings by reciprocal rank.
    fn fuse(lexical: &[(usize, f32)], semantic: &[(usize, f32)]) -> Vec<(usize, f32)> {
        let mut fused: HashMap<usize, f32> = HashMap::new();
        for (rank, (idx, _)) in lexical.iter().enumerate() {
            *fused.entry(*idx).or_default() += 1.0 / (RRF_K + rank as f32 + 1.0);
        }
        for (rank, (idx, _)) in semantic.iter().enumerate() {
            *fused.entry(*idx).or_default() += 1.0 / (RRF_K + rank as f32 + 1.0);
        }
        let mut result: Vec<(usize, f32)> = fused.into_iter().collect();
        result.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        result
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a * norm_b))
}

#[async_trait]
impl SearchEngine for MemorySearchEngine {
    async fn index(&self, chunks: &[Chunk]) -> CoreResult<()> {
        let mut store = self.chunks.write().await;
        for chunk in chunks {
            store.insert(chunk.id.clone(), chunk.clone());
        }
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        embedding: Option<&[f32]>,
        opts: &SearchOptions,
    ) -> CoreResult<(Vec<ScoredChunk>, usize)> {
        let store = self.chunks.read().await;
        let candidates: Vec<&Chunk> = store
            .values()
            .filter(|c| opts.source_ids.is_empty() || opts.source_ids.contains(&c.source_id))
            .collect();

        let ranked: Vec<(usize, f32)> = match (opts.mode, embedding) {
            (SearchMode::TextOnly, _) | (SearchMode::SemanticOnly | SearchMode::Hybrid, None) => {
                Self::lexical_scores(query, &candidates)
            }
            (SearchMode::SemanticOnly, Some(vector)) => Self::semantic_scores(vector, &candidates),
            (SearchMode::Hybrid, Some(vector)) => Self::fuse(
                &Self::lexical_scores(query, &candidates),
                &Self::semantic_scores(vector, &candidates),
            ),
        };

        let total = ranked.len();
        let results = ranked
            .into_iter()
            .take(opts.limit)
            .map(|(idx, score)| ScoredChunk {
                chunk: candidates[idx].clone(),
                score,
            })
            .collect();
        Ok((results, total))
    }

    async fn delete(&self, ids: &[String]) -> CoreResult<()> {
        let mut store = self.chunks.write().await;
        for id in ids {
            store.remove(id);
        }
        Ok(())
    }

    async fn delete_by_document(&self, document_id: &str) -> CoreResult<()> {
        self.chunks
            .write()
            .await
            .retain(|_, c| c.document_id != document_id);
        Ok(())
    }

    async fn delete_by_source(&self, source_id: &str) -> CoreResult<()> {
        self.chunks
            .write()
            .await
            .retain(|_, c| c.source_id != source_id);
        Ok(())
    }

    async fn count(&self) -> CoreResult<u64> {
        Ok(self.chunks.read().await.len() as u64)
    }

    async fn health_check(&self) -> CoreResult<()> {
        Ok(())
    }
}
