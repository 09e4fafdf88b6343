//! Local document retrieval.
//!
//! A single text file is chunked with overlap, embedded through the
//! upstream embeddings endpoint, and queried by cosine similarity.
//! The index is built lazily on first use and reused for the process
//! lifetime.

use std::path::PathBuf;
use std::sync::Arc;

use cr_domain::config::DocsConfig;
use cr_domain::error::Result;
use cr_providers::{EmbeddingsRequest, UpstreamClient};
use tokio::sync::Mutex;

struct IndexState {
    chunks: Vec<String>,
    /// Unit-length embedding per chunk; cosine similarity is a dot product.
    embeddings: Vec<Vec<f32>>,
}

/// Embeddings index over one document file.
pub struct DocumentIndex {
    path: PathBuf,
    chunk_size: usize,
    chunk_overlap: usize,
    top_k: usize,
    max_words: usize,
    upstream: Arc<dyn UpstreamClient>,
    state: Mutex<Option<Arc<IndexState>>>,
}

impl DocumentIndex {
    pub fn new(cfg: &DocsConfig, upstream: Arc<dyn UpstreamClient>) -> Self {
        Self {
            path: cfg.path.clone(),
            chunk_size: cfg.chunk_size,
            chunk_overlap: cfg.chunk_overlap,
            top_k: cfg.top_k,
            max_words: cfg.max_words,
            upstream,
            state: Mutex::new(None),
        }
    }

    /// Build the index if it hasn't been built yet. A missing source file
    /// yields an empty index, not an error.
    pub async fn ensure_built(&self) -> Result<()> {
        let mut guard = self.state.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "document file missing, index is empty");
            *guard = Some(Arc::new(IndexState {
                chunks: Vec::new(),
                embeddings: Vec::new(),
            }));
            return Ok(());
        }

        let text = std::fs::read_to_string(&self.path).map_err(cr_domain::error::Error::Io)?;
        let chunks = chunk_text(&text, self.chunk_size, self.chunk_overlap);
        if chunks.is_empty() {
            *guard = Some(Arc::new(IndexState {
                chunks: Vec::new(),
                embeddings: Vec::new(),
            }));
            return Ok(());
        }

        let resp = self
            .upstream
            .embeddings(EmbeddingsRequest {
                input: chunks.clone(),
                model: None,
            })
            .await?;
        let embeddings = resp.embeddings.into_iter().map(normalize).collect();

        tracing::info!(chunks = chunks.len(), path = %self.path.display(), "document index built");
        *guard = Some(Arc::new(IndexState { chunks, embeddings }));
        Ok(())
    }

    /// Rank indexed chunks against a query, best first, at most `k`.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<(f32, String)>> {
        self.ensure_built().await?;
        let state = {
            let guard = self.state.lock().await;
            match guard.as_ref() {
                Some(s) => Arc::clone(s),
                None => return Ok(Vec::new()),
            }
        };
        if state.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let resp = self
            .upstream
            .embeddings(EmbeddingsRequest {
                input: vec![text.to_string()],
                model: None,
            })
            .await?;
        let query = match resp.embeddings.into_iter().next() {
            Some(v) => normalize(v),
            None => return Ok(Vec::new()),
        };

        let mut scored: Vec<(f32, usize)> = state
            .embeddings
            .iter()
            .enumerate()
            .map(|(i, emb)| (dot(emb, &query), i))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let k = k.clamp(1, state.chunks.len());
        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, i)| (score, state.chunks[i].clone()))
            .collect())
    }

    /// Best-effort context for a question, pulled only from the indexed
    /// file. Returns `""` when nothing useful is available, including on
    /// any build or embedding failure.
    pub async fn context(&self, question: &str) -> String {
        let ranked = match self.query(question, self.top_k).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "document query failed");
                return String::new();
            }
        };
        if ranked.is_empty() {
            return String::new();
        }

        // Word budget over the picked chunks.
        let mut picked = Vec::new();
        let mut used = 0usize;
        for (_, chunk) in &ranked {
            let words = chunk.split_whitespace().count();
            if used + words > self.max_words {
                break;
            }
            picked.push(chunk.as_str());
            used += words;
        }
        if picked.is_empty() {
            return String::new();
        }

        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string());
        format!("[Source: {name}]\n{}", picked.join("\n---\n"))
    }
}

/// Fixed-size sliding-window chunker with overlap, counted in characters
/// so multi-byte text never splits inside a code point.
fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    if size == 0 {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < n {
        let j = (i + size).min(n);
        out.push(chars[i..j].iter().collect());
        if j == n {
            break;
        }
        let next = j.saturating_sub(overlap);
        // An overlap >= size would otherwise stall the window.
        i = if next > i { next } else { j };
    }
    out
}

fn normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = dot(&v, &v).sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
