//! Context retrieval for chatrelay turns.
//!
//! Two sources feed the prompt envelope: fresh web results via SerpAPI
//! and a small embeddings index over a local document file. Both are
//! best-effort: any failure degrades to an empty context string, never
//! to a failed turn.

pub mod docs;
pub mod gate;
pub mod web;

pub use docs::DocumentIndex;
pub use gate::SearchGate;
pub use web::WebSearchProvider;
