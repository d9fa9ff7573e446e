//! Semantic retrieval over box contents.
//!
//! Free text goes in, ranked boxes come out:
//!
//! - `embeddings`: fastembed wrapper behind the `Embedder` seam
//! - `service`: process-wide lazily-initialized model handle
//! - `similarity`: cosine scoring, ranking and threshold filtering
//! - `preprocess`: item-tag text preparation and change detection

pub mod embeddings;
mod preprocess;
mod service;
mod similarity;

pub use embeddings::{Embedder, EmbeddingError, EmbeddingModel};
pub use preprocess::{items_hash, items_text};
pub use service::EmbeddingService;
pub use similarity::{cosine_similarity, filter_by_threshold, rank, Scored, SimilarityError};

/// Default embedding model. Same sentence encoder the original web app
/// shipped (quantized MiniLM), small enough to load in a few seconds.
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

/// Scores at or below this are considered noise and dropped.
pub const DEFAULT_THRESHOLD: f32 = 0.25;

/// Cap on semantic results surfaced to the user.
pub const DEFAULT_RESULT_CAP: usize = 5;
