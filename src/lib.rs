#![warn(missing_docs)]
//! Core library entry points for the smartsearch retrieval pipeline.

pub mod answer;
pub mod chunk;
pub mod context;
pub mod embedder;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod index;
pub mod metadata;
pub mod prompt;
pub mod reranker;
pub mod session;

pub use answer::{AnswerProvider, AzureOpenAiProvider, CompletionRequest, OpenAiProvider};
pub use chunk::{Chunk, RankedChunk, RetrievedChunk};
pub use context::{ArtifactPaths, SearchContext};
pub use embedder::{AzureOpenAiEmbedder, QueryEmbedder};
pub use embeddings::EmbeddingMatrix;
pub use engine::{QueryResult, SearchEngine};
pub use error::SearchError;
pub use index::{FlatIndex, SearchHit};
pub use metadata::ChunkStore;
pub use prompt::PromptTemplate;
pub use reranker::{cosine_similarity, rerank};
pub use session::{QuerySession, QueryTicket, ResultSlot};

#[cfg(feature = "debug_logs")]
#[macro_export]
// This allows use of the `eprintln!` macro via `debug_log!` macro.
macro_rules! debug_log {
        ($($arg:tt)*) => {
            eprintln!($($arg)*);
        };
    }
#[cfg(not(feature = "debug_logs"))]
#[macro_export]
// This effectively disables the `eprintln!` macro, effectively removing it from the code during
// compilation.
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}
