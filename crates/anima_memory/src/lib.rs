pub mod embedding;
pub mod sqlite;

pub use embedding::{cosine_similarity, Embedder, FastEmbedder, HashEmbedder};
pub use sqlite::SqliteStore;
