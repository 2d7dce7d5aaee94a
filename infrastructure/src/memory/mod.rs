//! Memory adapters: vector storage and the offline embedder

mod hashing_embedder;
mod vector_repository;

pub use hashing_embedder::{DEFAULT_DIMENSIONS, HashingEmbedder};
pub use vector_repository::InMemoryVectorRepository;
