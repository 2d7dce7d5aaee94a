//! Episodic memory domain
//!
//! Personal memories belong to one agent; collective memories are pooled per
//! archetype and strengthened by repeated, independent confirmation.
//! Scoring and forgetting rules live in [`scoring`]; storage and embedding
//! are ports of the application layer.

pub mod entities;
pub mod scoring;

pub use entities::{
    CollectiveMemory, Experience, Memory, MemoryOrigin, MemorySummary, ScoredMemory,
};
pub use scoring::{MemoryPolicy, cosine_similarity, rank};
