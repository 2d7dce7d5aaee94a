//! Persistence adapters

mod checkpoint_file;
mod files;
mod in_memory;
mod json_file;

pub use checkpoint_file::JsonFileCheckpointStore;
pub(crate) use files::agent_file_stem;
pub use in_memory::{InMemoryAgentRepository, InMemoryJournal, InMemoryStateRepository};
pub use json_file::{JsonFileAgentRepository, JsonFileStateRepository, JsonlJournal};
