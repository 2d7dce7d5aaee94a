//! Infrastructure layer for agent-fleet
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod actuator;
pub mod capabilities;
pub mod config;
pub mod lease;
pub mod logging;
pub mod memory;
pub mod notify;
pub mod observation;
pub mod persistence;
pub mod providers;

// Re-export commonly used types
pub use actuator::{PaperActuator, PaperPosition};
pub use capabilities::{
    CapabilityHandler, CapabilityRegistry, MemorySearchHandler, ObservationHandler, RiskHandler,
};
pub use config::{ConfigLoader, ConfigSource, FileConfig, ProviderKind};
pub use lease::{FileLeaseService, InMemoryLease, InMemoryLeaseTable};
pub use logging::JsonlAuditLog;
pub use memory::{HashingEmbedder, InMemoryVectorRepository};
pub use notify::TracingNotifier;
pub use observation::{ReplayError, ReplayObservationSource, SyntheticObservationSource};
pub use persistence::{
    InMemoryAgentRepository, InMemoryJournal, InMemoryStateRepository, JsonFileAgentRepository,
    JsonFileCheckpointStore, JsonFileStateRepository, JsonlJournal,
};
pub use providers::{HeuristicProvider, HeuristicVoter, KeywordSentimentVoter};

#[cfg(feature = "http-providers")]
pub use providers::{ChatClient, ChatConfig, ChatProvider, ChatSentimentVoter, ChatVoter};
