//! Application layer for agent-fleet
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{ConsensusParams, FleetConfig, LifecycleParams, ReasoningParams};
pub use ports::{
    actuator::{Actuator, ActuatorError},
    audit_log::{AuditEvent, AuditLog, NoAuditLog},
    capability::{CapabilityContext, CapabilityPort},
    lease::{LeaseError, LeaseService},
    memory::{Embedder, EmbeddingError, MemoryRepository},
    notifier::{FleetNotification, NoNotifier, Notifier, NotifyError},
    observation::{ObservationError, ObservationSource},
    persistence::{
        AgentRepository, CheckpointStore, JournalRepository, PersistenceError, StateRepository,
        StoredCheckpoint,
    },
    reasoning_provider::{ProviderError, ReasoningProvider},
    voter::{SentimentVoter, Voter},
};
pub use use_cases::consensus::ConsensusEngine;
pub use use_cases::lifecycle::{
    AgentLifecycleManager, AgentStatus, CycleOutcome, CycleReport, FleetServices, LifecycleError,
    RestoreReport, ShutdownReport, TaskExit,
};
pub use use_cases::memory_store::{ConsolidationReport, MemoryError, MemoryStore};
pub use use_cases::planning::Planner;
pub use use_cases::reasoning_loop::{ReasoningError, ReasoningLoop, ReasoningOutcome};
pub use use_cases::reflection::{ReflectionError, Reflector};
