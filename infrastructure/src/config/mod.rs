//! Configuration file loading for agent-fleet
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. Environment variables prefixed `FLEET_` (`FLEET_LIFECYCLE__GRACE_PERIOD_SECS=5`)
//! 2. `--config <path>` specified file
//! 3. Project root: `./fleet.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/agent-fleet/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    FileConfig, FileConsensusConfig, FileLifecycleConfig, FileMemoryConfig, FileProviderConfig,
    FileReasoningConfig, FileValidatorConfig, ProviderKind,
};
pub use loader::{ConfigLoader, ConfigSource};
