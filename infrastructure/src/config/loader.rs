//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "agent-fleet";
const PROJECT_FILE: &str = "fleet.toml";
const ENV_PREFIX: &str = "FLEET_";

/// One place configuration may come from, as reported by `show-config`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub label: &'static str,
    pub location: String,
    pub found: bool,
}

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, Box<figment::Error>> {
        Self::figment(config_path).extract().map_err(Box::new)
    }

    /// The merged provider chain, lowest priority first
    pub fn figment(config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(&global_path));
        }

        if let Some(project_path) = Self::project_config_path() {
            figment = figment.merge(Toml::file(project_path));
        }

        // Explicit path is merged even when missing so the error surfaces
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file_exact(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load only default configuration
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// `$XDG_CONFIG_HOME/agent-fleet/config.toml`, or the platform equivalent
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        let path = PathBuf::from(PROJECT_FILE);
        path.exists().then_some(path)
    }

    /// Sources in priority order, highest first
    pub fn sources(config_path: Option<&Path>) -> Vec<ConfigSource> {
        let mut sources = vec![ConfigSource {
            label: "Env",
            location: format!("{}*", ENV_PREFIX),
            found: std::env::vars().any(|(k, _)| k.starts_with(ENV_PREFIX)),
        }];
        if let Some(path) = config_path {
            sources.push(ConfigSource {
                label: "Explicit",
                location: path.display().to_string(),
                found: path.exists(),
            });
        }
        sources.push(ConfigSource {
            label: "Project",
            location: format!("./{}", PROJECT_FILE),
            found: Self::project_config_path().is_some(),
        });
        if let Some(path) = Self::global_config_path() {
            sources.push(ConfigSource {
                label: "Global",
                location: path.display().to_string(),
                found: path.exists(),
            });
        }
        sources.push(ConfigSource {
            label: "Default",
            location: "built-in defaults".to_string(),
            found: true,
        });
        sources
    }
}
