use crate::error::{Result, StrataError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrataConfig {
    #[serde(default)]
    pub db: DbSettings,

    #[serde(default)]
    pub graphql: GraphqlSettings,

    #[serde(default)]
    pub artifacts: ArtifactSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbSettings {
    /// Database provider the relational schema targets. The core never talks
    /// to it directly; the `DatabaseClient` collaborator does.
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_url")]
    pub url: String,
}

fn default_provider() -> String {
    "memory".to_string()
}

fn default_url() -> String {
    "memory://".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphqlSettings {
    /// Hard ceiling on rows a single findMany may return. Exceeding it fails
    /// before the database is consulted.
    #[serde(default = "default_max_total_results")]
    pub max_total_results: usize,
}

fn default_max_total_results() -> usize {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSettings {
    #[serde(default = "default_graphql_path")]
    pub graphql_path: String,

    #[serde(default = "default_relational_path")]
    pub relational_path: String,

    #[serde(default = "default_types_path")]
    pub types_path: String,
}

fn default_graphql_path() -> String {
    "schema.graphql".to_string()
}

fn default_relational_path() -> String {
    "schema.relational".to_string()
}

fn default_types_path() -> String {
    "strata-types.rs".to_string()
}

impl Default for DbSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            url: default_url(),
        }
    }
}

impl Default for GraphqlSettings {
    fn default() -> Self {
        Self {
            max_total_results: default_max_total_results(),
        }
    }
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            graphql_path: default_graphql_path(),
            relational_path: default_relational_path(),
            types_path: default_types_path(),
        }
    }
}

impl StrataConfig {
    /// Loads `strata.toml` by walking upward from `start_path`. Falls back to
    /// defaults when no config file exists, so a bare directory still works.
    pub fn load(start_path: &Path) -> Result<(Self, PathBuf)> {
        match Self::find_config_file(start_path) {
            Some(config_path) => {
                let content = std::fs::read_to_string(&config_path)?;
                let config: StrataConfig = toml::from_str(&content)
                    .map_err(|e| StrataError::Config(format!("strata.toml: {}", e)))?;
                let project_root = config_path
                    .parent()
                    .ok_or_else(|| {
                        StrataError::Config("Config file has no parent directory".to_string())
                    })?
                    .to_path_buf();
                Ok((config, project_root))
            }
            None => Ok((Self::default(), start_path.to_path_buf())),
        }
    }

    pub fn find_config_file(start_path: &Path) -> Option<PathBuf> {
        let mut current = start_path.to_path_buf();
        loop {
            let config_path = current.join("strata.toml");
            if config_path.exists() {
                return Some(config_path);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    pub fn graphql_artifact_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.artifacts.graphql_path)
    }

    pub fn relational_artifact_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.artifacts.relational_path)
    }

    pub fn types_artifact_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.artifacts.types_path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| StrataError::Config(format!("serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
