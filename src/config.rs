use crate::generator::GenerationOptions;
use crate::llm::CommandProviderConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Project-level configuration file name.
pub const CONFIG_FILE_NAME: &str = "specflow.yaml";

/// Store directory created under the project when `storage.root` is unset.
pub const DEFAULT_STORE_DIR: &str = ".specflow";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SpecflowConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    /// External command used to generate documents. Absent means no provider
    /// is configured and generation commands fail up front.
    #[serde(default)]
    pub provider: Option<ProviderConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryConfig {
    /// Automatic pruning after each save. Unset keeps every snapshot.
    #[serde(default)]
    pub keep_latest: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub extra_instructions: Option<String>,
    #[serde(default = "default_max_clarification_questions")]
    pub max_clarification_questions: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: None,
            temperature: None,
            max_tokens: None,
            extra_instructions: None,
            max_clarification_questions: default_max_clarification_questions(),
        }
    }
}

fn default_max_clarification_questions() -> usize {
    5
}

impl GenerationConfig {
    pub fn options(&self) -> GenerationOptions {
        GenerationOptions {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            extra_instructions: self.extra_instructions.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    900
}

impl ProviderConfig {
    /// Command settings with a relative working directory resolved against `project_dir`.
    pub fn command_config(&self, project_dir: &Path) -> CommandProviderConfig {
        let working_dir = match &self.working_dir {
            Some(dir) => resolve_path(dir, project_dir),
            None => project_dir.to_path_buf(),
        };
        CommandProviderConfig::new(self.command.clone())
            .with_args(self.args.clone())
            .with_working_dir(working_dir)
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

impl SpecflowConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file as YAML: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// The shipped defaults (`specflow.yaml` at the crate root).
    pub fn default_config() -> Self {
        const DEFAULT_YAML: &str = include_str!("../specflow.yaml");

        serde_yaml::from_str(DEFAULT_YAML)
            .expect("Failed to parse embedded specflow.yaml - this is a bug in the specflow.yaml file")
    }

    /// Load `<project_dir>/specflow.yaml` if present, otherwise the shipped defaults.
    pub fn discover(project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default_config())
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(temperature) = self.generation.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                anyhow::bail!(
                    "generation.temperature must be between 0.0 and 2.0 (got {})",
                    temperature
                );
            }
        }

        if self.generation.max_clarification_questions == 0 {
            anyhow::bail!("generation.max_clarification_questions must be at least 1");
        }

        if self.history.keep_latest == Some(0) {
            anyhow::bail!("history.keep_latest must be at least 1 when set");
        }

        if let Some(provider) = &self.provider {
            if provider.command.trim().is_empty() {
                anyhow::bail!("provider.command must not be empty");
            }
            if provider.timeout_secs == 0 {
                anyhow::bail!("provider.timeout_secs must be at least 1");
            }
        }

        Ok(())
    }

    /// Store root: `storage.root` resolved against `project_dir`, or `<project_dir>/.specflow`.
    pub fn store_root(&self, project_dir: &Path) -> PathBuf {
        match &self.storage.root {
            Some(root) => resolve_path(root, project_dir),
            None => project_dir.join(DEFAULT_STORE_DIR),
        }
    }
}

/// Expand a leading `~` and anchor relative paths at `base`.
fn resolve_path(path: &Path, base: &Path) -> PathBuf {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    };
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
