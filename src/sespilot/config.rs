use crate::error::{Result, SesPilotError};
use crate::model::TemplateKind;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

pub const LOCAL_CONFIG_FILE: &str = "ses-pilot.config.json";
pub const GLOBAL_CONFIG_FILE: &str = "config.json";
pub const GLOBAL_DIR_NAME: &str = ".ses-pilot";
pub const GLOBAL_DIR_ENV: &str = "SES_PILOT_GLOBAL_DIR";
const DEFAULT_TEMPLATES_PATH: &str = "./ses-templates";

/// How many parent directories are searched for a local config, after cwd.
const PARENT_LOOKUPS: usize = 3;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigMode {
    #[default]
    Local,
    Global,
}

impl ConfigMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigMode::Local => "local",
            ConfigMode::Global => "global",
        }
    }
}

/// Contents of `ses-pilot.config.json` (or the global `config.json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PilotConfig {
    #[serde(default)]
    pub mode: ConfigMode,

    /// Relative paths are resolved against the directory holding the config file.
    #[serde(default = "default_templates_path")]
    pub templates_path: String,
}

fn default_templates_path() -> String {
    DEFAULT_TEMPLATES_PATH.to_string()
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            mode: ConfigMode::Local,
            templates_path: default_templates_path(),
        }
    }
}

impl PilotConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            SesPilotError::Config(format!("{} is not a valid config: {}", path.display(), e))
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "mode" => Some(self.mode.as_str().to_string()),
            "templatesPath" | "templates-path" | "templates_path" => {
                Some(self.templates_path.clone())
            }
            _ => None,
        }
    }

    /// Every key with its current value, in display order.
    pub fn list_all(&self) -> Vec<(&'static str, String)> {
        vec![
            ("mode", self.mode.as_str().to_string()),
            ("templatesPath", self.templates_path.clone()),
        ]
    }

    pub fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), String> {
        match key {
            "mode" => {
                self.mode = match value {
                    "local" => ConfigMode::Local,
                    "global" => ConfigMode::Global,
                    other => return Err(format!("Invalid mode: {} (expected local or global)", other)),
                };
                Ok(())
            }
            "templatesPath" | "templates-path" | "templates_path" => {
                if value.trim().is_empty() {
                    return Err("templatesPath cannot be empty".to_string());
                }
                self.templates_path = value.trim().to_string();
                Ok(())
            }
            other => Err(format!("Unknown config key: {}", other)),
        }
    }
}

/// A config together with where it came from and the absolute templates root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub source: PathBuf,
    pub config: PilotConfig,
    pub templates_root: PathBuf,
}

impl ResolvedConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let config = PilotConfig::load(path)?;
        Ok(Self::from_parts(path.to_path_buf(), config))
    }

    pub fn from_parts(source: PathBuf, config: PilotConfig) -> Self {
        let base = source.parent().unwrap_or_else(|| Path::new("."));
        let templates_root = resolve_templates_root(base, &config.templates_path);
        Self {
            source,
            config,
            templates_root,
        }
    }

    /// Looks for a config in cwd, then up to three parents, then the global dir.
    pub fn discover(cwd: &Path, global_dir: Option<&Path>) -> Result<Self> {
        for candidate in candidate_paths(cwd, global_dir) {
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "using config");
                return Self::from_file(&candidate);
            }
        }
        Err(SesPilotError::NotConfigured)
    }

    pub fn kind_root(&self, kind: TemplateKind) -> PathBuf {
        kind.root_under(&self.templates_root)
    }

    pub fn mode(&self) -> ConfigMode {
        self.config.mode
    }
}

/// Search order for config files, first match wins.
pub fn candidate_paths(cwd: &Path, global_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = cwd
        .ancestors()
        .take(PARENT_LOOKUPS + 1)
        .map(|dir| dir.join(LOCAL_CONFIG_FILE))
        .collect();
    if let Some(global) = global_dir {
        paths.push(global.join(GLOBAL_CONFIG_FILE));
    }
    paths
}

/// `$SES_PILOT_GLOBAL_DIR`, or `~/.ses-pilot`.
pub fn global_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(GLOBAL_DIR_ENV) {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir));
        }
    }
    BaseDirs::new().map(|dirs| dirs.home_dir().join(GLOBAL_DIR_NAME))
}

fn resolve_templates_root(base: &Path, templates_path: &str) -> PathBuf {
    let joined = base.join(templates_path);
    joined
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
