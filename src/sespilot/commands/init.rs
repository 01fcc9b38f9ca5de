use crate::commands::{CmdMessage, CmdResult};
use crate::config::{ConfigMode, PilotConfig, ResolvedConfig, GLOBAL_CONFIG_FILE, LOCAL_CONFIG_FILE};
use crate::error::Result;
use std::fs;
use std::path::PathBuf;

const GLOBAL_TEMPLATES_PATH: &str = "./templates";

#[derive(Debug, Clone)]
pub enum InitTarget {
    /// `ses-pilot.config.json` in this directory.
    Local(PathBuf),
    /// `config.json` in the global directory.
    Global(PathBuf),
}

pub fn run(target: &InitTarget) -> Result<CmdResult> {
    let (config_path, config) = match target {
        InitTarget::Local(dir) => (dir.join(LOCAL_CONFIG_FILE), PilotConfig::default()),
        InitTarget::Global(dir) => (
            dir.join(GLOBAL_CONFIG_FILE),
            PilotConfig {
                mode: ConfigMode::Global,
                templates_path: GLOBAL_TEMPLATES_PATH.to_string(),
            },
        ),
    };

    let mut result = CmdResult::default();
    if config_path.exists() {
        let existing = PilotConfig::load(&config_path).unwrap_or(config);
        result.add_message(CmdMessage::warning(format!(
            "Config already exists at {}, leaving it unchanged",
            config_path.display()
        )));
        return Ok(result.with_config(existing));
    }

    config.save(&config_path)?;
    let resolved = ResolvedConfig::from_parts(config_path.clone(), config.clone());
    if !resolved.templates_root.exists() {
        fs::create_dir_all(&resolved.templates_root)?;
    }
    tracing::info!(path = %config_path.display(), "created config");

    result.add_message(CmdMessage::success(format!(
        "Created {} ({} mode)",
        config_path.display(),
        config.mode.as_str()
    )));
    result.add_message(CmdMessage::info(format!(
        "Templates live in {}",
        resolved.templates_root.display()
    )));
    Ok(result.with_config(config))
}
