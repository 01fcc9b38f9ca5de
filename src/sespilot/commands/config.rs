use crate::commands::{CmdMessage, CmdResult};
use crate::config::{PilotConfig, ResolvedConfig};
use crate::error::Result;

#[derive(Debug, Clone)]
pub enum ConfigAction {
    ShowAll,
    ShowKey(String),
    Set(String, String),
}

/// Reads or edits the config file the session was resolved from.
pub fn run(resolved: &ResolvedConfig, action: ConfigAction) -> Result<CmdResult> {
    match action {
        ConfigAction::ShowAll => {
            let config = PilotConfig::load(&resolved.source)?;
            let mut result = CmdResult::default().with_config(config);
            result.add_message(CmdMessage::info(format!(
                "Loaded from {}",
                resolved.source.display()
            )));
            result.add_message(CmdMessage::info(format!(
                "Templates root: {}",
                resolved.templates_root.display()
            )));
            Ok(result)
        }
        ConfigAction::ShowKey(key) => {
            let config = PilotConfig::load(&resolved.source)?;
            let mut result = CmdResult::default();
            match config.get(&key) {
                Some(val) => result.add_message(CmdMessage::info(val)),
                None => result.add_message(CmdMessage::error(format!("Unknown config key: {}", key))),
            }
            Ok(result)
        }
        ConfigAction::Set(key, value) => {
            let mut config = PilotConfig::load(&resolved.source)?;
            if let Err(e) = config.set(&key, &value) {
                let mut res = CmdResult::default();
                res.add_message(CmdMessage::error(e));
                return Ok(res);
            }
            config.save(&resolved.source)?;
            tracing::info!(%key, source = %resolved.source.display(), "config updated");

            let display_val = config.get(&key).unwrap_or_else(|| value.clone());
            let mut result = CmdResult::default().with_config(config);
            result.add_message(CmdMessage::success(format!("{} set to {}", key, display_val)));
            Ok(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::MessageLevel;
    use crate::config::{ConfigMode, LOCAL_CONFIG_FILE};
    use tempfile::TempDir;

    fn setup() -> (TempDir, ResolvedConfig) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(LOCAL_CONFIG_FILE);
        PilotConfig::default().save(&path).unwrap();
        let resolved = ResolvedConfig::from_file(&path).unwrap();
        (temp, resolved)
    }

    #[test]
    fn shows_whole_config() {
        let (_temp, resolved) = setup();
        let result = run(&resolved, ConfigAction::ShowAll).unwrap();
        assert_eq!(result.config, Some(PilotConfig::default()));
    }

    #[test]
    fn shows_one_key() {
        let (_temp, resolved) = setup();
        let result = run(&resolved, ConfigAction::ShowKey("templatesPath".to_string())).unwrap();
        assert_eq!(result.messages[0].content, "./ses-templates");

        let unknown = run(&resolved, ConfigAction::ShowKey("nope".to_string())).unwrap();
        assert_eq!(unknown.messages[0].level, MessageLevel::Error);
    }

    #[test]
    fn sets_and_persists() {
        let (_temp, resolved) = setup();
        run(
            &resolved,
            ConfigAction::Set("mode".to_string(), "global".to_string()),
        )
        .unwrap();
        let saved = PilotConfig::load(&resolved.source).unwrap();
        assert_eq!(saved.mode, ConfigMode::Global);
    }

    #[test]
    fn invalid_value_is_an_error_message() {
        let (_temp, resolved) = setup();
        let result = run(
            &resolved,
            ConfigAction::Set("mode".to_string(), "remote".to_string()),
        )
        .unwrap();
        assert!(result.has_errors());
        assert_eq!(PilotConfig::load(&resolved.source).unwrap(), PilotConfig::default());
    }
}
