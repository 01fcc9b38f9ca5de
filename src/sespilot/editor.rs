use crate::error::{Result, SesPilotError};
use std::env;
use std::path::Path;
use std::process::Command;

const FALLBACK_EDITORS: &[&str] = &["vi", "vim", "nano"];

/// Picks the first non-empty value among `$VISUAL` and `$EDITOR`.
fn editor_from(visual: Option<String>, editor: Option<String>) -> Option<String> {
    [visual, editor]
        .into_iter()
        .flatten()
        .map(|e| e.trim().to_string())
        .find(|e| !e.is_empty())
}

/// Gets the editor command from environment.
/// Checks $VISUAL, then $EDITOR, then falls back to common editors.
pub fn get_editor() -> Result<String> {
    if let Some(editor) = editor_from(env::var("VISUAL").ok(), env::var("EDITOR").ok()) {
        return Ok(editor);
    }

    for fallback in FALLBACK_EDITORS {
        if Command::new("which")
            .arg(fallback)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
        {
            return Ok((*fallback).to_string());
        }
    }

    Err(SesPilotError::Api(
        "No editor found. Set $VISUAL or $EDITOR.".to_string(),
    ))
}

/// Opens a file in the user's editor and waits for it to close.
///
/// The editor command may carry arguments (`code --wait`).
pub fn open_in_editor<P: AsRef<Path>>(file_path: P) -> Result<()> {
    let editor = get_editor()?;
    let path = file_path.as_ref();
    let mut parts = editor.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| SesPilotError::Api("Editor command is empty".to_string()))?;

    tracing::debug!(%editor, path = %path.display(), "opening editor");
    let status = Command::new(program)
        .args(parts)
        .arg(path)
        .status()
        .map_err(|e| SesPilotError::Api(format!("Failed to launch editor '{}': {}", editor, e)))?;

    if !status.success() {
        return Err(SesPilotError::Api(format!(
            "Editor '{}' exited with non-zero status",
            editor
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visual_wins_over_editor() {
        assert_eq!(
            editor_from(Some("code --wait".to_string()), Some("nano".to_string())),
            Some("code --wait".to_string())
        );
    }

    #[test]
    fn blank_values_are_skipped() {
        assert_eq!(
            editor_from(Some("  ".to_string()), Some("nano".to_string())),
            Some("nano".to_string())
        );
        assert_eq!(editor_from(None, Some(String::new())), None);
        assert_eq!(editor_from(None, None), None);
    }
}
