//! # Storage Layer
//!
//! The [`TemplateStore`] trait is the only way the rest of the crate touches
//! local templates.
//!
//! ## Implementations
//!
//! - [`fs::FileStore`]: Production storage rooted at the configured templates path
//! - [`memory::InMemoryStore`]: In-memory storage for testing, with explicit mtimes
//!
//! ## Layout
//!
//! ```text
//! ses-templates/
//! ├── marketing/                  # folder (kept only if it holds a template)
//! │   └── welcome/                # email template
//! │       ├── template.json
//! │       ├── template.html
//! │       └── send-email.json
//! └── _verification/              # verification root
//!     └── confirm/
//!         ├── verification-template.json
//!         └── template.html
//! ```
//!
//! Every operation is addressed by `(TemplateKind, relative_path)`; the relative
//! path is `/`-separated and relative to the kind's root.

use crate::error::{Result, SesPilotError};
use crate::model::TemplateKind;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

pub mod fs;
pub mod memory;

/// Abstract interface for template storage.
pub trait TemplateStore {
    /// Scans the tree of one kind. The tree is built fresh on every call.
    fn scan(&self, kind: TemplateKind) -> Result<Vec<crate::model::TemplateNode>>;

    /// True when `relative_path` is a template directory of this kind.
    fn is_template(&self, kind: TemplateKind, relative_path: &str) -> bool;

    /// True when anything (folder or template) exists at `relative_path`.
    fn exists(&self, kind: TemplateKind, relative_path: &str) -> bool;

    /// Raw manifest text.
    fn read_manifest(&self, kind: TemplateKind, relative_path: &str) -> Result<String>;

    /// Last modification time of the manifest, `None` when it cannot be observed.
    fn manifest_modified(&self, kind: TemplateKind, relative_path: &str) -> Option<DateTime<Utc>>;

    /// Body of `template.html`; a missing file is an empty body.
    fn read_html(&self, kind: TemplateKind, relative_path: &str) -> Result<String>;

    /// Writes the manifest and, when given, the HTML body. Creates directories as needed.
    fn write_template(
        &mut self,
        kind: TemplateKind,
        relative_path: &str,
        manifest: &str,
        html: Option<&str>,
    ) -> Result<()>;

    /// Raw `send-email.json`, if the template has one.
    fn read_send_payload(&self, kind: TemplateKind, relative_path: &str) -> Result<Option<String>>;

    fn write_send_payload(&mut self, kind: TemplateKind, relative_path: &str, raw: &str) -> Result<()>;

    fn create_folder(&mut self, kind: TemplateKind, relative_path: &str) -> Result<()>;

    /// Removes a template or folder with everything under it.
    fn remove(&mut self, kind: TemplateKind, relative_path: &str) -> Result<()>;

    /// Moves a template or folder. The destination's parent is created if missing.
    fn rename(&mut self, kind: TemplateKind, from: &str, to: &str) -> Result<()>;

    /// Location of the HTML body on disk (for file-based stores).
    fn html_path(&self, kind: TemplateKind, relative_path: &str) -> Result<PathBuf>;
}

/// Normalizes a user supplied relative path and rejects anything that could
/// escape the kind's root. Empty input is the root itself.
pub fn normalize_relative(path: &str) -> Result<String> {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    if path.trim().starts_with('/') || path.contains('\\') {
        return Err(SesPilotError::InvalidPath(path.to_string()));
    }

    let mut segments = Vec::new();
    for segment in trimmed.split('/') {
        match segment {
            "" | "." | ".." => return Err(SesPilotError::InvalidPath(path.to_string())),
            s => segments.push(s),
        }
    }
    Ok(segments.join("/"))
}

/// Like [`normalize_relative`] but the root itself is not allowed.
pub fn require_relative(path: &str) -> Result<String> {
    let normalized = normalize_relative(path)?;
    if normalized.is_empty() {
        return Err(SesPilotError::InvalidPath(path.to_string()));
    }
    Ok(normalized)
}

/// Last segment of a relative path.
pub fn leaf_name(relative_path: &str) -> &str {
    relative_path.rsplit('/').next().unwrap_or(relative_path)
}

/// Everything before the last segment, or `""` at the root.
pub fn parent_of(relative_path: &str) -> &str {
    relative_path
        .rfind('/')
        .map(|i| &relative_path[..i])
        .unwrap_or("")
}
