use crate::config::PilotConfig;
use crate::error::{Result, SesPilotError};
use crate::manifest::{Manifest, SendEmailPayload};
use crate::model::{TemplateCounts, TemplateKind, TemplateNode};
use crate::store::TemplateStore;
use crate::sync::SyncReport;
use serde::Serialize;

pub mod config;
pub mod create;
pub mod delete;
pub mod deploy;
pub mod folders;
pub mod html;
pub mod init;
pub mod list;
pub mod permissions;
pub mod pull;
pub mod send;
pub mod show;
pub mod status;
pub mod update;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// A template a command touched, identified the way the store identifies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRef {
    pub kind: TemplateKind,
    pub relative_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
}

impl TemplateRef {
    pub fn new(kind: TemplateKind, relative_path: impl Into<String>, template_name: Option<String>) -> Self {
        Self {
            kind,
            relative_path: relative_path.into(),
            template_name,
        }
    }
}

/// Both local trees plus their counts.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateListing {
    pub email: Vec<TemplateNode>,
    pub verification: Vec<TemplateNode>,
    pub counts: TemplateCounts,
}

/// Everything stored for one template.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDetails {
    pub kind: TemplateKind,
    pub relative_path: String,
    pub html: String,
    pub manifest: Manifest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_payload: Option<SendEmailPayload>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionCheck {
    pub permission: String,
    pub allowed: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionReport {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    pub checks: Vec<PermissionCheck>,
}

impl PermissionReport {
    pub fn allowed(&self, permission: &str) -> bool {
        self.checks
            .iter()
            .any(|c| c.permission == permission && c.allowed)
    }
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CmdResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing: Option<TemplateListing>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sync_reports: Vec<SyncReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<TemplateDetails>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub affected: Vec<TemplateRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<PilotConfig>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_listing(mut self, listing: TemplateListing) -> Self {
        self.listing = Some(listing);
        self
    }

    pub fn with_sync_reports(mut self, reports: Vec<SyncReport>) -> Self {
        self.sync_reports = reports;
        self
    }

    pub fn with_details(mut self, details: TemplateDetails) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_affected(mut self, affected: Vec<TemplateRef>) -> Self {
        self.affected = affected;
        self
    }

    pub fn with_permissions(mut self, report: PermissionReport) -> Self {
        self.permissions = Some(report);
        self
    }

    pub fn with_config(mut self, config: PilotConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn has_errors(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.level == MessageLevel::Error)
    }
}

/// Normalizes `relative_path` and checks that it names a template of `kind`.
pub(crate) fn require_template<S: TemplateStore>(
    store: &S,
    kind: TemplateKind,
    relative_path: &str,
) -> Result<String> {
    let path = crate::store::require_relative(relative_path)?;
    if !store.is_template(kind, &path) {
        return Err(SesPilotError::TemplateNotFound(path));
    }
    Ok(path)
}

/// Reads and parses a template's manifest. Unlike the sync path, failures here
/// are errors: the caller asked for this template specifically.
pub(crate) fn load_manifest<S: TemplateStore>(
    store: &S,
    kind: TemplateKind,
    relative_path: &str,
) -> Result<Manifest> {
    let raw = store.read_manifest(kind, relative_path)?;
    Manifest::parse(kind, &raw).map_err(|e| {
        SesPilotError::InvalidInput(format!(
            "{} has an unreadable {}: {}",
            relative_path,
            kind.manifest_file(),
            e
        ))
    })
}
