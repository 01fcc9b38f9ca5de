//! Template manifests.
//!
//! Every template directory carries a JSON manifest next to its `template.html`:
//!
//! ```text
//! template.json                 { "Template": { "TemplateName", "SubjectPart", "HtmlPart", "TextPart"? } }
//! verification-template.json    { "Template": { "TemplateName", "SubjectPart" }, "HtmlPart"?,
//!                                 "FromEmailAddress", "SuccessRedirectionURL", "FailureRedirectionURL" }
//! send-email.json               { "Source", "Template", "Destination": { "ToAddresses" }, "TemplateData" }
//! ```
//!
//! Reading the remote name out of a manifest never fails: anything that cannot be
//! parsed, or lacks a non-empty `Template.TemplateName`, reads as "no name".

use crate::error::Result;
use crate::model::TemplateKind;
use serde::{Deserialize, Serialize};

pub const HTML_FILE: &str = "template.html";
pub const SEND_EMAIL_FILE: &str = "send-email.json";

/// Suffix of the alternative verification manifest name (`<dirname>.verification.json`).
pub const VERIFICATION_SUFFIX: &str = ".verification.json";

pub const DEFAULT_SENDER: &str = "sender@example.com";
pub const DEFAULT_RECIPIENT: &str = "recipient@example.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmailTemplateBody {
    pub template_name: String,
    #[serde(default)]
    pub subject_part: String,
    #[serde(default)]
    pub html_part: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_part: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmailManifest {
    pub template: EmailTemplateBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VerificationHeader {
    pub template_name: String,
    #[serde(default)]
    pub subject_part: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationManifest {
    #[serde(rename = "Template")]
    pub template: VerificationHeader,
    #[serde(rename = "HtmlPart", default, skip_serializing_if = "Option::is_none")]
    pub html_part: Option<String>,
    #[serde(rename = "FromEmailAddress", default)]
    pub from_email_address: String,
    #[serde(rename = "SuccessRedirectionURL", default)]
    pub success_redirection_url: String,
    #[serde(rename = "FailureRedirectionURL", default)]
    pub failure_redirection_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Destination {
    #[serde(default)]
    pub to_addresses: Vec<String>,
}

/// The test-send payload stored as `send-email.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SendEmailPayload {
    pub source: String,
    pub template: String,
    pub destination: Destination,
    #[serde(default = "empty_template_data")]
    pub template_data: String,
}

fn empty_template_data() -> String {
    "{}".to_string()
}

impl SendEmailPayload {
    pub fn boilerplate(template_name: &str) -> Self {
        Self {
            source: DEFAULT_SENDER.to_string(),
            template: template_name.to_string(),
            destination: Destination {
                to_addresses: vec![DEFAULT_RECIPIENT.to_string()],
            },
            template_data: serde_json::json!({ "name": "Test User" }).to_string(),
        }
    }
}

/// A parsed manifest of either kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Manifest {
    Email(EmailManifest),
    Verification(VerificationManifest),
}

impl Manifest {
    pub fn parse(kind: TemplateKind, raw: &str) -> Result<Self> {
        Ok(match kind {
            TemplateKind::Email => Manifest::Email(serde_json::from_str(raw)?),
            TemplateKind::Verification => Manifest::Verification(serde_json::from_str(raw)?),
        })
    }

    /// Creates the manifest for a freshly created template directory.
    pub fn boilerplate(kind: TemplateKind, dir_name: &str, subject: &str) -> Self {
        let template_name = default_template_name(dir_name);
        match kind {
            TemplateKind::Email => Manifest::Email(EmailManifest {
                template: EmailTemplateBody {
                    template_name,
                    subject_part: subject.to_string(),
                    html_part: String::new(),
                    text_part: None,
                },
            }),
            TemplateKind::Verification => Manifest::Verification(VerificationManifest {
                template: VerificationHeader {
                    template_name,
                    subject_part: subject.to_string(),
                },
                html_part: None,
                from_email_address: DEFAULT_SENDER.to_string(),
                success_redirection_url: "https://example.com/verified".to_string(),
                failure_redirection_url: "https://example.com/verification-failed".to_string(),
            }),
        }
    }

    pub fn kind(&self) -> TemplateKind {
        match self {
            Manifest::Email(_) => TemplateKind::Email,
            Manifest::Verification(_) => TemplateKind::Verification,
        }
    }

    pub fn template_name(&self) -> &str {
        match self {
            Manifest::Email(m) => &m.template.template_name,
            Manifest::Verification(m) => &m.template.template_name,
        }
    }

    pub fn set_template_name(&mut self, name: impl Into<String>) {
        match self {
            Manifest::Email(m) => m.template.template_name = name.into(),
            Manifest::Verification(m) => m.template.template_name = name.into(),
        }
    }

    pub fn subject(&self) -> &str {
        match self {
            Manifest::Email(m) => &m.template.subject_part,
            Manifest::Verification(m) => &m.template.subject_part,
        }
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) {
        match self {
            Manifest::Email(m) => m.template.subject_part = subject.into(),
            Manifest::Verification(m) => m.template.subject_part = subject.into(),
        }
    }

    /// HTML stored inside the manifest itself, if any.
    pub fn embedded_html(&self) -> Option<&str> {
        let html = match self {
            Manifest::Email(m) => Some(m.template.html_part.as_str()),
            Manifest::Verification(m) => m.html_part.as_deref(),
        };
        html.filter(|h| !h.trim().is_empty())
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Extracts `Template.TemplateName` from raw manifest text.
///
/// Works for both manifest kinds; returns `None` on any parse problem.
pub fn template_name_from_str(raw: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let name = value.get("Template")?.get("TemplateName")?.as_str()?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// `welcome-email` becomes `WelcomeEmailTemplate`.
pub fn default_template_name(dir_name: &str) -> String {
    let mut name: String = dir_name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    name.push_str("Template");
    name
}

pub fn boilerplate_html(subject: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <title>{}</title>
  </head>
  <body>
    <h1>Hello, {{{{name}}}}!</h1>
    <p>This is your new template.</p>
  </body>
</html>
"#,
        subject
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_name_from_email_manifest() {
        let raw = r#"{"Template":{"TemplateName":"Welcome","SubjectPart":"Hi","HtmlPart":""}}"#;
        assert_eq!(template_name_from_str(raw), Some("Welcome".to_string()));
    }

    #[test]
    fn reads_name_from_verification_manifest() {
        let raw = r#"{"Template":{"TemplateName":"Verify","SubjectPart":"Confirm"},"FromEmailAddress":"a@b.co"}"#;
        assert_eq!(template_name_from_str(raw), Some("Verify".to_string()));
    }

    #[test]
    fn malformed_manifest_has_no_name() {
        assert_eq!(template_name_from_str("{not json"), None);
        assert_eq!(template_name_from_str(r#"{"Template":{}}"#), None);
        assert_eq!(template_name_from_str(r#"{"Template":{"TemplateName":"  "}}"#), None);
        assert_eq!(template_name_from_str(r#"{"Template":{"TemplateName":42}}"#), None);
        assert_eq!(template_name_from_str(""), None);
    }

    #[test]
    fn default_names_are_pascal_case() {
        assert_eq!(default_template_name("welcome-email"), "WelcomeEmailTemplate");
        assert_eq!(default_template_name("reset_password"), "ResetPasswordTemplate");
        assert_eq!(default_template_name("promo"), "PromoTemplate");
    }

    #[test]
    fn verification_manifest_uses_aws_key_names() {
        let manifest = Manifest::boilerplate(TemplateKind::Verification, "verify", "Confirm");
        let json = manifest.to_json_pretty().unwrap();
        assert!(json.contains("\"SuccessRedirectionURL\""));
        assert!(json.contains("\"FailureRedirectionURL\""));
        assert!(json.contains("\"FromEmailAddress\""));
        assert!(!json.contains("HtmlPart"));

        let parsed = Manifest::parse(TemplateKind::Verification, &json).unwrap();
        assert_eq!(parsed.template_name(), "VerifyTemplate");
        assert_eq!(parsed.subject(), "Confirm");
    }

    #[test]
    fn email_boilerplate_has_empty_html_part() {
        let manifest = Manifest::boilerplate(TemplateKind::Email, "welcome", "Hello");
        let json = manifest.to_json_pretty().unwrap();
        assert!(json.contains("\"HtmlPart\": \"\""));
        assert_eq!(manifest.embedded_html(), None);
    }

    #[test]
    fn boilerplate_html_keeps_placeholder() {
        let html = boilerplate_html("Welcome!");
        assert!(html.contains("<title>Welcome!</title>"));
        assert!(html.contains("{{name}}"));
    }

    #[test]
    fn send_payload_defaults_template_data() {
        let raw = r#"{"Source":"a@b.co","Template":"T","Destination":{"ToAddresses":["c@d.co"]}}"#;
        let payload: SendEmailPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.template_data, "{}");
        assert_eq!(payload.destination.to_addresses, vec!["c@d.co"]);
    }
}
