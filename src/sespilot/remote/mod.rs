//! # Remote Layer
//!
//! [`SesClient`] is everything ses-pilot asks of the email-sending service.
//! The production client, [`aws::AwsCli`], drives the `aws sesv2` command line
//! tool as a subprocess; [`fake::FakeSes`] keeps state in memory for tests.
//!
//! Failures are recognised by substring only. A missing template surfaces as
//! [`SesPilotError::RemoteNotFound`]; everything else keeps the tool's stderr in
//! [`SesPilotError::AwsCli`] so callers can look for `AccessDenied` and friends.

use crate::error::{Result, SesPilotError};
use crate::model::RemoteTemplate;
use serde::{Deserialize, Serialize};

pub mod aws;
#[cfg(any(test, feature = "test_utils"))]
pub mod fake;

pub const NOT_FOUND_MARKER: &str = "NotFoundException";
pub const ACCESS_DENIED_MARKERS: &[&str] = &["AccessDenied", "UnauthorizedOperation"];
const EMPTY_LISTING_MARKER: &str = "No templates found";

/// Payload of `create-email-template` / `update-email-template`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmailTemplatePayload {
    pub template_name: String,
    pub template_content: EmailContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmailContent {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Payload of the custom verification template create/update calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationTemplatePayload {
    #[serde(rename = "TemplateName")]
    pub template_name: String,
    #[serde(rename = "FromEmailAddress")]
    pub from_email_address: String,
    #[serde(rename = "TemplateSubject")]
    pub template_subject: String,
    #[serde(rename = "TemplateContent")]
    pub template_content: String,
    #[serde(rename = "SuccessRedirectionURL")]
    pub success_redirection_url: String,
    #[serde(rename = "FailureRedirectionURL")]
    pub failure_redirection_url: String,
}

/// One entry of the custom verification template listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteVerificationTemplate {
    #[serde(rename = "TemplateName")]
    pub template_name: String,
    #[serde(rename = "FromEmailAddress", default)]
    pub from_email_address: String,
    #[serde(rename = "TemplateSubject", alias = "Subject", default)]
    pub template_subject: String,
    #[serde(rename = "SuccessRedirectionURL", default)]
    pub success_redirection_url: String,
    #[serde(rename = "FailureRedirectionURL", default)]
    pub failure_redirection_url: String,
}

impl RemoteVerificationTemplate {
    /// Verification listings carry no timestamps.
    pub fn descriptor(&self) -> RemoteTemplate {
        RemoteTemplate::new(self.template_name.clone(), None)
    }
}

/// A verification template fetched in full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteVerificationContent {
    #[serde(flatten)]
    pub template: RemoteVerificationTemplate,
    #[serde(rename = "TemplateContent", default)]
    pub template_content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallerIdentity {
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub arn: String,
    #[serde(default)]
    pub user_id: String,
}

/// A test send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SendRequest {
    /// Subject and HTML sent as-is.
    Simple {
        from: String,
        to: Vec<String>,
        subject: String,
        html: String,
    },
    /// A deployed template rendered with `template_data`.
    Templated {
        from: String,
        to: Vec<String>,
        template_name: String,
        template_data: String,
    },
}

/// Operations performed against the email-sending service.
pub trait SesClient {
    fn caller_identity(&self) -> Result<CallerIdentity>;

    /// Every email template, following pagination to the end.
    fn list_email_templates(&self) -> Result<Vec<RemoteTemplate>>;

    fn list_verification_templates(&self) -> Result<Vec<RemoteVerificationTemplate>>;

    fn get_email_template(&self, name: &str) -> Result<EmailContent>;

    fn get_verification_template(&self, name: &str) -> Result<RemoteVerificationContent>;

    fn create_email_template(&self, payload: &EmailTemplatePayload) -> Result<()>;

    fn update_email_template(&self, payload: &EmailTemplatePayload) -> Result<()>;

    fn delete_email_template(&self, name: &str) -> Result<()>;

    fn create_verification_template(&self, payload: &VerificationTemplatePayload) -> Result<()>;

    fn update_verification_template(&self, payload: &VerificationTemplatePayload) -> Result<()>;

    fn delete_verification_template(&self, name: &str) -> Result<()>;

    /// Returns the message id.
    fn send_email(&self, request: &SendRequest) -> Result<String>;

    fn send_verification_email(&self, address: &str, template_name: &str) -> Result<String>;

    fn list_identities(&self) -> Result<Vec<String>>;
}

/// True when a failure says the caller lacks permission.
pub fn is_access_denied(err: &SesPilotError) -> bool {
    let message = err.remote_message();
    ACCESS_DENIED_MARKERS.iter().any(|m| message.contains(m))
}

/// Reinterprets a remote failure for `name`: not-found markers become
/// [`SesPilotError::RemoteNotFound`], everything else passes through.
pub fn classify(err: SesPilotError, name: &str) -> SesPilotError {
    match err {
        SesPilotError::AwsCli { ref stderr, .. } if stderr.contains(NOT_FOUND_MARKER) => {
            SesPilotError::RemoteNotFound(name.to_string())
        }
        other => other,
    }
}

/// Listing failures that only mean "nothing there yet".
pub fn is_empty_listing(err: &SesPilotError) -> bool {
    err.remote_message().contains(EMPTY_LISTING_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_error(stderr: &str) -> SesPilotError {
        SesPilotError::AwsCli {
            command: "sesv2 get-email-template".to_string(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn classifies_not_found() {
        let err = classify(
            cli_error("An error occurred (NotFoundException) when calling the GetEmailTemplate operation"),
            "Welcome",
        );
        assert!(matches!(err, SesPilotError::RemoteNotFound(name) if name == "Welcome"));
    }

    #[test]
    fn other_failures_pass_through() {
        let err = classify(cli_error("Could not connect to the endpoint URL"), "Welcome");
        assert!(matches!(err, SesPilotError::AwsCli { .. }));
    }

    #[test]
    fn detects_access_denied() {
        assert!(is_access_denied(&cli_error(
            "An error occurred (AccessDeniedException) when calling the SendEmail operation"
        )));
        assert!(is_access_denied(&cli_error("UnauthorizedOperation")));
        assert!(!is_access_denied(&cli_error("MessageRejected: Email address is not verified")));
    }

    #[test]
    fn email_payload_matches_cli_input_shape() {
        let payload = EmailTemplatePayload {
            template_name: "Welcome".to_string(),
            template_content: EmailContent {
                subject: "Hi".to_string(),
                html: "<p>x</p>".to_string(),
                text: None,
            },
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "TemplateName": "Welcome",
                "TemplateContent": { "Subject": "Hi", "Html": "<p>x</p>" }
            })
        );
    }

    #[test]
    fn verification_listing_accepts_subject_alias() {
        let raw = r#"{"TemplateName":"Verify","FromEmailAddress":"a@b.co","Subject":"Confirm"}"#;
        let parsed: RemoteVerificationTemplate = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.template_subject, "Confirm");
        assert_eq!(parsed.descriptor().last_updated_timestamp, None);
    }
}
