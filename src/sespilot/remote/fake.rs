use super::{
    CallerIdentity, EmailContent, EmailTemplatePayload, RemoteVerificationContent,
    RemoteVerificationTemplate, SendRequest, SesClient, VerificationTemplatePayload,
};
use crate::error::{Result, SesPilotError};
use crate::model::RemoteTemplate;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub struct FakeEmailTemplate {
    pub name: String,
    pub content: EmailContent,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub email: Vec<FakeEmailTemplate>,
    pub verification: Vec<RemoteVerificationContent>,
    pub identity: Option<CallerIdentity>,
    pub denied: BTreeSet<String>,
    pub failing: BTreeSet<String>,
    pub calls: Vec<String>,
    pub sent: Vec<SendRequest>,
}

/// In-memory stand-in for the email-sending service.
///
/// Operations are named after the CLI subcommands (`create-email-template`, ...);
/// `deny` and `fail` make a named operation return an access-denied or a
/// generic failure.
#[derive(Debug)]
pub struct FakeSes {
    state: Mutex<FakeState>,
}

impl Default for FakeSes {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSes {
    pub fn new() -> Self {
        let state = FakeState {
            identity: Some(CallerIdentity {
                account: "123456789012".to_string(),
                arn: "arn:aws:iam::123456789012:user/tester".to_string(),
                user_id: "AIDATESTER".to_string(),
            }),
            ..FakeState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_email(self, name: &str, subject: &str, html: &str, last_updated: Option<DateTime<Utc>>) -> Self {
        self.state().email.push(FakeEmailTemplate {
            name: name.to_string(),
            content: EmailContent {
                subject: subject.to_string(),
                html: html.to_string(),
                text: None,
            },
            last_updated,
        });
        self
    }

    pub fn with_verification(self, name: &str, subject: &str, html: &str) -> Self {
        self.state().verification.push(RemoteVerificationContent {
            template: RemoteVerificationTemplate {
                template_name: name.to_string(),
                from_email_address: "sender@example.com".to_string(),
                template_subject: subject.to_string(),
                success_redirection_url: "https://example.com/ok".to_string(),
                failure_redirection_url: "https://example.com/fail".to_string(),
            },
            template_content: html.to_string(),
        });
        self
    }

    pub fn without_identity(self) -> Self {
        self.state().identity = None;
        self
    }

    pub fn deny(self, operation: &str) -> Self {
        self.state().denied.insert(operation.to_string());
        self
    }

    pub fn fail(self, operation: &str) -> Self {
        self.state().failing.insert(operation.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn sent(&self) -> Vec<SendRequest> {
        self.state().sent.clone()
    }

    pub fn email(&self, name: &str) -> Option<FakeEmailTemplate> {
        self.state().email.iter().find(|t| t.name == name).cloned()
    }

    pub fn verification(&self, name: &str) -> Option<RemoteVerificationContent> {
        self.state()
            .verification
            .iter()
            .find(|t| t.template.template_name == name)
            .cloned()
    }

    fn enter(&self, operation: &str, subject: &str) -> Result<MutexGuard<'_, FakeState>> {
        let mut state = self.state();
        state.calls.push(format!("{} {}", operation, subject).trim().to_string());
        if state.denied.contains(operation) {
            return Err(SesPilotError::AwsCli {
                command: format!("sesv2 {}", operation),
                stderr: format!(
                    "An error occurred (AccessDeniedException) when calling the {} operation",
                    operation
                ),
            });
        }
        if state.failing.contains(operation) {
            return Err(SesPilotError::AwsCli {
                command: format!("sesv2 {}", operation),
                stderr: "An error occurred (BadRequestException): simulated failure".to_string(),
            });
        }
        Ok(state)
    }
}

impl SesClient for FakeSes {
    fn caller_identity(&self) -> Result<CallerIdentity> {
        let state = self.enter("get-caller-identity", "")?;
        state.identity.clone().ok_or_else(|| SesPilotError::AwsCli {
            command: "sts get-caller-identity".to_string(),
            stderr: "Unable to locate credentials".to_string(),
        })
    }

    fn list_email_templates(&self) -> Result<Vec<RemoteTemplate>> {
        let state = self.enter("list-email-templates", "")?;
        Ok(state
            .email
            .iter()
            .map(|t| RemoteTemplate::new(t.name.clone(), t.last_updated))
            .collect())
    }

    fn list_verification_templates(&self) -> Result<Vec<RemoteVerificationTemplate>> {
        let state = self.enter("list-custom-verification-email-templates", "")?;
        Ok(state.verification.iter().map(|t| t.template.clone()).collect())
    }

    fn get_email_template(&self, name: &str) -> Result<EmailContent> {
        let state = self.enter("get-email-template", name)?;
        state
            .email
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.content.clone())
            .ok_or_else(|| SesPilotError::RemoteNotFound(name.to_string()))
    }

    fn get_verification_template(&self, name: &str) -> Result<RemoteVerificationContent> {
        let state = self.enter("get-custom-verification-email-template", name)?;
        state
            .verification
            .iter()
            .find(|t| t.template.template_name == name)
            .cloned()
            .ok_or_else(|| SesPilotError::RemoteNotFound(name.to_string()))
    }

    fn create_email_template(&self, payload: &EmailTemplatePayload) -> Result<()> {
        let mut state = self.enter("create-email-template", &payload.template_name)?;
        if state.email.iter().any(|t| t.name == payload.template_name) {
            return Err(SesPilotError::AwsCli {
                command: "sesv2 create-email-template".to_string(),
                stderr: "An error occurred (AlreadyExistsException)".to_string(),
            });
        }
        state.email.push(FakeEmailTemplate {
            name: payload.template_name.clone(),
            content: payload.template_content.clone(),
            last_updated: Some(Utc::now()),
        });
        Ok(())
    }

    fn update_email_template(&self, payload: &EmailTemplatePayload) -> Result<()> {
        let mut state = self.enter("update-email-template", &payload.template_name)?;
        let template = state
            .email
            .iter_mut()
            .find(|t| t.name == payload.template_name)
            .ok_or_else(|| SesPilotError::RemoteNotFound(payload.template_name.clone()))?;
        template.content = payload.template_content.clone();
        template.last_updated = Some(Utc::now());
        Ok(())
    }

    fn delete_email_template(&self, name: &str) -> Result<()> {
        let mut state = self.enter("delete-email-template", name)?;
        let before = state.email.len();
        state.email.retain(|t| t.name != name);
        if state.email.len() == before {
            return Err(SesPilotError::RemoteNotFound(name.to_string()));
        }
        Ok(())
    }

    fn create_verification_template(&self, payload: &VerificationTemplatePayload) -> Result<()> {
        let mut state = self.enter("create-custom-verification-email-template", &payload.template_name)?;
        if state
            .verification
            .iter()
            .any(|t| t.template.template_name == payload.template_name)
        {
            return Err(SesPilotError::AwsCli {
                command: "sesv2 create-custom-verification-email-template".to_string(),
                stderr: "An error occurred (AlreadyExistsException)".to_string(),
            });
        }
        state.verification.push(verification_from_payload(payload));
        Ok(())
    }

    fn update_verification_template(&self, payload: &VerificationTemplatePayload) -> Result<()> {
        let mut state = self.enter("update-custom-verification-email-template", &payload.template_name)?;
        let existing = state
            .verification
            .iter_mut()
            .find(|t| t.template.template_name == payload.template_name)
            .ok_or_else(|| SesPilotError::RemoteNotFound(payload.template_name.clone()))?;
        *existing = verification_from_payload(payload);
        Ok(())
    }

    fn delete_verification_template(&self, name: &str) -> Result<()> {
        let mut state = self.enter("delete-custom-verification-email-template", name)?;
        let before = state.verification.len();
        state.verification.retain(|t| t.template.template_name != name);
        if state.verification.len() == before {
            return Err(SesPilotError::RemoteNotFound(name.to_string()));
        }
        Ok(())
    }

    fn send_email(&self, request: &SendRequest) -> Result<String> {
        let mut state = self.enter("send-email", "")?;
        state.sent.push(request.clone());
        Ok(format!("fake-message-{}", state.sent.len()))
    }

    fn send_verification_email(&self, address: &str, template_name: &str) -> Result<String> {
        let mut state = self.enter("send-custom-verification-email", template_name)?;
        if !state
            .verification
            .iter()
            .any(|t| t.template.template_name == template_name)
        {
            return Err(SesPilotError::RemoteNotFound(template_name.to_string()));
        }
        state.sent.push(SendRequest::Templated {
            from: String::new(),
            to: vec![address.to_string()],
            template_name: template_name.to_string(),
            template_data: String::new(),
        });
        Ok(format!("fake-message-{}", state.sent.len()))
    }

    fn list_identities(&self) -> Result<Vec<String>> {
        drop(self.enter("list-email-identities", "")?);
        Ok(vec!["sender@example.com".to_string()])
    }
}

fn verification_from_payload(payload: &VerificationTemplatePayload) -> RemoteVerificationContent {
    RemoteVerificationContent {
        template: RemoteVerificationTemplate {
            template_name: payload.template_name.clone(),
            from_email_address: payload.from_email_address.clone(),
            template_subject: payload.template_subject.clone(),
            success_redirection_url: payload.success_redirection_url.clone(),
            failure_redirection_url: payload.failure_redirection_url.clone(),
        },
        template_content: payload.template_content.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::is_access_denied;

    #[test]
    fn identity_listing_records_calls_and_releases_state() {
        let client = FakeSes::new();
        assert_eq!(client.list_identities().unwrap(), vec!["sender@example.com"]);
        assert!(client.list_identities().is_ok());
        assert_eq!(
            client.calls(),
            vec!["list-email-identities", "list-email-identities"]
        );
    }

    #[test]
    fn denied_operations_look_like_access_denied() {
        let client = FakeSes::new().deny("list-email-identities");
        let err = client.list_identities().unwrap_err();
        assert!(is_access_denied(&err));
    }
}
