//! IAM permission probe.
//!
//! Each permission is checked by making the real call. Listing calls count as
//! allowed only when they succeed. Mutating and sending calls are run against a
//! throwaway template name and count as allowed unless the failure is an
//! access-denied one, since "template not found" or "address not verified" still
//! prove the caller may make the call.

use crate::commands::{CmdMessage, CmdResult, PermissionCheck, PermissionReport};
use crate::error::Result;
use crate::remote::{
    is_access_denied, EmailContent, EmailTemplatePayload, SendRequest, SesClient,
    VerificationTemplatePayload,
};

pub const PROBE_TEMPLATE: &str = "ses-pilot-permission-probe";
const PROBE_ADDRESS: &str = "test@example.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    ListEmailTemplates,
    CreateEmailTemplate,
    UpdateEmailTemplate,
    DeleteEmailTemplate,
    SendEmail,
    ListVerificationTemplates,
    CreateVerificationTemplate,
    UpdateVerificationTemplate,
    DeleteVerificationTemplate,
    SendVerificationEmail,
    ListIdentities,
}

// Each delete follows its create. The verification send runs after the delete
// so it targets a template that no longer exists.
const PROBES: &[Probe] = &[
    Probe::ListEmailTemplates,
    Probe::CreateEmailTemplate,
    Probe::UpdateEmailTemplate,
    Probe::DeleteEmailTemplate,
    Probe::SendEmail,
    Probe::ListVerificationTemplates,
    Probe::CreateVerificationTemplate,
    Probe::UpdateVerificationTemplate,
    Probe::DeleteVerificationTemplate,
    Probe::SendVerificationEmail,
    Probe::ListIdentities,
];

impl Probe {
    fn permission(self) -> &'static str {
        match self {
            Probe::ListEmailTemplates => "ses:ListEmailTemplates",
            Probe::CreateEmailTemplate => "ses:CreateEmailTemplate",
            Probe::UpdateEmailTemplate => "ses:UpdateEmailTemplate",
            Probe::DeleteEmailTemplate => "ses:DeleteEmailTemplate",
            Probe::SendEmail => "ses:SendEmail",
            Probe::ListVerificationTemplates => "ses:ListCustomVerificationEmailTemplates",
            Probe::CreateVerificationTemplate => "ses:CreateCustomVerificationEmailTemplate",
            Probe::UpdateVerificationTemplate => "ses:UpdateCustomVerificationEmailTemplate",
            Probe::DeleteVerificationTemplate => "ses:DeleteCustomVerificationEmailTemplate",
            Probe::SendVerificationEmail => "ses:SendCustomVerificationEmail",
            Probe::ListIdentities => "ses:ListIdentities",
        }
    }

    fn is_listing(self) -> bool {
        matches!(
            self,
            Probe::ListEmailTemplates | Probe::ListVerificationTemplates | Probe::ListIdentities
        )
    }

    fn call<C: SesClient>(self, client: &C) -> Result<()> {
        match self {
            Probe::ListEmailTemplates => client.list_email_templates().map(|_| ()),
            Probe::CreateEmailTemplate => client.create_email_template(&email_probe()),
            Probe::UpdateEmailTemplate => client.update_email_template(&email_probe()),
            Probe::DeleteEmailTemplate => client.delete_email_template(PROBE_TEMPLATE),
            Probe::SendEmail => client
                .send_email(&SendRequest::Simple {
                    from: PROBE_ADDRESS.to_string(),
                    to: vec![PROBE_ADDRESS.to_string()],
                    subject: "Test".to_string(),
                    html: "<p>Test</p>".to_string(),
                })
                .map(|_| ()),
            Probe::ListVerificationTemplates => client.list_verification_templates().map(|_| ()),
            Probe::CreateVerificationTemplate => {
                client.create_verification_template(&verification_probe())
            }
            Probe::UpdateVerificationTemplate => {
                client.update_verification_template(&verification_probe())
            }
            Probe::DeleteVerificationTemplate => client.delete_verification_template(PROBE_TEMPLATE),
            Probe::SendVerificationEmail => client
                .send_verification_email(PROBE_ADDRESS, PROBE_TEMPLATE)
                .map(|_| ()),
            Probe::ListIdentities => client.list_identities().map(|_| ()),
        }
    }
}

fn email_probe() -> EmailTemplatePayload {
    EmailTemplatePayload {
        template_name: PROBE_TEMPLATE.to_string(),
        template_content: EmailContent {
            subject: "Test".to_string(),
            html: "<p>Test</p>".to_string(),
            text: None,
        },
    }
}

fn verification_probe() -> VerificationTemplatePayload {
    VerificationTemplatePayload {
        template_name: PROBE_TEMPLATE.to_string(),
        from_email_address: PROBE_ADDRESS.to_string(),
        template_subject: "Test".to_string(),
        template_content: "<p>Test</p>".to_string(),
        success_redirection_url: "https://example.com/verified".to_string(),
        failure_redirection_url: "https://example.com/verification-failed".to_string(),
    }
}

fn check<C: SesClient>(client: &C, probe: Probe) -> PermissionCheck {
    let outcome = probe.call(client);
    let (allowed, reason) = match outcome {
        Ok(()) => (true, "Call succeeded".to_string()),
        Err(e) if is_access_denied(&e) => (false, "Access denied".to_string()),
        Err(e) if probe.is_listing() => (false, format!("Call failed: {}", e)),
        Err(e) => (true, format!("Allowed (call failed for another reason: {})", e)),
    };
    tracing::debug!(permission = probe.permission(), allowed, "probed permission");
    PermissionCheck {
        permission: probe.permission().to_string(),
        allowed,
        reason,
    }
}

pub fn run<C: SesClient>(client: &C) -> Result<CmdResult> {
    let mut result = CmdResult::default();

    let identity = match client.caller_identity() {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!(error = %e, "caller identity unavailable");
            result.add_message(CmdMessage::error(
                "AWS CLI is not configured or the credentials are invalid",
            ));
            return Ok(result.with_permissions(PermissionReport {
                configured: false,
                account: None,
                arn: None,
                checks: Vec::new(),
            }));
        }
    };

    let checks: Vec<PermissionCheck> = PROBES.iter().map(|probe| check(client, *probe)).collect();
    let denied = checks.iter().filter(|c| !c.allowed).count();
    if denied == 0 {
        result.add_message(CmdMessage::success("All SES permissions look good"));
    } else {
        result.add_message(CmdMessage::warning(format!(
            "{} of {} permissions are missing",
            denied,
            checks.len()
        )));
    }

    Ok(result.with_permissions(PermissionReport {
        configured: true,
        account: Some(identity.account),
        arn: Some(identity.arn),
        checks,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fake::FakeSes;

    #[test]
    fn unconfigured_cli_reports_nothing_else() {
        let client = FakeSes::new().without_identity();
        let result = run(&client).unwrap();
        let report = result.permissions.unwrap();
        assert!(!report.configured);
        assert!(report.checks.is_empty());
        assert_eq!(client.calls(), vec!["get-caller-identity"]);
    }

    #[test]
    fn everything_allowed_leaves_no_probe_behind() {
        let client = FakeSes::new();
        let result = run(&client).unwrap();
        let report = result.permissions.unwrap();

        assert!(report.configured);
        assert_eq!(report.account.as_deref(), Some("123456789012"));
        assert!(report.checks.iter().all(|c| c.allowed), "{:?}", report.checks);
        assert!(client.email(PROBE_TEMPLATE).is_none());
        assert!(client.verification(PROBE_TEMPLATE).is_none());
    }

    #[test]
    fn denied_calls_are_reported() {
        let client = FakeSes::new()
            .deny("create-email-template")
            .deny("send-email");
        let report = run(&client).unwrap().permissions.unwrap();

        assert!(!report.allowed("ses:CreateEmailTemplate"));
        assert!(!report.allowed("ses:SendEmail"));
        // Update and delete only fail with not-found, which proves access.
        assert!(report.allowed("ses:UpdateEmailTemplate"));
        assert!(report.allowed("ses:DeleteEmailTemplate"));
    }

    #[test]
    fn failing_listings_count_as_denied() {
        let client = FakeSes::new().fail("list-email-identities");
        let report = run(&client).unwrap().permissions.unwrap();
        assert!(!report.allowed("ses:ListIdentities"));
    }
}
