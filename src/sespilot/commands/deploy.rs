use crate::commands::{load_manifest, require_template, CmdMessage, CmdResult, TemplateRef};
use crate::error::{Result, SesPilotError};
use crate::html::{collapse, normalize_from_address, normalize_text};
use crate::manifest::Manifest;
use crate::model::TemplateKind;
use crate::remote::{EmailContent, EmailTemplatePayload, SesClient, VerificationTemplatePayload};
use crate::store::TemplateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployAction {
    Created,
    Updated,
}

impl DeployAction {
    fn verb(self) -> &'static str {
        match self {
            DeployAction::Created => "Created",
            DeployAction::Updated => "Updated",
        }
    }
}

/// Pushes one local template to SES.
pub fn run<S: TemplateStore, C: SesClient>(
    store: &S,
    client: &C,
    kind: TemplateKind,
    relative_path: &str,
) -> Result<CmdResult> {
    let path = require_template(store, kind, relative_path)?;
    let manifest = load_manifest(store, kind, &path)?;
    let html = body_html(store, kind, &path, &manifest)?;

    let action = match &manifest {
        Manifest::Email(m) => {
            let payload = EmailTemplatePayload {
                template_name: m.template.template_name.clone(),
                template_content: EmailContent {
                    subject: m.template.subject_part.clone(),
                    html,
                    text: m.template.text_part.clone().filter(|t| !t.trim().is_empty()),
                },
            };
            deploy_email(client, &payload)?
        }
        Manifest::Verification(m) => {
            let payload = VerificationTemplatePayload {
                template_name: m.template.template_name.clone(),
                from_email_address: normalize_from_address(&m.from_email_address),
                template_subject: normalize_text(&m.template.subject_part),
                template_content: html,
                success_redirection_url: m.success_redirection_url.clone(),
                failure_redirection_url: m.failure_redirection_url.clone(),
            };
            deploy_verification(client, &payload)?
        }
    };

    let template_name = manifest.template_name().to_string();
    tracing::info!(?kind, %path, %template_name, ?action, "deployed template");

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "{} {} on SES",
        action.verb(),
        template_name
    )));
    Ok(result.with_affected(vec![TemplateRef::new(kind, path, Some(template_name))]))
}

/// `template.html` collapsed to one line, or the manifest's embedded HTML when
/// the file is empty.
fn body_html<S: TemplateStore>(
    store: &S,
    kind: TemplateKind,
    path: &str,
    manifest: &Manifest,
) -> Result<String> {
    let html = collapse(&store.read_html(kind, path)?);
    if !html.is_empty() {
        return Ok(html);
    }
    manifest
        .embedded_html()
        .map(collapse)
        .ok_or_else(|| SesPilotError::InvalidInput(format!("{} has no HTML to deploy", path)))
}

/// Probes for the template: found means update, not found means create. Any
/// other probe failure is returned as is.
pub fn deploy_email<C: SesClient>(client: &C, payload: &EmailTemplatePayload) -> Result<DeployAction> {
    match client.get_email_template(&payload.template_name) {
        Ok(_) => {
            client.update_email_template(payload)?;
            Ok(DeployAction::Updated)
        }
        Err(SesPilotError::RemoteNotFound(_)) => {
            client.create_email_template(payload)?;
            Ok(DeployAction::Created)
        }
        Err(e) => Err(e),
    }
}

/// Tries create first and falls back to update. When both fail the create
/// error is the one reported.
pub fn deploy_verification<C: SesClient>(
    client: &C,
    payload: &VerificationTemplatePayload,
) -> Result<DeployAction> {
    match client.create_verification_template(payload) {
        Ok(()) => Ok(DeployAction::Created),
        Err(create_err) => {
            tracing::debug!(error = %create_err, "create failed, trying update");
            client
                .update_verification_template(payload)
                .map(|_| DeployAction::Updated)
                .map_err(|_| create_err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fake::FakeSes;
    use crate::store::memory::fixtures::StoreFixture;
    use crate::store::memory::InMemoryStore;
    use chrono::Utc;

    fn email_store(html: &str) -> InMemoryStore {
        let mut store = StoreFixture::new().with_email("welcome", "Welcome", Utc::now()).store;
        let manifest = store.read_manifest(TemplateKind::Email, "welcome").unwrap();
        store
            .write_template(TemplateKind::Email, "welcome", &manifest, Some(html))
            .unwrap();
        store
    }

    #[test]
    fn creates_missing_email_template_with_collapsed_html() {
        let store = email_store("<html>\n  <body>\n    <p>Hi   {{name}}</p>\n  </body>\n</html>\n");
        let client = FakeSes::new();

        let result = run(&store, &client, TemplateKind::Email, "welcome").unwrap();
        let remote = client.email("Welcome").unwrap();
        assert_eq!(
            remote.content.html,
            "<html> <body> <p>Hi {{name}}</p> </body></html>"
        );
        assert_eq!(remote.content.subject, "Subject");
        assert!(result.messages[0].content.starts_with("Created"));
        assert_eq!(
            client.calls(),
            vec!["get-email-template Welcome", "create-email-template Welcome"]
        );
    }

    #[test]
    fn updates_existing_email_template() {
        let store = email_store("<p>new</p>");
        let client = FakeSes::new().with_email("Welcome", "Old", "<p>old</p>", None);

        run(&store, &client, TemplateKind::Email, "welcome").unwrap();
        assert_eq!(client.email("Welcome").unwrap().content.html, "<p>new</p>");
        assert!(client.calls().contains(&"update-email-template Welcome".to_string()));
    }

    #[test]
    fn probe_failure_aborts() {
        let store = email_store("<p>new</p>");
        let client = FakeSes::new().deny("get-email-template");

        assert!(matches!(
            run(&store, &client, TemplateKind::Email, "welcome"),
            Err(SesPilotError::AwsCli { .. })
        ));
        assert!(client.email("Welcome").is_none());
    }

    #[test]
    fn falls_back_to_embedded_html() {
        let raw = r#"{"Template":{"TemplateName":"Inline","SubjectPart":"S","HtmlPart":"<p>\n inline</p>"}}"#;
        let store = StoreFixture::new()
            .with_raw_manifest(TemplateKind::Email, "inline", raw)
            .store;
        let client = FakeSes::new();

        run(&store, &client, TemplateKind::Email, "inline").unwrap();
        assert_eq!(client.email("Inline").unwrap().content.html, "<p> inline</p>");
    }

    #[test]
    fn nothing_to_deploy_is_invalid() {
        let raw = r#"{"Template":{"TemplateName":"Empty","SubjectPart":"S","HtmlPart":""}}"#;
        let store = StoreFixture::new()
            .with_raw_manifest(TemplateKind::Email, "empty", raw)
            .store;
        assert!(matches!(
            run(&store, &FakeSes::new(), TemplateKind::Email, "empty"),
            Err(SesPilotError::InvalidInput(_))
        ));
    }

    #[test]
    fn verification_creates_then_updates() {
        let store = StoreFixture::new().with_verification("confirm", "Confirm").store;
        let client = FakeSes::new();

        run(&store, &client, TemplateKind::Verification, "confirm").unwrap();
        let created = client.verification("Confirm").unwrap();
        assert_eq!(created.template_content, "<p>Hello {{name}}</p>");
        assert_eq!(created.template.from_email_address, "sender@example.com");

        let result = run(&store, &client, TemplateKind::Verification, "confirm").unwrap();
        assert!(result.messages[0].content.starts_with("Updated"));
    }

    #[test]
    fn verification_reports_create_error_when_both_fail() {
        let store = StoreFixture::new().with_verification("confirm", "Confirm").store;
        let client = FakeSes::new()
            .deny("create-custom-verification-email-template")
            .fail("update-custom-verification-email-template");

        let err = run(&store, &client, TemplateKind::Verification, "confirm").unwrap_err();
        assert!(err.remote_message().contains("AccessDenied"));
    }
}
