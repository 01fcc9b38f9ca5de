use crate::commands::{load_manifest, CmdMessage, CmdResult, TemplateRef};
use crate::error::{Result, SesPilotError};
use crate::model::TemplateKind;
use crate::remote::SesClient;
use crate::store::{require_relative, TemplateStore};

/// Deletes a template or folder. With `remote`, the template is first removed
/// from SES; if that fails the local copy stays.
pub fn run<S: TemplateStore, C: SesClient>(
    store: &mut S,
    client: &C,
    kind: TemplateKind,
    relative_path: &str,
    remote: bool,
) -> Result<CmdResult> {
    let path = require_relative(relative_path)?;
    if !store.exists(kind, &path) {
        return Err(SesPilotError::TemplateNotFound(path));
    }

    let mut result = CmdResult::default();
    let mut template_name = None;

    if remote {
        if !store.is_template(kind, &path) {
            return Err(SesPilotError::InvalidInput(format!(
                "{} is a folder; only templates can be deleted from SES",
                path
            )));
        }
        let name = load_manifest(&*store, kind, &path)?.template_name().to_string();
        let deleted = match kind {
            TemplateKind::Email => client.delete_email_template(&name),
            TemplateKind::Verification => client.delete_verification_template(&name),
        };
        match deleted {
            Ok(()) => result.add_message(CmdMessage::success(format!("Deleted {} from SES", name))),
            Err(SesPilotError::RemoteNotFound(_)) => {
                result.add_message(CmdMessage::warning(format!("{} was not on SES", name)))
            }
            Err(e) => return Err(e),
        }
        template_name = Some(name);
    }

    store.remove(kind, &path)?;
    tracing::info!(?kind, %path, remote, "deleted");

    result.add_message(CmdMessage::success(format!("Deleted {}", path)));
    Ok(result.with_affected(vec![TemplateRef::new(kind, path, template_name)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fake::FakeSes;
    use crate::store::memory::fixtures::StoreFixture;
    use chrono::Utc;

    #[test]
    fn deletes_locally_only_by_default() {
        let mut store = StoreFixture::new().with_email("welcome", "Welcome", Utc::now()).store;
        let client = FakeSes::new().with_email("Welcome", "Hi", "<p/>", None);

        run(&mut store, &client, TemplateKind::Email, "welcome", false).unwrap();
        assert!(!store.exists(TemplateKind::Email, "welcome"));
        assert!(client.email("Welcome").is_some());
        assert!(client.calls().is_empty());
    }

    #[test]
    fn deletes_remote_then_local() {
        let mut store = StoreFixture::new().with_verification("confirm", "Confirm").store;
        let client = FakeSes::new().with_verification("Confirm", "Confirm", "<p/>");

        let result = run(&mut store, &client, TemplateKind::Verification, "confirm", true).unwrap();
        assert!(client.verification("Confirm").is_none());
        assert!(!store.exists(TemplateKind::Verification, "confirm"));
        assert_eq!(result.affected[0].template_name.as_deref(), Some("Confirm"));
    }

    #[test]
    fn remote_failure_keeps_local_copy() {
        let mut store = StoreFixture::new().with_email("welcome", "Welcome", Utc::now()).store;
        let client = FakeSes::new()
            .with_email("Welcome", "Hi", "<p/>", None)
            .deny("delete-email-template");

        assert!(run(&mut store, &client, TemplateKind::Email, "welcome", true).is_err());
        assert!(store.is_template(TemplateKind::Email, "welcome"));
    }

    #[test]
    fn missing_remote_is_a_warning() {
        let mut store = StoreFixture::new().with_email("welcome", "Welcome", Utc::now()).store;
        let client = FakeSes::new();

        let result = run(&mut store, &client, TemplateKind::Email, "welcome", true).unwrap();
        assert!(!store.exists(TemplateKind::Email, "welcome"));
        assert!(result
            .messages
            .iter()
            .any(|m| m.level == crate::commands::MessageLevel::Warning));
    }

    #[test]
    fn folders_delete_locally_but_not_remotely() {
        let mut store = StoreFixture::new()
            .with_email("marketing/promo", "Promo", Utc::now())
            .store;
        let client = FakeSes::new();
        assert!(matches!(
            run(&mut store, &client, TemplateKind::Email, "marketing", true),
            Err(SesPilotError::InvalidInput(_))
        ));
        run(&mut store, &client, TemplateKind::Email, "marketing", false).unwrap();
        assert!(store.scan(TemplateKind::Email).unwrap().is_empty());
    }
}
