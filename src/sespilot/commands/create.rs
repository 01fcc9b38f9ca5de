use crate::commands::folders::validate_name;
use crate::commands::{CmdMessage, CmdResult, TemplateRef};
use crate::error::{Result, SesPilotError};
use crate::manifest::{boilerplate_html, Manifest, SendEmailPayload};
use crate::model::{join_relative, TemplateKind};
use crate::store::{normalize_relative, TemplateStore};

#[derive(Debug, Clone, Default)]
pub struct NewTemplate {
    /// Folder to create the template in, `""` for the root.
    pub parent: String,
    /// Directory name of the template.
    pub name: String,
    pub subject: String,
    /// Remote name; derived from `name` when absent.
    pub template_name: Option<String>,
}

impl NewTemplate {
    pub fn new(name: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subject: subject.into(),
            ..Self::default()
        }
    }

    pub fn in_folder(mut self, parent: impl Into<String>) -> Self {
        self.parent = parent.into();
        self
    }

    pub fn with_template_name(mut self, template_name: impl Into<String>) -> Self {
        self.template_name = Some(template_name.into());
        self
    }
}

pub fn run<S: TemplateStore>(store: &mut S, kind: TemplateKind, new: NewTemplate) -> Result<CmdResult> {
    let name = validate_name(&new.name)?;
    let parent = normalize_relative(&new.parent)?;
    let path = join_relative(&parent, &name);

    if store.exists(kind, &path) {
        return Err(SesPilotError::AlreadyExists(path));
    }

    let subject = if new.subject.trim().is_empty() {
        name.clone()
    } else {
        new.subject.trim().to_string()
    };
    let mut manifest = Manifest::boilerplate(kind, &name, &subject);
    if let Some(template_name) = new.template_name.filter(|n| !n.trim().is_empty()) {
        manifest.set_template_name(template_name.trim());
    }
    let template_name = manifest.template_name().to_string();

    store.write_template(
        kind,
        &path,
        &manifest.to_json_pretty()?,
        Some(&boilerplate_html(&subject)),
    )?;
    if kind == TemplateKind::Email {
        let payload = SendEmailPayload::boilerplate(&template_name);
        store.write_send_payload(kind, &path, &serde_json::to_string_pretty(&payload)?)?;
    }
    tracing::info!(?kind, %path, %template_name, "created template");

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Created {} {} ({})",
        kind, path, template_name
    )));
    Ok(result.with_affected(vec![TemplateRef::new(kind, path, Some(template_name))]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::show;
    use crate::store::memory::InMemoryStore;

    #[test]
    fn creates_email_template_with_test_payload() {
        let mut store = InMemoryStore::new();
        let result = run(
            &mut store,
            TemplateKind::Email,
            NewTemplate::new("welcome-email", "Welcome aboard").in_folder("onboarding"),
        )
        .unwrap();

        assert_eq!(result.affected[0].relative_path, "onboarding/welcome-email");
        let details = show::details(&store, TemplateKind::Email, "onboarding/welcome-email").unwrap();
        assert_eq!(details.manifest.template_name(), "WelcomeEmailTemplate");
        assert_eq!(details.manifest.subject(), "Welcome aboard");
        assert!(details.html.contains("<title>Welcome aboard</title>"));
        let payload = details.send_payload.unwrap();
        assert_eq!(payload.template, "WelcomeEmailTemplate");
    }

    #[test]
    fn creates_verification_template_without_payload() {
        let mut store = InMemoryStore::new();
        run(
            &mut store,
            TemplateKind::Verification,
            NewTemplate::new("confirm", "Confirm your address").with_template_name("ConfirmAddress"),
        )
        .unwrap();

        let details = show::details(&store, TemplateKind::Verification, "confirm").unwrap();
        assert_eq!(details.manifest.template_name(), "ConfirmAddress");
        assert!(details.send_payload.is_none());
        assert!(!store.is_template(TemplateKind::Email, "confirm"));
    }

    #[test]
    fn refuses_existing_directory() {
        let mut store = InMemoryStore::new();
        run(&mut store, TemplateKind::Email, NewTemplate::new("welcome", "Hi")).unwrap();
        let again = run(&mut store, TemplateKind::Email, NewTemplate::new("welcome", "Hi"));
        assert!(matches!(again, Err(SesPilotError::AlreadyExists(_))));
    }

    #[test]
    fn rejects_bad_names() {
        let mut store = InMemoryStore::new();
        for bad in ["", "has space", "../up", "a/b"] {
            assert!(
                run(&mut store, TemplateKind::Email, NewTemplate::new(bad, "x")).is_err(),
                "{:?} should be rejected",
                bad
            );
        }
        assert!(run(
            &mut store,
            TemplateKind::Email,
            NewTemplate::new("ok", "x").in_folder("../escape")
        )
        .is_err());
    }

    #[test]
    fn empty_subject_falls_back_to_name() {
        let mut store = InMemoryStore::new();
        run(&mut store, TemplateKind::Email, NewTemplate::new("promo", "  ")).unwrap();
        let details = show::details(&store, TemplateKind::Email, "promo").unwrap();
        assert_eq!(details.manifest.subject(), "promo");
    }
}
