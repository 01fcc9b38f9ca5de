use crate::commands::{load_manifest, require_template, CmdMessage, CmdResult, TemplateRef};
use crate::error::{Result, SesPilotError};
use crate::manifest::Manifest;
use crate::model::TemplateKind;
use crate::store::TemplateStore;
use serde::Deserialize;

/// Fields to change; `None` leaves a field alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateUpdate {
    pub subject: Option<String>,
    pub template_name: Option<String>,
    pub html: Option<String>,
    /// Plain-text body. Email templates only.
    pub text: Option<String>,
}

impl TemplateUpdate {
    pub fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.template_name.is_none()
            && self.html.is_none()
            && self.text.is_none()
    }
}

pub fn run<S: TemplateStore>(
    store: &mut S,
    kind: TemplateKind,
    relative_path: &str,
    update: TemplateUpdate,
) -> Result<CmdResult> {
    let path = require_template(&*store, kind, relative_path)?;
    if update.is_empty() {
        return Err(SesPilotError::InvalidInput("Nothing to update".to_string()));
    }

    let mut manifest = load_manifest(&*store, kind, &path)?;
    if let Some(subject) = &update.subject {
        manifest.set_subject(subject.trim());
    }
    if let Some(name) = &update.template_name {
        let name = name.trim();
        if name.is_empty() {
            return Err(SesPilotError::InvalidInput(
                "Template name cannot be empty".to_string(),
            ));
        }
        manifest.set_template_name(name);
    }
    if let Some(text) = update.text {
        match &mut manifest {
            Manifest::Email(m) => {
                m.template.text_part = Some(text).filter(|t| !t.trim().is_empty());
            }
            Manifest::Verification(_) => {
                return Err(SesPilotError::InvalidInput(
                    "Verification templates have no text part".to_string(),
                ))
            }
        }
    }

    store.write_template(kind, &path, &manifest.to_json_pretty()?, update.html.as_deref())?;
    tracing::info!(?kind, %path, "updated template");

    let template_name = manifest.template_name().to_string();
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Updated {}", path)));
    Ok(result.with_affected(vec![TemplateRef::new(kind, path, Some(template_name))]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::show;
    use crate::store::memory::fixtures::StoreFixture;
    use chrono::Utc;

    #[test]
    fn updates_subject_and_html() {
        let mut store = StoreFixture::new().with_email("welcome", "Welcome", Utc::now()).store;
        run(
            &mut store,
            TemplateKind::Email,
            "welcome",
            TemplateUpdate {
                subject: Some("New subject".to_string()),
                html: Some("<p>new</p>".to_string()),
                ..TemplateUpdate::default()
            },
        )
        .unwrap();

        let details = show::details(&store, TemplateKind::Email, "welcome").unwrap();
        assert_eq!(details.manifest.subject(), "New subject");
        assert_eq!(details.manifest.template_name(), "Welcome");
        assert_eq!(details.html, "<p>new</p>");
    }

    #[test]
    fn html_is_kept_when_not_given() {
        let mut store = StoreFixture::new().with_email("welcome", "Welcome", Utc::now()).store;
        run(
            &mut store,
            TemplateKind::Email,
            "welcome",
            TemplateUpdate {
                template_name: Some("Renamed".to_string()),
                text: Some("plain".to_string()),
                ..TemplateUpdate::default()
            },
        )
        .unwrap();

        let details = show::details(&store, TemplateKind::Email, "welcome").unwrap();
        assert_eq!(details.manifest.template_name(), "Renamed");
        assert_eq!(details.html, "<p>Hello {{name}}</p>");
        match details.manifest {
            Manifest::Email(m) => assert_eq!(m.template.text_part.as_deref(), Some("plain")),
            _ => panic!("expected an email manifest"),
        }
    }

    #[test]
    fn rejects_empty_update_and_blank_name() {
        let mut store = StoreFixture::new().with_email("welcome", "Welcome", Utc::now()).store;
        assert!(run(&mut store, TemplateKind::Email, "welcome", TemplateUpdate::default()).is_err());
        assert!(run(
            &mut store,
            TemplateKind::Email,
            "welcome",
            TemplateUpdate {
                template_name: Some(" ".to_string()),
                ..TemplateUpdate::default()
            }
        )
        .is_err());
    }

    #[test]
    fn verification_has_no_text_part() {
        let mut store = StoreFixture::new().with_verification("confirm", "Confirm").store;
        let result = run(
            &mut store,
            TemplateKind::Verification,
            "confirm",
            TemplateUpdate {
                text: Some("plain".to_string()),
                ..TemplateUpdate::default()
            },
        );
        assert!(matches!(result, Err(SesPilotError::InvalidInput(_))));
    }
}
