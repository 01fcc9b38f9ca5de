use crate::commands::{load_manifest, require_template, CmdMessage, CmdResult, TemplateDetails};
use crate::error::Result;
use crate::manifest::SendEmailPayload;
use crate::model::TemplateKind;
use crate::store::TemplateStore;

pub fn details<S: TemplateStore>(
    store: &S,
    kind: TemplateKind,
    relative_path: &str,
) -> Result<TemplateDetails> {
    let path = require_template(store, kind, relative_path)?;
    let manifest = load_manifest(store, kind, &path)?;
    let html = store.read_html(kind, &path)?;
    let send_payload = store
        .read_send_payload(kind, &path)?
        .and_then(|raw| serde_json::from_str::<SendEmailPayload>(&raw).ok());

    Ok(TemplateDetails {
        kind,
        relative_path: path,
        html,
        manifest,
        send_payload,
    })
}

pub fn run<S: TemplateStore>(store: &S, kind: TemplateKind, relative_path: &str) -> Result<CmdResult> {
    let details = details(store, kind, relative_path)?;
    let mut result = CmdResult::default();
    if details.html.trim().is_empty() && details.manifest.embedded_html().is_none() {
        result.add_message(CmdMessage::warning(format!(
            "{} has no HTML body yet",
            details.relative_path
        )));
    }
    Ok(result.with_details(details))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SesPilotError;
    use crate::store::memory::fixtures::StoreFixture;
    use crate::store::memory::InMemoryStore;
    use chrono::Utc;

    #[test]
    fn shows_template_details() {
        let store = StoreFixture::new()
            .with_email("marketing/welcome", "Welcome", Utc::now())
            .store;
        let result = run(&store, TemplateKind::Email, "marketing/welcome").unwrap();
        let details = result.details.unwrap();
        assert_eq!(details.manifest.template_name(), "Welcome");
        assert_eq!(details.html, "<p>Hello {{name}}</p>");
        assert!(result.messages.is_empty());
    }

    #[test]
    fn missing_template_is_not_found() {
        let store = InMemoryStore::new();
        assert!(matches!(
            run(&store, TemplateKind::Email, "nope"),
            Err(SesPilotError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn kind_mismatch_is_not_found() {
        let store = StoreFixture::new().with_verification("confirm", "Confirm").store;
        assert!(matches!(
            run(&store, TemplateKind::Email, "confirm"),
            Err(SesPilotError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn broken_manifest_is_reported() {
        let store = StoreFixture::new()
            .with_raw_manifest(TemplateKind::Email, "broken", "{")
            .store;
        assert!(matches!(
            run(&store, TemplateKind::Email, "broken"),
            Err(SesPilotError::InvalidInput(_))
        ));
    }
}
