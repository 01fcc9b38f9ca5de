use crate::commands::status;
use crate::commands::{CmdMessage, CmdResult, TemplateRef};
use crate::error::{Result, SesPilotError};
use crate::html::decode_entities;
use crate::manifest::{
    EmailManifest, EmailTemplateBody, Manifest, SendEmailPayload, VerificationHeader,
    VerificationManifest,
};
use crate::model::{TemplateKind, TemplateNode};
use crate::remote::SesClient;
use crate::store::{require_relative, TemplateStore};
use crate::sync::local_template_name;

/// Remote content ready to be written locally.
struct Pulled {
    kind: TemplateKind,
    manifest: Manifest,
    html: String,
}

/// Pulls each name in turn. A failure on one name is reported and the rest
/// still run.
pub fn run<S: TemplateStore, C: SesClient>(
    store: &mut S,
    client: &C,
    names: &[String],
) -> Result<CmdResult> {
    if names.is_empty() {
        return Err(SesPilotError::InvalidInput(
            "Give at least one template name to pull".to_string(),
        ));
    }

    let mut result = CmdResult::default();
    let mut affected = Vec::new();
    for name in names {
        match fetch_any(client, name).and_then(|pulled| write_pulled(store, name, pulled)) {
            Ok(reference) => {
                result.add_message(CmdMessage::success(format!(
                    "Pulled {} into {}",
                    name, reference.relative_path
                )));
                affected.push(reference);
            }
            Err(e) => {
                tracing::warn!(%name, error = %e, "pull failed");
                result.add_message(CmdMessage::error(format!("Could not pull {}: {}", name, e)));
            }
        }
    }
    Ok(result.with_affected(affected))
}

/// Pulls every template that exists on SES but not locally, both kinds.
pub fn run_all<S: TemplateStore, C: SesClient>(store: &mut S, client: &C) -> Result<CmdResult> {
    let mut pending = Vec::new();
    for kind in [TemplateKind::Email, TemplateKind::Verification] {
        let report = status::report(&*store, client, kind)?;
        pending.extend(
            report
                .remote_only
                .into_iter()
                .map(|remote| (kind, remote.template_name)),
        );
    }

    let mut result = CmdResult::default();
    if pending.is_empty() {
        result.add_message(CmdMessage::info("Nothing to pull, every SES template exists locally"));
        return Ok(result);
    }

    let mut affected = Vec::new();
    for (kind, name) in pending {
        match fetch(client, kind, &name).and_then(|pulled| write_pulled(store, &name, pulled)) {
            Ok(reference) => affected.push(reference),
            Err(e) => {
                tracing::warn!(%name, error = %e, "pull failed");
                result.add_message(CmdMessage::error(format!("Could not pull {}: {}", name, e)));
            }
        }
    }
    result.add_message(CmdMessage::success(format!(
        "Pulled {} template(s)",
        affected.len()
    )));
    Ok(result.with_affected(affected))
}

/// Regular lookup first, verification lookup when that fails.
fn fetch_any<C: SesClient>(client: &C, name: &str) -> Result<Pulled> {
    match fetch(client, TemplateKind::Email, name) {
        Ok(pulled) => Ok(pulled),
        Err(email_err) => {
            tracing::debug!(%name, error = %email_err, "not an email template, trying verification");
            fetch(client, TemplateKind::Verification, name)
        }
    }
}

fn fetch<C: SesClient>(client: &C, kind: TemplateKind, name: &str) -> Result<Pulled> {
    match kind {
        TemplateKind::Email => {
            let content = client.get_email_template(name)?;
            Ok(Pulled {
                kind,
                manifest: Manifest::Email(EmailManifest {
                    template: EmailTemplateBody {
                        template_name: name.to_string(),
                        subject_part: content.subject,
                        html_part: String::new(),
                        text_part: content.text,
                    },
                }),
                html: content.html,
            })
        }
        TemplateKind::Verification => {
            let remote = client.get_verification_template(name)?;
            Ok(Pulled {
                kind,
                manifest: Manifest::Verification(VerificationManifest {
                    template: VerificationHeader {
                        template_name: name.to_string(),
                        subject_part: decode_entities(&remote.template.template_subject),
                    },
                    html_part: None,
                    from_email_address: decode_entities(&remote.template.from_email_address),
                    success_redirection_url: remote.template.success_redirection_url,
                    failure_redirection_url: remote.template.failure_redirection_url,
                }),
                html: remote.template_content,
            })
        }
    }
}

fn write_pulled<S: TemplateStore>(store: &mut S, name: &str, pulled: Pulled) -> Result<TemplateRef> {
    let kind = pulled.kind;
    let path = match find_local(&*store, kind, name)? {
        Some(existing) => existing,
        None => {
            let path = require_relative(name)?;
            if store.exists(kind, &path) {
                return Err(SesPilotError::AlreadyExists(path));
            }
            path
        }
    };

    store.write_template(kind, &path, &pulled.manifest.to_json_pretty()?, Some(&pulled.html))?;
    if kind == TemplateKind::Email && store.read_send_payload(kind, &path)?.is_none() {
        let payload = SendEmailPayload::boilerplate(name);
        store.write_send_payload(kind, &path, &serde_json::to_string_pretty(&payload)?)?;
    }
    tracing::info!(?kind, %path, %name, "pulled template");
    Ok(TemplateRef::new(kind, path, Some(name.to_string())))
}

/// The local template whose manifest names `name`, if any.
fn find_local<S: TemplateStore>(store: &S, kind: TemplateKind, name: &str) -> Result<Option<String>> {
    let tree = store.scan(kind)?;
    let mut stack: Vec<&TemplateNode> = tree.iter().rev().collect();
    while let Some(node) = stack.pop() {
        if node.is_template() {
            if local_template_name(store, kind, &node.relative_path).as_deref() == Some(name) {
                return Ok(Some(node.relative_path.clone()));
            }
        } else if let Some(children) = &node.children {
            stack.extend(children.iter().rev());
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::show;
    use crate::remote::fake::FakeSes;
    use crate::store::memory::fixtures::StoreFixture;
    use crate::store::memory::InMemoryStore;
    use chrono::Utc;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn pulls_new_email_template_to_root() {
        let mut store = InMemoryStore::new();
        let client = FakeSes::new().with_email("Welcome", "Hi there", "<p>remote</p>", None);

        let result = run(&mut store, &client, &names(&["Welcome"])).unwrap();
        assert_eq!(result.affected[0].relative_path, "Welcome");

        let details = show::details(&store, TemplateKind::Email, "Welcome").unwrap();
        assert_eq!(details.html, "<p>remote</p>");
        assert_eq!(details.manifest.subject(), "Hi there");
        assert_eq!(details.manifest.embedded_html(), None);
        assert_eq!(details.send_payload.unwrap().template, "Welcome");
    }

    #[test]
    fn overwrites_template_with_same_name() {
        let mut store = StoreFixture::new()
            .with_email("marketing/welcome", "Welcome", Utc::now())
            .store;
        let client = FakeSes::new().with_email("Welcome", "Remote subject", "<p>remote</p>", None);

        run(&mut store, &client, &names(&["Welcome"])).unwrap();
        let details = show::details(&store, TemplateKind::Email, "marketing/welcome").unwrap();
        assert_eq!(details.html, "<p>remote</p>");
        assert!(!store.exists(TemplateKind::Email, "Welcome"));
    }

    #[test]
    fn falls_back_to_verification_lookup() {
        let mut store = InMemoryStore::new();
        let client = FakeSes::new().with_verification("Confirm", "Confirme seu e-mail &#233;", "<p>v</p>");

        let result = run(&mut store, &client, &names(&["Confirm"])).unwrap();
        assert_eq!(result.affected[0].kind, TemplateKind::Verification);

        let details = show::details(&store, TemplateKind::Verification, "Confirm").unwrap();
        assert_eq!(details.manifest.subject(), "Confirme seu e-mail é");
        assert_eq!(details.html, "<p>v</p>");
        assert!(details.send_payload.is_none());
    }

    #[test]
    fn one_failure_does_not_stop_the_rest() {
        let mut store = InMemoryStore::new();
        let client = FakeSes::new().with_email("Welcome", "Hi", "<p/>", None);

        let result = run(&mut store, &client, &names(&["Missing", "Welcome"])).unwrap();
        assert!(result.has_errors());
        assert_eq!(result.affected.len(), 1);
        assert!(store.is_template(TemplateKind::Email, "Welcome"));
    }

    #[test]
    fn rejects_empty_names_and_unsafe_paths() {
        let mut store = InMemoryStore::new();
        let client = FakeSes::new().with_email("../evil", "x", "<p/>", None);
        assert!(run(&mut store, &client, &[]).is_err());

        let result = run(&mut store, &client, &names(&["../evil"])).unwrap();
        assert!(result.has_errors());
        assert!(store.scan(TemplateKind::Email).unwrap().is_empty());
    }

    #[test]
    fn pull_all_fetches_remote_only_of_both_kinds() {
        let mut store = StoreFixture::new().with_email("welcome", "Welcome", Utc::now()).store;
        let client = FakeSes::new()
            .with_email("Welcome", "Hi", "<p/>", None)
            .with_email("Legacy", "Old", "<p>old</p>", None)
            .with_verification("Confirm", "Confirm", "<p>c</p>");

        let result = run_all(&mut store, &client).unwrap();
        assert_eq!(result.affected.len(), 2);
        assert!(store.is_template(TemplateKind::Email, "Legacy"));
        assert!(store.is_template(TemplateKind::Verification, "Confirm"));
        assert!(!client.calls().contains(&"get-email-template Welcome".to_string()));
    }

    #[test]
    fn pull_all_with_nothing_to_do() {
        let mut store = StoreFixture::new().with_email("welcome", "Welcome", Utc::now()).store;
        let client = FakeSes::new().with_email("Welcome", "Hi", "<p/>", None);
        let result = run_all(&mut store, &client).unwrap();
        assert!(result.affected.is_empty());
        assert!(!result.has_errors());
    }
}
