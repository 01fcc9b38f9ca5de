use crate::commands::{load_manifest, require_template, CmdMessage, CmdResult, TemplateRef};
use crate::error::{Result, SesPilotError};
use crate::html::normalize_from_address;
use crate::manifest::SendEmailPayload;
use crate::model::TemplateKind;
use crate::remote::{SendRequest, SesClient};
use crate::store::TemplateStore;
use once_cell::sync::Lazy;
use regex::Regex;

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

const FALLBACK_SUBJECT: &str = "Test email";

/// Where a test send goes.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Send the local HTML straight to this address. Without it the template's
    /// `send-email.json` is used.
    pub to: Option<String>,
    /// Sender for direct sends; defaults to `noreply@example.com`.
    pub from: Option<String>,
}

pub fn validate_address(address: &str) -> Result<String> {
    let address = address.trim();
    if !ADDRESS_RE.is_match(address) {
        return Err(SesPilotError::InvalidInput(format!(
            "'{}' is not a valid email address",
            address
        )));
    }
    Ok(address.to_string())
}

pub fn run<S: TemplateStore, C: SesClient>(
    store: &S,
    client: &C,
    kind: TemplateKind,
    relative_path: &str,
    options: SendOptions,
) -> Result<CmdResult> {
    let path = require_template(store, kind, relative_path)?;
    let manifest = load_manifest(store, kind, &path)?;
    let template_name = manifest.template_name().to_string();

    let (message_id, recipients) = match kind {
        TemplateKind::Verification => {
            let to = options.to.as_deref().ok_or_else(|| {
                SesPilotError::InvalidInput("Verification test sends need a recipient".to_string())
            })?;
            let to = validate_address(to)?;
            client.get_verification_template(&template_name).map_err(|e| match e {
                SesPilotError::RemoteNotFound(name) => SesPilotError::InvalidInput(format!(
                    "{} is not on SES yet, deploy it first",
                    name
                )),
                other => other,
            })?;
            (client.send_verification_email(&to, &template_name)?, vec![to])
        }
        TemplateKind::Email => {
            let request = match options.to.as_deref() {
                Some(to) => {
                    let to = validate_address(to)?;
                    let html = store.read_html(kind, &path)?;
                    let subject = match manifest.subject().trim() {
                        "" => FALLBACK_SUBJECT.to_string(),
                        s => s.to_string(),
                    };
                    SendRequest::Simple {
                        from: normalize_from_address(options.from.as_deref().unwrap_or("")),
                        to: vec![to],
                        subject,
                        html,
                    }
                }
                None => templated_request(store, kind, &path)?,
            };
            let recipients = match &request {
                SendRequest::Simple { to, .. } | SendRequest::Templated { to, .. } => to.clone(),
            };
            (client.send_email(&request)?, recipients)
        }
    };
    tracing::info!(?kind, %path, %message_id, "sent test email");

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Sent {} to {} (message id {})",
        template_name,
        recipients.join(", "),
        message_id
    )));
    result.add_message(CmdMessage::info("Check the inbox; delivery can take a minute"));
    Ok(result.with_affected(vec![TemplateRef::new(kind, path, Some(template_name))]))
}

fn templated_request<S: TemplateStore>(store: &S, kind: TemplateKind, path: &str) -> Result<SendRequest> {
    let raw = store.read_send_payload(kind, path)?.ok_or_else(|| {
        SesPilotError::InvalidInput(format!(
            "{} has no send-email.json; give a recipient instead",
            path
        ))
    })?;
    let payload: SendEmailPayload = serde_json::from_str(&raw)
        .map_err(|e| SesPilotError::InvalidInput(format!("{}/send-email.json: {}", path, e)))?;
    if payload.destination.to_addresses.is_empty() {
        return Err(SesPilotError::InvalidInput(format!(
            "{}/send-email.json has no recipients",
            path
        )));
    }
    Ok(SendRequest::Templated {
        from: payload.source,
        to: payload.destination.to_addresses,
        template_name: payload.template,
        template_data: payload.template_data,
    })
}
