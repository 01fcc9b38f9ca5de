use super::{
    classify, is_empty_listing, CallerIdentity, EmailContent, EmailTemplatePayload,
    RemoteVerificationContent, RemoteVerificationTemplate, SendRequest, SesClient,
    VerificationTemplatePayload,
};
use crate::error::{Result, SesPilotError};
use crate::model::RemoteTemplate;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

pub const AWS_CLI_ENV: &str = "SES_PILOT_AWS_CLI";
const DEFAULT_PROGRAM: &str = "aws";

/// Drives the `aws` command line tool. One subprocess per call, no retries.
#[derive(Debug, Clone)]
pub struct AwsCli {
    program: String,
}

impl Default for AwsCli {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl AwsCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `$SES_PILOT_AWS_CLI`, or `aws` from `PATH`.
    pub fn from_env() -> Self {
        match std::env::var(AWS_CLI_ENV) {
            Ok(program) if !program.trim().is_empty() => Self::new(program),
            _ => Self::default(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let command = args.join(" ");
        tracing::debug!(program = %self.program, %command, "running aws cli");

        let output = Command::new(&self.program)
            .args(args)
            .args(["--output", "json"])
            .env("AWS_PAGER", "")
            .output()
            .map_err(|e| SesPilotError::AwsCliUnavailable(format!("{}: {}", self.program, e)))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::debug!(%command, %stderr, "aws cli failed");
            Err(SesPilotError::AwsCli { command, stderr })
        }
    }

    fn run_json<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T> {
        let stdout = self.run(args)?;
        let body = if stdout.trim().is_empty() { "{}" } else { stdout.trim() };
        Ok(serde_json::from_str(body)?)
    }

    /// Stages `payload` in a temporary file and passes it via `--cli-input-json`.
    /// The file is removed when the guard drops, whatever the outcome.
    fn run_with_payload<T: Serialize>(&self, args: &[&str], payload: &T) -> Result<String> {
        let mut staged = tempfile::Builder::new()
            .prefix("ses-pilot-")
            .suffix(".json")
            .tempfile()?;
        write_payload(&mut staged, payload)?;
        let input = format!("file://{}", staged.path().display());

        let mut full: Vec<&str> = args.to_vec();
        full.extend(["--cli-input-json", input.as_str()]);
        self.run(&full)
    }

    fn paginate<T, F>(&self, args: &[&str], mut collect: F) -> Result<()>
    where
        T: DeserializeOwned + Paged,
        F: FnMut(T),
    {
        let mut next_token: Option<String> = None;
        loop {
            let mut full: Vec<&str> = args.to_vec();
            if let Some(token) = next_token.as_deref() {
                full.extend(["--next-token", token]);
            }
            let page: T = self.run_json(&full)?;
            let token = page.next_token();
            collect(page);
            match token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => return Ok(()),
            }
        }
    }
}

fn write_payload<T: Serialize>(file: &mut NamedTempFile, payload: &T) -> Result<()> {
    serde_json::to_writer(file.as_file_mut(), payload)?;
    file.as_file_mut().flush()?;
    Ok(())
}

trait Paged {
    fn next_token(&self) -> Option<String>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TemplateMetadata {
    template_name: String,
    #[serde(default)]
    created_timestamp: Option<serde_json::Value>,
    #[serde(default)]
    last_updated_timestamp: Option<serde_json::Value>,
}

impl TemplateMetadata {
    fn descriptor(&self) -> RemoteTemplate {
        let updated = self
            .last_updated_timestamp
            .as_ref()
            .and_then(parse_timestamp)
            .or_else(|| self.created_timestamp.as_ref().and_then(parse_timestamp));
        RemoteTemplate::new(self.template_name.clone(), updated)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListEmailTemplatesPage {
    #[serde(default)]
    templates_metadata: Vec<TemplateMetadata>,
    #[serde(default)]
    next_token: Option<String>,
}

impl Paged for ListEmailTemplatesPage {
    fn next_token(&self) -> Option<String> {
        self.next_token.clone()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListVerificationTemplatesPage {
    #[serde(default)]
    custom_verification_email_templates: Vec<RemoteVerificationTemplate>,
    #[serde(default)]
    next_token: Option<String>,
}

impl Paged for ListVerificationTemplatesPage {
    fn next_token(&self) -> Option<String> {
        self.next_token.clone()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetEmailTemplateOutput {
    template_content: Option<EmailContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SendOutput {
    #[serde(default)]
    message_id: String,
}

/// The send already happened, so unparseable output only costs the message id.
fn message_id_from(stdout: &str) -> String {
    match serde_json::from_str::<SendOutput>(stdout.trim()) {
        Ok(output) => output.message_id,
        Err(e) => {
            tracing::debug!(error = %e, %stdout, "could not read send-email output");
            String::new()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListIdentitiesOutput {
    #[serde(default)]
    email_identities: Vec<IdentityInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IdentityInfo {
    identity_name: String,
}

/// The CLI prints ISO 8601 strings by default and epoch seconds when
/// `cli_timestamp_format` is `none`; both are accepted.
pub fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| Utc.from_utc_datetime(&naive))
            }),
        serde_json::Value::Number(n) => {
            let seconds = n.as_f64()?;
            let millis = (seconds * 1000.0).round() as i64;
            Utc.timestamp_millis_opt(millis).single()
        }
        _ => None,
    }
}

impl SesClient for AwsCli {
    fn caller_identity(&self) -> Result<CallerIdentity> {
        self.run_json(&["sts", "get-caller-identity"])
    }

    fn list_email_templates(&self) -> Result<Vec<RemoteTemplate>> {
        let mut templates = Vec::new();
        let listed = self.paginate(&["sesv2", "list-email-templates"], |page: ListEmailTemplatesPage| {
            templates.extend(page.templates_metadata.iter().map(TemplateMetadata::descriptor));
        });
        match listed {
            Ok(()) => Ok(templates),
            Err(e) if is_empty_listing(&e) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn list_verification_templates(&self) -> Result<Vec<RemoteVerificationTemplate>> {
        let mut templates = Vec::new();
        let listed = self.paginate(
            &["sesv2", "list-custom-verification-email-templates"],
            |page: ListVerificationTemplatesPage| {
                templates.extend(page.custom_verification_email_templates);
            },
        );
        match listed {
            Ok(()) => Ok(templates),
            Err(e) if is_empty_listing(&e) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn get_email_template(&self, name: &str) -> Result<EmailContent> {
        let output: GetEmailTemplateOutput = self
            .run_json(&["sesv2", "get-email-template", "--template-name", name])
            .map_err(|e| classify(e, name))?;
        output.template_content.ok_or_else(|| {
            SesPilotError::Api(format!("response for {} has no TemplateContent", name))
        })
    }

    fn get_verification_template(&self, name: &str) -> Result<RemoteVerificationContent> {
        self.run_json(&[
            "sesv2",
            "get-custom-verification-email-template",
            "--template-name",
            name,
        ])
        .map_err(|e| classify(e, name))
    }

    fn create_email_template(&self, payload: &EmailTemplatePayload) -> Result<()> {
        self.run_with_payload(&["sesv2", "create-email-template"], payload)?;
        Ok(())
    }

    fn update_email_template(&self, payload: &EmailTemplatePayload) -> Result<()> {
        self.run_with_payload(&["sesv2", "update-email-template"], payload)
            .map_err(|e| classify(e, &payload.template_name))?;
        Ok(())
    }

    fn delete_email_template(&self, name: &str) -> Result<()> {
        self.run(&["sesv2", "delete-email-template", "--template-name", name])
            .map_err(|e| classify(e, name))?;
        Ok(())
    }

    fn create_verification_template(&self, payload: &VerificationTemplatePayload) -> Result<()> {
        self.run_with_payload(&["sesv2", "create-custom-verification-email-template"], payload)?;
        Ok(())
    }

    fn update_verification_template(&self, payload: &VerificationTemplatePayload) -> Result<()> {
        self.run_with_payload(&["sesv2", "update-custom-verification-email-template"], payload)
            .map_err(|e| classify(e, &payload.template_name))?;
        Ok(())
    }

    fn delete_verification_template(&self, name: &str) -> Result<()> {
        self.run(&[
            "sesv2",
            "delete-custom-verification-email-template",
            "--template-name",
            name,
        ])
        .map_err(|e| classify(e, name))?;
        Ok(())
    }

    fn send_email(&self, request: &SendRequest) -> Result<String> {
        let input = match request {
            SendRequest::Simple {
                from,
                to,
                subject,
                html,
            } => serde_json::json!({
                "FromEmailAddress": from,
                "Destination": { "ToAddresses": to },
                "Content": { "Simple": {
                    "Subject": { "Data": subject, "Charset": "UTF-8" },
                    "Body": { "Html": { "Data": html, "Charset": "UTF-8" } }
                }}
            }),
            SendRequest::Templated {
                from,
                to,
                template_name,
                template_data,
            } => serde_json::json!({
                "FromEmailAddress": from,
                "Destination": { "ToAddresses": to },
                "Content": { "Template": {
                    "TemplateName": template_name,
                    "TemplateData": template_data
                }}
            }),
        };
        let stdout = self.run_with_payload(&["sesv2", "send-email"], &input)?;
        Ok(message_id_from(&stdout))
    }

    fn send_verification_email(&self, address: &str, template_name: &str) -> Result<String> {
        let output: SendOutput = self
            .run_json(&[
                "sesv2",
                "send-custom-verification-email",
                "--email-address",
                address,
                "--template-name",
                template_name,
            ])
            .map_err(|e| classify(e, template_name))?;
        Ok(output.message_id)
    }

    fn list_identities(&self) -> Result<Vec<String>> {
        let output: ListIdentitiesOutput = self.run_json(&["sesv2", "list-email-identities"])?;
        Ok(output
            .email_identities
            .into_iter()
            .map(|i| i.identity_name)
            .collect())
    }
}
