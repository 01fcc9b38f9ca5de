use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::{RemoteTemplate, SyncStatus, TemplateKind};
use crate::remote::SesClient;
use crate::store::TemplateStore;
use crate::sync::{compare, SyncReport};

/// Remote descriptors for one kind.
pub fn remote_descriptors<C: SesClient>(client: &C, kind: TemplateKind) -> Result<Vec<RemoteTemplate>> {
    match kind {
        TemplateKind::Email => client.list_email_templates(),
        TemplateKind::Verification => Ok(client
            .list_verification_templates()?
            .iter()
            .map(|t| t.descriptor())
            .collect()),
    }
}

pub fn report<S: TemplateStore, C: SesClient>(
    store: &S,
    client: &C,
    kind: TemplateKind,
) -> Result<SyncReport> {
    let tree = store.scan(kind)?;
    let remote = remote_descriptors(client, kind)?;
    tracing::debug!(?kind, remote = remote.len(), "comparing against remote listing");
    Ok(compare(store, kind, &tree, &remote))
}

pub fn run<S: TemplateStore, C: SesClient>(
    store: &S,
    client: &C,
    kinds: &[TemplateKind],
) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    let mut reports = Vec::new();

    for kind in kinds {
        let report = report(store, client, *kind)?;
        result.add_message(CmdMessage::info(format!(
            "{}s: {} synced, {} modified, {} new, {} unknown, {} only on SES",
            kind,
            report.count(SyncStatus::Synced),
            report.count(SyncStatus::Modified),
            report.count(SyncStatus::NewLocal),
            report.count(SyncStatus::Unknown),
            report.remote_only.len()
        )));
        reports.push(report);
    }

    Ok(result.with_sync_reports(reports))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fake::FakeSes;
    use crate::store::memory::fixtures::StoreFixture;
    use chrono::{Duration, Utc};

    #[test]
    fn reports_both_kinds() {
        let now = Utc::now();
        let store = StoreFixture::new()
            .with_email("welcome", "Welcome", now)
            .with_email("promo", "Promo", now)
            .with_verification("confirm", "Confirm")
            .store;
        let client = FakeSes::new()
            .with_email("Welcome", "Hi", "<p>x</p>", Some(now + Duration::milliseconds(300)))
            .with_email("Legacy", "Old", "<p>y</p>", Some(now))
            .with_verification("Confirm", "Confirm", "<p>c</p>")
            .with_verification("Orphan", "Orphan", "<p>o</p>");

        let result = run(&store, &client, &[TemplateKind::Email, TemplateKind::Verification]).unwrap();
        assert_eq!(result.sync_reports.len(), 2);

        let email = &result.sync_reports[0];
        assert_eq!(email.count(SyncStatus::Synced), 1);
        assert_eq!(email.count(SyncStatus::NewLocal), 1);
        assert_eq!(email.remote_only[0].template_name, "Legacy");

        let verification = &result.sync_reports[1];
        assert_eq!(verification.count(SyncStatus::Synced), 1);
        assert_eq!(verification.remote_only[0].template_name, "Orphan");
        assert_eq!(verification.remote_only[0].last_updated_timestamp, None);
    }

    #[test]
    fn listing_failure_is_an_error() {
        let store = StoreFixture::new().with_email("welcome", "Welcome", Utc::now()).store;
        let client = FakeSes::new().fail("list-email-templates");
        assert!(run(&store, &client, &[TemplateKind::Email]).is_err());
    }
}
