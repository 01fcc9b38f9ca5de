//! Local/remote comparison.
//!
//! Given a scanned tree and a remote listing of the same kind, every template
//! leaf is annotated with a [`SyncStatus`] and the remote entries no local
//! manifest claims are returned as the remote-only set.
//!
//! Each remote entry can be claimed once. When two local templates name the same
//! remote template, the first one visited (depth-first, in tree order) gets the
//! comparison and the second one reads as new.

use crate::manifest::template_name_from_str;
use crate::model::{RemoteTemplate, SyncStatus, SyncedNode, TemplateKind, TemplateNode};
use crate::store::TemplateStore;
use serde::Serialize;
use std::collections::HashMap;

/// Local and remote timestamps closer than this count as the same revision.
pub const SYNC_TOLERANCE_MS: i64 = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub kind: TemplateKind,
    pub tree: Vec<SyncedNode>,
    pub remote_only: Vec<RemoteTemplate>,
}

impl SyncReport {
    pub fn count(&self, status: SyncStatus) -> usize {
        SyncedNode::templates(&self.tree)
            .iter()
            .filter(|n| n.sync_status == Some(status))
            .count()
    }
}

/// Reads the remote name out of a template's manifest; any failure is `None`.
pub fn local_template_name<S: TemplateStore>(
    store: &S,
    kind: TemplateKind,
    relative_path: &str,
) -> Option<String> {
    store
        .read_manifest(kind, relative_path)
        .ok()
        .and_then(|raw| template_name_from_str(&raw))
}

pub fn compare<S: TemplateStore>(
    store: &S,
    kind: TemplateKind,
    tree: &[TemplateNode],
    remote: &[RemoteTemplate],
) -> SyncReport {
    // Later duplicates overwrite earlier ones.
    let mut remaining: HashMap<&str, usize> = HashMap::new();
    for (index, descriptor) in remote.iter().enumerate() {
        remaining.insert(descriptor.template_name.as_str(), index);
    }

    let annotated = annotate(store, kind, tree, remote, &mut remaining);

    let mut leftover: Vec<usize> = remaining.into_values().collect();
    leftover.sort_unstable();
    let remote_only = leftover.into_iter().map(|i| remote[i].clone()).collect();

    SyncReport {
        kind,
        tree: annotated,
        remote_only,
    }
}

fn annotate<S: TemplateStore>(
    store: &S,
    kind: TemplateKind,
    nodes: &[TemplateNode],
    remote: &[RemoteTemplate],
    remaining: &mut HashMap<&str, usize>,
) -> Vec<SyncedNode> {
    nodes
        .iter()
        .map(|node| match &node.children {
            Some(children) if !node.is_template() => SyncedNode {
                name: node.name.clone(),
                relative_path: node.relative_path.clone(),
                kind: node.kind,
                template_name: None,
                sync_status: None,
                children: Some(annotate(store, kind, children, remote, remaining)),
            },
            _ => {
                let template_name = local_template_name(store, kind, &node.relative_path);
                let status = match template_name.as_deref() {
                    None => SyncStatus::Unknown,
                    Some(name) => match remaining.remove(name) {
                        None => SyncStatus::NewLocal,
                        Some(index) => status_against(store, kind, &node.relative_path, &remote[index]),
                    },
                };
                SyncedNode {
                    name: node.name.clone(),
                    relative_path: node.relative_path.clone(),
                    kind: node.kind,
                    template_name,
                    sync_status: Some(status),
                    children: None,
                }
            }
        })
        .collect()
}

fn status_against<S: TemplateStore>(
    store: &S,
    kind: TemplateKind,
    relative_path: &str,
    descriptor: &RemoteTemplate,
) -> SyncStatus {
    let Some(remote_ts) = descriptor.last_updated_timestamp else {
        return SyncStatus::Synced;
    };
    match store.manifest_modified(kind, relative_path) {
        Some(local_ts) if (local_ts - remote_ts).num_milliseconds().abs() < SYNC_TOLERANCE_MS => {
            SyncStatus::Synced
        }
        _ => SyncStatus::Modified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::fixtures::StoreFixture;
    use chrono::{DateTime, Duration, Utc};

    fn base() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn run(store: &crate::store::memory::InMemoryStore, kind: TemplateKind, remote: &[RemoteTemplate]) -> SyncReport {
        let tree = store.scan(kind).unwrap();
        compare(store, kind, &tree, remote)
    }

    #[test]
    fn close_timestamps_are_synced() {
        let store = StoreFixture::new()
            .with_email("welcome", "Welcome", base() + Duration::milliseconds(500))
            .store;
        let report = run(&store, TemplateKind::Email, &[RemoteTemplate::new("Welcome", Some(base()))]);
        assert_eq!(report.tree[0].sync_status, Some(SyncStatus::Synced));
        assert!(report.remote_only.is_empty());
    }

    #[test]
    fn distant_timestamps_are_modified() {
        let store = StoreFixture::new()
            .with_email("welcome", "Welcome", base() + Duration::milliseconds(4500))
            .store;
        let report = run(&store, TemplateKind::Email, &[RemoteTemplate::new("Welcome", Some(base()))]);
        assert_eq!(report.tree[0].sync_status, Some(SyncStatus::Modified));
    }

    #[test]
    fn tolerance_boundary_is_modified() {
        let store = StoreFixture::new()
            .with_email("welcome", "Welcome", base() - Duration::milliseconds(2000))
            .store;
        let report = run(&store, TemplateKind::Email, &[RemoteTemplate::new("Welcome", Some(base()))]);
        assert_eq!(report.tree[0].sync_status, Some(SyncStatus::Modified));
    }

    #[test]
    fn unmatched_local_is_new() {
        let store = StoreFixture::new().with_email("promo", "Promo", base()).store;
        let report = run(&store, TemplateKind::Email, &[]);
        assert_eq!(report.tree[0].sync_status, Some(SyncStatus::NewLocal));
        assert_eq!(report.tree[0].template_name.as_deref(), Some("Promo"));
    }

    #[test]
    fn unreadable_manifest_is_unknown() {
        let store = StoreFixture::new()
            .with_raw_manifest(TemplateKind::Email, "broken", "{ not json")
            .with_raw_manifest(TemplateKind::Email, "nameless", r#"{"Template":{"SubjectPart":"x"}}"#)
            .store;
        let report = run(&store, TemplateKind::Email, &[RemoteTemplate::new("Broken", Some(base()))]);
        assert!(report
            .tree
            .iter()
            .all(|n| n.sync_status == Some(SyncStatus::Unknown)));
        assert_eq!(report.remote_only.len(), 1);
    }

    #[test]
    fn unclaimed_remote_entries_are_remote_only() {
        let store = StoreFixture::new().with_email("welcome", "Welcome", base()).store;
        let remote = vec![
            RemoteTemplate::new("Orphan", Some(base())),
            RemoteTemplate::new("Welcome", Some(base())),
            RemoteTemplate::new("Another", None),
        ];
        let report = run(&store, TemplateKind::Email, &remote);
        let names: Vec<_> = report.remote_only.iter().map(|r| r.template_name.as_str()).collect();
        assert_eq!(names, vec!["Orphan", "Another"]);
    }

    #[test]
    fn remote_entry_is_claimed_once() {
        let store = StoreFixture::new()
            .with_email("a-first", "Shared", base())
            .with_email("b-second", "Shared", base())
            .store;
        let report = run(&store, TemplateKind::Email, &[RemoteTemplate::new("Shared", Some(base()))]);
        assert_eq!(report.tree[0].sync_status, Some(SyncStatus::Synced));
        assert_eq!(report.tree[1].sync_status, Some(SyncStatus::NewLocal));
        assert!(report.remote_only.is_empty());
    }

    #[test]
    fn later_duplicate_remote_entry_wins() {
        let store = StoreFixture::new().with_email("welcome", "Welcome", base()).store;
        let remote = vec![
            RemoteTemplate::new("Welcome", Some(base() - Duration::hours(3))),
            RemoteTemplate::new("Welcome", Some(base())),
        ];
        let report = run(&store, TemplateKind::Email, &remote);
        assert_eq!(report.tree[0].sync_status, Some(SyncStatus::Synced));
        assert!(report.remote_only.is_empty());
    }

    #[test]
    fn untimestamped_remote_is_synced() {
        let store = StoreFixture::new().with_verification("confirm", "Confirm").store;
        let report = run(&store, TemplateKind::Verification, &[RemoteTemplate::new("Confirm", None)]);
        assert_eq!(report.tree[0].sync_status, Some(SyncStatus::Synced));
    }

    #[test]
    fn missing_local_mtime_is_modified() {
        let mut store = StoreFixture::new().with_email("welcome", "Welcome", base()).store;
        store.set_modified(TemplateKind::Email, "welcome", None);
        let report = run(&store, TemplateKind::Email, &[RemoteTemplate::new("Welcome", Some(base()))]);
        assert_eq!(report.tree[0].sync_status, Some(SyncStatus::Modified));
        assert!(report.remote_only.is_empty());
    }

    #[test]
    fn folders_carry_no_status() {
        let store = StoreFixture::new()
            .with_email("marketing/promo", "Promo", base())
            .store;
        let report = run(&store, TemplateKind::Email, &[RemoteTemplate::new("Promo", Some(base()))]);
        let folder = &report.tree[0];
        assert_eq!(folder.sync_status, None);
        let child = &folder.children.as_ref().unwrap()[0];
        assert_eq!(child.sync_status, Some(SyncStatus::Synced));
        assert_eq!(report.count(SyncStatus::Synced), 1);
    }
}
