use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

/// Directory under the templates root that holds verification templates.
pub const VERIFICATION_DIR: &str = "_verification";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Email,
    Verification,
}

impl TemplateKind {
    /// The file whose presence turns a directory into a template of this kind.
    pub fn manifest_file(self) -> &'static str {
        match self {
            TemplateKind::Email => "template.json",
            TemplateKind::Verification => "verification-template.json",
        }
    }

    /// Where trees of this kind are rooted, given the configured templates root.
    pub fn root_under(self, templates_root: &Path) -> PathBuf {
        match self {
            TemplateKind::Email => templates_root.to_path_buf(),
            TemplateKind::Verification => templates_root.join(VERIFICATION_DIR),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TemplateKind::Email => "email template",
            TemplateKind::Verification => "verification template",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    Template,
}

/// One entry of a scanned template tree.
///
/// `relative_path` is `/`-separated and relative to the kind's root; it is the
/// identity used by every other operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateNode {
    pub name: String,
    pub relative_path: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TemplateNode>>,
}

impl TemplateNode {
    pub fn template(name: impl Into<String>, relative_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relative_path: relative_path.into(),
            kind: NodeKind::Template,
            children: None,
        }
    }

    pub fn folder(
        name: impl Into<String>,
        relative_path: impl Into<String>,
        children: Vec<TemplateNode>,
    ) -> Self {
        Self {
            name: name.into(),
            relative_path: relative_path.into(),
            kind: NodeKind::Folder,
            children: Some(children),
        }
    }

    pub fn is_template(&self) -> bool {
        self.kind == NodeKind::Template
    }
}

/// Folders first, then templates; ascending by name within each group.
pub fn sort_nodes(nodes: &mut [TemplateNode]) {
    nodes.sort_by(|a, b| match (a.kind, b.kind) {
        (NodeKind::Folder, NodeKind::Template) => Ordering::Less,
        (NodeKind::Template, NodeKind::Folder) => Ordering::Greater,
        _ => a.name.cmp(&b.name),
    });
}

pub fn count_templates(nodes: &[TemplateNode]) -> usize {
    nodes
        .iter()
        .map(|node| match &node.children {
            Some(children) if !node.is_template() => count_templates(children),
            _ if node.is_template() => 1,
            _ => 0,
        })
        .sum()
}

/// Joins a parent relative path and a child name with `/`.
pub fn join_relative(parent: &str, name: &str) -> String {
    let parent = parent.trim_matches('/');
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    Modified,
    NewLocal,
    Unknown,
}

impl SyncStatus {
    pub fn label(self) -> &'static str {
        match self {
            SyncStatus::Synced => "synced",
            SyncStatus::Modified => "modified",
            SyncStatus::NewLocal => "new",
            SyncStatus::Unknown => "unknown",
        }
    }
}

/// A scanned node annotated with its synchronization status.
/// Folders never carry a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedNode {
    pub name: String,
    pub relative_path: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_status: Option<SyncStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<SyncedNode>>,
}

impl SyncedNode {
    /// Depth-first iterator over the template leaves.
    pub fn templates(nodes: &[SyncedNode]) -> Vec<&SyncedNode> {
        let mut out = Vec::new();
        for node in nodes {
            match &node.children {
                Some(children) => out.extend(Self::templates(children)),
                None => out.push(node),
            }
        }
        out
    }
}

/// What the email-sending service reports about one template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTemplate {
    pub template_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_timestamp: Option<DateTime<Utc>>,
}

impl RemoteTemplate {
    pub fn new(name: impl Into<String>, last_updated: Option<DateTime<Utc>>) -> Self {
        Self {
            template_name: name.into(),
            last_updated_timestamp: last_updated,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateCounts {
    pub email_templates: usize,
    pub verification_templates: usize,
    pub total: usize,
}

impl TemplateCounts {
    pub fn new(email: usize, verification: usize) -> Self {
        Self {
            email_templates: email,
            verification_templates: verification,
            total: email + verification,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folders_sort_before_templates() {
        let mut nodes = vec![
            TemplateNode::template("alpha", "alpha"),
            TemplateNode::folder("zeta", "zeta", vec![TemplateNode::template("x", "zeta/x")]),
            TemplateNode::template("beta", "beta"),
            TemplateNode::folder("marketing", "marketing", vec![]),
        ];
        sort_nodes(&mut nodes);
        let names: Vec<_> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["marketing", "zeta", "alpha", "beta"]);
    }

    #[test]
    fn counts_nested_templates() {
        let nodes = vec![
            TemplateNode::folder(
                "a",
                "a",
                vec![
                    TemplateNode::template("one", "a/one"),
                    TemplateNode::folder("b", "a/b", vec![TemplateNode::template("two", "a/b/two")]),
                ],
            ),
            TemplateNode::template("three", "three"),
        ];
        assert_eq!(count_templates(&nodes), 3);
    }

    #[test]
    fn joins_relative_paths() {
        assert_eq!(join_relative("", "welcome"), "welcome");
        assert_eq!(join_relative("marketing/", "welcome"), "marketing/welcome");
    }

    #[test]
    fn sync_status_serializes_snake_case() {
        let json = serde_json::to_string(&SyncStatus::NewLocal).unwrap();
        assert_eq!(json, "\"new_local\"");
    }

    #[test]
    fn verification_root_is_nested() {
        let root = Path::new("/tmp/templates");
        assert_eq!(
            TemplateKind::Verification.root_under(root),
            PathBuf::from("/tmp/templates/_verification")
        );
        assert_eq!(TemplateKind::Email.root_under(root), root.to_path_buf());
    }
}
