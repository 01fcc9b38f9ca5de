use super::TemplateStore;
use crate::error::{Result, SesPilotError};
use crate::model::{join_relative, sort_nodes, TemplateKind, TemplateNode};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
struct MemTemplate {
    manifest: String,
    html: String,
    send_payload: Option<String>,
    modified: Option<DateTime<Utc>>,
}

type Key = (TemplateKind, String);

/// Template storage without a filesystem. Modification times are explicit so
/// sync tests can pin them.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    templates: BTreeMap<Key, MemTemplate>,
    folders: BTreeSet<Key>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the manifest mtime; `None` makes it unobservable.
    pub fn set_modified(
        &mut self,
        kind: TemplateKind,
        relative_path: &str,
        modified: Option<DateTime<Utc>>,
    ) {
        if let Some(template) = self.templates.get_mut(&(kind, relative_path.to_string())) {
            template.modified = modified;
        }
    }

    fn under(path: &str, prefix: &str) -> bool {
        path == prefix || path.starts_with(&format!("{}/", prefix))
    }

    fn has_template_ancestor(&self, kind: TemplateKind, relative_path: &str) -> bool {
        let mut current = relative_path;
        while let Some(i) = current.rfind('/') {
            current = &current[..i];
            if self.templates.contains_key(&(kind, current.to_string())) {
                return true;
            }
        }
        false
    }

    fn build(&self, kind: TemplateKind, prefix: &str) -> Vec<TemplateNode> {
        let mut child_names = BTreeSet::new();
        for (k, path) in self.templates.keys() {
            if *k != kind {
                continue;
            }
            let rest = if prefix.is_empty() {
                Some(path.as_str())
            } else {
                path.strip_prefix(prefix).and_then(|r| r.strip_prefix('/'))
            };
            if let Some(first) = rest.and_then(|r| r.split('/').next()) {
                child_names.insert(first.to_string());
            }
        }

        let mut nodes = Vec::new();
        for name in child_names {
            let relative = join_relative(prefix, &name);
            if self.templates.contains_key(&(kind, relative.clone())) {
                nodes.push(TemplateNode::template(name, relative));
            } else {
                let children = self.build(kind, &relative);
                if !children.is_empty() {
                    nodes.push(TemplateNode::folder(name, relative, children));
                }
            }
        }
        sort_nodes(&mut nodes);
        nodes
    }
}

impl TemplateStore for InMemoryStore {
    fn scan(&self, kind: TemplateKind) -> Result<Vec<TemplateNode>> {
        Ok(self.build(kind, ""))
    }

    fn is_template(&self, kind: TemplateKind, relative_path: &str) -> bool {
        self.templates.contains_key(&(kind, relative_path.to_string()))
            && !self.has_template_ancestor(kind, relative_path)
    }

    fn exists(&self, kind: TemplateKind, relative_path: &str) -> bool {
        if relative_path.is_empty() {
            return true;
        }
        self.templates
            .keys()
            .chain(self.folders.iter())
            .any(|(k, path)| *k == kind && Self::under(path, relative_path))
    }

    fn read_manifest(&self, kind: TemplateKind, relative_path: &str) -> Result<String> {
        self.templates
            .get(&(kind, relative_path.to_string()))
            .map(|t| t.manifest.clone())
            .ok_or_else(|| SesPilotError::TemplateNotFound(relative_path.to_string()))
    }

    fn manifest_modified(&self, kind: TemplateKind, relative_path: &str) -> Option<DateTime<Utc>> {
        self.templates
            .get(&(kind, relative_path.to_string()))
            .and_then(|t| t.modified)
    }

    fn read_html(&self, kind: TemplateKind, relative_path: &str) -> Result<String> {
        self.templates
            .get(&(kind, relative_path.to_string()))
            .map(|t| t.html.clone())
            .ok_or_else(|| SesPilotError::TemplateNotFound(relative_path.to_string()))
    }

    fn write_template(
        &mut self,
        kind: TemplateKind,
        relative_path: &str,
        manifest: &str,
        html: Option<&str>,
    ) -> Result<()> {
        let entry = self
            .templates
            .entry((kind, relative_path.to_string()))
            .or_default();
        entry.manifest = manifest.to_string();
        if let Some(html) = html {
            entry.html = html.to_string();
        }
        entry.modified = Some(Utc::now());
        Ok(())
    }

    fn read_send_payload(&self, kind: TemplateKind, relative_path: &str) -> Result<Option<String>> {
        Ok(self
            .templates
            .get(&(kind, relative_path.to_string()))
            .and_then(|t| t.send_payload.clone()))
    }

    fn write_send_payload(&mut self, kind: TemplateKind, relative_path: &str, raw: &str) -> Result<()> {
        let template = self
            .templates
            .get_mut(&(kind, relative_path.to_string()))
            .ok_or_else(|| SesPilotError::TemplateNotFound(relative_path.to_string()))?;
        template.send_payload = Some(raw.to_string());
        Ok(())
    }

    fn create_folder(&mut self, kind: TemplateKind, relative_path: &str) -> Result<()> {
        if self.exists(kind, relative_path) {
            return Err(SesPilotError::AlreadyExists(relative_path.to_string()));
        }
        self.folders.insert((kind, relative_path.to_string()));
        Ok(())
    }

    fn remove(&mut self, kind: TemplateKind, relative_path: &str) -> Result<()> {
        if relative_path.is_empty() || !self.exists(kind, relative_path) {
            return Err(SesPilotError::TemplateNotFound(relative_path.to_string()));
        }
        self.templates
            .retain(|(k, path), _| !(*k == kind && Self::under(path, relative_path)));
        self.folders
            .retain(|(k, path)| !(*k == kind && Self::under(path, relative_path)));
        Ok(())
    }

    fn rename(&mut self, kind: TemplateKind, from: &str, to: &str) -> Result<()> {
        if from.is_empty() || !self.exists(kind, from) {
            return Err(SesPilotError::TemplateNotFound(from.to_string()));
        }
        if self.exists(kind, to) {
            return Err(SesPilotError::AlreadyExists(to.to_string()));
        }
        let relocate = |path: &str| format!("{}{}", to, &path[from.len()..]);

        let moved: Vec<Key> = self
            .templates
            .keys()
            .filter(|(k, path)| *k == kind && Self::under(path, from))
            .cloned()
            .collect();
        for key in moved {
            if let Some(template) = self.templates.remove(&key) {
                self.templates.insert((kind, relocate(&key.1)), template);
            }
        }

        let moved_folders: Vec<Key> = self
            .folders
            .iter()
            .filter(|(k, path)| *k == kind && Self::under(path, from))
            .cloned()
            .collect();
        for key in moved_folders {
            self.folders.remove(&key);
            self.folders.insert((kind, relocate(&key.1)));
        }
        Ok(())
    }

    fn html_path(&self, kind: TemplateKind, relative_path: &str) -> Result<PathBuf> {
        if !self.is_template(kind, relative_path) {
            return Err(SesPilotError::TemplateNotFound(relative_path.to_string()));
        }
        Ok(PathBuf::from(format!(
            "memory/{:?}/{}/template.html",
            kind, relative_path
        )))
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;
    use crate::manifest::Manifest;

    pub struct StoreFixture {
        pub store: InMemoryStore,
    }

    impl Default for StoreFixture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl StoreFixture {
        pub fn new() -> Self {
            Self {
                store: InMemoryStore::new(),
            }
        }

        /// An email template at `path` whose manifest names `template_name`.
        pub fn with_email(self, path: &str, template_name: &str, modified: DateTime<Utc>) -> Self {
            self.with_named(TemplateKind::Email, path, template_name, Some(modified))
        }

        pub fn with_verification(self, path: &str, template_name: &str) -> Self {
            self.with_named(TemplateKind::Verification, path, template_name, None)
        }

        pub fn with_named(
            mut self,
            kind: TemplateKind,
            path: &str,
            template_name: &str,
            modified: Option<DateTime<Utc>>,
        ) -> Self {
            let mut manifest = Manifest::boilerplate(kind, crate::store::leaf_name(path), "Subject");
            manifest.set_template_name(template_name);
            let raw = manifest.to_json_pretty().unwrap();
            self.store
                .write_template(kind, path, &raw, Some("<p>Hello {{name}}</p>"))
                .unwrap();
            self.store.set_modified(kind, path, modified);
            self
        }

        /// A template directory whose manifest text is stored verbatim.
        pub fn with_raw_manifest(mut self, kind: TemplateKind, path: &str, raw: &str) -> Self {
            self.store.write_template(kind, path, raw, Some("")).unwrap();
            self
        }
    }
}
