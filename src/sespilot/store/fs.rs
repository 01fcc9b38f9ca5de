use super::{leaf_name, TemplateStore};
use crate::error::{Result, SesPilotError};
use crate::manifest::{HTML_FILE, SEND_EMAIL_FILE, VERIFICATION_SUFFIX};
use crate::model::{join_relative, sort_nodes, TemplateKind, TemplateNode, VERIFICATION_DIR};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// Templates on disk under a single templates root.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn kind_root(&self, kind: TemplateKind) -> PathBuf {
        kind.root_under(&self.root)
    }

    fn dir_of(&self, kind: TemplateKind, relative_path: &str) -> PathBuf {
        let mut dir = self.kind_root(kind);
        for segment in relative_path.split('/').filter(|s| !s.is_empty()) {
            dir.push(segment);
        }
        dir
    }

    /// The manifest to read. Verification templates may also carry
    /// `<dirname>.verification.json` instead of the standard name.
    fn manifest_path(&self, kind: TemplateKind, relative_path: &str) -> PathBuf {
        let dir = self.dir_of(kind, relative_path);
        let standard = dir.join(kind.manifest_file());
        if kind == TemplateKind::Verification && !standard.is_file() {
            let alternative = dir.join(format!("{}{}", leaf_name(relative_path), VERIFICATION_SUFFIX));
            if alternative.is_file() {
                return alternative;
            }
        }
        standard
    }

    fn ensure_dir(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Recursive walk. Template directories are leaves; folders without a
    /// template below them are dropped; unreadable children are skipped.
    fn scan_dir(
        &self,
        kind: TemplateKind,
        dir: &Path,
        relative: &str,
        is_root: bool,
    ) -> Result<Vec<TemplateNode>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if is_root => return Err(SesPilotError::Io(e)),
            Err(e) => {
                tracing::debug!(path = %dir.display(), error = %e, "skipping unreadable directory");
                return Ok(Vec::new());
            }
        };

        let mut nodes = Vec::new();
        for entry in entries.flatten() {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if is_root && kind == TemplateKind::Email && name == VERIFICATION_DIR {
                continue;
            }
            let path = entry.path();
            let child_relative = join_relative(relative, &name);

            if holds_manifest(kind, &path, &name) {
                nodes.push(TemplateNode::template(name, child_relative));
            } else {
                let children = self.scan_dir(kind, &path, &child_relative, false)?;
                if !children.is_empty() {
                    nodes.push(TemplateNode::folder(name, child_relative, children));
                }
            }
        }

        sort_nodes(&mut nodes);
        Ok(nodes)
    }
}

fn holds_manifest(kind: TemplateKind, dir: &Path, name: &str) -> bool {
    dir.join(kind.manifest_file()).is_file()
        || (kind == TemplateKind::Verification
            && dir.join(format!("{}{}", name, VERIFICATION_SUFFIX)).is_file())
}

impl TemplateStore for FileStore {
    fn scan(&self, kind: TemplateKind) -> Result<Vec<TemplateNode>> {
        let root = self.kind_root(kind);
        if kind == TemplateKind::Verification && !root.exists() {
            return Ok(Vec::new());
        }
        self.scan_dir(kind, &root, "", true)
    }

    fn is_template(&self, kind: TemplateKind, relative_path: &str) -> bool {
        !relative_path.is_empty() && self.manifest_path(kind, relative_path).is_file()
    }

    fn exists(&self, kind: TemplateKind, relative_path: &str) -> bool {
        self.dir_of(kind, relative_path).exists()
    }

    fn read_manifest(&self, kind: TemplateKind, relative_path: &str) -> Result<String> {
        let path = self.manifest_path(kind, relative_path);
        if !path.is_file() {
            return Err(SesPilotError::TemplateNotFound(relative_path.to_string()));
        }
        Ok(fs::read_to_string(path)?)
    }

    fn manifest_modified(&self, kind: TemplateKind, relative_path: &str) -> Option<DateTime<Utc>> {
        let path = self.manifest_path(kind, relative_path);
        let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
        Some(DateTime::<Utc>::from(modified))
    }

    fn read_html(&self, kind: TemplateKind, relative_path: &str) -> Result<String> {
        let path = self.dir_of(kind, relative_path).join(HTML_FILE);
        if !path.exists() {
            return Ok(String::new());
        }
        Ok(fs::read_to_string(path)?)
    }

    fn write_template(
        &mut self,
        kind: TemplateKind,
        relative_path: &str,
        manifest: &str,
        html: Option<&str>,
    ) -> Result<()> {
        let dir = self.dir_of(kind, relative_path);
        self.ensure_dir(&dir)?;
        if let Some(html) = html {
            fs::write(dir.join(HTML_FILE), html)?;
        }
        fs::write(self.manifest_path(kind, relative_path), manifest)?;
        Ok(())
    }

    fn read_send_payload(&self, kind: TemplateKind, relative_path: &str) -> Result<Option<String>> {
        let path = self.dir_of(kind, relative_path).join(SEND_EMAIL_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn write_send_payload(&mut self, kind: TemplateKind, relative_path: &str, raw: &str) -> Result<()> {
        let dir = self.dir_of(kind, relative_path);
        self.ensure_dir(&dir)?;
        fs::write(dir.join(SEND_EMAIL_FILE), raw)?;
        Ok(())
    }

    fn create_folder(&mut self, kind: TemplateKind, relative_path: &str) -> Result<()> {
        let dir = self.dir_of(kind, relative_path);
        if dir.exists() {
            return Err(SesPilotError::AlreadyExists(relative_path.to_string()));
        }
        fs::create_dir_all(dir)?;
        Ok(())
    }

    fn remove(&mut self, kind: TemplateKind, relative_path: &str) -> Result<()> {
        let dir = self.dir_of(kind, relative_path);
        if relative_path.is_empty() || !dir.exists() {
            return Err(SesPilotError::TemplateNotFound(relative_path.to_string()));
        }
        fs::remove_dir_all(dir)?;
        Ok(())
    }

    fn rename(&mut self, kind: TemplateKind, from: &str, to: &str) -> Result<()> {
        let source = self.dir_of(kind, from);
        let target = self.dir_of(kind, to);
        if from.is_empty() || !source.exists() {
            return Err(SesPilotError::TemplateNotFound(from.to_string()));
        }
        if target.exists() {
            return Err(SesPilotError::AlreadyExists(to.to_string()));
        }
        if let Some(parent) = target.parent() {
            self.ensure_dir(parent)?;
        }
        fs::rename(source, target)?;
        Ok(())
    }

    fn html_path(&self, kind: TemplateKind, relative_path: &str) -> Result<PathBuf> {
        if !self.is_template(kind, relative_path) {
            return Err(SesPilotError::TemplateNotFound(relative_path.to_string()));
        }
        Ok(self.dir_of(kind, relative_path).join(HTML_FILE))
    }
}
