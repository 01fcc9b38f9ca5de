//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer. Both front-ends,
//! the terminal CLI and the `serve` JSON routes, go through it.
//!
//! ## Role and Responsibilities
//!
//! The API facade:
//! - **Dispatches** to the appropriate command function
//! - **Owns the session**: the resolved config, the template store and the SES client
//! - **Returns structured types** (`Result<CmdResult>`)
//!
//! It does no printing, no HTTP and no business logic of its own.
//!
//! ## Generic Over Store and Client
//!
//! `PilotApi<S: TemplateStore, C: SesClient>`:
//! - Production: `PilotApi<FileStore, AwsCli>`
//! - Testing: `PilotApi<InMemoryStore, FakeSes>`
//!
//! ## Testing Strategy
//!
//! API tests check that calls reach the right command with the right kind and
//! path. Command behavior is tested in the command modules.

use crate::commands;
use crate::config::ResolvedConfig;
use crate::error::Result;
use crate::model::TemplateKind;
use crate::remote::SesClient;
use crate::store::TemplateStore;
use std::path::PathBuf;

/// The main API facade for ses-pilot operations.
pub struct PilotApi<S: TemplateStore, C: SesClient> {
    store: S,
    client: C,
    config: ResolvedConfig,
}

impl<S: TemplateStore, C: SesClient> PilotApi<S, C> {
    pub fn new(store: S, client: C, config: ResolvedConfig) -> Self {
        Self {
            store,
            client,
            config,
        }
    }

    pub fn list_templates(&self) -> Result<CmdResult> {
        commands::list::run(&self.store)
    }

    pub fn template_counts(&self) -> Result<crate::model::TemplateCounts> {
        commands::list::counts(&self.store)
    }

    pub fn sync_status(&self, kinds: &[TemplateKind]) -> Result<CmdResult> {
        commands::status::run(&self.store, &self.client, kinds)
    }

    pub fn show_template(&self, kind: TemplateKind, path: &str) -> Result<CmdResult> {
        commands::show::run(&self.store, kind, path)
    }

    pub fn create_template(&mut self, kind: TemplateKind, new: NewTemplate) -> Result<CmdResult> {
        commands::create::run(&mut self.store, kind, new)
    }

    pub fn update_template(
        &mut self,
        kind: TemplateKind,
        path: &str,
        update: TemplateUpdate,
    ) -> Result<CmdResult> {
        commands::update::run(&mut self.store, kind, path, update)
    }

    pub fn delete_template(&mut self, kind: TemplateKind, path: &str, remote: bool) -> Result<CmdResult> {
        commands::delete::run(&mut self.store, &self.client, kind, path, remote)
    }

    pub fn create_folder(&mut self, kind: TemplateKind, parent: &str, name: &str) -> Result<CmdResult> {
        commands::folders::create(&mut self.store, kind, parent, name)
    }

    pub fn rename(&mut self, kind: TemplateKind, path: &str, new_name: &str) -> Result<CmdResult> {
        commands::folders::rename(&mut self.store, kind, path, new_name)
    }

    pub fn move_template(&mut self, kind: TemplateKind, path: &str, destination: &str) -> Result<CmdResult> {
        commands::folders::move_template(&mut self.store, kind, path, destination)
    }

    pub fn transform_html(
        &mut self,
        kind: TemplateKind,
        path: &str,
        transform: HtmlTransform,
    ) -> Result<CmdResult> {
        commands::html::run(&mut self.store, kind, path, transform)
    }

    /// Where `template.html` lives, for handing to an editor.
    pub fn html_path(&self, kind: TemplateKind, path: &str) -> Result<PathBuf> {
        let path = crate::store::require_relative(path)?;
        self.store.html_path(kind, &path)
    }

    pub fn deploy(&self, kind: TemplateKind, path: &str) -> Result<CmdResult> {
        commands::deploy::run(&self.store, &self.client, kind, path)
    }

    pub fn pull<N: AsRef<str>>(&mut self, names: &[N]) -> Result<CmdResult> {
        let names: Vec<String> = names.iter().map(|n| n.as_ref().trim().to_string()).collect();
        commands::pull::run(&mut self.store, &self.client, &names)
    }

    pub fn pull_all(&mut self) -> Result<CmdResult> {
        commands::pull::run_all(&mut self.store, &self.client)
    }

    pub fn send_test(&self, kind: TemplateKind, path: &str, options: SendOptions) -> Result<CmdResult> {
        commands::send::run(&self.store, &self.client, kind, path, options)
    }

    pub fn permissions(&self) -> Result<CmdResult> {
        commands::permissions::run(&self.client)
    }

    pub fn config(&self, action: ConfigAction) -> Result<CmdResult> {
        commands::config::run(&self.config, action)
    }

    pub fn resolved_config(&self) -> &ResolvedConfig {
        &self.config
    }
}

/// Creates a config file. Runs before any session exists.
pub fn init(target: &InitTarget) -> Result<CmdResult> {
    commands::init::run(target)
}

pub use crate::commands::config::ConfigAction;
pub use crate::commands::create::NewTemplate;
pub use crate::commands::html::HtmlTransform;
pub use crate::commands::init::InitTarget;
pub use crate::commands::send::SendOptions;
pub use crate::commands::update::TemplateUpdate;
pub use commands::{CmdMessage, CmdResult, MessageLevel, TemplateRef};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PilotConfig;
    use crate::remote::fake::FakeSes;
    use crate::store::memory::fixtures::StoreFixture;
    use crate::store::memory::InMemoryStore;
    use chrono::Utc;

    fn api(store: InMemoryStore, client: FakeSes) -> PilotApi<InMemoryStore, FakeSes> {
        let config = ResolvedConfig::from_parts(
            PathBuf::from("/tmp/project/ses-pilot.config.json"),
            PilotConfig::default(),
        );
        PilotApi::new(store, client, config)
    }

    #[test]
    fn create_then_list_goes_through_the_store() {
        let mut api = api(InMemoryStore::new(), FakeSes::new());
        api.create_template(TemplateKind::Email, NewTemplate::new("welcome", "Hi"))
            .unwrap();
        api.create_template(TemplateKind::Verification, NewTemplate::new("confirm", "Confirm"))
            .unwrap();

        let counts = api.template_counts().unwrap();
        assert_eq!((counts.email_templates, counts.verification_templates), (1, 1));
    }

    #[test]
    fn deploy_and_status_use_the_client() {
        let store = StoreFixture::new().with_email("welcome", "Welcome", Utc::now()).store;
        let api = api(store, FakeSes::new());

        api.deploy(TemplateKind::Email, "welcome").unwrap();
        let result = api.sync_status(&[TemplateKind::Email]).unwrap();
        assert_eq!(result.sync_reports.len(), 1);
        assert!(result.sync_reports[0].remote_only.is_empty());
    }

    #[test]
    fn pull_trims_names() {
        let client = FakeSes::new().with_email("Welcome", "Hi", "<p/>", None);
        let mut api = api(InMemoryStore::new(), client);
        let result = api.pull(&[" Welcome "]).unwrap();
        assert_eq!(result.affected[0].relative_path, "Welcome");
    }

    #[test]
    fn html_path_rejects_escapes() {
        let api = api(InMemoryStore::new(), FakeSes::new());
        assert!(api.html_path(TemplateKind::Email, "../x").is_err());
    }

    #[test]
    fn exposes_resolved_config() {
        let api = api(InMemoryStore::new(), FakeSes::new());
        assert_eq!(
            api.resolved_config().templates_root,
            PathBuf::from("/tmp/project/ses-templates")
        );
    }
}
