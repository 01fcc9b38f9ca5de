use crate::commands::{require_template, CmdMessage, CmdResult, TemplateRef};
use crate::error::{Result, SesPilotError};
use crate::model::{join_relative, TemplateKind};
use crate::store::{leaf_name, normalize_relative, parent_of, require_relative, TemplateStore};
use once_cell::sync::Lazy;
use regex::Regex;

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Folder and template directory names: letters, digits, `-` and `_`.
pub fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if !NAME_RE.is_match(name) {
        return Err(SesPilotError::InvalidInput(format!(
            "'{}' is not a valid name (use letters, digits, '-' and '_')",
            name
        )));
    }
    Ok(name.to_string())
}

pub fn create<S: TemplateStore>(
    store: &mut S,
    kind: TemplateKind,
    parent: &str,
    name: &str,
) -> Result<CmdResult> {
    let name = validate_name(name)?;
    let parent = normalize_relative(parent)?;
    if !store.exists(kind, &parent) {
        return Err(SesPilotError::TemplateNotFound(parent));
    }
    let path = join_relative(&parent, &name);
    store.create_folder(kind, &path)?;
    tracing::info!(?kind, %path, "created folder");

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Created folder {}", path)));
    Ok(result.with_affected(vec![TemplateRef::new(kind, path, None)]))
}

/// Renames a folder or template directory in place.
pub fn rename<S: TemplateStore>(
    store: &mut S,
    kind: TemplateKind,
    relative_path: &str,
    new_name: &str,
) -> Result<CmdResult> {
    let from = require_relative(relative_path)?;
    let new_name = validate_name(new_name)?;
    let to = join_relative(parent_of(&from), &new_name);
    if from == to {
        let mut result = CmdResult::default();
        result.add_message(CmdMessage::info(format!("{} already has that name", from)));
        return Ok(result);
    }

    store.rename(kind, &from, &to)?;
    tracing::info!(?kind, %from, %to, "renamed");

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Renamed {} to {}", from, to)));
    Ok(result.with_affected(vec![TemplateRef::new(kind, to, None)]))
}

/// Moves a template into `destination` (a folder path, `""` for the root).
/// A missing destination folder is created.
pub fn move_template<S: TemplateStore>(
    store: &mut S,
    kind: TemplateKind,
    relative_path: &str,
    destination: &str,
) -> Result<CmdResult> {
    let from = require_template(&*store, kind, relative_path)?;
    let destination = normalize_relative(destination)?;
    if destination == from || destination.starts_with(&format!("{}/", from)) {
        return Err(SesPilotError::InvalidInput(format!(
            "Cannot move {} into itself",
            from
        )));
    }
    if store.is_template(kind, &destination) {
        return Err(SesPilotError::InvalidInput(format!(
            "{} is a template, not a folder",
            destination
        )));
    }

    let to = join_relative(&destination, leaf_name(&from));
    let mut result = CmdResult::default();
    if to == from {
        result.add_message(CmdMessage::info(format!("{} is already there", from)));
        return Ok(result);
    }

    store.rename(kind, &from, &to)?;
    tracing::info!(?kind, %from, %to, "moved template");

    result.add_message(CmdMessage::success(format!("Moved {} to {}", from, to)));
    Ok(result.with_affected(vec![TemplateRef::new(kind, to, None)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::fixtures::StoreFixture;
    use crate::store::memory::InMemoryStore;
    use chrono::Utc;

    #[test]
    fn validates_names() {
        assert_eq!(validate_name(" news_letter-2 ").unwrap(), "news_letter-2");
        for bad in ["", "a b", "a/b", "..", "émoji"] {
            assert!(validate_name(bad).is_err(), "{:?}", bad);
        }
    }

    #[test]
    fn creates_nested_folder() {
        let mut store = InMemoryStore::new();
        create(&mut store, TemplateKind::Email, "", "marketing").unwrap();
        let result = create(&mut store, TemplateKind::Email, "marketing", "2024").unwrap();
        assert_eq!(result.affected[0].relative_path, "marketing/2024");
        assert!(store.exists(TemplateKind::Email, "marketing/2024"));
    }

    #[test]
    fn create_needs_existing_parent() {
        let mut store = InMemoryStore::new();
        assert!(matches!(
            create(&mut store, TemplateKind::Email, "missing", "x"),
            Err(SesPilotError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn create_refuses_duplicates() {
        let mut store = InMemoryStore::new();
        create(&mut store, TemplateKind::Email, "", "drafts").unwrap();
        assert!(matches!(
            create(&mut store, TemplateKind::Email, "", "drafts"),
            Err(SesPilotError::AlreadyExists(_))
        ));
    }

    #[test]
    fn renames_folder_with_contents() {
        let mut store = StoreFixture::new()
            .with_email("marketing/promo", "Promo", Utc::now())
            .store;
        rename(&mut store, TemplateKind::Email, "marketing", "campaigns").unwrap();
        assert!(store.is_template(TemplateKind::Email, "campaigns/promo"));
        assert!(!store.exists(TemplateKind::Email, "marketing"));
    }

    #[test]
    fn rename_keeps_parent() {
        let mut store = StoreFixture::new()
            .with_email("marketing/promo", "Promo", Utc::now())
            .store;
        let result = rename(&mut store, TemplateKind::Email, "marketing/promo", "sale").unwrap();
        assert_eq!(result.affected[0].relative_path, "marketing/sale");
    }

    #[test]
    fn moves_template_between_folders() {
        let mut store = StoreFixture::new()
            .with_email("marketing/promo", "Promo", Utc::now())
            .store;
        create(&mut store, TemplateKind::Email, "", "archive").unwrap();

        move_template(&mut store, TemplateKind::Email, "marketing/promo", "archive").unwrap();
        assert!(store.is_template(TemplateKind::Email, "archive/promo"));

        move_template(&mut store, TemplateKind::Email, "archive/promo", "").unwrap();
        assert!(store.is_template(TemplateKind::Email, "promo"));

        move_template(&mut store, TemplateKind::Email, "promo", "new/nested").unwrap();
        assert!(store.is_template(TemplateKind::Email, "new/nested/promo"));
    }

    #[test]
    fn move_refuses_collisions_and_templates_as_targets() {
        let mut store = StoreFixture::new()
            .with_email("a/promo", "A", Utc::now())
            .with_email("b/promo", "B", Utc::now())
            .with_email("welcome", "Welcome", Utc::now())
            .store;
        assert!(matches!(
            move_template(&mut store, TemplateKind::Email, "a/promo", "b"),
            Err(SesPilotError::AlreadyExists(_))
        ));
        assert!(matches!(
            move_template(&mut store, TemplateKind::Email, "a/promo", "welcome"),
            Err(SesPilotError::InvalidInput(_))
        ));
        assert!(matches!(
            move_template(&mut store, TemplateKind::Email, "a", ""),
            Err(SesPilotError::TemplateNotFound(_))
        ));
    }
}
