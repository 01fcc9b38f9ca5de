use crate::commands::{CmdMessage, CmdResult, TemplateListing};
use crate::error::Result;
use crate::model::{count_templates, TemplateCounts, TemplateKind};
use crate::store::TemplateStore;

pub fn run<S: TemplateStore>(store: &S) -> Result<CmdResult> {
    let email = store.scan(TemplateKind::Email)?;
    let verification = store.scan(TemplateKind::Verification)?;
    let counts = TemplateCounts::new(count_templates(&email), count_templates(&verification));

    let mut result = CmdResult::default();
    if counts.total == 0 {
        result.add_message(CmdMessage::info(
            "No templates yet. Create one with `ses-pilot create <name>`.",
        ));
    }

    Ok(result.with_listing(TemplateListing {
        email,
        verification,
        counts,
    }))
}

pub fn counts<S: TemplateStore>(store: &S) -> Result<TemplateCounts> {
    let email = store.scan(TemplateKind::Email)?;
    let verification = store.scan(TemplateKind::Verification)?;
    Ok(TemplateCounts::new(
        count_templates(&email),
        count_templates(&verification),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::fixtures::StoreFixture;
    use crate::store::memory::InMemoryStore;
    use chrono::Utc;

    #[test]
    fn lists_both_kinds_with_counts() {
        let store = StoreFixture::new()
            .with_email("welcome", "Welcome", Utc::now())
            .with_email("marketing/promo", "Promo", Utc::now())
            .with_verification("confirm", "Confirm")
            .store;

        let result = run(&store).unwrap();
        let listing = result.listing.unwrap();
        assert_eq!(listing.email.len(), 2);
        assert_eq!(listing.verification.len(), 1);
        assert_eq!(listing.counts, TemplateCounts::new(2, 1));
        assert!(result.messages.is_empty());
    }

    #[test]
    fn empty_store_says_so() {
        let result = run(&InMemoryStore::new()).unwrap();
        assert_eq!(result.listing.unwrap().counts.total, 0);
        assert_eq!(result.messages.len(), 1);
    }

    #[test]
    fn counts_match_listing() {
        let store = StoreFixture::new()
            .with_email("a/b/c", "C", Utc::now())
            .with_verification("v", "V")
            .store;
        assert_eq!(counts(&store).unwrap(), TemplateCounts::new(1, 1));
    }
}
