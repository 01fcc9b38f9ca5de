use crate::commands::{require_template, CmdMessage, CmdResult, TemplateRef};
use crate::error::Result;
use crate::html as markup;
use crate::model::TemplateKind;
use crate::store::TemplateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlTransform {
    Minify,
    Format,
}

impl HtmlTransform {
    fn apply(self, html: &str) -> String {
        match self {
            HtmlTransform::Minify => markup::minify(html),
            HtmlTransform::Format => markup::format(html),
        }
    }

    fn past_tense(self) -> &'static str {
        match self {
            HtmlTransform::Minify => "Minified",
            HtmlTransform::Format => "Formatted",
        }
    }
}

/// Rewrites `template.html` in place.
pub fn run<S: TemplateStore>(
    store: &mut S,
    kind: TemplateKind,
    relative_path: &str,
    transform: HtmlTransform,
) -> Result<CmdResult> {
    let path = require_template(&*store, kind, relative_path)?;
    let html = store.read_html(kind, &path)?;
    let mut result = CmdResult::default();

    if html.trim().is_empty() {
        result.add_message(CmdMessage::warning(format!("{} has no HTML body", path)));
        return Ok(result);
    }

    let rewritten = transform.apply(&html);
    if rewritten == html {
        result.add_message(CmdMessage::info(format!("{} is unchanged", path)));
        return Ok(result);
    }

    // The manifest is rewritten verbatim so a malformed one survives.
    let manifest = store.read_manifest(kind, &path)?;
    store.write_template(kind, &path, &manifest, Some(&rewritten))?;
    tracing::debug!(?kind, %path, before = html.len(), after = rewritten.len(), "rewrote html");

    result.add_message(CmdMessage::success(format!(
        "{} {} ({} -> {} bytes)",
        transform.past_tense(),
        path,
        html.len(),
        rewritten.len()
    )));
    Ok(result.with_affected(vec![TemplateRef::new(kind, path, None)]))
}
