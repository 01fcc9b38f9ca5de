//! HTML text tools used by deploy, the `minify`/`format` commands, and the
//! dashboard routes.
//!
//! None of these are full HTML parsers. They work on the tag/text token stream,
//! which is enough for hand-written email templates.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static MULTI_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").expect("valid regex"));
static NUMERIC_ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&#(\d+);").expect("valid regex"));

const FALLBACK_FROM_ADDRESS: &str = "noreply@example.com";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const PRESERVED_ELEMENTS: &[&str] = &["pre", "textarea"];

/// The one-line form sent on deploy: line breaks removed, whitespace runs of two
/// or more collapsed to a single space, ends trimmed.
pub fn collapse(html: &str) -> String {
    let without_breaks: String = html.chars().filter(|c| *c != '\n' && *c != '\r').collect();
    MULTI_WHITESPACE
        .replace_all(&without_breaks, " ")
        .trim()
        .to_string()
}

/// Characters above U+007F become `&#N;`.
pub fn encode_non_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if (c as u32) > 127 {
            out.push_str(&format!("&#{};", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}

/// Turns `&#N;` entities back into characters for display. Unknown code points
/// are left as written.
pub fn decode_entities(text: &str) -> String {
    NUMERIC_ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            caps[1]
                .parse::<u32>()
                .ok()
                .and_then(char::from_u32)
                .map(|c| c.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Subject-line normalization: entity-encode, trim, collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    let encoded = encode_non_ascii(text);
    WHITESPACE_RUN
        .replace_all(encoded.trim(), " ")
        .into_owned()
}

/// Normalizes the display part of `Name <address>` and leaves bare addresses alone.
pub fn normalize_from_address(from: &str) -> String {
    let trimmed = from.trim();
    if trimmed.is_empty() {
        return FALLBACK_FROM_ADDRESS.to_string();
    }
    if let (Some(open), true) = (trimmed.find('<'), trimmed.contains('>')) {
        let display = normalize_text(&trimmed[..open]);
        let address = trimmed[open + 1..].replacen('>', "", 1);
        return if display.is_empty() {
            address
        } else {
            format!("{} <{}>", display, address)
        };
    }
    trimmed.to_string()
}

/// Minifies template HTML.
///
/// Non-ASCII characters are entity-encoded, comments are dropped except Outlook
/// conditional comments, whitespace runs collapse to one space and whitespace
/// between tags disappears. `<pre>` and `<textarea>` bodies pass through untouched.
pub fn minify(html: &str) -> String {
    let encoded = encode_non_ascii(html);
    let mut out = String::with_capacity(encoded.len());
    let mut pending = String::new();
    let mut rest = encoded.as_str();

    while !rest.is_empty() {
        if rest.starts_with("<!--") {
            let end = rest.find("-->").map(|i| i + 3).unwrap_or(rest.len());
            let comment = &rest[..end];
            if is_conditional_comment(comment) {
                flush_text(&mut pending, &mut out, true);
                out.push_str(comment);
            }
            rest = &rest[end..];
            continue;
        }

        if let Some(tag) = preserved_element_at(rest) {
            flush_text(&mut pending, &mut out, true);
            let end = closing_tag_end(rest, tag).unwrap_or(rest.len());
            out.push_str(&rest[..end]);
            rest = &rest[end..];
            continue;
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            pending.push(c);
        }
        rest = chars.as_str();
    }
    flush_text(&mut pending, &mut out, false);

    out.trim().to_string()
}

fn flush_text(pending: &mut String, out: &mut String, next_is_tag: bool) {
    if pending.is_empty() {
        return;
    }
    let mut text = WHITESPACE_RUN.replace_all(pending, " ").replace("> <", "><");
    if out.ends_with('>') && text.starts_with(" <") {
        text.remove(0);
    }
    if next_is_tag && text.ends_with("> ") {
        text.pop();
    }
    out.push_str(&text);
    pending.clear();
}

fn is_conditional_comment(comment: &str) -> bool {
    comment.starts_with("<!--[if") || comment.contains("<![endif]")
}

fn preserved_element_at(rest: &str) -> Option<&'static str> {
    if !rest.starts_with('<') {
        return None;
    }
    let lower = rest.get(..12).unwrap_or(rest).to_ascii_lowercase();
    PRESERVED_ELEMENTS.iter().copied().find(|tag| {
        let open = format!("<{}", tag);
        lower.starts_with(&open)
            && lower[open.len()..]
                .chars()
                .next()
                .map(|c| c == '>' || c.is_whitespace())
                .unwrap_or(false)
    })
}

fn closing_tag_end(rest: &str, tag: &str) -> Option<usize> {
    let close = format!("</{}", tag);
    let start = rest.to_ascii_lowercase().find(&close)?;
    rest[start..].find('>').map(|i| start + i + 1)
}

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Tag(&'a str),
    Text(&'a str),
}

fn tokenize(html: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = html;
    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix("<!--") {
            let end = stripped.find("-->").map(|i| i + 7).unwrap_or(rest.len());
            tokens.push(Token::Tag(&rest[..end]));
            rest = &rest[end..];
        } else if rest.starts_with('<') {
            let end = rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
            tokens.push(Token::Tag(&rest[..end]));
            rest = &rest[end..];
        } else {
            let end = rest.find('<').unwrap_or(rest.len());
            tokens.push(Token::Text(&rest[..end]));
            rest = &rest[end..];
        }
    }
    tokens
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('<')
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Re-indents HTML, two spaces per nesting level.
pub fn format(html: &str) -> String {
    let mut lines = Vec::new();
    let mut depth: usize = 0;

    for token in tokenize(html) {
        match token {
            Token::Text(text) => {
                let text = WHITESPACE_RUN.replace_all(text.trim(), " ");
                if !text.is_empty() {
                    lines.push(format!("{}{}", "  ".repeat(depth), text));
                }
            }
            Token::Tag(tag) if tag.starts_with("</") => {
                depth = depth.saturating_sub(1);
                lines.push(format!("{}{}", "  ".repeat(depth), tag));
            }
            Token::Tag(tag) => {
                lines.push(format!("{}{}", "  ".repeat(depth), tag));
                let opens_scope = !tag.starts_with("<!")
                    && !tag.starts_with("<?")
                    && !tag.ends_with("/>")
                    && !VOID_ELEMENTS.contains(&tag_name(tag).as_str());
                if opens_scope {
                    depth += 1;
                }
            }
        }
    }

    let mut formatted = lines.join("\n");
    formatted.push('\n');
    formatted
}
