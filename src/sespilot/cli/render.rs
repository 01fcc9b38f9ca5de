use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use sespilot::api::{CmdMessage, MessageLevel};
use sespilot::commands::{PermissionCheck, PermissionReport, TemplateDetails, TemplateListing};
use sespilot::model::{NodeKind, SyncStatus, SyncedNode, TemplateNode};
use sespilot::sync::SyncReport;
use timeago::Formatter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const LINE_WIDTH: usize = 100;
const TIME_WIDTH: usize = 14;
const BADGE_WIDTH: usize = 10;
const PERMISSION_WIDTH: usize = 45;
const INDENT: &str = "  ";

pub(super) fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => println!("{}", message.content.red()),
        }
    }
}

pub(super) fn print_listing(listing: &TemplateListing, show_email: bool, show_verification: bool) {
    if show_email {
        println!("{}", "Email templates".bold());
        print_lines(&render_tree(&listing.email), "  (none)");
    }
    if show_verification {
        if show_email {
            println!();
        }
        println!("{}", "Verification templates".bold());
        print_lines(&render_tree(&listing.verification), "  (none)");
    }
    println!();
    println!(
        "{}",
        format!(
            "{} email, {} verification, {} total",
            listing.counts.email_templates, listing.counts.verification_templates, listing.counts.total
        )
        .dimmed()
    );
}

pub(super) fn print_sync_reports(reports: &[SyncReport]) {
    for (i, report) in reports.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}", capitalize(&format!("{}s", report.kind)).bold());
        print_lines(&render_sync_tree(&report.tree), "  (no local templates)");

        if !report.remote_only.is_empty() {
            println!("{}", "  Only on SES:".yellow());
            for remote in &report.remote_only {
                let time = remote
                    .last_updated_timestamp
                    .map(format_time_ago)
                    .unwrap_or_else(|| " ".repeat(TIME_WIDTH));
                let name_width = LINE_WIDTH.saturating_sub(TIME_WIDTH + 4);
                let name = truncate_to_width(&remote.template_name, name_width);
                let padding = name_width.saturating_sub(name.width());
                println!("    {}{}{}", name, " ".repeat(padding), time.dimmed());
            }
        }
    }
}

pub(super) fn print_details(details: &TemplateDetails) {
    println!(
        "{} {}",
        details.relative_path.yellow(),
        details.manifest.template_name().bold()
    );
    println!("Subject: {}", details.manifest.subject());
    println!("--------------------------------");
    match details.manifest.to_json_pretty() {
        Ok(json) => println!("{}", json.dimmed()),
        Err(e) => println!("{}", format!("(manifest unavailable: {})", e).red()),
    }
    println!("--------------------------------");
    println!("{}", details.html);
    if let Some(payload) = &details.send_payload {
        println!("--------------------------------");
        println!(
            "Test send: {} -> {}",
            payload.source,
            payload.destination.to_addresses.join(", ")
        );
    }
}

pub(super) fn print_permissions(report: &PermissionReport) {
    if !report.configured {
        return;
    }
    if let (Some(account), Some(arn)) = (&report.account, &report.arn) {
        println!("Account: {}", account);
        println!("Caller:  {}", arn.dimmed());
        println!();
    }
    for check in &report.checks {
        println!("{}", permission_line(check));
    }
    println!();
}

fn permission_line(check: &PermissionCheck) -> String {
    let mark = if check.allowed { "✓".green() } else { "✗".red() };
    let padding = PERMISSION_WIDTH.saturating_sub(check.permission.width());
    format!(
        "  {} {}{}{}",
        mark,
        check.permission,
        " ".repeat(padding),
        check.reason.dimmed()
    )
}

pub(super) fn print_lines(lines: &[String], empty_message: &str) {
    if lines.is_empty() {
        println!("{}", empty_message.dimmed());
        return;
    }
    for line in lines {
        println!("{}", line);
    }
}

fn render_tree(nodes: &[TemplateNode]) -> Vec<String> {
    let mut lines = Vec::new();
    push_tree(nodes, 1, &mut lines);
    lines
}

fn push_tree(nodes: &[TemplateNode], depth: usize, lines: &mut Vec<String>) {
    for node in nodes {
        let indent = INDENT.repeat(depth);
        match (&node.kind, &node.children) {
            (NodeKind::Folder, children) => {
                lines.push(format!("{}{}", indent, format!("{}/", node.name).blue().bold()));
                if let Some(children) = children {
                    push_tree(children, depth + 1, lines);
                }
            }
            (NodeKind::Template, _) => lines.push(format!("{}{}", indent, node.name)),
        }
    }
}

fn render_sync_tree(nodes: &[SyncedNode]) -> Vec<String> {
    let mut lines = Vec::new();
    push_sync_tree(nodes, 1, &mut lines);
    lines
}

fn push_sync_tree(nodes: &[SyncedNode], depth: usize, lines: &mut Vec<String>) {
    for node in nodes {
        let indent = INDENT.repeat(depth);
        if node.kind == NodeKind::Folder {
            lines.push(format!("{}{}", indent, format!("{}/", node.name).blue().bold()));
            if let Some(children) = &node.children {
                push_sync_tree(children, depth + 1, lines);
            }
            continue;
        }

        let label = match &node.template_name {
            Some(name) if name != &node.name => format!("{} ({})", node.name, name),
            _ => node.name.clone(),
        };
        let available = LINE_WIDTH.saturating_sub(indent.width() + BADGE_WIDTH);
        let label = truncate_to_width(&label, available);
        let padding = available.saturating_sub(label.width());
        lines.push(format!(
            "{}{}{}{}",
            indent,
            label,
            " ".repeat(padding),
            badge(node.sync_status)
        ));
    }
}

fn badge(status: Option<SyncStatus>) -> ColoredString {
    let text = format!(
        "{:>width$}",
        status.map(SyncStatus::label).unwrap_or("?"),
        width = BADGE_WIDTH
    );
    match status {
        Some(SyncStatus::Synced) => text.green(),
        Some(SyncStatus::Modified) => text.yellow(),
        Some(SyncStatus::NewLocal) => text.cyan(),
        Some(SyncStatus::Unknown) | None => text.dimmed(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;
    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }

    result
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let now = Utc::now();
    let duration = now.signed_duration_since(timestamp);

    let formatter = Formatter::new();
    let time_str = formatter.convert(duration.to_std().unwrap_or_default());

    format!("{:>width$}", time_str, width = TIME_WIDTH)
}
