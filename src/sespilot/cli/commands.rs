//! # CLI Layer
//!
//! This module is **one possible UI client** for ses-pilot. The other one is the
//! `serve` JSON API in the library's `web` module.
//!
//! The CLI layer is the **only** place in the codebase that:
//! - Knows about terminal I/O (stdout, stderr)
//! - Uses `std::process::exit`
//! - Handles argument parsing
//! - Formats output for human consumption
//!
//! ## Responsibilities
//!
//! 1. **Argument Parsing**: Convert shell arguments into typed commands via clap
//! 2. **Context Setup**: Resolve the config once and build `AppContext` around it
//! 3. **API Dispatch**: Call the appropriate `PilotApi` method
//! 4. **Output Formatting**: Render `CmdResult` for the terminal, or as JSON with `--json`
//! 5. **Error Handling**: Error messages in a result mean exit code 1
//!
//! ## Structure
//!
//! - `run()`: Main dispatch logic (called by `main.rs`)
//! - `init_context()`: Builds `AppContext` with API and configuration
//! - `handle_*()`: Per-command handlers that call API and format output

use super::render::{
    print_details, print_lines, print_listing, print_messages, print_permissions,
    print_sync_reports,
};
use super::setup::{
    print_grouped_help, print_help_for_command, print_subcommand_help, Cli, Commands,
    FolderCommands, MiscCommands, RemoteCommands, TemplateCommands,
};
use clap::Parser;
use sespilot::api::{
    CmdResult, ConfigAction, HtmlTransform, InitTarget, NewTemplate, PilotApi, SendOptions,
    TemplateUpdate,
};
use sespilot::config::{global_dir, ResolvedConfig};
use sespilot::editor::open_in_editor;
use sespilot::error::{Result, SesPilotError};
use sespilot::model::TemplateKind;
use sespilot::remote::aws::AwsCli;
use sespilot::store::fs::FileStore;
use sespilot::store::{leaf_name, parent_of, require_relative};
use sespilot::web;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Filter directive override, e.g. `SES_PILOT_LOG=sespilot=trace`.
const LOG_ENV: &str = "SES_PILOT_LOG";

struct AppContext {
    api: PilotApi<FileStore, AwsCli>,
    kind: TemplateKind,
    verification_only: bool,
    json: bool,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Top level uses grouped help, subcommands use clap's rendering
    if cli.help {
        if cli.command.is_none() {
            print_grouped_help();
        } else {
            print_subcommand_help(&cli.command);
        }
        return Ok(());
    }

    init_logging(cli.verbose);

    // These run without a resolved config
    match &cli.command {
        Some(Commands::Misc(MiscCommands::Init { global })) => return handle_init(*global, cli.json),
        Some(Commands::Misc(MiscCommands::Help { command })) => return handle_help(command.clone()),
        _ => {}
    }

    let mut ctx = init_context(&cli)?;

    match cli.command {
        Some(Commands::Template(cmd)) => match cmd {
            TemplateCommands::List => handle_list(&ctx),
            TemplateCommands::Show { path } => handle_show(&ctx, path),
            TemplateCommands::Create {
                name,
                subject,
                folder,
                template_name,
                edit,
            } => {
                let mut new = NewTemplate::new(name, subject.unwrap_or_default())
                    .in_folder(folder.unwrap_or_default());
                if let Some(template_name) = template_name {
                    new = new.with_template_name(template_name);
                }
                handle_create(&mut ctx, new, edit)
            }
            TemplateCommands::Update {
                path,
                subject,
                template_name,
                html_file,
                text,
            } => handle_update(&mut ctx, path, subject, template_name, html_file, text),
            TemplateCommands::Delete { path, remote } => handle_delete(&mut ctx, path, remote),
            TemplateCommands::Edit { path } => handle_edit(&ctx, path),
            TemplateCommands::Minify { path } => handle_html(&mut ctx, path, HtmlTransform::Minify),
            TemplateCommands::Format { path } => handle_html(&mut ctx, path, HtmlTransform::Format),
        },
        Some(Commands::Folder(cmd)) => match cmd {
            FolderCommands::Mkdir { path } => handle_mkdir(&mut ctx, path),
            FolderCommands::Rename { path, new_name } => handle_rename(&mut ctx, path, new_name),
            FolderCommands::Move { path, destination } => {
                handle_move(&mut ctx, path, destination.unwrap_or_default())
            }
        },
        Some(Commands::Remote(cmd)) => match cmd {
            RemoteCommands::Status => handle_status(&ctx),
            RemoteCommands::Deploy { path } => handle_deploy(&ctx, path),
            RemoteCommands::Pull { names, all } => handle_pull(&mut ctx, names, all),
            RemoteCommands::SendTest { path, to, from } => handle_send_test(&ctx, path, to, from),
            RemoteCommands::Permissions => handle_permissions(&ctx),
        },
        Some(Commands::Misc(cmd)) => match cmd {
            MiscCommands::Config { key, value } => handle_config(&ctx, key, value),
            MiscCommands::Serve { port, host } => handle_serve(ctx, host, port),
            MiscCommands::Init { .. } | MiscCommands::Help { .. } => Ok(()),
        },
        None => handle_list(&ctx),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    // A second init (tests driving run() twice) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn init_context(cli: &Cli) -> Result<AppContext> {
    let config = match &cli.config {
        Some(path) => ResolvedConfig::from_file(path)?,
        None => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            ResolvedConfig::discover(&cwd, global_dir().as_deref())?
        }
    };
    tracing::debug!(
        source = %config.source.display(),
        root = %config.templates_root.display(),
        "resolved config"
    );

    let store = FileStore::new(config.templates_root.clone());
    Ok(AppContext {
        api: PilotApi::new(store, AwsCli::from_env(), config),
        kind: cli.kind(),
        verification_only: cli.verification,
        json: cli.json,
    })
}

/// Prints a result as JSON or through `render`, then its messages. Error
/// messages in the result end the process with status 1.
fn emit(json: bool, result: &CmdResult, render: impl FnOnce(&CmdResult)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        render(result);
        print_messages(&result.messages);
    }
    if result.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}

fn messages_only(_: &CmdResult) {}

fn handle_list(ctx: &AppContext) -> Result<()> {
    let result = ctx.api.list_templates()?;
    emit(ctx.json, &result, |r| {
        if let Some(listing) = &r.listing {
            print_listing(listing, !ctx.verification_only, true);
        }
    })
}

fn handle_show(ctx: &AppContext, path: String) -> Result<()> {
    let result = ctx.api.show_template(ctx.kind, &path)?;
    emit(ctx.json, &result, |r| {
        if let Some(details) = &r.details {
            print_details(details);
        }
    })
}

fn handle_create(ctx: &mut AppContext, new: NewTemplate, edit: bool) -> Result<()> {
    let result = ctx.api.create_template(ctx.kind, new)?;
    emit(ctx.json, &result, messages_only)?;

    if edit {
        if let Some(created) = result.affected.first() {
            let path = ctx.api.html_path(ctx.kind, &created.relative_path)?;
            open_in_editor(&path)?;
        }
    }
    Ok(())
}

fn handle_update(
    ctx: &mut AppContext,
    path: String,
    subject: Option<String>,
    template_name: Option<String>,
    html_file: Option<PathBuf>,
    text: Option<String>,
) -> Result<()> {
    let html = match html_file {
        Some(file) => Some(std::fs::read_to_string(&file)?),
        None => None,
    };
    let update = TemplateUpdate {
        subject,
        template_name,
        html,
        text,
    };
    let result = ctx.api.update_template(ctx.kind, &path, update)?;
    emit(ctx.json, &result, messages_only)
}

fn handle_delete(ctx: &mut AppContext, path: String, remote: bool) -> Result<()> {
    let result = ctx.api.delete_template(ctx.kind, &path, remote)?;
    emit(ctx.json, &result, messages_only)
}

fn handle_edit(ctx: &AppContext, path: String) -> Result<()> {
    let html_path = ctx.api.html_path(ctx.kind, &path)?;
    open_in_editor(&html_path)
}

fn handle_html(ctx: &mut AppContext, path: String, transform: HtmlTransform) -> Result<()> {
    let result = ctx.api.transform_html(ctx.kind, &path, transform)?;
    emit(ctx.json, &result, messages_only)
}

fn handle_mkdir(ctx: &mut AppContext, path: String) -> Result<()> {
    let path = require_relative(&path)?;
    let result = ctx
        .api
        .create_folder(ctx.kind, parent_of(&path), leaf_name(&path))?;
    emit(ctx.json, &result, messages_only)
}

fn handle_rename(ctx: &mut AppContext, path: String, new_name: String) -> Result<()> {
    let result = ctx.api.rename(ctx.kind, &path, &new_name)?;
    emit(ctx.json, &result, messages_only)
}

fn handle_move(ctx: &mut AppContext, path: String, destination: String) -> Result<()> {
    let result = ctx.api.move_template(ctx.kind, &path, &destination)?;
    emit(ctx.json, &result, messages_only)
}

fn handle_status(ctx: &AppContext) -> Result<()> {
    let kinds: &[TemplateKind] = if ctx.verification_only {
        &[TemplateKind::Verification]
    } else {
        &[TemplateKind::Email, TemplateKind::Verification]
    };
    let result = ctx.api.sync_status(kinds)?;
    emit(ctx.json, &result, |r| {
        print_sync_reports(&r.sync_reports);
        println!();
    })
}

fn handle_deploy(ctx: &AppContext, path: String) -> Result<()> {
    let result = ctx.api.deploy(ctx.kind, &path)?;
    emit(ctx.json, &result, messages_only)
}

fn handle_pull(ctx: &mut AppContext, names: Vec<String>, all: bool) -> Result<()> {
    let result = if all {
        ctx.api.pull_all()?
    } else {
        ctx.api.pull(&names[..])?
    };
    emit(ctx.json, &result, messages_only)
}

fn handle_send_test(
    ctx: &AppContext,
    path: String,
    to: Option<String>,
    from: Option<String>,
) -> Result<()> {
    let result = ctx.api.send_test(ctx.kind, &path, SendOptions { to, from })?;
    emit(ctx.json, &result, messages_only)
}

fn handle_permissions(ctx: &AppContext) -> Result<()> {
    let result = ctx.api.permissions()?;
    emit(ctx.json, &result, |r| {
        if let Some(report) = &r.permissions {
            print_permissions(report);
        }
    })
}

fn handle_config(ctx: &AppContext, key: Option<String>, value: Option<String>) -> Result<()> {
    let show_all = key.is_none();
    let action = match (key, value) {
        (None, _) => ConfigAction::ShowAll,
        (Some(k), None) => ConfigAction::ShowKey(k),
        (Some(k), Some(v)) => ConfigAction::Set(k, v),
    };

    let result = ctx.api.config(action)?;
    emit(ctx.json, &result, |r| {
        if let (true, Some(config)) = (show_all, &r.config) {
            let lines: Vec<String> = config
                .list_all()
                .into_iter()
                .map(|(k, v)| format!("{} = {}", k, v))
                .collect();
            print_lines(&lines, "No configuration values.");
        }
    })
}

fn handle_serve(ctx: AppContext, host: String, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse().map_err(|e| {
        SesPilotError::InvalidInput(format!("Invalid address {}:{}: {}", host, port, e))
    })?;
    println!("Serving the dashboard API on http://{}", addr);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(web::serve(ctx.api, addr))
}

fn handle_init(global: bool, json: bool) -> Result<()> {
    let target = if global {
        let dir = global_dir().ok_or_else(|| {
            SesPilotError::Config("Could not determine the home directory".to_string())
        })?;
        InitTarget::Global(dir)
    } else {
        InitTarget::Local(std::env::current_dir()?)
    };
    let result = sespilot::api::init(&target)?;
    emit(json, &result, messages_only)
}

fn handle_help(command: Option<String>) -> Result<()> {
    match command {
        Some(cmd) => print_help_for_command(&cmd),
        None => print_grouped_help(),
    }
    Ok(())
}
