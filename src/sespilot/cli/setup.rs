use clap::{CommandFactory, Parser, Subcommand};
use sespilot::model::TemplateKind;
use sespilot::web::DEFAULT_PORT;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ses-pilot",
    bin_name = "ses-pilot",
    version,
    disable_help_flag = true,
    disable_help_subcommand = true
)]
#[command(about = "Manage AWS SES email and verification templates", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Operate on custom verification templates
    #[arg(long, global = true, help_heading = "Options")]
    pub verification: bool,

    /// Use this config file instead of searching for one
    #[arg(long, global = true, value_name = "PATH", help_heading = "Options")]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true, help_heading = "Options")]
    pub json: bool,

    /// Verbose output
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,

    /// Print help
    #[arg(short, long, global = true)]
    pub help: bool,
}

impl Cli {
    pub fn kind(&self) -> TemplateKind {
        if self.verification {
            TemplateKind::Verification
        } else {
            TemplateKind::Email
        }
    }
}

/// Command group definitions for help output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandGroup {
    Template,
    Folder,
    Remote,
    Misc,
}

impl CommandGroup {
    pub fn heading(&self) -> &'static str {
        match self {
            CommandGroup::Template => "Template Commands:",
            CommandGroup::Folder => "Folder Commands:",
            CommandGroup::Remote => "SES Commands:",
            CommandGroup::Misc => "Miscellaneous:",
        }
    }

    /// Returns the group for a given command name
    pub fn for_command(name: &str) -> Option<Self> {
        match name {
            "list" | "show" | "create" | "update" | "delete" | "edit" | "minify" | "format" => {
                Some(CommandGroup::Template)
            }
            "mkdir" | "rename" | "move" => Some(CommandGroup::Folder),
            "status" | "deploy" | "pull" | "send-test" | "permissions" => Some(CommandGroup::Remote),
            "init" | "config" | "serve" | "help" => Some(CommandGroup::Misc),
            _ => None,
        }
    }

    /// Returns all groups in display order
    pub fn all() -> &'static [CommandGroup] {
        &[
            CommandGroup::Template,
            CommandGroup::Folder,
            CommandGroup::Remote,
            CommandGroup::Misc,
        ]
    }
}

/// Returns the custom grouped help output as a string
pub fn get_grouped_help() -> String {
    let cmd = Cli::command();
    let version = cmd.get_version().unwrap_or("unknown");

    let mut output = String::new();
    output.push_str(&format!("ses-pilot {version}\n"));
    output.push_str("Manage AWS SES email and verification templates\n");
    output.push('\n');
    output.push_str("Usage: ses-pilot [OPTIONS] [COMMAND]\n");

    let subcommands: Vec<_> = cmd.get_subcommands().collect();

    for group in CommandGroup::all() {
        let group_cmds: Vec<_> = subcommands
            .iter()
            .filter(|sc| {
                !sc.is_hide_set() && CommandGroup::for_command(sc.get_name()) == Some(*group)
            })
            .collect();

        if !group_cmds.is_empty() {
            output.push('\n');
            output.push_str(&format!("{}\n", group.heading()));
            for sc in group_cmds {
                let name = sc.get_name();
                let about = sc.get_about().map(|s| s.to_string()).unwrap_or_default();
                output.push_str(&format!("  {:<12} {}\n", name, about));
            }
        }
    }

    output.push('\n');
    output.push_str("Options:\n");
    output.push_str("      --verification   Operate on custom verification templates\n");
    output.push_str("      --config <PATH>  Use this config file instead of searching for one\n");
    output.push_str("      --json           Print results as JSON\n");
    output.push_str("  -v, --verbose        Verbose output\n");
    output.push_str("  -h, --help           Print help\n");
    output.push_str("  -V, --version        Print version\n");

    output
}

pub fn print_grouped_help() {
    print!("{}", get_grouped_help());
}

/// Prints help for a specific subcommand using clap's built-in rendering
pub fn print_subcommand_help(command: &Option<Commands>) {
    let subcommand_name = match command {
        Some(Commands::Template(c)) => match c {
            TemplateCommands::List => "list",
            TemplateCommands::Show { .. } => "show",
            TemplateCommands::Create { .. } => "create",
            TemplateCommands::Update { .. } => "update",
            TemplateCommands::Delete { .. } => "delete",
            TemplateCommands::Edit { .. } => "edit",
            TemplateCommands::Minify { .. } => "minify",
            TemplateCommands::Format { .. } => "format",
        },
        Some(Commands::Folder(c)) => match c {
            FolderCommands::Mkdir { .. } => "mkdir",
            FolderCommands::Rename { .. } => "rename",
            FolderCommands::Move { .. } => "move",
        },
        Some(Commands::Remote(c)) => match c {
            RemoteCommands::Status => "status",
            RemoteCommands::Deploy { .. } => "deploy",
            RemoteCommands::Pull { .. } => "pull",
            RemoteCommands::SendTest { .. } => "send-test",
            RemoteCommands::Permissions => "permissions",
        },
        Some(Commands::Misc(c)) => match c {
            MiscCommands::Init { .. } => "init",
            MiscCommands::Config { .. } => "config",
            MiscCommands::Serve { .. } => "serve",
            MiscCommands::Help { .. } => "help",
        },
        None => {
            print_grouped_help();
            return;
        }
    };

    print_help_for_command(subcommand_name);
}

/// Prints help for a command by name
pub fn print_help_for_command(name: &str) {
    let mut cmd = Cli::command();

    for subcmd in cmd.get_subcommands_mut() {
        if subcmd.get_name() == name {
            let help = subcmd.render_help();
            print!("{}", help);
            return;
        }
    }

    eprintln!("Unknown command: {}", name);
    eprintln!();
    print_grouped_help();
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(flatten)]
    Template(TemplateCommands),

    #[command(flatten)]
    Folder(FolderCommands),

    #[command(flatten)]
    Remote(RemoteCommands),

    #[command(flatten)]
    Misc(MiscCommands),
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommands {
    /// List local templates
    #[command(alias = "ls", display_order = 1)]
    List,

    /// Show a template's manifest and HTML
    #[command(display_order = 2)]
    Show {
        /// Template path relative to the templates root (e.g. onboarding/welcome)
        path: String,
    },

    /// Create a new template
    #[command(alias = "new", display_order = 3)]
    Create {
        /// Directory name of the template
        name: String,

        /// Subject line (defaults to the name)
        #[arg(short, long)]
        subject: Option<String>,

        /// Folder to create the template in
        #[arg(long, value_name = "FOLDER")]
        folder: Option<String>,

        /// Remote template name (defaults to <Name>Template)
        #[arg(long)]
        template_name: Option<String>,

        /// Open template.html in the editor afterwards
        #[arg(short, long)]
        edit: bool,
    },

    /// Change a template's subject, name, HTML or text part
    #[command(display_order = 4)]
    Update {
        /// Template path
        path: String,

        /// New subject line
        #[arg(short, long)]
        subject: Option<String>,

        /// New remote template name
        #[arg(long)]
        template_name: Option<String>,

        /// Replace template.html with the contents of this file
        #[arg(long, value_name = "FILE")]
        html_file: Option<PathBuf>,

        /// New plain-text part (email templates only)
        #[arg(long)]
        text: Option<String>,
    },

    /// Delete a template or folder
    #[command(alias = "rm", display_order = 5)]
    Delete {
        /// Template or folder path
        path: String,

        /// Also delete the template from SES
        #[arg(long)]
        remote: bool,
    },

    /// Open a template's HTML in the editor
    #[command(alias = "e", display_order = 6)]
    Edit {
        /// Template path
        path: String,
    },

    /// Minify a template's HTML in place
    #[command(display_order = 7)]
    Minify {
        /// Template path
        path: String,
    },

    /// Re-indent a template's HTML in place
    #[command(display_order = 8)]
    Format {
        /// Template path
        path: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum FolderCommands {
    /// Create a folder
    #[command(display_order = 10)]
    Mkdir {
        /// Folder path (e.g. onboarding/2024)
        path: String,
    },

    /// Rename a template or folder in place
    #[command(display_order = 11)]
    Rename {
        /// Template or folder path
        path: String,

        /// New directory name
        new_name: String,
    },

    /// Move a template into another folder
    #[command(alias = "mv", display_order = 12)]
    Move {
        /// Template path
        path: String,

        /// Destination folder (omit for the root); created when missing
        destination: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum RemoteCommands {
    /// Compare local templates with SES
    #[command(alias = "st", display_order = 20)]
    Status,

    /// Create or update a template on SES
    #[command(display_order = 21)]
    Deploy {
        /// Template path
        path: String,
    },

    /// Download templates from SES
    #[command(display_order = 22)]
    Pull {
        /// Remote template names
        #[arg(required_unless_present = "all", num_args = 0..)]
        names: Vec<String>,

        /// Pull every template that exists only on SES
        #[arg(long, conflicts_with = "names")]
        all: bool,
    },

    /// Send a test email for a template
    #[command(display_order = 23)]
    SendTest {
        /// Template path
        path: String,

        /// Recipient; without it the template's send-email.json is used
        #[arg(long)]
        to: Option<String>,

        /// Sender for direct sends
        #[arg(long)]
        from: Option<String>,
    },

    /// Check which SES permissions the AWS credentials have
    #[command(display_order = 24)]
    Permissions,
}

#[derive(Subcommand, Debug)]
pub enum MiscCommands {
    /// Create a config file
    #[command(display_order = 30)]
    Init {
        /// Create the global config instead of one in this directory
        #[arg(short, long)]
        global: bool,
    },

    /// Get or set configuration
    #[command(display_order = 31)]
    Config {
        /// Configuration key (mode, templatesPath)
        key: Option<String>,

        /// Value to set (if omitted, prints current value)
        value: Option<String>,
    },

    /// Serve the dashboard JSON API
    #[command(display_order = 32)]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Print help for ses-pilot or a subcommand
    #[command(display_order = 33)]
    Help {
        /// Subcommand to get help for
        command: Option<String>,
    },
}
