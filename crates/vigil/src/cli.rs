//! Clap derive structures for the `vigil` CLI.
//!
//! Defines the command tree, global flags, and shared argument types.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// vigil -- command-line view onto the threat-detection dashboard
#[derive(Debug, Parser)]
#[command(
    name = "vigil",
    version,
    about = "Triage threats, alerts and detection models from the command line",
    long_about = "Command-line client for the threat-detection dashboard API.\n\n\
        Lists and inspects threats and alerts, drives alert triage, and\n\
        trains, evaluates and persists detection models.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "VIGIL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API base URL (overrides profile)
    #[arg(long, env = "VIGIL_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Bearer token (overrides env, keyring and profile)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(
        id = "output",
        long = "output",
        short = 'o',
        env = "VIGIL_OUTPUT",
        value_name = "FORMAT",
        global = true
    )]
    pub output_flag: Option<OutputFormat>,

    /// When to use color output [default: from config, else auto]
    #[arg(id = "color", long = "color", value_name = "WHEN", global = true)]
    pub color_flag: Option<ColorMode>,

    /// Effective output format, settled by `config::apply_display_defaults`
    #[arg(skip)]
    pub output: OutputFormat,

    /// Effective color mode, settled by `config::apply_display_defaults`
    #[arg(skip)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "VIGIL_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "VIGIL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Default, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    #[default]
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect and respond to detected threats
    #[command(alias = "t")]
    Threats(ThreatsArgs),

    /// Triage alerts
    #[command(alias = "a")]
    Alerts(AlertsArgs),

    /// Train, evaluate and persist detection models
    #[command(alias = "m")]
    Models(ModelsArgs),

    /// Manage the stored session token
    Auth(AuthArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared List Arguments ────────────────────────────────────────────

/// Pagination arguments for list commands.
#[derive(Debug, Args)]
pub struct PageArgs {
    /// Page number, starting at 1
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Rows per page: 5, 10 or 25 (defaults to the profile's page_size)
    #[arg(long, short = 'l')]
    pub page_size: Option<u32>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  THREATS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ThreatsArgs {
    #[command(subcommand)]
    pub command: ThreatsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ThreatsCommand {
    /// List detected threats
    #[command(alias = "ls")]
    List(PageArgs),

    /// Show threat details
    Get {
        /// Threat ID
        id: String,
    },

    /// Submit traffic data for analysis
    Analyze {
        /// JSON object describing the traffic to analyze
        #[arg(long, short = 'F')]
        from_file: PathBuf,
    },

    /// Trigger a response action against a threat
    #[command(group(ArgGroup::new("payload").required(true).args(["from_file", "action"])))]
    Respond {
        /// Threat ID
        id: String,

        /// JSON object describing the response action
        #[arg(long, short = 'F')]
        from_file: Option<PathBuf>,

        /// Shorthand for {"action": "<ACTION>"}
        #[arg(long)]
        action: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ALERTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AlertsArgs {
    #[command(subcommand)]
    pub command: AlertsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AlertsCommand {
    /// List alerts
    #[command(alias = "ls")]
    List(PageArgs),

    /// Show alert details and comments
    Get {
        /// Alert ID
        id: String,
    },

    /// Mark an alert as acknowledged
    #[command(alias = "acknowledge")]
    Ack {
        /// Alert ID
        id: String,
    },

    /// Mark an alert as resolved
    Resolve {
        /// Alert ID
        id: String,
    },

    /// Add a comment to an alert
    Comment {
        /// Alert ID
        id: String,

        /// Comment text
        text: String,
    },

    /// Show aggregate alert statistics
    #[command(alias = "statistics")]
    Stats,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  MODELS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ModelsCommand {
    /// List available models
    #[command(alias = "ls")]
    List,

    /// Show model details
    Get {
        /// Model name
        name: String,
    },

    /// Train a model on labelled data
    Train {
        /// Model name
        name: String,

        /// JSON object with "features" and optional "labels" arrays
        #[arg(long, short = 'F')]
        from_file: PathBuf,
    },

    /// Run a prediction
    Predict {
        /// Model name
        name: String,

        /// JSON object with a "features" array
        #[arg(long, short = 'F')]
        from_file: PathBuf,
    },

    /// Persist a model on the backend
    Save {
        /// Model name
        name: String,

        /// Backend-side path to write
        path: String,
    },

    /// Load a model from a backend-side path
    Load {
        /// Model name
        name: String,

        /// Backend-side path to read
        path: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  AUTH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Store a token in the system keyring (uses --token or prompts)
    Login,

    /// Remove the stored token
    Logout,

    /// Show whether a token is available for the active profile
    Status,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file location
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
