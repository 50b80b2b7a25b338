//! Clap derive structures for the `soilwatch` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// soilwatch -- monitor soil conditions and drive the watering pump
#[derive(Debug, Parser)]
#[command(
    name = "soilwatch",
    version,
    about = "Monitor soil sensors and control the watering pump",
    long_about = "Live telemetry, pump control, and analytics for a soil-watering\n\
        device, all through its HTTP relay.",
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
    /// Relay URL (overrides config file)
    #[arg(long, short = 'r', env = "SOILWATCH_RELAY_URL", global = true)]
    pub relay: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SOILWATCH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "SOILWATCH_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides config file)
    #[arg(long, env = "SOILWATCH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
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

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stream live sensor readings
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Query or control the water pump
    #[command(alias = "p")]
    Pump(PumpArgs),

    /// Show aggregated statistics and history
    #[command(alias = "stats")]
    Analytics(AnalyticsArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Exit after this many readings (default: run until interrupted)
    #[arg(long, short = 'n')]
    pub count: Option<usize>,

    /// Also print connection status changes
    #[arg(long)]
    pub status: bool,
}

// ── Pump ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PumpArgs {
    #[command(subcommand)]
    pub command: PumpCommand,
}

#[derive(Debug, Subcommand)]
pub enum PumpCommand {
    /// Show the last reported pump state
    Status(PumpWaitArgs),

    /// Invert the last reported pump state
    Toggle(PumpSetArgs),

    /// Request the pump on
    On(PumpSetArgs),

    /// Request the pump off
    Off(PumpSetArgs),
}

#[derive(Debug, Args)]
pub struct PumpWaitArgs {
    /// Seconds to wait for the first reading
    #[arg(long, default_value = "10")]
    pub wait_timeout: u64,
}

#[derive(Debug, Args)]
pub struct PumpSetArgs {
    /// Wait until the device reports the requested state
    #[arg(long)]
    pub wait: bool,

    /// Seconds to wait for readings (first reading and --wait)
    #[arg(long, default_value = "10")]
    pub wait_timeout: u64,
}

// ── Analytics ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AnalyticsArgs {
    /// Include the historical series
    #[arg(long, short = 's')]
    pub series: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config file with the given relay URL
    Init {
        /// Relay URL to store
        #[arg(long, default_value = soilwatch_core::DEFAULT_RELAY_URL)]
        url: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
