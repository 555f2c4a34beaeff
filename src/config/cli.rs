use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the Folio reader.
#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Terminal reader for a Folio site")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "FOLIO_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render a route once.
    Read(ReadArgs),
    /// Render a route and keep refreshing it, printing change notices.
    Watch(WatchArgs),
    /// Run the server pass for a route and print the handoff payload as JSON.
    Prerender(PrerenderArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the content API base URL.
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// API token; its presence makes the viewer privileged.
    #[arg(long = "token", value_name = "TOKEN", global = true)]
    pub token: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct RouteArgs {
    /// Route to open, e.g. `/notes/42`, `/notes/latest` or `/pages/about`.
    #[arg(value_name = "ROUTE")]
    pub route: String,

    /// Password for a protected note.
    #[arg(long = "password", value_name = "PASSWORD")]
    pub password: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct ReadArgs {
    #[command(flatten)]
    pub target: RouteArgs,

    /// Hydrate from a handoff payload produced by `prerender`.
    #[arg(long = "handoff", value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub handoff: Option<PathBuf>,

    /// Toggle the like marker of the note after rendering it.
    #[arg(long = "like", action = clap::ArgAction::SetTrue)]
    pub like: bool,
}

#[derive(Debug, Args, Clone)]
pub struct WatchArgs {
    #[command(flatten)]
    pub target: RouteArgs,

    /// Override the refresh interval.
    #[arg(long = "interval-seconds", value_name = "SECONDS")]
    pub interval_seconds: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct PrerenderArgs {
    #[command(flatten)]
    pub target: RouteArgs,

    /// Write the payload to a file instead of stdout.
    #[arg(long = "output", value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

impl Command {
    pub fn target(&self) -> &RouteArgs {
        match self {
            Command::Read(args) => &args.target,
            Command::Watch(args) => &args.target,
            Command::Prerender(args) => &args.target,
        }
    }
}
