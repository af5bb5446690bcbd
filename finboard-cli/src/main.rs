//! `finboard` - probe JSON APIs and watch dashboards from a terminal.

#![allow(clippy::print_stdout, reason = "CLI tool outputs to stdout")]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use finboard_types::DisplayMode;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "finboard", author, version, about, long_about = None)]
struct Cli {
    /// Log filter (e.g. `debug`, `finboard_core=trace`); defaults to RUST_LOG, then info
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Dashboard file (defaults to FINBOARD_CONFIG, then the user data dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Header-based API key, attached only when both parts are given.
#[derive(Args, Debug, Clone, Default)]
struct AuthArgs {
    /// API key value
    #[arg(long)]
    key: Option<String>,
    /// Header that carries the key (e.g. `X-Api-Key`)
    #[arg(long)]
    header: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ModeArg {
    Card,
    Table,
    Chart,
}

impl From<ModeArg> for DisplayMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Card => DisplayMode::Card,
            ModeArg::Table => DisplayMode::Table,
            ModeArg::Chart => DisplayMode::Chart,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch a URL once and print the discovered field tree
    Probe {
        url: String,
        #[command(flatten)]
        auth: AuthArgs,
        /// Hide array summaries reached directly; nested fields stay listed
        #[arg(long)]
        arrays_only: bool,
        /// Print descriptors as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch a URL once and print the value at each path
    Get {
        url: String,
        #[arg(required = true)]
        paths: Vec<String>,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Run every widget of the dashboard and print refreshes until Ctrl-C
    Watch {
        /// Persist responses on disk, under DIR or the user data dir when DIR is omitted
        #[arg(long, value_name = "DIR")]
        cache_dir: Option<Option<PathBuf>>,
    },
    /// Append a widget to the dashboard
    Add {
        name: String,
        url: String,
        /// Selected field, repeatable: `PATH` or `PATH=Display Name`
        #[arg(long = "field", value_name = "PATH[=DISPLAY]", required = true)]
        fields: Vec<String>,
        #[command(flatten)]
        auth: AuthArgs,
        /// Auto-refresh interval in seconds, 0 disables
        #[arg(long, default_value_t = 30)]
        interval: u64,
        /// Cache TTL in seconds, 0 disables caching
        #[arg(long, default_value_t = 30)]
        ttl: u64,
        #[arg(long, value_enum, default_value_t = ModeArg::Card)]
        mode: ModeArg,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    finboard_core::modules::init_logging(cli.log_level.as_deref());

    match cli.command {
        Commands::Probe { url, auth, arrays_only, json } => {
            commands::probe(&url, &auth, arrays_only, json).await
        },
        Commands::Get { url, paths, auth } => commands::get(&url, &paths, &auth).await,
        Commands::Watch { cache_dir } => commands::watch(cli.config.as_deref(), cache_dir).await,
        Commands::Add { name, url, fields, auth, interval, ttl, mode } => commands::add(
            cli.config.as_deref(),
            commands::NewWidget { name, url, fields, auth, interval, ttl, mode: mode.into() },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add() {
        let cli = Cli::try_parse_from([
            "finboard",
            "--config",
            "/tmp/d.json",
            "add",
            "Quote",
            "https://finnhub.io/api/v1/quote?symbol=AAPL",
            "--field",
            "c=Price",
            "--field",
            "dp",
            "--key",
            "k",
            "--header",
            "X-Finnhub-Token",
            "--mode",
            "table",
        ])
        .unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/d.json")));
        match cli.command {
            Commands::Add { fields, auth, interval, mode, .. } => {
                assert_eq!(fields, vec!["c=Price", "dp"]);
                assert_eq!(auth.header.as_deref(), Some("X-Finnhub-Token"));
                assert_eq!(interval, 30);
                assert!(matches!(mode, ModeArg::Table));
            },
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_watch_cache_dir() {
        fn parse(args: &[&str]) -> Option<Option<PathBuf>> {
            match Cli::try_parse_from(args).unwrap_or_else(|e| panic!("{e}")).command {
                Commands::Watch { cache_dir } => cache_dir,
                other => panic!("unexpected command {other:?}"),
            }
        }

        assert_eq!(parse(&["finboard", "watch"]), None);
        assert_eq!(parse(&["finboard", "watch", "--cache-dir"]), Some(None));
        assert_eq!(
            parse(&["finboard", "watch", "--cache-dir", "/tmp/fb"]),
            Some(Some(PathBuf::from("/tmp/fb")))
        );
    }

    #[test]
    fn test_get_requires_paths() {
        assert!(Cli::try_parse_from(["finboard", "get", "https://example.com"]).is_err());
    }
}
