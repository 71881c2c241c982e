#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use clap::{Parser, Subcommand};
use ripecheck::lens::ripestat::{CheckArgs, RipestatLens};
use ripecheck::lens::utils::OutputFormat;
use ripecheck::RipecheckConfig;
use tracing::{info, Level};

mod commands;

use commands::methodology::MethodologyArgs;
use commands::query::QueryArgs;
use commands::resolve::ResolveArgs;
use commands::upstreams::UpstreamsArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.ripecheck/ripecheck.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// Output format: table, markdown, json, json-pretty, json-line, psv
    #[clap(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    /// Timeout of the first attempt of each data call, e.g. 10s or 1500ms
    #[clap(long, global = true)]
    timeout: Option<humantime::Duration>,

    /// Number of retries after a failed attempt; each retry doubles the timeout
    #[clap(long, global = true)]
    retries: Option<u32>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check announced prefixes, RPKI validity and registry consistency of a resource.
    Check(CheckArgs),

    /// Resolve an ASN, IP address or prefix to its origin ASN.
    Resolve(ResolveArgs),

    /// Issue a single data call and print the decoded result.
    Query(QueryArgs),

    /// Show the upstream ASNs seen in BGP for each prefix of a resource.
    Upstreams(UpstreamsArgs),

    /// Print the documentation URL of a data call.
    Methodology(MethodologyArgs),
}

/// Tracing is only installed with `--debug`; it then includes per-URL logs
fn log_level(debug: bool) -> Option<Level> {
    debug.then_some(Level::DEBUG)
}

fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Some(level) = log_level(cli.debug) {
        tracing_subscriber::fmt()
            // filter spans/events with level DEBUG or higher.
            .with_max_level(level)
            .init();
    }

    let config = match RipecheckConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    // command line flags take precedence over the configuration file
    let mut options = config.request_options();
    if let Some(timeout) = cli.timeout {
        options.timeout = timeout.into();
    }
    if let Some(retries) = cli.retries {
        options.max_retries = retries;
    }
    info!(
        "using {} with timeout {} and {} retries",
        config.base_url,
        humantime::format_duration(options.timeout),
        options.max_retries
    );

    let lens = RipestatLens::new()
        .with_options(options)
        .with_base_url(config.base_url.as_str());

    match cli.command {
        Commands::Check(args) => commands::check::run(&lens, args, cli.format),
        Commands::Resolve(args) => commands::resolve::run(&lens, args, cli.format),
        Commands::Query(args) => commands::query::run(&lens, args, cli.format),
        Commands::Upstreams(args) => commands::upstreams::run(&lens, args, cli.format),
        Commands::Methodology(args) => commands::methodology::run(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(false), None);
        assert_eq!(log_level(true), Some(Level::DEBUG));
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "ripecheck",
            "--debug",
            "check",
            "AS3333",
            "--timeout",
            "1500ms",
            "--retries",
            "2",
            "--format",
            "psv",
        ]);
        assert!(cli.debug);
        assert_eq!(cli.format, OutputFormat::Psv);
        assert_eq!(
            cli.timeout.map(|timeout| *timeout),
            Some(std::time::Duration::from_millis(1500))
        );
        assert_eq!(cli.retries, Some(2));
        assert!(matches!(cli.command, Commands::Check(ref args) if args.resource == "AS3333"));
    }
}
