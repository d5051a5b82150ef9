use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod output;

#[derive(Parser)]
#[command(
    name = "hindsight",
    version,
    about = "Long-term memory for autonomous coding agents"
)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: output::OutputFormat,

    /// Memory snapshot file
    #[arg(
        long,
        global = true,
        env = "HINDSIGHT_MEMORY",
        default_value = ".hindsight/memory.json"
    )]
    memory: PathBuf,

    /// JSON config file overriding the defaults
    #[arg(long, global = true, env = "HINDSIGHT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Commands,
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let store = commands::MemoryFile::new(cli.memory, cli.config);
    match &cli.command {
        commands::Commands::Learn(args) => commands::learn::run(args, &store, cli.format),
        commands::Commands::Query(args) => commands::query::run(args, &store, cli.format),
        commands::Commands::CheckLoop(args) => commands::check_loop::run(args, &store, cli.format),
        commands::Commands::Consolidate => commands::consolidate::run(&store, cli.format),
        commands::Commands::Stats => commands::stats::run(&store, cli.format),
        commands::Commands::Mcp => commands::mcp::run(&store),
    }
}
