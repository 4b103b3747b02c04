use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser};
use liveboard::Config;
use liveboard::session::run_loopback;

#[derive(Parser, Debug)]
#[command(name = "liveboard")]
#[command(version, about = "Live cursors, chat bubbles and reactions for a shared canvas")]
struct Cli {
    /// Print the effective configuration as TOML and exit
    #[arg(long, action = ArgAction::SetTrue)]
    print_config: bool,

    /// Write a documented default config file and exit
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "print_config")]
    init_config: bool,

    /// Run two participants in an in-process room for the given milliseconds
    #[arg(long, value_name = "MS")]
    simulate: Option<u64>,

    /// Read configuration from this file instead of the default location
    #[arg(long, short = 'c', value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    if cli.init_config {
        let path = Config::create_default_file()?;
        println!("Created {}", path.display());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if cli.print_config {
        print!("{}", config.to_toml()?);
    } else if let Some(duration_ms) = cli.simulate {
        simulate(&config, Duration::from_millis(duration_ms))?;
    } else {
        // No flags: show usage
        println!("liveboard: Live cursors, chat bubbles and reactions for a shared canvas");
        println!();
        println!("Usage:");
        println!("  liveboard --print-config     Print the effective configuration");
        println!("  liveboard --init-config      Write a default config file");
        println!("  liveboard --simulate <MS>    Run a two-participant loopback room");
        println!("  liveboard --help             Show help");
        println!();
        println!("Config file:");
        println!("  $XDG_CONFIG_HOME/liveboard/config.toml (override with --config)");
    }

    Ok(())
}

fn simulate(config: &Config, duration: Duration) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to start runtime")?;
    let local = tokio::task::LocalSet::new();

    log::info!("Starting loopback simulation");
    let report = local.block_on(&runtime, run_loopback(config, duration))?;

    println!("Simulated {} ms", report.duration.as_millis());
    println!("  reactions held by sender:   {}", report.sender_reactions);
    println!("  reactions held by receiver: {}", report.receiver_reactions);
    match report.peer_cursor {
        Some(point) => println!("  sender cursor seen at:      ({}, {})", point.x, point.y),
        None => println!("  sender cursor seen at:      none"),
    }
    println!(
        "  receiver message seen:      {}",
        report.peer_message.as_deref().unwrap_or("none")
    );
    Ok(())
}
