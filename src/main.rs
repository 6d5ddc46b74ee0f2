use channel_dl::config::API_KEY_ENV;
use channel_dl::{BatchOrchestrator, Config, ConsoleReporter, EnumerationPolicy, Result};
use clap::{ArgAction, CommandFactory, Parser};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Download every video of a YouTube channel as merged mp4 files
#[derive(Parser, Debug)]
#[command(name = "channel-dl", version, about)]
struct Args {
    /// Channel handle (@name), legacy username or channel id
    channel: Option<String>,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory under which the channel folder is created
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Catalog API key
    #[arg(long, value_name = "KEY", env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// List the channel's videos with their durations instead of downloading
    #[arg(long)]
    list: bool,

    /// Keep going with the pages already listed when a listing page fails
    #[arg(long)]
    partial_enumeration: bool,

    /// Do not print transfer progress
    #[arg(short, long)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let Some(channel) = args.channel.clone() else {
        let mut command = Args::command();
        if command.print_help().is_ok() {
            println!();
        }
        return;
    };

    init_logging(args.verbose);

    if let Err(e) = run(&args, &channel).await {
        error!(error = %e, "channel-dl failed");
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose > 1),
        )
        .init();
}

/// Build the configuration: file, then environment, then command line
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.apply_env();

    if let Some(key) = &args.api_key {
        config.api.api_key = Some(key.clone());
    }
    if let Some(dir) = &args.output_dir {
        config.download.output_root = dir.clone();
    }
    if args.partial_enumeration {
        config.download.enumeration_policy = EnumerationPolicy::Partial;
    }

    config.validate()?;
    Ok(config)
}

async fn run(args: &Args, channel: &str) -> Result<()> {
    let config = load_config(args)?;

    // Progress lines and event lines share one console writer
    let reporter = if args.quiet {
        ConsoleReporter::stdout().without_progress()
    } else {
        ConsoleReporter::stdout()
    };
    let batch = BatchOrchestrator::from_config(&config, Arc::new(reporter))?;

    if args.list {
        let details = batch.list_details(channel).await?;
        for (position, entry) in details.iter().enumerate() {
            let duration = entry
                .duration
                .map(clock)
                .unwrap_or_else(|| "--:--".to_string());
            println!("{:>4}. [{}] {}", position + 1, duration, entry.item.title);
        }
        return Ok(());
    }

    let result = batch.run(channel, &config.download.output_root).await?;
    for outcome in result.outcomes.iter().filter(|o| !o.is_success()) {
        let item = outcome.item();
        eprintln!("Failed: {} ({})", item.title, item.video_id);
    }
    Ok(())
}

/// `H:MM:SS`, or `M:SS` under an hour
fn clock(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (h, m, s) = (secs / 3600, secs % 3600 / 60, secs % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
