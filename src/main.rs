use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;

use yougile_sync::backend::yougile::YougileClient;
use yougile_sync::config::Config;
use yougile_sync::constants::CONFIG_GENERATED;
use yougile_sync::logger;
use yougile_sync::sync::{SyncEvent, SyncOptions, SyncService};

#[derive(Parser, Debug)]
#[command(author, version, about = "Mirror a YouGile workspace into a relational database", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Keep running and sync on a fixed interval
    #[arg(long = "loop")]
    run_loop: bool,

    /// Loop interval in minutes, overrides sync.interval_minutes
    #[arg(long, value_name = "MINUTES")]
    interval_minutes: Option<u64>,

    /// Write a default configuration file to FILE and exit
    #[arg(long, value_name = "FILE")]
    generate_config: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = Config::load_from_file(path)?;
            config.apply_env_overrides();
            config
        }
        None => Config::load()?,
    };
    if let Some(minutes) = args.interval_minutes {
        config.sync.interval_minutes = minutes;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        // The run already reported its error through the log
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("❌ Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the sync run succeeded; `Err` is for setup failures.
async fn run(args: Args) -> Result<bool> {
    if let Some(path) = &args.generate_config {
        Config::generate_default_config(path)?;
        println!("{}: {}", CONFIG_GENERATED, path.display());
        return Ok(true);
    }

    let config = load_config(&args)?;
    logger::init(&config.logging)?;

    let credentials = config.credentials()?;
    let client = YougileClient::new(&credentials.api_token, &config.api)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                SyncEvent::Progress(message) => println!("{message}"),
                SyncEvent::Finished(summary) => println!("✅ Sync finished: {summary}"),
                // Already on stderr through the error log line
                SyncEvent::Failed(_) => {}
            }
        }
    });

    let service = SyncService::new(Arc::new(client), SyncOptions::from_config(&config, &credentials)).with_progress(tx);

    let succeeded = if args.run_loop {
        let interval = Duration::from_secs(config.sync.interval_minutes * 60);
        service.run_every(interval).await?;
        true
    } else {
        service.run_once().await.is_ok()
    };

    // Closing the channel lets the printer drain and stop
    drop(service);
    let _ = printer.await;

    Ok(succeeded)
}
