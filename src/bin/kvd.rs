use clap::Parser;
use overlay_kv::{DbService, ServiceConfig};
use std::env;
use std::path::PathBuf;
use tokio::signal;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file with service settings.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Flush to stable storage on every commit.
    #[arg(long)]
    sync_commits: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServiceConfig::from_file(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(dir) = args.data_dir.or_else(|| env::var("OVERLAY_KV_DATA_DIR").ok().map(PathBuf::from)) {
        config.data_dir = dir;
    }
    if args.sync_commits {
        config.sync_commits = true;
    }

    let mut service = DbService::new(config);
    service.start()?;
    println!("Overlay KV started. Database at {:?}", service.config().db_path());

    let handle = service.stop_handle();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            println!("\nShutdown signal received.");
            handle.stop();
        }
    });

    service.run().await;
    service.stop();
    println!("Closed. Exiting.");

    Ok(())
}
