use clap::{Parser, Subcommand};
use overlay_kv::{BufferedStore, ServiceConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone)]
enum Commands {
    Get { key: String },
    Put { key: String, value: String },
    Del { key: String },
    Has { key: String },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = ServiceConfig::with_data_dir(cli.data_dir);
    let mut store = BufferedStore::open_with(config.db_path(), config.store_options())?;

    match cli.command {
        Commands::Get { key } => {
            let value = store.get(key.as_bytes())?;
            println!("{}", String::from_utf8_lossy(&value));
        }
        Commands::Put { key, value } => {
            store.put(key.as_bytes(), value.as_bytes());
            store.commit()?;
            println!("OK");
        }
        Commands::Del { key } => {
            store.delete(key.as_bytes());
            store.commit()?;
            println!("OK");
        }
        Commands::Has { key } => {
            println!("{}", store.contains(key.as_bytes())?);
        }
    }

    Ok(())
}
