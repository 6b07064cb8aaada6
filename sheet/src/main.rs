//! Character sheet manager, headless front end.
//!
//! A line-oriented interface over the character store, suitable for scripting
//! and automated testing:
//!
//! ```bash
//! SHEET_STORAGE=directory SHEET_DIR=./characters cargo run -p sheet
//! ```

mod headless;

use sheet_core::{CharacterStore, Persistence, SheetConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays a clean protocol stream.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sheet=info,sheet_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let config = match parse_config_from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    let backend = match config.open_backend().await {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("Failed to open storage: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(storage = %config.storage, "starting sheet");
    let mut store = CharacterStore::open(Persistence::new(backend)).await;
    headless::run_headless(&mut store).await?;
    Ok(())
}

/// Environment configuration with `--storage` and `--dir` overrides.
fn parse_config_from_args(args: &[String]) -> Result<SheetConfig, sheet_core::ConfigError> {
    let mut config = SheetConfig::from_env()?;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--storage" => {
                if let Some(kind) = args.get(i + 1) {
                    config.storage = kind.parse()?;
                    i += 1;
                }
            }
            "--dir" => {
                if let Some(dir) = args.get(i + 1) {
                    config.dir = dir.into();
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }

    Ok(config)
}

fn print_help() {
    println!("sheet - tabletop character sheet manager");
    println!();
    println!("USAGE:");
    println!("  sheet [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help          Show this help message");
    println!("  --storage <KIND>    directory or local (default: $SHEET_STORAGE or local)");
    println!("  --dir <PATH>        Storage directory (default: $SHEET_DIR or the platform data dir)");
    println!();
    println!("Commands are read from stdin, one per line. Type #help once running.");
}
