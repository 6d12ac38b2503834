//! clubhouse-snapshot: dump stored collections as JSON
//!
//! Reads every registered collection (or the ones named on the command
//! line) from the configured backend and prints the snapshot to stdout.
//!
//! ## Configuration
//! - CLUBHOUSE_CONFIG: Path to a YAML configuration file (optional)
//! - CLUBHOUSE__STORAGE__BACKEND: `sqlite` or `postgres`
//! - CLUBHOUSE_LOG: Log filter (default: info), logs go to stderr

use tracing::info;

use clubhouse::config::Config;
use clubhouse::repository::SnapshotReader;
use clubhouse::utils::bootstrap::{init_tracing, select_configured_backend};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::load(None)?;
    let backend = select_configured_backend(&config).await?;

    let names: Vec<String> = std::env::args().skip(1).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let filter = (!names.is_empty()).then_some(names.as_slice());

    let snapshot = SnapshotReader::new(backend).read(filter).await;
    info!(collections = snapshot.len(), "Snapshot read");

    println!("{}", serde_json::to_string_pretty(&snapshot.to_json())?);
    Ok(())
}
