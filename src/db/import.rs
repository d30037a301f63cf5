use std::path::PathBuf;

use clap::Parser;

use crate::store::import::{import, Snapshot};
use crate::store::Store;

/// Command line arguments for `db import` sub command.
#[derive(Parser, Debug)]
#[command(about = "Import a JSON snapshot into the entity store", long_about = None)]
pub struct Args {
    /// Path to the RocksDB directory.
    #[arg(long)]
    pub path_db: PathBuf,

    /// Path to the JSON snapshot.
    #[arg(long)]
    pub path_json: PathBuf,
}

pub fn run(_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("Reading snapshot {}...", args.path_json.display());
    let before = std::time::Instant::now();
    let snapshot = Snapshot::from_path(&args.path_json)?;
    let store = Store::open_and_init(&args.path_db)?;
    let stats = import(&store, snapshot)?;
    store.flush()?;
    tracing::info!(
        "... imported {} records, {} links and {} events in {:?}",
        stats.records,
        stats.links,
        stats.events,
        before.elapsed()
    );
    Ok(())
}
