//! Reset command - wipe learned values

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result, bail};
use clap::Parser;

use crate::{
    adapters::{JsonFileStore, LoopbackTransport},
    persist::{CancelToken, LocalBridge, NetworkBridge, QStore, UpdateQueue},
    q_learning::SharedTable,
    tictactoe::GameSpec,
};

#[derive(Parser, Debug)]
#[command(about = "Clear learned values, locally or in the shared store")]
pub struct ResetArgs {
    /// Shared store file; a timestamped backup is kept next to it
    #[arg(long, conflicts_with = "dir")]
    pub store: Option<PathBuf>,

    /// Local table directory
    #[arg(long)]
    pub dir: Option<PathBuf>,

    #[arg(long, default_value_t = 3)]
    pub grid: usize,

    #[arg(long, default_value_t = 3)]
    pub streak: usize,

    /// Local table name prefix
    #[arg(long, default_value = "q")]
    pub prefix: String,
}

pub fn execute(args: ResetArgs) -> Result<()> {
    let spec = GameSpec::new(args.grid, args.streak)?;
    let cancel = CancelToken::new();

    match (&args.store, &args.dir) {
        (Some(path), _) => {
            let store = Arc::new(Mutex::new(QStore::open(path)));
            let mut bridge = NetworkBridge::new(
                Box::new(LoopbackTransport::new(store)),
                spec.table_name(),
                SharedTable::default(),
                UpdateQueue::default(),
                cancel,
            );
            bridge
                .request_reset()
                .with_context(|| format!("Failed to reset store {}", path.display()))?;
            println!("Reset shared store {}", path.display());
        }
        (None, Some(dir)) => {
            let key = spec.namespaced(&args.prefix);
            let bridge = LocalBridge::new(
                Box::new(JsonFileStore::new(dir)),
                key.as_str(),
                SharedTable::default(),
                cancel,
            );
            bridge
                .reset()
                .with_context(|| format!("Failed to reset table {key}"))?;
            println!("Reset table {key} in {}", dir.display());
        }
        (None, None) => bail!("Nothing to reset: pass --store FILE or --dir DIR"),
    }
    Ok(())
}
