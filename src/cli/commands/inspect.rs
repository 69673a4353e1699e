//! Inspect command - summarize a stored value table

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;

use crate::{
    adapters::JsonFileStore,
    cli::output::{format_number, print_kv, print_section, print_subsection},
    ports::TableStore,
    q_learning::ValueTable,
    tictactoe::GameSpec,
};

#[derive(Parser, Debug)]
#[command(about = "Show what a stored value table has learned")]
pub struct InspectArgs {
    /// Table directory
    #[arg(long, default_value = "tables")]
    pub dir: PathBuf,

    #[arg(long, default_value_t = 3)]
    pub grid: usize,

    #[arg(long, default_value_t = 3)]
    pub streak: usize,

    /// Table name prefix
    #[arg(long, default_value = "q")]
    pub prefix: String,

    /// Number of entries to list
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

/// Highest-valued `(state, action, value)` entries, best first
pub fn top_entries(table: &ValueTable, k: usize) -> Vec<(String, String, f64)> {
    let mut entries: Vec<_> = table
        .iter()
        .flat_map(|(state, actions)| {
            actions
                .iter()
                .map(move |(action, value)| (state.to_string(), action.to_string(), *value))
        })
        .collect();
    entries.sort_by(|a, b| {
        b.2.total_cmp(&a.2)
            .then_with(|| a.0.cmp(&b.0))
            .then_with(|| a.1.cmp(&b.1))
    });
    entries.truncate(k);
    entries
}

pub fn execute(args: InspectArgs) -> Result<()> {
    let spec = GameSpec::new(args.grid, args.streak)?;
    let key = spec.namespaced(&args.prefix);
    let store = JsonFileStore::new(&args.dir);
    let Some(table) = store
        .load(&key)
        .with_context(|| format!("Failed to read table {key}"))?
    else {
        bail!("No table {key} under {}", args.dir.display());
    };

    print_section(&format!("Table {key}"));
    print_kv("File", &store.path_for(&key).display().to_string());
    print_kv("States", &format_number(table.len()));
    print_kv("Entries", &format_number(table.entry_count()));

    print_subsection(&format!("Top {} entries", args.top));
    for (state, action, value) in top_entries(&table, args.top) {
        println!("  {state:>20}  {action:>7}  {value:>10.3}");
    }
    Ok(())
}
