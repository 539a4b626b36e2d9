//! `segget status` – show saved progress for every tracked file.

use anyhow::Result;
use segget_core::ledger::TerminalState;
use segget_core::state_store::StateStore;

pub fn run_status(store: &StateStore) -> Result<()> {
    let records = store.list()?;
    if records.is_empty() {
        println!("No saved downloads.");
        return Ok(());
    }
    println!("{:<32} {:<12} {:<9} {}", "FILE", "SIZE", "DONE", "URL");
    for (name, rec) in records {
        println!(
            "{:<32} {:<12} {:<9} {}",
            name,
            rec.total_size,
            format!("{}/{}", rec.complete_count(), rec.segment_count),
            rec.url
        );
        for part in &rec.parts {
            let state = match part.state {
                TerminalState::Complete => "complete",
                TerminalState::Incomplete => "incomplete",
            };
            println!("    #{:<3} {:<10} {}", part.id, state, part.range);
        }
    }
    Ok(())
}
