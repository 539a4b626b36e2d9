//! `segget forget <file>` – drop a saved record.

use anyhow::Result;
use segget_core::state_store::StateStore;

pub fn run_forget(store: &StateStore, file_name: &str) -> Result<()> {
    if store.forget(file_name)? {
        println!("Forgot saved progress for {}.", file_name);
    } else {
        println!("No saved progress for {}.", file_name);
    }
    Ok(())
}
