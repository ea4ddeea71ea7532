//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `clientbook_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use clientbook_core::db::migrations::latest_version;
use clientbook_core::db::open_db_in_memory;

fn main() {
    println!("clientbook_core ping={}", clientbook_core::ping());
    println!("clientbook_core version={}", clientbook_core::core_version());

    // Open a throwaway store so a broken schema fails here, not in the app.
    match open_db_in_memory() {
        Ok(_) => println!("clientbook_core schema_version={}", latest_version()),
        Err(err) => {
            eprintln!("clientbook_core schema bootstrap failed: {err}");
            std::process::exit(1);
        }
    }
}
