use anyhow::Result;
use coz_process::cli;

// Main entry point
fn main() -> Result<()> {
    cli::handle_calls()
}
