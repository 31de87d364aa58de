//! Kodegen Bundler Package - packaging pipeline for desktop applications.
//!
//! This binary turns a staged application directory into per-architecture
//! output directories and builds the requested targets from them.

use kodegen_bundler_package::cli;
use std::process;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Run CLI and get exit code
    let exit_code = match cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            for suggestion in e.recovery_suggestions() {
                eprintln!("  hint: {suggestion}");
            }
            1
        }
    };

    process::exit(exit_code);
}
