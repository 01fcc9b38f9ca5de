//! # ses-pilot CLI
//!
//! The binary is intentionally thin: the CLI lives in `cli/`, while this file only
//! invokes `cli::run()` and handles process termination.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (src/sespilot/cli/)                              │
//! │  - clap argument parsing and grouped help (setup.rs)        │
//! │  - Config resolution + dispatch (commands.rs)               │
//! │  - Terminal rendering and --json output (render.rs)         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  sespilot library (api.rs → commands/ → store/, remote/)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything from `api.rs` inward is UI agnostic. `ses-pilot serve` hands the
//! same API to the library's `web` module instead of rendering it here.
//!
//! ## Testing Approach
//!
//! - **Library**: unit tests next to each command, against in-memory fakes.
//! - **Binary**: `tests/cli_e2e.rs` runs the built binary in a temp directory
//!   with a scripted stand-in for the `aws` CLI.

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
