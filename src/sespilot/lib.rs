//! # ses-pilot Architecture
//!
//! ses-pilot manages AWS SES email templates and custom verification templates
//! kept as directories on disk, and pushes/pulls them through the `aws` CLI.
//! It is a library with two clients: the terminal CLI and the `serve` JSON API.
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, web/, wired by main.rs)                   │
//! │  - Parses arguments, formats output, serves HTTP routes     │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade over commands                                │
//! │  - Holds the resolved config, store and SES client          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Business logic, returns CmdResult                        │
//! └─────────────────────────────────────────────────────────────┘
//!                 │                              │
//!                 ▼                              ▼
//! ┌───────────────────────────────┐ ┌───────────────────────────┐
//! │  Storage Layer (store/)       │ │  Remote Layer (remote/)   │
//! │  TemplateStore trait          │ │  SesClient trait          │
//! │  FileStore, InMemoryStore     │ │  AwsCli, FakeSes          │
//! └───────────────────────────────┘ └───────────────────────────┘
//! ```
//!
//! ## Key Principle: No I/O Assumptions in Core
//!
//! From `api.rs` inward, code takes regular Rust arguments and returns
//! `Result<CmdResult>`. It never prints and never exits the process. Talking to
//! SES is the one side effect, and it sits behind [`remote::SesClient`].
//!
//! ## Testing Strategy
//!
//! 1. **Commands**: unit tests against `InMemoryStore` and `FakeSes`. Most tests live here.
//! 2. **API**: dispatch tests.
//! 3. **Store / remote**: `FileStore` against a temp dir, `AwsCli` argument and
//!    output handling.
//! 4. **Binary**: `tests/` drives the real binary with a fake `aws` script.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade
//! - [`commands`]: Business logic for each command
//! - [`store`]: Local template storage
//! - [`remote`]: SES access through the `aws` CLI
//! - [`sync`]: Local/remote comparison
//! - [`manifest`]: `template.json`, `verification-template.json` and `send-email.json`
//! - [`html`]: Collapse, minify, format and entity helpers
//! - [`model`]: Tree nodes, kinds and sync statuses
//! - [`config`]: Config discovery and editing
//! - [`editor`]: External editor integration
//! - [`web`]: JSON routes for `serve`
//! - [`error`]: Error types

pub mod api;
pub mod commands;
pub mod config;
pub mod editor;
pub mod error;
pub mod html;
pub mod manifest;
pub mod model;
pub mod remote;
pub mod store;
pub mod sync;
pub mod web;
