//! Terminal client: argument parsing in `setup`, dispatch in `commands`,
//! output in `render`.

mod commands;
mod render;
pub mod setup;

pub use commands::run;
