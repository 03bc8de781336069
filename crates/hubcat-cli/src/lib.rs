//! hubcat command line interface
//!
//! The binary in `main.rs` parses [`cli::Cli`], opens a [`context::Catalog`]
//! and dispatches to one module under [`commands`].

pub mod cli;
pub mod commands;
pub mod context;
pub mod logging;
pub mod output;
