//! Command-line front end for pixkit
//!
//! Only available with the "cli" feature.

mod config;
#[path = "main.rs"]
mod main_impl;

pub use main_impl::{main, CacheAction, Cli, CliOutputFormat, Command};
