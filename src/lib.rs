//! tvly library
//!
//! Typed client for the Tavily search, extract, crawl and usage endpoints,
//! plus the command-line layer built on it.

pub mod api;
pub mod cli;
pub mod config;
pub mod logging;
pub mod output;
pub mod save;
