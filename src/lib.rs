//! shop-notify - notification rule engine for multi-tenant shops
//!
//! Shops publish typed events; scripts made of condition-guarded steps react
//! to them by sending email, adding log entries and raising in-app
//! notifications. The crate ships the engine, a SQLite store and a CLI.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod notify;
pub mod output;
pub mod storage;

pub use cli::args::{Cli, Commands, OutputFormat};
pub use error::NotifyError;
pub use notify::{Event, Registry, Runner, Script};
