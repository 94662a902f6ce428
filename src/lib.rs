//! collation-fixer library
//!
//! Inspects and converts the character set and collation of MySQL/MariaDB
//! tables and columns, one schema at a time.

pub mod commands;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod format;
pub mod models;

pub use config::Config;
pub use engine::ConversionEngine;
pub use error::{FixerError, FixerResult};
