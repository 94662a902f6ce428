//! Data models for the collation fixer.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod conversion;
pub mod schema;

// Re-export commonly used types
pub use connection::{ConnectionOverrides, ConnectionSettings, ServerFlavor};
pub use conversion::{
    BatchReport, BatchState, ColumnSelection, ConversionItem, ConversionOptions,
    ConversionResult, ConversionTarget, DEFAULT_CHARSET, DEFAULT_COLLATION, Decision, Outcome,
    SkipReason, TableSelection, TransactionMode,
};
pub use schema::{ColumnDescriptor, TableDescriptor};
