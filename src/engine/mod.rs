//! Conversion engine: decide, build DDL, execute.

pub mod eligibility;
pub mod executor;
pub mod statement;

pub use eligibility::{should_convert, table_decision};
pub use executor::ConversionEngine;
pub use statement::{build_column_conversion, build_table_conversion};
