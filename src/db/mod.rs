//! Database access layer.
//!
//! - Shared connection lifecycle
//! - Catalog introspection
//! - The `Catalog` / `DdlSession` traits the engine runs against

pub mod connection;
pub mod schema;
pub mod session;

pub use connection::ConnectionManager;
pub use schema::SchemaInspector;
pub use session::{Catalog, DdlSession, get_column, resolve_tables};
