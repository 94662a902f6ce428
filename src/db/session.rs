//! Seams between the conversion engine and the database.
//!
//! The engine only needs to read the catalog and to run DDL inside explicit
//! transactions. Both are expressed as traits so the engine stays independent
//! of the driver; [`MySqlConnection`] implements them for real servers.

use crate::db::schema::SchemaInspector;
use crate::error::{FixerError, FixerResult};
use crate::models::{ColumnDescriptor, ServerFlavor, TableDescriptor};
use sqlx::MySqlConnection;
use std::future::Future;
use tracing::debug;

/// Read access to table and column metadata.
pub trait Catalog {
    /// Tables with their default charset/collation. An empty result is not an error.
    fn list_tables(
        &mut self,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> impl Future<Output = FixerResult<Vec<TableDescriptor>>>;

    /// Columns in catalog order. An empty result is not an error.
    fn list_columns(
        &mut self,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> impl Future<Output = FixerResult<Vec<ColumnDescriptor>>>;

    /// Which server family the catalog text comes from.
    fn server_flavor(&mut self) -> impl Future<Output = FixerResult<ServerFlavor>>;
}

/// Statement execution with explicit transaction control.
pub trait DdlSession {
    fn begin(&mut self) -> impl Future<Output = FixerResult<()>>;

    fn commit(&mut self) -> impl Future<Output = FixerResult<()>>;

    fn rollback(&mut self) -> impl Future<Output = FixerResult<()>>;

    /// Run one DDL statement and wait for it to finish.
    fn execute_ddl(&mut self, sql: &str) -> impl Future<Output = FixerResult<()>>;
}

impl Catalog for MySqlConnection {
    async fn list_tables(
        &mut self,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> FixerResult<Vec<TableDescriptor>> {
        SchemaInspector::list_tables(self, schema, table).await
    }

    async fn list_columns(
        &mut self,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> FixerResult<Vec<ColumnDescriptor>> {
        SchemaInspector::list_columns(self, schema, table).await
    }

    async fn server_flavor(&mut self) -> FixerResult<ServerFlavor> {
        SchemaInspector::server_flavor(self).await
    }
}

impl DdlSession for MySqlConnection {
    async fn begin(&mut self) -> FixerResult<()> {
        sqlx::raw_sql("START TRANSACTION").execute(&mut *self).await?;
        Ok(())
    }

    async fn commit(&mut self) -> FixerResult<()> {
        sqlx::raw_sql("COMMIT").execute(&mut *self).await?;
        Ok(())
    }

    async fn rollback(&mut self) -> FixerResult<()> {
        sqlx::raw_sql("ROLLBACK").execute(&mut *self).await?;
        Ok(())
    }

    async fn execute_ddl(&mut self, sql: &str) -> FixerResult<()> {
        debug!(sql = %sql, "Executing DDL");
        sqlx::raw_sql(sql).execute(&mut *self).await?;
        Ok(())
    }
}

/// Find one column by name (case-insensitive).
pub async fn get_column<C: Catalog>(
    catalog: &mut C,
    schema: &str,
    table: &str,
    column: &str,
) -> FixerResult<ColumnDescriptor> {
    catalog
        .list_columns(Some(schema), Some(table))
        .await?
        .into_iter()
        .find(|c| c.column.eq_ignore_ascii_case(column))
        .ok_or_else(|| FixerError::column_not_found(table, column))
}

/// Look up explicitly named tables, preserving the caller's order.
pub async fn resolve_tables<C: Catalog>(
    catalog: &mut C,
    schema: &str,
    names: &[String],
) -> FixerResult<Vec<TableDescriptor>> {
    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let found = catalog
            .list_tables(Some(schema), Some(name))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| FixerError::table_not_found(schema, name))?;
        tables.push(found);
    }
    Ok(tables)
}
