//! Catalog introspection.
//!
//! Reads table and column descriptors from `INFORMATION_SCHEMA`. Both queries
//! join the collation-to-charset map so a descriptor's charset always pairs
//! with its collation, instead of trusting two catalog columns separately.

use crate::error::FixerResult;
use crate::models::{ColumnDescriptor, ServerFlavor, TableDescriptor};
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlConnection, QueryBuilder, Row};
use tracing::debug;

/// Schema inspector for charset/collation metadata.
pub struct SchemaInspector;

impl SchemaInspector {
    /// List base tables with their default collation and charset.
    ///
    /// Omitting both filters lists every table on the server.
    pub async fn list_tables(
        conn: &mut MySqlConnection,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> FixerResult<Vec<TableDescriptor>> {
        let mut builder = QueryBuilder::<MySql>::new(queries::LIST_TABLES);
        push_filters(&mut builder, "T", true, schema, table);
        builder.push(" ORDER BY T.TABLE_SCHEMA, T.TABLE_NAME");

        let rows = builder.build().fetch_all(&mut *conn).await?;
        let tables = rows
            .iter()
            .filter_map(|row| {
                let name = get_string(row, "TABLE_NAME");
                if name.is_empty() {
                    return None;
                }
                Some(TableDescriptor {
                    schema: get_string(row, "TABLE_SCHEMA"),
                    name,
                    collation: get_string(row, "TABLE_COLLATION"),
                    character_set: get_string(row, "CHARACTER_SET_NAME"),
                })
            })
            .collect::<Vec<_>>();

        debug!(
            count = tables.len(),
            schema = ?schema,
            table = ?table,
            "Listed MySQL tables"
        );
        Ok(tables)
    }

    /// List columns in catalog order (schema, table, ordinal position).
    pub async fn list_columns(
        conn: &mut MySqlConnection,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> FixerResult<Vec<ColumnDescriptor>> {
        let mut builder = QueryBuilder::<MySql>::new(queries::LIST_COLUMNS);
        push_filters(&mut builder, "C", false, schema, table);
        builder.push(" ORDER BY C.TABLE_SCHEMA, C.TABLE_NAME, C.ORDINAL_POSITION");

        let rows = builder.build().fetch_all(&mut *conn).await?;
        let columns = rows.iter().map(column_from_row).collect::<Vec<_>>();

        debug!(
            count = columns.len(),
            schema = ?schema,
            table = ?table,
            "Listed MySQL columns"
        );
        Ok(columns)
    }

    /// Classify the server from `VERSION()`.
    pub async fn server_flavor(conn: &mut MySqlConnection) -> FixerResult<ServerFlavor> {
        let version = sqlx::query_scalar::<_, String>("SELECT VERSION()")
            .fetch_one(&mut *conn)
            .await?;
        let flavor = ServerFlavor::from_version(&version);
        debug!(version = %version, flavor = %flavor, "Detected server flavor");
        Ok(flavor)
    }
}

// =============================================================================
// SQL Query Templates
// =============================================================================

mod queries {
    pub const LIST_TABLES: &str = r#"
        SELECT
            CONVERT(T.TABLE_SCHEMA USING utf8mb4) AS TABLE_SCHEMA,
            CONVERT(T.TABLE_NAME USING utf8mb4) AS TABLE_NAME,
            CONVERT(T.TABLE_COLLATION USING utf8mb4) AS TABLE_COLLATION,
            CONVERT(CCSA.CHARACTER_SET_NAME USING utf8mb4) AS CHARACTER_SET_NAME
        FROM information_schema.TABLES T
        JOIN information_schema.COLLATION_CHARACTER_SET_APPLICABILITY CCSA
            ON CCSA.COLLATION_NAME = T.TABLE_COLLATION
        WHERE T.TABLE_TYPE = 'BASE TABLE'"#;

    /// Left join: columns without a collation (numeric, binary, temporal)
    /// are still listed, with no charset.
    pub const LIST_COLUMNS: &str = r#"
        SELECT
            CONVERT(C.TABLE_SCHEMA USING utf8mb4) AS TABLE_SCHEMA,
            CONVERT(C.TABLE_NAME USING utf8mb4) AS TABLE_NAME,
            CONVERT(C.COLUMN_NAME USING utf8mb4) AS COLUMN_NAME,
            CONVERT(C.COLUMN_DEFAULT USING utf8mb4) AS COLUMN_DEFAULT,
            CONVERT(C.IS_NULLABLE USING utf8mb4) AS IS_NULLABLE,
            CONVERT(C.DATA_TYPE USING utf8mb4) AS DATA_TYPE,
            C.CHARACTER_MAXIMUM_LENGTH AS CHARACTER_MAXIMUM_LENGTH,
            CONVERT(C.COLUMN_TYPE USING utf8mb4) AS COLUMN_TYPE,
            CONVERT(C.COLUMN_KEY USING utf8mb4) AS COLUMN_KEY,
            CONVERT(C.EXTRA USING utf8mb4) AS EXTRA,
            CONVERT(C.COLUMN_COMMENT USING utf8mb4) AS COLUMN_COMMENT,
            CONVERT(C.COLLATION_NAME USING utf8mb4) AS COLLATION_NAME,
            CONVERT(CCSA.CHARACTER_SET_NAME USING utf8mb4) AS CHARACTER_SET_NAME
        FROM information_schema.COLUMNS C
        LEFT JOIN information_schema.COLLATION_CHARACTER_SET_APPLICABILITY CCSA
            ON CCSA.COLLATION_NAME = C.COLLATION_NAME"#;
}

/// Append optional schema/table filters as bound parameters.
///
/// `has_where` is set when the base query already carries a `WHERE` clause.
fn push_filters(
    builder: &mut QueryBuilder<'_, MySql>,
    alias: &str,
    has_where: bool,
    schema: Option<&str>,
    table: Option<&str>,
) {
    let mut keyword = if has_where { " AND " } else { " WHERE " };
    if let Some(schema) = schema.filter(|s| !s.is_empty()) {
        builder
            .push(keyword)
            .push(format!("{alias}.TABLE_SCHEMA = "))
            .push_bind(schema.to_string());
        keyword = " AND ";
    }
    if let Some(table) = table.filter(|t| !t.is_empty()) {
        builder
            .push(keyword)
            .push(format!("{alias}.TABLE_NAME = "))
            .push_bind(table.to_string());
    }
}

fn column_from_row(row: &MySqlRow) -> ColumnDescriptor {
    ColumnDescriptor {
        schema: get_string(row, "TABLE_SCHEMA"),
        table: get_string(row, "TABLE_NAME"),
        column: get_string(row, "COLUMN_NAME"),
        default_value: get_optional_string(row, "COLUMN_DEFAULT"),
        nullable: get_string(row, "IS_NULLABLE").eq_ignore_ascii_case("YES"),
        data_type: get_string(row, "DATA_TYPE"),
        max_length: try_get_u64(row, "CHARACTER_MAXIMUM_LENGTH"),
        column_type: get_string(row, "COLUMN_TYPE"),
        column_key: non_empty(get_optional_string(row, "COLUMN_KEY")),
        extra: non_empty(get_optional_string(row, "EXTRA")),
        comment: get_optional_string(row, "COLUMN_COMMENT").filter(|c| !c.is_empty()),
        collation: non_empty(get_optional_string(row, "COLLATION_NAME")),
        character_set: non_empty(get_optional_string(row, "CHARACTER_SET_NAME")),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Try to get a u64 value from a row, handling MySQL version differences.
/// MySQL 5.x may return BIGINT (i64), MySQL 8.x returns BIGINT UNSIGNED (u64).
fn try_get_u64(row: &MySqlRow, column: &str) -> Option<u64> {
    if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(column) {
        return Some(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(column) {
        return Some(v as u64);
    }
    None
}

/// Safely get a string from a MySQL row.
/// MySQL may return VARBINARY instead of VARCHAR depending on charset configuration.
fn get_string(row: &MySqlRow, column: &str) -> String {
    get_optional_string(row, column).unwrap_or_default()
}

/// Safely get an optional string from a MySQL row.
fn get_optional_string(row: &MySqlRow, column: &str) -> Option<String> {
    row.try_get::<Option<String>, _>(column)
        .ok()
        .flatten()
        .or_else(|| {
            row.try_get::<Option<Vec<u8>>, _>(column)
                .ok()
                .flatten()
                .and_then(|bytes| String::from_utf8(bytes).ok())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_filters_extend_existing_where() {
        let mut builder = QueryBuilder::<MySql>::new(queries::LIST_TABLES);
        push_filters(&mut builder, "T", true, Some("app"), Some("users"));
        let sql = builder.sql().to_string();
        assert!(sql.ends_with("AND T.TABLE_SCHEMA = ? AND T.TABLE_NAME = ?"));
        assert_eq!(sql.matches("WHERE").count(), 1);
    }

    #[test]
    fn test_column_filters_open_where_clause() {
        let mut builder = QueryBuilder::<MySql>::new(queries::LIST_COLUMNS);
        push_filters(&mut builder, "C", false, None, Some("users"));
        assert!(builder.sql().ends_with(" WHERE C.TABLE_NAME = ?"));

        let mut builder = QueryBuilder::<MySql>::new(queries::LIST_COLUMNS);
        push_filters(&mut builder, "C", false, Some("app"), Some("users"));
        assert!(
            builder
                .sql()
                .ends_with(" WHERE C.TABLE_SCHEMA = ? AND C.TABLE_NAME = ?")
        );
    }

    #[test]
    fn test_no_filters_is_catalog_wide() {
        let mut builder = QueryBuilder::<MySql>::new(queries::LIST_COLUMNS);
        push_filters(&mut builder, "C", false, None, Some(""));
        assert!(!builder.sql().contains("WHERE"));
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("PRI".to_string())), Some("PRI".to_string()));
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(None), None);
    }
}
