//! DDL statement builder.
//!
//! Identifiers come from the catalog and are only backtick-quoted. Charset and
//! collation names are validated by [`ConversionTarget::new`] before they get here.

use crate::models::{ColumnDescriptor, ConversionTarget, ServerFlavor, TableDescriptor};

/// Change a table's default charset/collation. Existing column data is untouched.
pub fn build_table_conversion(table: &TableDescriptor, target: &ConversionTarget) -> String {
    format!(
        "ALTER TABLE {} DEFAULT CHARACTER SET {} DEFAULT COLLATE {};",
        qualified_table(&table.schema, &table.name),
        target.charset(),
        target.collation()
    )
}

/// Change one column's charset/collation.
///
/// `MODIFY` replaces the whole column definition, so the type is repeated
/// verbatim and nullability, default and comment are re-stated. `flavor`
/// decides how the catalog's `COLUMN_DEFAULT` text is read back.
pub fn build_column_conversion(
    column: &ColumnDescriptor,
    target: &ConversionTarget,
    flavor: ServerFlavor,
) -> String {
    format!(
        "ALTER TABLE {} MODIFY {} {} CHARACTER SET {} COLLATE {}{};",
        qualified_table(&column.schema, &column.table),
        quote_ident(&column.column),
        column.column_type,
        target.charset(),
        target.collation(),
        column_attributes(column, flavor)
    )
}

/// `` `schema`.`table` ``, or just the table when no schema is known.
pub fn qualified_table(schema: &str, table: &str) -> String {
    if schema.is_empty() {
        quote_ident(table)
    } else {
        format!("{}.{}", quote_ident(schema), quote_ident(table))
    }
}

/// Backtick-quote an identifier, doubling embedded backticks.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quote a string literal for MySQL.
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

fn column_attributes(column: &ColumnDescriptor, flavor: ServerFlavor) -> String {
    let mut attrs = String::from(if column.nullable { " NULL" } else { " NOT NULL" });

    if let Some(default) = default_clause(column, flavor) {
        attrs.push_str(" DEFAULT ");
        attrs.push_str(&default);
    }
    if let Some(comment) = column.comment.as_deref() {
        attrs.push_str(" COMMENT ");
        attrs.push_str(&quote_literal(comment));
    }

    attrs
}

fn default_clause(column: &ColumnDescriptor, flavor: ServerFlavor) -> Option<String> {
    let default = column.default_value.as_deref()?;

    match flavor {
        // MariaDB: already SQL text (quoted literals, bare numbers, expressions).
        ServerFlavor::MariaDb if default.eq_ignore_ascii_case("NULL") => {
            column.nullable.then(|| "NULL".to_string())
        }
        ServerFlavor::MariaDb => Some(default.to_string()),
        ServerFlavor::MySql => {
            let is_expression = column
                .extra
                .as_deref()
                .is_some_and(|e| e.to_ascii_uppercase().contains("DEFAULT_GENERATED"));
            if is_expression {
                Some(format!("({default})"))
            } else {
                Some(quote_literal(default))
            }
        }
    }
}
