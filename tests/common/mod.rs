//! In-memory catalog shared by the integration tests.
//!
//! DDL is applied the moment it runs and `ROLLBACK` never reverts it, which is
//! how MySQL treats `ALTER TABLE` inside a transaction.

#![allow(dead_code)]

use collation_fixer::db::{Catalog, DdlSession};
use collation_fixer::models::{ColumnDescriptor, ServerFlavor, TableDescriptor};
use collation_fixer::{FixerError, FixerResult};

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    pub tables: Vec<TableDescriptor>,
    pub columns: Vec<ColumnDescriptor>,
    /// Statements containing any of these fragments are rejected.
    pub reject: Vec<String>,
    /// Every statement and transaction command, in order.
    pub log: Vec<String>,
    pub flavor: ServerFlavor,
    /// `ROLLBACK` is logged but reports an error.
    pub fail_rollback: bool,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, schema: &str, name: &str, charset: &str, collation: &str) -> Self {
        self.tables
            .push(TableDescriptor::new(schema, name, charset, collation));
        self
    }

    pub fn with_column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    pub fn reject_when(mut self, fragment: &str) -> Self {
        self.reject.push(fragment.to_string());
        self
    }

    pub fn with_flavor(mut self, flavor: ServerFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn failing_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }

    pub fn table(&self, name: &str) -> &TableDescriptor {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .expect("table exists")
    }

    pub fn column(&self, table: &str, column: &str) -> &ColumnDescriptor {
        self.columns
            .iter()
            .find(|c| c.table == table && c.column == column)
            .expect("column exists")
    }

    /// DDL statements only, without transaction commands.
    pub fn ddl(&self) -> Vec<&str> {
        self.log
            .iter()
            .map(String::as_str)
            .filter(|s| s.starts_with("ALTER"))
            .collect()
    }

    pub fn count(&self, command: &str) -> usize {
        self.log.iter().filter(|s| *s == command).count()
    }

    fn apply(&mut self, sql: &str) {
        let idents = backticked(sql);
        let charset = token_after(sql, "CHARACTER SET ");
        let collation = token_after(sql, "COLLATE ");
        let (Some(charset), Some(collation)) = (charset, collation) else {
            return;
        };

        if sql.contains(" MODIFY ") {
            if let [schema, table, column, ..] = idents.as_slice() {
                for c in self.columns.iter_mut().filter(|c| {
                    &c.schema == schema && &c.table == table && &c.column == column
                }) {
                    c.character_set = Some(charset.clone());
                    c.collation = Some(collation.clone());
                }
            }
        } else if let [schema, table, ..] = idents.as_slice() {
            for t in self
                .tables
                .iter_mut()
                .filter(|t| &t.schema == schema && &t.name == table)
            {
                t.character_set = charset.clone();
                t.collation = collation.clone();
            }
        }
    }
}

fn backticked(sql: &str) -> Vec<String> {
    sql.split('`')
        .enumerate()
        .filter(|(i, _)| i % 2 == 1)
        .map(|(_, s)| s.to_string())
        .collect()
}

fn token_after(sql: &str, keyword: &str) -> Option<String> {
    let start = sql.find(keyword)? + keyword.len();
    sql[start..]
        .split(|c: char| c.is_whitespace() || c == ';')
        .next()
        .map(String::from)
}

fn matches_filter(value: &str, filter: Option<&str>) -> bool {
    filter.is_none_or(|f| f.is_empty() || f == value)
}

impl Catalog for MemoryCatalog {
    async fn list_tables(
        &mut self,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> FixerResult<Vec<TableDescriptor>> {
        Ok(self
            .tables
            .iter()
            .filter(|t| matches_filter(&t.schema, schema) && matches_filter(&t.name, table))
            .cloned()
            .collect())
    }

    async fn list_columns(
        &mut self,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> FixerResult<Vec<ColumnDescriptor>> {
        Ok(self
            .columns
            .iter()
            .filter(|c| matches_filter(&c.schema, schema) && matches_filter(&c.table, table))
            .cloned()
            .collect())
    }

    async fn server_flavor(&mut self) -> FixerResult<ServerFlavor> {
        Ok(self.flavor)
    }
}

impl DdlSession for MemoryCatalog {
    async fn begin(&mut self) -> FixerResult<()> {
        self.log.push("BEGIN".to_string());
        Ok(())
    }

    async fn commit(&mut self) -> FixerResult<()> {
        self.log.push("COMMIT".to_string());
        Ok(())
    }

    async fn rollback(&mut self) -> FixerResult<()> {
        self.log.push("ROLLBACK".to_string());
        if self.fail_rollback {
            return Err(FixerError::query(
                "Lost connection to server during query",
                Some("HY000".to_string()),
                "n/a",
            ));
        }
        Ok(())
    }

    async fn execute_ddl(&mut self, sql: &str) -> FixerResult<()> {
        self.log.push(sql.to_string());
        if self.reject.iter().any(|f| sql.contains(f.as_str())) {
            return Err(FixerError::query(
                format!("Cannot change column charset: {sql}"),
                Some("HY000".to_string()),
                "n/a",
            ));
        }
        self.apply(sql);
        Ok(())
    }
}

/// `shop.users` with the columns `id, username, email, created_at`.
pub fn users_table() -> MemoryCatalog {
    MemoryCatalog::new()
        .with_table("shop", "users", "latin1", "latin1_swedish_ci")
        .with_column(
            ColumnDescriptor::new("shop", "users", "id", "int")
                .with_key("PRI")
                .with_nullable(false)
                .with_extra("auto_increment"),
        )
        .with_column(
            ColumnDescriptor::new("shop", "users", "username", "varchar(191)")
                .with_charset("latin1", "latin1_swedish_ci")
                .with_nullable(false),
        )
        .with_column(
            ColumnDescriptor::new("shop", "users", "email", "varchar(255)")
                .with_charset("latin1", "latin1_swedish_ci")
                .with_default("nobody@example.com"),
        )
        .with_column(ColumnDescriptor::new(
            "shop",
            "users",
            "created_at",
            "datetime",
        ))
}
