//! Catalog snapshot types.
//!
//! Descriptors are read from `INFORMATION_SCHEMA` once per invocation and
//! never cached.

use serde::{Deserialize, Serialize};

/// A table and its default character set / collation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub schema: String,
    pub name: String,
    pub collation: String,
    pub character_set: String,
}

impl TableDescriptor {
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        character_set: impl Into<String>,
        collation: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            collation: collation.into(),
            character_set: character_set.into(),
        }
    }

    /// `schema.table`, used in logs and results.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// A column as described by `INFORMATION_SCHEMA.COLUMNS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub schema: String,
    pub table: String,
    pub column: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub nullable: bool,
    pub data_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    /// Full type including length and attributes, e.g. `varchar(191)`.
    pub column_type: String,
    /// `PRI`, `UNI` or `MUL` when the column is part of an index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_set: Option<String>,
}

impl ColumnDescriptor {
    /// Create a nullable column with no charset, key or default.
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
        column_type: impl Into<String>,
    ) -> Self {
        let column_type = column_type.into();
        let data_type = column_type
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default()
            .to_lowercase();
        Self {
            schema: schema.into(),
            table: table.into(),
            column: column.into(),
            default_value: None,
            nullable: true,
            data_type,
            max_length: None,
            column_type,
            column_key: None,
            extra: None,
            comment: None,
            collation: None,
            character_set: None,
        }
    }

    /// Set the character set and collation.
    pub fn with_charset(
        mut self,
        character_set: impl Into<String>,
        collation: impl Into<String>,
    ) -> Self {
        self.character_set = Some(character_set.into());
        self.collation = Some(collation.into());
        self
    }

    /// Set the index key flag (`PRI`, `UNI`, `MUL`).
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.column_key = Some(key.into());
        self
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_max_length(mut self, max_length: u64) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// True when the column participates in any index.
    pub fn is_indexed(&self) -> bool {
        self.column_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// True for `VIRTUAL`/`STORED` generated columns.
    ///
    /// `DEFAULT_GENERATED` only marks an expression default and does not count.
    pub fn is_generated(&self) -> bool {
        self.extra.as_deref().is_some_and(|extra| {
            extra
                .split_whitespace()
                .any(|word| word.eq_ignore_ascii_case("GENERATED"))
        })
    }

    /// `schema.table.column`, used in logs and results.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}.{}", self.schema, self.table, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_new_derives_data_type() {
        let col = ColumnDescriptor::new("app", "users", "email", "VARCHAR(191)");
        assert_eq!(col.data_type, "varchar");
        assert_eq!(col.column_type, "VARCHAR(191)");
        assert!(col.nullable);

        let col = ColumnDescriptor::new("app", "users", "id", "int unsigned");
        assert_eq!(col.data_type, "int");
    }

    #[test]
    fn test_is_indexed() {
        let col = ColumnDescriptor::new("app", "users", "email", "varchar(191)");
        assert!(!col.is_indexed());
        assert!(!col.clone().with_key("").is_indexed());
        assert!(col.clone().with_key("UNI").is_indexed());
        assert!(col.with_key("MUL").is_indexed());
    }

    #[test]
    fn test_is_generated() {
        let col = ColumnDescriptor::new("app", "users", "slug", "varchar(64)");
        assert!(!col.is_generated());
        assert!(col.clone().with_extra("STORED GENERATED").is_generated());
        assert!(col.clone().with_extra("VIRTUAL GENERATED").is_generated());
        assert!(!col.clone().with_extra("DEFAULT_GENERATED").is_generated());
        assert!(
            !col.with_extra("DEFAULT_GENERATED on update CURRENT_TIMESTAMP")
                .is_generated()
        );
    }

    #[test]
    fn test_qualified_names() {
        let table = TableDescriptor::new("app", "users", "latin1", "latin1_swedish_ci");
        assert_eq!(table.qualified_name(), "app.users");
        let col = ColumnDescriptor::new("app", "users", "email", "text");
        assert_eq!(col.qualified_name(), "app.users.email");
    }

    #[test]
    fn test_column_json_omits_absent_fields() {
        let col = ColumnDescriptor::new("app", "users", "id", "int");
        let json = serde_json::to_value(&col).unwrap();
        assert!(json.get("collation").is_none());
        assert!(json.get("column_key").is_none());
        assert_eq!(json["column_type"], "int");
    }
}
