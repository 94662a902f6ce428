//! Command line and environment configuration.
//!
//! Raw arguments are parsed by clap and then validated once into typed
//! requests, so the command layer never re-checks flag combinations.

use crate::error::{FixerError, FixerResult};
use crate::format::OutputFormat;
use crate::models::connection::DEFAULT_CONNECT_TIMEOUT_SECS;
use crate::models::{
    ColumnSelection, ConnectionSettings, ConversionOptions, ConversionTarget, DEFAULT_CHARSET,
    DEFAULT_COLLATION, TableSelection, TransactionMode,
};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the collation fixer.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "collation-fixer",
    about = "Inspect and convert MySQL/MariaDB table and column charsets and collations",
    version
)]
pub struct Config {
    /// Hostname/IP of the database server
    #[arg(short = 's', long, env = "DB_HOST", global = true)]
    pub host: Option<String>,

    /// Username to log in with (falls back to DB_USERNAME)
    #[arg(short = 'u', long, env = "DB_USER", global = true)]
    pub user: Option<String>,

    /// Password to log in with (falls back to DB_PASSWORD)
    #[arg(
        short = 'p',
        long = "pass",
        env = "DB_PASS",
        hide_env_values = true,
        global = true
    )]
    pub password: Option<String>,

    /// Port number of the database server
    #[arg(short = 'P', long, env = "DB_PORT", global = true)]
    pub port: Option<u16>,

    /// Default schema; setting DB_NAME in .env keeps conversions on the intended database
    #[arg(short = 'd', long, env = "DB_NAME", global = true)]
    pub database: Option<String>,

    /// mysql:// URL used as a base; explicit flags override its parts
    #[arg(long, env = "DATABASE_URL", hide_env_values = true, global = true)]
    pub url: Option<String>,

    /// Only log errors
    #[arg(short = 'q', long, env = "QUIET", global = true)]
    pub quiet: bool,

    /// Log at debug level
    #[arg(long, env = "DEBUG", global = true)]
    pub debug: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Enable JSON logging format
    #[arg(long, env = "JSON_LOGS", global = true)]
    pub json_logs: bool,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "DB_CONNECT_TIMEOUT",
        global = true
    )]
    pub connect_timeout: u64,

    /// The `.env` file that was loaded before parsing, if any.
    #[arg(skip)]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List tables with their default charset and collation
    #[command(alias = "list_tables")]
    ListTables {
        /// Schema to scan (all schemas when omitted)
        db: Option<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// List columns with their charset and collation
    #[command(alias = "list_columns")]
    ListColumns {
        /// Table to scan (all tables when omitted)
        table: Option<String>,

        /// Schema to scan (default schema when omitted)
        db: Option<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Convert the default charset/collation of tables
    #[command(alias = "convert_tables")]
    ConvertTables(ConvertTablesArgs),

    /// Convert the charset/collation of table columns
    #[command(alias = "convert_columns")]
    ConvertColumns(ConvertColumnsArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ConvertTablesArgs {
    /// Tables to convert
    pub tables: Vec<String>,

    /// Convert every table in the schema
    #[arg(short = 'a', long)]
    pub all_tables: bool,

    /// Also convert every column of each converted table
    #[arg(short = 'k', long = "convert-cols")]
    pub convert_columns: bool,

    #[command(flatten)]
    pub conversion: ConversionArgs,
}

#[derive(Debug, Clone, Args)]
pub struct ConvertColumnsArgs {
    /// Table whose columns are converted
    pub table: Option<String>,

    /// Columns to convert
    #[arg(short = 'c', long, num_args = 1.., value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Apply to every table in the schema
    #[arg(short = 'a', long)]
    pub all_tables: bool,

    /// Convert every column (ignores --columns)
    #[arg(short = 'k', long)]
    pub all_columns: bool,

    #[command(flatten)]
    pub conversion: ConversionArgs,
}

/// Flags shared by both conversion commands.
#[derive(Debug, Clone, Args)]
pub struct ConversionArgs {
    /// Schema to use instead of the default schema
    #[arg(long)]
    pub db: Option<String>,

    /// Character set to convert to
    #[arg(long, default_value = DEFAULT_CHARSET)]
    pub charset: String,

    /// Collation to convert to
    #[arg(long, default_value = DEFAULT_COLLATION)]
    pub collation: String,

    /// Do not wrap the batch in one transaction; failed items are skipped
    #[arg(long)]
    pub no_tx: bool,

    /// With --no-tx, wrap each item in its own transaction
    #[arg(long)]
    pub item_tx: bool,

    /// Also convert indexed columns
    #[arg(short = 'i', long)]
    pub indexes: bool,
}

impl ConversionArgs {
    pub fn options(&self) -> FixerResult<ConversionOptions> {
        Ok(ConversionOptions {
            target: ConversionTarget::new(&self.charset, &self.collation)?,
            transaction: TransactionMode::from_flags(!self.no_tx, self.item_tx),
            skip_indexed: !self.indexes,
        })
    }
}

/// Validated `convert-tables` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertTablesRequest {
    pub schema: String,
    pub tables: TableSelection,
    pub convert_columns: bool,
    pub options: ConversionOptions,
}

/// Validated `convert-columns` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertColumnsRequest {
    pub schema: String,
    pub tables: TableSelection,
    pub columns: ColumnSelection,
    pub options: ConversionOptions,
}

impl ConvertTablesArgs {
    pub fn validate(&self, default_schema: Option<&str>) -> FixerResult<ConvertTablesRequest> {
        let tables = if self.all_tables {
            TableSelection::All
        } else if self.tables.is_empty() {
            return Err(FixerError::invalid_input(
                "Name at least one table or pass --all-tables",
            ));
        } else {
            TableSelection::Named(self.tables.clone())
        };

        Ok(ConvertTablesRequest {
            schema: require_schema(self.conversion.db.as_deref(), default_schema)?,
            tables,
            convert_columns: self.convert_columns,
            options: self.conversion.options()?,
        })
    }
}

impl ConvertColumnsArgs {
    pub fn validate(&self, default_schema: Option<&str>) -> FixerResult<ConvertColumnsRequest> {
        let tables = match (&self.table, self.all_tables) {
            (_, true) => TableSelection::All,
            (Some(table), false) => TableSelection::Named(vec![table.clone()]),
            (None, false) => {
                return Err(FixerError::invalid_input(
                    "Name a table or pass --all-tables",
                ));
            }
        };
        if !self.all_columns && self.columns.is_empty() {
            return Err(FixerError::invalid_input(
                "Name columns with --columns or pass --all-columns",
            ));
        }

        Ok(ConvertColumnsRequest {
            schema: require_schema(self.conversion.db.as_deref(), default_schema)?,
            tables,
            columns: ColumnSelection::from_args(self.columns.clone(), self.all_columns),
            options: self.conversion.options()?,
        })
    }
}

fn require_schema(explicit: Option<&str>, default_schema: Option<&str>) -> FixerResult<String> {
    explicit
        .or(default_schema)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .ok_or_else(|| {
            FixerError::invalid_input("No schema given; pass --db or set --database / DB_NAME")
        })
}

impl Config {
    /// Parse configuration from command line arguments.
    ///
    /// A `.env` file in the working directory (or a parent) is loaded first so
    /// its values reach the `env =` fallbacks. Variables already set in the
    /// process keep their value.
    pub fn parse_args() -> Self {
        let env_file = load_env_file(None);
        Self {
            env_file,
            ..Self::parse()
        }
    }

    /// Connection settings, reading the secondary env names from the process.
    pub fn connection_settings(&self) -> ConnectionSettings {
        self.connection_settings_with(|name| std::env::var(name).ok())
    }

    /// Connection settings with `DB_USERNAME` / `DB_PASSWORD` read through `lookup`.
    pub fn connection_settings_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConnectionSettings {
        ConnectionSettings {
            url: self.url.clone(),
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone().or_else(|| lookup("DB_USERNAME")),
            password: self.password.clone().or_else(|| lookup("DB_PASSWORD")),
            database: self.database.clone(),
            connect_timeout: self.connect_timeout_duration(),
        }
    }

    /// Get the connection timeout as a Duration.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Filter directive used when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> String {
        if let Some(level) = self.log_level.as_deref().filter(|l| !l.is_empty()) {
            return level.to_string();
        }
        if self.quiet {
            return "error".to_string();
        }
        if self.debug {
            return "debug".to_string();
        }
        match self.command {
            Command::ConvertTables(_) | Command::ConvertColumns(_) => "info".to_string(),
            _ => "warn".to_string(),
        }
    }
}

/// Load `KEY=value` pairs into the process environment without overriding
/// existing variables. `None` searches for `.env` from the working directory up.
///
/// Returns the path that was loaded; a missing or unreadable file is not an error.
pub fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(path) => dotenvy::from_path(path).ok().map(|()| path.to_path_buf()),
        None => dotenvy::dotenv().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("collation-fixer").chain(args.iter().copied()))
            .unwrap()
    }

    fn tables_args(config: &Config) -> &ConvertTablesArgs {
        match &config.command {
            Command::ConvertTables(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    fn columns_args(config: &Config) -> &ConvertColumnsArgs {
        match &config.command {
            Command::ConvertColumns(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_underscore_aliases() {
        let config = parse(&["list_tables", "shop"]);
        assert!(matches!(config.command, Command::ListTables { db: Some(ref d), .. } if d == "shop"));

        let config = parse(&["list_columns", "users", "shop", "--format", "json"]);
        match config.command {
            Command::ListColumns { table, db, format } => {
                assert_eq!(table.as_deref(), Some("users"));
                assert_eq!(db.as_deref(), Some("shop"));
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_convert_tables_defaults() {
        let config = parse(&["convert-tables", "users", "orders", "--db", "shop"]);
        let request = tables_args(&config).validate(None).unwrap();
        assert_eq!(request.schema, "shop");
        assert_eq!(
            request.tables,
            TableSelection::Named(vec!["users".to_string(), "orders".to_string()])
        );
        assert!(!request.convert_columns);
        assert_eq!(request.options, ConversionOptions::default());
    }

    #[test]
    fn test_convert_tables_requires_tables_or_all() {
        let config = parse(&["convert-tables", "--db", "shop"]);
        assert!(matches!(
            tables_args(&config).validate(None),
            Err(FixerError::InvalidInput { .. })
        ));

        let config = parse(&["convert-tables", "-a", "-k"]);
        let request = tables_args(&config).validate(Some("shop")).unwrap();
        assert_eq!(request.tables, TableSelection::All);
        assert!(request.convert_columns);
    }

    #[test]
    fn test_conversion_requires_schema() {
        let config = parse(&["convert-tables", "users"]);
        assert!(tables_args(&config).validate(None).is_err());

        let config = parse(&["-d", "shop", "convert-tables", "users"]);
        let request = tables_args(&config)
            .validate(config.database.as_deref())
            .unwrap();
        assert_eq!(request.schema, "shop");
    }

    #[test]
    fn test_transaction_and_index_flags() {
        let config = parse(&["convert-tables", "users", "--no-tx", "--item-tx", "-i"]);
        let options = tables_args(&config).validate(Some("shop")).unwrap().options;
        assert_eq!(options.transaction, TransactionMode::PerItem);
        assert!(!options.skip_indexed);

        let config = parse(&["convert-tables", "users", "--no-tx"]);
        let options = tables_args(&config).validate(Some("shop")).unwrap().options;
        assert_eq!(options.transaction, TransactionMode::Autocommit);
    }

    #[test]
    fn test_bad_target_rejected() {
        let config = parse(&["convert-tables", "users", "--charset", "utf8mb4;"]);
        assert!(matches!(
            tables_args(&config).validate(Some("shop")),
            Err(FixerError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_convert_columns_validation() {
        let config = parse(&["convert-columns", "users", "-c", "username", "email"]);
        let request = columns_args(&config).validate(Some("shop")).unwrap();
        assert_eq!(request.tables, TableSelection::Named(vec!["users".to_string()]));
        assert_eq!(
            request.columns,
            ColumnSelection::Only(vec!["username".to_string(), "email".to_string()])
        );

        let config = parse(&["convert-columns", "users"]);
        assert!(columns_args(&config).validate(Some("shop")).is_err());

        let config = parse(&["convert-columns", "-k"]);
        assert!(columns_args(&config).validate(Some("shop")).is_err());

        let config = parse(&["convert-columns", "-a", "-k", "-c", "email"]);
        let request = columns_args(&config).validate(Some("shop")).unwrap();
        assert_eq!(request.tables, TableSelection::All);
        assert_eq!(request.columns, ColumnSelection::All);
    }

    #[test]
    fn test_log_filter_precedence() {
        assert_eq!(parse(&["list-tables"]).log_filter(), "warn");
        assert_eq!(parse(&["convert-tables", "-a"]).log_filter(), "info");
        assert_eq!(parse(&["-q", "convert-tables", "-a"]).log_filter(), "error");
        assert_eq!(parse(&["--debug", "list-tables"]).log_filter(), "debug");
        assert_eq!(
            parse(&["-q", "--log-level", "trace", "list-tables"]).log_filter(),
            "trace"
        );
    }

    #[test]
    fn test_connection_settings_fallbacks() {
        let config = parse(&["-s", "db.example.com", "-P", "3307", "list-tables"]);
        let settings = config.connection_settings_with(|name| match name {
            "DB_USERNAME" => Some("app".to_string()),
            "DB_PASSWORD" => Some("secret".to_string()),
            _ => None,
        });
        assert_eq!(settings.host.as_deref(), Some("db.example.com"));
        assert_eq!(settings.port, Some(3307));
        assert_eq!(settings.user.as_deref(), Some("app"));
        assert_eq!(settings.password.as_deref(), Some("secret"));

        let config = parse(&["-u", "admin", "list-tables"]);
        let settings = config.connection_settings_with(|_| Some("ignored".to_string()));
        assert_eq!(settings.user.as_deref(), Some("admin"));
    }

    #[test]
    fn test_env_file_populates_process_env() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# connection defaults").unwrap();
        writeln!(file, "COLLATION_FIXER_TEST_SCHEMA=shop_from_file").unwrap();

        let loaded = load_env_file(Some(file.path()));
        assert_eq!(loaded.as_deref(), Some(file.path()));
        assert_eq!(
            std::env::var("COLLATION_FIXER_TEST_SCHEMA").as_deref(),
            Ok("shop_from_file")
        );
    }

    #[test]
    fn test_missing_env_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_env_file(Some(&dir.path().join(".env"))), None);
    }

    #[test]
    fn test_parsed_config_has_no_env_file() {
        let config = parse(&["list-tables"]);
        assert_eq!(config.env_file, None);
    }
}
