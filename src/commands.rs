//! Command handlers.
//!
//! Each handler works against the [`Catalog`] / [`DdlSession`] traits so the
//! same flow runs on a live connection or an in-memory catalog. [`run`] is the
//! only place that touches the [`ConnectionManager`].

use crate::config::{Command, Config, ConvertColumnsRequest, ConvertTablesRequest};
use crate::db::{Catalog, ConnectionManager, DdlSession, resolve_tables};
use crate::engine::ConversionEngine;
use crate::error::FixerResult;
use crate::format::{OutputFormat, render_columns, render_report, render_tables};
use crate::models::{BatchReport, ColumnSelection, ConnectionOverrides, TableSelection};
use sqlx::MySqlConnection;
use std::time::Instant;
use tracing::info;

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// A non-outer batch finished with failed items.
    PartialFailure,
}

impl RunStatus {
    pub fn from_reports(reports: &[BatchReport]) -> Self {
        if reports.iter().any(BatchReport::has_failures) {
            Self::PartialFailure
        } else {
            Self::Success
        }
    }

    pub fn exit_code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::PartialFailure => 2,
        }
    }
}

/// Dispatch the parsed command line.
pub async fn run(config: &Config, manager: &mut ConnectionManager) -> FixerResult<RunStatus> {
    let default_schema = manager.settings().database_name();

    match &config.command {
        Command::ListTables { db, format } => {
            let schema = db.clone().or(default_schema);
            let conn = manager.connect(None).await?;
            print!("{}", list_tables(conn, schema.as_deref(), *format).await?);
            Ok(RunStatus::Success)
        }
        Command::ListColumns { table, db, format } => {
            let schema = db.clone().or(default_schema);
            let conn = manager.connect(None).await?;
            let output =
                list_columns(conn, schema.as_deref(), table.as_deref(), *format).await?;
            print!("{output}");
            Ok(RunStatus::Success)
        }
        Command::ConvertTables(args) => {
            let request = args.validate(default_schema.as_deref())?;
            let conn = connect_to_schema(manager, &request.schema).await?;
            let reports = convert_tables(conn, &request).await?;
            Ok(print_reports(&reports))
        }
        Command::ConvertColumns(args) => {
            let request = args.validate(default_schema.as_deref())?;
            let conn = connect_to_schema(manager, &request.schema).await?;
            let reports = convert_columns(conn, &request).await?;
            Ok(print_reports(&reports))
        }
    }
}

/// Switch the shared connection to `schema` when it is not already the default.
async fn connect_to_schema<'m>(
    manager: &'m mut ConnectionManager,
    schema: &str,
) -> FixerResult<&'m mut MySqlConnection> {
    if manager.settings().database_name().as_deref() == Some(schema) {
        manager.connect(None).await
    } else {
        let overrides = ConnectionOverrides::database(schema);
        manager.connect(Some(&overrides)).await
    }
}

fn print_reports(reports: &[BatchReport]) -> RunStatus {
    for report in reports {
        print!("{}", render_report(report));
    }
    RunStatus::from_reports(reports)
}

pub async fn list_tables<C: Catalog>(
    catalog: &mut C,
    schema: Option<&str>,
    format: OutputFormat,
) -> FixerResult<String> {
    let started = Instant::now();
    let tables = catalog.list_tables(schema, None).await?;
    render_tables(&tables, format, started.elapsed().as_millis() as u64)
}

pub async fn list_columns<C: Catalog>(
    catalog: &mut C,
    schema: Option<&str>,
    table: Option<&str>,
    format: OutputFormat,
) -> FixerResult<String> {
    let started = Instant::now();
    let columns = catalog.list_columns(schema, table).await?;
    render_columns(&columns, format, started.elapsed().as_millis() as u64)
}

/// Convert table defaults, then optionally every column of those tables.
///
/// Returns one report for the tables and, with `convert_columns`, one per table.
pub async fn convert_tables<S: Catalog + DdlSession>(
    session: &mut S,
    request: &ConvertTablesRequest,
) -> FixerResult<Vec<BatchReport>> {
    let tables = match &request.tables {
        TableSelection::All => session.list_tables(Some(&request.schema), None).await?,
        TableSelection::Named(names) => resolve_tables(session, &request.schema, names).await?,
    };
    if tables.is_empty() {
        info!(schema = %request.schema, "No tables to convert");
        return Ok(Vec::new());
    }

    info!(
        schema = %request.schema,
        count = tables.len(),
        target = %request.options.target,
        "Converting tables"
    );

    let mut engine = ConversionEngine::new(session);
    let mut reports = vec![engine.convert_tables(&tables, &request.options).await?];

    if request.convert_columns {
        info!(count = tables.len(), "Converting columns of converted tables");
        let column_reports = engine
            .convert_columns_for_tables(&tables, &ColumnSelection::All, &request.options)
            .await?;
        reports.extend(column_reports);
    }
    Ok(reports)
}

/// Convert columns of one named table, or of every table in the schema.
pub async fn convert_columns<S: Catalog + DdlSession>(
    session: &mut S,
    request: &ConvertColumnsRequest,
) -> FixerResult<Vec<BatchReport>> {
    match &request.tables {
        TableSelection::Named(names) => {
            let mut reports = Vec::with_capacity(names.len());
            let mut engine = ConversionEngine::new(session);
            for table in names {
                info!(
                    schema = %request.schema,
                    table = %table,
                    target = %request.options.target,
                    "Converting columns"
                );
                let report = engine
                    .convert_columns(&request.schema, table, &request.columns, &request.options)
                    .await?;
                reports.push(report);
            }
            Ok(reports)
        }
        TableSelection::All => {
            let tables = session.list_tables(Some(&request.schema), None).await?;
            info!(
                schema = %request.schema,
                count = tables.len(),
                target = %request.options.target,
                "Converting columns in all tables"
            );
            ConversionEngine::new(session)
                .convert_columns_for_tables(&tables, &request.columns, &request.options)
                .await
        }
    }
}
