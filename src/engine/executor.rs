//! Batch executor.
//!
//! Runs planned conversions against a session under one of three transaction
//! modes. MySQL commits implicitly around every `ALTER TABLE`, so a plain
//! `ROLLBACK` cannot undo DDL that already ran. In [`TransactionMode::Outer`]
//! the executor therefore replays an inverse statement for every item it
//! applied, newest first, before reporting the failure.

use crate::db::session::{Catalog, DdlSession};
use crate::engine::eligibility::{should_convert, table_decision};
use crate::engine::statement::{build_column_conversion, build_table_conversion};
use crate::error::{FixerError, FixerResult};
use crate::models::{
    BatchReport, BatchState, ColumnDescriptor, ColumnSelection, ConversionItem,
    ConversionOptions, ConversionResult, ConversionTarget, Decision, Outcome, ServerFlavor,
    TableDescriptor, TransactionMode,
};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// One item with its verdict and, when it is to be converted, the statements
/// to apply and to undo it.
#[derive(Debug)]
struct PlannedItem {
    item: ConversionItem,
    decision: Decision,
    forward: String,
    undo: Option<String>,
}

impl PlannedItem {
    fn table(table: &TableDescriptor, target: &ConversionTarget) -> Self {
        let decision = table_decision(table, target);
        let (forward, undo) = if decision == Decision::Convert {
            (
                build_table_conversion(table, target),
                Some(build_table_conversion(table, &ConversionTarget::of_table(table))),
            )
        } else {
            (String::new(), None)
        };
        Self {
            item: ConversionItem::Table(table.clone()),
            decision,
            forward,
            undo,
        }
    }

    fn column(
        column: &ColumnDescriptor,
        selection: &ColumnSelection,
        options: &ConversionOptions,
        flavor: ServerFlavor,
    ) -> Self {
        let decision = should_convert(column, &options.target, selection, options.skip_indexed);
        let (forward, undo) = if decision == Decision::Convert {
            (
                build_column_conversion(column, &options.target, flavor),
                ConversionTarget::of_column(column)
                    .map(|current| build_column_conversion(column, &current, flavor)),
            )
        } else {
            (String::new(), None)
        };
        Self {
            item: ConversionItem::Column(column.clone()),
            decision,
            forward,
            undo,
        }
    }
}

/// Converts tables and columns over a borrowed session.
pub struct ConversionEngine<'s, S> {
    session: &'s mut S,
    /// Looked up on the first column batch.
    flavor: Option<ServerFlavor>,
}

impl<'s, S: Catalog + DdlSession> ConversionEngine<'s, S> {
    pub fn new(session: &'s mut S) -> Self {
        Self {
            session,
            flavor: None,
        }
    }

    /// Change the default charset/collation of each table.
    ///
    /// Tables already at the target are skipped. Column data is not touched.
    pub async fn convert_tables(
        &mut self,
        tables: &[TableDescriptor],
        options: &ConversionOptions,
    ) -> FixerResult<BatchReport> {
        let plan = tables
            .iter()
            .map(|t| PlannedItem::table(t, &options.target))
            .collect();
        self.run_batch(plan, options.transaction).await
    }

    /// Convert the selected columns of one table.
    ///
    /// Every explicitly named column must exist before any DDL is issued.
    pub async fn convert_columns(
        &mut self,
        schema: &str,
        table: &str,
        selection: &ColumnSelection,
        options: &ConversionOptions,
    ) -> FixerResult<BatchReport> {
        self.convert_table_columns(schema, table, selection, options, true)
            .await
    }

    /// Convert the selected columns of several tables, one batch per table.
    ///
    /// Named columns missing from a table are skipped rather than fatal here,
    /// since not every table is expected to carry them. The first batch that
    /// returns an error stops the run.
    pub async fn convert_columns_for_tables(
        &mut self,
        tables: &[TableDescriptor],
        selection: &ColumnSelection,
        options: &ConversionOptions,
    ) -> FixerResult<Vec<BatchReport>> {
        let mut reports = Vec::with_capacity(tables.len());
        for table in tables {
            let report = self
                .convert_table_columns(&table.schema, &table.name, selection, options, false)
                .await?;
            reports.push(report);
        }
        Ok(reports)
    }

    async fn convert_table_columns(
        &mut self,
        schema: &str,
        table: &str,
        selection: &ColumnSelection,
        options: &ConversionOptions,
        require_named: bool,
    ) -> FixerResult<BatchReport> {
        let columns = self.session.list_columns(Some(schema), Some(table)).await?;
        if columns.is_empty() {
            return Err(FixerError::table_not_found(schema, table));
        }

        if let ColumnSelection::Only(names) = selection {
            if names.is_empty() {
                return Err(FixerError::invalid_input(
                    "No columns requested; name at least one column or select all",
                ));
            }
            if require_named {
                for name in names {
                    if !columns.iter().any(|c| c.column.eq_ignore_ascii_case(name)) {
                        return Err(FixerError::column_not_found(table, name.as_str()));
                    }
                }
            }
        }

        let flavor = self.server_flavor().await?;
        let plan = columns
            .iter()
            .map(|c| PlannedItem::column(c, selection, options, flavor))
            .collect();
        self.run_batch(plan, options.transaction).await
    }

    async fn server_flavor(&mut self) -> FixerResult<ServerFlavor> {
        match self.flavor {
            Some(flavor) => Ok(flavor),
            None => {
                let flavor = self.session.server_flavor().await?;
                Ok(*self.flavor.insert(flavor))
            }
        }
    }

    async fn run_batch(
        &mut self,
        plan: Vec<PlannedItem>,
        mode: TransactionMode,
    ) -> FixerResult<BatchReport> {
        let started = Instant::now();
        let pending = plan
            .iter()
            .filter(|p| p.decision == Decision::Convert)
            .count();
        let outer = mode == TransactionMode::Outer && pending > 0;

        debug!(
            mode = %mode,
            items = plan.len(),
            pending,
            state = ?BatchState::Running,
            "Starting conversion batch"
        );

        if outer {
            self.session.begin().await?;
        }

        let mut applied: Vec<&PlannedItem> = Vec::new();
        let mut results = Vec::with_capacity(plan.len());

        for planned in &plan {
            let name = planned.item.qualified_name();

            if let Some(reason) = planned.decision.skip_reason() {
                debug!(item = %name, reason = %reason, "Skipping");
                results.push(ConversionResult {
                    item: planned.item.clone(),
                    outcome: Outcome::Skipped { reason },
                });
                continue;
            }

            info!(item = %name, "Converting");
            let executed = match mode {
                TransactionMode::Outer => self.session.execute_ddl(&planned.forward).await,
                TransactionMode::PerItem => self.execute_in_own_transaction(&planned.forward).await,
                TransactionMode::Autocommit => self.session.execute_ddl(&planned.forward).await,
            };

            match executed {
                Ok(()) => {
                    applied.push(planned);
                    results.push(ConversionResult {
                        item: planned.item.clone(),
                        outcome: Outcome::Converted {
                            statement: planned.forward.clone(),
                        },
                    });
                }
                Err(e) if mode == TransactionMode::Outer => {
                    error!(item = %name, error = %e, "Conversion failed, rolling back batch");
                    let restored = self.restore(&applied).await;
                    return Err(FixerError::conversion(name, &e, restored));
                }
                Err(e) => {
                    warn!(item = %name, error = %e, "Conversion failed, continuing");
                    let sql_state = match &e {
                        FixerError::Query { sql_state, .. } => sql_state.clone(),
                        _ => None,
                    };
                    let error = match e {
                        FixerError::Query { message, .. } => message,
                        other => other.to_string(),
                    };
                    results.push(ConversionResult {
                        item: planned.item.clone(),
                        outcome: Outcome::Failed { error, sql_state },
                    });
                }
            }
        }

        if outer {
            if let Err(e) = self.session.commit().await {
                error!(error = %e, "Commit failed, rolling back batch");
                let restored = self.restore(&applied).await;
                return Err(FixerError::conversion("batch commit", &e, restored));
            }
        }

        let state = if results.iter().any(|r| r.is_failed()) {
            BatchState::PartiallyCompleted
        } else {
            BatchState::Committed
        };

        let report = BatchReport {
            mode,
            state,
            results,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(mode = %mode, state = ?state, "{}", report);
        Ok(report)
    }

    async fn execute_in_own_transaction(&mut self, sql: &str) -> FixerResult<()> {
        self.session.begin().await?;
        match self.session.execute_ddl(sql).await {
            Ok(()) => self.session.commit().await,
            Err(e) => {
                if let Err(rollback_err) = self.session.rollback().await {
                    warn!(error = %rollback_err, "Rollback after failed item also failed");
                }
                Err(e)
            }
        }
    }

    /// Roll back and undo every applied item, newest first.
    ///
    /// Returns true only when the rollback and every inverse statement succeeded.
    async fn restore(&mut self, applied: &[&PlannedItem]) -> bool {
        let mut restored = true;
        if let Err(e) = self.session.rollback().await {
            error!(error = %e, "Rollback failed");
            restored = false;
        }

        for planned in applied.iter().rev() {
            let name = planned.item.qualified_name();
            let Some(undo) = planned.undo.as_deref() else {
                warn!(item = %name, "No prior charset recorded, cannot restore");
                restored = false;
                continue;
            };
            match self.session.execute_ddl(undo).await {
                Ok(()) => debug!(item = %name, "Restored"),
                Err(e) => {
                    error!(item = %name, error = %e, "Restore failed");
                    restored = false;
                }
            }
        }

        if restored {
            info!(undone = applied.len(), state = ?BatchState::RolledBack, "Batch rolled back");
        } else {
            error!("Batch only partially rolled back; check the affected items manually");
        }
        restored
    }
}
