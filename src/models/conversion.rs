//! Conversion request and result types.

use crate::error::{FixerError, FixerResult};
use crate::models::{ColumnDescriptor, TableDescriptor};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_CHARSET: &str = "utf8mb4";
pub const DEFAULT_COLLATION: &str = "utf8mb4_unicode_ci";

/// Desired end state for tables or columns.
///
/// Compatibility of the pair is left to the server, which rejects bad pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionTarget {
    charset: String,
    collation: String,
}

impl ConversionTarget {
    /// Create a target, validating both names.
    ///
    /// Names are interpolated into DDL, so only ASCII letters, digits and
    /// underscores are accepted.
    pub fn new(charset: impl Into<String>, collation: impl Into<String>) -> FixerResult<Self> {
        let charset = charset.into();
        let collation = collation.into();
        validate_name("charset", &charset)?;
        validate_name("collation", &collation)?;
        Ok(Self { charset, collation })
    }

    /// The current state of a table, used to undo a conversion.
    pub(crate) fn of_table(table: &TableDescriptor) -> Self {
        Self {
            charset: table.character_set.clone(),
            collation: table.collation.clone(),
        }
    }

    /// The current state of a column, if it carries a charset at all.
    pub(crate) fn of_column(column: &ColumnDescriptor) -> Option<Self> {
        match (&column.character_set, &column.collation) {
            (Some(charset), Some(collation)) => Some(Self {
                charset: charset.clone(),
                collation: collation.clone(),
            }),
            _ => None,
        }
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }

    pub fn collation(&self) -> &str {
        &self.collation
    }

    /// Case-insensitive comparison against a current charset/collation pair.
    pub fn matches(&self, charset: &str, collation: &str) -> bool {
        self.charset.eq_ignore_ascii_case(charset) && self.collation.eq_ignore_ascii_case(collation)
    }
}

impl Default for ConversionTarget {
    fn default() -> Self {
        Self {
            charset: DEFAULT_CHARSET.to_string(),
            collation: DEFAULT_COLLATION.to_string(),
        }
    }
}

impl fmt::Display for ConversionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.charset, self.collation)
    }
}

fn validate_name(kind: &str, name: &str) -> FixerResult<()> {
    if name.is_empty() {
        return Err(FixerError::invalid_input(format!("{kind} cannot be empty")));
    }
    if name.len() > 64 {
        return Err(FixerError::invalid_input(format!(
            "{kind} '{name}' is longer than 64 characters"
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(FixerError::invalid_input(format!(
            "{kind} '{name}' may only contain letters, digits and underscores"
        )));
    }
    Ok(())
}

/// How a batch is wrapped in transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionMode {
    /// One transaction around the whole batch; any failure undoes everything.
    #[default]
    Outer,
    /// Each item in its own transaction; failures are recorded and skipped.
    PerItem,
    /// No explicit transactions; failures are recorded and skipped.
    Autocommit,
}

impl TransactionMode {
    /// Select a mode from the two CLI switches.
    pub fn from_flags(outer_tx: bool, item_tx: bool) -> Self {
        match (outer_tx, item_tx) {
            (true, _) => Self::Outer,
            (false, true) => Self::PerItem,
            (false, false) => Self::Autocommit,
        }
    }
}

impl fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Outer => write!(f, "outer"),
            Self::PerItem => write!(f, "per-item"),
            Self::Autocommit => write!(f, "autocommit"),
        }
    }
}

/// Options shared by every bulk conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOptions {
    pub target: ConversionTarget,
    pub transaction: TransactionMode,
    /// Leave columns with a `COLUMN_KEY` untouched.
    pub skip_indexed: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            target: ConversionTarget::default(),
            transaction: TransactionMode::Outer,
            skip_indexed: true,
        }
    }
}

/// Which columns of a table a caller asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelection {
    All,
    Only(Vec<String>),
}

impl ColumnSelection {
    /// `all` wins over any explicit list.
    pub fn from_args(columns: Vec<String>, all: bool) -> Self {
        if all {
            Self::All
        } else {
            Self::Only(columns)
        }
    }

    /// Case-insensitive membership test.
    pub fn includes(&self, column: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.iter().any(|n| n.eq_ignore_ascii_case(column)),
        }
    }
}

/// Which tables a command operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSelection {
    All,
    Named(Vec<String>),
}

/// Verdict of the eligibility filter for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Convert,
    SkipNotRequested,
    SkipIndexed,
    SkipGenerated,
    SkipUnsupportedType,
    SkipAlreadyMatching,
}

impl Decision {
    pub fn skip_reason(self) -> Option<SkipReason> {
        match self {
            Self::Convert => None,
            Self::SkipNotRequested => Some(SkipReason::NotRequested),
            Self::SkipIndexed => Some(SkipReason::Indexed),
            Self::SkipGenerated => Some(SkipReason::Generated),
            Self::SkipUnsupportedType => Some(SkipReason::UnsupportedType),
            Self::SkipAlreadyMatching => Some(SkipReason::AlreadyMatching),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotRequested,
    Indexed,
    Generated,
    UnsupportedType,
    AlreadyMatching,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotRequested => "not requested",
            Self::Indexed => "column is indexed",
            Self::Generated => "generated column",
            Self::UnsupportedType => "type has no character set",
            Self::AlreadyMatching => "already matches target",
        };
        f.write_str(text)
    }
}

/// The thing a result refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionItem {
    Table(TableDescriptor),
    Column(ColumnDescriptor),
}

impl ConversionItem {
    pub fn qualified_name(&self) -> String {
        match self {
            Self::Table(t) => t.qualified_name(),
            Self::Column(c) => c.qualified_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Converted {
        statement: String,
    },
    Skipped {
        reason: SkipReason,
    },
    Failed {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        sql_state: Option<String>,
    },
}

/// One entry per item the executor looked at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub item: ConversionItem,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ConversionResult {
    pub fn is_converted(&self) -> bool {
        matches!(self.outcome, Outcome::Converted { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, Outcome::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }
}

/// Lifecycle of one bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    #[default]
    Idle,
    Running,
    Committed,
    RolledBack,
    PartiallyCompleted,
}

impl BatchState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Committed | Self::RolledBack | Self::PartiallyCompleted
        )
    }
}

/// Aggregate outcome of a table batch or column batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub mode: TransactionMode,
    pub state: BatchState,
    pub results: Vec<ConversionResult>,
    pub elapsed_ms: u64,
}

impl BatchReport {
    pub fn converted(&self) -> usize {
        self.results.iter().filter(|r| r.is_converted()).count()
    }

    pub fn skipped(&self) -> usize {
        self.results.iter().filter(|r| r.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.is_failed()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// Escalate the first failed item into an error.
    pub fn ensure_success(&self) -> FixerResult<()> {
        let first_failure = self.results.iter().find_map(|r| match &r.outcome {
            Outcome::Failed { error, sql_state } => Some((r, error, sql_state)),
            _ => None,
        });
        match first_failure {
            None => Ok(()),
            Some((result, error, sql_state)) => Err(FixerError::Conversion {
                item: result.item.qualified_name(),
                message: format!("{} ({} of {} items failed)", error, self.failed(), self.results.len()),
                sql_state: sql_state.clone(),
                rolled_back: false,
            }),
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} converted, {} skipped, {} failed ({:.2} sec)",
            self.converted(),
            self.skipped(),
            self.failed(),
            self.elapsed_ms as f64 / 1000.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_defaults() {
        let target = ConversionTarget::default();
        assert_eq!(target.charset(), "utf8mb4");
        assert_eq!(target.collation(), "utf8mb4_unicode_ci");
    }

    #[test]
    fn test_target_rejects_unsafe_names() {
        assert!(ConversionTarget::new("utf8mb4", "utf8mb4_bin").is_ok());
        assert!(ConversionTarget::new("", "utf8mb4_bin").is_err());
        assert!(ConversionTarget::new("utf8mb4; DROP TABLE x", "utf8mb4_bin").is_err());
        assert!(ConversionTarget::new("utf8mb4", "utf8mb4 bin").is_err());
        assert!(ConversionTarget::new("a".repeat(65), "utf8mb4_bin").is_err());
    }

    #[test]
    fn test_target_matches_case_insensitively() {
        let target = ConversionTarget::default();
        assert!(target.matches("UTF8MB4", "UTF8MB4_Unicode_CI"));
        assert!(!target.matches("utf8mb4", "utf8mb4_general_ci"));
    }

    #[test]
    fn test_transaction_mode_from_flags() {
        assert_eq!(TransactionMode::from_flags(true, false), TransactionMode::Outer);
        assert_eq!(TransactionMode::from_flags(true, true), TransactionMode::Outer);
        assert_eq!(TransactionMode::from_flags(false, true), TransactionMode::PerItem);
        assert_eq!(
            TransactionMode::from_flags(false, false),
            TransactionMode::Autocommit
        );
    }

    #[test]
    fn test_column_selection_all_ignores_list() {
        let selection = ColumnSelection::from_args(vec!["email".to_string()], true);
        assert_eq!(selection, ColumnSelection::All);
        assert!(selection.includes("anything"));

        let selection = ColumnSelection::from_args(vec!["Email".to_string()], false);
        assert!(selection.includes("email"));
        assert!(!selection.includes("username"));
    }

    fn result(outcome: Outcome) -> ConversionResult {
        ConversionResult {
            item: ConversionItem::Table(TableDescriptor::new(
                "app",
                "users",
                "latin1",
                "latin1_swedish_ci",
            )),
            outcome,
        }
    }

    #[test]
    fn test_report_counts_and_ensure_success() {
        let mut report = BatchReport {
            mode: TransactionMode::Autocommit,
            state: BatchState::Committed,
            results: vec![
                result(Outcome::Converted {
                    statement: "ALTER TABLE ...".to_string(),
                }),
                result(Outcome::Skipped {
                    reason: SkipReason::AlreadyMatching,
                }),
            ],
            elapsed_ms: 1500,
        };
        assert_eq!(report.converted(), 1);
        assert_eq!(report.skipped(), 1);
        assert!(report.ensure_success().is_ok());
        assert_eq!(
            report.to_string(),
            "1 converted, 1 skipped, 0 failed (1.50 sec)"
        );

        report.results.push(result(Outcome::Failed {
            error: "Specified key was too long".to_string(),
            sql_state: Some("42000".to_string()),
        }));
        assert!(report.has_failures());
        let err = report.ensure_success().unwrap_err();
        assert!(matches!(err, FixerError::Conversion { rolled_back: false, .. }));
        assert!(err.to_string().contains("app.users"));
    }

    #[test]
    fn test_result_serializes_flat_outcome() {
        let json = serde_json::to_value(result(Outcome::Skipped {
            reason: SkipReason::Indexed,
        }))
        .unwrap();
        assert_eq!(json["outcome"], "skipped");
        assert_eq!(json["reason"], "indexed");
        assert_eq!(json["item"]["kind"], "table");
        assert_eq!(json["item"]["name"], "users");
    }

    #[test]
    fn test_terminal_states() {
        assert!(!BatchState::Idle.is_terminal());
        assert!(!BatchState::Running.is_terminal());
        assert!(BatchState::RolledBack.is_terminal());
        assert!(BatchState::PartiallyCompleted.is_terminal());
    }
}
