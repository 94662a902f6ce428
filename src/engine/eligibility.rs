//! Eligibility filter.
//!
//! Pure decisions, no I/O. The check order matters: an explicit exclusion is
//! reported before incidental reasons, and type checks never run against
//! columns the caller did not ask for.

use crate::models::{ColumnDescriptor, ColumnSelection, ConversionTarget, Decision, TableDescriptor};

/// Decide what to do with one column.
///
/// Order: not requested, indexed, generated, no charset support, already
/// matching, convert.
///
/// Generated columns are left alone: `MODIFY` would have to restate the
/// generation expression.
pub fn should_convert(
    column: &ColumnDescriptor,
    target: &ConversionTarget,
    selection: &ColumnSelection,
    skip_indexed: bool,
) -> Decision {
    if !selection.includes(&column.column) {
        return Decision::SkipNotRequested;
    }
    if skip_indexed && column.is_indexed() {
        return Decision::SkipIndexed;
    }
    if column.is_generated() {
        return Decision::SkipGenerated;
    }

    match (column.character_set.as_deref(), column.collation.as_deref()) {
        (None, None) => Decision::SkipUnsupportedType,
        (Some(charset), Some(collation)) if target.matches(charset, collation) => {
            Decision::SkipAlreadyMatching
        }
        // A lone charset or collation is treated as a mismatch.
        _ => Decision::Convert,
    }
}

/// Decide whether a table's defaults need changing.
pub fn table_decision(table: &TableDescriptor, target: &ConversionTarget) -> Decision {
    if target.matches(&table.character_set, &table.collation) {
        Decision::SkipAlreadyMatching
    } else {
        Decision::Convert
    }
}
