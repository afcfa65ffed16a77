//! Combine capability groups contributed by several sources into one role.

use tracing::{debug, error};

use crate::error::CodegenError;
use crate::types::StatementGroups;

/// Merge `sources` into one set of groups.
///
/// Groups keep the order in which their names were first seen. A name that
/// already holds statements can't be defined again: that is an authoring
/// defect in the static tables, so the merge fails instead of letting the
/// later source win. A name that was registered with no statements may be
/// filled in by a later source, in place.
pub fn merge<I>(sources: I) -> Result<StatementGroups, CodegenError>
where
    I: IntoIterator<Item = StatementGroups>,
{
    let mut merged = StatementGroups::new();

    for (index, source) in sources.into_iter().enumerate() {
        for (name, statements) in source {
            match merged.get_mut(&name) {
                Some(existing) if !existing.is_empty() => {
                    error!(
                        event = "Merge",
                        phase = "Collision",
                        source = index,
                        group = name.as_str()
                    );
                    return Err(CodegenError::DuplicateStatementGroup { key: name });
                }
                Some(existing) => *existing = statements,
                None => merged.push(name, statements),
            }
        }
    }

    debug!(event = "Merge", phase = "Done", groups = merged.len());
    Ok(merged)
}
