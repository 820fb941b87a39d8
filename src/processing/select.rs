//! Column projection for [`crate::types::DataSet`].

use std::collections::HashSet;

use crate::error::{EngineError, EngineResult};
use crate::types::{DataSet, Schema};

/// Returns a new [`DataSet`] holding only `columns`, in the listed order.
///
/// Fails with [`EngineError::UnknownColumn`] for a name missing from the schema and with
/// [`EngineError::DuplicateColumn`] for a name listed twice. Selecting the current column list
/// returns an equal dataset.
pub fn select<S: AsRef<str>>(dataset: &DataSet, columns: &[S]) -> EngineResult<DataSet> {
    let mut seen = HashSet::with_capacity(columns.len());
    let mut indices = Vec::with_capacity(columns.len());
    for name in columns {
        let name = name.as_ref();
        if !seen.insert(name) {
            return Err(EngineError::DuplicateColumn {
                column: name.to_string(),
            });
        }
        indices.push(dataset.schema.require(name)?);
    }

    let schema = Schema::new(
        indices
            .iter()
            .map(|&i| dataset.schema.fields[i].clone())
            .collect(),
    );
    let rows = dataset
        .rows
        .iter()
        .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
        .collect();
    Ok(DataSet::new(schema, rows))
}
