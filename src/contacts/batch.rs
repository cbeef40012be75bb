//! Batched materialization of full contacts from their detail rows.

use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use crate::contacts::mapper;
use crate::contacts::model::Contact;
use crate::contacts::source::{ContentSource, NativeQuery, Row};
use crate::contract::Table;
use crate::error::Error;

/// Ids per native query. Keeps the filter clause and parameter list bounded.
pub const BATCH_SIZE: usize = 20;

/// Look up full contacts for the given ids against the shared data table.
///
/// Request order is preserved, duplicate ids collapse to their first
/// position, and ids with no backing rows are omitted rather than erroring.
pub fn contacts_by_ids<S: ContentSource + ?Sized>(
    source: &S,
    id_column: &'static str,
    aggregate: bool,
    ids: &[String],
) -> Result<Vec<Contact>, Error> {
    let wanted: IndexSet<&String> = ids.iter().filter(|id| !id.is_empty()).collect();
    if wanted.is_empty() {
        return Ok(Vec::new());
    }

    let mut loaded: IndexMap<String, Contact> = IndexMap::new();
    let batch: Vec<&String> = wanted.iter().copied().collect();
    for chunk in batch.chunks(BATCH_SIZE) {
        let filter = vec![format!("({id_column} = ?)"); chunk.len()].join(" OR ");
        let query = NativeQuery {
            table: Table::Data,
            projection: None,
            filter: Some(filter),
            parameters: chunk.iter().map(|id| (*id).clone()).collect(),
            sort: None,
        };
        trace!(batch = chunk.len(), "loading contact detail batch");
        for row in source.query(&query)? {
            merge_row(&mut loaded, aggregate, &row);
        }
    }

    // Reorder to the (deduplicated) request order; unknown ids drop out.
    Ok(wanted
        .into_iter()
        .filter_map(|id| loaded.shift_remove(id))
        .collect())
}

/// Fold one detail row into the contact it belongs to, creating the shell on
/// first sight.
pub fn merge_row(loaded: &mut IndexMap<String, Contact>, aggregate: bool, row: &Row) {
    let Some(id) = mapper::id_of(row, aggregate) else { return };
    let contact = loaded
        .entry(id.clone())
        .or_insert_with(|| mapper::contact_shell(id, aggregate, row));
    mapper::fill_from_data(contact, row);
}
