use indexmap::IndexMap;
use serde_json::Value;

use crate::contract::Table;
use crate::error::Error;
use crate::query::QueryDescriptor;

/// One native row, columns in cursor order.
pub type Row = IndexMap<String, Value>;

/// A fully-formed native query, ready to hand to a backing store.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeQuery {
    pub table: Table,
    pub projection: Option<Vec<&'static str>>,
    pub filter: Option<String>,
    pub parameters: Vec<String>,
    /// Combined sort-and-window clause in the store's dialect.
    pub sort: Option<String>,
}

impl NativeQuery {
    /// Freeze a translated descriptor against its bound table.
    pub fn from_descriptor(descriptor: &QueryDescriptor) -> Self {
        let table = descriptor.table().unwrap_or(Table::Contacts);
        Self {
            table,
            projection: descriptor.projection().map(|cols| cols.to_vec()),
            filter: descriptor.filter_str().map(str::to_owned),
            parameters: descriptor.parameters().to_vec(),
            sort: descriptor.sort_and_limit(table.anchor_column()),
        }
    }

    /// A bare full-table read.
    pub fn all(table: Table) -> Self {
        Self { table, projection: None, filter: None, parameters: Vec::new(), sort: None }
    }

    pub fn uri(&self) -> &'static str {
        self.table.uri()
    }
}

/// The seam to the platform's content store. Production backends wrap the
/// platform cursor API; tests substitute canned rows.
pub trait ContentSource: Send + Sync {
    fn query(&self, query: &NativeQuery) -> Result<Vec<Row>, Error>;

    /// Whether the caller currently holds read permission for contacts.
    fn read_allowed(&self) -> bool {
        true
    }
}
