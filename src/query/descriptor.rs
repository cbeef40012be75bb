use crate::contract::Table;

/// One sort key of the accumulated sort expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: &'static str,
    pub descending: bool,
}

/// The immutable output of one translation pass: everything the native query
/// executor needs to run the query.
///
/// Built incrementally by the translator, frozen once translation completes.
/// `skip`/`take` use -1 for "unset".
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    table: Option<Table>,
    filter: String,
    parameters: Vec<String>,
    sort: Vec<SortKey>,
    projection: Vec<&'static str>,
    pub skip: i64,
    pub take: i64,
    pub is_any: bool,
    pub is_count: bool,
}

impl QueryDescriptor {
    pub fn new() -> Self {
        Self {
            table: None,
            filter: String::new(),
            parameters: Vec::new(),
            sort: Vec::new(),
            projection: Vec::new(),
            skip: -1,
            take: -1,
            is_any: false,
            is_count: false,
        }
    }

    pub fn table(&self) -> Option<Table> {
        self.table
    }

    /// Fix the target table. Returns false on a conflicting second table,
    /// which aborts translation into fallback.
    pub(crate) fn bind_table(&mut self, table: Table) -> bool {
        match self.table {
            None => {
                self.table = Some(table);
                true
            }
            Some(existing) => existing == table,
        }
    }

    /// Append one filter fragment; fragments are joined with AND.
    pub(crate) fn push_fragment(&mut self, fragment: &str, parameters: Vec<String>) {
        if !self.filter.is_empty() {
            self.filter.push_str(" AND ");
        }
        self.filter.push_str(fragment);
        self.parameters.extend(parameters);
    }

    pub(crate) fn push_sort(&mut self, column: &'static str, descending: bool) {
        self.sort.push(SortKey { column, descending });
    }

    pub(crate) fn push_projection(&mut self, columns: &[&'static str]) {
        for c in columns {
            if !self.projection.contains(c) {
                self.projection.push(c);
            }
        }
    }

    pub fn filter_str(&self) -> Option<&str> {
        if self.filter.is_empty() { None } else { Some(&self.filter) }
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn sort_keys(&self) -> &[SortKey] {
        &self.sort
    }

    pub fn sort_str(&self) -> Option<String> {
        if self.sort.is_empty() {
            return None;
        }
        let mut s = String::new();
        for key in &self.sort {
            if !s.is_empty() {
                s.push_str(", ");
            }
            s.push_str(key.column);
            if key.descending {
                s.push_str(" DESC");
            }
        }
        Some(s)
    }

    pub fn projection(&self) -> Option<&[&'static str]> {
        if self.projection.is_empty() { None } else { Some(&self.projection) }
    }

    /// Compose the sort expression handed to the native executor, folding
    /// skip/take into a trailing LIMIT clause. A skip without an explicit sort
    /// anchors on `anchor`, a stable uniquely-identifying column, so the
    /// offset is well defined.
    pub fn sort_and_limit(&self, anchor: &str) -> Option<String> {
        let sort = self.sort_str();
        if self.skip <= 0 && self.take <= 0 {
            return sort;
        }

        let mut clause = sort.unwrap_or_else(|| anchor.to_string());
        clause.push_str(" LIMIT ");
        if self.skip > 0 {
            clause.push_str(&self.skip.to_string());
            if self.take > 0 {
                clause.push(',');
            }
        }
        if self.take > 0 {
            clause.push_str(&self.take.to_string());
        }
        Some(clause)
    }

    /// Number of positional placeholders in the filter; always equals the
    /// parameter count for a well-formed descriptor.
    pub fn placeholder_count(&self) -> usize {
        self.filter.matches('?').count()
    }
}

impl Default for QueryDescriptor {
    fn default() -> Self {
        Self::new()
    }
}
