use once_cell::sync::OnceCell;
use serde_json::Value;
use tracing::debug;

use crate::contacts::model::Contact;
use crate::contacts::source::{ContentSource, NativeQuery, Row};
use crate::contacts::{batch, mapper};
use crate::contract::{contacts, data, Table};
use crate::error::Error;
use crate::query::{
    mem, ElementKind, QueryOp, QueryOutcome, TableFinder, Translation, Translator,
};

/// Entry point to the device's contact store.
///
/// `prefer_contact_aggregation` picks between aggregated person records and
/// raw per-account records; it decides the default table and the id column
/// every lookup keys on. Read permission is probed once per session on first
/// use and cached for the lifetime of the book.
pub struct AddressBook<S> {
    source: S,
    pub prefer_contact_aggregation: bool,
    permission: OnceCell<bool>,
}

impl<S: ContentSource> AddressBook<S> {
    pub fn new(source: S) -> Self {
        Self { source, prefer_contact_aggregation: true, permission: OnceCell::new() }
    }

    pub fn with_aggregation(source: S, prefer_contact_aggregation: bool) -> Self {
        Self { source, prefer_contact_aggregation, permission: OnceCell::new() }
    }

    fn finder(&self) -> TableFinder {
        TableFinder::new(!self.prefer_contact_aggregation)
    }

    fn id_column(&self) -> &'static str {
        if self.prefer_contact_aggregation { contacts::LOOKUP_KEY } else { data::CONTACT_ID }
    }

    fn ensure_permission(&self) -> Result<(), Error> {
        let allowed = *self.permission.get_or_init(|| self.source.read_allowed());
        if allowed { Ok(()) } else { Err(Error::Unauthorized) }
    }

    /// All contacts, fully materialized.
    pub fn contacts(&self) -> Result<Vec<Contact>, Error> {
        self.ensure_permission()?;
        let rows = self.source.query(&NativeQuery::all(Table::Data))?;
        let mut loaded = indexmap::IndexMap::new();
        for row in &rows {
            batch::merge_row(&mut loaded, self.prefer_contact_aggregation, row);
        }
        Ok(loaded.into_values().collect())
    }

    /// Look up a single contact by id. Unknown ids are `None`, not an error.
    pub fn load(&self, id: &str) -> Result<Option<Contact>, Error> {
        if id.trim().is_empty() {
            return Err(Error::InvalidArgument("contact id must not be blank".into()));
        }
        self.ensure_permission()?;
        let mut found = batch::contacts_by_ids(
            &self.source,
            self.id_column(),
            self.prefer_contact_aggregation,
            std::slice::from_ref(&id.to_string()),
        )?;
        Ok(found.pop())
    }

    /// Batched id lookup: request order preserved, duplicates collapsed,
    /// misses omitted.
    pub fn contacts_by_ids(&self, ids: &[String]) -> Result<Vec<Contact>, Error> {
        self.ensure_permission()?;
        batch::contacts_by_ids(
            &self.source,
            self.id_column(),
            self.prefer_contact_aggregation,
            ids,
        )
    }

    /// Run an operator chain: translate as much as possible into one native
    /// query, then finish the untranslated remainder in memory.
    pub fn query(&self, ops: &[QueryOp]) -> Result<QueryOutcome, Error> {
        self.ensure_permission()?;

        let translation = Translator::new(self.finder()).translate(ops)?;
        let native = NativeQuery::from_descriptor(&translation.descriptor);
        debug!(
            uri = native.uri(),
            filter = native.filter.as_deref().unwrap_or(""),
            residual_ops = translation.residual_ops.len(),
            "running translated query"
        );

        let rows = self.source.query(&native)?;
        let mut items = self.materialize(&translation, rows)?;

        for predicate in &translation.residual_predicates {
            items.retain(|item| mem::matches(predicate, item));
        }

        if translation.descriptor.is_count {
            return Ok(QueryOutcome::Count(items.len()));
        }
        if translation.descriptor.is_any {
            return Ok(QueryOutcome::Bool(!items.is_empty()));
        }
        mem::apply_ops(items, &translation.residual_ops)
    }

    fn materialize(&self, translation: &Translation, rows: Vec<Row>) -> Result<Vec<Value>, Error> {
        match translation.element {
            ElementKind::Entity(crate::query::EntityKind::Contact) => {
                // Matching rows only locate contacts; a second, batched pass
                // loads each one in full.
                let aggregate = self.prefer_contact_aggregation;
                let ids: Vec<String> = rows
                    .iter()
                    .filter_map(|row| mapper::id_of(row, aggregate))
                    .collect();
                let found =
                    batch::contacts_by_ids(&self.source, self.id_column(), aggregate, &ids)?;
                found
                    .into_iter()
                    .map(|c| {
                        serde_json::to_value(c)
                            .map_err(|e| Error::InvalidArgument(e.to_string()))
                    })
                    .collect()
            }
            ElementKind::Entity(kind) => Ok(rows
                .iter()
                .filter_map(|row| mapper::entity_value(kind, row))
                .collect()),
            ElementKind::Column(mapping) => {
                Ok(rows.iter().map(|row| mapper::projected_value(mapping, row)).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{mimetypes, phone, structured_name};
    use crate::query::{EntityKind, Expr, Field, QueryChain};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeStore {
        rows: Vec<Row>,
        allowed: bool,
        probes: AtomicUsize,
        queries: Mutex<Vec<NativeQuery>>,
    }

    impl FakeStore {
        fn new(rows: Vec<Row>) -> Self {
            Self { rows, allowed: true, probes: AtomicUsize::new(0), queries: Mutex::new(Vec::new()) }
        }

        fn denied() -> Self {
            Self { allowed: false, ..Self::new(Vec::new()) }
        }
    }

    impl ContentSource for FakeStore {
        fn query(&self, query: &NativeQuery) -> Result<Vec<Row>, Error> {
            self.queries.lock().unwrap().push(query.clone());
            match &query.filter {
                // Detail-batch queries filter on the lookup key.
                Some(f) if f.contains(contacts::LOOKUP_KEY) => Ok(self
                    .rows
                    .iter()
                    .filter(|row| {
                        query
                            .parameters
                            .iter()
                            .any(|p| row.get(contacts::LOOKUP_KEY) == Some(&json!(p)))
                    })
                    .cloned()
                    .collect()),
                _ => Ok(self.rows.clone()),
            }
        }

        fn read_allowed(&self) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.allowed
        }
    }

    fn name_row(id: &str, first: &str, last: &str) -> Row {
        [
            (contacts::LOOKUP_KEY.to_string(), json!(id)),
            (data::DISPLAY_NAME.to_string(), json!(format!("{first} {last}"))),
            (data::MIMETYPE.to_string(), json!(mimetypes::STRUCTURED_NAME)),
            (structured_name::GIVEN_NAME.to_string(), json!(first)),
            (structured_name::FAMILY_NAME.to_string(), json!(last)),
        ]
        .into_iter()
        .collect()
    }

    fn phone_row(id: &str, number: &str) -> Row {
        [
            (contacts::LOOKUP_KEY.to_string(), json!(id)),
            (data::MIMETYPE.to_string(), json!(mimetypes::PHONE)),
            (phone::NUMBER.to_string(), json!(number)),
            (phone::TYPE.to_string(), json!(2)),
        ]
        .into_iter()
        .collect()
    }

    fn book() -> AddressBook<FakeStore> {
        AddressBook::new(FakeStore::new(vec![
            name_row("a", "Ann", "Lee"),
            phone_row("a", "555-0100"),
            name_row("b", "Bo", "Chen"),
        ]))
    }

    #[test]
    fn denied_permission_surfaces_as_unauthorized() {
        let book = AddressBook::new(FakeStore::denied());
        assert_eq!(book.contacts(), Err(Error::Unauthorized));
        assert_eq!(book.load("a"), Err(Error::Unauthorized));
    }

    #[test]
    fn permission_is_probed_once_per_session() {
        let book = book();
        book.contacts().unwrap();
        book.contacts().unwrap();
        book.load("a").unwrap();
        assert_eq!(book.source.probes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn contacts_merges_detail_rows_per_person() {
        let all = book().contacts().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].first_name.as_deref(), Some("Ann"));
        assert_eq!(all[0].phones.len(), 1);
        assert_eq!(all[1].first_name.as_deref(), Some("Bo"));
    }

    #[test]
    fn load_rejects_blank_ids_and_returns_none_for_unknown_ones() {
        let book = book();
        assert!(matches!(book.load("  "), Err(Error::InvalidArgument(_))));
        assert_eq!(book.load("missing").unwrap(), None);
        assert_eq!(book.load("b").unwrap().unwrap().last_name.as_deref(), Some("Chen"));
    }

    #[test]
    fn query_filters_natively_and_materializes_full_contacts() {
        let book = book();
        let ops = QueryChain::new()
            .filter(Expr::contact(Field::FirstName).eq(Expr::lit("Ann")))
            .into_ops();
        // FakeStore ignores non-batch filters, so both contacts come back
        // from the native pass; materialization still loads them in full.
        let out = book.query(&ops).unwrap();
        match out {
            QueryOutcome::Items(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0]["first_name"], "Ann");
                assert_eq!(items[0]["phones"][0]["number"], "555-0100");
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        let queries = book.source.queries.lock().unwrap();
        let filter = queries[0].filter.clone().unwrap();
        assert!(filter.contains(data::MIMETYPE));
        assert!(filter.contains(structured_name::GIVEN_NAME));
        assert_eq!(
            queries[0].parameters,
            vec![mimetypes::STRUCTURED_NAME.to_string(), "Ann".to_string()]
        );
    }

    #[test]
    fn residual_predicates_filter_the_materialized_contacts() {
        let book = book();
        let ops = QueryChain::new()
            .filter(
                Expr::contact(Field::FirstName)
                    .eq(Expr::lit("Ann"))
                    .and(Expr::opaque(|c| {
                        c["phones"].as_array().map(|p| !p.is_empty()).unwrap_or(false)
                    })),
            )
            .into_ops();
        let out = book.query(&ops).unwrap();
        match out {
            QueryOutcome::Items(items) => {
                // Bo has no phones and falls to the in-memory remainder.
                assert_eq!(items.len(), 1);
                assert_eq!(items[0]["first_name"], "Ann");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn count_and_any_come_back_as_scalars() {
        let book = book();
        assert_eq!(
            book.query(&QueryChain::new().count().into_ops()).unwrap(),
            QueryOutcome::Count(2)
        );
        assert_eq!(
            book.query(&QueryChain::new().any().into_ops()).unwrap(),
            QueryOutcome::Bool(true)
        );
    }

    #[test]
    fn single_over_two_matches_is_ambiguous() {
        let book = book();
        assert_eq!(
            book.query(&QueryChain::new().single().into_ops()),
            Err(Error::Ambiguous)
        );
    }

    #[test]
    fn projected_select_returns_bare_column_values() {
        let store = FakeStore::new(vec![name_row("a", "Ann", "Lee"), name_row("b", "Bo", "Chen")]);
        let book = AddressBook::new(store);
        let ops = QueryChain::new()
            .select(EntityKind::Contact, Field::FirstName)
            .into_ops();
        let out = book.query(&ops).unwrap();
        assert_eq!(out, QueryOutcome::Items(vec![json!("Ann"), json!("Bo")]));
    }

    #[test]
    fn flattened_phone_queries_target_the_phone_table() {
        let store = FakeStore::new(vec![phone_row("a", "555-0100"), phone_row("b", "555-0101")]);
        let book = AddressBook::new(store);
        let ops = QueryChain::new().flatten(Field::Phones).into_ops();
        let out = book.query(&ops).unwrap();
        match out {
            QueryOutcome::Items(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0]["number"], "555-0100");
                assert_eq!(items[0]["type"], "mobile");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(book.source.queries.lock().unwrap()[0].table, Table::Phones);
    }

    #[test]
    fn raw_mode_keys_on_the_raw_contact_id() {
        let row: Row = [
            (data::CONTACT_ID.to_string(), json!("42")),
            (data::MIMETYPE.to_string(), json!(mimetypes::STRUCTURED_NAME)),
            (structured_name::GIVEN_NAME.to_string(), json!("Ann")),
        ]
        .into_iter()
        .collect();
        let book = AddressBook::with_aggregation(FakeStore::new(vec![row]), false);
        let all = book.contacts().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "42");
        assert!(!all[0].is_aggregate);
    }

    #[test]
    fn first_limits_the_native_window_to_one_row() {
        let book = book();
        book.query(&QueryChain::new().first_or_default().into_ops()).unwrap();
        let queries = book.source.queries.lock().unwrap();
        assert_eq!(
            queries[0].sort.as_deref(),
            Some(format!("{} LIMIT 1", contacts::LOOKUP_KEY).as_str())
        );
    }

    #[test]
    fn order_and_window_reach_the_native_sort_clause() {
        let book = book();
        let ops = QueryChain::new()
            .order_by_descending(EntityKind::Contact, Field::DisplayName)
            .skip(2)
            .take(3)
            .into_ops();
        book.query(&ops).unwrap();
        let queries = book.source.queries.lock().unwrap();
        assert_eq!(
            queries[0].sort.as_deref(),
            Some(format!("{} DESC LIMIT 2,3", contacts::DISPLAY_NAME).as_str())
        );
    }

    #[test]
    fn opaque_selectors_run_in_memory_over_full_contacts() {
        let book = book();
        let ops = QueryChain::new()
            .select_with(|c| c["first_name"].clone())
            .into_ops();
        let out = book.query(&ops).unwrap();
        assert_eq!(out, QueryOutcome::Items(vec![json!("Ann"), json!("Bo")]));
    }
}
