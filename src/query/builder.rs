use serde_json::Value;

use crate::query::{
    EntityKind, Expr, Field, Literal, MemberRef, OpaqueSelector, QueryOp, Selector,
};

/// Fluent construction of an operator chain.
///
/// The builder only records operators; nothing touches the native store until
/// the chain is handed to an executor. Each call appends in order, so the
/// chain replays exactly as written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryChain {
    ops: Vec<QueryOp>,
}

impl QueryChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[QueryOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<QueryOp> {
        self.ops
    }

    pub fn filter(mut self, predicate: Expr) -> Self {
        self.ops.push(QueryOp::Where(predicate));
        self
    }

    pub fn select(mut self, entity: EntityKind, field: Field) -> Self {
        self.ops
            .push(QueryOp::Select(Selector::Member(MemberRef::new(entity, field))));
        self
    }

    pub fn select_with(mut self, f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        self.ops
            .push(QueryOp::Select(Selector::Opaque(OpaqueSelector::new(f))));
        self
    }

    pub fn flatten(mut self, field: Field) -> Self {
        self.ops
            .push(QueryOp::SelectMany(vec![MemberRef::contact(field)]));
        self
    }

    pub fn order_by(mut self, entity: EntityKind, field: Field) -> Self {
        self.ops.push(QueryOp::OrderBy {
            key: MemberRef::new(entity, field),
            descending: false,
        });
        self
    }

    pub fn order_by_descending(mut self, entity: EntityKind, field: Field) -> Self {
        self.ops.push(QueryOp::OrderBy {
            key: MemberRef::new(entity, field),
            descending: true,
        });
        self
    }

    pub fn skip(mut self, n: i64) -> Self {
        self.ops.push(QueryOp::Skip(Expr::Literal(Literal::Int(n))));
        self
    }

    pub fn take(mut self, n: i64) -> Self {
        self.ops.push(QueryOp::Take(Expr::Literal(Literal::Int(n))));
        self
    }

    pub fn count(mut self) -> Self {
        self.ops.push(QueryOp::Count(None));
        self
    }

    pub fn count_where(mut self, predicate: Expr) -> Self {
        self.ops.push(QueryOp::Count(Some(predicate)));
        self
    }

    pub fn any(mut self) -> Self {
        self.ops.push(QueryOp::Any(None));
        self
    }

    pub fn any_where(mut self, predicate: Expr) -> Self {
        self.ops.push(QueryOp::Any(Some(predicate)));
        self
    }

    pub fn first(mut self) -> Self {
        self.ops.push(QueryOp::First { or_default: false, predicate: None });
        self
    }

    pub fn first_or_default(mut self) -> Self {
        self.ops.push(QueryOp::First { or_default: true, predicate: None });
        self
    }

    pub fn single(mut self) -> Self {
        self.ops.push(QueryOp::Single { or_default: false, predicate: None });
        self
    }

    pub fn single_or_default(mut self) -> Self {
        self.ops.push(QueryOp::Single { or_default: true, predicate: None });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_records_operators_in_call_order() {
        let chain = QueryChain::new()
            .filter(Expr::contact(Field::FirstName).eq(Expr::lit("Ann")))
            .order_by(EntityKind::Contact, Field::DisplayName)
            .skip(2)
            .take(5);
        let ops = chain.into_ops();
        assert_eq!(ops.len(), 4);
        assert!(matches!(ops[0], QueryOp::Where(_)));
        assert!(matches!(ops[1], QueryOp::OrderBy { descending: false, .. }));
        assert_eq!(ops[2], QueryOp::Skip(Expr::lit(2)));
        assert_eq!(ops[3], QueryOp::Take(Expr::lit(5)));
    }

    #[test]
    fn flatten_targets_a_contact_collection() {
        let ops = QueryChain::new().flatten(Field::Phones).into_ops();
        assert_eq!(ops, vec![QueryOp::SelectMany(vec![MemberRef::contact(Field::Phones)])]);
    }
}
