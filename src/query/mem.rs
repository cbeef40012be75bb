//! In-memory evaluation of the untranslated part of a query chain.
//!
//! Items are JSON values shaped like the serialized entity models. Predicates
//! evaluate under three-valued logic so that missing and null fields behave
//! the way the native store treats NULL: an item passes a filter only when
//! the predicate is definitely true.

use std::cmp::Ordering;

use serde_json::Value;

use crate::error::Error;
use crate::query::{BinOp, Expr, Field, Literal, QueryOp, Selector, Truth};

/// Result of running an operator chain over a batch of items.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Items(Vec<Value>),
    Count(usize),
    Bool(bool),
    One(Option<Value>),
}

/// The serialized-model key a field reads from.
pub fn field_key(field: Field) -> &'static str {
    match field {
        Field::DisplayName => "display_name",
        Field::Prefix => "prefix",
        Field::FirstName => "first_name",
        Field::MiddleName => "middle_name",
        Field::LastName => "last_name",
        Field::Suffix => "suffix",
        Field::Phones => "phones",
        Field::Emails => "emails",
        Field::Addresses => "addresses",
        Field::Notes => "notes",
        Field::Relationships => "relationships",
        Field::ImAccounts => "im_accounts",
        Field::Websites => "websites",
        Field::Organizations => "organizations",
        Field::PhoneNumber => "number",
        Field::PhoneType => "type",
        Field::EmailAddress => "address",
        Field::StreetAddress => "street_address",
        Field::City => "city",
        Field::Region => "region",
        Field::Country => "country",
        Field::PostalCode => "postal_code",
        Field::RelationshipName => "name",
        Field::ImAccount => "account",
        Field::WebsiteUrl => "address",
        Field::OrganizationName => "name",
        Field::OrganizationTitle => "contact_title",
        Field::NoteContents => "contents",
    }
}

fn field_value(item: &Value, field: Field) -> Value {
    item.get(field_key(field)).cloned().unwrap_or(Value::Null)
}

fn eval_value(expr: &Expr, item: &Value) -> Value {
    match expr {
        Expr::Member(m) => field_value(item, m.field),
        Expr::Literal(l) => l.to_value(),
        Expr::Binary { .. } | Expr::Opaque(_) => {
            Value::Bool(eval_predicate3(expr, item) == Truth::True)
        }
    }
}

fn truth_of(value: &Value) -> Truth {
    match value {
        Value::Bool(b) => (*b).into(),
        _ => Truth::Unknown,
    }
}

/// Three-valued comparison mirroring the native store: `=` with a NULL
/// operand is unknown, `IS NOT` treats NULL as an ordinary distinct value.
fn compare3(left: &Value, op: BinOp, right: &Value) -> Truth {
    if op == BinOp::NotEq {
        return match (left.is_null(), right.is_null()) {
            (true, true) => Truth::False,
            (true, false) | (false, true) => Truth::True,
            (false, false) => (!values_equal(left, right)).into(),
        };
    }
    if left.is_null() || right.is_null() {
        return Truth::Unknown;
    }
    match op {
        BinOp::Eq => values_equal(left, right).into(),
        BinOp::Gt => match values_cmp(left, right) {
            Some(ord) => (ord == Ordering::Greater).into(),
            None => Truth::Unknown,
        },
        BinOp::Lt => match values_cmp(left, right) {
            Some(ord) => (ord == Ordering::Less).into(),
            None => Truth::Unknown,
        },
        BinOp::NotEq | BinOp::And | BinOp::Or => Truth::Unknown,
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => left == right,
    }
}

fn values_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    }
}

/// Evaluate a predicate over one item under three-valued logic.
pub fn eval_predicate3(expr: &Expr, item: &Value) -> Truth {
    match expr {
        Expr::Opaque(p) => p.test(item).into(),
        Expr::Member(m) => truth_of(&field_value(item, m.field)),
        Expr::Literal(Literal::Bool(b)) => (*b).into(),
        Expr::Literal(_) => Truth::Unknown,
        Expr::Binary { op, left, right } => match op {
            BinOp::And => eval_predicate3(left, item).and(eval_predicate3(right, item)),
            BinOp::Or => eval_predicate3(left, item).or(eval_predicate3(right, item)),
            _ => compare3(&eval_value(left, item), *op, &eval_value(right, item)),
        },
    }
}

/// An item passes only when the predicate is definitely true.
pub fn matches(expr: &Expr, item: &Value) -> bool {
    eval_predicate3(expr, item) == Truth::True
}

/// NULLS-LAST ordering on one extracted sort key.
fn sort_cmp(a: &Value, b: &Value, descending: bool) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = values_cmp(a, b).unwrap_or(Ordering::Equal);
            if descending { ord.reverse() } else { ord }
        }
    }
}

fn usize_arg(expr: &Expr, what: &str) -> Result<usize, Error> {
    match expr {
        Expr::Literal(Literal::Int(n)) if *n >= 0 => Ok(*n as usize),
        _ => Err(Error::InvalidArgument(format!(
            "{what} requires a non-negative integer"
        ))),
    }
}

fn filtered(items: Vec<Value>, pred: &Option<Expr>) -> Vec<Value> {
    match pred {
        Some(p) => items.into_iter().filter(|item| matches(p, item)).collect(),
        None => items,
    }
}

/// Run an operator chain over a batch of already-materialized items.
pub fn apply_ops(mut items: Vec<Value>, ops: &[QueryOp]) -> Result<QueryOutcome, Error> {
    for (index, op) in ops.iter().enumerate() {
        match op {
            QueryOp::Where(pred) => items.retain(|item| matches(pred, item)),

            QueryOp::Select(Selector::Member(m)) => {
                items = items.iter().map(|item| field_value(item, m.field)).collect();
            }
            QueryOp::Select(Selector::Opaque(f)) => {
                items = items.iter().map(|item| f.apply(item)).collect();
            }

            QueryOp::SelectMany(members) => {
                if members.len() > 1 {
                    return Err(Error::NotSupported("multi-member flattening".into()));
                }
                let Some(member) = members.first() else {
                    return Err(Error::InvalidArgument("empty flattening".into()));
                };
                items = items
                    .iter()
                    .flat_map(|item| match field_value(item, member.field) {
                        Value::Array(children) => children,
                        Value::Null => Vec::new(),
                        other => vec![other],
                    })
                    .collect();
            }

            QueryOp::OrderBy { key, descending } => {
                let descending = *descending;
                let field = key.field;
                items.sort_by(|a, b| {
                    sort_cmp(&field_value(a, field), &field_value(b, field), descending)
                });
            }

            QueryOp::Skip(n) => {
                let n = usize_arg(n, "skip")?;
                items = items.into_iter().skip(n).collect();
            }
            QueryOp::Take(n) => {
                let n = usize_arg(n, "take")?;
                items.truncate(n);
            }

            QueryOp::Count(pred) => {
                return finish(QueryOutcome::Count(filtered(items, pred).len()), ops, index);
            }
            QueryOp::Any(pred) => {
                return finish(QueryOutcome::Bool(!filtered(items, pred).is_empty()), ops, index);
            }

            QueryOp::First { or_default, predicate } => {
                let mut found = filtered(items, predicate);
                let one = match (found.is_empty(), or_default) {
                    (true, true) => None,
                    (true, false) => return Err(Error::NotFound),
                    (false, _) => Some(found.remove(0)),
                };
                return finish(QueryOutcome::One(one), ops, index);
            }
            QueryOp::Single { or_default, predicate } => {
                let mut found = filtered(items, predicate);
                if found.len() > 1 {
                    return Err(Error::Ambiguous);
                }
                let one = match (found.is_empty(), or_default) {
                    (true, true) => None,
                    (true, false) => return Err(Error::NotFound),
                    (false, _) => Some(found.remove(0)),
                };
                return finish(QueryOutcome::One(one), ops, index);
            }
        }
    }
    Ok(QueryOutcome::Items(items))
}

fn finish(outcome: QueryOutcome, ops: &[QueryOp], index: usize) -> Result<QueryOutcome, Error> {
    if index + 1 < ops.len() {
        return Err(Error::InvalidArgument(
            "operators after a terminal operator".into(),
        ));
    }
    Ok(outcome)
}
