use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::query::Literal;

/// Entity kinds that participate in query translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Contact,
    Phone,
    Email,
    Address,
    Relationship,
    ImAccount,
    Website,
    Organization,
    Note,
}

/// Closed enumeration of every queryable member across all entity kinds.
/// Pairing with `EntityKind` replaces the reflection-based member lookup of
/// dynamic object models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    // Contact
    DisplayName,
    Prefix,
    FirstName,
    MiddleName,
    LastName,
    Suffix,
    Phones,
    Emails,
    Addresses,
    Notes,
    Relationships,
    ImAccounts,
    Websites,
    Organizations,
    // Phone
    PhoneNumber,
    PhoneType,
    // Email
    EmailAddress,
    // Address
    StreetAddress,
    City,
    Region,
    Country,
    PostalCode,
    // Relationship
    RelationshipName,
    // InstantMessaging
    ImAccount,
    // Website
    WebsiteUrl,
    // Organization
    OrganizationName,
    OrganizationTitle,
    // Note
    NoteContents,
}

/// A member access: one field of one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub entity: EntityKind,
    pub field: Field,
}

impl MemberRef {
    pub fn new(entity: EntityKind, field: Field) -> Self {
        Self { entity, field }
    }

    pub fn contact(field: Field) -> Self {
        Self::new(EntityKind::Contact, field)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    And,
    Or,
    Eq,
    NotEq,
    Gt,
    Lt,
}

impl BinOp {
    /// Native operator text. `NotEq` lowers to `IS NOT` so NULL comparisons
    /// follow the store's tri-state semantics.
    pub fn native(self) -> &'static str {
        match self {
            BinOp::And => " AND ",
            BinOp::Or => " OR ",
            BinOp::Eq => " = ",
            BinOp::NotEq => " IS NOT ",
            BinOp::Gt => " > ",
            BinOp::Lt => " < ",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinOp::And => write!(f, "AND"),
            BinOp::Or => write!(f, "OR"),
            BinOp::Eq => write!(f, "="),
            BinOp::NotEq => write!(f, "!="),
            BinOp::Gt => write!(f, ">"),
            BinOp::Lt => write!(f, "<"),
        }
    }
}

impl fmt::Debug for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BinOp({})", self)
    }
}

/// Three-valued truth for predicate evaluation over nullable data.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
    Unknown,
}

impl Truth {
    pub fn not(&self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Unknown => Self::Unknown,
        }
    }

    pub fn and(&self, b: Self) -> Self {
        match (self, b) {
            (Self::False, _) | (_, Self::False) => Self::False,
            (Self::Unknown, _) | (_, Self::Unknown) => Self::Unknown,
            (Self::True, Self::True) => Self::True,
        }
    }

    pub fn or(&self, b: Self) -> Self {
        match (self, b) {
            (Self::True, _) | (_, Self::True) => Self::True,
            (Self::Unknown, _) | (_, Self::Unknown) => Self::Unknown,
            (Self::False, Self::False) => Self::False,
        }
    }
}

impl From<bool> for Truth {
    fn from(b: bool) -> Self {
        if b { Self::True } else { Self::False }
    }
}

impl fmt::Display for Truth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

impl fmt::Debug for Truth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Truth({})", self)
    }
}

/// An arbitrary host predicate over a materialized entity. Never natively
/// representable; referencing one forces in-memory evaluation.
#[derive(Clone)]
pub struct OpaquePredicate(Arc<dyn Fn(&Value) -> bool + Send + Sync>);

impl OpaquePredicate {
    pub fn new(f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn test(&self, item: &Value) -> bool {
        (self.0)(item)
    }
}

impl fmt::Debug for OpaquePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpaquePredicate(..)")
    }
}

impl PartialEq for OpaquePredicate {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// An arbitrary host projection over a materialized entity.
#[derive(Clone)]
pub struct OpaqueSelector(Arc<dyn Fn(&Value) -> Value + Send + Sync>);

impl OpaqueSelector {
    pub fn new(f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn apply(&self, item: &Value) -> Value {
        (self.0)(item)
    }
}

impl fmt::Debug for OpaqueSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpaqueSelector(..)")
    }
}

impl PartialEq for OpaqueSelector {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Boolean/value expression tree over the queried entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Member(MemberRef),
    Literal(Literal),
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Opaque(OpaquePredicate),
}

impl Expr {
    pub fn member(entity: EntityKind, field: Field) -> Expr {
        Expr::Member(MemberRef::new(entity, field))
    }

    pub fn contact(field: Field) -> Expr {
        Expr::Member(MemberRef::contact(field))
    }

    pub fn lit(value: impl Into<Literal>) -> Expr {
        Expr::Literal(value.into())
    }

    pub fn opaque(f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Expr {
        Expr::Opaque(OpaquePredicate::new(f))
    }

    fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary { op, left: Box::new(left), right: Box::new(right) }
    }

    pub fn and(self, right: Expr) -> Expr {
        Expr::binary(BinOp::And, self, right)
    }

    pub fn or(self, right: Expr) -> Expr {
        Expr::binary(BinOp::Or, self, right)
    }

    pub fn eq(self, right: Expr) -> Expr {
        Expr::binary(BinOp::Eq, self, right)
    }

    pub fn ne(self, right: Expr) -> Expr {
        Expr::binary(BinOp::NotEq, self, right)
    }

    pub fn gt(self, right: Expr) -> Expr {
        Expr::binary(BinOp::Gt, self, right)
    }

    pub fn lt(self, right: Expr) -> Expr {
        Expr::binary(BinOp::Lt, self, right)
    }
}

/// Projection shape handed to `Select`.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Member(MemberRef),
    Opaque(OpaqueSelector),
}

/// One chained query operator. A query is an ordered `Vec<QueryOp>` applied
/// left to right to the root collection.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOp {
    Where(Expr),
    Select(Selector),
    /// Flatten a one-to-many member. Carries every member the selector
    /// references; more than one is structurally unsupported.
    SelectMany(Vec<MemberRef>),
    OrderBy { key: MemberRef, descending: bool },
    Skip(Expr),
    Take(Expr),
    Count(Option<Expr>),
    Any(Option<Expr>),
    First { or_default: bool, predicate: Option<Expr> },
    Single { or_default: bool, predicate: Option<Expr> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truth_three_valued_tables() {
        assert_eq!(Truth::True.and(Truth::Unknown), Truth::Unknown);
        assert_eq!(Truth::False.and(Truth::Unknown), Truth::False);
        assert_eq!(Truth::True.or(Truth::Unknown), Truth::True);
        assert_eq!(Truth::False.or(Truth::Unknown), Truth::Unknown);
        assert_eq!(Truth::Unknown.not(), Truth::Unknown);
    }

    #[test]
    fn not_eq_lowers_to_is_not() {
        assert_eq!(BinOp::NotEq.native(), " IS NOT ");
    }

    #[test]
    fn expr_builders_compose() {
        let e = Expr::contact(Field::FirstName)
            .eq(Expr::lit("Ann"))
            .and(Expr::contact(Field::LastName).eq(Expr::lit("Lee")));
        match e {
            Expr::Binary { op: BinOp::And, left, right } => {
                assert!(matches!(*left, Expr::Binary { op: BinOp::Eq, .. }));
                assert!(matches!(*right, Expr::Binary { op: BinOp::Eq, .. }));
            }
            other => panic!("expected AND at root, got {other:?}"),
        }
    }
}
