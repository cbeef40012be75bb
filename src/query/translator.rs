use tracing::debug;

use crate::contract::data;
use crate::error::Error;
use crate::query::{
    columns, lower, ColumnMapping, EntityKind, Expr, Literal, LoweredPredicate, Lowering,
    MemberRef, QueryDescriptor, QueryOp, Selector, TableFindResult, TableFinder, ValueKind,
};

/// What one result element of a translated query is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Entity(EntityKind),
    /// A projected native column, materialized through its mapping.
    Column(&'static ColumnMapping),
}

/// The frozen result of one translation pass.
///
/// `residual_predicates` restrict conjunctively in memory after the native
/// query returns; `residual_ops` is the untranslated tail of the chain, to be
/// applied in memory in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub descriptor: QueryDescriptor,
    pub residual_predicates: Vec<Expr>,
    pub residual_ops: Vec<QueryOp>,
    pub element: ElementKind,
}

/// Walks an operator chain left to right, peeling recognized operators into
/// the accumulating descriptor and degrading everything it cannot represent
/// to in-memory residuals. Owns all accumulator state for one pass; a new
/// chain needs a new translator.
pub struct Translator {
    finder: TableFinder,
    descriptor: QueryDescriptor,
    binding: Option<TableFindResult>,
    residual_predicates: Vec<Expr>,
    residual_ops: Vec<QueryOp>,
    element: ElementKind,
    fallback: bool,
}

impl Translator {
    pub fn new(finder: TableFinder) -> Self {
        Self {
            finder,
            descriptor: QueryDescriptor::new(),
            binding: None,
            residual_predicates: Vec::new(),
            residual_ops: Vec::new(),
            element: ElementKind::Entity(EntityKind::Contact),
            fallback: false,
        }
    }

    pub fn translate(mut self, ops: &[QueryOp]) -> Result<Translation, Error> {
        let mut terminal = false;

        for op in ops {
            // Once fallback flips or a terminal operator ran, the rest of the
            // chain stays untranslated for in-memory evaluation.
            if self.fallback || terminal {
                self.residual_ops.push(op.clone());
                continue;
            }

            match op {
                QueryOp::Where(pred) => {
                    if !self.visit_where(pred)? {
                        debug!("predicate not representable natively, chain falls back");
                        self.fallback = true;
                        self.residual_ops.push(op.clone());
                    }
                }

                QueryOp::Select(Selector::Member(member)) => self.visit_select(op, member)?,
                QueryOp::Select(Selector::Opaque(_)) => {
                    self.fallback = true;
                    self.residual_ops.push(op.clone());
                }

                QueryOp::SelectMany(members) => self.visit_select_many(op, members)?,

                QueryOp::OrderBy { key, descending } => {
                    self.visit_order(op, key, *descending)?;
                }

                QueryOp::Skip(n) => match literal_count(n) {
                    Some(n) => self.descriptor.skip = n,
                    None => {
                        self.fallback = true;
                        self.residual_ops.push(op.clone());
                    }
                },
                QueryOp::Take(n) => match literal_count(n) {
                    Some(n) => self.descriptor.take = n,
                    None => {
                        self.fallback = true;
                        self.residual_ops.push(op.clone());
                    }
                },

                QueryOp::Count(pred) => {
                    if self.visit_optional_where(op, pred)? {
                        self.descriptor.is_count = true;
                        terminal = true;
                    }
                }
                QueryOp::Any(pred) => {
                    if self.visit_optional_where(op, pred)? {
                        self.descriptor.is_any = true;
                        terminal = true;
                    }
                }

                QueryOp::First { or_default, predicate } => {
                    if self.visit_optional_where(op, predicate)? {
                        self.descriptor.take = 1;
                        // The extraction itself always happens in memory over
                        // the limited row set.
                        self.residual_ops
                            .push(QueryOp::First { or_default: *or_default, predicate: None });
                    }
                    terminal = true;
                }
                QueryOp::Single { or_default, predicate } => {
                    if self.visit_optional_where(op, predicate)? {
                        // Take two rows so post-processing can tell "exactly
                        // one" from "more than one".
                        self.descriptor.take = 2;
                        self.residual_ops
                            .push(QueryOp::Single { or_default: *or_default, predicate: None });
                    }
                    terminal = true;
                }
            }
        }

        if self.descriptor.table().is_none() {
            self.descriptor.bind_table(self.finder.default_table());
        }

        Ok(Translation {
            descriptor: self.descriptor,
            residual_predicates: self.residual_predicates,
            residual_ops: self.residual_ops,
            element: self.element,
        })
    }

    /// Lower one predicate into the descriptor. Returns false when the
    /// predicate cannot be represented at all.
    fn visit_where(&mut self, pred: &Expr) -> Result<bool, Error> {
        match lower(pred, &self.finder, self.binding)? {
            Lowering::Lowered(p) => {
                self.apply_lowered(p);
                Ok(true)
            }
            Lowering::Partial { lowered, residuals } => {
                self.apply_lowered(lowered);
                self.residual_predicates.extend(residuals);
                Ok(true)
            }
            Lowering::Fallback => Ok(false),
        }
    }

    /// Inline predicate of Count/Any/First/Single. Returns false when the
    /// predicate forced fallback, in which case the whole operator is
    /// preserved for in-memory evaluation.
    fn visit_optional_where(&mut self, op: &QueryOp, pred: &Option<Expr>) -> Result<bool, Error> {
        if let Some(pred) = pred {
            if !self.visit_where(pred)? {
                self.fallback = true;
                self.residual_ops.push(op.clone());
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn apply_lowered(&mut self, lowered: LoweredPredicate) {
        if self.binding.is_none() {
            self.binding = Some(lowered.binding);
        }
        self.descriptor.bind_table(lowered.binding.table);
        self.descriptor.push_fragment(&lowered.fragment, lowered.parameters);
    }

    /// Fix the target table through a member access outside a predicate
    /// (projection, ordering, flattening). Newly binding a discriminated
    /// table prepends the discriminator-equality clause.
    fn bind_member(&mut self, member: &MemberRef) -> bool {
        let Some(found) = self.finder.find(member) else {
            self.fallback = true;
            return false;
        };

        match self.binding {
            None => {
                self.binding = Some(found);
                self.descriptor.bind_table(found.table);
                if let Some(mime) = found.mime_type {
                    self.descriptor
                        .push_fragment(&format!("({} = ?)", data::MIMETYPE), vec![mime.to_string()]);
                }
                true
            }
            Some(bound) if bound.table == found.table && bound.mime_type == found.mime_type => true,
            Some(_) => {
                debug!(?member, "member binds a second table, chain falls back");
                self.fallback = true;
                false
            }
        }
    }

    fn visit_select(&mut self, op: &QueryOp, member: &MemberRef) -> Result<(), Error> {
        // Residual predicates need full entities; projecting the native row
        // down to one column would starve them. Degrade the projection.
        if !self.residual_predicates.is_empty() {
            self.fallback = true;
            self.residual_ops.push(op.clone());
            return Ok(());
        }

        let map = match columns::resolve(member.entity, member.field) {
            Some(map) if !map.columns.is_empty() => map,
            _ => {
                self.fallback = true;
                self.residual_ops.push(op.clone());
                return Ok(());
            }
        };

        if !self.bind_member(member) {
            self.residual_ops.push(op.clone());
            return Ok(());
        }

        self.descriptor.push_projection(map.columns);
        self.element = ElementKind::Column(map);
        Ok(())
    }

    fn visit_select_many(&mut self, op: &QueryOp, members: &[MemberRef]) -> Result<(), Error> {
        if members.len() > 1 {
            return Err(Error::NotSupported("multi-member flattening".into()));
        }
        let Some(member) = members.first() else {
            self.fallback = true;
            self.residual_ops.push(op.clone());
            return Ok(());
        };

        let related = match columns::resolve(member.entity, member.field) {
            Some(map) => match map.value {
                ValueKind::Collection(kind) => kind,
                _ => {
                    self.fallback = true;
                    self.residual_ops.push(op.clone());
                    return Ok(());
                }
            },
            None => {
                self.fallback = true;
                self.residual_ops.push(op.clone());
                return Ok(());
            }
        };

        if !self.bind_member(member) {
            self.residual_ops.push(op.clone());
            return Ok(());
        }

        // The rest of the chain now runs against the related entity.
        self.element = ElementKind::Entity(related);
        Ok(())
    }

    fn visit_order(&mut self, op: &QueryOp, key: &MemberRef, descending: bool) -> Result<(), Error> {
        if !self.bind_member(key) {
            self.residual_ops.push(op.clone());
            return Ok(());
        }

        match columns::resolve(key.entity, key.field) {
            Some(map) if !map.columns.is_empty() => {
                if map.columns.len() > 1 {
                    return Err(Error::NotSupported("multi-column sort key".into()));
                }
                self.descriptor.push_sort(map.columns[0], descending);
                Ok(())
            }
            _ => {
                self.fallback = true;
                self.residual_ops.push(op.clone());
                Ok(())
            }
        }
    }
}

fn literal_count(expr: &Expr) -> Option<i64> {
    match expr {
        Expr::Literal(Literal::Int(n)) if *n >= 0 => Some(*n),
        _ => None,
    }
}
