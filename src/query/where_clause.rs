use tracing::trace;

use crate::contract::data;
use crate::error::Error;
use crate::query::{
    columns, BinOp, ColumnMapping, Expr, Literal, MemberRef, TableFindResult, TableFinder,
};

/// A predicate successfully lowered to a native filter fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct LoweredPredicate {
    pub fragment: String,
    pub parameters: Vec<String>,
    pub binding: TableFindResult,
}

/// Outcome of lowering one boolean predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Lowering {
    /// Fully representable natively.
    Lowered(LoweredPredicate),
    /// The left side of one or more ANDs lowered; the listed residual
    /// sub-expressions must still be applied in memory after the native query
    /// returns. Residuals only ever restrict conjunctively, which is why this
    /// partial form exists for AND and for nothing else.
    Partial { lowered: LoweredPredicate, residuals: Vec<Expr> },
    /// Nothing representable; evaluate the whole predicate in memory.
    Fallback,
}

struct Ctx<'a> {
    finder: &'a TableFinder,
    binding: Option<TableFindResult>,
    current_map: Option<&'static ColumnMapping>,
}

struct Frag {
    text: String,
    params: Vec<String>,
}

enum Low {
    Full(Frag),
    Part(Frag, Vec<Expr>),
    Fail,
}

/// Lower a boolean predicate into a parameterized native filter fragment.
///
/// `existing` seeds the table binding when earlier parts of the same
/// translation already fixed one; a member resolving to a different table or
/// discriminator then fails the predicate. When the predicate itself
/// discovers a discriminated table, the discriminator-equality clause is
/// prepended and its value becomes the first parameter.
pub fn lower(
    expr: &Expr,
    finder: &TableFinder,
    existing: Option<TableFindResult>,
) -> Result<Lowering, Error> {
    let seeded = existing.is_some();
    let mut ctx = Ctx { finder, binding: existing, current_map: None };

    let low = lower_node(&mut ctx, expr)?;

    let binding = match ctx.binding {
        Some(b) => b,
        // No member access fixed a table; nothing to run natively.
        None => return Ok(Lowering::Fallback),
    };

    let wrap = |mut frag: Frag| -> LoweredPredicate {
        if !seeded {
            if let Some(mime) = binding.mime_type {
                frag.text = format!("(({} = ?) AND {})", data::MIMETYPE, frag.text);
                frag.params.insert(0, mime.to_string());
            }
        }
        LoweredPredicate { fragment: frag.text, parameters: frag.params, binding }
    };

    Ok(match low {
        Low::Full(frag) => Lowering::Lowered(wrap(frag)),
        Low::Part(frag, residuals) => {
            trace!(residuals = residuals.len(), "predicate lowered partially");
            Lowering::Partial { lowered: wrap(frag), residuals }
        }
        Low::Fail => Lowering::Fallback,
    })
}

fn lower_node(ctx: &mut Ctx<'_>, expr: &Expr) -> Result<Low, Error> {
    match expr {
        Expr::Opaque(_) => Ok(Low::Fail),
        Expr::Literal(lit) => Ok(lower_literal(ctx, lit)),
        Expr::Member(member) => lower_member(ctx, member),
        Expr::Binary { op, left, right } => {
            let l = lower_node(ctx, left)?;
            // A failed left operand fails the node outright; the asymmetric
            // recovery below only exists for the right side of an AND.
            if matches!(l, Low::Fail) {
                return Ok(Low::Fail);
            }

            let r = lower_node(ctx, right)?;

            Ok(match op {
                BinOp::And => match (l, r) {
                    (Low::Full(lf), Low::Full(rf)) => Low::Full(join(lf, rf, op)),
                    (Low::Full(lf), Low::Fail) => Low::Part(paren(lf), vec![(**right).clone()]),
                    (Low::Full(lf), Low::Part(rf, res)) => Low::Part(join(lf, rf, op), res),
                    (Low::Part(lf, res), Low::Full(rf)) => Low::Part(join(lf, rf, op), res),
                    (Low::Part(lf, mut res), Low::Part(rf, mut rres)) => {
                        res.append(&mut rres);
                        Low::Part(join(lf, rf, op), res)
                    }
                    (Low::Part(lf, mut res), Low::Fail) => {
                        res.push((**right).clone());
                        Low::Part(paren(lf), res)
                    }
                    (Low::Fail, _) => Low::Fail,
                },
                // OR admits no partial representation: a residual right side
                // could widen, not restrict, the native result set.
                _ => match (l, r) {
                    (Low::Full(lf), Low::Full(rf)) => Low::Full(join(lf, rf, op)),
                    _ => Low::Fail,
                },
            })
        }
    }
}

fn lower_member(ctx: &mut Ctx<'_>, member: &MemberRef) -> Result<Low, Error> {
    let found = match ctx.finder.find(member) {
        Some(found) => found,
        None => return Ok(Low::Fail),
    };

    match ctx.binding {
        None => ctx.binding = Some(found),
        Some(bound) => {
            if bound.table != found.table || bound.mime_type != found.mime_type {
                trace!(?member, "member resolves to a different table, predicate falls back");
                return Ok(Low::Fail);
            }
        }
    }

    let map = match columns::resolve(member.entity, member.field) {
        Some(map) => map,
        None => return Ok(Low::Fail),
    };
    if map.columns.is_empty() {
        return Ok(Low::Fail);
    }
    if map.columns.len() > 1 {
        // Comparisons are single-column by construction.
        return Err(Error::NotSupported("multi-column member in a comparison".into()));
    }

    ctx.current_map = Some(map);
    Ok(Low::Full(Frag { text: map.columns[0].to_string(), params: Vec::new() }))
}

fn lower_literal(ctx: &Ctx<'_>, lit: &Literal) -> Low {
    // The column mapping of the most recent member access may supply a
    // transform reducing host-side values to queryable literals.
    let lit = match ctx.current_map.and_then(|m| m.to_queryable) {
        Some(transform) => match transform(lit) {
            Some(l) => l,
            None => return Low::Fail,
        },
        None => lit.clone(),
    };

    match lit {
        Literal::Null => Low::Full(Frag { text: "NULL".into(), params: Vec::new() }),
        // Booleans are emitted as literal 1/0 so truthiness survives the
        // string-typed parameter channel unchanged.
        Literal::Bool(b) => Low::Full(Frag {
            text: if b { "1" } else { "0" }.into(),
            params: Vec::new(),
        }),
        Literal::Composite(_) => Low::Fail,
        other => match other.to_parameter() {
            Some(p) => Low::Full(Frag { text: "?".into(), params: vec![p] }),
            None => Low::Fail,
        },
    }
}

fn join(l: Frag, r: Frag, op: &BinOp) -> Frag {
    let mut params = l.params;
    params.extend(r.params);
    Frag { text: format!("({}{}{})", l.text, op.native(), r.text), params }
}

fn paren(f: Frag) -> Frag {
    Frag { text: format!("({})", f.text), params: f.params }
}
