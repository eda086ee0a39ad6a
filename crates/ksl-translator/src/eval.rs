//! Compile-time evaluation of literal/binary-operator subtrees.
//!
//! Grounded on the original resolver's constant folder (used there to check
//! array bounds and array sizes): only `LitExpr` and `BinaryExpr` nodes
//! fold, only `+ - * /` (all families) and `^ | &` (integer families) are
//! supported, and operands from different numeric families never combine.
//! Folding returns `Ok(None)` for anything outside that — callers treat
//! absence as "not a compile-time constant" and decide for themselves
//! whether that's fatal (an array size must fold) or survivable (an index
//! bound check is best-effort).

use crate::arena::Handle;
use crate::ast::{Arena, BinaryOp, Expr, LitValue};
use crate::error::ResolveError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue {
    I(i64),
    U(u64),
    F(f64),
}

impl ConstValue {
    pub fn as_i64(self) -> i64 {
        match self {
            ConstValue::I(v) => v,
            ConstValue::U(v) => v as i64,
            ConstValue::F(v) => v as i64,
        }
    }

    fn from_lit(v: LitValue) -> Self {
        match v {
            LitValue::I16(v) => ConstValue::I(v as i64),
            LitValue::I32(v) => ConstValue::I(v as i64),
            LitValue::I64(v) => ConstValue::I(v),
            LitValue::U16(v) => ConstValue::U(v as u64),
            LitValue::U32(v) => ConstValue::U(v as u64),
            LitValue::U64(v) => ConstValue::U(v),
            LitValue::F32(v) => ConstValue::F(v as f64),
            LitValue::F64(v) => ConstValue::F(v),
        }
    }
}

/// Folds `expr` to a constant value, if it's one.
pub fn eval_const(arena: &Arena, expr: Handle<Expr>) -> Result<Option<ConstValue>, ResolveError> {
    match arena.exprs.get(expr) {
        Expr::Lit(lit) => Ok(Some(ConstValue::from_lit(lit.value))),
        Expr::Binary(b) => {
            let lhs = eval_const(arena, b.lhs)?;
            let rhs = eval_const(arena, b.rhs)?;
            match (lhs, rhs) {
                (Some(l), Some(r)) => fold(b.op, l, r).map(Some),
                _ => Ok(None),
            }
        }
        _ => Ok(None),
    }
}

fn fold(op: BinaryOp, l: ConstValue, r: ConstValue) -> Result<ConstValue, ResolveError> {
    use ConstValue::*;
    match (l, r) {
        (F(a), F(b)) => fold_float(op, a, b),
        (I(a), I(b)) => fold_int(op, a, b),
        (U(a), U(b)) => fold_uint(op, a, b),
        _ => Err(ResolveError::ConstUnsupportedOp),
    }
}

fn fold_float(op: BinaryOp, a: f64, b: f64) -> Result<ConstValue, ResolveError> {
    let v = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(ResolveError::ConstDivByZero);
            }
            a / b
        }
        _ => return Err(ResolveError::ConstUnsupportedOp),
    };
    Ok(ConstValue::F(v))
}

fn fold_int(op: BinaryOp, a: i64, b: i64) -> Result<ConstValue, ResolveError> {
    let v = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => {
            if b == 0 {
                return Err(ResolveError::ConstDivByZero);
            }
            a.wrapping_div(b)
        }
        BinaryOp::BitXor => a ^ b,
        BinaryOp::BitOr => a | b,
        BinaryOp::BitAnd => a & b,
        _ => return Err(ResolveError::ConstUnsupportedOp),
    };
    Ok(ConstValue::I(v))
}

fn fold_uint(op: BinaryOp, a: u64, b: u64) -> Result<ConstValue, ResolveError> {
    let v = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => {
            if b == 0 {
                return Err(ResolveError::ConstDivByZero);
            }
            a.wrapping_div(b)
        }
        BinaryOp::BitXor => a ^ b,
        BinaryOp::BitOr => a | b,
        BinaryOp::BitAnd => a & b,
        _ => return Err(ResolveError::ConstUnsupportedOp),
    };
    Ok(ConstValue::U(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryExpr, LitExpr};
    use crate::token::SourceLocation;

    fn loc() -> SourceLocation {
        SourceLocation { line: 1, column: 1 }
    }

    #[test]
    fn folds_simple_arithmetic() {
        let mut arena = Arena::new();
        let a = arena.exprs.make(Expr::Lit(LitExpr { value: LitValue::I32(3), loc: loc() }));
        let b = arena.exprs.make(Expr::Lit(LitExpr { value: LitValue::I32(4), loc: loc() }));
        let add = arena.exprs.make(Expr::Binary(BinaryExpr { op: BinaryOp::Add, lhs: a, rhs: b, loc: loc() }));
        assert_eq!(eval_const(&arena, add).unwrap(), Some(ConstValue::I(7)));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let mut arena = Arena::new();
        let a = arena.exprs.make(Expr::Lit(LitExpr { value: LitValue::I32(1), loc: loc() }));
        let zero = arena.exprs.make(Expr::Lit(LitExpr { value: LitValue::I32(0), loc: loc() }));
        let div = arena.exprs.make(Expr::Binary(BinaryExpr { op: BinaryOp::Div, lhs: a, rhs: zero, loc: loc() }));
        assert!(matches!(eval_const(&arena, div), Err(ResolveError::ConstDivByZero)));
    }

    #[test]
    fn mixed_families_are_unsupported() {
        let mut arena = Arena::new();
        let i = arena.exprs.make(Expr::Lit(LitExpr { value: LitValue::I32(1), loc: loc() }));
        let f = arena.exprs.make(Expr::Lit(LitExpr { value: LitValue::F32(1.0), loc: loc() }));
        let add = arena.exprs.make(Expr::Binary(BinaryExpr { op: BinaryOp::Add, lhs: i, rhs: f, loc: loc() }));
        assert!(matches!(eval_const(&arena, add), Err(ResolveError::ConstUnsupportedOp)));
    }

    #[test]
    fn non_constant_leaf_yields_none() {
        let mut arena = Arena::new();
        let id = arena.exprs.make(Expr::Id(crate::ast::IdExpr { name: "n".into(), loc: loc() }));
        assert_eq!(eval_const(&arena, id).unwrap(), None);
    }
}
