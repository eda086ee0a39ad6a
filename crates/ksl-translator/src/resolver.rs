//! Semantic analysis: scope construction, type resolution, and the checks
//! that make "parsed" into "meaningful" (spec.md §4.4).
//!
//! Grounded on the original resolver's walk order, preserved here even
//! where it reads as a limitation rather than a deliberate design: a
//! function's own declaration is installed into the enclosing scope only
//! after its body has been resolved, so functions can't call themselves or
//! forward-reference a function declared later in the same module. Nothing
//! in spec.md asks for recursion support, and original_source's resolver.cc
//! resolves in exactly this order, so the limitation is kept rather than
//! "fixed".

use crate::arena::Handle;
use crate::ast::{Arena, ArrayExpr, BinaryExpr, BinaryOp, CallExpr, Decl, Expr, TypeExpr};
use crate::error::ResolveError;
use crate::eval::eval_const;
use crate::sem::{ScopeId, SemanticInfo};
use crate::types::{Member, Type, TypeId, TypeRegistry};
use crate::CompilationContext;

/// Resolves `module` against `ctx`, filling in every scope and type in
/// [`SemanticInfo`]. Fatal on the first semantic error, per spec.md §7.
pub fn resolve(ctx: &mut CompilationContext, module: Handle<crate::ast::ModuleNode>) -> Result<(), ResolveError> {
    let mut r = Resolver { arena: &ctx.arena, types: &mut ctx.types, sem: &mut ctx.sem, current_return_type: None };
    r.resolve_module(module)
}

struct Resolver<'a> {
    arena: &'a Arena,
    types: &'a mut TypeRegistry,
    sem: &'a mut SemanticInfo,
    current_return_type: Option<TypeId>,
}

impl<'a> Resolver<'a> {
    fn resolve_module(&mut self, module: Handle<crate::ast::ModuleNode>) -> Result<(), ResolveError> {
        let scope = self.sem.new_scope(None);
        self.sem.module_scope.insert(module, scope);
        for &decl in &self.arena.modules.get(module).decls {
            self.resolve_global_decl(decl, scope)?;
        }
        Ok(())
    }

    fn resolve_global_decl(&mut self, decl: Handle<Decl>, scope: ScopeId) -> Result<(), ResolveError> {
        match self.arena.decls.get(decl) {
            Decl::Struct(_) => self.resolve_struct(decl, scope),
            Decl::Buffer(b) => {
                let access = b.access;
                let ty_expr = b.ty;
                let ty = self.resolve_type_expr(ty_expr, true)?;
                self.sem.decl_types.insert(decl, ty);
                self.sem.buffer_access.insert(decl, access);
                self.sem.add_decl(scope, decl);
                Ok(())
            }
            Decl::Uniform(u) => {
                let ty_expr = u.ty;
                let ty = self.resolve_type_expr(ty_expr, false)?;
                self.sem.decl_types.insert(decl, ty);
                self.sem.add_decl(scope, decl);
                Ok(())
            }
            Decl::Func(_) => self.resolve_func(decl, scope),
            other => unreachable!("not a global declaration: {other:?}"),
        }
    }

    fn resolve_struct(&mut self, decl: Handle<Decl>, scope: ScopeId) -> Result<(), ResolveError> {
        let Decl::Struct(s) = self.arena.decls.get(decl) else { unreachable!() };
        let mut seen = std::collections::HashSet::new();
        let mut members = Vec::new();
        for &member_decl in &s.members {
            let Decl::StructMember(m) = self.arena.decls.get(member_decl) else { unreachable!() };
            if !seen.insert(m.name.clone()) {
                return Err(ResolveError::DuplicateMember { struct_name: s.name.clone(), name: m.name.clone() });
            }
            let ty = self.resolve_type_expr(m.ty, false)?;
            self.sem.decl_types.insert(member_decl, ty);
            members.push(Member { name: m.name.clone(), ty });
        }
        let struct_ty = self.types.intern_struct(s.name.clone(), members);
        self.sem.decl_types.insert(decl, struct_ty);
        self.sem.add_decl(scope, decl);
        Ok(())
    }

    fn resolve_func(&mut self, decl: Handle<Decl>, scope: ScopeId) -> Result<(), ResolveError> {
        let Decl::Func(f) = self.arena.decls.get(decl) else { unreachable!() };
        let return_type = self.resolve_type_expr(f.return_type, false)?;
        let func_scope = self.sem.new_scope(Some(scope));
        for &arg in &f.args {
            let Decl::FuncArg(a) = self.arena.decls.get(arg) else { unreachable!() };
            let ty = self.resolve_type_expr(a.ty, false)?;
            self.sem.decl_types.insert(arg, ty);
            self.sem.add_decl(func_scope, arg);
        }
        let previous_return = self.current_return_type.replace(return_type);
        self.resolve_stat(f.body, func_scope)?;
        self.current_return_type = previous_return;
        self.sem.decl_types.insert(decl, return_type);
        self.sem.add_decl(scope, decl);
        Ok(())
    }

    /// Resolves a type-position expression. `allow_runtime_sized` is only
    /// set for a buffer's top-level element type — everywhere else a
    /// sizeless array is a semantic error (spec.md §4.2/§4.4).
    fn resolve_type_expr(&mut self, expr: Handle<Expr>, allow_runtime_sized: bool) -> Result<TypeId, ResolveError> {
        let Expr::Type(node) = self.arena.exprs.get(expr) else {
            unreachable!("type positions always hold an Expr::Type node")
        };
        match &node.ty {
            TypeExpr::Id(name) => self.types.find_by_name(name).ok_or_else(|| ResolveError::NotAType { name: name.clone() }),
            TypeExpr::Array { elem, size } => {
                let elem_ty = self.resolve_type_expr(*elem, false)?;
                match size {
                    Some(size_expr) => {
                        let value = eval_const(self.arena, *size_expr)?.ok_or(ResolveError::ArraySizeNotConstant)?;
                        let count = value.as_i64();
                        if count <= 0 {
                            return Err(ResolveError::ArraySizeNotConstant);
                        }
                        Ok(self.types.intern_array(elem_ty, count as u64))
                    }
                    None => {
                        if !allow_runtime_sized {
                            return Err(ResolveError::RuntimeSizedArrayNotAllowed { ty: self.types.mangled_name(elem_ty) });
                        }
                        Ok(self.types.intern_array(elem_ty, 0))
                    }
                }
            }
        }
    }

    fn resolve_stat(&mut self, stat: Handle<crate::ast::Stat>, scope: ScopeId) -> Result<(), ResolveError> {
        use crate::ast::Stat;
        match self.arena.stats.get(stat) {
            Stat::Block(b) => {
                let inner = self.sem.new_scope(Some(scope));
                self.sem.block_scope.insert(stat, inner);
                for &s in &b.stats {
                    self.resolve_stat(s, inner)?;
                }
                Ok(())
            }
            Stat::Var(v) => {
                let decl = v.decl;
                let Decl::Var(var) = self.arena.decls.get(decl) else { unreachable!() };
                let declared_ty = match var.ty {
                    Some(t) => Some(self.resolve_type_expr(t, false)?),
                    None => None,
                };
                let init_expr = var.init;
                let init_ty = match init_expr {
                    Some(e) => Some(self.resolve_expr(e, scope)?),
                    None => None,
                };
                let final_ty = match (declared_ty, init_ty) {
                    (Some(d), Some(i)) => {
                        let init_expr = init_expr.expect("init_ty is Some only when var.init is Some");
                        if !self.assignable(d, i, init_expr) {
                            return Err(ResolveError::TypeMismatch {
                                expected: self.types.mangled_name(d),
                                found: self.types.mangled_name(i),
                            });
                        }
                        d
                    }
                    (Some(d), None) => d,
                    (None, Some(i)) => i,
                    (None, None) => return Err(ResolveError::MissingVarType { name: var.name.clone() }),
                };
                self.sem.decl_types.insert(decl, final_ty);
                self.sem.add_decl(scope, decl);
                Ok(())
            }
            Stat::Expr(e) => {
                self.resolve_expr(e.expr, scope)?;
                Ok(())
            }
            Stat::Return(r) => {
                let expr = r.expr.expect("the parser always produces a return expression");
                let ty = self.resolve_expr(expr, scope)?;
                if let Some(expected) = self.current_return_type {
                    if !self.assignable(expected, ty, expr) {
                        return Err(ResolveError::ReturnTypeMismatch {
                            expected: self.types.mangled_name(expected),
                            found: self.types.mangled_name(ty),
                        });
                    }
                }
                Ok(())
            }
            Stat::Break(_) => Ok(()),
            Stat::If(s) => {
                self.resolve_expr(s.cond, scope)?;
                self.resolve_stat(s.then_block, scope)?;
                if let Some(e) = s.else_block {
                    self.resolve_stat(e, scope)?;
                }
                Ok(())
            }
            Stat::For(s) => {
                let loop_scope = self.sem.new_scope(Some(scope));
                self.resolve_stat(s.init, loop_scope)?;
                self.resolve_expr(s.cond, loop_scope)?;
                self.resolve_stat(s.update, loop_scope)?;
                self.resolve_stat(s.body, loop_scope)?;
                Ok(())
            }
            Stat::While(s) => {
                self.resolve_expr(s.cond, scope)?;
                self.resolve_stat(s.body, scope)?;
                Ok(())
            }
        }
    }

    fn resolve_expr(&mut self, expr: Handle<Expr>, scope: ScopeId) -> Result<TypeId, ResolveError> {
        let ty = match self.arena.exprs.get(expr) {
            Expr::Lit(lit) => self.literal_type(lit.value),
            Expr::Id(id) => {
                let decl = self
                    .sem
                    .lookup(self.arena, scope, &id.name)
                    .ok_or_else(|| ResolveError::UndefinedName { name: id.name.clone() })?;
                *self
                    .sem
                    .decl_types
                    .get(&decl)
                    .ok_or_else(|| ResolveError::UndefinedName { name: id.name.clone() })?
            }
            Expr::Unary(u) => self.resolve_expr(u.operand, scope)?,
            Expr::Binary(b) => self.resolve_binary(b, scope)?,
            Expr::Call(c) => self.resolve_call(c, scope)?,
            Expr::Array(a) => self.resolve_array_literal(a, scope)?,
            Expr::Type(_) => unreachable!("type expressions resolve via resolve_type_expr"),
        };
        self.sem.expr_types.insert(expr, ty);
        Ok(ty)
    }

    fn resolve_binary(&mut self, b: &BinaryExpr, scope: ScopeId) -> Result<TypeId, ResolveError> {
        match b.op {
            BinaryOp::Member => self.resolve_member(b, scope),
            BinaryOp::Index => self.resolve_index(b, scope),
            _ => {
                let lhs = self.resolve_expr(b.lhs, scope)?;
                let rhs = self.resolve_expr(b.rhs, scope)?;
                self.unify_operand_types(lhs, b.lhs, rhs, b.rhs).ok_or_else(|| ResolveError::TypeMismatch {
                    expected: self.types.mangled_name(lhs),
                    found: self.types.mangled_name(rhs),
                })
            }
        }
    }

    fn resolve_member(&mut self, b: &BinaryExpr, scope: ScopeId) -> Result<TypeId, ResolveError> {
        let lhs_ty = self.resolve_expr(b.lhs, scope)?;
        let Expr::Id(rhs_id) = self.arena.exprs.get(b.rhs) else {
            return Err(ResolveError::AccessOnNonAggregate { ty: self.types.mangled_name(lhs_ty) });
        };
        let member_name = rhs_id.name.clone();
        match self.types.get(lhs_ty).clone() {
            Type::Custom { members, .. } => members
                .iter()
                .find(|m| m.name == member_name)
                .map(|m| m.ty)
                .ok_or(ResolveError::AccessOnNonAggregate { ty: self.types.mangled_name(lhs_ty) }),
            Type::Vec { elem, columns } => {
                if member_name.is_empty() || member_name.len() as u8 > columns {
                    return Err(ResolveError::SwizzleOutOfRange {
                        ch: member_name.chars().last().unwrap_or('?'),
                        width: columns,
                    });
                }
                for ch in member_name.chars() {
                    let idx = match "xyzw".find(ch) {
                        Some(idx) => idx as u8,
                        None => return Err(ResolveError::SwizzleOutOfRange { ch, width: columns }),
                    };
                    if idx >= columns {
                        return Err(ResolveError::SwizzleOutOfRange { ch, width: columns });
                    }
                }
                if member_name.len() == 1 {
                    Ok(elem)
                } else {
                    let mangled = format!("{}{}", self.types.mangled_name(elem), member_name.len());
                    Ok(self.types.find_by_name(&mangled).unwrap_or(elem))
                }
            }
            _ => Err(ResolveError::AccessOnNonAggregate { ty: self.types.mangled_name(lhs_ty) }),
        }
    }

    fn resolve_index(&mut self, b: &BinaryExpr, scope: ScopeId) -> Result<TypeId, ResolveError> {
        let lhs_ty = self.resolve_expr(b.lhs, scope)?;
        let rhs_ty = self.resolve_expr(b.rhs, scope)?;
        if !self.is_integer_type(rhs_ty) {
            return Err(ResolveError::NonIntegerIndex { ty: self.types.mangled_name(rhs_ty) });
        }
        let const_index = eval_const(self.arena, b.rhs)?;
        match self.types.get(lhs_ty).clone() {
            Type::Array { elem, count } => {
                if count != 0 {
                    if let Some(value) = const_index {
                        let idx = value.as_i64();
                        if idx < 0 || idx as u64 >= count {
                            return Err(ResolveError::IndexOutOfRange { index: idx, size: count });
                        }
                    }
                }
                Ok(elem)
            }
            Type::Mat { elem, rows, .. } => {
                if let Some(value) = const_index {
                    let idx = value.as_i64();
                    if idx < 0 || idx as u64 >= rows as u64 {
                        return Err(ResolveError::IndexOutOfRange { index: idx, size: rows as u64 });
                    }
                }
                let mangled = format!("{}{}", self.types.mangled_name(elem), rows);
                Ok(self.types.find_by_name(&mangled).unwrap_or(elem))
            }
            _ => Err(ResolveError::AccessOnNonAggregate { ty: self.types.mangled_name(lhs_ty) }),
        }
    }

    fn resolve_call(&mut self, c: &CallExpr, scope: ScopeId) -> Result<TypeId, ResolveError> {
        if let Some(ty) = self.types.find_by_name(&c.callee) {
            return self.resolve_constructor(ty, c, scope);
        }

        let decl = self
            .sem
            .lookup(self.arena, scope, &c.callee)
            .ok_or_else(|| ResolveError::UndefinedName { name: c.callee.clone() })?;
        let Decl::Func(f) = self.arena.decls.get(decl) else {
            return Err(ResolveError::NotCallable { name: c.callee.clone() });
        };
        if f.args.len() != c.args.len() {
            return Err(ResolveError::ArgCountMismatch { name: c.callee.clone(), expected: f.args.len(), found: c.args.len() });
        }
        let arg_decls = f.args.clone();
        let return_type = *self.sem.decl_types.get(&decl).expect("a looked-up function is already fully resolved");

        for (&arg_decl, &call_arg) in arg_decls.iter().zip(c.args.iter()) {
            let expected = *self.sem.decl_types.get(&arg_decl).expect("function argument types resolve with the function");
            let found = self.resolve_expr(call_arg, scope)?;
            if !self.assignable(expected, found, call_arg) {
                return Err(ResolveError::TypeMismatch {
                    expected: self.types.mangled_name(expected),
                    found: self.types.mangled_name(found),
                });
            }
        }
        Ok(return_type)
    }

    fn resolve_constructor(&mut self, ty: TypeId, c: &CallExpr, scope: ScopeId) -> Result<TypeId, ResolveError> {
        let arg_types: Vec<TypeId> = c.args.iter().map(|&a| self.resolve_expr(a, scope)).collect::<Result<_, _>>()?;
        match self.types.get(ty).clone() {
            Type::Array { .. } => Err(ResolveError::ArrayConstructorCall),
            Type::Custom { members, name } => {
                if arg_types.len() != members.len() {
                    return Err(ResolveError::ArgCountMismatch { name, expected: members.len(), found: arg_types.len() });
                }
                for ((member, &found), &arg_expr) in members.iter().zip(arg_types.iter()).zip(c.args.iter()) {
                    if !self.assignable(member.ty, found, arg_expr) {
                        return Err(ResolveError::TypeMismatch {
                            expected: self.types.mangled_name(member.ty),
                            found: self.types.mangled_name(found),
                        });
                    }
                }
                Ok(ty)
            }
            Type::Scalar { name } => {
                if arg_types.len() != 1 || arg_types[0] != ty {
                    return Err(ResolveError::ConstructorArity { ty: name, expected: 1, found: arg_types.len() as u64 });
                }
                Ok(ty)
            }
            Type::Vec { .. } | Type::Mat { .. } => {
                let target_slots = self.types.num_slots(ty);
                if arg_types.len() == 1 && self.types.get(arg_types[0]).is_scalar() {
                    return Ok(ty);
                }
                let total: u64 = arg_types.iter().map(|&a| self.types.num_slots(a).max(1)).sum();
                if total != target_slots {
                    return Err(ResolveError::ConstructorArity { ty: self.types.mangled_name(ty), expected: target_slots, found: total });
                }
                Ok(ty)
            }
        }
    }

    fn resolve_array_literal(&mut self, a: &ArrayExpr, scope: ScopeId) -> Result<TypeId, ResolveError> {
        let mut elem_ty = None;
        for &e in &a.elements {
            let ty = self.resolve_expr(e, scope)?;
            match elem_ty {
                None => elem_ty = Some(ty),
                Some(first) if first == ty => {}
                Some(first) => {
                    return Err(ResolveError::ArrayLiteralTypeMismatch {
                        first: self.types.mangled_name(first),
                        other: self.types.mangled_name(ty),
                    });
                }
            }
        }
        let elem = elem_ty.expect("the parser rejects empty array literals");
        Ok(self.types.intern_array(elem, a.elements.len() as u64))
    }

    fn literal_type(&self, v: crate::ast::LitValue) -> TypeId {
        use crate::ast::LitValue::*;
        let name = match v {
            I16(_) | I32(_) => "int",
            I64(_) => "long",
            U16(_) | U32(_) => "uint",
            U64(_) => "ulong",
            F32(_) => "float",
            F64(_) => "double",
        };
        self.types.find_by_name(name).expect("scalar types are seeded at startup")
    }

    fn is_integer_type(&self, ty: TypeId) -> bool {
        matches!(self.types.get(ty), Type::Scalar { name } if matches!(name.as_str(), "int" | "uint" | "long" | "ulong"))
    }

    fn is_literal_expr(&self, expr: Handle<Expr>) -> bool {
        matches!(self.arena.exprs.get(expr), Expr::Lit(_))
    }

    /// True when `a`/`b` are `float` and `double`, in either order. A
    /// fraction literal with no suffix defaults to `double` (spec.md
    /// §4.1), but that default shouldn't make every `float`-typed program
    /// unusable, so a literal of one gets to stand in for the other.
    fn float_double_pair(&self, a: TypeId, b: TypeId) -> bool {
        let (Some(float), Some(double)) = (self.types.find_by_name("float"), self.types.find_by_name("double")) else {
            return false;
        };
        (a == float && b == double) || (a == double && b == float)
    }

    /// Whether a value of type `found` (produced by `found_expr`) may be
    /// used where `expected` is required. Exact match always works; a
    /// `float`/`double` mismatch is also allowed when the value in
    /// question is a literal, since the literal's default 64-bit typing
    /// is just that: a default, not a real width commitment.
    fn assignable(&self, expected: TypeId, found: TypeId, found_expr: Handle<Expr>) -> bool {
        expected == found || (self.float_double_pair(expected, found) && self.is_literal_expr(found_expr))
    }

    /// Result type of a binary operator applied to `lhs`/`rhs`, or `None`
    /// if the operands don't combine. Same literal-default leniency as
    /// [`Resolver::assignable`]: between a `float`/`double` pair, a
    /// non-literal operand's type wins; if both sides are literals, the
    /// spec's fraction default (`double`) wins.
    fn unify_operand_types(&self, lhs: TypeId, lhs_expr: Handle<Expr>, rhs: TypeId, rhs_expr: Handle<Expr>) -> Option<TypeId> {
        if lhs == rhs {
            return Some(lhs);
        }
        if !self.float_double_pair(lhs, rhs) {
            return None;
        }
        match (self.is_literal_expr(lhs_expr), self.is_literal_expr(rhs_expr)) {
            (true, false) => Some(rhs),
            (false, true) => Some(lhs),
            (true, true) => self.types.find_by_name("double"),
            (false, false) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use crate::CompilationContext;

    fn resolve_source(source: &str) -> Result<CompilationContext, ResolveError> {
        let mut ctx = CompilationContext::new();
        let tokens = tokenize(source).expect("lex");
        let mut errors = Vec::new();
        let module = parse(&mut ctx.arena, &tokens, &mut |e| errors.push(e)).expect("parse");
        resolve(&mut ctx, module)?;
        Ok(ctx)
    }

    #[test]
    fn variable_type_inferred_from_initializer() {
        let ctx = resolve_source("fn f() { var x = 1; }").unwrap();
        let float_ty = ctx.types.find_by_name("int").unwrap();
        assert!(ctx.sem.decl_types.values().any(|&t| t == float_ty));
    }

    #[test]
    fn mismatched_declared_and_initializer_type_is_an_error() {
        let err = resolve_source("fn f() { var x : float = 1; }").unwrap_err();
        assert!(matches!(err, ResolveError::TypeMismatch { .. }));
    }

    #[test]
    fn var_without_type_or_initializer_is_an_error() {
        let err = resolve_source("fn f() { var x; }").unwrap_err();
        assert!(matches!(err, ResolveError::MissingVarType { .. }));
    }

    #[test]
    fn undefined_identifier_is_an_error() {
        let err = resolve_source("fn f() { var x = y; }").unwrap_err();
        assert!(matches!(err, ResolveError::UndefinedName { name } if name == "y"));
    }

    #[test]
    fn struct_member_duplication_is_an_error() {
        let err = resolve_source("struct S { a : float, a : int }").unwrap_err();
        assert!(matches!(err, ResolveError::DuplicateMember { .. }));
    }

    #[test]
    fn swizzle_resolves_to_narrower_vector() {
        let ctx = resolve_source("fn f(v : float4) : float2 { return v.xy; }").unwrap();
        let float2 = ctx.types.find_by_name("float2").unwrap();
        assert!(ctx.sem.expr_types.values().any(|&t| t == float2));
    }

    #[test]
    fn swizzle_past_vector_width_is_an_error() {
        let err = resolve_source("fn f(v : float2) : float { return v.z; }").unwrap_err();
        assert!(matches!(err, ResolveError::SwizzleOutOfRange { .. }));
    }

    #[test]
    fn array_index_out_of_range_constant_is_an_error() {
        let err = resolve_source("buffer b : [3]float; fn f() { var x = b[5]; }").unwrap_err();
        assert!(matches!(err, ResolveError::IndexOutOfRange { index: 5, size: 3 }));
    }

    #[test]
    fn runtime_sized_array_outside_a_buffer_is_rejected() {
        let err = resolve_source("fn f(v : []float) { }").unwrap_err();
        assert!(matches!(err, ResolveError::RuntimeSizedArrayNotAllowed { .. }));
    }

    #[test]
    fn function_cannot_call_itself() {
        let err = resolve_source("fn f() { f(); }").unwrap_err();
        assert!(matches!(err, ResolveError::UndefinedName { name } if name == "f"));
    }

    #[test]
    fn vector_constructor_from_scalar_broadcast() {
        let ctx = resolve_source("fn f() { var x = float3(1.0); }").unwrap();
        let float3 = ctx.types.find_by_name("float3").unwrap();
        assert!(ctx.sem.decl_types.values().any(|&t| t == float3));
    }

    #[test]
    fn vector_constructor_arity_mismatch_is_an_error() {
        let err = resolve_source("fn f() { var x = float3(1.0, 2.0); }").unwrap_err();
        assert!(matches!(err, ResolveError::ConstructorArity { .. }));
    }

    #[test]
    fn array_constructor_call_is_rejected() {
        let err = resolve_source("fn f() { var x : [3]float = float(1.0, 2.0, 3.0); }");
        assert!(err.is_err());
    }
}
