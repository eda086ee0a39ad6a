//! Semantic payloads attached to AST nodes by [`crate::resolver::resolve`].
//!
//! The original C++ translator attaches these via `setSem(unique_ptr<...>)`
//! calls directly on the AST node (`decl->setSem(...)`). Doing the
//! equivalent in Rust by threading an owned pointer through `ast::Decl`
//! would mean every node variant grows an `Option<Box<dyn Any>>` field for a
//! payload most nodes never need. Instead, semantic info lives in side
//! tables on [`crate::CompilationContext`], keyed by the AST handle — the
//! same shape as the type registry and the node arena itself, and the
//! concrete form the Design Note's "explicit `CompilationContext`
//! parameter" recommendation takes for semantic info specifically.

use crate::arena::Handle;
use crate::ast::{AccessMode, Decl, Expr, ModuleNode, Stat};
use crate::types::TypeId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

/// An ordered list of declarations with an optional parent; lookup walks to
/// root (spec.md §3.4).
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub decls: Vec<Handle<Decl>>,
}

/// Owns every [`Scope`] created during resolution, plus the handle→type
/// maps that are spec.md's `sem::Decl` and `sem::Expr`.
#[derive(Default, Debug)]
pub struct SemanticInfo {
    scopes: Vec<Scope>,
    pub decl_types: HashMap<Handle<Decl>, TypeId>,
    pub expr_types: HashMap<Handle<Expr>, TypeId>,
    /// Access mode recorded for `BufferDecl`s (spec.md scenario 6).
    pub buffer_access: HashMap<Handle<Decl>, AccessMode>,
    /// The root scope created for a resolved module (spec.md §3.4: "`sem::Module`: a `Scope`").
    pub module_scope: HashMap<Handle<ModuleNode>, ScopeId>,
    /// The scope created on entry to a `BlockStat` (spec.md §3.4: "`sem::BlockStat`: a `Scope`").
    pub block_scope: HashMap<Handle<Stat>, ScopeId>,
}

impl SemanticInfo {
    pub fn new_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope { parent, decls: Vec::new() });
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn add_decl(&mut self, scope: ScopeId, decl: Handle<Decl>) {
        self.scopes[scope.0 as usize].decls.push(decl);
    }

    /// Walks `scope` then its ancestors looking for a declaration named
    /// `name`, per spec.md's "Lookup by name walks self then parent".
    pub fn lookup<'a>(&'a self, arena: &'a crate::ast::Arena, scope: ScopeId, name: &str) -> Option<Handle<Decl>> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.scope(id);
            for &d in s.decls.iter().rev() {
                if arena.decls.get(d).name() == name {
                    return Some(d);
                }
            }
            current = s.parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Arena, Decl, VarDecl};
    use crate::token::SourceLocation;

    #[test]
    fn lookup_walks_to_parent() {
        let mut arena = Arena::new();
        let mut sem = SemanticInfo::default();
        let parent_scope = sem.new_scope(None);
        let child_scope = sem.new_scope(Some(parent_scope));

        let loc = SourceLocation { line: 1, column: 1 };
        let outer = arena.decls.make(Decl::Var(VarDecl { name: "x".into(), ty: None, init: None, loc }));
        sem.add_decl(parent_scope, outer);

        assert_eq!(sem.lookup(&arena, child_scope, "x"), Some(outer));
        assert_eq!(sem.lookup(&arena, child_scope, "missing"), None);
    }

    #[test]
    fn lookup_prefers_innermost_shadow() {
        let mut arena = Arena::new();
        let mut sem = SemanticInfo::default();
        let parent_scope = sem.new_scope(None);
        let child_scope = sem.new_scope(Some(parent_scope));
        let loc = SourceLocation { line: 1, column: 1 };

        let outer = arena.decls.make(Decl::Var(VarDecl { name: "x".into(), ty: None, init: None, loc }));
        sem.add_decl(parent_scope, outer);
        let inner = arena.decls.make(Decl::Var(VarDecl { name: "x".into(), ty: None, init: None, loc }));
        sem.add_decl(child_scope, inner);

        assert_eq!(sem.lookup(&arena, child_scope, "x"), Some(inner));
    }
}
