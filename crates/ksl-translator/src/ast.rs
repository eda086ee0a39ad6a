//! The AST node hierarchy and the arena that owns it.
//!
//! The original C++ translator (`ast.h`/`ast.cc`) used a single
//! `base::rtti::Castable` root (`TreeNode`) with an `is<T>()/as<T>()` chain
//! and a generic `make<T>()` arena. Per the redesign note in SPEC_FULL.md
//! §9, runtime type dispatch here is a closed Rust enum per node category
//! (`Decl`, `Expr`, `Stat`) matched with `match`, and the single generic
//! arena becomes one [`crate::arena::Slab`] per category, composed in
//! [`Arena`].

use crate::arena::{Handle, Slab};
use crate::token::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Group,
    Binding,
    Compute,
    Vertex,
    Fragment,
    WorkgroupSize,
    Location,
    Input,
    Builtin,
}

impl AttrKind {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "group" => AttrKind::Group,
            "binding" => AttrKind::Binding,
            "compute" => AttrKind::Compute,
            "vertex" => AttrKind::Vertex,
            "fragment" => AttrKind::Fragment,
            "workgroup_size" => AttrKind::WorkgroupSize,
            "location" => AttrKind::Location,
            "input" => AttrKind::Input,
            "builtin" => AttrKind::Builtin,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

#[derive(Debug, Clone)]
pub struct Attr {
    pub kind: AttrKind,
    pub args: Vec<Handle<Expr>>,
    pub loc: SourceLocation,
}

// ---------------------------------------------------------------- Expr ----

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LitValue {
    I16(i16),
    I32(i32),
    I64(i64),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    OrAssign,
    AndAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,
    Or,
    And,
    Eq,
    Ne,
    BitOr,
    BitXor,
    BitAnd,
    Lt,
    Le,
    Gt,
    Ge,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Member,
    Index,
}

impl BinaryOp {
    /// Precedence level per spec.md §4.2's table (higher binds tighter).
    pub fn precedence(self) -> u8 {
        use BinaryOp::*;
        match self {
            Assign | AddAssign | SubAssign | MulAssign | DivAssign | RemAssign | OrAssign | AndAssign | XorAssign
            | ShlAssign | ShrAssign => 0,
            Or | And => 1,
            Eq | Ne => 2,
            BitOr | BitXor | BitAnd => 3,
            Lt | Le | Gt | Ge => 4,
            Shl | Shr => 5,
            Add | Sub => 6,
            Mul | Div | Rem => 7,
            Member | Index => 8,
        }
    }

    /// Every level in spec.md's table is right-associative except `+ -`,
    /// `* / %`, and `. [` which are left-associative.
    pub fn is_left_associative(self) -> bool {
        self.precedence() >= 6
    }
}

#[derive(Debug, Clone)]
pub enum TypeExpr {
    /// A named type reference: a scalar, vector/matrix, struct, or
    /// previously-declared array alias.
    Id(String),
    /// `[size?]element` — `size` is `None` for runtime-sized arrays.
    Array { elem: Handle<Expr>, size: Option<Handle<Expr>> },
}

#[derive(Debug, Clone)]
pub enum Expr {
    Lit(LitExpr),
    Id(IdExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Call(CallExpr),
    Array(ArrayExpr),
    Type(TypeExprNode),
}

#[derive(Debug, Clone)]
pub struct LitExpr {
    pub value: LitValue,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct IdExpr {
    pub name: String,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Handle<Expr>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub lhs: Handle<Expr>,
    pub rhs: Handle<Expr>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub callee: String,
    pub args: Vec<Handle<Expr>>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct ArrayExpr {
    pub elements: Vec<Handle<Expr>>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct TypeExprNode {
    pub ty: TypeExpr,
    pub loc: SourceLocation,
}

// ---------------------------------------------------------------- Decl ----

#[derive(Debug, Clone)]
pub enum Decl {
    Func(FuncDecl),
    FuncArg(FuncArg),
    Var(VarDecl),
    Struct(StructDecl),
    StructMember(StructMember),
    Buffer(BufferDecl),
    Uniform(UniformDecl),
}

impl Decl {
    pub fn name(&self) -> &str {
        match self {
            Decl::Func(d) => &d.name,
            Decl::FuncArg(d) => &d.name,
            Decl::Var(d) => &d.name,
            Decl::Struct(d) => &d.name,
            Decl::StructMember(d) => &d.name,
            Decl::Buffer(d) => &d.name,
            Decl::Uniform(d) => &d.name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: String,
    pub attrs: Vec<Handle<Attr>>,
    pub args: Vec<Handle<Decl>>,
    /// Absent means the parser defaulted to `void` (spec.md §4.2).
    pub return_type: Handle<Expr>,
    pub body: Handle<Stat>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct FuncArg {
    pub name: String,
    pub attrs: Vec<Handle<Attr>>,
    pub ty: Handle<Expr>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: String,
    pub ty: Option<Handle<Expr>>,
    pub init: Option<Handle<Expr>>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct StructDecl {
    pub name: String,
    pub members: Vec<Handle<Decl>>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct StructMember {
    pub name: String,
    pub attrs: Vec<Handle<Attr>>,
    pub ty: Handle<Expr>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct BufferDecl {
    pub name: String,
    pub access: AccessMode,
    pub attrs: Vec<Handle<Attr>>,
    pub ty: Handle<Expr>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct UniformDecl {
    pub name: String,
    pub attrs: Vec<Handle<Attr>>,
    pub ty: Handle<Expr>,
    pub loc: SourceLocation,
}

// ---------------------------------------------------------------- Stat ----

#[derive(Debug, Clone)]
pub enum Stat {
    Block(BlockStat),
    Var(VarStat),
    Expr(ExprStat),
    Return(ReturnStat),
    Break(BreakStat),
    If(IfStat),
    For(ForStat),
    While(WhileStat),
}

#[derive(Debug, Clone)]
pub struct BlockStat {
    pub stats: Vec<Handle<Stat>>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct VarStat {
    pub decl: Handle<Decl>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct ExprStat {
    pub expr: Handle<Expr>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct ReturnStat {
    pub expr: Option<Handle<Expr>>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct BreakStat {
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct IfStat {
    pub cond: Handle<Expr>,
    pub then_block: Handle<Stat>,
    pub else_block: Option<Handle<Stat>>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct ForStat {
    pub init: Handle<Stat>,
    pub cond: Handle<Expr>,
    pub update: Handle<Stat>,
    pub body: Handle<Stat>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct WhileStat {
    pub cond: Handle<Expr>,
    pub body: Handle<Stat>,
    pub loc: SourceLocation,
}

// -------------------------------------------------------------- Module ----

#[derive(Debug, Clone, Default)]
pub struct ModuleNode {
    pub decls: Vec<Handle<Decl>>,
}

// --------------------------------------------------------------- Arena ----

/// Owns every live AST node, grouped by category. A handle from one
/// category is never valid in another category's `Slab` — `Expr` handles
/// only index `exprs`, and so on.
#[derive(Default, Debug)]
pub struct Arena {
    pub decls: Slab<Decl>,
    pub exprs: Slab<Expr>,
    pub stats: Slab<Stat>,
    pub attrs: Slab<Attr>,
    pub modules: Slab<ModuleNode>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    // -- clone: deep-copies a subtree, producing fresh handles throughout --

    pub fn clone_attr(&mut self, h: Handle<Attr>) -> Handle<Attr> {
        let node = self.attrs.get(h).clone();
        let args = node.args.iter().map(|&a| self.clone_expr(a)).collect();
        self.attrs.make(Attr { args, ..node })
    }

    fn clone_attrs(&mut self, hs: &[Handle<Attr>]) -> Vec<Handle<Attr>> {
        hs.iter().map(|&a| self.clone_attr(a)).collect()
    }

    pub fn clone_expr(&mut self, h: Handle<Expr>) -> Handle<Expr> {
        let node = self.exprs.get(h).clone();
        let cloned = match node {
            Expr::Lit(e) => Expr::Lit(e),
            Expr::Id(e) => Expr::Id(e),
            Expr::Unary(e) => Expr::Unary(UnaryExpr { operand: self.clone_expr(e.operand), ..e }),
            Expr::Binary(e) => {
                let lhs = self.clone_expr(e.lhs);
                let rhs = self.clone_expr(e.rhs);
                Expr::Binary(BinaryExpr { lhs, rhs, ..e })
            }
            Expr::Call(e) => {
                let args = e.args.iter().map(|&a| self.clone_expr(a)).collect();
                Expr::Call(CallExpr { args, ..e })
            }
            Expr::Array(e) => {
                let elements = e.elements.iter().map(|&a| self.clone_expr(a)).collect();
                Expr::Array(ArrayExpr { elements, ..e })
            }
            Expr::Type(e) => {
                let ty = match e.ty {
                    TypeExpr::Id(name) => TypeExpr::Id(name),
                    TypeExpr::Array { elem, size } => {
                        let elem = self.clone_expr(elem);
                        let size = size.map(|s| self.clone_expr(s));
                        TypeExpr::Array { elem, size }
                    }
                };
                Expr::Type(TypeExprNode { ty, loc: e.loc })
            }
        };
        self.exprs.make(cloned)
    }

    pub fn clone_decl(&mut self, h: Handle<Decl>) -> Handle<Decl> {
        let node = self.decls.get(h).clone();
        let cloned = match node {
            Decl::Func(d) => {
                let attrs = self.clone_attrs(&d.attrs);
                let args = d.args.iter().map(|&a| self.clone_decl(a)).collect();
                let return_type = self.clone_expr(d.return_type);
                let body = self.clone_stat(d.body);
                Decl::Func(FuncDecl { attrs, args, return_type, body, ..d })
            }
            Decl::FuncArg(d) => {
                let attrs = self.clone_attrs(&d.attrs);
                let ty = self.clone_expr(d.ty);
                Decl::FuncArg(FuncArg { attrs, ty, ..d })
            }
            Decl::Var(d) => {
                let ty = d.ty.map(|t| self.clone_expr(t));
                let init = d.init.map(|i| self.clone_expr(i));
                Decl::Var(VarDecl { ty, init, ..d })
            }
            Decl::Struct(d) => {
                let members = d.members.iter().map(|&m| self.clone_decl(m)).collect();
                Decl::Struct(StructDecl { members, ..d })
            }
            Decl::StructMember(d) => {
                let attrs = self.clone_attrs(&d.attrs);
                let ty = self.clone_expr(d.ty);
                Decl::StructMember(StructMember { attrs, ty, ..d })
            }
            Decl::Buffer(d) => {
                let attrs = self.clone_attrs(&d.attrs);
                let ty = self.clone_expr(d.ty);
                Decl::Buffer(BufferDecl { attrs, ty, ..d })
            }
            Decl::Uniform(d) => {
                let attrs = self.clone_attrs(&d.attrs);
                let ty = self.clone_expr(d.ty);
                Decl::Uniform(UniformDecl { attrs, ty, ..d })
            }
        };
        self.decls.make(cloned)
    }

    pub fn clone_stat(&mut self, h: Handle<Stat>) -> Handle<Stat> {
        let node = self.stats.get(h).clone();
        let cloned = match node {
            Stat::Block(s) => {
                let stats = s.stats.iter().map(|&st| self.clone_stat(st)).collect();
                Stat::Block(BlockStat { stats, ..s })
            }
            Stat::Var(s) => {
                let decl = self.clone_decl(s.decl);
                Stat::Var(VarStat { decl, ..s })
            }
            Stat::Expr(s) => {
                let expr = self.clone_expr(s.expr);
                Stat::Expr(ExprStat { expr, ..s })
            }
            Stat::Return(s) => {
                let expr = s.expr.map(|e| self.clone_expr(e));
                Stat::Return(ReturnStat { expr, ..s })
            }
            Stat::Break(s) => Stat::Break(s),
            Stat::If(s) => {
                let cond = self.clone_expr(s.cond);
                let then_block = self.clone_stat(s.then_block);
                let else_block = s.else_block.map(|b| self.clone_stat(b));
                Stat::If(IfStat { cond, then_block, else_block, ..s })
            }
            Stat::For(s) => {
                let init = self.clone_stat(s.init);
                let cond = self.clone_expr(s.cond);
                let update = self.clone_stat(s.update);
                let body = self.clone_stat(s.body);
                Stat::For(ForStat { init, cond, update, body, ..s })
            }
            Stat::While(s) => {
                let cond = self.clone_expr(s.cond);
                let body = self.clone_stat(s.body);
                Stat::While(WhileStat { cond, body, ..s })
            }
        };
        self.stats.make(cloned)
    }

    pub fn clone_module(&mut self, h: Handle<ModuleNode>) -> Handle<ModuleNode> {
        let node = self.modules.get(h).clone();
        let decls = node.decls.iter().map(|&d| self.clone_decl(d)).collect();
        self.modules.make(ModuleNode { decls })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::SourceLocation;

    fn loc() -> SourceLocation {
        SourceLocation { line: 1, column: 1 }
    }

    #[test]
    fn clone_produces_disjoint_handles() {
        let mut arena = Arena::new();
        let lit = arena.exprs.make(Expr::Lit(LitExpr { value: LitValue::I32(1), loc: loc() }));
        let bin = arena.exprs.make(Expr::Binary(BinaryExpr { op: BinaryOp::Add, lhs: lit, rhs: lit, loc: loc() }));

        let cloned = arena.clone_expr(bin);
        assert_ne!(cloned.raw(), bin.raw());

        let Expr::Binary(orig) = arena.exprs.get(bin) else { panic!() };
        let Expr::Binary(copy) = arena.exprs.get(cloned) else { panic!() };
        assert_ne!(orig.lhs.raw(), copy.lhs.raw());
        assert_ne!(orig.rhs.raw(), copy.rhs.raw());
    }

    #[test]
    fn for_each_sees_every_live_node() {
        let mut arena = Arena::new();
        arena.exprs.make(Expr::Lit(LitExpr { value: LitValue::I32(1), loc: loc() }));
        arena.exprs.make(Expr::Lit(LitExpr { value: LitValue::I32(2), loc: loc() }));
        let mut count = 0;
        arena.exprs.for_each(|_, _| count += 1);
        assert_eq!(count, 2);
    }
}
