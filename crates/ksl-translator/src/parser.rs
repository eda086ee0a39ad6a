//! Recursive-descent parser with a Pratt expression loop.
//!
//! Mirrors the shape of the original `kate::tlr::Parser`: every production
//! returns one of "matched", "no match" (try the next alternative), or
//! "error" (this rule committed and failed — the caller propagates the
//! failure rather than trying sibling alternatives). [`Parsed`] is that
//! three-way outcome. Global declarations resync to the next `}` on error
//! and keep going, collecting every diagnostic instead of bailing after the
//! first one.
//!
//! Two corrections from the grammar this was grounded on, both noted here
//! rather than reproduced: index expressions (`a[i]`) accept a full
//! expression between the brackets, not just a single primary term, and
//! function arguments are comma-separated like every other list in the
//! grammar (struct members, call arguments). Both read as omissions in the
//! source this was distilled from rather than deliberate restrictions.

use crate::arena::Handle;
use crate::ast::*;
use crate::token::{Token, TokenKind};

enum Parsed<T> {
    No,
    Yes(T),
    Err,
}

struct Parser<'src, 'ctx> {
    tokens: &'src [Token<'src>],
    offset: usize,
    arena: &'ctx mut Arena,
    on_error: &'ctx mut dyn FnMut(String),
    had_error: bool,
    synthetic_structs: Vec<Handle<Decl>>,
    struct_counter: u32,
}

/// Parses a full token stream into a module of global declarations.
///
/// Returns `None` if any declaration failed to parse; every failure along
/// the way is still reported through `on_error` before that happens, per
/// the parser's "accumulate until EOF" recovery policy.
pub fn parse(arena: &mut Arena, tokens: &[Token], on_error: &mut dyn FnMut(String)) -> Option<Handle<ModuleNode>> {
    let mut p = Parser {
        tokens,
        offset: 0,
        arena,
        on_error,
        had_error: false,
        synthetic_structs: Vec::new(),
        struct_counter: 0,
    };

    let mut decls = Vec::new();
    while p.should_continue() {
        match p.global_declaration() {
            Parsed::Yes(d) => {
                decls.append(&mut p.synthetic_structs);
                decls.push(d);
            }
            Parsed::Err => {
                decls.append(&mut p.synthetic_structs);
            }
            Parsed::No => break,
        }
    }

    if p.had_error {
        None
    } else {
        Some(p.arena.modules.make(ModuleNode { decls }))
    }
}

impl<'src, 'ctx> Parser<'src, 'ctx> {
    // ---- token stream primitives ----

    fn current(&self) -> Token<'src> {
        self.tokens[self.offset]
    }

    fn peek(&self, n: usize) -> Token<'src> {
        let idx = (self.offset + n).min(self.tokens.len() - 1);
        self.tokens[idx]
    }

    fn advance(&mut self) {
        if self.offset + 1 < self.tokens.len() {
            self.offset += 1;
        }
    }

    fn should_continue(&self) -> bool {
        !self.current().is(TokenKind::Eof)
    }

    fn matches_kind(&mut self, kind: TokenKind) -> Option<Token<'src>> {
        if self.current().is(kind) {
            let t = self.current();
            self.advance();
            Some(t)
        } else {
            None
        }
    }

    fn matches_keyword(&mut self, kw: &str) -> bool {
        if self.current().is(TokenKind::Ident) && self.current().text() == Some(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error<T>(&mut self, message: impl Into<String>) -> Parsed<T> {
        let loc = self.current().loc;
        self.had_error = true;
        (self.on_error)(format!("PARSER ERROR ({loc}): {}", message.into()));
        Parsed::Err
    }

    fn sync_to(&mut self, kind: TokenKind) {
        while self.matches_kind(kind).is_none() && self.should_continue() {
            self.advance();
        }
    }

    // ---- global declarations ----

    fn global_declaration(&mut self) -> Parsed<Handle<Decl>> {
        let attrs = match self.parse_attributes() {
            Parsed::Yes(a) => a,
            Parsed::Err => {
                self.sync_to(TokenKind::RBrace);
                return Parsed::Err;
            }
            Parsed::No => unreachable!("parse_attributes never reports no-match"),
        };

        macro_rules! try_decl {
            ($call:expr) => {
                match $call {
                    Parsed::Yes(d) => return Parsed::Yes(d),
                    Parsed::Err => {
                        self.sync_to(TokenKind::RBrace);
                        return Parsed::Err;
                    }
                    Parsed::No => {}
                }
            };
        }

        try_decl!(self.func_decl(attrs.clone()));
        try_decl!(self.buffer_decl(attrs.clone()));
        try_decl!(self.struct_declaration());
        try_decl!(self.uniform_decl(attrs));

        let failure = self.error("expected a function, buffer, struct, or uniform declaration.");
        self.sync_to(TokenKind::RBrace);
        failure
    }

    fn func_decl(&mut self, attrs: Vec<Handle<Attr>>) -> Parsed<Handle<Decl>> {
        let loc = self.current().loc;
        if !self.matches_keyword("fn") {
            return Parsed::No;
        }
        let name = match self.parse_name() {
            Parsed::Yes(n) => n,
            _ => return self.error("expected function name."),
        };
        if self.matches_kind(TokenKind::LParen).is_none() {
            return self.error("expected a '(' after function name.");
        }

        let mut args = Vec::new();
        loop {
            if self.matches_kind(TokenKind::RParen).is_some() {
                break;
            }
            if !self.should_continue() {
                return self.error("expected a ')' after function arguments.");
            }
            if !args.is_empty() && self.matches_kind(TokenKind::Comma).is_none() {
                return self.error("missing ',' between function arguments.");
            }
            let arg_attrs = match self.parse_attributes() {
                Parsed::Yes(a) => a,
                _ => return Parsed::Err,
            };
            let arg_loc = self.current().loc;
            let arg_name = match self.parse_name() {
                Parsed::Yes(n) => n,
                _ => return self.error("missing argument identifier."),
            };
            if self.matches_kind(TokenKind::Colon).is_none() {
                return self.error("missing ':' after function argument name.");
            }
            let ty = match self.expect_type() {
                Parsed::Yes(t) => t,
                _ => return Parsed::Err,
            };
            args.push(self.arena.decls.make(Decl::FuncArg(FuncArg { name: arg_name, attrs: arg_attrs, ty, loc: arg_loc })));
        }

        let return_type = if self.matches_kind(TokenKind::Colon).is_some() {
            match self.expect_type() {
                Parsed::Yes(t) => t,
                _ => return self.error("missing type after ':' in function return type."),
            }
        } else {
            let void_loc = self.current().loc;
            self.arena.exprs.make(Expr::Type(TypeExprNode { ty: TypeExpr::Id("void".into()), loc: void_loc }))
        };

        let body = match self.parse_block() {
            Parsed::Yes(b) => b,
            _ => return self.error("missing block in function declaration."),
        };

        Parsed::Yes(self.arena.decls.make(Decl::Func(FuncDecl { name, attrs, args, return_type, body, loc })))
    }

    fn buffer_decl(&mut self, attrs: Vec<Handle<Attr>>) -> Parsed<Handle<Decl>> {
        let loc = self.current().loc;
        if !self.matches_keyword("buffer") {
            return Parsed::No;
        }

        let mut access = AccessMode::ReadWrite;
        if self.matches_kind(TokenKind::Lt).is_some() {
            access = if self.matches_keyword("read") {
                AccessMode::Read
            } else if self.matches_keyword("write") {
                AccessMode::Write
            } else if self.matches_keyword("read_write") {
                AccessMode::ReadWrite
            } else {
                return self.error("unknown buffer access mode.");
            };
            if self.matches_kind(TokenKind::Gt).is_none() {
                return self.error("missing '>' at end of buffer argument list.");
            }
        }

        let name = match self.parse_name() {
            Parsed::Yes(n) => n,
            _ => return self.error("missing name in buffer declaration."),
        };
        if self.matches_kind(TokenKind::Colon).is_none() {
            return self.error("missing ':' after buffer name.");
        }
        let ty = match self.expect_type() {
            Parsed::Yes(t) => t,
            _ => return Parsed::Err,
        };
        if self.matches_kind(TokenKind::Semicolon).is_none() {
            return self.error("missing semicolon after buffer declaration.");
        }

        Parsed::Yes(self.arena.decls.make(Decl::Buffer(BufferDecl { name, access, attrs, ty, loc })))
    }

    fn uniform_decl(&mut self, attrs: Vec<Handle<Attr>>) -> Parsed<Handle<Decl>> {
        let loc = self.current().loc;
        if !self.matches_keyword("uniform") {
            return Parsed::No;
        }
        let name = match self.parse_name() {
            Parsed::Yes(n) => n,
            _ => return self.error("missing name in uniform declaration."),
        };
        if self.matches_kind(TokenKind::Colon).is_none() {
            return self.error("missing ':' after uniform name.");
        }
        let ty = match self.expect_type() {
            Parsed::Yes(t) => t,
            _ => return self.error("missing type in uniform declaration."),
        };
        if self.matches_kind(TokenKind::Semicolon).is_none() {
            return self.error("missing ';' after uniform declaration.");
        }

        Parsed::Yes(self.arena.decls.make(Decl::Uniform(UniformDecl { name, attrs, ty, loc })))
    }

    fn struct_declaration(&mut self) -> Parsed<Handle<Decl>> {
        let loc = self.current().loc;
        if !self.matches_keyword("struct") {
            return Parsed::No;
        }
        let name = match self.parse_name() {
            Parsed::Yes(n) => n,
            _ => return self.error("missing name when declaring struct."),
        };
        let members = match self.struct_members() {
            Parsed::Yes(m) => m,
            Parsed::Err => return Parsed::Err,
            Parsed::No => return self.error("missing struct body, KSL does not support forward declarations."),
        };
        self.matches_kind(TokenKind::Semicolon);
        Parsed::Yes(self.arena.decls.make(Decl::Struct(StructDecl { name, members, loc })))
    }

    fn struct_members(&mut self) -> Parsed<Vec<Handle<Decl>>> {
        if self.matches_kind(TokenKind::LBrace).is_none() {
            return Parsed::No;
        }
        let mut members = Vec::new();
        loop {
            if self.matches_kind(TokenKind::RBrace).is_some() {
                return Parsed::Yes(members);
            }
            if !self.should_continue() {
                return self.error("missing '}' after struct body.");
            }
            if !members.is_empty() && self.matches_kind(TokenKind::Comma).is_none() {
                return self.error("missing ',' while declaring struct members.");
            }
            let attrs = match self.parse_attributes() {
                Parsed::Yes(a) => a,
                _ => return Parsed::Err,
            };
            let loc = self.current().loc;
            let name = match self.parse_name() {
                Parsed::Yes(n) => n,
                _ => return self.error("missing name in struct member."),
            };
            if self.matches_kind(TokenKind::Colon).is_none() {
                return self.error("missing ':' after name in struct member.");
            }
            let ty = match self.expect_type() {
                Parsed::Yes(t) => t,
                _ => return self.error("missing type after ':' in struct member."),
            };
            members.push(self.arena.decls.make(Decl::StructMember(StructMember { name, attrs, ty, loc })));
        }
    }

    // ---- attributes, names, types ----

    fn parse_attributes(&mut self) -> Parsed<Vec<Handle<Attr>>> {
        let mut attrs = Vec::new();
        while self.current().is(TokenKind::At) {
            let loc = self.current().loc;
            self.advance();
            let name = match self.parse_name() {
                Parsed::Yes(n) => n,
                _ => return self.error("missing attribute identifier after '@'."),
            };
            let kind = match AttrKind::from_name(&name) {
                Some(k) => k,
                None => return self.error(format!("unknown attribute '{name}'.")),
            };
            let mut args = Vec::new();
            if self.matches_kind(TokenKind::LParen).is_some() {
                match self.parse_expression_list() {
                    Parsed::Yes(list) => args = list,
                    Parsed::Err => return Parsed::Err,
                    Parsed::No => {}
                }
                if self.matches_kind(TokenKind::RParen).is_none() {
                    return self.error("missing ')' at end of attribute parameters.");
                }
            }
            attrs.push(self.arena.attrs.make(Attr { kind, args, loc }));
        }
        Parsed::Yes(attrs)
    }

    fn parse_name(&mut self) -> Parsed<String> {
        if self.current().is(TokenKind::Ident) {
            let text = self.current().text().expect("Ident token always carries text").to_string();
            self.advance();
            Parsed::Yes(text)
        } else {
            Parsed::No
        }
    }

    /// The three type forms: `[size?]element`, an inline struct body (lifted
    /// into a synthetic `priv_N` global), or a named identifier.
    fn expect_type(&mut self) -> Parsed<Handle<Expr>> {
        let loc = self.current().loc;

        if self.matches_kind(TokenKind::LBracket).is_some() {
            let size = match self.parse_expr() {
                Parsed::Yes(e) => Some(e),
                Parsed::No => None,
                Parsed::Err => return Parsed::Err,
            };
            if self.matches_kind(TokenKind::RBracket).is_none() {
                return self.error("missing ']' in array size.");
            }
            let elem = match self.expect_type() {
                Parsed::Yes(e) => e,
                Parsed::Err => return Parsed::Err,
                Parsed::No => return self.error("missing type in array."),
            };
            return Parsed::Yes(self.arena.exprs.make(Expr::Type(TypeExprNode { ty: TypeExpr::Array { elem, size }, loc })));
        }

        match self.struct_members() {
            Parsed::Yes(members) => {
                self.struct_counter += 1;
                let struct_name = format!("priv_{}", self.struct_counter);
                let decl = self.arena.decls.make(Decl::Struct(StructDecl { name: struct_name.clone(), members, loc }));
                self.synthetic_structs.push(decl);
                return Parsed::Yes(self.arena.exprs.make(Expr::Type(TypeExprNode { ty: TypeExpr::Id(struct_name), loc })));
            }
            Parsed::Err => return Parsed::Err,
            Parsed::No => {}
        }

        match self.parse_name() {
            Parsed::Yes(name) => Parsed::Yes(self.arena.exprs.make(Expr::Type(TypeExprNode { ty: TypeExpr::Id(name), loc }))),
            Parsed::Err => Parsed::Err,
            Parsed::No => self.error("expected type identifier."),
        }
    }

    // ---- statements ----

    fn parse_block(&mut self) -> Parsed<Handle<Stat>> {
        let loc = self.current().loc;
        if self.matches_kind(TokenKind::LBrace).is_none() {
            return Parsed::No;
        }
        let mut stats = Vec::new();
        loop {
            if self.matches_kind(TokenKind::RBrace).is_some() {
                return Parsed::Yes(self.arena.stats.make(Stat::Block(BlockStat { stats, loc })));
            }
            if !self.should_continue() {
                return self.error("missing '}' after end of statement block.");
            }
            match self.statement() {
                Parsed::Yes(s) => stats.push(s),
                Parsed::Err => return Parsed::Err,
                Parsed::No => return self.error("invalid statement."),
            }
        }
    }

    fn statement(&mut self) -> Parsed<Handle<Stat>> {
        macro_rules! try_stat {
            ($call:expr) => {
                match $call {
                    Parsed::Yes(s) => return Parsed::Yes(s),
                    Parsed::Err => return Parsed::Err,
                    Parsed::No => {}
                }
            };
        }
        try_stat!(self.return_stat());
        try_stat!(self.if_statement());
        try_stat!(self.for_statement());
        try_stat!(self.while_statement());
        try_stat!(self.break_statement());
        try_stat!(self.var_statement());
        try_stat!(self.expr_stat());
        self.error("invalid statement.")
    }

    fn return_stat(&mut self) -> Parsed<Handle<Stat>> {
        let loc = self.current().loc;
        if !self.matches_keyword("return") {
            return Parsed::No;
        }
        let expr = match self.parse_expr() {
            Parsed::Yes(e) => e,
            _ => return self.error("missing expression in 'return' statement."),
        };
        if self.matches_kind(TokenKind::Semicolon).is_none() {
            return self.error("missing ';' after 'return' statement.");
        }
        Parsed::Yes(self.arena.stats.make(Stat::Return(ReturnStat { expr: Some(expr), loc })))
    }

    /// Not part of the grammar this was distilled from (which has no
    /// `break`-parsing production despite `BreakStat` existing in the AST
    /// and the printer emitting `break;`); added so the node is actually
    /// reachable from source text.
    fn break_statement(&mut self) -> Parsed<Handle<Stat>> {
        let loc = self.current().loc;
        if !self.matches_keyword("break") {
            return Parsed::No;
        }
        if self.matches_kind(TokenKind::Semicolon).is_none() {
            return self.error("missing ';' after 'break' statement.");
        }
        Parsed::Yes(self.arena.stats.make(Stat::Break(BreakStat { loc })))
    }

    fn if_statement(&mut self) -> Parsed<Handle<Stat>> {
        let loc = self.current().loc;
        if !self.matches_keyword("if") {
            return Parsed::No;
        }
        let cond = match self.parse_expr() {
            Parsed::Yes(e) => e,
            _ => return self.error("missing condition expression in 'if' statement."),
        };
        let then_block = match self.parse_block() {
            Parsed::Yes(b) => b,
            _ => return self.error("missing block in 'if' statement."),
        };
        let else_block = if self.matches_keyword("else") {
            match self.parse_block() {
                Parsed::Yes(b) => Some(b),
                _ => return self.error("missing block in 'else' statement."),
            }
        } else {
            None
        };
        Parsed::Yes(self.arena.stats.make(Stat::If(IfStat { cond, then_block, else_block, loc })))
    }

    fn while_statement(&mut self) -> Parsed<Handle<Stat>> {
        let loc = self.current().loc;
        if !self.matches_keyword("while") {
            return Parsed::No;
        }
        let cond = match self.parse_expr() {
            Parsed::Yes(e) => e,
            _ => return self.error("missing condition in while statement."),
        };
        let body = match self.parse_block() {
            Parsed::Yes(b) => b,
            _ => return self.error("missing block in while statement."),
        };
        Parsed::Yes(self.arena.stats.make(Stat::While(WhileStat { cond, body, loc })))
    }

    /// `for init_stmt cond_expr ';' update_stmt block` — the init/update
    /// slots are general statements (so `var` or a bare assignment both
    /// work); `for ;;; {}` is rejected since `statement()` requires a match.
    fn for_statement(&mut self) -> Parsed<Handle<Stat>> {
        let loc = self.current().loc;
        if !self.matches_keyword("for") {
            return Parsed::No;
        }
        let init = match self.statement() {
            Parsed::Yes(s) => s,
            _ => return self.error("missing initializer in for statement."),
        };
        let cond = match self.parse_expr() {
            Parsed::Yes(e) => e,
            _ => return self.error("missing condition in for statement."),
        };
        if self.matches_kind(TokenKind::Semicolon).is_none() {
            return self.error("missing semicolon after for statement condition.");
        }
        let update = match self.statement() {
            Parsed::Yes(s) => s,
            _ => return self.error("missing continuing statement in for statement."),
        };
        let body = match self.parse_block() {
            Parsed::Yes(b) => b,
            _ => return self.error("missing block in for statement."),
        };
        Parsed::Yes(self.arena.stats.make(Stat::For(ForStat { init, cond, update, body, loc })))
    }

    fn var_statement(&mut self) -> Parsed<Handle<Stat>> {
        let loc = self.current().loc;
        if !self.matches_keyword("var") {
            return Parsed::No;
        }
        let name = match self.parse_name() {
            Parsed::Yes(n) => n,
            _ => return self.error("missing name identifier in variable statement."),
        };
        let ty = if self.matches_kind(TokenKind::Colon).is_some() {
            match self.expect_type() {
                Parsed::Yes(t) => Some(t),
                _ => return self.error("missing type after ':' in variable declaration statement."),
            }
        } else {
            None
        };
        let init = if self.matches_kind(TokenKind::Eq).is_some() {
            match self.parse_expr() {
                Parsed::Yes(e) => Some(e),
                _ => return self.error("missing initializer expression after '=' in variable statement."),
            }
        } else {
            None
        };
        if self.matches_kind(TokenKind::Semicolon).is_none() {
            return self.error("missing ';' after variable declaration statement.");
        }
        let decl = self.arena.decls.make(Decl::Var(VarDecl { name, ty, init, loc }));
        Parsed::Yes(self.arena.stats.make(Stat::Var(VarStat { decl, loc })))
    }

    fn expr_stat(&mut self) -> Parsed<Handle<Stat>> {
        let loc = self.current().loc;
        let expr = match self.parse_expr() {
            Parsed::Yes(e) => e,
            Parsed::No => return Parsed::No,
            Parsed::Err => return Parsed::Err,
        };
        if self.matches_kind(TokenKind::Semicolon).is_none() {
            return self.error("missing ';' after expression statement.");
        }
        Parsed::Yes(self.arena.stats.make(Stat::Expr(ExprStat { expr, loc })))
    }

    // ---- expressions ----

    fn parse_expression_list(&mut self) -> Parsed<Vec<Handle<Expr>>> {
        let first = match self.parse_expr() {
            Parsed::Yes(e) => e,
            Parsed::No => return Parsed::No,
            Parsed::Err => return Parsed::Err,
        };
        let mut list = vec![first];
        while self.matches_kind(TokenKind::Comma).is_some() {
            match self.parse_expr() {
                Parsed::Yes(e) => list.push(e),
                _ => return self.error("missing expression after ',' while parsing an expression list."),
            }
        }
        Parsed::Yes(list)
    }

    fn array_expr(&mut self) -> Parsed<Handle<Expr>> {
        let loc = self.current().loc;
        if self.matches_kind(TokenKind::LBracket).is_none() {
            return Parsed::No;
        }
        let mut elements = Vec::new();
        loop {
            if self.matches_kind(TokenKind::RBracket).is_some() {
                break;
            }
            if !self.should_continue() {
                return self.error("missing ']' in array literal.");
            }
            if !elements.is_empty() && self.matches_kind(TokenKind::Comma).is_none() {
                return self.error("expected a ',' between expressions when parsing an array literal.");
            }
            let expr = match self.parse_expr() {
                Parsed::Yes(e) => e,
                Parsed::Err => return Parsed::Err,
                Parsed::No => return self.error("expected expression in array literal."),
            };
            elements.push(expr);
        }
        if elements.is_empty() {
            return self.error("empty array literals are not allowed.");
        }
        Parsed::Yes(self.arena.exprs.make(Expr::Array(ArrayExpr { elements, loc })))
    }

    fn literal_expr(&mut self) -> Parsed<Handle<Expr>> {
        let tok = self.current();
        let value = match tok.kind {
            TokenKind::Int16 => LitValue::I16(tok.value.as_i64().unwrap_or(0) as i16),
            TokenKind::Int32 => LitValue::I32(tok.value.as_i64().unwrap_or(0) as i32),
            TokenKind::Int64 => LitValue::I64(tok.value.as_i64().unwrap_or(0)),
            TokenKind::Uint16 => LitValue::U16(tok.value.as_u64().unwrap_or(0) as u16),
            TokenKind::Uint32 => LitValue::U32(tok.value.as_u64().unwrap_or(0) as u32),
            TokenKind::Uint64 => LitValue::U64(tok.value.as_u64().unwrap_or(0)),
            TokenKind::Flt32 => LitValue::F32(tok.value.as_f64().unwrap_or(0.0) as f32),
            TokenKind::Flt64 => LitValue::F64(tok.value.as_f64().unwrap_or(0.0)),
            _ => return Parsed::No,
        };
        self.advance();
        Parsed::Yes(self.arena.exprs.make(Expr::Lit(LitExpr { value, loc: tok.loc })))
    }

    fn identifier_expr(&mut self) -> Parsed<Handle<Expr>> {
        let tok = self.current();
        if !tok.is(TokenKind::Ident) {
            return Parsed::No;
        }
        self.advance();
        Parsed::Yes(self.arena.exprs.make(Expr::Id(IdExpr { name: tok.text().unwrap().to_string(), loc: tok.loc })))
    }

    fn call_expr(&mut self) -> Parsed<Handle<Expr>> {
        if !(self.current().is(TokenKind::Ident) && self.peek(1).is(TokenKind::LParen)) {
            return Parsed::No;
        }
        let tok = self.current();
        let callee = tok.text().unwrap().to_string();
        self.advance();
        self.advance();
        let args = match self.parse_expression_list() {
            Parsed::Yes(list) => list,
            Parsed::Err => return Parsed::Err,
            Parsed::No => Vec::new(),
        };
        if self.matches_kind(TokenKind::RParen).is_none() {
            return self.error("missing ')' after function call argument list.");
        }
        Parsed::Yes(self.arena.exprs.make(Expr::Call(CallExpr { callee, args, loc: tok.loc })))
    }

    fn unary_expr(&mut self) -> Parsed<Handle<Expr>> {
        let tok = self.current();
        let (op, symbol) = match tok.kind {
            TokenKind::Minus => (UnaryOp::Neg, "-"),
            TokenKind::Plus => (UnaryOp::Plus, "+"),
            TokenKind::Bang => (UnaryOp::Not, "!"),
            TokenKind::Tilde => (UnaryOp::BitNot, "~"),
            _ => return Parsed::No,
        };
        self.advance();
        let operand = match self.primary_expr() {
            Parsed::Yes(e) => e,
            Parsed::Err => return Parsed::Err,
            Parsed::No => return self.error(format!("missing expression after unary '{symbol}'.")),
        };
        Parsed::Yes(self.arena.exprs.make(Expr::Unary(UnaryExpr { op, operand, loc: tok.loc })))
    }

    fn primary_expr(&mut self) -> Parsed<Handle<Expr>> {
        macro_rules! try_primary {
            ($call:expr) => {
                match $call {
                    Parsed::Yes(e) => return Parsed::Yes(e),
                    Parsed::Err => return Parsed::Err,
                    Parsed::No => {}
                }
            };
        }
        try_primary!(self.unary_expr());
        try_primary!(self.call_expr());
        try_primary!(self.literal_expr());
        try_primary!(self.identifier_expr());
        try_primary!(self.array_expr());
        Parsed::No
    }

    /// `.` binds a bare identifier — a struct field or a swizzle mask, per
    /// the resolver's handling of `Member`; KSL has no method-call syntax.
    fn member_rhs(&mut self) -> Parsed<Handle<Expr>> {
        self.identifier_expr()
    }

    fn binop_for(kind: TokenKind) -> Option<BinaryOp> {
        use TokenKind::*;
        Some(match kind {
            Eq => BinaryOp::Assign,
            PlusEq => BinaryOp::AddAssign,
            MinusEq => BinaryOp::SubAssign,
            StarEq => BinaryOp::MulAssign,
            SlashEq => BinaryOp::DivAssign,
            PercentEq => BinaryOp::RemAssign,
            PipeEq => BinaryOp::OrAssign,
            AmpEq => BinaryOp::AndAssign,
            CaretEq => BinaryOp::XorAssign,
            ShlEq => BinaryOp::ShlAssign,
            ShrEq => BinaryOp::ShrAssign,
            OrOr => BinaryOp::Or,
            AndAnd => BinaryOp::And,
            EqEq => BinaryOp::Eq,
            NotEq => BinaryOp::Ne,
            Pipe => BinaryOp::BitOr,
            Caret => BinaryOp::BitXor,
            Amp => BinaryOp::BitAnd,
            Gt => BinaryOp::Gt,
            GtEq => BinaryOp::Ge,
            Lt => BinaryOp::Lt,
            LtEq => BinaryOp::Le,
            Shl => BinaryOp::Shl,
            Shr => BinaryOp::Shr,
            Plus => BinaryOp::Add,
            Minus => BinaryOp::Sub,
            Star => BinaryOp::Mul,
            Slash => BinaryOp::Div,
            Percent => BinaryOp::Rem,
            Dot => BinaryOp::Member,
            LBracket => BinaryOp::Index,
            _ => return None,
        })
    }

    fn parse_expr(&mut self) -> Parsed<Handle<Expr>> {
        self.parse_expr_bp(0)
    }

    /// Standard precedence climbing over [`BinaryOp::precedence`] and
    /// [`BinaryOp::is_left_associative`]. `.` and `[` are the highest-
    /// precedence, left-associative level, so they fold the same way `+`/`-`
    /// do; they just source their right-hand side differently.
    fn parse_expr_bp(&mut self, min_prec: u8) -> Parsed<Handle<Expr>> {
        let mut lhs = match self.primary_expr() {
            Parsed::Yes(e) => e,
            Parsed::Err => return Parsed::Err,
            Parsed::No => return Parsed::No,
        };

        loop {
            let op = match Self::binop_for(self.current().kind) {
                Some(op) if op.precedence() >= min_prec => op,
                _ => break,
            };
            let op_loc = self.current().loc;
            self.advance();

            let rhs = match op {
                BinaryOp::Member => match self.member_rhs() {
                    Parsed::Yes(e) => e,
                    Parsed::Err => return Parsed::Err,
                    Parsed::No => return self.error("missing identifier after '.'."),
                },
                BinaryOp::Index => {
                    let idx = match self.parse_expr_bp(0) {
                        Parsed::Yes(e) => e,
                        Parsed::Err => return Parsed::Err,
                        Parsed::No => return self.error("missing index expression."),
                    };
                    if self.matches_kind(TokenKind::RBracket).is_none() {
                        return self.error("missing ']' after index expression.");
                    }
                    idx
                }
                _ => {
                    let next_min = if op.is_left_associative() { op.precedence() + 1 } else { op.precedence() };
                    match self.parse_expr_bp(next_min) {
                        Parsed::Yes(e) => e,
                        Parsed::Err => return Parsed::Err,
                        Parsed::No => return self.error("missing right-hand side of binary expression."),
                    }
                }
            };

            lhs = self.arena.exprs.make(Expr::Binary(BinaryExpr { op, lhs, rhs, loc: op_loc }));
        }

        Parsed::Yes(lhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_ok(source: &str) -> (Arena, Handle<ModuleNode>) {
        let mut arena = Arena::new();
        let tokens = tokenize(source).expect("lex");
        let mut errors = Vec::new();
        let module = parse(&mut arena, &tokens, &mut |e| errors.push(e));
        assert!(errors.is_empty(), "unexpected parse errors: {errors:?}");
        (arena, module.expect("module"))
    }

    #[test]
    fn minimal_compute_function_parses() {
        let (arena, module) = parse_ok("@compute fn main() { var x : int = 1 + 2 * 3; }");
        let decls = &arena.modules.get(module).decls;
        assert_eq!(decls.len(), 1);
        let Decl::Func(f) = arena.decls.get(decls[0]) else { panic!("expected function") };
        assert_eq!(f.name, "main");
        assert_eq!(f.attrs.len(), 1);
        assert_eq!(arena.attrs.get(f.attrs[0]).kind, AttrKind::Compute);
    }

    #[test]
    fn missing_return_type_defaults_to_void() {
        let (arena, module) = parse_ok("fn f() { }");
        let decls = &arena.modules.get(module).decls;
        let Decl::Func(f) = arena.decls.get(decls[0]) else { panic!() };
        let Expr::Type(t) = arena.exprs.get(f.return_type) else { panic!() };
        let TypeExpr::Id(name) = &t.ty else { panic!() };
        assert_eq!(name, "void");
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let (arena, module) = parse_ok("fn f() { var x = 1 + 2 * 3; }");
        let decls = &arena.modules.get(module).decls;
        let Decl::Func(f) = arena.decls.get(decls[0]) else { panic!() };
        let Stat::Block(body) = arena.stats.get(f.body) else { panic!() };
        let Stat::Var(v) = arena.stats.get(body.stats[0]) else { panic!() };
        let Decl::Var(var_decl) = arena.decls.get(v.decl) else { panic!() };
        let Expr::Binary(add) = arena.exprs.get(var_decl.init.unwrap()) else { panic!("expected addition at the top") };
        assert_eq!(add.op, BinaryOp::Add);
        assert!(matches!(arena.exprs.get(add.rhs), Expr::Binary(m) if m.op == BinaryOp::Mul));
    }

    #[test]
    fn assignment_is_right_associative() {
        let (arena, module) = parse_ok("fn f() { a = b = c; }");
        let decls = &arena.modules.get(module).decls;
        let Decl::Func(f) = arena.decls.get(decls[0]) else { panic!() };
        let Stat::Block(body) = arena.stats.get(f.body) else { panic!() };
        let Stat::Expr(e) = arena.stats.get(body.stats[0]) else { panic!() };
        let Expr::Binary(outer) = arena.exprs.get(e.expr) else { panic!() };
        assert_eq!(outer.op, BinaryOp::Assign);
        assert!(matches!(arena.exprs.get(outer.rhs), Expr::Binary(inner) if inner.op == BinaryOp::Assign));
    }

    #[test]
    fn member_access_chains_left_associatively() {
        let (arena, module) = parse_ok("fn f() { var x = a.b.c; }");
        let decls = &arena.modules.get(module).decls;
        let Decl::Func(f) = arena.decls.get(decls[0]) else { panic!() };
        let Stat::Block(body) = arena.stats.get(f.body) else { panic!() };
        let Stat::Var(v) = arena.stats.get(body.stats[0]) else { panic!() };
        let Decl::Var(var_decl) = arena.decls.get(v.decl) else { panic!() };
        let Expr::Binary(outer) = arena.exprs.get(var_decl.init.unwrap()) else { panic!() };
        assert_eq!(outer.op, BinaryOp::Member);
        assert!(matches!(arena.exprs.get(outer.lhs), Expr::Binary(inner) if inner.op == BinaryOp::Member));
    }

    #[test]
    fn index_expression_accepts_a_full_expression() {
        let (arena, module) = parse_ok("fn f() { var x = a[1 + 2]; }");
        let decls = &arena.modules.get(module).decls;
        let Decl::Func(f) = arena.decls.get(decls[0]) else { panic!() };
        let Stat::Block(body) = arena.stats.get(f.body) else { panic!() };
        let Stat::Var(v) = arena.stats.get(body.stats[0]) else { panic!() };
        let Decl::Var(var_decl) = arena.decls.get(v.decl) else { panic!() };
        let Expr::Binary(index) = arena.exprs.get(var_decl.init.unwrap()) else { panic!() };
        assert_eq!(index.op, BinaryOp::Index);
        assert!(matches!(arena.exprs.get(index.rhs), Expr::Binary(add) if add.op == BinaryOp::Add));
    }

    #[test]
    fn inline_struct_type_is_lifted_to_a_synthetic_global() {
        let (arena, module) = parse_ok("buffer b : { a : float, b : int };");
        let decls = &arena.modules.get(module).decls;
        assert_eq!(decls.len(), 2, "expected the lifted struct plus the buffer");
        let Decl::Struct(s) = arena.decls.get(decls[0]) else { panic!("expected synthetic struct first") };
        assert_eq!(s.name, "priv_1");
        assert_eq!(s.members.len(), 2);
        let Decl::Buffer(b) = arena.decls.get(decls[1]) else { panic!() };
        let Expr::Type(t) = arena.exprs.get(b.ty) else { panic!() };
        assert!(matches!(&t.ty, TypeExpr::Id(name) if name == "priv_1"));
    }

    #[test]
    fn buffer_access_mode_defaults_to_read_write() {
        let (arena, module) = parse_ok("buffer b : float;");
        let decls = &arena.modules.get(module).decls;
        let Decl::Buffer(b) = arena.decls.get(decls[0]) else { panic!() };
        assert_eq!(b.access, AccessMode::ReadWrite);
    }

    #[test]
    fn explicit_buffer_access_mode_is_parsed() {
        let (arena, module) = parse_ok("buffer<read> b : float;");
        let decls = &arena.modules.get(module).decls;
        let Decl::Buffer(b) = arena.decls.get(decls[0]) else { panic!() };
        assert_eq!(b.access, AccessMode::Read);
    }

    #[test]
    fn runtime_sized_array_type_has_no_size_expr() {
        let (arena, module) = parse_ok("buffer b : []float;");
        let decls = &arena.modules.get(module).decls;
        let Decl::Buffer(b) = arena.decls.get(decls[0]) else { panic!() };
        let Expr::Type(t) = arena.exprs.get(b.ty) else { panic!() };
        let TypeExpr::Array { size, .. } = &t.ty else { panic!("expected array type") };
        assert!(size.is_none());
    }

    #[test]
    fn unknown_attribute_is_a_parse_error() {
        let mut arena = Arena::new();
        let tokens = tokenize("@bogus fn f() {}").unwrap();
        let mut errors = Vec::new();
        let module = parse(&mut arena, &tokens, &mut |e| errors.push(e));
        assert!(module.is_none());
        assert!(errors.iter().any(|e| e.contains("unknown attribute")));
    }

    #[test]
    fn parser_recovers_after_a_bad_global_declaration_and_keeps_going() {
        let mut arena = Arena::new();
        let tokens = tokenize("fn bad(( {} fn good() {}").unwrap();
        let mut errors = Vec::new();
        let module = parse(&mut arena, &tokens, &mut |e| errors.push(e));
        // the parser is expected to record at least one error and still
        // report absent overall, but it should have resynced far enough to
        // see the second, valid function along the way.
        assert!(module.is_none());
        assert!(!errors.is_empty());
    }
}
