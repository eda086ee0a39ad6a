//! GLSL source emission (spec.md §4.6).
//!
//! The printer never fails: by the time it runs, [`crate::resolver::resolve`]
//! has already rejected anything that wouldn't make sense as GLSL, so this
//! walk is a straight, infallible tree-to-string lowering. Grounded on the
//! original `glsl.cc` printer's shape (a visitor with one method per node
//! kind, threading an indent level implicitly via nested blocks) with the
//! original's singleton `std::ostream&` replaced by an owned `String` buffer.

use crate::arena::Handle;
use crate::ast::{
    AccessMode, Arena, Attr, AttrKind, BinaryExpr, BinaryOp, Decl, Expr, LitValue, ModuleNode, Stat, UnaryOp,
};
use crate::eval::eval_const;
use crate::types::{Type, TypeId, TypeRegistry};
use crate::CompilationContext;

/// Renders `module` as a complete GLSL translation unit.
pub fn print_glsl(ctx: &CompilationContext, module: Handle<ModuleNode>) -> String {
    let mut printer = Printer { ctx, out: String::new() };
    let decls = ctx.arena.modules.get(module).decls.clone();
    for (i, &decl) in decls.iter().enumerate() {
        if i > 0 {
            printer.out.push('\n');
        }
        printer.print_global_decl(decl);
    }
    printer.out
}

struct Printer<'a> {
    ctx: &'a CompilationContext,
    out: String,
}

impl<'a> Printer<'a> {
    fn arena(&self) -> &'a Arena {
        &self.ctx.arena
    }

    fn types(&self) -> &'a TypeRegistry {
        &self.ctx.types
    }

    fn decl_type(&self, decl: Handle<Decl>) -> TypeId {
        *self.ctx.sem.decl_types.get(&decl).expect("every printed declaration was type-checked by resolve()")
    }

    // -- global declarations --------------------------------------------

    fn print_global_decl(&mut self, decl: Handle<Decl>) {
        match self.arena().decls.get(decl) {
            Decl::Struct(_) => self.print_struct(decl),
            Decl::Buffer(_) => self.print_buffer(decl),
            Decl::Uniform(_) => self.print_uniform(decl),
            Decl::Func(_) => self.print_func(decl),
            other => unreachable!("not a global declaration: {other:?}"),
        }
    }

    fn print_struct(&mut self, decl: Handle<Decl>) {
        let Decl::Struct(s) = self.arena().decls.get(decl) else { unreachable!() };
        let members = s.members.clone();
        let name = s.name.clone();
        self.out.push_str(&format!("struct {name} {{\n"));
        for member in members {
            let Decl::StructMember(m) = self.arena().decls.get(member) else { unreachable!() };
            let member_name = m.name.clone();
            let ty = self.decl_type(member);
            self.out.push_str(&format!("    {};\n", self.render_decl(&member_name, ty, None)));
        }
        self.out.push_str("};\n");
    }

    fn print_buffer(&mut self, decl: Handle<Decl>) {
        let Decl::Buffer(b) = self.arena().decls.get(decl) else { unreachable!() };
        let name = b.name.clone();
        let attrs = b.attrs.clone();
        let ty = self.decl_type(decl);
        let access = self.ctx.sem.buffer_access.get(&decl).copied().unwrap_or(AccessMode::ReadWrite);
        self.out.push_str(&format!("// access: {}\n", access_mode_name(access)));
        let layout = self.layout_prefix(&attrs);
        self.out.push_str(&format!("{layout}buffer {name} {{\n"));
        self.out.push_str(&format!("    {};\n", self.render_decl("data", ty, None)));
        self.out.push_str("};\n");
    }

    fn print_uniform(&mut self, decl: Handle<Decl>) {
        let Decl::Uniform(u) = self.arena().decls.get(decl) else { unreachable!() };
        let name = u.name.clone();
        let attrs = u.attrs.clone();
        let ty = self.decl_type(decl);
        let layout = self.layout_prefix(&attrs);
        self.out.push_str(&format!("{layout}uniform {};\n", self.render_decl(&name, ty, None)));
    }

    fn print_func(&mut self, decl: Handle<Decl>) {
        let Decl::Func(f) = self.arena().decls.get(decl) else { unreachable!() };
        let name = f.name.clone();
        let attrs = f.attrs.clone();
        let args = f.args.clone();
        let body = f.body;
        if let Some(layout) = self.workgroup_layout_line(&attrs) {
            self.out.push_str(&layout);
        }
        let return_ty = self.decl_type(decl);
        let (ret_name, ret_suffix) = self.type_and_suffix(return_ty);
        let rendered_args: Vec<String> = args.iter().map(|&a| self.print_func_arg(a)).collect();
        self.out.push_str(&format!("{ret_name}{ret_suffix} {name}({}) ", rendered_args.join(", ")));
        self.print_stat(body);
        self.out.push('\n');
    }

    fn print_func_arg(&self, arg: Handle<Decl>) -> String {
        let Decl::FuncArg(a) = self.arena().decls.get(arg) else { unreachable!() };
        let mut name = a.name.clone();
        let mut qualifier = "";
        for &attr_h in &a.attrs {
            let attr = self.arena().attrs.get(attr_h);
            match attr.kind {
                AttrKind::Location | AttrKind::Input => qualifier = "in ",
                AttrKind::Builtin => {
                    if let Some(&arg_expr) = attr.args.first() {
                        if let Expr::Id(id) = self.arena().exprs.get(arg_expr) {
                            if let Some(builtin) = builtin_glsl_name(&id.name) {
                                name = builtin.to_string();
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        let ty = self.decl_type(arg);
        format!("{qualifier}{}", self.render_decl(&name, ty, None))
    }

    // -- statements --------------------------------------------------------

    fn print_stat(&mut self, stat: Handle<Stat>) {
        match self.arena().stats.get(stat).clone() {
            Stat::Block(b) => {
                self.out.push_str("{\n");
                for s in b.stats {
                    self.print_stat(s);
                }
                self.out.push_str("}\n");
            }
            Stat::Var(v) => {
                let Decl::Var(var) = self.arena().decls.get(v.decl) else { unreachable!() };
                let name = var.name.clone();
                let init = var.init;
                let ty = self.decl_type(v.decl);
                let init_text = init.map(|e| self.print_expr(e));
                self.out.push_str(&format!("{};\n", self.render_decl(&name, ty, init_text.as_deref())));
            }
            Stat::Expr(e) => {
                let text = self.print_expr(e.expr);
                self.out.push_str(&format!("{text};\n"));
            }
            Stat::Return(r) => {
                let expr = r.expr.expect("the parser always produces a return expression");
                let text = self.print_expr(expr);
                self.out.push_str(&format!("return {text};\n"));
            }
            Stat::Break(_) => self.out.push_str("break;\n"),
            Stat::If(s) => {
                let cond = self.print_expr(s.cond);
                self.out.push_str(&format!("if ({cond}) "));
                self.print_stat(s.then_block);
                if let Some(e) = s.else_block {
                    self.out.push_str("else ");
                    self.print_stat(e);
                }
            }
            Stat::For(s) => {
                let init = self.capture_stat(s.init);
                let update = self.capture_stat(s.update);
                let cond = self.print_expr(s.cond);
                self.out.push_str(&format!("for ({init}; {cond}; {update}) "));
                self.print_stat(s.body);
            }
            Stat::While(s) => {
                let cond = self.print_expr(s.cond);
                self.out.push_str(&format!("while ({cond}) "));
                self.print_stat(s.body);
            }
        }
    }

    /// Renders `stat` (a `Var` or `Expr` statement used as a `for`-loop
    /// clause) without the trailing newline `print_stat` normally emits, so
    /// it can sit inline inside `for (...; ...; ...)`.
    fn capture_stat(&mut self, stat: Handle<Stat>) -> String {
        let saved = std::mem::take(&mut self.out);
        self.print_stat(stat);
        let rendered = std::mem::replace(&mut self.out, saved);
        rendered.trim_end().trim_end_matches(';').to_string()
    }

    // -- expressions ---------------------------------------------------

    fn print_expr(&self, expr: Handle<Expr>) -> String {
        match self.arena().exprs.get(expr) {
            Expr::Lit(lit) => print_literal(lit.value),
            Expr::Id(id) => id.name.clone(),
            Expr::Unary(u) => format!("{}{}", unary_symbol(u.op), self.print_expr(u.operand)),
            Expr::Binary(b) => self.print_binary(b),
            Expr::Call(c) => {
                let args: Vec<String> = c.args.iter().map(|&a| self.print_expr(a)).collect();
                format!("{}({})", self.translate_callee(&c.callee), args.join(", "))
            }
            Expr::Array(a) => {
                let elems: Vec<String> = a.elements.iter().map(|&e| self.print_expr(e)).collect();
                format!("{{ {} }}", elems.join(", "))
            }
            Expr::Type(_) => unreachable!("type expressions never appear in value position"),
        }
    }

    fn print_binary(&self, b: &BinaryExpr) -> String {
        match b.op {
            BinaryOp::Member => format!("{}.{}", self.print_expr(b.lhs), self.print_expr(b.rhs)),
            BinaryOp::Index => format!("{}[{}]", self.print_expr(b.lhs), self.print_expr(b.rhs)),
            op => format!("{} {} {}", self.print_expr(b.lhs), binop_symbol(op), self.print_expr(b.rhs)),
        }
    }

    /// A call's callee is a type name (constructor) or a function name.
    /// Constructors translate their callee through the same type-name
    /// mapping used for declarations (`float3(...)` becomes `vec3(...)`).
    fn translate_callee(&self, name: &str) -> String {
        match self.types().find_by_name(name) {
            Some(ty) => self.glsl_type_name(ty),
            None => name.to_string(),
        }
    }

    // -- type naming -----------------------------------------------------

    fn glsl_type_name(&self, ty: TypeId) -> String {
        match self.types().get(ty) {
            Type::Scalar { name } => name.clone(),
            Type::Vec { elem, columns } => format!("{}{}", vec_prefix(self.scalar_name(*elem)), columns),
            Type::Mat { elem, rows, columns } => format!("{}mat{}x{}", mat_prefix(self.scalar_name(*elem)), rows, columns),
            Type::Array { elem, .. } => self.glsl_type_name(*elem),
            Type::Custom { name, .. } => name.clone(),
        }
    }

    fn scalar_name(&self, ty: TypeId) -> &str {
        match self.types().get(ty) {
            Type::Scalar { name } => name,
            _ => "float",
        }
    }

    /// Splits a (possibly array) type into its GLSL base type name and its
    /// C-style array suffix (`T name[N][M]`), outermost bracket first.
    fn type_and_suffix(&self, ty: TypeId) -> (String, String) {
        match self.types().get(ty) {
            Type::Array { elem, count } => {
                let (base, inner_suffix) = self.type_and_suffix(*elem);
                let this = if *count == 0 { "[]".to_string() } else { format!("[{count}]") };
                (base, format!("{this}{inner_suffix}"))
            }
            _ => (self.glsl_type_name(ty), String::new()),
        }
    }

    fn render_decl(&self, name: &str, ty: TypeId, init: Option<&str>) -> String {
        let (base, suffix) = self.type_and_suffix(ty);
        match init {
            Some(init) => format!("{base} {name}{suffix} = {init}"),
            None => format!("{base} {name}{suffix}"),
        }
    }

    // -- attribute-driven qualifiers --------------------------------------

    fn const_attr_arg(&self, attr: &Attr, index: usize) -> Option<i64> {
        let expr = *attr.args.get(index)?;
        eval_const(self.arena(), expr).ok().flatten().map(|v| v.as_i64())
    }

    fn layout_prefix(&self, attrs: &[Handle<Attr>]) -> String {
        let mut group = None;
        let mut binding = None;
        for &a in attrs {
            let attr = self.arena().attrs.get(a);
            match attr.kind {
                AttrKind::Group => group = self.const_attr_arg(attr, 0),
                AttrKind::Binding => binding = self.const_attr_arg(attr, 0),
                _ => {}
            }
        }
        if group.is_none() && binding.is_none() {
            return String::new();
        }
        let mut parts = Vec::new();
        if let Some(g) = group {
            parts.push(format!("set = {g}"));
        }
        if let Some(b) = binding {
            parts.push(format!("binding = {b}"));
        }
        format!("layout({}) ", parts.join(", "))
    }

    fn workgroup_layout_line(&self, attrs: &[Handle<Attr>]) -> Option<String> {
        for &a in attrs {
            let attr = self.arena().attrs.get(a);
            if attr.kind == AttrKind::WorkgroupSize {
                let x = self.const_attr_arg(attr, 0).unwrap_or(1);
                let y = self.const_attr_arg(attr, 1).unwrap_or(1);
                let z = self.const_attr_arg(attr, 2).unwrap_or(1);
                return Some(format!("layout(local_size_x = {x}, local_size_y = {y}, local_size_z = {z}) in;\n"));
            }
        }
        None
    }
}

fn vec_prefix(scalar: &str) -> &'static str {
    match scalar {
        "double" => "dvec",
        "int" => "ivec",
        "uint" => "uvec",
        _ => "vec",
    }
}

fn mat_prefix(scalar: &str) -> &'static str {
    match scalar {
        "double" => "dmat",
        _ => "mat",
    }
}

/// Known GLSL builtin substitutions for `@builtin(...)` parameters
/// (spec.md's recovered-feature table).
fn builtin_glsl_name(name: &str) -> Option<&'static str> {
    Some(match name {
        "position" => "gl_Position",
        "vertex_index" => "gl_VertexIndex",
        "instance_index" => "gl_InstanceIndex",
        "frag_depth" => "gl_FragDepth",
        _ => return None,
    })
}

fn access_mode_name(mode: AccessMode) -> &'static str {
    match mode {
        AccessMode::Read => "read",
        AccessMode::Write => "write",
        AccessMode::ReadWrite => "read_write",
    }
}

fn unary_symbol(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "-",
        UnaryOp::Plus => "+",
        UnaryOp::Not => "!",
        UnaryOp::BitNot => "~",
    }
}

fn binop_symbol(op: BinaryOp) -> &'static str {
    use BinaryOp::*;
    match op {
        Assign => "=",
        AddAssign => "+=",
        SubAssign => "-=",
        MulAssign => "*=",
        DivAssign => "/=",
        RemAssign => "%=",
        OrAssign => "|=",
        AndAssign => "&=",
        XorAssign => "^=",
        ShlAssign => "<<=",
        ShrAssign => ">>=",
        Or => "||",
        And => "&&",
        Eq => "==",
        Ne => "!=",
        BitOr => "|",
        BitXor => "^",
        BitAnd => "&",
        Lt => "<",
        Le => "<=",
        Gt => ">",
        Ge => ">=",
        Shl => "<<",
        Shr => ">>",
        Add => "+",
        Sub => "-",
        Mul => "*",
        Div => "/",
        Rem => "%",
        Member | Index => unreachable!("Member/Index print through their own branch"),
    }
}

fn print_literal(v: LitValue) -> String {
    match v {
        LitValue::I16(n) => n.to_string(),
        LitValue::I32(n) => n.to_string(),
        LitValue::I64(n) => n.to_string(),
        LitValue::U16(n) => n.to_string(),
        LitValue::U32(n) => n.to_string(),
        LitValue::U64(n) => n.to_string(),
        LitValue::F32(n) => format_float(n as f64),
        LitValue::F64(n) => format_float(n),
    }
}

fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        v.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::print_glsl;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use crate::resolver::resolve;
    use crate::CompilationContext;

    fn translate(source: &str) -> String {
        let mut ctx = CompilationContext::new();
        let tokens = tokenize(source).expect("lex");
        let mut errors = Vec::new();
        let module = parse(&mut ctx.arena, &tokens, &mut |e| errors.push(e)).expect("parse");
        assert!(errors.is_empty(), "unexpected parse errors: {errors:?}");
        resolve(&mut ctx, module).expect("resolve");
        print_glsl(&ctx, module)
    }

    #[test]
    fn scalar_function_prints_as_glsl() {
        let out = translate("fn add(a : float, b : float) : float { return a + b; }");
        assert!(out.contains("float add(float a, float b) {"));
        assert!(out.contains("return a + b;"));
    }

    #[test]
    fn vector_types_translate_to_glsl_vec_names() {
        let out = translate("fn f(v : float3) : float3 { return v; }");
        assert!(out.contains("vec3 f(vec3 v) {"));
    }

    #[test]
    fn integer_vector_types_use_the_i_prefix() {
        let out = translate("fn f(v : int2) : int2 { return v; }");
        assert!(out.contains("ivec2 f(ivec2 v) {"));
    }

    #[test]
    fn vector_constructor_call_translates_its_callee() {
        let out = translate("fn f() : float3 { return float3(1.0, 2.0, 3.0); }");
        assert!(out.contains("return vec3(1.0, 2.0, 3.0);"));
    }

    #[test]
    fn buffer_emits_access_comment_and_layout_qualifier() {
        let out = translate("@group(0) @binding(1) buffer b : [4]float;");
        assert!(out.contains("// access: read_write"));
        assert!(out.contains("layout(set = 0, binding = 1) buffer b {"));
        assert!(out.contains("float data[4];"));
    }

    #[test]
    fn workgroup_size_attribute_emits_local_size_layout() {
        let out = translate("@compute @workgroup_size(8, 8, 1) fn main() { }");
        assert!(out.contains("layout(local_size_x = 8, local_size_y = 8, local_size_z = 1) in;"));
    }

    #[test]
    fn builtin_parameter_substitutes_the_glsl_name() {
        let out = translate("fn vs(@builtin(position) p : float4) : float4 { return p; }");
        assert!(out.contains("vec4 vs(vec4 gl_Position) {"));
    }

    #[test]
    fn struct_members_print_one_per_line() {
        let out = translate("struct Particle { pos : float3, vel : float3 }");
        assert!(out.contains("struct Particle {"));
        assert!(out.contains("vec3 pos;"));
        assert!(out.contains("vec3 vel;"));
    }

    #[test]
    fn for_loop_prints_on_a_single_header_line() {
        let out = translate("fn f() { for var i = 0; i < 10; i = i + 1; { } }");
        assert!(out.contains("for (int i = 0; i < 10; i = i + 1) {"));
    }

    #[test]
    fn swizzle_access_prints_as_dot_syntax() {
        let out = translate("fn f(v : float4) : float2 { return v.xy; }");
        assert!(out.contains("return v.xy;"));
    }

    #[test]
    fn cloned_module_prints_identically_to_the_original() {
        let mut ctx = CompilationContext::new();
        let source = "fn add(a : float, b : float) : float { return a + b; }";
        let tokens = tokenize(source).expect("lex");
        let mut errors = Vec::new();
        let module = parse(&mut ctx.arena, &tokens, &mut |e| errors.push(e)).expect("parse");
        assert!(errors.is_empty());
        resolve(&mut ctx, module).expect("resolve");
        let original_text = print_glsl(&ctx, module);

        let cloned = ctx.arena.clone_module(module);
        resolve(&mut ctx, cloned).expect("resolve clone");
        let cloned_text = print_glsl(&ctx, cloned);

        assert_eq!(original_text, cloned_text);
    }
}
