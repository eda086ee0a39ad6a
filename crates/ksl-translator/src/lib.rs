//! Source-to-source translation from KSL to GLSL.
//!
//! The pipeline is the classical four-stage front end: [`lexer::tokenize`]
//! produces a flat token stream, [`parser::parse`] builds an AST in an
//! [`arena::Arena`], [`resolver::resolve`] fills in scopes and types, and
//! [`printers::print_glsl`] walks the resolved tree to text. Every stage
//! after tokenization threads a [`CompilationContext`] instead of reaching
//! into process-wide state, which is how the original C++ translator's
//! singleton `ast::Mgr`/`types::Mgr`/`sem::Mgr` globals are replaced here
//! (SPEC_FULL.md's Ambient Stack section).

pub mod arena;
pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod printers;
pub mod resolver;
pub mod sem;
pub mod token;
pub mod types;

pub use arena::Handle;
pub use error::{LexError, ParseError, ResolveError, TranslatorError};
pub use token::Token;

use ast::ModuleNode;
use sem::SemanticInfo;
use types::TypeRegistry;

/// Owns every piece of state a translation accumulates: the AST arena, the
/// interned type universe, and the semantic side tables the resolver
/// fills in. One context is built per source file; nothing here survives
/// across files.
#[derive(Default, Debug)]
pub struct CompilationContext {
    pub arena: ast::Arena,
    pub types: TypeRegistry,
    pub sem: SemanticInfo,
}

impl CompilationContext {
    pub fn new() -> Self {
        Self { arena: ast::Arena::new(), types: TypeRegistry::new(), sem: SemanticInfo::default() }
    }
}

/// Splits `source` into a token stream. Fails only on input the lexer
/// itself can't make sense of (an unterminated token, an unknown
/// character) — see [`LexError`].
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, LexError> {
    lexer::tokenize(source)
}

/// Parses `source` into `ctx`'s arena, returning the root module handle.
/// Recoverable syntax errors are reported through `on_error` and parsing
/// continues at the next top-level declaration; `None` means the source
/// had no declarations worth keeping (spec.md §4.2/§7). Lexical errors are
/// also funneled through `on_error` rather than propagated, since from the
/// parser's point of view an unlexable prefix is just another reason to
/// produce nothing.
pub fn parse(
    ctx: &mut CompilationContext,
    source: &str,
    on_error: &mut dyn FnMut(String),
) -> Option<Handle<ModuleNode>> {
    let tokens = match tokenize(source) {
        Ok(tokens) => tokens,
        Err(e) => {
            on_error(e.to_string());
            return None;
        }
    };
    parser::parse(&mut ctx.arena, &tokens, on_error)
}

/// Runs semantic analysis over `module`, filling in `ctx.sem` and
/// `ctx.types`. Fatal on the first error (spec.md §7) — unlike parsing,
/// there's no sensible way to keep resolving past a type error.
pub fn resolve(ctx: &mut CompilationContext, module: Handle<ModuleNode>) -> Result<(), ResolveError> {
    resolver::resolve(ctx, module)
}

/// Renders a resolved `module` as GLSL source text.
pub fn print_glsl(ctx: &CompilationContext, module: Handle<ModuleNode>) -> String {
    printers::print_glsl(ctx, module)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> Result<(String, Vec<String>), TranslatorError> {
        let mut ctx = CompilationContext::new();
        let mut errors = Vec::new();
        let module = match parse(&mut ctx, source, &mut |e| errors.push(e)) {
            Some(m) => m,
            None => return Err(TranslatorError::Parse(Vec::new())),
        };
        resolve(&mut ctx, module)?;
        Ok((print_glsl(&ctx, module), errors))
    }

    #[test]
    fn full_pipeline_translates_a_compute_kernel() {
        let source = r#"
            buffer data : [4]float;

            @compute @workgroup_size(4, 1, 1)
            fn main() {
                var x = data[0];
                data[0] = x + 1.0;
            }
        "#;
        let (glsl, errors) = run(source).expect("translation succeeds");
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert!(glsl.contains("layout(local_size_x = 4, local_size_y = 1, local_size_z = 1) in;"));
        assert!(glsl.contains("buffer data {"));
        assert!(glsl.contains("float data[4];"));
    }

    #[test]
    fn resolve_error_surfaces_through_the_pipeline() {
        let err = run("fn f() { var x = y; }").unwrap_err();
        assert!(matches!(err, TranslatorError::Resolve(ResolveError::UndefinedName { .. })));
    }

    #[test]
    fn parse_errors_are_accumulated_even_though_the_module_is_unusable() {
        let source = "@unknown_attr fn bad() { } fn good() : float { return 1.0; }";
        let mut ctx = CompilationContext::new();
        let mut errors = Vec::new();
        let module = parse(&mut ctx, source, &mut |e| errors.push(e));
        assert!(module.is_none(), "a module with any recoverable error is still reported as unusable overall");
        assert!(!errors.is_empty());
    }
}
