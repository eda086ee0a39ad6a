//! End-to-end translation scenarios exercising the full
//! tokenize → parse → resolve → print pipeline through the crate's public
//! entry points only.

use ksl_translator::{parse, print_glsl, resolve, CompilationContext, ResolveError};

fn translate(source: &str) -> Result<String, String> {
    let mut ctx = CompilationContext::new();
    let mut errors = Vec::new();
    let module = parse(&mut ctx, source, &mut |e| errors.push(e)).ok_or("parsing produced no module")?;
    if !errors.is_empty() {
        return Err(format!("parse errors: {errors:?}"));
    }
    resolve(&mut ctx, module).map_err(|e| e.to_string())?;
    Ok(print_glsl(&ctx, module))
}

#[test]
fn minimal_compute_kernel() {
    let glsl = translate("@compute fn main() { var x : int = 1 + 2 * 3; }").expect("translates");
    assert!(glsl.contains("void main()"));
    assert!(glsl.contains("int x = 1 + 2 * 3;"));
}

#[test]
fn struct_constructor_call() {
    let glsl =
        translate("struct P { a : float, b : float } fn f() : P { return P(1.0, 2.0); }").expect("translates");
    assert!(glsl.contains("struct P {"));
    assert!(glsl.contains("float a;"));
    assert!(glsl.contains("float b;"));
    assert!(glsl.contains("return P(1.0, 2.0);"));
}

#[test]
fn array_size_from_constant_folding() {
    let glsl = translate("fn g() { var a : [55 + 9]int; a[0] = 1; }").expect("translates");
    assert!(glsl.contains("int a[64];"));
    assert!(glsl.contains("a[0] = 1;"));
}

#[test]
fn out_of_range_constant_index_is_fatal() {
    let mut ctx = CompilationContext::new();
    let mut errors = Vec::new();
    let module = parse(&mut ctx, "fn h() { var a : [4]int; a[10] = 0; }", &mut |e| errors.push(e)).expect("parses");
    let err = resolve(&mut ctx, module).expect_err("out-of-range index is a resolve error");
    assert!(matches!(err, ResolveError::IndexOutOfRange { index: 10, size: 4 }));
}

#[test]
fn swizzle_narrows_the_resolved_type_and_prints_dotted() {
    let glsl = translate("fn s(v : float4) : float3 { return v.xyz; }").expect("translates");
    assert!(glsl.contains("vec3 s(vec4 v) {"));
    assert!(glsl.contains("return v.xyz;"));
}

#[test]
fn buffer_with_explicit_access_mode() {
    let glsl = translate("@group(0) @binding(0) buffer<read> b : float;").expect("translates");
    assert!(glsl.contains("buffer b {"));
    assert!(glsl.contains("float data;"));
    assert!(glsl.contains("// access: read"));
}
