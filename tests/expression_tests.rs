// Expression parsing through the public API

use cinder::parser::ast::{Ast, LiteralKind, NodeId, NodeKind, Scalar, Type};
use cinder::parser::expressions::{build_tree, postfix_string, to_postfix};
use cinder::parser::lexer::analyze;
use cinder::parser::parse::Parser;
use cinder::{compile_source, CompileOptions};

fn parse(source: &str) -> Ast {
    Parser::new(source).parse_program().expect("Parsing failed")
}

/// First node of `kind` in pre-order
fn find(ast: &Ast, kind: NodeKind) -> NodeId {
    ast.descendants(Ast::ROOT)
        .into_iter()
        .find(|&id| ast.kind(id) == kind)
        .unwrap_or_else(|| panic!("no {:?} node", kind))
}

#[test]
fn test_precedence_chain() {
    let items = to_postfix(&analyze("a || b && c == d + e * f")).unwrap();

    assert_eq!(postfix_string(&items), "a b c d e f * + == && ||");
}

#[test]
fn test_comparison_binds_looser_than_arithmetic() {
    let items = to_postfix(&analyze("x % 2 == 0")).unwrap();

    assert_eq!(postfix_string(&items), "x 2 % 0 ==");
}

#[test]
fn test_trees_are_detached_until_reparented() {
    let mut ast = Ast::new();
    let items = to_postfix(&analyze("1 + 2")).unwrap();
    let roots = build_tree(&mut ast, &items).unwrap();

    assert_eq!(roots.len(), 1);
    assert_eq!(ast.parent(roots[0]), None);
    assert!(ast.children(Ast::ROOT).is_empty());

    assert!(ast.reparent(roots[0], Ast::ROOT));
    assert_eq!(ast.children(Ast::ROOT), &[roots[0]]);
    assert!(!ast.reparent(Ast::ROOT, roots[0]));
}

#[test]
fn test_declaration_initializer_shape() {
    let ast = parse("fn main() void { num x = 1 + 2 * 3; }");
    let decl = find(&ast, NodeKind::Declaration(Type::Scalar(Scalar::Num)));

    let &[plus] = ast.children(decl) else {
        panic!("expected a single initializer");
    };
    assert_eq!(ast.content(plus), "+");
    let &[one, times] = ast.children(plus) else {
        panic!("expected a binary operator");
    };
    assert_eq!(ast.content(one), "1");
    assert_eq!(ast.content(times), "*");
}

#[test]
fn test_rnum_initializer_literals_become_floats() {
    let ast = parse("fn main() void { array<num> xs = [4]; rnum r = 2 + get(xs, 0); }");
    let decl = find(&ast, NodeKind::Declaration(Type::Scalar(Scalar::Rnum)));
    let plus = ast.children(decl)[0];
    let &[two, call] = ast.children(plus) else {
        panic!("expected a binary operator");
    };

    assert_eq!(ast.kind(two), NodeKind::Literal(LiteralKind::Float));
    assert_eq!(ast.kind(call), NodeKind::FunctionCall);
    assert_eq!(ast.kind(ast.children(call)[1]), NodeKind::Literal(LiteralKind::Number));
}

#[test]
fn test_generated_c_keeps_tree_grouping() {
    let c = compile_source(
        "fn f(num a, num b, num c) num { return (a - b) - c + a * (b - c); }\nfn main() void { }",
        &CompileOptions::default(),
    )
    .unwrap();

    assert!(c.contains("return (((a - b) - c) + (a * (b - c)));"), "{}", c);
}

#[test]
fn test_call_arguments_in_generated_c() {
    let c = compile_source(
        "fn g(num a, num b) num { return a; }\nfn main() void { num r = g(g(1, 2), -3); }",
        &CompileOptions::default(),
    )
    .unwrap();

    assert!(c.contains("int64_t r = g(g(1, 2), (-3));"), "{}", c);
}

#[test]
fn test_unmatched_close_paren_is_a_parse_error() {
    let err = Parser::new("fn main() void { num x = (1 + 2)); }")
        .parse_program()
        .unwrap_err();

    assert_eq!(err.lexeme, ")");
}

#[test]
fn test_dangling_operators_are_rejected() {
    for (source, lexeme) in [
        ("fn main() void { print(1, 2 +); }", "+"),
        ("fn f(num x) num { return x; }\nfn main() void { num y = f(1, -); }", "-"),
        ("fn main() void { num a = 1; num b = 2; num y = a (b -); }", "-"),
    ] {
        let err = Parser::new(source).parse_program().unwrap_err();
        assert_eq!(err.lexeme, lexeme, "{}", source);
        assert!(err.message.starts_with("Expected operand"), "{}", err);

        assert!(compile_source(source, &CompileOptions::default()).is_err());
    }
}

#[test]
fn test_nul_before_digit_keeps_its_own_escape() {
    let c = compile_source(
        "fn main() void { str s = \"\\01\"; }",
        &CompileOptions::default(),
    )
    .unwrap();

    assert!(c.contains("char *s = \"\\0001\";"), "{}", c);
}
