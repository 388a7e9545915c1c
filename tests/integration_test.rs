// Integration tests for the Cinder compiler

use std::path::{Path, PathBuf};

use cinder::backend::Backend;
use cinder::codegen::CodegenError;
use cinder::parser::parse::Parser;
use cinder::{compile_file, compile_source, CompileError, CompileOptions};

fn demo(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

fn compile(source: &str) -> Result<String, CompileError> {
    compile_source(source, &CompileOptions::default())
}

/// Backend for tests that execute programs; `None` when no C compiler is
/// installed.
fn backend() -> Option<Backend> {
    let backend = Backend::from_env();
    if backend.is_available() {
        Some(backend)
    } else {
        eprintln!("skipping: C compiler '{}' not available", backend.compiler());
        None
    }
}

#[test]
fn test_showcase_compiles() {
    let c = compile_file(&demo("showcase.cn"), &CompileOptions::default())
        .expect("showcase should compile");

    assert!(c.contains("int64_t fib(int64_t n);"));
    assert!(c.contains("char *describe(int64_t n);"));
    assert!(c.contains("int main(int argc, char **argv) {"));
    assert!(c.contains("double half = (1.0 / 2.0);"));
    assert!(c.contains("__rt_array_push_num(xs, fib(10));"));
    assert!(c.contains("(*p) = ((*p) + 1);"));
}

#[test]
fn test_imported_functions_join_the_program() {
    let c = compile_file(&demo("imports.cn"), &CompileOptions::default())
        .expect("imports should compile");

    assert!(c.contains("int64_t square(int64_t x);"));
    assert!(c.contains("int64_t add(int64_t a, int64_t b);"));
    let square = c.find("int64_t square(int64_t x) {").unwrap();
    let main = c.find("int main(int argc, char **argv) {").unwrap();
    assert!(square < main);
}

#[test]
fn test_self_import_is_rejected() {
    let err = compile_file(&demo("self_import.cn"), &CompileOptions::default()).unwrap_err();

    match err {
        CompileError::Parse { source } => {
            assert!(source.message.contains("Recursive import"), "{}", source);
            assert_eq!(source.lexeme, "self_import.cn");
        }
        other => panic!("expected parse error, got {}", other),
    }
}

#[test]
fn test_import_cycle_is_rejected() {
    let err = compile_file(&demo("cycle_a.cn"), &CompileOptions::default()).unwrap_err();

    assert!(err.to_string().contains("Recursive import of 'cycle_a.cn'"), "{}", err);
}

#[test]
fn test_missing_import_is_a_syntax_error() {
    let err = compile("import \"no/such/file.cn\";\nfn main() void { }").unwrap_err();

    assert!(matches!(err, CompileError::Parse { .. }));
}

#[test]
fn test_unterminated_block_points_at_eof() {
    let source = "fn main() void {\n    num x = 1;\n    if x > 0 {\n        x = 2;\n    }\n";
    let err = Parser::new(source).parse_program().unwrap_err();

    assert_eq!(err.location.line, 6);
    assert_eq!(err.location.column, 1);
    assert!(err.to_string().starts_with("Parse error at line 6, column 1"));
}

#[test]
fn test_collisions_produce_no_output() {
    for source in [
        "fn main() void { }\nfn helper() void { }\nfn helper() num { return 1; }",
        "fn push() void { }\nfn main() void { }",
    ] {
        match compile(source) {
            Err(CompileError::Codegen {
                source: CodegenError::SymbolCollision { .. },
            }) => {}
            other => panic!("expected symbol collision, got {:?}", other.map(|c| c.len())),
        }
    }
}

#[test]
fn test_lint_errors_stop_compilation() {
    let err = compile("fn main() void {\n    num = 3;\n}").unwrap_err();

    let CompileError::Lint { diagnostics } = err else {
        panic!("expected lint error");
    };
    assert_eq!(
        diagnostics,
        vec!["Lint error at line 2, column 9: expected identifier after 'num', found operator '='".to_string()]
    );
}

#[test]
fn test_arithmetic_exit_code() {
    let Some(backend) = backend() else {
        return;
    };
    let c = compile("fn main() num { return 1+2*3; }").unwrap();

    assert_eq!(backend.compile_and_run(&c).unwrap(), 7);
}

#[test]
fn test_void_main_exits_zero() {
    let Some(backend) = backend() else {
        return;
    };
    let c = compile("fn main() void { array<str> xs = [\"a\", \"b\"]; for s in xs { print(s); } return; }")
        .unwrap();

    assert_eq!(backend.compile_and_run(&c).unwrap(), 0);
}

#[test]
fn test_demo_programs_run() {
    let Some(backend) = backend() else {
        return;
    };

    for (name, expected) in [("showcase.cn", 62), ("imports.cn", 17)] {
        let c = compile_file(&demo(name), &CompileOptions::default()).unwrap();
        assert_eq!(backend.compile_and_run(&c).unwrap(), expected, "{}", name);
    }
}

#[test]
fn test_control_flow_semantics() {
    let Some(backend) = backend() else {
        return;
    };
    let source = r#"
        fn classify(num n) num {
            if n < 0 {
                return 1;
            } elseif n == 0 {
                return 2;
            } else {
                return 3;
            }
        }

        fn main() num {
            num acc = 0;
            for i in 0..10 {
                if i % 2 == 0 {
                    continue;
                }
                acc += i;
            }
            num steps = 0;
            for j in 0..10, 3 {
                steps++;
            }
            str word = "b";
            num picked = 0;
            match word {
                case "a" { picked = 1; }
                case "b" { picked = 2; }
                default { picked = 9; }
            }
            return acc + steps * 100 + picked * 1000 + classify(0) * 10;
        }
    "#;
    let c = compile(source).unwrap();

    // acc = 1+3+5+7+9 = 25, steps = 4 (0, 3, 6, 9), picked = 2, classify(0) = 2
    let expected = (25 + 400 + 2000 + 20) % 256;
    assert_eq!(backend.compile_and_run(&c).unwrap(), expected);
}

#[test]
fn test_main_receives_process_arguments() {
    let Some(backend) = backend() else {
        return;
    };
    let c = compile("fn main(num count, array<str> args) num { return count * 10 + size(args); }")
        .unwrap();

    // run without arguments: only the program name
    assert_eq!(backend.compile_and_run(&c).unwrap(), 11);
}

#[test]
fn test_rnum_stores_divide_as_reals() {
    let Some(backend) = backend() else {
        return;
    };
    let source = "fn half() rnum { return 1 / 2; }
fn main() num {
    rnum h;
    h = 1 / 2;
    return (h + half()) * 4;
}";
    let c = compile(source).unwrap();

    assert_eq!(backend.compile_and_run(&c).unwrap(), 4);
}

#[test]
fn test_out_of_bounds_get_exits_with_failure() {
    let Some(backend) = backend() else {
        return;
    };
    let c = compile("fn main() num { array<num> xs = [1]; return get(xs, 5); }").unwrap();

    assert_eq!(backend.compile_and_run(&c).unwrap(), 1);
}

#[test]
fn test_aot_build() {
    let Some(backend) = backend() else {
        return;
    };
    let c = compile("fn main() num { return 3; }").unwrap();
    let output = std::env::temp_dir().join(format!("cinder-aot-test-{}", std::process::id()));

    backend.compile_to_executable(&c, &output).unwrap();
    let status = std::process::Command::new(&output).status().unwrap();
    let _ = std::fs::remove_file(&output);

    assert_eq!(status.code(), Some(3));
}
