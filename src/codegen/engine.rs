// Tree-walking C generator for Cinder programs

use crate::codegen::constants::{ENTRY_POINT, INDENT, LOOP_COUNTER_PREFIX, RESERVED_SYMBOLS};
use crate::codegen::errors::CodegenError;
use crate::codegen::runtime::PREAMBLE;
use crate::codegen::type_system::scalar_table;
use crate::parser::ast::*;
use crate::parser::lexer::Token;
use log::{debug, error, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};

/// Knobs of a single generation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenOptions {
    /// Prefix the output with `#define RT_DEBUG 1`, activating breakpoints
    pub debug: bool,
}

/// Emits C source for a parsed program.
///
/// A generator is used for exactly one compilation: [`Generator::generate`]
/// consumes it, so counters and scopes never leak between runs.
pub struct Generator<'a> {
    /// Tree being lowered
    pub(crate) ast: &'a Ast,

    /// Token stream of the main file, re-scanned to locate symbol collisions
    tokens: &'a [Token],

    options: GenOptions,

    /// Scalar to C type table
    pub(crate) types: FxHashMap<Scalar, &'static str>,

    /// Block scopes, innermost last
    pub(crate) scopes: Vec<FxHashMap<String, Type>>,

    /// Function names defined so far
    declared: FxHashSet<String>,

    /// Return type of every user function
    pub(crate) functions: FxHashMap<String, Type>,

    /// Source of unique `__loop_<n>` names
    loop_counter: usize,

    /// Source of unique `__ret_<n>` names
    pub(crate) temp_counter: usize,

    /// Current indentation depth
    pub(crate) indent: usize,

    /// Whether the function being emitted is `main`
    pub(crate) in_main: bool,

    /// Return type of the function being emitted
    pub(crate) current_return: Type,

    /// Integer literals are emitted as `double` while set (values flowing
    /// into an `rnum`)
    pub(crate) real_literals: bool,
}

impl<'a> Generator<'a> {
    pub fn new(ast: &'a Ast, tokens: &'a [Token], options: GenOptions) -> Self {
        Generator {
            ast,
            tokens,
            options,
            types: scalar_table(),
            scopes: Vec::new(),
            declared: FxHashSet::default(),
            functions: FxHashMap::default(),
            loop_counter: 0,
            temp_counter: 0,
            indent: 0,
            in_main: false,
            current_return: Type::Void,
            real_literals: false,
        }
    }

    /// Lower the whole program. On error nothing is returned.
    pub fn generate(mut self) -> Result<String, CodegenError> {
        let functions = self.collect_functions()?;
        info!("generating C for {} function(s)", functions.len());

        let mut prototypes = String::new();
        for &function in &functions {
            if self.ast.content(function) != ENTRY_POINT {
                prototypes.push_str(&self.signature(function)?);
                prototypes.push_str(";\n");
            }
        }

        let mut bodies = String::new();
        for &function in &functions {
            bodies.push_str(&self.emit(function)?);
            bodies.push('\n');
        }

        let mut out = String::new();
        if self.options.debug {
            out.push_str("#define RT_DEBUG 1\n");
        }
        out.push_str(PREAMBLE);
        if !prototypes.is_empty() {
            out.push_str(&prototypes);
            out.push('\n');
        }
        out.push_str(&bodies);

        debug!(
            "emitted {} bytes of C, {} loop counter(s)",
            out.len(),
            self.loop_counter
        );
        Ok(out)
    }

    /// Register every function, rejecting reserved and duplicate names.
    fn collect_functions(&mut self) -> Result<Vec<NodeId>, CodegenError> {
        let ast = self.ast;
        let mut functions = Vec::new();

        for &id in ast.children(ast.root()) {
            let NodeKind::Function(return_type) = ast.kind(id) else {
                continue;
            };
            let name = ast.content(id);

            let occurrence = if RESERVED_SYMBOLS.contains(&name) {
                Some(0)
            } else if self.declared.contains(name) {
                Some(1)
            } else {
                None
            };

            if let Some(occurrence) = occurrence {
                let location = self.definition_location(name, occurrence, ast.location(id));
                error!("symbol collision on '{}' at {}", name, location);
                return Err(CodegenError::SymbolCollision {
                    symbol: name.to_string(),
                    line: location.line,
                    column: location.column,
                });
            }

            self.declared.insert(name.to_string());
            self.functions.insert(name.to_string(), return_type);
            functions.push(id);
        }

        Ok(functions)
    }

    /// Location of the `occurrence`-th `fn <name>` in the main token stream.
    /// Definitions that came from an import are not in that stream and fall
    /// back to the node location.
    fn definition_location(
        &self,
        name: &str,
        occurrence: usize,
        fallback: SourceLocation,
    ) -> SourceLocation {
        self.tokens
            .windows(2)
            .filter(|pair| pair[0].is_keyword("fn") && pair[1].is_identifier())
            .filter(|pair| pair[1].lexeme == name)
            .map(|pair| pair[1].location)
            .nth(occurrence)
            .unwrap_or(fallback)
    }

    /// `ret name(params)` of a non-entry function
    fn signature(&mut self, function: NodeId) -> Result<String, CodegenError> {
        let ast = self.ast;
        let NodeKind::Function(return_type) = ast.kind(function) else {
            return Err(self.malformed("function", function));
        };

        let mut params = Vec::new();
        for &child in ast.children(function) {
            if matches!(ast.kind(child), NodeKind::Parameter(_)) {
                params.push(self.emit(child)?);
            }
        }
        let params = if params.is_empty() {
            "void".to_string()
        } else {
            params.join(", ")
        };

        let head = format!("{}({})", ast.content(function), params);
        Ok(self.c_declarator(return_type, &head))
    }

    /// Emit any node. Statement kinds produce complete, indented lines;
    /// expression kinds produce inline C.
    pub(crate) fn emit(&mut self, id: NodeId) -> Result<String, CodegenError> {
        let ast = self.ast;
        let node = ast.node(id);

        match node.kind {
            NodeKind::Program => {
                let mut out = String::new();
                for &child in &node.children {
                    out.push_str(&self.emit(child)?);
                }
                Ok(out)
            }
            NodeKind::Function(return_type) => self.emit_function(id, return_type),
            NodeKind::Parameter(ty) => Ok(self.c_declarator(ty, &node.content)),

            NodeKind::Identifier
            | NodeKind::Literal(_)
            | NodeKind::Operator
            | NodeKind::FunctionCall => self.emit_expression(id),

            // consumed by their owners
            NodeKind::Delimiter | NodeKind::Comma => Ok(String::new()),

            NodeKind::Assignment => self.emit_assignment(id),
            NodeKind::Declaration(ty) => self.emit_declaration(id, ty),
            NodeKind::If => self.emit_conditional(id, "if"),
            NodeKind::ElseIf => self.emit_conditional(id, "else if"),
            NodeKind::Else => {
                let head = format!("{}else ", self.pad());
                Ok(head + &self.emit_body(&node.children)?)
            }
            NodeKind::While => self.emit_while(id),
            NodeKind::Loop => self.emit_loop(id),
            NodeKind::For => self.emit_for(id),
            NodeKind::Match => self.emit_match(id),
            NodeKind::Case | NodeKind::Default => Err(self.malformed("case outside of match", id)),
            NodeKind::Break => Ok(format!("{}break;\n", self.pad())),
            NodeKind::Continue => Ok(format!("{}continue;\n", self.pad())),
            NodeKind::Return => self.emit_return(id),
            NodeKind::PostfixOrPrefix => self.emit_increment(id),

            NodeKind::BodyStart => {
                self.enter_scope();
                self.indent += 1;
                Ok("{\n".to_string())
            }
            NodeKind::BodyEnd => {
                self.exit_scope();
                self.indent = self.indent.saturating_sub(1);
                Ok(format!("{}}}\n", self.pad()))
            }

            NodeKind::Unsafe => {
                warn!("inlining __unsafe block at {}", node.location);
                Ok(format!("{}{}\n", self.pad(), node.content))
            }
            NodeKind::Breakpoint => Ok(format!(
                "{}__RT_BREAKPOINT({}, {});\n",
                self.pad(),
                node.location.line,
                node.location.column
            )),
        }
    }

    fn emit_function(&mut self, id: NodeId, return_type: Type) -> Result<String, CodegenError> {
        let ast = self.ast;
        let name = ast.content(id);
        let children = ast.children(id);
        let split = children
            .iter()
            .position(|&c| !matches!(ast.kind(c), NodeKind::Parameter(_)))
            .unwrap_or(children.len());
        let (params, body) = children.split_at(split);

        let is_main = name == ENTRY_POINT;
        let signature = if is_main {
            if !matches!(
                return_type,
                Type::Void | Type::Scalar(Scalar::Num | Scalar::Rnum | Scalar::Bool)
            ) {
                return Err(CodegenError::UnsupportedMain {
                    return_type,
                    location: ast.location(id),
                });
            }
            self.check_main_parameters(params)?;
            "int main(int argc, char **argv)".to_string()
        } else {
            self.signature(id)?
        };

        self.in_main = is_main;
        self.current_return = return_type;
        self.indent = 0;
        self.enter_scope();
        for &param in params {
            if let NodeKind::Parameter(ty) = ast.kind(param) {
                self.declare(ast.content(param), ty);
            }
        }

        let mut out = signature + " ";
        for (index, &child) in body.iter().enumerate() {
            let kind = ast.kind(child);
            if is_main && kind == NodeKind::BodyEnd && index + 1 == body.len() {
                let pad = self.pad();
                out.push_str(&format!("{pad}__rt_heap_release();\n{pad}return 0;\n"));
            }
            out.push_str(&self.emit_statement(child)?);
            if is_main && kind == NodeKind::BodyStart && index == 0 {
                out.push_str(&format!("{}__rt_heap_acquire();\n", self.pad()));
                out.push_str(&self.bind_main_parameters(params));
            }
        }

        self.exit_scope();
        self.in_main = false;
        Ok(out)
    }

    /// `main` may take the argument count as one `num` and the arguments
    /// as one `array<str>`, in either order.
    fn check_main_parameters(&self, params: &[NodeId]) -> Result<(), CodegenError> {
        let ast = self.ast;
        let mut seen = FxHashSet::default();

        for &param in params {
            let NodeKind::Parameter(param_type) = ast.kind(param) else {
                return Err(self.malformed("parameter", param));
            };
            let supported = matches!(
                param_type,
                Type::Scalar(Scalar::Num) | Type::Array(Scalar::Str)
            );
            if !supported || !seen.insert(param_type) {
                return Err(CodegenError::UnsupportedMainParameter {
                    name: ast.content(param).to_string(),
                    param_type,
                    location: ast.location(param),
                });
            }
        }

        Ok(())
    }

    /// Initialize the parameters of `main` from `argc`/`argv`
    fn bind_main_parameters(&mut self, params: &[NodeId]) -> String {
        let ast = self.ast;
        let pad = self.pad();
        let mut out = String::new();

        for &param in params {
            let name = ast.content(param);
            match ast.kind(param) {
                NodeKind::Parameter(Type::Scalar(Scalar::Num)) => {
                    out.push_str(&format!("{pad}int64_t {name} = (int64_t)argc;\n"));
                }
                NodeKind::Parameter(Type::Array(Scalar::Str)) => {
                    let c = self.next_loop_counter();
                    out.push_str(&format!("{pad}__rt_array *{name} = __rt_array_create_str();\n"));
                    out.push_str(&format!(
                        "{pad}for (int64_t {c} = 0; {c} < argc; {c}++) __rt_array_push_str({name}, argv[{c}]);\n"
                    ));
                }
                _ => {}
            }
        }

        out
    }

    /// Emit a node in statement position; a bare call gets its `;`.
    pub(crate) fn emit_statement(&mut self, id: NodeId) -> Result<String, CodegenError> {
        match self.ast.kind(id) {
            NodeKind::FunctionCall
            | NodeKind::Operator
            | NodeKind::Identifier
            | NodeKind::Literal(_) => {
                let expr = self.emit_expression(id)?;
                Ok(format!("{}{};\n", self.pad(), expr))
            }
            _ => self.emit(id),
        }
    }

    /// Emit `BodyStart stmt* BodyEnd` as a braced block
    pub(crate) fn emit_body(&mut self, body: &[NodeId]) -> Result<String, CodegenError> {
        self.emit_body_with_binding(body, None)
    }

    /// Like [`Generator::emit_body`], declaring `name` as the first statement
    /// of the block when a binding is given.
    pub(crate) fn emit_body_with_binding(
        &mut self,
        body: &[NodeId],
        binding: Option<(&str, Type, String)>,
    ) -> Result<String, CodegenError> {
        let mut out = String::new();
        let mut binding = binding;

        for &child in body {
            out.push_str(&self.emit_statement(child)?);
            if self.ast.kind(child) == NodeKind::BodyStart {
                if let Some((name, ty, value)) = binding.take() {
                    self.declare(name, ty);
                    out.push_str(&format!(
                        "{}{} = {};\n",
                        self.pad(),
                        self.c_declarator(ty, name),
                        value
                    ));
                }
            }
        }

        Ok(out)
    }

    pub(crate) fn pad(&self) -> String {
        INDENT.repeat(self.indent)
    }

    /// Fresh `__loop_<n>` counter name
    pub(crate) fn next_loop_counter(&mut self) -> String {
        let name = format!("{}{}", LOOP_COUNTER_PREFIX, self.loop_counter);
        self.loop_counter += 1;
        name
    }

    pub(crate) fn malformed(&self, what: &str, id: NodeId) -> CodegenError {
        CodegenError::MalformedNode {
            what: what.to_string(),
            location: self.ast.location(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::Parser;

    fn generate_with(source: &str, options: GenOptions) -> Result<String, CodegenError> {
        let mut parser = Parser::new(source);
        let ast = parser.parse_program().unwrap();
        Generator::new(&ast, parser.tokens(), options).generate()
    }

    fn generate(source: &str) -> Result<String, CodegenError> {
        generate_with(source, GenOptions::default())
    }

    /// Output without the runtime preamble
    fn user_code(output: &str) -> &str {
        let start = output.find(PREAMBLE).unwrap() + PREAMBLE.len();
        &output[start..]
    }

    #[test]
    fn test_void_main_releases_on_every_exit() {
        let out = generate("fn main() void { if true { return; } print(1); }").unwrap();
        let code = user_code(&out);

        assert!(code.contains("int main(int argc, char **argv) {\n    __rt_heap_acquire();\n"));
        assert_eq!(code.matches("__rt_heap_acquire();").count(), 1);
        assert_eq!(code.matches("__rt_heap_release();").count(), 2);
        assert!(code.contains("{ __rt_heap_release(); return 0; }"));
        assert!(code.ends_with("    __rt_heap_release();\n    return 0;\n}\n\n"));
    }

    #[test]
    fn test_main_return_value_is_exit_code() {
        let out = generate("fn main() num { return 1 + 2 * 3; }").unwrap();

        assert!(out.contains(
            "{ int64_t __ret_0 = (int64_t)((1 + (2 * 3))); __rt_heap_release(); return (int)__ret_0; }"
        ));
    }

    #[test]
    fn test_unsupported_main_return_type() {
        let err = generate("fn main() str { return \"x\"; }").unwrap_err();

        assert!(matches!(err, CodegenError::UnsupportedMain { .. }));
    }

    #[test]
    fn test_main_parameters_bind_process_arguments() {
        let out = generate(
            "fn main(num count, array<str> args) num { println(get(args, 0)); return count; }",
        )
        .unwrap();
        let code = user_code(&out);

        assert!(code.contains(
            "    __rt_heap_acquire();\n    int64_t count = (int64_t)argc;\n    __rt_array *args = __rt_array_create_str();\n"
        ));
        assert!(code.contains(
            "for (int64_t __loop_0 = 0; __loop_0 < argc; __loop_0++) __rt_array_push_str(args, argv[__loop_0]);"
        ));
        assert!(code.contains("__rt_array_get_str(args, 0)"));
        assert!(code.contains("(int64_t)(count)"));
    }

    #[test]
    fn test_unsupported_main_parameters() {
        for source in [
            "fn main(str name) void { }",
            "fn main(num a, num b) void { }",
            "fn main(array<num> xs) void { }",
        ] {
            let err = generate(source).unwrap_err();
            assert!(
                matches!(err, CodegenError::UnsupportedMainParameter { .. }),
                "{}: {}",
                source,
                err
            );
        }

        let err = generate("fn main(num a, str b) void { }").unwrap_err();
        assert_eq!(err.location(), SourceLocation::new(1, 20));
    }

    #[test]
    fn test_values_stored_into_rnum_divide_as_reals() {
        let source = "fn f(num x) rnum { return 1 / 2; }
fn main() void {
    rnum h;
    h = 1 / 2;
    h += 3;
    h = f(1) / 2;
    ptr rnum p = &h;
    deref p = 1;
    num n;
    n = 1 / 2;
}";
        let code = generate(source).unwrap();

        assert!(code.contains("    return (1.0 / 2.0);\n"));
        assert!(code.contains("    h = (1.0 / 2.0);\n"));
        assert!(code.contains("    h += 3.0;\n"));
        assert!(code.contains("    h = (f(1) / 2.0);\n"));
        assert!(code.contains("    (*p) = 1.0;\n"));
        assert!(code.contains("    n = (1 / 2);\n"));
    }

    #[test]
    fn test_duplicate_function_is_collision() {
        let err = generate("fn f() void { }\nfn f() void { }\nfn main() void { }").unwrap_err();

        assert_eq!(
            err,
            CodegenError::SymbolCollision {
                symbol: "f".to_string(),
                line: 2,
                column: 4,
            }
        );
    }

    #[test]
    fn test_reserved_name_is_collision() {
        let err = generate("fn main() void { }\nfn print() void { }").unwrap_err();

        assert_eq!(
            err,
            CodegenError::SymbolCollision {
                symbol: "print".to_string(),
                line: 2,
                column: 4,
            }
        );
    }

    #[test]
    fn test_prototypes_and_type_mapping() {
        let out = generate(
            "fn main() void { }\n\
             fn f(num a, rnum b, bool c, str d, ptr num e, array<str> g) str { return d; }\n\
             fn g() void { }",
        )
        .unwrap();
        let code = user_code(&out);

        let prototype =
            "char *f(int64_t a, double b, bool c, char *d, int64_t *e, __rt_array *g);\n";
        assert!(code.starts_with(prototype), "{}", code);
        assert!(code.contains("void g(void);\n"));
        assert!(!code.contains("int main(int argc, char **argv);"));
        let body = code.find("char *f(int64_t a").unwrap() + prototype.len();
        assert!(code[body..].contains("char *f(int64_t a, double b, bool c, char *d, int64_t *e, __rt_array *g) {"));
    }

    #[test]
    fn test_zero_values() {
        let out = generate(
            "fn main() void { num a; rnum b; bool c; str d; ptr num e; array<bool> f; }",
        )
        .unwrap();

        for line in [
            "int64_t a = 0;",
            "double b = 0.0;",
            "bool c = false;",
            "char *d = (char *)\"\";",
            "int64_t *e = NULL;",
            "__rt_array *f = __rt_array_create_bool();",
        ] {
            assert!(out.contains(line), "missing {}", line);
        }
    }

    #[test]
    fn test_loop_counters_are_unique() {
        let out = generate(
            "fn main() void { while true { loop { break; } } for i in 0..3 { continue; } }",
        )
        .unwrap();
        let code = user_code(&out);

        for n in 0..3 {
            let decl = format!("int64_t __loop_{} = ", n);
            assert_eq!(code.matches(&decl).count(), 1, "{}", decl);
        }
        assert!(!code.contains("__loop_3"));
        assert!(code.contains("for (int64_t __loop_2 = (0); __loop_2 < (3); __loop_2 += (1)) {"));
        assert!(code.contains("int64_t i = __loop_2;"));
    }

    #[test]
    fn test_for_each_binds_element() {
        let out = generate(
            "fn main() void { array<str> names = [\"a\"]; for n in names { println(n); } }",
        )
        .unwrap();

        assert!(out.contains("__loop_0 < __rt_array_size(names)"));
        assert!(out.contains("char *n = __rt_array_get_str(names, __loop_0);"));
        assert!(out.contains("(__RT_PRINT(n), putchar('\\n'));"));
    }

    #[test]
    fn test_stepped_range() {
        let out = generate("fn main() void { for i in 10..0 - 1, 0 - 2 { } }").unwrap();

        assert!(out.contains("__loop_0 += ((0 - 2))"));
    }

    #[test]
    fn test_match_lowering() {
        let out = generate(
            "fn main() void { num x = 2; match x { case 1 { print(1); } default { print(0); } case 2 { print(2); } } }",
        )
        .unwrap();
        let code = user_code(&out);

        let first = code.find("if (__RT_EQ((x), (1))) {").unwrap();
        let second = code.find("else if (__RT_EQ((x), (2))) {").unwrap();
        let default = code.find("else {").unwrap();
        assert!(first < second && second < default);
    }

    #[test]
    fn test_match_with_only_default() {
        let out = generate("fn main() void { match 1 { default { print(0); } } }").unwrap();
        let code = user_code(&out);

        assert!(!code.contains("__RT_EQ"));
        assert!(code.contains("(__RT_PRINT(0));"));
    }

    #[test]
    fn test_array_intrinsics_route_by_element() {
        let out = generate(
            "fn main() void { array<rnum> xs = [1, 2]; push(xs, 3); rnum y = get(xs, 0); set(xs, 0, y); print(size(xs)); }",
        )
        .unwrap();

        for text in [
            "__rt_array *xs = __rt_array_create_rnum();",
            "__rt_array_push_rnum(xs, 1.0);",
            "__rt_array_push_rnum(xs, 2.0);",
            "__rt_array_push_rnum(xs, 3);",
            "double y = __rt_array_get_rnum(xs, 0);",
            "__rt_array_set_rnum(xs, 0, y);",
            "__RT_PRINT(__rt_array_size(xs))",
        ] {
            assert!(out.contains(text), "missing {}", text);
        }
    }

    #[test]
    fn test_array_from_function_result() {
        let out = generate(
            "fn make() array<num> { array<num> xs; return xs; }\nfn main() void { print(get(make(), 0)); }",
        )
        .unwrap();

        assert!(out.contains("__rt_array_get_num(make(), 0)"));
    }

    #[test]
    fn test_intrinsic_errors() {
        let err = generate("fn main() void { num x = 1; push(x, 2); }").unwrap_err();
        assert!(matches!(err, CodegenError::UnresolvedArray { ref name, .. } if name == "x"));

        let err = generate("fn main() void { array<num> xs; num y = get(xs); }").unwrap_err();
        assert!(matches!(
            err,
            CodegenError::IntrinsicArity {
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_scopes_end_with_their_block() {
        let err = generate(
            "fn main() void { if true { array<num> xs; } push(xs, 1); }",
        )
        .unwrap_err();

        assert!(matches!(err, CodegenError::UnresolvedArray { .. }));
    }

    #[test]
    fn test_expressions() {
        let out = generate(
            "fn main() void { num x = 1; ptr num p = &x; deref p = -x; bool b = !(x < 2) || x != 3; str s = \"q\\\"\"; x += 1; x++; --x; }",
        )
        .unwrap();

        for text in [
            "int64_t *p = (&x);",
            "(*p) = (-x);",
            "bool b = ((bool)(((bool)!((bool)(x < 2))) || (!__RT_EQ(x, 3))));",
            "char *s = \"q\\\"\";",
            "x += 1;",
            "x++;",
            "--x;",
        ] {
            assert!(out.contains(text), "missing {}", text);
        }
    }

    #[test]
    fn test_debug_define_and_breakpoint() {
        let out = generate_with(
            "fn main() void { __breakpoint; }",
            GenOptions { debug: true },
        )
        .unwrap();

        assert!(out.starts_with("#define RT_DEBUG 1\n"));
        assert!(out.contains("__RT_BREAKPOINT(1, 18);"));

        let release = generate("fn main() void { __breakpoint; }").unwrap();
        assert!(!release.contains("#define RT_DEBUG"));
    }

    #[test]
    fn test_unsafe_is_verbatim() {
        let out = generate("fn main() void { __unsafe \"puts(\\\"raw\\\");\"; }").unwrap();

        assert!(out.contains("    puts(\"raw\");\n"));
    }

    #[test]
    fn test_generation_is_repeatable() {
        let source = "fn main() void { loop { break; } }";
        assert_eq!(generate(source).unwrap(), generate(source).unwrap());
    }
}
