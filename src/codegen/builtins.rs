//! Intrinsic function lowering
//!
//! Calls to the language intrinsics never reach C as ordinary calls:
//!
//! - `print(args...)`, `println(args...)`: one `__RT_PRINT` per argument,
//!   printed back to back; `println` adds a newline
//! - `push(xs, v)`, `get(xs, i)`, `set(xs, i, v)`: routed to
//!   `__rt_array_{push,get,set}_<elem>` by the element kind of `xs`
//! - `size(xs)`: `__rt_array_size`
//! - `len(s)`: `__rt_str_len`
//! - `offset(p, n)`: raw pointer offset

use crate::codegen::engine::Generator;
use crate::codegen::errors::CodegenError;
use crate::codegen::type_system::element_suffix;
use crate::parser::ast::*;

impl Generator<'_> {
    /// Lowered text of an intrinsic call, or `None` for user functions.
    pub(crate) fn emit_intrinsic(&mut self, call: NodeId) -> Result<Option<String>, CodegenError> {
        let ast = self.ast;
        let name = ast.content(call);
        let args = ast.children(call);

        let text = match name {
            "print" | "println" => {
                let mut parts = Vec::new();
                for &arg in args {
                    parts.push(format!("__RT_PRINT({})", self.emit_expression(arg)?));
                }
                if name == "println" {
                    parts.push("putchar('\\n')".to_string());
                }
                if parts.is_empty() {
                    "((void)0)".to_string()
                } else {
                    format!("({})", parts.join(", "))
                }
            }
            "push" | "get" | "set" => {
                let expected = if name == "set" { 3 } else { 2 };
                self.check_arity(call, expected)?;
                let element = self.array_element(call, args[0])?;
                let mut emitted = Vec::new();
                for &arg in args {
                    emitted.push(self.emit_expression(arg)?);
                }
                format!(
                    "__rt_array_{}_{}({})",
                    name,
                    element_suffix(element),
                    emitted.join(", ")
                )
            }
            "size" => {
                self.check_arity(call, 1)?;
                self.array_element(call, args[0])?;
                format!("__rt_array_size({})", self.emit_expression(args[0])?)
            }
            "len" => {
                self.check_arity(call, 1)?;
                format!("__rt_str_len({})", self.emit_expression(args[0])?)
            }
            "offset" => {
                self.check_arity(call, 2)?;
                let pointer = self.emit_expression(args[0])?;
                let count = self.emit_expression(args[1])?;
                format!("(({}) + ({}))", pointer, count)
            }
            _ => return Ok(None),
        };

        Ok(Some(text))
    }

    fn check_arity(&self, call: NodeId, expected: usize) -> Result<(), CodegenError> {
        let found = self.ast.children(call).len();
        if found == expected {
            Ok(())
        } else {
            Err(CodegenError::IntrinsicArity {
                intrinsic: self.ast.content(call).to_string(),
                expected,
                found,
                location: self.ast.location(call),
            })
        }
    }

    /// Element kind of an array-valued argument: a variable in scope or a
    /// call to a function returning an array.
    pub(crate) fn array_element(&self, call: NodeId, arg: NodeId) -> Result<Scalar, CodegenError> {
        let ast = self.ast;
        let name = ast.content(arg);

        let ty = match ast.kind(arg) {
            NodeKind::Identifier => self.lookup(name),
            NodeKind::FunctionCall => self.functions.get(name).copied(),
            _ => None,
        };

        match ty {
            Some(Type::Array(element)) => Ok(element),
            _ => Err(CodegenError::UnresolvedArray {
                intrinsic: ast.content(call).to_string(),
                name: name.to_string(),
                location: ast.location(arg),
            }),
        }
    }
}
