//! Expression emission
//!
//! Every compound expression is fully parenthesized, so the C output never
//! depends on C's own precedence table. Equality goes through `__RT_EQ`
//! (string contents are compared, not addresses); comparisons and logical
//! operators are cast to `bool` so they print as `true`/`false`.

use crate::codegen::engine::Generator;
use crate::codegen::errors::CodegenError;
use crate::parser::ast::*;

/// Escape a decoded literal for a C string or char literal.
pub(crate) fn escape_c(text: &str, quote: char) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 => out.push_str(&format!("\\{:03o}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

impl Generator<'_> {
    pub(crate) fn emit_expression(&mut self, id: NodeId) -> Result<String, CodegenError> {
        let ast = self.ast;
        let node = ast.node(id);

        match node.kind {
            NodeKind::Identifier => Ok(node.content.clone()),
            NodeKind::Literal(LiteralKind::Number) if self.real_literals => {
                Ok(emit_literal(LiteralKind::Float, &node.content))
            }
            NodeKind::Literal(kind) => Ok(emit_literal(kind, &node.content)),
            NodeKind::Operator => self.emit_operator(id),
            NodeKind::FunctionCall => self.emit_call(id),
            _ => self.emit(id),
        }
    }

    fn emit_operator(&mut self, id: NodeId) -> Result<String, CodegenError> {
        let ast = self.ast;
        let op = ast.content(id);

        match ast.children(id) {
            &[operand] => {
                let operand = self.emit_expression(operand)?;
                Ok(match op {
                    "deref" => format!("(*{})", operand),
                    "!" => format!("((bool)!{})", operand),
                    _ => format!("({}{})", op, operand),
                })
            }
            &[lhs, rhs] => {
                let lhs = self.emit_expression(lhs)?;
                let rhs = self.emit_expression(rhs)?;
                Ok(match op {
                    "==" => format!("__RT_EQ({}, {})", lhs, rhs),
                    "!=" => format!("(!__RT_EQ({}, {}))", lhs, rhs),
                    "<" | "<=" | ">" | ">=" | "&&" | "||" => {
                        format!("((bool)({} {} {}))", lhs, op, rhs)
                    }
                    _ => format!("({} {} {})", lhs, op, rhs),
                })
            }
            _ => Err(self.malformed(&format!("operator '{}'", op), id)),
        }
    }

    /// Arguments keep their own literal kinds, whatever the call feeds into.
    fn emit_call(&mut self, id: NodeId) -> Result<String, CodegenError> {
        let outer = std::mem::replace(&mut self.real_literals, false);
        let call = self.emit_call_inner(id);
        self.real_literals = outer;
        call
    }

    fn emit_call_inner(&mut self, id: NodeId) -> Result<String, CodegenError> {
        let ast = self.ast;
        let name = ast.content(id);

        if let Some(intrinsic) = self.emit_intrinsic(id)? {
            return Ok(intrinsic);
        }

        let mut args = Vec::new();
        for &arg in ast.children(id) {
            args.push(self.emit_expression(arg)?);
        }
        Ok(format!("{}({})", name, args.join(", ")))
    }

    /// Emit a value stored into an `rnum`: bare integer literals become
    /// `double` so `1 / 2` divides as reals.
    pub(crate) fn emit_real_value(&mut self, id: NodeId) -> Result<String, CodegenError> {
        let outer = std::mem::replace(&mut self.real_literals, true);
        let value = self.emit_expression(id);
        self.real_literals = outer;
        value
    }
}

fn emit_literal(kind: LiteralKind, content: &str) -> String {
    match kind {
        LiteralKind::Number => content.to_string(),
        LiteralKind::Float => {
            if content.contains('.') {
                content.to_string()
            } else {
                format!("{}.0", content)
            }
        }
        LiteralKind::String => format!("\"{}\"", escape_c(content, '"')),
        LiteralKind::Char => format!("((char)'{}')", escape_c(content, '\'')),
        LiteralKind::Boolean => format!("((bool){})", content),
    }
}
