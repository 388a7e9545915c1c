//! Loop emission (`while`, `loop`, `for`).
//!
//! Every loop form becomes a C `for` driven by its own `__loop_<n>` counter,
//! numbered in emission order across the whole program so nested loops never
//! share a counter. `break` and `continue` map directly onto the C loop.

use crate::codegen::engine::Generator;
use crate::codegen::errors::CodegenError;
use crate::codegen::type_system::element_suffix;
use crate::parser::ast::*;

impl Generator<'_> {
    /// `while cond { }`
    pub(crate) fn emit_while(&mut self, id: NodeId) -> Result<String, CodegenError> {
        let ast = self.ast;
        let Some((&condition, body)) = ast.children(id).split_first() else {
            return Err(self.malformed("while", id));
        };

        let counter = self.next_loop_counter();
        let condition = self.emit_expression(condition)?;
        let head = format!(
            "{}for (int64_t {c} = 0; ({}); {c}++) ",
            self.pad(),
            condition,
            c = counter
        );
        Ok(head + &self.emit_body(body)?)
    }

    /// `loop { }`
    pub(crate) fn emit_loop(&mut self, id: NodeId) -> Result<String, CodegenError> {
        let ast = self.ast;
        let counter = self.next_loop_counter();
        let head = format!("{}for (int64_t {c} = 0; ; {c}++) ", self.pad(), c = counter);
        Ok(head + &self.emit_body(ast.children(id))?)
    }

    /// `for x in xs { }` and `for i in a..b[, step] { }`
    pub(crate) fn emit_for(&mut self, id: NodeId) -> Result<String, CodegenError> {
        let ast = self.ast;
        let children = ast.children(id);
        let body_start = children
            .iter()
            .position(|&c| ast.kind(c) == NodeKind::BodyStart)
            .unwrap_or(children.len());
        let (header, body) = children.split_at(body_start);

        match (ast.content(id), header) {
            ("each", &[var, array]) => self.emit_for_each(id, var, array, body),
            ("range", &[var, start, end]) => self.emit_for_range(var, start, end, None, body),
            ("range", &[var, start, end, comma, step])
                if ast.kind(comma) == NodeKind::Comma =>
            {
                self.emit_for_range(var, start, end, Some(step), body)
            }
            _ => Err(self.malformed("for loop", id)),
        }
    }

    fn emit_for_each(
        &mut self,
        id: NodeId,
        var: NodeId,
        array: NodeId,
        body: &[NodeId],
    ) -> Result<String, CodegenError> {
        let ast = self.ast;
        let element = self.array_element(id, array)?;
        let array = ast.content(array);

        let counter = self.next_loop_counter();
        let head = format!(
            "{}for (int64_t {c} = 0; {c} < __rt_array_size({a}); {c}++) ",
            self.pad(),
            c = counter,
            a = array
        );
        let value = format!(
            "__rt_array_get_{}({}, {})",
            element_suffix(element),
            array,
            counter
        );

        let binding = (ast.content(var), Type::Scalar(element), value);
        Ok(head + &self.emit_body_with_binding(body, Some(binding))?)
    }

    fn emit_for_range(
        &mut self,
        var: NodeId,
        start: NodeId,
        end: NodeId,
        step: Option<NodeId>,
        body: &[NodeId],
    ) -> Result<String, CodegenError> {
        let ast = self.ast;
        let counter = self.next_loop_counter();
        let start = self.emit_expression(start)?;
        let end = self.emit_expression(end)?;
        let step = match step {
            Some(step) => self.emit_expression(step)?,
            None => "1".to_string(),
        };

        let head = format!(
            "{}for (int64_t {c} = ({}); {c} < ({}); {c} += ({})) ",
            self.pad(),
            start,
            end,
            step,
            c = counter
        );

        let binding = (ast.content(var), Type::Scalar(Scalar::Num), counter);
        Ok(head + &self.emit_body_with_binding(body, Some(binding))?)
    }
}
