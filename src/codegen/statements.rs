//! Statement emission: declarations, assignments, conditionals, `match`,
//! `return` and increments.

use crate::codegen::constants::RETURN_TEMP_PREFIX;
use crate::codegen::engine::Generator;
use crate::codegen::errors::CodegenError;
use crate::codegen::type_system::element_suffix;
use crate::parser::ast::*;
use log::warn;

impl Generator<'_> {
    pub(crate) fn emit_declaration(&mut self, id: NodeId, ty: Type) -> Result<String, CodegenError> {
        let ast = self.ast;
        let name = ast.content(id);
        let children = ast.children(id);
        let pad = self.pad();
        let declarator = self.c_declarator(ty, name);

        let out = match (ty, children) {
            (_, []) => format!("{}{} = {};\n", pad, declarator, self.zero_value(ty)),
            (Type::Array(element), [marker, elements @ ..])
                if ast.kind(*marker) == NodeKind::Delimiter =>
            {
                let suffix = element_suffix(element);
                let mut out = format!("{}{} = __rt_array_create_{}();\n", pad, declarator, suffix);
                for &item in elements {
                    let value = self.emit_expression(item)?;
                    out.push_str(&format!(
                        "{}__rt_array_push_{}({}, {});\n",
                        pad, suffix, name, value
                    ));
                }
                out
            }
            (_, [value]) => {
                let value = self.emit_expression(*value)?;
                format!("{}{} = {};\n", pad, declarator, value)
            }
            _ => return Err(self.malformed("declaration", id)),
        };

        self.declare(name, ty);
        Ok(out)
    }

    pub(crate) fn emit_assignment(&mut self, id: NodeId) -> Result<String, CodegenError> {
        let ast = self.ast;
        let &[target, value] = ast.children(id) else {
            return Err(self.malformed("assignment", id));
        };

        let real_target = self.stores_real(target);
        let target = self.emit_expression(target)?;
        let value = if real_target {
            self.emit_real_value(value)?
        } else {
            self.emit_expression(value)?
        };
        Ok(format!("{}{} {} {};\n", self.pad(), target, ast.content(id), value))
    }

    /// Whether an assignment target is an `rnum` variable or `deref` of a
    /// `ptr rnum`.
    fn stores_real(&self, target: NodeId) -> bool {
        let ast = self.ast;
        match (ast.kind(target), ast.children(target)) {
            (NodeKind::Identifier, _) => {
                self.lookup(ast.content(target)) == Some(Type::Scalar(Scalar::Rnum))
            }
            (NodeKind::Operator, &[pointer])
                if ast.content(target) == "deref" && ast.kind(pointer) == NodeKind::Identifier =>
            {
                self.lookup(ast.content(pointer)) == Some(Type::Pointer(Scalar::Rnum))
            }
            _ => false,
        }
    }

    /// `if`/`else if` with a condition and a body
    pub(crate) fn emit_conditional(&mut self, id: NodeId, keyword: &str) -> Result<String, CodegenError> {
        let ast = self.ast;
        let Some((&condition, body)) = ast.children(id).split_first() else {
            return Err(self.malformed(keyword, id));
        };

        let condition = self.emit_expression(condition)?;
        let head = format!("{}{} ({}) ", self.pad(), keyword, condition);
        Ok(head + &self.emit_body(body)?)
    }

    /// Lower `match` to an `if`/`else if` chain on `__RT_EQ`. The default
    /// arm becomes the trailing `else` wherever it appears in the source.
    pub(crate) fn emit_match(&mut self, id: NodeId) -> Result<String, CodegenError> {
        let ast = self.ast;
        let Some((&scrutinee, arms)) = ast.children(id).split_first() else {
            return Err(self.malformed("match", id));
        };
        let scrutinee = self.emit_expression(scrutinee)?;

        let mut cases = Vec::new();
        let mut default = None;
        for &arm in arms {
            match ast.kind(arm) {
                NodeKind::Case => cases.push(arm),
                NodeKind::Default if default.is_none() => default = Some(arm),
                NodeKind::Default => {
                    warn!(
                        "ignoring second default arm at {}; only the first one is used",
                        ast.location(arm)
                    );
                }
                _ => return Err(self.malformed("match arm", arm)),
            }
        }

        let pad = self.pad();
        let mut out = String::new();
        for (index, &case) in cases.iter().enumerate() {
            let Some((&value, body)) = ast.children(case).split_first() else {
                return Err(self.malformed("case", case));
            };
            let keyword = if index == 0 { "if" } else { "else if" };
            let value = self.emit_expression(value)?;
            out.push_str(&format!(
                "{}{} (__RT_EQ(({}), ({}))) ",
                pad, keyword, scrutinee, value
            ));
            out.push_str(&self.emit_body(body)?);
        }

        match default {
            Some(arm) if cases.is_empty() => {
                out.push_str(&pad);
                out.push_str(&self.emit_body(ast.children(arm))?);
            }
            Some(arm) => {
                out.push_str(&format!("{}else ", pad));
                out.push_str(&self.emit_body(ast.children(arm))?);
            }
            None if cases.is_empty() => {
                out.push_str(&format!("{}(void)({});\n", pad, scrutinee));
            }
            None => {}
        }

        Ok(out)
    }

    /// `return`; inside `main` the scoped heap is released first and the
    /// value becomes the exit status.
    pub(crate) fn emit_return(&mut self, id: NodeId) -> Result<String, CodegenError> {
        let ast = self.ast;
        let pad = self.pad();
        let value = match ast.children(id) {
            [] => None,
            [value] if self.current_return == Type::Scalar(Scalar::Rnum) => {
                Some(self.emit_real_value(*value)?)
            }
            [value] => Some(self.emit_expression(*value)?),
            _ => return Err(self.malformed("return", id)),
        };

        if !self.in_main {
            return Ok(match value {
                Some(value) => format!("{}return {};\n", pad, value),
                None => format!("{}return;\n", pad),
            });
        }

        Ok(match value {
            Some(value) => {
                let temp = format!("{}{}", RETURN_TEMP_PREFIX, self.temp_counter);
                self.temp_counter += 1;
                format!(
                    "{pad}{{ int64_t {temp} = (int64_t)({value}); __rt_heap_release(); return (int){temp}; }}\n"
                )
            }
            None => format!("{pad}{{ __rt_heap_release(); return 0; }}\n"),
        })
    }

    /// `x++;`, `x--;`, `++x;`, `--x;`
    pub(crate) fn emit_increment(&mut self, id: NodeId) -> Result<String, CodegenError> {
        let ast = self.ast;
        let &[first, second] = ast.children(id) else {
            return Err(self.malformed("increment", id));
        };

        if !matches!(
            (ast.kind(first), ast.kind(second)),
            (NodeKind::Operator, NodeKind::Identifier) | (NodeKind::Identifier, NodeKind::Operator)
        ) {
            return Err(self.malformed("increment", id));
        }

        let text = format!("{}{}", ast.content(first), ast.content(second));
        Ok(format!("{}{};\n", self.pad(), text))
    }
}
