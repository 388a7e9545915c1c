//! Statement parsing implementation
//!
//! This module handles parsing of all Cinder statement types:
//!
//! - Variable declarations: `num x = 42;`
//! - Control flow: `if`, `elseif`, `else`, `while`, `loop`, `for`, `match`
//! - Jump statements: `return`, `break`, `continue`
//! - Simple statements: assignments, calls, `deref` stores, `++`/`--`
//! - Diagnostic markers: `__unsafe "text";`, `__breakpoint;`
//!
//! # Grammar
//!
//! ```text
//! statement ::= if | elseif | else | loop | while | for | match
//!             | break | continue | return | declaration | assignment
//!             | call | deref_assignment | incdec | unsafe | breakpoint
//! block     ::= "{" statement* "}"
//! ```
//!
//! Statements are appended directly to their owner node. Every block is
//! bracketed by `BodyStart`/`BodyEnd` markers inside the owner.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::{LiteralKind as TokenLiteral, TokenKind};
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse `{ statements }` into `owner`, wrapped in body markers
    pub(crate) fn parse_block(&mut self, owner: NodeId, ctx: &str) -> Result<(), ParseError> {
        let open = self.current_location();
        self.expect_lbrace(&format!("to open {}", ctx.trim_start_matches("after ")))?;
        self.ast.append_child(owner, NodeKind::BodyStart, "{", open);

        while !self.peek().is_delimiter("}") && !self.is_at_end() {
            self.parse_statement(owner)?;
        }

        let close = self.current_location();
        self.expect_rbrace(ctx)?;
        self.ast.append_child(owner, NodeKind::BodyEnd, "}", close);
        Ok(())
    }

    /// Parse a statement into `parent`
    pub(crate) fn parse_statement(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let token = self.peek().clone();

        if token.kind == TokenKind::Keyword {
            match token.lexeme.as_str() {
                "if" => return self.parse_conditional(parent, NodeKind::If, "'if'"),
                "elseif" => {
                    self.expect_preceding_if(parent)?;
                    return self.parse_conditional(parent, NodeKind::ElseIf, "'elseif'");
                }
                "else" => {
                    self.expect_preceding_if(parent)?;
                    self.advance();
                    let node = self.ast.append_child(parent, NodeKind::Else, "", token.location);
                    return self.parse_block(node, "after 'else' body");
                }
                "while" => return self.parse_conditional(parent, NodeKind::While, "'while'"),
                "loop" => {
                    self.advance();
                    let node = self.ast.append_child(parent, NodeKind::Loop, "", token.location);
                    return self.parse_block(node, "after 'loop' body");
                }
                "for" => return self.parse_for_statement(parent),
                "match" => return self.parse_match_statement(parent),
                "break" | "continue" => {
                    self.advance();
                    let kind = if token.lexeme == "break" {
                        NodeKind::Break
                    } else {
                        NodeKind::Continue
                    };
                    self.expect_semicolon(&format!("after '{}'", token.lexeme))?;
                    self.ast.append_child(parent, kind, "", token.location);
                    return Ok(());
                }
                "return" => return self.parse_return_statement(parent),
                "deref" => return self.parse_assignment(parent),
                "__unsafe" => return self.parse_unsafe(parent),
                "__breakpoint" => {
                    self.advance();
                    self.expect_semicolon("after '__breakpoint'")?;
                    self.ast
                        .append_child(parent, NodeKind::Breakpoint, "", token.location);
                    return Ok(());
                }
                "import" => {
                    return Err(self.error_here("'import' is only allowed at top level"));
                }
                _ if self.is_type_keyword() => return self.parse_variable_declaration(parent),
                _ => {}
            }
        }

        if token.is_operator("++") || token.is_operator("--") {
            return self.parse_prefix_increment(parent);
        }

        if token.is_identifier() {
            let next = self.peek_ahead(1).cloned();
            match next {
                Some(next) if next.is_delimiter("(") => return self.parse_call_statement(parent),
                Some(next) if next.is_assignment_operator() => return self.parse_assignment(parent),
                Some(next) if next.is_operator("++") || next.is_operator("--") => {
                    return self.parse_postfix_increment(parent);
                }
                _ => {}
            }
        }

        Err(self.error_here(format!("Expected statement, found {}", token)))
    }

    /// `elseif`/`else` must follow an `if` or `elseif` in the same block.
    fn expect_preceding_if(&self, parent: NodeId) -> Result<(), ParseError> {
        let previous = self.ast.last_child(parent).map(|id| self.ast.kind(id));
        if matches!(previous, Some(NodeKind::If) | Some(NodeKind::ElseIf)) {
            Ok(())
        } else {
            Err(self.error_here(format!("'{}' without a preceding 'if'", self.peek().lexeme)))
        }
    }

    /// `keyword condition { body }` for if / elseif / while
    fn parse_conditional(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        keyword: &str,
    ) -> Result<(), ParseError> {
        let loc = self.advance().location;
        let node = self.ast.append_child(parent, kind, "", loc);

        let end = self.scan_until(&format!("'{{' after {} condition", keyword), |t| {
            t.is_delimiter("{")
        })?;
        self.parse_expression_into(self.position, end, node)?;
        self.position = end;

        self.parse_block(node, &format!("after {} body", keyword))
    }

    /// Parse a for loop: array iteration, range, or stepped range
    ///
    /// ```text
    /// for x in xs { }
    /// for i in 0..n { }
    /// for i in 0..n, 2 { }
    /// ```
    fn parse_for_statement(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let loc = self.advance().location;
        let var = self.expect_identifier()?;
        if !self.match_keyword("in") {
            return Err(self.error_here(format!("Expected 'in' after loop variable, found {}", self.peek())));
        }

        let node = self.ast.append_child(parent, NodeKind::For, "", loc);
        self.ast
            .append_child(node, NodeKind::Identifier, var.lexeme, var.location);

        let header_end = self.scan_until("'{' after for header", |t| t.is_delimiter("{"))?;
        let range = self.find_in_window(self.position, header_end, |t| t.is_operator(".."));

        match range {
            Some(dots) => {
                self.ast.node_mut(node).content = "range".to_string();
                self.parse_expression_into(self.position, dots, node)?;

                let step = self.find_in_window(dots + 1, header_end, |t| t.is_delimiter(","));
                let range_end = step.unwrap_or(header_end);
                self.parse_expression_into(dots + 1, range_end, node)?;

                if let Some(comma) = step {
                    let comma_loc = self.tokens[comma].location;
                    self.ast.append_child(node, NodeKind::Comma, ",", comma_loc);
                    self.parse_expression_into(comma + 1, header_end, node)?;
                }
            }
            None => {
                let iterable = &self.tokens[self.position..header_end];
                match iterable {
                    [array] if array.is_identifier() => {
                        let (name, location) = (array.lexeme.clone(), array.location);
                        self.ast.node_mut(node).content = "each".to_string();
                        self.ast.append_child(node, NodeKind::Identifier, name, location);
                    }
                    [] => return Err(self.error_here("Expected iterable after 'in'")),
                    [first, ..] => {
                        return Err(ParseError::at(
                            first,
                            "for-loop over an arbitrary expression is not implemented",
                        ));
                    }
                }
            }
        }

        self.position = header_end;
        self.parse_block(node, "after 'for' body")
    }

    /// Parse `match scrutinee { case v { } ... default { } }`
    fn parse_match_statement(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let loc = self.advance().location;
        let node = self.ast.append_child(parent, NodeKind::Match, "", loc);

        let end = self.scan_until("'{' after match expression", |t| t.is_delimiter("{"))?;
        self.parse_expression_into(self.position, end, node)?;
        self.position = end;
        self.expect_lbrace("to open match body")?;

        loop {
            let token = self.peek().clone();
            if self.match_delimiter("}") {
                break;
            }

            if self.match_keyword("case") {
                let case = self.ast.append_child(node, NodeKind::Case, "", token.location);
                let end = self.scan_until("'{' after case value", |t| t.is_delimiter("{"))?;
                if let Some(dots) = self.find_in_window(self.position, end, |t| t.is_operator("..")) {
                    return Err(ParseError::at(
                        &self.tokens[dots],
                        "range case patterns are not implemented",
                    ));
                }
                self.parse_expression_into(self.position, end, case)?;
                self.position = end;
                self.parse_block(case, "after 'case' body")?;
            } else if self.match_keyword("default") {
                let default = self.ast.append_child(node, NodeKind::Default, "", token.location);
                self.parse_block(default, "after 'default' body")?;
            } else {
                return Err(self.error_here(format!(
                    "Expected 'case', 'default' or '}}' in match, found {}",
                    token
                )));
            }
        }

        Ok(())
    }

    /// Parse return statement
    fn parse_return_statement(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let loc = self.advance().location;
        let node = self.ast.append_child(parent, NodeKind::Return, "", loc);

        let end = self.scan_until("';' after return", |t| t.is_delimiter(";"))?;
        if end > self.position {
            self.parse_expression_into(self.position, end, node)?;
            self.position = end;
        }

        self.expect_semicolon("after return")
    }

    /// `target op value;` where target is an identifier or a `deref` expression
    fn parse_assignment(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let loc = self.current_location();
        let end = self.scan_until("';' after assignment", |t| t.is_delimiter(";"))?;
        let Some(op_index) = self.find_in_window(self.position, end, |t| t.is_assignment_operator()) else {
            return Err(self.error_here(format!("Expected assignment, found {}", self.peek())));
        };

        let op = self.tokens[op_index].lexeme.clone();
        let node = self.ast.append_child(parent, NodeKind::Assignment, op, loc);
        self.parse_expression_into(self.position, op_index, node)?;
        self.parse_expression_into(op_index + 1, end, node)?;

        self.position = end;
        self.expect_semicolon("after assignment")
    }

    /// Call used as a statement; the call node is appended to `parent`
    fn parse_call_statement(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let end = self.scan_until("';' after call", |t| t.is_delimiter(";"))?;
        let root = self.parse_expression_into(self.position, end, parent)?;
        if self.ast.kind(root) != NodeKind::FunctionCall {
            return Err(self.error_here("Expected a call statement"));
        }
        self.position = end;
        self.expect_semicolon("after call")
    }

    /// `++x;` / `--x;`
    fn parse_prefix_increment(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let op = self.advance().clone();
        let target = self.expect_identifier()?;
        self.expect_semicolon(&format!("after '{}'", op.lexeme))?;

        let node = self
            .ast
            .append_child(parent, NodeKind::PostfixOrPrefix, op.lexeme.clone(), op.location);
        self.ast
            .append_child(node, NodeKind::Operator, op.lexeme, op.location);
        self.ast
            .append_child(node, NodeKind::Identifier, target.lexeme, target.location);
        Ok(())
    }

    /// `x++;` / `x--;`
    fn parse_postfix_increment(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let target = self.advance().clone();
        let op = self.advance().clone();
        self.expect_semicolon(&format!("after '{}'", op.lexeme))?;

        let node = self
            .ast
            .append_child(parent, NodeKind::PostfixOrPrefix, op.lexeme.clone(), target.location);
        self.ast
            .append_child(node, NodeKind::Identifier, target.lexeme, target.location);
        self.ast
            .append_child(node, NodeKind::Operator, op.lexeme, op.location);
        Ok(())
    }

    /// `__unsafe "raw target text";`
    fn parse_unsafe(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let loc = self.advance().location;
        let text = self.peek().clone();
        if text.kind != TokenKind::Literal(TokenLiteral::String) {
            return Err(self.error_here(format!(
                "Expected string after '__unsafe', found {}",
                text
            )));
        }
        self.advance();
        self.expect_semicolon("after '__unsafe' block")?;
        self.ast.append_child(parent, NodeKind::Unsafe, text.lexeme, loc);
        Ok(())
    }
}
