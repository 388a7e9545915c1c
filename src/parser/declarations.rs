//! Declaration parsing implementation
//!
//! This module handles parsing of declarations in Cinder programs:
//!
//! - Imports: `import "path";`
//! - Function definitions: `fn name(params) [->] type { ... }`
//! - Type parsing: scalars, `ptr` scalars, `array<T>` and legacy `T[]`
//! - Variable declarations with expression or bracket-list initializers
//!
//! # Grammar
//!
//! ```text
//! program     ::= { import | function }
//! import      ::= "import" string ";"
//! function    ::= "fn" identifier "(" params ")" ["->"] rettype block
//! type        ::= scalar | scalar "[" "]" | "ptr" scalar | "array" "<" scalar ">"
//! declaration ::= type identifier [ "=" ( expr | "[" exprs "]" ) ] ";"
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::{self, Lexer, Token, TokenKind};
use crate::parser::parse::{ImportContext, ParseError, Parser};
use log::debug;
use std::fs;

impl Parser {
    /// Parse a top-level item (import or function definition)
    pub(crate) fn parse_top_level_declaration(&mut self) -> Result<(), ParseError> {
        if self.match_keyword("import") {
            return self.parse_import();
        }

        if self.match_keyword("fn") {
            return self.parse_function_definition();
        }

        Err(self.error_here(format!(
            "Expected 'fn' or 'import' at top level, found {}",
            self.peek()
        )))
    }

    /// Parse `import "path";` and splice the imported file's functions into
    /// the root of this program.
    pub(crate) fn parse_import(&mut self) -> Result<(), ParseError> {
        let path_token = self.peek().clone();
        if path_token.kind != TokenKind::Literal(lexer::LiteralKind::String) {
            return Err(self.error_here(format!(
                "Expected import path string, found {}",
                path_token
            )));
        }
        self.advance();
        self.expect_semicolon("after import")?;

        let path = self.imports.base_dir.join(&path_token.lexeme);
        let canonical = path.canonicalize().map_err(|err| {
            ParseError::at(
                &path_token,
                format!("Cannot read import '{}': {}", path.display(), err),
            )
        })?;

        if self.imports.importing.contains(&canonical) {
            return Err(ParseError::at(
                &path_token,
                format!("Recursive import of '{}'", path_token.lexeme),
            ));
        }

        let source = fs::read_to_string(&canonical).map_err(|err| {
            ParseError::at(
                &path_token,
                format!("Cannot read import '{}': {}", path.display(), err),
            )
        })?;
        let tokens = Lexer::new(&source).analyze();
        debug!(
            "importing {} ({} tokens)",
            canonical.display(),
            tokens.len()
        );

        let mut importing = self.imports.importing.clone();
        importing.insert(canonical.clone());
        let context = ImportContext {
            base_dir: canonical
                .parent()
                .map(|dir| dir.to_path_buf())
                .unwrap_or_default(),
            importing,
        };

        // The nested parser borrows our arena so its functions land on our root.
        let mut nested = Parser::from_tokens(tokens, context);
        nested.ast = std::mem::take(&mut self.ast);
        let result = nested.parse_top_level_items();
        self.ast = std::mem::take(&mut nested.ast);
        result
    }

    /// Parse function definition: fn name(params) [->] type { body }
    pub(crate) fn parse_function_definition(&mut self) -> Result<(), ParseError> {
        let name = self.expect_identifier()?;

        self.expect_delimiter("(", "after function name")?;
        let params = self.parse_parameter_list()?;
        self.expect_delimiter(")", "after parameters")?;

        self.match_operator("->");
        let return_type = self.parse_return_type()?;

        let function = self.ast.append_child(
            Ast::ROOT,
            NodeKind::Function(return_type),
            name.lexeme.clone(),
            name.location,
        );
        for (param_type, param) in params {
            self.ast.append_child(
                function,
                NodeKind::Parameter(param_type),
                param.lexeme,
                param.location,
            );
        }

        self.parse_block(function, "after function body")
    }

    /// Parse parameter list: (type name, type name, ...) with an optional
    /// trailing comma
    fn parse_parameter_list(&mut self) -> Result<Vec<(Type, Token)>, ParseError> {
        let mut params = Vec::new();

        while !self.peek().is_delimiter(")") {
            let param_type = self.parse_type()?;
            let param_name = self.expect_identifier()?;
            params.push((param_type, param_name));

            if !self.match_delimiter(",") {
                break;
            }
        }

        Ok(params)
    }

    fn parse_return_type(&mut self) -> Result<Type, ParseError> {
        if self.match_keyword("void") {
            Ok(Type::Void)
        } else {
            self.parse_type()
        }
    }

    fn parse_scalar(&mut self) -> Result<Scalar, ParseError> {
        let token = self.peek();
        let scalar = if token.kind == TokenKind::Keyword {
            Scalar::from_keyword(&token.lexeme)
        } else {
            None
        };

        match scalar {
            Some(scalar) => {
                self.advance();
                Ok(scalar)
            }
            None => Err(self.error_here(format!("Expected type, found {}", self.peek()))),
        }
    }

    /// Parse type: scalar | scalar[] | ptr scalar | array<scalar>
    pub(crate) fn parse_type(&mut self) -> Result<Type, ParseError> {
        if self.match_keyword("ptr") {
            return Ok(Type::Pointer(self.parse_scalar()?));
        }

        if self.match_keyword("array") {
            self.expect_operator("<", "after 'array'")?;
            let element = self.parse_scalar()?;
            self.expect_operator(">", "after array element type")?;
            return Ok(Type::Array(element));
        }

        let scalar = self.parse_scalar()?;
        if self.peek().is_delimiter("[")
            && self.peek_ahead(1).is_some_and(|t| t.is_delimiter("]"))
        {
            self.advance();
            self.advance();
            return Ok(Type::Array(scalar));
        }

        Ok(Type::Scalar(scalar))
    }

    /// Parse a variable declaration into `parent`
    pub(crate) fn parse_variable_declaration(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let var_type = self.parse_type()?;
        let name = self.expect_identifier()?;
        let decl = self.ast.append_child(
            parent,
            NodeKind::Declaration(var_type),
            name.lexeme,
            name.location,
        );

        if self.match_operator("=") {
            if matches!(var_type, Type::Array(_)) && self.peek().is_delimiter("[") {
                self.parse_array_list(decl)?;
            } else {
                let end = self.scan_until("';' after declaration", |t| t.is_delimiter(";"))?;
                self.parse_expression_into(self.position, end, decl)?;
                self.position = end;
            }
        }

        self.expect_semicolon("after declaration")?;

        let element = match var_type {
            Type::Scalar(s) | Type::Array(s) => Some(s),
            _ => None,
        };
        if element == Some(Scalar::Rnum) {
            self.retag_float_literals(decl);
        }

        Ok(())
    }

    /// `[e1, e2, ...]` initializer: a `[` delimiter marker followed by one
    /// child per element
    fn parse_array_list(&mut self, decl: NodeId) -> Result<(), ParseError> {
        let open = self.advance().clone();
        self.ast
            .append_child(decl, NodeKind::Delimiter, "[", open.location);

        let close = self.scan_until("']' to close array literal", |t| t.is_delimiter("]"))?;

        while self.position < close {
            let end = self
                .find_in_window(self.position, close, |t| t.is_delimiter(","))
                .unwrap_or(close);
            if end == self.position {
                return Err(self.error_here("Expected array element"));
            }
            self.parse_expression_into(self.position, end, decl)?;
            self.position = end;
            if self.position < close {
                self.advance(); // ','
            }
        }

        self.position = close + 1;
        Ok(())
    }

    /// Integer literals initializing an `rnum` are emitted as floating point.
    /// Call arguments keep their own types.
    fn retag_float_literals(&mut self, decl: NodeId) {
        let mut pending = self.ast.children(decl).to_vec();
        while let Some(id) = pending.pop() {
            match self.ast.kind(id) {
                NodeKind::Literal(LiteralKind::Number) => {
                    self.ast.node_mut(id).kind = NodeKind::Literal(LiteralKind::Float);
                }
                NodeKind::FunctionCall => {}
                _ => pending.extend_from_slice(self.ast.children(id)),
            }
        }
    }
}
