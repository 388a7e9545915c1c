//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including error types, helper methods, and the main parse entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `declarations`: functions, imports, types and variable declarations
//! - `statements`: control flow and simple statements
//! - `expressions`: shunting-yard expression parsing over token windows
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.
//!
//! All nodes, including those of imported files, are allocated in one
//! [`Ast`] arena owned by the parser until [`Parser::parse_program`] hands it
//! out.

use crate::parser::ast::*;
use crate::parser::lexer::{Lexer, Token, TokenKind};
use rustc_hash::FxHashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Parser error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub lexeme: String,
    pub location: SourceLocation,
    pub kind: TokenKind,
}

impl ParseError {
    /// Error anchored at `token`.
    pub fn at(token: &Token, message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
            lexeme: token.lexeme.clone(),
            location: token.location,
            kind: token.kind,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parse error at line {}, column {}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

/// Where the file being parsed lives and which files are mid-import.
#[derive(Debug, Clone, Default)]
pub(crate) struct ImportContext {
    pub(crate) base_dir: PathBuf,
    pub(crate) importing: FxHashSet<PathBuf>,
}

/// Recursive descent parser for Cinder
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    pub(crate) ast: Ast,
    pub(crate) imports: ImportContext,
}

impl Parser {
    /// Parser for in-memory source; imports resolve against the current
    /// directory.
    pub fn new(source: &str) -> Self {
        Self::from_tokens(Lexer::new(source).analyze(), ImportContext::default())
    }

    /// Parser for the file at `path` (already read into `source`); imports
    /// resolve against the file's directory and the file itself counts as
    /// being imported.
    pub fn with_path(source: &str, path: &Path) -> Self {
        let mut imports = ImportContext {
            base_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            importing: FxHashSet::default(),
        };
        if let Ok(canonical) = path.canonicalize() {
            imports.importing.insert(canonical);
        }
        Self::from_tokens(Lexer::new(source).analyze(), imports)
    }

    pub(crate) fn from_tokens(tokens: Vec<Token>, imports: ImportContext) -> Self {
        Self {
            tokens,
            position: 0,
            ast: Ast::new(),
            imports,
        }
    }

    /// Token stream of the main file
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Parse the entire program (imports and functions)
    pub fn parse_program(&mut self) -> Result<Ast, ParseError> {
        self.parse_top_level_items()?;
        Ok(std::mem::take(&mut self.ast))
    }

    pub(crate) fn parse_top_level_items(&mut self) -> Result<(), ParseError> {
        while !self.is_at_end() {
            self.parse_top_level_declaration()?;
        }
        Ok(())
    }

    // ===== Helper methods =====

    pub(crate) fn is_type_keyword(&self) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Keyword
            && matches!(
                token.lexeme.as_str(),
                "num" | "rnum" | "bool" | "str" | "ptr" | "array"
            )
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.peek().is_eof()
    }

    pub(crate) fn peek(&self) -> &Token {
        // the stream always ends with EOF, so clamp to it
        let last = self.tokens.len() - 1;
        &self.tokens[self.position.min(last)]
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location
    }

    pub(crate) fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::at(self.peek(), message)
    }

    pub(crate) fn match_keyword(&mut self, word: &str) -> bool {
        if self.peek().is_keyword(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn match_delimiter(&mut self, delim: &str) -> bool {
        if self.peek().is_delimiter(delim) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn match_operator(&mut self, op: &str) -> bool {
        if self.peek().is_operator(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_delimiter(&mut self, delim: &str, ctx: &str) -> Result<(), ParseError> {
        if self.match_delimiter(delim) {
            Ok(())
        } else {
            Err(self.error_here(format!("Expected '{}' {}, found {}", delim, ctx, self.peek())))
        }
    }

    pub(crate) fn expect_operator(&mut self, op: &str, ctx: &str) -> Result<(), ParseError> {
        if self.match_operator(op) {
            Ok(())
        } else {
            Err(self.error_here(format!("Expected '{}' {}, found {}", op, ctx, self.peek())))
        }
    }

    pub(crate) fn expect_lbrace(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_delimiter("{", ctx)
    }

    pub(crate) fn expect_rbrace(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_delimiter("}", ctx)
    }

    pub(crate) fn expect_semicolon(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_delimiter(";", ctx)
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<Token, ParseError> {
        if self.peek().is_identifier() {
            Ok(self.advance().clone())
        } else {
            Err(self.error_here(format!("Expected identifier, found {}", self.peek())))
        }
    }

    /// Index of the first token from the current position, at bracket depth
    /// zero, for which `stop` holds. Reaching EOF first is an error reported
    /// at the EOF token.
    pub(crate) fn scan_until(
        &self,
        what: &str,
        stop: impl Fn(&Token) -> bool,
    ) -> Result<usize, ParseError> {
        let mut depth = 0usize;
        for (index, token) in self.tokens.iter().enumerate().skip(self.position) {
            if token.is_eof() {
                return Err(ParseError::at(
                    token,
                    format!("Expected {}, found end of file", what),
                ));
            }
            if depth == 0 && stop(token) {
                return Ok(index);
            }
            if token.is_delimiter("(") || token.is_delimiter("[") {
                depth += 1;
            } else if (token.is_delimiter(")") || token.is_delimiter("]")) && depth > 0 {
                depth -= 1;
            }
        }
        // analyze() always terminates the stream with EOF
        Err(self.error_here(format!("Expected {}", what)))
    }

    /// Like [`Parser::scan_until`] but limited to `[from, to)`; `None` when no
    /// token in the range matches.
    pub(crate) fn find_in_window(
        &self,
        from: usize,
        to: usize,
        stop: impl Fn(&Token) -> bool,
    ) -> Option<usize> {
        let mut depth = 0usize;
        for index in from..to {
            let token = &self.tokens[index];
            if depth == 0 && stop(token) {
                return Some(index);
            }
            if token.is_delimiter("(") || token.is_delimiter("[") {
                depth += 1;
            } else if (token.is_delimiter(")") || token.is_delimiter("]")) && depth > 0 {
                depth -= 1;
            }
        }
        None
    }
}
