//! Lexer (tokenizer) for Cinder source code
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser.
//! The lexer is total: it never fails. Characters it cannot classify become
//! [`TokenKind::Unknown`] tokens and are left for the parser to reject, and
//! every stream produced by [`Lexer::analyze`] ends with exactly one
//! [`TokenKind::Eof`].

use super::ast::SourceLocation;
use std::fmt;

/// Reserved words. Anything else matching the identifier grammar is an
/// identifier.
pub const KEYWORDS: &[&str] = &[
    "fn",
    "if",
    "else",
    "elseif",
    "loop",
    "while",
    "for",
    "in",
    "match",
    "case",
    "default",
    "break",
    "continue",
    "return",
    "import",
    "deref",
    "__unsafe",
    "__breakpoint",
    "array",
    "num",
    "rnum",
    "bool",
    "str",
    "ptr",
    "void",
    "true",
    "false",
];

const DELIMITERS: &[char] = &['(', ')', '{', '}', '[', ']', ';', ',', ':'];

const TWO_CHAR_OPERATORS: &[&str] = &[
    "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=",
    "%=", "->", "..",
];

const ONE_CHAR_OPERATORS: &[char] = &['+', '-', '*', '/', '%', '<', '>', '=', '!', '&'];

/// Literal sub-kinds distinguished at lex time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Number,
    String,
    Char,
}

/// Closed set of token categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Literal(LiteralKind),
    Operator,
    Delimiter,
    Keyword,
    Identifier,
    Comment,
    Whitespace,
    Eof,
    Unknown,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Literal(LiteralKind::Number) => write!(f, "number literal"),
            TokenKind::Literal(LiteralKind::String) => write!(f, "string literal"),
            TokenKind::Literal(LiteralKind::Char) => write!(f, "char literal"),
            TokenKind::Operator => write!(f, "operator"),
            TokenKind::Delimiter => write!(f, "delimiter"),
            TokenKind::Keyword => write!(f, "keyword"),
            TokenKind::Identifier => write!(f, "identifier"),
            TokenKind::Comment => write!(f, "comment"),
            TokenKind::Whitespace => write!(f, "whitespace"),
            TokenKind::Eof => write!(f, "end of file"),
            TokenKind::Unknown => write!(f, "unknown token"),
        }
    }
}

/// A single lexeme with its category and where it starts.
///
/// For string and char literals `lexeme` holds the decoded value, without
/// quotes and with escapes resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            location,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Keyword && self.lexeme == word
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.lexeme == op
    }

    pub fn is_delimiter(&self, delim: &str) -> bool {
        self.kind == TokenKind::Delimiter && self.lexeme == delim
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    /// `=` and the compound assignment operators.
    pub fn is_assignment_operator(&self) -> bool {
        self.kind == TokenKind::Operator
            && matches!(self.lexeme.as_str(), "=" | "+=" | "-=" | "*=" | "/=" | "%=")
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of file"),
            TokenKind::Literal(LiteralKind::String) => {
                write!(f, "string literal \"{}\"", self.lexeme.escape_default())
            }
            TokenKind::Literal(LiteralKind::Char) => {
                write!(f, "char literal '{}'", self.lexeme.escape_default())
            }
            kind => write!(f, "{} '{}'", kind, self.lexeme),
        }
    }
}

/// Lexer for Cinder source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire input, dropping whitespace and comments.
    pub fn analyze(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            match token.kind {
                TokenKind::Whitespace | TokenKind::Comment => continue,
                TokenKind::Eof => {
                    tokens.push(token);
                    break;
                }
                _ => tokens.push(token),
            }
        }

        tokens
    }

    /// Produce the next token, including whitespace and comment tokens.
    /// Once the input is exhausted every call returns an EOF token.
    pub fn next_token(&mut self) -> Token {
        let loc = self.current_location();
        let Some(ch) = self.peek() else {
            return Token::new(TokenKind::Eof, "", loc);
        };

        if ch.is_whitespace() {
            return self.whitespace(loc);
        }

        if ch == '/' && self.peek_ahead(1) == Some('/') {
            return self.line_comment(loc);
        }

        if ch == '/' && self.peek_ahead(1) == Some('*') {
            return self.block_comment(loc);
        }

        match ch {
            '"' => self.string_literal(loc),
            '\'' => self.char_literal(loc),
            '0'..='9' => self.number_literal(loc),
            c if DELIMITERS.contains(&c) => {
                self.advance();
                Token::new(TokenKind::Delimiter, c.to_string(), loc)
            }
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier_or_keyword(loc),
            _ => self.operator_or_unknown(loc),
        }
    }

    fn whitespace(&mut self, loc: SourceLocation) -> Token {
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if !ch.is_whitespace() {
                break;
            }
            text.push(ch);
            self.advance();
        }
        Token::new(TokenKind::Whitespace, text, loc)
    }

    /// `// ...` up to, not including, the newline
    fn line_comment(&mut self, loc: SourceLocation) -> Token {
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            text.push(ch);
            self.advance();
        }
        Token::new(TokenKind::Comment, text, loc)
    }

    /// `/* ... */`; an unterminated comment swallows the rest of the input.
    fn block_comment(&mut self, loc: SourceLocation) -> Token {
        let mut text = String::new();
        // '/' and '*'
        for _ in 0..2 {
            if let Some(ch) = self.advance() {
                text.push(ch);
            }
        }

        while let Some(ch) = self.advance() {
            text.push(ch);
            if ch == '*' && self.peek() == Some('/') {
                self.advance();
                text.push('/');
                break;
            }
        }

        Token::new(TokenKind::Comment, text, loc)
    }

    /// Decode one escape sequence after a backslash. Unrecognized escapes
    /// keep the escaped character as-is.
    fn escape(escaped: char) -> char {
        match escaped {
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            '0' => '\0',
            other => other,
        }
    }

    fn string_literal(&mut self, loc: SourceLocation) -> Token {
        self.advance(); // opening quote
        let mut value = String::new();
        let mut raw = String::from('"');

        while let Some(ch) = self.advance() {
            raw.push(ch);
            match ch {
                '"' => return Token::new(TokenKind::Literal(LiteralKind::String), value, loc),
                '\\' => match self.advance() {
                    Some(escaped) => {
                        raw.push(escaped);
                        value.push(Self::escape(escaped));
                    }
                    None => break,
                },
                _ => value.push(ch),
            }
        }

        Token::new(TokenKind::Unknown, raw, loc)
    }

    fn char_literal(&mut self, loc: SourceLocation) -> Token {
        self.advance(); // opening quote
        let mut raw = String::from('\'');

        let value = match self.advance() {
            Some('\\') => {
                raw.push('\\');
                match self.advance() {
                    Some(escaped) => {
                        raw.push(escaped);
                        Some(Self::escape(escaped))
                    }
                    None => None,
                }
            }
            Some('\'') | Some('\n') | None => None,
            Some(ch) => {
                raw.push(ch);
                Some(ch)
            }
        };

        match (value, self.peek()) {
            (Some(ch), Some('\'')) => {
                self.advance();
                Token::new(TokenKind::Literal(LiteralKind::Char), ch.to_string(), loc)
            }
            _ => Token::new(TokenKind::Unknown, raw, loc),
        }
    }

    /// Integer literals only: a run of ASCII decimal digits.
    fn number_literal(&mut self, loc: SourceLocation) -> Token {
        let mut digits = String::new();
        while let Some(ch) = self.peek() {
            if !ch.is_ascii_digit() {
                break;
            }
            digits.push(ch);
            self.advance();
        }
        Token::new(TokenKind::Literal(LiteralKind::Number), digits, loc)
    }

    fn identifier_or_keyword(&mut self, loc: SourceLocation) -> Token {
        let mut ident = String::new();
        while let Some(ch) = self.peek() {
            if !(ch.is_ascii_alphanumeric() || ch == '_') {
                break;
            }
            ident.push(ch);
            self.advance();
        }

        let kind = if KEYWORDS.contains(&ident.as_str()) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        Token::new(kind, ident, loc)
    }

    /// Two-character operators are tried before one-character ones.
    fn operator_or_unknown(&mut self, loc: SourceLocation) -> Token {
        if let (Some(first), Some(second)) = (self.peek(), self.peek_ahead(1)) {
            let pair: String = [first, second].iter().collect();
            if TWO_CHAR_OPERATORS.contains(&pair.as_str()) {
                self.advance();
                self.advance();
                return Token::new(TokenKind::Operator, pair, loc);
            }
        }

        let ch = match self.advance() {
            Some(ch) => ch,
            None => return Token::new(TokenKind::Eof, "", loc),
        };

        if ONE_CHAR_OPERATORS.contains(&ch) {
            Token::new(TokenKind::Operator, ch.to_string(), loc)
        } else {
            Token::new(TokenKind::Unknown, ch.to_string(), loc)
        }
    }

    /// Peek at current character without consuming
    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek ahead n characters
    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    /// Get current source location
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

/// Lex `source` into a filtered token stream.
pub fn analyze(source: &str) -> Vec<Token> {
    Lexer::new(source).analyze()
}
