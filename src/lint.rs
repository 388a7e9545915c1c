//! Token-stream linter
//!
//! A shallow pass over the lexed tokens that runs before parsing and catches
//! declarations missing their name, e.g. `num = 3;` or `fn (x) {}`. Each
//! finding is one formatted line; an empty result means the stream is clean.

use crate::parser::ast::Scalar;
use crate::parser::lexer::{Token, TokenKind};

fn is_scalar_keyword(token: &Token) -> bool {
    token.kind == TokenKind::Keyword && Scalar::from_keyword(&token.lexeme).is_some()
}

/// Tokens that may follow a scalar type keyword: a name, `[]`, the `>` of
/// `array<T>`, or the `{` after a return type.
fn may_follow_scalar(token: &Token) -> bool {
    token.is_identifier()
        || token.is_delimiter("[")
        || token.is_delimiter("{")
        || token.is_operator(">")
}

fn diagnostic(token: &Token, message: String) -> String {
    format!(
        "Lint error at line {}, column {}: {}",
        token.location.line, token.location.column, message
    )
}

/// Lint a token stream as produced by [`analyze`](crate::parser::lexer::analyze).
pub fn lint(tokens: &[Token]) -> Vec<String> {
    let mut diagnostics = Vec::new();

    for pair in tokens.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);

        if current.is_keyword("fn") && !next.is_identifier() {
            diagnostics.push(diagnostic(
                next,
                format!("expected function name after 'fn', found {}", next),
            ));
        } else if current.is_keyword("ptr") && !is_scalar_keyword(next) {
            diagnostics.push(diagnostic(
                next,
                format!("expected scalar type after 'ptr', found {}", next),
            ));
        } else if is_scalar_keyword(current) && !may_follow_scalar(next) {
            diagnostics.push(diagnostic(
                next,
                format!("expected identifier after '{}', found {}", current.lexeme, next),
            ));
        }
    }

    diagnostics
}
