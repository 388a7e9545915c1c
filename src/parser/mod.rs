//! Cinder source parser
//!
//! This module transforms Cinder source text into an arena-backed syntax tree:
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parse`]: Parser struct, helpers and the program entry point
//! - [`statements`]: Statement parsing (control flow, assignments, markers)
//! - [`expressions`]: Shunting-yard expression parsing
//! - [`ast`]: AST node definitions and the node arena
//!
//! # Language
//!
//! - Types: `num`, `rnum`, `bool`, `str`, `ptr T`, `array<T>` (or `T[]`)
//! - Statements: declarations, assignments, `if`/`elseif`/`else`, `while`,
//!   `loop`, `for ... in`, `match`, `break`, `continue`, `return`
//! - Expressions: arithmetic, comparison, logical, `&`/`deref`, calls
//! - `import "file.cn";` splices another file's functions into the program
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent for statements, shunting-yard for
//! expressions. No external parser generator dependencies.

pub mod ast;
mod declarations;
pub mod expressions;
pub mod lexer;
pub mod parse;
pub mod statements;
