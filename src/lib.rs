//! # Introduction
//!
//! Cinder is a small imperative language compiled to C. This crate holds the
//! whole front end and the C generator; the emitted translation unit is built
//! by the system C compiler.
//!
//! ## Compilation pipeline
//!
//! ```text
//! Source → Lexer → Linter → Parser → AST → Generator → C → cc
//! ```
//!
//! 1. [`parser`] tokenises the source and builds an arena AST, splicing in
//!    imported files.
//! 2. [`lint`] rejects declarations missing their name before parsing.
//! 3. [`codegen`] walks the AST and emits C against the runtime preamble.
//! 4. [`pipeline`] chains the stages; [`backend`] drives the C compiler.
//! 5. [`cli`] is the command-line surface of the `cinder` binary.
//!
//! ## Language
//!
//! Types: `num`, `rnum`, `bool`, `str`, `ptr T`, `array<T>`.
//! Control flow: `if/elseif/else`, `while`, `loop`, `for x in xs`,
//! `for i in a..b[, step]`, `match/case/default`, `break`, `continue`,
//! `return`.
//! Intrinsics: `print`, `println`, `push`, `get`, `set`, `size`, `len`,
//! `offset`.

pub mod backend;
pub mod cli;
pub mod codegen;
pub mod lint;
pub mod parser;
pub mod pipeline;

pub use pipeline::{compile_file, compile_source, CompileError, CompileOptions};
