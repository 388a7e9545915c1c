//! C code generation
//!
//! This module lowers a parsed [`Ast`](crate::parser::ast::Ast) to a single
//! C11 translation unit:
//! - [`engine`]: [`Generator`] state, function collection and the `emit` dispatch
//! - [`errors`]: [`CodegenError`]
//! - [`runtime`]: the C runtime preamble (scoped heap, arrays, printing)
//!
//! # Output Layout
//!
//! ```text
//! [#define RT_DEBUG 1]
//! runtime preamble
//! prototypes of every non-main function
//! function bodies in source order
//! ```
//!
//! # Entry Point
//!
//! `main` acquires the scoped heap on entry and releases it on every exit
//! path; its return value (when `num`, `rnum` or `bool`) becomes the process
//! exit status.

mod builtins;
pub mod constants;
pub mod engine;
pub mod errors;
mod expressions;
mod loops;
pub mod runtime;
mod statements;
mod type_system;

pub use engine::{GenOptions, Generator};
pub use errors::CodegenError;
