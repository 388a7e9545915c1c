//! Code generation error types
//!
//! [`CodegenError`] covers everything that stops C emission after a
//! successful parse. Generation is all-or-nothing: any error means no output.

use crate::parser::ast::{SourceLocation, Type};
use snafu::Snafu;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CodegenError {
    /// A function name clashes with a reserved runtime name or an earlier
    /// function
    #[snafu(display(
        "Symbol collision at line {line}, column {column}: '{symbol}' is already defined"
    ))]
    SymbolCollision {
        symbol: String,
        line: usize,
        column: usize,
    },

    #[snafu(display(
        "Unsupported return type '{return_type}' for main at {location}: expected num, rnum, bool or void"
    ))]
    UnsupportedMain {
        return_type: Type,
        location: SourceLocation,
    },

    #[snafu(display(
        "Unsupported parameter '{name}' of type '{param_type}' for main at {location}: expected one num (argument count) and one array<str> (arguments)"
    ))]
    UnsupportedMainParameter {
        name: String,
        param_type: Type,
        location: SourceLocation,
    },

    #[snafu(display("Cannot resolve array argument '{name}' of '{intrinsic}' at {location}"))]
    UnresolvedArray {
        intrinsic: String,
        name: String,
        location: SourceLocation,
    },

    #[snafu(display(
        "'{intrinsic}' expects {expected} argument(s), got {found} at {location}"
    ))]
    IntrinsicArity {
        intrinsic: String,
        expected: usize,
        found: usize,
        location: SourceLocation,
    },

    #[snafu(display("Malformed {what} at {location}"))]
    MalformedNode {
        what: String,
        location: SourceLocation,
    },
}

impl CodegenError {
    /// Where the error points in the source
    pub fn location(&self) -> SourceLocation {
        match self {
            CodegenError::SymbolCollision { line, column, .. } => {
                SourceLocation::new(*line, *column)
            }
            CodegenError::UnsupportedMain { location, .. }
            | CodegenError::UnsupportedMainParameter { location, .. }
            | CodegenError::UnresolvedArray { location, .. }
            | CodegenError::IntrinsicArity { location, .. }
            | CodegenError::MalformedNode { location, .. } => *location,
        }
    }
}
