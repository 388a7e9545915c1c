//! Source-to-C compilation pipeline
//!
//! ```text
//! source → lexer → linter → parser → generator → C text
//! ```
//!
//! Every stage either succeeds completely or stops the pipeline with a
//! [`CompileError`]; no partial output is ever returned.

use crate::codegen::{CodegenError, GenOptions, Generator};
use crate::lint::lint;
use crate::parser::ast::Ast;
use crate::parser::parse::{ParseError, Parser};
use log::{debug, info};
use snafu::{ResultExt, Snafu};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Emit debug-mode C (`RT_DEBUG`, breakpoints active)
    pub debug: bool,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
    #[snafu(display("Cannot read '{}': {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("{}", diagnostics.join("\n")))]
    Lint { diagnostics: Vec<String> },

    #[snafu(context(false), display("{source}"))]
    Parse { source: ParseError },

    #[snafu(context(false), display("{source}"))]
    Codegen { source: CodegenError },
}

/// Parse `source` into an AST, running the linter first. `path` anchors
/// relative imports.
pub fn parse_source(source: &str, path: Option<&Path>) -> Result<(Ast, Parser), CompileError> {
    let mut parser = match path {
        Some(path) => Parser::with_path(source, path),
        None => Parser::new(source),
    };
    debug!("lexed {} tokens", parser.tokens().len());

    let diagnostics = lint(parser.tokens());
    if !diagnostics.is_empty() {
        return LintSnafu { diagnostics }.fail();
    }

    let ast = parser.parse_program()?;
    info!("parsed {} AST nodes", ast.len());
    Ok((ast, parser))
}

fn generate(ast: &Ast, parser: &Parser, options: &CompileOptions) -> Result<String, CompileError> {
    let options = GenOptions {
        debug: options.debug,
    };
    Ok(Generator::new(ast, parser.tokens(), options).generate()?)
}

/// Compile in-memory source to C. Imports resolve against the current
/// directory.
pub fn compile_source(source: &str, options: &CompileOptions) -> Result<String, CompileError> {
    let (ast, parser) = parse_source(source, None)?;
    generate(&ast, &parser, options)
}

/// Compile the file at `path` to C. Imports resolve against its directory.
pub fn compile_file(path: &Path, options: &CompileOptions) -> Result<String, CompileError> {
    let source = read_source(path)?;
    let (ast, parser) = parse_source(&source, Some(path))?;
    generate(&ast, &parser, options)
}

pub fn read_source(path: &Path) -> Result<String, CompileError> {
    info!("reading {}", path.display());
    fs::read_to_string(path).context(IoSnafu { path })
}
