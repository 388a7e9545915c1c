//! Command-line interface parsing.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const LONG_ABOUT: &str = "Compiler for the Cinder language.

By default the input is compiled to C, built with the system C compiler ($CC or cc)
in a temporary directory and run; cinder exits with the program's exit status.
Use --aot (or -aot) to keep the executable, -d to print the generated C instead of building it,
or --dump-ast to print the parsed syntax tree.";

/// What the driver does with a successfully parsed input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Print the AST and stop
    DumpAst,
    /// Print (or write with `-o`) the generated C
    DumpC,
    /// Build an executable
    Aot,
    /// Build into a temp dir and run
    Run,
}

#[derive(Parser, Debug)]
#[command(name = "cinder", version = VERSION, about = "Cinder to C compiler", long_about = LONG_ABOUT)]
pub struct Cli {
    #[arg(value_name = "INPUT", long_help = "Cinder source file to compile.")]
    pub input: PathBuf,
    #[arg(
        long = "aot",
        action = ArgAction::SetTrue,
        long_help = "Build an executable instead of running the program. The executable is named by -o, or after the input file stem."
    )]
    pub aot: bool,
    #[arg(
        long = "dbg",
        action = ArgAction::SetTrue,
        long_help = "Generate debug-mode C (RT_DEBUG defined, __breakpoint active) and enable debug logging."
    )]
    pub dbg: bool,
    #[arg(
        short = 'd',
        long = "dump",
        action = ArgAction::SetTrue,
        long_help = "Print the generated C instead of building it. With -o the C is written to that file."
    )]
    pub dump: bool,
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        long_help = "Output path for --aot executables and -d dumps."
    )]
    pub output: Option<PathBuf>,
    #[arg(
        long = "dump-ast",
        action = ArgAction::SetTrue,
        long_help = "Print the parsed syntax tree and exit."
    )]
    pub dump_ast: bool,
}

/// Single-dash spellings accepted for the long flags
const SINGLE_DASH_FLAGS: &[(&str, &str)] = &[("-aot", "--aot"), ("-dbg", "--dbg")];

/// Rewrite `-aot`/`-dbg` to their `--` forms; clap would otherwise read
/// `-dbg` as the short flags `-d -b -g`. Arguments after `--` are left alone.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut positional_only = false;
    args.into_iter()
        .map(|arg| {
            let arg = arg.into();
            if positional_only {
                return arg;
            }
            if arg == "--" {
                positional_only = true;
                return arg;
            }
            SINGLE_DASH_FLAGS
                .iter()
                .find(|(short, _)| arg == *short)
                .map_or(arg, |(_, long)| OsString::from(*long))
        })
        .collect()
}

impl Cli {
    /// Parse process-style arguments, accepting `-aot` and `-dbg`.
    pub fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_args(args))
    }

    /// Selected mode; `--dump-ast` wins over `-d`, which wins over `--aot`.
    pub fn mode(&self) -> Mode {
        if self.dump_ast {
            Mode::DumpAst
        } else if self.dump {
            Mode::DumpC
        } else if self.aot {
            Mode::Aot
        } else {
            Mode::Run
        }
    }

    /// Executable path for `--aot`: `-o`, or the input file stem.
    pub fn executable_path(&self) -> PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }
        let stem = self
            .input
            .file_stem()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("a.out"));
        match self.input.parent() {
            Some(dir) => dir.join(stem),
            None => stem,
        }
    }
}
