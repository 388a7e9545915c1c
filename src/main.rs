// Cinder: compiler driver

use std::fs;
use std::process;

use log::info;

use cinder::backend::Backend;
use cinder::cli::{Cli, Mode};
use cinder::pipeline::{self, CompileError, CompileOptions};

fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

/// Print a pipeline error where the user expects it: lint findings on
/// stdout, everything else on stderr.
fn report(err: &CompileError) {
    match err {
        CompileError::Lint { diagnostics } => {
            for diagnostic in diagnostics {
                println!("{}", diagnostic);
            }
        }
        other => eprintln!("Error: {}", other),
    }
}

fn run(cli: &Cli) -> i32 {
    let options = CompileOptions { debug: cli.dbg };

    if cli.mode() == Mode::DumpAst {
        let result = pipeline::read_source(&cli.input)
            .and_then(|source| pipeline::parse_source(&source, Some(&cli.input)));
        return match result {
            Ok((ast, _)) => {
                print!("{}", ast.dump());
                0
            }
            Err(err) => {
                report(&err);
                1
            }
        };
    }

    let c_source = match pipeline::compile_file(&cli.input, &options) {
        Ok(c_source) => c_source,
        Err(err) => {
            report(&err);
            return 1;
        }
    };

    match cli.mode() {
        Mode::DumpC => match &cli.output {
            Some(path) => match fs::write(path, &c_source) {
                Ok(()) => 0,
                Err(err) => {
                    eprintln!("Error: cannot write '{}': {}", path.display(), err);
                    1
                }
            },
            None => {
                print!("{}", c_source);
                0
            }
        },
        Mode::Aot => {
            let executable = cli.executable_path();
            match Backend::from_env().compile_to_executable(&c_source, &executable) {
                Ok(()) => {
                    info!("wrote {}", executable.display());
                    0
                }
                Err(err) => {
                    eprintln!("Error: {}", err);
                    1
                }
            }
        }
        Mode::Run => match Backend::from_env().compile_and_run(&c_source) {
            Ok(code) => code,
            Err(err) => {
                eprintln!("Error: {}", err);
                1
            }
        },
        Mode::DumpAst => 0,
    }
}

fn main() {
    let cli = match Cli::try_parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            process::exit(code);
        }
    };

    init_logging(cli.dbg);

    process::exit(run(&cli));
}
