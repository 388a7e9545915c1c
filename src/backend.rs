//! External C compiler backend
//!
//! Hands generated C to the system compiler (`$CC`, or `cc` when unset) and
//! optionally runs the result. Intermediate files live in the system temp
//! directory and are removed once the run finishes.

use log::{debug, info};
use snafu::{ResultExt, Snafu};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Flags passed to the C compiler on every invocation
const C_FLAGS: &[&str] = &["-std=gnu11", "-w"];

static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BackendError {
    #[snafu(display("Failed to start '{program}': {source}"))]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[snafu(display("I/O error on '{}': {source}", path.display()))]
    TempFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("C compiler failed ({status}):\n{stderr}"))]
    CompilerFailed { status: String, stderr: String },

    #[snafu(display("Program terminated by a signal"))]
    Terminated,
}

/// Unique path in the temp directory for this process
fn temp_path(extension: &str) -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut path = env::temp_dir().join(format!("cinder-{}-{}", std::process::id(), n));
    if !extension.is_empty() {
        path.set_extension(extension);
    }
    path
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    compiler: String,
}

impl Backend {
    /// `$CC` when set and non-empty, `cc` otherwise
    pub fn from_env() -> Self {
        let compiler = env::var("CC")
            .ok()
            .filter(|cc| !cc.trim().is_empty())
            .unwrap_or_else(|| "cc".to_string());
        Self::with_compiler(compiler)
    }

    pub fn with_compiler(compiler: impl Into<String>) -> Self {
        Backend {
            compiler: compiler.into(),
        }
    }

    pub fn compiler(&self) -> &str {
        &self.compiler
    }

    /// Whether the compiler can be started at all
    pub fn is_available(&self) -> bool {
        Command::new(&self.compiler)
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Compile `c_source` into an executable at `output`.
    pub fn compile_to_executable(&self, c_source: &str, output: &Path) -> Result<(), BackendError> {
        let source_path = temp_path("c");
        fs::write(&source_path, c_source).context(TempFileSnafu {
            path: source_path.clone(),
        })?;

        let result = self.invoke(&source_path, output);
        // removal failures are ignored
        let _ = fs::remove_file(&source_path);
        result
    }

    fn invoke(&self, source: &Path, output: &Path) -> Result<(), BackendError> {
        debug!(
            "{} {} -o {} {}",
            self.compiler,
            C_FLAGS.join(" "),
            output.display(),
            source.display()
        );

        let result = Command::new(&self.compiler)
            .args(C_FLAGS)
            .arg("-o")
            .arg(output)
            .arg(source)
            .output()
            .context(SpawnSnafu {
                program: self.compiler.clone(),
            })?;

        if !result.status.success() {
            return CompilerFailedSnafu {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
            }
            .fail();
        }

        info!("built {}", output.display());
        Ok(())
    }

    /// Compile `c_source` to a temporary executable, run it with inherited
    /// stdio and return its exit code.
    pub fn compile_and_run(&self, c_source: &str) -> Result<i32, BackendError> {
        let executable = temp_path("");
        self.compile_to_executable(c_source, &executable)?;

        let status = Command::new(&executable).status();
        let _ = fs::remove_file(&executable);
        let status = status.context(SpawnSnafu {
            program: executable.display().to_string(),
        })?;

        debug!("program exited with {}", status);
        status.code().ok_or(BackendError::Terminated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_paths_are_unique() {
        let a = temp_path("c");
        let b = temp_path("c");

        assert_ne!(a, b);
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("c"));
        assert!(temp_path("").extension().is_none());
    }

    #[test]
    fn test_explicit_compiler() {
        assert_eq!(Backend::with_compiler("clang").compiler(), "clang");
    }

    #[test]
    fn test_missing_compiler_fails_to_spawn() {
        let backend = Backend::with_compiler("cinder-no-such-compiler");

        assert!(!backend.is_available());
        let err = backend.compile_and_run("int main(void) { return 0; }").unwrap_err();
        assert!(matches!(err, BackendError::Spawn { .. }));
    }
}
