//! Document export via an external converter.
//!
//! [`Converter`] wraps a pandoc-style executable: it probes availability
//! with `--version`, builds the full argument vector for a conversion,
//! and surfaces the exact failing command line on error. The converter's
//! own behavior is out of scope here; this crate only owns the
//! command-line contract.

use std::path::PathBuf;
use std::process::Command;

/// Export error.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The converter executable could not be found or probed.
    #[error("converter '{program}' is not available: {message}")]
    Unavailable {
        /// Executable name or path.
        program: String,
        /// Underlying failure.
        message: String,
    },
    /// The conversion process could not be spawned.
    #[error("failed to run '{command}': {source}")]
    Spawn {
        /// The full command line that failed.
        command: String,
        #[source]
        source: std::io::Error,
    },
    /// The converter ran and exited nonzero.
    #[error("conversion failed (exit {status}): {command}\n{stderr}")]
    Failed {
        /// The full command line that failed.
        command: String,
        /// Exit status code, or -1 when terminated by a signal.
        status: i32,
        /// Captured standard error.
        stderr: String,
    },
}

/// One conversion to perform.
#[derive(Debug, Clone)]
pub struct ConvertJob {
    /// Input document path.
    pub input: PathBuf,
    /// Output file path.
    pub output: PathBuf,
    /// Target format passed to `-t` (e.g. `html`, `pdf`, `docx`).
    pub format: String,
    /// Produce a standalone document with embedded resources.
    pub standalone: bool,
    /// Metadata key/value pairs passed as `-M key=value`.
    pub metadata: Vec<(String, String)>,
    /// Custom stylesheet passed as `--css`.
    pub stylesheet: Option<PathBuf>,
    /// Arbitrary extra arguments appended last.
    pub extra_args: Vec<String>,
}

impl ConvertJob {
    /// A minimal job converting `input` to `output` in `format`.
    #[must_use]
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, format: &str) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            format: format.to_owned(),
            standalone: false,
            metadata: Vec::new(),
            stylesheet: None,
            extra_args: Vec::new(),
        }
    }
}

/// Wrapper around a pandoc-style document converter executable.
#[derive(Debug, Clone)]
pub struct Converter {
    program: String,
}

impl Converter {
    /// Create a converter for the given executable name or path.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The executable this converter invokes.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Whether the converter executable responds to a version probe.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.version().is_ok()
    }

    /// First line of the converter's `--version` output.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Unavailable`] when the probe cannot run or
    /// exits nonzero.
    pub fn version(&self) -> Result<String, ExportError> {
        let output = Command::new(&self.program)
            .arg("--version")
            .output()
            .map_err(|e| ExportError::Unavailable {
                program: self.program.clone(),
                message: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(ExportError::Unavailable {
                program: self.program.clone(),
                message: format!("version probe exited with {}", output.status),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().to_owned())
    }

    /// Run one conversion, capturing output.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Spawn`] when the process cannot start and
    /// [`ExportError::Failed`] with the exact command line and captured
    /// stderr when it exits nonzero.
    pub fn convert(&self, job: &ConvertJob) -> Result<(), ExportError> {
        let args = build_args(job);
        let command_line = render_command_line(&self.program, &args);
        tracing::debug!(command = %command_line, "running converter");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| ExportError::Spawn {
                command: command_line.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(ExportError::Failed {
                command: command_line,
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }
}

/// Build the full argument vector for a job.
fn build_args(job: &ConvertJob) -> Vec<String> {
    let mut args = vec![
        job.input.display().to_string(),
        "-o".to_owned(),
        job.output.display().to_string(),
        "-t".to_owned(),
        job.format.clone(),
    ];
    if job.standalone {
        args.push("--standalone".to_owned());
        args.push("--embed-resources".to_owned());
    }
    for (key, value) in &job.metadata {
        args.push("-M".to_owned());
        args.push(format!("{key}={value}"));
    }
    if let Some(stylesheet) = &job.stylesheet {
        args.push("--css".to_owned());
        args.push(stylesheet.display().to_string());
    }
    args.extend(job.extra_args.iter().cloned());
    args
}

/// Render the command line for error messages and logs.
fn render_command_line(program: &str, args: &[String]) -> String {
    let mut line = program.to_owned();
    for arg in args {
        line.push(' ');
        if arg.contains(' ') {
            line.push('\'');
            line.push_str(arg);
            line.push('\'');
        } else {
            line.push_str(arg);
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_build_args_minimal() {
        let job = ConvertJob::new("doc.md", "doc.html", "html");
        assert_eq!(
            build_args(&job),
            vec!["doc.md", "-o", "doc.html", "-t", "html"]
        );
    }

    #[test]
    fn test_build_args_full() {
        let mut job = ConvertJob::new("doc.md", "out/doc.pdf", "pdf");
        job.standalone = true;
        job.metadata = vec![
            ("title".to_owned(), "My Doc".to_owned()),
            ("lang".to_owned(), "en".to_owned()),
        ];
        job.stylesheet = Some(PathBuf::from("style.css"));
        job.extra_args = vec!["--toc".to_owned()];

        assert_eq!(
            build_args(&job),
            vec![
                "doc.md",
                "-o",
                "out/doc.pdf",
                "-t",
                "pdf",
                "--standalone",
                "--embed-resources",
                "-M",
                "title=My Doc",
                "-M",
                "lang=en",
                "--css",
                "style.css",
                "--toc",
            ]
        );
    }

    #[test]
    fn test_command_line_quotes_spaced_args() {
        let args = vec!["-M".to_owned(), "title=My Doc".to_owned()];
        assert_eq!(
            render_command_line("pandoc", &args),
            "pandoc -M 'title=My Doc'"
        );
    }

    #[test]
    fn test_unavailable_program() {
        let converter = Converter::new("/nonexistent/converter-binary");
        assert!(!converter.is_available());

        let err = converter.version().unwrap_err();
        assert!(matches!(err, ExportError::Unavailable { .. }));
        assert!(err.to_string().contains("/nonexistent/converter-binary"));
    }

    #[test]
    fn test_failed_conversion_reports_command_line() {
        // `false` exists on any unix test machine and always exits 1
        let converter = Converter::new("false");
        let job = ConvertJob::new("in.md", "out.html", "html");

        let err = converter.convert(&job).unwrap_err();
        match err {
            ExportError::Failed {
                command, status, ..
            } => {
                assert_eq!(command, "false in.md -o out.html -t html");
                assert_eq!(status, 1);
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}
