//! PDF rendering through an external program

use crate::output::traits::{OutputError, OutputResult, PdfRenderer};
use std::path::Path;
use std::process::{Command, Stdio};

/// Renders PDFs by running `<program> [args...] <input.html> <output.pdf>`
///
/// The default program is `weasyprint`, whose command line has exactly
/// this shape.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
}

impl CommandRenderer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl PdfRenderer for CommandRenderer {
    fn render(&self, html: &Path, pdf: &Path) -> OutputResult<()> {
        tracing::debug!("Rendering {} with {}", pdf.display(), self.program);

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(html)
            .arg(pdf)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| OutputError::Render(format!("cannot run '{}': {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OutputError::Render(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        if !pdf.exists() {
            return Err(OutputError::Render(format!(
                "'{}' produced no file at {}",
                self.program,
                pdf.display()
            )));
        }

        Ok(())
    }
}
