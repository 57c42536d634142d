// src/exec/command.rs

//! Shell command transform.

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{bail, Context};
use tracing::{debug, info};

use crate::exec::Transform;
use crate::types::Flow;

/// Runs a shell command once per file.
///
/// `{input}` and `{output}` in the template are replaced with the quoted
/// paths, and the same paths are exported as `TREEMIRROR_INPUT` /
/// `TREEMIRROR_OUTPUT`. A non-zero exit status is a transform error.
#[derive(Debug, Clone)]
pub struct CommandTransform {
    template: String,
}

impl CommandTransform {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// The command line for one file.
    pub fn render(&self, input: &Path, output: &Path) -> String {
        self.template
            .replace("{input}", &shell_quote(&input.to_string_lossy()))
            .replace("{output}", &shell_quote(&output.to_string_lossy()))
    }
}

impl Transform for CommandTransform {
    fn transform(&self, input: &Path, output: &Path) -> anyhow::Result<Flow> {
        let line = self.render(input, output);

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&line);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&line);
            c
        };

        cmd.env("TREEMIRROR_INPUT", input)
            .env("TREEMIRROR_OUTPUT", output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(cmd = %line, "running transform command");
        let out = cmd
            .output()
            .with_context(|| format!("spawning transform command for {:?}", input))?;

        for line in String::from_utf8_lossy(&out.stdout).lines() {
            debug!(input = %input.display(), "stdout: {}", line);
        }
        for line in String::from_utf8_lossy(&out.stderr).lines() {
            debug!(input = %input.display(), "stderr: {}", line);
        }

        if !out.status.success() {
            let code = out.status.code().unwrap_or(-1);
            bail!("command `{line}` exited with status {code}");
        }

        info!(input = %input.display(), output = %output.display(), "transformed");
        Ok(Flow::Continue)
    }
}

fn shell_quote(s: &str) -> String {
    if cfg!(windows) {
        format!("\"{}\"", s.replace('"', "\\\""))
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}
