//! Engines driven through an external command (axe, pa11y, htmlcs,
//! lighthouse).
//!
//! The command prints the engine's JSON report on stdout. Engines such as
//! pa11y exit non-zero when they find issues, so any exit status is accepted
//! as long as stdout parses as JSON. The child is killed if the unit's
//! deadline passes first.

use std::process::Stdio;
use std::time::Instant;

use a11ymatrix_core::{
    Adapter, AdapterError, AdapterResult, AdapterSettings, Capabilities, RawPayload, UnitContext,
};
use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

const DEFAULT_STANDARD: &str = "WCAG2AA";
const STDERR_TAIL: usize = 400;

/// Which payload shape the command prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutput {
    /// axe-core results, or an array holding one result per page.
    Axe,
    /// pa11y JSON reporter issues.
    Pa11y,
    /// HTML_CodeSniffer messages, directly or through pa11y's `htmlcs` runner.
    Htmlcs,
    /// Lighthouse JSON report.
    Lighthouse,
}

/// Executable plus argument template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub standard: String,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            standard: DEFAULT_STANDARD.to_string(),
        }
    }

    /// Replace program, arguments and standard with configured values.
    pub fn with_settings(mut self, settings: &AdapterSettings) -> Self {
        if let Some(program) = &settings.command {
            self.program = program.clone();
        }
        if !settings.args.is_empty() {
            self.args = settings.args.clone();
        }
        if let Some(standard) = &settings.standard {
            self.standard = standard.clone();
        }
        self
    }

    /// Arguments with placeholders filled in for one unit.
    pub fn render_args(&self, ctx: &UnitContext) -> Vec<String> {
        let viewport = ctx.viewport();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{url}", &ctx.url)
                    .replace("{standard}", &self.standard)
                    .replace("{browser}", ctx.browser())
                    .replace("{width}", &viewport.width.to_string())
                    .replace("{height}", &viewport.height.to_string())
            })
            .collect()
    }
}

pub struct CommandAdapter {
    name: String,
    output: CommandOutput,
    spec: CommandSpec,
}

impl CommandAdapter {
    pub fn new(name: impl Into<String>, output: CommandOutput, spec: CommandSpec) -> Self {
        Self {
            name: name.into(),
            output,
            spec,
        }
    }

    /// `@axe-core/cli`, printing results as JSON.
    pub fn axe(settings: &AdapterSettings) -> Self {
        let spec = CommandSpec::new("axe", &["{url}", "--stdout"]).with_settings(settings);
        Self::new("axe", CommandOutput::Axe, spec)
    }

    pub fn pa11y(settings: &AdapterSettings) -> Self {
        let spec = CommandSpec::new(
            "pa11y",
            &[
                "{url}",
                "--standard",
                "{standard}",
                "--reporter",
                "json",
                "--include-notices",
                "--include-warnings",
            ],
        )
        .with_settings(settings);
        Self::new("pa11y", CommandOutput::Pa11y, spec)
    }

    /// HTML_CodeSniffer through pa11y's `htmlcs` runner.
    pub fn htmlcs(settings: &AdapterSettings) -> Self {
        let spec = CommandSpec::new(
            "pa11y",
            &[
                "{url}",
                "--runner",
                "htmlcs",
                "--standard",
                "{standard}",
                "--reporter",
                "json",
                "--include-notices",
                "--include-warnings",
            ],
        )
        .with_settings(settings);
        Self::new("htmlcs", CommandOutput::Htmlcs, spec)
    }

    /// Lighthouse limited to the accessibility category, report on stdout.
    pub fn lighthouse(settings: &AdapterSettings) -> Self {
        let spec = CommandSpec::new(
            "lighthouse",
            &[
                "{url}",
                "--output=json",
                "--output-path=stdout",
                "--only-categories=accessibility",
                "--quiet",
                "--screenEmulation.width={width}",
                "--screenEmulation.height={height}",
                "--chrome-flags=--headless --no-sandbox --disable-gpu",
            ],
        )
        .with_settings(settings);
        Self::new("lighthouse", CommandOutput::Lighthouse, spec)
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    fn payload(&self, value: Value) -> RawPayload {
        match self.output {
            CommandOutput::Axe => RawPayload::Axe(single_result(value)),
            CommandOutput::Pa11y => RawPayload::Pa11y(value),
            CommandOutput::Htmlcs => RawPayload::Htmlcs(value),
            CommandOutput::Lighthouse => RawPayload::Lighthouse(value),
        }
    }
}

/// `@axe-core/cli` prints an array with one result per URL.
fn single_result(value: Value) -> Value {
    match value {
        Value::Array(mut items) if items.len() == 1 && items[0].is_object() => items.remove(0),
        other => other,
    }
}

fn tail(text: &str) -> String {
    let text = text.trim();
    let skip = text.chars().count().saturating_sub(STDERR_TAIL);
    text.chars().skip(skip).collect()
}

#[async_trait]
impl Adapter for CommandAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::none().with_process(self.spec.program.as_str())
    }

    async fn invoke(&self, ctx: &UnitContext) -> AdapterResult<RawPayload> {
        let args = self.spec.render_args(ctx);
        debug!(adapter = %self.name, program = %self.spec.program, ?args, "spawning engine");

        let started = Instant::now();
        let child = Command::new(&self.spec.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    AdapterError::Unsupported(format!(
                        "`{}` is not installed or not executable: {e}",
                        self.spec.program
                    ))
                }
                _ => AdapterError::ProcessCrashed(format!("spawn `{}`: {e}", self.spec.program)),
            })?;

        let budget = ctx.remaining();
        let output = tokio::time::timeout(budget, child.wait_with_output())
            .await
            .map_err(|_| AdapterError::Timeout {
                elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            })?
            .map_err(|e| AdapterError::ProcessCrashed(format!("wait `{}`: {e}", self.spec.program)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let parsed = serde_json::from_str::<Value>(stdout.trim());
        debug!(
            adapter = %self.name,
            exit_code = ?output.status.code(),
            duration_ms = started.elapsed().as_millis() as u64,
            "engine exited"
        );
        match (parsed, output.status.success()) {
            (Ok(value), _) => Ok(self.payload(value)),
            (Err(e), true) => Err(AdapterError::InvalidOutput(format!(
                "`{}` printed non-JSON output: {e}",
                self.spec.program
            ))),
            (Err(_), false) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let status = match output.status.code() {
                    Some(code) => format!("exit code {code}"),
                    None => "terminated by signal".to_string(),
                };
                Err(AdapterError::ProcessCrashed(format!(
                    "`{}` {status}: {}",
                    self.spec.program,
                    tail(&stderr)
                )))
            }
        }
    }
}
