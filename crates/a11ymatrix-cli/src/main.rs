//! a11ymatrix - accessibility test matrix runner
//!
//! The `a11ymatrix` command runs many accessibility engines over a
//! URL × browser × viewport matrix and rolls their findings into one report.
//!
//! ## Commands
//!
//! - `run`: run the matrix, write report artifacts and apply the CI gate
//! - `expand`: show the execution units a configuration produces
//! - `normalize`: map a saved engine payload to normalized issues
//! - `rules`: list the built-in checklists or evaluate them on a local file
//! - `adapters`: list available adapters and what they need

use std::path::{Path, PathBuf};
use std::sync::Arc;

use a11ymatrix_core::obs::RunSpan;
use a11ymatrix_core::telemetry::init_tracing;
use a11ymatrix_core::{
    evaluate_gate, expand, group_units, normalize_payload, render_summary_md,
    write_run_report_json, write_summary_md, AdapterRegistry, Capabilities, ConfigOverrides,
    CriteriaReport, CriterionOutcome, GateRuleSet, GateVerdict, RawPayload, RunConfig,
    RunOutcome, RunReport, Scheduler, ViewportProfile,
};
use a11ymatrix_engines::{engine_adapters, HttpPageProvider};
use a11ymatrix_rules::{japanese, rule_adapters, wcag22, Checklist, PageView};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "a11ymatrix")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Accessibility test matrix runner", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every adapter over the matrix and apply the CI gate
    Run(RunArgs),

    /// Print the execution units a configuration expands to
    Expand {
        #[command(flatten)]
        matrix: MatrixArgs,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Normalize a saved engine payload
    Normalize {
        /// Adapter that produced the payload (axe, pa11y, htmlcs, lighthouse, wave, w3c, w3c-css, wcag22-rules, japanese-a11y)
        #[arg(short, long)]
        adapter: String,

        /// Payload file: the engine's JSON output, or `{"kind": .., "body": ..}`
        input: PathBuf,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Built-in rule checklists
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },

    /// List available adapters
    Adapters {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
enum RulesAction {
    /// List every criterion of the selected checklists
    List {
        #[arg(long, value_enum, default_value = "all")]
        checklist: ChecklistChoice,
    },

    /// Evaluate a local HTML file
    Check {
        /// HTML file to evaluate
        file: PathBuf,

        #[arg(long, value_enum, default_value = "all")]
        checklist: ChecklistChoice,

        /// Content-Type to assume, e.g. `text/html; charset=shift_jis`
        #[arg(long)]
        content_type: Option<String>,

        /// Exit non-zero when any criterion fails
        #[arg(long)]
        strict: bool,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Matrix definition: a configuration file plus command-line overrides.
#[derive(Args, Debug, Default)]
struct MatrixArgs {
    /// Run configuration (TOML or JSON)
    #[arg(short, long, env = "A11YMATRIX_CONFIG")]
    config: Option<PathBuf>,

    /// Target URL or local HTML file (repeatable)
    #[arg(long = "url")]
    urls: Vec<String>,

    /// Browser name (repeatable)
    #[arg(long = "browser")]
    browsers: Vec<String>,

    /// Viewport as a preset name or `name,width,height` (repeatable)
    #[arg(long = "viewport", value_parser = ViewportProfile::parse)]
    viewports: Vec<ViewportProfile>,

    /// Adapter name (repeatable)
    #[arg(long = "adapter")]
    adapters: Vec<String>,

    /// Parallel execution slots
    #[arg(long, env = "A11YMATRIX_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Per-unit budget in milliseconds, covering retries
    #[arg(long, env = "A11YMATRIX_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Retries for transient failures
    #[arg(long)]
    max_retries: Option<u32>,
}

impl MatrixArgs {
    fn overrides(&self) -> Result<ConfigOverrides> {
        Ok(ConfigOverrides {
            urls: self
                .urls
                .iter()
                .map(|u| target_url(u))
                .collect::<Result<_>>()?,
            browsers: self.browsers.clone(),
            viewports: self.viewports.clone(),
            adapters: self.adapters.clone(),
            concurrency: self.concurrency,
            timeout_ms: self.timeout_ms,
            max_retries: self.max_retries,
        })
    }
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    matrix: MatrixArgs,

    /// Gate rules (TOML or JSON). The standard gate applies when omitted.
    #[arg(long, env = "A11YMATRIX_GATE")]
    gate: Option<PathBuf>,

    /// Skip the gate
    #[arg(long, conflicts_with = "gate")]
    no_gate: bool,

    /// Write the full run report as JSON
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Write a Markdown summary for PR comments
    #[arg(long)]
    summary_md: Option<PathBuf>,

    /// Report printed on stdout
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ChecklistChoice {
    Wcag22,
    Japanese,
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Run(args) => cmd_run(args).await,
        Commands::Expand { matrix, format } => cmd_expand(&matrix, format),
        Commands::Normalize {
            adapter,
            input,
            format,
        } => cmd_normalize(&adapter, &input, format),
        Commands::Rules { action } => match action {
            RulesAction::List { checklist } => cmd_rules_list(checklist),
            RulesAction::Check {
                file,
                checklist,
                content_type,
                strict,
                format,
            } => cmd_rules_check(&file, checklist, content_type.as_deref(), strict, format),
        },
        Commands::Adapters { format } => cmd_adapters(format),
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// URLs pass through; an existing local path becomes a `file://` URL.
fn target_url(arg: &str) -> Result<String> {
    if arg.contains("://") {
        return Ok(arg.to_string());
    }
    let path = Path::new(arg);
    if path.exists() {
        let absolute =
            std::fs::canonicalize(path).with_context(|| format!("Failed to resolve {arg}"))?;
        return Ok(format!("file://{}", absolute.display()));
    }
    // left as-is; the unit fails as a malformed URL
    Ok(arg.to_string())
}

fn load_config(args: &MatrixArgs) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::from_path(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => RunConfig::default(),
    };
    config.apply_overrides(args.overrides()?);
    Ok(config)
}

fn load_gate(path: Option<&Path>, disabled: bool) -> Result<Option<GateRuleSet>> {
    if disabled {
        return Ok(None);
    }
    match path {
        Some(path) => GateRuleSet::from_path(path)
            .map(Some)
            .with_context(|| format!("Failed to load gate rules {}", path.display())),
        None => Ok(Some(GateRuleSet::standard())),
    }
}

/// Rule-based and engine adapters, configured from `config`.
fn build_registry(config: &RunConfig) -> Result<AdapterRegistry> {
    let mut registry = AdapterRegistry::new();
    let engines = engine_adapters(config).context("Failed to set up engine adapters")?;
    for adapter in rule_adapters().into_iter().chain(engines) {
        registry.register(adapter);
    }
    Ok(registry)
}

fn checklists(choice: ChecklistChoice) -> Vec<Checklist> {
    match choice {
        ChecklistChoice::Wcag22 => vec![wcag22::checklist()],
        ChecklistChoice::Japanese => vec![japanese::checklist()],
        ChecklistChoice::All => vec![wcag22::checklist(), japanese::checklist()],
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

async fn cmd_run(args: RunArgs) -> Result<()> {
    let config = load_config(&args.matrix)?;
    let gate = load_gate(args.gate.as_deref(), args.no_gate)?;

    let outcome = execute(&config).await?;
    let report = outcome.report();
    let _span = RunSpan::enter(&report.run_id.to_string());
    let verdict = gate.as_ref().map(|rules| evaluate_gate(rules, &report.summary));

    write_artifacts(
        report,
        verdict.as_ref(),
        args.report_json.as_deref(),
        args.summary_md.as_deref(),
    )?;
    match args.format {
        OutputFormat::Text => print!("{}", render_summary_md(report, verdict.as_ref())),
        OutputFormat::Json => print_json(report)?,
    }
    check_outcome(&outcome, verdict.as_ref())
}

/// Run the matrix with the static page provider. Ctrl-C cancels dispatch.
async fn execute(config: &RunConfig) -> Result<RunOutcome> {
    let registry = build_registry(config)?;
    let provider = HttpPageProvider::new().context("Failed to set up page provider")?;
    let scheduler = Scheduler::new(registry).with_browser_provider(Arc::new(provider));

    let handle = scheduler
        .start_run(config)
        .context("Invalid run configuration")?;
    info!(run_id = %handle.run_id(), units = handle.units().len(), "run started");

    let canceller = handle.canceller();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling run");
            canceller.cancel();
        }
    });
    let outcome = handle.await_completion().await.context("Run failed");
    interrupt.abort();
    outcome
}

fn write_artifacts(
    report: &RunReport,
    verdict: Option<&GateVerdict>,
    report_json: Option<&Path>,
    summary_md: Option<&Path>,
) -> Result<()> {
    if let Some(path) = report_json {
        write_run_report_json(path, report)?;
        info!(path = %path.display(), "run report written");
    }
    if let Some(path) = summary_md {
        write_summary_md(path, report, verdict)?;
        info!(path = %path.display(), "summary written");
    }
    Ok(())
}

/// Cancelled runs and gate violations fail the command.
fn check_outcome(outcome: &RunOutcome, verdict: Option<&GateVerdict>) -> Result<()> {
    if let RunOutcome::Aborted { undispatched, .. } = outcome {
        bail!(
            "Run cancelled with {} unit(s) not dispatched",
            undispatched.len()
        );
    }
    if let Some(verdict) = verdict {
        if !verdict.passed() {
            bail!(
                "Accessibility gate failed with {} violation(s)",
                verdict.violations.len()
            );
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// expand
// ---------------------------------------------------------------------------

fn cmd_expand(args: &MatrixArgs, format: OutputFormat) -> Result<()> {
    let config = load_config(args)?;
    let registry = build_registry(&config)?;
    let units = expand(&config, &registry.names()).context("Invalid run configuration")?;

    match format {
        OutputFormat::Json => print_json(&units)?,
        OutputFormat::Text => {
            let groups = group_units(&units);
            println!(
                "{} unit(s) in {} session group(s)",
                units.len(),
                groups.len()
            );
            for group in &groups {
                println!("{}", group.key);
                for unit in &group.units {
                    println!("  - {}", unit.adapter);
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// normalize
// ---------------------------------------------------------------------------

fn cmd_normalize(adapter: &str, input: &Path, format: OutputFormat) -> Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", input.display()))?;
    let payload = payload_for(adapter, value)?;
    let issues = normalize_payload(adapter, &payload)
        .with_context(|| format!("Failed to normalize {}", input.display()))?;

    match format {
        OutputFormat::Json => print_json(&issues)?,
        OutputFormat::Text => {
            for issue in &issues {
                let criteria: Vec<&str> = issue.wcag_criteria.iter().map(String::as_str).collect();
                println!(
                    "{:<13} {:<13} {} {} [{}]",
                    issue.outcome.as_str(),
                    issue.severity.as_str(),
                    issue.rule_id,
                    issue.element_selector,
                    criteria.join(", ")
                );
            }
            println!("{} issue(s)", issues.len());
        }
    }
    Ok(())
}

/// Wrap a saved payload in the variant its adapter produces. Tagged payloads
/// are taken as they are.
fn payload_for(adapter: &str, value: Value) -> Result<RawPayload> {
    if value.get("kind").is_some() && value.get("body").is_some() {
        return serde_json::from_value(value).context("Invalid tagged payload");
    }
    let payload = match adapter {
        "axe" => RawPayload::Axe(value),
        "wave" => RawPayload::Wave(value),
        "pa11y" => RawPayload::Pa11y(value),
        "htmlcs" => RawPayload::Htmlcs(value),
        "w3c" => RawPayload::W3c(value),
        "w3c-css" => RawPayload::W3cCss(value),
        "lighthouse" => RawPayload::Lighthouse(value),
        "wcag22-rules" | "japanese-a11y" => RawPayload::Criteria(
            serde_json::from_value::<CriteriaReport>(value).context("Invalid criteria report")?,
        ),
        other => bail!("Unknown adapter `{other}`; pass a payload tagged with `kind` and `body`"),
    };
    Ok(payload)
}

// ---------------------------------------------------------------------------
// rules
// ---------------------------------------------------------------------------

fn cmd_rules_list(choice: ChecklistChoice) -> Result<()> {
    for checklist in checklists(choice) {
        println!("{} ({} criteria)", checklist.name(), checklist.len());
        for meta in checklist.metas() {
            println!(
                "  {:<16} {:<3} {:<10} {} [{}]",
                meta.id,
                meta.level.as_str(),
                meta.severity.as_str(),
                meta.name,
                meta.wcag.join(", ")
            );
        }
    }
    Ok(())
}

fn cmd_rules_check(
    file: &Path,
    choice: ChecklistChoice,
    content_type: Option<&str>,
    strict: bool,
    format: OutputFormat,
) -> Result<()> {
    let reports = check_file(file, choice, content_type)?;
    match format {
        OutputFormat::Json => print_json(&reports)?,
        OutputFormat::Text => {
            for report in &reports {
                println!("{}", report.checklist);
                for criterion in &report.criteria {
                    let mark = match &criterion.outcome {
                        CriterionOutcome::Passed => "✓",
                        CriterionOutcome::Failed { .. } => "✗",
                        CriterionOutcome::ManualCheckRequired { .. } => "?",
                    };
                    println!(
                        "  {} {} {}: {}",
                        mark, criterion.id, criterion.name, criterion.summary
                    );
                }
            }
        }
    }

    let failed = failed_criteria(&reports);
    if strict && !failed.is_empty() {
        bail!("{} criterion/criteria failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}

fn check_file(
    file: &Path,
    choice: ChecklistChoice,
    content_type: Option<&str>,
) -> Result<Vec<CriteriaReport>> {
    let html = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let url = target_url(&file.to_string_lossy())?;
    let mut page = PageView::from_html(url, &html);
    if let Some(content_type) = content_type {
        page = page.with_content_type(content_type);
    }
    Ok(checklists(choice)
        .iter()
        .map(|checklist| checklist.evaluate(&page))
        .collect())
}

fn failed_criteria(reports: &[CriteriaReport]) -> Vec<String> {
    reports
        .iter()
        .flat_map(|r| r.criteria.iter())
        .filter(|c| c.outcome.is_failed())
        .map(|c| c.id.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// adapters
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct AdapterRow {
    name: String,
    capabilities: Capabilities,
}

fn adapter_rows(registry: &AdapterRegistry) -> Vec<AdapterRow> {
    registry
        .iter()
        .map(|(name, adapter)| AdapterRow {
            name: name.to_string(),
            capabilities: adapter.capabilities(),
        })
        .collect()
}

fn cmd_adapters(format: OutputFormat) -> Result<()> {
    let registry = build_registry(&RunConfig::default())?;
    let rows = adapter_rows(&registry);
    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Text => {
            for row in &rows {
                let mut needs = Vec::new();
                if row.capabilities.browser_session {
                    needs.push("browser session".to_string());
                }
                if let Some(env) = &row.capabilities.api_credential {
                    needs.push(format!("credential ${env}"));
                }
                if let Some(program) = &row.capabilities.external_process {
                    needs.push(format!("command `{program}`"));
                }
                let needs = if needs.is_empty() {
                    "network".to_string()
                } else {
                    needs.join(", ")
                };
                println!("{:<14} {}", row.name, needs);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use a11ymatrix_core::{GateRule, Outcome};
    use serde_json::json;

    const LOGIN_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head><title>会員ログイン</title></head>
<body>
  <form action="/login">
    <input name="user" placeholder="ユーザー名">
    <input type="password" name="pw">
    <button style="font-size: 9px">ログイン</button>
  </form>
  <p>ご利用の前に必ず利用規約をお読みください。個人情報の取り扱いについて説明します。</p>
</body>
</html>"#;

    fn write_page(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("login.html");
        std::fs::write(&path, LOGIN_PAGE).unwrap();
        path
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "a11ymatrix",
            "run",
            "--url",
            "https://a.test",
            "--url",
            "https://b.test",
            "--adapter",
            "axe",
            "--viewport",
            "phone,320,640",
            "--viewport",
            "desktop",
            "--concurrency",
            "2",
            "--no-gate",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.matrix.urls.len(), 2);
        assert_eq!(args.matrix.viewports[0], ViewportProfile::new("phone", 320, 640));
        assert_eq!(args.matrix.viewports[1], ViewportProfile::desktop());
        assert_eq!(args.matrix.concurrency, Some(2));
        assert!(args.no_gate);
        assert_eq!(args.format, OutputFormat::Text);
    }

    #[test]
    fn bad_viewport_is_rejected_at_parse_time() {
        assert!(Cli::try_parse_from(["a11ymatrix", "expand", "--viewport", "phone,0,640"]).is_err());
        assert!(
            Cli::try_parse_from(["a11ymatrix", "run", "--gate", "g.toml", "--no-gate"]).is_err()
        );
    }

    #[test]
    fn overrides_replace_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a11ymatrix.toml");
        std::fs::write(
            &path,
            r#"
urls = ["https://a.test"]
adapters = ["axe", "wave"]
concurrency = 8
"#,
        )
        .unwrap();
        let args = MatrixArgs {
            config: Some(path),
            adapters: vec!["w3c".into()],
            timeout_ms: Some(5_000),
            ..MatrixArgs::default()
        };
        let config = load_config(&args).unwrap();
        assert_eq!(config.urls, vec!["https://a.test"]);
        assert_eq!(config.adapters, vec!["w3c"]);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.timeout_ms, 5_000);
    }

    #[test]
    fn local_paths_become_file_urls() {
        let dir = tempfile::tempdir().unwrap();
        let page = write_page(&dir);
        let url = target_url(&page.to_string_lossy()).unwrap();
        assert!(url.starts_with("file:///"));
        assert!(url.ends_with("login.html"));
        assert_eq!(target_url("https://a.test/").unwrap(), "https://a.test/");
        assert_eq!(target_url("not-a-file").unwrap(), "not-a-file");
    }

    #[test]
    fn registry_has_every_adapter() {
        let registry = build_registry(&RunConfig::default()).unwrap();
        let names: Vec<String> = registry.names().into_iter().collect();
        assert_eq!(
            names,
            vec![
                "axe",
                "htmlcs",
                "japanese-a11y",
                "lighthouse",
                "pa11y",
                "w3c",
                "w3c-css",
                "wave",
                "wcag22-rules"
            ]
        );
        let rows = adapter_rows(&registry);
        let wave = rows.iter().find(|r| r.name == "wave").unwrap();
        assert_eq!(wave.capabilities.api_credential.as_deref(), Some("WAVE_API_KEY"));
    }

    #[test]
    fn saved_payloads_map_to_their_adapter() {
        let axe = payload_for("axe", json!({"violations": []})).unwrap();
        assert_eq!(axe.kind(), "axe");

        let tagged = payload_for("anything", json!({"kind": "w3c", "body": {"messages": []}})).unwrap();
        assert_eq!(tagged, RawPayload::W3c(json!({"messages": []})));

        let criteria = payload_for(
            "wcag22-rules",
            json!({"checklist": "wcag22", "criteria": []}),
        )
        .unwrap();
        assert_eq!(criteria.kind(), "criteria");

        let lighthouse = payload_for("lighthouse", json!({"audits": {}})).unwrap();
        assert_eq!(lighthouse.kind(), "lighthouse");
        let css = payload_for("w3c-css", json!({"cssvalidation": {}})).unwrap();
        assert_eq!(css.kind(), "w3c_css");

        assert!(payload_for("tenon", json!({})).is_err());
    }

    #[test]
    fn rules_check_flags_japanese_page_problems() {
        let dir = tempfile::tempdir().unwrap();
        let page = write_page(&dir);
        let reports = check_file(&page, ChecklistChoice::All, None).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].criteria.len(), 7);
        assert_eq!(reports[1].criteria.len(), 6);

        let failed = failed_criteria(&reports);
        assert!(failed.contains(&"ja-lang".to_string()));
        assert!(failed.contains(&"ja-form-labels".to_string()));
        assert!(cmd_rules_check(&page, ChecklistChoice::Japanese, None, true, OutputFormat::Json)
            .is_err());
        assert!(cmd_rules_check(&page, ChecklistChoice::Japanese, None, false, OutputFormat::Text)
            .is_ok());
    }

    #[tokio::test]
    async fn local_run_writes_artifacts_and_applies_gate() {
        let dir = tempfile::tempdir().unwrap();
        let page = write_page(&dir);
        let args = MatrixArgs {
            urls: vec![page.to_string_lossy().into_owned()],
            viewports: vec![ViewportProfile::mobile(), ViewportProfile::desktop()],
            adapters: vec!["wcag22-rules".into(), "japanese-a11y".into()],
            ..MatrixArgs::default()
        };
        let config = load_config(&args).unwrap();

        let outcome = execute(&config).await.unwrap();
        let report = outcome.report();
        assert_eq!(report.summary.units, 4);
        assert_eq!(report.summary.total_errors(), 0);
        assert!(report.summary.totals.outcome(Outcome::Failed) > 0);

        let strict = GateRuleSet::default().with_rule(GateRule::MaxFailedTotal { limit: 0 });
        let verdict = evaluate_gate(&strict, &report.summary);
        assert!(!verdict.passed());

        let json_path = dir.path().join("report.json");
        let md_path = dir.path().join("summary.md");
        write_artifacts(report, Some(&verdict), Some(&json_path), Some(&md_path)).unwrap();
        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(written["summary"]["units"], 4);
        assert!(std::fs::read_to_string(&md_path).unwrap().contains("## Gate"));

        assert!(check_outcome(&outcome, Some(&verdict)).is_err());
        assert!(check_outcome(&outcome, None).is_ok());
    }

    #[test]
    fn gate_selection() {
        assert!(load_gate(None, true).unwrap().is_none());
        assert_eq!(load_gate(None, false).unwrap(), Some(GateRuleSet::standard()));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.json");
        std::fs::write(
            &path,
            r#"{"fail_fast": true, "rules": [{"type": "max_failed_total", "limit": 3}]}"#,
        )
        .unwrap();
        let gate = load_gate(Some(&path), false).unwrap().unwrap();
        assert!(gate.fail_fast);
        assert_eq!(gate.rules, vec![GateRule::MaxFailedTotal { limit: 3 }]);
    }
}
