//! End-to-end runs: load, profile, transform, check, save, reflect and report.
//!
//! A [`RunRequest`] is planned into an ordered list of [`PlannedStep`]s, which [`run`] executes
//! one by one, collecting a markdown report along the way:
//!
//! 1. `LoadInput`, then `LoadAux` for every auxiliary dataset (available to joins by name)
//! 2. `ProfileInput`
//! 3. `Transform` when a non-empty recipe is given
//! 4. `QualityCheck` when a non-empty rule set is given
//! 5. `Save` when an output path is given
//! 6. `ProfileOutput`
//! 7. `Report`: reflection, then the markdown report
//!
//! When [`RunRequest::workspace_root`] is set, every path must resolve inside it; otherwise the
//! run is rejected with [`RunError::OutsideWorkspace`] before anything is read or written.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::{ConfigError, OutputError, RunError};
use crate::ingestion::{self, IngestionOptions, TracingObserver};
use crate::output;
use crate::pipeline::{Pipeline, PipelineObserver};
use crate::profile::{self, DataProfile, DEFAULT_MAX_CATEGORIES};
use crate::quality::{self, DqReport, RuleSet};
use crate::recipe::Recipe;
use crate::types::DataSet;

/// Title used when a request does not name its report.
pub const DEFAULT_REPORT_TITLE: &str = "DataOps Run";

/// Everything a run needs. Deserializable from JSON/YAML with [`RunRequest::from_path`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunRequest {
    /// Free-text description of what the run is for; logged, not interpreted.
    #[serde(default)]
    pub goal: String,
    /// Primary dataset.
    pub input: PathBuf,
    /// Auxiliary datasets by name, usable as join right-hand sides.
    #[serde(default)]
    pub aux: IndexMap<String, PathBuf>,
    #[serde(default)]
    pub recipe: Option<Recipe>,
    #[serde(default)]
    pub rules: Option<RuleSet>,
    /// Where to save the resulting dataset (`.csv` or `.json`).
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Directory the markdown report is written to. Without it the report is only returned.
    #[serde(default)]
    pub report_dir: Option<PathBuf>,
    #[serde(default = "default_report_title")]
    pub report_title: String,
    /// Confine every path of the run to this directory.
    #[serde(default)]
    pub workspace_root: Option<PathBuf>,
    /// `top_values` kept per non-numeric column in profiles.
    #[serde(default = "default_max_categories")]
    pub max_categories: usize,
}

fn default_report_title() -> String {
    DEFAULT_REPORT_TITLE.to_string()
}

fn default_max_categories() -> usize {
    DEFAULT_MAX_CATEGORIES
}

impl RunRequest {
    /// A request that only loads and profiles `input`.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            goal: String::new(),
            input: input.into(),
            aux: IndexMap::new(),
            recipe: None,
            rules: None,
            output: None,
            report_dir: None,
            report_title: default_report_title(),
            workspace_root: None,
            max_categories: DEFAULT_MAX_CATEGORIES,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        config::from_path(path)
    }

    /// Resolve `path` against the workspace root, if one is configured.
    fn resolve(&self, path: &Path) -> Result<PathBuf, RunError> {
        let Some(root) = &self.workspace_root else {
            return Ok(path.to_path_buf());
        };
        let outside = || RunError::OutsideWorkspace {
            path: path.to_path_buf(),
        };
        let root = normalize(root).ok_or_else(outside)?;
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        };
        match normalize(&joined) {
            Some(candidate) if candidate.starts_with(&root) => Ok(candidate),
            _ => Err(outside()),
        }
    }
}

/// Lexically normalize `path`; `None` when `..` climbs above its start.
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    return None;
                }
                out.pop();
            }
            other => out.push(other),
        }
    }
    Some(out)
}

/// One step of a run plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PlannedStep {
    LoadInput { path: PathBuf },
    LoadAux { name: String, path: PathBuf },
    ProfileInput,
    Transform,
    QualityCheck,
    Save { path: PathBuf },
    ProfileOutput,
    Report { title: String },
}

impl PlannedStep {
    pub fn name(&self) -> &'static str {
        match self {
            PlannedStep::LoadInput { .. } => "load_input",
            PlannedStep::LoadAux { .. } => "load_aux",
            PlannedStep::ProfileInput => "profile_input",
            PlannedStep::Transform => "transform",
            PlannedStep::QualityCheck => "quality_check",
            PlannedStep::Save { .. } => "save",
            PlannedStep::ProfileOutput => "profile_output",
            PlannedStep::Report { .. } => "report",
        }
    }
}

/// Plan the steps of `request`, in execution order.
pub fn plan(request: &RunRequest) -> Vec<PlannedStep> {
    let mut steps = vec![PlannedStep::LoadInput {
        path: request.input.clone(),
    }];
    steps.extend(request.aux.iter().map(|(name, path)| PlannedStep::LoadAux {
        name: name.clone(),
        path: path.clone(),
    }));
    steps.push(PlannedStep::ProfileInput);
    if request.recipe.as_ref().is_some_and(|r| !r.is_empty()) {
        steps.push(PlannedStep::Transform);
    }
    if request.rules.as_ref().is_some_and(|r| !r.is_empty()) {
        steps.push(PlannedStep::QualityCheck);
    }
    if let Some(path) = &request.output {
        steps.push(PlannedStep::Save { path: path.clone() });
    }
    steps.push(PlannedStep::ProfileOutput);
    steps.push(PlannedStep::Report {
        title: request.report_title.clone(),
    });
    steps
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    pub steps: Vec<PlannedStep>,
    #[serde(skip)]
    pub output: DataSet,
    /// Present when a quality check ran.
    pub dq_report: Option<DqReport>,
    pub saved_to: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
    pub report_markdown: String,
    pub reflection_ok: bool,
    pub reflection_issues: Vec<String>,
    pub input_profile: Option<DataProfile>,
    pub output_profile: Option<DataProfile>,
}

/// Review a finished run; returns whether it passed and the problems found.
///
/// A run fails when requested quality checks did not pass, or when it saved a dataset with
/// no rows.
pub fn reflect(outcome: &RunOutcome) -> (bool, Vec<String>) {
    let mut issues = Vec::new();
    if outcome.dq_report.as_ref().is_some_and(|r| !r.passed()) {
        issues.push("DQ checks failed.".to_string());
    }
    if outcome.saved_to.is_some() && outcome.output.row_count() == 0 {
        issues.push("Output has zero rows.".to_string());
    }
    (issues.is_empty(), issues)
}

/// Execute `request`. `observer` receives the transform's pipeline events.
///
/// Quality violations and reflection issues are reported in the outcome, not as errors.
pub fn run(
    request: &RunRequest,
    observer: Option<Arc<dyn PipelineObserver>>,
) -> Result<RunOutcome, RunError> {
    let input = request.resolve(&request.input)?;
    let aux = request
        .aux
        .iter()
        .map(|(name, path)| Ok((name.clone(), request.resolve(path)?)))
        .collect::<Result<Vec<_>, RunError>>()?;
    let output_path = request.output.as_deref().map(|p| request.resolve(p)).transpose()?;
    let report_path = request
        .report_dir
        .as_deref()
        .map(|p| -> Result<PathBuf, RunError> {
            Ok(request.resolve(p)?.join(report_file_name(&request.report_title)?))
        })
        .transpose()?;

    let steps = plan(request);
    tracing::info!(goal = %request.goal, steps = steps.len(), "run planned");

    let options = IngestionOptions {
        observer: Some(Arc::new(TracingObserver)),
        ..IngestionOptions::default()
    };
    let mut pipeline = Pipeline::new();
    if let Some(o) = observer {
        pipeline = pipeline.with_observer(o);
    }

    let mut report = Report::new(&request.report_title);
    let mut source = DataSet::default();
    let mut right: HashMap<String, DataSet> = HashMap::new();
    let mut outcome = RunOutcome {
        steps: steps.clone(),
        output: DataSet::default(),
        dq_report: None,
        saved_to: None,
        report_path: None,
        report_markdown: String::new(),
        reflection_ok: false,
        reflection_issues: Vec::new(),
        input_profile: None,
        output_profile: None,
    };

    for step in &steps {
        tracing::info!(step = step.name(), "run step");
        match step {
            PlannedStep::LoadInput { path } => {
                source = ingestion::ingest_inferred(&input, &options)?;
                outcome.output = source.clone();
                report.section(
                    "Loaded Input",
                    format!("Rows: {}  |  Path: {}", source.row_count(), path.display()),
                );
            }
            PlannedStep::LoadAux { name, path } => {
                let resolved = aux
                    .iter()
                    .find(|(n, _)| n == name)
                    .map_or(path.as_path(), |(_, p)| p.as_path());
                let ds = ingestion::ingest_inferred(resolved, &options)?;
                report.section(
                    &format!("Loaded {name}"),
                    format!("Rows: {}  |  Path: {}", ds.row_count(), path.display()),
                );
                right.insert(name.clone(), ds);
            }
            PlannedStep::ProfileInput => {
                let p = profile::profile(&source, request.max_categories);
                report.section("Input Profile", pretty_json(&p)?);
                outcome.input_profile = Some(p);
            }
            PlannedStep::Transform => {
                if let Some(recipe) = &request.recipe {
                    outcome.output = pipeline.apply(&source, recipe, &right)?;
                    report.section("Transform", "Applied recipe successfully.".to_string());
                }
            }
            PlannedStep::QualityCheck => {
                if let Some(rules) = &request.rules {
                    let dq = quality::check(&outcome.output, rules);
                    let body = if dq.passed() {
                        "OK".to_string()
                    } else {
                        format!("Issues:\n{}", bullets(&dq.messages()))
                    };
                    report.section("Data Quality", body);
                    outcome.dq_report = Some(dq);
                }
            }
            PlannedStep::Save { path } => {
                if let Some(resolved) = &output_path {
                    output::write_to_path(&outcome.output, resolved)?;
                    report.section("Save", format!("Saved to {}", path.display()));
                    outcome.saved_to = Some(resolved.clone());
                }
            }
            PlannedStep::ProfileOutput => {
                let p = profile::profile(&outcome.output, request.max_categories);
                report.section("Output Profile", pretty_json(&p)?);
                outcome.output_profile = Some(p);
            }
            PlannedStep::Report { .. } => {
                let (ok, issues) = reflect(&outcome);
                let listed = if ok {
                    "None".to_string()
                } else {
                    format!("\n{}", bullets(&issues))
                };
                report.section("Reflection", format!("Pass: {ok}\nIssues: {listed}"));
                outcome.reflection_ok = ok;
                outcome.reflection_issues = issues;

                outcome.report_markdown = report.render();
                if let Some(path) = &report_path {
                    write_report(path, &outcome.report_markdown)?;
                    outcome.report_path = Some(path.clone());
                }
            }
        }
    }

    tracing::info!(
        rows = outcome.output.row_count(),
        reflection_ok = outcome.reflection_ok,
        "run finished"
    );
    Ok(outcome)
}

/// `{title}.md` with spaces as underscores; the title must name a single plain file.
fn report_file_name(title: &str) -> Result<String, RunError> {
    let name = format!("{}.md", title.replace(' ', "_"));
    let mut components = Path::new(&name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(file)), None)
            if file == OsStr::new(&name) && !name.contains(['/', '\\']) =>
        {
            Ok(name)
        }
        _ => Err(RunError::InvalidReportTitle {
            title: title.to_string(),
        }),
    }
}

fn bullets(lines: &[String]) -> String {
    lines
        .iter()
        .map(|l| format!("- {l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn pretty_json(profile: &DataProfile) -> Result<String, RunError> {
    serde_json::to_string_pretty(profile).map_err(|e| RunError::Output(OutputError::Json(e)))
}

fn write_report(path: &Path, markdown: &str) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, markdown)?;
    Ok(())
}

/// Markdown report: a `#` title followed by `##` sections.
#[derive(Debug)]
struct Report {
    title: String,
    sections: Vec<(String, String)>,
}

impl Report {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            sections: Vec::new(),
        }
    }

    fn section(&mut self, heading: &str, body: String) {
        self.sections.push((heading.to_string(), body));
    }

    fn render(&self) -> String {
        let mut lines = vec![format!("# {}", self.title), String::new()];
        lines.extend(
            self.sections
                .iter()
                .map(|(heading, body)| format!("## {heading}\n\n{body}\n")),
        );
        lines.join("\n")
    }
}
