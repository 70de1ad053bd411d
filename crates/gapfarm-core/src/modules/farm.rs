use super::descriptor::load_descriptor;
use super::discovery::{SelectionRequest, discover_cases, select_cases};
use super::planner::PlanRequest;
use super::runner::{CaseReport, CaseRunner, normalize_path};
use super::traits::{ExecutableLocator, ProcessInvoker};
use crate::common::FarmLayout;
use crate::common::environment::scf_package_version;
use crate::domain::{FarmError, FarmResult, InitMode, TestCaseIdentity};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct FarmConfig {
    pub layout: FarmLayout,
    pub gap_version: String,
    pub gap_suffix: Option<String>,
    pub nprocs: Option<usize>,
    pub dry: bool,
    pub force_restart: bool,
    pub init_mode: InitMode,
    pub selection: SelectionRequest,
    pub report_path: Option<PathBuf>,
}

impl FarmConfig {
    pub fn new(layout: FarmLayout, gap_version: impl Into<String>) -> Self {
        Self {
            layout,
            gap_version: gap_version.into(),
            gap_suffix: None,
            nprocs: None,
            dry: false,
            force_restart: false,
            init_mode: InitMode::Disabled,
            selection: SelectionRequest::default(),
            report_path: None,
        }
    }

    fn plan_request(&self) -> PlanRequest<'_> {
        PlanRequest {
            gap_version: &self.gap_version,
            gap_suffix: self.gap_suffix.as_deref(),
            nprocs: self.nprocs,
            dry: self.dry,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FarmReport {
    pub generated_at_unix_seconds: u64,
    pub passed: bool,
    pub gap_version: String,
    pub scf_package_version: Option<String>,
    pub dry: bool,
    pub init_mode: &'static str,
    pub case_count: usize,
    pub completed_case_count: usize,
    pub failed_case_count: usize,
    pub skipped_case_count: usize,
    pub cases: Vec<CaseReport>,
}

#[derive(Debug, thiserror::Error)]
pub enum FarmReportError {
    #[error("failed to create report directory '{}': {source}", path.display())]
    ReportDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize report '{}': {source}", path.display())]
    SerializeReport {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write report '{}': {source}", path.display())]
    WriteReport {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<FarmReportError> for FarmError {
    fn from(error: FarmReportError) -> Self {
        let message = error.to_string();
        match error {
            FarmReportError::SerializeReport { .. } => {
                FarmError::internal("SYS.REPORT_SERIALIZE", message)
            }
            FarmReportError::ReportDirectory { .. } | FarmReportError::WriteReport { .. } => {
                FarmError::io_system("IO.REPORT_WRITE", message)
            }
        }
    }
}

/// Discovered cases that the selection keeps, in discovery order. Touches nothing.
pub fn preview_cases(config: &FarmConfig) -> FarmResult<Vec<TestCaseIdentity>> {
    let all = discover_cases(&config.layout.init_dir)?;
    select_cases(&all, &config.selection)
}

pub fn render_preview(cases: &[TestCaseIdentity]) -> String {
    let mut lines = vec!["Preview mode:".to_string()];
    lines.extend(
        cases
            .iter()
            .map(|case| format!("{:3}: {}", case.ordinal, case.tcname())),
    );
    lines.join("\n")
}

/// Initializes or runs every selected case in order.
///
/// Only discovery and selection errors abort the batch; each case's own
/// problems end up on its [`CaseReport`].
pub fn run_farm(
    config: &FarmConfig,
    invoker: &dyn ProcessInvoker,
    locator: &dyn ExecutableLocator,
) -> FarmResult<FarmReport> {
    let scf_package_version = scf_package_version();
    if let Some(version) = &scf_package_version {
        info!("SCF package version: {}", version);
    }

    let cases = preview_cases(config)?;
    let request = config.plan_request();
    let mut reports = Vec::with_capacity(cases.len());
    for identity in &cases {
        info!("Found test: {}", identity);
        reports.push(run_case(config, identity, &request, invoker, locator));
    }

    let case_count = reports.len();
    let failed_case_count = reports.iter().filter(|case| case.is_failed()).count();
    let skipped_case_count = reports.iter().filter(|case| case.is_skipped()).count();
    let report = FarmReport {
        generated_at_unix_seconds: current_unix_timestamp_seconds(),
        passed: failed_case_count == 0,
        gap_version: config.gap_version.clone(),
        scf_package_version,
        dry: config.dry,
        init_mode: init_mode_name(config.init_mode),
        case_count,
        completed_case_count: case_count - failed_case_count - skipped_case_count,
        failed_case_count,
        skipped_case_count,
        cases: reports,
    };

    if let Some(path) = &config.report_path {
        write_report_file(path, &report)?;
    }
    Ok(report)
}

fn run_case(
    config: &FarmConfig,
    identity: &TestCaseIdentity,
    request: &PlanRequest<'_>,
    invoker: &dyn ProcessInvoker,
    locator: &dyn ExecutableLocator,
) -> CaseReport {
    let descriptor = match load_descriptor(&identity.descriptor_path) {
        Ok(descriptor) => descriptor,
        Err(failure) => {
            let failure = FarmError::from(failure);
            error!("test case {} skipped at load: {}", identity, failure);
            return CaseReport::skipped(identity, &failure);
        }
    };
    let paths = config.layout.case_paths(identity, &descriptor.casename);
    let mut runner = CaseRunner::new(identity, &descriptor, paths, invoker, locator)
        .with_init_mode(config.init_mode)
        .with_force_restart(config.force_restart);
    runner.init(&config.gap_version, config.dry);
    runner.run(request);
    runner.into_report()
}

pub fn render_human_summary(report: &FarmReport) -> String {
    let mut lines = Vec::new();
    let status = if report.passed { "PASS" } else { "FAIL" };
    lines.push(format!("Farm status: {}", status));
    lines.push(format!(
        "Cases: {} total ({} completed, {} failed, {} skipped)",
        report.case_count,
        report.completed_case_count,
        report.failed_case_count,
        report.skipped_case_count
    ));

    for case in &report.cases {
        lines.push(format!("{:3}: {} {}", case.ordinal, case.tcname, case.state));
        if let Some(reason) = &case.skip_reason {
            lines.push(format!("  skipped: {}", reason));
        }
        if let Some(first_failure) = case.failures.first() {
            lines.push(format!(
                "  first failure: {} ({})",
                first_failure.step, first_failure.message
            ));
        }
    }

    lines.join("\n")
}

fn write_report_file(report_path: &Path, report: &FarmReport) -> Result<(), FarmReportError> {
    if let Some(parent_dir) = report_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent_dir).map_err(|source| FarmReportError::ReportDirectory {
            path: parent_dir.to_path_buf(),
            source,
        })?;
    }

    let report_json =
        serde_json::to_string_pretty(report).map_err(|source| FarmReportError::SerializeReport {
            path: report_path.to_path_buf(),
            source,
        })?;
    fs::write(report_path, report_json).map_err(|source| FarmReportError::WriteReport {
        path: report_path.to_path_buf(),
        source,
    })?;
    info!("JSON report written to {}", normalize_path(report_path));
    Ok(())
}

const fn init_mode_name(init_mode: InitMode) -> &'static str {
    match init_mode {
        InitMode::Disabled => "none",
        InitMode::Full => "full",
        InitMode::GapOnly => "gap",
    }
}

fn current_unix_timestamp_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}
