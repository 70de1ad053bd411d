use super::descriptor::TestCaseDescriptor;
use super::traits::ExecutableLocator;
use crate::common::CasePaths;
use crate::domain::{FarmError, FarmResult};
use tracing::{error, info};

pub const EXECUTABLE_FAMILY: &str = "gap";
pub const PARALLEL_MARKER: &str = "-mpi";
pub const EXECUTABLE_EXTENSION: &str = ".x";
pub const INIT_SUFFIX: &str = "_init";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRequest<'a> {
    pub gap_version: &'a str,
    pub gap_suffix: Option<&'a str>,
    pub nprocs: Option<usize>,
    pub dry: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub init_executable: String,
    pub compute_executable: String,
    pub nprocs: usize,
    pub nkp: usize,
    pub paths: CasePaths,
}

impl ExecutionPlan {
    pub fn uses_mpi(&self) -> bool {
        self.nprocs > 1
    }
}

/// Smallest candidate that satisfies the request, or the smallest candidate
/// when the request exceeds all of them. Without a request, the largest.
pub fn resolve_nprocs(candidates: &[usize], requested: Option<usize>) -> usize {
    let mut sorted = candidates.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let Some(&smallest) = sorted.last() else {
        return 1;
    };
    match requested {
        None => sorted[0],
        Some(requested) => sorted
            .iter()
            .rev()
            .copied()
            .find(|candidate| *candidate >= requested)
            .unwrap_or(smallest),
    }
}

/// `gap<version>[-mpi][-<suffix>].x`
pub fn compute_executable_name(version: &str, nprocs: usize, suffix: Option<&str>) -> String {
    let mut name = format!("{EXECUTABLE_FAMILY}{version}");
    if nprocs > 1 {
        name.push_str(PARALLEL_MARKER);
    }
    if let Some(suffix) = suffix.filter(|suffix| !suffix.is_empty()) {
        name.push('-');
        name.push_str(suffix);
    }
    name.push_str(EXECUTABLE_EXTENSION);
    name
}

/// `gap<version>_init`
pub fn init_executable_name(version: &str) -> String {
    format!("{EXECUTABLE_FAMILY}{version}{INIT_SUFFIX}")
}

/// Positive k-point count, or the unsupported-configuration error explaining why not.
pub fn resolve_nkp(descriptor: &TestCaseDescriptor) -> FarmResult<usize> {
    if let Some(nkp) = descriptor
        .gap
        .nkp
        .and_then(|nkp| usize::try_from(nkp).ok())
        .filter(|nkp| *nkp > 0)
    {
        return Ok(nkp);
    }
    let message = if descriptor.gap.kmesh_gw.is_some() {
        "manual k-mesh from 'kmesh_gw' is not supported; set a positive 'nkp'"
    } else {
        "'gap.nkp' must be a positive k-point count"
    };
    Err(FarmError::unsupported("INPUT.KMESH_UNSUPPORTED", message))
}

pub fn plan_execution(
    descriptor: &TestCaseDescriptor,
    paths: &CasePaths,
    request: &PlanRequest<'_>,
    locator: &dyn ExecutableLocator,
) -> FarmResult<ExecutionPlan> {
    let nkp = resolve_nkp(descriptor)?;
    let candidates = descriptor.gap.nprocs.candidates();
    let nprocs = resolve_nprocs(&candidates, request.nprocs);
    let compute_executable =
        compute_executable_name(request.gap_version, nprocs, request.gap_suffix);
    info!(
        ">> process count {} from candidates {:?} (requested {:?})",
        nprocs, candidates, request.nprocs
    );

    if !request.dry {
        require_executable(locator, &compute_executable, "gap.x", request.gap_version)?;
    }

    Ok(ExecutionPlan {
        init_executable: init_executable_name(request.gap_version),
        compute_executable,
        nprocs,
        nkp,
        paths: paths.clone(),
    })
}

pub fn require_executable(
    locator: &dyn ExecutableLocator,
    executable: &str,
    role: &str,
    version: &str,
) -> FarmResult<()> {
    if locator.is_available(executable) {
        return Ok(());
    }
    let message = format!("{} for version {} is not found: {}", role, version, executable);
    error!("{}", message);
    Err(FarmError::executable_not_found("RUN.EXECUTABLE_NOT_FOUND", message))
}
