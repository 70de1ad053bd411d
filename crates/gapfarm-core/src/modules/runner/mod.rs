//! Per-case lifecycle: structure staging, SCF and preprocessing in init
//! mode, and the compute run with workspace linking and tmp cleanup.
//!
//! External process failures are recorded on the [`CaseReport`] and never
//! propagated; the farm loop moves on to the next case either way.

use super::descriptor::{TestCaseDescriptor, value_to_arg};
use super::planner::{ExecutionPlan, PlanRequest, init_executable_name, plan_execution};
use super::planner::{require_executable, resolve_nkp};
use super::process::Invocation;
use super::traits::{ExecutableLocator, ProcessInvoker};
use super::workspace::{Workspace, cleanup_tmp, prepare_workspace, stage_structure};
use crate::common::CasePaths;
use crate::common::constants::{MPI_LAUNCHER, TMP_CLEANUP_EXTENSIONS};
use crate::domain::{CaseState, FarmError, FarmResult, InitMode, TestCaseIdentity};
use serde::Serialize;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

pub const SCF_INIT_EXECUTABLE: &str = "init_lapw";
pub const SCF_RUN_EXECUTABLE: &str = "run_lapw";
pub const SCF_RUN_SP_EXECUTABLE: &str = "runsp_lapw";
pub const RUN_LOG_PREFIX: &str = "gap-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub step: String,
    pub placeholder: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseReport {
    pub tcname: String,
    pub ordinal: usize,
    pub state: CaseState,
    pub skip_reason: Option<String>,
    pub failures: Vec<StepFailure>,
    pub log_path: Option<String>,
    pub removed_tmp_files: usize,
}

impl CaseReport {
    pub fn new(identity: &TestCaseIdentity) -> Self {
        Self {
            tcname: identity.tcname(),
            ordinal: identity.ordinal,
            state: CaseState::Uninitialized,
            skip_reason: None,
            failures: Vec::new(),
            log_path: None,
            removed_tmp_files: 0,
        }
    }

    /// Report for a case that never got a runner, e.g. an unloadable descriptor.
    pub fn skipped(identity: &TestCaseIdentity, reason: &FarmError) -> Self {
        Self {
            state: CaseState::Skipped,
            skip_reason: Some(reason.to_string()),
            ..Self::new(identity)
        }
    }

    pub fn is_failed(&self) -> bool {
        self.state == CaseState::Failed
    }

    pub fn is_skipped(&self) -> bool {
        self.state == CaseState::Skipped
    }
}

pub struct CaseRunner<'a> {
    identity: &'a TestCaseIdentity,
    descriptor: &'a TestCaseDescriptor,
    paths: CasePaths,
    init_mode: InitMode,
    force_restart: bool,
    invoker: &'a dyn ProcessInvoker,
    locator: &'a dyn ExecutableLocator,
    report: CaseReport,
}

impl<'a> CaseRunner<'a> {
    pub fn new(
        identity: &'a TestCaseIdentity,
        descriptor: &'a TestCaseDescriptor,
        paths: CasePaths,
        invoker: &'a dyn ProcessInvoker,
        locator: &'a dyn ExecutableLocator,
    ) -> Self {
        Self {
            identity,
            descriptor,
            paths,
            init_mode: InitMode::Disabled,
            force_restart: false,
            invoker,
            locator,
            report: CaseReport::new(identity),
        }
    }

    pub fn with_init_mode(mut self, init_mode: InitMode) -> Self {
        self.init_mode = init_mode;
        self
    }

    pub fn with_force_restart(mut self, force_restart: bool) -> Self {
        self.force_restart = force_restart;
        self
    }

    pub fn state(&self) -> CaseState {
        self.report.state
    }

    pub fn report(&self) -> &CaseReport {
        &self.report
    }

    pub fn into_report(self) -> CaseReport {
        self.report
    }

    /// Prepares SCF and preprocessing inputs. Does nothing outside init mode.
    pub fn init(&mut self, gap_version: &str, dry: bool) {
        if !self.init_mode.is_enabled() || self.report.state.is_terminal() {
            return;
        }
        if let Err(error) = self.try_init(gap_version, dry) {
            self.absorb("init", error);
        }
        self.finalize();
    }

    /// Runs the compute executable in a fresh workspace. Does nothing in init mode.
    pub fn run(&mut self, request: &PlanRequest<'_>) {
        if self.init_mode.is_enabled() || self.report.state.is_terminal() {
            return;
        }
        if let Err(error) = self.try_run(request) {
            self.absorb("run", error);
        }
        self.finalize();
    }

    fn try_init(&mut self, gap_version: &str, dry: bool) -> FarmResult<()> {
        let gap_init = init_executable_name(gap_version);
        if !dry {
            require_executable(self.locator, &gap_init, "gap_init", gap_version)?;
        }
        stage_structure(&self.paths)?;
        self.advance(CaseState::StructPrepared);
        if dry {
            return Ok(());
        }

        // all commands are built before any of them runs
        let scf_steps = if self.init_mode.includes_scf() {
            Some((self.scf_init_invocation()?, self.scf_run_invocation()?))
        } else {
            None
        };
        let gap_init = self.gap_init_invocation(&gap_init)?;

        if let Some((init_lapw, run_scf)) = scf_steps {
            let initialized = self.run_step("init_lapw", &init_lapw);
            let converged = self.run_step("scf", &run_scf);
            if initialized && converged {
                self.advance(CaseState::ScfDone);
            }
        }
        if self.run_step("gap_init", &gap_init) {
            self.advance(CaseState::Preprocessed);
        }
        Ok(())
    }

    fn try_run(&mut self, request: &PlanRequest<'_>) -> FarmResult<()> {
        let plan = plan_execution(self.descriptor, &self.paths, request, self.locator)?;
        let workspace =
            prepare_workspace(&plan.paths, &self.descriptor.casename, self.force_restart)?;
        self.advance(CaseState::Linked);
        if request.dry {
            info!(
                "> dry run for case {}: would run {}",
                self.identity,
                compute_invocation(&plan, &workspace.root).command_line()
            );
            self.advance(CaseState::Finished);
            return Ok(());
        }

        let log_path = workspace.root.join(run_log_file_name());
        let invocation = compute_invocation(&plan, &workspace.root).log_to(&log_path);
        self.report.log_path = Some(normalize_path(&log_path));
        self.advance(CaseState::Running);
        info!("> begin to run case: {}", self.identity);
        info!(">> command {}", invocation.command_line());

        let launched = match self.invoker.invoke(&invocation) {
            Ok(_) => {
                info!("> finished case successfully: {}", self.identity);
                true
            }
            Err(failure) => {
                let launched = failure.was_launched();
                error!("> fail for case: {}", self.identity);
                self.record_failure("gap", FarmError::from(failure));
                launched
            }
        };
        if launched {
            self.cleanup(&workspace);
        }
        if self.report.failures.is_empty() {
            self.advance(CaseState::Finished);
        }
        Ok(())
    }

    fn cleanup(&mut self, workspace: &Workspace) {
        info!("> clean up large files in tmp");
        match cleanup_tmp(&workspace.root, &TMP_CLEANUP_EXTENSIONS) {
            Ok(removed) => {
                for path in &removed {
                    debug!(">> removed {}", path.display());
                }
                self.report.removed_tmp_files = removed.len();
            }
            Err(failure) => self.record_failure("cleanup", FarmError::from(failure)),
        }
    }

    fn scf_init_invocation(&self) -> FarmResult<Invocation> {
        let scf = &self.descriptor.scf;
        let mut invocation = Invocation::new(SCF_INIT_EXECUTABLE, &self.paths.wien_dir)
            .args(["-b", "-rkmax"])
            .arg(format!("{:?}", self.descriptor.rkmax));
        for (flag, value) in [("-ecut", scf.ecut()), ("-vxc", scf.vxc())] {
            if let Some(value) = value {
                invocation = invocation.arg(flag).arg(value_to_arg(value));
            }
        }
        if self.descriptor.is_sp {
            invocation = invocation.arg("-sp");
        }
        let numk = scf.numk().ok_or_else(|| {
            FarmError::unsupported(
                "INPUT.SCF_KMESH_UNSUPPORTED",
                "manual k-mesh is not supported; set 'scf.numk'",
            )
        })?;
        Ok(invocation.arg("-numk").arg(value_to_arg(numk)))
    }

    fn scf_run_invocation(&self) -> FarmResult<Invocation> {
        let scf = &self.descriptor.scf;
        let program = match scf.exe() {
            Some(exe) => exe,
            None if self.descriptor.is_sp => SCF_RUN_SP_EXECUTABLE,
            None => SCF_RUN_EXECUTABLE,
        };
        let ec = scf.ec().ok_or_else(|| {
            FarmError::missing_field(
                "INPUT.SCF_CONVERGENCE",
                "'scf.ec' is required to run the SCF cycle",
            )
        })?;
        Ok(Invocation::new(program, &self.paths.wien_dir)
            .arg("-ec")
            .arg(format!("{ec:15.12}")))
    }

    fn gap_init_invocation(&self, gap_init: &str) -> FarmResult<Invocation> {
        let nkp = resolve_nkp(self.descriptor)?;
        let mut invocation = Invocation::new(gap_init, &self.paths.wien_dir)
            .arg("-d")
            .arg(self.paths.gap_dir.to_string_lossy())
            .arg("-t")
            .arg(self.descriptor.task.as_str())
            .arg("-nkp")
            .arg(nkp.to_string());
        // spin-unpolarized GW on top of a spin-polarized SCF
        if self.descriptor.is_sp {
            invocation = invocation.args(["-s", "1"]);
        }
        for (key, value) in &self.descriptor.gap.passthrough {
            invocation = invocation.arg(format!("-{key}")).arg(value_to_arg(value));
        }
        Ok(invocation)
    }

    fn run_step(&mut self, step: &'static str, invocation: &Invocation) -> bool {
        info!(">> {} with {}", step, invocation.command_line());
        match self.invoker.invoke(invocation) {
            Ok(_) => true,
            Err(failure) => {
                self.record_failure(step, FarmError::from(failure));
                false
            }
        }
    }

    fn record_failure(&mut self, step: &str, failure: FarmError) {
        error!("fail to run {} for {}: {}", step, self.identity, failure);
        self.report.failures.push(StepFailure {
            step: step.to_string(),
            placeholder: failure.placeholder().to_string(),
            message: failure.message().to_string(),
        });
    }

    fn absorb(&mut self, step: &str, failure: FarmError) {
        if !failure.category().skips_case() {
            self.record_failure(step, failure);
            return;
        }
        if failure.category().is_warning() {
            warn!("test case {} skipped: {}", self.identity, failure.message());
        } else {
            error!("test case {} skipped at {}: {}", self.identity, step, failure);
        }
        self.report.skip_reason = Some(failure.to_string());
        self.advance(CaseState::Skipped);
    }

    fn finalize(&mut self) {
        if !self.report.failures.is_empty() && !self.report.state.is_terminal() {
            self.advance(CaseState::Failed);
        }
    }

    fn advance(&mut self, next: CaseState) {
        let current = self.report.state;
        if !current.can_advance_to(next) {
            warn!(
                "ignoring illegal transition {} -> {} for {}",
                current, next, self.identity
            );
            return;
        }
        debug!("{}: {} -> {}", self.identity, current, next);
        self.report.state = next;
    }
}

/// The compute command, wrapped in the MPI launcher for parallel plans.
pub fn compute_invocation(plan: &ExecutionPlan, workspace: &Path) -> Invocation {
    if plan.uses_mpi() {
        Invocation::new(MPI_LAUNCHER, workspace)
            .arg("-np")
            .arg(plan.nprocs.to_string())
            .arg(plan.compute_executable.as_str())
    } else {
        Invocation::new(plan.compute_executable.as_str(), workspace)
    }
}

/// Unique per attempt so a forced restart never clobbers an earlier log.
pub fn run_log_file_name() -> String {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!(
        "{RUN_LOG_PREFIX}{}-{:09}.log",
        elapsed.as_secs(),
        elapsed.subsec_nanos()
    )
}

pub(crate) fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::{CaseRunner, RUN_LOG_PREFIX, run_log_file_name};
    use crate::common::FarmLayout;
    use crate::domain::{CaseState, InitMode, TestCaseIdentity};
    use crate::modules::descriptor::{TestCaseDescriptor, parse_descriptor};
    use crate::modules::planner::PlanRequest;
    use crate::modules::process::{Invocation, InvocationOutcome, ProcessError};
    use crate::modules::traits::{ExecutableLocator, ProcessInvoker};
    use serde_json::json;
    use std::cell::RefCell;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingInvoker {
        calls: RefCell<Vec<Invocation>>,
        failing: Vec<&'static str>,
    }

    impl RecordingInvoker {
        fn failing(programs: &[&'static str]) -> Self {
            Self {
                failing: programs.to_vec(),
                ..Self::default()
            }
        }

        fn programs(&self) -> Vec<String> {
            self.calls
                .borrow()
                .iter()
                .map(|call| call.program().to_string())
                .collect()
        }
    }

    impl ProcessInvoker for RecordingInvoker {
        fn invoke(&self, invocation: &Invocation) -> Result<InvocationOutcome, ProcessError> {
            self.calls.borrow_mut().push(invocation.clone());
            // compute runs leave intermediates behind in tmp/
            if invocation.log_path().is_some() {
                let tmp = invocation.working_dir().join("tmp");
                fs::create_dir_all(&tmp).expect("tmp should be created");
                fs::write(tmp.join("Si.eps_q1"), "eps").expect("tmp file should be written");
                fs::write(tmp.join("Si.sigx"), "sigx").expect("tmp file should be written");
            }
            if self.failing.iter().any(|program| *program == invocation.program()) {
                return Err(ProcessError::NonZeroExit {
                    command: invocation.command_line(),
                    status: "exit code 1".to_string(),
                });
            }
            Ok(InvocationOutcome::default())
        }
    }

    struct Everything;

    impl ExecutableLocator for Everything {
        fn locate(&self, executable: &str) -> Option<PathBuf> {
            Some(PathBuf::from("/opt/bin").join(executable))
        }
    }

    struct Nothing;

    impl ExecutableLocator for Nothing {
        fn locate(&self, _executable: &str) -> Option<PathBuf> {
            None
        }
    }

    struct Farm {
        temp: TempDir,
        layout: FarmLayout,
        identity: TestCaseIdentity,
    }

    impl Farm {
        fn new() -> Self {
            let temp = TempDir::new().expect("tempdir should be created");
            let layout = FarmLayout::new(temp.path());
            let identity = TestCaseIdentity {
                ordinal: 1,
                category: "semi".to_string(),
                basename: "1_Si".to_string(),
                index: 1,
                descriptor_path: temp.path().join("init/semi/1_Si.json"),
            };
            let farm = Self {
                temp,
                layout,
                identity,
            };
            let paths = farm.paths();
            fs::create_dir_all(&paths.gap_dir).expect("gap dir should be created");
            for name in ["Si.struct", "Si.vxc", "gw.inp"] {
                fs::write(paths.gap_dir.join(name), name).expect("input should be written");
            }
            fs::create_dir_all(&farm.layout.struct_dir).expect("struct pool should be created");
            fs::write(&paths.struct_file, "Si").expect("struct should be written");
            farm
        }

        fn paths(&self) -> crate::common::CasePaths {
            self.layout.case_paths(&self.identity, "Si")
        }
    }

    fn descriptor(extra_scf: serde_json::Value, gap: serde_json::Value) -> TestCaseDescriptor {
        let mut scf = json!({"ecut": -6.0, "vxc": 13, "numk": 1000, "ec": 0.0001});
        if let (Some(scf), Some(extra)) = (scf.as_object_mut(), extra_scf.as_object()) {
            for (key, value) in extra {
                scf.insert(key.clone(), value.clone());
            }
        }
        let value = json!({
            "casename": "Si", "rkmax": 7.0, "is_sp": false, "task": "gw",
            "scf": scf, "gap": gap
        });
        parse_descriptor(&value.to_string(), Path::new("1_Si.json")).expect("descriptor")
    }

    fn request(dry: bool) -> PlanRequest<'static> {
        PlanRequest {
            gap_version: "2e",
            gap_suffix: None,
            nprocs: None,
            dry,
        }
    }

    #[test]
    fn dry_run_links_inputs_without_invoking_anything() {
        let farm = Farm::new();
        let descriptor = descriptor(json!({}), json!({"nkp": 8, "nprocs": 1}));
        let invoker = RecordingInvoker::default();
        let mut runner =
            CaseRunner::new(&farm.identity, &descriptor, farm.paths(), &invoker, &Nothing);

        runner.run(&request(true));

        assert!(invoker.calls.borrow().is_empty());
        assert_eq!(runner.state(), CaseState::Finished);
        let workspace = farm.paths().workspace;
        assert!(workspace.join("Si.struct").is_symlink());
        assert!(workspace.join("Si.vxc").is_symlink());
        assert!(workspace.join("gw.inp").is_symlink());
        assert!(!workspace.join("Si.core").exists());
    }

    #[test]
    fn serial_run_logs_to_workspace_and_cleans_tmp() {
        let farm = Farm::new();
        let descriptor = descriptor(json!({}), json!({"nkp": 8, "nprocs": 1}));
        let invoker = RecordingInvoker::default();
        let mut runner =
            CaseRunner::new(&farm.identity, &descriptor, farm.paths(), &invoker, &Everything);

        runner.run(&request(false));

        let calls = invoker.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].command_line(), "gap2e.x");
        assert_eq!(calls[0].working_dir(), farm.paths().workspace);
        let report = runner.report();
        assert_eq!(report.state, CaseState::Finished);
        assert_eq!(report.removed_tmp_files, 1);
        assert!(report.log_path.as_deref().is_some_and(|path| path.contains("/gap-")));
        assert!(farm.paths().workspace.join("tmp/Si.sigx").exists());
    }

    #[test]
    fn parallel_run_is_wrapped_in_mpirun() {
        let farm = Farm::new();
        let descriptor = descriptor(json!({}), json!({"nkp": 8, "nprocs": [1, 2, 4]}));
        let invoker = RecordingInvoker::default();
        let mut runner =
            CaseRunner::new(&farm.identity, &descriptor, farm.paths(), &invoker, &Everything);

        runner.run(&PlanRequest {
            nprocs: Some(3),
            gap_suffix: Some("ir4o"),
            ..request(false)
        });

        assert_eq!(
            invoker.calls.borrow()[0].command_line(),
            "mpirun -np 4 gap2e-mpi-ir4o.x"
        );
    }

    #[test]
    fn failed_compute_run_still_cleans_tmp() {
        let farm = Farm::new();
        let descriptor = descriptor(json!({}), json!({"nkp": 8, "nprocs": 1}));
        let invoker = RecordingInvoker::failing(&["gap2e.x"]);
        let mut runner =
            CaseRunner::new(&farm.identity, &descriptor, farm.paths(), &invoker, &Everything);

        runner.run(&request(false));

        let report = runner.report();
        assert_eq!(report.state, CaseState::Failed);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].step, "gap");
        assert_eq!(report.failures[0].placeholder, "RUN.PROCESS_EXIT");
        assert_eq!(report.removed_tmp_files, 1);
    }

    #[test]
    fn existing_workspace_skips_the_case() {
        let farm = Farm::new();
        fs::create_dir_all(farm.paths().workspace).expect("workspace should be created");
        let descriptor = descriptor(json!({}), json!({"nkp": 8, "nprocs": 1}));
        let invoker = RecordingInvoker::default();
        let mut runner =
            CaseRunner::new(&farm.identity, &descriptor, farm.paths(), &invoker, &Everything);

        runner.run(&request(false));

        assert!(invoker.calls.borrow().is_empty());
        let report = runner.report();
        assert!(report.is_skipped());
        assert!(report.skip_reason.as_deref().is_some_and(|reason| reason.contains("--force")));
    }

    #[test]
    fn forced_restart_reuses_existing_workspace() {
        let farm = Farm::new();
        let workspace = farm.paths().workspace;
        fs::create_dir_all(&workspace).expect("workspace should be created");
        fs::write(workspace.join("previous.log"), "old").expect("file should be written");
        let descriptor = descriptor(json!({}), json!({"nkp": 8, "nprocs": 1}));
        let invoker = RecordingInvoker::default();
        let mut runner =
            CaseRunner::new(&farm.identity, &descriptor, farm.paths(), &invoker, &Everything)
                .with_force_restart(true);

        runner.run(&request(false));

        assert_eq!(runner.state(), CaseState::Finished);
        assert!(workspace.join("previous.log").exists());
        assert!(!workspace.join("gw.inp").exists());
    }

    #[test]
    fn missing_compute_executable_skips_the_case() {
        let farm = Farm::new();
        let descriptor = descriptor(json!({}), json!({"nkp": 8, "nprocs": 1}));
        let invoker = RecordingInvoker::default();
        let mut runner =
            CaseRunner::new(&farm.identity, &descriptor, farm.paths(), &invoker, &Nothing);

        runner.run(&request(false));

        assert!(runner.report().is_skipped());
        assert!(!farm.paths().workspace.exists());
    }

    #[test]
    fn full_init_runs_scf_then_preprocessing_in_the_wien_directory() {
        let farm = Farm::new();
        let descriptor = descriptor(
            json!({}),
            json!({"nkp": 8, "nprocs": 2, "version": "2e", "emax": 10, "bzcor": "noBZcor"}),
        );
        let invoker = RecordingInvoker::default();
        let mut runner =
            CaseRunner::new(&farm.identity, &descriptor, farm.paths(), &invoker, &Everything)
                .with_init_mode(InitMode::Full);

        runner.init("2e", false);
        runner.run(&request(false));

        let calls = invoker.calls.borrow();
        let paths = farm.paths();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[0].command_line(),
            "init_lapw -b -rkmax 7.0 -ecut -6.0 -vxc 13 -numk 1000"
        );
        assert_eq!(calls[1].arguments(), ["-ec", " 0.000100000000"]);
        assert_eq!(calls[1].program(), "run_lapw");
        assert_eq!(
            calls[2].command_line(),
            format!(
                "gap2e_init -d {} -t gw -nkp 8 -bzcor noBZcor -emax 10",
                paths.gap_dir.display()
            )
        );
        assert!(calls.iter().all(|call| call.working_dir() == paths.wien_dir));
        assert!(paths.wien_dir.join("Si.struct").is_file());
        assert_eq!(runner.state(), CaseState::Preprocessed);
        assert!(!paths.workspace.exists());
    }

    #[test]
    fn scf_failure_is_recorded_and_preprocessing_still_runs() {
        let farm = Farm::new();
        let descriptor = descriptor(json!({"exe": "run_lapw_custom"}), json!({"nkp": 8}));
        let invoker = RecordingInvoker::failing(&["init_lapw"]);
        let mut runner =
            CaseRunner::new(&farm.identity, &descriptor, farm.paths(), &invoker, &Everything)
                .with_init_mode(InitMode::Full);

        runner.init("2e", false);

        assert_eq!(
            invoker.programs(),
            vec!["init_lapw", "run_lapw_custom", "gap2e_init"]
        );
        let report = runner.report();
        assert_eq!(report.state, CaseState::Failed);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].step, "init_lapw");
    }

    #[test]
    fn gap_only_init_skips_scf_and_passes_spin_flag() {
        let farm = Farm::new();
        let value = json!({
            "casename": "Si", "rkmax": 7.0, "is_sp": true, "task": "gw",
            "scf": {}, "gap": {"nkp": 4}
        });
        let descriptor =
            parse_descriptor(&value.to_string(), Path::new("1_Si.json")).expect("descriptor");
        let invoker = RecordingInvoker::default();
        let mut runner =
            CaseRunner::new(&farm.identity, &descriptor, farm.paths(), &invoker, &Everything)
                .with_init_mode(InitMode::GapOnly);

        runner.init("2e", false);

        let calls = invoker.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].command_line().ends_with("-t gw -nkp 4 -s 1"));
        assert_eq!(runner.state(), CaseState::Preprocessed);
    }

    #[test]
    fn missing_numk_skips_before_any_process_runs() {
        let farm = Farm::new();
        let value = json!({
            "casename": "Si", "rkmax": 7.0, "is_sp": false, "task": "gw",
            "scf": {"ec": 0.0001}, "gap": {"nkp": 4}
        });
        let descriptor =
            parse_descriptor(&value.to_string(), Path::new("1_Si.json")).expect("descriptor");
        let invoker = RecordingInvoker::default();
        let mut runner =
            CaseRunner::new(&farm.identity, &descriptor, farm.paths(), &invoker, &Everything)
                .with_init_mode(InitMode::Full);

        runner.init("2e", false);

        assert!(invoker.calls.borrow().is_empty());
        assert!(runner.report().is_skipped());
        assert!(
            runner
                .report()
                .skip_reason
                .as_deref()
                .is_some_and(|reason| reason.contains("UnsupportedConfigurationError"))
        );
    }

    #[test]
    fn dry_init_stages_structure_only() {
        let farm = Farm::new();
        let descriptor = descriptor(json!({}), json!({"nkp": 8}));
        let invoker = RecordingInvoker::default();
        let mut runner =
            CaseRunner::new(&farm.identity, &descriptor, farm.paths(), &invoker, &Nothing)
                .with_init_mode(InitMode::Full);

        runner.init("2e", true);

        assert!(invoker.calls.borrow().is_empty());
        assert_eq!(runner.state(), CaseState::StructPrepared);
        assert!(farm.paths().wien_dir.join("Si.struct").is_file());
        assert!(farm.temp.path().join("struct_files/Si.struct").is_file());
    }

    #[test]
    fn log_file_names_are_timestamped() {
        let name = run_log_file_name();
        assert!(name.starts_with(RUN_LOG_PREFIX));
        assert!(name.ends_with(".log"));
    }
}
