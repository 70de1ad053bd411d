use gapfarm_core::common::FarmLayout;
use gapfarm_core::domain::{CaseState, FarmErrorCategory, InitMode, TestCaseIdentity};
use gapfarm_core::modules::discovery::{
    SelectionRequest, discover_cases, filter_cases, parse_selectors,
};
use gapfarm_core::modules::workspace::prepare_workspace;
use gapfarm_core::modules::{
    ExecutableLocator, FarmConfig, Invocation, InvocationOutcome, ProcessError, ProcessInvoker,
    run_farm,
};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[derive(Default)]
struct RecordingInvoker {
    calls: RefCell<Vec<Invocation>>,
}

impl ProcessInvoker for RecordingInvoker {
    fn invoke(&self, invocation: &Invocation) -> Result<InvocationOutcome, ProcessError> {
        self.calls.borrow_mut().push(invocation.clone());
        Ok(InvocationOutcome::default())
    }
}

struct Installed;

impl ExecutableLocator for Installed {
    fn locate(&self, executable: &str) -> Option<PathBuf> {
        Some(PathBuf::from("/opt/gap/bin").join(executable))
    }
}

fn descriptor_json(casename: &str, nkp: u32) -> String {
    format!(
        r#"{{
          "casename": "{casename}",
          "rkmax": 7.0,
          "is_sp": false,
          "task": "gw",
          "scf": {{"ecut": -6.0, "vxc": 13, "numk": 1000, "ec": 0.0001}},
          "gap": {{"nkp": {nkp}, "emax": 10}}
        }}"#
    )
}

fn write_descriptor(root: &Path, category: &str, basename: &str, casename: &str) {
    let dir = root.join("init").join(category);
    fs::create_dir_all(&dir).expect("category dir should be created");
    fs::write(
        dir.join(format!("{basename}.json")),
        descriptor_json(casename, 8),
    )
    .expect("descriptor should be written");
}

fn write_gap_inputs(root: &Path, category: &str, basename: &str, casename: &str) {
    let gap_dir = root.join("inputs").join(category).join(basename).join("gap");
    fs::create_dir_all(&gap_dir).expect("gap dir should be created");
    for ext in ["core", "vxc", "struct", "energy", "vector", "vsp", "in1"] {
        fs::write(gap_dir.join(format!("{casename}.{ext}")), ext).expect("input should be written");
    }
    fs::write(gap_dir.join("gw.inp"), "emaxpol = 1.0E10\n").expect("gw.inp should be written");
}

fn twelve_case_farm() -> TempDir {
    let temp = TempDir::new().expect("tempdir should be created");
    for index in 1..=6 {
        write_descriptor(temp.path(), "metals", &format!("{index}_Cu"), "Cu");
        write_descriptor(temp.path(), "oxides", &format!("{index}_ZnO"), "ZnO");
    }
    temp
}

fn tcnames(cases: &[TestCaseIdentity]) -> Vec<String> {
    cases.iter().map(TestCaseIdentity::tcname).collect()
}

#[test]
fn ordinal_include_picks_third_and_seventh_case() {
    let temp = twelve_case_farm();
    let all = discover_cases(&temp.path().join("init")).expect("discovery should succeed");
    assert_eq!(all.len(), 12);

    let found = filter_cases(&all, &parse_selectors(["3", "7"]), &[]);
    assert_eq!(tcnames(&found), vec!["metals/3_Cu", "oxides/1_ZnO"]);
    assert_eq!(found[1].ordinal, 7);
}

#[test]
fn descriptors_sort_numerically_within_a_category() {
    let temp = TempDir::new().expect("tempdir should be created");
    for basename in ["2_a", "10_b", "1_c"] {
        write_descriptor(temp.path(), "cat", basename, "Si");
    }
    fs::write(temp.path().join("init/cat/notes.txt"), "ignored").expect("file should be written");

    let all = discover_cases(&temp.path().join("init")).expect("discovery should succeed");
    assert_eq!(tcnames(&all), vec!["cat/1_c", "cat/2_a", "cat/10_b"]);
    assert_eq!(
        all.iter().map(|case| case.index).collect::<Vec<_>>(),
        vec![1, 2, 10]
    );
}

#[test]
fn workspace_prepare_is_guarded_unless_forced() {
    let temp = TempDir::new().expect("tempdir should be created");
    write_descriptor(temp.path(), "semi", "1_Si", "Si");
    write_gap_inputs(temp.path(), "semi", "1_Si", "Si");
    let layout = FarmLayout::new(temp.path());
    let all = discover_cases(&layout.init_dir).expect("discovery should succeed");
    let paths = layout.case_paths(&all[0], "Si");

    let first = prepare_workspace(&paths, "Si", false).expect("first prepare should succeed");
    assert!(first.fresh);
    assert_eq!(first.links.len(), 8);
    fs::write(paths.workspace.join("result.out"), "done").expect("output should be written");

    for _ in 0..2 {
        let error = prepare_workspace(&paths, "Si", false).expect_err("workspace exists");
        assert!(error.to_string().contains("--force"));
    }

    let forced = prepare_workspace(&paths, "Si", true).expect("forced prepare should succeed");
    assert!(!forced.fresh);
    assert!(forced.links.is_empty());
    assert_eq!(
        fs::read_to_string(paths.workspace.join("result.out")).expect("prior output kept"),
        "done"
    );
}

#[test]
fn dry_farm_run_links_everything_and_invokes_nothing() {
    let temp = TempDir::new().expect("tempdir should be created");
    write_descriptor(temp.path(), "semi", "1_Si", "Si");
    write_gap_inputs(temp.path(), "semi", "1_Si", "Si");
    let mut config = FarmConfig::new(FarmLayout::new(temp.path()).with_workspace("ws"), "2e");
    config.dry = true;
    let invoker = RecordingInvoker::default();

    let report = run_farm(&config, &invoker, &Installed).expect("farm should run");

    assert!(invoker.calls.borrow().is_empty());
    assert_eq!(report.cases[0].state, CaseState::Finished);
    let workspace = temp.path().join("ws/semi/1_Si");
    let linked = fs::read_link(workspace.join("Si.vector")).expect("input should be linked");
    assert_eq!(
        linked,
        temp.path().join("inputs/semi/1_Si/gap/Si.vector")
    );
    assert!(workspace.join("gw.inp").is_symlink());
}

#[test]
fn init_then_run_drives_every_external_step() {
    let temp = TempDir::new().expect("tempdir should be created");
    write_descriptor(temp.path(), "semi", "1_Si", "Si");
    fs::create_dir_all(temp.path().join("struct_files")).expect("struct pool should be created");
    fs::write(temp.path().join("struct_files/Si.struct"), "Si").expect("struct should be written");
    let layout = FarmLayout::new(temp.path());

    let mut init = FarmConfig::new(layout.clone(), "2e");
    init.init_mode = InitMode::Full;
    let invoker = RecordingInvoker::default();
    let report = run_farm(&init, &invoker, &Installed).expect("init should run");
    assert_eq!(report.cases[0].state, CaseState::Preprocessed);
    let programs = invoker
        .calls
        .borrow()
        .iter()
        .map(|call| call.program().to_string())
        .collect::<Vec<_>>();
    assert_eq!(programs, vec!["init_lapw", "run_lapw", "gap2e_init"]);

    write_gap_inputs(temp.path(), "semi", "1_Si", "Si");
    let run = FarmConfig::new(layout, "2e");
    let invoker = RecordingInvoker::default();
    let report = run_farm(&run, &invoker, &Installed).expect("run should succeed");
    assert!(report.passed);
    let calls = invoker.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].command_line(), "mpirun -np 8 gap2e-mpi.x");
    assert!(calls[0].log_path().is_some());
}

#[test]
fn preset_with_include_list_is_rejected_before_any_work() {
    let temp = twelve_case_farm();
    let mut config = FarmConfig::new(FarmLayout::new(temp.path()), "2e");
    config.selection = SelectionRequest {
        include: Some(parse_selectors(["metals"])),
        exclude: Vec::new(),
        preset: Some("JiangH16".to_string()),
    };
    let invoker = RecordingInvoker::default();

    let error = run_farm(&config, &invoker, &Installed).expect_err("selection conflict");
    assert_eq!(error.category(), FarmErrorCategory::Config);
    assert_eq!(error.exit_code(), 2);
    assert!(!temp.path().join("workspace").exists());
}
