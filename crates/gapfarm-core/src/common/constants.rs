/// Per-case input extensions linked into the workspace, in link order.
pub const GAP_INPUT_EXTENSIONS: [&str; 7] = ["core", "vxc", "struct", "energy", "vector", "vsp", "in1"];

/// Control file of the compute executable, linked after the case inputs.
pub const GW_CONTROL_FILE: &str = "gw.inp";

/// Extension fragments of large intermediates removed from `tmp/` after a run.
pub const TMP_CLEANUP_EXTENSIONS: [&str; 3] = ["eps", "mwm", "vmat"];

pub const WORKSPACE_TMP_DIR: &str = "tmp";

pub const MPI_LAUNCHER: &str = "mpirun";

/// Named case groups reproducing literature comparisons.
pub const PREDEFINED_SETS: [(&str, &[&str]); 1] = [("JiangH16", &["JH16"])];

pub fn predefined_set(name: &str) -> Option<&'static [&'static str]> {
    PREDEFINED_SETS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, members)| *members)
}

pub fn predefined_set_names() -> Vec<&'static str> {
    PREDEFINED_SETS.iter().map(|(name, _)| *name).collect()
}
