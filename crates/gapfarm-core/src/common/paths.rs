//! Filesystem layout of a test farm and the per-case paths derived from it.

use crate::domain::TestCaseIdentity;
use std::path::{Path, PathBuf};

pub const INIT_DIR_NAME: &str = "init";
pub const STRUCT_DIR_NAME: &str = "struct_files";
pub const INPUTS_DIR_NAME: &str = "inputs";
pub const DEFAULT_WORKSPACE_DIR_NAME: &str = "workspace";
pub const GAP_DIR_NAME: &str = "gap";
pub const STRUCT_EXTENSION: &str = "struct";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarmLayout {
    pub root: PathBuf,
    pub init_dir: PathBuf,
    pub struct_dir: PathBuf,
    pub inputs_dir: PathBuf,
    pub workspace_root: PathBuf,
}

impl FarmLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            init_dir: root.join(INIT_DIR_NAME),
            struct_dir: root.join(STRUCT_DIR_NAME),
            inputs_dir: root.join(INPUTS_DIR_NAME),
            workspace_root: root.join(DEFAULT_WORKSPACE_DIR_NAME),
            root,
        }
    }

    /// Relative workspace roots are resolved against the farm root.
    pub fn with_workspace(mut self, workspace: impl AsRef<Path>) -> Self {
        self.workspace_root = resolve_against(&self.root, workspace.as_ref());
        self
    }

    pub fn case_paths(&self, identity: &TestCaseIdentity, casename: &str) -> CasePaths {
        let input_dir = self
            .inputs_dir
            .join(&identity.category)
            .join(&identity.basename);
        CasePaths {
            struct_file: self
                .struct_dir
                .join(format!("{casename}.{STRUCT_EXTENSION}")),
            wien_dir: input_dir.join(casename),
            gap_dir: input_dir.join(GAP_DIR_NAME),
            workspace: self
                .workspace_root
                .join(&identity.category)
                .join(&identity.basename),
            input_dir,
        }
    }
}

/// Every directory and file one case touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasePaths {
    /// Shared structure file in the struct pool.
    pub struct_file: PathBuf,
    pub input_dir: PathBuf,
    /// SCF calculation directory, named after the casename.
    pub wien_dir: PathBuf,
    /// Preprocessed inputs consumed by the compute executable.
    pub gap_dir: PathBuf,
    pub workspace: PathBuf,
}

pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
