use crate::common::CasePaths;
use crate::common::constants::{GAP_INPUT_EXTENSIONS, GW_CONTROL_FILE, WORKSPACE_TMP_DIR};
use crate::domain::FarmError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub root: PathBuf,
    /// False when an existing directory was reused under force-restart.
    pub fresh: bool,
    pub links: Vec<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("workspace directory exists: {}. Use --force to run anyway", path.display())]
    Exists { path: PathBuf },
    #[error("failed to {action} '{}': {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid cleanup pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: globset::Error,
    },
}

impl WorkspaceError {
    fn io<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(std::io::Error) -> Self + 'a {
        move |source| Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<WorkspaceError> for FarmError {
    fn from(error: WorkspaceError) -> Self {
        let message = error.to_string();
        match error {
            WorkspaceError::Exists { .. } => FarmError::workspace_exists("WORKSPACE.EXISTS", message),
            WorkspaceError::Io { .. } => FarmError::io_system("IO.WORKSPACE", message),
            WorkspaceError::InvalidPattern { .. } => {
                FarmError::internal("SYS.WORKSPACE_PATTERN", message)
            }
        }
    }
}

/// File names linked from the gap directory into a fresh workspace, in order.
pub fn workspace_inputs(casename: &str) -> Vec<String> {
    GAP_INPUT_EXTENSIONS
        .iter()
        .map(|ext| format!("{casename}.{ext}"))
        .chain(std::iter::once(GW_CONTROL_FILE.to_string()))
        .collect()
}

/// Creates the case workspace and links the available inputs into it.
///
/// An existing workspace is rejected unless `force_restart` is set, in which
/// case it is reused untouched: nothing is deleted and nothing is relinked.
/// A workspace created here is removed again if linking fails part-way.
pub fn prepare_workspace(
    paths: &CasePaths,
    casename: &str,
    force_restart: bool,
) -> Result<Workspace, WorkspaceError> {
    prepare_workspace_with(paths, casename, force_restart, symlink_file)
}

fn prepare_workspace_with<L>(
    paths: &CasePaths,
    casename: &str,
    force_restart: bool,
    link: L,
) -> Result<Workspace, WorkspaceError>
where
    L: Fn(&Path, &Path) -> std::io::Result<()>,
{
    let root = paths.workspace.clone();
    if root.is_dir() {
        if force_restart {
            warn!("force restart anyway: reusing {}", root.display());
            return Ok(Workspace {
                root,
                fresh: false,
                links: Vec::new(),
            });
        }
        return Err(WorkspaceError::Exists { path: root });
    }

    fs::create_dir_all(&root).map_err(WorkspaceError::io("create workspace", &root))?;
    match link_inputs(&paths.gap_dir, &root, casename, link) {
        Ok(links) => Ok(Workspace {
            root,
            fresh: true,
            links,
        }),
        Err(failure) => {
            if let Err(source) = fs::remove_dir_all(&root) {
                warn!(
                    "failed to remove partial workspace {}: {}",
                    root.display(),
                    source
                );
            }
            Err(failure)
        }
    }
}

fn link_inputs<L>(
    gap_dir: &Path,
    root: &Path,
    casename: &str,
    link: L,
) -> Result<Vec<PathBuf>, WorkspaceError>
where
    L: Fn(&Path, &Path) -> std::io::Result<()>,
{
    let mut links = Vec::new();
    for name in workspace_inputs(casename) {
        let src = gap_dir.join(&name);
        if !src.is_file() {
            continue;
        }
        let dst = root.join(&name);
        link(&src, &dst).map_err(WorkspaceError::io("link input", &dst))?;
        debug!("linking {} to {}", src.display(), dst.display());
        links.push(dst);
    }
    Ok(links)
}

/// Copies the shared structure file into the SCF directory on first use.
/// Returns whether a copy was made.
pub fn stage_structure(paths: &CasePaths) -> Result<bool, WorkspaceError> {
    fs::create_dir_all(&paths.wien_dir)
        .map_err(WorkspaceError::io("create input directory", &paths.wien_dir))?;
    let Some(file_name) = paths.struct_file.file_name() else {
        return Ok(false);
    };
    let target = paths.wien_dir.join(file_name);
    if target.is_file() {
        return Ok(false);
    }
    fs::copy(&paths.struct_file, &target)
        .map_err(WorkspaceError::io("copy structure file", &paths.struct_file))?;
    info!(">> copied {} to {}", paths.struct_file.display(), target.display());
    Ok(true)
}

/// `*.<ext>*` patterns for the given extension fragments.
pub fn cleanup_patterns(extensions: &[&str]) -> Result<GlobSet, WorkspaceError> {
    let mut builder = GlobSetBuilder::new();
    for ext in extensions {
        let pattern = format!("*.{ext}*");
        let glob = Glob::new(&pattern)
            .map_err(|source| WorkspaceError::InvalidPattern { pattern, source })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| WorkspaceError::InvalidPattern {
        pattern: extensions.join(","),
        source,
    })
}

/// Removes large intermediates from `<workspace>/tmp`. A missing `tmp` is fine.
pub fn cleanup_tmp(workspace: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, WorkspaceError> {
    let tmp = workspace.join(WORKSPACE_TMP_DIR);
    if !tmp.is_dir() {
        return Ok(Vec::new());
    }
    let patterns = cleanup_patterns(extensions)?;
    let mut removed = Vec::new();
    for entry in fs::read_dir(&tmp).map_err(WorkspaceError::io("list", &tmp))? {
        let path = entry.map_err(WorkspaceError::io("list", &tmp))?.path();
        let matched = path
            .file_name()
            .is_some_and(|name| patterns.is_match(Path::new(name)));
        if !matched || !path.is_file() {
            continue;
        }
        fs::remove_file(&path).map_err(WorkspaceError::io("remove", &path))?;
        removed.push(path);
    }
    removed.sort();
    Ok(removed)
}

#[cfg(unix)]
fn symlink_file(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
fn symlink_file(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(src, dst)
}
