mod selection;

pub use selection::{SelectionRequest, Selector, filter_cases, parse_selectors, select_cases};

use crate::domain::{FarmError, FarmResult, TestCaseIdentity};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DESCRIPTOR_EXTENSION: &str = "json";

/// Every descriptor under `root`, in category-then-index order with 1-based ordinals.
pub fn discover_cases(root: &Path) -> FarmResult<Vec<TestCaseIdentity>> {
    let mut categories = list_entries(root)?
        .into_iter()
        .filter(|path| path.is_dir())
        .collect::<Vec<_>>();
    categories.sort();

    let mut cases = Vec::new();
    for category_dir in categories {
        let Some(category) = file_name_string(&category_dir) else {
            warn!(
                "skipping category directory with a non UTF-8 name: {}",
                category_dir.display()
            );
            continue;
        };
        debug!("searching {}", category);
        for (index, basename, descriptor_path) in category_descriptors(&category_dir)? {
            cases.push(TestCaseIdentity {
                ordinal: cases.len() + 1,
                category: category.clone(),
                basename,
                index,
                descriptor_path,
            });
        }
    }

    info!(
        "all available test cases: {:?}",
        cases.iter().map(TestCaseIdentity::tcname).collect::<Vec<_>>()
    );
    Ok(cases)
}

fn category_descriptors(category_dir: &Path) -> FarmResult<Vec<(u64, String, PathBuf)>> {
    let mut descriptors = Vec::new();
    for path in list_entries(category_dir)? {
        if !path.is_file()
            || path.extension().and_then(|ext| ext.to_str()) != Some(DESCRIPTOR_EXTENSION)
        {
            continue;
        }
        let Some(basename) = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
        else {
            warn!("skipping descriptor with a non UTF-8 name: {}", path.display());
            continue;
        };
        match leading_index(&basename) {
            Some(index) => descriptors.push((index, basename, path)),
            None => warn!(
                "skipping descriptor without a leading case index: {}",
                path.display()
            ),
        }
    }
    descriptors.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    Ok(descriptors)
}

/// `10_GaAs_task_gw` -> 10
pub fn leading_index(basename: &str) -> Option<u64> {
    let head = basename.split('_').next()?;
    head.parse().ok()
}

fn list_entries(dir: &Path) -> FarmResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| {
        FarmError::io_system(
            "IO.DISCOVERY_READ_DIR",
            format!("failed to list '{}': {}", dir.display(), source),
        )
    })?;
    entries
        .map(|entry| {
            entry.map(|entry| entry.path()).map_err(|source| {
                FarmError::io_system(
                    "IO.DISCOVERY_READ_DIR",
                    format!("failed to list '{}': {}", dir.display(), source),
                )
            })
        })
        .collect()
}

fn file_name_string(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}
