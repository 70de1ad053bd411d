use std::fs;
use std::path::Path;
use tracing::debug;

pub const SCF_ROOT_ENV: &str = "WIENROOT";
const VERSION_FILE_NAME: &str = "VERSION";

/// Version of the SCF package installation named by `WIENROOT`, if readable.
pub fn scf_package_version() -> Option<String> {
    let root = std::env::var_os(SCF_ROOT_ENV)?;
    scf_package_version_at(Path::new(&root))
}

pub fn scf_package_version_at(root: &Path) -> Option<String> {
    let path = root.join(VERSION_FILE_NAME);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(source) => {
            debug!("cannot read SCF version file '{}': {}", path.display(), source);
            return None;
        }
    };
    let version = parse_version_line(content.lines().next()?);
    if version.is_none() {
        debug!("unrecognized SCF version line in '{}'", path.display());
    }
    version
}

/// `WIEN2k_19.2 (Release 8/1/2020)` -> `19.2`
pub fn parse_version_line(line: &str) -> Option<String> {
    let (_, tail) = line.split_once('_')?;
    tail.split_whitespace().next().map(str::to_string)
}
