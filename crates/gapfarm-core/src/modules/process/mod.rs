//! Blocking external-process execution and executable lookup.
//!
//! Every invocation carries its own working directory; the driver never
//! changes the process-wide current directory.

use super::traits::{ExecutableLocator, ProcessInvoker};
use crate::domain::FarmError;
use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
    log_path: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            log_path: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sends stdout and stderr to `path` instead of capturing them.
    pub fn log_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationOutcome {
    /// Empty when output went to a log file.
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to launch '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("'{command}' failed with {status}")]
    NonZeroExit { command: String, status: String },
    #[error("failed to open process log '{}': {source}", path.display())]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ProcessError {
    /// True once the process actually started, whatever its exit status.
    pub fn was_launched(&self) -> bool {
        matches!(self, Self::NonZeroExit { .. })
    }
}

impl From<ProcessError> for FarmError {
    fn from(error: ProcessError) -> Self {
        let message = error.to_string();
        match error {
            ProcessError::Spawn { .. } => FarmError::external_process("RUN.PROCESS_SPAWN", message),
            ProcessError::NonZeroExit { .. } => {
                FarmError::external_process("RUN.PROCESS_EXIT", message)
            }
            ProcessError::LogFile { .. } => FarmError::io_system("IO.PROCESS_LOG", message),
        }
    }
}

/// Runs commands with `std::process::Command`, blocking until they exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInvoker;

impl ProcessInvoker for SystemInvoker {
    fn invoke(&self, invocation: &Invocation) -> Result<InvocationOutcome, ProcessError> {
        let command_line = invocation.command_line();
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null());
        debug!(
            "running '{}' in {}",
            command_line,
            invocation.working_dir.display()
        );

        let spawn_error = |source| ProcessError::Spawn {
            command: command_line.clone(),
            source,
        };

        if let Some(log_path) = &invocation.log_path {
            let log_error = |source| ProcessError::LogFile {
                path: log_path.clone(),
                source,
            };
            let stdout = File::create(log_path).map_err(log_error)?;
            let stderr = stdout.try_clone().map_err(log_error)?;
            let status = command
                .stdout(Stdio::from(stdout))
                .stderr(Stdio::from(stderr))
                .status()
                .map_err(spawn_error)?;
            check_status(&command_line, status)?;
            return Ok(InvocationOutcome::default());
        }

        let output = command.output().map_err(spawn_error)?;
        check_status(&command_line, output.status)?;
        Ok(InvocationOutcome {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn check_status(command_line: &str, status: ExitStatus) -> Result<(), ProcessError> {
    if status.success() {
        return Ok(());
    }
    let status = status.code().map_or_else(
        || "terminated by signal".to_string(),
        |code| format!("exit code {}", code),
    );
    Err(ProcessError::NonZeroExit {
        command: command_line.to_string(),
        status,
    })
}

/// Looks executables up on a `PATH`-style search path.
#[derive(Debug, Clone, Default)]
pub struct SearchPathLocator {
    search_path: Option<OsString>,
}

impl SearchPathLocator {
    pub fn from_env() -> Self {
        Self {
            search_path: std::env::var_os("PATH"),
        }
    }

    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
        }
    }
}

impl ExecutableLocator for SearchPathLocator {
    fn locate(&self, executable: &str) -> Option<PathBuf> {
        if executable.is_empty() {
            return None;
        }
        if executable.contains(std::path::MAIN_SEPARATOR) {
            let path = PathBuf::from(executable);
            return is_executable_file(&path).then_some(path);
        }
        let search_path = self.search_path.as_ref()?;
        std::env::split_paths(search_path)
            .map(|dir| dir.join(executable))
            .find(|candidate| is_executable_file(candidate))
    }
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    fs::metadata(path)
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::{Invocation, ProcessError, SearchPathLocator};
    use crate::modules::traits::ExecutableLocator;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn command_line_joins_program_and_arguments() {
        let invocation = Invocation::new("mpirun", "/work")
            .args(["-np", "4"])
            .arg("gap2e-mpi.x");
        assert_eq!(invocation.command_line(), "mpirun -np 4 gap2e-mpi.x");
        assert_eq!(invocation.working_dir(), std::path::Path::new("/work"));
        assert!(invocation.log_path().is_none());
    }

    #[test]
    fn only_exit_failures_count_as_launched() {
        let exited = ProcessError::NonZeroExit {
            command: "gap2e.x".to_string(),
            status: "exit code 3".to_string(),
        };
        let spawn = ProcessError::Spawn {
            command: "gap2e.x".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(exited.was_launched());
        assert!(!spawn.was_launched());
    }

    #[cfg(unix)]
    #[test]
    fn locator_finds_only_executable_files() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().expect("tempdir should be created");
        let bin = temp.path().join("bin");
        fs::create_dir_all(&bin).expect("bin dir should be created");
        let exe = bin.join("gap2e.x");
        fs::write(&exe, "#!/bin/sh\n").expect("script should be written");
        fs::set_permissions(&exe, fs::Permissions::from_mode(0o755))
            .expect("permissions should be set");
        fs::write(bin.join("gap2e_init"), "data").expect("file should be written");

        let locator = SearchPathLocator::with_search_path(bin.as_os_str());
        assert_eq!(locator.locate("gap2e.x"), Some(exe));
        assert_eq!(locator.locate("gap2e_init"), None);
        assert_eq!(locator.locate("gap2e-mpi.x"), None);
        assert_eq!(SearchPathLocator::default().locate("gap2e.x"), None);
    }

    #[cfg(unix)]
    #[test]
    fn system_invoker_runs_in_the_requested_directory() {
        use super::SystemInvoker;
        use crate::modules::traits::ProcessInvoker;

        let temp = TempDir::new().expect("tempdir should be created");
        let outcome = SystemInvoker
            .invoke(&Invocation::new("pwd", temp.path()))
            .expect("pwd should succeed");
        let reported = fs::canonicalize(outcome.stdout.trim()).expect("path should resolve");
        let expected = fs::canonicalize(temp.path()).expect("path should resolve");
        assert_eq!(reported, expected);

        let log = temp.path().join("run.log");
        SystemInvoker
            .invoke(&Invocation::new("sh", temp.path()).args(["-c", "echo hello"]).log_to(&log))
            .expect("echo should succeed");
        assert_eq!(fs::read_to_string(&log).expect("log should exist"), "hello\n");

        let error = SystemInvoker
            .invoke(&Invocation::new("sh", temp.path()).args(["-c", "exit 3"]))
            .expect_err("non-zero exit should fail");
        assert!(error.to_string().contains("exit code 3"));
    }
}
