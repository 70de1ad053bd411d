pub mod errors;

pub use errors::{FarmError, FarmErrorCategory, FarmResult};

use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Addressable key of one discovered descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseIdentity {
    pub ordinal: usize,
    pub category: String,
    pub basename: String,
    pub index: u64,
    pub descriptor_path: PathBuf,
}

impl TestCaseIdentity {
    /// `category/basename`, the name used for inputs and workspace directories.
    pub fn tcname(&self) -> String {
        format!("{}/{}", self.category, self.basename)
    }
}

impl Display for TestCaseIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.category, self.basename)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InitMode {
    /// Run the case, initialize nothing.
    #[default]
    Disabled,
    /// SCF initialization and run, then preprocessing.
    Full,
    /// Preprocessing only, on top of a finished SCF.
    GapOnly,
}

impl InitMode {
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Self::Disabled)
    }

    pub const fn includes_scf(self) -> bool {
        matches!(self, Self::Full)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseState {
    #[default]
    Uninitialized,
    StructPrepared,
    ScfDone,
    Preprocessed,
    Linked,
    Running,
    Finished,
    Failed,
    Skipped,
}

impl CaseState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::StructPrepared => "STRUCT_PREPARED",
            Self::ScfDone => "SCF_DONE",
            Self::Preprocessed => "PREPROCESSED",
            Self::Linked => "LINKED",
            Self::Running => "RUNNING",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Skipped)
    }

    /// Legal forward edges of the case lifecycle. `Failed` and `Skipped` are
    /// reachable from every non-terminal state.
    pub fn can_advance_to(self, next: CaseState) -> bool {
        if self.is_terminal() {
            return false;
        }
        if matches!(next, Self::Failed | Self::Skipped) {
            return true;
        }
        matches!(
            (self, next),
            (Self::Uninitialized, Self::StructPrepared)
                | (Self::Uninitialized, Self::Linked)
                | (Self::StructPrepared, Self::ScfDone)
                | (Self::StructPrepared, Self::Preprocessed)
                | (Self::ScfDone, Self::Preprocessed)
                | (Self::Linked, Self::Running)
                | (Self::Linked, Self::Finished)
                | (Self::Running, Self::Finished)
        )
    }
}

impl Display for CaseState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}
