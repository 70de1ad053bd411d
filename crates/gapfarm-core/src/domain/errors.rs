use std::error::Error;
use std::fmt::{Display, Formatter};

pub type FarmResult<T> = Result<T, FarmError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FarmErrorCategory {
    Config,
    MissingField,
    ExecutableNotFound,
    WorkspaceExists,
    ExternalProcess,
    Unsupported,
    IoSystem,
    Internal,
}

impl FarmErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Config => 2,
            Self::MissingField => 3,
            Self::ExecutableNotFound => 4,
            Self::WorkspaceExists => 5,
            Self::ExternalProcess => 6,
            Self::Unsupported => 7,
            Self::IoSystem => 8,
            Self::Internal => 9,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "ConfigError",
            Self::MissingField => "MissingFieldError",
            Self::ExecutableNotFound => "ExecutableNotFoundError",
            Self::WorkspaceExists => "WorkspaceExistsError",
            Self::ExternalProcess => "ExternalProcessError",
            Self::Unsupported => "UnsupportedConfigurationError",
            Self::IoSystem => "IoSystemError",
            Self::Internal => "InternalError",
        }
    }

    /// Only selector misconfiguration stops the whole batch; everything else
    /// is scoped to the case that raised it.
    pub const fn is_batch_fatal(self) -> bool {
        matches!(self, Self::Config)
    }

    /// Workspace conflicts are reported as warnings rather than errors.
    pub const fn is_warning(self) -> bool {
        matches!(self, Self::WorkspaceExists)
    }

    /// Errors raised before anything ran for the case; it is skipped, not failed.
    pub const fn skips_case(self) -> bool {
        matches!(
            self,
            Self::MissingField | Self::ExecutableNotFound | Self::WorkspaceExists | Self::Unsupported
        )
    }
}

impl Display for FarmErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarmError {
    category: FarmErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl FarmError {
    pub fn new(
        category: FarmErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn config(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(FarmErrorCategory::Config, placeholder, message)
    }

    pub fn missing_field(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(FarmErrorCategory::MissingField, placeholder, message)
    }

    pub fn executable_not_found(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(FarmErrorCategory::ExecutableNotFound, placeholder, message)
    }

    pub fn workspace_exists(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(FarmErrorCategory::WorkspaceExists, placeholder, message)
    }

    pub fn external_process(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(FarmErrorCategory::ExternalProcess, placeholder, message)
    }

    pub fn unsupported(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(FarmErrorCategory::Unsupported, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(FarmErrorCategory::IoSystem, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(FarmErrorCategory::Internal, placeholder, message)
    }

    pub const fn category(&self) -> FarmErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category.is_warning() {
            "WARNING"
        } else {
            "ERROR"
        };
        format!("{}: [{}] {}", severity, self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category
            .is_batch_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

impl Display for FarmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for FarmError {}
