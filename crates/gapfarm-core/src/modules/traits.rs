use super::process::{Invocation, InvocationOutcome, ProcessError};
use std::path::PathBuf;

pub trait ProcessInvoker {
    /// Runs to completion; a non-zero exit is `ProcessError::NonZeroExit`.
    fn invoke(&self, invocation: &Invocation) -> Result<InvocationOutcome, ProcessError>;
}

pub trait ExecutableLocator {
    fn locate(&self, executable: &str) -> Option<PathBuf>;

    fn is_available(&self, executable: &str) -> bool {
        self.locate(executable).is_some()
    }
}

impl<T> ProcessInvoker for &T
where
    T: ProcessInvoker + ?Sized,
{
    fn invoke(&self, invocation: &Invocation) -> Result<InvocationOutcome, ProcessError> {
        (**self).invoke(invocation)
    }
}

impl<T> ExecutableLocator for &T
where
    T: ExecutableLocator + ?Sized,
{
    fn locate(&self, executable: &str) -> Option<PathBuf> {
        (**self).locate(executable)
    }
}
