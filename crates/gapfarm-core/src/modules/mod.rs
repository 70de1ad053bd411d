pub mod descriptor;
pub mod discovery;
pub mod farm;
pub mod gwinp;
pub mod planner;
pub mod process;
pub mod runner;
pub mod workspace;

mod traits;

pub use farm::{FarmConfig, FarmReport, preview_cases, render_human_summary, render_preview, run_farm};
pub use process::{Invocation, InvocationOutcome, ProcessError, SearchPathLocator, SystemInvoker};
pub use traits::{ExecutableLocator, ProcessInvoker};
