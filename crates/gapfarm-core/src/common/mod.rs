pub mod constants;
pub mod environment;
pub mod paths;

pub use paths::{CasePaths, FarmLayout};
