mod model;
mod parser;

pub use model::{
    GAP_RESERVED_KEYS, GapArgs, NprocsSpec, REQUIRED_FIELDS, ScfArgs, TestCaseDescriptor,
    divisors_descending, value_to_arg,
};
pub use parser::{DescriptorError, load_descriptor, parse_descriptor};
