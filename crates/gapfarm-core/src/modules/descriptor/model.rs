use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const REQUIRED_FIELDS: [&str; 4] = ["casename", "rkmax", "is_sp", "task"];
pub const SCF_SECTION: &str = "scf";
pub const GAP_SECTION: &str = "gap";

/// Keys of the `gap` section consumed by the driver itself; everything else
/// is forwarded to the preprocessing executable.
pub const GAP_RESERVED_KEYS: [&str; 4] = ["nkp", "version", "kmesh_gw", "nprocs"];

#[derive(Debug, Clone, PartialEq)]
pub struct TestCaseDescriptor {
    pub casename: String,
    pub rkmax: f64,
    pub is_sp: bool,
    pub task: String,
    pub scf: ScfArgs,
    pub gap: GapArgs,
}

/// Process counts a case can run with, as declared in the descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NprocsSpec {
    Scalar(usize),
    List(Vec<usize>),
}

impl NprocsSpec {
    /// Distinct candidates, largest first.
    pub fn candidates(&self) -> Vec<usize> {
        let mut candidates = match self {
            Self::Scalar(count) => vec![*count],
            Self::List(counts) => counts.clone(),
        };
        candidates.sort_unstable_by(|a, b| b.cmp(a));
        candidates.dedup();
        candidates
    }

    /// Candidates implied by a k-point count when none are declared.
    pub fn derived_from_nkp(nkp: Option<i64>) -> Self {
        match nkp.and_then(|nkp| usize::try_from(nkp).ok()).filter(|nkp| *nkp > 0) {
            Some(nkp) => Self::List(divisors_descending(nkp)),
            None => Self::Scalar(1),
        }
    }
}

pub fn divisors_descending(num: usize) -> Vec<usize> {
    let mut divisors = Vec::new();
    let mut low = 1;
    while low <= num / low {
        if num % low == 0 {
            divisors.push(low);
            if low != num / low {
                divisors.push(num / low);
            }
        }
        low += 1;
    }
    divisors.sort_unstable_by(|a, b| b.cmp(a));
    divisors
}

/// SCF parameters, kept verbatim with typed accessors for the keys the driver reads.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScfArgs {
    raw: Map<String, Value>,
}

impl ScfArgs {
    pub fn new(raw: Map<String, Value>) -> Self {
        Self { raw }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key).filter(|value| !value.is_null())
    }

    pub fn nprocs(&self) -> usize {
        self.get("nprocs")
            .and_then(Value::as_u64)
            .and_then(|count| usize::try_from(count).ok())
            .unwrap_or(1)
    }

    pub fn ecut(&self) -> Option<&Value> {
        self.get("ecut")
    }

    pub fn vxc(&self) -> Option<&Value> {
        self.get("vxc")
    }

    pub fn numk(&self) -> Option<&Value> {
        self.get("numk")
    }

    pub fn ec(&self) -> Option<f64> {
        self.get("ec").and_then(Value::as_f64)
    }

    pub fn exe(&self) -> Option<&str> {
        self.get("exe").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GapArgs {
    pub nprocs: NprocsSpec,
    pub nkp: Option<i64>,
    pub version: Option<Value>,
    pub kmesh_gw: Option<Value>,
    pub passthrough: BTreeMap<String, Value>,
}

impl Default for GapArgs {
    fn default() -> Self {
        Self {
            nprocs: NprocsSpec::Scalar(1),
            nkp: None,
            version: None,
            kmesh_gw: None,
            passthrough: BTreeMap::new(),
        }
    }
}

/// Renders a descriptor value as a single command-line argument.
pub fn value_to_arg(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
