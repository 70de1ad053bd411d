use super::model::{
    GAP_RESERVED_KEYS, GAP_SECTION, GapArgs, NprocsSpec, REQUIRED_FIELDS, SCF_SECTION, ScfArgs,
    TestCaseDescriptor,
};
use crate::domain::FarmError;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("failed to read test case descriptor '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse test case descriptor '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("broken test case descriptor '{}': top level must be an object", path.display())]
    NotAnObject { path: PathBuf },
    #[error("broken test case descriptor '{}': missing required key '{field}'", path.display())]
    MissingField { path: PathBuf, field: String },
    #[error(
        "broken test case descriptor '{}': key '{field}' must be {expected}",
        path.display()
    )]
    InvalidField {
        path: PathBuf,
        field: String,
        expected: &'static str,
    },
}

impl DescriptorError {
    pub fn missing_field(&self) -> Option<&str> {
        match self {
            Self::MissingField { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<DescriptorError> for FarmError {
    fn from(error: DescriptorError) -> Self {
        let message = error.to_string();
        match error {
            DescriptorError::Read { .. } => FarmError::io_system("IO.DESCRIPTOR_READ", message),
            DescriptorError::Parse { .. } => {
                FarmError::missing_field("INPUT.DESCRIPTOR_PARSE", message)
            }
            DescriptorError::NotAnObject { .. } => {
                FarmError::missing_field("INPUT.DESCRIPTOR_SHAPE", message)
            }
            DescriptorError::MissingField { .. } => {
                FarmError::missing_field("INPUT.DESCRIPTOR_MISSING_FIELD", message)
            }
            DescriptorError::InvalidField { .. } => {
                FarmError::missing_field("INPUT.DESCRIPTOR_FIELD_TYPE", message)
            }
        }
    }
}

pub fn load_descriptor(path: impl AsRef<Path>) -> Result<TestCaseDescriptor, DescriptorError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| DescriptorError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_descriptor(&source, path)
}

pub fn parse_descriptor(source: &str, origin: &Path) -> Result<TestCaseDescriptor, DescriptorError> {
    let value: Value = serde_json::from_str(source).map_err(|source| DescriptorError::Parse {
        path: origin.to_path_buf(),
        source,
    })?;
    let Value::Object(record) = value else {
        return Err(DescriptorError::NotAnObject {
            path: origin.to_path_buf(),
        });
    };
    RecordReader {
        record: &record,
        origin,
    }
    .read()
}

struct RecordReader<'a> {
    record: &'a Map<String, Value>,
    origin: &'a Path,
}

impl RecordReader<'_> {
    fn read(&self) -> Result<TestCaseDescriptor, DescriptorError> {
        info!("> case loaded, information:");
        for field in REQUIRED_FIELDS {
            let value = self.required(field)?;
            info!(">> {}: {}", field, value);
        }

        let casename = self.string(REQUIRED_FIELDS[0])?;
        let rkmax = self.number(REQUIRED_FIELDS[1])?;
        let is_sp = self.boolean(REQUIRED_FIELDS[2])?;
        let task = self.string(REQUIRED_FIELDS[3])?;

        let scf = self.section(SCF_SECTION)?;
        info!(">> SCF initialization parameters:");
        log_section(&scf);
        let gap = self.section(GAP_SECTION)?;
        info!(">> gap initialization parameters:");
        log_section(&gap);

        Ok(TestCaseDescriptor {
            casename,
            rkmax,
            is_sp,
            task,
            scf: ScfArgs::new(scf),
            gap: self.gap_args(gap)?,
        })
    }

    fn gap_args(&self, section: Map<String, Value>) -> Result<GapArgs, DescriptorError> {
        let nkp = match section.get("nkp").filter(|value| !value.is_null()) {
            Some(value) => Some(value.as_i64().ok_or_else(|| self.invalid("gap.nkp", "an integer"))?),
            None => None,
        };
        let nprocs = match section.get("nprocs").filter(|value| !value.is_null()) {
            Some(value) => self.nprocs(value)?,
            None => NprocsSpec::derived_from_nkp(nkp),
        };
        let passthrough = section
            .iter()
            .filter(|(key, _)| !GAP_RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(GapArgs {
            nprocs,
            nkp,
            version: section.get("version").filter(|value| !value.is_null()).cloned(),
            kmesh_gw: section.get("kmesh_gw").filter(|value| !value.is_null()).cloned(),
            passthrough,
        })
    }

    fn nprocs(&self, value: &Value) -> Result<NprocsSpec, DescriptorError> {
        let expected = "a positive integer or a non-empty list of positive integers";
        let positive = |value: &Value| {
            value
                .as_u64()
                .and_then(|count| usize::try_from(count).ok())
                .filter(|count| *count > 0)
        };
        match value {
            Value::Array(items) if !items.is_empty() => items
                .iter()
                .map(|item| positive(item).ok_or_else(|| self.invalid("gap.nprocs", expected)))
                .collect::<Result<Vec<_>, _>>()
                .map(NprocsSpec::List),
            other => positive(other)
                .map(NprocsSpec::Scalar)
                .ok_or_else(|| self.invalid("gap.nprocs", expected)),
        }
    }

    fn required(&self, field: &str) -> Result<&Value, DescriptorError> {
        self.record
            .get(field)
            .ok_or_else(|| DescriptorError::MissingField {
                path: self.origin.to_path_buf(),
                field: field.to_string(),
            })
    }

    fn string(&self, field: &str) -> Result<String, DescriptorError> {
        self.required(field)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.invalid(field, "a string"))
    }

    fn number(&self, field: &str) -> Result<f64, DescriptorError> {
        self.required(field)?
            .as_f64()
            .ok_or_else(|| self.invalid(field, "a number"))
    }

    fn boolean(&self, field: &str) -> Result<bool, DescriptorError> {
        self.required(field)?
            .as_bool()
            .ok_or_else(|| self.invalid(field, "a boolean"))
    }

    fn section(&self, field: &str) -> Result<Map<String, Value>, DescriptorError> {
        self.required(field)?
            .as_object()
            .cloned()
            .ok_or_else(|| self.invalid(field, "an object"))
    }

    fn invalid(&self, field: &str, expected: &'static str) -> DescriptorError {
        DescriptorError::InvalidField {
            path: self.origin.to_path_buf(),
            field: field.to_string(),
            expected,
        }
    }
}

fn log_section(section: &Map<String, Value>) {
    for (key, value) in section {
        info!(">> {:>10} : {}", key, value);
    }
}
