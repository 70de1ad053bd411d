//! In-place patching of the `gw.inp` control file.

mod params;

pub use params::{PARAMS, ParamKind, ParamSpec, available_params, param_spec};

use crate::domain::FarmError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const COMMENT_MARKER: char = '#';
const FIELD_SEPARATOR: char = '|';

#[derive(Debug, thiserror::Error)]
pub enum GwInpError {
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{key} is not available; known parameters: {}", available_params().join(", "))]
    UnknownParameter { key: String },
    #[error("parameter {key} is not present in the control file")]
    NotLocated { key: String },
    #[error("invalid value '{value}' for {key}: expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
    #[error("line {line} does not hold parameter {key}: '{text}'")]
    MalformedLine {
        key: String,
        line: usize,
        text: String,
    },
}

impl From<GwInpError> for FarmError {
    fn from(error: GwInpError) -> Self {
        let message = error.to_string();
        match error {
            GwInpError::Read { .. } => FarmError::io_system("IO.GWINP_READ", message),
            GwInpError::Write { .. } => FarmError::io_system("IO.GWINP_WRITE", message),
            GwInpError::UnknownParameter { .. } => {
                FarmError::config("CONFIG.GWINP_UNKNOWN_PARAMETER", message)
            }
            GwInpError::InvalidValue { .. } => {
                FarmError::config("CONFIG.GWINP_INVALID_VALUE", message)
            }
            GwInpError::NotLocated { .. } | GwInpError::MalformedLine { .. } => {
                FarmError::unsupported("INPUT.GWINP_LAYOUT", message)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GwInp {
    lines: Vec<String>,
    located: BTreeMap<&'static str, usize>,
}

impl GwInp {
    pub fn load(path: &Path) -> Result<Self, GwInpError> {
        let source = fs::read_to_string(path).map_err(|source| GwInpError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&source))
    }

    pub fn parse(source: &str) -> Self {
        let lines = source.lines().map(str::to_string).collect::<Vec<_>>();
        let located = locate_params(&lines);
        Self { lines, located }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Zero-based line holding `key`, when its block is present.
    pub fn line_of(&self, key: &str) -> Option<usize> {
        self.located.get(key).copied()
    }

    /// Current value text, or the built-in default when the file lacks the parameter.
    pub fn get(&self, key: &str) -> Result<String, GwInpError> {
        let spec = known_spec(key)?;
        let Some(line) = self.line_of(key) else {
            return Ok(spec.default.to_string());
        };
        let (content, _) = split_comment(&self.lines[line]);
        if spec.is_one_line() {
            let (_, value) = content
                .split_once('=')
                .ok_or_else(|| malformed(spec, line, &self.lines[line]))?;
            return Ok(value.trim().to_string());
        }
        let fields = block_fields(spec, line, &self.lines[line])?;
        Ok(fields[spec.index].to_string())
    }

    /// Patched copy of the file. Known parameters are edited where they are;
    /// unknown ones are appended as `key = value` lines.
    pub fn modify(&self, params: &[(String, String)]) -> Result<Vec<String>, GwInpError> {
        let mut lines = self.lines.clone();
        let mut extras = Vec::new();
        for (key, value) in params {
            let Some(spec) = param_spec(key) else {
                debug!("appending unlisted parameter {} = {}", key, value);
                extras.push(format!("{key} = {value}"));
                continue;
            };
            if !spec.kind.accepts(value) {
                return Err(GwInpError::InvalidValue {
                    key: key.clone(),
                    value: value.clone(),
                    expected: spec.kind.as_str(),
                });
            }
            let line = self.line_of(key).ok_or_else(|| GwInpError::NotLocated {
                key: key.clone(),
            })?;
            lines[line] = patch_line(spec, line, &lines[line], value.trim())?;
            info!("set {} = {} at line {}", key, value.trim(), line + 1);
        }
        lines.extend(extras);
        Ok(lines)
    }

    /// Applies `params` and writes the result to `output`.
    pub fn write_modified(
        &self,
        params: &[(String, String)],
        output: &Path,
    ) -> Result<(), GwInpError> {
        let mut text = self.modify(params)?.join("\n");
        text.push('\n');
        fs::write(output, text).map_err(|source| GwInpError::Write {
            path: output.to_path_buf(),
            source,
        })
    }
}

/// Parses `key=value` assignments as given on the command line.
pub fn parse_assignment(token: &str) -> Option<(String, String)> {
    let (key, value) = token.split_once('=')?;
    let key = key.trim();
    let value = value.trim();
    (!key.is_empty() && !value.is_empty()).then(|| (key.to_string(), value.to_string()))
}

fn known_spec(key: &str) -> Result<&'static ParamSpec, GwInpError> {
    param_spec(key).ok_or_else(|| GwInpError::UnknownParameter {
        key: key.to_string(),
    })
}

fn locate_params(lines: &[String]) -> BTreeMap<&'static str, usize> {
    let mut located = BTreeMap::new();
    for (index, line) in lines.iter().enumerate() {
        let (content, _) = split_comment(line);
        let content = content.trim();
        if content.is_empty() {
            continue;
        }
        for spec in &PARAMS {
            let target = index + spec.line_offset;
            if located.contains_key(spec.key)
                || !content.starts_with(spec.pattern)
                || target >= lines.len()
            {
                continue;
            }
            located.insert(spec.key, target);
        }
    }
    located
}

fn split_comment(line: &str) -> (&str, Option<&str>) {
    match line.find(COMMENT_MARKER) {
        Some(position) => (&line[..position], Some(line[position..].trim_end())),
        None => (line, None),
    }
}

fn block_fields<'a>(
    spec: &ParamSpec,
    line: usize,
    text: &'a str,
) -> Result<Vec<&'a str>, GwInpError> {
    let (content, _) = split_comment(text);
    let fields = content.split(FIELD_SEPARATOR).map(str::trim).collect::<Vec<_>>();
    if fields.len() != spec.fields || fields.iter().any(|field| field.is_empty()) {
        return Err(malformed(spec, line, text));
    }
    Ok(fields)
}

fn patch_line(spec: &ParamSpec, line: usize, text: &str, value: &str) -> Result<String, GwInpError> {
    let (content, comment) = split_comment(text);
    let mut patched = if spec.is_one_line() {
        let (name, _) = content
            .split_once('=')
            .ok_or_else(|| malformed(spec, line, text))?;
        format!("{} = {}", name.trim(), value)
    } else {
        let mut fields = block_fields(spec, line, text)?;
        fields[spec.index] = value;
        fields.join(" | ")
    };
    if let Some(comment) = comment {
        patched.push(' ');
        patched.push_str(comment);
    }
    Ok(patched)
}

fn malformed(spec: &ParamSpec, line: usize, text: &str) -> GwInpError {
    GwInpError::MalformedLine {
        key: spec.key.to_string(),
        line: line + 1,
        text: text.to_string(),
    }
}
