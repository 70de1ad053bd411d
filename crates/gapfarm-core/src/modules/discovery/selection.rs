use crate::common::constants::{predefined_set, predefined_set_names};
use crate::domain::{FarmError, FarmResult, TestCaseIdentity};
use std::fmt::{Display, Formatter};
use tracing::info;

/// One entry of an include or exclude list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Ordinal(usize),
    /// Category, basename, or full `category/basename`.
    Name(String),
}

impl Selector {
    /// Integers select by ordinal; anything else selects by name.
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        match token.parse::<usize>() {
            Ok(ordinal) => Self::Ordinal(ordinal),
            Err(_) => Self::Name(token.to_string()),
        }
    }

    pub fn matches(&self, case: &TestCaseIdentity) -> bool {
        match self {
            Self::Ordinal(ordinal) => *ordinal == case.ordinal,
            Self::Name(name) => {
                *name == case.category || *name == case.basename || *name == case.tcname()
            }
        }
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ordinal(ordinal) => write!(f, "{ordinal}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

pub fn parse_selectors<I, S>(tokens: I) -> Vec<Selector>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .map(|token| Selector::parse(token.as_ref()))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionRequest {
    pub include: Option<Vec<Selector>>,
    pub exclude: Vec<Selector>,
    pub preset: Option<String>,
}

/// Resolves include list or preset, then filters. Fails before any case is
/// touched when both an include list and a preset are given.
pub fn select_cases(
    all: &[TestCaseIdentity],
    request: &SelectionRequest,
) -> FarmResult<Vec<TestCaseIdentity>> {
    let include = match (&request.include, &request.preset) {
        (Some(_), Some(_)) => {
            return Err(FarmError::config(
                "CONFIG.SELECTION_CONFLICT",
                "specify either an include list or a preset, not both",
            ));
        }
        (Some(include), None) => include.clone(),
        (None, Some(name)) => {
            let members = predefined_set(name).ok_or_else(|| {
                FarmError::config(
                    "CONFIG.UNKNOWN_PRESET",
                    format!(
                        "undefined set name '{}'; available: {}",
                        name,
                        predefined_set_names().join(", ")
                    ),
                )
            })?;
            members
                .iter()
                .map(|member| Selector::Name((*member).to_string()))
                .collect()
        }
        (None, None) => Vec::new(),
    };

    let found = filter_cases(all, &include, &request.exclude);
    info!(
        "all test cases to be run: {:?}",
        found.iter().map(TestCaseIdentity::tcname).collect::<Vec<_>>()
    );
    Ok(found)
}

/// Keeps discovery order. Exclusion always wins over inclusion.
pub fn filter_cases(
    all: &[TestCaseIdentity],
    include: &[Selector],
    exclude: &[Selector],
) -> Vec<TestCaseIdentity> {
    all.iter()
        .filter(|case| !matches_any(exclude, case))
        .filter(|case| include.is_empty() || matches_any(include, case))
        .cloned()
        .collect()
}

fn matches_any(selectors: &[Selector], case: &TestCaseIdentity) -> bool {
    selectors.iter().any(|selector| selector.matches(case))
}
