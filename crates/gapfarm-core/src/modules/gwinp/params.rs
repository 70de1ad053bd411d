#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Int,
    Float,
}

impl ParamKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Int => "integer",
            Self::Float => "float",
        }
    }

    pub fn accepts(self, value: &str) -> bool {
        let value = value.trim();
        match self {
            Self::Int => value.parse::<i64>().is_ok(),
            Self::Float => value.parse::<f64>().is_ok_and(f64::is_finite),
        }
    }
}

/// Where a tunable parameter lives in `gw.inp`.
///
/// `fields == 0` marks a one-line `name = value` parameter; otherwise the
/// value is field `index` of a `|`-separated line `line_offset` lines below
/// the block header matching `pattern`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub key: &'static str,
    pub kind: ParamKind,
    pub pattern: &'static str,
    pub default: &'static str,
    pub line_offset: usize,
    pub fields: usize,
    pub index: usize,
}

impl ParamSpec {
    pub const fn is_one_line(&self) -> bool {
        self.fields == 0
    }
}

const fn param(
    key: &'static str,
    kind: ParamKind,
    pattern: &'static str,
    default: &'static str,
    line_offset: usize,
    fields: usize,
    index: usize,
) -> ParamSpec {
    ParamSpec {
        key,
        kind,
        pattern,
        default,
        line_offset,
        fields,
        index,
    }
}

pub const PARAMS: [ParamSpec; 14] = [
    param("pwm", ParamKind::Float, "%BareCoul", "2.0", 1, 2, 0),
    param("kmr", ParamKind::Float, "%MixBasis", "0.75", 1, 1, 0),
    param("barcevtol", ParamKind::Float, "barcevtol", "0.1", 0, 0, 0),
    param("MB_emax", ParamKind::Float, "MB_emax", "20.0", 0, 0, 0),
    param("lmbmax", ParamKind::Int, "%MixBasis", "3", 2, 3, 0),
    param("wftol", ParamKind::Float, "%MixBasis", "1.0E-4", 2, 3, 1),
    param("lblmax", ParamKind::Int, "%MixBasis", "0", 2, 3, 2),
    param("iop_core", ParamKind::Int, "iop_core", "0", 0, 0, 0),
    param("iop_fgrid", ParamKind::Int, "%FreqGrid", "3", 1, 5, 0),
    param("nomeg", ParamKind::Int, "%FreqGrid", "16", 1, 5, 1),
    param("omegmax", ParamKind::Float, "%FreqGrid", "0.42", 1, 5, 2),
    param("omegmin", ParamKind::Float, "%FreqGrid", "0.00", 1, 5, 3),
    param("emaxpol", ParamKind::Float, "emaxpol", "1.0E10", 0, 0, 0),
    param("emaxsc", ParamKind::Float, "emaxsc", "1.0E10", 0, 0, 0),
];

pub fn param_spec(key: &str) -> Option<&'static ParamSpec> {
    PARAMS.iter().find(|spec| spec.key == key)
}

pub fn available_params() -> Vec<&'static str> {
    PARAMS.iter().map(|spec| spec.key).collect()
}
