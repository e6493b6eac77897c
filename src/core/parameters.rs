// src/core/parameters.rs

use crate::{
    constants::LITERAL_TYPE,
    core::candidates::{CandidateRegistry, Candidates},
};
use serde::Serialize;
use std::{fmt, net::IpAddr, path::PathBuf};

// --- DATA STRUCTS ---

/// A typed parameter value.
///
/// Values keep their type while they travel through candidate discovery and are
/// only turned into argv text (see [`ParamValue::materialize`]) once chosen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Address(IpAddr),
    Path(PathBuf),
}

impl ParamValue {
    /// Canonical argv form of the value.
    pub fn materialize(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Text(s) => f.write_str(s),
            ParamValue::Integer(i) => write!(f, "{}", i),
            // Debug keeps the `.0` of whole floats.
            ParamValue::Float(x) => write!(f, "{:?}", x),
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Address(a) => write!(f, "{}", a),
            ParamValue::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<IpAddr> for ParamValue {
    fn from(value: IpAddr) -> Self {
        ParamValue::Address(value)
    }
}

impl From<PathBuf> for ParamValue {
    fn from(value: PathBuf) -> Self {
        ParamValue::Path(value)
    }
}

/// Declaration of one named program argument.
///
/// Built once from the catalog and never mutated. Modes that share common
/// parameters each hold their own copy.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    name: String,
    kind: String,
    subtype: Option<String>,
    default: Option<ParamValue>,
    optional: bool,
}

impl ParameterSpec {
    /// Creates a required parameter without a default.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            subtype: None,
            default: None,
            optional: false,
        }
    }

    /// A `literal` parameter: always emits its own name as the argument.
    pub fn literal(name: impl Into<String>) -> Self {
        Self::new(name, LITERAL_TYPE)
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<ParamValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The semantic type, e.g. `ip-port`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn subtype(&self) -> Option<&str> {
        self.subtype.as_deref()
    }

    pub fn default(&self) -> Option<&ParamValue> {
        self.default.as_ref()
    }

    /// Whether a mode may leave this parameter out. Has no effect on resolution.
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_literal(&self) -> bool {
        self.kind == LITERAL_TYPE
    }

    /// Candidate values for this parameter, or `None` when nothing is known
    /// about its type. Literal parameters have exactly one candidate: their name.
    pub fn candidates(&self, registry: &CandidateRegistry) -> Option<Candidates> {
        if self.is_literal() {
            return Some(Candidates::List(vec![ParamValue::Text(self.name.clone())]));
        }
        registry.candidates_for(&self.kind, self.subtype.as_deref())
    }

    /// `type` or `type:subtype`, as shown in listings.
    pub fn type_label(&self) -> String {
        match &self.subtype {
            Some(sub) => format!("{}:{}", self.kind, sub),
            None => self.kind.clone(),
        }
    }
}

// MARK: --- UNIT TESTS ---
