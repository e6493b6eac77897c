// src/models.rs

//! Serde models of the on-disk catalog document.
//!
//! These only describe what is read from `catalog.toml` (and any per-program
//! files it references). They are lowered into the in-memory
//! [`ProgramDefinition`](crate::core::program::ProgramDefinition) shape by the
//! catalog loader, which is where validation happens.

use crate::core::parameters::ParamValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The root of a catalog file.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct CatalogDocument {
    #[serde(default)]
    pub programs: BTreeMap<String, ProgramEntry>,
}

/// A program is either declared inline or in its own file.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(untagged)]
pub enum ProgramEntry {
    /// Path (relative to the catalog file) of a file holding a single program table.
    External(String),
    Inline(ProgramDocument),
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ProgramDocument {
    pub id: Option<String>,
    pub binary: Option<String>,
    pub default_mode: Option<String>,
    #[serde(default)]
    pub common_parameters: Vec<ParameterDocument>,
    #[serde(default)]
    pub modes: BTreeMap<String, ModeDocument>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ModeDocument {
    #[serde(default)]
    pub parameters: Vec<ParameterDocument>,
    pub parameter_match: Option<String>,
    /// Optional common parameters this mode does not take.
    #[serde(default)]
    pub omit: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct ParameterDocument {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub subtype: Option<String>,
    pub default: Option<DefaultValue>,
    #[serde(default)]
    pub optional: bool,
}

/// A default value as written in TOML. The type is kept until the value is
/// materialized into an argument.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum DefaultValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<DefaultValue> for ParamValue {
    fn from(value: DefaultValue) -> Self {
        match value {
            DefaultValue::Bool(b) => ParamValue::Bool(b),
            DefaultValue::Integer(i) => ParamValue::Integer(i),
            DefaultValue::Float(f) => ParamValue::Float(f),
            DefaultValue::Text(s) => ParamValue::Text(s),
        }
    }
}
