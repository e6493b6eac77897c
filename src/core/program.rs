// src/core/program.rs

//! # Program Catalog
//!
//! The in-memory catalog of launchable programs.
//!
//! Construction is two-phase. A configuration loader produces plain
//! [`ProgramDefinition`]s, where a mode names its matched mode by string. Then
//! [`Program::link`] checks every definition and resolves those names in one
//! pass, producing an immutable, fully linked [`Program`]. A [`Catalog`] is only
//! returned once every program in it has linked, so a broken definition never
//! becomes visible to lookups.

use crate::core::parameters::ParameterSpec;
use std::{
    collections::{BTreeMap, HashSet},
    path::PathBuf,
    sync::Arc,
};
use thiserror::Error;
use uuid::Uuid;

/// Fatal errors found while building the catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("A program was declared with an empty name.")]
    EmptyProgramName,
    #[error("Program '{program}' is missing the required field '{field}'.")]
    MissingField { program: String, field: &'static str },
    #[error("Program '{program}' has an invalid id '{value}'.")]
    InvalidId { program: String, value: String },
    #[error("Programs '{first}' and '{second}' share the id '{id}'.")]
    DuplicateId {
        id: Uuid,
        first: String,
        second: String,
    },
    #[error("Program name '{0}' is declared more than once.")]
    DuplicateProgramName(String),
    #[error("Program '{0}' declares no modes.")]
    NoModes(String),
    #[error("Program '{program}' declares mode '{mode}' more than once.")]
    DuplicateMode { program: String, mode: String },
    #[error("Parameter '{parameter}' of mode '{program}:{mode}' has no type.")]
    EmptyParameterType {
        program: String,
        mode: String,
        parameter: String,
    },
    #[error("Mode '{program}:{mode}' declares parameter '{parameter}' more than once.")]
    DuplicateParameter {
        program: String,
        mode: String,
        parameter: String,
    },
    #[error("Mode '{program}:{mode}' matches unknown mode '{matched}'.")]
    UnknownMatchedMode {
        program: String,
        mode: String,
        matched: String,
    },
    #[error("Program '{program}' names unknown default mode '{mode}'.")]
    UnknownDefaultMode { program: String, mode: String },
    #[error("Mode '{program}:{mode}' omits '{parameter}', which is not a common parameter.")]
    OmitUnknown {
        program: String,
        mode: String,
        parameter: String,
    },
    #[error("Mode '{program}:{mode}' omits '{parameter}', which is not optional.")]
    OmitRequired {
        program: String,
        mode: String,
        parameter: String,
    },
}

/// Errors looking up a `program[:mode]` target.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("No program named '{0}' in the catalog.")]
    UnknownProgram(String),
    #[error("Program '{program}' has no mode '{mode}'.")]
    UnknownMode { program: String, mode: String },
    #[error("Program '{0}' has no default mode; name one as '{0}:<mode>'.")]
    NoDefaultMode(String),
}

// --- DEFINITIONS (what the configuration loader hands over) ---

#[derive(Debug, Clone, PartialEq)]
pub struct ModeDefinition {
    pub name: String,
    /// In argv order.
    pub parameters: Vec<ParameterSpec>,
    /// Name of another mode of the same program.
    pub matched_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramDefinition {
    pub name: String,
    pub id: Uuid,
    pub binary_path: PathBuf,
    pub modes: Vec<ModeDefinition>,
    pub default_mode: Option<String>,
}

// --- LINKED MODEL ---

/// The linked form of a matched-mode reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedMode {
    name: String,
    parameter_names: Vec<String>,
}

impl MatchedMode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }
}

/// A named way of invoking a program.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramMode {
    program_id: Uuid,
    program_name: String,
    name: String,
    parameters: Vec<ParameterSpec>,
    matched_mode: Option<MatchedMode>,
}

impl ProgramMode {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the owning program.
    pub fn program_id(&self) -> Uuid {
        self.program_id
    }

    pub fn program_name(&self) -> &str {
        &self.program_name
    }

    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    pub fn matched_mode(&self) -> Option<&MatchedMode> {
        self.matched_mode.as_ref()
    }

    /// Whether `name` is expected to come from a matched launch, i.e. the
    /// matched mode declares a parameter of the same name.
    pub fn is_matched_parameter(&self, name: &str) -> bool {
        self.matched_mode
            .as_ref()
            .is_some_and(|m| m.parameter_names.iter().any(|n| n == name))
    }

    /// Parameters the matched mode does not declare. Empty when there is no
    /// matched mode, so a supplied launch can then feed any parameter it names.
    pub fn unmatched_parameters(&self) -> Vec<&ParameterSpec> {
        self.parameters
            .iter()
            .filter(|p| self.is_unmatched_parameter(p.name()))
            .collect()
    }

    /// Whether `name` must not be taken from a matched launch.
    pub fn is_unmatched_parameter(&self, name: &str) -> bool {
        self.matched_mode.is_some() && !self.is_matched_parameter(name)
    }

    /// `program:mode`.
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.program_name, self.name)
    }
}

/// A launchable executable and the modes it can run in.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    name: String,
    id: Uuid,
    binary_path: PathBuf,
    modes: BTreeMap<String, Arc<ProgramMode>>,
    default_mode: Option<String>,
}

impl Program {
    /// Validates a definition and links its matched-mode references.
    pub fn link(def: ProgramDefinition) -> Result<Self, CatalogError> {
        let ProgramDefinition {
            name,
            id,
            binary_path,
            modes,
            default_mode,
        } = def;

        if name.trim().is_empty() {
            return Err(CatalogError::EmptyProgramName);
        }
        if id.is_nil() {
            return Err(CatalogError::InvalidId {
                program: name,
                value: id.to_string(),
            });
        }
        if binary_path.as_os_str().is_empty() {
            return Err(CatalogError::MissingField {
                program: name,
                field: "binary",
            });
        }
        if modes.is_empty() {
            return Err(CatalogError::NoModes(name));
        }

        // --- Phase 1: every mode on its own ---
        let mut by_name: BTreeMap<String, ModeDefinition> = BTreeMap::new();
        for mode in modes {
            let mut seen = HashSet::new();
            for param in &mode.parameters {
                if param.kind().trim().is_empty() {
                    return Err(CatalogError::EmptyParameterType {
                        program: name.clone(),
                        mode: mode.name.clone(),
                        parameter: param.name().to_string(),
                    });
                }
                if !seen.insert(param.name()) {
                    return Err(CatalogError::DuplicateParameter {
                        program: name.clone(),
                        mode: mode.name.clone(),
                        parameter: param.name().to_string(),
                    });
                }
            }
            if by_name.contains_key(&mode.name) {
                return Err(CatalogError::DuplicateMode {
                    program: name.clone(),
                    mode: mode.name,
                });
            }
            by_name.insert(mode.name.clone(), mode);
        }

        // --- Phase 2: resolve cross-references by name, within this program only ---
        let mut linked = BTreeMap::new();
        for (mode_name, mode) in &by_name {
            let matched_mode = match &mode.matched_mode {
                Some(matched) => {
                    let target = by_name.get(matched).ok_or_else(|| {
                        CatalogError::UnknownMatchedMode {
                            program: name.clone(),
                            mode: mode_name.clone(),
                            matched: matched.clone(),
                        }
                    })?;
                    Some(MatchedMode {
                        name: matched.clone(),
                        parameter_names: target
                            .parameters
                            .iter()
                            .map(|p| p.name().to_string())
                            .collect(),
                    })
                }
                None => None,
            };
            linked.insert(
                mode_name.clone(),
                Arc::new(ProgramMode {
                    program_id: id,
                    program_name: name.clone(),
                    name: mode_name.clone(),
                    parameters: mode.parameters.clone(),
                    matched_mode,
                }),
            );
        }

        let default_mode = match default_mode {
            Some(explicit) if !linked.contains_key(&explicit) => {
                return Err(CatalogError::UnknownDefaultMode {
                    program: name,
                    mode: explicit,
                });
            }
            Some(explicit) => Some(explicit),
            None if linked.len() == 1 => linked.keys().next().cloned(),
            None => None,
        };

        log::debug!(
            "Linked program '{}' ({}) with {} mode(s).",
            name,
            id,
            linked.len()
        );

        Ok(Self {
            name,
            id,
            binary_path,
            modes: linked,
            default_mode,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn binary_path(&self) -> &PathBuf {
        &self.binary_path
    }

    pub fn mode(&self, name: &str) -> Option<&Arc<ProgramMode>> {
        self.modes.get(name)
    }

    /// Modes in name order.
    pub fn modes(&self) -> impl Iterator<Item = &Arc<ProgramMode>> {
        self.modes.values()
    }

    pub fn default_mode(&self) -> Option<&Arc<ProgramMode>> {
        self.default_mode
            .as_deref()
            .and_then(|name| self.modes.get(name))
    }
}

/// Every program known to the bootstrapper, keyed by id.
///
/// Passed by reference to whoever needs lookups; there is no process-wide
/// instance.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    programs: BTreeMap<Uuid, Arc<Program>>,
    names: BTreeMap<String, Uuid>,
}

impl Catalog {
    /// Links every definition. Fails on the first error without exposing any
    /// partially built catalog.
    pub fn build(
        definitions: impl IntoIterator<Item = ProgramDefinition>,
    ) -> Result<Self, CatalogError> {
        let mut programs: BTreeMap<Uuid, Arc<Program>> = BTreeMap::new();
        let mut names = BTreeMap::new();

        for def in definitions {
            let program = Program::link(def)?;
            if let Some(existing) = programs.get(&program.id) {
                return Err(CatalogError::DuplicateId {
                    id: program.id,
                    first: existing.name.clone(),
                    second: program.name,
                });
            }
            if names.contains_key(&program.name) {
                return Err(CatalogError::DuplicateProgramName(program.name));
            }
            names.insert(program.name.clone(), program.id);
            programs.insert(program.id, Arc::new(program));
        }

        Ok(Self { programs, names })
    }

    pub fn lookup_program(&self, id: &Uuid) -> Option<&Arc<Program>> {
        self.programs.get(id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Arc<Program>> {
        self.names.get(name).and_then(|id| self.programs.get(id))
    }

    /// Programs in name order.
    pub fn programs(&self) -> impl Iterator<Item = &Arc<Program>> {
        self.names.values().filter_map(|id| self.programs.get(id))
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Looks up `program` (default mode) or `program:mode`.
    pub fn target(
        &self,
        spec: &str,
    ) -> Result<(Arc<Program>, Arc<ProgramMode>), LookupError> {
        let (program_name, mode_name) = match spec.split_once(':') {
            Some((p, m)) => (p, Some(m)),
            None => (spec, None),
        };
        let program = self
            .find_by_name(program_name)
            .ok_or_else(|| LookupError::UnknownProgram(program_name.to_string()))?;
        let mode = match mode_name {
            Some(m) => program.mode(m).ok_or_else(|| LookupError::UnknownMode {
                program: program_name.to_string(),
                mode: m.to_string(),
            })?,
            None => program
                .default_mode()
                .ok_or_else(|| LookupError::NoDefaultMode(program_name.to_string()))?,
        };
        Ok((Arc::clone(program), Arc::clone(mode)))
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(name: &str, params: &[&str], matched: Option<&str>) -> ModeDefinition {
        ModeDefinition {
            name: name.to_string(),
            parameters: params
                .iter()
                .map(|p| ParameterSpec::new(*p, "text"))
                .collect(),
            matched_mode: matched.map(str::to_string),
        }
    }

    fn program(name: &str, modes: Vec<ModeDefinition>) -> ProgramDefinition {
        ProgramDefinition {
            name: name.to_string(),
            id: Uuid::new_v4(),
            binary_path: PathBuf::from(format!("/usr/bin/{}", name)),
            modes,
            default_mode: None,
        }
    }

    #[test]
    fn test_link_resolves_matched_mode_within_program() {
        let def = program(
            "echo",
            vec![
                mode("listen", &["address", "port"], None),
                mode("connect", &["port", "message"], Some("listen")),
            ],
        );
        let program = Program::link(def).unwrap();
        let connect = program.mode("connect").unwrap();

        assert_eq!(connect.matched_mode().unwrap().name(), "listen");
        assert!(connect.is_matched_parameter("port"));
        assert!(!connect.is_matched_parameter("message"));
        let unmatched: Vec<&str> = connect
            .unmatched_parameters()
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(unmatched, vec!["message"]);
        assert_eq!(connect.program_id(), program.id());
        assert_eq!(connect.qualified_name(), "echo:connect");
    }

    #[test]
    fn test_mode_without_match_has_no_unmatched_parameters() {
        let program = Program::link(program("p", vec![mode("m", &["a", "b"], None)])).unwrap();
        let m = program.mode("m").unwrap();
        assert!(m.unmatched_parameters().is_empty());
        assert!(!m.is_unmatched_parameter("a"));
        assert!(!m.is_matched_parameter("a"));
    }

    #[test]
    fn test_unknown_matched_mode_is_fatal() {
        let def = program("echo", vec![mode("connect", &["port"], Some("nonexistent"))]);
        let err = Program::link(def).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::UnknownMatchedMode { ref matched, .. } if matched == "nonexistent"
        ));
    }

    #[test]
    fn test_catalog_is_not_built_when_any_program_fails() {
        let good = program("good", vec![mode("run", &[], None)]);
        let good_id = good.id;
        let bad = program("bad", vec![mode("run", &[], Some("nonexistent"))]);

        let result = Catalog::build(vec![good, bad]);
        assert!(result.is_err());

        // Nothing leaks: a fresh, empty catalog knows nothing about `good`.
        assert!(Catalog::default().lookup_program(&good_id).is_none());
    }

    #[test]
    fn test_duplicate_id_is_fatal() {
        let first = program("first", vec![mode("run", &[], None)]);
        let mut second = program("second", vec![mode("run", &[], None)]);
        second.id = first.id;
        let err = Catalog::build(vec![first, second]).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId { .. }));
    }

    #[test]
    fn test_implicit_default_mode_when_single() {
        let single = Program::link(program("p", vec![mode("only", &[], None)])).unwrap();
        assert_eq!(single.default_mode().unwrap().name(), "only");

        let multi = Program::link(program(
            "q",
            vec![mode("a", &[], None), mode("b", &[], None)],
        ))
        .unwrap();
        assert!(multi.default_mode().is_none());
    }

    #[test]
    fn test_explicit_default_mode_must_exist() {
        let mut def = program("p", vec![mode("a", &[], None)]);
        def.default_mode = Some("b".to_string());
        assert!(matches!(
            Program::link(def),
            Err(CatalogError::UnknownDefaultMode { .. })
        ));
    }

    #[test]
    fn test_validation_errors() {
        let mut nil_id = program("p", vec![mode("a", &[], None)]);
        nil_id.id = Uuid::nil();
        assert!(matches!(
            Program::link(nil_id),
            Err(CatalogError::InvalidId { .. })
        ));

        assert!(matches!(
            Program::link(program("p", vec![])),
            Err(CatalogError::NoModes(_))
        ));

        assert!(matches!(
            Program::link(program("p", vec![mode("a", &["x", "x"], None)])),
            Err(CatalogError::DuplicateParameter { .. })
        ));

        let mut untyped = program("p", vec![mode("a", &[], None)]);
        untyped.modes[0].parameters.push(ParameterSpec::new("x", ""));
        assert!(matches!(
            Program::link(untyped),
            Err(CatalogError::EmptyParameterType { .. })
        ));

        assert!(matches!(
            Program::link(program("p", vec![mode("a", &[], None), mode("a", &[], None)])),
            Err(CatalogError::DuplicateMode { .. })
        ));
    }

    #[test]
    fn test_lookup_by_id_and_target() {
        let def = program(
            "echo",
            vec![mode("listen", &[], None), mode("connect", &[], None)],
        );
        let id = def.id;
        let catalog = Catalog::build(vec![def]).unwrap();

        assert_eq!(catalog.lookup_program(&id).unwrap().name(), "echo");
        let (_, m) = catalog.target("echo:connect").unwrap();
        assert_eq!(m.name(), "connect");
        assert_eq!(
            catalog.target("echo").unwrap_err(),
            LookupError::NoDefaultMode("echo".to_string())
        );
        assert!(matches!(
            catalog.target("echo:nope"),
            Err(LookupError::UnknownMode { .. })
        ));
        assert!(matches!(
            catalog.target("nope"),
            Err(LookupError::UnknownProgram(_))
        ));
    }
}
