// src/core/resolver.rs

//! # Argument Resolution
//!
//! Turns a [`ProgramMode`] into a concrete argument vector.
//!
//! Each parameter is resolved in declared order by the first rule that applies:
//!
//! 1. A matched launch was supplied, it recorded a value for the parameter, and
//!    the parameter is not one the matched mode leaves out: reuse that value.
//!    A mode without a matched mode leaves nothing out.
//! 2. The parameter has a default: use it.
//! 3. Candidate discovery yields exactly one value: use it.
//! 4. Explicit overrides remain: consume the next one.
//! 5. Otherwise resolution fails at this parameter.
//!
//! Resolution is all-or-nothing. A failure reports why it stopped and, for
//! every parameter from the failing one onward, the candidates that are known.

use crate::core::{
    candidates::{CandidateRegistry, Candidates},
    parameters::{ParamValue, ParameterSpec},
    program::{Program, ProgramMode},
};
use rayon::prelude::*;
use serde::Serialize;
use std::{collections::BTreeMap, fmt, path::PathBuf, sync::Arc};
use thiserror::Error;
use uuid::Uuid;

// --- DATA STRUCTS ---

/// Why resolution stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// Nothing is known about the parameter's values (or the known set is empty).
    NoCandidates,
    /// More than one value is acceptable and nothing picked one.
    AmbiguousCandidates,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NoCandidates => f.write_str("no-candidates"),
            FailureReason::AmbiguousCandidates => f.write_str("ambiguous-candidates"),
        }
    }
}

/// A parameter left unresolved, with whatever candidates are known for it.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedParameter {
    pub name: String,
    /// `None` when no candidates are known.
    pub candidates: Option<Candidates>,
}

impl UnresolvedParameter {
    /// The diagnostic line, e.g. `    port (candidates: 1000..65535)`.
    pub fn diagnostic_line(&self) -> String {
        let count = self.candidates.as_ref().map_or(0, Candidates::len);
        let values = match &self.candidates {
            Some(c) => c.to_string(),
            None => "none".to_string(),
        };
        format!(
            "    {} (candidate{}: {})",
            self.name,
            if count == 1 { "" } else { "s" },
            values
        )
    }
}

/// Resolution could not determine every parameter.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}", self.headline())]
pub struct ResolutionFailure {
    pub mode: String,
    /// Index of the failing parameter in the mode's parameter list.
    pub index: usize,
    pub reason: FailureReason,
    /// The failing parameter followed by every later one.
    pub remaining: Vec<UnresolvedParameter>,
}

impl ResolutionFailure {
    /// One-line summary of the failure.
    pub fn headline(&self) -> String {
        match self.reason {
            FailureReason::NoCandidates => format!(
                "insufficient arguments supplied for mode \"{}\"",
                self.mode
            ),
            FailureReason::AmbiguousCandidates => format!(
                "failed to automatically select unspecified arguments for mode \"{}\"",
                self.mode
            ),
        }
    }

    /// The parameter resolution stopped at.
    pub fn failed_parameter(&self) -> Option<&UnresolvedParameter> {
        self.remaining.first()
    }

    /// Full diagnostic text. Scripts parse this; keep the format stable.
    pub fn render(&self) -> String {
        let mut out = format!("error: {}\nRemaining arguments are:\n", self.headline());
        for param in &self.remaining {
            out.push_str(&param.diagnostic_line());
            out.push('\n');
        }
        out
    }
}

/// The outcome of a successful resolution: what to run and with which values.
#[derive(Debug, Clone)]
pub struct ResolvedLaunch {
    program: Arc<Program>,
    mode: Arc<ProgramMode>,
    argv: Vec<String>,
    parameters: BTreeMap<String, String>,
}

/// Serializable view of a [`ResolvedLaunch`].
#[derive(Debug, Clone, Serialize)]
pub struct LaunchSummary {
    pub program: String,
    pub program_id: Uuid,
    pub mode: String,
    pub binary: PathBuf,
    pub argv: Vec<String>,
    pub parameters: BTreeMap<String, String>,
}

impl ResolvedLaunch {
    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    pub fn mode(&self) -> &Arc<ProgramMode> {
        &self.mode
    }

    /// Arguments in parameter order, without the binary.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    pub fn summary(&self) -> LaunchSummary {
        LaunchSummary {
            program: self.program.name().to_string(),
            program_id: self.program.id(),
            mode: self.mode.name().to_string(),
            binary: self.program.binary_path().clone(),
            argv: self.argv.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

/// Resolves modes against a candidate registry.
#[derive(Debug, Clone, Copy)]
pub struct ArgumentResolver<'a> {
    registry: &'a CandidateRegistry,
}

impl<'a> ArgumentResolver<'a> {
    pub fn new(registry: &'a CandidateRegistry) -> Self {
        Self { registry }
    }

    /// Resolves every parameter of `mode` (which must belong to `program`).
    ///
    /// `matched` is the launch of the mode's matched mode, if one happened.
    /// `overrides` are consumed positionally by parameters that nothing else
    /// could decide. Leftover overrides are ignored with a warning.
    pub fn resolve(
        &self,
        program: &Arc<Program>,
        mode: &Arc<ProgramMode>,
        matched: Option<&ResolvedLaunch>,
        overrides: &[String],
    ) -> Result<ResolvedLaunch, ResolutionFailure> {
        debug_assert_eq!(mode.program_id(), program.id());

        if matched.is_none() {
            if let Some(matched_mode) = mode.matched_mode() {
                log::warn!(
                    "No launch of matched mode '{}' supplied for '{}'; matched parameters will be selected from explicitly given arguments.",
                    matched_mode.name(),
                    mode.qualified_name()
                );
            }
        }

        let mut overrides = overrides.iter();
        let mut chosen: Vec<ParamValue> = Vec::with_capacity(mode.parameters().len());

        for (index, param) in mode.parameters().iter().enumerate() {
            if let Some(value) = matched.and_then(|launch| self.matched_value(mode, param, launch)) {
                log::trace!("'{}' taken from matched launch: {}", param.name(), value);
                chosen.push(ParamValue::Text(value.to_string()));
                continue;
            }

            if let Some(default) = param.default() {
                chosen.push(default.clone());
                continue;
            }

            let candidates = param.candidates(self.registry);
            if let Some(single) = candidates.as_ref().and_then(Candidates::single) {
                log::trace!("'{}' auto-selected: {}", param.name(), single);
                chosen.push(single);
                continue;
            }

            if let Some(value) = overrides.next() {
                chosen.push(ParamValue::Text(value.clone()));
                continue;
            }

            let reason = match &candidates {
                Some(c) if c.len() > 1 => FailureReason::AmbiguousCandidates,
                _ => FailureReason::NoCandidates,
            };
            return Err(self.failure(mode, index, reason, candidates));
        }

        let leftover: Vec<&String> = overrides.collect();
        if !leftover.is_empty() {
            log::warn!(
                "Ignoring {} unused argument(s) for '{}': {:?}",
                leftover.len(),
                mode.qualified_name(),
                leftover
            );
        }

        // Values become text only now that every parameter has one.
        let argv: Vec<String> = chosen.iter().map(ParamValue::materialize).collect();
        let parameters = mode
            .parameters()
            .iter()
            .zip(&argv)
            .map(|(p, v)| (p.name().to_string(), v.clone()))
            .collect();

        Ok(ResolvedLaunch {
            program: Arc::clone(program),
            mode: Arc::clone(mode),
            argv,
            parameters,
        })
    }

    fn matched_value<'l>(
        &self,
        mode: &ProgramMode,
        param: &ParameterSpec,
        launch: &'l ResolvedLaunch,
    ) -> Option<&'l str> {
        if mode.is_unmatched_parameter(param.name()) {
            None
        } else {
            launch.parameter(param.name())
        }
    }

    fn failure(
        &self,
        mode: &ProgramMode,
        index: usize,
        reason: FailureReason,
        failed_candidates: Option<Candidates>,
    ) -> ResolutionFailure {
        let params = mode.parameters();
        let failed = params.get(index).map(|p| UnresolvedParameter {
            name: p.name().to_string(),
            candidates: failed_candidates.filter(|c| !c.is_empty()),
        });

        // Discovery functions are safe to run concurrently; order is preserved.
        let rest: Vec<UnresolvedParameter> = params
            .get(index + 1..)
            .unwrap_or_default()
            .par_iter()
            .map(|p| UnresolvedParameter {
                name: p.name().to_string(),
                candidates: p.candidates(self.registry).filter(|c| !c.is_empty()),
            })
            .collect();

        ResolutionFailure {
            mode: mode.name().to_string(),
            index,
            reason,
            remaining: failed.into_iter().chain(rest).collect(),
        }
    }
}

// MARK: --- UNIT TESTS ---
