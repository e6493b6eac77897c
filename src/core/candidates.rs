// src/core/candidates.rs

//! Candidate-value discovery.
//!
//! A [`CandidateRegistry`] maps a parameter `(type, subtype)` pair to a
//! discovery function. Lookups first try the exact pair, then fall back to the
//! type's default selector (registered without a subtype). Discovery runs on
//! every lookup; nothing is cached.

use crate::{
    constants::{
        DEVICE_FILE_TYPE, INPUT_DEVICE_DIR, IP_ADDRESS_TYPE, IP_PORT_TYPE, MAX_CANDIDATE_PORT,
        MIN_CANDIDATE_PORT,
    },
    core::parameters::ParamValue,
    system::discovery,
};
use std::{collections::HashMap, fmt, ops::RangeInclusive, path::Path, sync::Arc};

/// The acceptable values for a parameter: an explicit list or an inclusive
/// integer range.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidates {
    List(Vec<ParamValue>),
    Range(RangeInclusive<i64>),
}

impl Candidates {
    /// Number of distinct candidates.
    pub fn len(&self) -> usize {
        match self {
            Candidates::List(values) => values.len(),
            Candidates::Range(range) => {
                let span = i128::from(*range.end()) - i128::from(*range.start()) + 1;
                usize::try_from(span.max(0)).unwrap_or(usize::MAX)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The only candidate, if there is exactly one.
    pub fn single(&self) -> Option<ParamValue> {
        if self.len() != 1 {
            return None;
        }
        match self {
            Candidates::List(values) => values.first().cloned(),
            Candidates::Range(range) => Some(ParamValue::Integer(*range.start())),
        }
    }

    /// All candidates as values, in order. Ranges are expanded.
    pub fn values(&self) -> Vec<ParamValue> {
        match self {
            Candidates::List(values) => values.clone(),
            Candidates::Range(range) => range.clone().map(ParamValue::Integer).collect(),
        }
    }
}

impl fmt::Display for Candidates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Candidates::List(values) => {
                let joined = values
                    .iter()
                    .map(ParamValue::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                f.write_str(&joined)
            }
            Candidates::Range(range) => write!(f, "{}..{}", range.start(), range.end()),
        }
    }
}

/// A value-discovery function.
pub type Selector = Arc<dyn Fn() -> Candidates + Send + Sync>;

/// Maps `(type, subtype)` to discovery functions.
///
/// Populated once at startup and read-only afterwards; lookups from several
/// threads at once are fine.
#[derive(Clone, Default)]
pub struct CandidateRegistry {
    selectors: HashMap<String, HashMap<Option<String>, Selector>>,
}

impl fmt::Debug for CandidateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self
            .selectors
            .iter()
            .flat_map(|(kind, subs)| {
                subs.keys().map(move |sub| match sub {
                    Some(s) => format!("{}:{}", kind, s),
                    None => kind.clone(),
                })
            })
            .collect();
        keys.sort();
        f.debug_struct("CandidateRegistry")
            .field("selectors", &keys)
            .finish()
    }
}

impl CandidateRegistry {
    /// An empty registry. Every lookup returns `None`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in selectors:
    ///
    /// - `ip-address:server`: non-loopback, non-link-local interface addresses plus `0.0.0.0`.
    /// - `ip-port`: the range `1000..=65535`.
    /// - `device-file:input-evdev`: evdev nodes under `/dev/input/by-id`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(IP_ADDRESS_TYPE, Some("server"), || {
            Candidates::List(
                discovery::server_addresses()
                    .into_iter()
                    .map(ParamValue::Address)
                    .collect(),
            )
        });
        registry.register(IP_PORT_TYPE, None, || {
            Candidates::Range(MIN_CANDIDATE_PORT..=MAX_CANDIDATE_PORT)
        });
        registry.register(DEVICE_FILE_TYPE, Some("input-evdev"), || {
            Candidates::List(
                discovery::evdev_devices(Path::new(INPUT_DEVICE_DIR))
                    .into_iter()
                    .map(ParamValue::Path)
                    .collect(),
            )
        });
        registry
    }

    /// Registers (or replaces) the selector for `(kind, subtype)`.
    pub fn register<F>(&mut self, kind: &str, subtype: Option<&str>, selector: F)
    where
        F: Fn() -> Candidates + Send + Sync + 'static,
    {
        log::debug!(
            "Registering candidate selector for '{}' (subtype: {:?})",
            kind,
            subtype
        );
        self.selectors
            .entry(kind.to_string())
            .or_default()
            .insert(subtype.map(str::to_string), Arc::new(selector));
    }

    /// Runs discovery for `(kind, subtype)`.
    ///
    /// Returns `None` when no selector applies: the type is unknown, or the
    /// subtype is unknown and the type has no default selector.
    pub fn candidates_for(&self, kind: &str, subtype: Option<&str>) -> Option<Candidates> {
        let by_subtype = self.selectors.get(kind)?;
        let exact = by_subtype.get(&subtype.map(str::to_string));
        let selector = match exact {
            Some(selector) => selector,
            None => {
                log::trace!(
                    "No selector for '{}:{}', falling back to the type default.",
                    kind,
                    subtype.unwrap_or("")
                );
                by_subtype.get(&None)?
            }
        };
        Some(selector())
    }

    pub fn is_registered(&self, kind: &str, subtype: Option<&str>) -> bool {
        self.selectors
            .get(kind)
            .is_some_and(|subs| subs.contains_key(&subtype.map(str::to_string)))
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_exact_match_wins_over_default() {
        let mut registry = CandidateRegistry::new();
        registry.register("color", None, || Candidates::List(vec!["any".into()]));
        registry.register("color", Some("warm"), || {
            Candidates::List(vec!["red".into(), "orange".into()])
        });

        let warm = registry.candidates_for("color", Some("warm")).unwrap();
        assert_eq!(warm.len(), 2);
        let plain = registry.candidates_for("color", None).unwrap();
        assert_eq!(plain.single(), Some(ParamValue::from("any")));
    }

    #[test]
    fn test_unknown_subtype_falls_back_to_default() {
        let mut registry = CandidateRegistry::new();
        registry.register("color", None, || Candidates::List(vec!["any".into()]));
        let cold = registry.candidates_for("color", Some("cold")).unwrap();
        assert_eq!(cold.single(), Some(ParamValue::from("any")));
    }

    #[test]
    fn test_unknown_subtype_without_default_is_absent() {
        let mut registry = CandidateRegistry::new();
        registry.register("color", Some("warm"), || Candidates::List(vec![]));
        assert!(registry.candidates_for("color", Some("cold")).is_none());
        assert!(registry.candidates_for("color", None).is_none());
    }

    #[test]
    fn test_unknown_type_is_absent() {
        let registry = CandidateRegistry::with_builtins();
        assert!(registry.candidates_for("no-such-type", None).is_none());
    }

    #[test]
    fn test_discovery_runs_on_every_lookup() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut registry = CandidateRegistry::new();
        registry.register("counted", None, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Candidates::List(vec![])
        });
        registry.candidates_for("counted", None);
        registry.candidates_for("counted", None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_builtin_port_range() {
        let registry = CandidateRegistry::with_builtins();
        let ports = registry.candidates_for(IP_PORT_TYPE, None).unwrap();
        assert_eq!(ports, Candidates::Range(1000..=65535));
        assert_eq!(ports.len(), 64536);
        assert_eq!(ports.to_string(), "1000..65535");
        assert!(ports.single().is_none());
    }

    #[test]
    fn test_builtin_server_addresses_include_wildcard() {
        let registry = CandidateRegistry::with_builtins();
        let addresses = registry
            .candidates_for(IP_ADDRESS_TYPE, Some("server"))
            .unwrap();
        assert!(
            addresses
                .values()
                .contains(&ParamValue::Address("0.0.0.0".parse().unwrap()))
        );
    }

    #[test]
    fn test_single_element_range() {
        let candidates = Candidates::Range(8080..=8080);
        assert_eq!(candidates.single(), Some(ParamValue::Integer(8080)));
        assert!(Candidates::Range(5..=4).is_empty());
    }

    #[test]
    fn test_list_display_joins_values() {
        let candidates = Candidates::List(vec!["a".into(), ParamValue::Integer(2)]);
        assert_eq!(candidates.to_string(), "a, 2");
    }
}
