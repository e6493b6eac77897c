// src/core/catalog_loader.rs

//! Reads `catalog.toml` and lowers it into a linked [`Catalog`].
//!
//! A program is declared either inline under `[programs.<name>]` or as a string
//! naming a separate TOML file. Separate files are read and parsed in parallel.
//! Relative paths (program files, binaries) are resolved against the directory
//! of the file that mentions them.
//!
//! Common parameters are copied in front of every mode's own parameters. A
//! mode may `omit` common parameters that are marked `optional`.

use crate::{
    core::{
        parameters::ParameterSpec,
        paths::{self, PathError},
        program::{Catalog, CatalogError, ModeDefinition, ProgramDefinition},
    },
    models::{CatalogDocument, ModeDocument, ParameterDocument, ProgramDocument, ProgramEntry},
};
use rayon::prelude::*;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Could not read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Could not parse '{path}': {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Path(#[from] PathError),
}

/// Loads and links the catalog at `path`.
pub fn load_catalog(path: &Path) -> Result<Catalog, LoadError> {
    log::debug!("Loading catalog from '{}'", path.display());
    let text = read(path)?;
    parse_catalog(&text, path)
}

/// Parses catalog text that was read from `origin`. Only the directory of
/// `origin` is used, to resolve relative paths.
pub fn parse_catalog(text: &str, origin: &Path) -> Result<Catalog, LoadError> {
    let document: CatalogDocument = toml::from_str(text).map_err(|source| LoadError::Toml {
        path: origin.to_path_buf(),
        source,
    })?;
    let root = parent_dir(origin);

    let entries: Vec<(String, ProgramEntry)> = document.programs.into_iter().collect();
    let definitions = entries
        .into_par_iter()
        .map(|(name, entry)| {
            let (program, program_root) = match entry {
                ProgramEntry::Inline(program) => (program, root.clone()),
                ProgramEntry::External(file) => {
                    let file_path = paths::expand_path(&file, &root)?;
                    log::trace!("Program '{}' lives in '{}'", name, file_path.display());
                    let program = read_program_file(&file_path)?;
                    (program, parent_dir(&file_path))
                }
            };
            lower_program(name, program, &program_root)
        })
        .collect::<Result<Vec<ProgramDefinition>, LoadError>>()?;

    let catalog = Catalog::build(definitions)?;
    log::debug!("Catalog holds {} program(s).", catalog.len());
    Ok(catalog)
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_program_file(path: &Path) -> Result<ProgramDocument, LoadError> {
    let text = read(path)?;
    toml::from_str(&text).map_err(|source| LoadError::Toml {
        path: path.to_path_buf(),
        source,
    })
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn lower_program(
    name: String,
    document: ProgramDocument,
    root: &Path,
) -> Result<ProgramDefinition, LoadError> {
    if name.trim().is_empty() {
        return Err(CatalogError::EmptyProgramName.into());
    }

    let raw_id = document.id.ok_or_else(|| CatalogError::MissingField {
        program: name.clone(),
        field: "id",
    })?;
    let id = Uuid::parse_str(raw_id.trim()).map_err(|_| CatalogError::InvalidId {
        program: name.clone(),
        value: raw_id.clone(),
    })?;

    let binary = match document.binary.as_deref().map(str::trim) {
        Some(b) if !b.is_empty() => paths::expand_path(b, root)?,
        _ => {
            return Err(CatalogError::MissingField {
                program: name,
                field: "binary",
            }
            .into());
        }
    };

    let common: Vec<ParameterSpec> = document
        .common_parameters
        .into_iter()
        .map(lower_parameter)
        .collect();

    let modes = document
        .modes
        .into_iter()
        .map(|(mode_name, mode)| lower_mode(&name, mode_name, mode, &common))
        .collect::<Result<Vec<_>, CatalogError>>()?;

    Ok(ProgramDefinition {
        name,
        id,
        binary_path: binary,
        modes,
        default_mode: document.default_mode,
    })
}

fn lower_mode(
    program: &str,
    name: String,
    document: ModeDocument,
    common: &[ParameterSpec],
) -> Result<ModeDefinition, CatalogError> {
    for omitted in &document.omit {
        match common.iter().find(|p| p.name() == omitted) {
            None => {
                return Err(CatalogError::OmitUnknown {
                    program: program.to_string(),
                    mode: name,
                    parameter: omitted.clone(),
                });
            }
            Some(p) if !p.is_optional() => {
                return Err(CatalogError::OmitRequired {
                    program: program.to_string(),
                    mode: name,
                    parameter: omitted.clone(),
                });
            }
            Some(_) => {}
        }
    }

    let parameters = common
        .iter()
        .filter(|p| !document.omit.iter().any(|o| o == p.name()))
        .cloned()
        .chain(document.parameters.into_iter().map(lower_parameter))
        .collect();

    Ok(ModeDefinition {
        name,
        parameters,
        matched_mode: document.parameter_match,
    })
}

fn lower_parameter(document: ParameterDocument) -> ParameterSpec {
    let ParameterDocument {
        name,
        kind,
        subtype,
        default,
        optional,
    } = document;
    let mut spec = ParameterSpec::new(name, kind).optional(optional);
    if let Some(subtype) = subtype {
        spec = spec.with_subtype(subtype);
    }
    if let Some(default) = default {
        spec = spec.with_default(default);
    }
    spec
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parameters::ParamValue;

    const SERVER_ID: &str = "7d2b5c4e-2f43-4c55-9a53-0b6f1b1d2e10";
    const CLIENT_ID: &str = "0c9e4a61-8d1b-4f3a-b5e2-93c7d84f1a22";

    fn parse(text: &str) -> Result<Catalog, LoadError> {
        parse_catalog(text, Path::new("/opt/launchpad/catalog.toml"))
    }

    #[test]
    fn test_load_inline_and_external_programs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("programs")).unwrap();
        fs::write(
            dir.path().join("programs/echo-client.toml"),
            format!(
                r#"
                id = "{CLIENT_ID}"
                binary = "echo-client"
                default-mode = "connect"

                [modes.listen]
                parameters = [
                    {{ name = "address", type = "ip-address", subtype = "server" }},
                    {{ name = "port", type = "ip-port" }},
                ]

                [modes.connect]
                parameter-match = "listen"
                parameters = [
                    {{ name = "address", type = "ip-address" }},
                    {{ name = "port", type = "ip-port" }},
                ]
                "#
            ),
        )
        .unwrap();
        let catalog_file = dir.path().join("catalog.toml");
        fs::write(
            &catalog_file,
            format!(
                r#"
                [programs]
                echo-client = "programs/echo-client.toml"

                [programs.echo-server]
                id = "{SERVER_ID}"
                binary = "/usr/local/bin/echo-server"

                [programs.echo-server.modes.listen]
                parameters = [
                    {{ name = "address", type = "ip-address", subtype = "server" }},
                    {{ name = "port", type = "ip-port", default = 5000 }},
                ]
                "#
            ),
        )
        .unwrap();

        let catalog = load_catalog(&catalog_file).unwrap();
        assert_eq!(catalog.len(), 2);

        let client = catalog.find_by_name("echo-client").unwrap();
        assert_eq!(
            client.binary_path(),
            &dir.path().join("programs").join("echo-client")
        );
        let connect = client.default_mode().unwrap();
        assert_eq!(connect.name(), "connect");
        assert_eq!(connect.matched_mode().unwrap().name(), "listen");

        let server = catalog
            .lookup_program(&Uuid::parse_str(SERVER_ID).unwrap())
            .unwrap();
        assert_eq!(server.name(), "echo-server");
        let listen = server.default_mode().unwrap();
        assert_eq!(
            listen.parameters()[1].default(),
            Some(&ParamValue::Integer(5000))
        );
    }

    #[test]
    fn test_relative_catalog_origin_gives_absolute_binaries() {
        let catalog = parse_catalog(
            &format!(
                r#"
                [programs.echo-server]
                id = "{SERVER_ID}"
                binary = "bin/echo-server"

                [programs.echo-server.modes.listen]
                parameters = []
                "#
            ),
            Path::new("catalog.toml"),
        )
        .unwrap();

        let server = catalog.find_by_name("echo-server").unwrap();
        assert!(server.binary_path().is_absolute());
        assert_eq!(
            server.binary_path(),
            &std::env::current_dir().unwrap().join("bin/echo-server")
        );
    }

    #[test]
    fn test_common_parameters_are_prepended_and_omittable() {
        let catalog = parse(&format!(
            r#"
            [programs.tool]
            id = "{SERVER_ID}"
            binary = "bin/tool"
            common-parameters = [
                {{ name = "--verbose", type = "literal", optional = true }},
                {{ name = "config", type = "file", default = "tool.conf" }},
            ]

            [programs.tool.modes.run]
            parameters = [ {{ name = "job", type = "text" }} ]

            [programs.tool.modes.quiet]
            omit = ["--verbose"]
            parameters = [ {{ name = "job", type = "text" }} ]
            "#
        ))
        .unwrap();

        let tool = catalog.find_by_name("tool").unwrap();
        assert_eq!(tool.binary_path(), &PathBuf::from("/opt/launchpad/bin/tool"));

        let names = |mode: &str| -> Vec<String> {
            tool.mode(mode)
                .unwrap()
                .parameters()
                .iter()
                .map(|p| p.name().to_string())
                .collect()
        };
        assert_eq!(names("run"), vec!["--verbose", "config", "job"]);
        assert_eq!(names("quiet"), vec!["config", "job"]);
        assert!(tool.default_mode().is_none());
    }

    #[test]
    fn test_omit_required_common_parameter_fails() {
        let err = parse(&format!(
            r#"
            [programs.tool]
            id = "{SERVER_ID}"
            binary = "tool"
            common-parameters = [ {{ name = "config", type = "file" }} ]

            [programs.tool.modes.run]
            omit = ["config"]
            "#
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Catalog(CatalogError::OmitRequired { ref parameter, .. }) if parameter == "config"
        ));
    }

    #[test]
    fn test_omit_unknown_parameter_fails() {
        let err = parse(&format!(
            r#"
            [programs.tool]
            id = "{SERVER_ID}"
            binary = "tool"

            [programs.tool.modes.run]
            omit = ["nope"]
            "#
        ))
        .unwrap_err();
        assert!(matches!(err, LoadError::Catalog(CatalogError::OmitUnknown { .. })));
    }

    #[test]
    fn test_unknown_parameter_match_aborts_load() {
        let err = parse(&format!(
            r#"
            [programs.client]
            id = "{CLIENT_ID}"
            binary = "client"

            [programs.client.modes.connect]
            parameter-match = "nonexistent"
            "#
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Catalog(CatalogError::UnknownMatchedMode { ref matched, .. }) if matched == "nonexistent"
        ));
    }

    #[test]
    fn test_missing_and_invalid_ids() {
        let missing = parse(
            r#"
            [programs.a]
            binary = "a"
            [programs.a.modes.m]
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            missing,
            LoadError::Catalog(CatalogError::MissingField { field: "id", .. })
        ));

        let invalid = parse(
            r#"
            [programs.a]
            id = "not-a-uuid"
            binary = "a"
            [programs.a.modes.m]
            "#,
        )
        .unwrap_err();
        assert!(matches!(invalid, LoadError::Catalog(CatalogError::InvalidId { .. })));
    }

    #[test]
    fn test_duplicate_id_aborts_load() {
        let err = parse(&format!(
            r#"
            [programs.a]
            id = "{SERVER_ID}"
            binary = "a"
            [programs.a.modes.m]

            [programs.b]
            id = "{SERVER_ID}"
            binary = "b"
            [programs.b.modes.m]
            "#
        ))
        .unwrap_err();
        assert!(matches!(err, LoadError::Catalog(CatalogError::DuplicateId { .. })));
    }

    #[test]
    fn test_missing_binary_and_modes() {
        let no_binary = parse(&format!(
            r#"
            [programs.a]
            id = "{SERVER_ID}"
            [programs.a.modes.m]
            "#
        ))
        .unwrap_err();
        assert!(matches!(
            no_binary,
            LoadError::Catalog(CatalogError::MissingField { field: "binary", .. })
        ));

        let no_modes = parse(&format!(
            r#"
            [programs.a]
            id = "{SERVER_ID}"
            binary = "a"
            "#
        ))
        .unwrap_err();
        assert!(matches!(no_modes, LoadError::Catalog(CatalogError::NoModes(_))));
    }

    #[test]
    fn test_io_and_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = load_catalog(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(missing, LoadError::Io { .. }));

        let broken = parse("[programs.a\nid = 1").unwrap_err();
        assert!(matches!(broken, LoadError::Toml { .. }));
    }

    #[test]
    fn test_missing_external_program_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_catalog(
            "[programs]\nghost = \"ghost.toml\"\n",
            &dir.path().join("catalog.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Io { ref path, .. } if path.ends_with("ghost.toml")));
    }
}
