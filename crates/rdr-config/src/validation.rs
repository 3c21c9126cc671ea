//! Structural checks on a [`ResolvedCluster`].
//!
//! Resolution never fails on incomplete input. Whether the result is complete enough to create a
//! cluster from is decided here, so that callers can report every problem at once instead of
//! failing on the first.
use std::fmt::Display;

use serde_json::Value;
use snafu::Snafu;

use crate::{
    document::{FieldPath, InstallConfig, keys, value_kind},
    merge::is_set,
    resolver::ResolvedCluster,
};

type Result<T = (), E = ValidationErrors> = std::result::Result<T, E>;

/// A collection of problems discovered during validation.
#[derive(Debug, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            let prefix = match i {
                0 => "",
                _ => ", ",
            };
            write!(f, "{prefix}{error}")?;
        }
        Ok(())
    }
}
impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type IntoIter = std::vec::IntoIter<ValidationError>;
    type Item = ValidationError;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A single problem and the field it was found at.
#[derive(Debug, PartialEq, Eq, Snafu)]
#[snafu(display("{path}: {problem}"))]
pub struct ValidationError {
    pub path: FieldPath,

    #[snafu(source)]
    pub problem: ValidationProblem,
}

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum ValidationProblem {
    #[snafu(display("must be set"))]
    Missing,

    #[snafu(display("must not be empty"))]
    Empty,

    #[snafu(display("expected {expected} but found {found}"))]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
}

/// Checks that `cluster` can be handed to the installer.
///
/// The cluster needs a name, and its install config needs a `metadata.name`, a `baseDomain`, a
/// `controlPlane`, at least one `compute` pool, `networking` and a `platform`.
pub fn validate(cluster: &ResolvedCluster) -> Result {
    let mut errors = Vec::new();
    let mut check = |path: &str, result: std::result::Result<(), ValidationProblem>| {
        if let Err(problem) = result {
            errors.push(ValidationError {
                path: path.into(),
                problem,
            });
        }
    };

    check("name", non_blank(Some(&Value::from(cluster.name()))));

    let config = cluster.install_config();
    check(
        "install_config.metadata.name",
        non_blank(config.get_path("metadata.name")),
    );
    check(
        "install_config.baseDomain",
        non_blank(config.get(keys::BASE_DOMAIN)),
    );
    check(
        "install_config.controlPlane",
        present(config, keys::CONTROL_PLANE),
    );
    check(
        "install_config.compute",
        non_empty_sequence(config.get(keys::COMPUTE)),
    );
    check(
        "install_config.networking",
        present(config, keys::NETWORKING),
    );
    check(
        "install_config.platform",
        non_empty_mapping(config.get(keys::PLATFORM)),
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}

fn present(config: &InstallConfig, key: &str) -> std::result::Result<(), ValidationProblem> {
    match config.get(key) {
        None | Some(Value::Null) => MissingSnafu.fail(),
        Some(_) => Ok(()),
    }
}

fn non_blank(value: Option<&Value>) -> std::result::Result<(), ValidationProblem> {
    match value {
        None | Some(Value::Null) => MissingSnafu.fail(),
        Some(Value::String(text)) if text.trim().is_empty() => EmptySnafu.fail(),
        Some(Value::String(_)) => Ok(()),
        Some(other) => WrongTypeSnafu {
            expected: "string",
            found: value_kind(other),
        }
        .fail(),
    }
}

fn non_empty_sequence(value: Option<&Value>) -> std::result::Result<(), ValidationProblem> {
    match value {
        None | Some(Value::Null) => MissingSnafu.fail(),
        Some(sequence @ Value::Array(_)) if !is_set(sequence) => EmptySnafu.fail(),
        Some(Value::Array(_)) => Ok(()),
        Some(other) => WrongTypeSnafu {
            expected: "sequence",
            found: value_kind(other),
        }
        .fail(),
    }
}

fn non_empty_mapping(value: Option<&Value>) -> std::result::Result<(), ValidationProblem> {
    match value {
        None | Some(Value::Null) => MissingSnafu.fail(),
        Some(mapping @ Value::Object(_)) if !is_set(mapping) => EmptySnafu.fail(),
        Some(Value::Object(_)) => Ok(()),
        Some(other) => WrongTypeSnafu {
            expected: "mapping",
            found: value_kind(other),
        }
        .fail(),
    }
}
